use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::locale::Locale;
use crate::{AppError, ErrorKind, DEFAULT_CHAT_ENDPOINT, DEFAULT_CHAT_MODEL};

pub const API_KEY_ENV: &str = "ECARROS_OPENAI_API_KEY";
pub const ENDPOINT_ENV: &str = "ECARROS_CHAT_ENDPOINT";
pub const MODEL_ENV: &str = "ECARROS_CHAT_MODEL";
pub const LOCALE_ENV: &str = "ECARROS_LOCALE";

/// Runtime settings pushed by the shell through `Event::Configure`.
///
/// Absent values leave the current configuration untouched, except `api_key`: a blank key
/// clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub locale: Option<Locale>,
}

impl Settings {
    /// Reads `ECARROS_*` variables for desktop and test shells.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api_key: lookup(API_KEY_ENV).map(SecretString::new),
            endpoint: lookup(ENDPOINT_ENV),
            model: lookup(MODEL_ENV),
            locale: lookup(LOCALE_ENV).and_then(|tag| Locale::from_tag(&tag)),
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key.into()));
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid chat endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
    #[error("chat endpoint must use https: {url}")]
    InsecureEndpoint { url: String },
    #[error("chat model name is empty")]
    EmptyModel,
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::new(ErrorKind::Configuration, e.to_string())
    }
}

/// Parses a chat endpoint. Only https URLs with a host and no embedded credentials pass.
pub fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidEndpoint {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "https" {
        return Err(ConfigError::InsecureEndpoint {
            url: url.to_string(),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("credentials in URL are not allowed"));
    }
    Ok(url)
}

/// Where and how vehicle lookups are sent.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_CHAT_ENDPOINT.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_key: None,
        }
    }
}

impl LookupConfig {
    /// Applies `settings` atomically: on error nothing changes.
    pub fn apply(&mut self, settings: &Settings) -> Result<(), ConfigError> {
        let endpoint = match settings.endpoint.as_deref().map(str::trim) {
            Some(raw) => Some(parse_endpoint(raw)?.to_string()),
            None => None,
        };

        let model = match settings.model.as_deref().map(str::trim) {
            Some("") => return Err(ConfigError::EmptyModel),
            Some(m) => Some(m.to_string()),
            None => None,
        };

        if let Some(endpoint) = endpoint {
            self.endpoint = endpoint;
        }
        if let Some(model) = model {
            self.model = model;
        }
        if let Some(key) = &settings.api_key {
            self.api_key = if key.expose_secret().trim().is_empty() {
                None
            } else {
                Some(key.clone())
            };
        }
        Ok(())
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.api_key.is_some()
    }

    pub(crate) fn api_key(&self) -> Option<&SecretString> {
        self.api_key.as_ref()
    }
}
