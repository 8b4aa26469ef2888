//! Vehicle "more info" lookups against an OpenAI-compatible chat completion endpoint.
//!
//! The request is described and the response parsed here; `App` sends it through
//! `crux_http` and the shell performs the call.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::capabilities::HttpResult;
use crate::config::LookupConfig;
use crate::locale::Locale;
use crate::model::VehicleListing;
use crate::{LookupError, LOOKUP_MAX_TOKENS, LOOKUP_TEMPERATURE, LOOKUP_TOP_P};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Everything needed to issue one chat completion call.
#[derive(Debug, Clone)]
pub struct LookupRequest {
    pub url: String,
    pub body: ChatCompletionRequest,
    api_key: SecretString,
}

impl LookupRequest {
    /// Value of the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.api_key.expose_secret())
    }
}

#[must_use]
pub fn build_prompt(listing: &VehicleListing, locale: Locale) -> String {
    locale.lookup_prompt(&listing.brand, &listing.model, listing.year)
}

#[instrument(skip_all, fields(listing_id = %listing.id, locale = locale.tag()))]
pub fn build_request(
    config: &LookupConfig,
    listing: &VehicleListing,
    locale: Locale,
) -> Result<LookupRequest, LookupError> {
    let api_key = config.api_key().ok_or(LookupError::MissingApiKey)?;

    Ok(LookupRequest {
        url: config.endpoint().to_string(),
        body: ChatCompletionRequest {
            model: config.model().to_string(),
            messages: vec![ChatMessage::user(build_prompt(listing, locale))],
            temperature: LOOKUP_TEMPERATURE,
            max_tokens: LOOKUP_MAX_TOKENS,
            top_p: LOOKUP_TOP_P,
        },
        api_key: api_key.clone(),
    })
}

/// Extracts the first completion's text. Anything but a 200 is a failure.
#[instrument(skip_all)]
pub fn parse_response(result: &HttpResult) -> Result<String, LookupError> {
    let response = result
        .as_ref()
        .map_err(|e| LookupError::network(e.to_string()))?;

    let status = u16::from(response.status());
    let body = response.body().map(Vec::as_slice).unwrap_or_default();

    if status != 200 {
        let detail = String::from_utf8_lossy(body)
            .chars()
            .take(200)
            .collect::<String>();
        tracing::debug!(status, "chat completion rejected");
        return Err(LookupError::NetworkFailure {
            status: Some(status),
            detail,
        });
    }

    let parsed: ChatCompletionResponse = serde_json::from_slice(body)
        .map_err(|e| LookupError::network(format!("failed to parse JSON: {e}")))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LookupError::network("response has no choices"))?
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| LookupError::network("first choice has no message content"))?;

    if content.trim().is_empty() {
        return Err(LookupError::network("first choice has empty content"));
    }

    Ok(content)
}
