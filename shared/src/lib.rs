// lib.rs - E-Carros shared core

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod capabilities;
pub mod config;
pub mod locale;
pub mod lookup;
pub mod model;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::{LookupConfig, Settings};
pub use locale::Locale;
pub use model::{
    Composer, ComposerState, Dialog, Draft, Field, ListingId, ListingStore, LookupId, Model,
    PendingLookup, Price, VehicleListing,
};

pub const DEFAULT_CHAT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const LOOKUP_TEMPERATURE: f64 = 0.7;
pub const LOOKUP_MAX_TOKENS: u32 = 150;
pub const LOOKUP_TOP_P: f64 = 1.0;
pub const MIN_MODEL_YEAR: u16 = 1886;
pub const MAX_MODEL_YEAR: u16 = 2100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    RateLimited,
    Configuration,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::RateLimited => "RATE_LIMITED",
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::Internal
        )
    }
}

/// Error envelope used for logging every failure path in the core.
///
/// Domain errors ([`ValidationError`], [`LookupError`], [`config::ConfigError`])
/// convert into it so they share one code and retry classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
    pub internal_message: Option<String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            internal_message: None,
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    #[must_use]
    pub fn from_http_status(status: u16) -> Self {
        let kind = match status {
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            408 => ErrorKind::Timeout,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        };
        Self::new(kind, format!("HTTP error: {status}"))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

fn join_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("missing required fields: {}", join_fields(.fields))]
    MissingField { fields: Vec<Field> },
    #[error("{field} is not a valid number: {value:?}")]
    InvalidNumber { field: Field, value: String },
    #[error("{field} is out of range: {value}")]
    OutOfRange { field: Field, value: String },
}

impl ValidationError {
    /// Fields the form should highlight.
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        match self {
            Self::MissingField { fields } => fields.clone(),
            Self::InvalidNumber { field, .. } | Self::OutOfRange { field, .. } => vec![*field],
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("vehicle lookup failed: {detail}")]
    NetworkFailure { status: Option<u16>, detail: String },
    #[error("no API key configured for vehicle lookups")]
    MissingApiKey,
}

impl LookupError {
    pub(crate) fn network(detail: impl Into<String>) -> Self {
        Self::NetworkFailure {
            status: None,
            detail: detail.into(),
        }
    }
}

impl From<LookupError> for AppError {
    fn from(e: LookupError) -> Self {
        match &e {
            LookupError::NetworkFailure {
                status: Some(status),
                detail,
            } => AppError::from_http_status(*status).with_internal(detail.clone()),
            LookupError::NetworkFailure { status: None, .. } => {
                AppError::new(ErrorKind::Network, "Network error").with_internal(e.to_string())
            }
            LookupError::MissingApiKey => AppError::new(ErrorKind::Configuration, e.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub enum Event {
    #[default]
    Noop,

    AppStarted,
    Configure(Settings),

    ComposerOpened,
    FieldChanged {
        field: Field,
        value: String,
    },
    ComposerSubmitted,
    ComposerCancelled,

    MoreInfoRequested {
        listing_id: ListingId,
    },
    #[serde(skip)]
    LookupCompleted {
        lookup_id: LookupId,
        result: Box<capabilities::HttpResult>,
    },

    DialogAcknowledged,
    ScreenDismissed,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Noop => "noop",
            Self::AppStarted => "app_started",
            Self::Configure(_) => "configure",
            Self::ComposerOpened => "composer_opened",
            Self::FieldChanged { .. } => "field_changed",
            Self::ComposerSubmitted => "composer_submitted",
            Self::ComposerCancelled => "composer_cancelled",
            Self::MoreInfoRequested { .. } => "more_info_requested",
            Self::LookupCompleted { .. } => "lookup_completed",
            Self::DialogAcknowledged => "dialog_acknowledged",
            Self::ScreenDismissed => "screen_dismissed",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::ComposerOpened
                | Self::FieldChanged { .. }
                | Self::ComposerSubmitted
                | Self::ComposerCancelled
                | Self::MoreInfoRequested { .. }
                | Self::DialogAcknowledged
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingCard {
    pub id: String,
    pub title: String,
    pub brand: String,
    pub model: String,
    pub year: String,
    pub mileage_text: String,
    pub price_text: String,
    pub image_uri: Option<String>,
    pub lookup_pending: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldView {
    pub field: Field,
    pub label: String,
    pub value: String,
    pub is_invalid: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComposerView {
    pub title: String,
    pub fields: Vec<FieldView>,
    pub submit_label: String,
    pub cancel_label: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DialogView {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
    pub acknowledge_label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewModel {
    pub title: String,
    pub add_listing_label: String,
    pub more_info_label: String,
    pub listings: Vec<ListingCard>,
    pub composer: Option<ComposerView>,
    pub dialog: Option<DialogView>,
    pub queued_dialogs: usize,
    pub lookups_available: bool,
    pub lookups_in_flight: usize,
}

pub mod app {
    use super::*;
    use crate::capabilities::HttpResult;
    use tracing::{debug, info, warn};

    #[derive(Default)]
    pub struct App;

    impl App {
        fn send_lookup(
            caps: &Capabilities,
            request: &lookup::LookupRequest,
            lookup_id: &LookupId,
        ) -> Result<(), LookupError> {
            let builder = caps
                .http
                .post(&request.url)
                .header("Authorization", request.authorization())
                .header("Content-Type", "application/json")
                .body_json(&request.body)
                .map_err(|e| LookupError::network(e.to_string()))?;

            let lookup_id = lookup_id.clone();
            builder.send(move |result| Event::LookupCompleted {
                lookup_id: lookup_id.clone(),
                result: Box::new(result),
            });
            Ok(())
        }

        fn request_more_info(listing_id: &ListingId, model: &mut Model, caps: &Capabilities) {
            let Some(listing) = model.listings.get(listing_id) else {
                warn!(%listing_id, "more info requested for unknown listing");
                return;
            };

            let lookup_id = LookupId::generate();
            let sent = lookup::build_request(&model.lookup, listing, model.locale)
                .and_then(|request| Self::send_lookup(caps, &request, &lookup_id));

            match sent {
                Ok(()) => {
                    model.pending_lookups.insert(
                        lookup_id.clone(),
                        PendingLookup {
                            listing_id: listing_id.clone(),
                        },
                    );

                    info!(
                        %listing_id,
                        %lookup_id,
                        in_flight = model.pending_lookups.len(),
                        "vehicle lookup started"
                    );
                }
                Err(LookupError::MissingApiKey) => {
                    warn!(%listing_id, "vehicle lookup unavailable: no API key configured");
                    model.push_dialog(Dialog::LookupUnavailable);
                }
                Err(e) => {
                    let error = AppError::from(e);
                    warn!(%listing_id, code = error.code(), %error, "vehicle lookup not sent");
                    model.push_dialog(Dialog::LookupFailed {
                        listing_id: listing_id.clone(),
                    });
                }
            }
        }

        fn complete_lookup(lookup_id: &LookupId, result: &HttpResult, model: &mut Model) {
            let Some(pending) = model.pending_lookups.remove(lookup_id) else {
                debug!(%lookup_id, "discarding lookup result for a dismissed screen");
                return;
            };

            match lookup::parse_response(result) {
                Ok(text) => {
                    info!(
                        listing_id = %pending.listing_id,
                        %lookup_id,
                        chars = text.chars().count(),
                        "vehicle lookup succeeded"
                    );
                    model.push_dialog(Dialog::ListingInfo {
                        listing_id: pending.listing_id,
                        text,
                    });
                }
                Err(e) => {
                    let error = AppError::from(e);
                    warn!(
                        listing_id = %pending.listing_id,
                        %lookup_id,
                        code = error.code(),
                        retryable = error.is_retryable(),
                        %error,
                        "vehicle lookup failed"
                    );
                    model.push_dialog(Dialog::LookupFailed {
                        listing_id: pending.listing_id,
                    });
                }
            }
        }

        fn build_listing_cards(model: &Model) -> Vec<ListingCard> {
            let locale = model.locale;
            model
                .listings
                .iter()
                .map(|listing| ListingCard {
                    id: listing.id.to_string(),
                    title: format!("{} {}", listing.brand, listing.model),
                    brand: listing.brand.clone(),
                    model: listing.model.clone(),
                    year: listing.year.to_string(),
                    mileage_text: locale.format_mileage(listing.mileage_km),
                    price_text: locale.format_price(listing.price),
                    image_uri: listing.image_uri.clone(),
                    lookup_pending: model.is_lookup_pending(&listing.id),
                })
                .collect()
        }

        fn build_composer_view(model: &Model) -> Option<ComposerView> {
            if !model.composer.is_open() {
                return None;
            }

            let locale = model.locale;
            let draft = model.composer.draft();
            let invalid = model.composer.invalid_fields();

            let fields = Field::ALL
                .iter()
                .map(|&field| FieldView {
                    field,
                    label: locale.field_label(field).to_string(),
                    value: draft.get(field).to_string(),
                    is_invalid: invalid.contains(&field),
                })
                .collect();

            Some(ComposerView {
                title: locale.composer_title().to_string(),
                fields,
                submit_label: locale.submit_label().to_string(),
                cancel_label: locale.cancel_label().to_string(),
            })
        }

        fn build_dialog_view(dialog: &Dialog, locale: Locale) -> DialogView {
            let (kind, title, message) = match dialog {
                Dialog::ListingPublished => (
                    DialogKind::Success,
                    locale.success_title().to_string(),
                    locale.listing_published_message().to_string(),
                ),
                Dialog::ValidationFailed(error) => (
                    DialogKind::Error,
                    locale.error_title().to_string(),
                    locale.validation_message(error),
                ),
                Dialog::ListingInfo { text, .. } => (
                    DialogKind::Info,
                    locale.listing_info_title().to_string(),
                    text.clone(),
                ),
                Dialog::LookupFailed { .. } => (
                    DialogKind::Error,
                    locale.error_title().to_string(),
                    locale.lookup_failed_message().to_string(),
                ),
                Dialog::LookupUnavailable => (
                    DialogKind::Error,
                    locale.error_title().to_string(),
                    locale.lookup_unavailable_message().to_string(),
                ),
            };

            DialogView {
                kind,
                title,
                message,
                acknowledge_label: Locale::ACKNOWLEDGE_LABEL.to_string(),
            }
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            debug!(
                event = event.name(),
                user_action = event.is_user_initiated(),
                "update"
            );

            match event {
                Event::Noop => {}

                Event::AppStarted => {
                    info!(
                        listings = model.listings.len(),
                        lookups_available = model.lookup.is_ready(),
                        "app started"
                    );
                    caps.render.render();
                }

                Event::Configure(settings) => {
                    if let Some(locale) = settings.locale {
                        model.locale = locale;
                    }

                    match model.lookup.apply(&settings) {
                        Ok(()) => info!(
                            endpoint = model.lookup.endpoint(),
                            chat_model = model.lookup.model(),
                            lookups_available = model.lookup.is_ready(),
                            "lookup settings applied"
                        ),
                        Err(e) => {
                            let error = AppError::from(e);
                            warn!(code = error.code(), %error, "lookup settings rejected");
                        }
                    }

                    caps.render.render();
                }

                Event::ComposerOpened => {
                    model.composer.open();
                    caps.render.render();
                }

                Event::FieldChanged { field, value } => {
                    model.composer.update_field(field, value);
                    caps.render.render();
                }

                Event::ComposerSubmitted => {
                    if !model.composer.is_open() {
                        warn!("submit ignored: composer is closed");
                        return;
                    }

                    match model.composer.submit() {
                        Ok(listing) => {
                            info!(
                                listing_id = %listing.id,
                                brand = %listing.brand,
                                model = %listing.model,
                                year = listing.year,
                                "listing published"
                            );
                            model.listings.append(listing);
                            model.push_dialog(Dialog::ListingPublished);
                        }
                        Err(e) => {
                            let error = AppError::from(e.clone());
                            debug!(code = error.code(), %error, "draft rejected");
                            model.push_dialog(Dialog::ValidationFailed(e));
                        }
                    }

                    caps.render.render();
                }

                Event::ComposerCancelled => {
                    model.composer.cancel();
                    caps.render.render();
                }

                Event::MoreInfoRequested { listing_id } => {
                    Self::request_more_info(&listing_id, model, caps);
                    caps.render.render();
                }

                Event::LookupCompleted { lookup_id, result } => {
                    Self::complete_lookup(&lookup_id, &result, model);
                    caps.render.render();
                }

                Event::DialogAcknowledged => {
                    if model.acknowledge_dialog().is_none() {
                        debug!("acknowledge ignored: no dialog shown");
                    }
                    caps.render.render();
                }

                Event::ScreenDismissed => {
                    let abandoned = model.pending_lookups.len();
                    model.pending_lookups.clear();
                    if abandoned > 0 {
                        info!(abandoned, "screen dismissed with lookups in flight");
                    }
                    caps.render.render();
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            let locale = model.locale;

            ViewModel {
                title: Locale::APP_TITLE.to_string(),
                add_listing_label: locale.add_listing_label().to_string(),
                more_info_label: locale.more_info_label().to_string(),
                listings: Self::build_listing_cards(model),
                composer: Self::build_composer_view(model),
                dialog: model
                    .front_dialog()
                    .map(|dialog| Self::build_dialog_view(dialog, locale)),
                queued_dialogs: model.dialogs.len(),
                lookups_available: model.lookup.is_ready(),
                lookups_in_flight: model.pending_lookups.len(),
            }
        }
    }
}
