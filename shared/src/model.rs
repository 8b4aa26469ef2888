use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, VecDeque},
    fmt,
};
use uuid::Uuid;

use crate::config::LookupConfig;
use crate::locale::Locale;
use crate::{ValidationError, MAX_MODEL_YEAR, MIN_MODEL_YEAR};

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(ListingId);
typed_id!(LookupId);

/// Composer form fields, declared in form order.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Brand,
    Model,
    Year,
    Mileage,
    Price,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Brand,
        Field::Model,
        Field::Year,
        Field::Mileage,
        Field::Price,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Brand => "brand",
            Self::Model => "model",
            Self::Year => "year",
            Self::Mileage => "mileage",
            Self::Price => "price",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberError {
    Malformed,
    Overflow,
}

fn parse_digits(raw: &str) -> Result<u64, NumberError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NumberError::Malformed);
    }
    // Only overflow remains once every byte is a digit.
    raw.parse::<u64>().map_err(|_| NumberError::Overflow)
}

/// Asking price in whole cents.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Price(u64);

impl Price {
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn whole(self) -> u64 {
        self.0 / 100
    }

    #[must_use]
    pub const fn fraction(self) -> u64 {
        self.0 % 100
    }

    /// Accepts `80000`, `80000.5`, `80000,50`. No grouping separators.
    fn parse(raw: &str) -> Result<Self, NumberError> {
        let (whole, fraction) = match raw.find(|c: char| c == '.' || c == ',') {
            Some(idx) => {
                let fraction = &raw[idx + 1..];
                if fraction.is_empty() || fraction.len() > 2 {
                    return Err(NumberError::Malformed);
                }
                (&raw[..idx], fraction)
            }
            None => (raw, ""),
        };

        let whole = parse_digits(whole)?;
        let fraction_cents = match fraction.len() {
            0 => 0,
            1 => parse_digits(fraction)? * 10,
            _ => parse_digits(fraction)?,
        };

        whole
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(fraction_cents))
            .map(Self)
            .ok_or(NumberError::Overflow)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct VehicleListing {
    pub id: ListingId,
    pub brand: String,
    pub model: String,
    pub year: u16,
    pub mileage_km: u32,
    pub price: Price,
    pub image_uri: Option<String>,
}

/// Raw form text, exactly as typed.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Draft {
    pub brand: String,
    pub model: String,
    pub year: String,
    pub mileage: String,
    pub price: String,
}

impl Draft {
    #[must_use]
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Brand => &self.brand,
            Field::Model => &self.model,
            Field::Year => &self.year,
            Field::Mileage => &self.mileage,
            Field::Price => &self.price,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Brand => &mut self.brand,
            Field::Model => &mut self.model,
            Field::Year => &mut self.year,
            Field::Mileage => &mut self.mileage,
            Field::Price => &mut self.price,
        };
        *slot = value;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|&f| self.get(f).is_empty())
    }

    #[must_use]
    pub fn blank_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|&f| self.get(f).trim().is_empty())
            .collect()
    }

    /// Validates and parses the draft into a new listing. Leaves the draft untouched.
    pub fn finalize(&self) -> Result<VehicleListing, ValidationError> {
        let missing = self.blank_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingField { fields: missing });
        }

        let year = self.parse_year()?;
        let mileage_km = self.parse_mileage()?;
        let price = self.parse_price()?;

        Ok(VehicleListing {
            id: ListingId::generate(),
            brand: self.brand.trim().to_string(),
            model: self.model.trim().to_string(),
            year,
            mileage_km,
            price,
            image_uri: None,
        })
    }

    fn parse_year(&self) -> Result<u16, ValidationError> {
        let raw = self.year.trim();
        let out_of_range = || ValidationError::OutOfRange {
            field: Field::Year,
            value: raw.to_string(),
        };

        let value = parse_digits(raw).map_err(|e| number_error(Field::Year, raw, e))?;
        let year = u16::try_from(value).map_err(|_| out_of_range())?;
        if (MIN_MODEL_YEAR..=MAX_MODEL_YEAR).contains(&year) {
            Ok(year)
        } else {
            Err(out_of_range())
        }
    }

    fn parse_mileage(&self) -> Result<u32, ValidationError> {
        let raw = self.mileage.trim();
        let value = parse_digits(raw).map_err(|e| number_error(Field::Mileage, raw, e))?;
        u32::try_from(value).map_err(|_| number_error(Field::Mileage, raw, NumberError::Overflow))
    }

    fn parse_price(&self) -> Result<Price, ValidationError> {
        let raw = self.price.trim();
        Price::parse(raw).map_err(|e| number_error(Field::Price, raw, e))
    }
}

fn number_error(field: Field, raw: &str, error: NumberError) -> ValidationError {
    let value = raw.to_string();
    match error {
        NumberError::Malformed => ValidationError::InvalidNumber { field, value },
        NumberError::Overflow => ValidationError::OutOfRange { field, value },
    }
}

/// Append-only, insertion-ordered listing collection.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ListingStore {
    listings: Vec<VehicleListing>,
}

impl ListingStore {
    pub fn append(&mut self, listing: VehicleListing) {
        self.listings.push(listing);
    }

    pub fn iter(&self) -> impl Iterator<Item = &VehicleListing> {
        self.listings.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &ListingId) -> Option<&VehicleListing> {
        self.listings.iter().find(|l| &l.id == id)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ComposerState {
    #[default]
    Closed,
    Open,
}

/// The "new listing" form: a draft plus its Closed/Open state.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Composer {
    state: ComposerState,
    draft: Draft,
    invalid_fields: Vec<Field>,
}

impl Composer {
    #[must_use]
    pub fn state(&self) -> ComposerState {
        self.state
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ComposerState::Open
    }

    #[must_use]
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Fields flagged by the last rejected submit, cleared as they are edited.
    #[must_use]
    pub fn invalid_fields(&self) -> &[Field] {
        &self.invalid_fields
    }

    pub fn open(&mut self) {
        self.state = ComposerState::Open;
    }

    pub fn update_field(&mut self, field: Field, value: String) {
        self.draft.set(field, value);
        self.invalid_fields.retain(|&f| f != field);
    }

    /// On success the draft is reset and the composer closes; on failure nothing but the
    /// invalid-field markers changes.
    pub fn submit(&mut self) -> Result<VehicleListing, ValidationError> {
        match self.draft.finalize() {
            Ok(listing) => {
                self.reset();
                Ok(listing)
            }
            Err(e) => {
                self.invalid_fields = e.fields();
                Err(e)
            }
        }
    }

    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.draft = Draft::default();
        self.invalid_fields.clear();
        self.state = ComposerState::Closed;
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Dialog {
    ListingPublished,
    ValidationFailed(ValidationError),
    ListingInfo { listing_id: ListingId, text: String },
    LookupFailed { listing_id: ListingId },
    LookupUnavailable,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PendingLookup {
    pub listing_id: ListingId,
}

#[derive(Debug, Default)]
pub struct Model {
    pub listings: ListingStore,
    pub composer: Composer,
    pub dialogs: VecDeque<Dialog>,
    pub pending_lookups: HashMap<LookupId, PendingLookup>,
    pub lookup: LookupConfig,
    pub locale: Locale,
}

impl Model {
    pub fn push_dialog(&mut self, dialog: Dialog) {
        self.dialogs.push_back(dialog);
    }

    #[must_use]
    pub fn front_dialog(&self) -> Option<&Dialog> {
        self.dialogs.front()
    }

    pub fn acknowledge_dialog(&mut self) -> Option<Dialog> {
        self.dialogs.pop_front()
    }

    #[must_use]
    pub fn is_lookup_pending(&self, listing_id: &ListingId) -> bool {
        self.pending_lookups
            .values()
            .any(|p| &p.listing_id == listing_id)
    }
}
