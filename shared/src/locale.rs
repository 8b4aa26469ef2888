use serde::{Deserialize, Serialize};

use crate::model::{Field, Price};
use crate::ValidationError;

/// UI language. Drives labels, dialog wording, the lookup prompt and number grouping.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Locale {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "pt-BR")]
    BrazilianPortuguese,
}

impl Locale {
    /// Parses a BCP 47 style tag. Only the primary language subtag is significant.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        match primary.as_str() {
            "en" => Some(Self::English),
            "pt" => Some(Self::BrazilianPortuguese),
            _ => None,
        }
    }

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::BrazilianPortuguese => "pt-BR",
        }
    }

    pub const APP_TITLE: &'static str = "E-Carros";

    #[must_use]
    pub const fn add_listing_label(self) -> &'static str {
        match self {
            Self::English => "List a vehicle",
            Self::BrazilianPortuguese => "Anunciar Veículo",
        }
    }

    #[must_use]
    pub const fn more_info_label(self) -> &'static str {
        match self {
            Self::English => "Learn more",
            Self::BrazilianPortuguese => "Saber Mais",
        }
    }

    #[must_use]
    pub const fn composer_title(self) -> &'static str {
        match self {
            Self::English => "New listing",
            Self::BrazilianPortuguese => "Novo Anúncio",
        }
    }

    #[must_use]
    pub const fn submit_label(self) -> &'static str {
        match self {
            Self::English => "Publish",
            Self::BrazilianPortuguese => "Anunciar",
        }
    }

    #[must_use]
    pub const fn cancel_label(self) -> &'static str {
        match self {
            Self::English => "Cancel",
            Self::BrazilianPortuguese => "Cancelar",
        }
    }

    pub const ACKNOWLEDGE_LABEL: &'static str = "OK";

    #[must_use]
    pub const fn field_label(self, field: Field) -> &'static str {
        match (self, field) {
            (Self::English, Field::Brand) => "Brand",
            (Self::English, Field::Model) => "Model",
            (Self::English, Field::Year) => "Year",
            (Self::English, Field::Mileage) => "Mileage",
            (Self::English, Field::Price) => "Price",
            (Self::BrazilianPortuguese, Field::Brand) => "Marca",
            (Self::BrazilianPortuguese, Field::Model) => "Modelo",
            (Self::BrazilianPortuguese, Field::Year) => "Ano",
            (Self::BrazilianPortuguese, Field::Mileage) => "Quilometragem",
            (Self::BrazilianPortuguese, Field::Price) => "Preço",
        }
    }

    #[must_use]
    pub const fn error_title(self) -> &'static str {
        match self {
            Self::English => "Error",
            Self::BrazilianPortuguese => "Erro",
        }
    }

    #[must_use]
    pub const fn success_title(self) -> &'static str {
        match self {
            Self::English => "Success",
            Self::BrazilianPortuguese => "Sucesso",
        }
    }

    #[must_use]
    pub const fn listing_info_title(self) -> &'static str {
        match self {
            Self::English => "Vehicle details",
            Self::BrazilianPortuguese => "Detalhes do Veículo",
        }
    }

    #[must_use]
    pub const fn listing_published_message(self) -> &'static str {
        match self {
            Self::English => "Vehicle listed successfully!",
            Self::BrazilianPortuguese => "Veículo anunciado com sucesso!",
        }
    }

    #[must_use]
    pub const fn missing_fields_message(self) -> &'static str {
        match self {
            Self::English => "All fields are required!",
            Self::BrazilianPortuguese => "Todos os campos são obrigatórios!",
        }
    }

    #[must_use]
    pub const fn lookup_failed_message(self) -> &'static str {
        match self {
            Self::English => "Could not fetch vehicle information. Please try again later.",
            Self::BrazilianPortuguese => {
                "Erro ao obter informações do veículo. Por favor, tente novamente mais tarde."
            }
        }
    }

    #[must_use]
    pub const fn lookup_unavailable_message(self) -> &'static str {
        match self {
            Self::English => "Vehicle information is not available right now.",
            Self::BrazilianPortuguese => {
                "As informações do veículo não estão disponíveis no momento."
            }
        }
    }

    /// Dialog body for a rejected submit.
    #[must_use]
    pub fn validation_message(self, error: &ValidationError) -> String {
        match error {
            ValidationError::MissingField { fields } => {
                let labels = fields
                    .iter()
                    .map(|&f| self.field_label(f))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} ({labels})", self.missing_fields_message())
            }
            ValidationError::InvalidNumber { field, .. } => match self {
                Self::English => format!("{} must be a number.", self.field_label(*field)),
                Self::BrazilianPortuguese => {
                    format!("{} deve ser um número.", self.field_label(*field))
                }
            },
            ValidationError::OutOfRange { field, .. } => match self {
                Self::English => format!("{} is out of range.", self.field_label(*field)),
                Self::BrazilianPortuguese => {
                    format!("{} está fora do intervalo permitido.", self.field_label(*field))
                }
            },
        }
    }

    /// The question sent to the chat completion endpoint.
    #[must_use]
    pub fn lookup_prompt(self, brand: &str, model: &str, year: u16) -> String {
        match self {
            Self::English => format!("Tell me more about the vehicle: {brand} {model} {year}"),
            Self::BrazilianPortuguese => {
                format!("Saber mais sobre o veículo: {brand} {model} {year}")
            }
        }
    }

    const fn separators(self) -> (char, char) {
        match self {
            Self::English => (',', '.'),
            Self::BrazilianPortuguese => ('.', ','),
        }
    }

    #[must_use]
    pub fn format_integer(self, value: u64) -> String {
        let (group, _) = self.separators();
        let digits = value.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(group);
            }
            out.push(c);
        }
        out
    }

    #[must_use]
    pub fn format_price(self, price: Price) -> String {
        let (_, decimal) = self.separators();
        let prefix = match self {
            Self::English => "",
            Self::BrazilianPortuguese => "R$ ",
        };
        format!(
            "{prefix}{}{decimal}{:02}",
            self.format_integer(price.whole()),
            price.fraction()
        )
    }

    #[must_use]
    pub fn format_mileage(self, km: u32) -> String {
        format!("{} km", self.format_integer(u64::from(km)))
    }
}
