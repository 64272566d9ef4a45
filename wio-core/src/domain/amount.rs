//! Amount extraction from raw text fragments like `-47.24 AED`

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

/// First signed-or-unsigned decimal number in a fragment
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[+-]?\d+(?:\.\d+)?").expect("valid amount regex"));

/// Why a fragment did not yield an amount
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("no number in {0:?}")]
    NoNumber(String),

    #[error("{0:?} is not an exact decimal")]
    InvalidDecimal(String),
}

/// Parses the primary amount of a transaction line
///
/// Only comma-as-thousands-separator and dot-as-decimal-point are understood.
#[derive(Debug, Clone)]
pub struct AmountParser {
    currency: String,
}

impl AmountParser {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn parse(&self, fragment: &str) -> Result<Decimal, ParseFailure> {
        let cleaned = fragment.replace(self.currency.as_str(), "").replace(',', "");
        let cleaned = cleaned.trim();

        let number = NUMBER_RE
            .find(cleaned)
            .ok_or_else(|| ParseFailure::NoNumber(fragment.to_string()))?
            .as_str();

        // `Decimal` rejects an explicit plus sign
        let number = number.strip_prefix('+').unwrap_or(number);

        Decimal::from_str(number).map_err(|_| ParseFailure::InvalidDecimal(number.to_string()))
    }
}
