//! Multi-line transaction text to `Transaction`
//!
//! The app renders each row as one static text element whose value looks like:
//!
//! ```text
//! Bowlito
//! Restaurant
//! -47.24 AED
//! -415.00 THB
//! ```
//!
//! Lines before the first local-currency line describe the counterparty, the
//! local-currency line carries the amount, and an optional foreign-currency line
//! follows it.

use thiserror::Error;

use super::amount::{AmountParser, ParseFailure};
use super::transaction::Transaction;

/// Used when the amount line is the very first line
const UNKNOWN_DESCRIPTION: &str = "Unknown";

/// Why an element's text did not produce a transaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordRejection {
    #[error("no {0} marker")]
    MissingCurrency(String),

    #[error("expected at least 2 lines, got {0}")]
    TooFewLines(usize),

    #[error("unparseable amount: {0}")]
    Amount(#[from] ParseFailure),
}

/// Parses transaction rows for one local currency
#[derive(Debug, Clone)]
pub struct RecordParser {
    amounts: AmountParser,
    foreign_currencies: Vec<String>,
}

impl RecordParser {
    pub fn new(currency: impl Into<String>, foreign_currencies: Vec<String>) -> Self {
        Self {
            amounts: AmountParser::new(currency),
            foreign_currencies,
        }
    }

    pub fn currency(&self) -> &str {
        self.amounts.currency()
    }

    /// Parse one element's text, stamping it with `date_context`
    pub fn parse(&self, text: &str, date_context: &str) -> Result<Transaction, RecordRejection> {
        let currency = self.currency();
        if !text.contains(currency) {
            return Err(RecordRejection::MissingCurrency(currency.to_string()));
        }

        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if lines.len() < 2 {
            return Err(RecordRejection::TooFewLines(lines.len()));
        }

        // The marker may only appear on a line we dropped, e.g. "AED" split oddly
        let amount_idx = lines
            .iter()
            .position(|line| line.contains(currency))
            .ok_or_else(|| RecordRejection::MissingCurrency(currency.to_string()))?;

        let amount = self.amounts.parse(lines[amount_idx])?;

        let foreign_amount = lines
            .get(amount_idx + 1)
            .filter(|line| self.is_foreign_amount(line))
            .map(|line| line.to_string());

        let (description, category) = split_description(&lines[..amount_idx]);

        Ok(Transaction::new(date_context, description, amount, currency)
            .with_category(category)
            .with_foreign_amount(foreign_amount))
    }

    fn is_foreign_amount(&self, line: &str) -> bool {
        self.foreign_currencies
            .iter()
            .any(|code| line.contains(code.as_str()))
    }
}

/// First block line is the description; a digit-free second line is the category
fn split_description(block: &[&str]) -> (String, Option<String>) {
    let description = block
        .first()
        .map(|line| line.to_string())
        .unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string());

    let category = block
        .get(1)
        .filter(|line| !line.chars().any(|c| c.is_ascii_digit()))
        .map(|line| line.to_string());

    (description, category)
}
