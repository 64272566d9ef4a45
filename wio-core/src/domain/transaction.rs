//! Transaction domain model

use std::hash::{Hash, Hasher};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single transaction read from the Wio transaction list
///
/// Values are immutable once built by the record parser. The orchestrator may
/// swap in a more authoritative date or attach a reference number through the
/// consuming `with_*` methods before the record is appended to a result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    date: String,
    description: String,
    amount: Decimal,
    currency: String,
    category: Option<String>,
    /// Raw secondary-currency line, e.g. `-415.00 THB`
    foreign_amount: Option<String>,
    /// Backend reference number, when a detail view or attribute supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
}

/// Identity tuple used for duplicate collapsing: `(date, description, amount, currency)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TransactionKey {
    pub date: String,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
}

impl Transaction {
    /// Create a new transaction with required fields
    pub fn new(
        date: impl Into<String>,
        description: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            amount,
            currency: currency.into(),
            category: None,
            foreign_amount: None,
            reference: None,
        }
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn with_foreign_amount(mut self, foreign_amount: Option<String>) -> Self {
        self.foreign_amount = foreign_amount;
        self
    }

    /// Replace the date with one from a more authoritative source
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn foreign_amount(&self) -> Option<&str> {
        self.foreign_amount.as_deref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// Money leaving the account
    pub fn is_spending(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// The `(date, description, amount, currency)` identity tuple
    pub fn key(&self) -> TransactionKey {
        TransactionKey {
            date: self.date.clone(),
            description: self.description.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
        }
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.date == other.date
            && self.description == other.description
            && self.amount == other.amount
            && self.currency == other.currency
    }
}

impl Eq for Transaction {}

impl Hash for Transaction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.date.hash(state);
        self.description.hash(state);
        self.amount.hash(state);
        self.currency.hash(state);
    }
}
