//! CSV export of scraped transactions
//!
//! Columns are `date,description,amount,currency,category`. Amounts are written
//! with `Decimal`'s own formatting so they read back textually unchanged.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ExportSettings;
use crate::domain::result::{Error, Result};
use crate::domain::Transaction;
use crate::ports::TransactionExporter;

/// One CSV line as written
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    date: &'a str,
    description: &'a str,
    amount: String,
    currency: &'a str,
    category: &'a str,
}

impl<'a> From<&'a Transaction> for CsvRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            date: tx.date(),
            description: tx.description(),
            amount: tx.amount().to_string(),
            currency: tx.currency(),
            category: tx.category().unwrap_or_default(),
        }
    }
}

/// Raw line as read back; amounts stay strings until parsed exactly
#[derive(Debug, Deserialize)]
struct RawRow {
    date: String,
    description: String,
    amount: String,
    currency: String,
    #[serde(default)]
    category: String,
}

/// A transaction read back from an export file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedRow {
    pub date: String,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub category: Option<String>,
}

pub struct CsvExporter {
    output_dir: PathBuf,
    file_prefix: String,
}

impl CsvExporter {
    pub fn new(settings: &ExportSettings) -> Self {
        Self {
            output_dir: settings.output_dir.clone(),
            file_prefix: settings.file_prefix.clone(),
        }
    }

    /// `{prefix}_YYYYMMDD_HHMMSS.csv` in local time
    pub fn default_filename(&self) -> String {
        format!("{}_{}.csv", self.file_prefix, Local::now().format("%Y%m%d_%H%M%S"))
    }
}

impl TransactionExporter for CsvExporter {
    fn export(&self, transactions: &[Transaction], filename: Option<&str>) -> Result<PathBuf> {
        let filename = match filename {
            Some(name) if name.trim().is_empty() => {
                return Err(Error::Export("filename cannot be empty".to_string()));
            }
            Some(name) => name.to_string(),
            None => self.default_filename(),
        };

        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(filename);

        let mut writer = csv::Writer::from_path(&path)?;
        for tx in transactions {
            writer.serialize(CsvRow::from(tx))?;
        }
        if transactions.is_empty() {
            // serialize() only emits the header alongside the first record
            writer.write_record(["date", "description", "amount", "currency", "category"])?;
        }
        writer.flush()?;

        info!(path = %path.display(), count = transactions.len(), "Exported transactions");
        Ok(path)
    }
}

/// Read an export file back, in file order
pub fn read_export(path: &Path) -> Result<Vec<ExportedRow>> {
    let mut reader = csv::Reader::from_path(path)?;

    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<RawRow>().enumerate() {
        let raw = record?;
        let amount = Decimal::from_str(raw.amount.trim()).map_err(|e| {
            Error::Export(format!("row {}: invalid amount {:?}: {}", idx + 1, raw.amount, e))
        })?;

        rows.push(ExportedRow {
            date: raw.date,
            description: raw.description,
            amount,
            currency: raw.currency,
            category: Some(raw.category).filter(|c| !c.is_empty()),
        });
    }
    Ok(rows)
}
