//! Exporter port - where finished scrape results go

use std::path::PathBuf;

use crate::domain::result::Result;
use crate::domain::Transaction;

/// Writes a finished, deduplicated result sequence somewhere durable
pub trait TransactionExporter {
    /// Export in order; `filename` overrides the default timestamped name.
    /// Returns the path written.
    fn export(&self, transactions: &[Transaction], filename: Option<&str>) -> Result<PathBuf>;
}
