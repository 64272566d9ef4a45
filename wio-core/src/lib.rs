//! Wio Core - spending export from the Wio banking app
//!
//! This crate implements the core logic following hexagonal architecture:
//!
//! - **domain**: Transactions, amount and record parsing, geometry
//! - **ports**: Trait definitions for the UI tree and the exporter
//! - **services**: Visibility filtering, de-duplication, scrolling, scrape orchestration, CSV export
//! - **adapters**: Concrete UI trees (Appium WebDriver, in-memory demo)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};

use tracing::warn;

use adapters::appium::AppiumSession;
use adapters::demo::{DemoFeed, DemoUiTree};
use config::Config;
use ports::{TransactionExporter, UiTreeAccessor};
use services::{CsvExporter, ScrapeOutcome, ScrapeService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{Transaction, TransactionKey, Viewport};
pub use services::StopReason;

/// Screen size the demo tree pretends to have (iPhone 15)
pub const DEMO_VIEWPORT: Viewport = Viewport {
    width: 390,
    height: 844,
};

/// A finished scrape and where its export went
#[derive(Debug)]
pub struct ScrapeReport {
    pub outcome: ScrapeOutcome,
    /// `None` when there was nothing to export
    pub output: Option<PathBuf>,
}

/// Main context for Wio operations
///
/// Holds the effective configuration and builds the services and UI trees a
/// scrape needs from it.
pub struct WioContext {
    pub config: Config,
    pub exporter: CsvExporter,
}

impl WioContext {
    /// Load configuration from `wio_dir` and build the context
    pub fn new(wio_dir: &Path) -> anyhow::Result<Self> {
        let config = Config::load(wio_dir)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        let exporter = CsvExporter::new(&config.export);
        Self { config, exporter }
    }

    pub fn scrape_service(&self) -> ScrapeService {
        ScrapeService::new(self.config.scrape.clone(), self.config.locators.clone())
    }

    /// Open an Appium session on the configured device
    pub fn connect(&self) -> Result<AppiumSession> {
        AppiumSession::connect(&self.config.appium)
    }

    /// The sample feed on a simulated screen
    pub fn demo_tree(&self) -> DemoUiTree {
        DemoUiTree::new(DemoFeed::sample(), DEMO_VIEWPORT)
    }

    /// Scrape everything reachable from `accessor` and export the result.
    /// An empty result is not exported.
    pub fn scrape_and_export<A: UiTreeAccessor>(
        &self,
        accessor: &A,
        filename: Option<&str>,
    ) -> Result<ScrapeReport> {
        let outcome = self.scrape_service().run(accessor)?;

        if outcome.transactions.is_empty() {
            warn!("No spending transactions found");
            return Ok(ScrapeReport {
                outcome,
                output: None,
            });
        }

        let output = self.exporter.export(&outcome.transactions, filename)?;
        Ok(ScrapeReport {
            outcome,
            output: Some(output),
        })
    }
}
