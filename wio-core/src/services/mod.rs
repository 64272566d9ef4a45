//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on one step of a scrape: filtering, dating, de-duplicating,
//! scrolling, reading details, orchestrating and exporting.

pub mod dates;
pub mod dedup;
pub mod detail;
pub mod export;
mod scrape;
pub mod scroll;
pub mod visibility;

pub use dates::{SectionDates, SectionHeader};
pub use dedup::{Boundary, DeduplicationTracker, Identity};
pub use detail::DetailReader;
pub use export::{read_export, CsvExporter, ExportedRow};
pub use scrape::{ScrapeOutcome, ScrapeService, StopReason};
pub use scroll::{ScrollDriver, ScrollOutcome};
pub use visibility::{Candidate, VisibilityFilter};
