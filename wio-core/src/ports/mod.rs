//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external collaborators. The scrape loop
//! depends only on these traits, not on concrete implementations.

mod exporter;
mod ui_tree;

pub use exporter::TransactionExporter;
pub use ui_tree::{ElementAttributes, UiTreeAccessor};
