//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Appium WebDriver client for `UiTreeAccessor` (real device)
//! - Demo in-memory tree for `UiTreeAccessor` (tests and `--demo`)

pub mod appium;
pub mod demo;

#[cfg(test)]
pub mod appium_mock;
