//! Detail view reader - reference numbers behind a transaction row
//!
//! Opening a row is the only place the app shows a stable reference. The reader
//! clicks the row, reads what it needs and always navigates back, even when the
//! read failed, so the list is left where it was.

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::config::{Locators, ScrapeSettings};
use crate::domain::result::Result;
use crate::domain::DetailView;
use crate::ports::{ElementAttributes, UiTreeAccessor};

#[derive(Debug, Clone)]
pub struct DetailReader {
    reference_xpath: String,
    date_xpath: String,
    settle: Duration,
}

impl DetailReader {
    pub fn new(locators: &Locators, settings: &ScrapeSettings) -> Self {
        Self {
            reference_xpath: locators.reference_xpath.clone(),
            date_xpath: locators.detail_date_xpath.clone(),
            settle: settings.settle_delay(),
        }
    }

    /// Open `element`'s detail view, read it and go back
    pub fn read<A: UiTreeAccessor>(&self, accessor: &A, element: &A::Element) -> Result<DetailView> {
        accessor.open_detail(element)?;
        self.pause();

        let view = self.read_open_view(accessor);
        let back = accessor.navigate_back();
        self.pause();

        let view = view?;
        back?;
        debug!(reference = ?view.reference, date = ?view.date, "read detail view");
        Ok(view)
    }

    fn read_open_view<A: UiTreeAccessor>(&self, accessor: &A) -> Result<DetailView> {
        let reference = first_text(accessor, &self.reference_xpath)?
            .as_deref()
            .and_then(extract_reference);

        let date = if self.date_xpath.is_empty() {
            None
        } else {
            first_text(accessor, &self.date_xpath)?
                .and_then(|text| text.lines().map(str::trim).find(|l| !l.is_empty()).map(String::from))
        };

        Ok(DetailView { reference, date })
    }

    fn pause(&self) {
        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }
    }
}

fn first_text<A: UiTreeAccessor>(accessor: &A, xpath: &str) -> Result<Option<String>> {
    match accessor.find_all(xpath)?.first() {
        Some(element) => Ok(Some(element.text()?)),
        None => Ok(None),
    }
}

/// Pull the reference out of label text such as `Reference number\nAE-5002`
/// or `Reference: AE-5002`.
///
/// Takes the last non-empty line, the part after a colon if any, and finally
/// the last word when a label is still attached.
pub fn extract_reference(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).rev().find(|l| !l.is_empty())?;
    let value = line.rsplit(':').next().unwrap_or(line).trim();
    let value = value.split_whitespace().last()?;

    if value.eq_ignore_ascii_case("reference") || value.eq_ignore_ascii_case("number") {
        return None;
    }
    Some(value.to_string())
}
