//! Day-section dates for transaction rows
//!
//! The list is grouped under headers like `SUN, 5 OCTOBER`. A row belongs to
//! the nearest header at or above it. When no such header is attached (the
//! list recycled it away), the row keeps the date it had in the previous batch,
//! or else continues the date of the row above it.
//!
//! Dates must come out the same for a row in every batch it appears in, since
//! the date is part of the tuple identity.

use std::collections::HashMap;

/// A section header's text and vertical position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub y: i64,
    pub title: String,
}

#[derive(Debug, Default)]
pub struct SectionDates {
    previous: HashMap<String, String>,
    last: String,
}

impl SectionDates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a date to each `(y, row text)` of one batch, top to bottom
    pub fn assign<'a>(
        &mut self,
        headers: &[SectionHeader],
        rows: impl IntoIterator<Item = (i64, &'a str)>,
    ) -> Vec<String> {
        let mut current = self.last.clone();
        let mut batch = HashMap::new();
        let mut dates = Vec::new();

        for (y, text) in rows {
            let nearest = headers
                .iter()
                .filter(|header| header.y <= y)
                .max_by_key(|header| header.y);

            let date = match nearest {
                Some(header) => header.title.clone(),
                None => self.previous.get(text).cloned().unwrap_or_else(|| current.clone()),
            };

            current = date.clone();
            batch.insert(text.to_string(), date.clone());
            dates.push(date);
        }

        if !dates.is_empty() {
            self.last = current;
            self.previous = batch;
        }
        dates
    }

    pub fn reset(&mut self) {
        self.previous.clear();
        self.last.clear();
    }
}
