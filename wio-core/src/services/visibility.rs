//! Visibility filter - which attached elements are really on screen
//!
//! The accessibility tree keeps rows that scrolled away attached, so a query
//! returns far more than the user sees. An element counts as a candidate only
//! when all of these hold, checked in order:
//!
//! 1. `visible` is `"true"`
//! 2. its text contains the currency marker
//! 3. `y > 0` and `height > 0`
//! 4. `0 <= x < viewport.width` and `y < viewport.height`

use tracing::trace;

use crate::domain::result::Result;
use crate::domain::{Rect, Viewport};
use crate::ports::ElementAttributes;

/// An element that passed the filter, with the attributes read while checking it
#[derive(Debug)]
pub struct Candidate<E> {
    pub element: E,
    pub text: String,
    pub rect: Rect,
}

#[derive(Debug, Clone)]
pub struct VisibilityFilter {
    marker: String,
}

impl VisibilityFilter {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Keep on-screen transaction candidates, preserving input order.
    /// An element whose attributes cannot be read is dropped.
    pub fn filter<E: ElementAttributes>(
        &self,
        elements: impl IntoIterator<Item = E>,
        viewport: Viewport,
    ) -> Vec<Candidate<E>> {
        elements
            .into_iter()
            .enumerate()
            .filter_map(|(idx, element)| match self.inspect(&element, viewport) {
                Ok(Some((text, rect))) => Some(Candidate { element, text, rect }),
                Ok(None) => None,
                Err(e) => {
                    trace!(idx, error = %e, "dropping unreadable element");
                    None
                }
            })
            .collect()
    }

    fn inspect<E: ElementAttributes>(
        &self,
        element: &E,
        viewport: Viewport,
    ) -> Result<Option<(String, Rect)>> {
        if !element.is_visible()? {
            return Ok(None);
        }

        let text = element.text()?;
        if !text.contains(self.marker.as_str()) {
            return Ok(None);
        }

        let rect = element.rect()?;
        if rect.y <= 0 || rect.height <= 0 {
            return Ok(None);
        }

        if !within_viewport(&rect, viewport) {
            return Ok(None);
        }

        Ok(Some((text, rect)))
    }
}

fn within_viewport(rect: &Rect, viewport: Viewport) -> bool {
    rect.x >= 0 && rect.x < viewport.width && rect.y < viewport.height
}
