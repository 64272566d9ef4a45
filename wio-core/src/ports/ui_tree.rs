//! UI tree port - capability interface onto a live accessibility tree
//!
//! The scrape loop only ever talks to these traits. The Appium adapter speaks
//! WebDriver to a real device; the demo adapter replays an in-memory feed.

use std::time::Duration;

use crate::domain::result::{Error, Result};
use crate::domain::{Rect, Swipe, Viewport};

/// Attribute probing on one opaque element handle
///
/// Every call may fail transiently (`Error::StaleElement`,
/// `Error::AttributeUnavailable`) when the element detaches mid-read.
pub trait ElementAttributes {
    /// Raw attribute value, `None` when the backend reports null
    fn attribute(&self, name: &str) -> Result<Option<String>>;

    /// Location and size
    fn rect(&self) -> Result<Rect>;

    fn click(&self) -> Result<()>;

    fn is_visible(&self) -> Result<bool> {
        Ok(self.attribute("visible")?.as_deref() == Some("true"))
    }

    /// Displayed text: `value` when non-empty, else `label`, else empty
    fn text(&self) -> Result<String> {
        if let Some(value) = self.attribute("value")?.filter(|v| !v.is_empty()) {
            return Ok(value);
        }
        Ok(self.attribute("label")?.unwrap_or_default())
    }
}

/// Query and gesture interface onto the UI tree
pub trait UiTreeAccessor {
    type Element: ElementAttributes;

    /// All elements currently attached to the tree matching an XPath selector,
    /// in document (top-to-bottom) order
    fn find_all(&self, xpath: &str) -> Result<Vec<Self::Element>>;

    fn viewport_size(&self) -> Result<Viewport>;

    fn swipe(&self, swipe: &Swipe) -> Result<()>;

    /// Drag `from` onto `to`
    fn scroll(&self, from: &Self::Element, to: &Self::Element, duration: Duration) -> Result<()>;

    /// Open the detail view behind a list element
    fn open_detail(&self, element: &Self::Element) -> Result<()> {
        element.click()
    }

    /// Leave a detail view opened by `open_detail`
    fn navigate_back(&self) -> Result<()> {
        Err(Error::Unsupported("navigate back".to_string()))
    }
}
