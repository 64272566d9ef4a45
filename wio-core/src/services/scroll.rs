//! Scroll driver - reveals the next stretch of the transaction list

use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{ScrapeSettings, ScrollMode};
use crate::domain::result::Result;
use crate::domain::Swipe;
use crate::ports::UiTreeAccessor;
use crate::services::visibility::Candidate;

/// Whether a gesture was delivered. Says nothing about new content appearing;
/// the next discovery pass decides that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    Advanced,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct ScrollDriver {
    mode: ScrollMode,
    start: f64,
    end: f64,
    duration: Duration,
    settle: Duration,
}

impl ScrollDriver {
    pub fn new(settings: &ScrapeSettings) -> Self {
        Self {
            mode: settings.scroll_mode,
            start: settings.swipe_start,
            end: settings.swipe_end,
            duration: settings.swipe_duration(),
            settle: settings.settle_delay(),
        }
    }

    /// Issue one gesture, then wait for the list to settle.
    ///
    /// Gesture failures are logged and reported as `Unchanged`; only a lost
    /// session is returned as an error.
    pub fn advance<A: UiTreeAccessor>(
        &self,
        accessor: &A,
        visible: &[Candidate<A::Element>],
    ) -> Result<ScrollOutcome> {
        let result = match (self.mode, visible) {
            (ScrollMode::Element, [first, .., last]) => {
                debug!(from_y = last.rect.y, to_y = first.rect.y, "element scroll");
                accessor.scroll(&last.element, &first.element, self.duration)
            }
            (ScrollMode::Element, _) => {
                debug!("not enough visible rows for element scroll, using swipe");
                self.swipe(accessor)
            }
            (ScrollMode::Swipe, _) => self.swipe(accessor),
        };

        let outcome = match result {
            Ok(()) => ScrollOutcome::Advanced,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "scroll gesture failed");
                ScrollOutcome::Unchanged
            }
        };

        if !self.settle.is_zero() {
            thread::sleep(self.settle);
        }

        Ok(outcome)
    }

    fn swipe<A: UiTreeAccessor>(&self, accessor: &A) -> Result<()> {
        let viewport = accessor.viewport_size()?;
        let x = viewport.center_x();
        let gesture = Swipe {
            start_x: x,
            start_y: viewport.y_at(self.start),
            end_x: x,
            end_y: viewport.y_at(self.end),
            duration_ms: self.duration.as_millis() as u64,
        };
        debug!(?gesture, "swipe");
        accessor.swipe(&gesture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::demo::{DemoFeed, DemoUiTree};
    use crate::domain::result::Error;
    use crate::domain::Viewport;
    use crate::services::visibility::VisibilityFilter;
    use tracing_test::traced_test;

    fn settings(mode: ScrollMode) -> ScrapeSettings {
        ScrapeSettings {
            scroll_mode: mode,
            ..ScrapeSettings::default().without_delays()
        }
    }

    fn candidates(tree: &DemoUiTree) -> Vec<Candidate<crate::adapters::demo::DemoElement>> {
        let elements = tree.find_all("//XCUIElementTypeStaticText").unwrap();
        VisibilityFilter::new("AED").filter(elements, tree.viewport_size().unwrap())
    }

    #[test]
    fn test_swipe_uses_screen_fractions() {
        let tree = DemoUiTree::new(DemoFeed::sample(), Viewport::new(390, 844));
        let driver = ScrollDriver::new(&settings(ScrollMode::Swipe));

        assert_eq!(driver.advance(&tree, &[]).unwrap(), ScrollOutcome::Advanced);

        let swipes = tree.swipes();
        assert_eq!(swipes.len(), 1);
        assert_eq!(swipes[0].start_x, 195);
        assert_eq!(swipes[0].start_y, 633);
        assert_eq!(swipes[0].end_y, 338);
    }

    #[test]
    fn test_element_mode_drags_last_onto_first() {
        let tree = DemoUiTree::new(DemoFeed::sample(), Viewport::new(390, 844));
        let driver = ScrollDriver::new(&settings(ScrollMode::Element));
        let visible = candidates(&tree);
        assert!(visible.len() >= 2);

        let before = tree.offset();
        assert_eq!(driver.advance(&tree, &visible).unwrap(), ScrollOutcome::Advanced);
        assert!(tree.swipes().is_empty());
        assert_eq!(tree.offset() - before, visible.last().unwrap().rect.y - visible[0].rect.y);
    }

    #[test]
    fn test_element_mode_falls_back_to_swipe() {
        let tree = DemoUiTree::new(DemoFeed::sample(), Viewport::new(390, 844));
        let driver = ScrollDriver::new(&settings(ScrollMode::Element));
        let visible = candidates(&tree);

        driver.advance(&tree, &visible[..1]).unwrap();
        assert_eq!(tree.swipes().len(), 1);
    }

    #[test]
    #[traced_test]
    fn test_gesture_failure_is_unchanged() {
        let tree = DemoUiTree::new(DemoFeed::sample(), Viewport::new(390, 844)).failing_gestures();
        let driver = ScrollDriver::new(&settings(ScrollMode::Swipe));

        assert_eq!(driver.advance(&tree, &[]).unwrap(), ScrollOutcome::Unchanged);
        assert!(logs_contain("scroll gesture failed"));
    }

    #[test]
    fn test_lost_session_propagates() {
        let tree = DemoUiTree::new(DemoFeed::sample(), Viewport::new(390, 844)).lose_session_after(0);
        let driver = ScrollDriver::new(&settings(ScrollMode::Swipe));

        let err = driver.advance(&tree, &[]).unwrap_err();
        assert!(matches!(err, Error::Session(_)));
    }
}
