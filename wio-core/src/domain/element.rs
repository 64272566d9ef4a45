//! Geometry of on-screen elements

use serde::{Deserialize, Serialize};

/// Element bounding box in screen points, as reported by the automation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self { x, y, width, height }
    }
}

/// Visible screen area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: i64,
    pub height: i64,
}

impl Viewport {
    pub fn new(width: i64, height: i64) -> Self {
        Self { width, height }
    }

    /// Absolute y coordinate for a fraction of the screen height
    pub fn y_at(&self, fraction: f64) -> i64 {
        (self.height as f64 * fraction).round() as i64
    }

    pub fn center_x(&self) -> i64 {
        self.width / 2
    }
}

/// A straight one-finger drag between two points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Swipe {
    pub start_x: i64,
    pub start_y: i64,
    pub end_x: i64,
    pub end_y: i64,
    pub duration_ms: u64,
}

/// What a transaction detail view revealed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailView {
    pub reference: Option<String>,
    pub date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_fractions() {
        let viewport = Viewport::new(390, 844);
        assert_eq!(viewport.y_at(0.75), 633);
        assert_eq!(viewport.y_at(0.40), 338);
        assert_eq!(viewport.center_x(), 195);
    }
}
