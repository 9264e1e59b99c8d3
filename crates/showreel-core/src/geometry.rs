use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in CSS pixels, as reported by `getBoundingClientRect`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            right: left + width,
            bottom: top + height,
            left,
        }
    }

    /// Grow the rectangle outward by a margin on each side.
    pub fn expand(&self, margin: &Margin) -> Rect {
        Rect {
            top: self.top - margin.top,
            right: self.right + margin.right,
            bottom: self.bottom + margin.bottom,
            left: self.left - margin.left,
        }
    }

    /// Strict overlap: rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.top < other.bottom
            && self.bottom > other.top
            && self.left < other.right
            && self.right > other.left
    }
}

/// The visible window area (`innerWidth` x `innerHeight`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Per-side margin in pixels, in CSS order (top, right, bottom, left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margin {
    pub fn new(top: f64, right: f64, bottom: f64, left: f64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn uniform(px: f64) -> Self {
        Self::new(px, px, px, px)
    }

    /// Format as an observer `rootMargin` string, e.g. `200px 0px 300px 0px`.
    pub fn to_css(&self) -> String {
        format!(
            "{}px {}px {}px {}px",
            self.top, self.right, self.bottom, self.left
        )
    }
}

impl Default for Margin {
    fn default() -> Self {
        Self::uniform(0.0)
    }
}

/// True if `bounds` intersects the viewport grown by `margin` pixels on all sides.
pub fn in_viewport(bounds: &Rect, viewport: &Viewport, margin: f64) -> bool {
    bounds.intersects(&viewport.rect().expand(&Margin::uniform(margin)))
}
