use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle with inclusive edges, used for selections and
/// pattern bounding boxes. `right < left` never occurs in a valid rect.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Rect {
    pub fn new(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self { left, top, right, bottom }
    }

    /// Single-cell rectangle.
    pub fn cell(x: i64, y: i64) -> Self {
        Self {
            left: x,
            top: y,
            right: x,
            bottom: y,
        }
    }

    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top + 1
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.left <= other.left && self.right >= other.right && self.top <= other.top && self.bottom >= other.bottom
    }

    /// Grow this rect so it covers `x, y`.
    pub fn include(&mut self, x: i64, y: i64) {
        if x < self.left {
            self.left = x;
        }
        if x > self.right {
            self.right = x;
        }
        if y < self.top {
            self.top = y;
        }
        if y > self.bottom {
            self.bottom = y;
        }
    }

    /// True if every edge fits the serializer's 32-bit cell domain.
    pub fn fits_i32(&self) -> bool {
        let limit = i64::from(i32::MAX);
        let lower = i64::from(i32::MIN);
        self.left >= lower && self.top >= lower && self.right <= limit && self.bottom <= limit
    }

    /// The rectangle occupied after a quarter-turn about this rect's center,
    /// width and height swapped (matches how a selection follows a rotation).
    pub fn rotated(&self) -> Rect {
        // keep the center as close as integer math allows
        let dx = (self.width() - self.height()) / 2;
        let dy = (self.height() - self.width()) / 2;
        let left = self.left + dx;
        let top = self.top + dy;
        Rect {
            left,
            top,
            right: left + self.height() - 1,
            bottom: top + self.width() - 1,
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})..({},{})", self.left, self.top, self.right, self.bottom)
    }
}
