use serde::{Deserialize, Serialize};

/// Where a view is looking and how fast it steps. `mag` is the zoom level
/// (powers of two, negative means zoomed out); `base` and `expo` together
/// give the step size as `base^expo`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: i64,
    pub y: i64,
    pub mag: i32,
    pub base: u32,
    pub expo: i32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            mag: 0,
            base: 2,
            expo: 0,
        }
    }
}
