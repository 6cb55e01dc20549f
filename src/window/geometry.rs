//! Window rectangles in logical pixels.

use crate::error::{Result, ShellError};
use serde::{Deserialize, Serialize};

/// Axis-aligned window rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square of side `size` centered on `(cx, cy)`.
    #[must_use]
    pub fn centered_square(cx: f64, cy: f64, size: f64) -> Self {
        Self::new(cx - size / 2.0, cy - size / 2.0, size, size)
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Returns `self` if every component is finite.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Geometry`] for NaN or infinite components.
    pub fn validated(self) -> Result<Self> {
        if self.is_finite() {
            Ok(self)
        } else {
            Err(ShellError::Geometry(format!(
                "non-finite bounds ({}, {}, {}x{})",
                self.x, self.y, self.width, self.height
            )))
        }
    }

    /// Same origin, different size.
    #[must_use]
    pub fn with_size(self, width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }
}

/// Placement of the main window in the lower-right corner of `work_area`.
///
/// The window is square, `floor(work_area.width / width_divisor)` wide, and
/// sits `margin` pixels from the right and bottom edges.
#[must_use]
pub fn main_window_bounds(work_area: &Bounds, width_divisor: f64, margin: f64) -> Bounds {
    let size = (work_area.width / width_divisor).floor();
    Bounds::new(
        work_area.x + work_area.width - size - margin,
        work_area.y + work_area.height - size - margin,
        size,
        size,
    )
}

/// Window of `width`×`height` centered in `work_area`.
#[must_use]
pub fn centered_in(work_area: &Bounds, width: f64, height: f64) -> Bounds {
    let (cx, cy) = work_area.center();
    Bounds::new(
        (cx - width / 2.0).round(),
        (cy - height / 2.0).round(),
        width,
        height,
    )
}
