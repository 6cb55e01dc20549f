//! Radial placement of satellite (menu) windows around the main window.
//!
//! Satellites sit on an arc centered on the main window and opened toward
//! the center of the work area, so the fan always points into the screen.

use crate::config::WindowConfig;
use crate::window::Bounds;
use std::f64::consts::PI;

/// Fan geometry parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FanParams {
    /// Distance from the main window center to each satellite center.
    pub radius: f64,
    /// Total arc, in radians.
    pub spread: f64,
    /// Side of each square satellite window.
    pub satellite_size: f64,
}

impl Default for FanParams {
    fn default() -> Self {
        Self {
            radius: 225.0,
            spread: 2.0 * PI / 3.0,
            satellite_size: 100.0,
        }
    }
}

impl From<&WindowConfig> for FanParams {
    fn from(config: &WindowConfig) -> Self {
        Self {
            radius: config.fan_radius,
            spread: config.fan_spread_degrees.to_radians(),
            satellite_size: f64::from(config.satellite_size),
        }
    }
}

/// Computed position of one satellite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub index: usize,
    /// Angle of the satellite center around the main center, in radians.
    pub angle: f64,
    pub bounds: Bounds,
}

/// Compute `n` satellite placements around `main_center`.
///
/// The result may contain non-finite bounds when the inputs are not finite;
/// callers validate each placement before applying it.
#[must_use]
pub fn layout(main_center: (f64, f64), work_area: &Bounds, n: usize, params: &FanParams) -> Vec<Placement> {
    if n == 0 {
        return Vec::new();
    }

    let (cx, cy) = main_center;
    let (screen_cx, screen_cy) = work_area.center();
    let dx = screen_cx - cx;
    let dy = screen_cy - cy;
    let angle_to_center = if dx.is_finite() && dy.is_finite() {
        dy.atan2(dx)
    } else {
        0.0
    };

    let half = params.spread / 2.0;
    let start = angle_to_center - half;
    let end = angle_to_center + half;
    let step = if n > 1 {
        (end - start) / (n - 1) as f64
    } else {
        0.0
    };

    (0..n)
        .map(|index| {
            let angle = start + step * index as f64;
            let sx = cx + params.radius * angle.cos();
            let sy = cy + params.radius * angle.sin();
            Placement {
                index,
                angle,
                bounds: Bounds::centered_square(sx, sy, params.satellite_size),
            }
        })
        .collect()
}
