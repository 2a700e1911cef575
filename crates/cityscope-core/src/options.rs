//! Configuration options for the layer engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable constants of the derived-geometry pipeline.
///
/// The defaults reproduce the values tuned for the Taipei service area.
/// They are configuration, not invariants: retargeting the engine to a
/// different region means re-tuning the grid step and elevation factor
/// while keeping the same formula shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Regular grid step for isoline interpolation, in coordinate units.
    pub isoline_grid_step: f64,

    /// Scalar-field value breaks to contour at.
    pub isoline_breaks: Vec<f64>,

    /// Multiplier mapping hop size to peak arc elevation.
    pub arc_elevation_factor: f64,

    /// Delay before deferred arc construction, desktop-class devices.
    pub arc_build_delay_ms: u64,

    /// Delay before deferred arc construction, mobile-class devices.
    pub arc_build_delay_mobile_ms: u64,

    /// Whether the hosting device is mobile-class.
    pub mobile: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            isoline_grid_step: 0.001,
            // Every even value from 40 to 74 inclusive.
            isoline_breaks: (0..=17).map(|i| f64::from(i * 2 + 40)).collect(),
            arc_elevation_factor: 80_000.0,
            arc_build_delay_ms: 500,
            arc_build_delay_mobile_ms: 2000,
            mobile: false,
        }
    }
}

impl EngineOptions {
    /// The advisory delay to apply before materializing deferred arc
    /// layers, accommodating slower devices.
    #[must_use]
    pub fn arc_build_delay(&self) -> Duration {
        let ms = if self.mobile {
            self.arc_build_delay_mobile_ms
        } else {
            self.arc_build_delay_ms
        };
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_breaks() {
        let options = EngineOptions::default();
        assert_eq!(options.isoline_breaks.len(), 18);
        assert!((options.isoline_breaks[0] - 40.0).abs() < f64::EPSILON);
        assert!((options.isoline_breaks[17] - 74.0).abs() < f64::EPSILON);
        for pair in options.isoline_breaks.windows(2) {
            assert!((pair[1] - pair[0] - 2.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_arc_delay_by_device_class() {
        let mut options = EngineOptions::default();
        assert_eq!(options.arc_build_delay(), Duration::from_millis(500));
        options.mobile = true;
        assert_eq!(options.arc_build_delay(), Duration::from_millis(2000));
    }
}
