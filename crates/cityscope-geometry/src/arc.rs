//! Elevated arc connectors.
//!
//! Converts origin/destination line pairs into sampled 3D parabolic
//! paths with a color gradient. Only the pure geometry lives here; the
//! engine holds the resulting [`ArcPlan`] until the external 3D
//! rendering context exists, then hands it to the backend.

use cityscope_core::{CityscopeError, FeatureCollection, Geometry, Result};
use glam::{DVec3, Vec3};

/// Number of intervals per arc; every path has `ARC_INTERVAL + 1`
/// waypoints.
pub const ARC_INTERVAL: usize = 20;

/// Visual parameters of an arc layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcStyle {
    /// Gradient color at the origin.
    pub start_color: Vec3,
    /// Gradient color at the destination.
    pub end_color: Vec3,
    /// Line width.
    pub width: f64,
    /// Line opacity; zero is a valid configured value.
    pub opacity: f64,
}

impl Default for ArcStyle {
    fn default() -> Self {
        Self {
            start_color: Vec3::ONE,
            end_color: Vec3::ONE,
            width: 2.0,
            opacity: 0.5,
        }
    }
}

/// One sampled parabolic path.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcPath {
    /// Waypoints as `(lng, lat, elevation)`.
    pub positions: Vec<DVec3>,
}

/// The prepared, render-ready description of an arc layer.
///
/// Pure output of [`prepare`]; materialization against the rendering
/// context happens later and elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcPlan {
    pub paths: Vec<ArcPath>,
    /// Per-waypoint gradient colors, `ARC_INTERVAL + 1` entries.
    pub gradient: Vec<Vec3>,
    pub width: f64,
    pub opacity: f64,
}

impl ArcPlan {
    /// Returns true if no input line produced a path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Samples every 2-point line of `data` into a parabolic path.
///
/// Elevation at step `j` is `sin(PI * j / ARC_INTERVAL)` of the peak,
/// and the peak scales with the geodesic "size" of the hop:
/// `sqrt(|dlng * dlat|) * elevation_factor`. Features that are not
/// lines with at least two points are skipped.
#[must_use]
pub fn prepare(data: &FeatureCollection, style: &ArcStyle, elevation_factor: f64) -> ArcPlan {
    let paths = data
        .features
        .iter()
        .filter_map(|feature| match &feature.geometry {
            Geometry::LineString(line) if line.0.len() >= 2 => {
                Some(sample_path(line.0[0].x_y(), line.0[1].x_y(), elevation_factor))
            }
            _ => None,
        })
        .collect();

    ArcPlan {
        paths,
        gradient: gradient_steps(style.start_color, style.end_color, ARC_INTERVAL + 1),
        width: style.width,
        opacity: style.opacity,
    }
}

fn sample_path(origin: (f64, f64), destination: (f64, f64), elevation_factor: f64) -> ArcPath {
    let dlng = destination.0 - origin.0;
    let dlat = destination.1 - origin.1;
    let max_elevation = (dlng * dlat).abs().sqrt() * elevation_factor;

    #[allow(clippy::cast_precision_loss)]
    let positions = (0..=ARC_INTERVAL)
        .map(|j| {
            let t = j as f64 / ARC_INTERVAL as f64;
            DVec3::new(
                origin.0 + dlng * t,
                origin.1 + dlat * t,
                (std::f64::consts::PI * t).sin() * max_elevation,
            )
        })
        .collect();
    ArcPath { positions }
}

/// Interpolates a color gradient with `steps` entries from `start` to
/// `end` inclusive.
#[must_use]
pub fn gradient_steps(start: Vec3, end: Vec3, steps: usize) -> Vec<Vec3> {
    debug_assert!(steps >= 2);
    #[allow(clippy::cast_precision_loss)]
    (0..steps)
        .map(|i| start.lerp(end, i as f32 / (steps - 1) as f32))
        .collect()
}

/// Parses a `#rrggbb` hex color into normalized RGB.
pub fn parse_hex_color(text: &str) -> Result<Vec3> {
    let digits = text
        .strip_prefix('#')
        .filter(|d| d.len() == 6 && d.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| CityscopeError::InvalidColor(text.to_string()))?;

    let channel = |range| {
        u8::from_str_radix(&digits[range], 16)
            .map(|v| f32::from(v) / 255.0)
            .map_err(|_| CityscopeError::InvalidColor(text.to_string()))
    };
    Ok(Vec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cityscope_core::Feature;
    use geo::{coord, LineString};

    fn hop(from: (f64, f64), to: (f64, f64)) -> Feature {
        Feature::new(Geometry::LineString(LineString::new(vec![
            coord! { x: from.0, y: from.1 },
            coord! { x: to.0, y: to.1 },
        ])))
    }

    #[test]
    fn test_elevation_profile() {
        let data = FeatureCollection::new(vec![hop((121.50, 25.00), (121.60, 25.08))]);
        let plan = prepare(&data, &ArcStyle::default(), 80_000.0);
        assert_eq!(plan.paths.len(), 1);

        let positions = &plan.paths[0].positions;
        assert_eq!(positions.len(), ARC_INTERVAL + 1);

        let max_elevation = (0.10_f64 * 0.08).abs().sqrt() * 80_000.0;
        // Grounded at both ends, sine peak at the midpoint.
        assert!(positions[0].z.abs() < 1e-9);
        assert!(positions[ARC_INTERVAL].z.abs() < 1e-6);
        assert!((positions[ARC_INTERVAL / 2].z - max_elevation).abs() < 1e-6);
        // Waypoints walk the straight lng/lat path.
        assert!((positions[5].x - (121.50 + 0.10 * 0.25)).abs() < 1e-9);
        assert!((positions[5].y - (25.00 + 0.08 * 0.25)).abs() < 1e-9);
    }

    #[test]
    fn test_non_line_features_skipped() {
        let mut data = FeatureCollection::new(vec![hop((0.0, 0.0), (1.0, 1.0))]);
        data.features
            .push(Feature::new(Geometry::Point(geo::Point::new(0.5, 0.5))));
        let plan = prepare(&data, &ArcStyle::default(), 80_000.0);
        assert_eq!(plan.paths.len(), 1);
    }

    #[test]
    fn test_gradient_endpoints_and_length() {
        let red = Vec3::new(1.0, 0.0, 0.0);
        let blue = Vec3::new(0.0, 0.0, 1.0);
        let gradient = gradient_steps(red, blue, ARC_INTERVAL + 1);
        assert_eq!(gradient.len(), 21);
        assert!((gradient[0] - red).length() < 1e-6);
        assert!((gradient[20] - blue).length() < 1e-6);
        // Midpoint mixes both ends equally.
        assert!((gradient[10] - Vec3::new(0.5, 0.0, 0.5)).length() < 1e-6);
    }

    #[test]
    fn test_parse_hex_color() {
        assert!((parse_hex_color("#ffffff").unwrap() - Vec3::ONE).length() < 1e-6);
        let teal = parse_hex_color("#008080").unwrap();
        assert!((teal - Vec3::new(0.0, 128.0 / 255.0, 128.0 / 255.0)).length() < 1e-6);

        assert!(parse_hex_color("ffffff").is_err());
        assert!(parse_hex_color("#ggg").is_err());
        assert!(parse_hex_color("#12345").is_err());
    }
}
