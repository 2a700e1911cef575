//! Isoline extraction from sparse scalar samples.
//!
//! The generator interpolates a scalar field over a regular grid
//! spanning the service boundary's bounding box, then walks the grid
//! with marching squares to extract contour lines at fixed value
//! breaks. Multi-part contours come out of segment chaining as
//! independent simple lines.

use std::collections::HashMap;

use cityscope_core::{Feature, FeatureCollection, Geometry};
use geo::{Coord, LineString, Rect};
use serde_json::json;

use crate::boundary::ServiceBoundary;
use crate::clip::clip_line;

/// One scattered scalar observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarSample {
    pub x: f64,
    pub y: f64,
    pub value: f64,
}

/// A regular grid covering a bounding box at a fixed step.
///
/// Grid coordinates are always computed by multiplying the step by the
/// point's index. Accumulating the step instead would let floating
/// drift change the row/column counts between runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub lng_start: f64,
    pub lat_start: f64,
    pub step: f64,
    /// Points per row (longitude direction).
    pub col_n: usize,
    /// Number of rows (latitude direction).
    pub row_n: usize,
}

impl GridSpec {
    /// Lays a grid over `bbox`, stepping from the min corner while the
    /// coordinate stays `<= max`, inclusive of the end point reached by
    /// stepping.
    #[must_use]
    pub fn from_bbox(bbox: Rect<f64>, step: f64) -> Self {
        Self {
            lng_start: bbox.min().x,
            lat_start: bbox.min().y,
            step,
            col_n: steps_within(bbox.min().x, bbox.max().x, step),
            row_n: steps_within(bbox.min().y, bbox.max().y, step),
        }
    }

    /// Coordinate of the grid point at `(row, col)`.
    #[must_use]
    pub fn point(&self, row: usize, col: usize) -> Coord<f64> {
        Coord {
            x: self.lng_start + col as f64 * self.step,
            y: self.lat_start + row as f64 * self.step,
        }
    }

    /// All grid points in row-major order.
    #[must_use]
    pub fn points(&self) -> Vec<Coord<f64>> {
        let mut points = Vec::with_capacity(self.row_n * self.col_n);
        for row in 0..self.row_n {
            for col in 0..self.col_n {
                points.push(self.point(row, col));
            }
        }
        points
    }
}

/// Number of step-multiples that fit in `[start, end]`.
///
/// The `1e-9` slack keeps an end point that lands exactly on `end` (up
/// to floating error in the division) inside the grid.
fn steps_within(start: f64, end: f64, step: f64) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = ((end - start) / step + 1e-9).floor() as usize;
    whole + 1
}

/// A scattered-data interpolator producing the scalar field.
///
/// Any smooth interpolator works as long as the value at a sample
/// point equals the sample's own value in the noiseless limit.
pub trait ScalarInterpolator {
    /// Interpolates the field value at every target point.
    fn interpolate(&self, samples: &[ScalarSample], targets: &[Coord<f64>]) -> Vec<f64>;
}

/// Inverse-distance weighting.
#[derive(Debug, Clone, Copy)]
pub struct IdwInterpolator {
    /// Distance exponent; 2 is the customary choice.
    pub power: f64,
}

impl Default for IdwInterpolator {
    fn default() -> Self {
        Self { power: 2.0 }
    }
}

impl ScalarInterpolator for IdwInterpolator {
    fn interpolate(&self, samples: &[ScalarSample], targets: &[Coord<f64>]) -> Vec<f64> {
        targets
            .iter()
            .map(|target| {
                let mut weight_sum = 0.0;
                let mut value_sum = 0.0;
                for sample in samples {
                    let dx = target.x - sample.x;
                    let dy = target.y - sample.y;
                    let dist_sq = dx * dx + dy * dy;
                    if dist_sq < 1e-24 {
                        // Sitting on a sample: the field takes its value.
                        return sample.value;
                    }
                    let weight = dist_sq.powf(-self.power / 2.0);
                    weight_sum += weight;
                    value_sum += weight * sample.value;
                }
                value_sum / weight_sum
            })
            .collect()
    }
}

/// Derives the isoline dataset for a collection of point features.
///
/// `key` names the numeric property sampled from each feature. Returns
/// `None` when no feature yields a sample (generation precondition).
#[must_use]
pub fn generate(
    data: &FeatureCollection,
    key: &str,
    boundary: &ServiceBoundary,
    step: f64,
    breaks: &[f64],
    interpolator: &dyn ScalarInterpolator,
) -> Option<FeatureCollection> {
    let samples: Vec<ScalarSample> = data
        .features
        .iter()
        .filter_map(|feature| {
            let (x, y) = feature.point_coords()?;
            let value = feature.number_property(key)?;
            Some(ScalarSample { x, y, value })
        })
        .collect();
    if samples.is_empty() {
        return None;
    }

    let grid = GridSpec::from_bbox(boundary.bbox(), step);
    let field = interpolator.interpolate(&samples, &grid.points());

    let mut features = vec![boundary.to_feature()];
    for &level in breaks {
        for contour in extract_contours(&field, &grid, level) {
            for fragment in clip_line(&contour, boundary) {
                let mut feature = Feature::new(Geometry::LineString(fragment));
                feature.properties.insert("value".to_string(), json!(level));
                features.push(feature);
            }
        }
    }
    Some(FeatureCollection::new(features))
}

/// Extracts the contour polylines of `field` at `level` by marching
/// squares over the grid, chaining cell segments into simple lines.
#[must_use]
pub fn extract_contours(field: &[f64], grid: &GridSpec, level: f64) -> Vec<LineString<f64>> {
    debug_assert_eq!(field.len(), grid.row_n * grid.col_n);
    let mut segments = Vec::new();

    for row in 0..grid.row_n.saturating_sub(1) {
        for col in 0..grid.col_n.saturating_sub(1) {
            cell_segments(field, grid, level, row, col, &mut segments);
        }
    }
    chain_segments(&segments)
}

type Segment = (Coord<f64>, Coord<f64>);

/// Emits the contour segments crossing one grid cell.
///
/// Corner bits follow the usual marching-squares convention
/// (bit set when the corner value is at or above the level); the two
/// ambiguous saddle configurations are resolved with the cell's center
/// average.
#[allow(clippy::many_single_char_names)]
fn cell_segments(
    field: &[f64],
    grid: &GridSpec,
    level: f64,
    row: usize,
    col: usize,
    out: &mut Vec<Segment>,
) {
    let bl = field[row * grid.col_n + col];
    let br = field[row * grid.col_n + col + 1];
    let tr = field[(row + 1) * grid.col_n + col + 1];
    let tl = field[(row + 1) * grid.col_n + col];

    let index = usize::from(bl >= level)
        | usize::from(br >= level) << 1
        | usize::from(tr >= level) << 2
        | usize::from(tl >= level) << 3;
    if index == 0 || index == 15 {
        return;
    }

    let origin = grid.point(row, col);
    let step = grid.step;
    let frac = |a: f64, b: f64| (level - a) / (b - a);

    // Crossing points on the four cell edges.
    let bottom = Coord { x: origin.x + frac(bl, br) * step, y: origin.y };
    let right = Coord { x: origin.x + step, y: origin.y + frac(br, tr) * step };
    let top = Coord { x: origin.x + frac(tl, tr) * step, y: origin.y + step };
    let left = Coord { x: origin.x, y: origin.y + frac(bl, tl) * step };

    match index {
        1 | 14 => out.push((left, bottom)),
        2 | 13 => out.push((bottom, right)),
        3 | 12 => out.push((left, right)),
        4 | 11 => out.push((top, right)),
        6 | 9 => out.push((bottom, top)),
        7 | 8 => out.push((left, top)),
        5 | 10 => {
            let center = (bl + br + tr + tl) * 0.25;
            let high_center = center >= level;
            if (index == 5) == high_center {
                out.push((left, top));
                out.push((bottom, right));
            } else {
                out.push((left, bottom));
                out.push((top, right));
            }
        }
        _ => unreachable!("cases 0 and 15 returned early"),
    }
}

/// Endpoint key with enough precision to identify shared cell-edge
/// crossings without being bitten by the last ulp.
fn endpoint_key(c: Coord<f64>) -> (i64, i64) {
    #[allow(clippy::cast_possible_truncation)]
    ((c.x * 1e9).round() as i64, (c.y * 1e9).round() as i64)
}

/// Joins segments sharing endpoints into maximal polylines.
fn chain_segments(segments: &[Segment]) -> Vec<LineString<f64>> {
    let mut adjacency: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, (a, b)) in segments.iter().enumerate() {
        adjacency.entry(endpoint_key(*a)).or_default().push(i);
        adjacency.entry(endpoint_key(*b)).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut lines = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let (a, b) = segments[start];
        let mut chain: Vec<Coord<f64>> = vec![a, b];

        // Grow forward from the tail, then backward from the head.
        for forward in [true, false] {
            loop {
                let tip = if forward { chain[chain.len() - 1] } else { chain[0] };
                let Some(next) = adjacency
                    .get(&endpoint_key(tip))
                    .and_then(|ids| ids.iter().find(|&&i| !used[i]))
                    .copied()
                else {
                    break;
                };
                used[next] = true;
                let (na, nb) = segments[next];
                let other = if endpoint_key(na) == endpoint_key(tip) { nb } else { na };
                if forward {
                    chain.push(other);
                } else {
                    chain.insert(0, other);
                }
            }
        }
        lines.push(LineString::new(chain));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    #[test]
    fn test_grid_dimensions_are_deterministic() {
        let bbox = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 0.5 });
        let grid = GridSpec::from_bbox(bbox, 0.1);
        assert_eq!(grid.col_n, 11);
        assert_eq!(grid.row_n, 6);
        assert_eq!(grid.points().len(), 66);

        // An end point reached exactly by stepping stays in the grid
        // despite the division rounding.
        let awkward = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 0.3, y: 0.3 });
        let grid = GridSpec::from_bbox(awkward, 0.1);
        assert_eq!(grid.col_n, 4);
    }

    #[test]
    fn test_grid_coordinates_are_index_multiplied() {
        let bbox = Rect::new(coord! { x: 121.0, y: 25.0 }, coord! { x: 121.01, y: 25.01 });
        let grid = GridSpec::from_bbox(bbox, 0.001);
        let p = grid.point(3, 7);
        assert!((p.x - (121.0 + 7.0 * 0.001)).abs() < f64::EPSILON);
        assert!((p.y - (25.0 + 3.0 * 0.001)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_idw_exact_at_samples() {
        let samples = vec![
            ScalarSample { x: 0.0, y: 0.0, value: 40.0 },
            ScalarSample { x: 1.0, y: 0.0, value: 74.0 },
        ];
        let idw = IdwInterpolator::default();
        let values = idw.interpolate(
            &samples,
            &[coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 0.0 }, coord! { x: 0.5, y: 0.0 }],
        );
        assert!((values[0] - 40.0).abs() < 1e-12);
        assert!((values[1] - 74.0).abs() < 1e-12);
        // Between equidistant samples the field averages them.
        assert!((values[2] - 57.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_field_contour_is_single_vertical_line() {
        let grid = GridSpec {
            lng_start: 0.0,
            lat_start: 0.0,
            step: 1.0,
            col_n: 3,
            row_n: 3,
        };
        // v = x over the grid.
        let field: Vec<f64> = grid.points().iter().map(|c| c.x).collect();
        let contours = extract_contours(&field, &grid, 1.5);

        assert_eq!(contours.len(), 1, "segments must chain into one line");
        let line = &contours[0];
        assert_eq!(line.0.len(), 3);
        for c in line.coords() {
            assert!((c.x - 1.5).abs() < 1e-12);
        }
        let ys: Vec<f64> = line.coords().map(|c| c.y).collect();
        assert!((ys.iter().copied().fold(f64::INFINITY, f64::min)).abs() < 1e-12);
        assert!((ys.iter().copied().fold(f64::NEG_INFINITY, f64::max) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_generate_without_samples_is_noop() {
        let boundary = ServiceBoundary::taipei();
        let data = FeatureCollection::default();
        let result = generate(
            &data,
            "value",
            &boundary,
            0.01,
            &[50.0],
            &IdwInterpolator::default(),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_generate_tags_fragments_with_break_value() {
        let boundary = ServiceBoundary::taipei();
        let mut features = Vec::new();
        // A warm spot in the city center, cool elsewhere.
        for (x, y, v) in [
            (121.52, 25.03, 80.0),
            (121.56, 25.05, 30.0),
            (121.60, 25.10, 30.0),
            (121.48, 25.08, 30.0),
        ] {
            let mut f = Feature::new(Geometry::Point(geo::Point::new(x, y)));
            f.properties.insert("value".to_string(), json!(v));
            features.push(f);
        }
        let data = FeatureCollection::new(features);
        let output = generate(
            &data,
            "value",
            &boundary,
            0.005,
            &[50.0],
            &IdwInterpolator::default(),
        )
        .unwrap();

        assert!(output.len() > 1, "expected contour fragments");
        for feature in &output.features[1..] {
            assert_eq!(feature.properties.get("value"), Some(&json!(50.0)));
        }
    }
}
