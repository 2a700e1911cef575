//! Boundary clipping for derived lines.
//!
//! Every generator output passes through [`clip_line`]: lines fully
//! inside the service boundary are kept whole, lines crossing it are
//! split at every crossing and only the fully contained sub-lines
//! survive. Nothing is ever truncated in place, so the output contains
//! no geometry outside the boundary at the cost of dropping
//! micro-fragments that straddle the edge.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Contains, Coord, Line, LineString, Point, Polygon};

use crate::boundary::ServiceBoundary;

/// Parameter tolerance for treating a crossing as interior to a segment.
const SPLIT_EPS: f64 = 1e-12;

/// Clips a line against the service boundary.
///
/// Returns the retained fragments: the whole line when it is entirely
/// within the boundary, otherwise the boundary-contained sub-lines
/// produced by splitting at every crossing.
#[must_use]
pub fn clip_line(line: &LineString<f64>, boundary: &ServiceBoundary) -> Vec<LineString<f64>> {
    if line.0.len() < 2 {
        return Vec::new();
    }
    let polygon = boundary.polygon();
    if polygon.contains(line) {
        return vec![line.clone()];
    }

    split_at_boundary(line, polygon)
        .into_iter()
        .filter(|fragment| fragment_inside(fragment, polygon))
        .collect()
}

/// Splits a line at every crossing of the polygon's exterior ring into
/// maximal sub-lines.
fn split_at_boundary(line: &LineString<f64>, polygon: &Polygon<f64>) -> Vec<LineString<f64>> {
    let mut fragments = Vec::new();
    let mut current: Vec<Coord<f64>> = Vec::new();

    for segment in line.lines() {
        if current.is_empty() {
            current.push(segment.start);
        }

        let mut cuts: Vec<(f64, Coord<f64>)> = Vec::new();
        for edge in polygon.exterior().lines() {
            match line_intersection(segment, edge) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    push_cut(&mut cuts, segment, intersection);
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    // The overlapping stretch lies on the ring itself;
                    // cut at both of its ends.
                    push_cut(&mut cuts, segment, intersection.start);
                    push_cut(&mut cuts, segment, intersection.end);
                }
                None => {}
            }
        }
        cuts.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (_, cut) in cuts {
            if current.last() == Some(&cut) {
                continue;
            }
            current.push(cut);
            fragments.push(LineString::new(std::mem::take(&mut current)));
            current.push(cut);
        }

        if current.last() != Some(&segment.end) {
            current.push(segment.end);
        }
    }

    if current.len() >= 2 {
        fragments.push(LineString::new(current));
    }
    fragments.retain(|f| f.0.len() >= 2);
    fragments
}

fn push_cut(cuts: &mut Vec<(f64, Coord<f64>)>, segment: Line<f64>, point: Coord<f64>) {
    let t = param_along(segment, point);
    // Crossings at the segment endpoints don't split anything.
    if t > SPLIT_EPS && t < 1.0 - SPLIT_EPS {
        cuts.push((t, point));
    }
}

/// Position of `point` along `segment` as a parameter in `[0, 1]`,
/// measured on the dominant axis.
fn param_along(segment: Line<f64>, point: Coord<f64>) -> f64 {
    let dx = segment.end.x - segment.start.x;
    let dy = segment.end.y - segment.start.y;
    if dx.abs() >= dy.abs() {
        if dx == 0.0 {
            0.0
        } else {
            (point.x - segment.start.x) / dx
        }
    } else {
        (point.y - segment.start.y) / dy
    }
}

/// Containment test for a split fragment.
///
/// Fragments were cut at every crossing, so between consecutive
/// vertices a fragment stays on one side of the ring. Membership is
/// judged at segment midpoints: the cut endpoints themselves sit on the
/// ring, where rounding makes point-wise classification unreliable.
fn fragment_inside(fragment: &LineString<f64>, polygon: &Polygon<f64>) -> bool {
    fragment.lines().all(|segment| {
        let mid = Point::new(
            (segment.start.x + segment.end.x) * 0.5,
            (segment.start.y + segment.end.y) * 0.5,
        );
        polygon.contains(&mid)
    })
}
