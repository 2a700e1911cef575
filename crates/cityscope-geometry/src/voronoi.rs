//! Voronoi tessellation of point datasets.
//!
//! Cells are built per site by successive half-plane clipping: each
//! site's cell starts as the boundary's bounding-box rectangle and is
//! clipped against the perpendicular-bisector half-plane of every other
//! site. The surviving ring is exactly the set of locations closer to
//! the site than to any other. Output depends only on the input point
//! set and the fixed boundary.
//!
//! Coincident input points are invalid input to the tessellation and
//! are deduplicated up front: exact coordinate equality, first
//! occurrence wins, the dropped points' paired features go with them.

use std::collections::HashSet;

use cityscope_core::{Feature, FeatureCollection, Geometry};
use geo::{Coord, LineString, Rect};

use crate::boundary::ServiceBoundary;
use crate::clip::clip_line;

/// Derives the Voronoi line dataset for a collection of point features.
///
/// Each cell's outer ring becomes a line carrying the originating
/// feature's properties, clipped against the service boundary; the
/// boundary ring itself is unioned into the output. Returns `None`
/// when the input holds no point features (generation precondition).
#[must_use]
pub fn generate(data: &FeatureCollection, boundary: &ServiceBoundary) -> Option<FeatureCollection> {
    let (sites, originals) = dedup_point_features(data);
    if sites.is_empty() {
        return None;
    }

    let cells = voronoi_cells(&sites, boundary.bbox());

    let mut features = vec![boundary.to_feature()];
    for (site_index, ring) in cells.into_iter().enumerate() {
        let Some(ring) = ring else { continue };
        for fragment in clip_line(&ring, boundary) {
            let mut feature = Feature::new(Geometry::LineString(fragment));
            feature
                .properties
                .clone_from(&originals[site_index].properties);
            features.push(feature);
        }
    }
    Some(FeatureCollection::new(features))
}

/// Extracts point coordinates and drops exact duplicates.
///
/// Two points are duplicates iff their coordinate pairs are exactly
/// equal; no tolerance. Returns the surviving coordinates and their
/// originating features, index-aligned.
#[must_use]
pub fn dedup_point_features(data: &FeatureCollection) -> (Vec<Coord<f64>>, Vec<&Feature>) {
    let mut seen: HashSet<(u64, u64)> = HashSet::new();
    let mut sites = Vec::new();
    let mut originals = Vec::new();

    let mut dropped = 0_usize;
    for feature in &data.features {
        let Some((x, y)) = feature.point_coords() else {
            continue;
        };
        if seen.insert((x.to_bits(), y.to_bits())) {
            sites.push(Coord { x, y });
            originals.push(feature);
        } else {
            dropped += 1;
        }
    }
    if dropped > 0 {
        log::debug!("dropped {dropped} coincident points before tessellation");
    }
    (sites, originals)
}

/// Computes the closed cell ring for every site, bounded by `bbox`.
///
/// A site outside the box can be clipped away entirely, yielding `None`
/// for that slot.
#[must_use]
pub fn voronoi_cells(sites: &[Coord<f64>], bbox: Rect<f64>) -> Vec<Option<LineString<f64>>> {
    let corners = [
        Coord { x: bbox.min().x, y: bbox.min().y },
        Coord { x: bbox.max().x, y: bbox.min().y },
        Coord { x: bbox.max().x, y: bbox.max().y },
        Coord { x: bbox.min().x, y: bbox.max().y },
    ];

    sites
        .iter()
        .map(|&site| {
            let mut cell: Vec<Coord<f64>> = corners.to_vec();
            for &other in sites {
                if other == site {
                    continue;
                }
                cell = bisector_clip(&cell, site, other);
                if cell.len() < 3 {
                    return None;
                }
            }
            let mut ring = cell;
            ring.push(ring[0]);
            Some(LineString::new(ring))
        })
        .collect()
}

/// Clips a convex cell against the half-plane of points closer to
/// `site` than to `other` (Sutherland–Hodgman against the bisector).
fn bisector_clip(cell: &[Coord<f64>], site: Coord<f64>, other: Coord<f64>) -> Vec<Coord<f64>> {
    let normal = Coord {
        x: other.x - site.x,
        y: other.y - site.y,
    };
    let mid = Coord {
        x: (site.x + other.x) * 0.5,
        y: (site.y + other.y) * 0.5,
    };
    let side = |p: Coord<f64>| normal.x * (p.x - mid.x) + normal.y * (p.y - mid.y);

    let mut out = Vec::with_capacity(cell.len() + 1);
    for i in 0..cell.len() {
        let a = cell[i];
        let b = cell[(i + 1) % cell.len()];
        let fa = side(a);
        let fb = side(b);

        if fa <= 0.0 {
            out.push(a);
        }
        if (fa < 0.0) != (fb < 0.0) && fa != fb {
            let t = fa / (fa - fb);
            out.push(Coord {
                x: a.x + t * (b.x - a.x),
                y: a.y + t * (b.y - a.y),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, Contains, Point};
    use serde_json::json;

    fn point_feature(x: f64, y: f64, name: &str) -> Feature {
        let mut feature = Feature::new(Geometry::Point(Point::new(x, y)));
        feature.properties.insert("name".to_string(), json!(name));
        feature
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let data = FeatureCollection::new(vec![
            point_feature(121.52, 25.05, "A"),
            point_feature(121.52, 25.05, "B"),
            point_feature(121.55, 25.08, "C"),
        ]);
        let (sites, originals) = dedup_point_features(&data);
        assert_eq!(sites.len(), 2);
        assert_eq!(originals[0].properties.get("name"), Some(&json!("A")));
        assert_eq!(originals[1].properties.get("name"), Some(&json!("C")));
    }

    #[test]
    fn test_two_sites_split_at_bisector() {
        let bbox = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 10.0 });
        let sites = vec![coord! { x: 2.5, y: 5.0 }, coord! { x: 7.5, y: 5.0 }];
        let cells = voronoi_cells(&sites, bbox);

        let left = cells[0].as_ref().unwrap();
        for c in left.coords() {
            assert!(c.x <= 5.0 + 1e-9, "left cell leaked past bisector: {c:?}");
        }
        let right = cells[1].as_ref().unwrap();
        for c in right.coords() {
            assert!(c.x >= 5.0 - 1e-9, "right cell leaked past bisector: {c:?}");
        }
        // Rings are closed.
        assert_eq!(left.0.first(), left.0.last());
    }

    #[test]
    fn test_generate_respects_boundary() {
        let boundary = ServiceBoundary::taipei();
        let data = FeatureCollection::new(vec![
            point_feature(121.52, 25.05, "A"),
            point_feature(121.52, 25.05, "B"),
            point_feature(121.55, 25.08, "C"),
        ]);
        let output = generate(&data, &boundary).unwrap();

        // Boundary ring plus at least one fragment per surviving site.
        assert!(output.len() > 1);
        for feature in &output.features[1..] {
            let Geometry::LineString(line) = &feature.geometry else {
                panic!("expected line fragments");
            };
            for segment in line.lines() {
                let mid = Point::new(
                    (segment.start.x + segment.end.x) * 0.5,
                    (segment.start.y + segment.end.y) * 0.5,
                );
                assert!(
                    boundary.polygon().contains(&mid),
                    "fragment midpoint escaped the boundary: {mid:?}"
                );
            }
        }
    }

    #[test]
    fn test_generate_is_dedup_idempotent() {
        let boundary = ServiceBoundary::taipei();
        let base = FeatureCollection::new(vec![
            point_feature(121.52, 25.05, "A"),
            point_feature(121.55, 25.08, "C"),
            point_feature(121.58, 25.03, "D"),
        ]);
        let mut with_duplicate = base.clone();
        with_duplicate
            .features
            .push(point_feature(121.55, 25.08, "C2"));

        let lhs = generate(&base, &boundary).unwrap();
        let rhs = generate(&with_duplicate, &boundary).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn test_generate_empty_input_is_noop() {
        let boundary = ServiceBoundary::taipei();
        assert!(generate(&FeatureCollection::default(), &boundary).is_none());
    }
}
