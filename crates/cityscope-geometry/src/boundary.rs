//! The fixed service-area boundary.
//!
//! Every derived-geometry generator clips its output against this
//! single closed ring, and the Voronoi/isoline grids span its bounding
//! box. The ring is read-only shared state; clones are cheap enough to
//! hand one to each engine instance.

use cityscope_core::{Feature, Geometry};
use geo::{BoundingRect, Coord, LineString, Polygon, Rect};

/// The service-area ring and its axis-aligned bounding box.
#[derive(Debug, Clone)]
pub struct ServiceBoundary {
    polygon: Polygon<f64>,
    bbox: Rect<f64>,
}

impl ServiceBoundary {
    /// Wraps a closed ring, precomputing its bounding box.
    ///
    /// # Panics
    /// Panics if the ring is degenerate (fewer than three distinct
    /// vertices, no spatial extent).
    #[must_use]
    pub fn new(polygon: Polygon<f64>) -> Self {
        let bbox = polygon
            .bounding_rect()
            .expect("boundary ring must have spatial extent");
        Self { polygon, bbox }
    }

    /// The Taipei service-area ring the dashboard ships with.
    #[must_use]
    pub fn taipei() -> Self {
        let ring: Vec<Coord<f64>> = TAIPEI_RING
            .iter()
            .map(|&[x, y]| Coord { x, y })
            .collect();
        Self::new(Polygon::new(LineString::new(ring), vec![]))
    }

    /// The boundary ring.
    #[must_use]
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// The bounding box of the ring. A superset of the ring itself:
    /// tessellation and grid generation use the box, clipping the ring.
    #[must_use]
    pub fn bbox(&self) -> Rect<f64> {
        self.bbox
    }

    /// The ring as a property-less feature, unioned into every derived
    /// dataset so the service edge renders along with the generated
    /// lines.
    #[must_use]
    pub fn to_feature(&self) -> Feature {
        Feature::new(Geometry::Polygon(self.polygon.clone()))
    }
}

/// Taipei service-area ring, `(lng, lat)` pairs, closed.
const TAIPEI_RING: [[f64; 2]; 32] = [
    [121.518_40, 25.171_95],
    [121.523_60, 25.182_61],
    [121.560_61, 25.211_25],
    [121.587_07, 25.193_96],
    [121.580_95, 25.167_80],
    [121.590_74, 25.164_62],
    [121.608_33, 25.130_56],
    [121.608_33, 25.129_87],
    [121.599_15, 25.112_01],
    [121.630_81, 25.096_08],
    [121.621_94, 25.040_81],
    [121.665_52, 25.030_83],
    [121.664_60, 25.022_79],
    [121.601_29, 25.013_51],
    [121.603_28, 24.977_75],
    [121.625_45, 24.969_98],
    [121.597_77, 24.960_14],
    [121.558_78, 24.963_88],
    [121.553_12, 24.979_96],
    [121.531_40, 24.989_25],
    [121.529_11, 25.007_27],
    [121.515_04, 25.020_85],
    [121.492_10, 25.005_19],
    [121.479_86, 25.040_53],
    [121.500_97, 25.046_35],
    [121.506_01, 25.064_36],
    [121.500_51, 25.086_80],
    [121.482_00, 25.099_26],
    [121.455_09, 25.102_03],
    [121.456_46, 25.128_21],
    [121.503_12, 25.174_18],
    [121.518_40, 25.171_95],
];

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Contains;

    #[test]
    fn test_taipei_bbox_spans_ring() {
        let boundary = ServiceBoundary::taipei();
        let bbox = boundary.bbox();
        assert!(bbox.min().x < 121.46 && bbox.max().x > 121.66);
        assert!(bbox.min().y < 24.97 && bbox.max().y > 25.21);
    }

    #[test]
    fn test_city_center_is_inside() {
        let boundary = ServiceBoundary::taipei();
        let center = geo::Point::new(121.5637, 25.0375);
        assert!(boundary.polygon().contains(&center));
    }
}
