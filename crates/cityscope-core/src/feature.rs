//! GeoJSON feature model.
//!
//! A minimal typed view of the GeoJSON subset the engine works with:
//! feature collections whose members carry a planar geometry and a free
//! form property map. Geometries use [`geo`] primitives so the derived
//! geometry generators can run containment and intersection predicates
//! on them directly.

use geo::{Coord, LineString, MultiLineString, Point, Polygon};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::config::ValueReplaceRule;
use crate::error::{CityscopeError, Result};

/// Planar geometry of a single feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point<f64>),
    LineString(LineString<f64>),
    MultiLineString(MultiLineString<f64>),
    Polygon(Polygon<f64>),
}

/// One GeoJSON feature: a geometry plus arbitrary attribute properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Creates a feature with empty properties.
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: Map::new(),
        }
    }

    /// Returns the coordinates if the geometry is a point.
    #[must_use]
    pub fn point_coords(&self) -> Option<(f64, f64)> {
        match &self.geometry {
            Geometry::Point(p) => Some((p.x(), p.y())),
            _ => None,
        }
    }

    /// Returns a numeric property by key.
    #[must_use]
    pub fn number_property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }
}

/// An ordered collection of features.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Creates a collection from a list of features.
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Returns the number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true if the collection holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Parses a collection from a GeoJSON value.
    ///
    /// Only the geometry types in [`Geometry`] are accepted; anything
    /// else is an [`CityscopeError::InvalidGeoJson`] error.
    pub fn from_geojson_value(value: &Value) -> Result<Self> {
        let features = value
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("missing 'features' array"))?;

        let features = features
            .iter()
            .map(parse_feature)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { features })
    }

    /// Serializes the collection back to GeoJSON wire format.
    #[must_use]
    pub fn to_geojson_value(&self) -> Value {
        let features: Vec<Value> = self
            .features
            .iter()
            .map(|f| {
                json!({
                    "type": "Feature",
                    "geometry": geometry_to_value(&f.geometry),
                    "properties": Value::Object(f.properties.clone()),
                })
            })
            .collect();
        json!({ "type": "FeatureCollection", "features": features })
    }

    /// Applies regex value-replace rules, producing a new collection.
    ///
    /// The input is left untouched: the raw fetch result may be cached
    /// and shared, so the substitution must not alias it. Rules apply
    /// to string properties only; a rule whose pattern fails to compile
    /// is skipped with a warning and the remaining rules still run.
    #[must_use]
    pub fn with_replaced_values(&self, rules: &BTreeMap<String, ValueReplaceRule>) -> Self {
        let compiled: Vec<(&String, Regex, &str)> = rules
            .iter()
            .filter_map(|(key, rule)| match Regex::new(&rule.pattern) {
                Ok(re) => Some((key, re, rule.replacement.as_str())),
                Err(e) => {
                    log::warn!("value_replace pattern for '{key}' rejected: {e}");
                    None
                }
            })
            .collect();

        let features = self
            .features
            .iter()
            .map(|feature| {
                let mut feature = feature.clone();
                for (key, re, replacement) in &compiled {
                    let Some(value) = feature.properties.get_mut(*key) else {
                        continue;
                    };
                    if let Value::String(text) = value {
                        *text = re.replace(text, *replacement).into_owned();
                    }
                }
                feature
            })
            .collect();
        Self { features }
    }
}

fn invalid(msg: &str) -> CityscopeError {
    CityscopeError::InvalidGeoJson(msg.to_string())
}

fn parse_feature(value: &Value) -> Result<Feature> {
    let geometry = value
        .get("geometry")
        .ok_or_else(|| invalid("feature missing 'geometry'"))?;
    let properties = match value.get("properties") {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    Ok(Feature {
        geometry: value_to_geometry(geometry)?,
        properties,
    })
}

fn value_to_geometry(value: &Value) -> Result<Geometry> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("geometry missing 'type'"))?;
    let coords = value
        .get("coordinates")
        .ok_or_else(|| invalid("geometry missing 'coordinates'"))?;

    match kind {
        "Point" => Ok(Geometry::Point(parse_coord(coords)?.into())),
        "LineString" => Ok(Geometry::LineString(parse_line(coords)?)),
        "MultiLineString" => {
            let lines = coords
                .as_array()
                .ok_or_else(|| invalid("MultiLineString coordinates must be an array"))?
                .iter()
                .map(parse_line)
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::MultiLineString(MultiLineString::new(lines)))
        }
        "Polygon" => {
            let rings = coords
                .as_array()
                .ok_or_else(|| invalid("Polygon coordinates must be an array"))?;
            let mut rings = rings.iter().map(parse_line).collect::<Result<Vec<_>>>()?;
            if rings.is_empty() {
                return Err(invalid("Polygon must have an exterior ring"));
            }
            let exterior = rings.remove(0);
            Ok(Geometry::Polygon(Polygon::new(exterior, rings)))
        }
        other => Err(invalid(&format!("unsupported geometry type '{other}'"))),
    }
}

fn parse_line(value: &Value) -> Result<LineString<f64>> {
    let coords = value
        .as_array()
        .ok_or_else(|| invalid("coordinate sequence must be an array"))?
        .iter()
        .map(parse_coord)
        .collect::<Result<Vec<_>>>()?;
    Ok(LineString::new(coords))
}

fn parse_coord(value: &Value) -> Result<Coord<f64>> {
    let pair = value
        .as_array()
        .ok_or_else(|| invalid("coordinate must be an array"))?;
    let x = pair.first().and_then(Value::as_f64);
    let y = pair.get(1).and_then(Value::as_f64);
    match (x, y) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err(invalid("coordinate must hold two numbers")),
    }
}

fn geometry_to_value(geometry: &Geometry) -> Value {
    match geometry {
        Geometry::Point(p) => json!({
            "type": "Point",
            "coordinates": [p.x(), p.y()],
        }),
        Geometry::LineString(line) => json!({
            "type": "LineString",
            "coordinates": line_coords(line),
        }),
        Geometry::MultiLineString(lines) => json!({
            "type": "MultiLineString",
            "coordinates": lines.0.iter().map(line_coords).collect::<Vec<_>>(),
        }),
        Geometry::Polygon(polygon) => {
            let mut rings = vec![line_coords(polygon.exterior())];
            rings.extend(polygon.interiors().iter().map(line_coords));
            json!({ "type": "Polygon", "coordinates": rings })
        }
    }
}

fn line_coords(line: &LineString<f64>) -> Vec<[f64; 2]> {
    line.coords().map(|c| [c.x, c.y]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_collection() -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [121.52, 25.05] },
                    "properties": { "name": "Station A", "value": 47 }
                },
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[121.50, 25.00], [121.55, 25.08]]
                    },
                    "properties": {}
                }
            ]
        })
    }

    #[test]
    fn test_parse_and_serialize() {
        let collection = FeatureCollection::from_geojson_value(&sample_collection()).unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.features[0].point_coords(),
            Some((121.52, 25.05))
        );
        assert_eq!(collection.features[0].number_property("value"), Some(47.0));

        let out = collection.to_geojson_value();
        let reparsed = FeatureCollection::from_geojson_value(&out).unwrap();
        assert_eq!(reparsed, collection);
    }

    #[test]
    fn test_rejects_unsupported_geometry() {
        let bad = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": { "type": "GeometryCollection", "coordinates": [] },
                "properties": {}
            }]
        });
        assert!(FeatureCollection::from_geojson_value(&bad).is_err());
    }

    #[test]
    fn test_value_replace_is_pure() {
        let collection = FeatureCollection::from_geojson_value(&sample_collection()).unwrap();
        let mut rules = BTreeMap::new();
        rules.insert(
            "name".to_string(),
            ValueReplaceRule {
                pattern: "Station".to_string(),
                replacement: "Stop".to_string(),
            },
        );
        // Numeric properties never match a text rule.
        rules.insert(
            "value".to_string(),
            ValueReplaceRule {
                pattern: "4".to_string(),
                replacement: "9".to_string(),
            },
        );

        let replaced = collection.with_replaced_values(&rules);
        assert_eq!(
            replaced.features[0].properties.get("name"),
            Some(&json!("Stop A"))
        );
        assert_eq!(replaced.features[0].number_property("value"), Some(47.0));
        // The input collection is untouched.
        assert_eq!(
            collection.features[0].properties.get("name"),
            Some(&json!("Station A"))
        );
    }

    #[test]
    fn test_value_replace_skips_bad_pattern() {
        let collection = FeatureCollection::from_geojson_value(&sample_collection()).unwrap();
        let mut rules = BTreeMap::new();
        rules.insert(
            "name".to_string(),
            ValueReplaceRule {
                pattern: "(".to_string(),
                replacement: "x".to_string(),
            },
        );
        let replaced = collection.with_replaced_values(&rules);
        assert_eq!(replaced, collection);
    }
}
