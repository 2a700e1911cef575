//! Layer configuration types.
//!
//! A [`LayerConfig`] describes one visual map layer of a dashboard
//! component: which dataset backs it, how it is derived (plain GeoJSON,
//! raster tiles, or one of the computed kinds), and its paint overrides.
//! Configs are immutable once registered; the engine derives a unique
//! [`LayerId`] for each from its dataset index and kind.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// How a layer's geometry is obtained and displayed.
///
/// The computed kinds (`Arc`, `Voronoi`, `Isoline`) synthesize new
/// geometry from the raw dataset before registration; `Geojson` and
/// `Raster` pass the source through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Plain GeoJSON features, registered as-is.
    Geojson,
    /// Tiled raster/vector source, no data fetch.
    Raster,
    /// Elevated parabolic connectors between origin/destination pairs.
    Arc,
    /// Voronoi tessellation derived from point features.
    Voronoi,
    /// Contour lines derived from a sampled scalar field.
    Isoline,
}

impl LayerKind {
    /// Returns the lowercase name used in layer ids and config files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Geojson => "geojson",
            Self::Raster => "raster",
            Self::Arc => "arc",
            Self::Voronoi => "voronoi",
            Self::Isoline => "isoline",
        }
    }

    /// Returns true if the kind is backed by a fetched GeoJSON dataset.
    ///
    /// Raster layers register a tile source directly and never fetch.
    #[must_use]
    pub fn needs_fetch(self) -> bool {
        !matches!(self, Self::Raster)
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique identifier of an active layer.
///
/// Derived deterministically as `"{index}-{kind}"`, so the same dataset
/// rendered two different ways yields two distinct layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    /// Derives the id for a dataset index and layer kind.
    #[must_use]
    pub fn derive(index: &str, kind: LayerKind) -> Self {
        Self(format!("{index}-{kind}"))
    }

    /// Returns the id of the filtered variant of this layer.
    ///
    /// Used by the arc filter path, which swaps in a regenerated layer
    /// instead of applying a filter expression.
    #[must_use]
    pub fn filtered_variant(&self) -> Self {
        Self(format!("{}-filtered", self.0))
    }

    /// Returns the name of the geometry source backing this layer.
    #[must_use]
    pub fn source_id(&self) -> String {
        format!("{}-source", self.0)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A regex-based text substitution applied to feature properties
/// before a layer is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueReplaceRule {
    /// Regular expression matched against the property value.
    pub pattern: String,
    /// Replacement text (capture-group references allowed).
    pub replacement: String,
}

/// Property keys a layer exposes to the attribute filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFilterKeys {
    /// Property key for the x-axis filter value.
    #[serde(default)]
    pub x_key: Option<String>,
    /// Property key for the y-axis filter value.
    #[serde(default)]
    pub y_key: Option<String>,
}

/// Immutable description of one map layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Dataset index; also the default source name.
    pub index: String,
    /// How the layer's geometry is derived.
    pub kind: LayerKind,
    /// Display title, matched by the category filter.
    #[serde(default)]
    pub title: Option<String>,
    /// Symbol icon name, if the layer renders symbols.
    #[serde(default)]
    pub icon: Option<String>,
    /// Size class for icon/stroke scaling.
    #[serde(default)]
    pub size: Option<String>,
    /// Paint overrides merged into the rendered layer.
    #[serde(default)]
    pub paint: Map<String, Value>,
    /// Regex substitutions applied to feature properties, keyed by
    /// property name.
    #[serde(default)]
    pub value_replace: Option<BTreeMap<String, ValueReplaceRule>>,
    /// Property keys exposed to the attribute filter.
    #[serde(default)]
    pub filter_keys: Option<AttributeFilterKeys>,
    /// Explicit source name; defaults to `index` when absent.
    #[serde(default)]
    pub source: Option<String>,
}

impl LayerConfig {
    /// Creates a minimal config for a dataset index and kind.
    #[must_use]
    pub fn new(index: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            index: index.into(),
            kind,
            title: None,
            icon: None,
            size: None,
            paint: Map::new(),
            value_replace: None,
            filter_keys: None,
            source: None,
        }
    }

    /// The unique id this config registers under.
    #[must_use]
    pub fn layer_id(&self) -> LayerId {
        LayerId::derive(&self.index, self.kind)
    }

    /// The name of the raw dataset to fetch.
    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.index)
    }

    /// The property carrying the scalar value for isoline generation.
    ///
    /// Read from the `isoline-key` paint entry; this entry is a
    /// generation-time parameter and is stripped before registration.
    #[must_use]
    pub fn isoline_key(&self) -> &str {
        self.paint
            .get("isoline-key")
            .and_then(Value::as_str)
            .unwrap_or("value")
    }

    /// The gradient color pair for arc layers.
    ///
    /// A single configured color is used for both ends; both default
    /// to white.
    #[must_use]
    pub fn arc_colors(&self) -> (String, String) {
        let colors = self.paint.get("arc-color").and_then(Value::as_array);
        let first = colors
            .and_then(|c| c.first())
            .and_then(Value::as_str)
            .unwrap_or("#ffffff");
        let second = colors
            .and_then(|c| c.get(1))
            .and_then(Value::as_str)
            .unwrap_or(first);
        (first.to_string(), second.to_string())
    }

    /// Line width for arc layers.
    #[must_use]
    pub fn arc_width(&self) -> f64 {
        self.paint
            .get("arc-width")
            .and_then(Value::as_f64)
            .unwrap_or(2.0)
    }

    /// Line opacity for arc layers. Zero is a valid configured value.
    #[must_use]
    pub fn arc_opacity(&self) -> f64 {
        self.paint
            .get("arc-opacity")
            .and_then(Value::as_f64)
            .unwrap_or(0.5)
    }

    /// Returns a copy of the paint table without generation-time keys.
    #[must_use]
    pub fn render_paint(&self) -> Map<String, Value> {
        let mut paint = self.paint.clone();
        paint.remove("isoline-key");
        paint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_layer_id_derivation() {
        let id = LayerId::derive("patrol_rain_floodgate", LayerKind::Voronoi);
        assert_eq!(id.as_str(), "patrol_rain_floodgate-voronoi");
        assert_eq!(id.source_id(), "patrol_rain_floodgate-voronoi-source");
        assert_eq!(
            id.filtered_variant().as_str(),
            "patrol_rain_floodgate-voronoi-filtered"
        );
    }

    #[test]
    fn test_source_name_defaults_to_index() {
        let mut config = LayerConfig::new("youbike_stations", LayerKind::Geojson);
        assert_eq!(config.source_name(), "youbike_stations");
        config.source = Some("youbike_realtime".to_string());
        assert_eq!(config.source_name(), "youbike_realtime");
    }

    #[test]
    fn test_isoline_key_from_paint() {
        let mut config = LayerConfig::new("temperature", LayerKind::Isoline);
        assert_eq!(config.isoline_key(), "value");
        config
            .paint
            .insert("isoline-key".to_string(), json!("temp_c"));
        assert_eq!(config.isoline_key(), "temp_c");

        // The generation-time key never reaches the rendered layer.
        let paint = config.render_paint();
        assert!(!paint.contains_key("isoline-key"));
    }

    #[test]
    fn test_arc_paint_defaults() {
        let mut config = LayerConfig::new("commute_flows", LayerKind::Arc);
        assert_eq!(
            config.arc_colors(),
            ("#ffffff".to_string(), "#ffffff".to_string())
        );
        assert!((config.arc_width() - 2.0).abs() < f64::EPSILON);
        assert!((config.arc_opacity() - 0.5).abs() < f64::EPSILON);

        config
            .paint
            .insert("arc-color".to_string(), json!(["#ff0000"]));
        config.paint.insert("arc-opacity".to_string(), json!(0.0));
        // A single color is reused for both gradient ends and an
        // explicit zero opacity is respected.
        assert_eq!(
            config.arc_colors(),
            ("#ff0000".to_string(), "#ff0000".to_string())
        );
        assert!(config.arc_opacity().abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_deserializes_from_json() {
        let config: LayerConfig = serde_json::from_value(json!({
            "index": "socl_welfare_org",
            "kind": "voronoi",
            "title": "Welfare Organizations",
            "filter_keys": { "x_key": "district" },
        }))
        .unwrap();
        assert_eq!(config.kind, LayerKind::Voronoi);
        assert_eq!(
            config.filter_keys.as_ref().unwrap().x_key.as_deref(),
            Some("district")
        );
        assert!(config.filter_keys.as_ref().unwrap().y_key.is_none());
    }
}
