//! Collaborator seams: the rendering backend and the dataset fetcher.
//!
//! The engine never draws and never performs network I/O. It registers
//! named sources and layers through [`MapBackend`] and receives raw
//! datasets through [`GeoFetcher`]; production wires these to a real
//! map renderer and HTTP client, tests to the recording fakes in
//! [`crate::headless`].

use cityscope_core::{FeatureCollection, LayerId, Result};
use cityscope_geometry::ArcPlan;
use serde_json::{json, Map, Value};

/// How the backend should draw a registered layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerDisplay {
    /// Draw the source's native geometry as configured by paint.
    Source,
    /// Tiled raster/vector source.
    Raster,
    /// Plain lines. Every derived-geometry kind registers this way:
    /// the computed kinds are rendering-visual only, their registered
    /// geometry is ordinary lines.
    Line,
}

/// Registration-time description of one rendered layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub id: LayerId,
    pub display: LayerDisplay,
    /// Name of the geometry source backing the layer.
    pub source: String,
    /// Tile source layer, for raster-backed layers.
    pub source_layer: Option<String>,
    pub title: Option<String>,
    pub icon: Option<String>,
    pub size: Option<String>,
    /// Paint overrides, generation-time keys already stripped.
    pub paint: Map<String, Value>,
}

/// The rendering collaborator.
///
/// Implementations own the actual drawing surface. The engine calls
/// these in registration order and expects them to be cheap; the
/// "rendering settled" signal flows back through
/// [`crate::MapEngine::notify_render_settled`].
pub trait MapBackend {
    /// Registers (or replaces) a named GeoJSON source.
    fn add_geojson_source(&mut self, name: &str, data: &FeatureCollection);

    /// Registers a named tiled source for `dataset`.
    fn add_raster_source(&mut self, name: &str, dataset: &str);

    /// Registers a layer over a previously added source.
    fn add_layer(&mut self, spec: LayerSpec);

    /// Registers a custom 3D layer from a prepared arc plan.
    ///
    /// Only called once the 3D rendering context exists.
    fn add_arc_layer(&mut self, id: &LayerId, plan: &ArcPlan);

    /// Removes a layer. Unknown ids are ignored.
    fn remove_layer(&mut self, id: &LayerId);

    /// Removes a source. Unknown names are ignored.
    fn remove_source(&mut self, name: &str);

    /// Shows or hides a layer.
    fn set_visibility(&mut self, id: &LayerId, visible: bool);

    /// Applies (`Some`) or clears (`None`) an attribute filter
    /// expression on a layer.
    fn set_filter_expression(&mut self, id: &LayerId, expression: Option<Value>);

    /// Reads back the data of a GeoJSON source.
    ///
    /// The arc filter path regenerates a layer from a pre-filtered
    /// subset of its original source data.
    fn geojson_source_data(&self, name: &str) -> Option<FeatureCollection>;
}

/// The fetch collaborator: raw GeoJSON datasets by name.
pub trait GeoFetcher {
    /// Fetches and parses the dataset registered under `name`.
    fn fetch_geojson(&self, name: &str) -> Result<FeatureCollection>;
}

/// Builds an equality filter expression on one property.
#[must_use]
pub fn eq_expression(key: &str, value: &Value) -> Value {
    json!(["==", ["get", key], value])
}

/// Combines two filter expressions with AND.
#[must_use]
pub fn and_expression(lhs: Value, rhs: Value) -> Value {
    json!(["all", lhs, rhs])
}
