//! Headless collaborators for tests, demos, and batch runs.
//!
//! [`RecordingBackend`] implements [`MapBackend`] without a drawing
//! surface: it records every registration, visibility flip, and filter
//! expression, and counts calls so tests can assert on fetch/register
//! behavior. [`StaticFetcher`] serves datasets from memory.

use std::collections::HashMap;

use cityscope_core::{CityscopeError, FeatureCollection, LayerId, Result};
use cityscope_geometry::ArcPlan;
use serde_json::Value;

use crate::backend::{GeoFetcher, LayerSpec, MapBackend};

/// Call counters kept by the recording backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub geojson_sources_added: usize,
    pub raster_sources_added: usize,
    pub layers_added: usize,
    pub arc_layers_added: usize,
    pub layers_removed: usize,
    pub sources_removed: usize,
}

/// A [`MapBackend`] that records everything and draws nothing.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    sources: HashMap<String, FeatureCollection>,
    raster_sources: HashMap<String, String>,
    layers: HashMap<String, LayerSpec>,
    arc_layers: HashMap<String, ArcPlan>,
    visibility: HashMap<String, bool>,
    filters: HashMap<String, Option<Value>>,
    counts: CallCounts,
}

impl RecordingBackend {
    /// Creates an empty recording backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The call counters.
    #[must_use]
    pub fn counts(&self) -> CallCounts {
        self.counts
    }

    /// True if a layer (regular or arc) with this id is registered.
    #[must_use]
    pub fn has_layer(&self, id: &LayerId) -> bool {
        self.layers.contains_key(id.as_str()) || self.arc_layers.contains_key(id.as_str())
    }

    /// The recorded visibility of a layer; registration defaults to
    /// visible.
    #[must_use]
    pub fn is_visible(&self, id: &LayerId) -> bool {
        self.visibility.get(id.as_str()).copied().unwrap_or(true)
    }

    /// The last filter expression applied to a layer, if any.
    #[must_use]
    pub fn filter_of(&self, id: &LayerId) -> Option<&Value> {
        self.filters.get(id.as_str()).and_then(Option::as_ref)
    }

    /// The registered spec of a layer.
    #[must_use]
    pub fn layer_spec(&self, id: &LayerId) -> Option<&LayerSpec> {
        self.layers.get(id.as_str())
    }

    /// The registered plan of an arc layer.
    #[must_use]
    pub fn arc_plan(&self, id: &LayerId) -> Option<&ArcPlan> {
        self.arc_layers.get(id.as_str())
    }

    /// The recorded data of a GeoJSON source.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&FeatureCollection> {
        self.sources.get(name)
    }
}

impl MapBackend for RecordingBackend {
    fn add_geojson_source(&mut self, name: &str, data: &FeatureCollection) {
        self.counts.geojson_sources_added += 1;
        self.sources.insert(name.to_string(), data.clone());
    }

    fn add_raster_source(&mut self, name: &str, dataset: &str) {
        self.counts.raster_sources_added += 1;
        self.raster_sources
            .insert(name.to_string(), dataset.to_string());
    }

    fn add_layer(&mut self, spec: LayerSpec) {
        self.counts.layers_added += 1;
        self.visibility.insert(spec.id.to_string(), true);
        self.layers.insert(spec.id.to_string(), spec);
    }

    fn add_arc_layer(&mut self, id: &LayerId, plan: &ArcPlan) {
        self.counts.arc_layers_added += 1;
        self.visibility.insert(id.to_string(), true);
        self.arc_layers.insert(id.to_string(), plan.clone());
    }

    fn remove_layer(&mut self, id: &LayerId) {
        let known = self.layers.remove(id.as_str()).is_some()
            | self.arc_layers.remove(id.as_str()).is_some();
        if known {
            self.counts.layers_removed += 1;
        }
        self.visibility.remove(id.as_str());
        self.filters.remove(id.as_str());
    }

    fn remove_source(&mut self, name: &str) {
        let known =
            self.sources.remove(name).is_some() | self.raster_sources.remove(name).is_some();
        if known {
            self.counts.sources_removed += 1;
        }
    }

    fn set_visibility(&mut self, id: &LayerId, visible: bool) {
        self.visibility.insert(id.to_string(), visible);
    }

    fn set_filter_expression(&mut self, id: &LayerId, expression: Option<Value>) {
        self.filters.insert(id.to_string(), expression);
    }

    fn geojson_source_data(&self, name: &str) -> Option<FeatureCollection> {
        self.sources.get(name).cloned()
    }
}

/// A [`GeoFetcher`] serving datasets from memory.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    datasets: HashMap<String, FeatureCollection>,
}

impl StaticFetcher {
    /// Creates an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a dataset under a name.
    pub fn insert(&mut self, name: impl Into<String>, data: FeatureCollection) -> &mut Self {
        self.datasets.insert(name.into(), data);
        self
    }
}

impl GeoFetcher for StaticFetcher {
    fn fetch_geojson(&self, name: &str) -> Result<FeatureCollection> {
        self.datasets
            .get(name)
            .cloned()
            .ok_or_else(|| CityscopeError::FetchFailed {
                name: name.to_string(),
                reason: "dataset not found".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_fetcher_misses_are_fetch_failures() {
        let fetcher = StaticFetcher::new();
        let err = fetcher.fetch_geojson("missing").unwrap_err();
        assert!(matches!(err, CityscopeError::FetchFailed { .. }));
    }

    #[test]
    fn test_recording_backend_visibility_defaults() {
        let mut backend = RecordingBackend::new();
        let id = LayerId::derive("x", cityscope_core::LayerKind::Geojson);
        backend.set_visibility(&id, false);
        assert!(!backend.is_visible(&id));
        let other = LayerId::derive("y", cityscope_core::LayerKind::Geojson);
        assert!(backend.is_visible(&other));
    }
}
