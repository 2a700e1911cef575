//! Layer registry for managing active map layers.

use std::collections::HashMap;

use crate::config::{LayerConfig, LayerId};
use crate::error::{CityscopeError, Result};

/// Runtime state of one active layer.
///
/// Owned exclusively by the [`LayerRegistry`]; all mutation funnels
/// through the engine's operations.
#[derive(Debug, Clone)]
pub struct LayerState {
    /// The immutable registration-time configuration.
    pub config: LayerConfig,
    /// Whether the layer is currently shown.
    pub visible: bool,
    /// Id of the regenerated filtered variant, if one is active.
    ///
    /// Only arc layers use this: they have no native attribute-filter
    /// support, so filtering swaps in a rebuilt layer instead.
    pub filtered_variant: Option<LayerId>,
}

impl LayerState {
    /// Creates the state for a freshly registered, visible layer.
    #[must_use]
    pub fn new(config: LayerConfig) -> Self {
        Self {
            config,
            visible: true,
            filtered_variant: None,
        }
    }
}

/// Registry of all active layers, keyed by id.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: HashMap<LayerId, LayerState>,
}

impl LayerRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a layer.
    ///
    /// Returns an error if a layer with the same id already exists.
    pub fn register(&mut self, state: LayerState) -> Result<()> {
        let id = state.config.layer_id();
        if self.layers.contains_key(&id) {
            return Err(CityscopeError::LayerExists(id.to_string()));
        }
        self.layers.insert(id, state);
        Ok(())
    }

    /// Gets a reference to a layer's state by id.
    #[must_use]
    pub fn get(&self, id: &LayerId) -> Option<&LayerState> {
        self.layers.get(id)
    }

    /// Gets a mutable reference to a layer's state by id.
    pub fn get_mut(&mut self, id: &LayerId) -> Option<&mut LayerState> {
        self.layers.get_mut(id)
    }

    /// Checks if a layer with the given id exists.
    #[must_use]
    pub fn contains(&self, id: &LayerId) -> bool {
        self.layers.contains_key(id)
    }

    /// Removes a layer by id.
    pub fn remove(&mut self, id: &LayerId) -> Option<LayerState> {
        self.layers.remove(id)
    }

    /// Removes all layers from the registry.
    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Returns an iterator over all layer states.
    pub fn iter(&self) -> impl Iterator<Item = (&LayerId, &LayerState)> {
        self.layers.iter()
    }

    /// Returns the ids of all currently visible layers.
    #[must_use]
    pub fn visible_ids(&self) -> Vec<LayerId> {
        self.layers
            .iter()
            .filter(|(_, state)| state.visible)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Returns the ids of all active layers.
    #[must_use]
    pub fn ids(&self) -> Vec<LayerId> {
        self.layers.keys().cloned().collect()
    }

    /// Returns the total number of active layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerKind;

    fn state(index: &str, kind: LayerKind) -> LayerState {
        LayerState::new(LayerConfig::new(index, kind))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = LayerRegistry::new();
        registry.register(state("bus_stops", LayerKind::Geojson)).unwrap();

        let id = LayerId::derive("bus_stops", LayerKind::Geojson);
        assert!(registry.contains(&id));
        assert!(registry.get(&id).unwrap().visible);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = LayerRegistry::new();
        registry.register(state("bus_stops", LayerKind::Geojson)).unwrap();
        let err = registry
            .register(state("bus_stops", LayerKind::Geojson))
            .unwrap_err();
        assert!(matches!(err, CityscopeError::LayerExists(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_index_different_kind_coexist() {
        let mut registry = LayerRegistry::new();
        registry.register(state("bus_stops", LayerKind::Geojson)).unwrap();
        registry.register(state("bus_stops", LayerKind::Voronoi)).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_visible_ids_track_visibility() {
        let mut registry = LayerRegistry::new();
        registry.register(state("a", LayerKind::Geojson)).unwrap();
        registry.register(state("b", LayerKind::Geojson)).unwrap();

        let id_b = LayerId::derive("b", LayerKind::Geojson);
        registry.get_mut(&id_b).unwrap().visible = false;

        let visible = registry.visible_ids();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0], LayerId::derive("a", LayerKind::Geojson));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut registry = LayerRegistry::new();
        registry.register(state("a", LayerKind::Geojson)).unwrap();
        registry.register(state("b", LayerKind::Raster)).unwrap();

        let removed = registry.remove(&LayerId::derive("a", LayerKind::Geojson));
        assert!(removed.is_some());
        assert_eq!(registry.len(), 1);

        registry.clear();
        assert!(registry.is_empty());
    }
}
