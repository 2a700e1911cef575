//! The layer lifecycle engine.
//!
//! One [`MapEngine`] instance owns every active layer's runtime state
//! and is the only mutator of it. Layers move through
//! `ABSENT -> LOADING -> {VISIBLE, HIDDEN}`; the [`LoadingSet`] tracks
//! everything mid-flight and doubles as the settled barrier the filter
//! engine checks before touching the map.
//!
//! The engine is deliberately free of I/O. Fetches surface as
//! [`FetchRequest`] values the caller drains and completes; deferred
//! arc construction surfaces as tasks completed by
//! [`MapEngine::materialize_deferred`] once the 3D rendering context
//! exists. Completions for layers that are no longer wanted are
//! discarded, never registered.

use std::collections::HashMap;

use cityscope_core::{
    EngineOptions, FeatureCollection, LayerConfig, LayerId, LayerKind, LayerRegistry, LayerState,
    LoadTag, LoadingSet, Result, SavedLocation, SavedLocations,
};
use cityscope_geometry::{
    arc, isoline, voronoi, ArcPlan, ArcStyle, IdwInterpolator, ScalarInterpolator,
    ServiceBoundary,
};

use crate::backend::{GeoFetcher, LayerDisplay, LayerSpec, MapBackend};

/// A dataset fetch the caller must perform and complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub layer_id: LayerId,
    pub source_name: String,
}

/// A prepared arc layer awaiting the external 3D rendering context.
struct DeferredArc {
    id: LayerId,
    config: LayerConfig,
    plan: ArcPlan,
    /// Set when this is a filtered variant standing in for an
    /// existing arc layer rather than a layer of its own.
    variant_of: Option<LayerId>,
}

/// The orchestrating state machine over a rendering backend.
pub struct MapEngine<B: MapBackend> {
    backend: Option<B>,
    boundary: ServiceBoundary,
    options: EngineOptions,
    interpolator: Box<dyn ScalarInterpolator>,

    layers: LayerRegistry,
    loading: LoadingSet,
    pending_fetches: Vec<FetchRequest>,
    pending_configs: HashMap<LayerId, LayerConfig>,
    deferred_arcs: Vec<DeferredArc>,

    saved_locations: SavedLocations,
    detail_open: bool,
}

impl<B: MapBackend> MapEngine<B> {
    /// Creates an engine over a backend with default options and the
    /// default inverse-distance interpolator.
    pub fn new(backend: B, boundary: ServiceBoundary) -> Self {
        Self::with_options(backend, boundary, EngineOptions::default())
    }

    /// Creates an engine with explicit options.
    pub fn with_options(backend: B, boundary: ServiceBoundary, options: EngineOptions) -> Self {
        Self {
            backend: Some(backend),
            boundary,
            options,
            interpolator: Box::new(IdwInterpolator::default()),
            layers: LayerRegistry::new(),
            loading: LoadingSet::new(),
            pending_fetches: Vec::new(),
            pending_configs: HashMap::new(),
            deferred_arcs: Vec::new(),
            saved_locations: SavedLocations::new(),
            detail_open: false,
        }
    }

    /// Swaps in a different scattered-data interpolator for isoline
    /// generation.
    pub fn set_interpolator(&mut self, interpolator: Box<dyn ScalarInterpolator>) {
        self.interpolator = interpolator;
    }

    /// The engine's options.
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The rendering backend, if it has not been released.
    #[must_use]
    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    // ---- layer lifecycle -------------------------------------------------

    /// Adds layers to the map.
    ///
    /// Already-active ids re-show without refetching. New geojson-backed
    /// ids transition to `LOADING` and enqueue a [`FetchRequest`];
    /// raster ids register immediately. An id already `LOADING` is
    /// coalesced: no second fetch, no second registration.
    pub fn add_layers(&mut self, configs: &[LayerConfig]) {
        if self.backend.is_none() {
            log::warn!("add_layers called after the map was released");
            return;
        }
        for config in configs {
            let id = config.layer_id();

            if self.layers.contains(&id) {
                self.reshow_layer(&id);
                continue;
            }
            if self.loading.contains_layer(&id) {
                log::debug!("layer '{id}' is already loading, coalescing");
                continue;
            }

            self.loading.insert(LoadTag::Layer(id.clone()));
            if config.kind.needs_fetch() {
                self.pending_configs.insert(id.clone(), config.clone());
                self.pending_fetches.push(FetchRequest {
                    layer_id: id,
                    source_name: config.source_name().to_string(),
                });
            } else {
                self.register_raster_layer(config.clone());
            }
        }
    }

    /// Cache-hit path: flip an existing layer back to visible.
    fn reshow_layer(&mut self, id: &LayerId) {
        self.loading.insert(LoadTag::Rendering);
        if let Some(backend) = self.backend.as_mut() {
            backend.set_visibility(id, true);
        }
        if let Some(state) = self.layers.get_mut(id) {
            state.visible = true;
        }
    }

    /// Takes the fetches queued since the last call.
    ///
    /// The caller performs the I/O and routes each result back through
    /// [`Self::complete_fetch`], in any order.
    pub fn take_pending_fetches(&mut self) -> Vec<FetchRequest> {
        std::mem::take(&mut self.pending_fetches)
    }

    /// Drives every pending fetch through a synchronous fetcher.
    ///
    /// Convenience for tests, demos, and embedders whose fetch
    /// collaborator is blocking anyway.
    pub fn pump_fetches(&mut self, fetcher: &impl GeoFetcher) {
        for request in self.take_pending_fetches() {
            let result = fetcher.fetch_geojson(&request.source_name);
            self.complete_fetch(&request.layer_id, result);
        }
    }

    /// Completes a dataset fetch for a `LOADING` layer.
    ///
    /// On failure the error is logged and the layer stays stuck in
    /// `LOADING`; callers detect this through persistent loading-set
    /// membership, and there is no automatic retry. Results for ids
    /// that are no longer wanted are discarded.
    pub fn complete_fetch(&mut self, id: &LayerId, result: Result<FeatureCollection>) {
        let data = match result {
            Ok(data) => data,
            Err(e) => {
                log::error!("fetch for layer '{id}' failed: {e}");
                return;
            }
        };

        let Some(config) = self.pending_configs.remove(id) else {
            log::debug!("discarding fetch result for unwanted layer '{id}'");
            return;
        };
        if self.backend.is_none() || !self.loading.contains_layer(id) {
            log::debug!("discarding fetch result for unwanted layer '{id}'");
            return;
        }

        let data = match &config.value_replace {
            Some(rules) => data.with_replaced_values(rules),
            None => data,
        };

        match config.kind {
            LayerKind::Voronoi => self.register_voronoi_layer(config, &data),
            LayerKind::Isoline => self.register_isoline_layer(config, &data),
            LayerKind::Arc => self.defer_arc_layer(config, &data),
            LayerKind::Geojson | LayerKind::Raster => {
                self.add_source(&config.layer_id(), &data);
                self.register_layer(config, LayerDisplay::Source);
            }
        }
    }

    fn add_source(&mut self, id: &LayerId, data: &FeatureCollection) {
        if let Some(backend) = self.backend.as_mut() {
            backend.add_geojson_source(&id.source_id(), data);
        }
    }

    /// Registers a layer over its already-added source and promotes it
    /// to `VISIBLE`.
    fn register_layer(&mut self, config: LayerConfig, display: LayerDisplay) {
        let id = config.layer_id();
        self.loading.insert(LoadTag::Rendering);

        let spec = LayerSpec {
            id: id.clone(),
            display,
            source: id.source_id(),
            source_layer: (display == LayerDisplay::Raster).then(|| config.index.clone()),
            title: config.title.clone(),
            icon: config.icon.clone(),
            size: config.size.clone(),
            paint: config.render_paint(),
        };
        if let Some(backend) = self.backend.as_mut() {
            backend.add_layer(spec);
        }
        if let Err(e) = self.layers.register(LayerState::new(config)) {
            log::error!("layer registration raced: {e}");
        }
        self.loading.clear_layer(&id);
    }

    fn register_raster_layer(&mut self, config: LayerConfig) {
        let id = config.layer_id();
        if let Some(backend) = self.backend.as_mut() {
            backend.add_raster_source(&id.source_id(), &config.index);
        }
        self.register_layer(config, LayerDisplay::Raster);
    }

    fn register_voronoi_layer(&mut self, config: LayerConfig, data: &FeatureCollection) {
        let id = config.layer_id();
        match voronoi::generate(data, &self.boundary) {
            Some(derived) => {
                self.add_source(&id, &derived);
                self.register_layer(config, LayerDisplay::Line);
            }
            None => self.abandon_generation(&id, "no point features to tessellate"),
        }
    }

    fn register_isoline_layer(&mut self, config: LayerConfig, data: &FeatureCollection) {
        let id = config.layer_id();
        let derived = isoline::generate(
            data,
            config.isoline_key(),
            &self.boundary,
            self.options.isoline_grid_step,
            &self.options.isoline_breaks,
            self.interpolator.as_ref(),
        );
        match derived {
            Some(derived) => {
                self.add_source(&id, &derived);
                self.register_layer(config, LayerDisplay::Line);
            }
            None => self.abandon_generation(&id, "no scalar samples to contour"),
        }
    }

    /// Generation precondition failed: no layer, no malformed geometry.
    fn abandon_generation(&mut self, id: &LayerId, reason: &str) {
        log::warn!("layer '{id}' not generated: {reason}");
        self.loading.clear_layer(id);
    }

    /// Prepares an arc layer and parks it until the 3D context exists.
    ///
    /// The raw (value-replaced) dataset still registers as a source so
    /// the attribute filter can later rebuild the layer from a feature
    /// subset. The id stays in the loading set until materialization.
    fn defer_arc_layer(&mut self, config: LayerConfig, data: &FeatureCollection) {
        let id = config.layer_id();
        self.add_source(&id, data);
        self.loading.insert(LoadTag::Rendering);

        let plan = arc::prepare(data, &arc_style(&config), self.options.arc_elevation_factor);
        self.deferred_arcs.push(DeferredArc {
            id,
            config,
            plan,
            variant_of: None,
        });
    }

    pub(crate) fn defer_arc_variant(&mut self, original: &LayerId, config: LayerConfig, plan: ArcPlan) {
        let variant = original.filtered_variant();
        self.loading.insert(LoadTag::Layer(variant.clone()));
        self.loading.insert(LoadTag::Rendering);
        self.deferred_arcs.push(DeferredArc {
            id: variant,
            config,
            plan,
            variant_of: Some(original.clone()),
        });
    }

    /// Returns true if arc constructions await the rendering context.
    #[must_use]
    pub fn has_deferred_arcs(&self) -> bool {
        !self.deferred_arcs.is_empty()
    }

    /// Completes deferred arc constructions.
    ///
    /// Call once the external 3D rendering context is ready, after the
    /// advisory [`EngineOptions::arc_build_delay`]. Every task checks
    /// that its layer is still wanted: one removed (or un-filtered)
    /// while parked is dropped without registration.
    pub fn materialize_deferred(&mut self) {
        let tasks = std::mem::take(&mut self.deferred_arcs);
        for task in tasks {
            if self.backend.is_none() {
                continue;
            }
            if !self.loading.contains_layer(&task.id) {
                log::debug!("dropping deferred arc for removed layer '{}'", task.id);
                continue;
            }

            match &task.variant_of {
                None => {
                    if let Some(backend) = self.backend.as_mut() {
                        backend.add_arc_layer(&task.id, &task.plan);
                    }
                    if let Err(e) = self.layers.register(LayerState::new(task.config)) {
                        log::error!("arc layer registration raced: {e}");
                    }
                }
                Some(original) => {
                    let still_wanted = self
                        .layers
                        .get(original)
                        .is_some_and(|s| s.filtered_variant.as_ref() == Some(&task.id));
                    if still_wanted {
                        if let Some(backend) = self.backend.as_mut() {
                            backend.add_arc_layer(&task.id, &task.plan);
                        }
                    } else {
                        log::debug!("dropping deferred arc variant '{}'", task.id);
                    }
                }
            }
            self.loading.clear_layer(&task.id);
        }
    }

    /// Hides layers without removing them.
    ///
    /// Clears any attribute filter, flips visibility off, and discards
    /// the open detail view: a visibility change invalidates whatever
    /// feature detail is on screen.
    pub fn hide_layers(&mut self, configs: &[LayerConfig]) {
        for config in configs {
            let id = config.layer_id();
            self.loading.clear_layer(&id);

            if self.layers.contains(&id) {
                if let Some(backend) = self.backend.as_mut() {
                    backend.set_filter_expression(&id, None);
                    backend.set_visibility(&id, false);
                }
                if let Some(state) = self.layers.get_mut(&id) {
                    state.visible = false;
                }
            }
        }
        self.close_detail();
    }

    /// Removes every active layer and its backing data.
    ///
    /// Used when switching dashboards: all ids reset to `ABSENT`, and
    /// any fetch still in flight completes into a discard.
    pub fn clear_active_layers(&mut self) {
        let ids = self.layers.ids();
        for id in &ids {
            let variant = self.layers.get(id).and_then(|s| s.filtered_variant.clone());
            if let Some(backend) = self.backend.as_mut() {
                if let Some(variant) = variant {
                    backend.remove_layer(&variant);
                }
                backend.remove_layer(id);
                backend.remove_source(&id.source_id());
            }
        }
        self.layers.clear();
        self.pending_configs.clear();
        self.deferred_arcs.clear();
        for id in self.loading.layer_ids() {
            self.loading.clear_layer(&id);
        }
        self.close_detail();
    }

    /// Clears everything and releases the rendering surface.
    ///
    /// Used when navigating away from the map entirely; every later
    /// operation is a logged no-op.
    pub fn clear_all(&mut self) {
        self.layers.clear();
        self.pending_configs.clear();
        self.pending_fetches.clear();
        self.deferred_arcs.clear();
        self.loading.clear();
        self.backend = None;
        self.close_detail();
    }

    // ---- loading state ---------------------------------------------------

    /// The settled barrier: true while any fetch, generation, or render
    /// pass is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.loading.is_empty()
    }

    /// Ids of layers currently mid-load (including ones stuck after a
    /// failed fetch).
    #[must_use]
    pub fn loading_layers(&self) -> Vec<LayerId> {
        self.loading.layer_ids()
    }

    /// Signal from the rendering collaborator that a render pass has
    /// settled.
    pub fn notify_render_settled(&mut self) {
        self.loading.clear_tag(&LoadTag::Rendering);
    }

    // ---- registry views --------------------------------------------------

    /// Ids of all active layers.
    #[must_use]
    pub fn active_layers(&self) -> Vec<LayerId> {
        self.layers.ids()
    }

    /// Ids of all visible layers.
    #[must_use]
    pub fn visible_layers(&self) -> Vec<LayerId> {
        self.layers.visible_ids()
    }

    /// Runtime state of one layer.
    #[must_use]
    pub fn layer_state(&self, id: &LayerId) -> Option<&LayerState> {
        self.layers.get(id)
    }

    pub(crate) fn registry(&self) -> &LayerRegistry {
        &self.layers
    }

    pub(crate) fn registry_mut(&mut self) -> &mut LayerRegistry {
        &mut self.layers
    }

    pub(crate) fn loading_set_mut(&mut self) -> &mut LoadingSet {
        &mut self.loading
    }

    pub(crate) fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    // ---- detail view -----------------------------------------------------

    /// Marks a blocking feature-detail view as open; filter operations
    /// no-op until it closes.
    pub fn open_detail(&mut self) {
        self.detail_open = true;
    }

    /// Discards the open detail view, if any.
    pub fn close_detail(&mut self) {
        self.detail_open = false;
    }

    /// True while a blocking detail view is open.
    #[must_use]
    pub fn detail_open(&self) -> bool {
        self.detail_open
    }

    // ---- saved locations -------------------------------------------------

    /// Bookmarks a camera state.
    pub fn add_saved_location(&mut self, location: SavedLocation) {
        self.saved_locations.add(location);
    }

    /// Removes a bookmark by index.
    pub fn remove_saved_location(&mut self, index: usize) -> Option<SavedLocation> {
        self.saved_locations.remove(index)
    }

    /// The stored bookmarks.
    #[must_use]
    pub fn saved_locations(&self) -> &[SavedLocation] {
        self.saved_locations.as_slice()
    }
}

/// Builds the arc visual style from a config's paint table.
///
/// Unparseable colors degrade to white with a warning; a bad paint
/// entry never takes the layer down.
pub(crate) fn arc_style(config: &LayerConfig) -> ArcStyle {
    let (start, end) = config.arc_colors();
    let parse = |text: &str| match arc::parse_hex_color(text) {
        Ok(color) => color,
        Err(e) => {
            log::warn!("arc color for layer '{}' ignored: {e}", config.layer_id());
            glam::Vec3::ONE
        }
    };
    ArcStyle {
        start_color: parse(&start),
        end_color: parse(&end),
        width: config.arc_width(),
        opacity: config.arc_opacity(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingBackend;
    use cityscope_core::CityscopeError;

    #[test]
    fn test_operations_after_clear_all_are_noops() {
        let mut engine = MapEngine::new(RecordingBackend::default(), ServiceBoundary::taipei());
        engine.clear_all();
        assert!(engine.backend().is_none());

        engine.add_layers(&[LayerConfig::new("bus_stops", LayerKind::Geojson)]);
        assert!(engine.take_pending_fetches().is_empty());
        assert!(!engine.is_loading());
    }

    #[test]
    fn test_failed_fetch_leaves_layer_stuck_loading() {
        let mut engine = MapEngine::new(RecordingBackend::default(), ServiceBoundary::taipei());
        let config = LayerConfig::new("bus_stops", LayerKind::Geojson);
        engine.add_layers(&[config.clone()]);
        let requests = engine.take_pending_fetches();
        assert_eq!(requests.len(), 1);

        engine.complete_fetch(
            &requests[0].layer_id,
            Err(CityscopeError::FetchFailed {
                name: "bus_stops".to_string(),
                reason: "connection refused".to_string(),
            }),
        );
        // Stuck LOADING: never promoted, never retried, detectable.
        assert!(engine.is_loading());
        assert_eq!(engine.loading_layers(), vec![config.layer_id()]);
        assert!(engine.active_layers().is_empty());
    }
}
