//! Attribute and category filtering over active layers.
//!
//! Every operation here is gated on the loading barrier: while any
//! fetch, generation, or render pass is outstanding, or a blocking
//! feature-detail view is open, filter calls are silent no-ops, so a
//! layer whose backing data is not yet committed is never filtered.
//!
//! Arc layers have no native attribute-filter support. Filtering one
//! regenerates a new arc layer from a pre-filtered subset of its
//! source data and swaps it in, hiding the unfiltered original.

use cityscope_core::{Feature, FeatureCollection, LayerConfig, LayerKind};
use cityscope_geometry::arc;
use serde_json::Value;

use crate::backend::{and_expression, eq_expression, MapBackend};
use crate::engine::{arc_style, MapEngine};

impl<B: MapBackend> MapEngine<B> {
    fn filters_blocked(&self) -> bool {
        self.is_loading() || self.detail_open() || self.backend().is_none()
    }

    /// Filters layers by an attribute value pair.
    ///
    /// Layers whose config exposes both keys filter on both values
    /// (AND); with only one side configured and supplied, that side
    /// alone applies. A layer with nothing applicable is untouched.
    pub fn filter_by_attribute(
        &mut self,
        configs: &[LayerConfig],
        x_value: Option<&Value>,
        y_value: Option<&Value>,
    ) {
        if self.filters_blocked() {
            return;
        }
        for config in configs {
            if config.kind == LayerKind::Arc {
                self.filter_arc_layer(config, x_value, y_value);
                continue;
            }
            let keys = config.filter_keys.clone().unwrap_or_default();
            if let Some(expression) = build_filter_expression(
                keys.x_key.as_deref(),
                x_value,
                keys.y_key.as_deref(),
                y_value,
            ) {
                let id = config.layer_id();
                if let Some(backend) = self.backend_mut() {
                    backend.set_filter_expression(&id, Some(expression));
                }
            }
        }
    }

    /// Regenerate-and-swap path for arc layers.
    fn filter_arc_layer(
        &mut self,
        config: &LayerConfig,
        x_value: Option<&Value>,
        y_value: Option<&Value>,
    ) {
        let id = config.layer_id();
        if !self.registry().contains(&id) {
            return;
        }
        let Some(data) = self
            .backend()
            .and_then(|b| b.geojson_source_data(&id.source_id()))
        else {
            log::warn!("arc filter skipped: source for '{id}' unavailable");
            return;
        };

        let keys = config.filter_keys.clone().unwrap_or_default();
        let features: Vec<Feature> = data
            .features
            .into_iter()
            .filter(|feature| {
                matches_property(feature, keys.x_key.as_deref(), x_value)
                    && matches_property(feature, keys.y_key.as_deref(), y_value)
            })
            .collect();
        let plan = arc::prepare(
            &FeatureCollection::new(features),
            &arc_style(config),
            self.options().arc_elevation_factor,
        );

        // Drop any previous variant, hide the unfiltered original, and
        // park the rebuilt layer until the 3D context picks it up.
        if let Some(previous) = self
            .registry_mut()
            .get_mut(&id)
            .and_then(|state| state.filtered_variant.take())
        {
            if let Some(backend) = self.backend_mut() {
                backend.remove_layer(&previous);
            }
            self.loading_set_mut().clear_layer(&previous);
        }
        if let Some(backend) = self.backend_mut() {
            backend.set_visibility(&id, false);
        }
        if let Some(state) = self.registry_mut().get_mut(&id) {
            state.visible = false;
            state.filtered_variant = Some(id.filtered_variant());
        }
        self.defer_arc_variant(&id, config.clone(), plan);
    }

    /// Shows only the layers whose configured title equals `category`.
    pub fn filter_by_category(&mut self, configs: &[LayerConfig], category: &str) {
        if self.filters_blocked() {
            return;
        }
        for config in configs {
            let id = config.layer_id();
            if !self.registry().contains(&id) {
                continue;
            }
            let shown = config.title.as_deref() == Some(category);
            if let Some(backend) = self.backend_mut() {
                backend.set_visibility(&id, shown);
            }
            if let Some(state) = self.registry_mut().get_mut(&id) {
                state.visible = shown;
            }
        }
    }

    /// Removes attribute filters, restoring full feature visibility.
    ///
    /// For arc layers this removes the filtered variant and restores
    /// the original.
    pub fn clear_attribute_filter(&mut self, configs: &[LayerConfig]) {
        if self.filters_blocked() {
            return;
        }
        for config in configs {
            let id = config.layer_id();
            if config.kind == LayerKind::Arc {
                if let Some(previous) = self
                    .registry_mut()
                    .get_mut(&id)
                    .and_then(|state| state.filtered_variant.take())
                {
                    if let Some(backend) = self.backend_mut() {
                        backend.remove_layer(&previous);
                    }
                    self.loading_set_mut().clear_layer(&previous);
                }
                if self.registry().contains(&id) {
                    if let Some(backend) = self.backend_mut() {
                        backend.set_visibility(&id, true);
                    }
                    if let Some(state) = self.registry_mut().get_mut(&id) {
                        state.visible = true;
                    }
                }
                continue;
            }
            if let Some(backend) = self.backend_mut() {
                backend.set_filter_expression(&id, None);
            }
        }
    }

    /// Undoes a category filter, showing every layer in the set.
    pub fn clear_category_filter(&mut self, configs: &[LayerConfig]) {
        if self.filters_blocked() {
            return;
        }
        for config in configs {
            let id = config.layer_id();
            if !self.registry().contains(&id) {
                continue;
            }
            if let Some(backend) = self.backend_mut() {
                backend.set_visibility(&id, true);
            }
            if let Some(state) = self.registry_mut().get_mut(&id) {
                state.visible = true;
            }
        }
    }
}

/// True when the feature passes one side of the filter: the side is
/// inapplicable (key or value missing) or the property matches.
fn matches_property(feature: &Feature, key: Option<&str>, value: Option<&Value>) -> bool {
    match (key, value) {
        (Some(key), Some(value)) => feature.properties.get(key) == Some(value),
        _ => true,
    }
}

/// Builds the filter expression for one layer, if any side applies.
///
/// Both sides configured and supplied combine with AND; otherwise the
/// y side wins over the x side, matching the layer engine this fronts.
fn build_filter_expression(
    x_key: Option<&str>,
    x_value: Option<&Value>,
    y_key: Option<&str>,
    y_value: Option<&Value>,
) -> Option<Value> {
    match (x_key, x_value, y_key, y_value) {
        (Some(xk), Some(xv), Some(yk), Some(yv)) => {
            Some(and_expression(eq_expression(xk, xv), eq_expression(yk, yv)))
        }
        (_, _, Some(yk), Some(yv)) => Some(eq_expression(yk, yv)),
        (Some(xk), Some(xv), _, _) => Some(eq_expression(xk, xv)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expression_precedence() {
        let x = (Some("district"), Some(&json!("Daan")));
        let y = (Some("hour"), Some(&json!(8)));

        let both = build_filter_expression(x.0, x.1, y.0, y.1).unwrap();
        assert_eq!(both[0], json!("all"));

        // y configured but unsupplied: only the x side applies.
        let x_only = build_filter_expression(x.0, x.1, Some("hour"), None).unwrap();
        assert_eq!(x_only, json!(["==", ["get", "district"], "Daan"]));

        // x unsupplied: the y side applies alone.
        let y_only = build_filter_expression(Some("district"), None, y.0, y.1).unwrap();
        assert_eq!(y_only, json!(["==", ["get", "hour"], 8]));

        assert!(build_filter_expression(None, None, None, None).is_none());
    }

    #[test]
    fn test_matches_property_sides() {
        let mut feature = Feature::new(cityscope_core::Geometry::Point(geo_point(0.0, 0.0)));
        feature
            .properties
            .insert("district".to_string(), json!("Daan"));

        assert!(matches_property(&feature, Some("district"), Some(&json!("Daan"))));
        assert!(!matches_property(&feature, Some("district"), Some(&json!("Shilin"))));
        // An inapplicable side never rejects.
        assert!(matches_property(&feature, None, Some(&json!("Daan"))));
        assert!(matches_property(&feature, Some("district"), None));
    }

    fn geo_point(x: f64, y: f64) -> geo::Point<f64> {
        geo::Point::new(x, y)
    }
}
