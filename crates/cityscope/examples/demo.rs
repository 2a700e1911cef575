//! Demo driving the layer engine end-to-end over the headless backend.
//!
//! Registers a plain layer, a Voronoi layer, and an arc layer from
//! in-memory datasets, filters them, and prints what the backend saw.

use cityscope::*;
use serde_json::json;

fn main() -> Result<()> {
    env_logger::init();

    let mut engine = MapEngine::new(RecordingBackend::new(), ServiceBoundary::taipei());

    // In-memory stand-in for the dataset service.
    let mut fetcher = StaticFetcher::new();
    fetcher.insert(
        "youbike_stations",
        FeatureCollection::from_geojson_value(&json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature",
                  "geometry": { "type": "Point", "coordinates": [121.5208, 25.0521] },
                  "properties": { "district": "Zhongzheng", "available": 12 } },
                { "type": "Feature",
                  "geometry": { "type": "Point", "coordinates": [121.5532, 25.0330] },
                  "properties": { "district": "Daan", "available": 3 } },
                { "type": "Feature",
                  "geometry": { "type": "Point", "coordinates": [121.5598, 25.0806] },
                  "properties": { "district": "Songshan", "available": 7 } },
            ]
        }))?,
    );
    fetcher.insert(
        "commute_flows",
        FeatureCollection::from_geojson_value(&json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature",
                  "geometry": { "type": "LineString",
                                "coordinates": [[121.5208, 25.0521], [121.5598, 25.0806]] },
                  "properties": { "district": "Songshan" } },
            ]
        }))?,
    );

    let stations = LayerConfig {
        title: Some("YouBike Stations".to_string()),
        ..LayerConfig::new("youbike_stations", LayerKind::Geojson)
    };
    let coverage = LayerConfig::new("youbike_stations", LayerKind::Voronoi);
    let flows = LayerConfig {
        filter_keys: Some(AttributeFilterKeys {
            x_key: Some("district".to_string()),
            y_key: None,
        }),
        ..LayerConfig::new("commute_flows", LayerKind::Arc)
    };

    engine.add_layers(&[stations.clone(), coverage.clone(), flows.clone()]);
    engine.pump_fetches(&fetcher);

    // The arc layer waits for the 3D context; a real embedder sleeps
    // for the advisory delay before this call.
    println!("arc build delay: {:?}", engine.options().arc_build_delay());
    engine.materialize_deferred();
    engine.notify_render_settled();

    println!("active layers:  {:?}", engine.active_layers());
    println!("visible layers: {:?}", engine.visible_layers());

    let coverage_source = engine
        .backend()
        .expect("backend is live")
        .source(&coverage.layer_id().source_id())
        .expect("voronoi source registered");
    println!(
        "voronoi source holds {} features (boundary ring + clipped cell lines)",
        coverage_source.len()
    );

    // Filter the arc layer down to one district, then restore it.
    engine.filter_by_attribute(&[flows.clone()], Some(&json!("Songshan")), None);
    engine.materialize_deferred();
    engine.notify_render_settled();
    engine.clear_attribute_filter(&[flows.clone()]);

    engine.clear_active_layers();
    println!("after clear:    {:?}", engine.active_layers());

    Ok(())
}
