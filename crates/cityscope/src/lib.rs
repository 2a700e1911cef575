//! cityscope-rs: a map layer engine for city dashboards.
//!
//! The engine manages a dynamic set of visual map layers, deriving new
//! geometry (Voronoi tessellations, isoline contours, elevated arc
//! connectors) from raw point/line datasets on demand. It decides when
//! a layer's data must be fetched, transformed, clipped, and (for the
//! computed layer kinds) algorithmically synthesized before it can be
//! displayed.
//!
//! # Quick Start
//!
//! ```no_run
//! use cityscope::*;
//!
//! // A backend that records registrations instead of drawing.
//! let backend = RecordingBackend::new();
//! let mut engine = MapEngine::new(backend, ServiceBoundary::taipei());
//!
//! // Ask for a derived layer; the engine queues a fetch.
//! engine.add_layers(&[LayerConfig::new("welfare_orgs", LayerKind::Voronoi)]);
//!
//! // Drive the fetch (here: from an in-memory fixture) and settle.
//! let fetcher = StaticFetcher::new();
//! engine.pump_fetches(&fetcher);
//! engine.notify_render_settled();
//! ```
//!
//! # Architecture
//!
//! - [`MapEngine`] owns every active layer's runtime state and is the
//!   only mutator of it; layers move through
//!   `ABSENT -> LOADING -> {VISIBLE, HIDDEN}`.
//! - The derived-geometry generators live in [`cityscope_geometry`]
//!   and are pure; every generated line is clipped against the fixed
//!   [`ServiceBoundary`].
//! - Rendering and fetching stay behind the [`MapBackend`] and
//!   [`GeoFetcher`] seams; [`RecordingBackend`] and [`StaticFetcher`]
//!   are the headless stand-ins.

pub mod backend;
pub mod engine;
mod filter;
pub mod headless;

// Re-export core types
pub use cityscope_core::{
    AttributeFilterKeys, CityscopeError, EngineOptions, Feature, FeatureCollection, Geometry,
    LayerConfig, LayerId, LayerKind, LayerState, LoadTag, LoadingSet, Result, SavedLocation,
    ValueReplaceRule,
};

// Re-export geometry types
pub use cityscope_geometry::{
    ArcPath, ArcPlan, ArcStyle, GridSpec, IdwInterpolator, ScalarInterpolator, ServiceBoundary,
    ARC_INTERVAL,
};

pub use backend::{GeoFetcher, LayerDisplay, LayerSpec, MapBackend};
pub use engine::{FetchRequest, MapEngine};
pub use headless::{CallCounts, RecordingBackend, StaticFetcher};

// Re-export the math types used across the workspace
pub use glam::{DVec2, DVec3, Vec3};
