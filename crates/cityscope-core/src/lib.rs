//! Core abstractions for cityscope-rs.
//!
//! This crate provides the fundamental types used throughout
//! cityscope-rs:
//! - [`LayerConfig`]/[`LayerKind`]/[`LayerId`] describing map layers
//! - [`LayerRegistry`] owning per-layer runtime state
//! - [`LoadingSet`], the loading-state coordination barrier
//! - The GeoJSON [`FeatureCollection`] model and value-replace transform
//! - [`EngineOptions`] for the tuned pipeline constants

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod config;
pub mod error;
pub mod feature;
pub mod loading;
pub mod location;
pub mod options;
pub mod registry;

pub use config::{AttributeFilterKeys, LayerConfig, LayerId, LayerKind, ValueReplaceRule};
pub use error::{CityscopeError, Result};
pub use feature::{Feature, FeatureCollection, Geometry};
pub use loading::{LoadTag, LoadingSet};
pub use location::{SavedLocation, SavedLocations};
pub use options::EngineOptions;
pub use registry::{LayerRegistry, LayerState};

// Re-export the math types used across the workspace
pub use glam::{DVec2, DVec3, Vec3};
