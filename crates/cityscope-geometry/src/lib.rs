//! Derived-geometry generators for cityscope-rs.
//!
//! Everything here is pure computation over [`cityscope_core`] feature
//! collections:
//! - [`boundary`] - the fixed service-area ring and its bounding box
//! - [`clip`] - whole-or-split-and-filter boundary clipping
//! - [`voronoi`] - planar tessellation of point datasets
//! - [`isoline`] - scalar-field contouring over a regular grid
//! - [`arc`] - parabolic 3D connector sampling and color gradients

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod arc;
pub mod boundary;
pub mod clip;
pub mod isoline;
pub mod voronoi;

pub use arc::{ArcPath, ArcPlan, ArcStyle, ARC_INTERVAL};
pub use boundary::ServiceBoundary;
pub use clip::clip_line;
pub use isoline::{GridSpec, IdwInterpolator, ScalarInterpolator, ScalarSample};
