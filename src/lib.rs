// src/lib.rs
//! Point Map Library
//!
//! Plots geographic points as clustered, selectable markers on a headless
//! model of a Leaflet-style rendering engine, with an external map
//! provider embedded as the engine's base layer.

pub mod config;
pub mod engine;
pub mod error;
pub mod geo;
pub mod logging;
pub mod provider;
pub mod service;

// Re-export main types for convenience
pub use config::{MapConfigPatch, MapConfiguration, SelectPointCallback};
pub use error::{MapError, Result};
pub use geo::{FeatureCollection, GeoPoint, LatLng, LngLat, PointId};
pub use service::{PointMapService, ServiceDeps};
