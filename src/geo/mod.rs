// src/geo/mod.rs
//! Geographic primitives and point features

mod coords;
mod feature;

pub use coords::{bounds_zoom, project, LatLng, LatLngBounds, LngLat, Size, TILE_SIZE};
pub use feature::{FeatureCollection, GeoPoint, PointGeometry, PointId};
