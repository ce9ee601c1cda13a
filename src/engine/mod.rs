// src/engine/mod.rs
//! Headless model of the rendering engine the provider layer plugs into

pub mod cluster;
pub mod dom;
pub mod events;
pub mod layer;
pub mod map;
pub mod marker;

pub use cluster::{ClusterEvent, ClusterOptions, FeatureLayer, MarkerClusterGroup};
pub use dom::{Document, Element};
pub use events::{Event, Evented, Subscription};
pub use layer::{stamp, Layer, LayerId, LayerRef};
pub use map::{Corner, EngineMap, MapEvent, MapEventKind, MapOptions};
pub use marker::{DivIcon, Marker, MarkerEvent};
