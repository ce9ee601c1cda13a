// src/engine/layer.rs
//! Layer capability set shared by everything the map can display

use super::map::EngineMap;
use crate::error::Result;
use crate::geo::LatLngBounds;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier handed to layers and DOM ids
pub fn stamp() -> u64 {
    NEXT_STAMP.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

impl LayerId {
    pub fn next() -> Self {
        LayerId(stamp())
    }
}

/// What the rendering engine requires from a layer.
///
/// Methods take `&self`; layers keep their mutable state behind interior
/// mutability because the map and event handlers hold shared handles.
pub trait Layer {
    fn id(&self) -> LayerId;

    /// Attach to `map`. Called once per `EngineMap::add_layer`.
    fn on_add(&self, map: &EngineMap) -> Result<()>;

    /// Detach from `map`, undoing everything `on_add` set up
    fn on_remove(&self, map: &EngineMap);

    fn attribution(&self) -> Option<String> {
        None
    }

    fn set_opacity(&self, _opacity: f64) {}

    /// Geographic extent of the layer's content, if it has one
    fn bounds(&self) -> Option<LatLngBounds> {
        None
    }
}

pub type LayerRef = Rc<dyn Layer>;
