// src/provider/runtime.rs
//! Seams to the external provider's runtime and map objects

use super::map_type::MapType;
use crate::engine::Element;
use crate::error::Result;
use crate::geo::LatLng;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::time::Duration;

pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Loadable parts of the provider runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Package {
    Map,
    Traffic,
    Controls,
}

/// Initial state for a new provider map object
#[derive(Debug, Clone, PartialEq)]
pub struct MapState {
    pub center: LatLng,
    pub zoom: f64,
    pub behaviors: Vec<String>,
    pub controls: Vec<String>,
}

impl MapState {
    /// Origin view with no default behaviors or controls
    pub fn bare() -> Self {
        Self {
            center: LatLng::default(),
            zoom: 0.0,
            behaviors: Vec::new(),
            controls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CenterOptions {
    /// Animate the transition over this long; `None` jumps
    pub duration: Option<Duration>,
}

/// A map object owned by the provider runtime
pub trait ProviderMap {
    fn set_type(&self, map_type: MapType);

    fn set_center(&self, center: LatLng, zoom: f64, options: CenterOptions);

    /// Re-read the container size and refit the viewport
    fn fit_to_viewport(&self);

    /// Set a runtime option, e.g. `yandexMapDisablePoiInteractivity`
    fn set_option(&self, key: &str, value: serde_json::Value);

    fn add_traffic_control(&self, shown: bool);
}

pub type ProviderMapRef = Rc<dyn ProviderMap>;

/// The provider runtime once its script is loaded
pub trait ProviderRuntime {
    fn is_package_ready(&self, package: Package) -> bool;

    /// Resolve once every package in `packages` is ready
    fn load_packages(&self, packages: Vec<Package>) -> LocalBoxFuture<'_, ()>;

    /// Create a map object rendering into `container`
    fn create_map(&self, container: &Element, state: MapState) -> Result<ProviderMapRef>;
}
