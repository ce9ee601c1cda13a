// src/provider/mod.rs
//! External map provider: runtime seams, script loading and the base layer

pub mod headless;
mod layer;
mod loader;
mod map_type;
mod runtime;

pub use layer::{LayerEvent, LayerEventKind, YandexLayer, YandexLayerOptions};
pub use loader::{BoxFuture, LoaderConfig, ResourceLoader, ScriptHost, DEFAULT_SCRIPT_URL};
pub use map_type::MapType;
pub use runtime::{
    CenterOptions, LocalBoxFuture, MapState, Package, ProviderMap, ProviderMapRef, ProviderRuntime,
};
