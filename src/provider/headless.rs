// src/provider/headless.rs
//! In-process provider that records what it is asked to do.
//!
//! Used by the demo binary and tests in place of the real provider
//! runtime, which only exists inside a browser.

use super::loader::{BoxFuture, ScriptHost};
use super::map_type::MapType;
use super::runtime::{
    CenterOptions, LocalBoxFuture, MapState, Package, ProviderMap, ProviderMapRef, ProviderRuntime,
};
use crate::engine::Element;
use crate::error::Result;
use crate::geo::LatLng;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Script host that "loads" after an optional delay
#[derive(Debug, Default)]
pub struct HeadlessScriptHost {
    latency: Duration,
    insertions: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl HeadlessScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// How many script elements were inserted
    pub fn insertions(&self) -> usize {
        self.insertions.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().map(|urls| urls.clone()).unwrap_or_default()
    }
}

impl ScriptHost for HeadlessScriptHost {
    fn load_script<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ()> {
        self.insertions.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut urls) = self.urls.lock() {
            urls.push(url.to_string());
        }

        let latency = self.latency;
        Box::pin(async move {
            if latency.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(latency).await;
            }
        })
    }
}

/// Provider map object keeping its current state and a call log
#[derive(Debug)]
pub struct HeadlessMap {
    container: Element,
    initial: MapState,
    map_type: Cell<Option<MapType>>,
    center: Cell<LatLng>,
    zoom: Cell<f64>,
    center_calls: RefCell<Vec<(LatLng, f64, CenterOptions)>>,
    viewport_fits: Cell<usize>,
    options: RefCell<BTreeMap<String, serde_json::Value>>,
    traffic_control: Cell<Option<bool>>,
}

impl HeadlessMap {
    fn new(container: Element, initial: MapState) -> Self {
        Self {
            container,
            center: Cell::new(initial.center),
            zoom: Cell::new(initial.zoom),
            initial,
            map_type: Cell::new(None),
            center_calls: RefCell::new(Vec::new()),
            viewport_fits: Cell::new(0),
            options: RefCell::new(BTreeMap::new()),
            traffic_control: Cell::new(None),
        }
    }

    pub fn container(&self) -> &Element {
        &self.container
    }

    pub fn initial_state(&self) -> &MapState {
        &self.initial
    }

    pub fn map_type(&self) -> Option<MapType> {
        self.map_type.get()
    }

    pub fn center(&self) -> LatLng {
        self.center.get()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom.get()
    }

    pub fn center_calls(&self) -> Vec<(LatLng, f64, CenterOptions)> {
        self.center_calls.borrow().clone()
    }

    pub fn last_center_call(&self) -> Option<(LatLng, f64, CenterOptions)> {
        self.center_calls.borrow().last().copied()
    }

    pub fn viewport_fits(&self) -> usize {
        self.viewport_fits.get()
    }

    pub fn option(&self, key: &str) -> Option<serde_json::Value> {
        self.options.borrow().get(key).cloned()
    }

    pub fn traffic_control(&self) -> Option<bool> {
        self.traffic_control.get()
    }
}

impl ProviderMap for HeadlessMap {
    fn set_type(&self, map_type: MapType) {
        self.map_type.set(Some(map_type));
    }

    fn set_center(&self, center: LatLng, zoom: f64, options: CenterOptions) {
        self.center.set(center);
        self.zoom.set(zoom);
        self.center_calls.borrow_mut().push((center, zoom, options));
    }

    fn fit_to_viewport(&self) {
        self.viewport_fits.set(self.viewport_fits.get() + 1);
    }

    fn set_option(&self, key: &str, value: serde_json::Value) {
        self.options.borrow_mut().insert(key.to_string(), value);
    }

    fn add_traffic_control(&self, shown: bool) {
        self.traffic_control.set(Some(shown));
    }
}

/// Provider runtime whose packages become ready on request
#[derive(Debug, Default)]
pub struct HeadlessRuntime {
    ready: RefCell<HashSet<Package>>,
    load_requests: RefCell<Vec<Vec<Package>>>,
    maps: RefCell<Vec<Rc<HeadlessMap>>>,
}

impl HeadlessRuntime {
    /// Runtime with no packages loaded yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime as it is right after the script loaded with `package.map`
    pub fn with_map_package() -> Self {
        let runtime = Self::new();
        runtime.ready.borrow_mut().insert(Package::Map);
        runtime
    }

    pub fn load_requests(&self) -> Vec<Vec<Package>> {
        self.load_requests.borrow().clone()
    }

    pub fn maps(&self) -> Vec<Rc<HeadlessMap>> {
        self.maps.borrow().clone()
    }

    pub fn last_map(&self) -> Option<Rc<HeadlessMap>> {
        self.maps.borrow().last().cloned()
    }
}

impl ProviderRuntime for HeadlessRuntime {
    fn is_package_ready(&self, package: Package) -> bool {
        self.ready.borrow().contains(&package)
    }

    fn load_packages(&self, packages: Vec<Package>) -> LocalBoxFuture<'_, ()> {
        self.load_requests.borrow_mut().push(packages.clone());
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.ready.borrow_mut().extend(packages);
        })
    }

    fn create_map(&self, container: &Element, state: MapState) -> Result<ProviderMapRef> {
        let map = Rc::new(HeadlessMap::new(container.clone(), state));
        self.maps.borrow_mut().push(Rc::clone(&map));
        Ok(map as ProviderMapRef)
    }
}
