// src/provider/layer.rs v3
//! Base layer that embeds a provider map object inside the engine's map

use super::map_type::MapType;
use super::runtime::{CenterOptions, MapState, Package, ProviderMapRef, ProviderRuntime};
use crate::engine::{
    Corner, Element, EngineMap, Event, Evented, Layer, LayerId, MapEvent, MapEventKind,
    Subscription,
};
use crate::error::{MapError, Result};
use crate::geo::LatLng;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::debug;

const CONTAINER_CLASS: &str = "leaflet-yandex-layer";

#[derive(Debug, Clone)]
pub struct YandexLayerOptions {
    pub max_zoom: f64,
    pub attribution: String,
    pub opacity: f64,
    /// Show the provider's traffic control
    pub traffic: bool,
    /// Animation length for zoom changes pushed to the provider map
    pub zoom_speed: Duration,
    /// Insert above the engine's map pane instead of below everything
    pub overlay: bool,
}

impl Default for YandexLayerOptions {
    fn default() -> Self {
        Self {
            max_zoom: 18.0,
            attribution: String::new(),
            opacity: 1.0,
            traffic: false,
            zoom_speed: Duration::from_millis(250),
            overlay: false,
        }
    }
}

#[derive(Clone)]
pub enum LayerEvent {
    /// The provider map object now exists
    MapObjectInitialized { map_object: ProviderMapRef },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerEventKind {
    MapObjectInitialized,
}

impl Event for LayerEvent {
    type Kind = LayerEventKind;

    fn kind(&self) -> LayerEventKind {
        LayerEventKind::MapObjectInitialized
    }
}

#[derive(Default)]
struct AdapterState {
    map: Option<EngineMap>,
    container: Option<Element>,
    map_object: Option<ProviderMapRef>,
    last_zoom: Option<f64>,
}

/// Engine layer hosting exactly one provider map object
pub struct YandexLayer {
    id: LayerId,
    this: Weak<YandexLayer>,
    map_type: MapType,
    options: YandexLayerOptions,
    opacity: Cell<f64>,
    runtime: Rc<dyn ProviderRuntime>,
    state: RefCell<AdapterState>,
    subscriptions: RefCell<Vec<Subscription>>,
    events: Evented<LayerEvent>,
}

impl YandexLayer {
    /// `map_type` accepts a canonical type or a short alias; see
    /// [`MapType::resolve`]
    pub fn new(
        map_type: Option<&str>,
        options: YandexLayerOptions,
        runtime: Rc<dyn ProviderRuntime>,
    ) -> Rc<Self> {
        let map_type = MapType::resolve(map_type);
        Rc::new_cyclic(|this| YandexLayer {
            id: LayerId::next(),
            this: this.clone(),
            map_type,
            opacity: Cell::new(options.opacity),
            options,
            runtime,
            state: RefCell::new(AdapterState::default()),
            subscriptions: RefCell::new(Vec::new()),
            events: Evented::new(),
        })
    }

    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    pub fn options(&self) -> &YandexLayerOptions {
        &self.options
    }

    pub fn opacity(&self) -> f64 {
        self.opacity.get()
    }

    pub fn container(&self) -> Option<Element> {
        self.state.borrow().container.clone()
    }

    pub fn map_object(&self) -> Option<ProviderMapRef> {
        self.state.borrow().map_object.clone()
    }

    pub fn last_zoom(&self) -> Option<f64> {
        self.state.borrow().last_zoom
    }

    pub fn is_on_map(&self) -> bool {
        self.state.borrow().map.is_some()
    }

    #[must_use = "dropping the subscription removes the listener"]
    pub fn on_map_object_initialized<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ProviderMapRef) + 'static,
    {
        self.events
            .on(LayerEventKind::MapObjectInitialized, move |event| {
                let LayerEvent::MapObjectInitialized { map_object } = event;
                handler(map_object);
            })
    }

    fn required_packages(&self) -> Vec<Package> {
        if self.options.traffic {
            vec![Package::Map, Package::Traffic, Package::Controls]
        } else {
            vec![Package::Map]
        }
    }

    fn packages_ready(&self) -> bool {
        self.required_packages()
            .into_iter()
            .all(|p| self.runtime.is_package_ready(p))
    }

    /// Wait for the provider packages this layer needs and build the map
    /// object. Resolves immediately when it already exists; if the layer
    /// leaves the map while waiting, nothing is built.
    pub async fn initialize_map_object(&self) -> Result<()> {
        if self.try_init_map_object()? {
            return Ok(());
        }

        let packages = self.required_packages();
        debug!(?packages, "Waiting for provider packages");
        self.runtime.load_packages(packages).await;

        if !self.is_on_map() {
            debug!("Layer removed before provider packages loaded");
            return Ok(());
        }
        self.construct_map_object()
    }

    /// Build the map object now if the runtime allows; `Ok(false)` means
    /// construction is deferred until the packages are loaded
    fn try_init_map_object(&self) -> Result<bool> {
        if self.map_object().is_some() {
            return Ok(true);
        }
        if !self.packages_ready() {
            return Ok(false);
        }
        self.construct_map_object()?;
        Ok(true)
    }

    fn construct_map_object(&self) -> Result<()> {
        let container = {
            let state = self.state.borrow();
            if state.map_object.is_some() {
                return Ok(());
            }
            state
                .container
                .clone()
                .ok_or_else(|| MapError::Other("provider layer has no container".to_string()))?
        };

        let map_object = self.runtime.create_map(&container, MapState::bare())?;
        if self.options.traffic {
            map_object.add_traffic_control(true);
        }
        map_object.set_type(self.map_type);

        self.state.borrow_mut().map_object = Some(Rc::clone(&map_object));
        debug!(map_type = %self.map_type, "Provider map object created");

        self.update(true);
        self.events
            .fire(&LayerEvent::MapObjectInitialized { map_object });
        Ok(())
    }

    /// Create the container on first use and (re)insert it into the
    /// engine's root container
    fn init_container(&self, map: &EngineMap) {
        let (container, created) = {
            let mut state = self.state.borrow_mut();
            if let Some(container) = state.container.clone() {
                (container, false)
            } else {
                let container = Element::create("div", CONTAINER_CLASS, None);
                container.set_id(&format!("_YMapContainer_{}", self.id.0));
                container.set_style("z-index", "auto");
                state.container = Some(container.clone());
                (container, true)
            }
        };

        let root = map.container();
        let reference = if self.options.overlay {
            map.map_pane().next_sibling()
        } else {
            root.first_child()
        };
        let in_place = container.is_attached_to(root)
            && reference.as_ref().map_or(false, |r| r.ptr_eq(&container));
        if !in_place {
            root.insert_before(&container, reference.as_ref());
        }

        self.set_opacity(self.opacity.get());
        if created {
            container.set_size(map.size());
        }
    }

    fn reset(&self) {
        let map = self.state.borrow().map.clone();
        if let Some(map) = map {
            self.init_container(&map);
        }
    }

    /// Push the engine's view to the provider map. A zoom change is
    /// animated; a pan is applied immediately.
    fn update(&self, force: bool) {
        let (map, map_object) = {
            let state = self.state.borrow();
            match (&state.map, &state.map_object) {
                (Some(map), Some(map_object)) => (map.clone(), Rc::clone(map_object)),
                _ => return,
            }
        };

        self.resize(&map, &map_object, force);

        let center = map.center();
        let zoom = map.zoom();
        let mut options = CenterOptions::default();
        {
            let mut state = self.state.borrow_mut();
            if state.last_zoom != Some(zoom) {
                state.last_zoom = Some(zoom);
                options.duration = Some(self.options.zoom_speed);
            }
        }

        map_object.set_center(center, zoom, options);
    }

    fn resize(&self, map: &EngineMap, map_object: &ProviderMapRef, force: bool) {
        let Some(container) = self.container() else {
            return;
        };
        let size = map.size();
        if container.size() == Some(size) && !force {
            return;
        }
        container.set_size(size);
        map_object.fit_to_viewport();
    }

    /// Follow the engine's zoom animation to its target view
    fn zoom_anim(&self, center: LatLng, zoom: f64) {
        if let Some(map_object) = self.map_object() {
            map_object.set_center(
                center,
                zoom,
                CenterOptions {
                    duration: Some(self.options.zoom_speed),
                },
            );
        }
    }

    fn subscribe(&self, map: &EngineMap) {
        let mut subscriptions = self.subscriptions.borrow_mut();

        let layer = self.this.clone();
        subscriptions.push(map.on(MapEventKind::ViewReset, move |_| {
            if let Some(layer) = layer.upgrade() {
                layer.reset();
            }
        }));

        let layer = self.this.clone();
        subscriptions.push(map.on(MapEventKind::Move, move |_| {
            if let Some(layer) = layer.upgrade() {
                layer.update(false);
            }
        }));

        if map.options().zoom_animation {
            let layer = self.this.clone();
            subscriptions.push(map.on(MapEventKind::ZoomStart, move |event| {
                if let (Some(layer), MapEvent::ZoomStart { center, zoom }) = (layer.upgrade(), event) {
                    layer.zoom_anim(*center, *zoom);
                }
            }));
        }
    }
}

impl Layer for YandexLayer {
    fn id(&self) -> LayerId {
        self.id
    }

    fn on_add(&self, map: &EngineMap) -> Result<()> {
        self.state.borrow_mut().map = Some(map.clone());

        self.init_container(map);
        if !self.try_init_map_object()? {
            debug!("Provider packages not ready, map object deferred");
        }

        self.subscribe(map);

        if let Some(corner) = map.control_corner(Corner::BottomRight) {
            corner.set_style("margin-bottom", "3em");
        }

        self.reset();
        self.update(true);
        Ok(())
    }

    fn on_remove(&self, map: &EngineMap) {
        if let Some(container) = self.container() {
            map.container().remove_child(&container);
        }

        self.subscriptions.borrow_mut().clear();

        if let Some(corner) = map.control_corner(Corner::BottomRight) {
            corner.set_style("margin-bottom", "0em");
        }

        self.state.borrow_mut().map = None;
    }

    fn attribution(&self) -> Option<String> {
        if self.options.attribution.is_empty() {
            None
        } else {
            Some(self.options.attribution.clone())
        }
    }

    fn set_opacity(&self, opacity: f64) {
        self.opacity.set(opacity);
        if opacity < 1.0 {
            if let Some(container) = self.container() {
                container.set_style("opacity", &opacity.to_string());
            }
        }
    }
}
