// src/engine/map.rs v2
//! The rendering engine's map: view state, panes, layers and events

use super::dom::{Document, Element};
use super::events::{Event, Evented, Subscription};
use super::layer::{LayerId, LayerRef};
use crate::error::{MapError, Result};
use crate::geo::{bounds_zoom, LatLng, LatLngBounds, Size};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

/// Viewport used when the container carries no explicit size
pub const DEFAULT_SIZE: Size = Size { x: 800.0, y: 600.0 };

const CONTAINER_CLASS: &str = "leaflet-container";

#[derive(Debug, Clone)]
pub struct MapOptions {
    pub center: LatLng,
    pub zoom: f64,
    pub max_zoom: f64,
    /// Fire `ZoomStart` with the target view before zoom changes
    pub zoom_animation: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            center: LatLng::default(),
            zoom: 0.0,
            max_zoom: 18.0,
            zoom_animation: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The container was resized and layers must re-lay themselves out
    ViewReset,
    /// The view changed; carries the new view
    Move { center: LatLng, zoom: f64 },
    /// A zoom is about to happen; carries the target view
    ZoomStart { center: LatLng, zoom: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEventKind {
    ViewReset,
    Move,
    ZoomStart,
}

impl Event for MapEvent {
    type Kind = MapEventKind;

    fn kind(&self) -> MapEventKind {
        match self {
            MapEvent::ViewReset => MapEventKind::ViewReset,
            MapEvent::Move { .. } => MapEventKind::Move,
            MapEvent::ZoomStart { .. } => MapEventKind::ZoomStart,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    fn class_name(self) -> &'static str {
        match self {
            Corner::TopLeft => "leaflet-top leaflet-left",
            Corner::TopRight => "leaflet-top leaflet-right",
            Corner::BottomLeft => "leaflet-bottom leaflet-left",
            Corner::BottomRight => "leaflet-bottom leaflet-right",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct View {
    center: LatLng,
    zoom: f64,
    size: Size,
}

struct MapInner {
    container: Element,
    map_pane: Element,
    marker_pane: Element,
    control_container: Element,
    corners: Vec<(Corner, Element)>,
    options: MapOptions,
    view: RefCell<View>,
    layers: RefCell<Vec<LayerRef>>,
    events: Evented<MapEvent>,
    removed: Cell<bool>,
}

/// Shared handle to a map instance
#[derive(Clone)]
pub struct EngineMap {
    inner: Rc<MapInner>,
}

impl std::fmt::Debug for EngineMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMap")
            .field("container", &self.inner.container.id())
            .field("view", &*self.inner.view.borrow())
            .field("layers", &self.inner.layers.borrow().len())
            .finish()
    }
}

impl EngineMap {
    /// Create a map inside the element with id `container_id`
    pub fn new(document: &Document, container_id: &str, options: MapOptions) -> Result<Self> {
        let container = document
            .get_element_by_id(container_id)
            .ok_or_else(|| MapError::ContainerNotFound(container_id.to_string()))?;

        if container.has_class(CONTAINER_CLASS) {
            return Err(MapError::InvalidInput(format!(
                "map container '{}' is already initialized",
                container_id
            )));
        }
        container.add_class(CONTAINER_CLASS);

        let map_pane = Element::create("div", "leaflet-pane leaflet-map-pane", Some(&container));
        Element::create("div", "leaflet-pane leaflet-tile-pane", Some(&map_pane));
        Element::create("div", "leaflet-pane leaflet-overlay-pane", Some(&map_pane));
        let marker_pane = Element::create("div", "leaflet-pane leaflet-marker-pane", Some(&map_pane));

        let control_container = Element::create("div", "leaflet-control-container", Some(&container));
        let corners = Corner::ALL
            .iter()
            .map(|&corner| {
                let element = Element::create("div", corner.class_name(), Some(&control_container));
                (corner, element)
            })
            .collect();

        let size = container.size().unwrap_or(DEFAULT_SIZE);
        let zoom = options.zoom.clamp(0.0, options.max_zoom);
        let view = View {
            center: options.center,
            zoom,
            size,
        };

        debug!(container = container_id, zoom, "Created map");

        Ok(Self {
            inner: Rc::new(MapInner {
                container,
                map_pane,
                marker_pane,
                control_container,
                corners,
                options,
                view: RefCell::new(view),
                layers: RefCell::new(Vec::new()),
                events: Evented::new(),
                removed: Cell::new(false),
            }),
        })
    }

    pub fn options(&self) -> &MapOptions {
        &self.inner.options
    }

    pub fn container(&self) -> &Element {
        &self.inner.container
    }

    /// Pane holding tile, overlay and marker panes
    pub fn map_pane(&self) -> &Element {
        &self.inner.map_pane
    }

    pub fn marker_pane(&self) -> &Element {
        &self.inner.marker_pane
    }

    pub fn control_corner(&self, corner: Corner) -> Option<&Element> {
        self.inner
            .corners
            .iter()
            .find(|(c, _)| *c == corner)
            .map(|(_, element)| element)
    }

    pub fn center(&self) -> LatLng {
        self.inner.view.borrow().center
    }

    pub fn zoom(&self) -> f64 {
        self.inner.view.borrow().zoom
    }

    pub fn size(&self) -> Size {
        self.inner.view.borrow().size
    }

    pub fn is_removed(&self) -> bool {
        self.inner.removed.get()
    }

    #[must_use = "dropping the subscription removes the listener"]
    pub fn on<F>(&self, kind: MapEventKind, handler: F) -> Subscription
    where
        F: Fn(&MapEvent) + 'static,
    {
        self.inner.events.on(kind, handler)
    }

    pub fn listener_count(&self, kind: MapEventKind) -> usize {
        self.inner.events.listener_count(kind)
    }

    /// Move the view; zoom is clamped to `[0, max_zoom]`
    pub fn set_view(&self, center: LatLng, zoom: f64) {
        let zoom = zoom.clamp(0.0, self.inner.options.max_zoom);
        let zoom_changed = self.zoom() != zoom;

        if zoom_changed && self.inner.options.zoom_animation {
            self.inner.events.fire(&MapEvent::ZoomStart { center, zoom });
        }

        {
            let mut view = self.inner.view.borrow_mut();
            view.center = center;
            view.zoom = zoom;
        }

        self.inner.events.fire(&MapEvent::Move { center, zoom });
    }

    /// Resize the viewport, as a container resize would
    pub fn set_size(&self, size: Size) {
        self.inner.view.borrow_mut().size = size;
        self.inner.container.set_size(size);

        let (center, zoom) = (self.center(), self.zoom());
        self.inner.events.fire(&MapEvent::ViewReset);
        self.inner.events.fire(&MapEvent::Move { center, zoom });
    }

    /// Center on `bounds` at the highest zoom that still shows all of it
    pub fn fit_bounds(&self, bounds: &LatLngBounds) {
        let zoom = bounds_zoom(bounds, self.size(), self.inner.options.max_zoom);
        self.set_view(bounds.center(), zoom);
    }

    /// Attach `layer`; adding a layer that is already on the map is a no-op
    pub fn add_layer(&self, layer: LayerRef) -> Result<()> {
        if self.has_layer(layer.id()) {
            return Ok(());
        }

        self.inner.layers.borrow_mut().push(Rc::clone(&layer));
        if let Err(e) = layer.on_add(self) {
            self.inner.layers.borrow_mut().retain(|l| l.id() != layer.id());
            return Err(e);
        }
        Ok(())
    }

    /// Detach `layer`; returns `false` when it was not on the map
    pub fn remove_layer(&self, layer: &LayerRef) -> bool {
        let removed = {
            let mut layers = self.inner.layers.borrow_mut();
            let before = layers.len();
            layers.retain(|l| l.id() != layer.id());
            layers.len() != before
        };

        if removed {
            layer.on_remove(self);
        }
        removed
    }

    pub fn has_layer(&self, id: LayerId) -> bool {
        self.inner.layers.borrow().iter().any(|l| l.id() == id)
    }

    pub fn layer_count(&self) -> usize {
        self.inner.layers.borrow().len()
    }

    /// Detach every layer and tear down the DOM scaffold
    pub fn remove(&self) {
        if self.inner.removed.replace(true) {
            return;
        }

        let layers: Vec<LayerRef> = self.inner.layers.borrow_mut().drain(..).collect();
        for layer in layers.iter().rev() {
            layer.on_remove(self);
        }

        self.inner.map_pane.detach();
        self.inner.control_container.detach();

        let remaining: Vec<String> = self
            .inner
            .container
            .class_name()
            .split_whitespace()
            .filter(|c| *c != CONTAINER_CLASS)
            .map(str::to_string)
            .collect();
        self.inner.container.set_class_name(&remaining.join(" "));

        debug!(container = %self.inner.container.id(), "Removed map");
    }
}
