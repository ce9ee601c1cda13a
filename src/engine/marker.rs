// src/engine/marker.rs
//! Point markers rendered as CSS-styled div icons

use super::dom::Element;
use super::events::{Event, Evented, Subscription};
use super::layer::{Layer, LayerId};
use super::map::EngineMap;
use crate::error::Result;
use crate::geo::{GeoPoint, LatLng, LatLngBounds};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

const MARKER_ICON_CLASS: &str = "leaflet-marker-icon";

/// Icon whose look comes entirely from CSS classes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivIcon {
    pub class_name: String,
}

impl DivIcon {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
        }
    }

    fn element_class(&self) -> String {
        format!("{} {}", MARKER_ICON_CLASS, self.class_name)
    }
}

#[derive(Clone)]
pub enum MarkerEvent {
    Click { marker: Rc<Marker> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerEventKind {
    Click,
}

impl Event for MarkerEvent {
    type Kind = MarkerEventKind;

    fn kind(&self) -> MarkerEventKind {
        MarkerEventKind::Click
    }
}

pub struct Marker {
    id: LayerId,
    this: Weak<Marker>,
    position: LatLng,
    icon: RefCell<DivIcon>,
    feature: RefCell<Option<GeoPoint>>,
    element: RefCell<Option<Element>>,
    events: Evented<MarkerEvent>,
}

impl std::fmt::Debug for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marker")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("icon", &*self.icon.borrow())
            .finish()
    }
}

impl Marker {
    pub fn new(position: LatLng, icon: DivIcon) -> Rc<Self> {
        Rc::new_cyclic(|this| Marker {
            id: LayerId::next(),
            this: this.clone(),
            position,
            icon: RefCell::new(icon),
            feature: RefCell::new(None),
            element: RefCell::new(None),
            events: Evented::new(),
        })
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn icon(&self) -> DivIcon {
        self.icon.borrow().clone()
    }

    /// Swap the icon, restyling the rendered element if there is one
    pub fn set_icon(&self, icon: DivIcon) {
        if let Some(element) = self.element.borrow().as_ref() {
            element.set_class_name(&icon.element_class());
        }
        *self.icon.borrow_mut() = icon;
    }

    /// Feature this marker was built from
    pub fn feature(&self) -> Option<GeoPoint> {
        self.feature.borrow().clone()
    }

    pub fn set_feature(&self, feature: GeoPoint) {
        *self.feature.borrow_mut() = Some(feature);
    }

    pub fn element(&self) -> Option<Element> {
        self.element.borrow().clone()
    }

    #[must_use = "dropping the subscription removes the listener"]
    pub fn on_click<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&MarkerEvent) + 'static,
    {
        self.events.on(MarkerEventKind::Click, handler)
    }

    /// Deliver a user click to this marker's listeners
    pub fn click(&self) {
        if let Some(marker) = self.this.upgrade() {
            self.events.fire(&MarkerEvent::Click { marker });
        }
    }
}

impl Layer for Marker {
    fn id(&self) -> LayerId {
        self.id
    }

    fn on_add(&self, map: &EngineMap) -> Result<()> {
        let class = self.icon.borrow().element_class();
        let element = Element::create("div", &class, Some(map.marker_pane()));
        *self.element.borrow_mut() = Some(element);
        Ok(())
    }

    fn on_remove(&self, _map: &EngineMap) {
        if let Some(element) = self.element.borrow_mut().take() {
            element.detach();
        }
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        Some(LatLngBounds::from_point(self.position))
    }
}
