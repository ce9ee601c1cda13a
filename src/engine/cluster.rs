// src/engine/cluster.rs
//! Feature-collection layers and the marker-cluster group that owns them

use super::events::{Event, Evented, Subscription};
use super::layer::{Layer, LayerId};
use super::map::EngineMap;
use super::marker::{Marker, MarkerEvent};
use crate::error::Result;
use crate::geo::{GeoPoint, LatLng, LatLngBounds, PointId};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Markers built from a feature collection
pub struct FeatureLayer {
    markers: Vec<Rc<Marker>>,
}

impl FeatureLayer {
    /// Build one marker per feature. `point_to_layer` decides how each
    /// marker looks; the feature is attached to the marker afterwards.
    pub fn new<F>(features: &[GeoPoint], mut point_to_layer: F) -> Self
    where
        F: FnMut(&GeoPoint, LatLng) -> Rc<Marker>,
    {
        let markers = features
            .iter()
            .map(|feature| {
                let marker = point_to_layer(feature, feature.coordinates().to_lat_lng());
                marker.set_feature(feature.clone());
                marker
            })
            .collect();
        Self { markers }
    }

    pub fn markers(&self) -> &[Rc<Marker>] {
        &self.markers
    }
}

#[derive(Debug, Clone)]
pub struct ClusterOptions {
    /// Outline a cluster's member area while hovering its bubble
    pub show_coverage_on_hover: bool,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            show_coverage_on_hover: true,
        }
    }
}

#[derive(Clone)]
pub enum ClusterEvent {
    /// A member marker was clicked
    Click { marker: Rc<Marker> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterEventKind {
    Click,
}

impl Event for ClusterEvent {
    type Kind = ClusterEventKind;

    fn kind(&self) -> ClusterEventKind {
        ClusterEventKind::Click
    }
}

/// Layer owning a set of point markers and surfacing their clicks.
///
/// Grouping markers into bubbles is the renderer's concern; this layer
/// manages membership, rendering lifecycle and click propagation.
pub struct MarkerClusterGroup {
    id: LayerId,
    this: Weak<MarkerClusterGroup>,
    options: ClusterOptions,
    markers: RefCell<Vec<Rc<Marker>>>,
    marker_subscriptions: RefCell<Vec<Subscription>>,
    map: RefCell<Option<EngineMap>>,
    events: Evented<ClusterEvent>,
}

impl MarkerClusterGroup {
    pub fn new(options: ClusterOptions) -> Rc<Self> {
        Rc::new_cyclic(|this| MarkerClusterGroup {
            id: LayerId::next(),
            this: this.clone(),
            options,
            markers: RefCell::new(Vec::new()),
            marker_subscriptions: RefCell::new(Vec::new()),
            map: RefCell::new(None),
            events: Evented::new(),
        })
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    pub fn add_marker(&self, marker: Rc<Marker>) -> Result<()> {
        let group = self.this.clone();
        let subscription = marker.on_click(move |event| {
            let MarkerEvent::Click { marker } = event;
            if let Some(group) = group.upgrade() {
                group.events.fire(&ClusterEvent::Click {
                    marker: Rc::clone(marker),
                });
            }
        });
        self.marker_subscriptions.borrow_mut().push(subscription);
        self.markers.borrow_mut().push(Rc::clone(&marker));

        let map = self.map.borrow().clone();
        if let Some(map) = map {
            marker.on_add(&map)?;
        }
        Ok(())
    }

    pub fn add_feature_layer(&self, layer: &FeatureLayer) -> Result<()> {
        for marker in layer.markers() {
            self.add_marker(Rc::clone(marker))?;
        }
        Ok(())
    }

    pub fn markers(&self) -> Vec<Rc<Marker>> {
        self.markers.borrow().clone()
    }

    /// Marker built from the feature with `id`
    pub fn find_marker(&self, id: &PointId) -> Option<Rc<Marker>> {
        self.markers
            .borrow()
            .iter()
            .find(|marker| marker.feature().map_or(false, |f| &f.id == id))
            .cloned()
    }

    #[must_use = "dropping the subscription removes the listener"]
    pub fn on_click<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ClusterEvent) + 'static,
    {
        self.events.on(ClusterEventKind::Click, handler)
    }

    pub fn is_on_map(&self) -> bool {
        self.map.borrow().is_some()
    }
}

impl Layer for MarkerClusterGroup {
    fn id(&self) -> LayerId {
        self.id
    }

    fn on_add(&self, map: &EngineMap) -> Result<()> {
        *self.map.borrow_mut() = Some(map.clone());
        for marker in self.markers() {
            marker.on_add(map)?;
        }
        Ok(())
    }

    fn on_remove(&self, map: &EngineMap) {
        for marker in self.markers() {
            marker.on_remove(map);
        }
        *self.map.borrow_mut() = None;
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        LatLngBounds::from_points(self.markers.borrow().iter().map(|m| m.position()))
    }
}
