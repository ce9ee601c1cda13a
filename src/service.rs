// src/service.rs v3
//! Point map service: clustered point markers over the provider base layer,
//! with a single selected marker and a select callback.
//!
//! The service is `uninitialized` until [`PointMapService::init`] resolves.
//! Every point and marker operation before that fails with
//! [`MapError::NotInitialized`]; [`PointMapService::destroy`] returns the
//! service to `uninitialized`, after which `init` may be called again.

use crate::config::{MapConfigPatch, MapConfiguration};
use crate::engine::{
    ClusterEvent, ClusterOptions, DivIcon, Document, EngineMap, FeatureLayer, Layer, LayerRef,
    MapOptions, Marker, MarkerClusterGroup, Subscription,
};
use crate::error::{MapError, Result};
use crate::geo::{GeoPoint, LatLng, LngLat};
use crate::provider::{ProviderRuntime, ResourceLoader, YandexLayer, YandexLayerOptions};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Provider option that stops the provider's own POI popups
const DISABLE_POI_INTERACTIVITY: &str = "yandexMapDisablePoiInteractivity";

/// Everything the service needs from its surroundings
pub struct ServiceDeps {
    pub document: Document,
    pub runtime: Rc<dyn ProviderRuntime>,
    pub loader: Arc<ResourceLoader>,
}

#[derive(Debug, Clone)]
struct MarkerIcons {
    default: DivIcon,
    current: DivIcon,
    my_address: DivIcon,
}

impl MarkerIcons {
    fn from_config(config: &MapConfiguration) -> Self {
        Self {
            default: DivIcon::new(&config.icon_default_class),
            current: DivIcon::new(&config.icon_current_class),
            my_address: DivIcon::new(&config.icon_my_address_class),
        }
    }
}

struct ClusterLayer {
    group: Rc<MarkerClusterGroup>,
    _click: Subscription,
}

/// The parts of the ready state fixed at `init`. Cloned out of the state
/// so engine calls, and the listeners they fire, run with nothing borrowed.
#[derive(Clone)]
struct MapHandle {
    map: EngineMap,
    adapter: Rc<YandexLayer>,
    icons: MarkerIcons,
    zoom_default: f64,
}

impl MapHandle {
    /// Center on `center`; without a zoom, raise the current zoom to the
    /// default but never lower it
    fn center_on(&self, center: LatLng, zoom: Option<f64>) {
        let zoom = zoom.unwrap_or_else(|| self.map.zoom().max(self.zoom_default));
        self.map.set_view(center, zoom);
    }
}

struct ReadyState {
    handle: MapHandle,
    _map_object_initialized: Subscription,
    markers_layer: Option<ClusterLayer>,
    current_marker: Option<Rc<Marker>>,
    my_address_marker: Option<Rc<Marker>>,
}

pub struct PointMapService {
    this: Weak<PointMapService>,
    deps: ServiceDeps,
    config: RefCell<MapConfiguration>,
    state: RefCell<Option<ReadyState>>,
    init_lock: Mutex<()>,
}

impl PointMapService {
    pub fn new(deps: ServiceDeps, config: MapConfiguration) -> Rc<Self> {
        Rc::new_cyclic(|this| PointMapService {
            this: this.clone(),
            deps,
            config: RefCell::new(config),
            state: RefCell::new(None),
            init_lock: Mutex::new(()),
        })
    }

    /// Service with the default configuration
    pub fn with_defaults(deps: ServiceDeps) -> Rc<Self> {
        Self::new(deps, MapConfiguration::default())
    }

    /// Shallow-merge `patch` into the configuration. Container, zoom and
    /// icon settings take effect on the next `init`.
    pub fn configure(&self, patch: MapConfigPatch) -> &Self {
        debug!(?patch, "Configuring point map");
        self.config.borrow_mut().merge(patch);
        self
    }

    pub fn config(&self) -> MapConfiguration {
        self.config.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn map(&self) -> Option<EngineMap> {
        self.state.borrow().as_ref().map(|s| s.handle.map.clone())
    }

    pub fn adapter(&self) -> Option<Rc<YandexLayer>> {
        self.state
            .borrow()
            .as_ref()
            .map(|s| Rc::clone(&s.handle.adapter))
    }

    pub fn current_marker(&self) -> Option<Rc<Marker>> {
        self.state
            .borrow()
            .as_ref()
            .and_then(|s| s.current_marker.clone())
    }

    pub fn markers_layer(&self) -> Option<Rc<MarkerClusterGroup>> {
        self.state
            .borrow()
            .as_ref()
            .and_then(|s| s.markers_layer.as_ref().map(|l| Rc::clone(&l.group)))
    }

    pub fn my_address_marker(&self) -> Option<Rc<Marker>> {
        self.state
            .borrow()
            .as_ref()
            .and_then(|s| s.my_address_marker.clone())
    }

    fn handle(&self, operation: &'static str) -> Result<MapHandle> {
        self.state
            .borrow()
            .as_ref()
            .map(|s| s.handle.clone())
            .ok_or(MapError::NotInitialized { operation })
    }

    /// Mutate the ready state. `f` must not touch the engine.
    fn update_state<T>(&self, f: impl FnOnce(&mut ReadyState) -> T) -> Option<T> {
        self.state.borrow_mut().as_mut().map(f)
    }

    /// Load the provider runtime, build the map in the configured container
    /// and install the provider layer as its base layer.
    ///
    /// Overlapping calls run one at a time; once one succeeds the rest
    /// return immediately.
    pub async fn init(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;
        if self.is_ready() {
            debug!("Point map already initialized");
            return Ok(());
        }

        let config = self.config();
        config.validate()?;

        self.deps.loader.ensure_loaded().await?;

        let map = EngineMap::new(
            &self.deps.document,
            &config.dom_element_id,
            MapOptions {
                zoom: f64::from(config.zoom_default),
                max_zoom: f64::from(config.zoom_max),
                zoom_animation: false,
                ..Default::default()
            },
        )?;

        let adapter = YandexLayer::new(
            Some(&config.map_type),
            YandexLayerOptions {
                max_zoom: f64::from(config.zoom_max),
                zoom_speed: config.zoom_speed(),
                ..Default::default()
            },
            Rc::clone(&self.deps.runtime),
        );
        let map_object_initialized = adapter.on_map_object_initialized(|map_object| {
            map_object.set_option(DISABLE_POI_INTERACTIVITY, serde_json::Value::Bool(true));
        });

        let attached = match map.add_layer(adapter.clone()) {
            Ok(()) => adapter.initialize_map_object().await,
            Err(e) => Err(e),
        };
        if let Err(e) = attached {
            map.remove();
            return Err(e);
        }

        *self.state.borrow_mut() = Some(ReadyState {
            handle: MapHandle {
                map,
                adapter,
                icons: MarkerIcons::from_config(&config),
                zoom_default: f64::from(config.zoom_default),
            },
            _map_object_initialized: map_object_initialized,
            markers_layer: None,
            current_marker: None,
            my_address_marker: None,
        });

        info!(
            container = %config.dom_element_id,
            map_type = %config.map_type,
            "Point map initialized"
        );
        Ok(())
    }

    /// Replace the point markers with `points`.
    ///
    /// The first marker whose feature id matches `current_point` is drawn
    /// selected and becomes the current marker. The view fits all points,
    /// then centers on `current_point` at the default zoom, or on the first
    /// point.
    pub fn load_points(&self, points: &[GeoPoint], current_point: Option<&GeoPoint>) -> Result<()> {
        let handle = self.handle("load_points")?;
        let Some(focus) = current_point.or_else(|| points.first()) else {
            warn!("load_points called with no points and no current point");
            return Err(MapError::InvalidInput(
                "load_points needs at least one point or a current point".to_string(),
            ));
        };

        self.detach_points(&handle);

        let icons = &handle.icons;
        let current_id = current_point.map(|p| &p.id);
        let mut selected: Option<Rc<Marker>> = None;
        let features = FeatureLayer::new(points, |point, latlng| {
            let is_current = selected.is_none() && current_id == Some(&point.id);
            let icon = if is_current {
                icons.current.clone()
            } else {
                icons.default.clone()
            };
            let marker = Marker::new(latlng, icon);
            if is_current {
                selected = Some(Rc::clone(&marker));
            }
            marker
        });

        let group = MarkerClusterGroup::new(ClusterOptions {
            show_coverage_on_hover: false,
        });
        group.add_feature_layer(&features)?;

        let service = self.this.clone();
        let click = group.on_click(move |event| {
            let ClusterEvent::Click { marker } = event;
            if let Some(service) = service.upgrade() {
                service.on_marker_click(marker);
            }
        });

        handle.map.add_layer(group.clone())?;
        let layer = ClusterLayer {
            group: Rc::clone(&group),
            _click: click,
        };
        self.update_state(move |s| {
            s.markers_layer = Some(layer);
            s.current_marker = selected;
        });

        if let Some(bounds) = group.bounds() {
            handle.map.fit_bounds(&bounds);
        }
        let zoom = current_point.map(|_| handle.zoom_default);
        handle.center_on(focus.coordinates().to_lat_lng(), zoom);

        info!(count = points.len(), current = ?current_id, "Loaded points");
        Ok(())
    }

    /// Drop the point markers, if any
    pub fn remove_points(&self) -> Result<()> {
        let handle = self.handle("remove_points")?;
        self.detach_points(&handle);
        Ok(())
    }

    fn detach_points(&self, handle: &MapHandle) {
        let layer = self
            .update_state(|s| {
                s.current_marker = None;
                s.markers_layer.take()
            })
            .flatten();

        if let Some(layer) = layer {
            let group: LayerRef = layer.group.clone();
            handle.map.remove_layer(&group);
            debug!("Removed point markers");
        }
    }

    /// Move the map to `coords`. Without `zoom`, keeps the current zoom
    /// unless it is below the configured default.
    pub fn set_map_center(&self, coords: LngLat, zoom: Option<f64>) -> Result<()> {
        let handle = self.handle("set_map_center")?;
        handle.center_on(coords.to_lat_lng(), zoom);
        Ok(())
    }

    /// Mark `marker` selected; the previous selection reverts to default
    pub fn set_current_marker(&self, marker: Rc<Marker>) -> Result<()> {
        let handle = self.handle("set_current_marker")?;
        self.swap_current_marker(&handle, Some(marker));
        Ok(())
    }

    pub fn reset_current_marker(&self) -> Result<()> {
        let handle = self.handle("reset_current_marker")?;
        self.swap_current_marker(&handle, None);
        Ok(())
    }

    fn swap_current_marker(&self, handle: &MapHandle, marker: Option<Rc<Marker>>) {
        let next = marker.clone();
        let previous = self
            .update_state(move |s| std::mem::replace(&mut s.current_marker, next))
            .flatten();

        if let Some(previous) = previous {
            if !marker.as_ref().map_or(false, |m| Rc::ptr_eq(m, &previous)) {
                previous.set_icon(handle.icons.default.clone());
            }
        }
        if let Some(marker) = marker {
            marker.set_icon(handle.icons.current.clone());
        }
    }

    /// Show the "my address" marker at `coords`, replacing any previous one,
    /// and center the map on it
    pub fn add_my_address_marker(&self, coords: LngLat) -> Result<()> {
        let handle = self.handle("add_my_address_marker")?;
        self.detach_my_address_marker(&handle);

        let position = coords.to_lat_lng();
        handle.center_on(position, None);

        let marker = Marker::new(position, handle.icons.my_address.clone());
        handle.map.add_layer(marker.clone())?;

        // A move listener may have placed its own marker meanwhile
        let stale = self
            .update_state(move |s| s.my_address_marker.replace(marker))
            .flatten();
        if let Some(stale) = stale {
            let layer: LayerRef = stale;
            handle.map.remove_layer(&layer);
        }
        Ok(())
    }

    pub fn remove_my_address_marker(&self) -> Result<()> {
        let handle = self.handle("remove_my_address_marker")?;
        self.detach_my_address_marker(&handle);
        Ok(())
    }

    fn detach_my_address_marker(&self, handle: &MapHandle) {
        let marker = self
            .update_state(|s| s.my_address_marker.take())
            .flatten();
        if let Some(marker) = marker {
            let layer: LayerRef = marker;
            handle.map.remove_layer(&layer);
        }
    }

    fn on_marker_click(&self, marker: &Rc<Marker>) {
        let Ok(handle) = self.handle("select_point") else {
            return;
        };
        let feature = marker.feature();

        self.swap_current_marker(&handle, Some(Rc::clone(marker)));

        let center = feature
            .as_ref()
            .map_or(marker.position(), |f| f.coordinates().to_lat_lng());
        handle.center_on(center, None);

        debug!(point = ?feature.as_ref().map(|f| &f.id), "Point selected");

        let callback = self.config.borrow().on_select_point.clone();
        if let (Some(callback), Some(feature)) = (callback, feature) {
            callback(&feature);
        }
    }

    /// Tear down the map. The service is uninitialized afterwards.
    pub fn destroy(&self) {
        let Some(mut state) = self.state.borrow_mut().take() else {
            return;
        };
        let map = &state.handle.map;

        if let Some(marker) = state.current_marker.take() {
            marker.set_icon(state.handle.icons.default.clone());
        }
        if let Some(layer) = state.markers_layer.take() {
            let group: LayerRef = layer.group.clone();
            map.remove_layer(&group);
        }
        if let Some(marker) = state.my_address_marker.take() {
            let layer: LayerRef = marker;
            map.remove_layer(&layer);
        }
        map.remove();

        info!("Point map destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MapEventKind;
    use crate::geo::{PointId, Size};
    use crate::provider::headless::{HeadlessRuntime, HeadlessScriptHost};
    use crate::provider::LoaderConfig;

    struct Harness {
        service: Rc<PointMapService>,
        runtime: Rc<HeadlessRuntime>,
        host: Arc<HeadlessScriptHost>,
        document: Document,
    }

    fn harness_with(runtime: HeadlessRuntime) -> Harness {
        let document = Document::new();
        document.add_container("map", Size::new(800.0, 600.0));
        let runtime = Rc::new(runtime);
        let host = Arc::new(HeadlessScriptHost::new());
        let loader = ResourceLoader::shared(host.clone(), LoaderConfig::default());

        let service = PointMapService::with_defaults(ServiceDeps {
            document: document.clone(),
            runtime: runtime.clone(),
            loader,
        });
        Harness {
            service,
            runtime,
            host,
            document,
        }
    }

    fn harness() -> Harness {
        harness_with(HeadlessRuntime::with_map_package())
    }

    async fn ready() -> Harness {
        let h = harness();
        h.service.init().await.unwrap();
        h
    }

    fn points() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(1, LngLat(37.60, 55.70)),
            GeoPoint::new(2, LngLat(37.65, 55.75)),
            GeoPoint::new(3, LngLat(37.70, 55.80)),
        ]
    }

    fn marker_for(service: &PointMapService, id: i64) -> Rc<Marker> {
        service
            .markers_layer()
            .and_then(|layer| layer.find_marker(&PointId::Number(id)))
            .expect("marker for point")
    }

    fn is_selected(service: &PointMapService, marker: &Marker) -> bool {
        marker.icon().class_name == service.config().icon_current_class
    }

    #[test]
    fn test_operations_before_init_fail() {
        let h = harness();
        assert!(!h.service.is_ready());

        let err = h.service.load_points(&points(), None).unwrap_err();
        assert!(matches!(err, MapError::NotInitialized { operation: "load_points" }));
        assert!(matches!(
            h.service.remove_points(),
            Err(MapError::NotInitialized { operation: "remove_points" })
        ));
        assert!(matches!(
            h.service.set_map_center(LngLat(37.6, 55.7), None),
            Err(MapError::NotInitialized { operation: "set_map_center" })
        ));
        assert!(h.service.add_my_address_marker(LngLat(37.6, 55.7)).is_err());
    }

    #[tokio::test]
    async fn test_init_builds_map_and_base_layer() {
        let h = ready().await;
        assert!(h.service.is_ready());
        assert_eq!(h.host.insertions(), 1);

        let map = h.service.map().unwrap();
        assert_eq!(map.zoom(), 13.0);
        assert!(!map.options().zoom_animation);
        assert_eq!(map.layer_count(), 1);
        // No zoomstart listener without zoom animation
        assert_eq!(map.listener_count(MapEventKind::ZoomStart), 0);

        let provider = h.runtime.last_map().unwrap();
        assert_eq!(
            provider.option(DISABLE_POI_INTERACTIVITY),
            Some(serde_json::Value::Bool(true))
        );

        // A second init is a no-op
        h.service.init().await.unwrap();
        assert_eq!(h.runtime.maps().len(), 1);
    }

    #[tokio::test]
    async fn test_init_waits_for_deferred_provider_packages() {
        let h = harness_with(HeadlessRuntime::new());
        h.service.init().await.unwrap();

        let adapter = h.service.adapter().unwrap();
        assert!(adapter.map_object().is_some());
        assert_eq!(h.runtime.load_requests().len(), 1);
        assert!(h.runtime.last_map().unwrap().option(DISABLE_POI_INTERACTIVITY).is_some());
    }

    #[tokio::test]
    async fn test_init_fails_without_container() {
        let h = harness();
        h.service
            .configure(MapConfigPatch::new().dom_element_id("missing"));

        let err = h.service.init().await.unwrap_err();
        assert!(matches!(err, MapError::ContainerNotFound(_)));
        assert!(!h.service.is_ready());
    }

    #[tokio::test]
    async fn test_load_points_selects_current_point() {
        let h = ready().await;
        let pts = points();
        h.service.load_points(&pts, Some(&pts[1])).unwrap();

        let current = h.service.current_marker().unwrap();
        let p2 = marker_for(&h.service, 2);
        assert!(Rc::ptr_eq(&current, &p2));
        assert!(is_selected(&h.service, &p2));
        assert!(!is_selected(&h.service, &marker_for(&h.service, 1)));
        assert!(!is_selected(&h.service, &marker_for(&h.service, 3)));

        let map = h.service.map().unwrap();
        assert_eq!(map.center(), LatLng::new(55.75, 37.65));
        assert_eq!(map.zoom(), 13.0);
    }

    #[tokio::test]
    async fn test_reload_replaces_cluster_layer() {
        let h = ready().await;
        let pts = points();
        h.service.load_points(&pts, Some(&pts[0])).unwrap();
        let first = h.service.markers_layer().unwrap();

        h.service.load_points(&pts[1..], None).unwrap();
        let second = h.service.markers_layer().unwrap();

        let map = h.service.map().unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert!(!first.is_on_map());
        assert_eq!(map.layer_count(), 2);
        assert_eq!(map.marker_pane().children().len(), 2);
        assert!(h.service.current_marker().is_none());
    }

    #[tokio::test]
    async fn test_set_and_reset_current_marker() {
        let h = ready().await;
        h.service.load_points(&points(), None).unwrap();

        let first = marker_for(&h.service, 1);
        let second = marker_for(&h.service, 2);

        h.service.set_current_marker(Rc::clone(&first)).unwrap();
        h.service.set_current_marker(Rc::clone(&second)).unwrap();
        assert!(!is_selected(&h.service, &first));
        assert!(is_selected(&h.service, &second));

        h.service.reset_current_marker().unwrap();
        assert!(!is_selected(&h.service, &second));
        assert!(h.service.current_marker().is_none());

        // Nothing selected: still fine
        h.service.reset_current_marker().unwrap();
    }

    #[tokio::test]
    async fn test_set_map_center_only_raises_zoom() {
        let h = ready().await;
        let map = h.service.map().unwrap();

        map.set_view(LatLng::new(55.0, 37.0), 10.0);
        h.service.set_map_center(LngLat(37.6, 55.7), None).unwrap();
        assert_eq!(map.zoom(), 13.0);
        assert_eq!(map.center(), LatLng::new(55.7, 37.6));

        map.set_view(LatLng::new(55.0, 37.0), 15.0);
        h.service.set_map_center(LngLat(37.6, 55.7), None).unwrap();
        assert_eq!(map.zoom(), 15.0);

        h.service.set_map_center(LngLat(37.6, 55.7), Some(9.0)).unwrap();
        assert_eq!(map.zoom(), 9.0);
    }

    #[tokio::test]
    async fn test_single_point_without_selection() {
        let h = ready().await;
        h.service
            .load_points(&[GeoPoint::new(1, LngLat(37.6, 55.7))], None)
            .unwrap();

        let map = h.service.map().unwrap();
        assert_eq!(map.center(), LatLng::new(55.7, 37.6));
        assert!(map.zoom() >= 13.0);
        assert!(h.service.current_marker().is_none());
        assert!(!is_selected(&h.service, &marker_for(&h.service, 1)));
    }

    #[tokio::test]
    async fn test_load_points_rejects_nothing_to_center_on() {
        let h = ready().await;
        h.service.load_points(&points(), None).unwrap();
        let before = h.service.markers_layer().unwrap();

        let err = h.service.load_points(&[], None).unwrap_err();
        assert!(matches!(err, MapError::InvalidInput(_)));

        let after = h.service.markers_layer().unwrap();
        assert!(Rc::ptr_eq(&before, &after));
        assert!(after.is_on_map());
    }

    #[tokio::test]
    async fn test_current_point_alone_centers_on_it() {
        let h = ready().await;
        let current = GeoPoint::new("pvz-7", LngLat(30.3, 59.9));
        h.service.load_points(&[], Some(&current)).unwrap();

        let map = h.service.map().unwrap();
        assert_eq!(map.center(), LatLng::new(59.9, 30.3));
        assert_eq!(map.zoom(), 13.0);
        assert!(h.service.current_marker().is_none());
    }

    #[tokio::test]
    async fn test_click_selects_and_notifies() {
        let h = ready().await;
        let selected = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&selected);
        h.service.configure(
            MapConfigPatch::new().on_select_point(move |point| sink.borrow_mut().push(point.id.clone())),
        );

        let pts = points();
        h.service.load_points(&pts, Some(&pts[1])).unwrap();
        // Programmatic selection does not notify
        assert!(selected.borrow().is_empty());

        let p3 = marker_for(&h.service, 3);
        p3.click();

        assert_eq!(*selected.borrow(), vec![PointId::Number(3)]);
        assert!(Rc::ptr_eq(&h.service.current_marker().unwrap(), &p3));
        assert!(is_selected(&h.service, &p3));
        assert!(!is_selected(&h.service, &marker_for(&h.service, 2)));
        assert_eq!(h.service.map().unwrap().center(), LatLng::new(55.80, 37.70));
    }

    #[tokio::test]
    async fn test_callback_may_reload_points() {
        let h = ready().await;
        let service = Rc::downgrade(&h.service);
        h.service.configure(MapConfigPatch::new().on_select_point(move |point| {
            if let Some(service) = service.upgrade() {
                service.load_points(&[point.clone()], Some(point)).unwrap();
            }
        }));

        h.service.load_points(&points(), None).unwrap();
        marker_for(&h.service, 1).click();

        let layer = h.service.markers_layer().unwrap();
        assert_eq!(layer.markers().len(), 1);
        assert!(is_selected(&h.service, &marker_for(&h.service, 1)));
    }

    #[tokio::test]
    async fn test_my_address_marker_is_single() {
        let h = ready().await;
        let map = h.service.map().unwrap();
        let class = h.service.config().icon_my_address_class;

        h.service.add_my_address_marker(LngLat(37.5, 55.6)).unwrap();
        h.service.add_my_address_marker(LngLat(37.55, 55.65)).unwrap();

        let marker = h.service.my_address_marker().unwrap();
        assert_eq!(marker.icon().class_name, class);
        assert_eq!(marker.position(), LatLng::new(55.65, 37.55));
        assert_eq!(map.marker_pane().children().len(), 1);
        assert_eq!(map.center(), LatLng::new(55.65, 37.55));

        h.service.remove_my_address_marker().unwrap();
        assert!(h.service.my_address_marker().is_none());
        assert!(map.marker_pane().children().is_empty());
    }

    #[tokio::test]
    async fn test_destroy_then_reinit() {
        let h = ready().await;
        let pts = points();
        h.service.load_points(&pts, Some(&pts[0])).unwrap();
        let map = h.service.map().unwrap();

        h.service.destroy();
        assert!(!h.service.is_ready());
        assert!(map.is_removed());
        assert!(h.service.current_marker().is_none());
        assert!(matches!(
            h.service.load_points(&pts, None),
            Err(MapError::NotInitialized { .. })
        ));

        // Destroying twice is harmless
        h.service.destroy();

        h.service.init().await.unwrap();
        assert!(h.service.is_ready());
        assert_eq!(h.host.insertions(), 1);
        let container = h.document.get_element_by_id("map").unwrap();
        assert!(container.has_class("leaflet-container"));
    }

    #[tokio::test]
    async fn test_overlapping_init_builds_one_map() {
        let h = harness_with(HeadlessRuntime::new());
        let (first, second) = tokio::join!(h.service.init(), h.service.init());
        first.unwrap();
        second.unwrap();

        assert!(h.service.is_ready());
        assert_eq!(h.runtime.maps().len(), 1);
        assert_eq!(h.host.insertions(), 1);
        assert_eq!(h.service.map().unwrap().layer_count(), 1);
    }

    #[tokio::test]
    async fn test_move_listeners_may_query_service() {
        let h = ready().await;
        let map = h.service.map().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let service = Rc::downgrade(&h.service);
        let _moves = map.on(MapEventKind::Move, move |_| {
            if let Some(service) = service.upgrade() {
                sink.borrow_mut()
                    .push((service.is_ready(), service.current_marker().is_some()));
            }
        });

        h.service.set_map_center(LngLat(37.62, 55.72), Some(12.0)).unwrap();
        let pts = points();
        h.service.load_points(&pts, Some(&pts[0])).unwrap();
        marker_for(&h.service, 2).click();
        h.service.add_my_address_marker(LngLat(37.5, 55.6)).unwrap();

        let seen = seen.borrow();
        assert!(seen.len() >= 4);
        assert!(seen.iter().all(|(ready, _)| *ready));
        assert_eq!(seen.last(), Some(&(true, true)));
        assert!(h.service.my_address_marker().is_some());
    }

    #[tokio::test]
    async fn test_move_listener_may_clear_markers() {
        let h = ready().await;
        let map = h.service.map().unwrap();
        let service = Rc::downgrade(&h.service);
        let _moves = map.on(MapEventKind::Move, move |_| {
            if let Some(service) = service.upgrade() {
                service.remove_my_address_marker().unwrap();
            }
        });

        h.service.add_my_address_marker(LngLat(37.5, 55.6)).unwrap();
        assert!(h.service.my_address_marker().is_some());
        assert_eq!(map.marker_pane().children().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_ids_select_one_marker() {
        let h = ready().await;
        let pts = vec![
            GeoPoint::new(1, LngLat(37.60, 55.70)),
            GeoPoint::new(2, LngLat(37.65, 55.75)),
            GeoPoint::new(2, LngLat(37.70, 55.80)),
        ];
        h.service.load_points(&pts, Some(&pts[1])).unwrap();

        let layer = h.service.markers_layer().unwrap();
        let selected: Vec<_> = layer
            .markers()
            .into_iter()
            .filter(|m| is_selected(&h.service, m))
            .collect();
        assert_eq!(selected.len(), 1);
        assert!(Rc::ptr_eq(&selected[0], &h.service.current_marker().unwrap()));
        assert_eq!(selected[0].position(), LatLng::new(55.75, 37.65));

        // Selecting elsewhere leaves nothing highlighted behind
        marker_for(&h.service, 1).click();
        let highlighted = layer
            .markers()
            .iter()
            .filter(|m| is_selected(&h.service, m))
            .count();
        assert_eq!(highlighted, 1);
    }

    #[tokio::test]
    async fn test_remove_points_twice() {
        let h = ready().await;
        h.service.remove_points().unwrap();
        h.service.remove_points().unwrap();

        let pts = points();
        h.service.load_points(&pts, Some(&pts[2])).unwrap();
        let layer = h.service.markers_layer().unwrap();

        h.service.remove_points().unwrap();
        h.service.remove_points().unwrap();

        let map = h.service.map().unwrap();
        assert!(h.service.markers_layer().is_none());
        assert!(h.service.current_marker().is_none());
        assert!(!layer.is_on_map());
        assert_eq!(map.layer_count(), 1);
        assert!(map.marker_pane().children().is_empty());
    }
}
