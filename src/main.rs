// src/main.rs v4
//! Point Map - runs the point map service headlessly over a GeoJSON file

use anyhow::{bail, Context};
use clap::Parser;
use point_map::config::{MapConfigPatch, MapConfiguration};
use point_map::geo::{FeatureCollection, GeoPoint, LngLat, PointId, Size};
use point_map::provider::headless::{HeadlessRuntime, HeadlessScriptHost};
use point_map::provider::{LoaderConfig, ResourceLoader};
use point_map::service::{PointMapService, ServiceDeps};
use point_map::{engine::Document, logging};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "point-map")]
#[command(about = "Plot GeoJSON points as clustered, selectable markers", long_about = None)]
struct Args {
    /// GeoJSON FeatureCollection of points
    points: PathBuf,

    /// JSON file with configuration overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Id of the point to load as selected
    #[arg(long)]
    current: Option<String>,

    /// Id of a point to click after loading
    #[arg(long)]
    select: Option<String>,

    /// Provider map type (map, satellite, hybrid, publicMap, publicMapHybrid)
    #[arg(long)]
    map_type: Option<String>,

    /// "My address" marker as LNG,LAT
    #[arg(long, value_parser = parse_lng_lat)]
    my_address: Option<LngLat>,

    /// Viewport size as WIDTHxHEIGHT
    #[arg(long, default_value = "800x600", value_parser = parse_size)]
    size: Size,

    /// Give up loading the provider script after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = logging::DEFAULT_LEVEL)]
    log_level: String,
}

fn parse_lng_lat(value: &str) -> Result<LngLat, String> {
    let (lng, lat) = value
        .split_once(',')
        .ok_or_else(|| format!("expected LNG,LAT, got '{}'", value))?;
    let lng = lng.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let lat = lat.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok(LngLat(lng, lat))
}

fn parse_size(value: &str) -> Result<Size, String> {
    let (x, y) = value
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let x = x.parse::<f64>().map_err(|e| e.to_string())?;
    let y = y.parse::<f64>().map_err(|e| e.to_string())?;
    Ok(Size::new(x, y))
}

/// Numeric ids match numeric features, anything else matches text ids
fn parse_point_id(value: &str) -> PointId {
    value
        .parse::<i64>()
        .map(PointId::Number)
        .unwrap_or_else(|_| PointId::from(value))
}

fn find_point<'a>(points: &'a FeatureCollection, id: &str) -> anyhow::Result<&'a GeoPoint> {
    points
        .find(&parse_point_id(id))
        .with_context(|| format!("No point with id '{}'", id))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(&args.log_level)?;

    let json = std::fs::read_to_string(&args.points)
        .with_context(|| format!("Failed to read {}", args.points.display()))?;
    let points = FeatureCollection::from_json(&json)
        .with_context(|| format!("Failed to parse {}", args.points.display()))?;

    let mut patch = match &args.config {
        Some(path) => MapConfigPatch::load_from_file(path)?,
        None => MapConfigPatch::new(),
    };
    if let Some(map_type) = &args.map_type {
        patch = patch.map_type(map_type);
    }

    let selections = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&selections);
    patch = patch.on_select_point(move |point: &GeoPoint| sink.borrow_mut().push(point.id.clone()));

    let mut config = MapConfiguration::default();
    config.merge(patch);

    let document = Document::new();
    document.add_container(&config.dom_element_id, args.size);

    let service = PointMapService::new(
        ServiceDeps {
            document,
            runtime: Rc::new(HeadlessRuntime::new()),
            loader: ResourceLoader::shared(
                Arc::new(HeadlessScriptHost::new()),
                LoaderConfig {
                    timeout: args.timeout_ms.map(Duration::from_millis),
                    ..Default::default()
                },
            ),
        },
        config.clone(),
    );

    service.init().await.context("Failed to initialize map")?;

    let current = args
        .current
        .as_deref()
        .map(|id| find_point(&points, id))
        .transpose()?;
    service.load_points(&points.features, current)?;

    if let Some(coords) = args.my_address {
        service.add_my_address_marker(coords)?;
    }

    if let Some(id) = &args.select {
        let Some(marker) = service
            .markers_layer()
            .and_then(|layer| layer.find_marker(&parse_point_id(id)))
        else {
            bail!("No marker for point '{}'", id);
        };
        marker.click();
    }

    let Some(map) = service.map() else {
        bail!("Map not available after init");
    };
    let center = map.center();

    println!("Container:      #{}", config.dom_element_id);
    println!("Map type:       {}", service.adapter().map_or_else(String::new, |a| a.map_type().to_string()));
    println!("Points:         {}", points.features.len());
    println!("Center:         {:.6}, {:.6}", center.lat, center.lng);
    println!("Zoom:           {}", map.zoom());
    match service.current_marker().and_then(|m| m.feature()) {
        Some(feature) => println!("Selected point: {}", feature.id),
        None => println!("Selected point: none"),
    }
    for id in selections.borrow().iter() {
        println!("Callback fired: {}", id);
    }
    if let Some(marker) = service.my_address_marker() {
        let position = marker.position();
        println!("My address:     {:.6}, {:.6}", position.lat, position.lng);
    }

    service.destroy();
    Ok(())
}
