// src/geo/coords.rs v2
//! Coordinates, bounds and Web-Mercator projection

use serde::{Deserialize, Serialize};

/// Pixel size of one tile at zoom 0
pub const TILE_SIZE: f64 = 256.0;

const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// A position as the rendering engine sees it (latitude first)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A GeoJSON coordinate pair, serialized as `[longitude, latitude]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat(pub f64, pub f64);

impl LngLat {
    pub fn to_lat_lng(self) -> LatLng {
        LatLng::new(self.1, self.0)
    }
}

impl From<LngLat> for LatLng {
    fn from(coords: LngLat) -> Self {
        coords.to_lat_lng()
    }
}

/// Pixel dimensions of a map viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub x: f64,
    pub y: f64,
}

impl Size {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounds in geographic space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn from_point(point: LatLng) -> Self {
        Self {
            south_west: point,
            north_east: point,
        }
    }

    /// Smallest bounds covering every point, `None` for an empty input
    pub fn from_points<I: IntoIterator<Item = LatLng>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::from_point(first);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, point: LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }
}

/// Project a position to world pixel coordinates at the given zoom
pub fn project(point: LatLng, zoom: f64) -> (f64, f64) {
    let world = TILE_SIZE * 2_f64.powf(zoom);
    let lat_rad = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (point.lng + 180.0) / 360.0 * world;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * world;
    (x, y)
}

/// Highest whole zoom level at which `bounds` fits inside `size`
pub fn bounds_zoom(bounds: &LatLngBounds, size: Size, max_zoom: f64) -> f64 {
    let mut zoom = max_zoom.floor();
    while zoom > 0.0 {
        let (west, north) = project(
            LatLng::new(bounds.north_east.lat, bounds.south_west.lng),
            zoom,
        );
        let (east, south) = project(
            LatLng::new(bounds.south_west.lat, bounds.north_east.lng),
            zoom,
        );
        if (east - west).abs() <= size.x && (south - north).abs() <= size.y {
            return zoom;
        }
        zoom -= 1.0;
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lng_lat_serializes_as_pair() {
        let coords = LngLat(37.6, 55.7);
        assert_eq!(serde_json::to_string(&coords).unwrap(), "[37.6,55.7]");
        assert_eq!(coords.to_lat_lng(), LatLng::new(55.7, 37.6));
    }

    #[test]
    fn test_projection_origin() {
        let (x, y) = project(LatLng::new(0.0, 0.0), 0.0);
        assert!((x - 128.0).abs() < 1e-9);
        assert!((y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_extend_and_center() {
        let bounds = LatLngBounds::from_points(vec![
            LatLng::new(55.0, 37.0),
            LatLng::new(56.0, 38.0),
            LatLng::new(55.5, 36.0),
        ])
        .unwrap();
        assert_eq!(bounds.south_west, LatLng::new(55.0, 36.0));
        assert_eq!(bounds.north_east, LatLng::new(56.0, 38.0));
        assert_eq!(bounds.center(), LatLng::new(55.5, 37.0));
        assert!(LatLngBounds::from_points(Vec::new()).is_none());
    }

    #[test]
    fn test_bounds_zoom() {
        let size = Size::new(800.0, 600.0);
        let point = LatLngBounds::from_point(LatLng::new(55.7, 37.6));
        assert_eq!(bounds_zoom(&point, size, 18.0), 18.0);

        // Roughly the Moscow ring road
        let city = LatLngBounds::from_points(vec![
            LatLng::new(55.57, 37.37),
            LatLng::new(55.91, 37.84),
        ])
        .unwrap();
        let zoom = bounds_zoom(&city, size, 18.0);
        assert!(zoom >= 9.0 && zoom <= 11.0, "zoom was {}", zoom);

        let world = LatLngBounds::from_points(vec![
            LatLng::new(-80.0, -179.0),
            LatLng::new(80.0, 179.0),
        ])
        .unwrap();
        assert_eq!(bounds_zoom(&world, size, 18.0), 1.0);
    }
}
