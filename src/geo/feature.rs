// src/geo/feature.rs
//! GeoJSON point features as supplied by callers

use super::coords::LngLat;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable feature identifier, numeric or textual as in GeoJSON
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointId {
    Number(i64),
    Text(String),
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointId::Number(n) => write!(f, "{}", n),
            PointId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for PointId {
    fn from(id: i64) -> Self {
        PointId::Number(id)
    }
}

impl From<&str> for PointId {
    fn from(id: &str) -> Self {
        PointId::Text(id.to_string())
    }
}

impl From<String> for PointId {
    fn from(id: String) -> Self {
        PointId::Text(id)
    }
}

fn feature_type() -> String {
    "Feature".to_string()
}

fn point_type() -> String {
    "Point".to_string()
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type", default = "point_type")]
    pub kind: String,
    pub coordinates: LngLat,
}

/// A point feature; the service reads it but never mutates it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub id: PointId,
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    pub geometry: PointGeometry,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl GeoPoint {
    pub fn new(id: impl Into<PointId>, coordinates: LngLat) -> Self {
        Self {
            id: id.into(),
            kind: feature_type(),
            geometry: PointGeometry {
                kind: point_type(),
                coordinates,
            },
            properties: serde_json::Map::new(),
        }
    }

    pub fn coordinates(&self) -> LngLat {
        self.geometry.coordinates
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    pub features: Vec<GeoPoint>,
}

impl FeatureCollection {
    /// Parse a collection from GeoJSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn find(&self, id: &PointId) -> Option<&GeoPoint> {
        self.features.iter().find(|feature| &feature.id == id)
    }
}
