// src/config.rs v3
//! Service configuration and partial overrides

use crate::error::{MapError, Result};
use crate::geo::GeoPoint;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

/// Called with the feature of a point the user selected
pub type SelectPointCallback = Rc<dyn Fn(&GeoPoint)>;

#[derive(Clone)]
pub struct MapConfiguration {
    /// Id of the element the map renders into
    pub dom_element_id: String,
    pub zoom_default: u8,
    pub zoom_max: u8,
    pub icon_default_class: String,
    pub icon_current_class: String,
    pub icon_my_address_class: String,
    /// Provider map type, canonical or short alias
    pub map_type: String,
    /// Provider zoom animation length in milliseconds
    pub zoom_speed_ms: u64,
    pub on_select_point: Option<SelectPointCallback>,
}

impl Default for MapConfiguration {
    fn default() -> Self {
        Self {
            dom_element_id: "map".to_string(),
            zoom_default: 13,
            zoom_max: 18,
            icon_default_class: "s-pickup-map__marker s-pickup-map__marker_point".to_string(),
            icon_current_class: "s-pickup-map__marker s-pickup-map__marker_selected".to_string(),
            icon_my_address_class: "s-pickup-map__marker s-pickup-map__marker-my".to_string(),
            map_type: "map".to_string(),
            zoom_speed_ms: 250,
            on_select_point: None,
        }
    }
}

impl fmt::Debug for MapConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapConfiguration")
            .field("dom_element_id", &self.dom_element_id)
            .field("zoom_default", &self.zoom_default)
            .field("zoom_max", &self.zoom_max)
            .field("icon_default_class", &self.icon_default_class)
            .field("icon_current_class", &self.icon_current_class)
            .field("icon_my_address_class", &self.icon_my_address_class)
            .field("map_type", &self.map_type)
            .field("zoom_speed_ms", &self.zoom_speed_ms)
            .field("on_select_point", &self.on_select_point.is_some())
            .finish()
    }
}

impl MapConfiguration {
    /// Shallow-merge `patch`; fields it leaves unset keep their value
    pub fn merge(&mut self, patch: MapConfigPatch) {
        let MapConfigPatch {
            dom_element_id,
            zoom_default,
            zoom_max,
            icon_default_class,
            icon_current_class,
            icon_my_address_class,
            map_type,
            zoom_speed_ms,
            on_select_point,
        } = patch;

        if let Some(value) = dom_element_id {
            self.dom_element_id = value;
        }
        if let Some(value) = zoom_default {
            self.zoom_default = value;
        }
        if let Some(value) = zoom_max {
            self.zoom_max = value;
        }
        if let Some(value) = icon_default_class {
            self.icon_default_class = value;
        }
        if let Some(value) = icon_current_class {
            self.icon_current_class = value;
        }
        if let Some(value) = icon_my_address_class {
            self.icon_my_address_class = value;
        }
        if let Some(value) = map_type {
            self.map_type = value;
        }
        if let Some(value) = zoom_speed_ms {
            self.zoom_speed_ms = value;
        }
        if let Some(callback) = on_select_point {
            self.on_select_point = callback;
        }
    }

    pub fn zoom_speed(&self) -> Duration {
        Duration::from_millis(self.zoom_speed_ms)
    }

    /// Check values the map cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.dom_element_id.is_empty() {
            return Err(MapError::InvalidInput("domElementId is empty".to_string()));
        }
        if self.zoom_default > self.zoom_max {
            return Err(MapError::InvalidInput(format!(
                "zoomDefault {} exceeds zoomMax {}",
                self.zoom_default, self.zoom_max
            )));
        }
        Ok(())
    }
}

/// Partial configuration; every field is optional
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MapConfigPatch {
    pub dom_element_id: Option<String>,
    pub zoom_default: Option<u8>,
    pub zoom_max: Option<u8>,
    pub icon_default_class: Option<String>,
    pub icon_current_class: Option<String>,
    pub icon_my_address_class: Option<String>,
    pub map_type: Option<String>,
    pub zoom_speed_ms: Option<u64>,
    /// `Some(None)` removes a configured callback
    #[serde(skip)]
    pub on_select_point: Option<Option<SelectPointCallback>>,
}

impl MapConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dom_element_id(mut self, id: &str) -> Self {
        self.dom_element_id = Some(id.to_string());
        self
    }

    pub fn zoom_default(mut self, zoom: u8) -> Self {
        self.zoom_default = Some(zoom);
        self
    }

    pub fn zoom_max(mut self, zoom: u8) -> Self {
        self.zoom_max = Some(zoom);
        self
    }

    pub fn map_type(mut self, map_type: &str) -> Self {
        self.map_type = Some(map_type.to_string());
        self
    }

    pub fn on_select_point<F>(mut self, callback: F) -> Self
    where
        F: Fn(&GeoPoint) + 'static,
    {
        self.on_select_point = Some(Some(Rc::new(callback)));
        self
    }

    pub fn clear_on_select_point(mut self) -> Self {
        self.on_select_point = Some(None);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load overrides from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MapError::Other(format!("Failed to read config file {}: {}", path.display(), e)))?;
        Self::from_json(&contents)
    }
}

impl fmt::Debug for MapConfigPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapConfigPatch")
            .field("dom_element_id", &self.dom_element_id)
            .field("zoom_default", &self.zoom_default)
            .field("zoom_max", &self.zoom_max)
            .field("map_type", &self.map_type)
            .field("zoom_speed_ms", &self.zoom_speed_ms)
            .field(
                "on_select_point",
                &self.on_select_point.as_ref().map(|callback| callback.is_some()),
            )
            .finish_non_exhaustive()
    }
}
