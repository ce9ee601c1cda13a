// src/provider/map_type.rs
//! Provider map types and alias resolution

use std::fmt;

const PREFIX: &str = "yandex#";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MapType {
    #[default]
    Map,
    Satellite,
    Hybrid,
    PublicMap,
    PublicMapHybrid,
}

impl MapType {
    pub const ALL: [MapType; 5] = [
        MapType::Map,
        MapType::Satellite,
        MapType::Hybrid,
        MapType::PublicMap,
        MapType::PublicMapHybrid,
    ];

    /// Short alias, e.g. `satellite`
    pub fn alias(self) -> &'static str {
        match self {
            MapType::Map => "map",
            MapType::Satellite => "satellite",
            MapType::Hybrid => "hybrid",
            MapType::PublicMap => "publicMap",
            MapType::PublicMapHybrid => "publicMapHybrid",
        }
    }

    /// Canonical provider identifier, e.g. `yandex#satellite`
    pub fn canonical(self) -> &'static str {
        match self {
            MapType::Map => "yandex#map",
            MapType::Satellite => "yandex#satellite",
            MapType::Hybrid => "yandex#hybrid",
            MapType::PublicMap => "yandex#publicMap",
            MapType::PublicMapHybrid => "yandex#publicMapHybrid",
        }
    }

    /// Resolve a canonical name or short alias. Anything unrecognized,
    /// including no input at all, resolves to [`MapType::Map`].
    pub fn resolve(name: Option<&str>) -> MapType {
        let Some(name) = name else {
            return MapType::default();
        };
        let alias = name.strip_prefix(PREFIX).unwrap_or(name);
        MapType::ALL
            .into_iter()
            .find(|t| t.alias() == alias)
            .unwrap_or_default()
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}
