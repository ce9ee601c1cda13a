// src/error.rs
//! Error types for the point map service

use std::fmt;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, MapError>;

#[derive(Debug)]
pub enum MapError {
    /// A map operation was called before `init` completed
    NotInitialized { operation: &'static str },
    /// The configured container element does not exist in the document
    ContainerNotFound(String),
    /// Caller supplied input the service cannot act on
    InvalidInput(String),
    /// The provider script did not become ready in time
    LoaderTimeout(Duration),
    Io(std::io::Error),
    Json(serde_json::Error),
    Other(String),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::NotInitialized { operation } => {
                write!(f, "{} error: call `init` first", operation)
            }
            MapError::ContainerNotFound(id) => {
                write!(f, "Map container element '{}' not found", id)
            }
            MapError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            MapError::LoaderTimeout(timeout) => {
                write!(f, "Map provider script not ready after {:?}", timeout)
            }
            MapError::Io(e) => write!(f, "IO error: {}", e),
            MapError::Json(e) => write!(f, "JSON error: {}", e),
            MapError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::Io(e) => Some(e),
            MapError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MapError {
    fn from(error: std::io::Error) -> Self {
        MapError::Io(error)
    }
}

impl From<serde_json::Error> for MapError {
    fn from(error: serde_json::Error) -> Self {
        MapError::Json(error)
    }
}

impl From<anyhow::Error> for MapError {
    fn from(error: anyhow::Error) -> Self {
        MapError::Other(error.to_string())
    }
}
