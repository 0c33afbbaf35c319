use serde::{Deserialize, Serialize};

use crate::{coordinates::Coordinates, transportation_mode::TransportationMode};

/// A destination that property distances are measured against.
///
/// Owned by an external registry; the engine only reads snapshots of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestPoint {
    pub id: String,
    pub name: String,
    pub category: String,
    pub coordinates: Coordinates,
    #[serde(default = "default_transportation_mode")]
    pub default_transportation_mode: TransportationMode,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

fn default_transportation_mode() -> TransportationMode {
    TransportationMode::Driving
}

fn default_is_active() -> bool {
    true
}

impl InterestPoint {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
        coordinates: Coordinates,
        default_transportation_mode: TransportationMode,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            coordinates,
            default_transportation_mode,
            is_active: true,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
