use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinatesError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// A WGS84 position. Stored as a `geo_types::Point` (x = longitude, y = latitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LatLon", into = "LatLon")]
pub struct Coordinates {
    point: geo_types::Point,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct LatLon {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinatesError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinatesError::Latitude(latitude));
        }

        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinatesError::Longitude(longitude));
        }

        Ok(Self {
            point: geo_types::Point::new(longitude, latitude),
        })
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    /// Fixed-point representation at `precision` decimal places.
    pub fn normalized(&self, precision: u8) -> (i64, i64) {
        let factor = 10f64.powi(i32::from(precision));
        (
            (self.lat() * factor).round() as i64,
            (self.lon() * factor).round() as i64,
        )
    }
}

impl Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat(), self.lon())
    }
}

impl TryFrom<LatLon> for Coordinates {
    type Error = CoordinatesError;

    fn try_from(value: LatLon) -> Result<Self, Self::Error> {
        Coordinates::new(value.latitude, value.longitude)
    }
}

impl From<Coordinates> for LatLon {
    fn from(value: Coordinates) -> Self {
        LatLon {
            latitude: value.lat(),
            longitude: value.lon(),
        }
    }
}
