use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported transportation mode: {0}")]
pub struct UnsupportedModeError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportationMode {
    Driving,
    Walking,
    PublicTransport,
    Bicycling,
    Truck,
    Taxi,
    Bus,
    Train,
    Subway,
    Tram,
    Ferry,
}

/// Sub-modes HERE reports on transit sections. Only used when parsing.
const UPSTREAM_ALIASES: [(&str, TransportationMode); 8] = [
    ("regionalTrain", TransportationMode::Train),
    ("intercityTrain", TransportationMode::Train),
    ("highSpeedTrain", TransportationMode::Train),
    ("cityTrain", TransportationMode::Train),
    ("lightRail", TransportationMode::Tram),
    ("busRapid", TransportationMode::Bus),
    ("privateBus", TransportationMode::Bus),
    ("walk", TransportationMode::Walking),
];

impl TransportationMode {
    pub const ALL: [TransportationMode; 11] = [
        TransportationMode::Driving,
        TransportationMode::Walking,
        TransportationMode::PublicTransport,
        TransportationMode::Bicycling,
        TransportationMode::Truck,
        TransportationMode::Taxi,
        TransportationMode::Bus,
        TransportationMode::Train,
        TransportationMode::Subway,
        TransportationMode::Tram,
        TransportationMode::Ferry,
    ];

    /// Canonical HERE `transportMode` identifier. One arm per variant.
    pub fn to_upstream(self) -> &'static str {
        match self {
            TransportationMode::Driving => "car",
            TransportationMode::Walking => "pedestrian",
            TransportationMode::PublicTransport => "publicTransport",
            TransportationMode::Bicycling => "bicycle",
            TransportationMode::Truck => "truck",
            TransportationMode::Taxi => "taxi",
            TransportationMode::Bus => "bus",
            TransportationMode::Train => "train",
            TransportationMode::Subway => "subway",
            TransportationMode::Tram => "tram",
            TransportationMode::Ferry => "ferry",
        }
    }

    pub fn from_upstream(value: &str) -> Result<Self, UnsupportedModeError> {
        TransportationMode::ALL
            .into_iter()
            .find(|mode| mode.to_upstream() == value)
            .or_else(|| {
                UPSTREAM_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == value)
                    .map(|(_, mode)| *mode)
            })
            .ok_or_else(|| UnsupportedModeError(value.to_string()))
    }

    /// Modes served by the HERE Public Transit API rather than the Routing API.
    pub fn is_transit(self) -> bool {
        matches!(self, TransportationMode::PublicTransport)
    }

    pub fn reports_traffic(self) -> bool {
        matches!(self, TransportationMode::Driving)
    }
}

impl Display for TransportationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                TransportationMode::Driving => "DRIVING",
                TransportationMode::Walking => "WALKING",
                TransportationMode::PublicTransport => "PUBLIC_TRANSPORT",
                TransportationMode::Bicycling => "BICYCLING",
                TransportationMode::Truck => "TRUCK",
                TransportationMode::Taxi => "TAXI",
                TransportationMode::Bus => "BUS",
                TransportationMode::Train => "TRAIN",
                TransportationMode::Subway => "SUBWAY",
                TransportationMode::Tram => "TRAM",
                TransportationMode::Ferry => "FERRY",
            }
        )
    }
}

/// Accepts both the domain spelling (`PUBLIC_TRANSPORT`) and the HERE spelling
/// (`publicTransport`).
impl FromStr for TransportationMode {
    type Err = UnsupportedModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransportationMode::ALL
            .into_iter()
            .find(|mode| mode.to_string().eq_ignore_ascii_case(s))
            .map_or_else(|| TransportationMode::from_upstream(s), Ok)
    }
}
