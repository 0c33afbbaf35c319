use jiff::{SignedDuration, Timestamp, civil::DateTime};
use serde::{Deserialize, Serialize};

use crate::transportation_mode::TransportationMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Pedestrian,
    Transit,
    Other,
}

/// One leg of a route, in traversal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub kind: SegmentKind,
    pub duration: SignedDuration,
    pub distance_meters: f64,

    /// Sub-mode reported by the provider, when it is one we know.
    pub mode: Option<TransportationMode>,
    pub line: Option<String>,
    pub carrier: Option<String>,
}

impl RouteSegment {
    pub fn duration_minutes(&self) -> i64 {
        round_minutes(self.duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficInfo {
    pub delay: SignedDuration,
    pub length_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceResult {
    pub mode: TransportationMode,
    pub distance_km: f64,
    pub duration: SignedDuration,
    pub segments: Vec<RouteSegment>,

    /// Only populated for driving routes.
    pub traffic: Option<TrafficInfo>,
    pub route_summary: String,
    pub departure: Option<DateTime>,

    /// When the provider computed this value, not when it was read from the cache.
    pub computed_at: Timestamp,
}

impl DistanceResult {
    pub fn duration_minutes(&self) -> i64 {
        round_minutes(self.duration)
    }

    pub fn walking_duration(&self) -> SignedDuration {
        self.segments
            .iter()
            .filter(|segment| segment.kind == SegmentKind::Pedestrian)
            .fold(SignedDuration::ZERO, |total, segment| {
                total.saturating_add(segment.duration)
            })
    }

    pub fn walking_distance_km(&self) -> f64 {
        self.segments
            .iter()
            .filter(|segment| segment.kind == SegmentKind::Pedestrian)
            .map(|segment| segment.distance_meters)
            .sum::<f64>()
            / 1000.0
    }

    pub fn arrival_time(&self) -> Option<DateTime> {
        self.departure
            .and_then(|departure| departure.checked_add(self.duration).ok())
    }
}

pub(crate) fn round_minutes(duration: SignedDuration) -> i64 {
    (duration.as_secs_f64() / 60.0).round() as i64
}

/// Human readable description, e.g. `Walk 6 min → E2 25 min → Walk 13 min`.
pub(crate) fn describe_route(
    mode: TransportationMode,
    distance_km: f64,
    duration: SignedDuration,
    segments: &[RouteSegment],
) -> String {
    let has_transit = segments
        .iter()
        .any(|segment| segment.kind == SegmentKind::Transit);

    if !has_transit {
        let verb = match mode {
            TransportationMode::Walking => "Walk",
            TransportationMode::Bicycling => "Cycle",
            _ => "Drive",
        };
        return format!(
            "{verb} {distance_km:.1} km, {} min",
            round_minutes(duration)
        );
    }

    segments
        .iter()
        .map(|segment| {
            let label = match segment.kind {
                SegmentKind::Pedestrian => "Walk".to_string(),
                SegmentKind::Transit => segment
                    .line
                    .clone()
                    .or_else(|| segment.mode.map(|mode| mode.to_string()))
                    .unwrap_or_else(|| "Transit".to_string()),
                SegmentKind::Other => "Other".to_string(),
            };
            format!("{label} {} min", segment.duration_minutes())
        })
        .collect::<Vec<_>>()
        .join(" → ")
}
