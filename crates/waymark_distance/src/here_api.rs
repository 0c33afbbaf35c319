use jiff::{SignedDuration, Timestamp, civil::DateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    distance_request::DistanceRequest,
    distance_result::{DistanceResult, RouteSegment, SegmentKind, TrafficInfo, describe_route},
    error::RoutingError,
    routing_client::RouteProvider,
    transportation_mode::TransportationMode,
};

pub const HERE_ROUTING_API_URL: &str = "https://router.hereapi.com/v8";
pub const HERE_TRANSIT_API_URL: &str = "https://transit.router.hereapi.com/v8";

/// Maximum number of transfers for public transport routes.
const TRANSIT_MAX_CHANGES: &str = "3";
const TRANSIT_MAX_WALK_METERS: &str = "2000";
const TRANSIT_WALK_SPEED_MPS: &str = "1.4";

#[derive(Clone, Serialize, Deserialize)]
pub struct HereConfig {
    pub api_key: String,
    #[serde(default = "default_routing_url")]
    pub routing_url: String,
    #[serde(default = "default_transit_url")]
    pub transit_url: String,
}

fn default_routing_url() -> String {
    HERE_ROUTING_API_URL.to_string()
}

fn default_transit_url() -> String {
    HERE_TRANSIT_API_URL.to_string()
}

impl HereConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            routing_url: default_routing_url(),
            transit_url: default_transit_url(),
        }
    }
}

impl std::fmt::Debug for HereConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HereConfig")
            .field("api_key", &"<redacted>")
            .field("routing_url", &self.routing_url)
            .field("transit_url", &self.transit_url)
            .finish()
    }
}

#[derive(Deserialize)]
struct RoutesResponse {
    #[serde(default)]
    routes: Vec<Route>,
    #[serde(default)]
    notices: Vec<Notice>,
}

#[derive(Deserialize)]
struct Notice {
    code: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Deserialize)]
struct Route {
    #[serde(default)]
    sections: Vec<Section>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Section {
    #[serde(rename = "type")]
    kind: String,
    departure: Option<Place>,
    arrival: Option<Place>,
    summary: Option<Summary>,
    travel_summary: Option<Summary>,
    transport: Option<Transport>,
    agency: Option<Agency>,
}

#[derive(Deserialize)]
struct Place {
    time: Option<Timestamp>,
}

#[derive(Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
struct Summary {
    /// Seconds
    duration: i64,

    /// Meters
    length: f64,

    /// Seconds, without traffic
    base_duration: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Transport {
    mode: Option<String>,
    name: Option<String>,
    short_name: Option<String>,
}

#[derive(Deserialize)]
struct Agency {
    name: Option<String>,
}

/// HERE Routing v8 and Public Transit v8 backend.
pub struct HereRoutingProvider {
    config: HereConfig,
    client: reqwest::Client,
}

impl HereRoutingProvider {
    pub fn new(config: HereConfig, timeout: SignedDuration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout.unsigned_abs())
            .build()?;

        Ok(Self { config, client })
    }

    fn build_request(&self, request: &DistanceRequest) -> reqwest::RequestBuilder {
        let mut query: Vec<(&str, String)> = vec![
            ("origin", request.origin.to_string()),
            ("destination", request.destination.to_string()),
        ];

        let url = if request.mode.is_transit() {
            query.extend([
                ("return", "travelSummary".to_string()),
                ("changes", TRANSIT_MAX_CHANGES.to_string()),
                ("pedestrian[maxDistance]", TRANSIT_MAX_WALK_METERS.to_string()),
                ("pedestrian[speed]", TRANSIT_WALK_SPEED_MPS.to_string()),
            ]);
            format!("{}/routes", self.config.transit_url)
        } else {
            query.extend([
                ("transportMode", request.mode.to_upstream().to_string()),
                ("return", "summary,travelSummary".to_string()),
            ]);
            format!("{}/routes", self.config.routing_url)
        };

        if let Some(departure) = request.departure {
            query.push(("departureTime", departure.to_string()));
        }

        query.push(("apiKey", self.config.api_key.clone()));

        self.client.get(url).query(&query)
    }
}

impl RouteProvider for HereRoutingProvider {
    async fn fetch_route(
        &self,
        request: &DistanceRequest,
    ) -> Result<DistanceResult, RoutingError> {
        info!(
            "HereApi: requesting {} route from {} to {}",
            request.mode.to_upstream(),
            request.origin,
            request.destination
        );

        let response = self.build_request(request).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RoutingError::Upstream {
                status: status.as_u16(),
                message: text,
            });
        }

        let body: RoutesResponse = serde_json::from_str(&text).map_err(|err| {
            error!("HereApi: unexpected payload ({}): {}", err, text);
            RoutingError::from(err)
        })?;

        parse_routes(body, request.mode, request.departure).inspect_err(|err| {
            if let RoutingError::Parse(_) = err {
                error!("HereApi: {}: {}", err, text);
            }
        })
    }
}

fn parse_routes(
    body: RoutesResponse,
    mode: TransportationMode,
    departure: Option<DateTime>,
) -> Result<DistanceResult, RoutingError> {
    let Some(route) = body.routes.into_iter().next() else {
        for notice in &body.notices {
            debug!(
                "HereApi: notice {} {}",
                notice.code,
                notice.title.as_deref().unwrap_or_default()
            );
        }
        return Err(RoutingError::NoRouteFound);
    };

    if route.sections.is_empty() {
        return Err(RoutingError::Parse("route has no sections".to_string()));
    }

    let mut segments = Vec::with_capacity(route.sections.len());
    let mut segment_duration = SignedDuration::ZERO;
    let mut distance_meters = 0.0;
    let mut traffic_delay = SignedDuration::ZERO;

    for section in &route.sections {
        let summary = section
            .travel_summary
            .or(section.summary)
            .ok_or_else(|| RoutingError::Parse("section without summary".to_string()))?;

        let duration = SignedDuration::from_secs(summary.duration);
        segment_duration = segment_duration.saturating_add(duration);
        distance_meters += summary.length;

        if let Some(base_duration) = summary.base_duration {
            traffic_delay = traffic_delay
                .saturating_add(SignedDuration::from_secs(summary.duration - base_duration));
        }

        segments.push(parse_segment(section, duration, summary.length));
    }

    let duration = provider_duration(&route.sections).unwrap_or(segment_duration);
    if duration != segment_duration {
        debug!(
            "HereApi: provider duration {:?} differs from section total {:?}",
            duration, segment_duration
        );
    }

    let distance_km = distance_meters / 1000.0;
    let traffic = mode.reports_traffic().then_some(TrafficInfo {
        delay: traffic_delay.max(SignedDuration::ZERO),
        length_km: distance_km,
    });

    Ok(DistanceResult {
        mode,
        distance_km,
        duration,
        route_summary: describe_route(mode, distance_km, duration, &segments),
        segments,
        traffic,
        departure,
        computed_at: Timestamp::now(),
    })
}

/// The route-level duration HERE reports: the section summary for single-section
/// routes, the departure-to-arrival span otherwise (which includes transfer waits).
fn provider_duration(sections: &[Section]) -> Option<SignedDuration> {
    if let [section] = sections {
        return section
            .summary
            .or(section.travel_summary)
            .map(|summary| SignedDuration::from_secs(summary.duration));
    }

    let departure = sections.first()?.departure.as_ref()?.time?;
    let arrival = sections.last()?.arrival.as_ref()?.time?;
    let span = arrival.duration_since(departure);

    (span > SignedDuration::ZERO).then_some(span)
}

fn parse_segment(
    section: &Section,
    duration: SignedDuration,
    distance_meters: f64,
) -> RouteSegment {
    let kind = match section.kind.as_str() {
        "pedestrian" => SegmentKind::Pedestrian,
        "transit" => SegmentKind::Transit,
        _ => SegmentKind::Other,
    };

    let transport = section.transport.as_ref();
    let mode = transport
        .and_then(|transport| transport.mode.as_deref())
        .and_then(|mode| match TransportationMode::from_upstream(mode) {
            Ok(mode) => Some(mode),
            Err(err) => {
                debug!("HereApi: {}", err);
                None
            }
        });

    let (line, carrier) = if kind == SegmentKind::Transit {
        (
            transport.and_then(|transport| {
                transport
                    .short_name
                    .clone()
                    .or_else(|| transport.name.clone())
            }),
            section.agency.as_ref().and_then(|agency| agency.name.clone()),
        )
    } else {
        (None, None)
    };

    RouteSegment {
        kind,
        duration,
        distance_meters,
        mode,
        line,
        carrier,
    }
}
