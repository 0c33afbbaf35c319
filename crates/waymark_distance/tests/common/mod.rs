#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use fxhash::{FxHashMap, FxHashSet};
use jiff::{SignedDuration, Timestamp};
use parking_lot::Mutex;
use waymark_distance::{
    cache::{CacheConfig, DistanceCache},
    concurrency_limiter::ConcurrencyLimiter,
    coordinates::Coordinates,
    distance_calculation_service::{DistanceCalculationService, PropertyLocation},
    distance_request::DistanceRequest,
    distance_result::DistanceResult,
    error::RoutingError,
    interest_point::InterestPoint,
    routing_client::{RouteProvider, RoutingClient, RoutingConfig},
    transportation_mode::TransportationMode,
};

/// In-memory provider that records every call it receives.
#[derive(Clone, Default)]
pub struct FakeProvider {
    state: Arc<FakeState>,
}

#[derive(Default)]
struct FakeState {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delays: Mutex<FxHashMap<String, Duration>>,
    failing: Mutex<FxHashMap<String, RoutingError>>,
    requests: Mutex<Vec<DistanceRequest>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes requests towards `destination` take `delay`.
    pub fn delay_for(&self, destination: Coordinates, delay: Duration) {
        self.state
            .delays
            .lock()
            .insert(destination.to_string(), delay);
    }

    pub fn fail_for(&self, destination: Coordinates, error: RoutingError) {
        self.state
            .failing
            .lock()
            .insert(destination.to_string(), error);
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<DistanceRequest> {
        self.state.requests.lock().clone()
    }

    pub fn distinct_destinations(&self) -> usize {
        self.requests()
            .iter()
            .map(|request| request.destination.to_string())
            .collect::<FxHashSet<_>>()
            .len()
    }
}

impl RouteProvider for FakeProvider {
    async fn fetch_route(
        &self,
        request: &DistanceRequest,
    ) -> Result<DistanceResult, RoutingError> {
        let state = &self.state;
        state.calls.fetch_add(1, Ordering::SeqCst);
        state.requests.lock().push(*request);

        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.peak.fetch_max(now, Ordering::SeqCst);

        let destination = request.destination.to_string();
        let delay = state
            .delays
            .lock()
            .get(&destination)
            .copied()
            .unwrap_or(Duration::from_millis(10));
        tokio::time::sleep(delay).await;

        state.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = state.failing.lock().get(&destination) {
            return Err(error.clone());
        }

        Ok(result_for(request))
    }
}

/// Deterministic result derived from the request so tests can tell pairs apart.
pub fn result_for(request: &DistanceRequest) -> DistanceResult {
    let km = ((request.origin.lat() - request.destination.lat()).abs()
        + (request.origin.lon() - request.destination.lon()).abs())
        * 100.0;

    DistanceResult {
        mode: request.mode,
        distance_km: (km * 10.0).round() / 10.0,
        duration: SignedDuration::from_secs((km * 90.0).round() as i64),
        segments: vec![],
        traffic: None,
        route_summary: format!("{:.1} km", km),
        departure: request.departure,
        computed_at: Timestamp::UNIX_EPOCH,
    }
}

pub fn service_with(
    provider: FakeProvider,
    max_concurrent: usize,
    cache: CacheConfig,
) -> DistanceCalculationService<FakeProvider> {
    DistanceCalculationService::new(
        RoutingClient::new(
            provider,
            RoutingConfig {
                base_retry_delay: SignedDuration::from_millis(10),
                ..RoutingConfig::default()
            },
        ),
        Arc::new(DistanceCache::new(cache)),
        ConcurrencyLimiter::new(max_concurrent),
    )
}

pub fn service(
    provider: FakeProvider,
    max_concurrent: usize,
) -> DistanceCalculationService<FakeProvider> {
    service_with(provider, max_concurrent, CacheConfig::default())
}

pub fn coordinates(lat: f64, lon: f64) -> Coordinates {
    Coordinates::new(lat, lon).unwrap()
}

pub fn interest_point(id: &str, lat: f64, lon: f64, mode: TransportationMode) -> InterestPoint {
    InterestPoint::new(id, id.to_uppercase(), "test", coordinates(lat, lon), mode)
}

/// `count` interest points spread north of Dublin city centre.
pub fn interest_points(count: usize) -> Vec<InterestPoint> {
    (0..count)
        .map(|i| {
            interest_point(
                &format!("poi-{}", i),
                53.30 + i as f64 * 0.01,
                -6.20,
                TransportationMode::Driving,
            )
        })
        .collect()
}

pub fn property(id: &str, lat: f64, lon: f64) -> PropertyLocation {
    PropertyLocation::new(id, coordinates(lat, lon))
}
