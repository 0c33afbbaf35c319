use std::sync::Arc;

use fxhash::{FxHashMap, FxHashSet};
use jiff::civil::{Date, DateTime, Weekday, time};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheKey, CacheStats, DistanceCache},
    concurrency_limiter::{ConcurrencyLimiter, ScheduleError},
    coordinates::Coordinates,
    distance_request::{DistanceRequest, next_weekday_at},
    distance_result::DistanceResult,
    error::{ErrorKind, PairError, RoutingError},
    interest_point::InterestPoint,
    routing_client::{RouteProvider, RoutingClient},
    transportation_mode::TransportationMode,
};

/// Label used for the single property of [`DistanceCalculationService::compute_for_property`].
const SINGLE_PROPERTY_ID: &str = "property";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("no active interest points to compute distances against")]
    NoActiveInterestPoints,

    #[error("interest point registry is inconsistent: {0}")]
    Registry(String),

    #[error("property {0} appears more than once in the batch")]
    DuplicateProperty(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyLocation {
    pub property_id: String,
    pub coordinates: Coordinates,
}

impl PropertyLocation {
    pub fn new(property_id: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            property_id: property_id.into(),
            coordinates,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculationOptions {
    /// Used instead of each interest point's default mode.
    pub mode_override: Option<TransportationMode>,
    pub departure: Option<DateTime>,
}

impl CalculationOptions {
    /// Commute prediction for the next Friday at 09:00 after `today`.
    pub fn friday_morning(today: Date) -> Result<Self, jiff::Error> {
        Ok(Self {
            mode_override: None,
            departure: Some(next_weekday_at(today, Weekday::Friday, time(9, 0, 0, 0))?),
        })
    }
}

/// Outcome for one property × interest point pair.
#[derive(Debug, Clone, Serialize)]
pub struct PairResult {
    pub interest_point_id: String,
    pub interest_point_name: String,
    pub mode: TransportationMode,
    pub from_cache: bool,
    pub result: Result<DistanceResult, PairError>,
}

impl PairResult {
    pub fn distance(&self) -> Option<&DistanceResult> {
        self.result.as_ref().ok()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyDistances {
    pub property_id: String,
    pub results: Vec<PairResult>,
}

impl PropertyDistances {
    pub fn result_for(&self, interest_point_id: &str) -> Option<&PairResult> {
        self.results
            .iter()
            .find(|pair| pair.interest_point_id == interest_point_id)
    }

    /// Shortest successful trip by duration.
    pub fn closest(&self) -> Option<&PairResult> {
        self.results
            .iter()
            .filter_map(|pair| pair.distance().map(|distance| (pair, distance.duration)))
            .min_by_key(|(_, duration)| *duration)
            .map(|(pair, _)| pair)
    }

    pub fn farthest(&self) -> Option<&PairResult> {
        self.results
            .iter()
            .filter_map(|pair| pair.distance().map(|distance| (pair, distance.duration)))
            .max_by_key(|(_, duration)| *duration)
            .map(|(pair, _)| pair)
    }
}

/// Per-property results, in the order the properties were submitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub properties: Vec<PropertyDistances>,
}

impl BatchResult {
    pub fn get(&self, property_id: &str) -> Option<&PropertyDistances> {
        self.properties
            .iter()
            .find(|property| property.property_id == property_id)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn into_map(self) -> FxHashMap<String, Vec<PairResult>> {
        self.properties
            .into_iter()
            .map(|property| (property.property_id, property.results))
            .collect()
    }
}

enum Slot {
    Cached(DistanceResult),
    Fetch(usize),
}

struct PlannedPair<'a> {
    point: &'a InterestPoint,
    mode: TransportationMode,
    slot: Slot,
}

pub struct DistanceCalculationService<P> {
    client: Arc<RoutingClient<P>>,
    cache: Arc<DistanceCache>,
    limiter: ConcurrencyLimiter,
}

impl<P: RouteProvider> DistanceCalculationService<P> {
    pub fn new(
        client: RoutingClient<P>,
        cache: Arc<DistanceCache>,
        limiter: ConcurrencyLimiter,
    ) -> Self {
        Self {
            client: Arc::new(client),
            cache,
            limiter,
        }
    }

    pub fn cache(&self) -> &Arc<DistanceCache> {
        &self.cache
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        info!("DistanceCalculationService: clearing distance cache");
        self.cache.clear();
    }

    /// Forgets the cached value for `request`, forcing the next call to refetch it.
    pub fn invalidate(&self, request: &DistanceRequest) -> bool {
        self.cache.invalidate(&self.cache.key_for(request))
    }

    pub async fn compute_for_property(
        &self,
        origin: Coordinates,
        interest_points: &[InterestPoint],
    ) -> Result<Vec<PairResult>, ServiceError> {
        self.compute_for_property_with(origin, interest_points, &CalculationOptions::default())
            .await
    }

    pub async fn compute_for_property_with(
        &self,
        origin: Coordinates,
        interest_points: &[InterestPoint],
        options: &CalculationOptions,
    ) -> Result<Vec<PairResult>, ServiceError> {
        let property = PropertyLocation::new(SINGLE_PROPERTY_ID, origin);
        let batch = self
            .compute_for_batch_with(
                std::slice::from_ref(&property),
                interest_points,
                options,
                &CancellationToken::new(),
            )
            .await?;

        Ok(batch
            .properties
            .into_iter()
            .next()
            .map(|property| property.results)
            .unwrap_or_default())
    }

    pub async fn compute_for_batch(
        &self,
        properties: &[PropertyLocation],
        interest_points: &[InterestPoint],
    ) -> Result<BatchResult, ServiceError> {
        self.compute_for_batch_with(
            properties,
            interest_points,
            &CalculationOptions::default(),
            &CancellationToken::new(),
        )
        .await
    }

    /// Computes every property × active interest point pair through one shared limiter.
    ///
    /// Cancelling `cancel` stops admitting new upstream calls; pairs that never
    /// started are reported with [`ErrorKind::Cancelled`].
    pub async fn compute_for_batch_with(
        &self,
        properties: &[PropertyLocation],
        interest_points: &[InterestPoint],
        options: &CalculationOptions,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, ServiceError> {
        let active = active_interest_points(interest_points)?;
        check_unique_properties(properties)?;

        let mut pending: FxHashMap<CacheKey, usize> = FxHashMap::default();
        let mut fetches: Vec<(CacheKey, DistanceRequest)> = Vec::new();
        let mut planned: Vec<Vec<PlannedPair>> = Vec::with_capacity(properties.len());

        for property in properties {
            let mut pairs = Vec::with_capacity(active.len());

            for &point in &active {
                let mode = options
                    .mode_override
                    .unwrap_or(point.default_transportation_mode);
                let request = DistanceRequest::new(property.coordinates, point.coordinates, mode)
                    .with_departure(options.departure);
                let key = self.cache.key_for(&request);

                let slot = if let Some(&index) = pending.get(&key) {
                    Slot::Fetch(index)
                } else if let Some(cached) = self.cache.get(&key) {
                    Slot::Cached(cached)
                } else {
                    fetches.push((key, request));
                    pending.insert(key, fetches.len() - 1);
                    Slot::Fetch(fetches.len() - 1)
                };

                pairs.push(PlannedPair { point, mode, slot });
            }

            planned.push(pairs);
        }

        let pair_count: usize = planned.iter().map(Vec::len).sum();
        debug!(
            "DistanceCalculationService: {} pairs, {} upstream fetches",
            pair_count,
            fetches.len()
        );

        let tasks: Vec<_> = fetches
            .into_iter()
            .map(|(key, request)| {
                let client = Arc::clone(&self.client);
                let cache = Arc::clone(&self.cache);
                async move {
                    let result = client.fetch_route(&request).await;
                    if let Ok(value) = &result {
                        cache.insert(key, value.clone());
                    }
                    result
                }
            })
            .collect();

        let fetched: Vec<Result<DistanceResult, PairError>> = self
            .limiter
            .run_batch(tasks, cancel)
            .await
            .into_iter()
            .map(into_pair_outcome)
            .collect();

        let failures = fetched.iter().filter(|outcome| outcome.is_err()).count();
        info!(
            "DistanceCalculationService: computed {} pairs for {} properties ({} fetched, {} failed)",
            pair_count,
            properties.len(),
            fetched.len(),
            failures
        );

        let properties = properties
            .iter()
            .zip(planned)
            .map(|(property, pairs)| PropertyDistances {
                property_id: property.property_id.clone(),
                results: pairs
                    .into_iter()
                    .map(|pair| {
                        let (from_cache, result) = match pair.slot {
                            Slot::Cached(value) => (true, Ok(value)),
                            Slot::Fetch(index) => (false, fetched[index].clone()),
                        };
                        PairResult {
                            interest_point_id: pair.point.id.clone(),
                            interest_point_name: pair.point.name.clone(),
                            mode: pair.mode,
                            from_cache,
                            result,
                        }
                    })
                    .collect(),
            })
            .collect();

        Ok(BatchResult { properties })
    }
}

fn active_interest_points(
    interest_points: &[InterestPoint],
) -> Result<Vec<&InterestPoint>, ServiceError> {
    let mut seen = FxHashSet::default();
    for point in interest_points {
        if !seen.insert(point.id.as_str()) {
            return Err(ServiceError::Registry(format!(
                "duplicate interest point id {}",
                point.id
            )));
        }
    }

    let active: Vec<&InterestPoint> = interest_points
        .iter()
        .filter(|point| point.is_active)
        .collect();

    if active.is_empty() {
        warn!("DistanceCalculationService: no active interest points");
        return Err(ServiceError::NoActiveInterestPoints);
    }

    Ok(active)
}

fn check_unique_properties(properties: &[PropertyLocation]) -> Result<(), ServiceError> {
    let mut seen = FxHashSet::default();
    for property in properties {
        if !seen.insert(property.property_id.as_str()) {
            return Err(ServiceError::DuplicateProperty(property.property_id.clone()));
        }
    }
    Ok(())
}

fn into_pair_outcome(
    outcome: Result<Result<DistanceResult, RoutingError>, ScheduleError>,
) -> Result<DistanceResult, PairError> {
    match outcome {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => {
            warn!("DistanceCalculationService: pair failed: {}", err);
            Err(err.into())
        }
        Err(ScheduleError::Cancelled) => Err(RoutingError::Cancelled.into()),
        Err(err) => Err(PairError::new(ErrorKind::Internal, err.to_string())),
    }
}
