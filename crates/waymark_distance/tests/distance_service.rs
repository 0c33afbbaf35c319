mod common;

use std::time::Duration;

use jiff::{SignedDuration, civil::date};
use tokio_util::sync::CancellationToken;
use waymark_distance::{
    cache::CacheConfig,
    distance_calculation_service::{CalculationOptions, ServiceError},
    distance_request::DistanceRequest,
    error::{ErrorKind, RoutingError},
    transportation_mode::TransportationMode,
};

use crate::common::{
    FakeProvider, coordinates, interest_point, interest_points, property, service, service_with,
};

#[tokio::test(start_paused = true)]
async fn test_upstream_concurrency_is_bounded() {
    let provider = FakeProvider::new();
    let points = interest_points(25);
    for point in &points {
        provider.delay_for(point.coordinates, Duration::from_millis(50));
    }
    let service = service(provider.clone(), 4);

    let results = service
        .compute_for_property(coordinates(53.35, -6.26), &points)
        .await
        .unwrap();

    assert_eq!(results.len(), 25);
    assert!(results.iter().all(|pair| pair.result.is_ok()));
    assert_eq!(provider.calls(), 25);
    assert_eq!(provider.peak_in_flight(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_batch_shares_one_concurrency_bound() {
    let provider = FakeProvider::new();
    let points = interest_points(5);
    for point in &points {
        provider.delay_for(point.coordinates, Duration::from_millis(50));
    }
    let service = service(provider.clone(), 4);

    let properties = vec![
        property("p1", 53.35, -6.26),
        property("p2", 53.36, -6.27),
        property("p3", 53.37, -6.28),
    ];
    let batch = service.compute_for_batch(&properties, &points).await.unwrap();

    assert_eq!(batch.len(), 3);
    assert!(
        batch
            .properties
            .iter()
            .all(|property| property.results.len() == 5)
    );
    assert_eq!(provider.calls(), 15);
    assert_eq!(provider.peak_in_flight(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_results_follow_interest_point_order() {
    let provider = FakeProvider::new();
    let points = interest_points(6);
    for (i, point) in points.iter().enumerate() {
        provider.delay_for(point.coordinates, Duration::from_millis(600 - i as u64 * 100));
    }
    let service = service(provider.clone(), 6);

    let results = service
        .compute_for_property(coordinates(53.35, -6.26), &points)
        .await
        .unwrap();

    let ids: Vec<&str> = results
        .iter()
        .map(|pair| pair.interest_point_id.as_str())
        .collect();
    assert_eq!(ids, vec!["poi-0", "poi-1", "poi-2", "poi-3", "poi-4", "poi-5"]);
}

#[tokio::test(start_paused = true)]
async fn test_second_call_is_served_from_cache() {
    let provider = FakeProvider::new();
    let points = vec![interest_point(
        "airport",
        53.4213,
        -6.2701,
        TransportationMode::PublicTransport,
    )];
    let service = service(provider.clone(), 10);
    let origin = coordinates(53.3498, -6.2603);

    let first = service.compute_for_property(origin, &points).await.unwrap();
    let second = service.compute_for_property(origin, &points).await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert!(!first[0].from_cache);
    assert!(second[0].from_cache);
    assert_eq!(first[0].result, second[0].result);
    assert_eq!(first[0].mode, TransportationMode::PublicTransport);

    let stats = service.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_is_fetched_again() {
    let provider = FakeProvider::new();
    let points = interest_points(1);
    let service = service_with(
        provider.clone(),
        10,
        CacheConfig {
            ttl: SignedDuration::from_hours(1),
            ..CacheConfig::default()
        },
    );
    let origin = coordinates(53.35, -6.26);

    service.compute_for_property(origin, &points).await.unwrap();
    tokio::time::advance(Duration::from_secs(30 * 60)).await;
    service.compute_for_property(origin, &points).await.unwrap();
    assert_eq!(provider.calls(), 1);

    tokio::time::advance(Duration::from_secs(31 * 60)).await;
    let results = service.compute_for_property(origin, &points).await.unwrap();

    assert_eq!(provider.calls(), 2);
    assert!(!results[0].from_cache);
}

#[tokio::test(start_paused = true)]
async fn test_batch_skips_inactive_points_and_isolates_failures() {
    let provider = FakeProvider::new();
    let points = vec![
        interest_point("school", 53.30, -6.20, TransportationMode::Walking),
        interest_point("office", 53.31, -6.21, TransportationMode::Driving).inactive(),
        interest_point("stadium", 53.32, -6.22, TransportationMode::Bicycling),
    ];
    provider.fail_for(points[2].coordinates, RoutingError::NoRouteFound);
    let service = service(provider.clone(), 3);

    let properties = vec![property("p1", 53.35, -6.26), property("p2", 53.36, -6.27)];
    let batch = service.compute_for_batch(&properties, &points).await.unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(provider.calls(), 4);

    for property in &batch.properties {
        assert_eq!(property.results.len(), 2);
        assert!(property.result_for("office").is_none());

        let school = property.result_for("school").unwrap();
        assert_eq!(school.mode, TransportationMode::Walking);
        assert!(school.result.is_ok());

        let stadium = property.result_for("stadium").unwrap();
        let error = stadium.result.as_ref().unwrap_err();
        assert_eq!(error.kind, ErrorKind::NoRouteFound);
        assert!(!error.is_transient());
    }

    let by_property = batch.into_map();
    assert!(by_property.contains_key("p1"));
    assert!(by_property.contains_key("p2"));
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_are_retried_then_reported() {
    let provider = FakeProvider::new();
    let points = interest_points(2);
    provider.fail_for(points[1].coordinates, RoutingError::Network("reset".into()));
    let service = service(provider.clone(), 2);

    let results = service
        .compute_for_property(coordinates(53.35, -6.26), &points)
        .await
        .unwrap();

    assert!(results[0].result.is_ok());
    assert_eq!(
        results[1].result.as_ref().unwrap_err().kind,
        ErrorKind::Network
    );
    assert_eq!(provider.calls(), 1 + 3);
    assert_eq!(service.cache().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_marks_remaining_pairs() {
    let provider = FakeProvider::new();
    let points = interest_points(5);
    for point in &points {
        provider.delay_for(point.coordinates, Duration::from_millis(100));
    }
    let service = service(provider.clone(), 1);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let batch = service
        .compute_for_batch_with(
            &[property("p1", 53.35, -6.26)],
            &points,
            &CalculationOptions::default(),
            &cancel,
        )
        .await
        .unwrap();

    let results = &batch.get("p1").unwrap().results;
    assert!(results[0].result.is_ok());
    assert!(results[1].result.is_ok());
    for pair in &results[2..] {
        assert_eq!(pair.result.as_ref().unwrap_err().kind, ErrorKind::Cancelled);
    }
    assert_eq!(provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_identical_pairs_share_one_fetch() {
    let provider = FakeProvider::new();
    let points = interest_points(3);
    let service = service(provider.clone(), 4);

    // Same spot within the cache precision.
    let properties = vec![
        property("p1", 53.350001, -6.260001),
        property("p2", 53.350002, -6.260002),
    ];
    let batch = service.compute_for_batch(&properties, &points).await.unwrap();

    assert_eq!(provider.calls(), 3);
    assert_eq!(
        batch.properties[0].results[1].result,
        batch.properties[1].results[1].result
    );
}

#[tokio::test(start_paused = true)]
async fn test_options_override_mode_and_departure() {
    let provider = FakeProvider::new();
    let points = interest_points(2);
    let service = service(provider.clone(), 2);
    let options = CalculationOptions::friday_morning(date(2025, 6, 11))
        .map(|options| CalculationOptions {
            mode_override: Some(TransportationMode::PublicTransport),
            ..options
        })
        .unwrap();

    let results = service
        .compute_for_property_with(coordinates(53.35, -6.26), &points, &options)
        .await
        .unwrap();

    let departure = date(2025, 6, 13).at(9, 0, 0, 0);
    for request in provider.requests() {
        assert_eq!(request.mode, TransportationMode::PublicTransport);
        assert_eq!(request.departure, Some(departure));
    }
    for pair in &results {
        assert_eq!(pair.mode, TransportationMode::PublicTransport);
    }

    // Without the options every pair is a different cache entry.
    service
        .compute_for_property(coordinates(53.35, -6.26), &points)
        .await
        .unwrap();
    assert_eq!(provider.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_forces_refetch() {
    let provider = FakeProvider::new();
    let points = interest_points(2);
    let service = service(provider.clone(), 2);
    let origin = coordinates(53.35, -6.26);

    service.compute_for_property(origin, &points).await.unwrap();
    let request = DistanceRequest::new(
        origin,
        points[0].coordinates,
        points[0].default_transportation_mode,
    );
    assert!(service.invalidate(&request));
    service.compute_for_property(origin, &points).await.unwrap();

    assert_eq!(provider.calls(), 3);

    service.clear_cache();
    service.compute_for_property(origin, &points).await.unwrap();
    assert_eq!(provider.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_closest_and_farthest() {
    let provider = FakeProvider::new();
    let points = interest_points(4);
    provider.fail_for(points[0].coordinates, RoutingError::NoRouteFound);
    let service = service(provider.clone(), 4);

    let batch = service
        .compute_for_batch(&[property("p1", 53.30, -6.20)], &points)
        .await
        .unwrap();
    let distances = batch.get("p1").unwrap();

    assert_eq!(distances.closest().unwrap().interest_point_id, "poi-1");
    assert_eq!(distances.farthest().unwrap().interest_point_id, "poi-3");
}

#[tokio::test(start_paused = true)]
async fn test_registry_without_active_points_is_fatal() {
    let provider = FakeProvider::new();
    let points: Vec<_> = interest_points(2)
        .into_iter()
        .map(|point| point.inactive())
        .collect();
    let service = service(provider.clone(), 2);

    let result = service
        .compute_for_property(coordinates(53.35, -6.26), &points)
        .await;

    assert!(matches!(result, Err(ServiceError::NoActiveInterestPoints)));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_batch_is_empty() {
    let provider = FakeProvider::new();
    let service = service(provider.clone(), 2);

    let batch = service
        .compute_for_batch(&[], &interest_points(2))
        .await
        .unwrap();

    assert!(batch.is_empty());
    assert_eq!(provider.calls(), 0);
}
