mod common;

use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::{Behavior, MockFetcher, coordinator, raw, sample_tracks, settings};
use serde_json::Value;
use tower::ServiceExt;
use trendcache::RefreshSettings;
use trendcache::api_rest::{ApiLimits, TrendState, create_router};

async fn call(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn short_wait() -> RefreshSettings {
    RefreshSettings {
        first_data_wait: Duration::from_secs(1),
        ..settings()
    }
}

#[tokio::test(start_paused = true)]
async fn test_trending_on_empty_cache_is_503() {
    let fetcher = MockFetcher::new(Behavior::Fail("down".into()), Duration::ZERO);
    let router = create_router(TrendState::new(coordinator(fetcher, short_wait()), ApiLimits::default()));

    let (status, body) = call(&router, "GET", "/trending").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Music data temporarily unavailable");
}

#[tokio::test(start_paused = true)]
async fn test_trending_waits_for_first_refresh() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(30)), Duration::from_millis(300));
    let router = create_router(TrendState::new(coordinator(fetcher, short_wait()), ApiLimits::default()));

    let (status, body) = call(&router, "GET", "/trending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tracks"].as_array().unwrap().len(), 20);
    assert_eq!(body["total_available"], 30);
    assert_eq!(body["cache_status"], "fresh");
    assert!(body["last_updated"].is_string());
}

#[tokio::test(start_paused = true)]
async fn test_trending_sorted_and_limited() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(80)), Duration::ZERO);
    let coordinator = coordinator(fetcher, settings());
    coordinator.refresh_now().await.unwrap();
    let router = create_router(TrendState::new(coordinator, ApiLimits::default()));

    let (status, body) = call(&router, "GET", "/trending?limit=3").await;
    assert_eq!(status, StatusCode::OK);
    let popularity: Vec<u64> = body["tracks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["popularity"].as_u64().unwrap())
        .collect();
    assert_eq!(popularity, vec![79, 78, 77]);
    assert_eq!(body["tracks"][0]["popularity_tier"], "Trending");
    assert_eq!(body["tracks"][0]["playlist_source"], "Top 50");

    let (_, body) = call(&router, "GET", "/trending?limit=500").await;
    assert_eq!(body["tracks"].as_array().unwrap().len(), 50);

    let (status, body) = call(&router, "GET", "/trending?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("limit"));
}

#[tokio::test(start_paused = true)]
async fn test_trending_filters() {
    let tracks = vec![raw("a", 90, true), raw("b", 70, false), raw("c", 30, false)];
    let fetcher = MockFetcher::new(Behavior::Tracks(tracks), Duration::ZERO);
    let coordinator = coordinator(fetcher, settings());
    coordinator.refresh_now().await.unwrap();
    let router = create_router(TrendState::new(coordinator, ApiLimits::default()));

    let (_, body) = call(&router, "GET", "/trending?min_popularity=50&exclude_explicit=true").await;
    assert_eq!(body["total_available"], 1);
    assert_eq!(body["tracks"][0]["track_id"], "b");

    // Toutes les dates de test sont anciennes
    let (_, body) = call(&router, "GET", "/trending?max_age_days=30").await;
    assert_eq!(body["total_available"], 0);

    let (status, body) = call(&router, "GET", "/trending?min_popularity=101").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("min_popularity"));
}

#[tokio::test(start_paused = true)]
async fn test_malformed_query_is_a_json_400() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(5)), Duration::ZERO);
    let coordinator = coordinator(fetcher, settings());
    coordinator.refresh_now().await.unwrap();
    let router = create_router(TrendState::new(coordinator, ApiLimits::default()));

    let (status, body) = call(&router, "GET", "/trending?min_popularity=300").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("min_popularity"));

    for uri in ["/trending?limit=abc", "/trending?force_refresh=yes", "/trending?max_age_days=-1"] {
        let (status, body) = call(&router, "GET", uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("Invalid request:"), "{}: {}", uri, message);
    }
}

#[tokio::test(start_paused = true)]
async fn test_stale_read_reports_stale_and_refreshes() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(5)), Duration::ZERO);
    let coordinator = coordinator(fetcher.clone(), settings());
    coordinator.refresh_now().await.unwrap();
    let router = create_router(TrendState::new(coordinator, ApiLimits::default()));

    tokio::time::advance(Duration::from_secs(301)).await;
    let (status, body) = call(&router, "GET", "/trending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cache_status"], "stale");

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(fetcher.calls(), 2);
    let (_, body) = call(&router, "GET", "/trending").await;
    assert_eq!(body["cache_status"], "fresh");
}

#[tokio::test(start_paused = true)]
async fn test_analytics() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(10)), Duration::ZERO);
    let coordinator = coordinator(fetcher, settings());
    let router = create_router(TrendState::new(coordinator.clone(), ApiLimits::default()));

    let (status, body) = call(&router, "GET", "/analytics").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Analytics temporarily unavailable");

    // La requête précédente a lancé le rafraîchissement
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (status, body) = call(&router, "GET", "/analytics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_tracks"], 10);
    assert_eq!(body["unique_artists"], 10);
    assert_eq!(body["max_popularity"], 9);
    assert_eq!(body["top_track"], "Song t9");
}

#[tokio::test(start_paused = true)]
async fn test_refresh_endpoint_is_fire_and_forget() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(2)), Duration::from_secs(1));
    let coordinator = coordinator(fetcher.clone(), settings());
    let router = create_router(TrendState::new(coordinator.clone(), ApiLimits::default()));

    let (status, body) = call(&router, "POST", "/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Data refresh initiated");
    assert_eq!(body["status"], "processing");

    let (_, body) = call(&router, "POST", "/refresh").await;
    assert_eq!(body["status"], "processing");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(fetcher.calls(), 1);
    assert!(coordinator.store().snapshot().has_data());
}

#[tokio::test(start_paused = true)]
async fn test_cache_status_and_service_info() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(7)), Duration::ZERO);
    let coordinator = coordinator(fetcher, settings());
    let router = create_router(TrendState::new(coordinator.clone(), ApiLimits::default()));

    let (_, body) = call(&router, "GET", "/cache-status").await;
    assert_eq!(body["cache_valid"], false);
    assert_eq!(body["has_data"], false);
    assert_eq!(body["data_count"], 0);
    assert_eq!(body["is_updating"], false);
    assert_eq!(body["cache_timeout_seconds"], 300);
    assert!(body["last_updated"].is_null());

    let (_, body) = call(&router, "GET", "/").await;
    assert_eq!(body["cache_status"], "expired");
    assert!(body["features"].as_array().unwrap().iter().any(|f| f == "caching"));

    coordinator.refresh_now().await.unwrap();

    let (_, body) = call(&router, "GET", "/cache-status").await;
    assert_eq!(body["cache_valid"], true);
    assert_eq!(body["has_data"], true);
    assert_eq!(body["data_count"], 7);
    assert_eq!(body["generation"], 1);
    assert_eq!(body["refresh"]["successes"], 1);

    let (_, body) = call(&router, "GET", "/").await;
    assert_eq!(body["cache_status"], "active");
}

#[tokio::test(start_paused = true)]
async fn test_health() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(1)), Duration::ZERO);
    let router = create_router(TrendState::new(coordinator(fetcher, settings()), ApiLimits::default()));

    let (status, body) = call(&router, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["fetcher"]["name"], "mock");
    assert_eq!(body["fetcher"]["connected"], true);
}
