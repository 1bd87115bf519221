mod common;

use std::time::Duration;

use common::{Behavior, MockFetcher, coordinator, sample_tracks, settings};
use tokio::time::Instant;
use trendcache::{CacheStatus, RefreshSettings, RefreshTrigger, TrendError};

#[tokio::test(start_paused = true)]
async fn test_concurrent_triggers_run_a_single_refresh() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(5)), Duration::from_secs(1));
    let coordinator = coordinator(fetcher.clone(), settings());

    let triggers: Vec<_> = (0..20)
        .map(|_| {
            let c = coordinator.clone();
            tokio::spawn(async move { c.trigger_refresh_if_needed() })
        })
        .collect();

    let mut started = 0;
    for t in triggers {
        if t.await.unwrap() == RefreshTrigger::Started {
            started += 1;
        }
    }
    assert_eq!(started, 1);
    assert!(coordinator.store().is_refreshing());

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(fetcher.max_in_flight(), 1);
    assert!(!coordinator.store().is_refreshing());
    assert_eq!(coordinator.store().snapshot().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_readers_share_the_first_refresh() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(3)), Duration::from_secs(2));
    let coordinator = coordinator(fetcher.clone(), settings());

    let readers: Vec<_> = (0..10)
        .map(|_| {
            let c = coordinator.clone();
            tokio::spawn(async move { c.ensure_fresh(false).await })
        })
        .collect();

    for r in readers {
        let (snapshot, status) = r.await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(status, CacheStatus::Fresh);
    }
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(fetcher.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fresh_until_timeout_then_stale() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(4)), Duration::ZERO);
    let coordinator = coordinator(fetcher.clone(), settings());

    coordinator.refresh_now().await.unwrap();
    let (_, status) = coordinator.ensure_fresh(false).await.unwrap();
    assert_eq!(status, CacheStatus::Fresh);

    tokio::time::advance(Duration::from_secs(299)).await;
    let (_, status) = coordinator.ensure_fresh(false).await.unwrap();
    assert_eq!(status, CacheStatus::Fresh);
    assert_eq!(fetcher.calls(), 1);

    tokio::time::advance(Duration::from_secs(2)).await;
    let (snapshot, status) = coordinator.ensure_fresh(false).await.unwrap();
    assert_eq!(status, CacheStatus::Stale);
    assert_eq!(snapshot.len(), 4);
    assert!(coordinator.store().is_refreshing());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(fetcher.calls(), 2);
    assert!(coordinator.is_valid());
}

#[tokio::test(start_paused = true)]
async fn test_force_refresh_triggers_even_when_fresh() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(2)), Duration::ZERO);
    let coordinator = coordinator(fetcher.clone(), settings());

    coordinator.refresh_now().await.unwrap();
    let (_, status) = coordinator.ensure_fresh(true).await.unwrap();
    assert_eq!(status, CacheStatus::Fresh);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_empty_cache_waits_then_reports_unavailable() {
    let fetcher = MockFetcher::new(Behavior::Fail("upstream down".into()), Duration::ZERO);
    let coordinator = coordinator(fetcher.clone(), settings());

    let started = Instant::now();
    let err = coordinator.ensure_fresh(false).await.unwrap_err();

    assert!(err.is_unavailable());
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(err.to_string(), "Music data temporarily unavailable");
}

#[tokio::test(start_paused = true)]
async fn test_first_data_wakes_waiting_reader_early() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(1)), Duration::from_secs(2));
    let coordinator = coordinator(fetcher.clone(), settings());

    let started = Instant::now();
    let (snapshot, _) = coordinator.ensure_fresh(false).await.unwrap();

    assert_eq!(snapshot.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_previous_data() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(3)), Duration::ZERO);
    let coordinator = coordinator(fetcher.clone(), settings());

    let before = coordinator.refresh_now().await.unwrap();

    fetcher.set_behavior(Behavior::Fail("boom".into()));
    let err = coordinator.refresh_now().await.unwrap_err();
    assert!(matches!(err, TrendError::Fetch(_)));

    let after = coordinator.store().snapshot();
    assert_eq!(after.generation(), before.generation());
    assert_eq!(after.len(), 3);
    assert_eq!(after.last_updated(), before.last_updated());
    assert!(!coordinator.store().is_refreshing());

    let stats = coordinator.stats();
    assert_eq!(stats.attempts, 2);
    assert_eq!(stats.successes, 1);
    assert_eq!(stats.failures, 1);
    assert!(stats.last_error.unwrap().contains("boom"));
}

#[tokio::test(start_paused = true)]
async fn test_empty_upstream_result_is_a_failure() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(2)), Duration::ZERO);
    let coordinator = coordinator(fetcher.clone(), settings());
    coordinator.refresh_now().await.unwrap();

    fetcher.set_behavior(Behavior::Tracks(vec![]));
    let err = coordinator.refresh_now().await.unwrap_err();
    assert!(matches!(err, TrendError::EmptyDataset(0)));
    assert_eq!(coordinator.store().snapshot().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_last_updated_strictly_increases() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(2)), Duration::ZERO);
    let coordinator = coordinator(fetcher.clone(), settings());

    let mut previous = None;
    for _ in 0..5 {
        let snapshot = coordinator.refresh_now().await.unwrap();
        let updated = snapshot.last_updated().unwrap();
        if let Some(prev) = previous {
            assert!(updated > prev);
        }
        assert!(snapshot.analytics().is_some());
        previous = Some(updated);
    }
}

#[tokio::test(start_paused = true)]
async fn test_refresh_timeout_clears_flag() {
    let fetcher = MockFetcher::new(Behavior::Hang, Duration::ZERO);
    let coordinator = coordinator(
        fetcher.clone(),
        RefreshSettings {
            refresh_timeout: Duration::from_secs(5),
            ..settings()
        },
    );

    let err = coordinator.refresh_now().await.unwrap_err();
    assert!(matches!(err, TrendError::RefreshTimeout(_)));
    assert!(!coordinator.store().is_refreshing());

    fetcher.set_behavior(Behavior::Tracks(sample_tracks(1)));
    coordinator.refresh_now().await.unwrap();
    assert_eq!(coordinator.store().snapshot().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_now_refuses_while_background_refresh_runs() {
    let fetcher = MockFetcher::new(Behavior::Tracks(sample_tracks(1)), Duration::from_secs(1));
    let coordinator = coordinator(fetcher.clone(), settings());

    assert_eq!(coordinator.trigger_refresh_if_needed(), RefreshTrigger::Started);
    let err = coordinator.refresh_now().await.unwrap_err();
    assert!(matches!(err, TrendError::RefreshInProgress));
}

#[tokio::test(start_paused = true)]
async fn test_panicking_fetcher_releases_flag_and_counts_failure() {
    let fetcher = MockFetcher::new(Behavior::Panic, Duration::ZERO);
    let coordinator = coordinator(fetcher.clone(), settings());

    assert_eq!(coordinator.trigger_refresh_if_needed(), RefreshTrigger::Started);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(!coordinator.store().is_refreshing());
    assert!(!coordinator.store().snapshot().has_data());

    let stats = coordinator.stats();
    assert_eq!(stats.attempts, 1);
    assert_eq!(stats.successes, 0);
    assert_eq!(stats.failures, 1);
    assert_eq!(stats.last_error.as_deref(), Some("Refresh aborted before completion"));
}
