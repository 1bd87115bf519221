#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use trendcache::{
    CacheStore, DataSource, RawTrack, RefreshCoordinator, RefreshSettings, TrackFetcher,
    Transformer, TrendError,
};

#[derive(Debug, Clone)]
pub enum Behavior {
    Tracks(Vec<RawTrack>),
    Fail(String),
    Hang,
    Panic,
}

/// Fetcher scriptable qui compte ses appels concurrents
pub struct MockFetcher {
    behavior: Mutex<Behavior>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockFetcher {
    pub fn new(behavior: Behavior, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_tracks(&self) -> trendcache::Result<Vec<RawTrack>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        tokio::time::sleep(self.delay).await;

        let behavior = self.behavior.lock().clone();
        match behavior {
            Behavior::Tracks(tracks) => Ok(tracks),
            Behavior::Fail(message) => Err(TrendError::Fetch(message)),
            Behavior::Hang => std::future::pending().await,
            Behavior::Panic => panic!("fetcher exploded"),
        }
    }
}

pub fn raw(id: &str, popularity: i64, explicit: bool) -> RawTrack {
    RawTrack {
        track_id: Some(id.to_string()),
        track_name: Some(format!("Song {}", id)),
        artist: Some(format!("Artist {}", id)),
        album: Some("Album".to_string()),
        popularity: Some(popularity),
        duration_ms: Some(200_000),
        explicit: Some(explicit),
        release_date: Some("2020-01-01".to_string()),
        playlist_name: Some("Top 50".to_string()),
        data_source: DataSource::FeaturedPlaylist,
        ..Default::default()
    }
}

pub fn sample_tracks(n: usize) -> Vec<RawTrack> {
    (0..n).map(|i| raw(&format!("t{}", i), (i % 101) as i64, i % 2 == 0)).collect()
}

pub fn settings() -> RefreshSettings {
    RefreshSettings {
        cache_timeout: Duration::from_secs(300),
        refresh_timeout: Duration::from_secs(120),
        first_data_wait: Duration::from_secs(10),
    }
}

pub fn coordinator(fetcher: Arc<MockFetcher>, settings: RefreshSettings) -> Arc<RefreshCoordinator> {
    Arc::new(RefreshCoordinator::new(
        Arc::new(CacheStore::new()),
        fetcher,
        Transformer::new(false),
        settings,
    ))
}
