//! Coordinateur de rafraîchissement
//!
//! Un seul rafraîchissement à la fois : les déclenchements concurrents se
//! regroupent sur la tâche en cours. Chaque rafraîchissement enchaîne
//! fetcher puis transformer hors de tout verrou, sous un délai maximal, et
//! n'installe ses données qu'en cas de succès.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info};
use trendconfig::Config;

use crate::error::{Result, TrendError};
use crate::fetcher::TrackFetcher;
use crate::models::Dataset;
use crate::store::{CacheSnapshot, CacheStore, RefreshTicket};
use crate::transform::Transformer;

/// Délais du coordinateur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    /// Durée de validité des données
    pub cache_timeout: Duration,
    /// Durée maximale d'un rafraîchissement
    pub refresh_timeout: Duration,
    /// Attente maximale d'une requête quand le cache n'a jamais été rempli
    pub first_data_wait: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            cache_timeout: Duration::from_secs(300),
            refresh_timeout: Duration::from_secs(120),
            first_data_wait: Duration::from_secs(10),
        }
    }
}

impl RefreshSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_timeout: Duration::from_secs(config.get_cache_timeout_secs()),
            refresh_timeout: Duration::from_secs(config.get_refresh_timeout_secs()),
            first_data_wait: Duration::from_secs(config.get_first_data_wait_secs()),
        }
    }
}

/// Compteurs des rafraîchissements
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct RefreshStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub last_error: Option<String>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
}

/// Résultat d'un déclenchement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Started,
    AlreadyRunning,
}

/// Fraîcheur des données servies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Fresh,
    Stale,
}

pub struct RefreshCoordinator {
    store: Arc<CacheStore>,
    fetcher: Arc<dyn TrackFetcher>,
    transformer: Transformer,
    settings: RefreshSettings,
    stats: Mutex<RefreshStats>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<CacheStore>,
        fetcher: Arc<dyn TrackFetcher>,
        transformer: Transformer,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            transformer,
            settings,
            stats: Mutex::new(RefreshStats::default()),
        }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn fetcher(&self) -> &Arc<dyn TrackFetcher> {
        &self.fetcher
    }

    pub fn settings(&self) -> &RefreshSettings {
        &self.settings
    }

    pub fn stats(&self) -> RefreshStats {
        self.stats.lock().clone()
    }

    /// Vrai si le cache contient des données de moins de `cache_timeout`
    pub fn is_valid(&self) -> bool {
        self.store.snapshot().is_valid(self.settings.cache_timeout)
    }

    pub fn cache_status(&self, snapshot: &CacheSnapshot) -> CacheStatus {
        if snapshot.is_valid(self.settings.cache_timeout) {
            CacheStatus::Fresh
        } else {
            CacheStatus::Stale
        }
    }

    /// Lance un rafraîchissement en tâche de fond, sauf s'il y en a déjà un
    pub fn trigger_refresh_if_needed(self: &Arc<Self>) -> RefreshTrigger {
        match self.store.try_begin_refresh() {
            Some(ticket) => {
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    // L'échec est déjà journalisé et compté
                    let _ = this.run_refresh(ticket).await;
                });
                RefreshTrigger::Started
            }
            None => {
                debug!("Refresh already in progress, trigger coalesced");
                RefreshTrigger::AlreadyRunning
            }
        }
    }

    /// Rafraîchit dans la tâche appelante
    ///
    /// Échoue avec [`TrendError::RefreshInProgress`] si un autre
    /// rafraîchissement détient déjà le drapeau.
    pub async fn refresh_now(&self) -> Result<Arc<CacheSnapshot>> {
        let ticket = self
            .store
            .try_begin_refresh()
            .ok_or(TrendError::RefreshInProgress)?;
        self.run_refresh(ticket).await
    }

    async fn run_refresh(&self, ticket: RefreshTicket) -> Result<Arc<CacheSnapshot>> {
        let attempt = RefreshAttempt::begin(&self.stats);
        info!("Refreshing music data from {}", self.fetcher.name());
        let started = Instant::now();

        let outcome = match tokio::time::timeout(self.settings.refresh_timeout, self.fetch_and_transform()).await {
            Ok(result) => result,
            Err(_) => Err(TrendError::RefreshTimeout(self.settings.refresh_timeout)),
        };

        match outcome {
            Ok(dataset) => {
                let snapshot = ticket.complete(dataset);
                let elapsed = started.elapsed();
                attempt.succeed(elapsed);
                info!(
                    "Music data refreshed: {} tracks (generation {}) in {:?}",
                    snapshot.len(),
                    snapshot.generation(),
                    elapsed
                );
                Ok(snapshot)
            }
            Err(e) => {
                drop(ticket);
                attempt.fail(e.to_string());
                error!("Music data refresh failed, keeping previous data: {}", e);
                Err(e)
            }
        }
    }

    async fn fetch_and_transform(&self) -> Result<Dataset> {
        let raws = self.fetcher.fetch_tracks().await?;
        debug!("Fetched {} raw track records", raws.len());
        self.transformer.transform(raws)
    }

    /// Chemin de lecture
    ///
    /// Déclenche un rafraîchissement si les données sont périmées (ou si
    /// `force`), puis renvoie immédiatement les données présentes. Si le
    /// cache n'a jamais été rempli, attend au plus `first_data_wait`.
    pub async fn ensure_fresh(self: &Arc<Self>, force: bool) -> Result<(Arc<CacheSnapshot>, CacheStatus)> {
        let snapshot = self.store.snapshot();
        if force || !snapshot.is_valid(self.settings.cache_timeout) {
            self.trigger_refresh_if_needed();
        }

        let snapshot = if snapshot.has_data() {
            snapshot
        } else {
            self.store.wait_for_data(self.settings.first_data_wait).await?
        };

        let status = self.cache_status(&snapshot);
        Ok((snapshot, status))
    }
}

/// Comptabilise une tentative de rafraîchissement
///
/// Une tentative abandonnée sans issue (panique, tâche annulée) est
/// comptée comme un échec.
struct RefreshAttempt<'a> {
    stats: &'a Mutex<RefreshStats>,
    settled: bool,
}

impl<'a> RefreshAttempt<'a> {
    fn begin(stats: &'a Mutex<RefreshStats>) -> Self {
        {
            let mut stats = stats.lock();
            stats.attempts += 1;
            stats.last_attempt = Some(Utc::now());
        }
        Self { stats, settled: false }
    }

    fn succeed(mut self, elapsed: Duration) {
        self.settled = true;
        let mut stats = self.stats.lock();
        stats.successes += 1;
        stats.last_duration_ms = Some(elapsed.as_millis() as u64);
    }

    fn fail(mut self, message: String) {
        self.settled = true;
        self.record_failure(message);
    }

    fn record_failure(&self, message: String) {
        let mut stats = self.stats.lock();
        stats.failures += 1;
        stats.last_error = Some(message);
    }
}

impl Drop for RefreshAttempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.record_failure("Refresh aborted before completion".to_string());
        }
    }
}
