//! Entrée de cache partagée
//!
//! Le contenu (pistes, statistiques, date de mise à jour) forme un
//! [`CacheSnapshot`] immuable remplacé d'un bloc. Le drapeau de
//! rafraîchissement vit sous le même verrou et n'est posé que par un
//! [`RefreshTicket`], qui le relâche à sa destruction.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{Result, TrendError};
use crate::models::{Analytics, Dataset, Track};

/// Contenu du cache à un instant donné
#[derive(Debug, Default)]
pub struct CacheSnapshot {
    generation: u64,
    tracks: Vec<Track>,
    analytics: Option<Analytics>,
    last_updated: Option<DateTime<Utc>>,
    refreshed_at: Option<Instant>,
}

impl CacheSnapshot {
    /// Numéro de version, incrémenté à chaque installation de données
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn analytics(&self) -> Option<&Analytics> {
        self.analytics.as_ref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn has_data(&self) -> bool {
        self.refreshed_at.is_some()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Âge des données, `None` tant qu'aucun rafraîchissement n'a abouti
    pub fn age(&self) -> Option<Duration> {
        self.refreshed_at.map(|t| t.elapsed())
    }

    /// Vrai si des données existent et ont moins de `timeout`
    pub fn is_valid(&self, timeout: Duration) -> bool {
        self.age().is_some_and(|age| age < timeout)
    }
}

#[derive(Debug)]
struct EntryState {
    snapshot: Arc<CacheSnapshot>,
    is_refreshing: bool,
}

/// Entrée de cache unique du processus
#[derive(Debug)]
pub struct CacheStore {
    state: RwLock<EntryState>,
    generation_tx: watch::Sender<u64>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    pub fn new() -> Self {
        let (generation_tx, _) = watch::channel(0);
        Self {
            state: RwLock::new(EntryState {
                snapshot: Arc::new(CacheSnapshot::default()),
                is_refreshing: false,
            }),
            generation_tx,
        }
    }

    /// Contenu courant (lecture sans attente réseau)
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.state.read().snapshot.clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.state.read().is_refreshing
    }

    /// Pose le drapeau de rafraîchissement s'il est libre
    ///
    /// Retourne `None` si un rafraîchissement est déjà en cours.
    pub fn try_begin_refresh(self: &Arc<Self>) -> Option<RefreshTicket> {
        let mut state = self.state.write();
        if state.is_refreshing {
            return None;
        }
        state.is_refreshing = true;
        Some(RefreshTicket {
            store: Arc::clone(self),
            released: false,
        })
    }

    /// Notifications de changement de génération
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation_tx.subscribe()
    }

    /// Attend au plus `ceiling` que des données soient disponibles
    pub async fn wait_for_data(&self, ceiling: Duration) -> Result<Arc<CacheSnapshot>> {
        // Abonnement avant la vérification : aucune installation ne peut être manquée
        let mut rx = self.subscribe();

        let wait = async {
            loop {
                let snapshot = self.snapshot();
                if snapshot.has_data() {
                    return snapshot;
                }
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::time::timeout(ceiling, wait)
            .await
            .map_err(|_| TrendError::music_unavailable())
    }

    fn install(&self, dataset: Dataset) -> Arc<CacheSnapshot> {
        let snapshot = {
            let mut state = self.state.write();
            let previous = &state.snapshot;

            let mut last_updated = Utc::now();
            if let Some(prev) = previous.last_updated {
                if last_updated <= prev {
                    last_updated = prev + chrono::Duration::microseconds(1);
                }
            }

            let snapshot = Arc::new(CacheSnapshot {
                generation: previous.generation + 1,
                tracks: dataset.tracks,
                analytics: Some(dataset.analytics),
                last_updated: Some(last_updated),
                refreshed_at: Some(Instant::now()),
            });
            state.snapshot = snapshot.clone();
            state.is_refreshing = false;
            snapshot
        };

        self.generation_tx.send_replace(snapshot.generation);
        snapshot
    }

    fn release(&self) {
        self.state.write().is_refreshing = false;
    }
}

/// Droit exclusif de rafraîchir le cache
///
/// Détenu par le seul rafraîchissement en cours. S'il est abandonné (erreur,
/// délai dépassé, tâche annulée ou panique), le drapeau est relâché sans
/// toucher aux données.
#[derive(Debug)]
pub struct RefreshTicket {
    store: Arc<CacheStore>,
    released: bool,
}

impl RefreshTicket {
    /// Installe un nouveau jeu de données et relâche le drapeau, atomiquement
    pub fn complete(mut self, dataset: Dataset) -> Arc<CacheSnapshot> {
        self.released = true;
        self.store.install(dataset)
    }
}

impl Drop for RefreshTicket {
    fn drop(&mut self) {
        if !self.released {
            self.store.release();
        }
    }
}
