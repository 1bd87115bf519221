//! Cache en mémoire des réponses Spotify
//!
//! Ce module fournit un cache avec TTL pour éviter de redemander les mêmes
//! listes de playlists et résultats de recherche d'un rafraîchissement à
//! l'autre quand ils sont rapprochés.

use crate::models::{PlaylistRef, SpotifyTrack};
use moka::future::Cache as MokaCache;
use std::sync::Arc;
use std::time::Duration;

/// TTL par défaut des réponses (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache des réponses de l'API Spotify
#[derive(Clone)]
pub struct SpotifyCache {
    /// Listes de playlists (featured, catégories, recherche)
    playlists: Arc<MokaCache<String, Vec<PlaylistRef>>>,
    /// Pistes (pistes d'une playlist, recherche de pistes)
    tracks: Arc<MokaCache<String, Vec<SpotifyTrack>>>,
}

impl SpotifyCache {
    /// Crée un cache avec le TTL par défaut
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            playlists: Arc::new(
                MokaCache::builder()
                    .max_capacity(256)
                    .time_to_live(ttl)
                    .build(),
            ),
            tracks: Arc::new(
                MokaCache::builder()
                    .max_capacity(1024)
                    .time_to_live(ttl)
                    .build(),
            ),
        }
    }

    // ============ Playlists ============

    pub async fn get_playlists(&self, key: &str) -> Option<Vec<PlaylistRef>> {
        self.playlists.get(key).await
    }

    pub async fn put_playlists(&self, key: String, playlists: Vec<PlaylistRef>) {
        self.playlists.insert(key, playlists).await;
    }

    // ============ Tracks ============

    pub async fn get_tracks(&self, key: &str) -> Option<Vec<SpotifyTrack>> {
        self.tracks.get(key).await
    }

    pub async fn put_tracks(&self, key: String, tracks: Vec<SpotifyTrack>) {
        self.tracks.insert(key, tracks).await;
    }

    /// Vide tout le cache
    pub fn clear(&self) {
        self.playlists.invalidate_all();
        self.tracks.invalidate_all();
    }
}

impl Default for SpotifyCache {
    fn default() -> Self {
        Self::new()
    }
}
