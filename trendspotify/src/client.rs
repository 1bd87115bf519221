//! Client Spotify haut-niveau avec retry et cache
//!
//! Chaque appel passe par le cache puis, en cas d'absence, par la
//! [`RetryPolicy`] qui gère le rate limiting, la réauthentification et le
//! backoff exponentiel.

use crate::api::SpotifyApi;
use crate::api::catalog::{AUDIO_FEATURES_BATCH, PLAYLIST_PAGE_SIZE};
use crate::cache::SpotifyCache;
use crate::config_ext::SpotifyConfigExt;
use crate::error::{Result, SpotifyError};
use crate::models::{CategoryRef, PlaylistRef, SpotifyAudioFeatures, SpotifyTrack};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use trendconfig::{Config, get_config};

/// Politique de retry des requêtes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Nombre maximal de tentatives (au moins 1)
    pub max_retries: u32,
    /// Pause avant chaque requête
    pub rate_limit_buffer: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            rate_limit_buffer: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.get_spotify_max_retries(),
            rate_limit_buffer: config.get_spotify_rate_limit_buffer(),
        }
    }

    /// Exécute `op` en appliquant la politique
    ///
    /// - 429 : attend `Retry-After + 1` secondes (1 s par défaut)
    /// - 401 : le jeton a été oublié, la tentative suivante se réauthentifie
    /// - erreur de configuration : pas de nouvelle tentative
    /// - autre erreur : backoff de `2^n` secondes (1 s, 2 s, 4 s...)
    ///
    /// La dernière erreur est renvoyée quand les tentatives sont épuisées.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_retries.max(1);
        let mut attempt = 0;

        loop {
            tokio::time::sleep(self.rate_limit_buffer).await;

            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            attempt += 1;

            if attempt >= max_attempts || matches!(err, SpotifyError::Configuration(_)) {
                error!("{} failed after {} attempt(s): {}", what, attempt, err);
                return Err(err);
            }

            match &err {
                SpotifyError::RateLimited { retry_after } => {
                    let wait = retry_after.unwrap_or(1) + 1;
                    warn!("{}: rate limited, waiting {} seconds", what, wait);
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                e if e.is_auth_error() => {
                    warn!("{}: authentication expired, re-authenticating", what);
                }
                e => {
                    let backoff = Duration::from_secs(1 << (attempt - 1).min(6));
                    warn!("{}: {} (retrying in {:?})", what, e, backoff);
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

/// Client Spotify haut-niveau
pub struct SpotifyClient {
    api: Arc<SpotifyApi>,
    cache: SpotifyCache,
    retry: RetryPolicy,
    market: String,
}

impl SpotifyClient {
    pub fn new(api: SpotifyApi, market: impl Into<String>, retry: RetryPolicy, cache_ttl: Duration) -> Self {
        Self {
            api: Arc::new(api),
            cache: SpotifyCache::with_ttl(cache_ttl),
            retry,
            market: market.into(),
        }
    }

    /// Crée un client depuis la configuration globale
    pub fn from_config() -> Result<Self> {
        Self::from_config_obj(&get_config())
    }

    /// Crée un client depuis une configuration donnée
    pub fn from_config_obj(config: &Config) -> Result<Self> {
        // Sans credentials le client est créé quand même : chaque appel
        // échouera avec une erreur de configuration
        let (client_id, client_secret) = match config.get_spotify_credentials() {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!("{}", e);
                (String::new(), String::new())
            }
        };
        let api = SpotifyApi::new(client_id, client_secret)?.with_base_urls(
            config.get_spotify_api_base_url(),
            config.get_spotify_accounts_base_url(),
        );

        info!(
            "Spotify client configured (market {}, {} attempts)",
            config.get_spotify_market(),
            config.get_spotify_max_retries()
        );

        Ok(Self::new(
            api,
            config.get_spotify_market(),
            RetryPolicy::from_config(config),
            config.get_spotify_request_cache_ttl(),
        ))
    }

    pub fn api(&self) -> &SpotifyApi {
        &self.api
    }

    pub fn cache(&self) -> &SpotifyCache {
        &self.cache
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Playlists mises en avant
    pub async fn featured_playlists(&self, limit: usize) -> Result<Vec<PlaylistRef>> {
        let key = format!("featured:{}:{}", limit, self.market);
        if let Some(cached) = self.cache.get_playlists(&key).await {
            debug!("Featured playlists from cache");
            return Ok(cached);
        }

        let playlists = self
            .retry
            .run("featured playlists", || {
                self.api.featured_playlists(limit, &self.market)
            })
            .await?;

        self.cache.put_playlists(key, playlists.clone()).await;
        Ok(playlists)
    }

    /// Catégories de navigation (non mises en cache)
    pub async fn categories(&self, limit: usize) -> Result<Vec<CategoryRef>> {
        self.retry
            .run("categories", || self.api.categories(limit, &self.market))
            .await
    }

    /// Playlists d'une catégorie
    pub async fn category_playlists(&self, category_id: &str, limit: usize) -> Result<Vec<PlaylistRef>> {
        let key = format!("category:{}:{}:{}", category_id, limit, self.market);
        if let Some(cached) = self.cache.get_playlists(&key).await {
            return Ok(cached);
        }

        let playlists = self
            .retry
            .run("category playlists", || {
                self.api.category_playlists(category_id, limit, &self.market)
            })
            .await?;

        self.cache.put_playlists(key, playlists.clone()).await;
        Ok(playlists)
    }

    /// Recherche de playlists
    pub async fn search_playlists(&self, query: &str, limit: usize) -> Result<Vec<PlaylistRef>> {
        let key = format!("search-playlists:{}:{}:{}", query, limit, self.market);
        if let Some(cached) = self.cache.get_playlists(&key).await {
            return Ok(cached);
        }

        let playlists = self
            .retry
            .run("playlist search", || {
                self.api.search_playlists(query, limit, &self.market)
            })
            .await?;

        self.cache.put_playlists(key, playlists.clone()).await;
        Ok(playlists)
    }

    /// Recherche de pistes
    pub async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<SpotifyTrack>> {
        let key = format!("search-tracks:{}:{}:{}", query, limit, self.market);
        if let Some(cached) = self.cache.get_tracks(&key).await {
            return Ok(cached);
        }

        let tracks = self
            .retry
            .run("track search", || self.api.search_tracks(query, limit, &self.market))
            .await?;

        self.cache.put_tracks(key, tracks.clone()).await;
        Ok(tracks)
    }

    /// Jusqu'à `limit` pistes d'une playlist, par pages de 50
    pub async fn playlist_tracks(&self, playlist_id: &str, limit: usize) -> Result<Vec<SpotifyTrack>> {
        let key = format!("playlist:{}:{}:{}", playlist_id, limit, self.market);
        if let Some(cached) = self.cache.get_tracks(&key).await {
            return Ok(cached);
        }

        let mut tracks = Vec::new();
        let mut offset = 0;

        while tracks.len() < limit {
            let batch = PLAYLIST_PAGE_SIZE.min(limit - tracks.len());
            let page = self
                .retry
                .run("playlist tracks", || {
                    self.api
                        .playlist_tracks_page(playlist_id, batch, offset, &self.market)
                })
                .await?;

            if page.item_count == 0 {
                break;
            }
            tracks.extend(page.tracks);
            offset += batch;
            if page.item_count < batch {
                break;
            }
        }
        tracks.truncate(limit);

        debug!("Retrieved {} tracks from playlist {}", tracks.len(), playlist_id);
        self.cache.put_tracks(key, tracks.clone()).await;
        Ok(tracks)
    }

    /// Caractéristiques audio, par lots de 100 identifiants
    pub async fn audio_features(&self, ids: &[String]) -> Result<Vec<SpotifyAudioFeatures>> {
        let mut features = Vec::with_capacity(ids.len());
        for (i, chunk) in ids.chunks(AUDIO_FEATURES_BATCH).enumerate() {
            let batch = self
                .retry
                .run("audio features", || self.api.audio_features(chunk))
                .await?;
            debug!("Audio features batch {}: {} entries", i + 1, batch.len());
            features.extend(batch);
        }
        Ok(features)
    }
}
