//! Fournisseur de pistes Spotify pour le cache de tendances
//!
//! [`SpotifySource`] implémente [`TrackFetcher`] : il collecte les pistes de
//! quelques playlists (mises en avant, sinon par catégorie, sinon par
//! recherche) puis, si rien n'a été collecté, se rabat sur une recherche de
//! pistes par mots-clés.

use crate::client::SpotifyClient;
use crate::config_ext::SpotifyConfigExt;
use crate::error::SpotifyError;
use crate::models::{PlaylistRef, TrackOrigin};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{info, warn};
use trendcache::{DataSource, FetcherHealth, RawTrack, TrackFetcher, TrendError};
use trendconfig::Config;

/// Termes de la recherche de repli
pub const FALLBACK_SEARCH_TERMS: [&str; 6] = ["2024", "2025", "popular", "top hits", "trending", "viral"];

/// Nombre total de pistes visé par la recherche de repli
const FALLBACK_SEARCH_LIMIT: usize = 50;

/// Nombre de catégories parcourues
const CATEGORY_LIMIT: usize = 5;

/// Requête de la recherche de playlists
const PLAYLIST_SEARCH_QUERY: &str = "playlist";

/// Paramètres de collecte
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectSettings {
    pub num_playlists: usize,
    pub tracks_per_playlist: usize,
    pub include_audio_features: bool,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            num_playlists: 5,
            tracks_per_playlist: 25,
            include_audio_features: false,
        }
    }
}

impl CollectSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            num_playlists: config.get_spotify_num_playlists(),
            tracks_per_playlist: config.get_spotify_tracks_per_playlist(),
            include_audio_features: config.get_spotify_include_audio_features(),
        }
    }
}

/// Fournisseur de pistes adossé à l'API Spotify
pub struct SpotifySource {
    client: SpotifyClient,
    settings: CollectSettings,
}

impl SpotifySource {
    pub fn new(client: SpotifyClient, settings: CollectSettings) -> Self {
        Self { client, settings }
    }

    /// Construit client et paramètres depuis une configuration
    pub fn from_config_obj(config: &Config) -> crate::Result<Self> {
        Ok(Self::new(
            SpotifyClient::from_config_obj(config)?,
            CollectSettings::from_config(config),
        ))
    }

    pub fn client(&self) -> &SpotifyClient {
        &self.client
    }

    pub fn settings(&self) -> &CollectSettings {
        &self.settings
    }

    /// Sélectionne les playlists à parcourir
    ///
    /// Mises en avant, sinon playlists des premières catégories, sinon
    /// recherche de playlists. La première erreur rencontrée est conservée
    /// dans `last_error`.
    async fn collect_playlists(
        &self,
        last_error: &mut Option<SpotifyError>,
    ) -> Vec<(PlaylistRef, DataSource)> {
        let limit = self.settings.num_playlists;

        match self.client.featured_playlists(limit).await {
            Ok(playlists) if !playlists.is_empty() => {
                info!("Using {} featured playlists", playlists.len());
                return tag(playlists, limit, DataSource::FeaturedPlaylist);
            }
            Ok(_) => info!("No featured playlist, trying categories"),
            Err(e) => {
                warn!("Featured playlists unavailable: {}", e);
                last_error.get_or_insert(e);
            }
        }

        let mut playlists = Vec::new();
        match self.client.categories(CATEGORY_LIMIT).await {
            Ok(categories) => {
                for category in categories {
                    if playlists.len() >= limit {
                        break;
                    }
                    match self
                        .client
                        .category_playlists(&category.id, limit.min(CATEGORY_LIMIT))
                        .await
                    {
                        Ok(found) => playlists.extend(found),
                        Err(e) => warn!("Category {} failed: {}", category.id, e),
                    }
                }
            }
            Err(e) => {
                warn!("Categories unavailable: {}", e);
                last_error.get_or_insert(e);
            }
        }
        if !playlists.is_empty() {
            info!("Found {} playlists via categories", playlists.len());
            return tag(playlists, limit, DataSource::CategoryPlaylist);
        }

        match self.client.search_playlists(PLAYLIST_SEARCH_QUERY, limit).await {
            Ok(found) => {
                info!("Found {} playlists via search", found.len());
                tag(found, limit, DataSource::PlaylistSearch)
            }
            Err(e) => {
                warn!("Playlist search failed: {}", e);
                last_error.get_or_insert(e);
                Vec::new()
            }
        }
    }

    /// Pistes des playlists sélectionnées, étiquetées avec leur playlist
    async fn collect_playlist_tracks(
        &self,
        playlists: &[(PlaylistRef, DataSource)],
    ) -> Vec<RawTrack> {
        let mut raws = Vec::new();

        for (i, (playlist, source)) in playlists.iter().enumerate() {
            info!(
                "Processing playlist {}/{}: {}",
                i + 1,
                playlists.len(),
                playlist.name
            );
            match self
                .client
                .playlist_tracks(&playlist.id, self.settings.tracks_per_playlist)
                .await
            {
                Ok(tracks) => {
                    let origin = TrackOrigin::playlist(playlist, *source);
                    raws.extend(tracks.into_iter().map(|t| t.into_raw(&origin)));
                }
                Err(e) => warn!("Failed to get tracks for playlist {}: {}", playlist.id, e),
            }
        }
        raws
    }

    /// Recherche de pistes sur les termes de repli
    async fn search_fallback(&self, last_error: &mut Option<SpotifyError>) -> Vec<RawTrack> {
        let per_term = (FALLBACK_SEARCH_LIMIT / FALLBACK_SEARCH_TERMS.len()).max(1);
        let mut raws = Vec::new();

        for term in FALLBACK_SEARCH_TERMS {
            match self.client.search_tracks(term, per_term).await {
                Ok(tracks) => {
                    let origin = TrackOrigin::search(term);
                    raws.extend(tracks.into_iter().map(|t| t.into_raw(&origin)));
                }
                Err(e) => {
                    warn!("Search term '{}' failed: {}", term, e);
                    last_error.get_or_insert(e);
                }
            }
        }
        raws
    }

    /// Ajoute les caractéristiques audio ; un échec n'est pas bloquant
    async fn attach_audio_features(&self, raws: &mut [RawTrack]) {
        let mut ids: Vec<String> = raws.iter().filter_map(|r| r.track_id.clone()).collect();
        ids.sort();
        ids.dedup();

        match self.client.audio_features(&ids).await {
            Ok(features) => {
                let by_id: HashMap<_, _> = features.into_iter().map(|f| (f.id, f.features)).collect();
                for raw in raws.iter_mut() {
                    if let Some(id) = &raw.track_id {
                        raw.audio_features = by_id.get(id).copied();
                    }
                }
                info!("Added audio features to {} tracks", by_id.len());
            }
            Err(e) => warn!("Failed to get audio features: {}", e),
        }
    }
}

fn tag(mut playlists: Vec<PlaylistRef>, limit: usize, source: DataSource) -> Vec<(PlaylistRef, DataSource)> {
    playlists.truncate(limit);
    playlists.into_iter().map(|p| (p, source)).collect()
}

#[async_trait]
impl TrackFetcher for SpotifySource {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn fetch_tracks(&self) -> trendcache::Result<Vec<RawTrack>> {
        info!("Starting Spotify data collection");
        let mut last_error = None;

        let playlists = self.collect_playlists(&mut last_error).await;
        let mut raws = self.collect_playlist_tracks(&playlists).await;

        if raws.is_empty() {
            warn!("No tracks collected from playlists, falling back to track search");
            raws = self.search_fallback(&mut last_error).await;
        }

        if raws.is_empty() {
            return Err(match last_error {
                Some(e) => e.into(),
                None => TrendError::Fetch("No tracks returned by Spotify".to_string()),
            });
        }

        if self.settings.include_audio_features {
            self.attach_audio_features(&mut raws).await;
        }

        info!("Collected {} raw tracks from Spotify", raws.len());
        Ok(raws)
    }

    async fn health(&self) -> FetcherHealth {
        let api = self.client.api();
        if api.has_valid_token() {
            return FetcherHealth::connected(self.name());
        }
        match api.authenticate().await {
            Ok(_) => FetcherHealth::connected(self.name()),
            Err(e) => FetcherHealth::disconnected(self.name(), e.to_string()),
        }
    }
}
