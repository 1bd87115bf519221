//! Endpoints catalogue : playlists, pistes, recherche, caractéristiques audio

use super::SpotifyApi;
use crate::error::Result;
use crate::models::{
    CategoryRef, PlaylistRef, SpotifyAudioFeatures, SpotifyTrack, decode_items, nested_items,
};
use serde_json::Value;

/// Nombre maximal de pistes par page de playlist
pub const PLAYLIST_PAGE_SIZE: usize = 50;

/// Nombre maximal d'identifiants par appel `/audio-features`
pub const AUDIO_FEATURES_BATCH: usize = 100;

/// Une page de pistes de playlist
#[derive(Debug, Clone, Default)]
pub struct TrackPage {
    pub tracks: Vec<SpotifyTrack>,
    /// Nombre d'éléments renvoyés, y compris ceux qui ont été ignorés
    pub item_count: usize,
}

impl SpotifyApi {
    /// Playlists mises en avant pour un pays
    pub async fn featured_playlists(&self, limit: usize, country: &str) -> Result<Vec<PlaylistRef>> {
        let limit = limit.to_string();
        let root: Value = self
            .get(
                "/browse/featured-playlists",
                &[("limit", &limit), ("country", country)],
            )
            .await?;
        Ok(decode_items(nested_items(root, "playlists"), "playlist"))
    }

    /// Catégories de navigation
    pub async fn categories(&self, limit: usize, country: &str) -> Result<Vec<CategoryRef>> {
        let limit = limit.to_string();
        let root: Value = self
            .get("/browse/categories", &[("limit", &limit), ("country", country)])
            .await?;
        Ok(decode_items(nested_items(root, "categories"), "category"))
    }

    /// Playlists d'une catégorie
    pub async fn category_playlists(
        &self,
        category_id: &str,
        limit: usize,
        country: &str,
    ) -> Result<Vec<PlaylistRef>> {
        let limit = limit.to_string();
        let endpoint = format!("/browse/categories/{}/playlists", category_id);
        let root: Value = self
            .get(&endpoint, &[("limit", &limit), ("country", country)])
            .await?;
        Ok(decode_items(nested_items(root, "playlists"), "playlist"))
    }

    /// Recherche de playlists
    pub async fn search_playlists(
        &self,
        query: &str,
        limit: usize,
        market: &str,
    ) -> Result<Vec<PlaylistRef>> {
        let limit = limit.to_string();
        let root: Value = self
            .get(
                "/search",
                &[("q", query), ("type", "playlist"), ("limit", &limit), ("market", market)],
            )
            .await?;
        Ok(decode_items(nested_items(root, "playlists"), "playlist"))
    }

    /// Recherche de pistes
    pub async fn search_tracks(
        &self,
        query: &str,
        limit: usize,
        market: &str,
    ) -> Result<Vec<SpotifyTrack>> {
        let limit = limit.to_string();
        let root: Value = self
            .get(
                "/search",
                &[("q", query), ("type", "track"), ("limit", &limit), ("market", market)],
            )
            .await?;
        Ok(decode_items(nested_items(root, "tracks"), "track"))
    }

    /// Une page de pistes d'une playlist
    ///
    /// Chaque élément porte la piste sous `track`. Les éléments sans piste
    /// (pistes locales, épisodes supprimés) sont ignorés.
    pub async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        limit: usize,
        offset: usize,
        market: &str,
    ) -> Result<TrackPage> {
        let limit = limit.min(PLAYLIST_PAGE_SIZE).to_string();
        let offset = offset.to_string();
        let endpoint = format!("/playlists/{}/tracks", playlist_id);
        let mut root: Value = self
            .get(
                &endpoint,
                &[("limit", &limit), ("offset", &offset), ("market", market)],
            )
            .await?;

        let items = match root.get_mut("items").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let item_count = items.len();
        let tracks = items
            .into_iter()
            .map(|mut item| item.get_mut("track").map(Value::take).unwrap_or(Value::Null))
            .collect();

        Ok(TrackPage {
            tracks: decode_items(tracks, "playlist track"),
            item_count,
        })
    }

    /// Caractéristiques audio pour au plus [`AUDIO_FEATURES_BATCH`] pistes
    pub async fn audio_features(&self, ids: &[String]) -> Result<Vec<SpotifyAudioFeatures>> {
        let ids = ids[..ids.len().min(AUDIO_FEATURES_BATCH)].join(",");
        let mut root: Value = self.get("/audio-features", &[("ids", &ids)]).await?;
        let items = match root.get_mut("audio_features").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        Ok(decode_items(items, "audio features"))
    }
}
