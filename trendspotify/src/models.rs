//! Modèles de données renvoyés par l'API Spotify
//!
//! Seuls les champs utiles au pipeline sont décodés. Les listes sont lues
//! élément par élément (voir [`decode_items`]) : un élément nul ou mal formé
//! est ignoré sans faire échouer la page entière.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use trendcache::{AudioFeatures, DataSource, RawTrack};

/// Référence à une playlist (featured, catégorie ou recherche)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Catégorie de navigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

/// Objet piste de l'API Spotify
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: AlbumRef,
    #[serde(default)]
    pub popularity: Option<i64>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub explicit: Option<bool>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

/// Origine d'une piste collectée : nom affiché, id de playlist et type de source
#[derive(Debug, Clone, PartialEq)]
pub struct TrackOrigin {
    pub name: String,
    pub playlist_id: Option<String>,
    pub data_source: DataSource,
}

impl TrackOrigin {
    pub fn playlist(playlist: &PlaylistRef, data_source: DataSource) -> Self {
        Self {
            name: playlist.name.clone(),
            playlist_id: Some(playlist.id.clone()),
            data_source,
        }
    }

    pub fn search(term: &str) -> Self {
        Self {
            name: format!("search:{}", term),
            playlist_id: None,
            data_source: DataSource::TrackSearch,
        }
    }
}

impl SpotifyTrack {
    /// Convertit la piste en enregistrement brut pour le transformer
    pub fn into_raw(self, origin: &TrackOrigin) -> RawTrack {
        let artist = self.artists.into_iter().next().map(|a| a.name);
        let image_url = self.album.images.into_iter().next().map(|i| i.url);

        RawTrack {
            track_id: Some(self.id),
            track_name: Some(self.name),
            artist,
            album: Some(self.album.name).filter(|n| !n.is_empty()),
            popularity: self.popularity,
            duration_ms: self.duration_ms,
            explicit: self.explicit,
            spotify_url: self.external_urls.spotify,
            preview_url: self.preview_url,
            image_url,
            release_date: self.album.release_date,
            playlist_name: Some(origin.name.clone()),
            playlist_id: origin.playlist_id.clone(),
            data_source: origin.data_source,
            audio_features: None,
        }
    }
}

/// Caractéristiques audio telles que renvoyées par `/audio-features`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyAudioFeatures {
    pub id: String,
    #[serde(flatten)]
    pub features: AudioFeatures,
}

/// Jeton renvoyé par le service d'authentification
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Décode une liste d'éléments JSON en ignorant les éléments invalides
pub(crate) fn decode_items<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter(|item| !item.is_null())
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("Skipping malformed {}: {}", what, e);
                None
            }
        })
        .collect();

    if decoded.len() < total {
        debug!("Kept {}/{} {} items", decoded.len(), total, what);
    }
    decoded
}

/// Extrait le tableau `items` sous `root.key` (`{"playlists": {"items": [...]}}`)
pub(crate) fn nested_items(mut root: Value, key: &str) -> Vec<Value> {
    match root.get_mut(key).and_then(|v| v.get_mut("items")).map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_items_skips_null_and_malformed() {
        let items = vec![
            json!({"id": "a", "name": "One"}),
            Value::Null,
            json!({"name": "no id"}),
            json!({"id": null, "name": "local"}),
            json!({"id": "b", "name": "Two", "popularity": 40}),
        ];
        let tracks: Vec<SpotifyTrack> = decode_items(items, "track");
        let ids: Vec<_> = tracks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_nested_items() {
        let root = json!({"playlists": {"items": [{"id": "p1", "name": "Hits"}]}});
        let items = nested_items(root, "playlists");
        assert_eq!(items.len(), 1);
        assert!(nested_items(json!({"other": 1}), "playlists").is_empty());
    }

    #[test]
    fn test_into_raw() {
        let track: SpotifyTrack = serde_json::from_value(json!({
            "id": "t1",
            "name": "Song",
            "artists": [{"id": "a1", "name": "Artist"}, {"name": "Feat"}],
            "album": {
                "name": "Album",
                "images": [{"url": "http://img/1"}],
                "release_date": "2024-05-01"
            },
            "popularity": 77,
            "duration_ms": 180000,
            "explicit": true,
            "external_urls": {"spotify": "https://open.spotify.com/track/t1"}
        }))
        .unwrap();

        let origin = TrackOrigin::search("viral");
        let raw = track.into_raw(&origin);
        assert_eq!(raw.artist.as_deref(), Some("Artist"));
        assert_eq!(raw.image_url.as_deref(), Some("http://img/1"));
        assert_eq!(raw.playlist_name.as_deref(), Some("search:viral"));
        assert_eq!(raw.data_source, DataSource::TrackSearch);
        assert_eq!(raw.popularity, Some(77));
    }

    #[test]
    fn test_audio_features_flatten() {
        let f: SpotifyAudioFeatures = serde_json::from_value(json!({
            "id": "t1",
            "danceability": 0.5,
            "energy": 0.8,
            "tempo": 120.0,
            "type": "audio_features"
        }))
        .unwrap();
        assert_eq!(f.id, "t1");
        assert_eq!(f.features.energy, Some(0.8));
        assert_eq!(f.features.valence, None);
    }
}
