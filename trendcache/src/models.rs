//! Modèles de données du cache de tendances
//!
//! - [`RawTrack`] : enregistrement brut produit par un fetcher, tous champs optionnels
//! - [`Track`] : piste validée, immuable, enrichie (palier de popularité, score de tendance)
//! - [`Analytics`] : statistiques calculées sur un jeu de pistes
//! - [`Dataset`] : résultat d'une transformation, installé d'un bloc dans le cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Origine d'une piste dans le catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    FeaturedPlaylist,
    CategoryPlaylist,
    PlaylistSearch,
    TrackSearch,
    #[default]
    Unknown,
}

/// Caractéristiques audio d'une piste
///
/// Une valeur absente de la réponse amont reste `None` et n'entre dans
/// aucune statistique.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct AudioFeatures {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub danceability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acousticness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrumentalness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speechiness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loudness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo: Option<f64>,
}

impl AudioFeatures {
    /// Noms des caractéristiques, dans l'ordre de [`values`](Self::values)
    pub const NAMES: [&'static str; 9] = [
        "danceability",
        "energy",
        "valence",
        "acousticness",
        "instrumentalness",
        "speechiness",
        "liveness",
        "loudness",
        "tempo",
    ];

    pub fn values(&self) -> [Option<f64>; 9] {
        [
            self.danceability,
            self.energy,
            self.valence,
            self.acousticness,
            self.instrumentalness,
            self.speechiness,
            self.liveness,
            self.loudness,
            self.tempo,
        ]
    }

    pub fn from_values(values: [Option<f64>; 9]) -> Self {
        let [danceability, energy, valence, acousticness, instrumentalness, speechiness, liveness, loudness, tempo] =
            values;
        Self {
            danceability,
            energy,
            valence,
            acousticness,
            instrumentalness,
            speechiness,
            liveness,
            loudness,
            tempo,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values().iter().all(Option::is_none)
    }
}

/// Quantiles d'une caractéristique audio (interpolation linéaire)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct FeaturePercentiles {
    #[serde(rename = "25th")]
    pub p25: f64,
    #[serde(rename = "50th")]
    pub p50: f64,
    #[serde(rename = "75th")]
    pub p75: f64,
    #[serde(rename = "90th")]
    pub p90: f64,
}

/// Palier de popularité
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub enum PopularityTier {
    Hot,
    Trending,
    Rising,
    Emerging,
}

impl PopularityTier {
    pub fn from_popularity(popularity: u8) -> Self {
        match popularity {
            80.. => PopularityTier::Hot,
            60..=79 => PopularityTier::Trending,
            40..=59 => PopularityTier::Rising,
            _ => PopularityTier::Emerging,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PopularityTier::Hot => "Hot",
            PopularityTier::Trending => "Trending",
            PopularityTier::Rising => "Rising",
            PopularityTier::Emerging => "Emerging",
        }
    }
}

impl fmt::Display for PopularityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enregistrement brut tel que renvoyé par un fetcher
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrack {
    pub track_id: Option<String>,
    pub track_name: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub popularity: Option<i64>,
    pub duration_ms: Option<u64>,
    pub explicit: Option<bool>,
    pub spotify_url: Option<String>,
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
    pub release_date: Option<String>,
    pub playlist_name: Option<String>,
    pub playlist_id: Option<String>,
    pub data_source: DataSource,
    pub audio_features: Option<AudioFeatures>,
}

/// Piste validée
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct Track {
    pub track_id: String,
    pub track_name: String,
    pub artist: String,
    pub album: String,
    pub popularity: u8,
    pub duration_ms: u64,
    /// Durée au format `M:SS`
    pub duration: String,
    pub explicit: bool,
    pub spotify_url: Option<String>,
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    /// Nom de la playlist (ou recherche) d'où provient la piste
    pub playlist_source: String,
    pub playlist_id: Option<String>,
    pub data_source: DataSource,
    pub fetched_at: DateTime<Utc>,
    pub popularity_tier: PopularityTier,
    pub trend_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_features: Option<AudioFeatures>,
}

/// Nombre de pistes d'un artiste
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct ArtistCount {
    pub artist: String,
    pub track_count: usize,
}

/// Statistiques calculées sur un jeu de pistes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct Analytics {
    pub timestamp: DateTime<Utc>,
    pub total_tracks: usize,
    pub unique_artists: usize,
    pub unique_albums: usize,
    pub avg_popularity: f64,
    pub median_popularity: f64,
    pub max_popularity: u8,
    pub min_popularity: u8,
    pub top_track: Option<String>,
    pub top_artist: Option<String>,
    /// Dix artistes les plus représentés
    pub top_artists: Vec<ArtistCount>,
    /// Répartition par playlist source
    pub data_sources: BTreeMap<String, usize>,
    pub release_year_distribution: BTreeMap<i32, usize>,
    pub popularity_tiers: BTreeMap<String, usize>,
    pub avg_trend_score: f64,
    pub explicit_tracks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_features_avg: Option<AudioFeatures>,
    /// Quantiles par caractéristique audio présente
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub audio_feature_percentiles: BTreeMap<String, FeaturePercentiles>,
}

/// Jeu de pistes transformé et ses statistiques
#[derive(Debug, Clone)]
pub struct Dataset {
    pub tracks: Vec<Track>,
    pub analytics: Analytics,
}
