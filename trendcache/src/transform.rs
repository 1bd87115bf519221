//! Transformation des enregistrements bruts en jeu de pistes
//!
//! Étapes : validation individuelle, dédoublonnage par identifiant (la
//! variante la plus populaire gagne), dédoublonnage approché optionnel,
//! tri par popularité décroissante puis calcul des statistiques.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::{debug, info, warn};
use trendconfig::Config;

use crate::analytics::compute_analytics;
use crate::error::{Result, TrendError};
use crate::helpers::{clean_artist_name, clean_track_name, extract_release_year, format_duration, trend_score};
use crate::models::{Dataset, PopularityTier, RawTrack, Track};

const UNKNOWN: &str = "Unknown";

/// Transforme les enregistrements bruts d'un fetcher
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer {
    fuzzy_dedup: bool,
}

impl Transformer {
    pub fn new(fuzzy_dedup: bool) -> Self {
        Self { fuzzy_dedup }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.get_fuzzy_dedup())
    }

    pub fn transform(&self, raws: Vec<RawTrack>) -> Result<Dataset> {
        self.transform_at(raws, Utc::now())
    }

    /// Comme [`transform`](Self::transform) avec une date de référence explicite
    pub fn transform_at(&self, raws: Vec<RawTrack>, now: DateTime<Utc>) -> Result<Dataset> {
        let raw_count = raws.len();

        let valid: Vec<Track> = raws
            .into_iter()
            .filter_map(|raw| match validate(raw, now) {
                Ok(track) => Some(track),
                Err(reason) => {
                    warn!("Skipping malformed track record: {}", reason);
                    None
                }
            })
            .collect();

        let mut tracks = dedup_by_id(valid);
        if self.fuzzy_dedup {
            tracks = dedup_fuzzy(tracks);
        }

        // Tri stable : l'ordre d'arrivée départage les ex aequo
        tracks.sort_by(|a, b| b.popularity.cmp(&a.popularity));

        if tracks.is_empty() {
            return Err(TrendError::EmptyDataset(raw_count));
        }

        info!(
            "Transformed {} raw records into {} unique tracks",
            raw_count,
            tracks.len()
        );

        let analytics = compute_analytics(&tracks, now);
        Ok(Dataset { tracks, analytics })
    }
}

/// Valide un enregistrement brut ; l'erreur décrit la raison du rejet
pub fn validate(raw: RawTrack, now: DateTime<Utc>) -> std::result::Result<Track, String> {
    let track_id = non_blank(raw.track_id).ok_or("missing track_id")?;
    let track_name = non_blank(raw.track_name)
        .ok_or_else(|| format!("track {} has no name", track_id))?;
    let popularity = match raw.popularity {
        Some(p) => u8::try_from(p)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| format!("track {} has popularity {} out of range", track_id, p))?,
        None => return Err(format!("track {} has no popularity", track_id)),
    };

    let artist = non_blank(raw.artist).unwrap_or_else(|| UNKNOWN.to_string());
    let album = non_blank(raw.album).unwrap_or_else(|| UNKNOWN.to_string());
    let release_date = non_blank(raw.release_date);
    let duration_ms = raw.duration_ms.unwrap_or(0);
    let today = now.date_naive();

    Ok(Track {
        release_year: release_date.as_deref().and_then(extract_release_year),
        trend_score: trend_score(popularity, release_date.as_deref(), today),
        popularity_tier: PopularityTier::from_popularity(popularity),
        duration: format_duration(duration_ms),
        playlist_source: non_blank(raw.playlist_name).unwrap_or_else(|| UNKNOWN.to_string()),
        track_id,
        track_name,
        artist,
        album,
        popularity,
        duration_ms,
        explicit: raw.explicit.unwrap_or(false),
        spotify_url: non_blank(raw.spotify_url),
        preview_url: non_blank(raw.preview_url),
        image_url: non_blank(raw.image_url),
        release_date,
        playlist_id: non_blank(raw.playlist_id),
        data_source: raw.data_source,
        fetched_at: now,
        audio_features: raw.audio_features,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Une piste par identifiant, la plus populaire ; l'ordre de première apparition est conservé
pub fn dedup_by_id(tracks: Vec<Track>) -> Vec<Track> {
    dedup_by_key(tracks, |t| t.track_id.clone())
}

/// Une piste par couple (titre nettoyé, artiste nettoyé), insensible à la casse
pub fn dedup_fuzzy(tracks: Vec<Track>) -> Vec<Track> {
    dedup_by_key(tracks, |t| {
        (
            clean_track_name(&t.track_name).to_lowercase(),
            clean_artist_name(&t.artist).to_lowercase(),
        )
    })
}

fn dedup_by_key<K, F>(tracks: Vec<Track>, key: F) -> Vec<Track>
where
    K: std::hash::Hash + Eq,
    F: Fn(&Track) -> K,
{
    let before = tracks.len();
    let mut unique: IndexMap<K, Track> = IndexMap::with_capacity(before);

    for track in tracks {
        match unique.entry(key(&track)) {
            Entry::Occupied(mut slot) => {
                if track.popularity > slot.get().popularity {
                    slot.insert(track);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(track);
            }
        }
    }

    if unique.len() != before {
        debug!("Deduplicated {} tracks to {}", before, unique.len());
    }
    unique.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataSource;

    fn raw(id: &str, name: &str, artist: &str, popularity: i64) -> RawTrack {
        RawTrack {
            track_id: Some(id.to_string()),
            track_name: Some(name.to_string()),
            artist: Some(artist.to_string()),
            album: Some("Album".to_string()),
            popularity: Some(popularity),
            duration_ms: Some(180_000),
            playlist_name: Some("Today's Top Hits".to_string()),
            data_source: DataSource::FeaturedPlaylist,
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicate_id_keeps_highest_popularity() {
        let dataset = Transformer::new(false)
            .transform(vec![raw("a", "Song", "X", 10), raw("a", "Song", "X", 90)])
            .unwrap();
        assert_eq!(dataset.tracks.len(), 1);
        assert_eq!(dataset.tracks[0].popularity, 90);
        assert_eq!(dataset.analytics.total_tracks, 1);
    }

    #[test]
    fn test_output_sorted_by_popularity() {
        let dataset = Transformer::new(false)
            .transform(vec![
                raw("a", "A", "X", 30),
                raw("b", "B", "Y", 70),
                raw("c", "C", "Z", 70),
                raw("d", "D", "W", 50),
            ])
            .unwrap();
        let ids: Vec<_> = dataset.tracks.iter().map(|t| t.track_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "d", "a"]);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let mut missing_pop = raw("b", "B", "Y", 0);
        missing_pop.popularity = None;
        let mut missing_name = raw("c", "", "Z", 40);
        missing_name.track_name = Some("   ".to_string());
        let no_id = RawTrack {
            track_name: Some("orphan".to_string()),
            popularity: Some(50),
            ..Default::default()
        };

        let dataset = Transformer::new(false)
            .transform(vec![
                raw("a", "A", "X", 30),
                missing_pop,
                missing_name,
                no_id,
                raw("d", "D", "W", 101),
            ])
            .unwrap();
        assert_eq!(dataset.tracks.len(), 1);
        assert_eq!(dataset.tracks[0].track_id, "a");
    }

    #[test]
    fn test_missing_artist_and_album_default_to_unknown() {
        let mut record = raw("a", "A", "X", 30);
        record.artist = None;
        record.album = Some(String::new());
        let track = validate(record, Utc::now()).unwrap();
        assert_eq!(track.artist, "Unknown");
        assert_eq!(track.album, "Unknown");
        assert_eq!(track.duration, "3:00");
    }

    #[test]
    fn test_empty_result_is_an_error() {
        let err = Transformer::new(false).transform(vec![]).unwrap_err();
        assert!(matches!(err, TrendError::EmptyDataset(0)));

        let mut bad = raw("a", "A", "X", 10);
        bad.popularity = None;
        let err = Transformer::new(false).transform(vec![bad]).unwrap_err();
        assert!(matches!(err, TrendError::EmptyDataset(1)));
    }

    #[test]
    fn test_fuzzy_dedup_merges_featuring_variants() {
        let records = vec![
            raw("a", "Song (feat. Guest)", "Artist", 40),
            raw("b", "Song", "artist", 75),
            raw("c", "Other", "Artist", 20),
        ];

        let plain = Transformer::new(false).transform(records.clone()).unwrap();
        assert_eq!(plain.tracks.len(), 3);

        let fuzzy = Transformer::new(true).transform(records).unwrap();
        assert_eq!(fuzzy.tracks.len(), 2);
        assert_eq!(fuzzy.tracks[0].track_id, "b");
    }
}
