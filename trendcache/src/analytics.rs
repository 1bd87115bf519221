//! Calcul des statistiques d'un jeu de pistes (fonctions pures)

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::models::{Analytics, ArtistCount, AudioFeatures, FeaturePercentiles, Track};

const TOP_ARTISTS: usize = 10;

/// Statistiques d'un jeu de pistes
///
/// `top_track` est la première piste de popularité maximale ; `top_artist`
/// l'artiste le plus représenté (la première apparition départage).
pub fn compute_analytics(tracks: &[Track], now: DateTime<Utc>) -> Analytics {
    let total = tracks.len();

    let mut popularities: Vec<u8> = tracks.iter().map(|t| t.popularity).collect();
    popularities.sort_unstable();

    let top_track = tracks
        .iter()
        .fold(None::<&Track>, |best, t| match best {
            Some(b) if b.popularity >= t.popularity => Some(b),
            _ => Some(t),
        })
        .map(|t| t.track_name.clone());

    let mut artist_counts: IndexMap<&str, usize> = IndexMap::new();
    for track in tracks {
        *artist_counts.entry(track.artist.as_str()).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = artist_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let unique_artists = ranked.len();
    let top_artist = ranked.first().map(|(a, _)| a.to_string());
    let top_artists = ranked
        .iter()
        .take(TOP_ARTISTS)
        .map(|(artist, count)| ArtistCount {
            artist: artist.to_string(),
            track_count: *count,
        })
        .collect();

    let unique_albums = tracks
        .iter()
        .map(|t| t.album.as_str())
        .collect::<HashSet<_>>()
        .len();

    let mut data_sources = BTreeMap::new();
    let mut release_year_distribution = BTreeMap::new();
    let mut popularity_tiers = BTreeMap::new();
    for track in tracks {
        *data_sources.entry(track.playlist_source.clone()).or_insert(0) += 1;
        if let Some(year) = track.release_year {
            *release_year_distribution.entry(year).or_insert(0) += 1;
        }
        *popularity_tiers
            .entry(track.popularity_tier.to_string())
            .or_insert(0) += 1;
    }

    let columns = feature_columns(tracks);

    Analytics {
        timestamp: now,
        total_tracks: total,
        unique_artists,
        unique_albums,
        avg_popularity: mean(tracks.iter().map(|t| f64::from(t.popularity))),
        median_popularity: median(&popularities),
        max_popularity: popularities.last().copied().unwrap_or(0),
        min_popularity: popularities.first().copied().unwrap_or(0),
        top_track,
        top_artist,
        top_artists,
        data_sources,
        release_year_distribution,
        popularity_tiers,
        avg_trend_score: mean(tracks.iter().map(|t| t.trend_score)),
        explicit_tracks: tracks.iter().filter(|t| t.explicit).count(),
        audio_features_avg: average_features(&columns),
        audio_feature_percentiles: feature_percentiles(&columns),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn median(sorted: &[u8]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => f64::from(sorted[n / 2]),
        n => (f64::from(sorted[n / 2 - 1]) + f64::from(sorted[n / 2])) / 2.0,
    }
}

/// Valeurs présentes de chaque caractéristique audio, dans l'ordre de [`AudioFeatures::NAMES`]
fn feature_columns(tracks: &[Track]) -> [Vec<f64>; 9] {
    let mut columns: [Vec<f64>; 9] = Default::default();
    for features in tracks.iter().filter_map(|t| t.audio_features.as_ref()) {
        for (column, value) in columns.iter_mut().zip(features.values()) {
            column.extend(value);
        }
    }
    columns
}

fn average_features(columns: &[Vec<f64>; 9]) -> Option<AudioFeatures> {
    let averages = columns
        .each_ref()
        .map(|column| (!column.is_empty()).then(|| mean(column.iter().copied())));
    let averages = AudioFeatures::from_values(averages);
    (!averages.is_empty()).then_some(averages)
}

fn feature_percentiles(columns: &[Vec<f64>; 9]) -> BTreeMap<String, FeaturePercentiles> {
    AudioFeatures::NAMES
        .iter()
        .zip(columns)
        .filter(|(_, column)| !column.is_empty())
        .map(|(name, column)| {
            let mut sorted = column.clone();
            sorted.sort_by(f64::total_cmp);
            let percentiles = FeaturePercentiles {
                p25: quantile(&sorted, 0.25),
                p50: quantile(&sorted, 0.50),
                p75: quantile(&sorted, 0.75),
                p90: quantile(&sorted, 0.90),
            };
            (name.to_string(), percentiles)
        })
        .collect()
}

/// Quantile `q` d'une série triée non vide, par interpolation linéaire
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataSource, PopularityTier};

    fn track(id: &str, artist: &str, popularity: u8, year: Option<i32>) -> Track {
        Track {
            track_id: id.to_string(),
            track_name: format!("Track {}", id),
            artist: artist.to_string(),
            album: format!("Album {}", artist),
            popularity,
            duration_ms: 200_000,
            duration: "3:20".to_string(),
            explicit: popularity > 50,
            spotify_url: None,
            preview_url: None,
            image_url: None,
            release_date: year.map(|y| y.to_string()),
            release_year: year,
            playlist_source: "Top 50".to_string(),
            playlist_id: None,
            data_source: DataSource::FeaturedPlaylist,
            fetched_at: Utc::now(),
            popularity_tier: PopularityTier::from_popularity(popularity),
            trend_score: f64::from(popularity),
            audio_features: None,
        }
    }

    #[test]
    fn test_summary_statistics() {
        let tracks = vec![
            track("1", "A", 90, Some(2024)),
            track("2", "B", 70, Some(2024)),
            track("3", "A", 40, Some(2023)),
            track("4", "C", 20, None),
        ];
        let a = compute_analytics(&tracks, Utc::now());

        assert_eq!(a.total_tracks, 4);
        assert_eq!(a.unique_artists, 3);
        assert_eq!(a.unique_albums, 3);
        assert_eq!(a.avg_popularity, 55.0);
        assert_eq!(a.median_popularity, 55.0);
        assert_eq!(a.max_popularity, 90);
        assert_eq!(a.min_popularity, 20);
        assert_eq!(a.top_track.as_deref(), Some("Track 1"));
        assert_eq!(a.top_artist.as_deref(), Some("A"));
        assert_eq!(a.top_artists[0], ArtistCount { artist: "A".into(), track_count: 2 });
        assert_eq!(a.release_year_distribution.get(&2024), Some(&2));
        assert_eq!(a.popularity_tiers.get("Hot"), Some(&1));
        assert_eq!(a.popularity_tiers.get("Emerging"), Some(&1));
        assert_eq!(a.data_sources.get("Top 50"), Some(&4));
        assert_eq!(a.explicit_tracks, 2);
        assert!(a.audio_features_avg.is_none());
    }

    #[test]
    fn test_top_artists_limited_to_ten() {
        let tracks: Vec<Track> = (0..15)
            .map(|i| track(&i.to_string(), &format!("Artist {}", i), 50, None))
            .collect();
        let a = compute_analytics(&tracks, Utc::now());
        assert_eq!(a.top_artists.len(), 10);
        assert_eq!(a.unique_artists, 15);
    }

    #[test]
    fn test_audio_feature_averages() {
        let mut first = track("1", "A", 50, None);
        first.audio_features = Some(AudioFeatures {
            energy: Some(0.4),
            tempo: Some(100.0),
            ..Default::default()
        });
        let mut second = track("2", "B", 50, None);
        second.audio_features = Some(AudioFeatures {
            energy: Some(0.8),
            tempo: Some(140.0),
            valence: Some(0.3),
            ..Default::default()
        });
        let third = track("3", "C", 50, None);

        let avg = compute_analytics(&[first, second, third], Utc::now())
            .audio_features_avg
            .unwrap();
        assert!((avg.energy.unwrap() - 0.6).abs() < 1e-9);
        assert!((avg.tempo.unwrap() - 120.0).abs() < 1e-9);
        // Valeur absente chez la première piste : moyenne sur la seule présente
        assert!((avg.valence.unwrap() - 0.3).abs() < 1e-9);
        assert!(avg.danceability.is_none());
    }

    #[test]
    fn test_audio_feature_percentiles() {
        let tracks: Vec<Track> = (0..5)
            .map(|i| {
                let mut t = track(&i.to_string(), &format!("Artist {}", i), 50, None);
                t.audio_features = Some(AudioFeatures {
                    energy: Some(f64::from(i) / 4.0),
                    ..Default::default()
                });
                t
            })
            .collect();

        let a = compute_analytics(&tracks, Utc::now());
        assert_eq!(a.audio_feature_percentiles.len(), 1);
        let energy = a.audio_feature_percentiles["energy"];
        assert!((energy.p25 - 0.25).abs() < 1e-9);
        assert!((energy.p50 - 0.5).abs() < 1e-9);
        assert!((energy.p75 - 0.75).abs() < 1e-9);
        assert!((energy.p90 - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_quantile_interpolates() {
        assert_eq!(quantile(&[7.0], 0.9), 7.0);
        assert!((quantile(&[1.0, 2.0], 0.25) - 1.25).abs() < 1e-9);
    }
}
