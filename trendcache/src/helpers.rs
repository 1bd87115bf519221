//! Fonctions utilitaires : nettoyage des titres, dates de sortie, score de tendance
//! et filtrage des pistes.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

use crate::models::Track;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref FEATURING: Regex =
        Regex::new(r"(?i)\s*\((?:feat\.|ft\.|featuring)[^)]*\)").expect("valid regex");
    static ref REMASTER: Regex =
        Regex::new(r"(?i)\s*- (?:\d{4} )?Remaster.*$").expect("valid regex");
    static ref YEAR: Regex = Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid regex");
}

/// Normalise un titre : espaces compactés, mentions `feat.` et `Remaster` retirées
pub fn clean_track_name(track_name: &str) -> String {
    let collapsed = WHITESPACE.replace_all(track_name.trim(), " ");
    if collapsed.is_empty() {
        return "Unknown Track".to_string();
    }
    let without_feat = FEATURING.replace_all(&collapsed, "");
    REMASTER.replace(&without_feat, "").trim().to_string()
}

/// Normalise un nom d'artiste (espaces compactés)
pub fn clean_artist_name(artist_name: &str) -> String {
    let collapsed = WHITESPACE.replace_all(artist_name.trim(), " ");
    if collapsed.is_empty() {
        "Unknown Artist".to_string()
    } else {
        collapsed.into_owned()
    }
}

/// Durée en millisecondes vers `M:SS`
pub fn format_duration(duration_ms: u64) -> String {
    let total_seconds = duration_ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Année de sortie à partir de `YYYY`, `YYYY-MM`, `YYYY-MM-DD` ou de toute
/// année 19xx/20xx présente dans la chaîne
pub fn extract_release_year(release_date: &str) -> Option<i32> {
    let release_date = release_date.trim();
    match release_date.len() {
        0 => None,
        4 | 7 | 10 => release_date.get(..4)?.parse().ok(),
        _ => YEAR.find(release_date)?.as_str().parse().ok(),
    }
}

/// Date de sortie précise au jour (`YYYY-MM-DD`) ou au mois (`YYYY-MM`, premier du mois)
pub fn parse_release_date(release_date: &str) -> Option<NaiveDate> {
    let release_date = release_date.trim();
    if release_date.len() >= 10 {
        NaiveDate::parse_from_str(release_date.get(..10)?, "%Y-%m-%d").ok()
    } else if release_date.len() == 7 {
        NaiveDate::parse_from_str(&format!("{}-01", release_date), "%Y-%m-%d").ok()
    } else {
        None
    }
}

/// Vrai si la sortie date de moins de `days_threshold` jours au `today` donné
pub fn is_recent_release(release_date: &str, days_threshold: i64, today: NaiveDate) -> bool {
    match parse_release_date(release_date) {
        Some(released) => (today - released).num_days() <= days_threshold,
        None => false,
    }
}

/// Score de tendance : popularité majorée pour les sorties récentes, plafonnée à 100
pub fn trend_score(popularity: u8, release_date: Option<&str>, today: NaiveDate) -> f64 {
    let base = f64::from(popularity);
    let boosted = match release_date {
        Some(date) if is_recent_release(date, 7, today) => base * 1.2,
        Some(date) if is_recent_release(date, 30, today) => base * 1.1,
        _ => base,
    };
    boosted.min(100.0)
}

/// Critères de filtrage des pistes servies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackFilter {
    pub min_popularity: u8,
    pub exclude_explicit: bool,
    pub max_age_days: Option<u32>,
}

impl TrackFilter {
    pub fn is_empty(&self) -> bool {
        self.min_popularity == 0 && !self.exclude_explicit && self.max_age_days.is_none()
    }

    pub fn matches(&self, track: &Track, today: NaiveDate) -> bool {
        if track.popularity < self.min_popularity {
            return false;
        }
        if self.exclude_explicit && track.explicit {
            return false;
        }
        if let Some(max_age) = self.max_age_days {
            // Sans date exploitable, la piste est écartée
            return track
                .release_date
                .as_deref()
                .is_some_and(|d| is_recent_release(d, i64::from(max_age), today));
        }
        true
    }

    pub fn apply<'a>(&self, tracks: &'a [Track], today: NaiveDate) -> Vec<&'a Track> {
        if self.is_empty() {
            return tracks.iter().collect();
        }
        tracks.iter().filter(|t| self.matches(t, today)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_clean_track_name() {
        assert_eq!(clean_track_name("  Song   Title  "), "Song Title");
        assert_eq!(clean_track_name("Song (feat. Someone)"), "Song");
        assert_eq!(clean_track_name("Song (FT. Someone)"), "Song");
        assert_eq!(clean_track_name("Song (featuring A & B)"), "Song");
        assert_eq!(clean_track_name("Song - Remastered 2011"), "Song");
        assert_eq!(clean_track_name("Song - 2011 Remaster"), "Song");
        assert_eq!(clean_track_name(""), "Unknown Track");
    }

    #[test]
    fn test_clean_artist_name() {
        assert_eq!(clean_artist_name(" The   Band "), "The Band");
        assert_eq!(clean_artist_name("   "), "Unknown Artist");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(999), "0:00");
        assert_eq!(format_duration(61_000), "1:01");
        assert_eq!(format_duration(215_500), "3:35");
    }

    #[test]
    fn test_extract_release_year() {
        assert_eq!(extract_release_year("2024"), Some(2024));
        assert_eq!(extract_release_year("2023-06"), Some(2023));
        assert_eq!(extract_release_year("1999-12-31"), Some(1999));
        assert_eq!(extract_release_year("released in 1987 (vinyl)"), Some(1987));
        assert_eq!(extract_release_year("abcd"), None);
        assert_eq!(extract_release_year(""), None);
    }

    #[test]
    fn test_recent_release() {
        let today = day("2025-03-31");
        assert!(is_recent_release("2025-03-25", 7, today));
        assert!(!is_recent_release("2025-03-01", 7, today));
        assert!(is_recent_release("2025-03", 30, today));
        assert!(!is_recent_release("2025", 30, today));
        assert!(!is_recent_release("garbage", 30, today));
    }

    #[test]
    fn test_trend_score() {
        let today = day("2025-03-31");
        assert!((trend_score(50, Some("2025-03-28"), today) - 60.0).abs() < 1e-9);
        assert!((trend_score(50, Some("2025-03-10"), today) - 55.0).abs() < 1e-9);
        assert_eq!(trend_score(50, Some("2020-01-01"), today), 50.0);
        assert_eq!(trend_score(90, Some("2025-03-30"), today), 100.0);
        assert_eq!(trend_score(42, None, today), 42.0);
    }

    fn track(id: &str, popularity: i64, explicit: bool, released: &str) -> Track {
        let raw = crate::models::RawTrack {
            track_id: Some(id.to_string()),
            track_name: Some(format!("Song {}", id)),
            popularity: Some(popularity),
            explicit: Some(explicit),
            release_date: Some(released.to_string()),
            ..Default::default()
        };
        crate::transform::validate(raw, chrono::Utc::now()).unwrap()
    }

    #[test]
    fn test_track_filter() {
        let today = day("2025-03-31");
        let tracks = vec![
            track("a", 90, true, "2025-03-20"),
            track("b", 70, false, "2024-01-01"),
            track("c", 30, false, "2025-03-30"),
        ];

        let none = TrackFilter::default();
        assert!(none.is_empty());
        assert_eq!(none.apply(&tracks, today).len(), 3);

        let filter = TrackFilter {
            min_popularity: 50,
            exclude_explicit: true,
            max_age_days: None,
        };
        assert!(!filter.is_empty());
        let ids: Vec<_> = filter.apply(&tracks, today).iter().map(|t| t.track_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);

        let recent = TrackFilter {
            max_age_days: Some(30),
            ..TrackFilter::default()
        };
        let ids: Vec<_> = recent.apply(&tracks, today).iter().map(|t| t.track_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
