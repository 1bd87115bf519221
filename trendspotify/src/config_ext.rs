//! Extension pour intégrer la configuration Spotify dans trendconfig
//!
//! Ce module fournit le trait `SpotifyConfigExt` qui ajoute à
//! `trendconfig::Config` les credentials et paramètres de collecte Spotify
//! (section `accounts.spotify`).

use anyhow::{Result, anyhow};
use serde_yaml::Value;
use std::env;
use std::time::Duration;
use trendconfig::Config;

const ENV_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";

/// Trait d'extension pour gérer la configuration Spotify dans trendconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use trendconfig::get_config;
/// use trendspotify::SpotifyConfigExt;
///
/// let config = get_config();
/// let (client_id, _secret) = config.get_spotify_credentials()?;
/// println!("Spotify client: {}", client_id);
/// ```
pub trait SpotifyConfigExt {
    /// Récupère le client id Spotify
    ///
    /// Lu dans `accounts.spotify.client_id`, ou à défaut dans la variable
    /// d'environnement `SPOTIFY_CLIENT_ID`.
    ///
    /// # Errors
    ///
    /// Retourne une erreur si aucune des deux sources n'est renseignée
    fn get_spotify_client_id(&self) -> Result<String>;

    /// Définit le client id Spotify dans la configuration
    fn set_spotify_client_id(&self, client_id: &str) -> Result<()>;

    /// Récupère le client secret Spotify (repli sur `SPOTIFY_CLIENT_SECRET`)
    fn get_spotify_client_secret(&self) -> Result<String>;

    /// Définit le client secret Spotify dans la configuration
    fn set_spotify_client_secret(&self, client_secret: &str) -> Result<()>;

    /// Récupère le couple (client id, client secret)
    fn get_spotify_credentials(&self) -> Result<(String, String)>;

    /// Marché / pays des requêtes (`US` par défaut)
    fn get_spotify_market(&self) -> String;

    /// Nombre de playlists à parcourir
    fn get_spotify_num_playlists(&self) -> usize;

    /// Nombre de pistes lues par playlist
    fn get_spotify_tracks_per_playlist(&self) -> usize;

    fn get_spotify_include_audio_features(&self) -> bool;

    /// Nombre maximal de tentatives par requête
    fn get_spotify_max_retries(&self) -> u32;

    /// Pause avant chaque requête
    fn get_spotify_rate_limit_buffer(&self) -> Duration;

    /// Durée de vie du cache des réponses
    fn get_spotify_request_cache_ttl(&self) -> Duration;

    fn get_spotify_api_base_url(&self) -> String;

    fn get_spotify_accounts_base_url(&self) -> String;
}

fn spotify_path(key: &str) -> [&str; 3] {
    ["accounts", "spotify", key]
}

fn spotify_u64(config: &Config, key: &str, default: u64) -> u64 {
    match config.get_value(&spotify_path(key)) {
        Ok(Value::Number(n)) => n.as_u64().unwrap_or(default),
        Ok(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

fn credential(config: &Config, key: &str, env_var: &str) -> Result<String> {
    if let Some(value) = config.get_string(&spotify_path(key)) {
        return Ok(value);
    }
    match env::var(env_var) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(anyhow!(
            "Spotify {} not configured (accounts.spotify.{} or {})",
            key,
            key,
            env_var
        )),
    }
}

impl SpotifyConfigExt for Config {
    fn get_spotify_client_id(&self) -> Result<String> {
        credential(self, "client_id", ENV_CLIENT_ID)
    }

    fn set_spotify_client_id(&self, client_id: &str) -> Result<()> {
        self.set_value(
            &spotify_path("client_id"),
            Value::String(client_id.to_string()),
        )
    }

    fn get_spotify_client_secret(&self) -> Result<String> {
        credential(self, "client_secret", ENV_CLIENT_SECRET)
    }

    fn set_spotify_client_secret(&self, client_secret: &str) -> Result<()> {
        self.set_value(
            &spotify_path("client_secret"),
            Value::String(client_secret.to_string()),
        )
    }

    fn get_spotify_credentials(&self) -> Result<(String, String)> {
        let client_id = self.get_spotify_client_id()?;
        let client_secret = self.get_spotify_client_secret()?;
        Ok((client_id, client_secret))
    }

    fn get_spotify_market(&self) -> String {
        self.get_string(&spotify_path("market"))
            .unwrap_or_else(|| "US".to_string())
    }

    fn get_spotify_num_playlists(&self) -> usize {
        spotify_u64(self, "num_playlists", 5) as usize
    }

    fn get_spotify_tracks_per_playlist(&self) -> usize {
        spotify_u64(self, "tracks_per_playlist", 25) as usize
    }

    fn get_spotify_include_audio_features(&self) -> bool {
        match self.get_value(&spotify_path("include_audio_features")) {
            Ok(Value::Bool(b)) => b,
            _ => false,
        }
    }

    fn get_spotify_max_retries(&self) -> u32 {
        spotify_u64(self, "max_retries", 3).clamp(1, u32::MAX as u64) as u32
    }

    fn get_spotify_rate_limit_buffer(&self) -> Duration {
        Duration::from_millis(spotify_u64(self, "rate_limit_buffer_ms", 100))
    }

    fn get_spotify_request_cache_ttl(&self) -> Duration {
        Duration::from_secs(spotify_u64(self, "request_cache_seconds", 300))
    }

    fn get_spotify_api_base_url(&self) -> String {
        self.get_string(&spotify_path("api_base_url"))
            .unwrap_or_else(|| crate::api::API_BASE_URL.to_string())
    }

    fn get_spotify_accounts_base_url(&self) -> String {
        self.get_string(&spotify_path("accounts_base_url"))
            .unwrap_or_else(|| crate::api::ACCOUNTS_BASE_URL.to_string())
    }
}
