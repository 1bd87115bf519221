//! Couche d'accès à l'API REST Spotify
//!
//! Ce module fournit une interface bas-niveau : une requête HTTP par appel,
//! sans retry ni cache (voir [`crate::client::SpotifyClient`]).

pub mod auth;
pub mod catalog;

use crate::error::{Result, SpotifyError};
use parking_lot::Mutex;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use auth::AccessToken;

/// URL de base de l'API Web Spotify
pub const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// URL de base du service d'authentification
pub const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

/// Client API bas-niveau pour communiquer avec Spotify
pub struct SpotifyApi {
    /// Client HTTP
    client: Client,
    client_id: String,
    client_secret: String,
    api_base_url: String,
    accounts_base_url: String,
    /// Jeton client-credentials courant
    token: Mutex<Option<AccessToken>>,
}

impl SpotifyApi {
    /// Crée une nouvelle instance de l'API
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("trendpipeline/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            api_base_url: API_BASE_URL.to_string(),
            accounts_base_url: ACCOUNTS_BASE_URL.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Remplace les URLs de base (serveur de test, proxy)
    pub fn with_base_urls(
        mut self,
        api_base_url: impl Into<String>,
        accounts_base_url: impl Into<String>,
    ) -> Self {
        self.api_base_url = api_base_url.into().trim_end_matches('/').to_string();
        self.accounts_base_url = accounts_base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Effectue une requête GET authentifiée à l'API
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.api_base_url, endpoint);

        debug!("GET {} with {} params", url, params.len());

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Traite la réponse HTTP
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        debug!("Response status: {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            warn!("Rate limited by Spotify (Retry-After: {:?})", retry_after);
            return Err(SpotifyError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("API error ({}): {}", status.as_u16(), error_text);
            if status == StatusCode::UNAUTHORIZED {
                self.invalidate_token();
            }
            return Err(SpotifyError::from_status_code(status.as_u16(), error_text));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            SpotifyError::JsonParse(e)
        })
    }
}
