//! Authentification client-credentials auprès de Spotify

use super::SpotifyApi;
use crate::error::{Result, SpotifyError};
use crate::models::TokenResponse;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Marge avant expiration en deçà de laquelle le jeton est renouvelé
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Jeton d'accès et son instant d'expiration
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Instant,
}

impl AccessToken {
    pub fn new(value: String, expires_in: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + expires_in,
        }
    }

    /// Le jeton est utilisable s'il n'expire pas dans la minute
    pub fn is_valid(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

impl SpotifyApi {
    /// Obtient un nouveau jeton via le flux client-credentials
    ///
    /// `POST {accounts}/api/token` avec `grant_type=client_credentials` et
    /// les credentials en Basic auth. Le jeton est mémorisé.
    pub async fn authenticate(&self) -> Result<String> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(SpotifyError::Configuration(
                "Spotify client id/secret not configured".to_string(),
            ));
        }

        let url = format!("{}/api/token", self.accounts_base_url);
        debug!("Requesting client-credentials token from {}", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Spotify authentication failed ({}): {}", status, error_text);
            return Err(SpotifyError::Unauthorized(error_text));
        }

        let token: TokenResponse = response.json().await?;
        info!(
            "Spotify authenticated (token valid for {}s)",
            token.expires_in
        );

        let access = AccessToken::new(
            token.access_token.clone(),
            Duration::from_secs(token.expires_in),
        );
        *self.token.lock() = Some(access);
        Ok(token.access_token)
    }

    /// Retourne le jeton courant, en le renouvelant s'il est absent ou expiré
    pub(crate) async fn access_token(&self) -> Result<String> {
        let cached = self
            .token
            .lock()
            .as_ref()
            .filter(|t| t.is_valid())
            .map(|t| t.value.clone());

        match cached {
            Some(token) => Ok(token),
            None => self.authenticate().await,
        }
    }

    /// Oublie le jeton courant (le prochain appel se réauthentifie)
    pub fn invalidate_token(&self) {
        *self.token.lock() = None;
    }

    pub fn has_valid_token(&self) -> bool {
        self.token.lock().as_ref().is_some_and(|t| t.is_valid())
    }
}
