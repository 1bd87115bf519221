//! Point d'extension vers le fournisseur de catalogue

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::models::RawTrack;

/// État de santé d'un fetcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct FetcherHealth {
    pub name: String,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FetcherHealth {
    pub fn connected(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connected: true,
            detail: None,
        }
    }

    pub fn disconnected(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connected: false,
            detail: Some(detail.into()),
        }
    }
}

/// Source de pistes brutes utilisée par le coordinateur de rafraîchissement
///
/// Les enregistrements malformés peuvent être laissés tels quels : le
/// transformer les écarte un par un.
#[async_trait]
pub trait TrackFetcher: Send + Sync {
    /// Nom court du fournisseur (pour les logs et `/health`)
    fn name(&self) -> &str;

    /// Récupère un lot complet de pistes
    async fn fetch_tracks(&self) -> Result<Vec<RawTrack>>;

    /// Vérifie la connexion au fournisseur
    async fn health(&self) -> FetcherHealth {
        FetcherHealth::connected(self.name())
    }
}
