//! Gestion des erreurs du cache de tendances

use std::time::Duration;
use thiserror::Error;

/// Type Result personnalisé pour trendcache
pub type Result<T> = std::result::Result<T, TrendError>;

/// Erreurs possibles du cache et de son rafraîchissement
#[derive(Error, Debug)]
pub enum TrendError {
    /// Aucune donnée disponible (premier rafraîchissement pas encore abouti)
    #[error("{0}")]
    Unavailable(String),

    /// Paramètres de requête invalides
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Échec de la récupération auprès du fournisseur
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// La transformation n'a produit aucune piste valide
    #[error("No valid track after transformation ({0} raw records)")]
    EmptyDataset(usize),

    /// Un rafraîchissement est déjà en cours
    #[error("A refresh is already in progress")]
    RefreshInProgress,

    /// Le rafraîchissement a dépassé son délai
    #[error("Refresh timed out after {0:?}")]
    RefreshTimeout(Duration),

    /// Erreur de configuration (anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl TrendError {
    /// Erreur 503 standard pour le jeu de pistes
    pub fn music_unavailable() -> Self {
        Self::Unavailable("Music data temporarily unavailable".to_string())
    }

    /// Erreur 503 standard pour les statistiques
    pub fn analytics_unavailable() -> Self {
        Self::Unavailable("Analytics temporarily unavailable".to_string())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, TrendError::Unavailable(_))
    }
}
