//! # trendcache - Cache des tendances musicales
//!
//! Cette crate contient le cœur du service : une entrée de cache unique,
//! rafraîchie en tâche de fond par un coordinateur qui garantit qu'un seul
//! rafraîchissement est en cours à la fois.
//!
//! ## Architecture
//!
//! - [`models`] : pistes brutes et validées, statistiques
//! - [`helpers`] : nettoyage des titres, dates, score de tendance, filtres
//! - [`transform`] : validation, dédoublonnage, tri
//! - [`analytics`] : statistiques d'un jeu de pistes
//! - [`store`] : entrée de cache et ticket de rafraîchissement
//! - [`refresh`] : coordinateur (déclenchement, délai, attente bornée)
//! - [`fetcher`] : trait [`TrackFetcher`] implémenté par les fournisseurs
//! - `api_rest` / `server_ext` : endpoints HTTP (feature `server`)
//!
//! ## Exemple
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trendcache::{CacheStore, RefreshCoordinator, RefreshSettings, Transformer};
//!
//! let coordinator = Arc::new(RefreshCoordinator::new(
//!     Arc::new(CacheStore::new()),
//!     fetcher,
//!     Transformer::new(false),
//!     RefreshSettings::default(),
//! ));
//!
//! let (snapshot, status) = coordinator.ensure_fresh(false).await?;
//! ```

pub mod analytics;
pub mod error;
pub mod fetcher;
pub mod helpers;
pub mod models;
pub mod refresh;
pub mod store;
pub mod transform;

#[cfg(feature = "server")]
pub mod api_rest;
#[cfg(feature = "server")]
pub mod server_ext;

pub use error::{Result, TrendError};
pub use fetcher::{FetcherHealth, TrackFetcher};
pub use models::{
    Analytics, AudioFeatures, DataSource, Dataset, FeaturePercentiles, PopularityTier, RawTrack, Track,
};
pub use refresh::{CacheStatus, RefreshCoordinator, RefreshSettings, RefreshStats, RefreshTrigger};
pub use store::{CacheSnapshot, CacheStore, RefreshTicket};
pub use transform::Transformer;

#[cfg(feature = "server")]
pub use api_rest::{ApiDoc, ApiLimits, TrendState};
#[cfg(feature = "server")]
pub use server_ext::TrendServerExt;
