//! # trendspotify - Fournisseur Spotify du cache de tendances
//!
//! Cette crate interroge l'API Web Spotify (flux client-credentials) et
//! produit les pistes brutes consommées par `trendcache`.
//!
//! ## Architecture
//!
//! - [`api`] : accès bas-niveau (une requête HTTP par appel), authentification
//! - [`client`] : client haut-niveau avec retry ([`RetryPolicy`]) et cache
//! - [`cache`] : cache moka des listes de playlists et des recherches
//! - [`source`] : [`SpotifySource`], implémentation de `TrackFetcher`
//! - [`config_ext`] : paramètres `accounts.spotify.*` de `trendconfig`
//!
//! ## Exemple
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trendconfig::get_config;
//! use trendspotify::SpotifySource;
//!
//! let source = Arc::new(SpotifySource::from_config_obj(&get_config())?);
//! let raws = source.fetch_tracks().await?;
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod config_ext;
pub mod error;
pub mod models;
pub mod source;

pub use api::SpotifyApi;
pub use cache::SpotifyCache;
pub use client::{RetryPolicy, SpotifyClient};
pub use config_ext::SpotifyConfigExt;
pub use error::{Result, SpotifyError};
pub use models::{PlaylistRef, SpotifyTrack, TrackOrigin};
pub use source::{CollectSettings, FALLBACK_SEARCH_TERMS, SpotifySource};
