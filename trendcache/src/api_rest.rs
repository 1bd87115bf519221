//! Endpoints API REST du service de tendances
//!
//! Ce module définit les handlers HTTP en lecture sur le cache. Ils ne
//! bloquent jamais sur le réseau, sauf pendant l'attente bornée des
//! premières données.
//!
//! ## Routes
//!
//! - `GET /` - Informations sur le service
//! - `GET /trending` - Pistes en tendance (paramètres : limit, force_refresh,
//!   min_popularity, exclude_explicit, max_age_days)
//! - `GET /analytics` - Statistiques du jeu courant
//! - `POST /refresh` - Déclenche un rafraîchissement en tâche de fond
//! - `GET /cache-status` - État du cache
//! - `GET /health` - Santé du service et du fournisseur

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use trendconfig::Config;

use crate::error::TrendError;
use crate::fetcher::FetcherHealth;
use crate::helpers::TrackFilter;
use crate::models::{
    Analytics, ArtistCount, AudioFeatures, DataSource, FeaturePercentiles, PopularityTier, Track,
};
use crate::refresh::{CacheStatus, RefreshCoordinator, RefreshStats};

const SERVICE_NAME: &str = "Music Trend API";
const SERVICE_FEATURES: [&str; 4] = ["caching", "real-time-updates", "background-refresh", "analytics"];

/// Bornes du paramètre `limit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiLimits {
    pub default_limit: usize,
    pub max_page_size: usize,
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_page_size: 50,
        }
    }
}

impl ApiLimits {
    pub fn from_config(config: &Config) -> Self {
        let max_page_size = config.get_api_max_page_size().max(1);
        Self {
            default_limit: config.get_api_default_limit().clamp(1, max_page_size),
            max_page_size,
        }
    }
}

/// État partagé de l'application
#[derive(Clone)]
pub struct TrendState {
    pub coordinator: Arc<RefreshCoordinator>,
    pub limits: ApiLimits,
}

impl TrendState {
    pub fn new(coordinator: Arc<RefreshCoordinator>, limits: ApiLimits) -> Self {
        Self { coordinator, limits }
    }
}

/// Paramètres de `/trending`
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TrendingParams {
    /// Nombre de pistes (défaut 20, plafonné à 50)
    pub limit: Option<usize>,
    /// Force un rafraîchissement en tâche de fond
    #[serde(default)]
    pub force_refresh: bool,
    /// Popularité minimale (0-100)
    pub min_popularity: Option<u32>,
    /// Exclut les pistes explicites
    #[serde(default)]
    pub exclude_explicit: bool,
    /// Âge maximal de la sortie, en jours
    pub max_age_days: Option<u32>,
}

/// Réponse de `/trending`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TrendingResponse {
    pub tracks: Vec<Track>,
    /// Nombre de pistes correspondant aux filtres
    pub total_available: usize,
    pub cache_status: CacheStatus,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Réponse de `/`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub features: Vec<String>,
    /// `active` ou `expired`
    pub cache_status: String,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Réponse de `POST /refresh`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RefreshResponse {
    pub message: String,
    pub status: String,
}

/// Réponse de `/cache-status`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CacheStatusResponse {
    pub cache_valid: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub is_updating: bool,
    pub has_data: bool,
    pub data_count: usize,
    pub cache_timeout_seconds: u64,
    pub generation: u64,
    pub refresh: RefreshStats,
}

/// Réponse de `/health`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// `healthy` ou `degraded`
    pub status: String,
    pub fetcher: FetcherHealth,
    pub has_data: bool,
    pub timestamp: DateTime<Utc>,
}

/// Corps d'erreur JSON
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Crée le router Axum avec tous les endpoints
pub fn create_router(state: TrendState) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/trending", get(trending))
        .route("/analytics", get(analytics))
        .route("/refresh", post(refresh))
        .route("/cache-status", get(cache_status))
        .route("/health", get(health))
        .with_state(state)
}

// ============ Handlers ============

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Informations sur le service", body = ServiceInfo)
    ),
    tag = "trends"
)]
async fn service_info(State(state): State<TrendState>) -> Json<ServiceInfo> {
    let snapshot = state.coordinator.store().snapshot();
    let active = snapshot.is_valid(state.coordinator.settings().cache_timeout);

    Json(ServiceInfo {
        message: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        features: SERVICE_FEATURES.iter().map(|f| f.to_string()).collect(),
        cache_status: if active { "active" } else { "expired" }.to_string(),
        last_updated: snapshot.last_updated(),
    })
}

#[utoipa::path(
    get,
    path = "/trending",
    params(TrendingParams),
    responses(
        (status = 200, description = "Pistes en tendance", body = TrendingResponse),
        (status = 400, description = "Paramètres invalides", body = ErrorResponse),
        (status = 503, description = "Données pas encore disponibles", body = ErrorResponse)
    ),
    tag = "trends"
)]
async fn trending(
    State(state): State<TrendState>,
    query: Result<Query<TrendingParams>, QueryRejection>,
) -> Result<Json<TrendingResponse>, AppError> {
    let Query(params) = query?;
    let limit = resolve_limit(params.limit, state.limits)?;
    let min_popularity = match params.min_popularity.unwrap_or(0) {
        p @ 0..=100 => p as u8,
        _ => {
            return Err(TrendError::InvalidRequest("min_popularity must be between 0 and 100".into()).into());
        }
    };

    let filter = TrackFilter {
        min_popularity,
        exclude_explicit: params.exclude_explicit,
        max_age_days: params.max_age_days,
    };

    let (snapshot, cache_status) = state.coordinator.ensure_fresh(params.force_refresh).await?;

    let matching = filter.apply(snapshot.tracks(), Utc::now().date_naive());
    debug!(
        "Serving {} of {} matching tracks ({:?})",
        limit.min(matching.len()),
        matching.len(),
        cache_status
    );

    Ok(Json(TrendingResponse {
        total_available: matching.len(),
        tracks: matching.into_iter().take(limit).cloned().collect(),
        cache_status,
        last_updated: snapshot.last_updated(),
    }))
}

fn resolve_limit(requested: Option<usize>, limits: ApiLimits) -> Result<usize, TrendError> {
    match requested {
        None => Ok(limits.default_limit),
        Some(0) => Err(TrendError::InvalidRequest("limit must be at least 1".into())),
        Some(n) => Ok(n.min(limits.max_page_size)),
    }
}

#[utoipa::path(
    get,
    path = "/analytics",
    responses(
        (status = 200, description = "Statistiques du jeu courant", body = Analytics),
        (status = 503, description = "Statistiques pas encore disponibles", body = ErrorResponse)
    ),
    tag = "trends"
)]
async fn analytics(State(state): State<TrendState>) -> Result<Json<Analytics>, AppError> {
    if !state.coordinator.is_valid() {
        state.coordinator.trigger_refresh_if_needed();
    }

    let snapshot = state.coordinator.store().snapshot();
    let analytics = snapshot
        .analytics()
        .cloned()
        .ok_or_else(TrendError::analytics_unavailable)?;
    Ok(Json(analytics))
}

#[utoipa::path(
    post,
    path = "/refresh",
    responses(
        (status = 200, description = "Rafraîchissement lancé", body = RefreshResponse)
    ),
    tag = "trends"
)]
async fn refresh(State(state): State<TrendState>) -> Json<RefreshResponse> {
    // Un rafraîchissement déjà en cours vaut acceptation
    state.coordinator.trigger_refresh_if_needed();
    Json(RefreshResponse {
        message: "Data refresh initiated".to_string(),
        status: "processing".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/cache-status",
    responses(
        (status = 200, description = "État du cache", body = CacheStatusResponse)
    ),
    tag = "trends"
)]
async fn cache_status(State(state): State<TrendState>) -> Json<CacheStatusResponse> {
    let coordinator = &state.coordinator;
    let snapshot = coordinator.store().snapshot();

    Json(CacheStatusResponse {
        cache_valid: snapshot.is_valid(coordinator.settings().cache_timeout),
        last_updated: snapshot.last_updated(),
        is_updating: coordinator.store().is_refreshing(),
        has_data: snapshot.has_data(),
        data_count: snapshot.len(),
        cache_timeout_seconds: coordinator.settings().cache_timeout.as_secs(),
        generation: snapshot.generation(),
        refresh: coordinator.stats(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Santé du service", body = HealthResponse)
    ),
    tag = "trends"
)]
async fn health(State(state): State<TrendState>) -> Json<HealthResponse> {
    let fetcher = state.coordinator.fetcher().health().await;
    let has_data = state.coordinator.store().snapshot().has_data();

    Json(HealthResponse {
        status: if fetcher.connected || has_data { "healthy" } else { "degraded" }.to_string(),
        fetcher,
        has_data,
        timestamp: Utc::now(),
    })
}

// ============ Gestion des erreurs ============

pub struct AppError(TrendError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            TrendError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            TrendError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<QueryRejection> for TrendError {
    fn from(rejection: QueryRejection) -> Self {
        TrendError::InvalidRequest(rejection.body_text())
    }
}

impl<E> From<E> for AppError
where
    E: Into<TrendError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// API OpenAPI du service de tendances
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(
        service_info,
        trending,
        analytics,
        refresh,
        cache_status,
        health,
    ),
    components(
        schemas(
            ServiceInfo,
            TrendingResponse,
            RefreshResponse,
            CacheStatusResponse,
            HealthResponse,
            ErrorResponse,
            Track,
            Analytics,
            ArtistCount,
            AudioFeatures,
            FeaturePercentiles,
            DataSource,
            PopularityTier,
            CacheStatus,
            RefreshStats,
            FetcherHealth,
        )
    ),
    tags(
        (name = "trends", description = "Pistes en tendance et état du cache")
    )
)]
pub struct ApiDoc;
