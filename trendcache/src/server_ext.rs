//! Extension de trendserver::Server pour exposer le cache de tendances
//!
//! Ce module fournit un trait d'extension permettant de monter les endpoints
//! du cache sur un serveur sans que trendserver dépende de trendcache.

use std::sync::Arc;

use anyhow::Result;
use trendconfig::get_config;
use trendserver::Server;
use utoipa::OpenApi;

use crate::api_rest::{ApiDoc, ApiLimits, TrendState, create_router};
use crate::fetcher::TrackFetcher;
use crate::refresh::{RefreshCoordinator, RefreshSettings};
use crate::store::CacheStore;
use crate::transform::Transformer;

/// Trait d'extension pour ajouter l'API de tendances à un serveur
///
/// # Exemple
///
/// ```rust,ignore
/// use trendcache::TrendServerExt;
/// use trendserver::ServerBuilder;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut server = ServerBuilder::new_configured().build();
///     let coordinator = server.init_trend_api_configured(fetcher).await?;
///     coordinator.trigger_refresh_if_needed();
///     server.start().await?;
///     server.wait().await;
///     Ok(())
/// }
/// ```
pub trait TrendServerExt {
    /// Enregistre les routes HTTP pour un coordinateur existant
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /api/trends/` - Informations sur le service
    /// - `GET /api/trends/trending` - Pistes en tendance
    /// - `GET /api/trends/analytics` - Statistiques
    /// - `POST /api/trends/refresh` - Rafraîchissement en tâche de fond
    /// - `GET /api/trends/cache-status` - État du cache
    /// - `GET /api/trends/health` - Santé du service
    /// - `GET /swagger-ui/trends` - Documentation interactive
    async fn init_trend_api(
        &mut self,
        coordinator: Arc<RefreshCoordinator>,
        limits: ApiLimits,
    ) -> Result<()>;

    /// Construit cache, transformer et coordinateur depuis la configuration
    /// globale, puis enregistre les routes
    async fn init_trend_api_configured(
        &mut self,
        fetcher: Arc<dyn TrackFetcher>,
    ) -> Result<Arc<RefreshCoordinator>>;
}

impl TrendServerExt for Server {
    async fn init_trend_api(
        &mut self,
        coordinator: Arc<RefreshCoordinator>,
        limits: ApiLimits,
    ) -> Result<()> {
        let state = TrendState::new(coordinator, limits);
        self.add_openapi(create_router(state), ApiDoc::openapi(), "trends")
            .await;
        Ok(())
    }

    async fn init_trend_api_configured(
        &mut self,
        fetcher: Arc<dyn TrackFetcher>,
    ) -> Result<Arc<RefreshCoordinator>> {
        let config = get_config();

        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::new(CacheStore::new()),
            fetcher,
            Transformer::from_config(&config),
            RefreshSettings::from_config(&config),
        ));

        self.init_trend_api(coordinator.clone(), ApiLimits::from_config(&config))
            .await?;
        Ok(coordinator)
    }
}
