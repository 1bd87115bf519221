use std::sync::Arc;

use trendcache::TrendServerExt;
use trendconfig::get_config;
use trendserver::{LoggingOptions, ServerBuilder};
use trendspotify::SpotifySource;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_config();

    // ========== PHASE 1 : Serveur et logs ==========

    let mut server = ServerBuilder::new_configured().build();
    server
        .init_logging(LoggingOptions::from_config(&config))
        .await;

    server
        .add_route("/info", || async {
            serde_json::json!({
                "name": "TrendPipeline",
                "version": env!("CARGO_PKG_VERSION"),
            })
        })
        .await;

    // ========== PHASE 2 : Source Spotify et cache ==========

    info!("🎵 Initializing Spotify source...");
    let source = Arc::new(SpotifySource::from_config_obj(&config)?);

    info!("📡 Registering trend API...");
    let coordinator = server.init_trend_api_configured(source).await?;

    if config.get_refresh_on_startup() {
        info!("Starting initial data refresh");
        coordinator.trigger_refresh_if_needed();
    }

    // ========== PHASE 3 : Démarrage du serveur ==========

    info!("🌐 Starting HTTP server...");
    server.start().await?;

    info!("✅ TrendPipeline is ready!");
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    Ok(())
}
