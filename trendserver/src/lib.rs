//! # trendserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit une abstraction simple pour exposer les API HTTP du
//! service de tendances musicales.
//!
//! ## Fonctionnalités
//!
//! - **API de haut niveau** : routes JSON, handlers avec état, sous-routers
//! - **Documentation OpenAPI** : Swagger UI par API (`/swagger-ui/{name}`)
//! - **CORS** : origines autorisées issues de la configuration
//! - **Logs** : buffer circulaire, flux SSE et niveau modifiable à chaud
//! - **Arrêt gracieux** : sur Ctrl+C
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use trendserver::{ServerBuilder, logs::LoggingOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new("TrendAPI", "localhost", 8000).build();
//!     server.init_logging(LoggingOptions::default()).await;
//!
//!     server.add_route("/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LogState, LoggingOptions, SseLayer, log_dump, log_sse};
pub use server::{Server, ServerBuilder, ServerInfo};
