//! HTTP API server

use super::rate_limit::RateLimiter;
use super::{handlers, AppState};
use crate::storage::libsql::LibsqlStorage;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server address
    pub addr: SocketAddr,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 8080).into(),
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server over the given storage backend
    pub fn new(config: ApiServerConfig, storage: Arc<LibsqlStorage>) -> Self {
        let state = AppState::new(storage, RateLimiter::default());
        Self { config, state }
    }

    /// Build router
    pub fn build_router(state: AppState) -> Router {
        Router::new()
            // Manager surface
            .route("/api/create-evaluation", post(handlers::create_evaluation))
            .route("/api/activate-evaluation", post(handlers::activate_evaluation))
            .route("/api/complete-evaluation", post(handlers::complete_evaluation))
            .route("/api/add-members", post(handlers::add_members))
            .route("/api/get-members", post(handlers::get_members))
            .route("/api/get-results", post(handlers::get_results))
            // Member surface
            .route("/api/login", post(handlers::login))
            .route("/api/submit-response", post(handlers::submit_response))
            .route("/api/update-last-access", post(handlers::update_last_access))
            // Health check
            .route("/health", get(handlers::health))
            // State
            .with_state(state)
            // Middleware
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Start serving
    pub async fn serve(self) -> anyhow::Result<()> {
        let router = Self::build_router(self.state);

        let listener = tokio::net::TcpListener::bind(self.config.addr).await?;
        info!("API server listening on http://{}", self.config.addr);

        // ConnectInfo feeds the login rate limiter with client addresses.
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::FieldKey;
    use crate::storage::libsql::{ConnectionMode, LibsqlStorage};

    #[tokio::test]
    async fn test_server_creation() {
        let storage = Arc::new(
            LibsqlStorage::connect(ConnectionMode::InMemory, FieldKey::derive("test key"))
                .await
                .unwrap(),
        );
        let server = ApiServer::new(ApiServerConfig::default(), storage);
        assert_eq!(server.config.addr.port(), 8080);

        // Router construction must not panic.
        let _router = ApiServer::build_router(server.state.clone());
    }
}
