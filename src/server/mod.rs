//! HTTP surface: shared state, router and listener.
//!
//! The two generation endpoints and the catalogue require an `Authorization`
//! header, which is forwarded untouched to the store. `/health` is open. CORS
//! is fully open and answers preflight requests before routing.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::Request,
    http::header,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::clients::{GeminiClient, TextGenerator};
use crate::config::Config;
use crate::error::{Result, VsmeError};
use crate::store::{DisclosureStore, RestStore};

pub mod handlers;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub store: Option<Arc<dyn DisclosureStore>>,
}

impl AppState {
    pub fn new(
        config: Config,
        generator: Option<Arc<dyn TextGenerator>>,
        store: Option<Arc<dyn DisclosureStore>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            generator,
            store,
        }
    }

    /// Wire the Gemini client and REST store from configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let generator: Option<Arc<dyn TextGenerator>> =
            match GeminiClient::from_config(&config.model, config.runtime.gemini_api_key.as_deref())? {
                Some(client) => Some(Arc::new(client)),
                None => {
                    tracing::warn!(
                        "GEMINI_API_KEY is not set; disclosure generation will fail with 400"
                    );
                    None
                }
            };

        let store: Option<Arc<dyn DisclosureStore>> = match config.store.url.as_deref() {
            Some(url) => Some(Arc::new(RestStore::new(&config.store, url)?)),
            None => {
                tracing::info!("No store URL configured; generated responses are not persisted");
                None
            }
        };

        Ok(Self::new(config, generator, store))
    }

    pub fn generator(&self) -> Option<&dyn TextGenerator> {
        self.generator.as_deref()
    }
}

/// Raw `Authorization` value of the current request
#[derive(Debug, Clone)]
pub struct ForwardedAuth(pub String);

async fn require_authorization(mut req: Request, next: Next) -> Response {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    match value {
        Some(value) => {
            req.extensions_mut().insert(ForwardedAuth(value));
            next.run(req).await
        }
        None => VsmeError::Unauthorized.into_response(),
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    "ok"
}

pub fn build_router(state: AppState) -> Router {
    let timeout = Duration::from_millis(state.config.server.request_timeout_ms);

    let api = Router::new()
        .route(
            "/generate-disclosure-response",
            post(handlers::generate_disclosure_response),
        )
        .route(
            "/generate-graphics-recommendations",
            post(handlers::generate_graphics_recommendations),
        )
        .route("/disclosures", get(handlers::list_disclosures))
        .route_layer(middleware::from_fn(require_authorization));

    Router::new()
        .merge(api)
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Start the HTTP server
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let bind = state.config.server.bind.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener on {}: {}", bind, e))?;

    tracing::info!("Starting HTTP server on {}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
