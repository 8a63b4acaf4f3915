//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the explorer client, endpoint registry and tracker from config
//! - Create the Axum router with the session API handlers
//! - Wire up middleware (request id, tracing, timeout)
//! - Swap in a rebuilt tracker when the config file changes
//! - Drop finished sessions once their retention period has passed
//! - Cancel every live session when the server stops

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    http::{HeaderName, Request},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::blockchain::client::ExplorerClient;
use crate::blockchain::registry::{EndpointRegistry, RegistryError};
use crate::blockchain::types::ExplorerError;
use crate::config::VerifierConfig;
use crate::http::handlers;
use crate::verification::{ConfirmationTracker, PollingPolicy, SessionStore};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Errors raised while building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to build explorer client: {0}")]
    Explorer(#[from] ExplorerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Current tracker; replaced wholesale on config reload.
    pub tracker: Arc<ArcSwap<ConfirmationTracker<ExplorerClient>>>,
    pub sessions: SessionStore,
}

/// Build a tracker (client, registry, global policy) from configuration.
pub fn build_tracker(
    config: &VerifierConfig,
) -> Result<ConfirmationTracker<ExplorerClient>, ServerError> {
    let client = ExplorerClient::new(&config.explorer)?;
    let registry = EndpointRegistry::from_config(&config.networks)?;
    let policy = PollingPolicy::from_config(&config.polling);

    tracing::info!(
        networks = ?registry.networks(),
        settle_delay_ms = policy.settle_delay.as_millis() as u64,
        poll_interval_ms = policy.poll_interval.as_millis() as u64,
        max_attempts = policy.max_attempts,
        "Tracker configured"
    );

    Ok(ConfirmationTracker::new(
        Arc::new(registry),
        Arc::new(client),
        policy,
    ))
}

/// HTTP server hosting verification sessions.
pub struct HttpServer {
    state: AppState,
    config: VerifierConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: VerifierConfig) -> Result<Self, ServerError> {
        let tracker = build_tracker(&config)?;
        let state = AppState {
            tracker: Arc::new(ArcSwap::from_pointee(tracker)),
            sessions: SessionStore::new(),
        };
        Ok(Self { state, config })
    }

    /// The Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let x_request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/v1/networks", get(handlers::list_networks))
            .route(
                "/api/v1/verifications",
                axum::routing::post(handlers::create_verification),
            )
            .route(
                "/api/v1/verifications/{id}",
                get(handlers::get_verification).delete(handlers::cancel_verification),
            )
            .with_state(self.state.clone())
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.listener.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get(X_REQUEST_ID)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "http",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
    }

    /// Live sessions hosted by this server.
    pub fn sessions(&self) -> &SessionStore {
        &self.state.sessions
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Configs received on `config_updates` rebuild the tracker; sessions
    /// already running keep the tracker they started with.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<VerifierConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let tracker = self.state.tracker.clone();
        let reloader = tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                match build_tracker(&new_config) {
                    Ok(rebuilt) => {
                        tracker.store(Arc::new(rebuilt));
                        tracing::info!("Configuration reloaded");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected reloaded configuration");
                    }
                }
            }
        });

        let sweeper = self.state.sessions.spawn_sweeper(Duration::from_secs(
            self.config.listener.session_retention_secs,
        ));

        let app = self.router();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        sweeper.abort();
        let cancelled = self.state.sessions.cancel_all();
        tracing::info!(cancelled_sessions = cancelled, "HTTP server stopped");
        Ok(())
    }
}
