//! Application startup and lifecycle management.

use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::RevenueConfig;
use crate::handlers;
use crate::services::{Dashboard, LedgerQuery, MetricAssembler, StripeClient};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: RevenueConfig,
    pub dashboard: Arc<Dashboard>,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application against the Stripe API.
    pub async fn build(config: RevenueConfig) -> Result<Self, AppError> {
        let stripe = StripeClient::new(config.stripe.clone()).map_err(|e| {
            tracing::error!(error = %e, "Failed to create Stripe client");
            AppError::InternalError(anyhow::anyhow!("Failed to create Stripe client: {}", e))
        })?;

        if stripe.is_configured() {
            tracing::info!(
                api_base_url = %config.stripe.api_base_url,
                api_version = %config.stripe.api_version,
                "Stripe client initialized"
            );
        } else {
            tracing::warn!(
                "STRIPE_SECRET_KEY not configured - refreshes will report a configuration error"
            );
        }

        Self::build_with_ledger(config, Arc::new(stripe)).await
    }

    /// Build the application against any ledger implementation.
    pub async fn build_with_ledger(
        config: RevenueConfig,
        ledger: Arc<dyn LedgerQuery>,
    ) -> Result<Self, AppError> {
        let assembler = MetricAssembler::new(ledger, config.stripe.page_limit)
            .with_max_concurrent_requests(config.stripe.max_concurrent_requests);
        let dashboard = Arc::new(Dashboard::new(assembler, &config.metrics));

        tracing::info!(
            visible_metrics = ?dashboard.visible_metrics(),
            page_limit = config.stripe.page_limit.get(),
            max_concurrent_requests = config.stripe.max_concurrent_requests,
            "Dashboard configured"
        );

        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Revenue service listener bound");

        Ok(Self {
            port,
            listener,
            state: AppState { config, dashboard },
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        if self.state.config.refresh_on_startup {
            let dashboard = self.state.dashboard.clone();
            tokio::spawn(async move {
                if let Err(e) = dashboard.refresh().await {
                    tracing::warn!(error = %e, "Initial dashboard refresh skipped");
                }
            });
        }

        let router = router(self.state);

        tracing::info!(port = self.port, "Listening");
        axum::serve(self.listener, router).await
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route(
            "/dashboard/refresh",
            post(handlers::dashboard::refresh_dashboard),
        )
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}
