//! Dashboard endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use service_core::error::AppError;

use crate::dtos::DashboardResponse;
use crate::models::MetricKind;
use crate::services::DashboardSnapshot;
use crate::startup::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    /// Slug or display name; blank means the default metric.
    pub metric: Option<String>,
    #[serde(default)]
    pub dark_mode: bool,
}

impl DashboardParams {
    fn requested_metric(&self) -> Result<Option<MetricKind>, AppError> {
        self.metric
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(str::parse::<MetricKind>)
            .transpose()
            .map_err(|e| AppError::BadRequest(e.into()))
    }
}

fn respond(
    state: &AppState,
    snapshot: &DashboardSnapshot,
    params: &DashboardParams,
    requested: Option<MetricKind>,
) -> Json<DashboardResponse> {
    let dashboard = &state.dashboard;
    Json(DashboardResponse::from_snapshot(
        snapshot,
        dashboard.visible_metrics(),
        dashboard.select(requested),
        params.dark_mode,
    ))
}

/// Current snapshot, without triggering a fetch.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardResponse>, AppError> {
    let requested = params.requested_metric()?;
    let snapshot = state.dashboard.snapshot().await;

    Ok(respond(&state, &snapshot, &params, requested))
}

/// Run a refresh and return the resulting snapshot.
///
/// The refresh runs on its own task so a client that disconnects mid-way
/// cannot leave the dashboard stuck in `loading`.
pub async fn refresh_dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardParams>,
) -> Result<Json<DashboardResponse>, AppError> {
    let requested = params.requested_metric()?;

    tracing::info!(metric = ?requested, "Dashboard refresh requested");

    let dashboard = state.dashboard.clone();
    let snapshot = tokio::spawn(async move { dashboard.refresh().await })
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("refresh task failed: {}", e)))?
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected overlapping dashboard refresh");
            AppError::Conflict(e.into())
        })?;

    Ok(respond(&state, &snapshot, &params, requested))
}
