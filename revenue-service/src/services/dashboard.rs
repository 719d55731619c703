//! Refresh state shared with the presentation layer.
//!
//! `idle -> loading -> success | failed`. A refresh may start from any state
//! except `loading`. The latest successful metric set survives a failed
//! refresh; the error is recorded next to it.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use thiserror::Error;

use crate::config::MetricToggles;
use crate::models::{MetricKind, MetricSet};
use crate::services::assembler::MetricAssembler;
use crate::services::ledger::LedgerError;
use crate::services::metrics::record_refresh;

pub const CREDENTIAL_HINT: &str =
    "Make sure your Stripe API key is configured correctly in the environment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardErrorKind {
    /// Credential missing or rejected.
    Configuration,
    /// Anything else the provider or the network did.
    Provider,
}

/// The single error shown for the whole dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardError {
    pub kind: DashboardErrorKind,
    pub message: String,
    pub hint: &'static str,
}

impl From<&LedgerError> for DashboardError {
    fn from(err: &LedgerError) -> Self {
        let kind = if err.is_configuration() {
            DashboardErrorKind::Configuration
        } else {
            DashboardErrorKind::Provider
        };

        Self {
            kind,
            message: err.to_string(),
            hint: CREDENTIAL_HINT,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub status: RefreshStatus,
    /// Latest successful result set.
    pub metrics: Option<Arc<MetricSet>>,
    /// Error of the latest refresh, if it failed.
    pub error: Option<DashboardError>,
    /// `now` of the latest successful refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("a refresh is already in progress")]
    InProgress,
}

/// The lock is never held across an await point.
pub struct Dashboard {
    assembler: MetricAssembler,
    visible: Vec<MetricKind>,
    state: Mutex<DashboardSnapshot>,
}

/// Restores the previous status if a refresh ends without publishing, e.g.
/// when its future is dropped mid-flight.
struct LoadingGuard<'a> {
    dashboard: &'a Dashboard,
    previous: RefreshStatus,
    published: bool,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.published {
            return;
        }
        let mut state = self.dashboard.lock_state();
        if state.status == RefreshStatus::Loading {
            tracing::warn!(
                restored = ?self.previous,
                "Dashboard refresh abandoned before completing"
            );
            state.status = self.previous;
        }
    }
}

impl Dashboard {
    pub fn new(assembler: MetricAssembler, toggles: &MetricToggles) -> Self {
        Self {
            assembler,
            visible: toggles.visible_metrics(),
            state: Mutex::new(DashboardSnapshot::default()),
        }
    }

    /// Enabled metrics in display order.
    pub fn visible_metrics(&self) -> &[MetricKind] {
        &self.visible
    }

    pub fn default_metric(&self) -> Option<MetricKind> {
        self.visible.first().copied()
    }

    /// The requested metric when it is visible, otherwise the default.
    pub fn select(&self, requested: Option<MetricKind>) -> Option<MetricKind> {
        requested
            .filter(|kind| self.visible.contains(kind))
            .or_else(|| self.default_metric())
    }

    fn lock_state(&self) -> MutexGuard<'_, DashboardSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        self.lock_state().clone()
    }

    pub async fn refresh(&self) -> Result<DashboardSnapshot, RefreshError> {
        let now = Local::now();
        self.refresh_at(&now).await
    }

    /// Recompute every metric relative to `now` and publish the outcome.
    ///
    /// With no visible metric nothing is fetched and the state is returned
    /// unchanged.
    pub async fn refresh_at<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Result<DashboardSnapshot, RefreshError> {
        if self.visible.is_empty() {
            tracing::info!("No metrics enabled, skipping refresh");
            return Ok(self.snapshot().await);
        }

        let mut guard = {
            let mut state = self.lock_state();
            if state.status == RefreshStatus::Loading {
                return Err(RefreshError::InProgress);
            }
            let previous = std::mem::replace(&mut state.status, RefreshStatus::Loading);
            LoadingGuard {
                dashboard: self,
                previous,
                published: false,
            }
        };

        let started = Instant::now();
        let outcome = self.assembler.compute_all(now).await;
        let elapsed = started.elapsed().as_secs_f64();

        let mut state = self.lock_state();
        guard.published = true;
        match outcome {
            Ok(metrics) => {
                tracing::info!(
                    elapsed_secs = elapsed,
                    metrics = metrics.len(),
                    "Dashboard refreshed"
                );
                record_refresh("success", elapsed);
                state.status = RefreshStatus::Success;
                state.metrics = Some(Arc::new(metrics));
                state.error = None;
                state.refreshed_at = Some(now.with_timezone(&Utc));
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    configuration = e.is_configuration(),
                    elapsed_secs = elapsed,
                    "Dashboard refresh failed"
                );
                let outcome = if e.is_configuration() {
                    "configuration_error"
                } else {
                    "provider_error"
                };
                record_refresh(outcome, elapsed);
                state.status = RefreshStatus::Failed;
                state.error = Some(DashboardError::from(&e));
            }
        }

        Ok(state.clone())
    }
}
