//! HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{DataPoint, MetricKind, MetricResult};
use crate::services::{DashboardError, DashboardSnapshot, RefreshStatus};

pub const NO_METRICS_ENABLED: &str = "No metrics enabled";

/// What the presentation layer renders: the selected metric's series and
/// headline value, plus every visible metric for the selector.
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub status: RefreshStatus,
    pub visible_metrics: Vec<MetricKind>,
    pub selected_metric: Option<MetricKind>,
    /// Theme hint, echoed unchanged.
    pub dark_mode: bool,
    pub current_value: Option<String>,
    pub series: Vec<DataPoint>,
    pub metrics: Vec<MetricResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
    pub error: Option<DashboardError>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl DashboardResponse {
    pub fn from_snapshot(
        snapshot: &DashboardSnapshot,
        visible: &[MetricKind],
        selected: Option<MetricKind>,
        dark_mode: bool,
    ) -> Self {
        let metrics: Vec<MetricResult> = snapshot
            .metrics
            .as_deref()
            .map(|set| {
                visible
                    .iter()
                    .filter_map(|kind| set.get(kind).cloned())
                    .collect()
            })
            .unwrap_or_default();

        let current = selected.and_then(|kind| metrics.iter().find(|m| m.kind == kind));

        Self {
            status: snapshot.status,
            visible_metrics: visible.to_vec(),
            selected_metric: selected,
            dark_mode,
            current_value: current.map(|m| m.current_value.clone()),
            series: current.map(|m| m.series.clone()).unwrap_or_default(),
            notice: visible.is_empty().then_some(NO_METRICS_ENABLED),
            error: snapshot.error.clone(),
            refreshed_at: snapshot.refreshed_at,
            metrics,
        }
    }
}
