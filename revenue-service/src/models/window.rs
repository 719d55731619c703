//! Calendar windows over which billing records are summed.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Size of the windows a metric is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Monthly,
    Daily,
}

/// One closed calendar interval `[start, end]` with its chart label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Month abbreviation (`Jan`) or day of month (`15`).
    pub label: String,
}

