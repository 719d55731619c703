//! Metric results handed to the presentation layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::window::Granularity;

/// The three dashboard metrics, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    #[serde(rename = "MRR")]
    Mrr,
    #[serde(rename = "Total Revenue")]
    TotalRevenue,
    #[serde(rename = "This Month")]
    ThisMonth,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [
        MetricKind::Mrr,
        MetricKind::TotalRevenue,
        MetricKind::ThisMonth,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            MetricKind::Mrr => "MRR",
            MetricKind::TotalRevenue => "Total Revenue",
            MetricKind::ThisMonth => "This Month",
        }
    }

    /// Identifier used in query strings and metric labels.
    pub fn slug(&self) -> &'static str {
        match self {
            MetricKind::Mrr => "mrr",
            MetricKind::TotalRevenue => "total_revenue",
            MetricKind::ThisMonth => "this_month",
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            MetricKind::Mrr | MetricKind::TotalRevenue => Granularity::Monthly,
            MetricKind::ThisMonth => Granularity::Daily,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metric '{0}' (expected one of: mrr, total_revenue, this_month)")]
pub struct UnknownMetric(pub String);

impl FromStr for MetricKind {
    type Err = UnknownMetric;

    /// Accepts the slug (`total_revenue`) or the display name (`Total Revenue`),
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        MetricKind::ALL
            .into_iter()
            .find(|kind| {
                kind.slug().eq_ignore_ascii_case(wanted)
                    || kind.display_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

/// One chart point: a window label and its value in whole major units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricResult {
    pub kind: MetricKind,
    /// Chronological, one point per window.
    pub series: Vec<DataPoint>,
    /// Formatted currency, e.g. `$24,500`.
    pub current_value: String,
}

/// One refresh worth of results, keyed by metric.
pub type MetricSet = BTreeMap<MetricKind, MetricResult>;
