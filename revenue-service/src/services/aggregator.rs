//! Per-window reduction of billing records into chart series.
//!
//! Sums stay in minor units until a point or total is emitted; conversion to
//! major units (and rounding) happens only at that boundary.

use crate::models::{
    Charge, ChargeStatus, DataPoint, MetricKind, MetricResult, Subscription, TimeWindow,
};
use crate::services::normalizer;
use crate::utils::{format_currency, minor_to_major};

/// A computed series before formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub points: Vec<DataPoint>,
    /// The metric's current total after each window, in minor units.
    /// Point-in-time for MRR, cumulative for revenue.
    pub totals: Vec<f64>,
}

impl SeriesSummary {
    /// Total after the last window (zero for an empty series).
    pub fn current_total(&self) -> f64 {
        self.totals.last().copied().unwrap_or(0.0)
    }

    pub fn into_result(self, kind: MetricKind) -> MetricResult {
        let current_value = format_currency(self.current_total());
        MetricResult {
            kind,
            series: self.points,
            current_value,
        }
    }
}

/// Monthly recurring revenue active in `window`, unrounded minor units.
pub fn window_mrr(window: &TimeWindow, subscriptions: &[Subscription]) -> f64 {
    subscriptions
        .iter()
        .map(|subscription| normalizer::normalize(subscription, window))
        .sum()
}

/// Only settled, unrefunded charges are revenue.
pub fn counts_as_revenue(charge: &Charge) -> bool {
    charge.status == ChargeStatus::Succeeded && !charge.refunded
}

pub fn window_revenue(charges: &[Charge]) -> i64 {
    charges
        .iter()
        .filter(|charge| counts_as_revenue(charge))
        .map(|charge| charge.amount)
        .sum()
}

/// MRR series: one point per window; the current total is the latest window's
/// sum on its own.
///
/// `pages[i]` holds the subscriptions returned for `windows[i]`.
pub fn summarize_mrr(windows: &[TimeWindow], pages: &[Vec<Subscription>]) -> SeriesSummary {
    let mut points = Vec::with_capacity(windows.len());
    let mut totals = Vec::with_capacity(windows.len());

    for (window, subscriptions) in windows.iter().zip(pages) {
        let mrr = window_mrr(window, subscriptions);
        points.push(DataPoint {
            label: window.label.clone(),
            value: minor_to_major(mrr),
        });
        totals.push(mrr);
    }

    SeriesSummary { points, totals }
}

/// Revenue series: one point per window; the current total is the running sum
/// across every window so far.
///
/// `pages[i]` holds the charges returned for `windows[i]`.
pub fn summarize_revenue(windows: &[TimeWindow], pages: &[Vec<Charge>]) -> SeriesSummary {
    let mut points = Vec::with_capacity(windows.len());
    let mut totals = Vec::with_capacity(windows.len());
    let mut running: i64 = 0;

    for (window, charges) in windows.iter().zip(pages) {
        let revenue = window_revenue(charges);
        running += revenue;
        points.push(DataPoint {
            label: window.label.clone(),
            value: minor_to_major(revenue as f64),
        });
        totals.push(running as f64);
    }

    SeriesSummary { points, totals }
}
