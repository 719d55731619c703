//! Computes the three dashboard metrics against a ledger.

use chrono::{DateTime, TimeZone};
use futures::future::try_join_all;
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::instrument;

use crate::models::{MetricKind, MetricResult, MetricSet, TimeWindow};
use crate::services::aggregator::{summarize_mrr, summarize_revenue};
use crate::services::ledger::{
    ChargeQuery, LedgerError, LedgerQuery, PageLimit, SubscriptionQuery,
    DEFAULT_MAX_CONCURRENT_REQUESTS,
};
use crate::services::windows;

/// Owns the ledger handle every metric is computed from.
///
/// Clones share one request limiter, so the bound holds across every metric
/// of a refresh.
#[derive(Clone)]
pub struct MetricAssembler {
    ledger: Arc<dyn LedgerQuery>,
    page_limit: PageLimit,
    permits: Arc<Semaphore>,
}

impl MetricAssembler {
    pub fn new(ledger: Arc<dyn LedgerQuery>, page_limit: PageLimit) -> Self {
        Self {
            ledger,
            page_limit,
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_REQUESTS)),
        }
    }

    /// Cap ledger calls in flight at `limit` (at least one).
    pub fn with_max_concurrent_requests(mut self, limit: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    async fn permit(&self) -> Result<SemaphorePermit<'_>, LedgerError> {
        self.permits
            .acquire()
            .await
            .map_err(|_| LedgerError::LimiterClosed)
    }

    /// MRR over `windows`. Every window gets its own subscription query; the
    /// queries run concurrently up to the request limit and results are kept
    /// in window order.
    #[instrument(skip_all, fields(metric = "mrr", windows = windows.len()))]
    pub async fn mrr(&self, windows: &[TimeWindow]) -> Result<MetricResult, LedgerError> {
        let pages = try_join_all(windows.iter().map(|window| {
            let query = SubscriptionQuery::active_as_of(window, self.page_limit);
            async move {
                let _permit = self.permit().await?;
                self.ledger.list_subscriptions(&query).await
            }
        }))
        .await?;

        Ok(summarize_mrr(windows, &pages).into_result(MetricKind::Mrr))
    }

    /// Charge revenue over `windows`, reported as `kind`.
    #[instrument(skip_all, fields(metric = kind.slug(), windows = windows.len()))]
    pub async fn revenue(
        &self,
        kind: MetricKind,
        windows: &[TimeWindow],
    ) -> Result<MetricResult, LedgerError> {
        let pages = try_join_all(windows.iter().map(|window| {
            let query = ChargeQuery::for_window(window, self.page_limit);
            async move {
                let _permit = self.permit().await?;
                self.ledger.list_charges(&query).await
            }
        }))
        .await?;

        Ok(summarize_revenue(windows, &pages).into_result(kind))
    }

    /// One metric over the windows its granularity calls for, relative to `now`.
    pub async fn compute<Tz: TimeZone>(
        &self,
        kind: MetricKind,
        now: &DateTime<Tz>,
    ) -> Result<MetricResult, LedgerError> {
        let windows = windows::windows(kind.granularity(), now);
        match kind {
            MetricKind::Mrr => self.mrr(&windows).await,
            MetricKind::TotalRevenue | MetricKind::ThisMonth => {
                self.revenue(kind, &windows).await
            }
        }
    }

    /// All three metrics, computed concurrently. The first failure fails the
    /// whole set.
    pub async fn compute_all<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
    ) -> Result<MetricSet, LedgerError> {
        let (mrr, total_revenue, this_month) = tokio::try_join!(
            self.compute(MetricKind::Mrr, now),
            self.compute(MetricKind::TotalRevenue, now),
            self.compute(MetricKind::ThisMonth, now),
        )?;

        Ok([mrr, total_revenue, this_month]
            .into_iter()
            .map(|result| (result.kind, result))
            .collect())
    }
}
