//! Configuration module for revenue-service.

use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

use crate::models::MetricKind;
use crate::services::ledger::{PageLimit, DEFAULT_MAX_CONCURRENT_REQUESTS};

#[derive(Debug, Clone)]
pub struct RevenueConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub stripe: StripeConfig,
    pub metrics: MetricToggles,
    pub refresh_on_startup: bool,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Restricted key with read access to subscriptions and charges.
    pub secret_key: Secret<String>,
    pub api_base_url: String,
    pub api_version: String,
    pub page_limit: PageLimit,
    /// Upper bound on list calls in flight across all metrics.
    pub max_concurrent_requests: usize,
    pub timeout: Duration,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            secret_key: Secret::new(String::new()),
            api_base_url: "https://api.stripe.com/v1".to_string(),
            api_version: "2025-12-15.clover".to_string(),
            page_limit: PageLimit::default(),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Which dashboard metrics are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricToggles {
    pub mrr: bool,
    pub total_revenue: bool,
    pub this_month: bool,
}

impl Default for MetricToggles {
    fn default() -> Self {
        Self {
            mrr: true,
            total_revenue: true,
            this_month: true,
        }
    }
}

impl MetricToggles {
    pub fn is_enabled(&self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Mrr => self.mrr,
            MetricKind::TotalRevenue => self.total_revenue,
            MetricKind::ThisMonth => self.this_month,
        }
    }

    /// Enabled metrics in display order.
    pub fn visible_metrics(&self) -> Vec<MetricKind> {
        MetricKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }
}

/// `true`, `1` and `yes` (any case) enable; any other value disables; unset
/// keeps `default`.
pub fn parse_toggle(value: Option<&str>, default: bool) -> bool {
    match value {
        Some(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes"
        ),
        None => default,
    }
}

/// Flag read from `key`; on when unset.
fn toggle_from_env(key: &str) -> bool {
    parse_toggle(env::var(key).ok().as_deref(), true)
}

impl RevenueConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let stripe_defaults = StripeConfig::default();

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "revenue-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            stripe: StripeConfig {
                secret_key: Secret::new(env::var("STRIPE_SECRET_KEY").unwrap_or_default()),
                api_base_url: env::var("STRIPE_API_BASE_URL")
                    .unwrap_or(stripe_defaults.api_base_url),
                api_version: env::var("STRIPE_API_VERSION")
                    .unwrap_or(stripe_defaults.api_version),
                page_limit: env::var("STRIPE_PAGE_LIMIT")
                    .ok()
                    .and_then(|s| s.parse::<u32>().ok())
                    .map(PageLimit::new)
                    .unwrap_or_default(),
                max_concurrent_requests: env::var("STRIPE_MAX_CONCURRENT_REQUESTS")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(stripe_defaults.max_concurrent_requests),
                timeout: env::var("STRIPE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(stripe_defaults.timeout),
            },
            metrics: MetricToggles {
                mrr: toggle_from_env("SHOW_MRR"),
                total_revenue: toggle_from_env("SHOW_TOTAL_REVENUE"),
                this_month: toggle_from_env("SHOW_THIS_MONTH"),
            },
            refresh_on_startup: toggle_from_env("REFRESH_ON_STARTUP"),
        })
    }
}
