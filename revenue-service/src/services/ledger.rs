//! Read-only query contract over the billing provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Charge, Subscription, SubscriptionStatus, TimeWindow};

/// Provider ceiling for one list page.
pub const MAX_PAGE_LIMIT: u8 = 100;

/// Provider list calls allowed in flight at once during a refresh.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Page size sent with every list call, always within `1..=MAX_PAGE_LIMIT`.
///
/// Only the first page is ever requested, so this is also the cap on records
/// seen per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimit(u8);

impl PageLimit {
    pub fn new(limit: u32) -> Self {
        Self(limit.clamp(1, MAX_PAGE_LIMIT as u32) as u8)
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        Self(MAX_PAGE_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionQuery {
    pub created_lte: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub limit: PageLimit,
}

impl SubscriptionQuery {
    /// Active subscriptions created on or before the end of `window`.
    pub fn active_as_of(window: &TimeWindow, limit: PageLimit) -> Self {
        Self {
            created_lte: window.end,
            status: SubscriptionStatus::Active,
            limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeQuery {
    pub created_gte: DateTime<Utc>,
    pub created_lte: DateTime<Utc>,
    pub limit: PageLimit,
}

impl ChargeQuery {
    /// Charges created inside the closed interval of `window`.
    pub fn for_window(window: &TimeWindow, limit: PageLimit) -> Self {
        Self {
            created_gte: window.start,
            created_lte: window.end,
            limit,
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Missing or rejected credential.
    #[error("{0}")]
    Configuration(String),

    #[error("provider returned {status}: {message}")]
    Provider {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("request to provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid provider response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("provider request limiter closed")]
    LimiterClosed,

    #[error("malformed {resource} record '{id}': {reason}")]
    MalformedRecord {
        resource: &'static str,
        id: String,
        reason: String,
    },
}

impl LedgerError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, LedgerError::Configuration(_))
    }
}

/// Source of subscriptions and charges. Implementations return the first page
/// only and never write.
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    async fn list_subscriptions(
        &self,
        query: &SubscriptionQuery,
    ) -> Result<Vec<Subscription>, LedgerError>;

    async fn list_charges(&self, query: &ChargeQuery) -> Result<Vec<Charge>, LedgerError>;
}
