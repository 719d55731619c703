//! Billing records as returned by the ledger.
//!
//! Amounts are integer minor currency units (cents). These are the provider's
//! current view of each record, not historical snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Billing interval of a subscription line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurringInterval {
    Month,
    Year,
    /// Day, week, or no recurring price at all.
    Other,
}

impl RecurringInterval {
    pub fn from_string(s: &str) -> Self {
        match s {
            "month" => RecurringInterval::Month,
            "year" => RecurringInterval::Year,
            _ => RecurringInterval::Other,
        }
    }
}

/// Subscription status used as a list filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Succeeded,
    Pending,
    Failed,
    Other,
}

impl ChargeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeStatus::Succeeded => "succeeded",
            ChargeStatus::Pending => "pending",
            ChargeStatus::Failed => "failed",
            ChargeStatus::Other => "other",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "succeeded" => ChargeStatus::Succeeded,
            "pending" => ChargeStatus::Pending,
            "failed" => ChargeStatus::Failed,
            _ => ChargeStatus::Other,
        }
    }
}

/// One priced line of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub unit_amount: i64,
    /// Always at least 1.
    pub quantity: u64,
    pub interval: RecurringInterval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub amount: i64,
    pub status: ChargeStatus,
    pub refunded: bool,
}
