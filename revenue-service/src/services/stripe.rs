//! Stripe list API client.
//!
//! Reads subscriptions and charges with a restricted, read-only secret key and
//! converts the first page of each list into ledger records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::StripeConfig;
use crate::models::{Charge, ChargeStatus, LineItem, RecurringInterval, Subscription};
use crate::services::ledger::{ChargeQuery, LedgerError, LedgerQuery, SubscriptionQuery};
use crate::services::metrics::record_provider_request;

pub const STRIPE_VERSION_HEADER: &str = "Stripe-Version";

const SUBSCRIPTIONS: &str = "subscriptions";
const CHARGES: &str = "charges";

/// Stripe client bound to one configured credential.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

/// One page of a Stripe list endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct StripeList<T> {
    #[serde(default)]
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    #[serde(default)]
    pub id: String,
    /// Unix seconds.
    pub created: Option<i64>,
    pub canceled_at: Option<i64>,
    pub items: Option<StripeList<StripeSubscriptionItem>>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub quantity: Option<u64>,
    pub price: Option<StripePrice>,
}

#[derive(Debug, Deserialize)]
pub struct StripePrice {
    pub unit_amount: Option<i64>,
    pub recurring: Option<StripeRecurring>,
}

#[derive(Debug, Deserialize)]
pub struct StripeRecurring {
    pub interval: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCharge {
    #[serde(default)]
    pub id: String,
    pub created: Option<i64>,
    pub amount: Option<i64>,
    pub status: Option<String>,
    #[serde(default)]
    pub refunded: bool,
}

/// Stripe API error response.
#[derive(Debug, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorDetail {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

fn timestamp(resource: &'static str, id: &str, secs: i64) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| LedgerError::MalformedRecord {
        resource,
        id: id.to_string(),
        reason: format!("timestamp {} is out of range", secs),
    })
}

fn created_at(
    resource: &'static str,
    id: &str,
    created: Option<i64>,
) -> Result<DateTime<Utc>, LedgerError> {
    match created {
        Some(secs) => timestamp(resource, id, secs),
        None => Err(LedgerError::MalformedRecord {
            resource,
            id: id.to_string(),
            reason: "creation time is missing".to_string(),
        }),
    }
}

/// Network failure while sending a request or reading its body.
fn transport_failure(resource: &'static str, error: reqwest::Error) -> LedgerError {
    record_provider_request(resource, "transport_error");
    tracing::error!(resource, error = %error, "Stripe request failed");
    LedgerError::Transport(error)
}

/// Convert every record of a page, dropping the ones that cannot be placed in
/// time. A dropped record contributes nothing.
fn convert_page<S, T>(resource: &'static str, data: Vec<S>) -> Vec<T>
where
    T: TryFrom<S, Error = LedgerError>,
{
    data.into_iter()
        .filter_map(|raw| match T::try_from(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                record_provider_request(resource, "malformed_record");
                tracing::warn!(resource, error = %e, "Skipping malformed Stripe record");
                None
            }
        })
        .collect()
}

impl From<StripeSubscriptionItem> for LineItem {
    /// Missing quantity (or zero) counts as one; a missing price counts as a
    /// zero-amount item with no usable interval.
    fn from(item: StripeSubscriptionItem) -> Self {
        let quantity = item.quantity.filter(|q| *q > 0).unwrap_or(1);
        let (unit_amount, interval) = match item.price {
            Some(price) => (
                price.unit_amount.unwrap_or(0),
                price
                    .recurring
                    .and_then(|r| r.interval)
                    .map(|interval| RecurringInterval::from_string(&interval))
                    .unwrap_or(RecurringInterval::Other),
            ),
            None => (0, RecurringInterval::Other),
        };

        LineItem {
            unit_amount,
            quantity,
            interval,
        }
    }
}

impl TryFrom<StripeSubscription> for Subscription {
    type Error = LedgerError;

    fn try_from(sub: StripeSubscription) -> Result<Self, Self::Error> {
        let created_at = created_at(SUBSCRIPTIONS, &sub.id, sub.created)?;
        let canceled_at = sub
            .canceled_at
            .map(|secs| timestamp(SUBSCRIPTIONS, &sub.id, secs))
            .transpose()?;
        let items = sub
            .items
            .map(|list| list.data.into_iter().map(LineItem::from).collect())
            .unwrap_or_default();

        Ok(Subscription {
            id: sub.id,
            created_at,
            canceled_at,
            items,
        })
    }
}

impl TryFrom<StripeCharge> for Charge {
    type Error = LedgerError;

    /// A missing amount counts as zero and a missing status as unsettled.
    fn try_from(charge: StripeCharge) -> Result<Self, Self::Error> {
        Ok(Charge {
            created_at: created_at(CHARGES, &charge.id, charge.created)?,
            amount: charge.amount.unwrap_or(0),
            status: charge
                .status
                .as_deref()
                .map(ChargeStatus::from_string)
                .unwrap_or(ChargeStatus::Other),
            id: charge.id,
            refunded: charge.refunded,
        })
    }
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Result<Self, LedgerError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Check if a secret key is set. Whether Stripe accepts it is only known
    /// after the first request.
    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().trim().is_empty()
    }

    /// Fetch the first page of `resource` with the given query parameters.
    async fn list<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        params: &[(&str, String)],
    ) -> Result<StripeList<T>, LedgerError> {
        if !self.is_configured() {
            record_provider_request(resource, "unconfigured");
            return Err(LedgerError::Configuration(
                "Stripe secret key is not configured".to_string(),
            ));
        }

        let url = format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            resource
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .header(STRIPE_VERSION_HEADER, self.config.api_version.as_str())
            .query(params)
            .send()
            .await
            .map_err(|e| transport_failure(resource, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_failure(resource, e))?;

        tracing::debug!(resource, status = %status, "Stripe list response");

        if status.is_success() {
            let page: StripeList<T> = serde_json::from_str(&body).map_err(|e| {
                record_provider_request(resource, "decode_error");
                LedgerError::Decode(e)
            })?;
            record_provider_request(resource, "success");

            if page.has_more {
                tracing::warn!(
                    resource,
                    returned = page.data.len(),
                    "Stripe has more records than one page; only the first page is used"
                );
            }
            return Ok(page);
        }

        let detail = serde_json::from_str::<StripeErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| StripeErrorDetail {
                kind: None,
                code: None,
                message: Some(body.clone()),
            });
        let message = detail
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| status.to_string());

        tracing::error!(
            resource,
            status = %status,
            kind = ?detail.kind,
            code = ?detail.code,
            message = %message,
            "Stripe list request rejected"
        );

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            record_provider_request(resource, "unauthorized");
            return Err(LedgerError::Configuration(message));
        }

        record_provider_request(resource, "error");
        Err(LedgerError::Provider {
            status: status.as_u16(),
            code: detail.code,
            message,
        })
    }
}

#[async_trait]
impl LedgerQuery for StripeClient {
    async fn list_subscriptions(
        &self,
        query: &SubscriptionQuery,
    ) -> Result<Vec<Subscription>, LedgerError> {
        let params = [
            ("created[lte]", query.created_lte.timestamp().to_string()),
            ("status", query.status.as_str().to_string()),
            ("limit", query.limit.get().to_string()),
        ];

        let page: StripeList<StripeSubscription> = self.list(SUBSCRIPTIONS, &params).await?;
        Ok(convert_page(SUBSCRIPTIONS, page.data))
    }

    async fn list_charges(&self, query: &ChargeQuery) -> Result<Vec<Charge>, LedgerError> {
        let params = [
            ("created[gte]", query.created_gte.timestamp().to_string()),
            ("created[lte]", query.created_lte.timestamp().to_string()),
            ("limit", query.limit.get().to_string()),
        ];

        let page: StripeList<StripeCharge> = self.list(CHARGES, &params).await?;
        Ok(convert_page(CHARGES, page.data))
    }
}
