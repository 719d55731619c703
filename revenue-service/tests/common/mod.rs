#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use revenue_service::config::{MetricToggles, RevenueConfig, StripeConfig};
use revenue_service::models::{
    Charge, ChargeStatus, LineItem, RecurringInterval, Subscription,
};
use revenue_service::services::{
    init_metrics, ChargeQuery, LedgerError, LedgerQuery, SubscriptionQuery,
};
use revenue_service::startup::Application;
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

pub fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn monthly_item(unit_amount: i64) -> LineItem {
    LineItem {
        unit_amount,
        quantity: 1,
        interval: RecurringInterval::Month,
    }
}

pub fn yearly_item(unit_amount: i64) -> LineItem {
    LineItem {
        unit_amount,
        quantity: 1,
        interval: RecurringInterval::Year,
    }
}

pub fn subscription(
    id: &str,
    created_at: DateTime<Utc>,
    canceled_at: Option<DateTime<Utc>>,
    items: Vec<LineItem>,
) -> Subscription {
    Subscription {
        id: id.to_string(),
        created_at,
        canceled_at,
        items,
    }
}

pub fn charge(id: &str, created_at: DateTime<Utc>, amount: i64) -> Charge {
    Charge {
        id: id.to_string(),
        created_at,
        amount,
        status: ChargeStatus::Succeeded,
        refunded: false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Unauthorized,
    RateLimited,
}

impl FailureMode {
    fn error(&self) -> LedgerError {
        match self {
            FailureMode::Unauthorized => {
                LedgerError::Configuration("Invalid API Key provided".to_string())
            }
            FailureMode::RateLimited => LedgerError::Provider {
                status: 429,
                code: Some("rate_limit".to_string()),
                message: "Too many requests".to_string(),
            },
        }
    }
}

/// Delay before answering a query whose window ends at the given instant.
pub type Latency = Arc<dyn Fn(DateTime<Utc>) -> Duration + Send + Sync>;

/// In-memory ledger that answers list queries from fixtures, the way the
/// provider filters them (by creation time, first page only).
#[derive(Default)]
pub struct FakeLedger {
    subscriptions: Vec<Subscription>,
    charges: Vec<Charge>,
    subscription_calls: AtomicUsize,
    charge_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    failure: Mutex<Option<FailureMode>>,
    charge_failure: Mutex<Option<FailureMode>>,
    gate: Option<Arc<Semaphore>>,
    latency: Option<Latency>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(mut self, subscriptions: Vec<Subscription>) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    pub fn with_charges(mut self, charges: Vec<Charge>) -> Self {
        self.charges = charges;
        self
    }

    pub fn failing(self, mode: FailureMode) -> Self {
        self.fail_with(Some(mode));
        self
    }

    /// Only charge queries fail; subscription queries keep answering.
    pub fn failing_charges(self, mode: FailureMode) -> Self {
        *self.charge_failure.lock().unwrap() = Some(mode);
        self
    }

    pub fn with_latency(
        mut self,
        latency: impl Fn(DateTime<Utc>) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.latency = Some(Arc::new(latency));
        self
    }

    /// Every call waits for a permit from `gate` before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fail_with(&self, mode: Option<FailureMode>) {
        *self.failure.lock().unwrap() = mode;
    }

    pub fn subscription_calls(&self) -> usize {
        self.subscription_calls.load(Ordering::SeqCst)
    }

    pub fn charge_calls(&self) -> usize {
        self.charge_calls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.subscription_calls() + self.charge_calls()
    }

    /// Most queries ever answered at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn answer(&self, window_end: DateTime<Utc>) -> Result<(), LedgerError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate closed");
        }
        if let Some(latency) = &self.latency {
            tokio::time::sleep(latency(window_end)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match *self.failure.lock().unwrap() {
            Some(mode) => Err(mode.error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LedgerQuery for FakeLedger {
    async fn list_subscriptions(
        &self,
        query: &SubscriptionQuery,
    ) -> Result<Vec<Subscription>, LedgerError> {
        self.subscription_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(query.created_lte).await?;

        Ok(self
            .subscriptions
            .iter()
            .filter(|sub| sub.created_at <= query.created_lte)
            .take(query.limit.get() as usize)
            .cloned()
            .collect())
    }

    async fn list_charges(&self, query: &ChargeQuery) -> Result<Vec<Charge>, LedgerError> {
        self.charge_calls.fetch_add(1, Ordering::SeqCst);
        self.answer(query.created_lte).await?;
        if let Some(mode) = *self.charge_failure.lock().unwrap() {
            return Err(mode.error());
        }

        Ok(self
            .charges
            .iter()
            .filter(|c| query.created_gte <= c.created_at && c.created_at <= query.created_lte)
            .take(query.limit.get() as usize)
            .cloned()
            .collect())
    }
}

/// Poll until `condition` holds or a couple of seconds pass.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

pub fn test_config(metrics: MetricToggles) -> RevenueConfig {
    RevenueConfig {
        common: CoreConfig {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0, // Random port
        },
        service_name: "revenue-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        stripe: StripeConfig::default(),
        metrics,
        refresh_on_startup: false,
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn_with_ledger(ledger: Arc<dyn LedgerQuery>, metrics: MetricToggles) -> Self {
        let app = Application::build_with_ledger(test_config(metrics), ledger)
            .await
            .expect("Failed to build test application");
        Self::run(app).await
    }

    /// Spawn against a Stripe-compatible API at `base_url`.
    pub async fn spawn_with_stripe(base_url: &str, secret_key: &str) -> Self {
        let mut config = test_config(MetricToggles::default());
        config.stripe = StripeConfig {
            secret_key: Secret::new(secret_key.to_string()),
            api_base_url: base_url.to_string(),
            timeout: Duration::from_secs(5),
            ..StripeConfig::default()
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        Self::run(app).await
    }

    async fn run(app: Application) -> Self {
        init_metrics();

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }

    pub async fn get_dashboard(&self, query: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/dashboard{}", self.address, query))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn refresh(&self) -> reqwest::Response {
        self.client
            .post(format!("{}/dashboard/refresh", self.address))
            .send()
            .await
            .expect("Failed to execute request")
    }
}
