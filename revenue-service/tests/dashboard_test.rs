mod common;

use common::{monthly_item, subscription, utc, wait_until, FailureMode, FakeLedger};
use revenue_service::config::MetricToggles;
use revenue_service::models::MetricKind;
use revenue_service::services::{
    Dashboard, DashboardErrorKind, LedgerQuery, MetricAssembler, PageLimit, RefreshError,
    RefreshStatus, CREDENTIAL_HINT,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

fn dashboard(ledger: &Arc<FakeLedger>, toggles: MetricToggles) -> Dashboard {
    let ledger: Arc<dyn LedgerQuery> = ledger.clone();
    Dashboard::new(MetricAssembler::new(ledger, PageLimit::default()), &toggles)
}

fn seeded_ledger() -> FakeLedger {
    FakeLedger::new().with_subscriptions(vec![subscription(
        "sub_1",
        utc(2020, 1, 1, 0),
        None,
        vec![monthly_item(5_000)],
    )])
}

#[tokio::test]
async fn starts_idle_without_metrics() {
    let ledger = Arc::new(FakeLedger::new());
    let dashboard = dashboard(&ledger, MetricToggles::default());

    let snapshot = dashboard.snapshot().await;
    assert_eq!(snapshot.status, RefreshStatus::Idle);
    assert!(snapshot.metrics.is_none());
    assert!(snapshot.error.is_none());
    assert_eq!(ledger.calls(), 0);
}

#[tokio::test]
async fn successful_refresh_publishes_every_metric() {
    let ledger = Arc::new(seeded_ledger());
    let dashboard = dashboard(&ledger, MetricToggles::default());
    let now = utc(2026, 10, 18, 12);

    let snapshot = dashboard.refresh_at(&now).await.unwrap();

    assert_eq!(snapshot.status, RefreshStatus::Success);
    assert_eq!(snapshot.refreshed_at, Some(now));
    let metrics = snapshot.metrics.expect("metrics published");
    assert_eq!(metrics.len(), 3);
    assert_eq!(metrics[&MetricKind::Mrr].current_value, "$50");
    assert_eq!(dashboard.snapshot().await.status, RefreshStatus::Success);
}

#[tokio::test]
async fn hidden_metrics_are_still_computed() {
    let ledger = Arc::new(seeded_ledger());
    let toggles = MetricToggles {
        mrr: false,
        total_revenue: false,
        this_month: true,
    };
    let dashboard = dashboard(&ledger, toggles);

    let snapshot = dashboard.refresh_at(&utc(2026, 10, 18, 12)).await.unwrap();

    assert_eq!(snapshot.metrics.map(|m| m.len()), Some(3));
    assert_eq!(dashboard.visible_metrics(), [MetricKind::ThisMonth]);
}

#[tokio::test]
async fn credential_failure_is_reported_with_hint() {
    let ledger = Arc::new(FakeLedger::new().failing(FailureMode::Unauthorized));
    let dashboard = dashboard(&ledger, MetricToggles::default());

    let snapshot = dashboard.refresh_at(&utc(2026, 10, 18, 12)).await.unwrap();

    assert_eq!(snapshot.status, RefreshStatus::Failed);
    assert!(snapshot.metrics.is_none());
    let error = snapshot.error.expect("error recorded");
    assert_eq!(error.kind, DashboardErrorKind::Configuration);
    assert_eq!(error.message, "Invalid API Key provided");
    assert_eq!(error.hint, CREDENTIAL_HINT);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_metrics() {
    let ledger = Arc::new(seeded_ledger());
    let dashboard = dashboard(&ledger, MetricToggles::default());
    let first_at = utc(2026, 10, 18, 12);

    let first = dashboard.refresh_at(&first_at).await.unwrap();
    let first_metrics = first.metrics.expect("metrics published");

    ledger.fail_with(Some(FailureMode::RateLimited));
    let failed = dashboard
        .refresh_at(&utc(2026, 10, 18, 13))
        .await
        .unwrap();

    assert_eq!(failed.status, RefreshStatus::Failed);
    assert_eq!(failed.metrics.as_deref(), Some(first_metrics.as_ref()));
    assert_eq!(failed.refreshed_at, Some(first_at));
    assert_eq!(
        failed.error.map(|e| e.kind),
        Some(DashboardErrorKind::Provider)
    );

    // A later success clears the error.
    ledger.fail_with(None);
    let recovered = dashboard
        .refresh_at(&utc(2026, 10, 18, 14))
        .await
        .unwrap();
    assert_eq!(recovered.status, RefreshStatus::Success);
    assert!(recovered.error.is_none());
}

#[tokio::test]
async fn refresh_is_rejected_while_loading() {
    let gate = Arc::new(Semaphore::new(0));
    let ledger = Arc::new(seeded_ledger().gated(gate.clone()));
    let dashboard = Arc::new(dashboard(&ledger, MetricToggles::default()));
    let now = utc(2026, 10, 18, 12);

    let in_flight = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.refresh_at(&now).await })
    };

    let probe = ledger.clone();
    wait_until(move || probe.calls() > 0).await;

    assert_eq!(dashboard.snapshot().await.status, RefreshStatus::Loading);
    assert_eq!(
        dashboard.refresh_at(&now).await.unwrap_err(),
        RefreshError::InProgress
    );

    gate.add_permits(1);
    let snapshot = in_flight.await.unwrap().unwrap();
    assert_eq!(snapshot.status, RefreshStatus::Success);
}

#[tokio::test]
async fn abandoned_refresh_does_not_stay_loading() {
    let gate = Arc::new(Semaphore::new(0));
    let ledger = Arc::new(seeded_ledger().gated(gate.clone()));
    let dashboard = dashboard(&ledger, MetricToggles::default());
    let now = utc(2026, 10, 18, 12);

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), dashboard.refresh_at(&now)).await;
    assert!(abandoned.is_err());
    assert!(ledger.calls() > 0);
    assert_eq!(dashboard.snapshot().await.status, RefreshStatus::Idle);

    gate.add_permits(1);
    let snapshot = dashboard.refresh_at(&now).await.unwrap();
    assert_eq!(snapshot.status, RefreshStatus::Success);
}

#[tokio::test]
async fn no_visible_metrics_means_no_fetch() {
    let ledger = Arc::new(seeded_ledger());
    let toggles = MetricToggles {
        mrr: false,
        total_revenue: false,
        this_month: false,
    };
    let dashboard = dashboard(&ledger, toggles);

    let snapshot = dashboard.refresh_at(&utc(2026, 10, 18, 12)).await.unwrap();

    assert_eq!(snapshot.status, RefreshStatus::Idle);
    assert!(snapshot.metrics.is_none());
    assert_eq!(ledger.calls(), 0);
    assert_eq!(dashboard.default_metric(), None);
}

#[tokio::test]
async fn selection_falls_back_to_first_visible_metric() {
    let ledger = Arc::new(FakeLedger::new());
    let toggles = MetricToggles {
        mrr: false,
        total_revenue: true,
        this_month: true,
    };
    let dashboard = dashboard(&ledger, toggles);

    assert_eq!(dashboard.default_metric(), Some(MetricKind::TotalRevenue));
    assert_eq!(
        dashboard.select(Some(MetricKind::ThisMonth)),
        Some(MetricKind::ThisMonth)
    );
    assert_eq!(
        dashboard.select(Some(MetricKind::Mrr)),
        Some(MetricKind::TotalRevenue)
    );
    assert_eq!(dashboard.select(None), Some(MetricKind::TotalRevenue));
}
