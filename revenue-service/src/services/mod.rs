pub mod aggregator;
pub mod assembler;
pub mod dashboard;
pub mod ledger;
pub mod metrics;
pub mod normalizer;
pub mod stripe;
pub mod windows;

pub use assembler::MetricAssembler;
pub use dashboard::{
    Dashboard, DashboardError, DashboardErrorKind, DashboardSnapshot, RefreshError,
    RefreshStatus, CREDENTIAL_HINT,
};
pub use ledger::{
    ChargeQuery, LedgerError, LedgerQuery, PageLimit, SubscriptionQuery,
    DEFAULT_MAX_CONCURRENT_REQUESTS, MAX_PAGE_LIMIT,
};
pub use metrics::{get_metrics, init_metrics};
pub use stripe::StripeClient;
