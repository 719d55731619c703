pub mod billing;
pub mod metric;
pub mod window;

pub use billing::{
    Charge, ChargeStatus, LineItem, RecurringInterval, Subscription, SubscriptionStatus,
};
pub use metric::{DataPoint, MetricKind, MetricResult, MetricSet, UnknownMetric};
pub use window::{Granularity, TimeWindow};
