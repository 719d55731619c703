//! Monthly-equivalent normalization of subscription line items.

use crate::models::{LineItem, RecurringInterval, Subscription, TimeWindow};

pub const MONTHS_PER_YEAR: f64 = 12.0;

/// A subscription counts toward a window when it was created before the window
/// closed and was not canceled before the window opened. Cancellation exactly at
/// `window.start` still counts.
pub fn is_active_during(subscription: &Subscription, window: &TimeWindow) -> bool {
    subscription.created_at <= window.end
        && subscription
            .canceled_at
            .map_or(true, |canceled_at| canceled_at >= window.start)
}

/// Monthly-equivalent amount of one line item in minor units, unrounded.
///
/// Yearly prices are spread over twelve months; intervals other than month and
/// year contribute nothing.
pub fn monthly_equivalent(item: &LineItem) -> f64 {
    let raw = item.unit_amount as f64 * item.quantity as f64;
    match item.interval {
        RecurringInterval::Month => raw,
        RecurringInterval::Year => raw / MONTHS_PER_YEAR,
        RecurringInterval::Other => 0.0,
    }
}

/// Monthly recurring amount a subscription contributes to `window`.
pub fn normalize(subscription: &Subscription, window: &TimeWindow) -> f64 {
    if !is_active_during(subscription, window) {
        return 0.0;
    }
    subscription.items.iter().map(monthly_equivalent).sum()
}
