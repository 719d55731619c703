//! Time window generation.
//!
//! Windows are built from calendar dates in the time zone of `now` and then
//! pinned to UTC instants. Each window ends on the last whole second of its
//! final day (23:59:59), matching the provider's second-resolution timestamps.

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};

use crate::models::{Granularity, TimeWindow};

/// Number of monthly windows in a trailing-year series.
pub const TRAILING_MONTHS: u32 = 12;

const LAST_SECOND_OF_DAY: i64 = 86_399;

pub fn windows<Tz: TimeZone>(granularity: Granularity, now: &DateTime<Tz>) -> Vec<TimeWindow> {
    match granularity {
        Granularity::Monthly => monthly_windows(now),
        Granularity::Daily => daily_windows(now),
    }
}

/// Twelve calendar months ending with the month containing `now`, oldest first.
pub fn monthly_windows<Tz: TimeZone>(now: &DateTime<Tz>) -> Vec<TimeWindow> {
    let tz = now.timezone();
    let current = first_of_month(now.date_naive());

    (0..TRAILING_MONTHS)
        .rev()
        .map(|back| {
            let first = current
                .checked_sub_months(Months::new(back))
                .unwrap_or(current);
            let label = first.format("%b").to_string();
            window(&tz, first, last_of_month(first), label)
        })
        .collect()
}

/// Every calendar day of the month containing `now`, day 1 first.
pub fn daily_windows<Tz: TimeZone>(now: &DateTime<Tz>) -> Vec<TimeWindow> {
    let tz = now.timezone();
    let first = first_of_month(now.date_naive());

    first
        .iter_days()
        .take(days_in_month(first) as usize)
        .map(|day| window(&tz, day, day, day.day().to_string()))
        .collect()
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    last_of_month(date).day()
}

fn window<Tz: TimeZone>(
    tz: &Tz,
    first: NaiveDate,
    last: NaiveDate,
    label: String,
) -> TimeWindow {
    let start = first.and_time(NaiveTime::MIN);
    let end = last.and_time(NaiveTime::MIN) + Duration::seconds(LAST_SECOND_OF_DAY);

    TimeWindow {
        start: local_instant(tz, start),
        end: local_instant(tz, end),
        label,
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

/// Resolve a wall-clock time to an instant. Ambiguous times (DST fall-back)
/// take the earlier instant; skipped times (DST spring-forward) move forward
/// by the size of the gap.
fn local_instant<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|instant| instant.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local))
}
