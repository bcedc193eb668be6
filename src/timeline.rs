// src/timeline.rs
use crate::due_date::YearMonth;
use crate::models::Subscription;
use chrono::{Months, NaiveDate};
use serde::Serialize;

pub const DUE_SOON_DAYS: i64 = 7;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DueStatus {
    Upcoming,
    DueSoon,
    Due,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub progress: f64,
    pub days_remaining: i64,
    pub status: DueStatus,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionTimeline {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub timeline: Option<Timeline>,
}

/// Progress through the current billing period as of `today`.
///
/// The period opens on the first day of the month after `last_paid` and
/// closes on `next_due`. Returns `None` only when the period start falls
/// outside the calendar.
pub fn timeline(last_paid: YearMonth, next_due: NaiveDate, today: NaiveDate) -> Option<Timeline> {
    let start = last_paid.first_day()?.checked_add_months(Months::new(1))?;

    let total = next_due.signed_duration_since(start).num_days();
    let elapsed = today.signed_duration_since(start).num_days();

    let progress = if total > 0 {
        (elapsed as f64 / total as f64).clamp(0.0, 1.0)
    } else if today >= start && today >= next_due {
        1.0
    } else {
        0.0
    };

    let days_remaining = next_due.signed_duration_since(today).num_days().max(0);
    let status = if today >= next_due {
        DueStatus::Due
    } else if days_remaining <= DUE_SOON_DAYS {
        DueStatus::DueSoon
    } else {
        DueStatus::Upcoming
    };

    Some(Timeline {
        progress,
        days_remaining,
        status,
    })
}

/// Attaches a timeline to each subscription, soonest due first.
pub fn build(subscriptions: Vec<Subscription>, today: NaiveDate) -> Vec<SubscriptionTimeline> {
    let mut rows: Vec<SubscriptionTimeline> = subscriptions
        .into_iter()
        .map(|subscription| SubscriptionTimeline {
            timeline: timeline(subscription.last_paid_month, subscription.next_due_date, today),
            subscription,
        })
        .collect();
    rows.sort_by_key(|row| (row.subscription.next_due_date, row.subscription.id));
    rows
}
