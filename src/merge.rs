// src/merge.rs
//! Validation of subscription fields and the update/recalculation rule.
//!
//! Every entry point returns either a complete record or a [`Rejection`];
//! nothing here mutates the record it is given.

use crate::due_date::{self, DueDateError, MAX_DAY_OF_MONTH, YearMonth};
use crate::models::{Subscription, SubscriptionInput};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Years up to and including this one are refused.
pub const MIN_YEAR_EXCLUSIVE: i32 = 1900;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    LastPaidMonth,
    RecurrenceMonths,
    RecurrenceDayOfMonth,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::LastPaidMonth => "lastPaidMonth",
            Field::RecurrenceMonths => "recurrenceMonths",
            Field::RecurrenceDayOfMonth => "recurrenceDayOfMonth",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("{field}: {reason}")]
    Invalid { field: Field, reason: String },
    #[error("could not calculate next due date: {0}")]
    Calculation(String),
}

impl Rejection {
    fn invalid(field: Field, reason: impl Into<String>) -> Self {
        Rejection::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Supplied fields after validation. `None` means the field was not supplied.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidFields {
    pub name: Option<String>,
    pub last_paid_month: Option<YearMonth>,
    /// Positive, but not yet narrowed to the stored width.
    pub recurrence_months: Option<i64>,
    pub recurrence_day_of_month: Option<u32>,
}

impl ValidFields {
    pub fn touches_due_date(&self) -> bool {
        self.last_paid_month.is_some()
            || self.recurrence_months.is_some()
            || self.recurrence_day_of_month.is_some()
    }
}

/// Validates every supplied field, stopping at the first bad one.
pub fn validate(input: &SubscriptionInput) -> Result<ValidFields, Rejection> {
    Ok(ValidFields {
        name: input.name.as_ref().map(parse_name).transpose()?,
        last_paid_month: input
            .last_paid_month
            .as_ref()
            .map(parse_last_paid_month)
            .transpose()?,
        recurrence_months: input
            .recurrence_months
            .as_ref()
            .map(parse_recurrence_months)
            .transpose()?,
        recurrence_day_of_month: input
            .recurrence_day_of_month
            .as_ref()
            .map(parse_recurrence_day)
            .transpose()?,
    })
}

/// Builds a new record with id `id`; all four fields are required.
pub fn build_subscription(id: u64, input: &SubscriptionInput) -> Result<Subscription, Rejection> {
    let fields = validate(input)?;
    let name = fields
        .name
        .ok_or_else(|| Rejection::invalid(Field::Name, "is required"))?;
    let last_paid_month = fields
        .last_paid_month
        .ok_or_else(|| Rejection::invalid(Field::LastPaidMonth, "is required"))?;
    let recurrence_months = fields
        .recurrence_months
        .ok_or_else(|| Rejection::invalid(Field::RecurrenceMonths, "is required"))
        .and_then(stored_months)?;
    let recurrence_day_of_month = fields
        .recurrence_day_of_month
        .ok_or_else(|| Rejection::invalid(Field::RecurrenceDayOfMonth, "is required"))?;

    let next_due_date = recompute(last_paid_month, recurrence_months, recurrence_day_of_month)?;

    Ok(Subscription {
        id,
        name,
        last_paid_month,
        recurrence_months,
        recurrence_day_of_month,
        next_due_date,
    })
}

/// Overlays the supplied fields on `original`.
///
/// The due date is recomputed only when a driving field was supplied; a
/// rename keeps the stored due date exactly as it is.
pub fn apply_update(
    original: &Subscription,
    input: &SubscriptionInput,
) -> Result<Subscription, Rejection> {
    let fields = validate(input)?;
    let recalc = fields.touches_due_date();

    let mut updated = original.clone();
    if let Some(name) = fields.name {
        updated.name = name;
    }
    if let Some(month) = fields.last_paid_month {
        updated.last_paid_month = month;
    }
    if let Some(months) = fields.recurrence_months {
        updated.recurrence_months = stored_months(months)?;
    }
    if let Some(day) = fields.recurrence_day_of_month {
        updated.recurrence_day_of_month = day;
    }

    if recalc {
        updated.next_due_date = recompute(
            updated.last_paid_month,
            updated.recurrence_months,
            updated.recurrence_day_of_month,
        )?;
    }

    Ok(updated)
}

fn recompute(
    last_paid_month: YearMonth,
    recurrence_months: u32,
    recurrence_day_of_month: u32,
) -> Result<chrono::NaiveDate, Rejection> {
    due_date::next_due_date(last_paid_month, recurrence_months, recurrence_day_of_month)
        .map_err(calculation_failed)
}

fn stored_months(months: i64) -> Result<u32, Rejection> {
    due_date::checked_recurrence_months(months).map_err(calculation_failed)
}

fn calculation_failed(e: DueDateError) -> Rejection {
    match e {
        // Fields are validated before any arithmetic, so this is an overflow or corrupt data.
        DueDateError::InvalidInput(msg) | DueDateError::Calculation(msg) => {
            Rejection::Calculation(msg)
        }
    }
}

fn parse_name(value: &Value) -> Result<String, Rejection> {
    match value.as_str().map(str::trim) {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(Rejection::invalid(Field::Name, "must be a non-empty string")),
    }
}

fn parse_last_paid_month(value: &Value) -> Result<YearMonth, Rejection> {
    let text = value
        .as_str()
        .ok_or_else(|| Rejection::invalid(Field::LastPaidMonth, "must be a YYYY-MM string"))?;
    let month: YearMonth = text.parse().map_err(|e: DueDateError| {
        Rejection::invalid(Field::LastPaidMonth, e.to_string())
    })?;
    if month.year() <= MIN_YEAR_EXCLUSIVE {
        return Err(Rejection::invalid(
            Field::LastPaidMonth,
            format!("year must be after {MIN_YEAR_EXCLUSIVE}"),
        ));
    }
    Ok(month)
}

fn parse_recurrence_months(value: &Value) -> Result<i64, Rejection> {
    integer(value)
        .filter(|n| *n > 0)
        .ok_or_else(|| Rejection::invalid(Field::RecurrenceMonths, "must be a positive integer"))
}

fn parse_recurrence_day(value: &Value) -> Result<u32, Rejection> {
    integer(value)
        .filter(|n| (1..=i64::from(MAX_DAY_OF_MONTH)).contains(n))
        .map(|n| n as u32)
        .ok_or_else(|| {
            Rejection::invalid(
                Field::RecurrenceDayOfMonth,
                format!("must be an integer between 1 and {MAX_DAY_OF_MONTH}"),
            )
        })
}

/// Accepts JSON integers, integral floats and numeric strings.
fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
