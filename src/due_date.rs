// src/due_date.rs
//! Next-due-date arithmetic on the civil calendar.
//!
//! Everything here works on [`NaiveDate`], so no local timezone can shift a
//! due date by a day. A recurrence day that does not exist in the target month
//! is clamped down to that month's last day instead of spilling over.

use chrono::{Datelike, Months, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static YEAR_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{4})-([0-9]{2})$").expect("static pattern compiles"));

pub const MAX_DAY_OF_MONTH: u32 = 31;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DueDateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("could not calculate next due date: {0}")]
    Calculation(String),
}

/// A `YYYY-MM` calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, DueDateError> {
        if !(1..=12).contains(&month) {
            return Err(DueDateError::InvalidInput(format!(
                "month must be between 01 and 12, got {month:02}"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of this month.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl FromStr for YearMonth {
    type Err = DueDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = YEAR_MONTH.captures(s).ok_or_else(|| {
            DueDateError::InvalidInput(format!("expected a YYYY-MM month, got {s:?}"))
        })?;
        // Both groups are fixed-width ASCII digits, so these parses cannot overflow.
        let year = caps[1]
            .parse::<i32>()
            .map_err(|e| DueDateError::InvalidInput(e.to_string()))?;
        let month = caps[2]
            .parse::<u32>()
            .map_err(|e| DueDateError::InvalidInput(e.to_string()))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = DueDateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Number of days in the given month, or `None` outside chrono's range.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = first.checked_add_months(Months::new(1))?;
    u32::try_from(next.signed_duration_since(first).num_days()).ok()
}

/// Computes the due date `recurrence_months` after `last_paid`, on
/// `recurrence_day` or the last day of that month, whichever comes first.
pub fn next_due_date(
    last_paid: YearMonth,
    recurrence_months: u32,
    recurrence_day: u32,
) -> Result<NaiveDate, DueDateError> {
    if recurrence_months == 0 {
        return Err(DueDateError::InvalidInput(
            "recurrence months must be a positive integer".to_string(),
        ));
    }
    if !(1..=MAX_DAY_OF_MONTH).contains(&recurrence_day) {
        return Err(DueDateError::InvalidInput(format!(
            "recurrence day must be between 1 and {MAX_DAY_OF_MONTH}, got {recurrence_day}"
        )));
    }

    let anchor = last_paid.first_day().ok_or_else(|| {
        DueDateError::Calculation(format!("{last_paid} is outside the supported calendar"))
    })?;
    let target = anchor
        .checked_add_months(Months::new(recurrence_months))
        .ok_or_else(|| {
            DueDateError::Calculation(format!(
                "{last_paid} plus {recurrence_months} months is outside the supported calendar"
            ))
        })?;
    let last_day = days_in_month(target.year(), target.month()).ok_or_else(|| {
        DueDateError::Calculation(format!(
            "no month length for {:04}-{:02}",
            target.year(),
            target.month()
        ))
    })?;

    NaiveDate::from_ymd_opt(target.year(), target.month(), recurrence_day.min(last_day))
        .ok_or_else(|| {
            DueDateError::Calculation(format!(
                "{:04}-{:02}-{:02} is not a calendar date",
                target.year(),
                target.month(),
                recurrence_day.min(last_day)
            ))
        })
}

/// Boundary form of [`next_due_date`] taking the raw request values.
///
/// Shape and range problems are `InvalidInput`; a month count too large to
/// represent is a `Calculation` error, like any other overflow of the calendar.
pub fn compute_next_due_date(
    last_paid_month: &str,
    recurrence_months: i64,
    recurrence_day_of_month: i64,
) -> Result<NaiveDate, DueDateError> {
    let last_paid: YearMonth = last_paid_month.parse()?;
    if recurrence_months <= 0 {
        return Err(DueDateError::InvalidInput(format!(
            "recurrence months must be a positive integer, got {recurrence_months}"
        )));
    }
    if !(1..=i64::from(MAX_DAY_OF_MONTH)).contains(&recurrence_day_of_month) {
        return Err(DueDateError::InvalidInput(format!(
            "recurrence day must be between 1 and {MAX_DAY_OF_MONTH}, got {recurrence_day_of_month}"
        )));
    }
    let months = checked_recurrence_months(recurrence_months)?;
    // Range checked above.
    let day = recurrence_day_of_month as u32;
    next_due_date(last_paid, months, day)
}

/// Narrows a positive month count to what the calendar arithmetic accepts.
pub fn checked_recurrence_months(recurrence_months: i64) -> Result<u32, DueDateError> {
    u32::try_from(recurrence_months).map_err(|_| {
        DueDateError::Calculation(format!("{recurrence_months} months is out of range"))
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
