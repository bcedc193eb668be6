// src/models.rs
use crate::due_date::YearMonth;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: u64,
    pub name: String,
    pub last_paid_month: YearMonth,
    pub recurrence_months: u32,
    pub recurrence_day_of_month: u32,
    pub next_due_date: NaiveDate,
}

/// Request body for both create and update.
///
/// Every field keeps the raw JSON value so that "absent" and "present but
/// wrong" stay distinguishable; `null` counts as present.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInput {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub last_paid_month: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub recurrence_months: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub recurrence_day_of_month: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Profile kept in the session cookie after a successful sign-in.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CredentialRequest {
    pub credential: Option<String>,
}
