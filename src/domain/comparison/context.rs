//! Comparison context: a compact, expirable summary of the latest price
//! comparison, sent along with follow-up questions so the agent can answer
//! them without re-running the search.
//!
//! The context is derived on demand from the comparison snapshot stored in
//! thread metadata (`comparisonData`, preferring a nested `reply_json`). It
//! is lenient by design of its input: thread metadata may have been written by
//! older clients, so missing fields default instead of failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::reply::{headline, parse_amount, parse_day, Evaluation};

/// Metadata key holding the latest comparison snapshot on a thread.
pub const COMPARISON_DATA_KEY: &str = "comparisonData";

/// Key inside the snapshot that holds the raw agent payload.
pub const REPLY_JSON_KEY: &str = "reply_json";

/// Hours past check-in after which a context is no longer useful.
pub const EXPIRY_GRACE_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestChoiceSummary {
    pub platform: String,
    pub total_price: f64,
    pub reason: String,
    pub perks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSummary {
    pub platform: String,
    pub price: f64,
    pub pre_tax_price: f64,
    pub perks: Vec<String>,
    pub cancellation: String,
    pub risk_level: String,
}

/// Canonical summary of one comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonContext {
    pub hotel_name: String,
    pub checkin_date: String,
    pub checkout_date: String,
    pub nights: u32,
    pub guests: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_choice: Option<BestChoiceSummary>,
    pub table_rows_summary: Vec<RowSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_analysis: Option<String>,
}

impl ComparisonContext {
    /// Builds a context from a raw reply object. Returns `None` when the input
    /// is not a JSON object.
    pub fn build(reply: &Value) -> Option<Self> {
        let obj = reply.as_object()?;

        let checkin_date = text(obj, "checkin_date");
        let checkout_date = text(obj, "checkout_date");
        let nights = obj
            .get("nights")
            .and_then(as_u32)
            .filter(|n| *n > 0)
            .or_else(|| nights_between(&checkin_date, &checkout_date))
            .unwrap_or(0);

        let best_choice = obj
            .get("best_choice")
            .and_then(Value::as_object)
            .map(|best| BestChoiceSummary {
                platform: text(best, "platform"),
                total_price: amount(best, "total_price"),
                reason: text(best, "reason"),
                perks: list(best, "perks"),
            });

        let table_rows_summary = obj
            .get("table_rows")
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter_map(Value::as_object)
                    .map(|row| RowSummary {
                        platform: text(row, "platform"),
                        price: match row.get("price") {
                            Some(_) => amount(row, "price"),
                            None => amount(row, "total_price"),
                        },
                        pre_tax_price: amount(row, "pre_tax_price"),
                        perks: list(row, "perks"),
                        cancellation: headline(&first_text(row, &["cancellation_policy", "cancellation"])),
                        risk_level: text(row, "risk_level"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let deep_analysis = Some(text(obj, "deep_analysis")).filter(|s| !s.trim().is_empty());

        Some(Self {
            hotel_name: text(obj, "hotel_name"),
            checkin_date,
            checkout_date,
            nights,
            guests: text(obj, "guests"),
            best_choice,
            table_rows_summary,
            deep_analysis,
        })
    }

    /// Builds a context from thread metadata, if a comparison snapshot exists.
    pub fn from_metadata(metadata: &Map<String, Value>) -> Option<Self> {
        let snapshot = metadata.get(COMPARISON_DATA_KEY)?;
        let source = snapshot
            .get(REPLY_JSON_KEY)
            .filter(|v| v.is_object())
            .unwrap_or(snapshot);
        Self::build(source)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired(&self.checkin_date, now)
    }
}

/// True when `checkin_date` is unparsable or more than 24 hours in the past.
///
/// Date-only values are taken as midnight UTC.
pub fn is_expired(checkin_date: &str, now: DateTime<Utc>) -> bool {
    let checkin = match DateTime::parse_from_rfc3339(checkin_date.trim()) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => match parse_day(checkin_date).and_then(|d| d.and_hms_opt(0, 0, 0)) {
            Some(naive) => naive.and_utc(),
            None => return true,
        },
    };
    let hours = checkin.signed_duration_since(now).num_minutes() as f64 / 60.0;
    hours < -(EXPIRY_GRACE_HOURS as f64)
}

/// Snapshot value to merge into thread metadata after an evaluation.
pub fn metadata_snapshot(evaluation: &Evaluation, saved_at: DateTime<Utc>) -> Map<String, Value> {
    let mut snapshot = Map::new();
    snapshot.insert(
        REPLY_JSON_KEY.to_string(),
        serde_json::to_value(evaluation).unwrap_or(Value::Null),
    );
    snapshot.insert("savedAt".to_string(), Value::String(saved_at.to_rfc3339()));

    let mut patch = Map::new();
    patch.insert(COMPARISON_DATA_KEY.to_string(), Value::Object(snapshot));
    patch
}

fn text(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .map(|k| text(obj, k))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn amount(obj: &Map<String, Value>, key: &str) -> f64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_amount(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => s
            .split([',', '，', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn nights_between(check_in: &str, check_out: &str) -> Option<u32> {
    let days = (parse_day(check_out)? - parse_day(check_in)?).num_days();
    u32::try_from(days).ok().filter(|n| *n > 0)
}
