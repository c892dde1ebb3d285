//! Typed schema for agent replies.
//!
//! The agent returns loosely shaped JSON. Everything is validated here, at the
//! parse boundary, into [`AgentReply`]; the rest of the crate never digs
//! through raw JSON. Amounts may arrive as numbers or as strings such as
//! `"$1,234.50"`; lists may arrive as a single string.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Reply type tag marking a structured price comparison.
pub const EVALUATION_REPLY_TYPE: &str = "evaluation";

/// Failure to interpret an agent reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyParseError {
    #[error("evaluation reply is missing its payload")]
    MissingPayload,

    #[error("evaluation payload is not a JSON object")]
    NotAnObject,

    #[error("malformed evaluation payload: {0}")]
    Malformed(String),
}

/// Whether the agent finished the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    /// Queued, no answer yet.
    Buffered,
    /// Answered.
    Processed,
}

/// An interpreted agent reply.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentReply {
    /// The agent has not answered yet; show a transient placeholder.
    Pending,
    /// Free-form answer.
    Text(String),
    /// Structured price comparison.
    Evaluation(Evaluation),
}

impl AgentReply {
    /// Interprets the raw parts of an agent envelope.
    ///
    /// `reply_json` (sent by `compare`) wins over parsing the `reply` string.
    pub fn interpret(
        status: ReplyStatus,
        reply_type: Option<&str>,
        reply: Option<&str>,
        reply_json: Option<&Value>,
    ) -> Result<Self, ReplyParseError> {
        if status == ReplyStatus::Buffered {
            return Ok(AgentReply::Pending);
        }

        if reply_type == Some(EVALUATION_REPLY_TYPE) {
            if let Some(value) = reply_json.filter(|v| !v.is_null()) {
                return Evaluation::from_value(value.clone()).map(AgentReply::Evaluation);
            }
            let raw = reply.ok_or(ReplyParseError::MissingPayload)?;
            return Evaluation::parse(raw).map(AgentReply::Evaluation);
        }

        match reply {
            Some(text) if !text.trim().is_empty() => Ok(AgentReply::Text(text.to_string())),
            _ => Ok(AgentReply::Pending),
        }
    }
}

/// A structured price comparison for one hotel stay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default)]
    pub hotel_name: String,
    #[serde(default)]
    pub hotel_id: Option<String>,
    #[serde(default)]
    pub checkin_date: Option<String>,
    #[serde(default)]
    pub checkout_date: Option<String>,
    #[serde(default)]
    pub nights: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub guests: Option<String>,
    #[serde(default)]
    pub best_choice: Option<BestChoice>,
    #[serde(default)]
    pub table_rows: Vec<TableRow>,
    #[serde(default)]
    pub deep_analysis: Option<String>,
}

impl Evaluation {
    /// Parses the JSON string carried in `reply`.
    pub fn parse(raw: &str) -> Result<Self, ReplyParseError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| ReplyParseError::Malformed(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ReplyParseError> {
        if !value.is_object() {
            return Err(ReplyParseError::NotAnObject);
        }
        serde_json::from_value(value).map_err(|e| ReplyParseError::Malformed(e.to_string()))
    }

    pub fn has_rates(&self) -> bool {
        !self.table_rows.is_empty()
    }

    /// Stay dates reported by the agent, when both parse and form a valid range.
    pub fn stay_dates(&self) -> Option<(NaiveDate, NaiveDate)> {
        let check_in = parse_day(self.checkin_date.as_deref()?)?;
        let check_out = parse_day(self.checkout_date.as_deref()?)?;
        (check_out > check_in).then_some((check_in, check_out))
    }

    /// Deep analysis text, if the agent sent a non-blank one.
    pub fn narrative(&self) -> Option<&str> {
        self.deep_analysis
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// The agent's recommended booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestChoice {
    #[serde(default)]
    pub platform: String,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub reason: String,
    #[serde(default, deserialize_with = "de_string_list")]
    pub perks: Vec<String>,
}

/// One booking platform's offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub platform: String,
    #[serde(default, alias = "total_price", deserialize_with = "de_opt_amount")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub pre_tax_price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, deserialize_with = "de_string_list")]
    pub perks: Vec<String>,
    #[serde(default, alias = "cancellation")]
    pub cancellation_policy: Option<String>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub booking_url: Option<String>,
}

impl TableRow {
    /// First sentence of the cancellation policy.
    pub fn cancellation_headline(&self) -> String {
        headline(self.cancellation_policy.as_deref().unwrap_or_default())
    }
}

/// First sentence (or line) of a policy text.
pub fn headline(text: &str) -> String {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '。' | '\n' | ';' | '；'))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text[..end].trim().to_string()
}

/// Parses `YYYY-MM-DD`, also accepting a full RFC 3339 timestamp.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        chrono::DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.date_naive())
    })
}

/// Parses an amount such as `1234.5`, `"1,234.50"` or `"$99"`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().ok()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Number(f64),
    Text(String),
}

fn de_opt_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<AmountRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(AmountRepr::Number(n)) => Ok(Some(n)),
        Some(AmountRepr::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(AmountRepr::Text(s)) => parse_amount(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("not an amount: {s}"))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextRepr {
    Number(f64),
    Text(String),
}

fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<TextRepr>::deserialize(deserializer)? {
        None => None,
        Some(TextRepr::Number(n)) if n.fract() == 0.0 => Some(format!("{}", n as i64)),
        Some(TextRepr::Number(n)) => Some(n.to_string()),
        Some(TextRepr::Text(s)) => Some(s),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListRepr {
    Many(Vec<String>),
    One(String),
}

fn de_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<ListRepr>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(ListRepr::Many(items)) => items,
        Some(ListRepr::One(s)) => s
            .split([',', '，', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    })
}
