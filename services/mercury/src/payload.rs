//! Scanned codes and the JSON status documents they point at

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::MercuryError;

/// A string decoded from a visual code, used as the URL to fetch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanResult(String);

impl ScanResult {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScanResult {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for ScanResult {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fetched status document.
///
/// Only `is_fraud`, `amt` and `unix_time` carry meaning; every other field is
/// kept so that two payloads compare equal only when the whole document
/// matches. Key order is irrelevant to equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusPayload(Map<String, Value>);

impl StatusPayload {
    /// Parse a response body. Anything other than a JSON object is rejected.
    pub fn from_json(body: &str) -> crate::Result<Self> {
        let value: Value = serde_json::from_str(body)?;
        Self::try_from(value)
    }

    /// `is_fraud` is read by truthiness: `false`, zero, `""`, `null` and a
    /// missing field are not fraud; anything else is.
    pub fn is_fraud(&self) -> bool {
        self.0.get("is_fraud").is_some_and(is_truthy)
    }

    pub fn amount(&self) -> Option<&Value> {
        self.0.get("amt")
    }

    pub fn unix_time(&self) -> Option<&Value> {
        self.0.get("unix_time")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Human-readable reason shown while the payload is flagged
    pub fn fraud_reason(&self) -> String {
        format!(
            "Fraud detected - Amount: {}, Time: {}",
            render_field(self.amount()),
            render_field(self.unix_time())
        )
    }
}

impl TryFrom<Value> for StatusPayload {
    type Error = MercuryError;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(MercuryError::Payload(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn render_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
