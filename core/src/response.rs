//! Per-call results and response-body interpretation.
//!
//! # Design
//! The API signals failures inside the JSON body (`status` + `detail`), so
//! the outcome of a call is decided from the body alone; the HTTP status
//! line is kept in the snapshot for inspection but never consulted.
//! An empty body is its own outcome: neither a success nor an error.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::http::{HttpRequest, ResponseSnapshot};

/// What a call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The body decoded and is not an error document.
    Success(Value),
    /// The body is an error document with a non-200 `status` and a `detail`.
    /// `body` is the full decoded document.
    ApiError { status: i64, detail: String, body: Value },
    /// The response had no body.
    Empty,
    /// The body was not valid JSON. Counts as a failure, not as a success
    /// without data.
    Malformed { error: String },
    /// The exchange itself failed; no response was received.
    Transport(String),
    /// The args could not be serialized; nothing was sent.
    InvalidArgs(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Error text for this outcome, empty for `Success` and `Empty`.
    pub fn error(&self) -> String {
        match self {
            Outcome::Success(_) | Outcome::Empty => String::new(),
            Outcome::ApiError { status, detail, .. } => format!("{status}: {detail}"),
            Outcome::Malformed { error } => format!("invalid JSON in response: {error}"),
            Outcome::Transport(message) => message.clone(),
            Outcome::InvalidArgs(message) => format!("could not encode request arguments: {message}"),
        }
    }

    /// Decoded body, for `Success` and `ApiError`.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Success(value) | Outcome::ApiError { body: value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Outcome::Success(value) | Outcome::ApiError { body: value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Record of one completed call: what was sent, what came back, and how it
/// was interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub request: HttpRequest,
    pub response: ResponseSnapshot,
    pub outcome: Outcome,
}

impl Exchange {
    /// True only when the body decoded and was not an error document.
    pub fn success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Error text, empty when the call succeeded or returned no body.
    pub fn error(&self) -> String {
        self.outcome.error()
    }

    /// Decoded body; `None` when nothing could be decoded.
    pub fn value(&self) -> Option<&Value> {
        self.outcome.value()
    }

    pub fn into_value(self) -> Option<Value> {
        self.outcome.into_value()
    }

    /// Deserialize the decoded body into `T`. Returns `None` when there is
    /// no body or it does not have the shape of `T`.
    pub fn data<T: DeserializeOwned>(&self) -> Option<T> {
        self.value().and_then(|value| T::deserialize(value).ok())
    }
}

/// Error document the API returns in place of a resource.
#[derive(Debug, Deserialize)]
struct Problem {
    status: ProblemStatus,
    detail: Value,
}

impl Problem {
    /// Detail text: strings as-is, anything else as its JSON text.
    fn detail(self) -> Option<String> {
        match self.detail {
            Value::Null => None,
            Value::String(text) => Some(text),
            other => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProblemStatus {
    Code(i64),
    Float(f64),
    Text(String),
}

impl ProblemStatus {
    /// Numeric status; fractions are truncated and a non-numeric string
    /// counts as 0.
    fn code(&self) -> i64 {
        match self {
            ProblemStatus::Code(code) => *code,
            ProblemStatus::Float(code) => *code as i64,
            ProblemStatus::Text(text) => {
                let text = text.trim();
                text.parse()
                    .or_else(|_| text.parse::<f64>().map(|code| code as i64))
                    .unwrap_or(0)
            }
        }
    }
}

/// Interpret a raw response body.
pub fn parse_body(body: &str) -> Outcome {
    if body.is_empty() {
        return Outcome::Empty;
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => return Outcome::Malformed { error: e.to_string() },
    };

    if !value.is_object() {
        return Outcome::Success(value);
    }

    let Ok(problem) = Problem::deserialize(&value) else {
        return Outcome::Success(value);
    };
    let status = problem.status.code();
    match problem.detail() {
        Some(detail) if status != 200 => Outcome::ApiError { status, detail, body: value },
        _ => Outcome::Success(value),
    }
}
