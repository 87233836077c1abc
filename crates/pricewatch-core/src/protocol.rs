//! Session action protocol.
//!
//! Clients send `{"action": ..., ...}` objects as text frames:
//!
//! - `{"action": "elements"}` returns the full catalog.
//! - `{"action": "data_for_page", "page_number": 2}` returns one page of priced items.
//! - `{"action": "disconnect"}`, a missing action, or any unknown action closes the session.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{DispatchError, ProtocolError};
use crate::items::PageRequest;

pub const ACTION_ELEMENTS: &str = "elements";
pub const ACTION_DATA_FOR_PAGE: &str = "data_for_page";
pub const ACTION_DISCONNECT: &str = "disconnect";

/// The closed set of actions a session understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Elements,
    DataForPage,
    Disconnect,
}

impl Action {
    /// Resolve an action tag. Missing and unrecognized tags both resolve to `Disconnect`.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.unwrap_or(ACTION_DISCONNECT) {
            ACTION_ELEMENTS => Self::Elements,
            ACTION_DATA_FOR_PAGE => Self::DataForPage,
            _ => Self::Disconnect,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elements => ACTION_ELEMENTS,
            Self::DataForPage => ACTION_DATA_FOR_PAGE,
            Self::Disconnect => ACTION_DISCONNECT,
        }
    }
}

/// A decoded inbound session message.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionMessage {
    fields: Map<String, Value>,
}

impl SessionMessage {
    /// Decode a text frame. Anything other than a JSON object is rejected.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(ProtocolError::NotAnObject),
        }
    }

    /// The raw `action` tag, if present and a string.
    pub fn action_tag(&self) -> Option<&str> {
        self.fields.get("action").and_then(Value::as_str)
    }

    pub fn action(&self) -> Action {
        Action::from_tag(self.action_tag())
    }

    /// Read `page_number`, defaulting to page 1 when absent or null.
    ///
    /// Integers beyond the `i64` range saturate; the pagination engine clamps them.
    pub fn page_request(&self) -> Result<PageRequest, DispatchError> {
        match self.fields.get("page_number") {
            None | Some(Value::Null) => Ok(PageRequest::default()),
            Some(Value::Number(n)) => saturating_page(n)
                .map(|page_number| PageRequest { page_number })
                .ok_or_else(|| {
                    DispatchError::InvalidParams(format!("page_number must be an integer, got {n}"))
                }),
            Some(v) => Err(DispatchError::InvalidParams(format!(
                "page_number must be an integer, got {v}"
            ))),
        }
    }
}

fn saturating_page(n: &serde_json::Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.as_u64().is_some() {
        return Some(i64::MAX);
    }
    // Integer literals below i64::MIN arrive as f64.
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f < i64::MIN as f64 => Some(i64::MIN),
        _ => None,
    }
}

/// Error payload sent back when one exchange fails.
///
/// Wire shape: `{"error": {"code": "UPSTREAM_UNAVAILABLE", "message": "..."}}`
#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

impl From<&DispatchError> for ErrorPayload {
    fn from(err: &DispatchError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}
