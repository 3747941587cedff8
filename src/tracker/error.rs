//! Issue-tracker error types

use thiserror::Error;

/// Tracker error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TrackerError {
    pub kind: TrackerErrorKind,
    pub message: String,
}

impl TrackerError {
    pub fn new(kind: TrackerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TrackerErrorKind::Network, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(TrackerErrorKind::Rejected, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TrackerErrorKind::Unknown, message)
    }

    /// Classify a non-success HTTP status returned by the tracker
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => TrackerErrorKind::Auth,
            404 => TrackerErrorKind::NotFound,
            400 | 409 | 422 => TrackerErrorKind::Rejected,
            500..=599 => TrackerErrorKind::ServerError,
            _ => TrackerErrorKind::Unknown,
        };
        let detail = summarize_error_body(body);
        Self::new(kind, format!("HTTP {status}: {detail}"))
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerErrorKind {
    /// Connection failures, timeouts
    Network,
    /// Bad credentials or missing permission (401, 403)
    Auth,
    /// Project or issue does not exist (404)
    NotFound,
    /// Tracker refused the request (400, 409, 422)
    Rejected,
    /// Server error (5xx)
    ServerError,
    Unknown,
}

/// Pull the human-readable parts out of a Jira error payload.
///
/// Jira answers failures with `{"errorMessages": [...], "errors": {field: msg}}`.
/// Anything else is passed through as-is.
fn summarize_error_body(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    let mut parts: Vec<String> = value
        .get("errorMessages")
        .and_then(|m| m.as_array())
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| m.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    if let Some(fields) = value.get("errors").and_then(|e| e.as_object()) {
        for (field, message) in fields {
            if let Some(message) = message.as_str() {
                parts.push(format!("{field}: {message}"));
            }
        }
    }

    if parts.is_empty() {
        body.trim().to_string()
    } else {
        parts.join("; ")
    }
}
