#![forbid(unsafe_code)]

//! Error types shared by the controller, the relay, and configuration.

use thiserror::Error;

/// Failure reported by the host window-management API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowApiError {
    /// The host exposes no usable window API in this context.
    #[error("window api unavailable")]
    Unavailable,
    /// Host error text (may be empty when the host gave none).
    #[error("{0}")]
    Host(String),
}

/// Why a `set-browser-fullscreen` request failed. `Display` is the reason
/// string sent back over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("missing-window-id")]
    MissingWindowId,
    #[error("window-not-found")]
    WindowNotFound,
    #[error("windows-api-unavailable")]
    ApiUnavailable,
    #[error("{0}")]
    GetWindowFailed(String),
    #[error("{0}")]
    UpdateFailed(String),
}

impl RelayError {
    /// Map a failed `get` call, falling back to `get-window-failed`.
    #[must_use]
    pub fn from_get(err: WindowApiError) -> Self {
        match err {
            WindowApiError::Unavailable => Self::ApiUnavailable,
            WindowApiError::Host(text) => Self::GetWindowFailed(or_code(text, "get-window-failed")),
        }
    }

    /// Map a failed `update` call, falling back to `update-failed`.
    #[must_use]
    pub fn from_update(err: WindowApiError) -> Self {
        match err {
            WindowApiError::Unavailable => Self::ApiUnavailable,
            WindowApiError::Host(text) => Self::UpdateFailed(or_code(text, "update-failed")),
        }
    }

    /// Reason string carried in `{ ok: false, reason }`.
    #[must_use]
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

fn or_code(text: String, code: &str) -> String {
    if text.trim().is_empty() {
        code.to_owned()
    } else {
        text
    }
}

/// Why the controller could not get an answer from the relay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("send-failed: {0}")]
    SendFailed(String),
    #[error("relay-timeout after {0} ms")]
    Timeout(u64),
    #[error("malformed relay response: {0}")]
    MalformedResponse(String),
}

/// Invalid controller configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("hotkey must be a single ASCII letter, got {0:?}")]
    InvalidHotkey(char),
    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },
    #[error("{field} is not a valid class or id token: {value:?}")]
    InvalidToken { field: &'static str, value: String },
    #[error("selector for {0} is empty")]
    EmptySelector(&'static str),
    #[error("origin {0:?} is not a valid URL origin")]
    InvalidOrigin(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_match_wire_contract() {
        assert_eq!(RelayError::MissingWindowId.reason(), "missing-window-id");
        assert_eq!(RelayError::WindowNotFound.reason(), "window-not-found");
        assert_eq!(RelayError::ApiUnavailable.reason(), "windows-api-unavailable");
    }

    #[test]
    fn empty_host_text_falls_back_to_code() {
        assert_eq!(
            RelayError::from_get(WindowApiError::Host(String::new())).reason(),
            "get-window-failed"
        );
        assert_eq!(
            RelayError::from_update(WindowApiError::Host("  ".into())).reason(),
            "update-failed"
        );
    }

    #[test]
    fn host_text_is_passed_through() {
        let err = RelayError::from_get(WindowApiError::Host("No window with id: 7.".into()));
        assert_eq!(err.reason(), "No window with id: 7.");
        assert_eq!(
            RelayError::from_update(WindowApiError::Unavailable),
            RelayError::ApiUnavailable
        );
    }
}
