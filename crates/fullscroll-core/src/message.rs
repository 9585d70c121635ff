#![forbid(unsafe_code)]

//! Message contract between the page-side controller and the window relay.
//!
//! Wire shapes (JSON, as carried by the extension messaging channel):
//!
//! ```text
//! request:  { "type": "set-browser-fullscreen", "activate": bool, "preserveState"?: bool }
//! response: { "ok": true,  "state": string, "already"?: bool }
//!           { "ok": false, "reason": string }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Message type tag understood by the relay.
pub const SET_BROWSER_FULLSCREEN: &str = "set-browser-fullscreen";

/// Native display state of a browser window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowState {
    Normal,
    Minimized,
    Maximized,
    Fullscreen,
    LockedFullscreen,
}

impl WindowState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Minimized => "minimized",
            Self::Maximized => "maximized",
            Self::Fullscreen => "fullscreen",
            Self::LockedFullscreen => "locked-fullscreen",
        }
    }

    /// Parse a host-reported state string. Unknown strings yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "normal" => Some(Self::Normal),
            "minimized" => Some(Self::Minimized),
            "maximized" => Some(Self::Maximized),
            "fullscreen" => Some(Self::Fullscreen),
            "locked-fullscreen" => Some(Self::LockedFullscreen),
            _ => None,
        }
    }
}

impl core::fmt::Display for WindowState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `set-browser-fullscreen` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetFullscreenRequest {
    pub activate: bool,
    /// Keep the remembered prior window state across a deactivate.
    #[serde(default, skip_serializing_if = "is_false")]
    pub preserve_state: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl SetFullscreenRequest {
    #[must_use]
    pub const fn activate() -> Self {
        Self {
            activate: true,
            preserve_state: false,
        }
    }

    #[must_use]
    pub const fn deactivate(preserve_state: bool) -> Self {
        Self {
            activate: false,
            preserve_state,
        }
    }
}

/// Every message the relay understands, tagged by `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RelayMessage {
    #[serde(rename = "set-browser-fullscreen")]
    SetBrowserFullscreen(SetFullscreenRequest),
}

impl RelayMessage {
    /// Parse a JSON message, returning `None` for anything that is not ours.
    #[must_use]
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<SetFullscreenRequest> for RelayMessage {
    fn from(request: SetFullscreenRequest) -> Self {
        Self::SetBrowserFullscreen(request)
    }
}

/// Relay reply to a [`SetFullscreenRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ResponseWire", try_from = "ResponseWire")]
pub enum FullscreenResponse {
    /// The window is in `state`; `already` means no update was needed.
    Applied { state: WindowState, already: bool },
    /// Nothing changed; `reason` is a reason code or host error text.
    Failed { reason: String },
}

impl FullscreenResponse {
    #[must_use]
    pub const fn applied(state: WindowState) -> Self {
        Self::Applied {
            state,
            already: false,
        }
    }

    #[must_use]
    pub const fn already(state: WindowState) -> Self {
        Self::Applied {
            state,
            already: true,
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Parse the JSON wire form.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<RelayError> for FullscreenResponse {
    fn from(err: RelayError) -> Self {
        Self::Failed {
            reason: err.reason(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResponseWire {
    ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    already: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl From<FullscreenResponse> for ResponseWire {
    fn from(response: FullscreenResponse) -> Self {
        match response {
            FullscreenResponse::Applied { state, already } => Self {
                ok: true,
                state: Some(state.as_str().to_owned()),
                already: already.then_some(true),
                reason: None,
            },
            FullscreenResponse::Failed { reason } => Self {
                ok: false,
                state: None,
                already: None,
                reason: Some(reason),
            },
        }
    }
}

impl TryFrom<ResponseWire> for FullscreenResponse {
    type Error = String;

    fn try_from(wire: ResponseWire) -> Result<Self, Self::Error> {
        if !wire.ok {
            return Ok(Self::Failed {
                reason: wire.reason.unwrap_or_else(|| "unknown".to_owned()),
            });
        }
        let raw = wire.state.ok_or_else(|| "missing state".to_owned())?;
        let state = WindowState::parse(&raw).ok_or_else(|| format!("unknown state {raw:?}"))?;
        Ok(Self::Applied {
            state,
            already: wire.already.unwrap_or(false),
        })
    }
}
