#![forbid(unsafe_code)]

//! Background relay between the page controller and native window state.
//!
//! The relay owns one piece of process-wide state: the display state each
//! window had before it was driven into fullscreen, so a later deactivate can
//! put it back. Every outcome, including host failures, is returned as a
//! [`FullscreenResponse`]; nothing propagates past [`WindowRelay::set_fullscreen`].
//!
//! The host API is asynchronous. The remembered-state map sits in a
//! `RefCell` that is only borrowed between awaits, never across one, so
//! interleaved requests on a single-threaded executor are safe.

use core::cell::RefCell;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{RelayError, WindowApiError};
use crate::message::{FullscreenResponse, SetFullscreenRequest, WindowState};

/// Host window identifier.
pub type WindowId = i32;

/// What the host reports about a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowInfo {
    /// `None` when the host reported no (or an unknown) state.
    pub state: Option<WindowState>,
}

/// Host window-management API.
#[allow(async_fn_in_trait)]
pub trait WindowApi {
    /// `Ok(None)` when the window does not exist.
    async fn get(&self, id: WindowId) -> Result<Option<WindowInfo>, WindowApiError>;

    async fn update(&self, id: WindowId, state: WindowState) -> Result<(), WindowApiError>;
}

/// The background relay.
#[derive(Debug)]
pub struct WindowRelay<A> {
    api: A,
    prior: RefCell<HashMap<WindowId, WindowState>>,
}

impl<A: WindowApi> WindowRelay<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            prior: RefCell::new(HashMap::new()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// State remembered for `id`, if any.
    #[must_use]
    pub fn remembered(&self, id: WindowId) -> Option<WindowState> {
        self.prior.borrow().get(&id).copied()
    }

    /// Number of windows with a remembered state.
    #[must_use]
    pub fn tracked_windows(&self) -> usize {
        self.prior.borrow().len()
    }

    /// Drop the record for a closed window.
    pub fn forget_window(&self, id: WindowId) {
        if self.prior.borrow_mut().remove(&id).is_some() {
            debug!(
                target: "fullscroll::relay",
                window_id = id,
                "forgot prior state of closed window"
            );
        }
    }

    /// Drive `window_id` into or out of native fullscreen.
    pub async fn set_fullscreen(
        &self,
        window_id: Option<WindowId>,
        request: SetFullscreenRequest,
    ) -> FullscreenResponse {
        match self.apply(window_id, request).await {
            Ok(response) => {
                debug!(
                    target: "fullscroll::relay",
                    window_id,
                    activate = request.activate,
                    preserve_state = request.preserve_state,
                    response = ?response,
                    "fullscreen request applied"
                );
                response
            }
            Err(err) => {
                warn!(
                    target: "fullscroll::relay",
                    window_id,
                    activate = request.activate,
                    reason = %err,
                    "fullscreen request failed"
                );
                err.into()
            }
        }
    }

    async fn apply(
        &self,
        window_id: Option<WindowId>,
        request: SetFullscreenRequest,
    ) -> Result<FullscreenResponse, RelayError> {
        let id = window_id.ok_or(RelayError::MissingWindowId)?;
        let info = self
            .api
            .get(id)
            .await
            .map_err(RelayError::from_get)?
            .ok_or(RelayError::WindowNotFound)?;
        if request.activate {
            self.activate(id, info).await
        } else {
            self.deactivate(id, info, request.preserve_state).await
        }
    }

    async fn activate(
        &self,
        id: WindowId,
        info: WindowInfo,
    ) -> Result<FullscreenResponse, RelayError> {
        match info.state {
            Some(WindowState::Fullscreen) => {
                // Re-recorded on purpose: a later deactivate leaves it fullscreen.
                self.remember(id, WindowState::Fullscreen);
                return Ok(FullscreenResponse::already(WindowState::Fullscreen));
            }
            Some(state) => self.remember(id, state),
            None => {}
        }
        self.api
            .update(id, WindowState::Fullscreen)
            .await
            .map_err(RelayError::from_update)?;
        Ok(FullscreenResponse::applied(WindowState::Fullscreen))
    }

    async fn deactivate(
        &self,
        id: WindowId,
        info: WindowInfo,
        preserve_state: bool,
    ) -> Result<FullscreenResponse, RelayError> {
        let previous = self.remembered(id).unwrap_or(WindowState::Normal);
        if !preserve_state {
            self.prior.borrow_mut().remove(&id);
        }
        // Still fullscreen, or moved out-of-band to something other than the
        // remembered state: both go back to the remembered state.
        let needs_update =
            info.state == Some(WindowState::Fullscreen) || info.state != Some(previous);
        if !needs_update {
            return Ok(FullscreenResponse::already(previous));
        }
        self.api
            .update(id, previous)
            .await
            .map_err(RelayError::from_update)?;
        Ok(FullscreenResponse::applied(previous))
    }

    fn remember(&self, id: WindowId, state: WindowState) {
        self.prior.borrow_mut().insert(id, state);
    }
}
