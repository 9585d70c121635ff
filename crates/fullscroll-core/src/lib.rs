#![forbid(unsafe_code)]

//! Platform-independent core of `fullscroll`.
//!
//! `fullscroll` keeps a video page scrollable while its player fills the
//! window. The page-side [`controller::Controller`] fakes fullscreen with a
//! marker class and a handful of inline style overrides, and asks the
//! background [`relay::WindowRelay`] to put the real browser window into
//! fullscreen alongside it.
//!
//! Design goals:
//! - **Host-driven**: the embedding page pushes DOM events in and performs
//!   DOM work through [`controller::PageHost`]; nothing here touches JS.
//! - **Deterministic**: timers and animation frames are requested through the
//!   host and delivered back as explicit calls, so every scenario can be
//!   replayed in native tests.
//! - **Best effort**: nothing is fatal. Relay failures are logged and the
//!   emulated layout stays authoritative.

pub mod coalesce;
pub mod config;
pub mod controller;
pub mod css;
pub mod debug_log;
pub mod error;
pub mod input;
pub mod message;
pub mod page;
pub mod relay;
pub mod scrubber;
pub mod snapshot;

pub use config::{ControllerConfig, SiteConfig};
pub use controller::{Controller, PageHost, Target, Timer, Trigger};
pub use error::{ConfigError, NotifyError, RelayError, WindowApiError};
pub use message::{FullscreenResponse, RelayMessage, SetFullscreenRequest, WindowState};
pub use relay::{WindowApi, WindowId, WindowInfo, WindowRelay};
