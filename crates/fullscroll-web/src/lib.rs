#![forbid(unsafe_code)]

//! Browser bindings for `fullscroll`.
//!
//! Two `wasm-bindgen` entry points, one per extension context:
//!
//! - `startContentScript(configJson?)` runs in the video page. It implements
//!   [`fullscroll_core::PageHost`] over the DOM and feeds page events into a
//!   [`fullscroll_core::Controller`].
//! - `startBackground()` runs in the extension background context and
//!   answers `set-browser-fullscreen` messages with a
//!   [`fullscroll_core::WindowRelay`] over `chrome.windows`.
//!
//! Everything that touches JS is compiled only on `wasm32`. The log line
//! writer is plain Rust and is tested natively.

pub mod line_writer;

#[cfg(target_arch = "wasm32")]
mod await_element;
#[cfg(target_arch = "wasm32")]
mod background;
#[cfg(target_arch = "wasm32")]
mod chrome;
#[cfg(target_arch = "wasm32")]
mod content;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod logging;
#[cfg(target_arch = "wasm32")]
mod timer;

#[cfg(target_arch = "wasm32")]
pub use background::start_background;
#[cfg(target_arch = "wasm32")]
pub use content::start_content_script;
