#![forbid(unsafe_code)]

//! Global `tracing` subscriber for both extension contexts.

use std::sync::{Arc, Mutex};

use fullscroll_core::debug_log::DebugLog;
use tracing::level_filters::LevelFilter;
use wasm_bindgen::JsValue;
use web_time::{SystemTime, UNIX_EPOCH};

use crate::line_writer::{LineSink, MakeLineWriter};

/// Shared debug ring buffer, present only in debug mode.
pub(crate) type SharedDebugLog = Arc<Mutex<DebugLog>>;

const PREFIX: &str = "[fullscroll]";

struct ConsoleSink {
    debug: Option<SharedDebugLog>,
}

impl LineSink for ConsoleSink {
    fn emit(&self, line: &str) {
        web_sys::console::log_1(&JsValue::from_str(&format!("{PREFIX}{line}")));
        if let Some(debug) = &self.debug {
            let at = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            match debug.lock() {
                Ok(mut log) => log.push(at, line),
                Err(poisoned) => poisoned.into_inner().push(at, line),
            }
        }
    }
}

/// Install the subscriber. Debug mode lowers the level to `DEBUG` and
/// mirrors every line into `debug`. A second call is a no-op.
pub(crate) fn init(debug: Option<SharedDebugLog>) {
    let level = if debug.is_some() {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let subscriber = tracing_subscriber::fmt()
        .with_writer(MakeLineWriter::new(Arc::new(ConsoleSink { debug })))
        .with_max_level(level)
        .without_time()
        .with_ansi(false)
        .with_target(true)
        .finish();
    // Fails only when a subscriber is already installed.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Route panics to `console.error`. Installed once per context.
pub(crate) fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = match info.location() {
                Some(loc) => format!(
                    "{PREFIX} panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                ),
                None => format!("{PREFIX} panic: {info}"),
            };
            web_sys::console::error_1(&JsValue::from_str(&msg));
        }));
    });
}

/// Render the debug log for export.
pub(crate) fn debug_text(debug: &SharedDebugLog) -> String {
    match debug.lock() {
        Ok(log) => log.to_text(),
        Err(poisoned) => poisoned.into_inner().to_text(),
    }
}
