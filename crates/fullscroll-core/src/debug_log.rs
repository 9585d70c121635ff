#![forbid(unsafe_code)]

//! Opt-in diagnostics: a bounded log ring buffer and control metrics.
//!
//! Enabled per page load by a query flag (`?fullscroll-debug=1`). Read-only
//! with respect to the controller: nothing here feeds back into activation.

use core::time::Duration;
use std::collections::VecDeque;

use serde::Serialize;
use url::Url;

/// One captured log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEntry {
    /// Host wall-clock time since the Unix epoch.
    pub at: Duration,
    pub line: String,
}

/// Bounded FIFO of log lines; the oldest line is dropped on overflow.
#[derive(Debug, Clone)]
pub struct DebugLog {
    capacity: usize,
    entries: VecDeque<DebugEntry>,
    dropped: u64,
}

impl DebugLog {
    /// `capacity` is clamped to at least one entry.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity.min(1024)),
            dropped: 0,
        }
    }

    pub fn push(&mut self, at: Duration, line: impl Into<String>) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.dropped = self.dropped.saturating_add(1);
        }
        self.entries.push_back(DebugEntry {
            at,
            line: line.into(),
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn entries(&self) -> impl Iterator<Item = &DebugEntry> {
        self.entries.iter()
    }

    /// Render as downloadable text, one `[<ms>] line` per entry.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if self.dropped > 0 {
            out.push_str(&format!("# {} earlier lines dropped\n", self.dropped));
        }
        for entry in &self.entries {
            out.push_str(&format!("[{}] {}\n", entry.at.as_millis(), entry.line));
        }
        out
    }
}

/// Whether `href` carries `flag` set to `1`/`true`/empty.
#[must_use]
pub fn is_enabled_for(href: &str, flag: &str) -> bool {
    let Ok(url) = Url::parse(href) else {
        return false;
    };
    url.query_pairs()
        .any(|(key, value)| key == flag && matches!(value.as_ref(), "" | "1" | "true"))
}

/// Snapshot of the controls the controller adjusts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControlMetrics {
    pub active: bool,
    pub pending_navigation: bool,
    pub relay_in_flight: u32,
    pub snapshotted_elements: usize,
    pub snapshotted_properties: usize,
    pub waiting_for: Vec<&'static str>,
    pub player_width: Option<f64>,
    pub base_width: Option<f64>,
    pub scale: Option<f64>,
}
