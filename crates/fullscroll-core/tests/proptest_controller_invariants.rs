#![forbid(unsafe_code)]

//! Property-based invariants for the controller.
//!
//! 1. Any event sequence followed by an exit leaves every inline style exactly
//!    as it was before the first activation.
//! 2. The marker class and resize listener are present iff the controller is
//!    active, after every event.
//! 3. Across arbitrary resizes the scrubber width tracks the player width and
//!    the base width never drifts.

mod common;

use std::collections::{BTreeMap, HashMap};

use common::*;
use fullscroll_core::controller::{Timer, Trigger};
use fullscroll_core::input::{KeyInput, LinkClick};
use fullscroll_core::scrubber::format_px;
use fullscroll_core::snapshot::StyleValue;
use proptest::prelude::*;

// ── Strategies ────────────────────────────────────────────────────────────

const ELEMENTS: [ElementId; 4] = [CONTENT, PLAYER_CONTAINER, FULL_BLEED, PROGRESS_BAR];

const PROPERTIES: [&str; 10] = [
    "margin-top",
    "padding-top",
    "margin-left",
    "max-width",
    "top",
    "max-height",
    "left",
    "width",
    "transform",
    "--fullscroll-scrubber-scale",
];

const VALUES: [&str; 4] = ["12px", "auto", "none", "calc(100% - 24px)"];

type Styles = HashMap<ElementId, BTreeMap<String, StyleValue>>;

/// Inline styles the site might have set before we touch anything.
fn original_styles() -> impl Strategy<Value = Styles> {
    prop::collection::vec(
        (0..ELEMENTS.len(), 0..PROPERTIES.len(), 0..VALUES.len(), any::<bool>()),
        0..16,
    )
    .prop_map(|decls| {
        let mut styles = Styles::new();
        for (element, property, value, important) in decls {
            styles.entry(ELEMENTS[element]).or_default().insert(
                PROPERTIES[property].to_owned(),
                StyleValue::new(VALUES[value], important),
            );
        }
        styles
    })
}

#[derive(Debug, Clone)]
enum Event {
    Hotkey,
    Escape,
    Button,
    DoubleClick,
    NativeFullscreen,
    LinkToVideo,
    LinkAway,
    NavigateFinish(bool),
    Popstate(bool),
    Resize(u32),
    FireResize,
    FireExpiry,
    Settle,
    PageHide,
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        3 => Just(Event::Hotkey),
        1 => Just(Event::Escape),
        1 => Just(Event::Button),
        1 => Just(Event::DoubleClick),
        1 => Just(Event::NativeFullscreen),
        1 => Just(Event::LinkToVideo),
        1 => Just(Event::LinkAway),
        1 => any::<bool>().prop_map(Event::NavigateFinish),
        1 => any::<bool>().prop_map(Event::Popstate),
        3 => (320u32..4000).prop_map(Event::Resize),
        2 => Just(Event::FireResize),
        1 => Just(Event::FireExpiry),
        2 => Just(Event::Settle),
        1 => Just(Event::PageHide),
    ]
}

fn destination(watchable: bool) -> &'static str {
    if watchable { OTHER_WATCH_URL } else { HOME_URL }
}

fn apply(c: &mut fullscroll_core::Controller<FakePage>, event: &Event) {
    match event {
        Event::Hotkey => {
            c.on_key_down(&KeyInput::new("f"));
        }
        Event::Escape => {
            c.on_key_down(&KeyInput::new("Escape"));
        }
        Event::Button => {
            c.on_fullscreen_button_click();
        }
        Event::DoubleClick => {
            c.on_video_double_click();
        }
        Event::NativeFullscreen => c.on_native_fullscreen_change(true),
        Event::LinkToVideo => c.on_link_click(&LinkClick::new(OTHER_WATCH_URL)),
        Event::LinkAway => c.on_link_click(&LinkClick::new(HOME_URL)),
        Event::NavigateFinish(watchable) => {
            let href = destination(*watchable);
            c.host_mut().url = href.to_owned();
            c.on_navigate_finish(href);
        }
        Event::Popstate(watchable) => {
            let href = destination(*watchable);
            c.host_mut().url = href.to_owned();
            c.on_history_navigation(href);
        }
        Event::Resize(width) => {
            c.host_mut().widths.insert(PLAYER, f64::from(*width));
            c.on_resize();
        }
        Event::FireResize => {
            fire(c, Timer::ResizeFrame);
        }
        Event::FireExpiry => {
            fire(c, Timer::PendingNavigationExpiry);
        }
        Event::Settle => {
            if c.relay_in_flight() > 0 {
                settle(c);
            }
        }
        Event::PageHide => c.on_page_hide(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 1 + 2. Exit restores styles; marker and listener follow the state
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn any_session_restores_original_styles(
        styles in original_styles(),
        events in prop::collection::vec(event(), 1..40),
    ) {
        let mut page = FakePage::watch_page();
        page.styles = styles.clone();
        let mut c = controller(page);

        for event in &events {
            apply(&mut c, event);
            prop_assert_eq!(c.host().marker, c.is_active());
            prop_assert_eq!(c.host().resize_listener, c.is_active());
        }
        c.deactivate(Trigger::Escape, false);

        prop_assert_eq!(&c.host().styles, &styles);
        prop_assert!(!c.host().marker);
        prop_assert!(c.host().timers.is_empty());
        prop_assert!(c.host().waits.is_empty());
        prop_assert!(!c.is_pending_navigation());
        prop_assert_eq!(c.metrics().snapshotted_properties, 0);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// 3. Scrubber tracks the player without compounding
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn scrubber_width_tracks_player_width(
        widths in prop::collection::vec(320u32..4000, 1..24),
    ) {
        let mut c = controller(FakePage::watch_page());
        c.activate(Trigger::Hotkey);
        deliver_synthetic_resize(&mut c);
        let base = c.layout().map(|layout| layout.base_width);
        prop_assert_eq!(base, Some(1256.0));

        for width in widths {
            let width = f64::from(width);
            c.host_mut().widths.insert(PLAYER, width);
            c.on_resize();
            prop_assert!(fire(&mut c, Timer::ResizeFrame));

            let expected = format_px(width);
            prop_assert_eq!(c.host().style_value(PROGRESS_BAR, "width"), Some(expected.as_str()));
            prop_assert_eq!(c.layout().map(|layout| layout.base_width), base);
            let scale = c.layout().map(|layout| layout.scale).unwrap_or_default();
            prop_assert!((scale * 1256.0 - width).abs() < 1e-6);
        }
    }
}
