#![forbid(unsafe_code)]

//! The emulated-fullscreen state machine.
//!
//! [`Controller`] has two states, inactive and active, and owns everything
//! that changes between them: the marker class, the inline style overrides
//! (with their [`StyleSnapshots`]), the cached scrubber base width, the
//! resize coalescer and the pending-navigation flag.
//!
//! All DOM work, timers and messaging go through [`PageHost`]. The host calls
//! back into the controller (`on_*` methods) when the page produces an event
//! or when something it was asked to schedule fires. Both transitions are
//! idempotent: asking for the current state performs no host call at all.

use core::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::coalesce::{Coalescer, Schedule};
use crate::config::ControllerConfig;
pub use crate::config::Target;
use crate::css::emulation_stylesheet;
use crate::debug_log::ControlMetrics;
use crate::error::{ConfigError, NotifyError};
use crate::input::{Disposition, KeyInput, LinkClick};
use crate::message::{FullscreenResponse, SetFullscreenRequest};
use crate::page::PageKind;
use crate::scrubber::{BaseWidthSources, ScrubberLayout};
use crate::snapshot::{StyleSnapshots, StyleValue};

/// Host timers the controller arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Coalesced scrubber correction after resizes.
    ResizeFrame,
    /// Expiry of the pending-navigation flag.
    PendingNavigationExpiry,
}

/// What caused a transition; carried into logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    FullscreenButton,
    Hotkey,
    DoubleClick,
    NativeFullscreen,
    Escape,
    NavigationClick,
    HistoryNavigation,
    NavigateFinish,
    PageHide,
}

impl Trigger {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FullscreenButton => "fullscreen_button",
            Self::Hotkey => "hotkey",
            Self::DoubleClick => "double_click",
            Self::NativeFullscreen => "native_fullscreen",
            Self::Escape => "escape",
            Self::NavigationClick => "navigation_click",
            Self::HistoryNavigation => "history_navigation",
            Self::NavigateFinish => "navigate_finish",
            Self::PageHide => "page_hide",
        }
    }
}

/// Everything the controller needs from the page.
///
/// Implementations perform the request synchronously where the DOM allows it.
/// `dispatch_synthetic_resize` must not call back into the controller before
/// the current controller call has returned.
pub trait PageHost {
    type Element: Clone + PartialEq;

    /// Current absolute URL of the page.
    fn location(&self) -> String;

    fn find(&self, target: Target) -> Option<Self::Element>;

    /// Inline style value of `property`, `None` when not set.
    fn inline_style(&self, element: &Self::Element, property: &str) -> Option<StyleValue>;

    fn set_inline_style(&mut self, element: &Self::Element, property: &str, value: &StyleValue);

    fn remove_inline_style(&mut self, element: &Self::Element, property: &str);

    /// Rendered width in CSS pixels.
    fn width(&self, element: &Self::Element) -> f64;

    fn viewport_width(&self) -> f64;

    /// Inject `css` under `id` unless an element with that id exists.
    fn install_stylesheet(&mut self, id: &str, css: &str);

    /// Add or remove `class` on the root and body elements.
    fn set_marker_class(&mut self, class: &str, active: bool);

    fn set_resize_listener(&mut self, enabled: bool);

    fn dispatch_synthetic_resize(&mut self);

    /// Arm `timer`, replacing any armed instance of it.
    fn schedule(&mut self, timer: Timer, when: Schedule);

    fn cancel(&mut self, timer: Timer);

    /// Report `target` through `on_element_ready` once it exists, or through
    /// `on_element_wait_timeout` after `timeout`.
    fn await_element(&mut self, target: Target, timeout: Duration);

    /// Abandon every outstanding `await_element` without callbacks.
    fn cancel_element_waits(&mut self);

    /// (Re)start the page-wide watch for the native fullscreen button.
    fn arm_fullscreen_button_watch(&mut self);

    fn exit_native_fullscreen(&mut self);

    /// Send the request to the relay; the outcome comes back through
    /// `on_relay_settled`.
    fn notify_relay(&mut self, request: SetFullscreenRequest);
}

/// Emulated-fullscreen controller for one page instance.
pub struct Controller<H: PageHost> {
    host: H,
    config: ControllerConfig,
    stylesheet: String,
    active: bool,
    snapshots: StyleSnapshots<H::Element>,
    base_width: Option<f64>,
    layout: Option<ScrubberLayout>,
    resize: Coalescer,
    pending_navigation: bool,
    waiting: Vec<Target>,
    relay_in_flight: u32,
}

impl<H: PageHost> Controller<H> {
    pub fn new(host: H, config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let stylesheet = emulation_stylesheet(&config.marker_class);
        Ok(Self {
            host,
            config,
            stylesheet,
            active: false,
            snapshots: StyleSnapshots::new(),
            base_width: None,
            layout: None,
            resize: Coalescer::new(Schedule::NextFrame),
            pending_navigation: false,
            waiting: Vec::new(),
            relay_in_flight: 0,
        })
    }

    /// Inject the stylesheet and start watching for the fullscreen button.
    /// Call once the document has a body.
    pub fn start(&mut self) {
        self.host
            .install_stylesheet(&self.config.style_element_id, &self.stylesheet);
        self.host.arm_fullscreen_button_watch();
        debug!(target: "fullscroll::controller", "controller started");
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub const fn is_pending_navigation(&self) -> bool {
        self.pending_navigation
    }

    #[must_use]
    pub const fn relay_in_flight(&self) -> u32 {
        self.relay_in_flight
    }

    #[must_use]
    pub const fn layout(&self) -> Option<ScrubberLayout> {
        self.layout
    }

    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub const fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    #[must_use]
    pub fn page_kind(&self) -> PageKind {
        self.config.site.classify(&self.host.location())
    }

    #[must_use]
    pub fn metrics(&self) -> ControlMetrics {
        ControlMetrics {
            active: self.active,
            pending_navigation: self.pending_navigation,
            relay_in_flight: self.relay_in_flight,
            snapshotted_elements: self.snapshots.len(),
            snapshotted_properties: self.snapshots.property_count(),
            waiting_for: self.waiting.iter().map(|target| target.as_str()).collect(),
            player_width: self.layout.map(|layout| layout.player_width),
            base_width: self.base_width,
            scale: self.layout.map(|layout| layout.scale),
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Flip the state. Returns whether a transition happened.
    pub fn toggle(&mut self, trigger: Trigger) -> bool {
        if self.active {
            self.deactivate(trigger, false)
        } else {
            self.activate(trigger)
        }
    }

    /// Enter emulated fullscreen. Returns `false` when already active or the
    /// page does not allow it.
    pub fn activate(&mut self, trigger: Trigger) -> bool {
        if self.active {
            trace!(target: "fullscroll::controller", trigger = trigger.as_str(), "already active");
            return false;
        }
        let kind = self.page_kind();
        if !kind.is_watchable() {
            debug!(
                target: "fullscroll::controller",
                trigger = trigger.as_str(),
                page = kind.as_str(),
                "activation refused on this page"
            );
            return false;
        }

        self.active = true;
        self.host
            .install_stylesheet(&self.config.style_element_id, &self.stylesheet);
        self.host.set_marker_class(&self.config.marker_class, true);
        self.apply_layout_overrides();
        self.base_width = None;
        self.apply_scrubber_correction();
        self.host.set_resize_listener(true);
        self.resize.skip_next();
        self.host.dispatch_synthetic_resize();
        self.notify(SetFullscreenRequest::activate());

        info!(
            target: "fullscroll::controller",
            trigger = trigger.as_str(),
            snapshotted = self.snapshots.property_count(),
            waiting = self.waiting.len(),
            "emulated fullscreen on"
        );
        true
    }

    /// Leave emulated fullscreen. Returns `false` when already inactive.
    pub fn deactivate(&mut self, trigger: Trigger, preserve_state: bool) -> bool {
        if !self.active {
            trace!(target: "fullscroll::controller", trigger = trigger.as_str(), "already inactive");
            return false;
        }

        self.active = false;
        self.host.cancel_element_waits();
        self.waiting.clear();
        if self.resize.reset() {
            self.host.cancel(Timer::ResizeFrame);
        }
        self.host.set_resize_listener(false);
        let restored = self.restore_snapshots();
        self.base_width = None;
        self.layout = None;
        self.host.set_marker_class(&self.config.marker_class, false);
        self.clear_pending_navigation();
        self.host.dispatch_synthetic_resize();
        self.notify(SetFullscreenRequest::deactivate(preserve_state));

        info!(
            target: "fullscroll::controller",
            trigger = trigger.as_str(),
            restored,
            preserve_state,
            "emulated fullscreen off"
        );
        true
    }

    // -----------------------------------------------------------------------
    // Page events
    // -----------------------------------------------------------------------

    pub fn on_key_down(&mut self, key: &KeyInput) -> Disposition {
        if key.is_escape() {
            return Disposition::consumed(self.deactivate(Trigger::Escape, false));
        }
        if !self.config.is_hotkey(&key.key)
            || key.repeat
            || key.modifiers.has_command()
            || key.focus.is_typing()
        {
            return Disposition::Ignored;
        }
        if !self.active && !self.page_kind().is_watchable() {
            return Disposition::Ignored;
        }
        if self.relay_in_flight > 0 {
            // Swallowed so the page does not go native in the meantime.
            debug!(
                target: "fullscroll::controller",
                in_flight = self.relay_in_flight,
                "hotkey ignored while a fullscreen request is pending"
            );
            return Disposition::Consumed;
        }
        self.toggle(Trigger::Hotkey);
        Disposition::Consumed
    }

    /// Intercepted click on the player's native fullscreen button.
    pub fn on_fullscreen_button_click(&mut self) -> Disposition {
        Disposition::consumed(self.toggle(Trigger::FullscreenButton))
    }

    pub fn on_video_double_click(&mut self) -> Disposition {
        Disposition::consumed(self.toggle(Trigger::DoubleClick))
    }

    /// The document entered or left native fullscreen behind our back.
    pub fn on_native_fullscreen_change(&mut self, is_fullscreen: bool) {
        if !is_fullscreen {
            return;
        }
        if self.active || self.page_kind().is_watchable() {
            self.host.exit_native_fullscreen();
            self.activate(Trigger::NativeFullscreen);
        }
    }

    pub fn on_link_click(&mut self, link: &LinkClick) {
        if !self.active || !link.is_plain_navigation() {
            return;
        }
        if self.config.site.is_watchable(&link.href) {
            self.set_pending_navigation(&link.href);
        } else {
            self.deactivate(Trigger::NavigationClick, false);
        }
    }

    /// The site's in-app navigation finished at `href`.
    pub fn on_navigate_finish(&mut self, href: &str) {
        self.clear_pending_navigation();
        // The player subtree is replaced, not reloaded.
        self.host.arm_fullscreen_button_watch();
        if !self.active {
            return;
        }
        if self.config.site.is_watchable(href) {
            self.apply_layout_overrides();
            self.apply_scrubber_correction();
        } else {
            self.deactivate(Trigger::NavigateFinish, false);
        }
    }

    /// Browser history navigation (`popstate`) to `href`.
    pub fn on_history_navigation(&mut self, href: &str) {
        if self.active && !self.config.site.is_watchable(href) {
            self.deactivate(Trigger::HistoryNavigation, false);
        }
    }

    /// The page is being torn down.
    pub fn on_page_hide(&mut self) {
        let preserve_state = self.pending_navigation;
        self.deactivate(Trigger::PageHide, preserve_state);
    }

    pub fn on_resize(&mut self) {
        if !self.active {
            return;
        }
        if let Some(when) = self.resize.trigger() {
            self.host.schedule(Timer::ResizeFrame, when);
        }
    }

    pub fn on_timer(&mut self, timer: Timer) {
        match timer {
            Timer::ResizeFrame => {
                if self.resize.fire() {
                    self.apply_scrubber_correction();
                }
            }
            Timer::PendingNavigationExpiry => {
                if self.pending_navigation {
                    self.pending_navigation = false;
                    debug!(target: "fullscroll::controller", "pending navigation expired");
                }
            }
        }
    }

    pub fn on_element_ready(&mut self, target: Target) {
        self.waiting.retain(|waiting| *waiting != target);
        if !self.active {
            return;
        }
        debug!(target: "fullscroll::controller", element = target.as_str(), "element appeared");
        if self.config.override_targets().contains(&target) {
            self.apply_overrides_for(target);
        }
        if matches!(target, Target::ProgressBar | Target::Player | Target::Scrubber) {
            self.apply_scrubber_correction();
        }
    }

    pub fn on_element_wait_timeout(&mut self, target: Target) {
        self.waiting.retain(|waiting| *waiting != target);
        debug!(
            target: "fullscroll::controller",
            element = target.as_str(),
            timeout_ms = self.config.element_wait_timeout_ms,
            "gave up waiting for element"
        );
    }

    /// Outcome of an earlier `notify_relay`. Never changes the state.
    pub fn on_relay_settled(&mut self, result: Result<FullscreenResponse, NotifyError>) {
        self.relay_in_flight = self.relay_in_flight.saturating_sub(1);
        match result {
            Ok(FullscreenResponse::Applied { state, already }) => debug!(
                target: "fullscroll::controller",
                window_state = state.as_str(),
                already,
                "relay applied window state"
            ),
            Ok(FullscreenResponse::Failed { reason }) => warn!(
                target: "fullscroll::controller",
                reason = %reason,
                active = self.active,
                "relay could not change window state"
            ),
            Err(err) => warn!(
                target: "fullscroll::controller",
                error = %err,
                active = self.active,
                "relay notification failed"
            ),
        }
    }

    // -----------------------------------------------------------------------
    // DOM bookkeeping
    // -----------------------------------------------------------------------

    fn apply_layout_overrides(&mut self) {
        for target in self.config.override_targets() {
            self.apply_overrides_for(target);
        }
    }

    fn apply_overrides_for(&mut self, target: Target) {
        let Some(element) = self.host.find(target) else {
            self.wait_for(target);
            return;
        };
        let overrides: Vec<(String, String)> = self
            .config
            .overrides
            .iter()
            .filter(|item| item.target == target)
            .map(|item| (item.property.clone(), item.value.clone()))
            .collect();
        for (property, value) in overrides {
            self.override_style(&element, &property, &value);
        }
    }

    fn apply_scrubber_correction(&mut self) {
        if !self.active {
            return;
        }
        let Some(bar) = self.host.find(Target::ProgressBar) else {
            self.wait_for(Target::ProgressBar);
            return;
        };
        let Some(player) = self.host.find(Target::Player) else {
            self.wait_for(Target::Player);
            return;
        };
        let player_width = self.host.width(&player);
        let base_width = match self.base_width {
            Some(width) => width,
            None => {
                let sources = BaseWidthSources {
                    scrubber: self
                        .host
                        .find(Target::Scrubber)
                        .map(|scrubber| self.host.width(&scrubber)),
                    container: Some(self.host.width(&bar)),
                    viewport: self.host.viewport_width(),
                };
                let Some(width) = sources.resolve() else {
                    debug!(target: "fullscroll::controller", ?sources, "no usable base width");
                    return;
                };
                self.base_width = Some(width);
                width
            }
        };
        let Some(layout) = ScrubberLayout::compute(player_width, base_width) else {
            trace!(target: "fullscroll::controller", player_width, "player has no usable width yet");
            return;
        };
        for (property, value) in layout.declarations() {
            self.override_style(&bar, property, &value);
        }
        trace!(
            target: "fullscroll::controller",
            player_width = layout.player_width,
            base_width = layout.base_width,
            scale = layout.scale,
            "scrubber corrected"
        );
        self.layout = Some(layout);
    }

    fn override_style(&mut self, element: &H::Element, property: &str, value: &str) {
        if !self.snapshots.contains(element, property) {
            let original = self.host.inline_style(element, property);
            self.snapshots.record(element, property, original);
        }
        self.host
            .set_inline_style(element, property, &StyleValue::new(value, true));
    }

    fn restore_snapshots(&mut self) -> usize {
        let mut restored = 0;
        for snapshot in self.snapshots.drain() {
            for (property, original) in snapshot.properties {
                match original {
                    Some(value) => self
                        .host
                        .set_inline_style(&snapshot.element, &property, &value),
                    None => self.host.remove_inline_style(&snapshot.element, &property),
                }
                restored += 1;
            }
        }
        restored
    }

    fn wait_for(&mut self, target: Target) {
        if self.waiting.contains(&target) {
            return;
        }
        self.waiting.push(target);
        self.host
            .await_element(target, self.config.element_wait_timeout());
        debug!(target: "fullscroll::controller", element = target.as_str(), "waiting for element");
    }

    fn set_pending_navigation(&mut self, href: &str) {
        if self.pending_navigation {
            self.host.cancel(Timer::PendingNavigationExpiry);
        }
        self.pending_navigation = true;
        self.host.schedule(
            Timer::PendingNavigationExpiry,
            Schedule::After(self.config.pending_navigation_timeout()),
        );
        debug!(target: "fullscroll::controller", href, "navigation to watchable page pending");
    }

    fn clear_pending_navigation(&mut self) {
        if core::mem::take(&mut self.pending_navigation) {
            self.host.cancel(Timer::PendingNavigationExpiry);
        }
    }

    fn notify(&mut self, request: SetFullscreenRequest) {
        self.relay_in_flight = self.relay_in_flight.saturating_add(1);
        self.host.notify_relay(request);
    }
}
