#![forbid(unsafe_code)]

//! [`PageHost`] over the live DOM.
//!
//! Callbacks that must reach the controller (timers, element waits, relay
//! replies) go through [`crate::content::with_controller`], never through a
//! reference held here. The synthetic `resize` is only recorded; the runtime
//! dispatches it once the controller borrow has been released.

use core::time::Duration;
use std::collections::HashMap;
use std::rc::Rc;

use fullscroll_core::coalesce::Schedule;
use fullscroll_core::config::{ControllerConfig, Selectors};
use fullscroll_core::controller::{PageHost, Target, Timer};
use fullscroll_core::error::NotifyError;
use fullscroll_core::message::SetFullscreenRequest;
use fullscroll_core::snapshot::StyleValue;
use futures::channel::oneshot;
use js_sys::Function;
use tracing::{debug, trace, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, Event, HtmlElement, Window};

use crate::await_element::{WaitError, await_element};
use crate::chrome::{ExtensionApi, error_text};
use crate::content::{ButtonWatch, with_controller};
use crate::timer::TimerGuard;

pub(crate) struct DomHost {
    window: Window,
    document: Document,
    selectors: Selectors,
    relay_timeout: Duration,
    extension: Option<ExtensionApi>,
    button_watch: Rc<ButtonWatch>,
    resize_listener: Closure<dyn FnMut(Event)>,
    resize_attached: bool,
    synthetic_resize: bool,
    timers: HashMap<Timer, (u64, TimerGuard)>,
    timer_generation: u64,
    waits: HashMap<Target, oneshot::Sender<()>>,
}

impl DomHost {
    pub(crate) fn new(
        window: Window,
        document: Document,
        config: &ControllerConfig,
        extension: Option<ExtensionApi>,
        button_watch: Rc<ButtonWatch>,
    ) -> Self {
        let resize_listener = Closure::<dyn FnMut(Event)>::new(|_event: Event| {
            with_controller(|controller| controller.on_resize());
        });
        Self {
            window,
            document,
            selectors: config.selectors.clone(),
            relay_timeout: config.relay_reply_timeout(),
            extension,
            button_watch,
            resize_listener,
            resize_attached: false,
            synthetic_resize: false,
            timers: HashMap::new(),
            timer_generation: 0,
            waits: HashMap::new(),
        }
    }

    /// Whether a synthetic `resize` was requested since the last call.
    pub(crate) fn take_synthetic_resize(&mut self) -> bool {
        core::mem::take(&mut self.synthetic_resize)
    }

    /// Claim an armed timer if `generation` is still its current arming.
    pub(crate) fn claim_timer(&mut self, timer: Timer, generation: u64) -> bool {
        match self.timers.get(&timer) {
            Some((current, _)) if *current == generation => {
                self.timers.remove(&timer);
                true
            }
            _ => false,
        }
    }

    /// Forget waits whose future has finished.
    pub(crate) fn prune_waits(&mut self) {
        self.waits.retain(|_, cancel| !cancel.is_canceled());
    }

    fn html(element: &Element) -> Option<&HtmlElement> {
        element.dyn_ref::<HtmlElement>()
    }

    fn arm(&self, when: Schedule, callback: impl FnMut() + 'static) -> Result<TimerGuard, JsValue> {
        match when {
            Schedule::NextFrame => TimerGuard::next_frame(&self.window, callback),
            Schedule::After(delay) => TimerGuard::timeout(&self.window, delay, callback),
        }
    }
}

impl PageHost for DomHost {
    type Element = Element;

    fn location(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn find(&self, target: Target) -> Option<Element> {
        match self.document.query_selector(self.selectors.get(target)) {
            Ok(element) => element,
            Err(err) => {
                warn!(
                    target: "fullscroll::dom",
                    element = target.as_str(),
                    error = %error_text(&err),
                    "selector rejected"
                );
                None
            }
        }
    }

    fn inline_style(&self, element: &Element, property: &str) -> Option<StyleValue> {
        let style = Self::html(element)?.style();
        let value = style.get_property_value(property).ok()?;
        if value.is_empty() {
            return None;
        }
        let important = style.get_property_priority(property) == "important";
        Some(StyleValue::new(value, important))
    }

    fn set_inline_style(&mut self, element: &Element, property: &str, value: &StyleValue) {
        let Some(html) = Self::html(element) else {
            return;
        };
        let priority = if value.important { "important" } else { "" };
        if let Err(err) = html
            .style()
            .set_property_with_priority(property, &value.value, priority)
        {
            debug!(target: "fullscroll::dom", property, error = %error_text(&err), "set style failed");
        }
    }

    fn remove_inline_style(&mut self, element: &Element, property: &str) {
        let Some(html) = Self::html(element) else {
            return;
        };
        if let Err(err) = html.style().remove_property(property) {
            debug!(target: "fullscroll::dom", property, error = %error_text(&err), "remove style failed");
        }
    }

    fn width(&self, element: &Element) -> f64 {
        element.get_bounding_client_rect().width()
    }

    fn viewport_width(&self) -> f64 {
        self.window
            .inner_width()
            .ok()
            .and_then(|width| width.as_f64())
            .unwrap_or(0.0)
    }

    fn install_stylesheet(&mut self, id: &str, css: &str) {
        if self.document.get_element_by_id(id).is_some() {
            return;
        }
        let style = match self.document.create_element("style") {
            Ok(style) => style,
            Err(err) => {
                warn!(target: "fullscroll::dom", error = %error_text(&err), "cannot create style element");
                return;
            }
        };
        style.set_id(id);
        style.set_text_content(Some(css));
        let parent: Option<Element> = self
            .document
            .head()
            .map(Into::into)
            .or_else(|| self.document.document_element());
        match parent.map(|parent| parent.append_child(&style)) {
            Some(Ok(_)) => debug!(target: "fullscroll::dom", id, "stylesheet installed"),
            Some(Err(err)) => {
                warn!(target: "fullscroll::dom", error = %error_text(&err), "cannot install stylesheet");
            }
            None => warn!(target: "fullscroll::dom", "no element to hold the stylesheet"),
        }
    }

    fn set_marker_class(&mut self, class: &str, active: bool) {
        let root = self.document.document_element();
        let body: Option<Element> = self.document.body().map(Into::into);
        for element in [root, body].into_iter().flatten() {
            let classes = element.class_list();
            let result = if active {
                classes.add_1(class)
            } else {
                classes.remove_1(class)
            };
            if let Err(err) = result {
                warn!(target: "fullscroll::dom", class, error = %error_text(&err), "marker class update failed");
            }
        }
    }

    fn set_resize_listener(&mut self, enabled: bool) {
        if enabled == self.resize_attached {
            return;
        }
        let callback: &Function = self.resize_listener.as_ref().unchecked_ref();
        let result = if enabled {
            self.window
                .add_event_listener_with_callback("resize", callback)
        } else {
            self.window
                .remove_event_listener_with_callback("resize", callback)
        };
        match result {
            Ok(()) => self.resize_attached = enabled,
            Err(err) => {
                warn!(target: "fullscroll::dom", enabled, error = %error_text(&err), "resize listener update failed");
            }
        }
    }

    fn dispatch_synthetic_resize(&mut self) {
        self.synthetic_resize = true;
    }

    fn schedule(&mut self, timer: Timer, when: Schedule) {
        self.cancel(timer);
        self.timer_generation = self.timer_generation.wrapping_add(1);
        let generation = self.timer_generation;
        let armed = self.arm(when, move || {
            with_controller(|controller| {
                if controller.host_mut().claim_timer(timer, generation) {
                    controller.on_timer(timer);
                }
            });
        });
        match armed {
            Ok(guard) => {
                trace!(target: "fullscroll::dom", ?timer, ?when, "timer armed");
                self.timers.insert(timer, (generation, guard));
            }
            Err(err) => {
                warn!(target: "fullscroll::dom", ?timer, error = %error_text(&err), "cannot arm timer");
            }
        }
    }

    fn cancel(&mut self, timer: Timer) {
        // Dropping the guard clears the browser timer and frees its callback.
        if self.timers.remove(&timer).is_some() {
            trace!(target: "fullscroll::dom", ?timer, "timer cancelled");
        }
    }

    fn await_element(&mut self, target: Target, timeout: Duration) {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        // Replacing an older sender cancels that wait.
        self.waits.insert(target, cancel_tx);
        let window = self.window.clone();
        let document = self.document.clone();
        let selector = self.selectors.get(target).to_owned();
        spawn_local(async move {
            let outcome = await_element(&window, &document, &selector, timeout, cancel_rx).await;
            match outcome {
                Ok(_) => {
                    with_controller(|controller| {
                        controller.host_mut().prune_waits();
                        controller.on_element_ready(target);
                    });
                }
                Err(WaitError::Cancelled) => {}
                Err(err) => {
                    if let WaitError::Host(reason) = &err {
                        warn!(target: "fullscroll::dom", element = target.as_str(), reason = %reason, "element wait failed");
                    }
                    with_controller(|controller| {
                        controller.host_mut().prune_waits();
                        controller.on_element_wait_timeout(target);
                    });
                }
            }
        });
    }

    fn cancel_element_waits(&mut self) {
        self.waits.clear();
    }

    fn arm_fullscreen_button_watch(&mut self) {
        self.button_watch.arm();
    }

    fn exit_native_fullscreen(&mut self) {
        if self.document.fullscreen_element().is_some() {
            self.document.exit_fullscreen();
        }
    }

    fn notify_relay(&mut self, request: SetFullscreenRequest) {
        let extension = self.extension.clone();
        let window = self.window.clone();
        let timeout = self.relay_timeout;
        spawn_local(async move {
            let result = match extension {
                Some(extension) => extension.request_fullscreen(&window, request, timeout).await,
                None => Err(NotifyError::SendFailed("extension api unavailable".into())),
            };
            with_controller(|controller| controller.on_relay_settled(result));
        });
    }
}
