#![forbid(unsafe_code)]

//! Content-script runtime: owns the controller and turns page events into
//! controller calls.

use core::time::Duration;
use std::cell::{OnceCell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex};

use fullscroll_core::config::ControllerConfig;
use fullscroll_core::controller::{Controller, PageHost, Target};
use fullscroll_core::debug_log::{DebugLog, is_enabled_for};
use fullscroll_core::input::{Disposition, FocusContext, KeyInput, LinkClick, Modifiers};
use js_sys::{Array, Reflect};
use tracing::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::WasmClosure;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Blob, BlobPropertyBag, Document, Element, Event, EventTarget, HtmlAnchorElement, HtmlElement,
    KeyboardEvent, MouseEvent, MutationObserver, MutationObserverInit, Url, Window,
};

use crate::await_element::sleep;
use crate::chrome::{ExtensionApi, error_text};
use crate::dom::DomHost;
use crate::logging::{self, SharedDebugLog};

thread_local! {
    static RUNTIME: OnceCell<Rc<ContentRuntime>> = const { OnceCell::new() };
}

/// Run `f` against the page controller.
///
/// `None` before start-up or when the controller is already borrowed
/// further up the stack; the event is dropped in that case.
pub(crate) fn with_controller<R>(f: impl FnOnce(&mut Controller<DomHost>) -> R) -> Option<R> {
    let runtime = RUNTIME.with(|slot| slot.get().cloned())?;
    runtime.with_controller(f)
}

struct ContentRuntime {
    window: Window,
    document: Document,
    controller: RefCell<Controller<DomHost>>,
}

impl ContentRuntime {
    fn with_controller<R>(&self, f: impl FnOnce(&mut Controller<DomHost>) -> R) -> Option<R> {
        let (result, synthetic_resize) = {
            let Ok(mut controller) = self.controller.try_borrow_mut() else {
                warn!(target: "fullscroll::content", "controller busy, event dropped");
                return None;
            };
            let result = f(&mut controller);
            (result, controller.host_mut().take_synthetic_resize())
        };
        // Dispatched after the borrow ends: resize listeners run synchronously.
        if synthetic_resize {
            self.dispatch_resize();
        }
        Some(result)
    }

    fn dispatch_resize(&self) {
        let dispatched = Event::new("resize").and_then(|event| self.window.dispatch_event(&event));
        if let Err(err) = dispatched {
            warn!(target: "fullscroll::content", error = %error_text(&err), "synthetic resize failed");
        }
    }
}

// ---------------------------------------------------------------------------
// Fullscreen button watch
// ---------------------------------------------------------------------------

const BOUND_ATTRIBUTE: &str = "data-fullscroll-bound";

/// Watches the document for the player's fullscreen button and intercepts
/// its clicks in the capture phase.
///
/// Kept apart from the controller so observer callbacks never need the
/// controller borrow.
pub(crate) struct ButtonWatch {
    document: Document,
    selector: String,
    on_click: Closure<dyn FnMut(Event)>,
    observer: RefCell<Option<(MutationObserver, Closure<dyn FnMut(Array, MutationObserver)>)>>,
}

impl ButtonWatch {
    fn new(document: Document, selector: &str) -> Rc<Self> {
        let on_click = Closure::<dyn FnMut(Event)>::new(|event: Event| {
            let disposition = with_controller(|controller| controller.on_fullscreen_button_click());
            if disposition.is_some_and(Disposition::is_consumed) {
                event.prevent_default();
                event.stop_immediate_propagation();
            }
        });
        Rc::new(Self {
            document,
            selector: selector.to_owned(),
            on_click,
            observer: RefCell::new(None),
        })
    }

    /// Bind the current button, or observe the document until one appears.
    pub(crate) fn arm(self: &Rc<Self>) {
        self.disarm();
        if self.bind_if_present() {
            return;
        }
        let Some(root) = self.document.document_element() else {
            return;
        };
        let watch: Weak<Self> = Rc::downgrade(self);
        let callback = Closure::<dyn FnMut(Array, MutationObserver)>::new(
            move |_records: Array, observer: MutationObserver| {
                if watch.upgrade().is_some_and(|watch| watch.bind_if_present()) {
                    observer.disconnect();
                }
            },
        );
        let observer = match MutationObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(err) => {
                warn!(target: "fullscroll::content", error = %error_text(&err), "cannot create button observer");
                return;
            }
        };
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        if let Err(err) = observer.observe_with_options(&root, &options) {
            warn!(target: "fullscroll::content", error = %error_text(&err), "cannot observe document");
            return;
        }
        debug!(target: "fullscroll::content", "watching for fullscreen button");
        *self.observer.borrow_mut() = Some((observer, callback));
    }

    fn disarm(&self) {
        let previous = self.observer.borrow_mut().take();
        if let Some((observer, _callback)) = previous {
            observer.disconnect();
        }
    }

    fn bind_if_present(&self) -> bool {
        let Ok(Some(button)) = self.document.query_selector(&self.selector) else {
            return false;
        };
        if button.has_attribute(BOUND_ATTRIBUTE) {
            return true;
        }
        let bound = button.add_event_listener_with_callback_and_bool(
            "click",
            self.on_click.as_ref().unchecked_ref(),
            true,
        );
        match bound {
            Ok(()) => {
                if let Err(err) = button.set_attribute(BOUND_ATTRIBUTE, "") {
                    debug!(target: "fullscroll::content", error = %error_text(&err), "cannot mark bound button");
                }
                debug!(target: "fullscroll::content", "fullscreen button intercepted");
                true
            }
            Err(err) => {
                warn!(target: "fullscroll::content", error = %error_text(&err), "cannot bind fullscreen button");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Start the page controller. `config_json` is an optional, possibly
/// partial, `ControllerConfig` document.
#[wasm_bindgen(js_name = startContentScript)]
pub fn start_content_script(config_json: Option<String>) -> Result<(), JsValue> {
    logging::install_panic_hook();
    let config = match config_json.as_deref() {
        Some(raw) => ControllerConfig::from_json(raw),
        None => Ok(ControllerConfig::default()),
    }
    .map_err(|err| JsValue::from_str(&err.to_string()))?;

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let href = window.location().href()?;
    let debug_log: Option<SharedDebugLog> = is_enabled_for(&href, &config.debug_query_flag)
        .then(|| Arc::new(Mutex::new(DebugLog::new(config.debug_log_capacity))));
    logging::init(debug_log.clone());

    if RUNTIME.with(|slot| slot.get().is_some()) {
        return Err(JsValue::from_str("content script already started"));
    }

    let button_watch = ButtonWatch::new(
        document.clone(),
        config.selectors.get(Target::FullscreenButton),
    );
    let host = DomHost::new(
        window.clone(),
        document.clone(),
        &config,
        ExtensionApi::detect(),
        button_watch,
    );
    let controller = Controller::new(host, config.clone())
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    let runtime = Rc::new(ContentRuntime {
        window,
        document,
        controller: RefCell::new(controller),
    });
    RUNTIME
        .with(|slot| slot.set(Rc::clone(&runtime)))
        .map_err(|_| JsValue::from_str("content script already started"))?;

    wire_page_events(&runtime, &config)?;
    if let Some(debug_log) = &debug_log {
        export_debug_api(&runtime, debug_log)?;
    }

    if runtime.document.body().is_some() {
        runtime.with_controller(|controller| controller.start());
    } else {
        listen(&runtime.document, "DOMContentLoaded", false, |_event| {
            with_controller(|controller| controller.start());
        })?;
    }

    info!(
        target: "fullscroll::content",
        href = %href,
        debug = debug_log.is_some(),
        "content script started"
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Page events
// ---------------------------------------------------------------------------

/// Add a listener that lives as long as the page.
fn listen(
    target: &EventTarget,
    event: &str,
    capture: bool,
    handler: impl FnMut(Event) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback_and_bool(
        event,
        closure.as_ref().unchecked_ref(),
        capture,
    )?;
    closure.forget();
    Ok(())
}

fn swallow(event: &Event) {
    event.prevent_default();
    event.stop_immediate_propagation();
}

fn event_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

fn focus_context(document: &Document) -> FocusContext {
    let Some(active) = document.active_element() else {
        return FocusContext::default();
    };
    let mut focus = FocusContext::element(active.tag_name());
    focus.content_editable = active
        .dyn_ref::<HtmlElement>()
        .is_some_and(HtmlElement::is_content_editable);
    focus.editable_ancestor = active
        .closest("[contenteditable]:not([contenteditable='false'])")
        .ok()
        .flatten()
        .is_some();
    focus
}

/// Whether the link's `target` sends it away from this tab.
fn opens_elsewhere(anchor: &HtmlAnchorElement) -> bool {
    let target = anchor.target();
    !matches!(target.as_str(), "" | "_self" | "_top" | "_parent") || anchor.has_attribute("download")
}

fn current_href() -> Option<String> {
    with_controller(|controller| controller.host().location())
}

fn wire_page_events(runtime: &ContentRuntime, config: &ControllerConfig) -> Result<(), JsValue> {
    let window = &runtime.window;
    let document = &runtime.document;

    let focus_document = document.clone();
    listen(window, "keydown", true, move |event| {
        let Some(keyboard) = event.dyn_ref::<KeyboardEvent>() else {
            return;
        };
        let key = KeyInput {
            key: keyboard.key(),
            modifiers: Modifiers::from_flags(
                keyboard.shift_key(),
                keyboard.alt_key(),
                keyboard.ctrl_key(),
                keyboard.meta_key(),
            ),
            repeat: keyboard.repeat(),
            focus: focus_context(&focus_document),
        };
        if with_controller(|controller| controller.on_key_down(&key))
            .is_some_and(Disposition::is_consumed)
        {
            swallow(&event);
        }
    })?;

    listen(document, "click", true, |event| {
        let Some(mouse) = event.dyn_ref::<MouseEvent>() else {
            return;
        };
        let Some(anchor) = event_element(&event)
            .and_then(|element| element.closest("a[href]").ok().flatten())
            .and_then(|element| element.dyn_into::<HtmlAnchorElement>().ok())
        else {
            return;
        };
        let link = LinkClick {
            href: anchor.href(),
            button: mouse.button(),
            modifiers: Modifiers::from_flags(
                mouse.shift_key(),
                mouse.alt_key(),
                mouse.ctrl_key(),
                mouse.meta_key(),
            ),
            opens_elsewhere: opens_elsewhere(&anchor),
        };
        with_controller(|controller| controller.on_link_click(&link));
    })?;

    let surface = config.selectors.get(Target::VideoSurface).to_owned();
    listen(document, "dblclick", true, move |event| {
        let on_surface = event_element(&event)
            .and_then(|element| element.closest(&surface).ok().flatten())
            .is_some();
        if on_surface
            && with_controller(|controller| controller.on_video_double_click())
                .is_some_and(Disposition::is_consumed)
        {
            swallow(&event);
        }
    })?;

    let fullscreen_document = document.clone();
    listen(document, "fullscreenchange", false, move |_event| {
        let is_fullscreen = fullscreen_document.fullscreen_element().is_some();
        with_controller(|controller| controller.on_native_fullscreen_change(is_fullscreen));
    })?;

    // Fired by the site once its in-app navigation has rendered.
    listen(document, "yt-navigate-finish", false, |_event| {
        if let Some(href) = current_href() {
            with_controller(|controller| controller.on_navigate_finish(&href));
        }
    })?;

    listen(window, "popstate", false, |_event| {
        if let Some(href) = current_href() {
            with_controller(|controller| controller.on_history_navigation(&href));
        }
    })?;

    listen(window, "pagehide", false, |_event| {
        with_controller(|controller| controller.on_page_hide());
    })?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Debug exports
// ---------------------------------------------------------------------------

const DEBUG_LOG_FILENAME: &str = "fullscroll-debug.log";

fn export<T: ?Sized + WasmClosure>(
    window: &Window,
    name: &str,
    closure: Closure<T>,
) -> Result<(), JsValue> {
    Reflect::set(window, &JsValue::from_str(name), closure.as_ref())?;
    closure.forget();
    Ok(())
}

fn export_debug_api(runtime: &ContentRuntime, debug_log: &SharedDebugLog) -> Result<(), JsValue> {
    let log = Arc::clone(debug_log);
    export(
        &runtime.window,
        "fullscrollDebugLog",
        Closure::<dyn FnMut() -> JsValue>::new(move || JsValue::from_str(&logging::debug_text(&log))),
    )?;

    export(
        &runtime.window,
        "fullscrollDebugMetrics",
        Closure::<dyn FnMut() -> JsValue>::new(|| {
            match with_controller(|controller| serde_json::to_string(&controller.metrics())) {
                Some(Ok(json)) => JsValue::from_str(&json),
                _ => JsValue::NULL,
            }
        }),
    )?;

    let log = Arc::clone(debug_log);
    let window = runtime.window.clone();
    let document = runtime.document.clone();
    export(
        &runtime.window,
        "fullscrollDownloadDebugLog",
        Closure::<dyn FnMut()>::new(move || {
            let text = logging::debug_text(&log);
            if let Err(err) = download_text(&window, &document, DEBUG_LOG_FILENAME, &text) {
                warn!(target: "fullscroll::content", error = %error_text(&err), "debug log download failed");
            }
        }),
    )?;

    debug!(target: "fullscroll::content", "debug exports installed");
    Ok(())
}

fn download_text(
    window: &Window,
    document: &Document,
    filename: &str,
    text: &str,
) -> Result<(), JsValue> {
    let parts = Array::of1(&JsValue::from_str(text));
    let options = BlobPropertyBag::new();
    options.set_type("text/plain");
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = Url::create_object_url_with_blob(&blob)?;
    let anchor: HtmlAnchorElement = document
        .create_element("a")?
        .dyn_into()
        .map_err(JsValue::from)?;
    anchor.set_href(&url);
    anchor.set_download(filename);
    anchor.click();

    // Revoked once the browser has picked the download up.
    let window = window.clone();
    spawn_local(async move {
        sleep(&window, Duration::from_secs(1)).await;
        let _ = Url::revoke_object_url(&url);
    });
    Ok(())
}
