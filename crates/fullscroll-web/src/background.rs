#![forbid(unsafe_code)]

//! Background entry point: answers `set-browser-fullscreen` requests.

use std::rc::Rc;

use fullscroll_core::message::RelayMessage;
use fullscroll_core::relay::{WindowId, WindowRelay};
use tracing::{info, trace, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::chrome::{ChromeWindows, ExtensionApi, parse_message, send_response, sender_window_id};
use crate::logging;

/// Register the relay's `runtime.onMessage` and `windows.onRemoved`
/// listeners. Without an extension windows API this only logs a warning.
#[wasm_bindgen(js_name = startBackground)]
pub fn start_background() -> Result<(), JsValue> {
    logging::install_panic_hook();
    logging::init(None);

    let Some(extension) = ExtensionApi::detect() else {
        warn!(target: "fullscroll::background", "extension api unavailable");
        return Ok(());
    };
    let Some(windows) = extension.windows() else {
        warn!(target: "fullscroll::background", "background windows api unavailable");
        return Ok(());
    };
    let relay: Rc<WindowRelay<ChromeWindows>> = Rc::new(WindowRelay::new(windows));

    let on_message = {
        let relay = Rc::clone(&relay);
        Closure::<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>::new(
            move |message: JsValue, sender: JsValue, reply: JsValue| -> JsValue {
                let Some(RelayMessage::SetBrowserFullscreen(request)) = parse_message(&message)
                else {
                    // Not ours: leave the channel to other listeners.
                    return JsValue::FALSE;
                };
                let window_id = sender_window_id(&sender);
                trace!(target: "fullscroll::background", window_id, ?request, "request received");
                let relay = Rc::clone(&relay);
                spawn_local(async move {
                    let response = relay.set_fullscreen(window_id, request).await;
                    send_response(&reply, &response);
                });
                // Keeps `sendResponse` valid until the async reply.
                JsValue::TRUE
            },
        )
    };
    extension.add_listener("runtime", "onMessage", on_message.as_ref().unchecked_ref())?;
    on_message.forget();

    let on_removed = {
        let relay = Rc::clone(&relay);
        Closure::<dyn FnMut(JsValue)>::new(move |window_id: JsValue| {
            if let Some(id) = window_id.as_f64() {
                relay.forget_window(id as WindowId);
            }
        })
    };
    match extension.add_listener("windows", "onRemoved", on_removed.as_ref().unchecked_ref()) {
        Ok(()) => on_removed.forget(),
        Err(err) => {
            warn!(target: "fullscroll::background", error = ?err, "windows.onRemoved unavailable");
        }
    }

    info!(target: "fullscroll::background", "window relay started");
    Ok(())
}
