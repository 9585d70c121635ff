#![forbid(unsafe_code)]

//! Extension API access through `js_sys::Reflect`.
//!
//! Resolves `chrome` (or `browser` on Firefox) at runtime and uses the
//! promise-returning forms of `runtime.sendMessage`, `windows.get` and
//! `windows.update`.

use core::pin::pin;
use core::time::Duration;

use fullscroll_core::error::{NotifyError, WindowApiError};
use fullscroll_core::message::{FullscreenResponse, RelayMessage, SetFullscreenRequest, WindowState};
use fullscroll_core::relay::{WindowApi, WindowId, WindowInfo};
use futures::future::{Either, select};
use js_sys::{Function, JSON, Object, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::Window;

use crate::await_element::sleep;

/// Best-effort text of a thrown JS value.
pub(crate) fn error_text(err: &JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_default()
}

fn get(target: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn method(target: &JsValue, name: &str) -> Option<Function> {
    get(target, name).and_then(|value| value.dyn_into::<Function>().ok())
}

/// Serialize through `serde_json` into a plain JS object.
fn to_js(json: &str) -> Result<JsValue, JsValue> {
    JSON::parse(json)
}

fn from_js(value: &JsValue) -> Option<String> {
    JSON::stringify(value).ok().and_then(|text| text.as_string())
}

/// The extension API namespace (`chrome` or `browser`).
#[derive(Debug, Clone)]
pub(crate) struct ExtensionApi {
    root: JsValue,
}

impl ExtensionApi {
    /// `None` outside an extension context.
    pub(crate) fn detect() -> Option<Self> {
        let global = js_sys::global();
        ["chrome", "browser"]
            .into_iter()
            .filter_map(|name| get(&global, name))
            .find(|root| get(root, "runtime").is_some())
            .map(|root| Self { root })
    }

    fn namespace(&self, name: &str) -> Option<JsValue> {
        get(&self.root, name)
    }

    pub(crate) fn windows(&self) -> Option<ChromeWindows> {
        self.namespace("windows").map(|windows| ChromeWindows { windows })
    }

    /// `<namespace>.<event>.addListener(listener)`.
    pub(crate) fn add_listener(
        &self,
        namespace: &str,
        event: &str,
        listener: &Function,
    ) -> Result<(), JsValue> {
        let target = self
            .namespace(namespace)
            .and_then(|ns| get(&ns, event))
            .ok_or_else(|| JsValue::from_str(&format!("{namespace}.{event} unavailable")))?;
        let add = method(&target, "addListener")
            .ok_or_else(|| JsValue::from_str(&format!("{namespace}.{event}.addListener unavailable")))?;
        add.call1(&target, listener)?;
        Ok(())
    }

    /// Send `request` to the background relay and wait for its reply.
    pub(crate) async fn request_fullscreen(
        &self,
        window: &Window,
        request: SetFullscreenRequest,
        timeout: Duration,
    ) -> Result<FullscreenResponse, NotifyError> {
        let json = RelayMessage::from(request)
            .to_json()
            .map_err(|err| NotifyError::SendFailed(err.to_string()))?;
        let message = to_js(&json).map_err(|err| NotifyError::SendFailed(error_text(&err)))?;
        let runtime = self
            .namespace("runtime")
            .ok_or_else(|| NotifyError::SendFailed("runtime unavailable".into()))?;
        let send = method(&runtime, "sendMessage")
            .ok_or_else(|| NotifyError::SendFailed("runtime.sendMessage unavailable".into()))?;
        let promise = send
            .call1(&runtime, &message)
            .map_err(|err| NotifyError::SendFailed(error_text(&err)))?
            .dyn_into::<Promise>()
            .map_err(|_| NotifyError::SendFailed("sendMessage returned no promise".into()))?;

        let deadline = pin!(sleep(window, timeout));
        let reply = match select(JsFuture::from(promise), deadline).await {
            Either::Left((Ok(reply), _)) => reply,
            Either::Left((Err(err), _)) => return Err(NotifyError::SendFailed(error_text(&err))),
            Either::Right(_) => {
                return Err(NotifyError::Timeout(
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ));
            }
        };
        let text = from_js(&reply)
            .ok_or_else(|| NotifyError::MalformedResponse("empty reply".into()))?;
        FullscreenResponse::from_json(&text)
            .map_err(|err| NotifyError::MalformedResponse(err.to_string()))
    }
}

/// Reply to a `runtime.onMessage` request through its `sendResponse`.
pub(crate) fn send_response(send_response: &JsValue, response: &FullscreenResponse) {
    let Some(send) = send_response.dyn_ref::<Function>() else {
        return;
    };
    let reply = match response.to_json().map(|json| to_js(&json)) {
        Ok(Ok(reply)) => reply,
        _ => {
            tracing::warn!(target: "fullscroll::web", "could not encode relay reply");
            return;
        }
    };
    if let Err(err) = send.call1(&JsValue::UNDEFINED, &reply) {
        tracing::debug!(target: "fullscroll::web", error = %error_text(&err), "sendResponse threw");
    }
}

/// Parse a `runtime.onMessage` payload as one of our messages.
pub(crate) fn parse_message(message: &JsValue) -> Option<RelayMessage> {
    from_js(message).as_deref().and_then(RelayMessage::from_json)
}

/// `sender.tab.windowId`, when the sender is a tab.
pub(crate) fn sender_window_id(sender: &JsValue) -> Option<WindowId> {
    let id = get(sender, "tab").and_then(|tab| get(&tab, "windowId"))?.as_f64()?;
    if id.fract() != 0.0 || id < f64::from(i32::MIN) || id > f64::from(i32::MAX) {
        return None;
    }
    Some(id as WindowId)
}

/// [`WindowApi`] over `chrome.windows`.
#[derive(Debug, Clone)]
pub(crate) struct ChromeWindows {
    windows: JsValue,
}

impl ChromeWindows {
    async fn call(&self, name: &str, args: &[JsValue]) -> Result<JsValue, WindowApiError> {
        let func = method(&self.windows, name).ok_or(WindowApiError::Unavailable)?;
        let result = match args {
            [id] => func.call1(&self.windows, id),
            [id, update] => func.call2(&self.windows, id, update),
            _ => return Err(WindowApiError::Host(format!("windows.{name}: bad arity"))),
        }
        .map_err(|err| WindowApiError::Host(error_text(&err)))?;
        let promise = result
            .dyn_into::<Promise>()
            .map_err(|_| WindowApiError::Host(format!("windows.{name} returned no promise")))?;
        JsFuture::from(promise)
            .await
            .map_err(|err| WindowApiError::Host(error_text(&err)))
    }
}

impl WindowApi for ChromeWindows {
    async fn get(&self, id: WindowId) -> Result<Option<WindowInfo>, WindowApiError> {
        let win = self.call("get", &[JsValue::from(id)]).await?;
        if win.is_undefined() || win.is_null() {
            return Ok(None);
        }
        let state = get(&win, "state")
            .and_then(|state| state.as_string())
            .and_then(|state| WindowState::parse(&state));
        Ok(Some(WindowInfo { state }))
    }

    async fn update(&self, id: WindowId, state: WindowState) -> Result<(), WindowApiError> {
        let info = Object::new();
        Reflect::set(&info, &JsValue::from_str("state"), &JsValue::from_str(state.as_str()))
            .map_err(|err| WindowApiError::Host(error_text(&err)))?;
        self.call("update", &[JsValue::from(id), info.into()]).await?;
        Ok(())
    }
}
