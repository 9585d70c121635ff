#![forbid(unsafe_code)]

//! Bounded, cancellable waits on the DOM.

use core::pin::pin;
use core::time::Duration;
use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot;
use futures::future::{Either, select};
use js_sys::Array;
use thiserror::Error;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, MutationObserver, MutationObserverInit, Window};

use crate::chrome::error_text;
use crate::timer::TimerGuard;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum WaitError {
    #[error("element did not appear within {0:?}")]
    Timeout(Duration),
    #[error("wait cancelled")]
    Cancelled,
    #[error("{0}")]
    Host(String),
}

/// Resolves after `duration`. Never resolves if the timer cannot be armed.
///
/// Dropping the future clears the pending `setTimeout`.
pub(crate) async fn sleep(window: &Window, duration: Duration) {
    let (tx, rx) = oneshot::channel::<()>();
    let mut tx = Some(tx);
    let armed = TimerGuard::timeout(window, duration, move || {
        if let Some(tx) = tx.take() {
            let _ = tx.send(());
        }
    });
    let _timer = match armed {
        Ok(timer) => timer,
        Err(err) => {
            tracing::warn!(target: "fullscroll::web", error = %error_text(&err), "setTimeout failed");
            futures::future::pending::<()>().await;
            return;
        }
    };
    let _ = rx.await;
}

/// First element matching `selector`, waiting up to `timeout` for it to be
/// inserted. Dropping the sender half of `cancel` abandons the wait.
pub(crate) async fn await_element(
    window: &Window,
    document: &Document,
    selector: &str,
    timeout: Duration,
    cancel: oneshot::Receiver<()>,
) -> Result<Element, WaitError> {
    if let Some(element) = query(document, selector)? {
        return Ok(element);
    }
    let Some(root) = document.document_element() else {
        return Err(WaitError::Host("document has no root element".into()));
    };

    let (found_tx, found_rx) = oneshot::channel::<Element>();
    let found_tx = Rc::new(RefCell::new(Some(found_tx)));
    let on_mutation = {
        let document = document.clone();
        let selector = selector.to_owned();
        let found_tx = Rc::clone(&found_tx);
        Closure::<dyn FnMut(Array, MutationObserver)>::new(
            move |_records: Array, _observer: MutationObserver| {
                if found_tx.borrow().is_none() {
                    return;
                }
                if let Ok(Some(element)) = document.query_selector(&selector) {
                    if let Some(tx) = found_tx.borrow_mut().take() {
                        let _ = tx.send(element);
                    }
                }
            },
        )
    };
    let observer = MutationObserver::new(on_mutation.as_ref().unchecked_ref())
        .map_err(|err| WaitError::Host(error_text(&err)))?;
    let options = MutationObserverInit::new();
    options.set_child_list(true);
    options.set_subtree(true);
    observer
        .observe_with_options(&root, &options)
        .map_err(|err| WaitError::Host(error_text(&err)))?;

    let deadline = pin!(sleep(window, timeout));
    let outcome = match select(found_rx, select(deadline, cancel)).await {
        Either::Left((Ok(element), _)) => Ok(element),
        Either::Left((Err(_), _)) => Err(WaitError::Host("mutation observer went away".into())),
        Either::Right((Either::Left(((), _)), _)) => Err(WaitError::Timeout(timeout)),
        Either::Right((Either::Right(_), _)) => Err(WaitError::Cancelled),
    };
    // Disconnected before `on_mutation` is dropped at the end of this scope;
    // the deadline timer is cleared with it.
    observer.disconnect();
    outcome
}

fn query(document: &Document, selector: &str) -> Result<Option<Element>, WaitError> {
    document
        .query_selector(selector)
        .map_err(|err| WaitError::Host(error_text(&err)))
}
