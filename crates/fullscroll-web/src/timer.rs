#![forbid(unsafe_code)]

//! Owned `setTimeout` / `requestAnimationFrame` registrations.
//!
//! A [`TimerGuard`] keeps its callback alive while armed. Dropping it clears
//! the browser timer and frees the callback, fired or not.

use core::time::Duration;

use js_sys::Function;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Window;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerHandle {
    Frame(i32),
    Timeout(i32),
}

pub(crate) struct TimerGuard {
    window: Window,
    handle: TimerHandle,
    _callback: Closure<dyn FnMut()>,
}

impl TimerGuard {
    /// Run `callback` once after `delay`.
    pub(crate) fn timeout(
        window: &Window,
        delay: Duration,
        callback: impl FnMut() + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut()>::new(callback);
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        let id = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            Self::function(&callback),
            millis,
        )?;
        Ok(Self {
            window: window.clone(),
            handle: TimerHandle::Timeout(id),
            _callback: callback,
        })
    }

    /// Run `callback` before the next repaint.
    pub(crate) fn next_frame(
        window: &Window,
        callback: impl FnMut() + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut()>::new(callback);
        let id = window.request_animation_frame(Self::function(&callback))?;
        Ok(Self {
            window: window.clone(),
            handle: TimerHandle::Frame(id),
            _callback: callback,
        })
    }

    fn function(callback: &Closure<dyn FnMut()>) -> &Function {
        callback.as_ref().unchecked_ref()
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        // Clearing a timer that already ran is a no-op.
        match self.handle {
            TimerHandle::Frame(id) => {
                if let Err(err) = self.window.cancel_animation_frame(id) {
                    tracing::debug!(
                        target: "fullscroll::web",
                        error = %crate::chrome::error_text(&err),
                        "cancelAnimationFrame failed"
                    );
                }
            }
            TimerHandle::Timeout(id) => self.window.clear_timeout_with_handle(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use wasm_bindgen_test::*;

    use super::*;
    use crate::await_element::sleep;

    wasm_bindgen_test_configure!(run_in_browser);

    fn window() -> Window {
        web_sys::window().expect("window")
    }

    fn counter() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
        let count = Rc::new(Cell::new(0));
        let bump = {
            let count = Rc::clone(&count);
            move || count.set(count.get() + 1)
        };
        (count, bump)
    }

    #[wasm_bindgen_test]
    async fn timeout_runs_while_guard_is_held() {
        let window = window();
        let (count, bump) = counter();
        let guard = TimerGuard::timeout(&window, Duration::from_millis(5), bump).expect("arm");
        sleep(&window, Duration::from_millis(50)).await;
        assert_eq!(count.get(), 1);
        drop(guard);
    }

    #[wasm_bindgen_test]
    async fn dropped_timeout_never_runs() {
        let window = window();
        let (count, bump) = counter();
        drop(TimerGuard::timeout(&window, Duration::from_millis(5), bump).expect("arm"));
        sleep(&window, Duration::from_millis(50)).await;
        assert_eq!(count.get(), 0);
        // The closure was freed with the guard.
        assert_eq!(Rc::strong_count(&count), 1);
    }

    #[wasm_bindgen_test]
    async fn dropped_frame_never_runs() {
        let window = window();
        let (count, bump) = counter();
        drop(TimerGuard::next_frame(&window, bump).expect("arm"));
        sleep(&window, Duration::from_millis(100)).await;
        assert_eq!(count.get(), 0);
        assert_eq!(Rc::strong_count(&count), 1);
    }
}
