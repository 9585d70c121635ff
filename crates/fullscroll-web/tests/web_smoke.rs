#![cfg(target_arch = "wasm32")]
#![forbid(unsafe_code)]

//! Browser smoke tests for the exported entry points.
//!
//! The test page is neither a watch page nor an extension context, so the
//! content script starts inert and the background relay only logs.

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn invalid_config_is_rejected_before_start() {
    let err = fullscroll_web::start_content_script(Some(r#"{"hotkey": 5}"#.to_owned()))
        .expect_err("numeric hotkey must not parse");
    let message = err.as_string().unwrap_or_default();
    assert!(message.starts_with("config json"), "{message}");

    let err = fullscroll_web::start_content_script(Some(r#"{"hotkey": "1"}"#.to_owned()))
        .expect_err("digit hotkey must not validate");
    assert!(err.as_string().unwrap_or_default().contains("hotkey"));
}

#[wasm_bindgen_test]
fn content_script_starts_once_and_injects_stylesheet() {
    fullscroll_web::start_content_script(None).expect("first start");
    let document = web_sys::window()
        .and_then(|window| window.document())
        .expect("document");
    assert!(document.get_element_by_id("fullscroll-style").is_some());
    assert!(
        !document
            .document_element()
            .expect("root")
            .class_list()
            .contains("fullscroll-active")
    );

    let again = fullscroll_web::start_content_script(None);
    assert_eq!(
        again,
        Err(JsValue::from_str("content script already started"))
    );
}

#[wasm_bindgen_test]
fn background_without_extension_api_is_inert() {
    assert!(fullscroll_web::start_background().is_ok());
}
