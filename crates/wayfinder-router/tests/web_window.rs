//! Browser-only behaviour of the default window.

#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;
use wayfinder_router::window::current_window;
use wayfinder_router::{PATCH_TOKEN, RouterScope, has_window, is_patched, use_location};

wasm_bindgen_test_configure!(run_in_browser);

fn run_page_script(source: &str) {
	js_sys::Function::new_no_args(source)
		.call0(&JsValue::NULL)
		.unwrap();
}

#[wasm_bindgen_test]
fn test_browser_window_is_installed_on_demand() {
	wayfinder_router::uninstall_window();

	assert!(has_window());
	assert!(is_patched(&*current_window().unwrap()));
}

#[wasm_bindgen_test]
fn test_default_router_follows_page_history_calls() {
	// Arrange
	let scope = RouterScope::root();
	let location = use_location(&scope);

	// Act
	run_page_script("history.pushState(null, '', '/from-page')");
	let pushed = location.get();
	run_page_script("history.replaceState(null, '', '/replaced-by-page')");

	// Assert
	assert_eq!(pushed, "/from-page");
	assert_eq!(location.get(), "/replaced-by-page");
}

#[wasm_bindgen_test]
fn test_patch_marker_lives_on_history_object() {
	assert!(has_window());

	let history = web_sys::window().unwrap().history().unwrap();
	let marker = js_sys::Reflect::get(&history, &JsValue::from_str(PATCH_TOKEN)).unwrap();

	assert!(marker.is_truthy());
}
