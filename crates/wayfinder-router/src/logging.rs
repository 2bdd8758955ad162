//! Development advisories.
//!
//! Advisories flag probable mistakes (a link without a target, a route that
//! can never render) without failing. They are emitted only in debug builds:
//! through `tracing` everywhere, and additionally to the browser console on
//! `wasm32`, where a subscriber is rarely installed.

/// Whether development advisories are enabled.
pub const fn is_dev() -> bool {
	cfg!(debug_assertions)
}

/// Emits a development advisory attributed to `component`.
pub fn dev_warn(component: &str, message: &str) {
	if !is_dev() {
		return;
	}
	tracing::warn!(component, "[wayfinder] {component}: {message}");

	#[cfg(target_arch = "wasm32")]
	web_sys::console::warn_1(&format!("[wayfinder] {component}: {message}").into());
}
