//! Synthetic `pushState` / `replaceState` events.
//!
//! The History API reports back/forward traversal through `popstate` but
//! stays silent when a page calls `pushState` or `replaceState` itself. A
//! patched window dispatches an event named after the method after each such
//! call, so a history-backed source can listen to all four location events.
//!
//! Patching is idempotent: the first call leaves a marker keyed by
//! [`PATCH_TOKEN`] and later calls see it and do nothing. A browser window
//! keeps the marker on the page's `history` object and wraps the page's own
//! `pushState` / `replaceState`, so the patch happens once per page and also
//! covers calls made from JavaScript. A [`HeadlessWindow`] keeps its markers
//! to itself.
//!
//! [`HeadlessWindow`]: crate::window::HeadlessWindow

use std::rc::Rc;

use crate::window::{HistoryMethod, Window};

/// Marker key recording that a window has been patched.
pub const PATCH_TOKEN: &str = "wayfinder:history-patch";

/// Installs synthetic push / replace events on `window`.
///
/// Returns `true` only when this call patched the window.
pub fn patch_history(window: &dyn Window) -> bool {
	if window.has_marker(PATCH_TOKEN) {
		return false;
	}
	window.wrap_history(Rc::new(|window: &dyn Window, method: HistoryMethod| {
		window.dispatch_event(method.event());
	}));
	window.set_marker(PATCH_TOKEN);
	tracing::debug!("history push/replace events patched in");
	true
}

/// Whether `window` already dispatches push / replace events.
pub fn is_patched(window: &dyn Window) -> bool {
	window.has_marker(PATCH_TOKEN)
}
