//! History-backed location.
//!
//! The path and search come from the installed window; navigation goes
//! through `pushState` / `replaceState`. Cells follow all four location
//! events, the two synthetic ones included (see [`crate::history_patch`]).

use std::rc::Rc;

use serde_json::Value;
use wayfinder_reactive::Signal;

use super::{LocationCell, LocationHook, NavigateOptions, Navigator, SearchHook, Subscription};
use crate::context::RouterContext;
use crate::history_patch;
use crate::window::{self, LocationEvent};

/// The browser's address bar as a location source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrowserLocation;

impl BrowserLocation {
	/// Current pathname, `/` without a window.
	pub fn current_pathname() -> String {
		window::with_window(|w| w.pathname()).unwrap_or_else(|| String::from("/"))
	}

	/// Current search including the leading `?`, empty without a window.
	pub fn current_search() -> String {
		window::with_window(|w| w.search()).unwrap_or_default()
	}

	/// State of the current history entry.
	pub fn current_history_state() -> Option<Value> {
		window::with_window(|w| w.history_state()).flatten()
	}

	/// Pushes (or replaces) a history entry. Does nothing without a window.
	pub fn navigate(to: &str, options: &NavigateOptions) {
		let navigated = window::with_window(|w| {
			if options.replace {
				w.replace_state(options.state.clone(), to);
			} else {
				w.push_state(options.state.clone(), to);
			}
		});
		match navigated {
			Some(()) => tracing::debug!(to, replace = options.replace, "browser navigation"),
			None => tracing::trace!(to, "no window, navigation skipped"),
		}
	}

	/// Calls `callback` on every location event until unsubscribed.
	pub fn subscribe(callback: Rc<dyn Fn()>) -> Subscription {
		let Some(window) = window::current_window() else {
			return Subscription::noop();
		};
		history_patch::patch_history(&*window);

		let ids: Vec<_> = LocationEvent::ALL
			.into_iter()
			.map(|event| (event, window.add_event_listener(event, callback.clone())))
			.collect();
		Subscription::new(move || {
			for (event, id) in ids {
				window.remove_event_listener(event, id);
			}
		})
	}

	/// A cell following `read`, seeded with `initial`.
	fn follow<T>(read: fn() -> T, initial: T) -> LocationCell<T>
	where
		T: Clone + PartialEq + 'static,
	{
		let value = Signal::new(initial);
		let target = value.clone();
		let subscription = Self::subscribe(Rc::new(move || {
			target.set_if_changed(read());
		}));
		LocationCell::new(value, subscription)
	}

	/// The pathname, seeded with `ssr_path` when given.
	pub fn use_pathname(ssr_path: Option<&str>) -> LocationCell {
		let initial = ssr_path.map_or_else(Self::current_pathname, str::to_string);
		Self::follow(Self::current_pathname, initial)
	}

	/// The raw search string, seeded with `ssr_search` when given.
	pub fn use_search_string(ssr_search: Option<&str>) -> LocationCell {
		let initial = ssr_search.map_or_else(Self::current_search, str::to_string);
		Self::follow(Self::current_search, initial)
	}

	/// State of the current history entry.
	pub fn use_history_state() -> LocationCell<Option<Value>> {
		Self::follow(Self::current_history_state, Self::current_history_state())
	}

	pub fn navigator() -> Navigator {
		Navigator::new(Self::navigate)
	}
}

impl LocationHook for BrowserLocation {
	fn use_location(&self, router: &RouterContext) -> (LocationCell, Navigator) {
		(Self::use_pathname(router.ssr_path()), Self::navigator())
	}
}

impl SearchHook for BrowserLocation {
	fn use_search(&self, router: &RouterContext) -> LocationCell {
		Self::use_search_string(router.ssr_search())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::window::{HeadlessWindow, uninstall_window};
	use rstest::rstest;
	use serial_test::serial;

	#[rstest]
	#[serial]
	fn test_reads_default_without_window() {
		uninstall_window();

		assert_eq!(BrowserLocation::current_pathname(), "/");
		assert_eq!(BrowserLocation::current_search(), "");
		assert_eq!(BrowserLocation::current_history_state(), None);
		BrowserLocation::navigate("/nowhere", &NavigateOptions::new());

		let cell = BrowserLocation::use_pathname(None);
		assert_eq!(cell.get_untracked(), "/");
		assert!(!cell.is_subscribed());
	}

	#[rstest]
	#[serial]
	fn test_pathname_follows_navigation() {
		// Arrange
		let window = HeadlessWindow::install("/start");
		let cell = BrowserLocation::use_pathname(None);

		// Act
		BrowserLocation::navigate("/next", &NavigateOptions::new());
		let after_push = cell.get_untracked();
		BrowserLocation::navigate("/replaced", &NavigateOptions::replacing());
		let after_replace = cell.get_untracked();
		window.back();

		// Assert
		assert_eq!(after_push, "/next");
		assert_eq!(after_replace, "/replaced");
		assert_eq!(cell.get_untracked(), "/start");
		assert_eq!(window.history_len(), 2);
		uninstall_window();
	}

	#[rstest]
	#[serial]
	fn test_search_updates_once_per_navigation() {
		// Arrange
		let _window = HeadlessWindow::install("/list?page=1");
		let cell = BrowserLocation::use_search_string(None);
		let start = cell.signal().version();

		// Act
		BrowserLocation::navigate("/list?page=2", &NavigateOptions::new());
		BrowserLocation::navigate("/other?page=2", &NavigateOptions::new());

		// Assert
		assert_eq!(cell.get_untracked(), "?page=2");
		assert_eq!(cell.signal().version() - start, 1);
		uninstall_window();
	}

	#[rstest]
	#[serial]
	fn test_ssr_path_seeds_cell() {
		let _window = HeadlessWindow::install("/live");
		let cell = BrowserLocation::use_pathname(Some("/from-server"));
		assert_eq!(cell.get_untracked(), "/from-server");

		BrowserLocation::navigate("/moved", &NavigateOptions::new());
		assert_eq!(cell.get_untracked(), "/moved");
		uninstall_window();
	}

	#[rstest]
	#[serial]
	fn test_dropping_cell_removes_listeners() {
		// Arrange
		let window = HeadlessWindow::install("/");
		let cell = BrowserLocation::use_pathname(None);
		assert_eq!(window.listener_count(LocationEvent::PopState), 1);

		// Act
		drop(cell);

		// Assert
		for event in LocationEvent::ALL {
			assert_eq!(window.listener_count(event), 0);
		}
		uninstall_window();
	}

	#[rstest]
	#[serial]
	fn test_history_state_cell() {
		let _window = HeadlessWindow::install("/");
		let state = BrowserLocation::use_history_state();

		BrowserLocation::navigate(
			"/with-state",
			&NavigateOptions::new().with_state(serde_json::json!({"modal": true})),
		);

		assert_eq!(state.get_untracked(), Some(serde_json::json!({"modal": true})));
		uninstall_window();
	}
}
