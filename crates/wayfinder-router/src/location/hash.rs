//! Fragment-backed location (`/#/users/1`).
//!
//! The route lives in the URL fragment. The leading `#` is ignored and the
//! leading `/` is optional, so `#users` and `#/users` are the same route.
//! The search string stays in the real query and is read the way
//! [`BrowserLocation`] reads it.
//!
//! Every hash cell on a thread shares one `hashchange` registration. It is
//! added for the first listener, moved whenever a later subscription sees a
//! different window installed, and removed with the last listener. All cells
//! are notified synchronously and in subscription order.

use std::cell::RefCell;
use std::rc::Rc;

use wayfinder_reactive::Signal;

use super::{
	BrowserLocation, HrefsFormatter, Listeners, LocationCell, LocationHook, NavigateOptions,
	Navigator, SearchHook, Subscription,
};
use crate::context::RouterContext;
use crate::window::{self, ListenerId, LocationEvent, Window};

struct HashListeners {
	listeners: Listeners,
	registration: RefCell<Option<(Rc<dyn Window>, ListenerId)>>,
}

thread_local! {
	static HASH_LISTENERS: HashListeners = HashListeners {
		listeners: Listeners::default(),
		registration: RefCell::new(None),
	};
}

impl HashListeners {
	/// Moves the shared registration onto the installed window.
	///
	/// A registration left on a replaced window is removed first, so cells
	/// created before a window existed start following it here.
	fn follow_window(&self) {
		let current = window::current_window();
		let mut registration = self.registration.borrow_mut();
		let stale = match (registration.as_ref(), current.as_ref()) {
			(Some((registered, _)), Some(current)) => !Rc::ptr_eq(registered, current),
			(Some(_), None) => true,
			(None, _) => false,
		};
		if stale {
			if let Some((previous, id)) = registration.take() {
				previous.remove_event_listener(LocationEvent::HashChange, id);
				tracing::trace!("hashchange registration dropped from replaced window");
			}
		}
		if registration.is_none() {
			if let Some(current) = current {
				let id = current.add_event_listener(LocationEvent::HashChange, Rc::new(emit_hash_change));
				*registration = Some((current, id));
			}
		}
	}
}

fn emit_hash_change() {
	HASH_LISTENERS.with(|shared| shared.listeners.emit());
}

/// Strips a leading `#` and then a leading `/`.
fn strip_hash_prefix(value: &str) -> &str {
	let value = value.strip_prefix('#').unwrap_or(value);
	value.strip_prefix('/').unwrap_or(value)
}

/// The URL fragment as a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashLocation {
	/// Path reported before the first `hashchange` while server rendering.
	pub ssr_path: Option<String>,
}

impl HashLocation {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_ssr_path(mut self, ssr_path: impl Into<String>) -> Self {
		self.ssr_path = Some(ssr_path.into());
		self
	}

	/// The route held in the fragment, `/` without a window.
	pub fn current_hash_location() -> String {
		let hash = window::with_window(|w| w.hash()).unwrap_or_default();
		format!("/{}", strip_hash_prefix(&hash))
	}

	/// Moves the fragment to `to` and dispatches `hashchange`.
	///
	/// `to` may carry its own query (`/users?page=2`); without one the
	/// current query is kept. Does nothing without a window.
	pub fn navigate(to: &str, options: &NavigateOptions) {
		let mut parts = strip_hash_prefix(to).split('?');
		let hash = parts.next().unwrap_or_default();
		let search = parts.next().filter(|search| !search.is_empty());

		let navigated = window::with_window(|w| {
			let search = search.map_or_else(|| w.search(), |search| format!("?{search}"));
			let target = format!("{}{search}#/{hash}", w.pathname());
			if options.replace {
				w.replace_state(options.state.clone(), &target);
			} else {
				w.push_state(options.state.clone(), &target);
			}
			w.dispatch_event(LocationEvent::HashChange);
			target
		});
		match navigated {
			Some(target) => tracing::debug!(to, %target, replace = options.replace, "hash navigation"),
			None => tracing::trace!(to, "no window, hash navigation skipped"),
		}
	}

	/// Calls `callback` on every `hashchange` until unsubscribed.
	pub fn subscribe(callback: Rc<dyn Fn()>) -> Subscription {
		let id = HASH_LISTENERS.with(|shared| {
			let (id, _) = shared.listeners.add(callback);
			shared.follow_window();
			id
		});

		Subscription::new(move || {
			// The thread-local may already be gone when a cell drops at thread exit
			let _ = HASH_LISTENERS.try_with(|shared| {
				if shared.listeners.remove(id) == 0 {
					let registration = shared.registration.borrow_mut().take();
					if let Some((window, registered)) = registration {
						window.remove_event_listener(LocationEvent::HashChange, registered);
					}
				}
			});
		})
	}

	/// Number of live hash subscriptions on this thread.
	pub fn subscriber_count() -> usize {
		HASH_LISTENERS.with(|shared| shared.listeners.len())
	}

	/// The fragment route, seeded with `ssr_path` when given.
	pub fn use_hash_location(ssr_path: Option<&str>) -> LocationCell {
		let initial = ssr_path.map_or_else(Self::current_hash_location, str::to_string);
		let value = Signal::new(initial);
		let target = value.clone();
		let subscription = Self::subscribe(Rc::new(move || {
			target.set_if_changed(Self::current_hash_location());
		}));
		LocationCell::new(value, subscription)
	}

	pub fn navigator() -> Navigator {
		Navigator::new(Self::navigate)
	}

	/// Formats links as `#/path`.
	pub fn hrefs_formatter() -> HrefsFormatter {
		HrefsFormatter::new(|href| format!("#{href}"))
	}
}

impl LocationHook for HashLocation {
	fn use_location(&self, router: &RouterContext) -> (LocationCell, Navigator) {
		let ssr_path = self.ssr_path.as_deref().or_else(|| router.ssr_path());
		(Self::use_hash_location(ssr_path), Self::navigator())
	}

	fn hrefs(&self) -> Option<HrefsFormatter> {
		Some(Self::hrefs_formatter())
	}
}

impl SearchHook for HashLocation {
	fn use_search(&self, router: &RouterContext) -> LocationCell {
		BrowserLocation::use_search_string(router.ssr_search())
	}
}
