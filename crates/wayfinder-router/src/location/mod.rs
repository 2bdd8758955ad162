//! Location sources.
//!
//! A location source owns "where are we" and "go somewhere else". Three are
//! provided:
//!
//! - [`BrowserLocation`] reads the installed window's path and search and
//!   navigates through its session history.
//! - [`HashLocation`] keeps the route in the URL fragment (`/#/users/1`).
//! - [`MemoryLocation`] keeps everything in memory, for server rendering
//!   and tests.
//!
//! [`DefaultLocation`] picks between the browser and a pinned location
//! depending on whether a window is installed.
//!
//! Routers consume a source through the [`LocationHook`] / [`SearchHook`]
//! traits, which hand out a [`LocationCell`] (a signal kept current by a
//! subscription) and a [`Navigator`].

pub mod browser;
pub mod hash;
pub mod memory;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use wayfinder_reactive::Signal;

use crate::context::RouterContext;
use crate::window;

pub use browser::BrowserLocation;
pub use hash::HashLocation;
pub use memory::{MemoryLocation, MemoryLocationOptions};

/// Options accepted by every navigate operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigateOptions {
	/// Replace the current history entry instead of pushing a new one.
	pub replace: bool,
	/// State stored with the history entry.
	pub state: Option<Value>,
}

impl NavigateOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Options that replace the current entry.
	pub fn replacing() -> Self {
		Self {
			replace: true,
			state: None,
		}
	}

	pub fn with_replace(mut self, replace: bool) -> Self {
		self.replace = replace;
		self
	}

	pub fn with_state(mut self, state: Value) -> Self {
		self.state = Some(state);
		self
	}
}

/// A cloneable navigate function.
#[derive(Clone)]
pub struct Navigator(Rc<dyn Fn(&str, &NavigateOptions)>);

impl Navigator {
	pub fn new<F>(navigate: F) -> Self
	where
		F: Fn(&str, &NavigateOptions) + 'static,
	{
		Self(Rc::new(navigate))
	}

	/// A navigator that ignores every call.
	pub fn noop() -> Self {
		Self::new(|_, _| {})
	}

	pub fn navigate(&self, to: &str, options: &NavigateOptions) {
		(self.0)(to, options)
	}
}

impl fmt::Debug for Navigator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Navigator").finish_non_exhaustive()
	}
}

/// Formats an internal path as a displayable href.
#[derive(Clone)]
pub struct HrefsFormatter(Rc<dyn Fn(&str) -> String>);

impl HrefsFormatter {
	pub fn new<F>(format: F) -> Self
	where
		F: Fn(&str) -> String + 'static,
	{
		Self(Rc::new(format))
	}

	/// Returns hrefs unchanged.
	pub fn identity() -> Self {
		Self::new(|href| href.to_string())
	}

	pub fn format(&self, href: &str) -> String {
		(self.0)(href)
	}
}

impl Default for HrefsFormatter {
	fn default() -> Self {
		Self::identity()
	}
}

impl fmt::Debug for HrefsFormatter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HrefsFormatter").finish_non_exhaustive()
	}
}

/// Idempotent unsubscribe handle; unsubscribes on drop.
pub struct Subscription {
	cancel: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
	pub fn new<F>(cancel: F) -> Self
	where
		F: FnOnce() + 'static,
	{
		Self {
			cancel: RefCell::new(Some(Box::new(cancel))),
		}
	}

	/// A subscription with nothing to cancel.
	pub fn noop() -> Self {
		Self {
			cancel: RefCell::new(None),
		}
	}

	/// Cancels the subscription; later calls do nothing.
	pub fn unsubscribe(&self) {
		let cancel = self.cancel.borrow_mut().take();
		if let Some(cancel) = cancel {
			cancel();
		}
	}

	pub fn is_active(&self) -> bool {
		self.cancel.borrow().is_some()
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.unsubscribe();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("active", &self.is_active())
			.finish()
	}
}

/// A location value kept current by a source subscription.
///
/// Clones share the signal and the subscription; dropping the last clone
/// unsubscribes.
pub struct LocationCell<T: 'static = String> {
	value: Signal<T>,
	subscription: Rc<Subscription>,
}

impl<T: 'static> Clone for LocationCell<T> {
	fn clone(&self) -> Self {
		Self {
			value: self.value.clone(),
			subscription: self.subscription.clone(),
		}
	}
}

impl<T: 'static> LocationCell<T> {
	pub fn new(value: Signal<T>, subscription: Subscription) -> Self {
		Self {
			value,
			subscription: Rc::new(subscription),
		}
	}

	/// A cell that never changes.
	pub fn fixed(value: T) -> Self {
		Self::new(Signal::new(value), Subscription::noop())
	}

	pub fn signal(&self) -> &Signal<T> {
		&self.value
	}

	/// Reads the value, tracking the dependency.
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.value.get()
	}

	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.value.get_untracked()
	}

	/// Stops following the source; the value freezes.
	pub fn unsubscribe(&self) {
		self.subscription.unsubscribe();
	}

	pub fn is_subscribed(&self) -> bool {
		self.subscription.is_active()
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for LocationCell<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LocationCell")
			.field("value", &self.value)
			.field("subscribed", &self.is_subscribed())
			.finish()
	}
}

/// Supplies the current path and a navigator to a router.
pub trait LocationHook {
	/// Subscribes to the path; `router` carries SSR overrides.
	fn use_location(&self, router: &RouterContext) -> (LocationCell, Navigator);

	/// A formatter this source wants its links rendered with.
	fn hrefs(&self) -> Option<HrefsFormatter> {
		None
	}
}

/// Supplies the current search string to a router.
pub trait SearchHook {
	fn use_search(&self, router: &RouterContext) -> LocationCell;
}

/// The library default: the browser when a window is installed, otherwise a
/// static location pinned to the router's SSR path and search.
///
/// The choice is made on every subscription, so a window installed after the
/// router was built is picked up by the next consumer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultLocation;

impl LocationHook for DefaultLocation {
	fn use_location(&self, router: &RouterContext) -> (LocationCell, Navigator) {
		if window::has_window() {
			return BrowserLocation.use_location(router);
		}
		let path = router.ssr_path().unwrap_or("/").to_string();
		(LocationCell::fixed(path), Navigator::noop())
	}
}

impl SearchHook for DefaultLocation {
	fn use_search(&self, router: &RouterContext) -> LocationCell {
		if window::has_window() {
			return BrowserLocation.use_search(router);
		}
		LocationCell::fixed(router.ssr_search().unwrap_or_default().to_string())
	}
}

/// Id-keyed callback list shared by sources that emit to several cells.
#[derive(Default)]
pub(crate) struct Listeners {
	entries: RefCell<Vec<(u64, Rc<dyn Fn()>)>>,
	next: std::cell::Cell<u64>,
}

impl Listeners {
	/// Adds `callback`, returning its id and the new listener count.
	pub(crate) fn add(&self, callback: Rc<dyn Fn()>) -> (u64, usize) {
		let id = self.next.get();
		self.next.set(id + 1);
		let mut entries = self.entries.borrow_mut();
		entries.push((id, callback));
		(id, entries.len())
	}

	/// Removes `id`, returning the remaining count.
	pub(crate) fn remove(&self, id: u64) -> usize {
		let mut entries = self.entries.borrow_mut();
		entries.retain(|(registered, _)| *registered != id);
		entries.len()
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.borrow().len()
	}

	/// Calls every listener present when emission starts and still present
	/// when its turn comes.
	pub(crate) fn emit(&self) {
		let snapshot: Vec<_> = self.entries.borrow().clone();
		for (id, callback) in snapshot {
			let present = self
				.entries
				.borrow()
				.iter()
				.any(|(registered, _)| *registered == id);
			if present {
				callback();
			}
		}
	}
}
