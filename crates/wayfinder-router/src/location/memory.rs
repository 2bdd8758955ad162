//! In-memory location.
//!
//! Path and search are plain values owned by the location, not tied to any
//! window, which makes this the source for server rendering and tests. A
//! static location ignores navigation. A recording location keeps the
//! navigation history and can be reset to its initial entry.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use wayfinder_reactive::Signal;
use wayfinder_urls::split_path_and_search;

use super::{
	Listeners, LocationCell, LocationHook, NavigateOptions, Navigator, SearchHook, Subscription,
};
use crate::context::RouterContext;
use crate::error::{RouterError, RouterResult};

/// How a [`MemoryLocation`] starts and behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLocationOptions {
	/// Initial path, possibly with a query.
	pub path: String,
	/// Search appended to `path` (without the leading `?`).
	pub search: String,
	/// Ignore every navigation.
	pub static_location: bool,
	/// Keep the navigation history.
	pub record: bool,
}

impl Default for MemoryLocationOptions {
	fn default() -> Self {
		Self {
			path: String::from("/"),
			search: String::new(),
			static_location: false,
			record: false,
		}
	}
}

impl MemoryLocationOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_path(mut self, path: impl Into<String>) -> Self {
		self.path = path.into();
		self
	}

	pub fn with_search(mut self, search: impl Into<String>) -> Self {
		self.search = search.into();
		self
	}

	pub fn with_static(mut self, static_location: bool) -> Self {
		self.static_location = static_location;
		self
	}

	pub fn with_record(mut self, record: bool) -> Self {
		self.record = record;
		self
	}

	/// The first entry: `path` with `search` joined by `&` when `path`
	/// already carries a query, by `?` otherwise.
	pub fn initial_path(&self) -> String {
		if self.search.is_empty() {
			return self.path.clone();
		}
		let has_query = matches!(split_path_and_search(&self.path), (_, Some(query)) if !query.is_empty());
		let joiner = if has_query { '&' } else { '?' };
		format!("{}{joiner}{}", self.path, self.search)
	}
}

struct MemoryState {
	path: String,
	search: String,
	history: Vec<String>,
}

struct MemoryInner {
	initial: String,
	static_location: bool,
	record: bool,
	state: RefCell<MemoryState>,
	listeners: Listeners,
}

impl MemoryInner {
	fn navigate(&self, to: &str, options: &NavigateOptions) {
		if self.static_location {
			tracing::trace!(to, "static memory location, navigation ignored");
			return;
		}
		self.apply(to, options.replace);
	}

	fn apply(&self, to: &str, replace: bool) {
		{
			let mut state = self.state.borrow_mut();
			if self.record {
				match state.history.last_mut() {
					Some(last) if replace => *last = to.to_string(),
					_ => state.history.push(to.to_string()),
				}
			}
			let (path, search) = split_path_and_search(to);
			state.path = path.to_string();
			state.search = search.unwrap_or_default().to_string();
		}
		tracing::debug!(to, replace, "memory navigation");
		self.listeners.emit();
	}

	/// A cell over one piece of the state, kept current until dropped.
	fn follow(self: &Rc<Self>, read: fn(&MemoryState) -> String) -> LocationCell {
		let value = Signal::new(read(&self.state.borrow()));
		let target = value.clone();
		let source = Rc::downgrade(self);
		let (id, _) = self.listeners.add(Rc::new(move || {
			if let Some(inner) = source.upgrade() {
				let next = read(&inner.state.borrow());
				target.set_if_changed(next);
			}
		}));
		let source = Rc::downgrade(self);
		LocationCell::new(
			value,
			Subscription::new(move || {
				if let Some(inner) = source.upgrade() {
					inner.listeners.remove(id);
				}
			}),
		)
	}
}

/// The hook object handed to routers; one per location.
struct MemoryHook(Rc<MemoryInner>);

impl LocationHook for MemoryHook {
	fn use_location(&self, _router: &RouterContext) -> (LocationCell, Navigator) {
		let inner = self.0.clone();
		(
			self.0.follow(|state| state.path.clone()),
			Navigator::new(move |to, options| inner.navigate(to, options)),
		)
	}
}

impl SearchHook for MemoryHook {
	fn use_search(&self, _router: &RouterContext) -> LocationCell {
		self.0.follow(|state| state.search.clone())
	}
}

/// A location held in memory.
///
/// ```
/// use wayfinder_router::location::{MemoryLocation, MemoryLocationOptions, NavigateOptions};
///
/// let location = MemoryLocation::new(MemoryLocationOptions::new().with_path("/start").with_record(true));
/// location.navigate("/step1", &NavigateOptions::new());
/// location.navigate("/step2", &NavigateOptions::replacing());
/// assert_eq!(location.history(), Some(vec!["/start".to_string(), "/step2".to_string()]));
/// ```
#[derive(Clone)]
pub struct MemoryLocation {
	inner: Rc<MemoryInner>,
	hook: Rc<MemoryHook>,
}

impl MemoryLocation {
	pub fn new(options: MemoryLocationOptions) -> Self {
		let initial = options.initial_path();
		let (path, search) = split_path_and_search(&initial);
		let inner = Rc::new(MemoryInner {
			state: RefCell::new(MemoryState {
				path: path.to_string(),
				search: search.unwrap_or_default().to_string(),
				history: vec![initial.clone()],
			}),
			initial,
			static_location: options.static_location,
			record: options.record,
			listeners: Listeners::default(),
		});
		let hook = Rc::new(MemoryHook(inner.clone()));
		Self { inner, hook }
	}

	/// A location at `path` that ignores navigation.
	pub fn fixed(path: impl Into<String>) -> Self {
		Self::new(MemoryLocationOptions::new().with_path(path).with_static(true))
	}

	/// The location hook. Every call returns the same hook.
	pub fn hook(&self) -> Rc<dyn LocationHook> {
		self.hook.clone()
	}

	/// The search hook, sharing state with [`hook`](Self::hook).
	pub fn search_hook(&self) -> Rc<dyn SearchHook> {
		self.hook.clone()
	}

	/// Moves to `to` unless the location is static.
	pub fn navigate(&self, to: &str, options: &NavigateOptions) {
		self.inner.navigate(to, options);
	}

	pub fn navigator(&self) -> Navigator {
		let inner = self.inner.clone();
		Navigator::new(move |to, options| inner.navigate(to, options))
	}

	pub fn path(&self) -> String {
		self.inner.state.borrow().path.clone()
	}

	/// Current search, without the leading `?`.
	pub fn search(&self) -> String {
		self.inner.state.borrow().search.clone()
	}

	pub fn is_static(&self) -> bool {
		self.inner.static_location
	}

	/// Recorded history, `None` unless created with `record`.
	pub fn history(&self) -> Option<Vec<String>> {
		self.inner
			.record
			.then(|| self.inner.state.borrow().history.clone())
	}

	/// Clears the recorded history and returns to the initial entry.
	///
	/// # Errors
	///
	/// [`RouterError::ResetUnavailable`] unless created with `record`.
	pub fn reset(&self) -> RouterResult<()> {
		if !self.inner.record {
			return Err(RouterError::ResetUnavailable);
		}
		self.inner.state.borrow_mut().history.clear();
		let initial = self.inner.initial.clone();
		self.inner.apply(&initial, false);
		Ok(())
	}

	/// Number of live cells following this location.
	pub fn subscriber_count(&self) -> usize {
		self.inner.listeners.len()
	}
}

impl fmt::Debug for MemoryLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.borrow();
		f.debug_struct("MemoryLocation")
			.field("path", &state.path)
			.field("search", &state.search)
			.field("static", &self.inner.static_location)
			.field("record", &self.inner.record)
			.finish()
	}
}
