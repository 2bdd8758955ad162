//! The platform address bar.
//!
//! Location sources never talk to a browser directly. They go through the
//! [`Window`] installed for the current thread, which is a
//! [`HeadlessWindow`] in tests and native hosts and a `WebWindow` on
//! `wasm32`. With nothing installed (server rendering) every read returns a
//! default and every write is skipped.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::history_patch;

/// Location events a source can listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationEvent {
	/// Session history traversal (back / forward).
	PopState,
	/// Synthetic event fired after `pushState`.
	PushState,
	/// Synthetic event fired after `replaceState`.
	ReplaceState,
	/// The fragment changed.
	HashChange,
}

impl LocationEvent {
	/// Every event a history-backed source subscribes to.
	pub const ALL: [LocationEvent; 4] = [
		LocationEvent::PopState,
		LocationEvent::PushState,
		LocationEvent::ReplaceState,
		LocationEvent::HashChange,
	];

	/// DOM event name.
	pub const fn name(self) -> &'static str {
		match self {
			Self::PopState => "popstate",
			Self::PushState => "pushState",
			Self::ReplaceState => "replaceState",
			Self::HashChange => "hashchange",
		}
	}
}

impl fmt::Display for LocationEvent {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Which History API method was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMethod {
	Push,
	Replace,
}

impl HistoryMethod {
	/// The synthetic event announcing this call.
	pub const fn event(self) -> LocationEvent {
		match self {
			Self::Push => LocationEvent::PushState,
			Self::Replace => LocationEvent::ReplaceState,
		}
	}
}

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Event listener callback.
pub type Listener = Rc<dyn Fn()>;

/// Runs after every `push_state` / `replace_state` of a window.
pub type HistoryHook = Rc<dyn Fn(&dyn Window, HistoryMethod)>;

/// The address bar and session history of a host.
pub trait Window {
	/// Path component, always starting with `/`.
	fn pathname(&self) -> String;
	/// Query string including the leading `?`, or empty.
	fn search(&self) -> String;
	/// Fragment including the leading `#`, or empty.
	fn hash(&self) -> String;
	/// Full URL.
	fn href(&self) -> String;
	/// State attached to the current history entry.
	fn history_state(&self) -> Option<Value>;

	fn push_state(&self, state: Option<Value>, url: &str);
	fn replace_state(&self, state: Option<Value>, url: &str);

	fn add_event_listener(&self, event: LocationEvent, listener: Listener) -> ListenerId;
	fn remove_event_listener(&self, event: LocationEvent, id: ListenerId);
	fn dispatch_event(&self, event: LocationEvent);

	fn has_marker(&self, key: &str) -> bool;
	fn set_marker(&self, key: &str);

	/// Registers `hook` to run after each push / replace.
	fn wrap_history(&self, hook: HistoryHook);
}

thread_local! {
	static INSTALLED: RefCell<Option<Rc<dyn Window>>> = const { RefCell::new(None) };
}

/// Makes `window` the address bar of this thread.
///
/// History push / replace events are patched in on first install.
pub fn install_window(window: Rc<dyn Window>) {
	history_patch::patch_history(&*window);
	INSTALLED.with(|slot| *slot.borrow_mut() = Some(window));
	tracing::debug!("window installed");
}

/// Removes the installed window, returning it.
pub fn uninstall_window() -> Option<Rc<dyn Window>> {
	INSTALLED.with(|slot| slot.borrow_mut().take())
}

/// The installed window, if any.
///
/// On `wasm32` an empty slot is filled with the browser's [`WebWindow`]
/// the first time it is asked for.
pub fn current_window() -> Option<Rc<dyn Window>> {
	let installed = INSTALLED.with(|slot| slot.borrow().clone());
	#[cfg(target_arch = "wasm32")]
	if installed.is_none() {
		return install_web_window();
	}
	installed
}

/// Whether a window is installed.
pub fn has_window() -> bool {
	current_window().is_some()
}

#[cfg(target_arch = "wasm32")]
fn install_web_window() -> Option<Rc<dyn Window>> {
	let window: Rc<dyn Window> = Rc::new(WebWindow::new()?);
	install_window(window.clone());
	Some(window)
}

/// Runs `f` with the installed window, or returns `None` without one.
///
/// The slot is not borrowed while `f` runs, so `f` may install or remove
/// windows itself.
pub fn with_window<R>(f: impl FnOnce(&dyn Window) -> R) -> Option<R> {
	current_window().map(|window| f(&*window))
}

#[derive(Debug, Clone, PartialEq)]
struct HistoryEntry {
	pathname: String,
	search: String,
	hash: String,
	state: Option<Value>,
}

impl HistoryEntry {
	fn parse(url: &str, state: Option<Value>) -> Self {
		let (rest, hash) = match url.find('#') {
			Some(at) => (&url[..at], &url[at..]),
			None => (url, ""),
		};
		let (pathname, search) = match rest.find('?') {
			Some(at) => (&rest[..at], &rest[at..]),
			None => (rest, ""),
		};
		Self {
			pathname: if pathname.is_empty() {
				String::from("/")
			} else {
				pathname.to_string()
			},
			search: if search == "?" {
				String::new()
			} else {
				search.to_string()
			},
			hash: if hash == "#" {
				String::new()
			} else {
				hash.to_string()
			},
			state,
		}
	}

	/// Resolves `url` against this entry, the way `pushState` resolves a
	/// relative URL.
	fn resolve(&self, url: &str, origin: &str, state: Option<Value>) -> Self {
		let url = url.strip_prefix(origin).unwrap_or(url);
		if url.starts_with('/') {
			return Self::parse(url, state);
		}
		if url.starts_with('?') {
			return Self::parse(&format!("{}{url}", self.pathname), state);
		}
		if url.starts_with('#') || url.is_empty() {
			return Self::parse(&format!("{}{}{url}", self.pathname, self.search), state);
		}
		let dir = match self.pathname.rfind('/') {
			Some(at) => &self.pathname[..=at],
			None => "/",
		};
		Self::parse(&format!("{dir}{url}"), state)
	}

	fn url(&self) -> String {
		format!("{}{}{}", self.pathname, self.search, self.hash)
	}
}

struct HeadlessState {
	entries: Vec<HistoryEntry>,
	index: usize,
	listeners: Vec<(ListenerId, LocationEvent, Listener)>,
	markers: HashSet<String>,
	hooks: Vec<HistoryHook>,
}

/// An in-process window with a real session-history stack.
///
/// ```
/// use wayfinder_router::window::{HeadlessWindow, Window};
///
/// let window = HeadlessWindow::new("/start?tab=1");
/// window.push_state(None, "/next");
/// assert_eq!(window.pathname(), "/next");
/// window.back();
/// assert_eq!(window.search(), "?tab=1");
/// ```
pub struct HeadlessWindow {
	origin: String,
	state: RefCell<HeadlessState>,
	next_listener: Cell<u64>,
}

impl HeadlessWindow {
	/// Creates a window at `url` on `http://localhost`.
	pub fn new(url: &str) -> Self {
		Self::with_origin("http://localhost", url)
	}

	pub fn with_origin(origin: impl Into<String>, url: &str) -> Self {
		Self {
			origin: origin.into(),
			state: RefCell::new(HeadlessState {
				entries: vec![HistoryEntry::parse(url, None)],
				index: 0,
				listeners: Vec::new(),
				markers: HashSet::new(),
				hooks: Vec::new(),
			}),
			next_listener: Cell::new(0),
		}
	}

	/// Creates a window and installs it for this thread.
	pub fn install(url: &str) -> Rc<HeadlessWindow> {
		let window = Rc::new(Self::new(url));
		install_window(window.clone());
		window
	}

	/// Number of session history entries.
	pub fn history_len(&self) -> usize {
		self.state.borrow().entries.len()
	}

	/// Number of listeners registered for `event`.
	pub fn listener_count(&self, event: LocationEvent) -> usize {
		self.state
			.borrow()
			.listeners
			.iter()
			.filter(|(_, registered, _)| *registered == event)
			.count()
	}

	/// Moves `delta` entries through session history, like `history.go`.
	///
	/// Fires `popstate`, then `hashchange` when only the fragment differs in
	/// the same document. Out-of-range moves do nothing.
	pub fn go(&self, delta: isize) {
		let hash_changed = {
			let mut state = self.state.borrow_mut();
			let Some(target) = state.index.checked_add_signed(delta) else {
				return;
			};
			if target >= state.entries.len() || delta == 0 {
				return;
			}
			let previous = state.entries[state.index].hash.clone();
			state.index = target;
			state.entries[target].hash != previous
		};
		self.dispatch_event(LocationEvent::PopState);
		if hash_changed {
			self.dispatch_event(LocationEvent::HashChange);
		}
	}

	pub fn back(&self) {
		self.go(-1);
	}

	pub fn forward(&self) {
		self.go(1);
	}

	/// Changes the fragment the way following an in-page link does: a new
	/// entry and a `hashchange`, no `popstate`.
	pub fn set_hash(&self, hash: &str) {
		let hash = if hash.starts_with('#') {
			hash.to_string()
		} else {
			format!("#{hash}")
		};
		{
			let mut state = self.state.borrow_mut();
			let current = state.entries[state.index].clone();
			let entry = current.resolve(&hash, &self.origin, None);
			push_entry(&mut state, entry);
		}
		self.dispatch_event(LocationEvent::HashChange);
	}

	fn with_current<R>(&self, f: impl FnOnce(&HistoryEntry) -> R) -> R {
		let state = self.state.borrow();
		f(&state.entries[state.index])
	}

	fn write(&self, method: HistoryMethod, state: Option<Value>, url: &str) {
		{
			let mut inner = self.state.borrow_mut();
			let entry = inner.entries[inner.index].resolve(url, &self.origin, state);
			match method {
				HistoryMethod::Push => push_entry(&mut inner, entry),
				HistoryMethod::Replace => {
					let index = inner.index;
					inner.entries[index] = entry;
				}
			}
		}
		let hooks = self.state.borrow().hooks.clone();
		for hook in hooks {
			hook(self, method);
		}
	}

	fn is_registered(&self, id: ListenerId) -> bool {
		self.state
			.borrow()
			.listeners
			.iter()
			.any(|(registered, _, _)| *registered == id)
	}
}

fn push_entry(state: &mut HeadlessState, entry: HistoryEntry) {
	let keep = state.index + 1;
	state.entries.truncate(keep);
	state.entries.push(entry);
	state.index = keep;
}

impl Window for HeadlessWindow {
	fn pathname(&self) -> String {
		self.with_current(|entry| entry.pathname.clone())
	}

	fn search(&self) -> String {
		self.with_current(|entry| entry.search.clone())
	}

	fn hash(&self) -> String {
		self.with_current(|entry| entry.hash.clone())
	}

	fn href(&self) -> String {
		let url = self.with_current(HistoryEntry::url);
		format!("{}{url}", self.origin)
	}

	fn history_state(&self) -> Option<Value> {
		self.with_current(|entry| entry.state.clone())
	}

	fn push_state(&self, state: Option<Value>, url: &str) {
		self.write(HistoryMethod::Push, state, url);
	}

	fn replace_state(&self, state: Option<Value>, url: &str) {
		self.write(HistoryMethod::Replace, state, url);
	}

	fn add_event_listener(&self, event: LocationEvent, listener: Listener) -> ListenerId {
		let id = ListenerId(self.next_listener.get());
		self.next_listener.set(id.0 + 1);
		self.state.borrow_mut().listeners.push((id, event, listener));
		id
	}

	fn remove_event_listener(&self, event: LocationEvent, id: ListenerId) {
		self.state
			.borrow_mut()
			.listeners
			.retain(|(registered, kind, _)| !(*registered == id && *kind == event));
	}

	fn dispatch_event(&self, event: LocationEvent) {
		// Listeners may add or remove listeners (or navigate) while running
		let snapshot: Vec<(ListenerId, Listener)> = self
			.state
			.borrow()
			.listeners
			.iter()
			.filter(|(_, kind, _)| *kind == event)
			.map(|(id, _, listener)| (*id, listener.clone()))
			.collect();
		for (id, listener) in snapshot {
			if self.is_registered(id) {
				listener();
			}
		}
	}

	fn has_marker(&self, key: &str) -> bool {
		self.state.borrow().markers.contains(key)
	}

	fn set_marker(&self, key: &str) {
		self.state.borrow_mut().markers.insert(key.to_string());
	}

	fn wrap_history(&self, hook: HistoryHook) {
		self.state.borrow_mut().hooks.push(hook);
	}
}

impl fmt::Debug for HeadlessWindow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.borrow();
		f.debug_struct("HeadlessWindow")
			.field("origin", &self.origin)
			.field("current", &state.entries[state.index].url())
			.field("index", &state.index)
			.field("entries", &state.entries.len())
			.field("listeners", &state.listeners.len())
			.finish()
	}
}

#[cfg(target_arch = "wasm32")]
pub use web::WebWindow;

#[cfg(target_arch = "wasm32")]
mod web {
	use std::cell::{Cell, RefCell};
	use std::collections::HashMap;

	use serde_json::Value;
	use wasm_bindgen::JsCast;
	use wasm_bindgen::prelude::*;

	use super::{HistoryHook, HistoryMethod, Listener, ListenerId, LocationEvent, Window};

	thread_local! {
		static HISTORY_HOOKS: RefCell<Vec<HistoryHook>> = const { RefCell::new(Vec::new()) };
	}

	/// Runs the registered hooks after a `pushState` / `replaceState` call,
	/// whoever made it.
	fn run_history_hooks(method: HistoryMethod) {
		let hooks = HISTORY_HOOKS.with(|hooks| hooks.borrow().clone());
		if hooks.is_empty() {
			return;
		}
		let Some(window) = WebWindow::new() else {
			return;
		};
		for hook in hooks {
			hook(&window, method);
		}
	}

	/// Replaces `history[name]` with a function that calls the original and
	/// then the history hooks.
	fn wrap_history_method(history: &web_sys::History, method: HistoryMethod) -> Result<(), JsValue> {
		let name = JsValue::from_str(match method {
			HistoryMethod::Push => "pushState",
			HistoryMethod::Replace => "replaceState",
		});
		let original: js_sys::Function = js_sys::Reflect::get(history, &name)?.dyn_into()?;
		let target = history.clone();
		let wrapper = Closure::wrap(Box::new(move |state: JsValue, title: JsValue, url: JsValue| {
			let result = original.call3(&target, &state, &title, &url);
			run_history_hooks(method);
			result
		}) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
		js_sys::Reflect::set(history, &name, wrapper.as_ref())?;
		// The page's history object keeps the wrapper for the rest of the session
		wrapper.forget();
		Ok(())
	}

	/// The browser window, through `web-sys`.
	///
	/// Markers live on the page's `history` object, so they are shared by
	/// every `WebWindow` and by any other code on the page.
	pub struct WebWindow {
		inner: web_sys::Window,
		listeners: RefCell<HashMap<ListenerId, (LocationEvent, Closure<dyn FnMut(web_sys::Event)>)>>,
		next_listener: Cell<u64>,
	}

	impl WebWindow {
		/// Wraps the global `window`, if there is one.
		pub fn new() -> Option<Self> {
			Some(Self {
				inner: web_sys::window()?,
				listeners: RefCell::new(HashMap::new()),
				next_listener: Cell::new(0),
			})
		}

		fn to_js(state: Option<Value>) -> JsValue {
			state
				.and_then(|value| js_sys::JSON::parse(&value.to_string()).ok())
				.unwrap_or(JsValue::NULL)
		}

		fn write(&self, method: HistoryMethod, state: Option<Value>, url: &str) {
			let Ok(history) = self.inner.history() else {
				return;
			};
			let state = Self::to_js(state);
			let result = match method {
				HistoryMethod::Push => history.push_state_with_url(&state, "", Some(url)),
				HistoryMethod::Replace => history.replace_state_with_url(&state, "", Some(url)),
			};
			if let Err(err) = result {
				tracing::warn!(?err, url, "history update rejected");
			}
		}
	}

	impl Window for WebWindow {
		fn pathname(&self) -> String {
			self.inner
				.location()
				.pathname()
				.unwrap_or_else(|_| String::from("/"))
		}

		fn search(&self) -> String {
			self.inner.location().search().unwrap_or_default()
		}

		fn hash(&self) -> String {
			self.inner.location().hash().unwrap_or_default()
		}

		fn href(&self) -> String {
			self.inner.location().href().unwrap_or_default()
		}

		fn history_state(&self) -> Option<Value> {
			let state = self.inner.history().ok()?.state().ok()?;
			if state.is_null() || state.is_undefined() {
				return None;
			}
			let text: String = js_sys::JSON::stringify(&state).ok()?.into();
			serde_json::from_str(&text).ok()
		}

		fn push_state(&self, state: Option<Value>, url: &str) {
			self.write(HistoryMethod::Push, state, url);
		}

		fn replace_state(&self, state: Option<Value>, url: &str) {
			self.write(HistoryMethod::Replace, state, url);
		}

		fn add_event_listener(&self, event: LocationEvent, listener: Listener) -> ListenerId {
			let id = ListenerId(self.next_listener.get());
			self.next_listener.set(id.0 + 1);

			let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
				listener();
			}) as Box<dyn FnMut(_)>);
			if let Err(err) = self
				.inner
				.add_event_listener_with_callback(event.name(), closure.as_ref().unchecked_ref())
			{
				tracing::warn!(?err, event = event.name(), "failed to add listener");
			}
			self.listeners.borrow_mut().insert(id, (event, closure));
			id
		}

		fn remove_event_listener(&self, event: LocationEvent, id: ListenerId) {
			let Some((registered, closure)) = self.listeners.borrow_mut().remove(&id) else {
				return;
			};
			if registered != event {
				self.listeners.borrow_mut().insert(id, (registered, closure));
				return;
			}
			if let Err(err) = self
				.inner
				.remove_event_listener_with_callback(event.name(), closure.as_ref().unchecked_ref())
			{
				tracing::warn!(?err, event = event.name(), "failed to remove listener");
			}
		}

		fn dispatch_event(&self, event: LocationEvent) {
			let dom_event = match web_sys::Event::new(event.name()) {
				Ok(dom_event) => dom_event,
				Err(err) => {
					tracing::warn!(?err, event = event.name(), "failed to create event");
					return;
				}
			};
			if let Err(err) = self.inner.dispatch_event(&dom_event) {
				tracing::warn!(?err, event = event.name(), "failed to dispatch event");
			}
		}

		fn has_marker(&self, key: &str) -> bool {
			self.inner
				.history()
				.ok()
				.and_then(|history| js_sys::Reflect::get(&history, &JsValue::from_str(key)).ok())
				.is_some_and(|marker| marker.is_truthy())
		}

		fn set_marker(&self, key: &str) {
			let Ok(history) = self.inner.history() else {
				return;
			};
			if let Err(err) = js_sys::Reflect::set(&history, &JsValue::from_str(key), &JsValue::TRUE) {
				tracing::warn!(?err, key, "failed to set history marker");
			}
		}

		/// Registers `hook` and, with the first hook, replaces the page's
		/// `history.pushState` / `history.replaceState` so calls made from
		/// JavaScript run the hooks too.
		fn wrap_history(&self, hook: HistoryHook) {
			let first = HISTORY_HOOKS.with(|hooks| {
				let mut hooks = hooks.borrow_mut();
				hooks.push(hook);
				hooks.len() == 1
			});
			if !first {
				return;
			}
			let Ok(history) = self.inner.history() else {
				return;
			};
			for method in [HistoryMethod::Push, HistoryMethod::Replace] {
				if let Err(err) = wrap_history_method(&history, method) {
					tracing::warn!(?err, ?method, "failed to wrap history method");
				}
			}
		}
	}
}
