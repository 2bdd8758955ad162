//! Signal - Fine-grained Reactive Primitive
//!
//! `Signal<T>` is the core reactive primitive that holds a value and automatically
//! tracks dependencies when accessed.
//!
//! ## Key Features
//!
//! - **Automatic Dependency Tracking**: When `get()` is called inside an Effect or Memo,
//!   the dependency is automatically recorded.
//! - **Change Notification**: When `set()` or `update()` is called, all dependent Memos
//!   recompute and dependent Effects are dispatched according to their timing.
//! - **Change detection**: `set_if_changed()` skips the notification when the new value
//!   equals the current one, and `version()` counts every accepted write.
//!
//! ## Example
//!
//! ```ignore
//! use wayfinder_reactive::Signal;
//!
//! let path = Signal::new(String::from("/"));
//! assert_eq!(path.get(), "/");
//!
//! path.set(String::from("/about"));
//! assert_eq!(path.version(), 1);
//!
//! // Same value: no notification, no version bump
//! assert!(!path.set_if_changed(String::from("/about")));
//! ```

use core::cell::{Cell, RefCell};
use core::fmt;

extern crate alloc;
use alloc::rc::Rc;

use crate::effect::Effect;
use crate::runtime::{EffectTiming, NodeId, try_with_runtime, with_runtime};

/// A reactive signal that holds a value and tracks dependencies
///
/// ## Cloning
///
/// `Signal<T>` implements `Clone` and shares the value via `Rc<RefCell<T>>`.
/// All clones of the same Signal share the same underlying value, version and id.
pub struct Signal<T: 'static> {
	/// Unique identifier for this signal
	id: NodeId,
	/// The actual value, shared via reference counting
	value: Rc<RefCell<T>>,
	/// Number of writes accepted so far
	version: Rc<Cell<u64>>,
}

impl<T: 'static> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			value: self.value.clone(),
			version: self.version.clone(),
		}
	}
}

impl<T: 'static> Signal<T> {
	/// Create a new Signal with the given initial value
	pub fn new(value: T) -> Self {
		Self {
			id: NodeId::new(),
			value: Rc::new(RefCell::new(value)),
			version: Rc::new(Cell::new(0)),
		}
	}

	/// Get the current value of the signal
	///
	/// This automatically tracks the dependency if called from within an Effect or Memo.
	pub fn get(&self) -> T
	where
		T: Clone,
	{
		self.track();
		self.get_untracked()
	}

	/// Get the current value without tracking dependencies
	pub fn get_untracked(&self) -> T
	where
		T: Clone,
	{
		self.value.borrow().clone()
	}

	/// Borrow the current value, tracking the dependency
	///
	/// The closure must not write to this signal.
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		self.track();
		f(&self.value.borrow())
	}

	/// Borrow the current value without tracking dependencies
	pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.value.borrow())
	}

	/// Set the signal to a new value and notify every dependent
	pub fn set(&self, value: T) {
		*self.value.borrow_mut() = value;
		self.bump_and_notify();
	}

	/// Set the signal only when `value` differs from the current value
	///
	/// Returns `true` when the value was replaced (and dependents notified).
	pub fn set_if_changed(&self, value: T) -> bool
	where
		T: PartialEq,
	{
		{
			let mut slot = self.value.borrow_mut();
			if *slot == value {
				return false;
			}
			*slot = value;
		}
		self.bump_and_notify();
		true
	}

	/// Update the signal's value using a function
	///
	/// Dependents are notified once, after `f` returns.
	pub fn update<F>(&self, f: F)
	where
		F: FnOnce(&mut T),
	{
		f(&mut *self.value.borrow_mut());
		self.bump_and_notify();
	}

	/// Number of writes accepted since creation
	pub fn version(&self) -> u64 {
		self.version.get()
	}

	/// Run `callback` with the new value after every accepted write
	///
	/// The callback does not run for the current value. Dropping (or disposing)
	/// the returned [`Effect`] unsubscribes.
	pub fn subscribe<F>(&self, callback: F) -> Effect
	where
		T: Clone,
		F: Fn(&T) + 'static,
	{
		let signal = self.clone();
		let mut seen = None;
		Effect::new_with_timing(
			move || {
				// The version is read tracked so that writes of equal values still fire
				signal.track();
				let version = signal.version();
				if seen.replace(version).is_none() {
					return;
				}
				let value = signal.get_untracked();
				crate::runtime::untrack(|| callback(&value));
			},
			EffectTiming::Layout,
		)
	}

	/// Get the NodeId of this signal
	pub fn id(&self) -> NodeId {
		self.id
	}

	fn track(&self) {
		with_runtime(|rt| rt.track_dependency(self.id));
	}

	fn bump_and_notify(&self) {
		self.version.set(self.version.get() + 1);
		with_runtime(|rt| rt.notify_signal_change(self.id));
	}
}

impl<T: 'static> PartialEq for Signal<T> {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl<T: 'static> Drop for Signal<T> {
	fn drop(&mut self) {
		// Only cleanup Runtime when this is the last Signal clone
		if Rc::strong_count(&self.value) == 1 {
			let _ = try_with_runtime(|rt| rt.remove_node(self.id));
		}
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for Signal<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal")
			.field("id", &self.id)
			.field("value", &*self.value.borrow())
			.field("version", &self.version.get())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serial_test::serial;
	use std::cell::RefCell as StdRefCell;

	#[test]
	#[serial]
	fn test_signal_creation() {
		let signal = Signal::new(42);
		assert_eq!(signal.get_untracked(), 42);
		assert_eq!(signal.version(), 0);
	}

	#[test]
	#[serial]
	fn test_signal_set_and_update() {
		let signal = Signal::new(0);
		signal.set(10);
		signal.update(|n| *n += 5);

		assert_eq!(signal.get(), 15);
		assert_eq!(signal.version(), 2);
	}

	#[test]
	#[serial]
	fn test_set_if_changed_skips_equal_values() {
		let signal = Signal::new(String::from("/"));

		assert!(!signal.set_if_changed(String::from("/")));
		assert_eq!(signal.version(), 0);

		assert!(signal.set_if_changed(String::from("/about")));
		assert_eq!(signal.version(), 1);
		assert_eq!(signal.get(), "/about");
	}

	#[test]
	#[serial]
	fn test_clones_share_value() {
		let signal = Signal::new(1);
		let other = signal.clone();
		other.set(2);

		assert_eq!(signal.get_untracked(), 2);
		assert_eq!(signal, other);
	}

	#[test]
	#[serial]
	fn test_subscribe_fires_on_writes_only() {
		let signal = Signal::new(1);
		let seen = Rc::new(StdRefCell::new(Vec::new()));

		let subscription = signal.subscribe({
			let seen = seen.clone();
			move |value| seen.borrow_mut().push(*value)
		});
		assert!(seen.borrow().is_empty());

		signal.set(2);
		signal.set(2);
		assert_eq!(*seen.borrow(), vec![2, 2]);

		subscription.dispose();
		signal.set(3);
		assert_eq!(*seen.borrow(), vec![2, 2]);
	}

	#[test]
	#[serial]
	fn test_last_clone_removes_node() {
		let signal = Signal::new(0);
		let id = signal.id();
		let subscription = signal.subscribe(|_| {});
		assert!(with_runtime(|rt| rt.has_node(id)));

		drop(subscription);
		drop(signal);
		assert!(!with_runtime(|rt| rt.has_node(id)));
	}
}
