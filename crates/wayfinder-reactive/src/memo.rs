//! Memo - Cached Derived Values
//!
//! A `Memo<T>` caches the result of a computation over other reactive values.
//! It recomputes synchronously whenever a dependency notifies, and only notifies
//! its own dependents when the recomputed value differs (`PartialEq`) from the
//! cached one. Reading a memo therefore never observes a stale value.

use core::cell::{Cell, RefCell};
use core::fmt;

extern crate alloc;
use alloc::rc::Rc;

use crate::runtime::{
	EffectTiming, NodeId, NodeType, Observer, Reaction, try_with_runtime, with_runtime,
};

/// A cached, reactive derived value
///
/// ```ignore
/// let path = Signal::new(String::from("/app/users"));
/// let depth = Memo::new({
///     let path = path.clone();
///     move || path.with(|p| p.matches('/').count())
/// });
/// assert_eq!(depth.get(), 2);
/// ```
#[derive(Clone)]
pub struct Memo<T: 'static> {
	id: NodeId,
	value: Rc<RefCell<T>>,
	version: Rc<Cell<u64>>,
}

impl<T: Clone + PartialEq + 'static> Memo<T> {
	/// Create a memo; `f` runs immediately to produce the first value
	pub fn new<F>(mut f: F) -> Self
	where
		F: FnMut() -> T + 'static,
	{
		let id = NodeId::new();

		// The first run is tracked by hand so the cache is never empty
		with_runtime(|rt| {
			rt.push_observer(Observer {
				id,
				node_type: NodeType::Memo,
				timing: EffectTiming::Layout,
			})
		});
		let initial = f();
		with_runtime(|rt| rt.pop_observer());

		let value = Rc::new(RefCell::new(initial));
		let version = Rc::new(Cell::new(0u64));

		let slot = Rc::downgrade(&value);
		let counter = Rc::downgrade(&version);
		let run = Rc::new(RefCell::new(move || {
			let next = f();
			let (Some(slot), Some(counter)) = (slot.upgrade(), counter.upgrade()) else {
				return false;
			};
			let mut current = slot.borrow_mut();
			if *current == next {
				return false;
			}
			*current = next;
			counter.set(counter.get() + 1);
			true
		}));

		with_runtime(|rt| {
			rt.register_reaction(
				id,
				Reaction {
					node_type: NodeType::Memo,
					timing: EffectTiming::Layout,
					run,
				},
			)
		});

		Self { id, value, version }
	}

	/// Read the cached value, tracking the dependency
	pub fn get(&self) -> T {
		with_runtime(|rt| rt.track_dependency(self.id));
		self.get_untracked()
	}

	/// Read the cached value without tracking
	pub fn get_untracked(&self) -> T {
		self.value.borrow().clone()
	}

	/// Borrow the cached value, tracking the dependency
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		with_runtime(|rt| rt.track_dependency(self.id));
		f(&self.value.borrow())
	}
}

impl<T: 'static> Memo<T> {
	/// Number of times the cached value changed after creation
	pub fn version(&self) -> u64 {
		self.version.get()
	}

	/// Get the NodeId of this memo
	pub fn id(&self) -> NodeId {
		self.id
	}
}

impl<T: 'static> PartialEq for Memo<T> {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl<T: 'static> Drop for Memo<T> {
	fn drop(&mut self) {
		if Rc::strong_count(&self.value) == 1 {
			let _ = try_with_runtime(|rt| {
				rt.unregister_reaction(self.id);
				rt.remove_node(self.id);
			});
		}
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for Memo<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Memo")
			.field("id", &self.id)
			.field("value", &*self.value.borrow())
			.field("version", &self.version.get())
			.finish()
	}
}
