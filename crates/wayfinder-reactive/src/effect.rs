//! Effect - Reactive Side Effects
//!
//! `Effect` represents a side effect that automatically re-runs when its dependencies change.
//! Dependencies are tracked automatically - any Signal or Memo read inside the effect closure
//! becomes a dependency.
//!
//! Layout effects re-run synchronously inside the write that invalidated them. Passive
//! effects are queued and re-run by the scheduler or [`flush_effects`](crate::flush_effects).

use core::cell::{Cell, RefCell};

extern crate alloc;
use alloc::rc::Rc;

use crate::runtime::{EffectTiming, NodeId, NodeType, Reaction, try_with_runtime, with_runtime};

/// A reactive effect that automatically re-runs when its dependencies change
///
/// Effects run immediately when created. Dropping the handle disposes the effect.
///
/// ## Example
///
/// ```ignore
/// use wayfinder_reactive::{Signal, Effect};
///
/// let count = Signal::new(0);
/// let doubled = Signal::new(0);
///
/// let _sync = Effect::new_layout({
///     let (count, doubled) = (count.clone(), doubled.clone());
///     move || doubled.set(count.get() * 2)
/// });
///
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Effect {
	/// Unique identifier for this effect
	id: NodeId,
	/// Whether this effect has been disposed
	disposed: Rc<Cell<bool>>,
}

impl Effect {
	/// Create a new passive Effect that runs the given function
	pub fn new<F>(f: F) -> Self
	where
		F: FnMut() + 'static,
	{
		Self::new_with_timing(f, EffectTiming::Passive)
	}

	/// Create a new layout Effect (re-runs synchronously on change)
	pub fn new_layout<F>(f: F) -> Self
	where
		F: FnMut() + 'static,
	{
		Self::new_with_timing(f, EffectTiming::Layout)
	}

	/// Create a new Effect with explicit timing
	pub fn new_with_timing<F>(mut f: F, timing: EffectTiming) -> Self
	where
		F: FnMut() + 'static,
	{
		let id = NodeId::new();
		let disposed = Rc::new(Cell::new(false));

		let disposed_flag = disposed.clone();
		let run = Rc::new(RefCell::new(move || {
			if !disposed_flag.get() {
				f();
			}
			false
		}));

		with_runtime(|rt| {
			rt.register_reaction(
				id,
				Reaction {
					node_type: NodeType::Effect,
					timing,
					run,
				},
			);
			rt.run_reaction(id);
		});

		Self { id, disposed }
	}

	/// Get the NodeId of this effect
	pub fn id(&self) -> NodeId {
		self.id
	}

	/// Stop the effect; it will never run again
	pub fn dispose(&self) {
		if self.disposed.replace(true) {
			return;
		}
		let _ = try_with_runtime(|rt| {
			rt.unregister_reaction(self.id);
			rt.remove_node(self.id);
		});
	}

	/// Whether [`dispose`](Self::dispose) has been called
	pub fn is_disposed(&self) -> bool {
		self.disposed.get()
	}
}

impl Drop for Effect {
	fn drop(&mut self) {
		self.dispose();
	}
}

impl core::fmt::Debug for Effect {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.debug_struct("Effect")
			.field("id", &self.id)
			.field("disposed", &self.disposed.get())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Signal, flush_effects};
	use serial_test::serial;

	#[test]
	#[serial]
	fn test_effect_runs_immediately() {
		let runs = Rc::new(Cell::new(0));
		let _effect = Effect::new({
			let runs = runs.clone();
			move || runs.set(runs.get() + 1)
		});

		assert_eq!(runs.get(), 1);
	}

	#[test]
	#[serial]
	fn test_passive_effect_waits_for_flush() {
		let signal = Signal::new(0);
		let observed = Rc::new(Cell::new(-1));

		let _effect = Effect::new({
			let (signal, observed) = (signal.clone(), observed.clone());
			move || observed.set(signal.get())
		});
		assert_eq!(observed.get(), 0);

		signal.set(7);
		assert_eq!(observed.get(), 0);

		flush_effects();
		assert_eq!(observed.get(), 7);
	}

	#[test]
	#[serial]
	fn test_layout_effect_runs_synchronously() {
		let count = Signal::new(1);
		let doubled = Signal::new(0);

		let _effect = Effect::new_layout({
			let (count, doubled) = (count.clone(), doubled.clone());
			move || doubled.set(count.get() * 2)
		});
		assert_eq!(doubled.get_untracked(), 2);

		count.set(5);
		assert_eq!(doubled.get_untracked(), 10);
	}

	#[test]
	#[serial]
	fn test_disposed_effect_stops() {
		let signal = Signal::new(0);
		let runs = Rc::new(Cell::new(0));

		let effect = Effect::new_layout({
			let (signal, runs) = (signal.clone(), runs.clone());
			move || {
				signal.get();
				runs.set(runs.get() + 1);
			}
		});

		effect.dispose();
		assert!(effect.is_disposed());
		signal.set(1);

		assert_eq!(runs.get(), 1);
		assert_eq!(with_runtime(|rt| rt.subscriber_count(signal.id())), 0);
	}

	#[test]
	#[serial]
	fn test_dependencies_are_retracked_each_run() {
		let toggle = Signal::new(true);
		let left = Signal::new("left");
		let right = Signal::new("right");
		let seen = Rc::new(RefCell::new(Vec::new()));

		let _effect = Effect::new_layout({
			let (toggle, left, right, seen) =
				(toggle.clone(), left.clone(), right.clone(), seen.clone());
			move || {
				let value = if toggle.get() { left.get() } else { right.get() };
				seen.borrow_mut().push(value);
			}
		});

		toggle.set(false);
		// No longer a dependency
		left.set("ignored");
		right.set("updated");

		assert_eq!(*seen.borrow(), vec!["left", "right", "updated"]);
	}
}
