//! Reactive Runtime
//!
//! This module provides the core reactive runtime for managing Signal dependencies,
//! Memo recomputation, Effect execution, and update scheduling.
//!
//! ## Architecture
//!
//! The reactive system is a push-notify / pull-read model similar to Leptos and Solid.js:
//!
//! 1. **Observer Stack**: Tracks the currently executing Effect or Memo
//! 2. **Dependency Tracking**: `Signal::get()` and `Memo::get()` record an edge to the current observer
//! 3. **Synchronous derivation**: Memos recompute as soon as a dependency notifies, and only
//!    forward the notification when their value actually changed
//! 4. **Update Scheduling**: Passive effects are queued and flushed by a scheduler (a browser
//!    micro-task in WASM) or manually via [`flush_effects`]
//! 5. **Batching**: [`batch`] coalesces every write inside the closure into one notification
//!    per subscriber
//!
//! ## Example
//!
//! ```ignore
//! use wayfinder_reactive::{Signal, Effect, flush_effects};
//!
//! let count = Signal::new(0);
//!
//! let _effect = Effect::new({
//!     let count = count.clone();
//!     move || println!("Count is: {}", count.get())
//! });
//!
//! count.set(42);
//! flush_effects(); // Prints: "Count is: 42"
//! ```

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicUsize, Ordering};

extern crate alloc;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;

/// Unique identifier for reactive nodes (Signals, Effects, Memos)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
	/// Create a new unique NodeId
	pub fn new() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

impl Default for NodeId {
	fn default() -> Self {
		Self::new()
	}
}

/// Type of reactive node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
	/// A Signal node (source of reactivity)
	Signal,
	/// An Effect node (side effect that runs when dependencies change)
	Effect,
	/// A Memo node (cached derived value)
	Memo,
}

/// Effect execution timing.
///
/// - Layout effects run synchronously inside the notifying write
/// - Passive effects are queued and run on the next flush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectTiming {
	/// Runs synchronously when a dependency changes
	Layout,
	/// Runs on the next flush (scheduler tick or [`flush_effects`])
	#[default]
	Passive,
}

/// Observer represents a currently executing Effect or Memo
#[derive(Debug, Clone)]
pub struct Observer {
	/// Unique identifier for this observer
	pub id: NodeId,
	/// Type of this observer
	pub node_type: NodeType,
	/// Effect execution timing (only meaningful for Effect nodes)
	pub timing: EffectTiming,
}

/// Dependency graph node
#[derive(Debug, Default)]
pub(crate) struct DependencyNode {
	/// IDs of nodes that depend on this node
	pub(crate) subscribers: Vec<NodeId>,
	/// IDs of nodes this node depends on
	pub(crate) dependencies: Vec<NodeId>,
}

/// A re-runnable computation owned by an Effect or a Memo.
///
/// The closure returns `true` when the node's own value changed and its
/// subscribers must be notified (always `false` for effects).
pub(crate) type ReactionFn = Rc<RefCell<dyn FnMut() -> bool>>;

#[derive(Clone)]
pub(crate) struct Reaction {
	pub(crate) node_type: NodeType,
	pub(crate) timing: EffectTiming,
	pub(crate) run: ReactionFn,
}

/// Type for async task scheduler function
type SchedulerFn = Box<dyn Fn(Box<dyn FnOnce() + Send>) + Send + Sync>;

/// Global scheduler function
static SCHEDULER: std::sync::OnceLock<SchedulerFn> = std::sync::OnceLock::new();

/// Set the global scheduler function for passive effect execution.
///
/// This should be called once at application startup. In WASM environments it
/// typically defers to a micro-task via `wasm_bindgen_futures::spawn_local`.
/// Without a scheduler, passive effects wait for an explicit [`flush_effects`].
///
/// # Example
///
/// ```ignore
/// wayfinder_reactive::set_scheduler(|task| {
///     wasm_bindgen_futures::spawn_local(async move { task() });
/// });
/// ```
pub fn set_scheduler<F>(scheduler: F)
where
	F: Fn(Box<dyn FnOnce() + Send>) + Send + Sync + 'static,
{
	let _ = SCHEDULER.set(Box::new(scheduler));
}

/// Reactive runtime
///
/// This struct manages the reactive dependency graph and update scheduling.
/// It uses thread-local storage to maintain separate runtime state per thread.
pub struct Runtime {
	/// Observer stack for tracking currently executing effects and memos
	observer_stack: RefCell<Vec<Observer>>,
	/// Dependency graph: NodeId -> DependencyNode
	pub(crate) dependency_graph: RefCell<BTreeMap<NodeId, DependencyNode>>,
	/// Registered computations for effects and memos
	reactions: RefCell<BTreeMap<NodeId, Reaction>>,
	/// Pending passive effects
	pub(crate) pending_updates: RefCell<Vec<NodeId>>,
	/// Whether a flush is currently scheduled
	pub(crate) update_scheduled: Cell<bool>,
	/// Nesting depth of `batch` calls
	batch_depth: Cell<usize>,
	/// Subscribers collected while batching
	batched: RefCell<Vec<NodeId>>,
}

impl Runtime {
	/// Create a new Runtime instance
	pub fn new() -> Self {
		Self {
			observer_stack: RefCell::new(Vec::new()),
			dependency_graph: RefCell::new(BTreeMap::new()),
			reactions: RefCell::new(BTreeMap::new()),
			pending_updates: RefCell::new(Vec::new()),
			update_scheduled: Cell::new(false),
			batch_depth: Cell::new(0),
			batched: RefCell::new(Vec::new()),
		}
	}

	/// Get the current observer (the currently executing Effect or Memo)
	pub fn current_observer(&self) -> Option<NodeId> {
		self.observer_stack
			.borrow()
			.last()
			.map(|observer| observer.id)
	}

	/// Push an observer onto the stack
	pub fn push_observer(&self, observer: Observer) {
		self.observer_stack.borrow_mut().push(observer);
	}

	/// Pop an observer from the stack
	pub fn pop_observer(&self) -> Option<Observer> {
		self.observer_stack.borrow_mut().pop()
	}

	/// Track a dependency between the current observer and a source node
	///
	/// This is called automatically by `Signal::get()` and `Memo::get()`.
	pub fn track_dependency(&self, source_id: NodeId) {
		if let Some(observer_id) = self.current_observer() {
			if observer_id == source_id {
				return;
			}
			let mut graph = self.dependency_graph.borrow_mut();

			let source_node = graph.entry(source_id).or_default();
			if !source_node.subscribers.contains(&observer_id) {
				source_node.subscribers.push(observer_id);
			}

			let observer_node = graph.entry(observer_id).or_default();
			if !observer_node.dependencies.contains(&source_id) {
				observer_node.dependencies.push(source_id);
			}
		}
	}

	/// Notify that a source node (Signal or Memo) has changed
	///
	/// Subscribers are dispatched from a snapshot of the subscriber list, so an
	/// observer that disposes itself (or a sibling) while running is safe.
	pub fn notify_signal_change(&self, source_id: NodeId) {
		let subscribers = match self.dependency_graph.borrow().get(&source_id) {
			Some(node) => node.subscribers.clone(),
			None => return,
		};

		if self.batch_depth.get() > 0 {
			let mut batched = self.batched.borrow_mut();
			for id in subscribers {
				if !batched.contains(&id) {
					batched.push(id);
				}
			}
			return;
		}

		for subscriber_id in subscribers {
			self.dispatch(subscriber_id);
		}
	}

	fn dispatch(&self, node_id: NodeId) {
		let Some((node_type, timing)) = self
			.reactions
			.borrow()
			.get(&node_id)
			.map(|r| (r.node_type, r.timing))
		else {
			// Disposed during this notification round
			return;
		};

		match (node_type, timing) {
			(NodeType::Memo, _) | (_, EffectTiming::Layout) => self.run_reaction(node_id),
			_ => self.schedule_update(node_id),
		}
	}

	/// Schedule a passive effect for the next flush
	pub fn schedule_update(&self, node_id: NodeId) {
		{
			let mut pending = self.pending_updates.borrow_mut();
			if !pending.contains(&node_id) {
				pending.push(node_id);
			}
		}

		if !self.update_scheduled.get() {
			self.update_scheduled.set(true);

			if let Some(scheduler) = SCHEDULER.get() {
				scheduler(Box::new(|| {
					RUNTIME.with(|rt| rt.flush_updates());
				}));
			}
			// Without a scheduler, updates are flushed manually
		}
	}

	/// Run every pending passive effect
	///
	/// Effects scheduled while flushing are run in the same call.
	pub fn flush_updates(&self) {
		self.update_scheduled.set(false);
		loop {
			let pending = core::mem::take(&mut *self.pending_updates.borrow_mut());
			if pending.is_empty() {
				break;
			}
			for node_id in pending {
				self.run_reaction(node_id);
			}
		}
		self.update_scheduled.set(false);
	}

	pub(crate) fn register_reaction(&self, id: NodeId, reaction: Reaction) {
		self.reactions.borrow_mut().insert(id, reaction);
	}

	pub(crate) fn unregister_reaction(&self, id: NodeId) {
		// Dropped after the borrow ends, the closure may own other reactive nodes
		let removed = self.reactions.borrow_mut().remove(&id);
		self.pending_updates.borrow_mut().retain(|pending| *pending != id);
		self.batched.borrow_mut().retain(|pending| *pending != id);
		drop(removed);
	}

	/// Re-run an effect or memo with fresh dependency tracking
	pub(crate) fn run_reaction(&self, node_id: NodeId) {
		let Some(reaction) = self.reactions.borrow().get(&node_id).cloned() else {
			return;
		};

		// A node re-triggered by its own run is skipped, the outer run already
		// observes the latest values.
		let Ok(mut run) = reaction.run.try_borrow_mut() else {
			tracing::trace!(?node_id, "skipping re-entrant reaction");
			return;
		};

		self.clear_dependencies(node_id);
		self.push_observer(Observer {
			id: node_id,
			node_type: reaction.node_type,
			timing: reaction.timing,
		});
		let changed = (&mut *run)();
		self.pop_observer();
		drop(run);

		if changed {
			self.notify_signal_change(node_id);
		}
	}

	/// Run `f` with every notification deferred until the outermost batch ends
	pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
		struct Guard<'a>(&'a Runtime);
		impl Drop for Guard<'_> {
			fn drop(&mut self) {
				let depth = self.0.batch_depth.get() - 1;
				if depth > 0 {
					self.0.batch_depth.set(depth);
				} else {
					self.0.finish_batch();
				}
			}
		}

		self.batch_depth.set(self.batch_depth.get() + 1);
		let _guard = Guard(self);
		f()
	}

	fn finish_batch(&self) {
		// Depth stays at 1 while memos settle so their own notifications are
		// collected into the same round.
		loop {
			let memos: Vec<NodeId> = {
				let reactions = self.reactions.borrow();
				let mut batched = self.batched.borrow_mut();
				let (memos, rest): (Vec<_>, Vec<_>) = batched.drain(..).partition(|id| {
					reactions
						.get(id)
						.is_some_and(|r| r.node_type == NodeType::Memo)
				});
				*batched = rest;
				memos
			};
			if memos.is_empty() {
				break;
			}
			for id in memos {
				self.run_reaction(id);
			}
		}

		self.batch_depth.set(0);
		let effects = core::mem::take(&mut *self.batched.borrow_mut());
		for id in effects {
			self.dispatch(id);
		}
	}

	/// Run `f` without recording any dependency for the current observer
	pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
		let saved = core::mem::take(&mut *self.observer_stack.borrow_mut());
		let result = f();
		*self.observer_stack.borrow_mut() = saved;
		result
	}

	/// Clear dependencies for a node
	///
	/// This is called before re-executing an Effect/Memo to clear old dependencies.
	pub fn clear_dependencies(&self, node_id: NodeId) {
		let mut graph = self.dependency_graph.borrow_mut();

		let dependencies = match graph.get_mut(&node_id) {
			Some(node) => core::mem::take(&mut node.dependencies),
			None => return,
		};

		for dep_id in dependencies {
			if let Some(dep_node) = graph.get_mut(&dep_id) {
				dep_node.subscribers.retain(|&id| id != node_id);
			}
		}
	}

	/// Remove a node from the dependency graph
	///
	/// This should be called when a Signal/Effect/Memo is dropped.
	pub fn remove_node(&self, node_id: NodeId) {
		self.clear_dependencies(node_id);
		let removed = self.dependency_graph.borrow_mut().remove(&node_id);

		// Observers of a removed source keep no dangling edge to it
		if let Some(node) = removed {
			let mut graph = self.dependency_graph.borrow_mut();
			for subscriber in node.subscribers {
				if let Some(sub_node) = graph.get_mut(&subscriber) {
					sub_node.dependencies.retain(|&id| id != node_id);
				}
			}
		}
	}

	/// Check if a node exists in the dependency graph (for testing)
	pub fn has_node(&self, node_id: NodeId) -> bool {
		self.dependency_graph.borrow().contains_key(&node_id)
	}

	/// Get the number of subscribers for a node (for testing)
	pub fn subscriber_count(&self, node_id: NodeId) -> usize {
		self.dependency_graph
			.borrow()
			.get(&node_id)
			.map(|node| node.subscribers.len())
			.unwrap_or(0)
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

// Thread-local runtime instance
//
// In WASM, there is only one thread, so this effectively provides a global runtime.
// On non-WASM platforms, each thread gets its own runtime instance.
thread_local! {
	static RUNTIME: Runtime = Runtime::new();
}

/// Get a reference to the thread's runtime
pub fn with_runtime<F, R>(f: F) -> R
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.with(f)
}

/// Try to access the runtime (safe version for Drop implementations)
///
/// Returns None if the thread-local storage has been destroyed.
pub(crate) fn try_with_runtime<F, R>(f: F) -> Option<R>
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.try_with(f).ok()
}

/// Run every queued passive effect on this thread.
pub fn flush_effects() {
	with_runtime(|rt| rt.flush_updates());
}

/// Coalesce the notifications of every write inside `f`.
///
/// ```ignore
/// let a = Signal::new(1);
/// let b = Signal::new(2);
/// batch(|| {
///     a.set(10);
///     b.set(20);
/// }); // dependents of both run once
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
	with_runtime(|rt| rt.batch(f))
}

/// Read reactive values without subscribing the current observer.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
	with_runtime(|rt| rt.untrack(f))
}
