//! Fine-grained reactivity for the wayfinder router.
//!
//! This crate provides the propagation layer the router is built on:
//!
//! - [`Signal`]: a writable reactive cell with change detection
//! - [`Memo`]: a cached value derived from other cells
//! - [`Effect`]: a side effect re-run when its dependencies change
//!
//! Dependencies are recorded automatically by reading a cell inside a running
//! Memo or Effect. All state is thread-local; reactive values are `!Send`.

pub mod effect;
pub mod memo;
pub mod runtime;
pub mod signal;

pub use effect::Effect;
pub use memo::Memo;
pub use runtime::{
	EffectTiming, NodeId, NodeType, Runtime, batch, flush_effects, set_scheduler, untrack,
	with_runtime,
};
pub use signal::Signal;
