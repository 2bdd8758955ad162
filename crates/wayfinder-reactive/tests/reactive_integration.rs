//! Integration tests for the reactive propagation layer

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rstest::rstest;
use serial_test::serial;
use wayfinder_reactive::{Effect, Memo, Signal, batch, flush_effects, untrack, with_runtime};

#[rstest]
#[serial]
fn test_derived_location_chain() {
	// Arrange
	let path = Signal::new(String::from("/app/users/42"));
	let base = Signal::new(String::from("/app"));
	let relative = Memo::new({
		let (path, base) = (path.clone(), base.clone());
		move || {
			let base = base.get();
			path.with(|p| p.strip_prefix(&base).unwrap_or(p).to_string())
		}
	});
	let seen = Rc::new(RefCell::new(Vec::new()));
	let _render = Effect::new_layout({
		let (relative, seen) = (relative.clone(), seen.clone());
		move || seen.borrow_mut().push(relative.get())
	});

	// Act
	path.set(String::from("/app/settings"));
	base.set(String::from("/app/settings"));
	path.set(String::from("/app/settings"));

	// Assert
	// The last write is equal after derivation and does not re-render
	assert_eq!(*seen.borrow(), vec!["/users/42", "/settings", ""]);
}

#[rstest]
#[serial]
fn test_untracked_read_does_not_subscribe() {
	// Arrange
	let tracked = Signal::new(0);
	let ignored = Signal::new(0);
	let runs = Rc::new(Cell::new(0));
	let _effect = Effect::new_layout({
		let (tracked, ignored, runs) = (tracked.clone(), ignored.clone(), runs.clone());
		move || {
			tracked.get();
			untrack(|| ignored.get());
			runs.set(runs.get() + 1);
		}
	});

	// Act
	ignored.set(1);
	tracked.set(1);

	// Assert
	assert_eq!(runs.get(), 2);
}

#[rstest]
#[serial]
fn test_nested_batches_flush_once() {
	// Arrange
	let value = Signal::new(0);
	let runs = Rc::new(Cell::new(0));
	let _effect = Effect::new_layout({
		let (value, runs) = (value.clone(), runs.clone());
		move || {
			value.get();
			runs.set(runs.get() + 1);
		}
	});

	// Act
	batch(|| {
		value.set(1);
		batch(|| value.set(2));
		value.set(3);
	});

	// Assert
	assert_eq!(runs.get(), 2);
	assert_eq!(value.get_untracked(), 3);
}

#[rstest]
#[serial]
fn test_passive_effects_coalesce_until_flush() {
	// Arrange
	let value = Signal::new(0);
	let seen = Rc::new(RefCell::new(Vec::new()));
	let _effect = Effect::new({
		let (value, seen) = (value.clone(), seen.clone());
		move || seen.borrow_mut().push(value.get())
	});

	// Act
	value.set(1);
	value.set(2);
	flush_effects();

	// Assert
	assert_eq!(*seen.borrow(), vec![0, 2]);
}

#[rstest]
#[serial]
fn test_effect_disposing_itself_during_notification() {
	// Arrange
	let value = Signal::new(0);
	let holder: Rc<RefCell<Option<Effect>>> = Rc::new(RefCell::new(None));
	let other_runs = Rc::new(Cell::new(0));
	let effect = Effect::new_layout({
		let (value, holder) = (value.clone(), holder.clone());
		move || {
			if value.get() > 0 {
				if let Some(effect) = holder.borrow().as_ref() {
					effect.dispose();
				}
			}
		}
	});
	*holder.borrow_mut() = Some(effect);
	let _other = Effect::new_layout({
		let (value, other_runs) = (value.clone(), other_runs.clone());
		move || {
			value.get();
			other_runs.set(other_runs.get() + 1);
		}
	});

	// Act
	value.set(1);
	value.set(2);

	// Assert
	assert_eq!(other_runs.get(), 3);
	assert_eq!(with_runtime(|rt| rt.subscriber_count(value.id())), 1);
}
