//! Background services producing fields off the main thread.
//!
//! The [movement::MovementGenerator] runs the pathfinding algorithms for the
//! [assignment::MoveToCommandAssignment]s of two factions on one long lived
//! worker thread, while the [visibility::VisibilityGenerator] raycasts
//! [crate::prelude::VisibilityMap]s on another. Both hand their results back
//! under a lock which is only ever held for short mutations, never across a
//! computation.
//!

pub mod assignment;
pub mod movement;
pub mod registry;
pub mod scheduler;
pub mod visibility;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Acquire a lock, recovering the guard if another thread panicked while
/// holding it. Every mutation made under these locks is a single push, swap
/// or flag change so the data is never observed half written
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
