//! The [VisibilityGenerator] computes [VisibilityMap]s on a background worker
//! thread through a single task slot:
//!
//! ```text
//! Idle --submit--> Pending --worker--> Computing --worker--> Done --collect--> Idle
//! ```
//!
//! Only one task is outstanding at a time, a submission while the slot is
//! not idle is dropped rather than queued and the caller simply tries again
//! on a later refresh.
//!

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::generators::lock;
use crate::prelude::*;
use bevy::prelude::*;

/// Work for the visibility worker
#[derive(Debug, Clone)]
pub enum VisibilityTask {
	/// Raycast the footprint of each view over a map
	Views {
		/// Snapshot of the obstacles blocking sight
		map: Arc<ObstacleMap>,
		/// Viewers
		views: Vec<View>,
	},
	/// Everything is visible, fog of war disabled
	RevealAll {
		/// Number of columns
		width: u32,
		/// Number of rows
		height: u32,
	},
}

/// Progress of the single task slot
#[derive(Debug, Default)]
enum Slot {
	/// Ready to accept a task
	#[default]
	Idle,
	/// A task waits for the worker
	Pending(VisibilityTask),
	/// The worker is computing
	Computing,
	/// A result waits to be collected
	Done(VisibilityMap),
}

/// Slot plus the shutdown flag, guarded together
#[derive(Debug, Default)]
struct VisibilityState {
	/// The task slot
	slot: Slot,
	/// The worker should exit
	shutdown: bool,
}

/// State shared between the generator handle and its worker
#[derive(Debug, Default)]
struct VisibilityShared {
	/// Guarded slot
	state: Mutex<VisibilityState>,
	/// Signalled when a task is pending or the worker should exit
	wake: Condvar,
	/// Signalled when a result is ready
	done: Condvar,
}

/// Background visibility service
#[derive(Resource, Debug)]
pub struct VisibilityGenerator {
	/// State shared with the worker
	shared: Arc<VisibilityShared>,
	/// Worker thread, joined on drop
	worker: Option<JoinHandle<()>>,
}

impl VisibilityGenerator {
	/// Spawn a generator on a thread called `thread_name`
	pub fn new(thread_name: &str) -> Result<Self, EngineError> {
		let shared = Arc::new(VisibilityShared::default());
		let worker_shared = shared.clone();
		let worker = thread::Builder::new()
			.name(thread_name.to_string())
			.spawn(move || run_worker(&worker_shared))
			.map_err(|source| EngineError::WorkerSpawn {
				name: thread_name.to_string(),
				source,
			})?;
		Ok(VisibilityGenerator {
			shared,
			worker: Some(worker),
		})
	}
	/// Spawn a generator as described by `config`
	pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
		Self::new(&config.visibility_thread_name)
	}
	/// Offer a task to the worker. Returns `false`, dropping the task, when the
	/// previous task is still in progress or its result has not been collected
	pub fn submit(&self, task: VisibilityTask) -> bool {
		let mut state = lock(&self.shared.state);
		if !matches!(state.slot, Slot::Idle) {
			debug!("Visibility task dropped, previous result not collected");
			return false;
		}
		state.slot = Slot::Pending(task);
		drop(state);
		debug!("Visibility task accepted");
		self.shared.wake.notify_one();
		true
	}
	/// Whether a result is ready to be collected
	pub fn is_done(&self) -> bool {
		matches!(lock(&self.shared.state).slot, Slot::Done(_))
	}
	/// Take the finished [VisibilityMap], freeing the slot for the next task
	pub fn collect(&self) -> Option<VisibilityMap> {
		let mut state = lock(&self.shared.state);
		match std::mem::take(&mut state.slot) {
			Slot::Done(map) => Some(map),
			other => {
				state.slot = other;
				None
			}
		}
	}
	/// Block until a result is ready or `timeout` passes, returns whether one is ready
	pub fn wait_until_done(&self, timeout: Duration) -> bool {
		let state = lock(&self.shared.state);
		let (state, _) = self
			.shared
			.done
			.wait_timeout_while(state, timeout, |s| !matches!(s.slot, Slot::Done(_)))
			.unwrap_or_else(PoisonError::into_inner);
		matches!(state.slot, Slot::Done(_))
	}
}

impl Drop for VisibilityGenerator {
	fn drop(&mut self) {
		lock(&self.shared.state).shutdown = true;
		self.shared.wake.notify_all();
		if let Some(worker) = self.worker.take() {
			if worker.join().is_err() {
				error!("Visibility worker panicked");
			}
		}
	}
}

/// Worker loop, runs until shutdown is requested
fn run_worker(shared: &VisibilityShared) {
	info!("Visibility worker started");
	// the fully visible map only depends on the dimensions so it is built once
	let mut everything: Option<VisibilityMap> = None;
	loop {
		let task = {
			let mut state = shared
				.wake
				.wait_while(lock(&shared.state), |s| {
					!s.shutdown && !matches!(s.slot, Slot::Pending(_))
				})
				.unwrap_or_else(PoisonError::into_inner);
			if state.shutdown {
				break;
			}
			match std::mem::replace(&mut state.slot, Slot::Computing) {
				Slot::Pending(task) => task,
				other => {
					state.slot = other;
					continue;
				}
			}
		};
		let result = match task {
			VisibilityTask::Views { map, views } => compute_visibility(&map, &views),
			VisibilityTask::RevealAll { width, height } => {
				let cached = everything
					.as_ref()
					.filter(|m| m.get_dimensions() == (width, height))
					.cloned();
				cached.unwrap_or_else(|| {
					let built = VisibilityMap::everything(width, height);
					everything = Some(built.clone());
					built
				})
			}
		};
		lock(&shared.state).slot = Slot::Done(result);
		shared.done.notify_all();
	}
	info!("Visibility worker stopped");
}

/// Raycast the footprint of every view over `map`.
///
/// For each view rays run from its position to the centre of every cell on
/// the border of its range square, clamped to the map. Every cell a ray
/// crosses is visible, including the obstacle that stops it, as is the cell
/// the viewer stands in
pub fn compute_visibility(map: &ObstacleMap, views: &[View]) -> VisibilityMap {
	let (width, height) = map.get_dimensions();
	let mut visibility = VisibilityMap::new(width, height);
	for view in views {
		visibility.mark(cell_containing(view.position));
		let Some((min, max)) = view.get_bounds(width, height) else {
			continue;
		};
		for border in border_cells(min, max) {
			for cell in Ray::new(map, view.position, cell_centre(border)) {
				visibility.mark(cell);
			}
		}
	}
	visibility
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn open_view_sees_its_square() {
		let map = ObstacleMap::new(9, 9);
		let view = View::new(Vec2::new(4.5, 4.5), 2.0);
		let visibility = compute_visibility(&map, &[view]);
		// 5x5 square around the viewer
		assert_eq!(25, visibility.get_visible_count());
		assert!(visibility.is_visible(IVec2::new(2, 2)));
		assert!(!visibility.is_visible(IVec2::new(1, 4)));
	}
	#[test]
	fn wall_blocks_sight() {
		//  ___________________
		// |   |   | # |   |   |
		// |___|___|___|___|___|
		// | v |   | # |   |   |
		// |___|___|___|___|___|
		// |   |   | # |   |   |
		// |___|___|___|___|___|
		let map = ObstacleMap::from_ascii("..#..\n..#..\n..#..").unwrap();
		let view = View::new(Vec2::new(0.5, 1.5), 4.0);
		let visibility = compute_visibility(&map, &[view]);
		for y in 0..3 {
			assert!(visibility.is_visible(IVec2::new(2, y)), "wall cell is seen");
			assert!(!visibility.is_visible(IVec2::new(3, y)));
			assert!(!visibility.is_visible(IVec2::new(4, y)));
		}
		assert_eq!(9, visibility.get_visible_count());
	}
	#[test]
	fn views_are_additive() {
		let map = ObstacleMap::new(10, 1);
		let views = [
			View::new(Vec2::new(0.5, 0.5), 1.0),
			View::new(Vec2::new(9.5, 0.5), 1.0),
		];
		let visibility = compute_visibility(&map, &views);
		assert_eq!(4, visibility.get_visible_count());
	}
	#[test]
	fn zero_range_sees_own_cell() {
		let map = ObstacleMap::new(3, 3);
		let visibility = compute_visibility(&map, &[View::new(Vec2::new(1.5, 1.5), 0.0)]);
		assert_eq!(1, visibility.get_visible_count());
	}
}
