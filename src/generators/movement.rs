//! The [MovementGenerator] owns a background worker thread computing
//! [FlowField]s for the [MoveToCommandAssignment]s of both factions.
//!
//! Producers (any thread) submit assignments, replace obstacle maps or ask
//! for moving targets to be refreshed, each of which wakes the worker. The
//! worker merges staged work, computes one assignment at a time outside of
//! the lock and appends the result to its faction's output. The main thread
//! later drains the output with [MovementGenerator::apply_output], which is
//! the single point where results cross back into authoritative state.
//!

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::generators::lock;
use crate::generators::scheduler::{ObstacleMaps, SchedulerState};
use crate::prelude::*;
use bevy::prelude::*;

/// State shared between the generator handle and its worker
#[derive(Debug, Default)]
struct MovementShared {
	/// Scheduling state of both factions
	state: Mutex<SchedulerState>,
	/// Signalled when there is work or the worker should exit
	wake: Condvar,
	/// Signalled when the worker goes to sleep
	idle: Condvar,
}

/// Background flow field service shared by both factions
#[derive(Resource, Debug)]
pub struct MovementGenerator {
	/// State shared with the worker
	shared: Arc<MovementShared>,
	/// Worker thread, joined on drop
	worker: Option<JoinHandle<()>>,
	/// Algorithm run by the worker
	algorithm: PathfindingAlgorithm,
}

impl MovementGenerator {
	/// Spawn a generator running `algorithm` on a thread called `thread_name`
	pub fn new(algorithm: PathfindingAlgorithm, thread_name: &str) -> Result<Self, EngineError> {
		let shared = Arc::new(MovementShared::default());
		let worker_shared = shared.clone();
		let pathfinding = algorithm.build();
		let worker = thread::Builder::new()
			.name(thread_name.to_string())
			.spawn(move || run_worker(&worker_shared, pathfinding.as_ref()))
			.map_err(|source| EngineError::WorkerSpawn {
				name: thread_name.to_string(),
				source,
			})?;
		Ok(MovementGenerator {
			shared,
			worker: Some(worker),
			algorithm,
		})
	}
	/// Spawn a generator as described by `config`
	pub fn from_config(config: &EngineConfig) -> Result<Self, EngineError> {
		Self::new(config.algorithm, &config.movement_thread_name)
	}
	/// Get the algorithm the worker runs
	pub fn get_algorithm(&self) -> PathfindingAlgorithm {
		self.algorithm
	}
	/// Submit a new assignment for computation
	pub fn submit(&self, assignment: Arc<MoveToCommandAssignment>) {
		lock(&self.shared.state).submit(assignment);
		self.shared.wake.notify_one();
	}
	/// Replace the obstacle maps of a faction. Every committed assignment of
	/// the faction is recomputed against the new maps. The maps are immutable
	/// snapshots, pass fresh ones rather than mutating maps the worker may hold
	pub fn update_obstacle_maps(&self, faction: Faction, maps: ObstacleMaps) {
		lock(&self.shared.state).update_obstacle_maps(faction, maps);
		self.shared.wake.notify_one();
	}
	/// Wake the worker so that assignments following moving targets are recomputed
	pub fn refresh_moving_targets(&self) {
		let mut state = lock(&self.shared.state);
		if state.get_faction_queue(Faction::Player).get_repeated_count() == 0
			&& state.get_faction_queue(Faction::Opponent).get_repeated_count() == 0
		{
			return;
		}
		state.request_refresh();
		drop(state);
		self.shared.wake.notify_one();
	}
	/// Discard all staged, committed and computed work of both factions, for
	/// instance when a new map is loaded. A computation already underway is
	/// thrown away when it completes
	pub fn request_reset(&self) {
		lock(&self.shared.state).reset();
		self.shared.wake.notify_one();
	}
	/// Hand every computed [FlowField] to its assignment, returning the handles
	/// of the assignments that received one in the order they were computed.
	/// Emptied assignments are dropped from the committed lists
	pub fn apply_output(&self) -> Vec<AssignmentId> {
		let computed = lock(&self.shared.state).take_output();
		computed
			.into_iter()
			.filter(|c| !c.assignment.is_invalid())
			.map(|c| {
				c.assignment.set_flow_field(c.field);
				c.assignment.get_id()
			})
			.collect()
	}
	/// Block until the worker is asleep with nothing staged, or `timeout`
	/// passes. Returns whether the worker went idle
	pub fn wait_until_idle(&self, timeout: Duration) -> bool {
		let state = lock(&self.shared.state);
		let (_state, result) = self
			.shared
			.idle
			.wait_timeout_while(state, timeout, |s| !s.is_idle())
			.unwrap_or_else(std::sync::PoisonError::into_inner);
		!result.timed_out()
	}
	/// Number of committed assignments of a faction
	pub fn get_committed_count(&self, faction: Faction) -> usize {
		lock(&self.shared.state)
			.get_faction_queue(faction)
			.get_committed_count()
	}
	/// Number of computed fields waiting for [Self::apply_output]
	pub fn get_pending_output_count(&self) -> usize {
		lock(&self.shared.state).get_pending_output_count()
	}
}

impl Drop for MovementGenerator {
	fn drop(&mut self) {
		lock(&self.shared.state).request_shutdown();
		self.shared.wake.notify_all();
		if let Some(worker) = self.worker.take() {
			if worker.join().is_err() {
				error!("Movement worker panicked");
			}
		}
	}
}

/// Worker loop, runs until shutdown is requested
fn run_worker(shared: &MovementShared, pathfinding: &dyn Pathfinding) {
	info!("Movement worker started using {}", pathfinding.get_name());
	let mut state = lock(&shared.state);
	loop {
		if state.is_shutdown() {
			break;
		}
		if state.has_staged_work() {
			state.start_cycles();
		}
		let Some(job) = state.next_job() else {
			state.set_idle(true);
			shared.idle.notify_all();
			state = shared
				.wake
				.wait_while(state, |s| !s.is_shutdown() && !s.has_staged_work())
				.unwrap_or_else(std::sync::PoisonError::into_inner);
			state.set_idle(false);
			continue;
		};
		drop(state);
		let started = Instant::now();
		let field = job.run(pathfinding);
		let (id, faction, priority) = (job.assignment.get_id(), job.faction, job.priority);
		state = lock(&shared.state);
		let kept = state.complete_job(job, field);
		trace!(
			"Computed {:?} of {:?} at {:?} in {:?}, kept: {}",
			id,
			faction,
			priority,
			started.elapsed(),
			kept
		);
	}
	drop(state);
	info!("Movement worker stopped");
}
