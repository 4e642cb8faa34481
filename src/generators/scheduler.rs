//! Scheduling state of the [crate::prelude::MovementGenerator], kept free of
//! threads so that the ordering rules can be exercised directly.
//!
//! Each [Faction] has a [FactionQueue]:
//! - `commands` are the committed assignments
//! - `new_commands` are submitted but not yet merged
//! - `inputs` still need computing this cycle
//! - `repeated_inputs` hold moving-target assignments waiting for their next refresh
//! - `obstacle_maps` apply to the current cycle while `new_obstacle_maps` are staged
//! - `output` holds computed fields waiting to be drained
//!
//! A cycle starts by merging staged work. Only a change of obstacle maps sends
//! every committed assignment back into `inputs`, a new command does not
//! force the others to be recomputed.
//!
//! Jobs are then handed out one at a time. The faction whose best pending
//! [Priority] is higher goes first, when both are equal the `next_faction`
//! pointer decides and after every step it moves to the faction that was not
//! served, so equal priority factions strictly alternate. Within a faction the
//! first queued assignment of the best priority is taken.
//!

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::prelude::*;
use bevy::prelude::*;

/// Obstacle maps of a faction by movement class
pub type ObstacleMaps = BTreeMap<MovementClass, Arc<ObstacleMap>>;

/// A computed [FlowField] waiting to be handed to its assignment
#[derive(Debug, Clone)]
pub struct ComputedField {
	/// Order in which results were produced across both factions
	pub sequence: u64,
	/// Assignment the field belongs to
	pub assignment: Arc<MoveToCommandAssignment>,
	/// The result
	pub field: Arc<FlowField>,
}

/// A single pathfinding computation handed to the worker
#[derive(Debug, Clone)]
pub struct Job {
	/// Faction being served
	pub faction: Faction,
	/// Priority the assignment had when it was picked
	pub priority: Priority,
	/// Assignment to compute
	pub assignment: Arc<MoveToCommandAssignment>,
	/// Immutable snapshot of the map for the assignment's movement class
	pub map: Arc<ObstacleMap>,
	/// Reset generation the job was created in
	pub generation: u64,
}

impl Job {
	/// Compute the [FlowField] of the job. A target footprint is unblocked on
	/// a private copy of the map, the shared snapshot is never modified
	pub fn run(&self, algorithm: &dyn Pathfinding) -> FlowField {
		let target = self.assignment.get_target().get_position();
		match self.assignment.get_footprint() {
			Some(footprint) => {
				let mut map = (*self.map).clone();
				map.unblock_area(footprint);
				algorithm.generate(&map, target)
			}
			None => algorithm.generate(&self.map, target),
		}
	}
}

/// Whether a queue already holds the assignment `id`
fn is_queued(queue: &VecDeque<Arc<MoveToCommandAssignment>>, id: AssignmentId) -> bool {
	queue.iter().any(|a| a.get_id() == id)
}

/// Scheduling state of one faction
#[derive(Debug, Default)]
pub struct FactionQueue {
	/// Committed assignments
	commands: Vec<Arc<MoveToCommandAssignment>>,
	/// Submitted assignments waiting for the next cycle
	new_commands: Vec<Arc<MoveToCommandAssignment>>,
	/// Assignments to compute this cycle
	inputs: VecDeque<Arc<MoveToCommandAssignment>>,
	/// Moving-target assignments to compute again next cycle
	repeated_inputs: VecDeque<Arc<MoveToCommandAssignment>>,
	/// Maps used by the current cycle
	obstacle_maps: ObstacleMaps,
	/// Maps replacing the current ones at the next cycle
	new_obstacle_maps: Option<ObstacleMaps>,
	/// Computed fields waiting to be drained
	output: Vec<ComputedField>,
}

impl FactionQueue {
	/// Whether commands or maps are waiting to be merged
	pub fn has_staged_work(&self) -> bool {
		!self.new_commands.is_empty() || self.new_obstacle_maps.is_some()
	}
	/// Merge staged work, returns whether the obstacle maps changed
	pub fn start_cycle(&mut self) -> bool {
		for command in std::mem::take(&mut self.new_commands) {
			if !is_queued(&self.inputs, command.get_id()) {
				self.inputs.push_back(command.clone());
			}
			if !self.commands.iter().any(|a| a.get_id() == command.get_id()) {
				self.commands.push(command);
			}
		}
		while let Some(repeated) = self.repeated_inputs.pop_front() {
			if !is_queued(&self.inputs, repeated.get_id()) {
				self.inputs.push_back(repeated);
			}
		}
		let maps_changed = match self.new_obstacle_maps.take() {
			Some(maps) => {
				self.obstacle_maps = maps;
				true
			}
			None => false,
		};
		self.prune();
		if maps_changed {
			self.inputs = self.commands.iter().cloned().collect();
		}
		maps_changed
	}
	/// Drop emptied assignments everywhere
	fn prune(&mut self) {
		self.commands.retain(|a| !a.is_invalid());
		self.inputs.retain(|a| !a.is_invalid());
		self.repeated_inputs.retain(|a| !a.is_invalid());
	}
	/// Best priority among the assignments still to compute
	pub fn get_best_priority(&self) -> Option<Priority> {
		self.inputs
			.iter()
			.map(|a| a.get_priority())
			.filter(|p| *p != Priority::NoCommands)
			.max()
	}
	/// Remove the first assignment holding the best priority
	fn take_best(&mut self) -> Option<(Arc<MoveToCommandAssignment>, Priority)> {
		let mut best: Option<(usize, Priority)> = None;
		for (index, assignment) in self.inputs.iter().enumerate() {
			let priority = assignment.get_priority();
			if priority == Priority::NoCommands {
				continue;
			}
			if best.is_none_or(|(_, b)| priority > b) {
				best = Some((index, priority));
			}
		}
		let (index, priority) = best?;
		self.inputs.remove(index).map(|a| (a, priority))
	}
	/// Number of committed assignments
	pub fn get_committed_count(&self) -> usize {
		self.commands.len()
	}
	/// Number of assignments still to compute this cycle
	pub fn get_input_count(&self) -> usize {
		self.inputs.len()
	}
	/// Number of moving-target assignments waiting for a refresh
	pub fn get_repeated_count(&self) -> usize {
		self.repeated_inputs.len()
	}
}

/// Shared state of both factions, guarded by the generator's lock
#[derive(Debug)]
pub struct SchedulerState {
	/// Sub-schedulers indexed by [Faction::index]
	factions: [FactionQueue; 2],
	/// Faction served when both have equal priority
	next_faction: Faction,
	/// Bumped on every reset, results of older generations are discarded
	generation: u64,
	/// Source of [ComputedField::sequence]
	sequence: u64,
	/// A moving-target refresh was asked for
	refresh_requested: bool,
	/// The worker should exit
	shutdown: bool,
	/// The worker is asleep with nothing to do
	idle: bool,
}

impl Default for SchedulerState {
	fn default() -> Self {
		SchedulerState {
			factions: Default::default(),
			next_faction: Faction::Player,
			generation: 0,
			sequence: 0,
			refresh_requested: false,
			shutdown: false,
			idle: false,
		}
	}
}

impl SchedulerState {
	/// Stage a new assignment for its faction
	pub fn submit(&mut self, assignment: Arc<MoveToCommandAssignment>) {
		let faction = assignment.get_faction();
		self.factions[faction.index()].new_commands.push(assignment);
		self.idle = false;
	}
	/// Stage replacement obstacle maps for a faction
	pub fn update_obstacle_maps(&mut self, faction: Faction, maps: ObstacleMaps) {
		self.factions[faction.index()].new_obstacle_maps = Some(maps);
		self.idle = false;
	}
	/// Ask for moving-target assignments to be computed again
	pub fn request_refresh(&mut self) {
		self.refresh_requested = true;
		self.idle = false;
	}
	/// Discard all staged, committed and computed state of both factions
	pub fn reset(&mut self) {
		self.factions = Default::default();
		self.next_faction = Faction::Player;
		self.refresh_requested = false;
		self.generation += 1;
		debug!("Movement scheduler reset to generation {}", self.generation);
	}
	/// Whether the worker has something to merge
	pub fn has_staged_work(&self) -> bool {
		self.refresh_requested || self.factions.iter().any(|f| f.has_staged_work())
	}
	/// Start a cycle for both factions
	pub fn start_cycles(&mut self) {
		self.refresh_requested = false;
		for faction in Faction::ALL {
			let queue = &mut self.factions[faction.index()];
			let maps_changed = queue.start_cycle();
			debug!(
				"{:?} cycle: {} committed, {} inputs, obstacle maps changed: {}",
				faction,
				queue.get_committed_count(),
				queue.get_input_count(),
				maps_changed
			);
		}
	}
	/// Pick the next assignment to compute, assignments whose movement class
	/// has no obstacle map are skipped
	pub fn next_job(&mut self) -> Option<Job> {
		loop {
			for queue in self.factions.iter_mut() {
				queue.inputs.retain(|a| !a.is_invalid());
			}
			let player = self.factions[Faction::Player.index()].get_best_priority();
			let opponent = self.factions[Faction::Opponent.index()].get_best_priority();
			let faction = match (player, opponent) {
				(None, None) => return None,
				(Some(_), None) => Faction::Player,
				(None, Some(_)) => Faction::Opponent,
				(Some(p), Some(o)) if p > o => Faction::Player,
				(Some(p), Some(o)) if o > p => Faction::Opponent,
				_ => self.next_faction,
			};
			self.next_faction = faction.other();
			let queue = &mut self.factions[faction.index()];
			let Some((assignment, priority)) = queue.take_best() else {
				continue;
			};
			let class = assignment.get_movement_class();
			let Some(map) = queue.obstacle_maps.get(&class).cloned() else {
				warn!(
					"Skipping assignment {:?} of {:?}, no obstacle map for {:?}",
					assignment.get_id(),
					faction,
					class
				);
				continue;
			};
			return Some(Job {
				faction,
				priority,
				assignment,
				map,
				generation: self.generation,
			});
		}
	}
	/// Store the result of a job. Returns `false` when it was discarded because
	/// a reset happened meanwhile or the assignment emptied
	pub fn complete_job(&mut self, job: Job, field: FlowField) -> bool {
		if job.generation != self.generation || job.assignment.is_invalid() {
			return false;
		}
		self.sequence += 1;
		let sequence = self.sequence;
		let queue = &mut self.factions[job.faction.index()];
		if job.assignment.get_target().is_moving()
			&& !is_queued(&queue.repeated_inputs, job.assignment.get_id())
		{
			queue.repeated_inputs.push_back(job.assignment.clone());
		}
		queue.output.push(ComputedField {
			sequence,
			assignment: job.assignment,
			field: Arc::new(field),
		});
		true
	}
	/// Drain the computed fields of both factions in the order they were
	/// produced and drop emptied assignments from the committed lists
	pub fn take_output(&mut self) -> Vec<ComputedField> {
		let mut output = Vec::new();
		for queue in self.factions.iter_mut() {
			output.append(&mut queue.output);
			queue.commands.retain(|a| !a.is_invalid());
		}
		output.sort_by_key(|c| c.sequence);
		output
	}
	/// Get the sub-scheduler of a faction
	pub fn get_faction_queue(&self, faction: Faction) -> &FactionQueue {
		&self.factions[faction.index()]
	}
	/// Number of computed fields waiting to be drained
	pub fn get_pending_output_count(&self) -> usize {
		self.factions.iter().map(|f| f.output.len()).sum()
	}
	/// Current reset generation
	pub fn get_generation(&self) -> u64 {
		self.generation
	}
	/// Whether the worker is asleep with nothing staged
	pub fn is_idle(&self) -> bool {
		self.idle && !self.has_staged_work()
	}
	/// Record whether the worker is asleep
	pub fn set_idle(&mut self, idle: bool) {
		self.idle = idle;
	}
	/// Ask the worker to exit
	pub fn request_shutdown(&mut self) {
		self.shutdown = true;
	}
	/// Whether the worker should exit
	pub fn is_shutdown(&self) -> bool {
		self.shutdown
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Land maps for both factions
	fn open_maps() -> ObstacleMaps {
		BTreeMap::from([(MovementClass::Land, Arc::new(ObstacleMap::new(6, 6)))])
	}
	/// A land assignment with a single agent
	fn assignment(id: u64, faction: Faction, target: MoveTarget) -> Arc<MoveToCommandAssignment> {
		Arc::new(MoveToCommandAssignment::new(
			AssignmentId(id),
			faction,
			MovementClass::Land,
			target,
			[Entity::from_raw(id as u32 + 100)],
		))
	}
	/// A land assignment toward a fixed point
	fn point(id: u64, faction: Faction) -> Arc<MoveToCommandAssignment> {
		assignment(id, faction, MoveTarget::Point(Vec2::new(2.5, 2.5)))
	}
	/// Scheduler with maps for both factions staged
	fn scheduler() -> SchedulerState {
		let mut state = SchedulerState::default();
		for faction in Faction::ALL {
			state.update_obstacle_maps(faction, open_maps());
		}
		state
	}
	/// Hand out every job, completing each with an empty field, and record the order
	fn drain_jobs(state: &mut SchedulerState) -> Vec<u64> {
		let mut order = Vec::new();
		while let Some(job) = state.next_job() {
			order.push(job.assignment.get_id().0);
			let field = FlowField::undetermined_for(&job.map, Vec2::ZERO);
			state.complete_job(job, field);
		}
		order
	}

	#[test]
	fn active_beats_inactive_across_factions() {
		let mut state = scheduler();
		let p1 = point(1, Faction::Player);
		let p2 = point(2, Faction::Player);
		let o3 = point(3, Faction::Opponent);
		let o4 = point(4, Faction::Opponent);
		o4.set_consuming(Entity::from_raw(104), true);
		p2.set_consuming(Entity::from_raw(102), true);
		for a in [&p1, &p2, &o3, &o4] {
			state.submit((*a).clone());
		}
		state.start_cycles();
		let order = drain_jobs(&mut state);
		// both high priority assignments first, alternating from the player
		assert_eq!(vec![2, 4, 1, 3], order);
	}
	#[test]
	fn higher_priority_faction_is_served_repeatedly() {
		let mut state = scheduler();
		for id in 1..=3 {
			let a = point(id, Faction::Opponent);
			a.set_consuming(Entity::from_raw(id as u32 + 100), true);
			state.submit(a);
		}
		state.submit(point(9, Faction::Player));
		state.start_cycles();
		assert_eq!(vec![1, 2, 3, 9], drain_jobs(&mut state));
	}
	#[test]
	fn equal_priority_alternates() {
		let mut state = scheduler();
		for (id, faction) in [
			(1, Faction::Player),
			(2, Faction::Player),
			(3, Faction::Player),
			(4, Faction::Opponent),
			(5, Faction::Opponent),
		] {
			state.submit(point(id, faction));
		}
		state.start_cycles();
		assert_eq!(vec![1, 4, 2, 5, 3], drain_jobs(&mut state));
	}
	#[test]
	fn new_command_does_not_recompute_others() {
		let mut state = scheduler();
		state.submit(point(1, Faction::Player));
		state.start_cycles();
		assert_eq!(vec![1], drain_jobs(&mut state));
		state.submit(point(2, Faction::Player));
		assert!(state.has_staged_work());
		state.start_cycles();
		assert_eq!(vec![2], drain_jobs(&mut state));
		assert_eq!(2, state.get_faction_queue(Faction::Player).get_committed_count());
	}
	#[test]
	fn map_change_recomputes_everything() {
		let mut state = scheduler();
		state.submit(point(1, Faction::Player));
		state.submit(point(2, Faction::Player));
		state.start_cycles();
		drain_jobs(&mut state);
		state.update_obstacle_maps(Faction::Player, open_maps());
		state.start_cycles();
		assert_eq!(vec![1, 2], drain_jobs(&mut state));
	}
	#[test]
	fn emptied_assignment_is_removed() {
		let mut state = scheduler();
		let a = point(1, Faction::Player);
		state.submit(a.clone());
		state.submit(point(2, Faction::Player));
		a.remove_agent(Entity::from_raw(101));
		state.start_cycles();
		assert_eq!(vec![2], drain_jobs(&mut state));
		assert_eq!(1, state.get_faction_queue(Faction::Player).get_committed_count());
		assert!(state.take_output().iter().all(|c| c.assignment.get_id() != AssignmentId(1)));
	}
	#[test]
	fn result_of_emptied_assignment_is_dropped() {
		let mut state = scheduler();
		let a = point(1, Faction::Player);
		state.submit(a.clone());
		state.start_cycles();
		let job = state.next_job().unwrap();
		a.remove_agent(Entity::from_raw(101));
		let field = FlowField::undetermined_for(&job.map, Vec2::ZERO);
		assert!(!state.complete_job(job, field));
		assert!(state.take_output().is_empty());
		assert_eq!(0, state.get_faction_queue(Faction::Player).get_committed_count());
	}
	#[test]
	fn reset_discards_in_flight_work() {
		let mut state = scheduler();
		state.submit(point(1, Faction::Player));
		state.start_cycles();
		let job = state.next_job().unwrap();
		state.reset();
		state.submit(point(2, Faction::Player));
		let field = FlowField::undetermined_for(&job.map, Vec2::ZERO);
		assert!(!state.complete_job(job, field));
		assert_eq!(0, state.get_pending_output_count());
		// the maps were discarded too
		state.start_cycles();
		assert!(state.next_job().is_none());
		state.update_obstacle_maps(Faction::Player, open_maps());
		state.start_cycles();
		assert_eq!(vec![2], drain_jobs(&mut state));
	}
	#[test]
	fn moving_target_repeats_on_refresh() {
		let mut state = scheduler();
		let chasing = assignment(
			1,
			Faction::Opponent,
			MoveTarget::Entity {
				entity: Entity::from_raw(50),
				position: Vec2::new(1.5, 1.5),
			},
		);
		state.submit(chasing.clone());
		state.start_cycles();
		assert_eq!(vec![1], drain_jobs(&mut state));
		assert_eq!(1, state.get_faction_queue(Faction::Opponent).get_repeated_count());
		assert!(!state.has_staged_work());
		chasing.track_target(Vec2::new(4.5, 4.5));
		state.request_refresh();
		assert!(state.has_staged_work());
		state.start_cycles();
		let job = state.next_job().unwrap();
		assert_eq!(Vec2::new(4.5, 4.5), job.assignment.get_target().get_position());
	}
	#[test]
	fn missing_map_skips_assignment() {
		let mut state = SchedulerState::default();
		state.submit(point(1, Faction::Player));
		state.start_cycles();
		assert!(state.next_job().is_none());
		assert_eq!(1, state.get_faction_queue(Faction::Player).get_committed_count());
	}
	#[test]
	fn output_in_production_order() {
		let mut state = scheduler();
		state.submit(point(1, Faction::Opponent));
		state.submit(point(2, Faction::Player));
		state.submit(point(3, Faction::Player));
		state.start_cycles();
		drain_jobs(&mut state);
		let ids: Vec<u64> = state
			.take_output()
			.iter()
			.map(|c| c.assignment.get_id().0)
			.collect();
		assert_eq!(vec![2, 1, 3], ids);
	}
	#[test]
	fn footprint_is_unblocked_on_a_copy() {
		//  ___________
		// |   |   |   |
		// |___|___|___|
		// |   | # |   |
		// |___|___|___|
		// |   |   |   |
		// |___|___|___|
		let map = Arc::new(ObstacleMap::from_ascii("...\n.#.\n...").unwrap());
		let building = Arc::new(
			MoveToCommandAssignment::new(
				AssignmentId(1),
				Faction::Player,
				MovementClass::Land,
				MoveTarget::Point(Vec2::new(1.5, 1.5)),
				[Entity::from_raw(1)],
			)
			.with_footprint(IRect::new(1, 1, 1, 1)),
		);
		let job = Job {
			faction: Faction::Player,
			priority: Priority::Low,
			assignment: building,
			map: map.clone(),
			generation: 0,
		};
		let field = job.run(&BfsPathfinding);
		assert_eq!(8, field.get_determined_count());
		assert!(map.is_blocked(IVec2::new(1, 1)));
	}
}
