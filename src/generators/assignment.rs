//! A [MoveToCommandAssignment] is a pathfinding request shared by a group of
//! agents heading for the same target with the same [MovementClass].
//!
//! It is shared between the main thread, which adds and removes agents and
//! reports which of them are consuming the result, and the movement worker
//! which reads its [Priority] and stores computed [FlowField]s. Once the last
//! agent leaves, the assignment becomes invalid and stays that way.
//!

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::generators::lock;
use crate::prelude::*;
use bevy::prelude::*;

/// One of the two independently scheduled consumers of the movement worker
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Reflect)]
pub enum Faction {
	Player,
	Opponent,
}

impl Faction {
	/// Both factions, in the order ties are first broken
	pub const ALL: [Faction; 2] = [Faction::Player, Faction::Opponent];
	/// Position of the faction in per-faction arrays
	pub fn index(&self) -> usize {
		match self {
			Faction::Player => 0,
			Faction::Opponent => 1,
		}
	}
	/// The other faction
	pub fn other(&self) -> Faction {
		match self {
			Faction::Player => Faction::Opponent,
			Faction::Opponent => Faction::Player,
		}
	}
}

/// Terrain traversal capability, selects which [ObstacleMap] applies
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Reflect)]
pub enum MovementClass {
	Land,
	Water,
	Amphibious,
}

/// Handle of an assignment in the [AssignmentRegistry]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Reflect)]
pub struct AssignmentId(pub u64);

/// Where an assignment leads
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveTarget {
	/// A fixed point, computed once per change of the obstacle maps
	Point(Vec2),
	/// A moving entity, recomputed continually from its last tracked position
	Entity {
		/// The entity being followed
		entity: Entity,
		/// Where it was last seen
		position: Vec2,
	},
}

impl MoveTarget {
	/// Current target position
	pub fn get_position(&self) -> Vec2 {
		match self {
			MoveTarget::Point(position) => *position,
			MoveTarget::Entity { position, .. } => *position,
		}
	}
	/// Whether the target can move and the path needs refreshing
	pub fn is_moving(&self) -> bool {
		matches!(self, MoveTarget::Entity { .. })
	}
}

/// Scheduling priority, higher is served first
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Reflect)]
pub enum Priority {
	/// No agents remain, the assignment will be dropped
	NoCommands,
	/// Agents are waiting but none is moving along the result yet
	Low,
	/// At least one agent is actively consuming the result
	High,
}

/// Agents of an assignment
#[derive(Debug, Default)]
struct AgentRoster {
	/// Every agent following the assignment
	agents: BTreeSet<Entity>,
	/// Agents currently steering by the computed field
	consuming: BTreeSet<Entity>,
}

/// A pending pathfinding request for a group of agents
#[derive(Debug)]
pub struct MoveToCommandAssignment {
	/// Registry handle
	id: AssignmentId,
	/// Which sub-scheduler serves the request
	faction: Faction,
	/// Which obstacle map applies
	movement_class: MovementClass,
	/// Cells of a target building that are unblocked before computing
	footprint: Option<IRect>,
	/// Where to go
	target: Mutex<MoveTarget>,
	/// Who is going
	roster: Mutex<AgentRoster>,
	/// Set once no agents remain, never cleared
	invalid: AtomicBool,
	/// Most recently computed result
	flow_field: Mutex<Option<Arc<FlowField>>>,
}

impl MoveToCommandAssignment {
	/// Create a new assignment. Without any agents it is born invalid
	pub fn new(
		id: AssignmentId,
		faction: Faction,
		movement_class: MovementClass,
		target: MoveTarget,
		agents: impl IntoIterator<Item = Entity>,
	) -> Self {
		let agents: BTreeSet<Entity> = agents.into_iter().collect();
		let invalid = agents.is_empty();
		MoveToCommandAssignment {
			id,
			faction,
			movement_class,
			footprint: None,
			target: Mutex::new(target),
			roster: Mutex::new(AgentRoster {
				agents,
				consuming: BTreeSet::new(),
			}),
			invalid: AtomicBool::new(invalid),
			flow_field: Mutex::new(None),
		}
	}
	/// Unblock the inclusive rectangle `footprint` of the target (a building
	/// the agents are heading into) before computing
	pub fn with_footprint(mut self, footprint: IRect) -> Self {
		self.footprint = Some(footprint);
		self
	}
	/// Get the registry handle
	pub fn get_id(&self) -> AssignmentId {
		self.id
	}
	/// Get the faction
	pub fn get_faction(&self) -> Faction {
		self.faction
	}
	/// Get the movement class
	pub fn get_movement_class(&self) -> MovementClass {
		self.movement_class
	}
	/// Get the footprint of the target
	pub fn get_footprint(&self) -> Option<IRect> {
		self.footprint
	}
	/// Get the current target
	pub fn get_target(&self) -> MoveTarget {
		*lock(&self.target)
	}
	/// Record the latest position of a moving target, ignored for fixed points
	pub fn track_target(&self, position: Vec2) {
		if let MoveTarget::Entity { position: current, .. } = &mut *lock(&self.target) {
			*current = position;
		}
	}
	/// Add an agent. Refused once the assignment has become invalid
	pub fn add_agent(&self, agent: Entity) -> bool {
		let mut roster = lock(&self.roster);
		if self.is_invalid() {
			return false;
		}
		roster.agents.insert(agent);
		true
	}
	/// Remove an agent that finished or died, the last one leaving invalidates the assignment
	pub fn remove_agent(&self, agent: Entity) {
		let mut roster = lock(&self.roster);
		roster.agents.remove(&agent);
		roster.consuming.remove(&agent);
		if roster.agents.is_empty() {
			self.invalid.store(true, Ordering::Release);
		}
	}
	/// Report whether an agent is steering by the computed field, unknown agents are ignored
	pub fn set_consuming(&self, agent: Entity, consuming: bool) {
		let mut roster = lock(&self.roster);
		if !roster.agents.contains(&agent) {
			return;
		}
		if consuming {
			roster.consuming.insert(agent);
		} else {
			roster.consuming.remove(&agent);
		}
	}
	/// Agents following the assignment
	pub fn get_agents(&self) -> Vec<Entity> {
		lock(&self.roster).agents.iter().copied().collect()
	}
	/// Whether at least one agent is consuming the result
	pub fn is_active(&self) -> bool {
		!lock(&self.roster).consuming.is_empty()
	}
	/// Whether the assignment has emptied and must be dropped
	pub fn is_invalid(&self) -> bool {
		self.invalid.load(Ordering::Acquire)
	}
	/// Scheduling priority derived from the agents
	pub fn get_priority(&self) -> Priority {
		if self.is_invalid() {
			Priority::NoCommands
		} else if self.is_active() {
			Priority::High
		} else {
			Priority::Low
		}
	}
	/// Most recently computed [FlowField]
	pub fn get_flow_field(&self) -> Option<Arc<FlowField>> {
		lock(&self.flow_field).clone()
	}
	/// Store a computed [FlowField]
	pub(crate) fn set_flow_field(&self, field: Arc<FlowField>) {
		*lock(&self.flow_field) = Some(field);
	}
}
