//! Central lookup of live assignments by [AssignmentId], so that commands and
//! agents refer to their assignment by handle rather than holding it directly
//!

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::prelude::*;
use bevy::prelude::*;

/// Owns every live [MoveToCommandAssignment]
#[derive(Resource, Debug, Default)]
pub struct AssignmentRegistry {
	/// Handle given to the next assignment
	next_id: u64,
	/// Live assignments
	assignments: BTreeMap<AssignmentId, Arc<MoveToCommandAssignment>>,
}

impl AssignmentRegistry {
	/// Create and register a new assignment, it still has to be submitted to
	/// the [MovementGenerator]
	pub fn create(
		&mut self,
		faction: Faction,
		movement_class: MovementClass,
		target: MoveTarget,
		agents: impl IntoIterator<Item = Entity>,
	) -> Arc<MoveToCommandAssignment> {
		let id = self.allocate_id();
		let assignment = Arc::new(MoveToCommandAssignment::new(
			id,
			faction,
			movement_class,
			target,
			agents,
		));
		self.assignments.insert(id, assignment.clone());
		assignment
	}
	/// Hand out an unused [AssignmentId], for assignments built by hand and then [Self::insert]ed
	pub fn allocate_id(&mut self) -> AssignmentId {
		let id = AssignmentId(self.next_id);
		self.next_id += 1;
		id
	}
	/// Register an assignment built elsewhere
	pub fn insert(&mut self, assignment: Arc<MoveToCommandAssignment>) {
		self.assignments.insert(assignment.get_id(), assignment);
	}
	/// Look up an assignment
	pub fn get(&self, id: AssignmentId) -> Option<&Arc<MoveToCommandAssignment>> {
		self.assignments.get(&id)
	}
	/// Latest [FlowField] of an assignment
	pub fn get_flow_field(&self, id: AssignmentId) -> Option<Arc<FlowField>> {
		self.get(id).and_then(|a| a.get_flow_field())
	}
	/// Number of registered assignments
	pub fn len(&self) -> usize {
		self.assignments.len()
	}
	/// Whether nothing is registered
	pub fn is_empty(&self) -> bool {
		self.assignments.is_empty()
	}
	/// Iterate over the registered assignments
	pub fn iter(&self) -> impl Iterator<Item = &Arc<MoveToCommandAssignment>> {
		self.assignments.values()
	}
	/// Drop every assignment that has run out of agents, returning their handles
	pub fn purge_invalid(&mut self) -> Vec<AssignmentId> {
		let purged: Vec<AssignmentId> = self
			.assignments
			.values()
			.filter(|a| a.is_invalid())
			.map(|a| a.get_id())
			.collect();
		for id in &purged {
			self.assignments.remove(id);
		}
		purged
	}
	/// Forget everything, used when a new map is loaded
	pub fn clear(&mut self) {
		self.assignments.clear();
	}
}
