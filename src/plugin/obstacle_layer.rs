//! Logic for handing changes of the obstacle maps and full resets over to the
//! [MovementGenerator]
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Used to replace the per movement class obstacle maps of a faction, every
/// committed assignment of that faction is recomputed against them
#[derive(Event, Debug, Clone)]
pub struct EventUpdateObstacleMaps {
	/// Faction whose maps change
	faction: Faction,
	/// Immutable snapshots of the new maps
	maps: ObstacleMaps,
}

impl EventUpdateObstacleMaps {
	/// Create a new instance of [EventUpdateObstacleMaps]
	pub fn new(faction: Faction, maps: ObstacleMaps) -> Self {
		EventUpdateObstacleMaps { faction, maps }
	}
	/// Get the faction
	pub fn get_faction(&self) -> Faction {
		self.faction
	}
	/// Get the maps
	pub fn get_maps(&self) -> &ObstacleMaps {
		&self.maps
	}
}

/// Used to discard all movement work of both factions, e.g. when a new map is loaded
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct EventResetGenerators;

/// Read [EventResetGenerators] and reset the workers. Several resets in one
/// frame collapse into one
#[cfg(not(tarpaulin_include))]
pub fn forward_resets(
	mut events: EventReader<EventResetGenerators>,
	movement: Res<MovementGenerator>,
	mut registry: ResMut<AssignmentRegistry>,
	mut latest: ResMut<LatestVisibility>,
) {
	if events.read().count() == 0 {
		return;
	}
	debug!("Resetting generators");
	movement.request_reset();
	registry.clear();
	latest.clear();
}

/// Read [EventUpdateObstacleMaps] and stage the maps with the worker
#[cfg(not(tarpaulin_include))]
pub fn forward_obstacle_map_updates(
	mut events: EventReader<EventUpdateObstacleMaps>,
	movement: Res<MovementGenerator>,
) {
	for event in events.read() {
		movement.update_obstacle_maps(event.get_faction(), event.get_maps().clone());
	}
}
