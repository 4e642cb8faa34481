//! Logic relating to moving [FlowField]s between the main thread and the
//! [MovementGenerator]
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Wake the worker each frame so assignments chasing moving targets keep
/// being refreshed
#[cfg(not(tarpaulin_include))]
pub fn pulse_moving_targets(config: Res<EngineConfig>, movement: Res<MovementGenerator>) {
	if config.refresh_moving_targets {
		movement.refresh_moving_targets();
	}
}

/// Drain computed [FlowField]s into their assignments and drop emptied
/// assignments from the [AssignmentRegistry]
#[cfg(not(tarpaulin_include))]
pub fn apply_movement_output(
	movement: Res<MovementGenerator>,
	mut registry: ResMut<AssignmentRegistry>,
) {
	let updated = movement.apply_output();
	if !updated.is_empty() {
		trace!("Applied {} flow fields", updated.len());
	}
	for id in registry.purge_invalid() {
		debug!("Dropped emptied assignment {:?}", id);
	}
}
