//! Defines the Bevy [Plugin] for the flow field workers
//!

use crate::prelude::*;
use bevy::prelude::*;

pub mod flow_layer;
pub mod obstacle_layer;
pub mod visibility_layer;

/// Ordering of the plugin systems within [Update]
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum WorkerSet {
	/// Hand new work to the workers
	Submit,
	/// Pull finished work back from the workers
	Collect,
}

/// Spawns the movement and visibility workers and wires them into the [App]
#[derive(Debug, Default, Clone)]
pub struct FlowFieldWorkersPlugin {
	/// Settings of the workers
	pub config: EngineConfig,
}

impl FlowFieldWorkersPlugin {
	/// Create a new instance of [FlowFieldWorkersPlugin]
	pub fn new(config: EngineConfig) -> Self {
		FlowFieldWorkersPlugin { config }
	}
}

impl Plugin for FlowFieldWorkersPlugin {
	#[cfg(not(tarpaulin_include))]
	fn build(&self, app: &mut App) {
		let movement = match MovementGenerator::from_config(&self.config) {
			Ok(movement) => movement,
			Err(e) => {
				error!("Cannot start the movement worker: {}", e);
				panic!("FlowFieldWorkersPlugin requires a movement worker: {}", e);
			}
		};
		let visibility = match VisibilityGenerator::from_config(&self.config) {
			Ok(visibility) => visibility,
			Err(e) => {
				error!("Cannot start the visibility worker: {}", e);
				panic!("FlowFieldWorkersPlugin requires a visibility worker: {}", e);
			}
		};
		app.register_type::<Cardinal>()
			.register_type::<ObstacleMap>()
			.register_type::<FlowDirection>()
			.register_type::<FlowField>()
			.register_type::<VisibilityMap>()
			.register_type::<View>()
			.register_type::<PushingSquare>()
			.register_type::<PushingMap>()
			.register_type::<Faction>()
			.register_type::<MovementClass>()
			.register_type::<Priority>()
			.register_type::<AssignmentId>()
			.register_type::<PathfindingAlgorithm>()
			.register_type::<EngineConfig>()
			.insert_resource(self.config.clone())
			.insert_resource(movement)
			.insert_resource(visibility)
			.init_resource::<AssignmentRegistry>()
			.init_resource::<LatestVisibility>()
			.add_event::<obstacle_layer::EventUpdateObstacleMaps>()
			.add_event::<obstacle_layer::EventResetGenerators>()
			.add_event::<visibility_layer::EventRequestVisibility>()
			.configure_sets(Update, (WorkerSet::Submit, WorkerSet::Collect).chain())
			.add_systems(
				Update,
				(
					(
						obstacle_layer::forward_resets,
						obstacle_layer::forward_obstacle_map_updates,
						visibility_layer::forward_visibility_requests,
						flow_layer::pulse_moving_targets,
					)
						.chain()
						.in_set(WorkerSet::Submit),
					(
						flow_layer::apply_movement_output,
						visibility_layer::collect_visibility,
					)
						.in_set(WorkerSet::Collect),
				),
			);
		info!(
			"Flow field workers running with {:?} pathfinding",
			self.config.algorithm
		);
	}
}
