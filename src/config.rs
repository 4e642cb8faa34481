//! Configuration of the background workers
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Settings used by [crate::plugin::FlowFieldWorkersPlugin] to build the
/// [MovementGenerator] and [VisibilityGenerator]
#[cfg_attr(
	feature = "serde",
	derive(serde::Deserialize, serde::Serialize),
	serde(default)
)]
#[derive(Resource, Clone, Debug, PartialEq, Reflect)]
pub struct EngineConfig {
	/// Which algorithm the movement worker uses to produce [FlowField]s
	pub algorithm: PathfindingAlgorithm,
	/// Name of the movement worker thread
	pub movement_thread_name: String,
	/// Name of the visibility worker thread
	pub visibility_thread_name: String,
	/// When `true` the movement worker is woken every frame so that assignments
	/// chasing a moving target keep getting recalculated
	pub refresh_moving_targets: bool,
}

impl Default for EngineConfig {
	fn default() -> Self {
		EngineConfig {
			algorithm: PathfindingAlgorithm::default(),
			movement_thread_name: "flowfield-movement".to_string(),
			visibility_thread_name: "flowfield-visibility".to_string(),
			refresh_moving_targets: true,
		}
	}
}

impl EngineConfig {
	/// Parse an [EngineConfig] from a `ron` string, any missing fields take their default value
	#[cfg(feature = "ron")]
	pub fn from_ron_str(text: &str) -> Result<Self, EngineError> {
		Ok(ron::de::from_str(text)?)
	}
	/// Read an [EngineConfig] from a `ron` file
	#[cfg(feature = "ron")]
	pub fn from_ron(path: &str) -> Result<Self, EngineError> {
		let text = std::fs::read_to_string(path)?;
		Self::from_ron_str(&text)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn default_uses_wavefront() {
		let config = EngineConfig::default();
		assert_eq!(PathfindingAlgorithm::Wavefront, config.algorithm);
		assert!(config.refresh_moving_targets);
	}
	#[test]
	#[cfg(feature = "ron")]
	fn partial_ron_config() {
		let config = EngineConfig::from_ron_str("(algorithm: Bfs)").unwrap();
		assert_eq!(PathfindingAlgorithm::Bfs, config.algorithm);
		assert_eq!("flowfield-movement", config.movement_thread_name);
	}
}
