//! Algorithms turning an [ObstacleMap] and a target point into a [FlowField].
//!
//! Both algorithms satisfy the same contract and are interchangeable:
//! - a target outside of the map gives an all-undetermined field
//! - cells that cannot reach the target stay undetermined
//! - after [repair_edges] no cell's direction steps along an axis into a blocked cell
//! - the target cell itself is left undetermined, arrived agents get no further push
//!

pub mod bfs;
pub mod wavefront;

use std::sync::Arc;

use crate::prelude::*;
use bevy::prelude::*;

/// Computes a [FlowField] toward a target
pub trait Pathfinding: Send + Sync + std::fmt::Debug {
	/// Short name used in logs
	fn get_name(&self) -> &'static str;
	/// Build the [FlowField] leading to `target` over `map`
	fn generate(&self, map: &ObstacleMap, target: Vec2) -> FlowField;
}

/// Selects which [Pathfinding] implementation the movement worker uses
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect)]
pub enum PathfindingAlgorithm {
	/// Breadth-first relaxation with line-of-sight shortcuts, cheap but blocky
	Bfs,
	/// Ray-cast distance relaxation, smoother corner-respecting paths
	#[default]
	Wavefront,
}

impl PathfindingAlgorithm {
	/// Create the implementation of this algorithm
	pub fn build(&self) -> Arc<dyn Pathfinding> {
		match self {
			PathfindingAlgorithm::Bfs => Arc::new(BfsPathfinding),
			PathfindingAlgorithm::Wavefront => Arc::new(WavefrontPathfinding),
		}
	}
}

/// Every cell along the four borders of `map`, the fan of ray targets used to
/// sweep the whole grid from a single point
pub fn map_border_cells(map: &ObstacleMap) -> Vec<IVec2> {
	let (width, height) = map.get_dimensions();
	border_cells(
		IVec2::ZERO,
		IVec2::new(width as i32 - 1, height as i32 - 1),
	)
}

/// Cast rays from the exact `target` point to every border cell of `map` and
/// switch each free cell they cross to [FlowDirection::PointToTarget]. Agents
/// on those cells see the target and steer straight at it from wherever they
/// stand in the cell
pub(crate) fn mark_line_of_sight(field: &mut FlowField, map: &ObstacleMap, target: Vec2) {
	for border in map_border_cells(map) {
		let mut ray = Ray::new(map, target, cell_centre(border));
		while let Some(cell) = ray.next() {
			if ray.has_hit_obstacle() {
				break;
			}
			field.set_field_cell_value(FlowDirection::PointToTarget, cell);
		}
	}
}

/// Stop diagonal directions clipping a blocked corner.
///
/// A direction is split into its `x` and `y` step signs. When the step along
/// one axis alone would enter a blocked or out of grid cell the direction is
/// replaced by the pure direction of the other axis. When neither axis is
/// usable the cell is set to hold position. [FlowDirection::PointToTarget]
/// cells already have line of sight and are left alone
pub(crate) fn repair_edges(field: &mut FlowField, map: &ObstacleMap) {
	for cell in map.iter_cells() {
		if map.get_field_cell_value(cell) {
			continue;
		}
		let Some(step) = field.get_field_cell_value(cell).step_signs() else {
			continue;
		};
		let x_clear = step.x == 0 || !map.is_blocked(cell + IVec2::new(step.x, 0));
		let y_clear = step.y == 0 || !map.is_blocked(cell + IVec2::new(0, step.y));
		let axis = match (x_clear, y_clear) {
			(true, true) => continue,
			// a pure axis direction straight into a wall has no other axis to fall back on
			(false, true) if step.y == 0 => None,
			(true, false) if step.x == 0 => None,
			(false, true) => Cardinal::from_step(IVec2::new(0, step.y)),
			(true, false) => Cardinal::from_step(IVec2::new(step.x, 0)),
			(false, false) => None,
		};
		let repaired = axis
			.map(|cardinal| FlowDirection::Angle(cardinal.get_angle()))
			.unwrap_or(FlowDirection::Undetermined);
		field.set_field_cell_value(repaired, cell);
	}
}

#[cfg(test)]
mod tests {
	use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

	use super::*;
	#[test]
	fn default_is_wavefront() {
		assert_eq!("wavefront", PathfindingAlgorithm::default().build().get_name());
		assert_eq!("bfs", PathfindingAlgorithm::Bfs.build().get_name());
	}
	#[test]
	fn repair_diagonal_into_wall() {
		//  _______
		// |   | # |
		// |___|___|
		// | ↗ |   |
		// |___|___|
		let map = ObstacleMap::from_ascii(".#\n..").unwrap();
		let mut field = FlowField::new(2, 2, Vec2::ZERO);
		field.set_field_cell_value(FlowDirection::Angle(7.0 * FRAC_PI_4), IVec2::new(0, 1));
		repair_edges(&mut field, &map);
		// north is clear, east is clear but the corner sits diagonally, nothing changes
		assert_eq!(
			FlowDirection::Angle(7.0 * FRAC_PI_4),
			field.get_field_cell_value(IVec2::new(0, 1))
		);
		field.set_field_cell_value(FlowDirection::Angle(7.0 * FRAC_PI_4), IVec2::new(1, 1));
		repair_edges(&mut field, &map);
		// from the east cell north is blocked and east is the grid edge
		assert_eq!(
			FlowDirection::Undetermined,
			field.get_field_cell_value(IVec2::new(1, 1))
		);
	}
	#[test]
	fn repair_falls_back_to_clear_axis() {
		//  ___________
		// |   | # |   |
		// |___|___|___|
		// | ↗ |   |   |
		// |___|___|___|
		let map = ObstacleMap::from_ascii(".#.\n...").unwrap();
		let mut field = FlowField::new(3, 2, Vec2::ZERO);
		field.set_field_cell_value(FlowDirection::Angle(7.0 * FRAC_PI_4), IVec2::new(1, 1));
		field.set_field_cell_value(FlowDirection::Angle(FRAC_PI_4), IVec2::new(0, 0));
		field.set_field_cell_value(FlowDirection::PointToTarget, IVec2::new(2, 0));
		repair_edges(&mut field, &map);
		// north blocked, east clear: travel east
		assert_eq!(
			FlowDirection::Angle(0.0),
			field.get_field_cell_value(IVec2::new(1, 1))
		);
		// east blocked, south clear: travel south
		assert_eq!(
			FlowDirection::Angle(FRAC_PI_2),
			field.get_field_cell_value(IVec2::new(0, 0))
		);
		assert_eq!(
			FlowDirection::PointToTarget,
			field.get_field_cell_value(IVec2::new(2, 0))
		);
	}
	#[test]
	fn repair_axis_into_wall_holds_position() {
		//  _______
		// | → | # |
		// |___|___|
		// |   |   |
		// |___|___|
		let map = ObstacleMap::from_ascii(".#\n..").unwrap();
		let mut field = FlowField::new(2, 2, Vec2::ZERO);
		field.set_field_cell_value(FlowDirection::Angle(0.0), IVec2::new(0, 0));
		field.set_field_cell_value(FlowDirection::Angle(FRAC_PI_2), IVec2::new(1, 1));
		repair_edges(&mut field, &map);
		assert_eq!(
			FlowDirection::Undetermined,
			field.get_field_cell_value(IVec2::new(0, 0))
		);
		// south of the bottom row is the frame
		assert_eq!(
			FlowDirection::Undetermined,
			field.get_field_cell_value(IVec2::new(1, 1))
		);
	}
	#[test]
	fn line_of_sight_stops_at_obstacles() {
		//  ___________
		// |   | t |   |
		// |___|___|___|
		// |   | # |   |
		// |___|___|___|
		// |   | x |   |
		// |___|___|___|
		let map = ObstacleMap::from_ascii("...\n.#.\n...").unwrap();
		let mut field = FlowField::new(3, 3, Vec2::new(1.5, 0.5));
		mark_line_of_sight(&mut field, &map, Vec2::new(1.5, 0.5));
		assert_eq!(
			FlowDirection::PointToTarget,
			field.get_field_cell_value(IVec2::new(0, 0))
		);
		assert_eq!(
			FlowDirection::PointToTarget,
			field.get_field_cell_value(IVec2::new(2, 0))
		);
		assert_eq!(
			FlowDirection::Undetermined,
			field.get_field_cell_value(IVec2::new(1, 2))
		);
		assert_eq!(
			FlowDirection::Undetermined,
			field.get_field_cell_value(IVec2::new(1, 1))
		);
	}
	#[test]
	fn border_fan_of_map() {
		let map = ObstacleMap::new(4, 3);
		assert_eq!(10, map_border_cells(&map).len());
		assert!(map_border_cells(&ObstacleMap::new(0, 0)).is_empty());
	}
}
