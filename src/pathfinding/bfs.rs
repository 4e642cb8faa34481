//! Breadth-first pathfinding.
//!
//! Starting from the target, free cells are relaxed over their 4 orthogonal
//! neighbours in FIFO order. A newly reached neighbour points back at the cell
//! that reached it, so among equally short paths the first discoverer wins in
//! North, East, South, West order.
//!
//! The result is staircase shaped, so afterwards rays are cast from the exact
//! target point to every border cell of the map and every free cell they
//! cross is switched to [FlowDirection::PointToTarget]. Agents on those cells
//! can see the target and simply steer straight at it.
//!

use std::collections::VecDeque;

use crate::prelude::*;
use bevy::prelude::*;

/// Breadth-first relaxation with line-of-sight shortcuts
#[derive(Debug, Default, Clone, Copy)]
pub struct BfsPathfinding;

impl Pathfinding for BfsPathfinding {
	fn get_name(&self) -> &'static str {
		"bfs"
	}
	fn generate(&self, map: &ObstacleMap, target: Vec2) -> FlowField {
		let mut field = FlowField::undetermined_for(map, target);
		let target_cell = cell_containing(target);
		if !map.contains(target_cell) {
			return field;
		}
		let (width, height) = map.get_dimensions();
		let mut visited = vec![false; width as usize * height as usize];
		visited[logical_index(target_cell, width, height)] = true;
		let mut queue = VecDeque::from([target_cell]);
		while let Some(current) = queue.pop_front() {
			for cardinal in Cardinal::ALL {
				let neighbour = current + cardinal.get_offset();
				if map.is_blocked(neighbour) {
					continue;
				}
				let index = logical_index(neighbour, width, height);
				if visited[index] {
					continue;
				}
				visited[index] = true;
				let back = FlowDirection::Angle(cardinal.get_opposite().get_angle());
				field.set_field_cell_value(back, neighbour);
				queue.push_back(neighbour);
			}
		}
		mark_line_of_sight(&mut field, map, target);
		repair_edges(&mut field, map);
		field.set_field_cell_value(FlowDirection::Undetermined, target_cell);
		field
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn open_map_sees_target_everywhere() {
		for (width, height, target) in [
			(7, 7, Vec2::new(3.5, 3.5)),
			(12, 9, Vec2::new(0.5, 8.5)),
			(31, 17, Vec2::new(20.2, 3.7)),
		] {
			let map = ObstacleMap::new(width, height);
			let field = BfsPathfinding.generate(&map, target);
			for cell in map.iter_cells() {
				let expected = if cell == cell_containing(target) {
					FlowDirection::Undetermined
				} else {
					FlowDirection::PointToTarget
				};
				assert_eq!(expected, field.get_field_cell_value(cell), "cell {}", cell);
			}
		}
	}
	#[test]
	fn sample_parallel_to_target_with_line_of_sight() {
		let map = ObstacleMap::new(9, 9);
		let target = Vec2::new(4.5, 4.5);
		let field = BfsPathfinding.generate(&map, target);
		let position = Vec2::new(0.3, 8.1);
		let velocity = field.sample(position, 1.0);
		let towards = (target - position).normalize();
		assert!(velocity.perp_dot(towards).abs() < 1e-5);
		assert!(velocity.dot(towards) > 0.0);
	}
	#[test]
	fn route_around_wall() {
		//  ___________
		// |   |   | t |
		// |___|___|___|
		// | # | # |   |
		// |___|___|___|
		// | ↓ |   |   |
		// |___|___|___|
		// the cell below the wall has no line of sight and must walk east
		let map = ObstacleMap::from_ascii(
			"
			...
			##.
			...
			",
		)
		.unwrap();
		let field = BfsPathfinding.generate(&map, Vec2::new(2.5, 0.5));
		assert_eq!(
			FlowDirection::Angle(0.0),
			field.get_field_cell_value(IVec2::new(0, 2))
		);
		assert_eq!(
			FlowDirection::Angle(0.0),
			field.get_field_cell_value(IVec2::new(1, 2))
		);
		assert_eq!(
			FlowDirection::PointToTarget,
			field.get_field_cell_value(IVec2::new(2, 2))
		);
		assert_eq!(
			FlowDirection::PointToTarget,
			field.get_field_cell_value(IVec2::new(0, 0))
		);
		assert_eq!(
			FlowDirection::Undetermined,
			field.get_field_cell_value(IVec2::new(2, 0))
		);
	}
	#[test]
	fn enclosed_cells_stay_undetermined() {
		//  ___________________
		// |   | # |   | t |   |
		// |___|___|___|___|___|
		// | # | # |   |   |   |
		// |___|___|___|___|___|
		let map = ObstacleMap::from_ascii(".#...\n##...").unwrap();
		let field = BfsPathfinding.generate(&map, Vec2::new(3.5, 0.5));
		assert_eq!(
			FlowDirection::Undetermined,
			field.get_field_cell_value(IVec2::new(0, 0))
		);
		assert_eq!(5, field.get_determined_count());
	}
	#[test]
	fn off_map_target() {
		let map = ObstacleMap::new(5, 5);
		let field = BfsPathfinding.generate(&map, Vec2::new(-1.0, 2.0));
		assert_eq!(0, field.get_determined_count());
		assert!(field.dimensions_match(&map));
	}
}
