//! Wavefront pathfinding.
//!
//! Each cell carries a distance to the target, initially "infinite"
//! (`width * height`) with the target at zero. Every iteration picks the
//! discovered cell of least distance that still borders an undiscovered cell
//! and casts rays from its centre to every border cell of the map. Any cell a
//! ray crosses whose distance improves through the source takes the ray's
//! reverse angle, so agents travel in straight lines toward the source
//! instead of along 4-connected staircases. When two sources of the same
//! iteration both reach a cell the angle closer to the true direction of the
//! later source is kept.
//!
//! After each iteration a smoothing pass fills undiscovered cells surrounded
//! on at least 3 sides by discovered ones, these are cells tucked behind
//! corners that no ray reaches cleanly.
//!
//! Once the wavefront is exhausted, cells with a clear line of sight to the
//! exact target point are switched to [FlowDirection::PointToTarget], the
//! relaxed angles only describe the way from each cell centre.
//!
//! More costly than [crate::prelude::BfsPathfinding] but produces smoother
//! paths that respect corners.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Ray-cast distance relaxation
#[derive(Debug, Default, Clone, Copy)]
pub struct WavefrontPathfinding;

impl Pathfinding for WavefrontPathfinding {
	fn get_name(&self) -> &'static str {
		"wavefront"
	}
	fn generate(&self, map: &ObstacleMap, target: Vec2) -> FlowField {
		let target_cell = cell_containing(target);
		if !map.contains(target_cell) {
			return FlowField::undetermined_for(map, target);
		}
		let borders = map_border_cells(map);
		let mut wavefront = Wavefront::new(map, target, target_cell);
		while let Some(source) = wavefront.select_source() {
			wavefront.relax_from(source, &borders);
			wavefront.promote();
			wavefront.smooth();
		}
		let mut field = wavefront.field;
		mark_line_of_sight(&mut field, map, target);
		repair_edges(&mut field, map);
		field.set_field_cell_value(FlowDirection::Undetermined, target_cell);
		field
	}
}

/// Progress of a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellState {
	/// Cannot be entered
	Blocked,
	/// No distance known yet
	NotDiscovered,
	/// Holds a distance and may act as a ray source
	Discovered,
	/// Improved during the current iteration
	DiscoveredInCurrentIteration,
}

/// Working state of one run
struct Wavefront<'a> {
	/// Grid being searched
	map: &'a ObstacleMap,
	/// Number of columns
	width: u32,
	/// Number of rows
	height: u32,
	/// Best known distance of each cell, row-major
	distances: Vec<f32>,
	/// Progress of each cell, row-major
	states: Vec<CellState>,
	/// Angles found so far
	field: FlowField,
}

impl<'a> Wavefront<'a> {
	/// Prepare a run toward `target` which lies in `target_cell`
	fn new(map: &'a ObstacleMap, target: Vec2, target_cell: IVec2) -> Self {
		let (width, height) = map.get_dimensions();
		let infinite = (width * height) as f32;
		let mut distances = vec![infinite; width as usize * height as usize];
		let mut states: Vec<CellState> = map
			.iter_cells()
			.map(|cell| {
				if map.get_field_cell_value(cell) {
					CellState::Blocked
				} else {
					CellState::NotDiscovered
				}
			})
			.collect();
		let index = logical_index(target_cell, width, height);
		distances[index] = 0.0;
		states[index] = CellState::Discovered;
		Wavefront {
			map,
			width,
			height,
			distances,
			states,
			field: FlowField::undetermined_for(map, target),
		}
	}
	/// Row-major index of a logical cell
	fn index(&self, cell: IVec2) -> usize {
		logical_index(cell, self.width, self.height)
	}
	/// The state of a cell, `None` outside the map
	fn state(&self, cell: IVec2) -> Option<CellState> {
		self.map
			.contains(cell)
			.then(|| self.states[self.index(cell)])
	}
	/// Whether any orthogonal neighbour is still undiscovered
	fn has_undiscovered_neighbour(&self, cell: IVec2) -> bool {
		Cardinal::ALL
			.iter()
			.any(|c| self.state(cell + c.get_offset()) == Some(CellState::NotDiscovered))
	}
	/// The discovered cell of least distance on the edge of the wavefront
	fn select_source(&self) -> Option<IVec2> {
		let mut best: Option<(IVec2, f32)> = None;
		for cell in self.map.iter_cells() {
			let index = self.index(cell);
			if self.states[index] != CellState::Discovered || !self.has_undiscovered_neighbour(cell) {
				continue;
			}
			let distance = self.distances[index];
			if best.is_none_or(|(_, d)| distance < d) {
				best = Some((cell, distance));
			}
		}
		best.map(|(cell, _)| cell)
	}
	/// Cast rays from the centre of `source` to each of `borders` and relax what they cross
	fn relax_from(&mut self, source: IVec2, borders: &[IVec2]) {
		let origin = cell_centre(source);
		let source_distance = self.distances[self.index(source)];
		for border in borders {
			let mut ray = Ray::new(self.map, origin, cell_centre(*border));
			let reverse = ray.get_reverse_angle();
			while let Some(cell) = ray.next() {
				if ray.has_hit_obstacle() {
					break;
				}
				let centre = cell_centre(cell);
				let index = self.index(cell);
				let candidate = source_distance + centre.distance(origin);
				if candidate < self.distances[index] {
					self.distances[index] = candidate;
					self.states[index] = CellState::DiscoveredInCurrentIteration;
					self.field
						.set_field_cell_value(FlowDirection::Angle(reverse), cell);
				} else if self.states[index] == CellState::DiscoveredInCurrentIteration {
					let FlowDirection::Angle(current) = self.field.get_field_cell_value(cell) else {
						continue;
					};
					let truth = angle_of(origin - centre);
					if angle_distance(reverse, truth) < angle_distance(current, truth) {
						self.field
							.set_field_cell_value(FlowDirection::Angle(reverse), cell);
					}
				}
			}
		}
	}
	/// Cells improved this iteration become sources for the next
	fn promote(&mut self) {
		for state in self.states.iter_mut() {
			if *state == CellState::DiscoveredInCurrentIteration {
				*state = CellState::Discovered;
			}
		}
	}
	/// Fill undiscovered cells with at least 3 discovered neighbours using the
	/// mean of the neighbours' raw angles. Candidates are gathered over the
	/// whole grid before any is applied
	fn smooth(&mut self) {
		let mut fills = Vec::new();
		for cell in self.map.iter_cells() {
			if self.states[self.index(cell)] != CellState::NotDiscovered {
				continue;
			}
			let discovered: Vec<IVec2> = Cardinal::ALL
				.iter()
				.map(|c| cell + c.get_offset())
				.filter(|n| self.state(*n) == Some(CellState::Discovered))
				.collect();
			if discovered.len() < 3 {
				continue;
			}
			let angles: Vec<f32> = discovered
				.iter()
				.filter_map(|n| match self.field.get_field_cell_value(*n) {
					FlowDirection::Angle(angle) => Some(angle),
					_ => None,
				})
				.collect();
			if angles.is_empty() {
				continue;
			}
			let mean = angles.iter().sum::<f32>() / angles.len() as f32;
			let nearest = discovered
				.iter()
				.map(|n| self.distances[self.index(*n)])
				.fold(f32::INFINITY, f32::min);
			fills.push((cell, mean, nearest + 1.0));
		}
		for (cell, angle, distance) in fills {
			let index = self.index(cell);
			self.distances[index] = distance;
			self.states[index] = CellState::Discovered;
			self.field
				.set_field_cell_value(FlowDirection::Angle(angle), cell);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Move an agent along `field` until it reaches the target cell, hits
	/// something or runs out of steps
	fn walk(map: &ObstacleMap, field: &FlowField, start: Vec2) -> bool {
		let goal = cell_containing(field.get_target());
		let mut position = start;
		for _ in 0..2000 {
			position += field.sample(position, 0.1);
			if map.collides(position) {
				return false;
			}
			if cell_containing(position) == goal {
				return true;
			}
		}
		false
	}

	#[test]
	fn open_map_sees_off_centre_target() {
		let map = ObstacleMap::new(9, 9);
		let target = Vec2::new(4.2, 4.8);
		let field = WavefrontPathfinding.generate(&map, target);
		for cell in map.iter_cells() {
			if cell == IVec2::new(4, 4) {
				assert_eq!(FlowDirection::Undetermined, field.get_field_cell_value(cell));
				continue;
			}
			assert_eq!(
				FlowDirection::PointToTarget,
				field.get_field_cell_value(cell),
				"cell {}",
				cell
			);
			let position = cell_centre(cell) + Vec2::new(0.3, -0.2);
			let velocity = field.sample(position, 1.0);
			let towards = (target - position).normalize();
			assert!(velocity.perp_dot(towards).abs() < 1e-4, "cell {}", cell);
			assert!(velocity.dot(towards) > 0.0);
		}
	}
	#[test]
	fn hidden_cells_keep_relaxed_angles() {
		//  ___________
		// |   |   | t |
		// |___|___|___|
		// | # | # |   |
		// |___|___|___|
		// | x |   |   |
		// |___|___|___|
		let map = ObstacleMap::from_ascii(
			"
			...
			##.
			...
			",
		)
		.unwrap();
		let field = WavefrontPathfinding.generate(&map, Vec2::new(2.5, 0.5));
		assert!(matches!(
			field.get_field_cell_value(IVec2::new(0, 2)),
			FlowDirection::Angle(_)
		));
		assert_eq!(
			FlowDirection::PointToTarget,
			field.get_field_cell_value(IVec2::new(0, 0))
		);
		assert_eq!(
			FlowDirection::PointToTarget,
			field.get_field_cell_value(IVec2::new(2, 2))
		);
	}
	#[test]
	fn agents_walk_around_wall() {
		//  _______________________________________
		// |   |   |   |   |   | # |   |   |   |   |
		// |___|___|___|___|___|___|___|___|___|___|
		// |   | s |   |   |   | # |   |   | t |   |
		// |___|___|___|___|___|___|___|___|___|___|
		// |   |   |   |   |   | # |   |   |   |   |
		// |___|___|___|___|___|___|___|___|___|___|
		// ... the wall continues down to row 6, rows 7 to 9 are open
		let map = ObstacleMap::from_ascii(
			"
			.....#....
			.....#....
			.....#....
			.....#....
			.....#....
			.....#....
			.....#....
			..........
			..........
			..........
			",
		)
		.unwrap();
		let field = WavefrontPathfinding.generate(&map, Vec2::new(8.5, 1.5));
		for start in [
			Vec2::new(1.5, 1.5),
			Vec2::new(0.5, 0.5),
			Vec2::new(2.5, 8.5),
			Vec2::new(4.5, 6.5),
			Vec2::new(4.5, 0.5),
			Vec2::new(9.5, 9.5),
		] {
			assert!(walk(&map, &field, start), "agent from {} got stuck", start);
		}
	}
	#[test]
	fn off_map_target() {
		let map = ObstacleMap::new(4, 4);
		let field = WavefrontPathfinding.generate(&map, Vec2::new(2.0, 40.0));
		assert_eq!(0, field.get_determined_count());
	}
	#[test]
	fn isolated_region_is_undetermined() {
		//  ___________________
		// |   | # |   | t |   |
		// |___|___|___|___|___|
		// | # | # |   |   |   |
		// |___|___|___|___|___|
		let map = ObstacleMap::from_ascii(".#...\n##...").unwrap();
		let field = WavefrontPathfinding.generate(&map, Vec2::new(3.5, 0.5));
		assert_eq!(
			FlowDirection::Undetermined,
			field.get_field_cell_value(IVec2::new(0, 0))
		);
		assert_eq!(5, field.get_determined_count());
	}
}
