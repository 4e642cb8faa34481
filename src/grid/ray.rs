//! A [Ray] walks, in order, every grid cell a line segment crosses. It is the
//! shared primitive behind line-of-sight shortcutting, wavefront pathfinding
//! and visibility.
//!
//! The traversal is parametric, `t = 0` at the start of the segment and
//! `t = 1` at its end. At each step the distances (in `t`) to the next
//! vertical and the next horizontal grid line are compared and the ray
//! advances across the nearer one. When both are equally near the horizontal
//! line is crossed first so the walk stays 4-connected and no cell is
//! skipped.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// The kind of grid line most recently crossed by a [Ray]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
	/// A vertical grid line, the column changed
	Vertical,
	/// A horizontal grid line, the row changed
	Horizontal,
}

/// Iterator over the cells between two continuous points of an [ObstacleMap].
///
/// The cell containing the start point is not yielded. Iteration stops once
/// the segment end is passed or the grid boundary is reached. A blocked cell
/// is yielded exactly once and then the ray finishes with
/// [Ray::has_hit_obstacle] returning `true`
#[derive(Debug, Clone)]
pub struct Ray<'a> {
	/// Grid being traversed
	map: &'a ObstacleMap,
	/// Start of the segment
	start: Vec2,
	/// Vector from start to end
	direction: Vec2,
	/// Cell most recently entered
	cell: IVec2,
	/// Sign of travel along each axis
	step: IVec2,
	/// `t` at which the next vertical grid line is crossed
	next_vertical: f32,
	/// `t` at which the next horizontal grid line is crossed
	next_horizontal: f32,
	/// `t` between consecutive vertical grid lines
	delta_vertical: f32,
	/// `t` between consecutive horizontal grid lines
	delta_horizontal: f32,
	/// `t` of the most recent crossing
	travelled: f32,
	/// Kind of the most recent crossing
	last_crossing: Option<Crossing>,
	/// Set once a blocked cell has been yielded
	hit_obstacle: bool,
	/// Set once no more cells will be yielded
	finished: bool,
}

impl<'a> Ray<'a> {
	/// Create a [Ray] from `start` to `end` over `map`
	pub fn new(map: &'a ObstacleMap, start: Vec2, end: Vec2) -> Self {
		let direction = end - start;
		let cell = cell_containing(start);
		let (step_x, next_vertical, delta_vertical) =
			Self::axis_setup(start.x, cell.x, direction.x);
		let (step_y, next_horizontal, delta_horizontal) =
			Self::axis_setup(start.y, cell.y, direction.y);
		Ray {
			map,
			start,
			direction,
			cell,
			step: IVec2::new(step_x, step_y),
			next_vertical,
			next_horizontal,
			delta_vertical,
			delta_horizontal,
			travelled: 0.0,
			last_crossing: None,
			hit_obstacle: false,
			finished: false,
		}
	}
	/// For one axis find the step sign, the `t` of the first grid line crossing
	/// and the `t` between grid lines
	fn axis_setup(origin: f32, cell: i32, delta: f32) -> (i32, f32, f32) {
		if delta > 0.0 {
			(1, ((cell + 1) as f32 - origin) / delta, 1.0 / delta)
		} else if delta < 0.0 {
			(-1, (origin - cell as f32) / -delta, 1.0 / -delta)
		} else {
			(0, f32::INFINITY, f32::INFINITY)
		}
	}
	/// Angle of the segment from start to end, in `(-π, π]`
	pub fn get_angle(&self) -> f32 {
		self.direction.y.atan2(self.direction.x)
	}
	/// Angle pointing from the end of the segment back toward its start, in `[0, 2π)`
	pub fn get_reverse_angle(&self) -> f32 {
		normalise_angle(self.get_angle() + std::f32::consts::PI)
	}
	/// Continuous position of the most recent grid line crossing, or the start
	/// point before the first step
	pub fn get_current_position(&self) -> Vec2 {
		self.start + self.direction * self.travelled
	}
	/// Kind of the most recent grid line crossing
	pub fn get_last_crossing(&self) -> Option<Crossing> {
		self.last_crossing
	}
	/// Whether the ray stopped on a blocked cell
	pub fn has_hit_obstacle(&self) -> bool {
		self.hit_obstacle
	}
}

impl Iterator for Ray<'_> {
	type Item = IVec2;

	fn next(&mut self) -> Option<Self::Item> {
		if self.finished {
			return None;
		}
		let crossing = if self.next_vertical < self.next_horizontal {
			Crossing::Vertical
		} else {
			Crossing::Horizontal
		};
		let t = match crossing {
			Crossing::Vertical => self.next_vertical,
			Crossing::Horizontal => self.next_horizontal,
		};
		// overshooting the end, also covers a zero length segment
		if t > 1.0 || !t.is_finite() {
			self.finished = true;
			return None;
		}
		match crossing {
			Crossing::Vertical => {
				self.cell.x += self.step.x;
				self.next_vertical += self.delta_vertical;
			}
			Crossing::Horizontal => {
				self.cell.y += self.step.y;
				self.next_horizontal += self.delta_horizontal;
			}
		}
		self.travelled = t;
		self.last_crossing = Some(crossing);
		if !self.map.contains(self.cell) {
			self.finished = true;
			return None;
		}
		if self.map.get_field_cell_value(self.cell) {
			self.hit_obstacle = true;
			self.finished = true;
		}
		Some(self.cell)
	}
}
