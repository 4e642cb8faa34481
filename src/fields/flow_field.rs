//! A [FlowField] holds, for every cell of an [ObstacleMap], the direction an
//! agent standing there should travel to reach a target.
//!
//! Cells either have no known path ([FlowDirection::Undetermined]), can see
//! the target directly ([FlowDirection::PointToTarget], agents steer straight
//! at the exact target point which avoids the staircase artifacts of a
//! 4-connected grid) or hold a concrete angle in radians.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Below this magnitude a direction component is treated as no movement along that axis
pub const STEP_DEAD_ZONE: f32 = 1e-3;

/// Steering hint of a single [FlowField] cell
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub enum FlowDirection {
	/// No path is known, agents hold position
	#[default]
	Undetermined,
	/// Steer straight at the target point of the field
	PointToTarget,
	/// Travel along this angle, radians from `+x` toward `+y`
	Angle(f32),
}

impl FlowDirection {
	/// Whether the cell tells an agent to move
	pub fn is_determined(&self) -> bool {
		!matches!(self, FlowDirection::Undetermined)
	}
	/// Decompose an [FlowDirection::Angle] into unit `x`/`y` step signs, each
	/// `-1`, `0` or `1`. The other variants have no fixed direction and return `None`
	pub fn step_signs(&self) -> Option<IVec2> {
		match self {
			FlowDirection::Angle(angle) => {
				let (sin, cos) = angle.sin_cos();
				Some(IVec2::new(sign_with_dead_zone(cos), sign_with_dead_zone(sin)))
			}
			_ => None,
		}
	}
}

/// Sign of a component ignoring tiny magnitudes
fn sign_with_dead_zone(value: f32) -> i32 {
	if value > STEP_DEAD_ZONE {
		1
	} else if value < -STEP_DEAD_ZONE {
		-1
	} else {
		0
	}
}

/// Per-cell directions toward a fixed target point
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct FlowField {
	/// Number of columns
	width: u32,
	/// Number of rows
	height: u32,
	/// Point the field leads to, captured at construction
	target: Vec2,
	/// Row-major cell values
	cells: Vec<FlowDirection>,
}

impl Field<FlowDirection> for FlowField {
	fn get_dimensions(&self) -> (u32, u32) {
		(self.width, self.height)
	}
	/// Retrieve a cell value, panics outside of the field
	fn get_field_cell_value(&self, cell: IVec2) -> FlowDirection {
		self.cells[logical_index(cell, self.width, self.height)]
	}
	/// Set a cell value, panics outside of the field
	fn set_field_cell_value(&mut self, value: FlowDirection, cell: IVec2) {
		let index = logical_index(cell, self.width, self.height);
		self.cells[index] = value;
	}
}

impl FlowField {
	/// Create a [FlowField] of undetermined cells leading to `target`
	pub fn new(width: u32, height: u32, target: Vec2) -> Self {
		FlowField {
			width,
			height,
			target,
			cells: vec![FlowDirection::Undetermined; width as usize * height as usize],
		}
	}
	/// Create an undetermined [FlowField] sized to `map`
	pub fn undetermined_for(map: &ObstacleMap, target: Vec2) -> Self {
		let (width, height) = map.get_dimensions();
		FlowField::new(width, height, target)
	}
	/// Get the target point
	pub fn get_target(&self) -> Vec2 {
		self.target
	}
	/// Whether `cell` lies within the field
	pub fn contains(&self, cell: IVec2) -> bool {
		cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
	}
	/// Velocity of an agent at `position` travelling at `speed`. Undetermined
	/// cells and positions off the field give [Vec2::ZERO]
	pub fn sample(&self, position: Vec2, speed: f32) -> Vec2 {
		let cell = cell_containing(position);
		if !self.contains(cell) {
			return Vec2::ZERO;
		}
		match self.get_field_cell_value(cell) {
			FlowDirection::Undetermined => Vec2::ZERO,
			FlowDirection::PointToTarget => (self.target - position).normalize_or_zero() * speed,
			FlowDirection::Angle(angle) => Vec2::from_angle(angle) * speed,
		}
	}
	/// Number of cells that tell an agent to move
	pub fn get_determined_count(&self) -> usize {
		self.cells.iter().filter(|c| c.is_determined()).count()
	}
	/// Whether the field has one cell for each logical cell of `map`
	pub fn dimensions_match(&self, map: &ObstacleMap) -> bool {
		self.get_dimensions() == map.get_dimensions()
	}
}
