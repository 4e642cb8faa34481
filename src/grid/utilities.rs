//! Useful structures and tools used across the grids
//!

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use bevy::prelude::*;

/// Convenience way of accessing the 4 orthogonal neighbours of a grid cell.
///
/// Grid space has `x` increasing to the east and `y` increasing to the south,
/// angles are measured in radians from `+x` toward `+y`
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Reflect)]
pub enum Cardinal {
	North,
	East,
	South,
	West,
}

impl Cardinal {
	/// Every [Cardinal] in the order neighbours are relaxed
	pub const ALL: [Cardinal; 4] = [
		Cardinal::North,
		Cardinal::East,
		Cardinal::South,
		Cardinal::West,
	];
	/// Offset from a cell to its neighbour in this direction
	pub fn get_offset(&self) -> IVec2 {
		match self {
			Cardinal::North => IVec2::new(0, -1),
			Cardinal::East => IVec2::new(1, 0),
			Cardinal::South => IVec2::new(0, 1),
			Cardinal::West => IVec2::new(-1, 0),
		}
	}
	/// Angle pointing in this direction
	pub fn get_angle(&self) -> f32 {
		match self {
			Cardinal::North => 3.0 * FRAC_PI_2,
			Cardinal::East => 0.0,
			Cardinal::South => FRAC_PI_2,
			Cardinal::West => PI,
		}
	}
	/// The direction facing the other way
	pub fn get_opposite(&self) -> Cardinal {
		match self {
			Cardinal::North => Cardinal::South,
			Cardinal::East => Cardinal::West,
			Cardinal::South => Cardinal::North,
			Cardinal::West => Cardinal::East,
		}
	}
	/// Find the [Cardinal] of a unit step, `None` for zero or diagonal steps
	pub fn from_step(step: IVec2) -> Option<Cardinal> {
		Cardinal::ALL.into_iter().find(|c| c.get_offset() == step)
	}
}

/// The grid cell containing a continuous `position`
pub fn cell_containing(position: Vec2) -> IVec2 {
	position.floor().as_ivec2()
}

/// The continuous position at the middle of a grid `cell`
pub fn cell_centre(cell: IVec2) -> Vec2 {
	cell.as_vec2() + Vec2::splat(0.5)
}

/// Wrap an angle into `[0, 2π)`
pub fn normalise_angle(angle: f32) -> f32 {
	let wrapped = angle.rem_euclid(TAU);
	// rem_euclid can round up to exactly TAU for tiny negative inputs
	if wrapped >= TAU {
		0.0
	} else {
		wrapped
	}
}

/// Angle of a vector in `[0, 2π)`
pub fn angle_of(direction: Vec2) -> f32 {
	normalise_angle(direction.y.atan2(direction.x))
}

/// Shortest angular distance between two angles, in `[0, π]`
pub fn angle_distance(a: f32, b: f32) -> f32 {
	let difference = normalise_angle(a - b);
	difference.min(TAU - difference)
}

/// Every cell along the edge of the inclusive rectangle `min..=max`, walking
/// the top and bottom rows first and then the left and right columns. Each
/// cell appears once
pub fn border_cells(min: IVec2, max: IVec2) -> Vec<IVec2> {
	let mut cells = Vec::new();
	if min.x > max.x || min.y > max.y {
		return cells;
	}
	for x in min.x..=max.x {
		cells.push(IVec2::new(x, min.y));
		if max.y > min.y {
			cells.push(IVec2::new(x, max.y));
		}
	}
	for y in (min.y + 1)..max.y {
		cells.push(IVec2::new(min.x, y));
		if max.x > min.x {
			cells.push(IVec2::new(max.x, y));
		}
	}
	cells
}
