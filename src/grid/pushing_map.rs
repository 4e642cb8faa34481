//! When an agent ends up inside terrain it cannot traverse (a building is
//! placed on top of it, or it is shoved by a collision) it must be pushed back
//! out. The [PushingMapGenerator] derives, for every blocked cell that
//! borders free space, a [PushingSquare] holding one push angle for each
//! quadrant of the cell.
//!
//! The angle of a quadrant depends on the 2x2 block made of the quadrant's
//! diagonal neighbour `a`, vertical neighbour `b`, horizontal neighbour `c`
//! and the (always blocked) centre. For the north-west quadrant:
//!
//! ```text
//!  _______
//! | a | b |
//! |___|___|
//! | c | # |
//! |___|___|
//! ```
//!
//! The other quadrants are matched by rotating the 3x3 neighbourhood a
//! quarter turn at a time until the quadrant sits in the north-west and then
//! rotating the matched angle back.
//!

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::prelude::*;
use bevy::prelude::*;

/// Corner offsets of the quadrants of a cell, each is the previous rotated a quarter turn
pub const QUADRANT_CORNERS: [IVec2; 4] = [
	IVec2::new(-1, -1),
	IVec2::new(1, -1),
	IVec2::new(1, 1),
	IVec2::new(-1, 1),
];

/// Push angles of the four quadrants of a blocked cell, ordered as [QUADRANT_CORNERS]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct PushingSquare([f32; 4]);

impl PushingSquare {
	/// Get the quadrant angles
	pub fn get(&self) -> &[f32; 4] {
		&self.0
	}
	/// Angle of a single quadrant, `quadrant` indexes [QUADRANT_CORNERS]
	pub fn get_quadrant_angle(&self, quadrant: usize) -> f32 {
		self.0[quadrant]
	}
	/// Find which quadrant a position within a cell lies in
	pub fn quadrant_of(position: Vec2) -> usize {
		let local = position - position.floor();
		let corner = IVec2::new(
			if local.x < 0.5 { -1 } else { 1 },
			if local.y < 0.5 { -1 } else { 1 },
		);
		QUADRANT_CORNERS
			.iter()
			.position(|c| *c == corner)
			.unwrap_or_default()
	}
}

/// 3x3 blocked/free neighbourhood of a cell, centre included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Neighbourhood([[bool; 3]; 3]);

impl Neighbourhood {
	/// Read the neighbourhood of `cell`, anything outside the map counts as blocked
	fn read(map: &ObstacleMap, cell: IVec2) -> Self {
		let mut blocked = [[true; 3]; 3];
		for (row, line) in blocked.iter_mut().enumerate() {
			for (column, value) in line.iter_mut().enumerate() {
				let offset = IVec2::new(column as i32 - 1, row as i32 - 1);
				*value = map.is_blocked(cell + offset);
			}
		}
		Neighbourhood(blocked)
	}
	/// Whether the neighbour at `offset` is blocked
	fn is_blocked(&self, offset: IVec2) -> bool {
		self.0[(offset.y + 1) as usize][(offset.x + 1) as usize]
	}
	/// Whether all 8 neighbours are blocked
	fn is_enclosed(&self) -> bool {
		self.0.iter().flatten().all(|blocked| *blocked)
	}
	/// Turn the pattern a quarter so that what sat at the rotated position of an
	/// offset now sits at the offset itself
	fn rotated(&self) -> Self {
		let mut blocked = [[true; 3]; 3];
		for (row, line) in blocked.iter_mut().enumerate() {
			for (column, value) in line.iter_mut().enumerate() {
				let offset = IVec2::new(column as i32 - 1, row as i32 - 1);
				*value = self.is_blocked(rotate_quarter(offset));
			}
		}
		Neighbourhood(blocked)
	}
	/// Match the north-west 2x2 block against the canonical table
	fn north_west_angle(&self) -> f32 {
		let a = self.is_blocked(IVec2::new(-1, -1));
		let b = self.is_blocked(IVec2::new(0, -1));
		let c = self.is_blocked(IVec2::new(-1, 0));
		match (a, b, c) {
			// both edges open, leave out of the corner
			(false, false, false) => 5.0 * FRAC_PI_4,
			(true, false, false) => 5.0 * FRAC_PI_4,
			// only north open
			(false, false, true) => 3.0 * FRAC_PI_2,
			(true, false, true) => 3.0 * FRAC_PI_2,
			// only west open
			(false, true, false) => PI,
			(true, true, false) => PI,
			// squeeze through the diagonal
			(false, true, true) => 5.0 * FRAC_PI_4,
			// nothing nearby, hand over to a neighbouring quadrant
			(true, true, true) => FRAC_PI_4,
		}
	}
}

/// Rotate an offset a quarter turn, `(x, y)` becomes `(-y, x)`
fn rotate_quarter(offset: IVec2) -> IVec2 {
	IVec2::new(-offset.y, offset.x)
}

/// Push vectors for the blocked cells of an [ObstacleMap]
#[derive(Debug, Clone, PartialEq, Reflect)]
pub struct PushingMap {
	/// Number of columns
	width: u32,
	/// Number of rows
	height: u32,
	/// A square for each blocked cell with free space around it, row-major
	squares: Vec<Option<PushingSquare>>,
}

impl PushingMap {
	/// Get the map dimensions
	pub fn get_dimensions(&self) -> (u32, u32) {
		(self.width, self.height)
	}
	/// The [PushingSquare] of a cell, `None` for free, enclosed or out of range cells
	pub fn get_square(&self, cell: IVec2) -> Option<&PushingSquare> {
		if cell.x < 0 || cell.y < 0 || cell.x as u32 >= self.width || cell.y as u32 >= self.height {
			return None;
		}
		let index = cell.y as usize * self.width as usize + cell.x as usize;
		self.squares[index].as_ref()
	}
	/// Unit vector pushing an agent at `position` out of the blocked cell it is
	/// in, `None` when there is nothing to push against
	pub fn get_push_direction(&self, position: Vec2) -> Option<Vec2> {
		let square = self.get_square(cell_containing(position))?;
		let angle = square.get_quadrant_angle(PushingSquare::quadrant_of(position));
		Some(Vec2::from_angle(angle))
	}
	/// Number of cells with a [PushingSquare]
	pub fn get_square_count(&self) -> usize {
		self.squares.iter().filter(|s| s.is_some()).count()
	}
}

/// Synchronously derives a [PushingMap], run whenever static obstacles change
#[derive(Debug, Default, Clone, Copy)]
pub struct PushingMapGenerator;

impl PushingMapGenerator {
	/// Build the [PushingMap] of `map`
	pub fn generate(map: &ObstacleMap) -> PushingMap {
		let (width, height) = map.get_dimensions();
		let squares = map
			.iter_cells()
			.map(|cell| {
				if map.get_field_cell_value(cell) {
					Self::square_of(map, cell)
				} else {
					None
				}
			})
			.collect();
		PushingMap {
			width,
			height,
			squares,
		}
	}
	/// Derive the square of a blocked cell
	fn square_of(map: &ObstacleMap, cell: IVec2) -> Option<PushingSquare> {
		let mut neighbourhood = Neighbourhood::read(map, cell);
		if neighbourhood.is_enclosed() {
			return None;
		}
		let mut angles = [0.0; 4];
		for (turns, angle) in angles.iter_mut().enumerate() {
			*angle = normalise_angle(neighbourhood.north_west_angle() + turns as f32 * FRAC_PI_2);
			neighbourhood = neighbourhood.rotated();
		}
		Some(PushingSquare(angles))
	}
}
