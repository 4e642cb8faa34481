//! An [ObstacleMap] is a boolean occupancy grid. Internally it is padded with a
//! permanently blocked one cell frame so that grid algorithms peeking at the
//! neighbours of an edge cell never read out of bounds:
//!
//! ```text
//!  _______________________
//! | # | # | # | # | # | # |
//! |___|___|___|___|___|___|
//! | # |   |   |   |   | # |
//! |___|___|___|___|___|___|
//! | # |   |   |   |   | # |
//! |___|___|___|___|___|___|
//! | # | # | # | # | # | # |
//! |___|___|___|___|___|___|
//! ```
//!
//! Callers always index by logical coordinates, the frame occupies `x = -1`,
//! `x = width`, `y = -1` and `y = height`.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Boolean grid where `true` marks a cell agents cannot enter
#[cfg_attr(
	feature = "serde",
	derive(serde::Deserialize, serde::Serialize),
	serde(try_from = "ObstacleMapData", into = "ObstacleMapData")
)]
#[derive(Clone, Debug, PartialEq, Eq, Reflect)]
pub struct ObstacleMap {
	/// Number of logical columns
	width: u32,
	/// Number of logical rows
	height: u32,
	/// Padded cells in row-major order, `(width + 2) * (height + 2)` long
	cells: Vec<bool>,
}

impl Field<bool> for ObstacleMap {
	fn get_dimensions(&self) -> (u32, u32) {
		(self.width, self.height)
	}
	/// Whether a cell is blocked. Frame cells can be read and are always
	/// blocked, anything further out panics
	fn get_field_cell_value(&self, cell: IVec2) -> bool {
		self.cells[self.padded_index(cell)]
	}
	/// Block or free a logical cell. Writing to the frame or beyond panics
	fn set_field_cell_value(&mut self, value: bool, cell: IVec2) {
		if !self.contains(cell) {
			panic!(
				"Cannot set {} on an obstacle map of {}x{}, only logical cells are writable",
				cell, self.width, self.height
			);
		}
		let index = self.padded_index(cell);
		self.cells[index] = value;
	}
}

impl ObstacleMap {
	/// Create a [ObstacleMap] of `width` by `height` free cells surrounded by the blocked frame
	pub fn new(width: u32, height: u32) -> Self {
		let padded_width = width as usize + 2;
		let padded_height = height as usize + 2;
		let mut cells = vec![false; padded_width * padded_height];
		for (index, cell) in cells.iter_mut().enumerate() {
			let column = index % padded_width;
			let row = index / padded_width;
			*cell = column == 0 || row == 0 || column == padded_width - 1 || row == padded_height - 1;
		}
		ObstacleMap {
			width,
			height,
			cells,
		}
	}
	/// Build a map from text where each line is a row, `#` is blocked and `.`
	/// is free. Leading and trailing whitespace on each line and blank lines
	/// are ignored
	pub fn from_ascii(text: &str) -> Result<Self, EngineError> {
		let rows: Vec<&str> = text
			.lines()
			.map(str::trim)
			.filter(|line| !line.is_empty())
			.collect();
		let Some(first) = rows.first() else {
			return Err(EngineError::EmptyMap);
		};
		let expected = first.chars().count();
		let mut map = ObstacleMap::new(expected as u32, rows.len() as u32);
		for (row, line) in rows.iter().enumerate() {
			let found = line.chars().count();
			if found != expected {
				return Err(EngineError::RaggedMap {
					row,
					expected,
					found,
				});
			}
			for (column, symbol) in line.chars().enumerate() {
				let blocked = match symbol {
					'#' => true,
					'.' => false,
					_ => {
						return Err(EngineError::UnknownSymbol {
							symbol,
							column,
							row,
						})
					}
				};
				map.set_field_cell_value(blocked, IVec2::new(column as i32, row as i32));
			}
		}
		Ok(map)
	}
	/// Read a map from a `ron` file
	#[cfg(feature = "ron")]
	pub fn from_ron(path: &str) -> Result<Self, EngineError> {
		let text = std::fs::read_to_string(path)?;
		Self::from_ron_str(&text)
	}
	/// Parse a map from a `ron` string holding its logical cells
	#[cfg(feature = "ron")]
	pub fn from_ron_str(text: &str) -> Result<Self, EngineError> {
		let data: ObstacleMapData = ron::de::from_str(text)?;
		ObstacleMap::try_from(data)
	}
	/// Number of logical columns
	pub fn get_width(&self) -> u32 {
		self.width
	}
	/// Number of logical rows
	pub fn get_height(&self) -> u32 {
		self.height
	}
	/// Whether `cell` lies in the logical area
	pub fn contains(&self, cell: IVec2) -> bool {
		cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
	}
	/// Whether `cell` is blocked, anything outside the logical area counts as blocked
	pub fn is_blocked(&self, cell: IVec2) -> bool {
		!self.contains(cell) || self.get_field_cell_value(cell)
	}
	/// Whether a continuous `position` is out of bounds or inside a blocked cell
	pub fn collides(&self, position: Vec2) -> bool {
		self.is_blocked(cell_containing(position))
	}
	/// Number of blocked logical cells
	pub fn get_blocked_count(&self) -> usize {
		self.iter_cells().filter(|cell| self.get_field_cell_value(*cell)).count()
	}
	/// Free every logical cell within the inclusive rectangle `area`, parts of
	/// the area beyond the map are ignored. Used on a copy of a shared map to
	/// virtually unblock the footprint of a target building
	pub fn unblock_area(&mut self, area: IRect) {
		let min = area.min.max(IVec2::ZERO);
		let max = area
			.max
			.min(IVec2::new(self.width as i32 - 1, self.height as i32 - 1));
		for y in min.y..=max.y {
			for x in min.x..=max.x {
				self.set_field_cell_value(false, IVec2::new(x, y));
			}
		}
	}
	/// Iterate over every logical cell in row-major order
	pub fn iter_cells(&self) -> impl Iterator<Item = IVec2> {
		let width = self.width as i32;
		let height = self.height as i32;
		(0..height).flat_map(move |y| (0..width).map(move |x| IVec2::new(x, y)))
	}
	/// Position of a cell in the padded storage, panics beyond the frame
	fn padded_index(&self, cell: IVec2) -> usize {
		let padded_width = self.width as i64 + 2;
		let padded_height = self.height as i64 + 2;
		let column = cell.x as i64 + 1;
		let row = cell.y as i64 + 1;
		if column < 0 || row < 0 || column >= padded_width || row >= padded_height {
			panic!(
				"{} lies beyond the frame of an obstacle map of {}x{}",
				cell, self.width, self.height
			);
		}
		(row * padded_width + column) as usize
	}
}

/// Serialised form of an [ObstacleMap], only logical cells are stored and the
/// frame is rebuilt when loading
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObstacleMapData {
	/// Number of logical columns
	pub width: u32,
	/// Number of logical rows
	pub height: u32,
	/// Logical cells in row-major order
	pub blocked: Vec<bool>,
}

impl TryFrom<ObstacleMapData> for ObstacleMap {
	type Error = EngineError;
	fn try_from(data: ObstacleMapData) -> Result<Self, Self::Error> {
		let expected = data.width as usize * data.height as usize;
		if data.blocked.len() != expected {
			return Err(EngineError::CellCountMismatch {
				width: data.width,
				height: data.height,
				found: data.blocked.len(),
			});
		}
		let mut map = ObstacleMap::new(data.width, data.height);
		let cells: Vec<IVec2> = map.iter_cells().collect();
		for (cell, blocked) in cells.into_iter().zip(data.blocked) {
			map.set_field_cell_value(blocked, cell);
		}
		Ok(map)
	}
}

impl From<ObstacleMap> for ObstacleMapData {
	fn from(map: ObstacleMap) -> Self {
		let blocked = map
			.iter_cells()
			.map(|cell| map.get_field_cell_value(cell))
			.collect();
		ObstacleMapData {
			width: map.width,
			height: map.height,
			blocked,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn frame_is_blocked() {
		for (width, height) in [(0, 0), (1, 1), (5, 3), (7, 12)] {
			let map = ObstacleMap::new(width, height);
			let (w, h) = (width as i32, height as i32);
			for x in -1..=w {
				assert!(map.get_field_cell_value(IVec2::new(x, -1)));
				assert!(map.get_field_cell_value(IVec2::new(x, h)));
			}
			for y in -1..=h {
				assert!(map.get_field_cell_value(IVec2::new(-1, y)));
				assert!(map.get_field_cell_value(IVec2::new(w, y)));
			}
			assert_eq!(0, map.get_blocked_count());
		}
	}
	#[test]
	#[should_panic]
	fn cannot_write_frame() {
		let mut map = ObstacleMap::new(3, 3);
		map.set_field_cell_value(false, IVec2::new(3, 0));
	}
	#[test]
	#[should_panic]
	fn cannot_read_beyond_frame() {
		let map = ObstacleMap::new(3, 3);
		map.get_field_cell_value(IVec2::new(-2, 0));
	}
	#[test]
	fn collision_out_of_bounds_and_blocked() {
		//  ___________
		// |   | # |   |
		// |___|___|___|
		let map = ObstacleMap::from_ascii(".#.").unwrap();
		assert!(!map.collides(Vec2::new(0.5, 0.5)));
		assert!(map.collides(Vec2::new(1.2, 0.9)));
		assert!(map.collides(Vec2::new(-0.1, 0.5)));
		assert!(map.collides(Vec2::new(2.5, 1.0)));
		assert!(!map.collides(Vec2::new(2.99, 0.99)));
	}
	#[test]
	fn copy_is_independent() {
		let mut original = ObstacleMap::new(4, 4);
		original.set_field_cell_value(true, IVec2::new(1, 1));
		let mut copy = original.clone();
		copy.unblock_area(IRect::new(0, 0, 3, 3));
		assert!(original.is_blocked(IVec2::new(1, 1)));
		assert!(!copy.is_blocked(IVec2::new(1, 1)));
	}
	#[test]
	fn unblock_area_clamps_to_map() {
		let mut map = ObstacleMap::from_ascii(
			"
			###
			###
			###
			",
		)
		.unwrap();
		map.unblock_area(IRect::new(1, 1, 10, 10));
		assert_eq!(5, map.get_blocked_count());
		assert!(map.get_field_cell_value(IVec2::new(3, 3)));
	}
	#[test]
	fn ascii_errors() {
		assert!(matches!(
			ObstacleMap::from_ascii("  \n "),
			Err(EngineError::EmptyMap)
		));
		assert!(matches!(
			ObstacleMap::from_ascii("...\n.."),
			Err(EngineError::RaggedMap {
				row: 1,
				expected: 3,
				found: 2
			})
		));
		assert!(matches!(
			ObstacleMap::from_ascii("..x"),
			Err(EngineError::UnknownSymbol {
				symbol: 'x',
				column: 2,
				row: 0
			})
		));
	}
	#[test]
	fn data_conversion_checks_length() {
		let data = ObstacleMapData {
			width: 2,
			height: 2,
			blocked: vec![true, false, false],
		};
		assert!(ObstacleMap::try_from(data).is_err());
		let map = ObstacleMap::from_ascii("#.\n.#").unwrap();
		let data = ObstacleMapData::from(map.clone());
		assert_eq!(vec![true, false, false, true], data.blocked);
		assert_eq!(map, ObstacleMap::try_from(data).unwrap());
	}
	#[test]
	#[cfg(feature = "ron")]
	fn ron_map() {
		let map = ObstacleMap::from_ron_str("(width: 2, height: 1, blocked: [false, true])").unwrap();
		assert!(map.is_blocked(IVec2::new(1, 0)));
	}
}
