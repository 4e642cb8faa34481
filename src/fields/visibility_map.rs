//! Which cells are currently observed by at least one viewer
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Boolean grid of visible cells, written additively while it is generated
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Reflect)]
pub struct VisibilityMap {
	/// Number of columns
	width: u32,
	/// Number of rows
	height: u32,
	/// Row-major visibility
	cells: Vec<bool>,
}

impl Field<bool> for VisibilityMap {
	fn get_dimensions(&self) -> (u32, u32) {
		(self.width, self.height)
	}
	fn get_field_cell_value(&self, cell: IVec2) -> bool {
		self.cells[logical_index(cell, self.width, self.height)]
	}
	fn set_field_cell_value(&mut self, value: bool, cell: IVec2) {
		let index = logical_index(cell, self.width, self.height);
		self.cells[index] = value;
	}
}

impl VisibilityMap {
	/// Create a [VisibilityMap] where nothing is visible
	pub fn new(width: u32, height: u32) -> Self {
		VisibilityMap {
			width,
			height,
			cells: vec![false; width as usize * height as usize],
		}
	}
	/// Create a [VisibilityMap] where everything is visible
	pub fn everything(width: u32, height: u32) -> Self {
		VisibilityMap {
			width,
			height,
			cells: vec![true; width as usize * height as usize],
		}
	}
	/// Whether `cell` lies within the map
	pub fn contains(&self, cell: IVec2) -> bool {
		cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
	}
	/// Mark a cell as visible, cells outside of the map are ignored
	pub fn mark(&mut self, cell: IVec2) {
		if self.contains(cell) {
			self.set_field_cell_value(true, cell);
		}
	}
	/// Whether a cell is visible, cells outside of the map never are
	pub fn is_visible(&self, cell: IVec2) -> bool {
		self.contains(cell) && self.get_field_cell_value(cell)
	}
	/// Whether the cell containing a continuous position is visible
	pub fn is_visible_at(&self, position: Vec2) -> bool {
		self.is_visible(cell_containing(position))
	}
	/// Number of visible cells
	pub fn get_visible_count(&self) -> usize {
		self.cells.iter().filter(|v| **v).count()
	}
}

/// The visibility footprint of one viewer
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default, Reflect)]
pub struct View {
	/// Where the viewer stands
	pub position: Vec2,
	/// How far the viewer can see, in cells
	pub range: f32,
}

impl View {
	/// Create a new instance of [View]
	pub fn new(position: Vec2, range: f32) -> Self {
		View { position, range }
	}
	/// The inclusive `(min, max)` cells of the square spanning
	/// `position ± range`, clamped to a `width` by `height` map. `None` when the
	/// square misses the map entirely
	pub fn get_bounds(&self, width: u32, height: u32) -> Option<(IVec2, IVec2)> {
		if width == 0 || height == 0 {
			return None;
		}
		let range = Vec2::splat(self.range.max(0.0));
		let min = cell_containing(self.position - range);
		let max = cell_containing(self.position + range);
		let limit = IVec2::new(width as i32 - 1, height as i32 - 1);
		if max.x < 0 || max.y < 0 || min.x > limit.x || min.y > limit.y {
			return None;
		}
		Some((min.max(IVec2::ZERO), max.min(limit)))
	}
}
