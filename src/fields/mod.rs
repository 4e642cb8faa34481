//! The kinds of fields produced by the workers
//!

pub mod flow_field;
pub mod visibility_map;

use bevy::prelude::*;

/// Defines required access to grids of per-cell values
pub trait Field<T> {
	/// Get the `(width, height)` of the logical area
	fn get_dimensions(&self) -> (u32, u32);
	/// Retrieve a field cell value
	fn get_field_cell_value(&self, cell: IVec2) -> T;
	/// Set a field cell to a value
	fn set_field_cell_value(&mut self, value: T, cell: IVec2);
}

/// Row-major index of a logical `cell` within a `width` by `height` grid,
/// panics when the cell lies outside of it
pub(crate) fn logical_index(cell: IVec2, width: u32, height: u32) -> usize {
	if cell.x < 0 || cell.y < 0 || cell.x as u32 >= width || cell.y as u32 >= height {
		panic!("{} is outside of a field of {}x{}", cell, width, height);
	}
	cell.y as usize * width as usize + cell.x as usize
}
