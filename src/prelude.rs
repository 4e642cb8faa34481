//! `use bevy_flowfield_workers::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::{
	config::*,
	error::*,
	fields::{flow_field::*, visibility_map::*, *},
	generators::{assignment::*, movement::*, registry::*, scheduler::*, visibility::*},
	grid::{obstacle_map::*, pushing_map::*, ray::*, utilities::*, *},
	pathfinding::{bfs::*, wavefront::*, *},
};

#[doc(hidden)]
pub use crate::plugin::{flow_layer::*, obstacle_layer::*, visibility_layer::*, *};
