//! This is a plugin for Bevy game engine which computes pathfinding FlowFields and VisibilityMaps
//! on background worker threads from grids of obstacles
//!

pub mod config;
pub mod error;
pub mod fields;
pub mod generators;
pub mod grid;
pub mod pathfinding;
pub mod plugin;

pub mod prelude;
