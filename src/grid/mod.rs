//! Discrete grid primitives shared by pathfinding and visibility: the padded
//! [obstacle_map::ObstacleMap], exact grid traversal with [ray::Ray] and the
//! derived [pushing_map::PushingMap]
//!

pub mod obstacle_map;
pub mod pushing_map;
pub mod ray;
pub mod utilities;
