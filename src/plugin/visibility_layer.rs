//! Logic relating to requesting [VisibilityMap]s from the [VisibilityGenerator]
//!

use crate::prelude::*;
use bevy::prelude::*;

/// A request to compute a [VisibilityMap]. Dropped when the previous result
/// has not been collected yet
#[derive(Event, Debug, Clone)]
pub struct EventRequestVisibility {
	/// What to compute
	task: VisibilityTask,
}

impl EventRequestVisibility {
	/// Create a new instance of [EventRequestVisibility]
	pub fn new(task: VisibilityTask) -> Self {
		EventRequestVisibility { task }
	}
	/// Get the task
	pub fn get_task(&self) -> &VisibilityTask {
		&self.task
	}
}

/// The most recently collected [VisibilityMap]
#[derive(Resource, Debug, Default, Clone)]
pub struct LatestVisibility {
	/// Latest result
	map: Option<VisibilityMap>,
	/// Number of results collected so far
	collected: u64,
}

impl LatestVisibility {
	/// Get the latest map
	pub fn get(&self) -> Option<&VisibilityMap> {
		self.map.as_ref()
	}
	/// Number of results collected so far, changes whenever the map is replaced
	pub fn get_collected_count(&self) -> u64 {
		self.collected
	}
	/// Replace the latest map
	pub fn set(&mut self, map: VisibilityMap) {
		self.map = Some(map);
		self.collected += 1;
	}
	/// Forget the latest map
	pub fn clear(&mut self) {
		self.map = None;
	}
}

/// Read [EventRequestVisibility] and offer the tasks to the worker
#[cfg(not(tarpaulin_include))]
pub fn forward_visibility_requests(
	mut events: EventReader<EventRequestVisibility>,
	visibility: Res<VisibilityGenerator>,
) {
	for event in events.read() {
		visibility.submit(event.get_task().clone());
	}
}

/// Move a finished [VisibilityMap] into [LatestVisibility]
#[cfg(not(tarpaulin_include))]
pub fn collect_visibility(
	visibility: Res<VisibilityGenerator>,
	mut latest: ResMut<LatestVisibility>,
) {
	if let Some(map) = visibility.collect() {
		latest.set(map);
	}
}
