//! Measure a VisibilityMap for a crowd of viewers spread over a map with
//! scattered obstacles
//!
//! Map is 128 by 128 cells with 64 viewers
//!

use bevy::prelude::*;
use bevy_flowfield_workers::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// Block every 7th cell and place viewers on a regular lattice
fn prepare_views(size: u32) -> (ObstacleMap, Vec<View>) {
	let mut map = ObstacleMap::new(size, size);
	let cells: Vec<IVec2> = map.iter_cells().collect();
	for (i, cell) in cells.into_iter().enumerate() {
		if i % 7 == 0 {
			map.set_field_cell_value(true, cell);
		}
	}
	let mut views = Vec::new();
	for y in 0..8 {
		for x in 0..8 {
			let position = Vec2::new(x as f32 * 16.0 + 8.5, y as f32 * 16.0 + 8.5);
			views.push(View::new(position, 10.0));
		}
	}
	(map, views)
}

pub fn criterion_benchmark(c: &mut Criterion) {
	let mut group = c.benchmark_group("algorithm_use");
	group.significance_level(0.05).sample_size(50);
	let (map, views) = prepare_views(128);
	group.bench_function("calc_visibility", |b| {
		b.iter(|| compute_visibility(black_box(&map), black_box(&views)))
	});
	group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
