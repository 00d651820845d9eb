use criterion::{criterion_group, criterion_main, Criterion};
use misreg::{heatmap_rgba, interpolate_scattered, HeatmapOptions};
use std::hint::black_box;

/// Tile centers on a jittered lattice, roughly what a registration pass yields.
fn make_samples(raster: usize, spacing: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut values = Vec::new();
    for j in (spacing / 2..raster).step_by(spacing) {
        for i in (spacing / 2..raster).step_by(spacing) {
            let jitter = (((i * 31) ^ (j * 17)) % 7) as f64 - 3.0;
            xs.push(i as f64 + jitter);
            ys.push(j as f64 - jitter);
            values.push((i as f64 * 0.01).sin() + (j as f64 * 0.02).cos());
        }
    }
    (xs, ys, values)
}

fn bench_interpolation(c: &mut Criterion) {
    let raster = 1024;
    let (xs, ys, values) = make_samples(raster, 40);

    c.bench_function("interpolate_1024_sparse", |b| {
        b.iter(|| {
            let grid = interpolate_scattered(
                black_box(&xs),
                black_box(&ys),
                black_box(&values),
                raster,
                raster,
            )
            .unwrap();
            black_box(grid);
        })
    });

    let grid = interpolate_scattered(&xs, &ys, &values, raster, raster).unwrap();
    let options = HeatmapOptions {
        max_side: 512,
        ..HeatmapOptions::default()
    };
    c.bench_function("heatmap_rgba_512", |b| {
        b.iter(|| {
            let heatmap = heatmap_rgba(black_box(&grid), &options).unwrap();
            black_box(heatmap);
        })
    });
}

criterion_group!(benches, bench_interpolation);
criterion_main!(benches);
