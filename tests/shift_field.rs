use misreg::{
    interpolate_scattered, interpolate_shift_field, is_undefined, ShiftAxis, ShiftSample,
    ShiftSampleSet,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_samples(rng: &mut StdRng, count: usize, extent: f64) -> ShiftSampleSet {
    (0..count)
        .map(|_| ShiftSample {
            x: rng.random_range(2.0..extent - 2.0),
            y: rng.random_range(2.0..extent - 2.0),
            dx: rng.random_range(-3.0..3.0),
            dy: rng.random_range(-3.0..3.0),
        })
        .collect()
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Counter-clockwise convex hull (monotone chain).
fn convex_hull(mut points: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    points.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mut lower: Vec<(f64, f64)> = Vec::new();
    for &p in &points {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<(f64, f64)> = Vec::new();
    for &p in points.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Signed distance-like margin; negative means outside by at least `margin`.
fn outside_hull(hull: &[(f64, f64)], p: (f64, f64), margin: f64) -> bool {
    (0..hull.len()).any(|i| {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];
        let len = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        cross(a, b, p) / len < -margin
    })
}

#[test]
fn interpolation_is_bit_identical_across_runs() {
    let mut rng = StdRng::seed_from_u64(7);
    let samples = random_samples(&mut rng, 60, 80.0);
    let first = interpolate_shift_field(&samples, ShiftAxis::X, 80, 80).unwrap();
    let second = interpolate_shift_field(&samples, ShiftAxis::X, 80, 80).unwrap();
    let bits = |g: &misreg::Grid| g.data().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
}

#[test]
fn cells_outside_the_hull_are_undefined() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..5 {
        let samples = random_samples(&mut rng, 25, 60.0);
        let grid = interpolate_shift_field(&samples, ShiftAxis::Y, 60, 60).unwrap();
        let points: Vec<_> = samples.iter().map(|s| (s.x, s.y)).collect();
        let hull = convex_hull(points);
        for j in 0..grid.height() {
            for i in 0..grid.width() {
                let pixel = ((i + 1) as f64, (j + 1) as f64);
                if outside_hull(&hull, pixel, 1e-6) {
                    let value = grid.get(i, j).unwrap();
                    assert!(is_undefined(value), "cell ({i}, {j}) outside hull");
                }
            }
        }
        assert!(!grid.is_all_undefined());
    }
}

#[test]
fn linear_fields_are_reproduced_inside_the_hull() {
    let mut rng = StdRng::seed_from_u64(3);
    let samples = random_samples(&mut rng, 40, 50.0);
    let plane = |x: f64, y: f64| 0.25 * x - 0.5 * y + 2.0;
    let values: Vec<f64> = samples.iter().map(|s| plane(s.x, s.y)).collect();
    let grid = interpolate_scattered(
        samples.x_positions(),
        samples.y_positions(),
        &values,
        50,
        50,
    )
    .unwrap();
    let mut checked = 0;
    for j in 0..grid.height() {
        for i in 0..grid.width() {
            let v = grid.get(i, j).unwrap();
            if !is_undefined(v) {
                let expected = plane((i + 1) as f64, (j + 1) as f64);
                assert!((v - expected).abs() < 1e-9, "({i}, {j}): {v} vs {expected}");
                checked += 1;
            }
        }
    }
    assert!(checked > 100);
}

#[test]
fn interpolated_values_stay_within_sample_range() {
    let mut rng = StdRng::seed_from_u64(21);
    let samples = random_samples(&mut rng, 30, 40.0);
    let grid = interpolate_shift_field(&samples, ShiftAxis::X, 40, 40).unwrap();
    let lo = samples.x_shifts().iter().copied().fold(f64::INFINITY, f64::min);
    let hi = samples.x_shifts().iter().copied().fold(f64::NEG_INFINITY, f64::max);
    for v in grid.defined_values() {
        assert!(v >= lo - 1e-6 && v <= hi + 1e-6);
    }
}

#[test]
fn too_few_samples_leave_the_grid_undefined() {
    let samples: ShiftSampleSet = [
        ShiftSample {
            x: 2.0,
            y: 2.0,
            dx: 1.0,
            dy: 1.0,
        },
        ShiftSample {
            x: 8.0,
            y: 8.0,
            dx: 1.0,
            dy: 1.0,
        },
    ]
    .into_iter()
    .collect();
    let grid = interpolate_shift_field(&samples, ShiftAxis::X, 10, 10).unwrap();
    assert_eq!((grid.width(), grid.height()), (9, 9));
    assert!(grid.is_all_undefined());

    let collinear: ShiftSampleSet = (0..5)
        .map(|i| ShiftSample {
            x: 1.0 + i as f64,
            y: 1.0 + i as f64,
            dx: 0.0,
            dy: 0.0,
        })
        .collect();
    let grid = interpolate_shift_field(&collinear, ShiftAxis::Y, 10, 10).unwrap();
    assert!(grid.is_all_undefined());
}
