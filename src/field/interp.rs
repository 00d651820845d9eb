//! Piecewise-linear interpolation of scattered samples onto a pixel grid.

use crate::field::delaunay::{signed_area2, triangulate};
use crate::field::{is_undefined, Grid};
use crate::register::{ShiftAxis, ShiftSampleSet};
use crate::trace::{trace_event, trace_span};
use crate::util::{MisregError, MisregResult};

const INSIDE_EPS: f64 = 1e-9;

/// Interpolates one shift component over a raster of `samples x lines` pixels.
///
/// See [`interpolate_scattered`] for the grid layout.
pub fn interpolate_shift_field(
    samples: &ShiftSampleSet,
    axis: ShiftAxis,
    raster_samples: usize,
    raster_lines: usize,
) -> MisregResult<Grid> {
    interpolate_scattered(
        samples.x_positions(),
        samples.y_positions(),
        samples.shifts(axis),
        raster_samples,
        raster_lines,
    )
}

/// Linearly interpolates scattered `values` at `(xs, ys)` onto a dense grid.
///
/// The grid covers pixel coordinates `1..raster_samples` by `1..raster_lines`,
/// so cell `(i, j)` holds the value at pixel `(i + 1, j + 1)` and the grid is
/// `(raster_samples - 1) x (raster_lines - 1)`. Interpolation is barycentric
/// over a Delaunay triangulation of the sample positions; cells outside the
/// convex hull stay undefined, as does the whole grid when fewer than three
/// non-collinear positions are available. Exact duplicate positions keep the
/// first value. Output is bit-identical for identical input.
pub fn interpolate_scattered(
    xs: &[f64],
    ys: &[f64],
    values: &[f64],
    raster_samples: usize,
    raster_lines: usize,
) -> MisregResult<Grid> {
    if xs.len() != ys.len() || xs.len() != values.len() {
        return Err(MisregError::InvalidInput(
            "positions and values must have equal length",
        ));
    }
    if raster_samples < 2 || raster_lines < 2 {
        return Err(MisregError::InvalidDimensions {
            width: raster_samples,
            height: raster_lines,
        });
    }
    let width = raster_samples - 1;
    let height = raster_lines - 1;
    let _span = trace_span!("interpolate", width = width, height = height).entered();

    let mut grid = Grid::undefined(width, height)?;
    let (points, point_values) = unique_points(xs, ys, values);
    let triangles = triangulate(&points);
    trace_event!("triangulated", points = points.len(), triangles = triangles.len());

    let cells = grid.data_mut();
    for tri in &triangles {
        let a = points[tri[0]];
        let b = points[tri[1]];
        let c = points[tri[2]];
        let (va, vb, vc) = (
            point_values[tri[0]],
            point_values[tri[1]],
            point_values[tri[2]],
        );
        let area = signed_area2(a, b, c);

        let (x_lo, x_hi) = (a.0.min(b.0).min(c.0), a.0.max(b.0).max(c.0));
        let (y_lo, y_hi) = (a.1.min(b.1).min(c.1), a.1.max(b.1).max(c.1));
        let Some((i0, i1)) = cell_span(x_lo, x_hi, width) else {
            continue;
        };
        let Some((j0, j1)) = cell_span(y_lo, y_hi, height) else {
            continue;
        };

        for j in j0..=j1 {
            let py = (j + 1) as f64;
            let row = &mut cells[j * width..(j + 1) * width];
            for i in i0..=i1 {
                if !is_undefined(row[i]) {
                    continue;
                }
                let p = ((i + 1) as f64, py);
                let wa = signed_area2(b, c, p) / area;
                let wb = signed_area2(c, a, p) / area;
                let wc = 1.0 - wa - wb;
                if wa >= -INSIDE_EPS && wb >= -INSIDE_EPS && wc >= -INSIDE_EPS {
                    row[i] = wa * va + wb * vb + wc * vc;
                }
            }
        }
    }

    Ok(grid)
}

/// Range of cell indices whose pixel coordinate (index + 1) lies in `[lo, hi]`.
fn cell_span(lo: f64, hi: f64, len: usize) -> Option<(usize, usize)> {
    let first = (lo - 1.0 - INSIDE_EPS).ceil().max(0.0);
    let last = (hi - 1.0 + INSIDE_EPS).floor();
    if last < 0.0 || first > last || first >= len as f64 {
        return None;
    }
    let last = last.min((len - 1) as f64);
    Some((first as usize, last as usize))
}

fn unique_points(xs: &[f64], ys: &[f64], values: &[f64]) -> (Vec<(f64, f64)>, Vec<f64>) {
    let mut order: Vec<usize> = (0..xs.len())
        .filter(|&i| xs[i].is_finite() && ys[i].is_finite() && values[i].is_finite())
        .collect();
    // Stable sort keeps the first of equal positions in front.
    order.sort_by(|&a, &b| xs[a].total_cmp(&xs[b]).then(ys[a].total_cmp(&ys[b])));
    let mut keep: Vec<usize> = Vec::with_capacity(order.len());
    for idx in order {
        if let Some(&prev) = keep.last() {
            if xs[prev] == xs[idx] && ys[prev] == ys[idx] {
                continue;
            }
        }
        keep.push(idx);
    }
    keep.sort_unstable();
    let points = keep.iter().map(|&i| (xs[i], ys[i])).collect();
    let vals = keep.iter().map(|&i| values[i]).collect();
    (points, vals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_is_reproduced_inside_the_hull() {
        let xs = [1.0, 9.0, 9.0, 1.0, 5.0];
        let ys = [1.0, 1.0, 9.0, 9.0, 5.0];
        let vals: Vec<f64> = xs.iter().zip(&ys).map(|(x, y)| 2.0 * x - y + 3.0).collect();
        let grid = interpolate_scattered(&xs, &ys, &vals, 12, 12).unwrap();
        assert_eq!((grid.width(), grid.height()), (11, 11));
        for j in 0..9 {
            for i in 0..9 {
                let (px, py) = ((i + 1) as f64, (j + 1) as f64);
                let v = grid.get(i, j).unwrap();
                assert!((v - (2.0 * px - py + 3.0)).abs() < 1e-9, "cell ({i},{j}) = {v}");
            }
        }
        assert!(is_undefined(grid.get(9, 0).unwrap()));
        assert!(is_undefined(grid.get(0, 10).unwrap()));
    }

    #[test]
    fn fewer_than_three_samples_give_an_undefined_grid() {
        let grid = interpolate_scattered(&[2.0, 4.0], &[2.0, 4.0], &[1.0, 1.0], 8, 8).unwrap();
        assert!(grid.is_all_undefined());
        let empty = interpolate_scattered(&[], &[], &[], 8, 8).unwrap();
        assert!(empty.is_all_undefined());
    }

    #[test]
    fn duplicate_positions_keep_the_first_value() {
        let xs = [1.0, 5.0, 1.0, 1.0];
        let ys = [1.0, 1.0, 5.0, 1.0];
        let vals = [1.0, 1.0, 1.0, 50.0];
        let grid = interpolate_scattered(&xs, &ys, &vals, 8, 8).unwrap();
        assert_eq!(grid.get(0, 0), Some(1.0));
    }

    #[test]
    fn degenerate_raster_is_rejected() {
        let err = interpolate_scattered(&[], &[], &[], 1, 10).unwrap_err();
        assert_eq!(
            err,
            MisregError::InvalidDimensions {
                width: 1,
                height: 10
            }
        );
    }

    #[test]
    fn cell_span_clips_to_grid() {
        assert_eq!(cell_span(0.2, 3.5, 10), Some((0, 2)));
        assert_eq!(cell_span(4.0, 40.0, 10), Some((3, 9)));
        assert_eq!(cell_span(30.0, 40.0, 10), None);
        assert_eq!(cell_span(1.2, 1.8, 10), None);
    }
}
