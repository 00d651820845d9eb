//! Incremental (Bowyer-Watson) Delaunay triangulation.
//!
//! Points are inserted one at a time into a triangulation seeded with a large
//! enclosing triangle. Every triangle whose circumcircle contains the new
//! point is removed and the resulting cavity is re-fanned from the point.
//! Triangles touching the seed vertices, and zero-area triangles produced by
//! collinear input, are dropped at the end. All containers are vectors so the
//! output is identical across runs for identical input.

const AREA_EPS: f64 = 1e-12;

#[derive(Clone, Copy, Debug)]
struct Triangle {
    v: [usize; 3],
    cx: f64,
    cy: f64,
    r2: f64,
}

impl Triangle {
    fn new(pts: &[(f64, f64)], a: usize, b: usize, c: usize) -> Self {
        let (ax, ay) = pts[a];
        let (bx, by) = pts[b];
        let (cx, cy) = pts[c];
        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
        if d.abs() < AREA_EPS {
            // Degenerate: treat the circumcircle as unbounded so the triangle is
            // replaced by the next insertion.
            return Self {
                v: [a, b, c],
                cx: 0.0,
                cy: 0.0,
                r2: f64::INFINITY,
            };
        }
        let a2 = ax * ax + ay * ay;
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
        let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
        let r2 = (ax - ux) * (ax - ux) + (ay - uy) * (ay - uy);
        Self {
            v: [a, b, c],
            cx: ux,
            cy: uy,
            r2,
        }
    }

    fn circumcircle_contains(&self, x: f64, y: f64) -> bool {
        if self.r2.is_infinite() {
            return true;
        }
        let dx = x - self.cx;
        let dy = y - self.cy;
        dx * dx + dy * dy <= self.r2 * (1.0 + 1e-12)
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.v;
        [(a, b), (b, c), (c, a)]
    }
}

/// Twice the signed area of triangle `abc`.
pub(crate) fn signed_area2(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (c.0 - a.0) * (b.1 - a.1)
}

/// Triangulates `points`; returns vertex index triples into `points`.
///
/// Duplicate points must be removed by the caller. Fewer than three points or
/// an entirely collinear set yields no triangles.
pub(crate) fn triangulate(points: &[(f64, f64)]) -> Vec<[usize; 3]> {
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let delta = (max_x - min_x).max(max_y - min_y);
    if !(delta > 0.0) || !delta.is_finite() {
        return Vec::new();
    }
    let mid_x = 0.5 * (min_x + max_x);
    let mid_y = 0.5 * (min_y + max_y);

    let mut pts = points.to_vec();
    pts.push((mid_x - 20.0 * delta, mid_y - delta));
    pts.push((mid_x, mid_y + 20.0 * delta));
    pts.push((mid_x + 20.0 * delta, mid_y - delta));

    let mut triangles = vec![Triangle::new(&pts, n, n + 1, n + 2)];
    let mut edges: Vec<(usize, usize)> = Vec::new();
    let mut keys: Vec<(usize, usize)> = Vec::new();

    for (i, &(px, py)) in points.iter().enumerate() {
        edges.clear();
        let mut kept = Vec::with_capacity(triangles.len() + 2);
        for tri in triangles.drain(..) {
            if tri.circumcircle_contains(px, py) {
                edges.extend_from_slice(&tri.edges());
            } else {
                kept.push(tri);
            }
        }
        triangles = kept;

        keys.clear();
        keys.extend(edges.iter().map(|&(a, b)| (a.min(b), a.max(b))));
        keys.sort_unstable();
        for &(a, b) in &edges {
            let key = (a.min(b), a.max(b));
            let first = keys.partition_point(|k| *k < key);
            let shared = keys.get(first + 1).is_some_and(|k| *k == key);
            if !shared {
                triangles.push(Triangle::new(&pts, a, b, i));
            }
        }
    }

    triangles
        .into_iter()
        .filter(|t| t.v.iter().all(|&v| v < n))
        .filter(|t| signed_area2(pts[t.v[0]], pts[t.v[1]], pts[t.v[2]]).abs() > AREA_EPS)
        .map(|t| t.v)
        .collect()
}
