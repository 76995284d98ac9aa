//! Delaunay triangulation of a point set
//!
//! Incremental Bowyer-Watson insertion inside a super triangle. Points are
//! normalized to a unit box first so the circumcircle tests stay well
//! conditioned for large board coordinates.
//!
//! The super triangle sits far enough away that it never falls inside the
//! diametral circle of two input points. Every Gabriel edge of the input is
//! therefore an edge of the output, including hull edges whose triangles
//! touch a super vertex. The Euclidean minimum spanning tree is a subgraph of
//! the Gabriel graph, which is what makes these edges sufficient candidates.

use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug)]
struct Triangle {
    v: [usize; 3],
    center: [f64; 2],
    radius_2: f64,
}

impl Triangle {
    fn new(v: [usize; 3], verts: &[[f64; 2]]) -> Self {
        let [a, b, c] = [verts[v[0]], verts[v[1]], verts[v[2]]];
        let d = 2.0 * (a[0] * (b[1] - c[1]) + b[0] * (c[1] - a[1]) + c[0] * (a[1] - b[1]));

        if d.abs() < 1e-18 {
            // Degenerate: evicted by the next insertion that reaches it
            return Self {
                v,
                center: [(a[0] + c[0]) / 2.0, (a[1] + c[1]) / 2.0],
                radius_2: f64::INFINITY,
            };
        }

        let a2 = a[0] * a[0] + a[1] * a[1];
        let b2 = b[0] * b[0] + b[1] * b[1];
        let c2 = c[0] * c[0] + c[1] * c[1];
        let center = [
            (a2 * (b[1] - c[1]) + b2 * (c[1] - a[1]) + c2 * (a[1] - b[1])) / d,
            (a2 * (c[0] - b[0]) + b2 * (a[0] - c[0]) + c2 * (b[0] - a[0])) / d,
        ];
        let dx = a[0] - center[0];
        let dy = a[1] - center[1];

        Self { v, center, radius_2: dx * dx + dy * dy }
    }

    fn circumcircle_contains(&self, p: [f64; 2]) -> bool {
        let dx = p[0] - self.center[0];
        let dy = p[1] - self.center[1];
        dx * dx + dy * dy < self.radius_2
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.v;
        [(a, b), (b, c), (c, a)]
    }
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// True when the points span a 2D area (at least three, not all collinear)
pub(crate) fn has_area(points: &[[f64; 2]]) -> bool {
    if points.len() < 3 {
        return false;
    }
    let o = points[0];
    let Some(d) = points[1..].iter().find(|p| **p != o) else {
        return false;
    };
    points.iter().any(|p| {
        let cross = (d[0] - o[0]) * (p[1] - o[1]) - (d[1] - o[1]) * (p[0] - o[0]);
        cross != 0.0
    })
}

/// Runs the insertion over normalized points. Indices >= points.len() are super vertices.
fn bowyer_watson(points: &[[f64; 2]]) -> Vec<Triangle> {
    let n = points.len();
    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for p in points {
        min_x = min_x.min(p[0]);
        min_y = min_y.min(p[1]);
        max_x = max_x.max(p[0]);
        max_y = max_y.max(p[1]);
    }
    let mid = [(min_x + max_x) / 2.0, (min_y + max_y) / 2.0];
    let scale = (max_x - min_x).max(max_y - min_y).max(f64::MIN_POSITIVE);

    let mut verts: Vec<[f64; 2]> = points
        .iter()
        .map(|p| [(p[0] - mid[0]) / scale, (p[1] - mid[1]) / scale])
        .collect();
    verts.extend_from_slice(&[[-20.0, -10.0], [20.0, -10.0], [0.0, 20.0]]);

    let mut triangles = vec![Triangle::new([n, n + 1, n + 2], &verts)];

    for i in 0..n {
        let p = verts[i];

        let mut edge_count: HashMap<(usize, usize), u32> = HashMap::new();
        let mut cavity_edges = Vec::new();
        for tri in triangles.iter().filter(|t| t.circumcircle_contains(p)) {
            for (a, b) in tri.edges() {
                *edge_count.entry(edge_key(a, b)).or_insert(0) += 1;
                cavity_edges.push((a, b));
            }
        }

        triangles.retain(|t| !t.circumcircle_contains(p));

        for (a, b) in cavity_edges {
            if edge_count[&edge_key(a, b)] == 1 {
                triangles.push(Triangle::new([a, b, i], &verts));
            }
        }
    }

    triangles
}

#[cfg(test)]
/// Triangulates a point set. Returns flat index triples into `points`,
/// or None when the points do not span an area.
fn triangulate(points: &[[f64; 2]]) -> Option<Vec<usize>> {
    if !has_area(points) {
        return None;
    }
    let n = points.len();
    Some(
        bowyer_watson(points)
            .iter()
            .filter(|t| t.v.iter().all(|&v| v < n))
            .flat_map(|t| t.v)
            .collect(),
    )
}

/// Unique edges between input points, in triangle generation order.
/// Returns None when the points do not span an area.
pub(crate) fn triangulation_edges(points: &[[f64; 2]]) -> Option<Vec<(usize, usize)>> {
    if !has_area(points) {
        return None;
    }
    let n = points.len();
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for tri in bowyer_watson(points) {
        for (a, b) in tri.edges() {
            if a < n && b < n && seen.insert(edge_key(a, b)) {
                edges.push(edge_key(a, b));
            }
        }
    }
    Some(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_inputs() {
        assert!(triangulate(&[]).is_none());
        assert!(triangulate(&[[0.0, 0.0], [1.0, 1.0]]).is_none());
        assert!(triangulate(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [5.0, 5.0]]).is_none());
    }

    #[test]
    fn test_single_triangle() {
        let indices = triangulate(&[[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]]).unwrap();
        assert_eq!(indices.len(), 3);
        let mut sorted = indices.clone();
        sorted.sort();
        assert_eq!(sorted, vec![0, 1, 2]);
    }

    #[test]
    fn test_square_has_two_triangles() {
        let points = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let indices = triangulate(&points).unwrap();
        assert_eq!(indices.len(), 6);

        let edges = triangulation_edges(&points).unwrap();
        // Four sides plus one diagonal
        assert_eq!(edges.len(), 5);
        for side in [(0, 1), (1, 2), (2, 3), (0, 3)] {
            assert!(edges.contains(&side), "missing side {:?}", side);
        }
    }

    #[test]
    fn test_hull_edges_survive_near_collinear_points() {
        // Flat row with a single point well above it
        let mut points: Vec<[f64; 2]> = (0..8).map(|i| [i as f64 * 100.0, 0.0]).collect();
        points.push([350.0, 200.0]);
        let edges = triangulation_edges(&points).unwrap();
        for i in 0..7 {
            assert!(edges.contains(&(i, i + 1)), "missing row edge {}-{}", i, i + 1);
        }
    }

    #[test]
    fn test_empty_circumcircle() {
        let mut points = Vec::new();
        for y in 0..5 {
            for x in 0..5 {
                // Jitter to avoid cocircular ties
                points.push([
                    x as f64 * 10.0 + (y % 2) as f64 * 0.5,
                    y as f64 * 10.0 + (x % 3) as f64 * 0.3,
                ]);
            }
        }
        let indices = triangulate(&points).unwrap();
        assert!(!indices.is_empty());

        for tri in indices.chunks(3) {
            let t = Triangle::new([tri[0], tri[1], tri[2]], &points);
            for (i, p) in points.iter().enumerate() {
                if tri.contains(&i) {
                    continue;
                }
                let dx = p[0] - t.center[0];
                let dy = p[1] - t.center[1];
                assert!(
                    dx * dx + dy * dy >= t.radius_2 * (1.0 - 1e-9),
                    "point {} inside circumcircle of {:?}",
                    i,
                    tri
                );
            }
        }
    }
}
