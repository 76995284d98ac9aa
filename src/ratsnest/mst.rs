//! Minimum spanning tree over connectivity components
//!
//! Nodes joined by existing copper are merged into components first. Candidate
//! edges are then accepted greedily in ascending weight order (Kruskal) while
//! they join two separate components.

use super::triangulation::triangulation_edges;
use super::types::CandidateStrategy;
use petgraph::unionfind::UnionFind;
use std::collections::HashMap;

/// Weighted candidate connection between two node indices
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Candidate {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

/// Union-find over node indices that tracks the number of components
pub(crate) struct Components {
    uf: UnionFind<usize>,
    count: usize,
}

impl Components {
    pub fn new(n: usize) -> Self {
        Self { uf: UnionFind::new(n), count: n }
    }

    /// Merges the components of `a` and `b`. Returns false if already merged.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let merged = self.uf.union(a, b);
        if merged {
            self.count -= 1;
        }
        merged
    }

    pub fn connected(&self, a: usize, b: usize) -> bool {
        self.uf.equiv(a, b)
    }

    pub fn root(&self, a: usize) -> usize {
        self.uf.find(a)
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

fn distance(points: &[[f64; 2]], a: usize, b: usize) -> f64 {
    let dx = points[b][0] - points[a][0];
    let dy = points[b][1] - points[a][1];
    (dx * dx + dy * dy).sqrt()
}

/// Delaunay edges that cross components. None if the points span no area.
pub(crate) fn triangulation_candidates(
    points: &[[f64; 2]],
    components: &Components,
) -> Option<Vec<Candidate>> {
    let edges = triangulation_edges(points)?;
    Some(
        edges
            .into_iter()
            .filter(|&(a, b)| !components.connected(a, b))
            .map(|(a, b)| Candidate { a, b, weight: distance(points, a, b) })
            .collect(),
    )
}

/// Every node pair that crosses components
pub(crate) fn exhaustive_candidates(points: &[[f64; 2]], components: &Components) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for a in 0..points.len() {
        for b in (a + 1)..points.len() {
            if !components.connected(a, b) {
                candidates.push(Candidate { a, b, weight: distance(points, a, b) });
            }
        }
    }
    candidates
}

/// Closest node pair for every pair of components
pub(crate) fn nearest_pair_candidates(points: &[[f64; 2]], components: &Components) -> Vec<Candidate> {
    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    for i in 0..points.len() {
        let root = components.root(i);
        let g = *group_of_root.entry(root).or_insert_with(|| {
            groups.push((root, Vec::new()));
            groups.len() - 1
        });
        groups[g].1.push(i);
    }

    let mut candidates = Vec::new();
    for (gi, (_, members_a)) in groups.iter().enumerate() {
        for (_, members_b) in groups.iter().skip(gi + 1) {
            let mut best: Option<Candidate> = None;
            for &a in members_a {
                for &b in members_b {
                    let weight = distance(points, a, b);
                    if best.map_or(true, |c| weight < c.weight) {
                        best = Some(Candidate { a, b, weight });
                    }
                }
            }
            candidates.extend(best);
        }
    }
    candidates
}

/// Kruskal's algorithm seeded with existing components.
/// Equal weights keep candidate generation order.
pub(crate) fn kruskal(components: &mut Components, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| a.weight.total_cmp(&b.weight));

    let mut accepted = Vec::new();
    for c in candidates {
        if components.count() <= 1 {
            break;
        }
        if components.union(c.a, c.b) {
            accepted.push(c);
        }
    }
    accepted
}

/// Minimal set of candidate connections joining all components.
///
/// `real` holds the zero-weight (existing copper) connections as index pairs.
pub(crate) fn spanning_edges(
    points: &[[f64; 2]],
    real: &[(usize, usize)],
    strategy: CandidateStrategy,
) -> Vec<Candidate> {
    if points.len() <= 1 {
        return Vec::new();
    }

    let mut components = Components::new(points.len());
    for &(a, b) in real {
        components.union(a, b);
    }
    if components.count() == 1 {
        return Vec::new();
    }

    let candidates = match strategy {
        CandidateStrategy::Exhaustive => exhaustive_candidates(points, &components),
        CandidateStrategy::Triangulation => triangulation_candidates(points, &components)
            .unwrap_or_else(|| {
                tracing::debug!(
                    "[Ratsnest] {} points span no area, using nearest pairs",
                    points.len()
                );
                nearest_pair_candidates(points, &components)
            }),
    };

    let mut accepted = kruskal(&mut components, candidates);

    if components.count() > 1 {
        tracing::warn!(
            "[Ratsnest] {} components left after candidate pass, using nearest pairs",
            components.count()
        );
        let rest = nearest_pair_candidates(points, &components);
        accepted.extend(kruskal(&mut components, rest));
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(edges: &[Candidate]) -> f64 {
        edges.iter().map(|c| c.weight).sum()
    }

    #[test]
    fn test_components_count() {
        let mut c = Components::new(4);
        assert!(c.union(0, 1));
        assert!(!c.union(1, 0));
        assert!(c.connected(0, 1));
        assert!(!c.connected(0, 2));
        assert_eq!(c.count(), 3);
    }

    #[test]
    fn test_kruskal_is_stable_on_ties() {
        let mut c = Components::new(3);
        let edges = kruskal(
            &mut c,
            vec![
                Candidate { a: 0, b: 1, weight: 5.0 },
                Candidate { a: 0, b: 2, weight: 5.0 },
                Candidate { a: 1, b: 2, weight: 5.0 },
            ],
        );
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].a, edges[0].b), (0, 1));
        assert_eq!((edges[1].a, edges[1].b), (0, 2));
    }

    #[test]
    fn test_single_component_has_no_edges() {
        let points = [[0.0, 0.0], [10.0, 0.0]];
        assert!(spanning_edges(&points, &[(0, 1)], CandidateStrategy::Triangulation).is_empty());
        assert!(spanning_edges(&points[..1], &[], CandidateStrategy::Triangulation).is_empty());
    }

    #[test]
    fn test_collinear_points_fall_back() {
        let points = [[0.0, 0.0], [10.0, 0.0], [30.0, 0.0], [60.0, 0.0]];
        let edges = spanning_edges(&points, &[], CandidateStrategy::Triangulation);
        assert_eq!(edges.len(), 3);
        assert!((total(&edges) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_real_edges_merge_components() {
        // Square with one side already routed
        let points = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]];
        let edges = spanning_edges(&points, &[(0, 1)], CandidateStrategy::Triangulation);
        assert_eq!(edges.len(), 2);
        assert!((total(&edges) - 20.0).abs() < 1e-9);
        assert!(edges.iter().all(|c| !((c.a, c.b) == (0, 1) || (c.a, c.b) == (1, 0))));
    }

    #[test]
    fn test_strategies_agree_on_weight() {
        let points: Vec<[f64; 2]> = (0..30)
            .map(|i| {
                let i = i as f64;
                [(i * 37.0) % 101.0, (i * 53.0) % 89.0]
            })
            .collect();
        let real = [(0, 5), (5, 9), (12, 20)];
        let fast = spanning_edges(&points, &real, CandidateStrategy::Triangulation);
        let slow = spanning_edges(&points, &real, CandidateStrategy::Exhaustive);
        assert_eq!(fast.len(), slow.len());
        assert!((total(&fast) - total(&slow)).abs() < 1e-6);
    }
}
