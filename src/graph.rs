//! Sparse account graph consumed by the view builder and the expansion
//! strategies.
//!
//! Vertex ids are dendrogram leaf indices. Edges are directed (a follows b);
//! strategies that need an undirected view symmetrise on the fly.

use rayon::prelude::*;

use crate::nav_error::NavError;

/// Read-only directed graph over leaf indices.
///
/// All methods are thread-safe and never mutate the graph.
pub trait NavigableGraph: Sync {
    /// Number of vertices (equal to the dendrogram leaf count).
    fn vertex_count(&self) -> usize;

    /// Out-neighbours of `v`, sorted ascending.
    fn neighbors(&self, v: usize) -> &[usize];

    fn out_degree(&self, v: usize) -> usize {
        self.neighbors(v).len()
    }

    fn has_edge(&self, u: usize, v: usize) -> bool {
        self.neighbors(u).binary_search(&v).is_ok()
    }

    /// True when both `u -> v` and `v -> u` exist.
    fn is_mutual(&self, u: usize, v: usize) -> bool {
        self.has_edge(u, v) && self.has_edge(v, u)
    }

    /// In-degree of every vertex.
    fn in_degrees(&self) -> Vec<usize> {
        let mut deg = vec![0usize; self.vertex_count()];
        for u in 0..self.vertex_count() {
            for &v in self.neighbors(u) {
                if let Some(d) = deg.get_mut(v) {
                    *d += 1;
                }
            }
        }
        deg
    }

    /// In plus out degree, used as the default member signal.
    fn total_degrees(&self) -> Vec<f64> {
        let mut deg = self.in_degrees();
        for (v, d) in deg.iter_mut().enumerate() {
            *d += self.out_degree(v);
        }
        deg.into_iter().map(|d| d as f64).collect()
    }

    /// Parallel iterator over every directed edge `(u, v)`.
    fn edges(&self) -> impl ParallelIterator<Item = (usize, usize)> + '_ {
        (0..self.vertex_count())
            .into_par_iter()
            .flat_map_iter(move |u| self.neighbors(u).iter().map(move |&v| (u, v)))
    }
}

/// Compressed sparse row adjacency.
#[derive(Debug, Clone, Default)]
pub struct CsrAdjacency {
    offsets: Vec<usize>,
    targets: Vec<usize>,
}

impl CsrAdjacency {
    /// Build from directed `(source, target)` pairs.
    ///
    /// Duplicate edges collapse to one and self loops are dropped.
    pub fn from_edges(n: usize, edges: &[(usize, usize)]) -> Result<Self, NavError> {
        let mut rows: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(u, v) in edges {
            if u >= n || v >= n {
                return Err(NavError::validation(
                    "adjacency",
                    format!("edge ({u}, {v}) outside {n} vertices"),
                ));
            }
            if u != v {
                rows[u].push(v);
            }
        }
        let mut offsets = Vec::with_capacity(n + 1);
        let mut targets = Vec::with_capacity(edges.len());
        offsets.push(0);
        for mut row in rows {
            row.sort_unstable();
            row.dedup();
            targets.extend(row);
            offsets.push(targets.len());
        }
        Ok(Self { offsets, targets })
    }

    /// Number of stored (directed) edges.
    pub fn nnz(&self) -> usize {
        self.targets.len()
    }
}

impl NavigableGraph for CsrAdjacency {
    fn vertex_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    fn neighbors(&self, v: usize) -> &[usize] {
        match (self.offsets.get(v), self.offsets.get(v + 1)) {
            (Some(&a), Some(&b)) => &self.targets[a..b],
            _ => &[],
        }
    }
}
