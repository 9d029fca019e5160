//! Inter-cluster edge accumulation.

use hashbrown::HashMap;
use rayon::prelude::*;

use crate::graph::NavigableGraph;

/// Accumulated traffic between two clusters, `a < b` by cluster index.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeTally {
    pub a: usize,
    pub b: usize,
    pub raw: u64,
    pub weight: f64,
    pub connectivity: f64,
}

type Acc = HashMap<(usize, usize), (u64, f64)>;

fn key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

/// Sum adjacency entries crossing clusters.
///
/// `assignment[leaf]` is the cluster index of each leaf and `sizes[c]` its
/// leaf count. With a Louvain community per leaf and `louvain_weight > 0`,
/// same-community entries count `1 + w` and cross-community entries
/// `max(0, 1 - w)`; entries with an unknown community count 1. Pairs whose
/// weight ends up non-positive are dropped. Output is sorted by `(a, b)`.
pub fn inter_cluster_edges<G: NavigableGraph>(
    graph: &G,
    assignment: &[usize],
    sizes: &[usize],
    louvain: Option<&[Option<u32>]>,
    louvain_weight: f64,
) -> Vec<EdgeTally> {
    let boost = louvain.filter(|_| louvain_weight > 0.0);
    let factor = |u: usize, v: usize| -> f64 {
        let Some(comm) = boost else {
            return 1.0;
        };
        match (comm.get(u).copied().flatten(), comm.get(v).copied().flatten()) {
            (Some(cu), Some(cv)) if cu == cv => 1.0 + louvain_weight,
            (Some(_), Some(_)) => (1.0 - louvain_weight).max(0.0),
            _ => 1.0,
        }
    };
    let acc: Acc = graph
        .edges()
        .fold(Acc::new, |mut local, (u, v)| {
            let (Some(&cu), Some(&cv)) = (assignment.get(u), assignment.get(v)) else {
                return local;
            };
            if cu != cv {
                let slot = local.entry(key(cu, cv)).or_insert((0, 0.0));
                slot.0 += 1;
                slot.1 += factor(u, v);
            }
            local
        })
        .reduce(Acc::new, |mut a, b| {
            for (k, (raw, w)) in b {
                let slot = a.entry(k).or_insert((0, 0.0));
                slot.0 += raw;
                slot.1 += w;
            }
            a
        });
    let mut out: Vec<EdgeTally> = acc
        .into_iter()
        .filter(|(_, (_, w))| *w > 0.0)
        .map(|((a, b), (raw, weight))| {
            let norm = ((sizes[a] * sizes[b]) as f64).sqrt();
            EdgeTally {
                a,
                b,
                raw,
                weight,
                connectivity: if norm > 0.0 { weight / norm } else { 0.0 },
            }
        })
        .collect();
    out.sort_unstable_by_key(|e| (e.a, e.b));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CsrAdjacency;

    fn graph() -> CsrAdjacency {
        // clusters {0,1} and {2,3}; two crossing entries and one internal
        CsrAdjacency::from_edges(4, &[(0, 2), (3, 1), (0, 1)]).unwrap()
    }

    #[test]
    fn counts_cross_edges_once_per_entry() {
        let e = inter_cluster_edges(&graph(), &[0, 0, 1, 1], &[2, 2], None, 0.0);
        assert_eq!(e.len(), 1);
        assert_eq!((e[0].a, e[0].b, e[0].raw), (0, 1, 2));
        assert!((e[0].connectivity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn louvain_boost_and_damping() {
        let same = [Some(7), Some(7), Some(7), Some(7)];
        let e = inter_cluster_edges(&graph(), &[0, 0, 1, 1], &[2, 2], Some(&same), 0.5);
        assert!((e[0].weight - 3.0).abs() < 1e-12);

        let split = [Some(1), Some(1), Some(2), Some(2)];
        let e = inter_cluster_edges(&graph(), &[0, 0, 1, 1], &[2, 2], Some(&split), 0.5);
        assert!((e[0].weight - 1.0).abs() < 1e-12);
        assert_eq!(e[0].raw, 2);

        // full damping removes the pair
        let e = inter_cluster_edges(&graph(), &[0, 0, 1, 1], &[2, 2], Some(&split), 1.0);
        assert!(e.is_empty());

        // unknown communities count plainly
        let none = [None, None, None, None];
        let e = inter_cluster_edges(&graph(), &[0, 0, 1, 1], &[2, 2], Some(&none), 0.9);
        assert!((e[0].weight - 2.0).abs() < 1e-12);
    }
}
