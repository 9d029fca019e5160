#![allow(dead_code)]
use cluster_nav::prelude::*;
use cluster_nav::labels::LeafTags;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// ((0,1),(2,3)) then ((4,5) under the root): node ids 6..=10, root 10.
pub fn six_leaf_linkage() -> Vec<[f64; 4]> {
    vec![
        [0.0, 1.0, 0.1, 2.0],
        [2.0, 3.0, 0.1, 2.0],
        [4.0, 5.0, 0.1, 2.0],
        [6.0, 7.0, 1.0, 4.0],
        [9.0, 8.0, 2.0, 6.0],
    ]
}

/// Six accounts around three well-separated micro-cluster centroids.
pub fn six_account_artifact() -> SpectralArtifact {
    SpectralArtifact::from_parts(SpectralArtifactFile {
        node_ids: (0..6).map(|i| format!("acct{i}")).collect(),
        embedding: vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![5.0, 0.0],
            vec![5.1, 0.0],
            vec![0.0, 5.0],
            vec![0.0, 5.1],
        ],
        linkage_matrix: six_leaf_linkage(),
        micro_labels: Some(vec![0, 0, 1, 1, 2, 2]),
        micro_centroids: Some(vec![vec![0.05, 0.0], vec![5.05, 0.0], vec![0.0, 5.05]]),
    })
    .unwrap()
}

/// Balanced tree over eight accounts: pairs 8..=11, quads 12 and 13, root 14.
pub fn balanced_eight_artifact() -> SpectralArtifact {
    SpectralArtifact::from_parts(SpectralArtifactFile {
        node_ids: (0..8).map(|i| format!("acct{i}")).collect(),
        embedding: (0..8).map(|i| vec![(i / 2) as f64 * 3.0, (i % 2) as f64 * 0.1]).collect(),
        linkage_matrix: vec![
            [0.0, 1.0, 0.1, 2.0],
            [2.0, 3.0, 0.1, 2.0],
            [4.0, 5.0, 0.1, 2.0],
            [6.0, 7.0, 0.1, 2.0],
            [8.0, 9.0, 1.0, 4.0],
            [10.0, 11.0, 1.0, 4.0],
            [12.0, 13.0, 2.0, 8.0],
        ],
        micro_labels: None,
        micro_centroids: None,
    })
    .unwrap()
}

pub fn metadata(n: usize) -> Vec<NodeMetadata> {
    (0..n)
        .map(|i| NodeMetadata {
            handle: format!("@user{i}"),
            display_name: None,
            signal: Some(i as f64),
        })
        .collect()
}

/// Mutual edges inside each pair, plus one one-way edge between pairs.
pub fn pair_graph() -> CsrAdjacency {
    CsrAdjacency::from_edges(6, &[(0, 1), (1, 0), (2, 3), (3, 2), (4, 5), (5, 4), (1, 2)]).unwrap()
}

/// Random binary merge tree over `n` leaves with increasing distances.
pub fn random_linkage(n: usize, rng: &mut SmallRng) -> Vec<[f64; 4]> {
    let mut active: Vec<(usize, usize)> = (0..n).map(|leaf| (leaf, 1)).collect();
    let mut rows = Vec::with_capacity(n.saturating_sub(1));
    let mut distance = 0.0;
    while active.len() > 1 {
        let a = active.swap_remove(rng.gen_range(0..active.len()));
        let b = active.swap_remove(rng.gen_range(0..active.len()));
        distance += rng.gen_range(0.01..1.0);
        rows.push([a.0 as f64, b.0 as f64, distance, (a.1 + b.1) as f64]);
        active.push((n + rows.len() - 1, a.1 + b.1));
    }
    rows
}

/// Random artifact with `n` accounts in `dim` dimensions.
pub fn random_artifact(n: usize, dim: usize, seed: u64) -> SpectralArtifact {
    let mut rng = SmallRng::seed_from_u64(seed);
    let linkage_matrix = random_linkage(n, &mut rng);
    let embedding = (0..n)
        .map(|_| (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();
    SpectralArtifact::from_parts(SpectralArtifactFile {
        node_ids: (0..n).map(|i| format!("acct{i}")).collect(),
        embedding,
        linkage_matrix,
        micro_labels: None,
        micro_centroids: None,
    })
    .unwrap()
}

/// Random directed graph with roughly `per_vertex` out-edges per vertex.
pub fn random_graph(n: usize, per_vertex: usize, seed: u64) -> CsrAdjacency {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut edges = Vec::with_capacity(n * per_vertex);
    for u in 0..n {
        for _ in 0..per_vertex {
            edges.push((u, rng.gen_range(0..n)));
        }
    }
    CsrAdjacency::from_edges(n, &edges).unwrap()
}

/// Owned inputs for a `VisibleSetManager`.
pub struct ManagerInputs {
    pub graph: CsrAdjacency,
    pub tags: LeafTags,
    pub signal: Vec<f64>,
    pub config: ExpansionConfig,
}

impl ManagerInputs {
    pub fn new(graph: CsrAdjacency) -> Self {
        let signal = graph.total_degrees();
        Self {
            graph,
            tags: LeafTags::new(),
            signal,
            config: ExpansionConfig::default(),
        }
    }

    pub fn manager<'a>(&'a self, tree: &'a Dendrogram) -> VisibleSetManager<'a, CsrAdjacency> {
        VisibleSetManager::new(
            DendrogramIndex::new(tree),
            ExpansionSelector::new(&self.graph, &self.tags, &self.signal, &self.config),
        )
    }
}

/// Assert the visible set partitions every leaf exactly once.
pub fn assert_frontier(set: &VisibleSet, tree: &Dendrogram) {
    let mut seen: Vec<usize> = set.entries().flat_map(|k| set.leaves_of(k, tree)).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..tree.n_leaves()).collect::<Vec<_>>());
    assert!(set.len() <= set.budget());
}
