//! Local structure of a cluster's induced subgraph.

use hashbrown::HashMap;

use crate::config::ExpansionConfig;
use crate::graph::NavigableGraph;
use crate::labels::{LeafTags, Polarity, count_tags};

/// Best tag boundary among the members.
#[derive(Clone, Debug, PartialEq)]
pub struct TagSplit {
    pub tag: String,
    pub score: i64,
    /// Members tagged `in`, sorted.
    pub positive: Vec<usize>,
}

/// Dense core versus sparse periphery, by induced degree.
#[derive(Clone, Debug, PartialEq)]
pub struct CoreSplit {
    pub core: Vec<usize>,
    pub periphery: Vec<usize>,
    pub bimodality: f64,
}

/// A bridge whose removal leaves two large parts.
#[derive(Clone, Debug, PartialEq)]
pub struct BridgeCut {
    pub edge: (usize, usize),
    /// Leaves on the far side of the bridge, sorted.
    pub side: Vec<usize>,
}

/// Structural summary that drives strategy dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalStructureMetrics {
    pub size: usize,
    /// Undirected edges inside the cluster.
    pub internal_edges: usize,
    pub density: f64,
    /// Between-class share of induced-degree variance for the best two-way split.
    pub bimodality: f64,
    pub core_split: Option<CoreSplit>,
    /// Components under mutual edges only, ordered by smallest leaf.
    pub mutual_components: Vec<Vec<usize>>,
    /// Mutual components holding at least `min_part_size` leaves.
    pub nontrivial_components: usize,
    pub bridge: Option<BridgeCut>,
    pub tag_split: Option<TagSplit>,
}

/// Undirected induced subgraph in local indices.
struct Induced {
    adj: Vec<Vec<usize>>,
}

impl Induced {
    fn build<G: NavigableGraph>(graph: &G, leaves: &[usize]) -> Self {
        let local: HashMap<usize, usize> = leaves.iter().enumerate().map(|(i, &l)| (l, i)).collect();
        let mut adj = vec![Vec::new(); leaves.len()];
        for (i, &u) in leaves.iter().enumerate() {
            for v in graph.neighbors(u) {
                if let Some(&j) = local.get(v) {
                    adj[i].push(j);
                    adj[j].push(i);
                }
            }
        }
        for row in &mut adj {
            row.sort_unstable();
            row.dedup();
        }
        Self { adj }
    }

    fn degree(&self, i: usize) -> usize {
        self.adj[i].len()
    }

    fn edge_count(&self) -> usize {
        self.adj.iter().map(Vec::len).sum::<usize>() / 2
    }
}

pub(super) fn measure<G: NavigableGraph>(
    graph: &G,
    tags: &LeafTags,
    cfg: &ExpansionConfig,
    leaves: &[usize],
) -> LocalStructureMetrics {
    let size = leaves.len();
    let induced = Induced::build(graph, leaves);
    let internal_edges = induced.edge_count();
    let density = if size > 1 {
        2.0 * internal_edges as f64 / (size * (size - 1)) as f64
    } else {
        0.0
    };
    let (bimodality, core_split) = core_split(&induced, leaves, cfg);
    let mutual_components = mutual_components(graph, leaves);
    let nontrivial_components = mutual_components
        .iter()
        .filter(|c| c.len() >= cfg.min_part_size.max(2))
        .count();
    LocalStructureMetrics {
        size,
        internal_edges,
        density,
        bimodality,
        core_split,
        mutual_components,
        nontrivial_components,
        bridge: best_bridge(&induced, leaves, cfg),
        tag_split: tag_split(tags, cfg, leaves),
    }
}

fn tag_split(tags: &LeafTags, cfg: &ExpansionConfig, leaves: &[usize]) -> Option<TagSplit> {
    let counts = count_tags(
        leaves
            .iter()
            .filter_map(|l| tags.get(l).map(Vec::as_slice)),
    );
    // highest score wins, earliest-seen tag on ties
    let best = counts
        .iter()
        .filter(|c| c.score > cfg.tag_margin)
        .fold(None, |best: Option<&crate::labels::TagCount>, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(c),
        })?;
    let positive: Vec<usize> = leaves
        .iter()
        .copied()
        .filter(|l| {
            tags.get(l).is_some_and(|ts| {
                ts.iter()
                    .any(|t| t.tag == best.tag && t.polarity == Polarity::In)
            })
        })
        .collect();
    if positive.is_empty() || positive.len() == leaves.len() {
        return None;
    }
    Some(TagSplit {
        tag: best.tag.clone(),
        score: best.score,
        positive,
    })
}

/// Otsu-style two-way split of induced degrees.
fn core_split(
    induced: &Induced,
    leaves: &[usize],
    cfg: &ExpansionConfig,
) -> (f64, Option<CoreSplit>) {
    let n = leaves.len();
    if n < 2 {
        return (0.0, None);
    }
    let mut deg: Vec<f64> = (0..n).map(|i| induced.degree(i) as f64).collect();
    deg.sort_by(f64::total_cmp);
    let mean = deg.iter().sum::<f64>() / n as f64;
    let var = deg.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n as f64;
    if var <= f64::EPSILON {
        return (0.0, None);
    }
    let total: f64 = deg.iter().sum();
    let mut prefix = 0.0;
    let mut best: Option<(f64, usize)> = None;
    for k in 1..n {
        prefix += deg[k - 1];
        // never split a run of equal degrees
        if deg[k - 1] == deg[k] {
            continue;
        }
        let w = k as f64 / n as f64;
        let lower = prefix / k as f64;
        let upper = (total - prefix) / (n - k) as f64;
        let between = w * (1.0 - w) * (upper - lower).powi(2);
        if best.is_none_or(|(b, _)| between > b) {
            best = Some((between, k));
        }
    }
    let Some((between, k)) = best else {
        return (0.0, None);
    };
    let bimodality = between / var;
    let threshold = deg[k];
    let (mut core, mut periphery) = (Vec::new(), Vec::new());
    let (mut core_deg, mut periphery_deg) = (0usize, 0usize);
    for (i, &leaf) in leaves.iter().enumerate() {
        let d = induced.degree(i);
        if d as f64 >= threshold {
            core.push(leaf);
            core_deg += d;
        } else {
            periphery.push(leaf);
            periphery_deg += d;
        }
    }
    let core_mean = core_deg as f64 / core.len().max(1) as f64;
    let periphery_mean = periphery_deg as f64 / periphery.len().max(1) as f64;
    let separated = if periphery_mean > 0.0 {
        core_mean >= cfg.core_degree_ratio * periphery_mean
    } else {
        core_mean > 0.0
    };
    let ok = bimodality >= cfg.bimodality_threshold
        && core.len() >= cfg.min_part_size
        && periphery.len() >= cfg.min_part_size
        && separated;
    let split = ok.then(|| CoreSplit {
        core,
        periphery,
        bimodality,
    });
    (bimodality, split)
}

/// Union-find over mutual edges.
fn mutual_components<G: NavigableGraph>(graph: &G, leaves: &[usize]) -> Vec<Vec<usize>> {
    let local: HashMap<usize, usize> = leaves.iter().enumerate().map(|(i, &l)| (l, i)).collect();
    let mut parent: Vec<usize> = (0..leaves.len()).collect();
    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }
    for (i, &u) in leaves.iter().enumerate() {
        for &v in graph.neighbors(u) {
            let Some(&j) = local.get(&v) else { continue };
            if graph.has_edge(v, u) {
                let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                if a != b {
                    parent[a.max(b)] = a.min(b);
                }
            }
        }
    }
    let mut groups: std::collections::BTreeMap<usize, Vec<usize>> = Default::default();
    for i in 0..leaves.len() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(leaves[i]);
    }
    let mut comps: Vec<Vec<usize>> = groups
        .into_values()
        .map(|mut c| {
            c.sort_unstable();
            c
        })
        .collect();
    comps.sort_by_key(|c| c[0]);
    comps
}

/// Most balanced bridge whose smaller side is large enough.
fn best_bridge(induced: &Induced, leaves: &[usize], cfg: &ExpansionConfig) -> Option<BridgeCut> {
    let n = leaves.len();
    if n < 2 {
        return None;
    }
    const UNSEEN: usize = usize::MAX;
    let mut tin = vec![UNSEEN; n];
    let mut low = vec![0usize; n];
    let mut sub = vec![1usize; n];
    let mut parent = vec![UNSEEN; n];
    let mut order: Vec<usize> = Vec::with_capacity(n);
    let mut pos = vec![0usize; n];
    // (min side, edge in leaf ids, child whose subtree is the side)
    let mut best: Option<(usize, (usize, usize), usize)> = None;
    let min_side = ((cfg.bridge_min_fraction * n as f64).ceil() as usize).max(cfg.min_part_size);

    for root in 0..n {
        if tin[root] != UNSEEN {
            continue;
        }
        tin[root] = order.len();
        low[root] = tin[root];
        pos[root] = order.len();
        order.push(root);
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        while let Some(&(u, next)) = stack.last() {
            if next < induced.adj[u].len() {
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                let v = induced.adj[u][next];
                if v == parent[u] {
                    continue;
                }
                if tin[v] == UNSEEN {
                    parent[v] = u;
                    tin[v] = order.len();
                    low[v] = tin[v];
                    pos[v] = order.len();
                    order.push(v);
                    stack.push((v, 0));
                } else {
                    low[u] = low[u].min(tin[v]);
                }
                continue;
            }
            stack.pop();
            let p = parent[u];
            if p == UNSEEN {
                continue;
            }
            low[p] = low[p].min(low[u]);
            sub[p] += sub[u];
            if low[u] > tin[p] {
                let side = sub[u].min(n - sub[u]);
                let (a, b) = (leaves[p].min(leaves[u]), leaves[p].max(leaves[u]));
                let better = match best {
                    None => true,
                    Some((s, e, _)) => side > s || (side == s && (a, b) < e),
                };
                if side >= min_side && better {
                    best = Some((side, (a, b), u));
                }
            }
        }
    }
    let (_, edge, child) = best?;
    let mut side: Vec<usize> = order[pos[child]..pos[child] + sub[child]]
        .iter()
        .map(|&i| leaves[i])
        .collect();
    side.sort_unstable();
    Some(BridgeCut { edge, side })
}
