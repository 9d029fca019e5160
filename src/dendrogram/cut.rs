//! Flat cuts of the dendrogram.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use super::{Dendrogram, DendrogramIndex};
use crate::nav_error::NavError;

/// Heap key: split the highest merge first, later merges win ties.
#[derive(Debug, Clone, Copy)]
struct SplitKey {
    distance: f64,
    node: usize,
}

impl PartialEq for SplitKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SplitKey {}

impl PartialOrd for SplitKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SplitKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.node.cmp(&other.node))
    }
}

/// Cut into at most `granularity` flat clusters (maxclust criterion).
///
/// Starting from the root, the frontier member with the greatest merge
/// distance is split until the frontier holds `granularity` members; equal
/// distances split the later merge first. For monotone linkages this is the
/// same cut as undoing the last `granularity - 1` merges. The returned node
/// ids are sorted ascending.
pub fn maxclust_cut(tree: &Dendrogram, granularity: usize) -> Vec<usize> {
    let target = granularity.clamp(1, tree.n_leaves());
    let mut frontier = Vec::with_capacity(target);
    let mut heap = BinaryHeap::new();
    let root = tree.root();
    if tree.is_leaf(root) {
        return vec![root];
    }
    heap.push(SplitKey {
        distance: tree.distance(root),
        node: root,
    });
    while frontier.len() + heap.len() < target {
        let Some(top) = heap.pop() else { break };
        let Some((l, r)) = tree.children(top.node) else {
            frontier.push(top.node);
            continue;
        };
        for child in [l, r] {
            if tree.is_leaf(child) {
                frontier.push(child);
            } else {
                heap.push(SplitKey {
                    distance: tree.distance(child),
                    node: child,
                });
            }
        }
    }
    frontier.extend(heap.into_iter().map(|k| k.node));
    frontier.sort_unstable();
    frontier
}

/// Absorb members with `1 < size < min_size` into their parent.
///
/// Every frontier member under the absorbing parent is replaced by it, so the
/// result is still a frontier. Single leaves are left alone; the view flags
/// them as individuals.
pub fn absorb_undersized(
    index: &DendrogramIndex<'_>,
    frontier: Vec<usize>,
    min_size: usize,
) -> Vec<usize> {
    let mut members = frontier;
    loop {
        let candidate = members
            .iter()
            .copied()
            .filter(|&m| {
                let s = index.subtree_size(m);
                s > 1 && s < min_size
            })
            .min_by_key(|&m| (index.subtree_size(m), m));
        let Some(small) = candidate else { break };
        let Some(parent) = index.parent(small) else { break };
        log::debug!(
            "absorbing undersized cluster d_{small} ({} leaves) into d_{parent}",
            index.subtree_size(small)
        );
        members.retain(|&m| !index.is_descendant(m, parent));
        members.push(parent);
    }
    members.sort_unstable();
    members
}

/// Lowest node whose leaf set equals each flat cluster's leaf set.
///
/// `labels[i]` is the flat cluster of leaf `i`. Fails when some label's
/// leaves do not form a single subtree.
pub fn cluster_leaders(
    tree: &Dendrogram,
    labels: &[usize],
) -> Result<BTreeMap<usize, usize>, NavError> {
    let n = tree.n_leaves();
    if labels.len() != n {
        return Err(NavError::validation(
            "labels",
            format!("{} labels for {} leaves", labels.len(), n),
        ));
    }
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &l in labels {
        *counts.entry(l).or_default() += 1;
    }

    let total = tree.node_count();
    let mut pure: Vec<Option<usize>> = vec![None; total];
    let mut size = vec![1usize; total];
    let mut leaders = BTreeMap::new();
    for (leaf, &label) in labels.iter().enumerate() {
        pure[leaf] = Some(label);
        if counts[&label] == 1 {
            leaders.insert(label, leaf);
        }
    }
    // merge rows are ordered bottom-up, so the first hit is the lowest node
    for (row, m) in tree.merges().iter().enumerate() {
        let node = n + row;
        size[node] = size[m.left] + size[m.right];
        pure[node] = match (pure[m.left], pure[m.right]) {
            (Some(a), Some(b)) if a == b => Some(a),
            _ => None,
        };
        if let Some(label) = pure[node] {
            if size[node] == counts[&label] {
                leaders.entry(label).or_insert(node);
            }
        }
    }
    if let Some(missing) = counts.keys().find(|l| !leaders.contains_key(l)) {
        return Err(NavError::validation(
            "labels",
            format!("flat cluster {missing} is not a dendrogram subtree"),
        ));
    }
    Ok(leaders)
}
