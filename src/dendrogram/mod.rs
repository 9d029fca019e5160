//! Arena representation of an immutable binary merge tree.
//!
//! Leaves are `0..n`. Merge row `i` creates internal node `n + i` from two
//! earlier nodes, so every child id is strictly smaller than its parent id and
//! the root is `2n - 2`. Nodes hold no links; children come from the merge
//! row, parents from a scan (or from the cached table in [`DendrogramIndex`]).

mod cut;
mod index;

pub use cut::{absorb_undersized, cluster_leaders, maxclust_cut};
pub use index::DendrogramIndex;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::nav_error::NavError;

/// One row of the linkage matrix.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    /// Number of leaves under the merged node.
    pub size: usize,
}

/// Immutable dendrogram over `n` leaves.
#[derive(Clone, Debug)]
pub struct Dendrogram {
    n_leaves: usize,
    merges: Vec<MergeRecord>,
}

impl Dendrogram {
    /// Build from a scipy-style linkage matrix `[child_a, child_b, distance, size]`.
    pub fn from_linkage(rows: &[[f64; 4]]) -> Result<Self, NavError> {
        let n_leaves = rows.len() + 1;
        let mut merges = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let left = linkage_id(row[0], i)?;
            let right = linkage_id(row[1], i)?;
            let size = linkage_id(row[3], i)?;
            merges.push(MergeRecord {
                left,
                right,
                distance: row[2],
                size,
            });
        }
        Self::from_merges(n_leaves, merges)
    }

    /// Build from merge records, validating the tree shape.
    pub fn from_merges(n_leaves: usize, merges: Vec<MergeRecord>) -> Result<Self, NavError> {
        if n_leaves == 0 {
            return Err(NavError::InconsistentLinkage("dendrogram has no leaves".into()));
        }
        if merges.len() + 1 != n_leaves {
            return Err(NavError::InconsistentLinkage(format!(
                "{} merge rows for {} leaves (expected {})",
                merges.len(),
                n_leaves,
                n_leaves - 1
            )));
        }
        let total = 2 * n_leaves - 1;
        let mut used = vec![false; total];
        let mut sizes = vec![1usize; total];
        for (i, m) in merges.iter().enumerate() {
            let node = n_leaves + i;
            if !m.distance.is_finite() {
                return Err(NavError::InconsistentLinkage(format!(
                    "row {i} has non-finite distance"
                )));
            }
            for child in [m.left, m.right] {
                if child >= node {
                    return Err(NavError::InconsistentLinkage(format!(
                        "row {i} references node {child} before it exists"
                    )));
                }
                if std::mem::replace(&mut used[child], true) {
                    return Err(NavError::InconsistentLinkage(format!(
                        "node {child} is merged twice"
                    )));
                }
            }
            if m.left == m.right {
                return Err(NavError::InconsistentLinkage(format!(
                    "row {i} merges node {} with itself",
                    m.left
                )));
            }
            sizes[node] = sizes[m.left] + sizes[m.right];
            if sizes[node] != m.size {
                return Err(NavError::InconsistentLinkage(format!(
                    "row {i} records size {} but its children hold {}",
                    m.size, sizes[node]
                )));
            }
        }
        Ok(Self { n_leaves, merges })
    }

    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Number of node ids (leaves plus internal nodes).
    pub fn node_count(&self) -> usize {
        2 * self.n_leaves - 1
    }

    pub fn root(&self) -> usize {
        self.node_count() - 1
    }

    pub fn merges(&self) -> &[MergeRecord] {
        &self.merges
    }

    #[inline]
    pub fn is_leaf(&self, node: usize) -> bool {
        node < self.n_leaves
    }

    #[inline]
    pub fn contains(&self, node: usize) -> bool {
        node < self.node_count()
    }

    /// Merge row behind an internal node.
    pub fn merge(&self, node: usize) -> Option<&MergeRecord> {
        node.checked_sub(self.n_leaves)
            .and_then(|row| self.merges.get(row))
    }

    /// Children of `node`; `None` for leaves and out-of-range ids.
    pub fn children(&self, node: usize) -> Option<(usize, usize)> {
        self.merge(node).map(|m| (m.left, m.right))
    }

    /// Like [`children`](Self::children) but reports a missing row for ids
    /// past the root.
    pub fn try_children(&self, node: usize) -> Result<Option<(usize, usize)>, NavError> {
        if self.is_leaf(node) {
            return Ok(None);
        }
        self.children(node)
            .map(Some)
            .ok_or(NavError::MissingMergeRow(node))
    }

    /// Merge distance of `node` (zero for leaves).
    pub fn distance(&self, node: usize) -> f64 {
        self.merge(node).map_or(0.0, |m| m.distance)
    }

    /// Parent by linear scan of the merge rows.
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.merges
            .iter()
            .position(|m| m.left == node || m.right == node)
            .map(|row| self.n_leaves + row)
    }

    /// Parent of every node id, computed in one pass.
    pub fn parent_table(&self) -> Vec<Option<usize>> {
        let mut parents = vec![None; self.node_count()];
        for (row, m) in self.merges.iter().enumerate() {
            parents[m.left] = Some(self.n_leaves + row);
            parents[m.right] = Some(self.n_leaves + row);
        }
        parents
    }

    /// The other child of `node`'s parent.
    pub fn siblings(&self, node: usize) -> Option<usize> {
        let (l, r) = self.children(self.parent(node)?)?;
        Some(if l == node { r } else { l })
    }

    /// Leaves under `node`, left to right. A leaf returns itself.
    pub fn subtree_leaves(&self, node: usize) -> Vec<usize> {
        let mut out = Vec::new();
        if !self.contains(node) {
            return out;
        }
        let mut stack = vec![node];
        while let Some(cur) = stack.pop() {
            match self.children(cur) {
                Some((l, r)) => {
                    stack.push(r);
                    stack.push(l);
                }
                None => out.push(cur),
            }
        }
        out
    }

    /// Memoized leaf count of `node`. Out-of-range ids count zero.
    pub fn subtree_size(&self, node: usize, memo: &mut HashMap<usize, usize>) -> usize {
        if let Some(&s) = memo.get(&node) {
            return s;
        }
        if !self.contains(node) {
            return 0;
        }
        // post-order without recursion so chain-shaped trees stay cheap
        let mut stack = vec![(node, false)];
        while let Some((cur, expanded)) = stack.pop() {
            if memo.contains_key(&cur) {
                continue;
            }
            match self.children(cur) {
                None => {
                    memo.insert(cur, 1);
                }
                Some((l, r)) if expanded => {
                    let s = memo[&l] + memo[&r];
                    memo.insert(cur, s);
                }
                Some((l, r)) => {
                    stack.push((cur, true));
                    stack.push((l, false));
                    stack.push((r, false));
                }
            }
        }
        memo[&node]
    }

    /// True if `node` lies in the subtree of `ancestor` (including equality).
    pub fn is_descendant(&self, node: usize, ancestor: usize) -> bool {
        if node == ancestor {
            return self.contains(node);
        }
        if self.is_leaf(ancestor) || node > ancestor || !self.contains(ancestor) {
            return false;
        }
        let mut stack = vec![ancestor];
        while let Some(cur) = stack.pop() {
            if cur == node {
                return true;
            }
            // children ids are always below their parent's id
            if cur < node {
                continue;
            }
            if let Some((l, r)) = self.children(cur) {
                stack.push(l);
                stack.push(r);
            }
        }
        false
    }
}

fn linkage_id(value: f64, row: usize) -> Result<usize, NavError> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return Err(NavError::InconsistentLinkage(format!(
            "row {row} has non-integral id {value}"
        )));
    }
    Ok(value as usize)
}
