//! Request-scoped traversal cache over a [`Dendrogram`].

use once_cell::unsync::OnceCell;

use super::Dendrogram;

/// Lazily built parent and size tables for one request.
///
/// The dendrogram itself stays shared and read-only; this wrapper is created
/// per view build and dropped with it.
pub struct DendrogramIndex<'a> {
    tree: &'a Dendrogram,
    parents: OnceCell<Vec<Option<usize>>>,
    sizes: OnceCell<Vec<usize>>,
}

impl<'a> DendrogramIndex<'a> {
    pub fn new(tree: &'a Dendrogram) -> Self {
        Self {
            tree,
            parents: OnceCell::new(),
            sizes: OnceCell::new(),
        }
    }

    pub fn tree(&self) -> &'a Dendrogram {
        self.tree
    }

    fn parents(&self) -> &[Option<usize>] {
        self.parents.get_or_init(|| self.tree.parent_table())
    }

    fn sizes(&self) -> &[usize] {
        self.sizes.get_or_init(|| {
            let n = self.tree.n_leaves();
            let mut sizes = vec![1usize; self.tree.node_count()];
            for (row, m) in self.tree.merges().iter().enumerate() {
                sizes[n + row] = sizes[m.left] + sizes[m.right];
            }
            sizes
        })
    }

    pub fn parent(&self, node: usize) -> Option<usize> {
        self.parents().get(node).copied().flatten()
    }

    pub fn siblings(&self, node: usize) -> Option<usize> {
        let (l, r) = self.tree.children(self.parent(node)?)?;
        Some(if l == node { r } else { l })
    }

    /// Leaf count; zero for ids outside the tree.
    pub fn subtree_size(&self, node: usize) -> usize {
        self.sizes().get(node).copied().unwrap_or(0)
    }

    /// O(depth) ancestor walk.
    pub fn is_descendant(&self, node: usize, ancestor: usize) -> bool {
        if !self.tree.contains(node) || !self.tree.contains(ancestor) {
            return false;
        }
        let mut cur = node;
        loop {
            if cur == ancestor {
                return true;
            }
            if cur > ancestor {
                return false;
            }
            match self.parent(cur) {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    pub fn lowest_common_ancestor(&self, a: usize, b: usize) -> Option<usize> {
        if !self.tree.contains(a) || !self.tree.contains(b) {
            return None;
        }
        let (mut x, mut y) = (a, b);
        // the larger id can never be below the smaller one, so lift it
        while x != y {
            if x < y {
                x = self.parent(x)?;
            } else {
                y = self.parent(y)?;
            }
        }
        Some(x)
    }

    /// Maximal subtrees whose leaves all lie in `leaves`.
    ///
    /// The returned nodes partition `leaves` exactly and are sorted ascending.
    /// Ids outside the leaf range are ignored.
    pub fn cover(&self, leaves: &[usize]) -> Vec<usize> {
        let n = self.tree.n_leaves();
        let total = self.tree.node_count();
        let mut inside = vec![0usize; total];
        for &leaf in leaves {
            if leaf < n {
                inside[leaf] = 1;
            }
        }
        for (row, m) in self.tree.merges().iter().enumerate() {
            inside[n + row] = inside[m.left] + inside[m.right];
        }
        let sizes = self.sizes();
        let full = |node: usize| inside[node] > 0 && inside[node] == sizes[node];
        (0..total)
            .filter(|&node| full(node) && self.parent(node).is_none_or(|p| !full(p)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dendrogram::tests::six_leaf_tree;

    #[test]
    fn cached_parents_match_scan() {
        let t = six_leaf_tree();
        let idx = DendrogramIndex::new(&t);
        for node in 0..t.node_count() {
            assert_eq!(idx.parent(node), t.parent(node));
        }
        assert_eq!(idx.siblings(6), Some(7));
        assert_eq!(idx.subtree_size(9), 4);
        assert_eq!(idx.subtree_size(99), 0);
    }

    #[test]
    fn ancestor_walk_is_transitive() {
        let t = six_leaf_tree();
        let idx = DendrogramIndex::new(&t);
        assert!(idx.is_descendant(1, 6));
        assert!(idx.is_descendant(6, 9));
        assert!(idx.is_descendant(1, 9));
        assert!(!idx.is_descendant(4, 9));
        assert!(idx.is_descendant(10, 10));
    }

    #[test]
    fn lca_and_cover() {
        let t = six_leaf_tree();
        let idx = DendrogramIndex::new(&t);
        assert_eq!(idx.lowest_common_ancestor(0, 3), Some(9));
        assert_eq!(idx.lowest_common_ancestor(6, 1), Some(6));
        assert_eq!(idx.lowest_common_ancestor(2, 5), Some(10));
        assert_eq!(idx.cover(&[0, 1, 2, 4]), vec![2, 4, 6]);
        assert_eq!(idx.cover(&[0, 1, 2, 3, 4, 5]), vec![10]);
        assert!(idx.cover(&[]).is_empty());
    }
}
