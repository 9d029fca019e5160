//! Budgeted expand / collapse / reveal edits over a [`VisibleSet`].

use serde::{Deserialize, Serialize};

use super::{ClusterKey, VisibleSet};
use crate::debug_invariants::DebugInvariants;
use crate::dendrogram::DendrogramIndex;
use crate::expansion::{ExpansionSelector, ExpansionStrategy, Part, is_partition};
use crate::graph::NavigableGraph;
use crate::nav_error::NavError;

/// A committed expansion.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpandOutcome {
    pub strategy: ExpansionStrategy,
    pub removed: ClusterKey,
    pub added: Vec<ClusterKey>,
}

/// A committed collapse.
#[derive(Clone, Debug, PartialEq)]
pub struct CollapseOutcome {
    /// Entry now standing in for the collapsed region.
    pub target: ClusterKey,
    /// Entries it replaced; empty when the collapse was a no-op.
    pub removed: Vec<ClusterKey>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealFailure {
    BudgetExhausted,
    LeafNotInVisibleSubtrees,
}

/// Result of [`VisibleSetManager::reveal_leaf`].
///
/// On `BudgetExhausted` the splits taken before the budget ran out stay
/// applied; `steps` counts them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevealOutcome {
    pub ok: bool,
    pub steps: usize,
    pub reason: Option<RevealFailure>,
    pub container_before: Option<ClusterKey>,
    pub container_after: Option<ClusterKey>,
}

impl RevealOutcome {
    fn failed(reason: RevealFailure, steps: usize, before: Option<ClusterKey>, after: Option<ClusterKey>) -> Self {
        Self {
            ok: false,
            steps,
            reason: Some(reason),
            container_before: before,
            container_after: after,
        }
    }
}

/// Applies edits to request-local visible sets.
pub struct VisibleSetManager<'a, G: NavigableGraph> {
    index: DendrogramIndex<'a>,
    selector: ExpansionSelector<'a, G>,
}

impl<'a, G: NavigableGraph> VisibleSetManager<'a, G> {
    pub fn new(index: DendrogramIndex<'a>, selector: ExpansionSelector<'a, G>) -> Self {
        Self { index, selector }
    }

    pub fn index(&self) -> &DendrogramIndex<'a> {
        &self.index
    }

    /// Replace `key` with the parts of the first applicable strategy whose
    /// growth fits the remaining budget. The set is unchanged on error.
    pub fn expand(&self, set: &mut VisibleSet, key: &ClusterKey) -> Result<ExpandOutcome, NavError> {
        if !set.contains(key) {
            return Err(NavError::ClusterNotFound(key.to_string()));
        }
        let leaves = set.leaves_of(key, self.index.tree());
        if leaves.len() < 2 {
            return Err(NavError::validation(
                "cluster_id",
                format!("{key} holds a single account and cannot be expanded"),
            ));
        }
        let room = set.remaining();
        if room == 0 {
            return Err(NavError::BudgetExhausted {
                budget: set.budget(),
                required: set.len() + 1,
            });
        }
        let metrics = self.selector.measure(&leaves);
        for strategy in self.selector.applicable(&metrics) {
            let parts = self.selector.decompose(strategy, &leaves, &metrics, room + 1);
            if parts.len() < 2 {
                continue;
            }
            if parts.len() - 1 > room {
                log::debug!(
                    "expand {key}: {} needs {} slots, {room} left",
                    strategy.as_str(),
                    parts.len() - 1
                );
                continue;
            }
            is_partition(&leaves, &parts).map_err(|reason| NavError::PartitionViolation {
                cluster: key.to_string(),
                reason,
            })?;
            let added = self.commit(set, key, strategy, parts);
            log::debug!("expand {key}: {} -> {} entries", strategy.as_str(), added.len());
            self.check(set)?;
            return Ok(ExpandOutcome {
                strategy,
                removed: key.clone(),
                added,
            });
        }
        Err(NavError::BudgetExhausted {
            budget: set.budget(),
            required: set.len() + 1,
        })
    }

    fn commit(
        &self,
        set: &mut VisibleSet,
        key: &ClusterKey,
        strategy: ExpansionStrategy,
        parts: Vec<Part>,
    ) -> Vec<ClusterKey> {
        set.remove_entry(key);
        let mut added = Vec::with_capacity(parts.len());
        for (ordinal, part) in parts.into_iter().enumerate() {
            let name = format!("{key}~{}{ordinal}", part.tag);
            let (child, leaves) = self.canonical(name, part.leaves);
            set.insert_entry(child.clone(), leaves, key, Some(strategy));
            added.push(child);
        }
        added
    }

    /// Node key when `leaves` is one leaf or one full subtree, else a group.
    fn canonical(&self, name: String, leaves: Vec<usize>) -> (ClusterKey, Option<Vec<usize>>) {
        if let [leaf] = leaves.as_slice() {
            return (ClusterKey::Node(*leaf), None);
        }
        if let [node] = self.index.cover(&leaves).as_slice() {
            return (ClusterKey::Node(*node), None);
        }
        (ClusterKey::Group(name), Some(leaves))
    }

    /// Merge `key` back into the entry it came from, widening to the lowest
    /// common ancestor while another visible entry straddles the target.
    pub fn collapse(&self, set: &mut VisibleSet, key: &ClusterKey) -> Result<CollapseOutcome, NavError> {
        if !set.contains(key) {
            return Err(NavError::ClusterNotFound(key.to_string()));
        }
        let tree = self.index.tree();
        let mut target = match (set.origin(key), key) {
            (Some(origin), _) => origin.clone(),
            (None, ClusterKey::Node(n)) => match self.index.parent(*n) {
                Some(p) => ClusterKey::Node(p),
                None => {
                    return Ok(CollapseOutcome {
                        target: key.clone(),
                        removed: Vec::new(),
                    });
                }
            },
            (None, ClusterKey::Group(_)) => {
                return Err(NavError::PartitionViolation {
                    cluster: key.to_string(),
                    reason: "group has no recorded origin".into(),
                });
            }
        };
        let mut target_leaves = set.leaves_of(&target, tree);
        let removed = loop {
            let mut inside = Vec::new();
            let mut straddler = None;
            for entry in set.entries() {
                let leaves = set.leaves_of(entry, tree);
                let hits = leaves
                    .iter()
                    .filter(|l| target_leaves.binary_search(l).is_ok())
                    .count();
                if hits == leaves.len() {
                    inside.push(entry.clone());
                } else if hits > 0 {
                    straddler = Some(leaves);
                    break;
                }
            }
            let Some(outside) = straddler else {
                break inside;
            };
            let lca = target_leaves
                .iter()
                .chain(outside.iter())
                .copied()
                .try_fold(None, |acc: Option<usize>, leaf| match acc {
                    None => Some(Some(leaf)),
                    Some(a) => self.index.lowest_common_ancestor(a, leaf).map(Some),
                })
                .flatten()
                .ok_or_else(|| NavError::ClusterNotFound(target.to_string()))?;
            log::debug!("collapse {key}: widening {target} to d_{lca}");
            target = ClusterKey::Node(lca);
            target_leaves = set.leaves_of(&target, tree);
        };
        for entry in &removed {
            set.remove_entry(entry);
        }
        set.entries.insert(target.clone());
        self.check(set)?;
        Ok(CollapseOutcome { target, removed })
    }

    /// Split the visible entry holding `leaf` until the leaf is visible on
    /// its own, one split per budget slot.
    pub fn reveal_leaf(&self, set: &mut VisibleSet, leaf: usize) -> Result<RevealOutcome, NavError> {
        let Some(before) = set.entry_containing(leaf, &self.index) else {
            return Ok(RevealOutcome::failed(
                RevealFailure::LeafNotInVisibleSubtrees,
                0,
                None,
                None,
            ));
        };
        let target = ClusterKey::Node(leaf);
        let mut container = before.clone();
        let mut steps = 0;
        while container != target {
            if let ClusterKey::Group(name) = &container {
                let leaves = set.leaves_of(&container, self.index.tree());
                if let [node] = self.index.cover(&leaves).as_slice() {
                    // already a full subtree, rename without growth
                    let node = ClusterKey::Node(*node);
                    let origin = set.origin(&container).cloned().unwrap_or_else(|| container.clone());
                    log::debug!("reveal {leaf}: {name} is subtree {node}");
                    set.remove_entry(&container);
                    set.insert_entry(node.clone(), None, &origin, None);
                    container = node;
                    continue;
                }
            }
            if set.remaining() == 0 {
                log::debug!("reveal {leaf}: budget exhausted after {steps} splits at {container}");
                self.check(set)?;
                return Ok(RevealOutcome::failed(
                    RevealFailure::BudgetExhausted,
                    steps,
                    Some(before),
                    Some(container),
                ));
            }
            container = self.split_toward(set, &container, leaf)?;
            steps += 1;
        }
        self.check(set)?;
        Ok(RevealOutcome {
            ok: true,
            steps,
            reason: None,
            container_before: Some(before),
            container_after: Some(container),
        })
    }

    /// One split of `container`; returns the new entry holding `leaf`.
    fn split_toward(&self, set: &mut VisibleSet, container: &ClusterKey, leaf: usize) -> Result<ClusterKey, NavError> {
        match container {
            ClusterKey::Node(n) => {
                let (l, r) = self
                    .index
                    .tree()
                    .try_children(*n)?
                    .ok_or(NavError::MissingMergeRow(*n))?;
                set.remove_entry(container);
                set.insert_entry(ClusterKey::Node(l), None, container, None);
                set.insert_entry(ClusterKey::Node(r), None, container, None);
                let next = if self.index.is_descendant(leaf, l) { l } else { r };
                Ok(ClusterKey::Node(next))
            }
            ClusterKey::Group(name) => {
                let leaves = set.leaves_of(container, self.index.tree());
                let cover = self.index.cover(&leaves);
                let holder = cover
                    .iter()
                    .copied()
                    .find(|&c| self.index.is_descendant(leaf, c))
                    .ok_or(NavError::LeafNotVisible(leaf))?;
                let mut taken = self.index.tree().subtree_leaves(holder);
                taken.sort_unstable();
                let rest: Vec<usize> = leaves
                    .into_iter()
                    .filter(|l| taken.binary_search(l).is_err())
                    .collect();
                let origin = set.origin(container).cloned().unwrap_or_else(|| container.clone());
                let strategy = set.strategy(container);
                let (residual, residual_leaves) = self.canonical(format!("{name}~rest0"), rest);
                set.remove_entry(container);
                set.insert_entry(ClusterKey::Node(holder), None, &origin, strategy);
                set.insert_entry(residual, residual_leaves, &origin, strategy);
                Ok(ClusterKey::Node(holder))
            }
        }
    }

    fn check(&self, set: &VisibleSet) -> Result<(), NavError> {
        if set.len() > set.budget() {
            return Err(NavError::BudgetExhausted {
                budget: set.budget(),
                required: set.len(),
            });
        }
        set.frontier(self.index.tree()).debug_assert_invariants();
        Ok(())
    }
}
