//! The request-scoped visible set and its budget.
//!
//! A visible set is a frontier: the leaf sets of its entries partition all
//! leaves of the dendrogram. Entries are either dendrogram nodes or synthetic
//! groups produced by an expansion strategy; groups keep their leaf sets in a
//! registry owned by the set, so the set is self-contained request state.

mod manager;

pub use manager::{CollapseOutcome, ExpandOutcome, RevealFailure, RevealOutcome, VisibleSetManager};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::{HEADROOM_RATIO, MAX_BUDGET, MIN_BUDGET, TINY_BUDGET};
use crate::debug_invariants::DebugInvariants;
use crate::dendrogram::{Dendrogram, DendrogramIndex};
use crate::expansion::ExpansionStrategy;
use crate::nav_error::NavError;

/// Size of the base cut for `budget`, always strictly below the budget.
pub fn compute_base_cut(budget: usize) -> usize {
    let budget = budget.clamp(MIN_BUDGET, MAX_BUDGET);
    let headroom = (HEADROOM_RATIO * budget as f64).round_ties_even() as usize;
    if budget - 1 < TINY_BUDGET {
        budget - 1
    } else {
        headroom.min(budget - 1)
    }
}

/// Identity of a visible entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClusterKey {
    /// A dendrogram node, shown as `d_<node>`.
    Node(usize),
    /// A synthetic group, named `<origin>~<tag><ordinal>`.
    Group(String),
}

impl ClusterKey {
    pub fn node(&self) -> Option<usize> {
        match self {
            ClusterKey::Node(n) => Some(*n),
            ClusterKey::Group(_) => None,
        }
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterKey::Node(n) => write!(f, "d_{n}"),
            ClusterKey::Group(name) => f.write_str(name),
        }
    }
}

impl FromStr for ClusterKey {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(rest) = s.strip_prefix("d_") else {
            return Err(NavError::ClusterNotFound(s.to_string()));
        };
        if let Ok(n) = rest.parse::<usize>() {
            return Ok(ClusterKey::Node(n));
        }
        if rest.contains('~') {
            return Ok(ClusterKey::Group(s.to_string()));
        }
        Err(NavError::ClusterNotFound(s.to_string()))
    }
}

impl Serialize for ClusterKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClusterKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Visible entries plus the bookkeeping needed to undo edits.
#[derive(Clone, Debug)]
pub struct VisibleSet {
    entries: BTreeSet<ClusterKey>,
    /// Sorted leaves of every group created in this request.
    groups: BTreeMap<String, Vec<usize>>,
    /// Visible parent recorded when an edit created the entry.
    origins: BTreeMap<ClusterKey, ClusterKey>,
    strategies: BTreeMap<ClusterKey, ExpansionStrategy>,
    budget: usize,
}

impl VisibleSet {
    /// Start from a frontier of dendrogram nodes.
    pub fn from_frontier(
        nodes: impl IntoIterator<Item = usize>,
        budget: usize,
    ) -> Result<Self, NavError> {
        let entries: BTreeSet<ClusterKey> = nodes.into_iter().map(ClusterKey::Node).collect();
        if entries.len() > budget {
            return Err(NavError::validation(
                "budget",
                format!("base cut has {} entries, budget is {budget}", entries.len()),
            ));
        }
        Ok(Self {
            entries,
            groups: BTreeMap::new(),
            origins: BTreeMap::new(),
            strategies: BTreeMap::new(),
            budget,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Slots left before the budget is hit.
    pub fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.entries.len())
    }

    pub fn contains(&self, key: &ClusterKey) -> bool {
        self.entries.contains(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ClusterKey> {
        self.entries.iter()
    }

    pub fn origin(&self, key: &ClusterKey) -> Option<&ClusterKey> {
        self.origins.get(key)
    }

    pub fn strategy(&self, key: &ClusterKey) -> Option<ExpansionStrategy> {
        self.strategies.get(key).copied()
    }

    /// Sorted leaves of `key`; empty for unknown groups.
    pub fn leaves_of(&self, key: &ClusterKey, tree: &Dendrogram) -> Vec<usize> {
        match key {
            ClusterKey::Node(n) => {
                let mut leaves = tree.subtree_leaves(*n);
                leaves.sort_unstable();
                leaves
            }
            ClusterKey::Group(name) => self.groups.get(name).cloned().unwrap_or_default(),
        }
    }

    /// Leaf count without materialising the leaves.
    pub fn size_of(&self, key: &ClusterKey, index: &DendrogramIndex<'_>) -> usize {
        match key {
            ClusterKey::Node(n) => index.subtree_size(*n),
            ClusterKey::Group(name) => self.groups.get(name).map_or(0, Vec::len),
        }
    }

    /// The unique visible entry whose leaves include `leaf`.
    pub fn entry_containing(&self, leaf: usize, index: &DendrogramIndex<'_>) -> Option<ClusterKey> {
        if !index.tree().is_leaf(leaf) {
            return None;
        }
        self.entries
            .iter()
            .find(|key| match key {
                ClusterKey::Node(n) => index.is_descendant(leaf, *n),
                ClusterKey::Group(name) => self
                    .groups
                    .get(name)
                    .is_some_and(|ls| ls.binary_search(&leaf).is_ok()),
            })
            .cloned()
    }

    /// Frontier and budget check.
    pub fn validate_frontier(&self, tree: &Dendrogram) -> Result<(), NavError> {
        if self.entries.len() > self.budget {
            return Err(NavError::BudgetExhausted {
                budget: self.budget,
                required: self.entries.len(),
            });
        }
        let mut owner: Vec<Option<&ClusterKey>> = vec![None; tree.n_leaves()];
        for key in &self.entries {
            if let ClusterKey::Node(n) = key {
                if !tree.contains(*n) {
                    return Err(NavError::ClusterNotFound(key.to_string()));
                }
            }
            for leaf in self.leaves_of(key, tree) {
                let slot = owner.get_mut(leaf).ok_or_else(|| NavError::PartitionViolation {
                    cluster: key.to_string(),
                    reason: format!("leaf {leaf} is outside the tree"),
                })?;
                if let Some(prev) = slot.replace(key) {
                    return Err(NavError::PartitionViolation {
                        cluster: key.to_string(),
                        reason: format!("leaf {leaf} is also under {prev}"),
                    });
                }
            }
        }
        if let Some(leaf) = owner.iter().position(Option::is_none) {
            return Err(NavError::PartitionViolation {
                cluster: "<visible set>".into(),
                reason: format!("leaf {leaf} is not covered"),
            });
        }
        Ok(())
    }

    /// Borrow the set together with its tree for invariant checks.
    pub fn frontier<'a>(&'a self, tree: &'a Dendrogram) -> Frontier<'a> {
        Frontier { set: self, tree }
    }

    fn insert_entry(
        &mut self,
        key: ClusterKey,
        leaves: Option<Vec<usize>>,
        origin: &ClusterKey,
        strategy: Option<ExpansionStrategy>,
    ) {
        if let (ClusterKey::Group(name), Some(leaves)) = (&key, leaves) {
            self.groups.insert(name.clone(), leaves);
        }
        self.origins.insert(key.clone(), origin.clone());
        match strategy {
            Some(s) => self.strategies.insert(key.clone(), s),
            None => self.strategies.remove(&key),
        };
        self.entries.insert(key);
    }

    fn remove_entry(&mut self, key: &ClusterKey) -> bool {
        self.entries.remove(key)
    }
}

/// A visible set paired with its dendrogram.
pub struct Frontier<'a> {
    set: &'a VisibleSet,
    tree: &'a Dendrogram,
}

impl DebugInvariants for Frontier<'_> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "visible set frontier");
    }

    fn validate_invariants(&self) -> Result<(), NavError> {
        self.set.validate_frontier(self.tree)
    }
}
