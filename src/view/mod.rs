//! Materialised views handed to the serving layer.
//!
//! A [`HierarchicalViewData`] is built fresh from a visible set and the
//! shared artifact, then frozen behind an `Arc`; nothing mutates it after
//! it is returned.

mod builder;
mod edges;
mod membership;

pub use builder::ClusterViewBuilder;
pub use edges::{EdgeTally, inter_cluster_edges};
pub use membership::{cluster_centroid, soft_membership};

#[cfg(test)]
pub(crate) use builder::tests as fixtures;

use serde::{Deserialize, Serialize};

use crate::expansion::ExpansionStrategy;
use crate::layout::{AlignmentStats, Positions};

/// Where a cluster's display label came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    User,
    Tag,
    Auto,
}

/// Whether views carry per-account soft membership rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipMode {
    #[default]
    Hard,
    Soft,
}

/// Blend of the per-account ranking signals.
///
/// `signal = metadata * (metadata signal, or total degree) + degree * total degree`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub metadata: f64,
    pub degree: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            metadata: 1.0,
            degree: 0.0,
        }
    }
}

impl SignalWeights {
    /// Bit patterns, for hashing in cache keys.
    pub fn bits(&self) -> (u64, u64) {
        (self.metadata.to_bits(), self.degree.to_bits())
    }
}

/// Per-request knobs that affect materialisation but not the visible set.
#[derive(Clone, Debug, Default)]
pub struct ViewParams {
    pub ego: Option<String>,
    pub louvain_weight: f64,
    pub signal_weights: SignalWeights,
    pub membership: MembershipMode,
}

/// One visible cluster or promoted individual.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchicalCluster {
    pub id: String,
    /// Dendrogram node, when the cluster is one subtree.
    pub node: Option<usize>,
    pub parent_id: Option<String>,
    pub child_ids: Vec<String>,
    pub member_leaves: Vec<usize>,
    pub member_node_ids: Vec<String>,
    pub centroid: Vec<f64>,
    pub size: usize,
    /// Stable key into the label store.
    pub signature: String,
    pub label: String,
    pub label_source: LabelSource,
    pub representative_handles: Vec<String>,
    pub is_leaf: bool,
    pub is_individual: bool,
    pub contains_ego: bool,
    pub strategy: Option<ExpansionStrategy>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchicalEdge {
    pub source: String,
    pub target: String,
    /// Directed adjacency entries crossing the pair.
    pub raw_count: u64,
    /// Louvain-adjusted weight.
    pub weight: f64,
    pub connectivity: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchicalViewData {
    pub clusters: Vec<HierarchicalCluster>,
    pub edges: Vec<HierarchicalEdge>,
    pub ego_cluster_id: Option<String>,
    pub total_nodes: usize,
    pub total_clusters: usize,
    pub positions: Positions,
    pub expanded: Vec<String>,
    pub collapsed: Vec<String>,
    pub budget: usize,
    pub budget_remaining: usize,
    pub alignment: Option<AlignmentStats>,
    /// Row per account, in cluster order; present in soft membership mode.
    pub soft_membership: Option<Vec<Vec<f64>>>,
}

impl HierarchicalViewData {
    pub fn cluster(&self, id: &str) -> Option<&HierarchicalCluster> {
        self.clusters.iter().find(|c| c.id == id)
    }
}
