//! Base cut and view materialisation.

use crate::artifact::{NodeMetadata, SpectralArtifact};
use crate::config::{MAX_BUDGET, NavigatorConfig};
use crate::dendrogram::{DendrogramIndex, absorb_undersized, maxclust_cut};
use crate::graph::NavigableGraph;
use crate::labels::{ClusterLabelStore, LabelProvenance, content_signature};
use crate::layout::compute_positions;
use crate::nav_error::NavError;
use crate::visible::{ClusterKey, VisibleSet};

use super::{
    HierarchicalCluster, HierarchicalEdge, HierarchicalViewData, LabelSource, MembershipMode,
    SignalWeights, ViewParams, cluster_centroid, inter_cluster_edges, soft_membership,
};

/// Builds views over one artifact and graph.
pub struct ClusterViewBuilder<'a, G: NavigableGraph> {
    artifact: &'a SpectralArtifact,
    graph: &'a G,
    metadata: &'a [NodeMetadata],
    labels: &'a ClusterLabelStore,
    config: &'a NavigatorConfig,
    louvain: Option<&'a [Option<u32>]>,
}

impl<'a, G: NavigableGraph> ClusterViewBuilder<'a, G> {
    /// `metadata` is indexed by leaf and may be empty.
    pub fn new(
        artifact: &'a SpectralArtifact,
        graph: &'a G,
        metadata: &'a [NodeMetadata],
        labels: &'a ClusterLabelStore,
        config: &'a NavigatorConfig,
    ) -> Result<Self, NavError> {
        let n = artifact.len();
        if graph.vertex_count() != n {
            return Err(NavError::validation(
                "adjacency",
                format!("{} vertices for {n} accounts", graph.vertex_count()),
            ));
        }
        if !metadata.is_empty() && metadata.len() != n {
            return Err(NavError::validation(
                "node_metadata",
                format!("{} rows for {n} accounts", metadata.len()),
            ));
        }
        Ok(Self {
            artifact,
            graph,
            metadata,
            labels,
            config,
            louvain: None,
        })
    }

    /// Louvain community per leaf, for edge fusion.
    pub fn with_louvain(mut self, louvain: Option<&'a [Option<u32>]>) -> Self {
        self.louvain = louvain;
        self
    }

    /// Ranking signal per leaf.
    pub fn leaf_signal(&self, weights: &SignalWeights) -> Vec<f64> {
        let degree = self.graph.total_degrees();
        degree
            .iter()
            .enumerate()
            .map(|(leaf, &d)| {
                let meta = self
                    .metadata
                    .get(leaf)
                    .and_then(|m| m.signal)
                    .unwrap_or(d);
                weights.metadata * meta + weights.degree * d
            })
            .collect()
    }

    fn handle(&self, leaf: usize) -> String {
        self.metadata
            .get(leaf)
            .map(|m| m.handle.as_str())
            .filter(|h| !h.is_empty())
            .or_else(|| self.artifact.node_id(leaf))
            .unwrap_or_default()
            .to_string()
    }

    /// Maxclust cut at `granularity` with undersized clusters absorbed.
    pub fn base_frontier(
        &self,
        index: &DendrogramIndex<'_>,
        granularity: usize,
    ) -> Result<Vec<usize>, NavError> {
        let n = self.artifact.len();
        if granularity == 0 || granularity > n {
            return Err(NavError::validation(
                "granularity",
                format!("{granularity} is outside [1, {n}]"),
            ));
        }
        let cut = maxclust_cut(index.tree(), granularity);
        let frontier = absorb_undersized(index, cut, self.config.min_cluster_size);
        log::debug!(
            "base cut at granularity {granularity}: {} clusters",
            frontier.len()
        );
        Ok(frontier)
    }

    /// Base view at `granularity`, with no edits applied.
    pub fn build_cluster_view(
        &self,
        granularity: usize,
        params: &ViewParams,
    ) -> Result<HierarchicalViewData, NavError> {
        let index = DendrogramIndex::new(self.artifact.dendrogram());
        let frontier = self.base_frontier(&index, granularity)?;
        let budget = MAX_BUDGET.max(frontier.len());
        let set = VisibleSet::from_frontier(frontier, budget)?;
        self.materialize(&set, &index, params)
    }

    /// Turn a visible set into clusters, edges and positions.
    pub fn materialize(
        &self,
        set: &VisibleSet,
        index: &DendrogramIndex<'_>,
        params: &ViewParams,
    ) -> Result<HierarchicalViewData, NavError> {
        let tree = index.tree();
        set.validate_frontier(tree)?;
        let keys: Vec<&ClusterKey> = set.entries().collect();
        let members: Vec<Vec<usize>> = keys.iter().map(|k| set.leaves_of(k, tree)).collect();

        let mut assignment = vec![0usize; self.artifact.len()];
        for (c, leaves) in members.iter().enumerate() {
            for &leaf in leaves {
                assignment[leaf] = c;
            }
        }
        let ego_leaf = params.ego.as_deref().and_then(|e| self.artifact.leaf_of(e));
        let signal = self.leaf_signal(&params.signal_weights);

        let clusters: Vec<HierarchicalCluster> = keys
            .iter()
            .zip(&members)
            .map(|(key, leaves)| self.cluster(set, index, key, leaves, &signal, params, ego_leaf))
            .collect();

        let sizes: Vec<usize> = members.iter().map(Vec::len).collect();
        let edges: Vec<HierarchicalEdge> = inter_cluster_edges(
            self.graph,
            &assignment,
            &sizes,
            self.louvain,
            params.louvain_weight,
        )
        .into_iter()
        .map(|e| HierarchicalEdge {
            source: clusters[e.a].id.clone(),
            target: clusters[e.b].id.clone(),
            raw_count: e.raw,
            weight: e.weight,
            connectivity: e.connectivity,
        })
        .collect();

        let positions = compute_positions(
            clusters.iter().map(|c| (c.id.as_str(), c.centroid.as_slice())),
            &self.config.layout,
        );
        let soft_membership = match params.membership {
            MembershipMode::Hard => None,
            MembershipMode::Soft => {
                let centroids: Vec<Vec<f64>> = clusters.iter().map(|c| c.centroid.clone()).collect();
                Some(soft_membership(self.artifact, &centroids))
            }
        };
        let ego_cluster_id = clusters.iter().find(|c| c.contains_ego).map(|c| c.id.clone());
        log::debug!(
            "materialized {} clusters, {} edges (budget {})",
            clusters.len(),
            edges.len(),
            set.budget()
        );
        Ok(HierarchicalViewData {
            total_nodes: self.artifact.len(),
            total_clusters: clusters.len(),
            clusters,
            edges,
            ego_cluster_id,
            positions,
            expanded: Vec::new(),
            collapsed: Vec::new(),
            budget: set.budget(),
            budget_remaining: set.remaining(),
            alignment: None,
            soft_membership,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn cluster(
        &self,
        set: &VisibleSet,
        index: &DendrogramIndex<'_>,
        key: &ClusterKey,
        leaves: &[usize],
        signal: &[f64],
        params: &ViewParams,
        ego_leaf: Option<usize>,
    ) -> HierarchicalCluster {
        let tree = index.tree();
        let id = key.to_string();
        let node = key.node();
        let parent_id = set
            .origin(key)
            .map(ToString::to_string)
            .or_else(|| node.and_then(|n| index.parent(n)).map(|p| format!("d_{p}")));
        let child_ids = node
            .and_then(|n| tree.children(n))
            .map(|(l, r)| vec![format!("d_{l}"), format!("d_{r}")])
            .unwrap_or_default();
        let member_node_ids: Vec<String> = leaves
            .iter()
            .filter_map(|&l| self.artifact.node_id(l))
            .map(str::to_string)
            .collect();
        let signature = match key {
            ClusterKey::Node(_) => id.clone(),
            ClusterKey::Group(_) => content_signature(&member_node_ids),
        };
        let size = leaves.len();

        let (label, label_source) = if let Some(stored) = self.labels.get_label(&signature) {
            let source = match stored.provenance {
                LabelProvenance::User => LabelSource::User,
                LabelProvenance::TagSuggestion => LabelSource::Tag,
                LabelProvenance::Auto => LabelSource::Auto,
            };
            (stored.name, source)
        } else if let [leaf] = leaves {
            (self.handle(*leaf), LabelSource::Auto)
        } else if let Some(tag) = params.ego.as_deref().and_then(|ego| {
            self.labels
                .tag_summary(&id, ego, &member_node_ids)
                .suggested_label
        }) {
            (tag, LabelSource::Tag)
        } else {
            (format!("Cluster {id}"), LabelSource::Auto)
        };

        let mut ranked = leaves.to_vec();
        ranked.sort_by(|&a, &b| {
            let (sa, sb) = (signal.get(a).copied().unwrap_or(0.0), signal.get(b).copied().unwrap_or(0.0));
            sb.total_cmp(&sa).then(a.cmp(&b))
        });
        let representative_handles = ranked
            .into_iter()
            .take(self.config.representatives_per_cluster)
            .map(|l| self.handle(l))
            .collect();

        HierarchicalCluster {
            parent_id,
            child_ids,
            member_leaves: leaves.to_vec(),
            member_node_ids,
            centroid: cluster_centroid(self.artifact, leaves),
            size,
            signature,
            label,
            label_source,
            representative_handles,
            is_leaf: node.is_some_and(|n| tree.is_leaf(n)),
            is_individual: size == 1,
            contains_ego: ego_leaf.is_some_and(|e| leaves.binary_search(&e).is_ok()),
            strategy: set.strategy(key),
            id,
            node,
        }
    }
}
