//! # cluster-nav
//!
//! cluster-nav serves budget-constrained views over a precomputed
//! hierarchical clustering of a large directed social graph. A spectral
//! artifact (embedding, Ward linkage, optional micro-clusters) is loaded once
//! and shared; every request rebuilds a small visible set from its own
//! navigation state and materialises clusters, inter-cluster edges and a
//! stable 2-D layout for it.
//!
//! ## Features
//! - Maxclust base cuts of the dendrogram with undersized-cluster absorption
//! - Budgeted expand / collapse / reveal edits that always keep the visible
//!   entries a partition of the accounts
//! - Structure-aware expansion strategies (tags, core/periphery, mutual
//!   components, bridges, sampled individuals)
//! - Louvain-fused inter-cluster edges, PCA layout and Procrustes alignment
//!   between successive views
//! - Persistent cluster labels and per-ego account tags
//! - A TTL + LRU cache of materialised views
//!
//! ## Determinism
//!
//! Layout fallbacks and power iteration start from `SmallRng` seeds taken
//! from [`config::LayoutConfig`], so the same request always produces the
//! same view.
//!
//! ## Invariant checking
//!
//! Edits re-validate the whole frontier in debug builds, or with the
//! `check-invariants` feature; see [`debug_invariants`].

pub mod artifact;
pub mod cache;
pub mod config;
pub mod debug_invariants;
pub mod dendrogram;
pub mod engine;
pub mod expansion;
pub mod graph;
pub mod labels;
pub mod layout;
pub mod nav_error;
pub mod view;
pub mod visible;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::artifact::{
        LouvainPartition, NodeMetadata, SpectralArtifact, SpectralArtifactFile,
    };
    pub use crate::cache::{CacheStats, InvalidateCache, ViewCache};
    pub use crate::config::{CacheConfig, ExpansionConfig, LayoutConfig, NavigatorConfig};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::dendrogram::{Dendrogram, DendrogramIndex, MergeRecord};
    pub use crate::engine::{NavigationEngine, RevealResponse, ViewEdit, ViewState};
    pub use crate::expansion::{ExpansionSelector, ExpansionStrategy, LocalStructureMetrics, Part};
    pub use crate::graph::{CsrAdjacency, NavigableGraph};
    pub use crate::labels::{ClusterLabelStore, Label, LabelProvenance, Polarity, TagSummary};
    pub use crate::layout::{AlignmentStats, Positions, align, compute_positions};
    pub use crate::nav_error::NavError;
    pub use crate::view::{
        ClusterViewBuilder, HierarchicalCluster, HierarchicalEdge, HierarchicalViewData,
        LabelSource, MembershipMode, SignalWeights, ViewParams,
    };
    pub use crate::visible::{
        ClusterKey, CollapseOutcome, ExpandOutcome, RevealFailure, RevealOutcome, VisibleSet,
        VisibleSetManager, compute_base_cut,
    };
}
