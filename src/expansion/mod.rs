//! Decomposition of an over-large cluster into interpretable sub-groups.
//!
//! [`ExpansionSelector::measure`] summarises the cluster's induced subgraph
//! and member tags into [`LocalStructureMetrics`]; [`ExpansionSelector::applicable`]
//! turns those metrics into the ordered list of strategies that apply, which
//! always ends with [`ExpansionStrategy::SampleIndividuals`]. Every
//! decomposition returns parts whose leaf sets partition the input exactly.

mod metrics;
mod strategies;

pub use metrics::{BridgeCut, CoreSplit, LocalStructureMetrics, TagSplit};

use serde::{Deserialize, Serialize};

use crate::config::ExpansionConfig;
use crate::graph::NavigableGraph;
use crate::labels::LeafTags;

/// Closed set of decomposition strategies, in dispatch order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionStrategy {
    TagSplit,
    CorePeriphery,
    MutualComponents,
    BridgeExtraction,
    SampleIndividuals,
}

impl ExpansionStrategy {
    pub const DISPATCH_ORDER: [ExpansionStrategy; 5] = [
        ExpansionStrategy::TagSplit,
        ExpansionStrategy::CorePeriphery,
        ExpansionStrategy::MutualComponents,
        ExpansionStrategy::BridgeExtraction,
        ExpansionStrategy::SampleIndividuals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpansionStrategy::TagSplit => "tag_split",
            ExpansionStrategy::CorePeriphery => "core_periphery",
            ExpansionStrategy::MutualComponents => "mutual_components",
            ExpansionStrategy::BridgeExtraction => "bridge_extraction",
            ExpansionStrategy::SampleIndividuals => "sample_individuals",
        }
    }

    fn is_applicable(&self, m: &LocalStructureMetrics) -> bool {
        match self {
            ExpansionStrategy::TagSplit => m.tag_split.is_some(),
            ExpansionStrategy::CorePeriphery => m.core_split.is_some(),
            ExpansionStrategy::MutualComponents => m.nontrivial_components >= 2,
            ExpansionStrategy::BridgeExtraction => m.bridge.is_some(),
            ExpansionStrategy::SampleIndividuals => m.size >= 2,
        }
    }
}

/// One replacement entry: a sorted leaf set and a short tag used to name it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    pub leaves: Vec<usize>,
    pub tag: &'static str,
}

impl Part {
    fn new(mut leaves: Vec<usize>, tag: &'static str) -> Self {
        leaves.sort_unstable();
        Self { leaves, tag }
    }
}

/// Measures clusters and decomposes them.
pub struct ExpansionSelector<'a, G: NavigableGraph> {
    graph: &'a G,
    tags: &'a LeafTags,
    signal: &'a [f64],
    config: &'a ExpansionConfig,
}

impl<'a, G: NavigableGraph> ExpansionSelector<'a, G> {
    /// `signal[leaf]` ranks members for sampling; missing entries rank as zero.
    pub fn new(graph: &'a G, tags: &'a LeafTags, signal: &'a [f64], config: &'a ExpansionConfig) -> Self {
        Self {
            graph,
            tags,
            signal,
            config,
        }
    }

    pub fn config(&self) -> &ExpansionConfig {
        self.config
    }

    pub fn measure(&self, leaves: &[usize]) -> LocalStructureMetrics {
        metrics::measure(self.graph, self.tags, self.config, leaves)
    }

    /// Applicable strategies in dispatch order; never empty for `size >= 2`.
    pub fn applicable(&self, m: &LocalStructureMetrics) -> Vec<ExpansionStrategy> {
        ExpansionStrategy::DISPATCH_ORDER
            .into_iter()
            .filter(|s| s.is_applicable(m))
            .collect()
    }

    /// First applicable strategy.
    pub fn select(&self, m: &LocalStructureMetrics) -> ExpansionStrategy {
        self.applicable(m)
            .into_iter()
            .next()
            .unwrap_or(ExpansionStrategy::SampleIndividuals)
    }

    /// Decompose `leaves` with `strategy`.
    ///
    /// `max_parts` bounds how many accounts `sample_individuals` promotes; the
    /// structural strategies return their natural split and leave the budget
    /// decision to the caller. Returns an empty vector when the strategy does
    /// not apply.
    pub fn decompose(
        &self,
        strategy: ExpansionStrategy,
        leaves: &[usize],
        m: &LocalStructureMetrics,
        max_parts: usize,
    ) -> Vec<Part> {
        match strategy {
            ExpansionStrategy::TagSplit => strategies::tag_split(leaves, m),
            ExpansionStrategy::CorePeriphery => strategies::core_periphery(m),
            ExpansionStrategy::MutualComponents => {
                strategies::mutual_components(leaves, m, self.config.min_part_size)
            }
            ExpansionStrategy::BridgeExtraction => strategies::bridge_extraction(leaves, m),
            ExpansionStrategy::SampleIndividuals => strategies::sample_individuals(
                leaves,
                self.signal,
                self.config.sample_size,
                max_parts,
            ),
        }
    }
}

/// Check that `parts` partition `leaves` (sorted) exactly.
pub fn is_partition(leaves: &[usize], parts: &[Part]) -> Result<(), String> {
    let mut all: Vec<usize> = parts.iter().flat_map(|p| p.leaves.iter().copied()).collect();
    if parts.iter().any(|p| p.leaves.is_empty()) {
        return Err("empty part".into());
    }
    all.sort_unstable();
    if all.windows(2).any(|w| w[0] == w[1]) {
        return Err("a leaf appears in two parts".into());
    }
    if all != leaves {
        return Err(format!(
            "parts cover {} leaves, cluster has {}",
            all.len(),
            leaves.len()
        ));
    }
    Ok(())
}
