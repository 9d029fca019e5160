//! Read-only inputs loaded once at process start.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dendrogram::Dendrogram;
use crate::nav_error::NavError;

/// Spectral artifact as produced by the offline embedding job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralArtifactFile {
    pub node_ids: Vec<String>,
    pub embedding: Vec<Vec<f64>>,
    pub linkage_matrix: Vec<[f64; 4]>,
    #[serde(default)]
    pub micro_labels: Option<Vec<usize>>,
    #[serde(default)]
    pub micro_centroids: Option<Vec<Vec<f64>>>,
}

/// Validated artifact: embedding rows, dendrogram and optional micro clusters.
#[derive(Debug, Clone)]
pub struct SpectralArtifact {
    node_ids: Vec<String>,
    leaf_of: HashMap<String, usize>,
    dim: usize,
    embedding: Vec<f64>,
    dendrogram: Dendrogram,
    micro_labels: Option<Vec<usize>>,
    micro_centroids: Option<Vec<Vec<f64>>>,
}

impl SpectralArtifact {
    pub fn from_parts(file: SpectralArtifactFile) -> Result<Self, NavError> {
        let n = file.node_ids.len();
        if n == 0 {
            return Err(NavError::InconsistentLinkage("artifact has no nodes".into()));
        }
        if file.embedding.len() != n {
            return Err(NavError::InconsistentLinkage(format!(
                "{} embedding rows for {} nodes",
                file.embedding.len(),
                n
            )));
        }
        if file.linkage_matrix.len() + 1 != n {
            return Err(NavError::InconsistentLinkage(format!(
                "{} linkage rows for {} nodes",
                file.linkage_matrix.len(),
                n
            )));
        }
        let dim = file.embedding[0].len();
        let mut embedding = Vec::with_capacity(n * dim);
        for (i, row) in file.embedding.iter().enumerate() {
            if row.len() != dim {
                return Err(NavError::InconsistentLinkage(format!(
                    "embedding row {i} has {} columns, expected {dim}",
                    row.len()
                )));
            }
            embedding.extend_from_slice(row);
        }
        if let Some(labels) = &file.micro_labels {
            if labels.len() != n {
                return Err(NavError::InconsistentLinkage(format!(
                    "{} micro labels for {} nodes",
                    labels.len(),
                    n
                )));
            }
            let k = file.micro_centroids.as_ref().map_or(0, Vec::len);
            if let Some(bad) = labels.iter().find(|&&l| l >= k) {
                return Err(NavError::InconsistentLinkage(format!(
                    "micro label {bad} has no centroid ({k} centroids)"
                )));
            }
        }
        if let Some(bad) = file
            .micro_centroids
            .iter()
            .flatten()
            .find(|c| c.len() != dim)
        {
            return Err(NavError::InconsistentLinkage(format!(
                "micro centroid has {} columns, expected {dim}",
                bad.len()
            )));
        }
        let dendrogram = Dendrogram::from_linkage(&file.linkage_matrix)?;
        let leaf_of = file
            .node_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Ok(Self {
            node_ids: file.node_ids,
            leaf_of,
            dim,
            embedding,
            dendrogram,
            micro_labels: file.micro_labels,
            micro_centroids: file.micro_centroids,
        })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, NavError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let file: SpectralArtifactFile = serde_json::from_str(&raw)?;
        let artifact = Self::from_parts(file)?;
        log::info!(
            "loaded spectral artifact: {} nodes, dim {}",
            artifact.len(),
            artifact.dim
        );
        Ok(artifact)
    }

    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn dendrogram(&self) -> &Dendrogram {
        &self.dendrogram
    }

    pub fn node_id(&self, leaf: usize) -> Option<&str> {
        self.node_ids.get(leaf).map(String::as_str)
    }

    pub fn node_ids(&self) -> &[String] {
        &self.node_ids
    }

    pub fn leaf_of(&self, node_id: &str) -> Option<usize> {
        self.leaf_of.get(node_id).copied()
    }

    pub fn embedding_row(&self, leaf: usize) -> &[f64] {
        &self.embedding[leaf * self.dim..(leaf + 1) * self.dim]
    }

    /// Micro labels and centroids, when both were supplied.
    pub fn micro(&self) -> Option<(&[usize], &[Vec<f64>])> {
        match (&self.micro_labels, &self.micro_centroids) {
            (Some(l), Some(c)) => Some((l.as_slice(), c.as_slice())),
            _ => None,
        }
    }
}

/// Per-account display metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Ranking signal (e.g. follower count); total degree when absent.
    #[serde(default)]
    pub signal: Option<f64>,
}

/// Louvain community per account id.
pub type LouvainPartition = HashMap<String, u32>;

/// Resolve a Louvain partition to leaf order.
pub fn louvain_by_leaf(artifact: &SpectralArtifact, partition: &LouvainPartition) -> Vec<Option<u32>> {
    artifact
        .node_ids()
        .iter()
        .map(|id| partition.get(id).copied())
        .collect()
}
