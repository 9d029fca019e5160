//! Centroids and soft membership.

use rayon::prelude::*;

use crate::artifact::SpectralArtifact;

/// Mean embedding of `leaves`, or the mean of their micro-cluster centroids
/// when the artifact carries micro data.
pub fn cluster_centroid(artifact: &SpectralArtifact, leaves: &[usize]) -> Vec<f64> {
    let mut acc = vec![0.0; artifact.dim()];
    if leaves.is_empty() {
        return acc;
    }
    let micro = artifact.micro();
    for &leaf in leaves {
        let row = match micro {
            Some((labels, centroids)) => labels
                .get(leaf)
                .and_then(|&m| centroids.get(m))
                .map_or_else(|| artifact.embedding_row(leaf), Vec::as_slice),
            None => artifact.embedding_row(leaf),
        };
        for (a, x) in acc.iter_mut().zip(row) {
            *a += x;
        }
    }
    let n = leaves.len() as f64;
    acc.iter_mut().for_each(|a| *a /= n);
    acc
}

/// Row-normalised affinity of every account to every centroid,
/// `1 / (1 + |x - c|^2)`.
pub fn soft_membership(artifact: &SpectralArtifact, centroids: &[Vec<f64>]) -> Vec<Vec<f64>> {
    (0..artifact.len())
        .into_par_iter()
        .map(|leaf| {
            let x = artifact.embedding_row(leaf);
            let mut row: Vec<f64> = centroids
                .iter()
                .map(|c| {
                    let d2: f64 = x.iter().zip(c).map(|(a, b)| (a - b).powi(2)).sum();
                    1.0 / (1.0 + d2)
                })
                .collect();
            let total: f64 = row.iter().sum();
            if total > 0.0 {
                row.iter_mut().for_each(|v| *v /= total);
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::SpectralArtifactFile;

    fn artifact(micro: bool) -> SpectralArtifact {
        SpectralArtifact::from_parts(SpectralArtifactFile {
            node_ids: vec!["a".into(), "b".into(), "c".into()],
            embedding: vec![vec![0.0, 0.0], vec![2.0, 0.0], vec![10.0, 10.0]],
            linkage_matrix: vec![[0.0, 1.0, 1.0, 2.0], [3.0, 2.0, 5.0, 3.0]],
            micro_labels: micro.then(|| vec![0, 0, 1]),
            micro_centroids: micro.then(|| vec![vec![1.0, 1.0], vec![10.0, 10.0]]),
        })
        .unwrap()
    }

    #[test]
    fn centroid_uses_micro_when_present() {
        assert_eq!(cluster_centroid(&artifact(false), &[0, 1]), vec![1.0, 0.0]);
        assert_eq!(cluster_centroid(&artifact(true), &[0, 1]), vec![1.0, 1.0]);
        assert_eq!(cluster_centroid(&artifact(false), &[]), vec![0.0, 0.0]);
    }

    #[test]
    fn rows_sum_to_one() {
        let a = artifact(false);
        let centroids = vec![vec![1.0, 0.0], vec![10.0, 10.0]];
        let m = soft_membership(&a, &centroids);
        assert_eq!(m.len(), 3);
        for row in &m {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        assert!(m[0][0] > m[0][1]);
        assert!(m[2][1] > m[2][0]);
    }
}
