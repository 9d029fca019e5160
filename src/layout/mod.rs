//! 2-D positions for visible clusters.
//!
//! Centroids are projected onto their top two principal axes. The axes come
//! from power iteration on the centred Gram matrix, which is `k x k` for `k`
//! visible clusters and so stays small no matter the embedding dimension.

mod procrustes;

pub use procrustes::{AlignmentStats, align};

use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::config::LayoutConfig;

/// Cluster id to `[x, y]`.
pub type Positions = BTreeMap<String, [f64; 2]>;

/// Project `(id, centroid)` pairs to the plane.
///
/// One cluster sits at the origin. Inputs without spread (all centroids
/// equal, or non-finite values) get a seeded pseudo-random layout instead.
pub fn compute_positions<'c, I>(clusters: I, cfg: &LayoutConfig) -> Positions
where
    I: IntoIterator<Item = (&'c str, &'c [f64])>,
{
    let (ids, rows): (Vec<&str>, Vec<&[f64]>) = clusters.into_iter().unzip();
    match ids.len() {
        0 => return Positions::new(),
        1 => return Positions::from([(ids[0].to_string(), [0.0, 0.0])]),
        _ => {}
    }
    match principal_coordinates(&rows, cfg) {
        Some(coords) => ids
            .iter()
            .zip(coords)
            .map(|(id, xy)| (id.to_string(), xy))
            .collect(),
        None => {
            log::warn!("degenerate centroids for {} clusters, using fallback layout", ids.len());
            fallback_positions(&ids, cfg.fallback_seed)
        }
    }
}

/// Stable pseudo-random placement in `(-1, 1)^2`, seeded per id.
pub fn fallback_positions(ids: &[&str], seed: u64) -> Positions {
    ids.iter()
        .map(|id| {
            let mut rng = SmallRng::seed_from_u64(id_seed(id) ^ seed);
            (id.to_string(), [rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)])
        })
        .collect()
}

/// First eight bytes of the id's SHA-256, little endian.
fn id_seed(id: &str) -> u64 {
    let digest = Sha256::digest(id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn principal_coordinates(rows: &[&[f64]], cfg: &LayoutConfig) -> Option<Vec<[f64; 2]>> {
    let k = rows.len();
    let dim = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut mean = vec![0.0; dim];
    for r in rows {
        for (m, x) in mean.iter_mut().zip(r.iter()) {
            *m += x / k as f64;
        }
    }
    let centred: Vec<Vec<f64>> = rows
        .iter()
        .map(|r| mean.iter().enumerate().map(|(j, m)| r.get(j).copied().unwrap_or(0.0) - m).collect())
        .collect();
    let mut gram = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in i..k {
            let g: f64 = centred[i].iter().zip(&centred[j]).map(|(a, b)| a * b).sum();
            gram[i][j] = g;
            gram[j][i] = g;
        }
    }
    if gram.iter().flatten().any(|g| !g.is_finite()) {
        return None;
    }

    let mut rng = SmallRng::seed_from_u64(cfg.fallback_seed);
    let start: Vec<f64> = (0..k).map(|_| rng.gen_range(0.5..1.5)).collect();
    let (l1, v1) = dominant_eigenpair(&gram, start.clone(), &[], cfg);
    if !(l1 > cfg.tolerance) {
        return None;
    }
    for i in 0..k {
        for j in 0..k {
            gram[i][j] -= l1 * v1[i] * v1[j];
        }
    }
    let (l2, v2) = dominant_eigenpair(&gram, start, &[&v1], cfg);
    let (s1, s2) = (l1.sqrt(), if l2 > cfg.tolerance { l2.sqrt() } else { 0.0 });
    let x = sign_normalised(v1);
    let y = sign_normalised(v2);
    Some((0..k).map(|i| [x[i] * s1, y[i] * s2]).collect())
}

/// Power iteration, keeping the vector orthogonal to `against`.
fn dominant_eigenpair(
    m: &[Vec<f64>],
    mut v: Vec<f64>,
    against: &[&[f64]],
    cfg: &LayoutConfig,
) -> (f64, Vec<f64>) {
    let orthogonalise = |v: &mut Vec<f64>| {
        for u in against {
            let d: f64 = v.iter().zip(u.iter()).map(|(a, b)| a * b).sum();
            v.iter_mut().zip(u.iter()).for_each(|(a, b)| *a -= d * b);
        }
    };
    orthogonalise(&mut v);
    if normalise(&mut v) == 0.0 {
        return (0.0, v);
    }
    for _ in 0..cfg.power_iterations {
        let mut next: Vec<f64> = m
            .iter()
            .map(|row| row.iter().zip(&v).map(|(a, b)| a * b).sum())
            .collect();
        orthogonalise(&mut next);
        if normalise(&mut next) == 0.0 {
            return (0.0, v);
        }
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        if delta < cfg.tolerance {
            break;
        }
    }
    let mv: Vec<f64> = m.iter().map(|row| row.iter().zip(&v).map(|(a, b)| a * b).sum()).collect();
    let lambda = mv.iter().zip(&v).map(|(a, b)| a * b).sum();
    (lambda, v)
}

fn normalise(v: &mut [f64]) -> f64 {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        v.iter_mut().for_each(|x| *x /= norm);
        norm
    } else {
        0.0
    }
}

/// Flip so the largest-magnitude component is positive.
fn sign_normalised(mut v: Vec<f64>) -> Vec<f64> {
    let pivot = v
        .iter()
        .copied()
        .max_by(|a, b| a.abs().total_cmp(&b.abs()))
        .unwrap_or(0.0);
    if pivot < 0.0 {
        v.iter_mut().for_each(|x| *x = -*x);
    }
    v
}
