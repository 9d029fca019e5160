//! Similarity alignment of a new layout onto the previous one.

use serde::{Deserialize, Serialize};

use super::Positions;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentStats {
    pub aligned: bool,
    /// Ids present in both layouts.
    pub overlap: usize,
    /// Radians applied to the new layout.
    pub rotation: f64,
    pub scale: f64,
    pub rms_before: f64,
    pub rms_after: f64,
}

impl AlignmentStats {
    fn unaligned(overlap: usize, rms: f64) -> Self {
        Self {
            aligned: false,
            overlap,
            rotation: 0.0,
            scale: 1.0,
            rms_before: rms,
            rms_after: rms,
        }
    }
}

fn rms(pairs: &[([f64; 2], [f64; 2])]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    let sum: f64 = pairs
        .iter()
        .map(|(p, q)| (p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2))
        .sum();
    (sum / pairs.len() as f64).sqrt()
}

/// Rotate, scale and translate `new` so the ids it shares with `previous`
/// land as close as possible to where they were.
///
/// The 2-D least-squares similarity has a closed form: with both shared
/// point sets centred, `a = sum(q . p)` and `b = sum(q x p)` give the angle
/// `atan2(b, a)` and scale `hypot(a, b) / sum(|q|^2)`. Needs at least two
/// shared ids; the result never moves the shared points further away.
pub fn align(previous: &Positions, new: &Positions) -> (Positions, AlignmentStats) {
    let pairs: Vec<([f64; 2], [f64; 2])> = new
        .iter()
        .filter_map(|(id, q)| previous.get(id).map(|p| (*p, *q)))
        .collect();
    let overlap = pairs.len();
    let before = rms(&pairs);
    if overlap < 2 {
        return (new.clone(), AlignmentStats::unaligned(overlap, before));
    }
    let mean = |f: fn(&([f64; 2], [f64; 2])) -> [f64; 2]| {
        let s = pairs.iter().map(f).fold([0.0, 0.0], |a, x| [a[0] + x[0], a[1] + x[1]]);
        [s[0] / overlap as f64, s[1] / overlap as f64]
    };
    let pbar = mean(|(p, _)| *p);
    let qbar = mean(|(_, q)| *q);
    let (mut a, mut b, mut qq) = (0.0, 0.0, 0.0);
    for (p, q) in &pairs {
        let (px, py) = (p[0] - pbar[0], p[1] - pbar[1]);
        let (qx, qy) = (q[0] - qbar[0], q[1] - qbar[1]);
        a += qx * px + qy * py;
        b += qx * py - qy * px;
        qq += qx * qx + qy * qy;
    }
    if qq <= 0.0 || !qq.is_finite() {
        return (new.clone(), AlignmentStats::unaligned(overlap, before));
    }
    let theta = b.atan2(a);
    let scale = a.hypot(b) / qq;
    let (sin, cos) = theta.sin_cos();
    let apply = |q: [f64; 2]| {
        let (x, y) = (q[0] - qbar[0], q[1] - qbar[1]);
        [
            scale * (cos * x - sin * y) + pbar[0],
            scale * (sin * x + cos * y) + pbar[1],
        ]
    };
    let moved: Vec<([f64; 2], [f64; 2])> = pairs.iter().map(|(p, q)| (*p, apply(*q))).collect();
    let after = rms(&moved);
    if !(after <= before) {
        return (new.clone(), AlignmentStats::unaligned(overlap, before));
    }
    let aligned = new.iter().map(|(id, q)| (id.clone(), apply(*q))).collect();
    (
        aligned,
        AlignmentStats {
            aligned: true,
            overlap,
            rotation: theta,
            scale,
            rms_before: before,
            rms_after: after,
        },
    )
}
