//! The five decompositions. Each returns parts partitioning `leaves`, or an
//! empty vector when its precondition does not hold.

use itertools::Itertools;

use super::{LocalStructureMetrics, Part};

fn complement(leaves: &[usize], taken: &[usize]) -> Vec<usize> {
    let taken: hashbrown::HashSet<usize> = taken.iter().copied().collect();
    leaves.iter().copied().filter(|l| !taken.contains(l)).collect()
}

pub(super) fn tag_split(leaves: &[usize], m: &LocalStructureMetrics) -> Vec<Part> {
    let Some(split) = &m.tag_split else {
        return Vec::new();
    };
    vec![
        Part::new(split.positive.clone(), "tag"),
        Part::new(complement(leaves, &split.positive), "rest"),
    ]
}

pub(super) fn core_periphery(m: &LocalStructureMetrics) -> Vec<Part> {
    let Some(split) = &m.core_split else {
        return Vec::new();
    };
    vec![
        Part::new(split.core.clone(), "core"),
        Part::new(split.periphery.clone(), "halo"),
    ]
}

/// Each large mutual component becomes a part; the leftovers share one.
pub(super) fn mutual_components(
    leaves: &[usize],
    m: &LocalStructureMetrics,
    min_part_size: usize,
) -> Vec<Part> {
    let min = min_part_size.max(2);
    let (big, small): (Vec<&Vec<usize>>, Vec<&Vec<usize>>) =
        m.mutual_components.iter().partition(|c| c.len() >= min);
    if big.len() < 2 {
        return Vec::new();
    }
    let mut parts: Vec<Part> = big.into_iter().map(|c| Part::new(c.clone(), "mc")).collect();
    let rest: Vec<usize> = small.into_iter().flatten().copied().collect();
    if !rest.is_empty() {
        parts.push(Part::new(rest, "rest"));
    }
    debug_assert_eq!(
        parts.iter().map(|p| p.leaves.len()).sum::<usize>(),
        leaves.len()
    );
    parts
}

pub(super) fn bridge_extraction(leaves: &[usize], m: &LocalStructureMetrics) -> Vec<Part> {
    let Some(bridge) = &m.bridge else {
        return Vec::new();
    };
    vec![
        Part::new(bridge.side.clone(), "br"),
        Part::new(complement(leaves, &bridge.side), "br"),
    ]
}

/// Promote the highest-signal members; the remainder stays grouped.
pub(super) fn sample_individuals(
    leaves: &[usize],
    signal: &[f64],
    sample_size: usize,
    max_parts: usize,
) -> Vec<Part> {
    if leaves.len() < 2 {
        return Vec::new();
    }
    let k = sample_size
        .min(max_parts.saturating_sub(1))
        .min(leaves.len() - 1)
        .max(1);
    let ranked: Vec<usize> = leaves
        .iter()
        .copied()
        .sorted_by(|&a, &b| {
            let sa = signal.get(a).copied().unwrap_or(0.0);
            let sb = signal.get(b).copied().unwrap_or(0.0);
            sb.total_cmp(&sa).then(a.cmp(&b))
        })
        .collect();
    let mut parts: Vec<Part> = ranked[..k]
        .iter()
        .map(|&leaf| Part::new(vec![leaf], "ind"))
        .collect();
    parts.push(Part::new(ranked[k..].to_vec(), "rest"));
    parts
}
