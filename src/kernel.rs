//! Subset enumerator & combinatorial kernel (spec §4.2).
//!
//! Stateless and shared by every index: power-set iteration over a bitmask,
//! a factorial memo, the exact Shapley weight, a deterministic permutation
//! sampler, and the dense-rank utility (Design Note §9) every `*_rank`
//! column in the crate goes through.

use crate::types::{CoalitionMask, PlayerId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand::seq::SliceRandom;

/// Largest `n` for which `FACTORIALS` holds an exact `u64` factorial.
pub(crate) const FACTORIAL_LIMIT: usize = 21;

pub(crate) const FACTORIALS: [u64; FACTORIAL_LIMIT] = {
    let mut facts = [1u64; FACTORIAL_LIMIT];
    let mut i = 1;
    while i < FACTORIAL_LIMIT {
        facts[i] = facts[i - 1] * (i as u64);
        i += 1;
    }
    facts
};

/// `n!` as `f64`, exact for the `n <= 12` domain this crate operates in.
pub fn factorial(n: usize) -> f64 {
    if n < FACTORIAL_LIMIT {
        FACTORIALS[n] as f64
    } else {
        FACTORIALS[FACTORIAL_LIMIT - 1] as f64
    }
}

/// Exact Shapley weight `w(|S|, n) = |S|!*(n-|S|-1)!/n!` (spec §4.2).
pub fn shapley_weight(s_size: usize, n: usize) -> f64 {
    factorial(s_size) * factorial(n - s_size - 1) / factorial(n)
}

/// Iterates every coalition of an `n`-player game in lexicographic order by
/// sorted player tuple, which for a bitmask representation is simply
/// ascending numeric order (spec §4.2).
pub fn power_set(n: usize) -> impl Iterator<Item = CoalitionMask> {
    let n_coalitions: u32 = 1u32 << n;
    (0..n_coalitions).map(|m| m as CoalitionMask)
}

/// Number of set bits, i.e. coalition size.
#[inline]
pub fn mask_size(mask: CoalitionMask) -> usize {
    mask.count_ones() as usize
}

/// True iff `sub` is a subset of `sup`.
#[inline]
pub fn is_subset(sub: CoalitionMask, sup: CoalitionMask) -> bool {
    sub & sup == sub
}

/// Seed for the deterministic permutation sampler: derived from
/// `(scenario_id, game_id, num_samples)` so parallel execution over games
/// never perturbs a single game's Monte-Carlo estimate (Design Note §9).
pub fn derive_seed(scenario_id: &str, game_id: &str, num_samples: usize) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325; // FNV-1a offset basis
    for byte in scenario_id
        .bytes()
        .chain(std::iter::once(0u8))
        .chain(game_id.bytes())
        .chain(std::iter::once(0u8))
        .chain(num_samples.to_le_bytes())
    {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Draws `num_samples` uniform random permutations of `0..n`, deterministic
/// for a given `seed` regardless of worker count (spec §4.2, §4.3, §5).
pub fn sample_permutations(n: usize, num_samples: usize, seed: u64) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let base: Vec<u8> = (0..n as u8).collect();
    (0..num_samples)
        .map(|_| {
            let mut perm = base.clone();
            perm.shuffle(&mut rng);
            perm
        })
        .collect()
}

/// Every submask of `mask`, including `0` and `mask` itself (the standard
/// "submask enumeration" trick), used to range over `L ⊆ S` / `T ⊆ N∖S` in
/// the interaction-index formulas (spec §4.3).
pub fn subsets_of(mask: CoalitionMask) -> Vec<CoalitionMask> {
    let mut out = Vec::with_capacity(1usize << mask.count_ones());
    let mut sub = mask;
    loop {
        out.push(sub);
        if sub == 0 {
            break;
        }
        sub = (sub - 1) & mask;
    }
    out
}

/// Translates an external player list into bit positions within `players`.
pub fn bits_of(players: &[PlayerId], members: &[PlayerId]) -> CoalitionMask {
    let mut mask: CoalitionMask = 0;
    for &m in members {
        if let Some(bit) = players.iter().position(|&p| p == m) {
            mask |= 1 << bit;
        }
    }
    mask
}

/// Dense rank from a score vector: ties share a rank, the next distinct
/// value gets the next consecutive integer, no gaps (spec §4.5, Design
/// Note §9's single shared routine for every `*_rank` column).
///
/// `larger_is_better = true` ranks the largest score 1st; `false` ranks the
/// smallest score 1st.
pub fn dense_rank<K: Copy + Ord>(scores: &[(K, f64)], larger_is_better: bool) -> std::collections::BTreeMap<K, u32> {
    let mut sorted: Vec<(K, f64)> = scores.to_vec();
    sorted.sort_by(|a, b| {
        if larger_is_better {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
        } else {
            a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
        }
    });

    let mut out = std::collections::BTreeMap::new();
    let mut rank: u32 = 0;
    let mut last_score: Option<f64> = None;
    for (key, score) in sorted {
        if last_score != Some(score) {
            rank += 1;
            last_score = Some(score);
        }
        out.insert(key, rank);
    }
    out
}
