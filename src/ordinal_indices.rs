//! Ordinal indices (spec §4.5): signed ordinal marginal, ordinal Banzhaf
//! (player), lex-cel (player), group ordinal Banzhaf (coalition), group
//! lex-cel (coalition) — all built over a [`QuotientRanking`].
//!
//! Dense-rank ties share a rank; the next distinct value gets the next
//! consecutive integer, no gaps (spec §4.5, Design Note §9's single shared
//! `dense_rank` routine — extended here with [`lex_dense_rank`] for the two
//! indices ranked by a participation *vector* rather than a scalar).

use crate::kernel::{dense_rank, is_subset, mask_size, subsets_of};
use crate::ordinal::QuotientRanking;
use crate::types::{CoalitionMask, Game, PlayerId};
use std::collections::BTreeMap;

/// Signed ordinal marginal `m_i^S` for player `i` and reference set `S`
/// (spec §4.5): `+1` if `S∪{i} ≻ S`, `-1` if `S ≻ S∪{i}`, `0` if
/// indifferent, incomparable, or `i ∈ S`.
pub fn ordinal_marginal(quotient: &QuotientRanking, s: CoalitionMask, player_bit: u8) -> i32 {
    let bit = 1u16 << player_bit;
    if s & bit != 0 {
        return 0;
    }
    let with = s | bit;
    if quotient.strict(with, s) {
        1
    } else if quotient.strict(s, with) {
        -1
    } else {
        0
    }
}

/// Ordinal Banzhaf score per player (spec §4.5): `u_i+ - u_i-` over every
/// `S ⊆ N∖{i}`, plus the dense rank over players (1 = largest score).
pub fn ordinal_banzhaf(
    game: &Game,
    quotient: &QuotientRanking,
) -> (BTreeMap<PlayerId, f64>, BTreeMap<PlayerId, u32>) {
    let n = game.n();
    let mut scores: Vec<(PlayerId, f64)> = Vec::with_capacity(n);
    for (bit, &player) in game.players.iter().enumerate() {
        let rest_bits: Vec<usize> = (0..n).filter(|&b| b != bit).collect();
        let mut plus = 0i64;
        let mut minus = 0i64;
        for idx in 0..(1u32 << rest_bits.len()) {
            let mut s_mask: CoalitionMask = 0;
            for (pos, &b) in rest_bits.iter().enumerate() {
                if idx & (1 << pos) != 0 {
                    s_mask |= 1 << b;
                }
            }
            match ordinal_marginal(quotient, s_mask, bit as u8) {
                1 => plus += 1,
                -1 => minus += 1,
                _ => {}
            }
        }
        scores.push((player, (plus - minus) as f64));
    }
    let score_map = scores.iter().copied().collect();
    let ranks = dense_rank(&scores, true);
    (score_map, ranks)
}

/// Participation vector `θ(i) = (i_1,...,i_ℓ)` (spec §4.5 lex-cel step 1):
/// `i_k` is the number of coalitions in layer `k` containing player `i`.
pub fn lex_cel_theta(game: &Game, quotient: &QuotientRanking) -> BTreeMap<PlayerId, Vec<i64>> {
    let mut out = BTreeMap::new();
    for (bit, &player) in game.players.iter().enumerate() {
        let bitmask = 1u16 << bit;
        let theta: Vec<i64> = quotient
            .layers()
            .iter()
            .map(|layer| layer.iter().filter(|&&m| m & bitmask != 0).count() as i64)
            .collect();
        out.insert(player, theta);
    }
    out
}

/// Dense rank from a lexicographically-ordered vector score (spec §4.5
/// lex-cel step 2/3, group lex-cel analogue): ties (equal vectors) share a
/// rank, `larger_is_better = true` ranks the lex-greatest vector 1st.
pub fn lex_dense_rank<K: Copy + Ord>(scores: &[(K, Vec<i64>)], larger_is_better: bool) -> BTreeMap<K, u32> {
    let mut sorted: Vec<(K, Vec<i64>)> = scores.to_vec();
    sorted.sort_by(|a, b| if larger_is_better { b.1.cmp(&a.1) } else { a.1.cmp(&b.1) });

    let mut out = BTreeMap::new();
    let mut rank: u32 = 0;
    let mut last: Option<Vec<i64>> = None;
    for (key, theta) in sorted {
        if last.as_ref() != Some(&theta) {
            rank += 1;
            last = Some(theta.clone());
        }
        out.insert(key, rank);
    }
    out
}

/// lex-cel rank per player (spec §4.5): dense rank over [`lex_cel_theta`],
/// 1 = lex-greatest.
pub fn lex_cel_rank(game: &Game, quotient: &QuotientRanking) -> BTreeMap<PlayerId, u32> {
    let theta = lex_cel_theta(game, quotient);
    let scores: Vec<(PlayerId, Vec<i64>)> = theta.into_iter().collect();
    lex_dense_rank(&scores, true)
}

/// Group ordinal marginal `m_T^S` for coalition `T` and reference `S ⊆
/// N∖T` (spec §4.5): `+1` if `S∪T ≻ S`, `-1` if `S ≻ S∪T`, else `0`.
pub fn group_ordinal_marginal(quotient: &QuotientRanking, t: CoalitionMask, s: CoalitionMask) -> i32 {
    if s & t != 0 {
        return 0;
    }
    let with = s | t;
    if quotient.strict(with, s) {
        1
    } else if quotient.strict(s, with) {
        -1
    } else {
        0
    }
}

/// Group ordinal Banzhaf score `s_T` for every coalition `T` in `subsets`
/// (spec §4.5): `|{S : m_T^S = +1}| - |{S : m_T^S = -1}|` over every `S ⊆
/// N∖T`.
pub fn group_ordinal_banzhaf(
    game: &Game,
    quotient: &QuotientRanking,
    subsets: &[CoalitionMask],
) -> BTreeMap<CoalitionMask, f64> {
    let full = game.grand_mask();
    subsets
        .iter()
        .map(|&t| {
            let complement = full & !t;
            let mut plus = 0i64;
            let mut minus = 0i64;
            for s in subsets_of(complement) {
                match group_ordinal_marginal(quotient, t, s) {
                    1 => plus += 1,
                    -1 => minus += 1,
                    _ => {}
                }
            }
            (t, (plus - minus) as f64)
        })
        .collect()
}

/// Group participation vector `Θ(T) = (T_1,...,T_ℓ)` (spec §4.5 group
/// lex-cel): `T_k` is the number of coalitions in layer `k` that contain
/// `T` as a subset.
pub fn group_lex_cel_theta(
    quotient: &QuotientRanking,
    subsets: &[CoalitionMask],
) -> BTreeMap<CoalitionMask, Vec<i64>> {
    subsets
        .iter()
        .map(|&t| {
            let theta: Vec<i64> = quotient
                .layers()
                .iter()
                .map(|layer| layer.iter().filter(|&&s| is_subset(t, s)).count() as i64)
                .collect();
            (t, theta)
        })
        .collect()
}

/// Group lex-cel rank per coalition (spec §4.5): dense rank over
/// [`group_lex_cel_theta`], 1 = lex-greatest (best).
pub fn group_lex_cel_rank(
    quotient: &QuotientRanking,
    subsets: &[CoalitionMask],
) -> BTreeMap<CoalitionMask, u32> {
    let theta = group_lex_cel_theta(quotient, subsets);
    let scores: Vec<(CoalitionMask, Vec<i64>)> = theta.into_iter().collect();
    lex_dense_rank(&scores, true)
}

/// Renders a participation vector as the comma-separated string the result
/// assembler emits for `group_lexcel_theta` (spec §4.5, §4.7).
pub fn theta_to_string(theta: &[i64]) -> String {
    theta
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Default subset family for group-indexed ordinal indices (spec §4.5):
/// coalitions with `|T| >= 2`.
pub fn default_group_subsets(n: usize) -> Vec<CoalitionMask> {
    crate::kernel::power_set(n).filter(|&m| mask_size(m) >= 2).collect()
}
