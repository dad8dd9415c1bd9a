//! Ordinal kernel (spec §4.4): the coalitional quotient ranking built over
//! `Game::ranks`, plus the strict/indifference comparators every ordinal
//! index and axiom evaluator is built on.
//!
//! Grounded on the teacher's "arena + index" `LPPrimitives` pattern (Design
//! Note §9): a single flat backing vector (`layers`, one `Vec<CoalitionMask>`
//! per layer) plus a side map `coalition -> layer_index`, so no
//! cross-referencing pointer structure is needed to answer "what layer is
//! this coalition in" or "iterate the top layer down".

use crate::error::{CoopMetricsError, Result};
use crate::types::{CoalitionMask, Game};
use std::collections::BTreeMap;

/// The quotient ranking `Σ1 ≻ Σ2 ≻ ... ≻ Σℓ` derived from a rank map (spec
/// §3, §4.4): coalitions sharing the same rank value fall into the same
/// layer, and layers are ordered ascending by rank (layer 0 = best).
#[derive(Debug, Clone)]
pub struct QuotientRanking {
    /// `layers[k]` holds every coalition at the k-th best rank value.
    layers: Vec<Vec<CoalitionMask>>,
    /// `coalition -> index into layers`.
    layer_of: BTreeMap<CoalitionMask, usize>,
}

impl QuotientRanking {
    /// Builds the quotient ranking from a game's rank map (spec §4.4).
    /// `Internal` if a rank map was non-empty but produced no layers —
    /// a bug signal, since every present coalition must land in some layer.
    pub fn build(game: &Game) -> Result<Option<Self>> {
        let Some(ranks) = game.ranks() else {
            return Ok(None);
        };
        if ranks.is_empty() {
            return Ok(Some(QuotientRanking {
                layers: Vec::new(),
                layer_of: BTreeMap::new(),
            }));
        }

        let mut by_rank: BTreeMap<u32, Vec<CoalitionMask>> = BTreeMap::new();
        for (&mask, &rank) in ranks {
            by_rank.entry(rank).or_default().push(mask);
        }

        let mut layers = Vec::with_capacity(by_rank.len());
        let mut layer_of = BTreeMap::new();
        for (_, masks) in by_rank {
            let idx = layers.len();
            for &m in &masks {
                layer_of.insert(m, idx);
            }
            layers.push(masks);
        }

        if layers.iter().any(|layer| layer.is_empty()) {
            return Err(CoopMetricsError::Internal {
                scenario_id: game.id.scenario_id.clone(),
                game_id: game.id.game_id.clone(),
                detail: "quotient ranking produced an empty layer".to_string(),
            });
        }

        Ok(Some(QuotientRanking { layers, layer_of }))
    }

    /// Number of layers `ℓ`.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// The coalitions sharing the k-th best rank value.
    pub fn layer(&self, k: usize) -> &[CoalitionMask] {
        &self.layers[k]
    }

    /// Iterates all layers top (best) to bottom.
    pub fn layers(&self) -> &[Vec<CoalitionMask>] {
        &self.layers
    }

    /// Layer index of `mask`, if it is a ranked coalition.
    pub fn layer_of(&self, mask: CoalitionMask) -> Option<usize> {
        self.layer_of.get(&mask).copied()
    }

    /// `true` iff both coalitions are ranked and `S` strictly precedes `T`
    /// (S ≻ T, i.e. S's layer is better / smaller index) (spec §4.4).
    pub fn strict(&self, s: CoalitionMask, t: CoalitionMask) -> bool {
        match (self.layer_of(s), self.layer_of(t)) {
            (Some(ls), Some(lt)) => ls < lt,
            _ => false,
        }
    }

    /// `true` iff both coalitions are ranked and share a layer (spec §4.4).
    pub fn indiff(&self, s: CoalitionMask, t: CoalitionMask) -> bool {
        match (self.layer_of(s), self.layer_of(t)) {
            (Some(ls), Some(lt)) => ls == lt,
            _ => false,
        }
    }

    /// `true` iff both coalitions are ranked (needed to distinguish
    /// "indifferent" from "incomparable, not in this ranking at all").
    pub fn comparable(&self, s: CoalitionMask, t: CoalitionMask) -> bool {
        self.layer_of(s).is_some() && self.layer_of(t).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{build_games, GameRow};

    fn ranked_game() -> Game {
        // spec §8 scenario 4: 3 players, top layer = {0},{1},{01},{012}.
        let rows = vec![
            GameRow::new("s", "g").coalition(vec![0]).rank(1),
            GameRow::new("s", "g").coalition(vec![1]).rank(1),
            GameRow::new("s", "g").coalition(vec![2]).rank(2),
            GameRow::new("s", "g").coalition(vec![0, 1]).rank(1),
            GameRow::new("s", "g").coalition(vec![0, 2]).rank(2),
            GameRow::new("s", "g").coalition(vec![1, 2]).rank(2),
            GameRow::new("s", "g").coalition(vec![0, 1, 2]).rank(1),
        ];
        build_games(rows, None, None, false).unwrap().remove(0)
    }

    #[test]
    fn test_layers_grouped_ascending() {
        let g = ranked_game();
        let q = QuotientRanking::build(&g).unwrap().unwrap();
        assert_eq!(q.num_layers(), 2);
        assert_eq!(q.layer(0).len(), 4);
        assert_eq!(q.layer(1).len(), 3);
    }

    #[test]
    fn test_strict_and_indiff() {
        let g = ranked_game();
        let q = QuotientRanking::build(&g).unwrap().unwrap();
        let s0 = g.mask_of(&[0]);
        let s1 = g.mask_of(&[1]);
        let s2 = g.mask_of(&[2]);
        assert!(q.indiff(s0, s1));
        assert!(q.strict(s0, s2));
        assert!(!q.strict(s2, s0));
    }

    #[test]
    fn test_no_ranks_returns_none() {
        let rows = vec![GameRow::new("s", "g").coalition(vec![0]).value(1.0)];
        let g = build_games(rows, None, None, false).unwrap().remove(0);
        assert!(QuotientRanking::build(&g).unwrap().is_none());
    }
}
