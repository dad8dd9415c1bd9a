//! Game model & ranking builder (spec §3, §4.1).
//!
//! A [`Game`] is built once from a validated table of rows and never
//! mutated afterward; coalitions are stored internally as bitmasks (Design
//! Note: power-set representation) with bit `k` set iff the player at
//! index `k` of [`Game::players`] is a member.

use crate::error::{CoopMetricsError, Result};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A player identifier, as it appears in the input table.
pub type PlayerId = u32;

/// A coalition, represented as a bitmask over a game's (sorted) player list.
pub type CoalitionMask = u16;

/// Hard bound on players per game (spec §3).
pub const MAX_PLAYERS: usize = 12;

/// Joins a game's results back to its row of origin.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GameId {
    pub scenario_id: String,
    pub game_id: String,
}

impl GameId {
    pub fn new(scenario_id: impl Into<String>, game_id: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            game_id: game_id.into(),
        }
    }
}

impl Display for GameId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scenario_id, self.game_id)
    }
}

/// Whether a game carries cardinal worths, an ordinal ranking, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameType {
    Tu,
    Ordinal,
    Both,
}

/// Non-fatal, per-game notes surfaced alongside results (spec §7).
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Banzhaf normalization divisor was zero; values were left at zero.
    BanzhafNormalizationDegenerate,
    /// An axiom rule had zero triggered pairs; satisfaction_rate is NaN.
    DegenerateAxiomRate { rule: String },
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Warning::BanzhafNormalizationDegenerate => {
                write!(f, "Banzhaf normalization divisor is zero; emitting zeros")
            }
            Warning::DegenerateAxiomRate { rule } => write!(
                f,
                "rule `{rule}` triggered on zero pairs; satisfaction_rate is NaN"
            ),
        }
    }
}

/// How `rank` is synthesized from `value` when the input omits ranks
/// (spec §4.1).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankingMode {
    Dense,
    Bin { bin_width: f64 },
}

/// One validated input row (spec §4.1): `coalition` is the canonicalized,
/// sorted set of player ids.
#[derive(Debug, Clone)]
pub struct GameRow {
    pub scenario_id: String,
    pub game_id: String,
    pub coalition: Vec<PlayerId>,
    pub value: Option<f64>,
    pub rank: Option<u32>,
}

impl GameRow {
    pub fn new(scenario_id: impl Into<String>, game_id: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            game_id: game_id.into(),
            coalition: Vec::new(),
            value: None,
            rank: None,
        }
    }

    pub fn coalition(mut self, mut coalition: Vec<PlayerId>) -> Self {
        coalition.sort_unstable();
        coalition.dedup();
        self.coalition = coalition;
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn rank(mut self, rank: u32) -> Self {
        self.rank = Some(rank);
        self
    }
}

/// One cooperative-game instance (spec §3). Immutable once built.
#[derive(Debug, Clone)]
pub struct Game {
    pub id: GameId,
    pub players: Vec<PlayerId>,
    pub game_type: GameType,
    pub diagnostics: Vec<Warning>,
    values: BTreeMap<CoalitionMask, f64>,
    ranks: Option<BTreeMap<CoalitionMask, u32>>,
}

impl Game {
    /// Number of players, `n` in the spec's formulas.
    pub fn n(&self) -> usize {
        self.players.len()
    }

    /// Bitmask for the full player set (the grand coalition).
    pub fn grand_mask(&self) -> CoalitionMask {
        if self.players.is_empty() {
            0
        } else {
            ((1u32 << self.players.len()) - 1) as CoalitionMask
        }
    }

    /// Bit index of `player` within this game's player list, if present.
    pub fn player_bit(&self, player: PlayerId) -> Option<u8> {
        self.players
            .iter()
            .position(|&p| p == player)
            .map(|i| i as u8)
    }

    /// Mask for an arbitrary subset of this game's players.
    pub fn mask_of(&self, members: &[PlayerId]) -> CoalitionMask {
        let mut mask: CoalitionMask = 0;
        for &m in members {
            if let Some(bit) = self.player_bit(m) {
                mask |= 1 << bit;
            }
        }
        mask
    }

    /// Worth of a coalition; missing coalitions default to 0.0 (spec §3).
    pub fn value(&self, mask: CoalitionMask) -> f64 {
        *self.values.get(&mask).unwrap_or(&0.0)
    }

    /// Rank of a coalition (1 = best), if this game carries ranks.
    pub fn rank(&self, mask: CoalitionMask) -> Option<u32> {
        self.ranks.as_ref()?.get(&mask).copied()
    }

    /// All ranked coalitions, in ascending-rank iteration order by mask.
    pub fn ranks(&self) -> Option<&BTreeMap<CoalitionMask, u32>> {
        self.ranks.as_ref()
    }

    pub fn has_cardinal(&self) -> bool {
        matches!(self.game_type, GameType::Tu | GameType::Both)
    }

    pub fn has_ordinal(&self) -> bool {
        matches!(self.game_type, GameType::Ordinal | GameType::Both)
    }

    /// Serialized coalition key, spec §4.7: `{0,2,3}`, sorted ascending.
    pub fn coalition_key(&self, mask: CoalitionMask) -> String {
        let members: Vec<String> = self
            .players
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, &p)| p.to_string())
            .collect();
        format!("{{{}}}", members.join(","))
    }
}

/// Groups validated rows into one `Game` per `(scenario_id, game_id)`,
/// synthesizing ranks from `value` when `ranking_mode` is given and the row
/// carries no explicit rank (spec §4.1).
///
/// Output order is `(scenario_id, game_id)` lexicographic, independent of
/// input row order, so permuting the input never changes which game a row
/// belongs to or the order games are emitted in (spec §8, rank determinism).
pub fn build_games(
    rows: Vec<GameRow>,
    players_override: Option<&[PlayerId]>,
    ranking_mode: Option<RankingMode>,
    descending: bool,
) -> Result<Vec<Game>> {
    let mut grouped: BTreeMap<(String, String), Vec<GameRow>> = BTreeMap::new();
    for row in rows {
        grouped
            .entry((row.scenario_id.clone(), row.game_id.clone()))
            .or_default()
            .push(row);
    }

    let mut games = Vec::with_capacity(grouped.len());
    for ((scenario_id, game_id), rows) in grouped {
        games.push(build_one_game(
            scenario_id,
            game_id,
            rows,
            players_override,
            ranking_mode,
            descending,
        )?);
    }
    Ok(games)
}

fn build_one_game(
    scenario_id: String,
    game_id: String,
    rows: Vec<GameRow>,
    players_override: Option<&[PlayerId]>,
    ranking_mode: Option<RankingMode>,
    descending: bool,
) -> Result<Game> {
    let mut players: Vec<PlayerId> = match players_override {
        Some(p) => p.to_vec(),
        None => {
            let mut set: Vec<PlayerId> = rows.iter().flat_map(|r| r.coalition.iter().copied()).collect();
            set.sort_unstable();
            set.dedup();
            set
        }
    };
    players.sort_unstable();
    players.dedup();

    let mut diagnostics = Vec::new();
    let mut values: BTreeMap<CoalitionMask, f64> = BTreeMap::new();
    let mut explicit_ranks: BTreeMap<CoalitionMask, u32> = BTreeMap::new();
    let mut seen_masks: BTreeMap<CoalitionMask, ()> = BTreeMap::new();
    let mut any_value = false;
    let mut any_rank = false;

    for row in &rows {
        let mask = mask_for(&players, &row.coalition);
        if seen_masks.insert(mask, ()).is_some() {
            return Err(CoopMetricsError::DuplicateCoalitionRow {
                scenario_id,
                game_id,
                coalition: coalition_key_of(&players, mask),
            });
        }
        if let Some(v) = row.value {
            values.insert(mask, v);
            any_value = true;
        }
        if let Some(r) = row.rank {
            explicit_ranks.insert(mask, r);
            any_rank = true;
        }
    }

    let ranks = if any_rank {
        Some(explicit_ranks)
    } else if let Some(mode) = ranking_mode {
        if !any_value {
            return Err(CoopMetricsError::RankSynthesisNeedsValue);
        }
        Some(synthesize_ranks(&values, mode, descending)?)
    } else {
        None
    };

    let game_type = match (any_value, ranks.is_some()) {
        (true, true) => GameType::Both,
        (true, false) => GameType::Tu,
        (false, true) => GameType::Ordinal,
        (false, false) => GameType::Tu,
    };

    Ok(Game {
        id: GameId { scenario_id, game_id },
        players,
        game_type,
        diagnostics,
    }
    .with_tables(values, ranks))
}

impl Game {
    fn with_tables(
        mut self,
        values: BTreeMap<CoalitionMask, f64>,
        ranks: Option<BTreeMap<CoalitionMask, u32>>,
    ) -> Self {
        self.values = values;
        self.ranks = ranks;
        self
    }
}

fn mask_for(players: &[PlayerId], coalition: &[PlayerId]) -> CoalitionMask {
    let mut mask: CoalitionMask = 0;
    for &member in coalition {
        if let Some(bit) = players.iter().position(|&p| p == member) {
            mask |= 1 << bit;
        }
    }
    mask
}

fn coalition_key_of(players: &[PlayerId], mask: CoalitionMask) -> String {
    let members: Vec<String> = players
        .iter()
        .enumerate()
        .filter(|(bit, _)| mask & (1 << bit) != 0)
        .map(|(_, &p)| p.to_string())
        .collect();
    format!("{{{}}}", members.join(","))
}

/// Rank synthesis from value (spec §4.1): `dense` ranks the value column
/// directly; `bin` first quantizes by `bin_width` to collapse near-ties,
/// then dense-ranks the bin identifiers. `descending` flips which extreme
/// is best (rank 1).
fn synthesize_ranks(
    values: &BTreeMap<CoalitionMask, f64>,
    mode: RankingMode,
    descending: bool,
) -> Result<BTreeMap<CoalitionMask, u32>> {
    let scores: Vec<(CoalitionMask, f64)> = match mode {
        RankingMode::Dense => values.iter().map(|(&m, &v)| (m, v)).collect(),
        RankingMode::Bin { bin_width } => {
            if bin_width <= 0.0 {
                return Err(CoopMetricsError::MissingBinWidth);
            }
            values
                .iter()
                .map(|(&m, &v)| {
                    let bin = if descending {
                        (v / bin_width).ceil()
                    } else {
                        (v / bin_width).floor()
                    };
                    (m, bin)
                })
                .collect()
        }
    };

    Ok(crate::kernel::dense_rank(&scores, descending))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(s: &str, g: &str, c: Vec<PlayerId>, v: Option<f64>, r: Option<u32>) -> GameRow {
        GameRow {
            scenario_id: s.to_string(),
            game_id: g.to_string(),
            coalition: c,
            value: v,
            rank: r,
        }
    }

    #[test]
    fn test_build_games_groups_and_orders_players() {
        let rows = vec![
            row("s", "g", vec![1], Some(1.0), None),
            row("s", "g", vec![0], Some(2.0), None),
            row("s", "g", vec![0, 1], Some(3.0), None),
            row("s", "g", vec![], Some(0.0), None),
        ];
        let games = build_games(rows, None, None, false).unwrap();
        assert_eq!(games.len(), 1);
        let g = &games[0];
        assert_eq!(g.players, vec![0, 1]);
        assert_eq!(g.value(g.mask_of(&[0])), 2.0);
        assert_eq!(g.value(g.mask_of(&[1])), 1.0);
        assert_eq!(g.value(g.grand_mask()), 3.0);
    }

    #[test]
    fn test_missing_coalition_defaults_to_zero() {
        let rows = vec![row("s", "g", vec![0], Some(5.0), None)];
        let games = build_games(rows, Some(&[0, 1]), None, false).unwrap();
        let g = &games[0];
        assert_eq!(g.value(g.mask_of(&[1])), 0.0);
    }

    #[test]
    fn test_duplicate_coalition_row_is_fatal() {
        let rows = vec![
            row("s", "g", vec![0], Some(1.0), None),
            row("s", "g", vec![0], Some(2.0), None),
        ];
        let err = build_games(rows, None, None, false).unwrap_err();
        assert!(matches!(err, CoopMetricsError::DuplicateCoalitionRow { .. }));
    }

    #[test]
    fn test_row_order_independence() {
        let a = vec![
            row("s", "g", vec![0], Some(1.0), None),
            row("s", "g", vec![1], Some(2.0), None),
            row("s", "g", vec![0, 1], Some(3.0), None),
        ];
        let mut b = a.clone();
        b.reverse();

        let games_a = build_games(a, None, None, false).unwrap();
        let games_b = build_games(b, None, None, false).unwrap();
        assert_eq!(games_a[0].players, games_b[0].players);
        assert_eq!(
            games_a[0].value(games_a[0].grand_mask()),
            games_b[0].value(games_b[0].grand_mask())
        );
    }

    #[test]
    fn test_dense_rank_synthesis() {
        let rows = vec![
            row("s", "g", vec![0], Some(1.0), None),
            row("s", "g", vec![1], Some(1.0), None),
            row("s", "g", vec![0, 1], Some(3.0), None),
        ];
        let games = build_games(rows, None, Some(RankingMode::Dense), true).unwrap();
        let g = &games[0];
        assert_eq!(g.rank(g.mask_of(&[0])), g.rank(g.mask_of(&[1])));
        assert_eq!(g.rank(g.grand_mask()), Some(1));
    }

    #[test]
    fn test_rank_synthesis_without_value_is_fatal() {
        let rows = vec![row("s", "g", vec![0], None, None)];
        let err = build_games(rows, None, Some(RankingMode::Dense), false).unwrap_err();
        assert!(matches!(err, CoopMetricsError::RankSynthesisNeedsValue));
    }
}
