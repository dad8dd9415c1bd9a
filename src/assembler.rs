//! Result assembler (spec §4.7): shapes the per-game cardinal/ordinal/axiom
//! outputs into the two long-format tables `individuals` and `coalitions`,
//! plus the axiom tables.
//!
//! Grounded on `network_shapley.rs`'s top-level `network_shapley()`
//! orchestration function (validate -> consolidate -> compute -> shape);
//! generalized from "one LP solve per call" to "validate config once, then
//! fan the per-game computation out over `rayon::par_iter()`" per spec §5's
//! "games may be processed in parallel by a worker pool keyed by
//! `(scenario_id, game_id)`".

use crate::axioms::{evaluate_sada, evaluate_swimmy, resolve_rules, AxiomReport};
use crate::cardinal::{
    banzhaf, banzhaf_interaction_index, default_interaction_subsets, shapley_exact,
    shapley_monte_carlo, shapley_interaction_index,
};
use crate::config::{IndexName, RunConfig};
use crate::error::{CoopMetricsError, Result};
use crate::kernel::{bits_of, dense_rank};
use crate::ordinal::QuotientRanking;
use crate::ordinal_indices::{
    default_group_subsets, group_lex_cel_rank, group_lex_cel_theta, group_ordinal_banzhaf,
    lex_cel_rank, lex_cel_theta, ordinal_banzhaf, theta_to_string,
};
use crate::types::{CoalitionMask, Game, GameId, PlayerId, Warning, MAX_PLAYERS};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// One row of the `individuals` table (spec §4.7).
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct IndividualRow {
    pub scenario_id: String,
    pub game_id: String,
    pub player: PlayerId,
    pub shapley: Option<f64>,
    pub shapley_rank: Option<u32>,
    pub banzhaf: Option<f64>,
    pub banzhaf_rank: Option<u32>,
    pub ordinal_banzhaf_score: Option<f64>,
    pub ordinal_banzhaf_rank: Option<u32>,
    pub lex_cel_theta: Option<String>,
    pub lex_cel_rank: Option<u32>,
}

/// One row of the `coalitions` table (spec §4.7). `coalition` is the
/// serialized sorted-player-set key, e.g. `{0,2,3}`.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CoalitionRow {
    pub scenario_id: String,
    pub game_id: String,
    pub coalition: String,
    pub value: f64,
    pub shapley_interaction: Option<f64>,
    pub banzhaf_interaction: Option<f64>,
    pub group_ordinal_banzhaf_score: Option<f64>,
    pub group_lexcel_theta: Option<String>,
    pub group_lexcel_rank: Option<u32>,
}

/// One row of an axiom table (spec §4.7), keyed by
/// `(scenario_id, game_id, rule_name)`.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AxiomRow {
    pub scenario_id: String,
    pub game_id: String,
    pub rule_name: String,
    pub triggered_pairs: u64,
    pub satisfied_pairs: u64,
    pub satisfaction_rate: f64,
}

/// A non-fatal per-game note, surfaced alongside results (spec §7).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub game: GameId,
    pub warning: Warning,
}

/// A per-game fatal failure that did not abort the batch (spec §7):
/// `GameSizeExceeded` today is the only category reachable at this stage.
#[derive(Debug, Clone)]
pub struct GameFailure {
    pub game: GameId,
    pub error: CoopMetricsError,
}

/// Per-game timing/size metadata (SPEC_FULL.md §4.7 AMBIENT): a structured,
/// always-available generalization of the teacher's
/// `#[cfg(debug_assertions)]` solver-timing `eprintln!` in
/// `coalition_computation.rs`.
#[derive(Debug, Clone)]
pub struct GameReport {
    pub game: GameId,
    pub n: usize,
    pub num_coalitions: usize,
    pub elapsed: std::time::Duration,
}

/// Everything the assembler produces for a batch of games (spec §4.7, §6).
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub individuals: Vec<IndividualRow>,
    pub coalitions: Vec<CoalitionRow>,
    pub axioms_swimmy: Vec<AxiomRow>,
    pub axioms_sada: Vec<AxiomRow>,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<GameFailure>,
    pub reports: Vec<GameReport>,
}

/// Runs the full engine over a batch of games (spec §2 control flow): for
/// each game, compute the cardinal kernel on `values`, build the ordinal
/// kernel from `ranks`, compute the ordinal indices, then the axiom
/// meta-evaluators; shape everything into the long-format tables.
///
/// Games are independent and processed in parallel (spec §5); an `Internal`
/// failure aborts the whole batch immediately (re-raised, per spec §7),
/// while any other per-game failure (currently only `GameSizeExceeded`) is
/// collected into `RunOutput::failures` and the remaining games proceed.
pub fn run_games(games: &[Game], config: &RunConfig) -> Result<RunOutput> {
    let timed: Vec<(std::result::Result<GameOutcome, GameFailure>, std::time::Duration)> = games
        .par_iter()
        .map(|game| {
            let start = std::time::Instant::now();
            let result = process_game(game, config);
            (result, start.elapsed())
        })
        .collect();

    let mut out = RunOutput::default();
    for (game, (result, elapsed)) in games.iter().zip(timed) {
        out.reports.push(GameReport {
            game: game.id.clone(),
            n: game.n(),
            num_coalitions: 1usize << game.n(),
            elapsed,
        });
        match result {
            Ok(outcome) => {
                out.individuals.extend(outcome.individuals);
                out.coalitions.extend(outcome.coalitions);
                out.axioms_swimmy.extend(outcome.swimmy);
                out.axioms_sada.extend(outcome.sada);
                out.diagnostics.extend(outcome.diagnostics);
            }
            Err(failure) => {
                if matches!(failure.error, CoopMetricsError::Internal { .. }) {
                    return Err(failure.error);
                }
                out.failures.push(failure);
            }
        }
    }
    Ok(out)
}

struct GameOutcome {
    individuals: Vec<IndividualRow>,
    coalitions: Vec<CoalitionRow>,
    swimmy: Vec<AxiomRow>,
    sada: Vec<AxiomRow>,
    diagnostics: Vec<Diagnostic>,
}

fn to_masks(game: &Game, subsets: &Option<Vec<Vec<PlayerId>>>) -> Option<Vec<CoalitionMask>> {
    subsets
        .as_ref()
        .map(|groups| groups.iter().map(|g| bits_of(&game.players, g)).collect())
}

fn process_game(game: &Game, config: &RunConfig) -> std::result::Result<GameOutcome, GameFailure> {
    let n = game.n();
    let wants_exact_cardinal = config.wants(IndexName::ShapleyExact)
        || config.wants(IndexName::Banzhaf)
        || config.wants(IndexName::ShapleyInteraction)
        || config.wants(IndexName::BanzhafInteraction);
    if wants_exact_cardinal && game.has_cardinal() && n > MAX_PLAYERS {
        return Err(GameFailure {
            game: game.id.clone(),
            error: CoopMetricsError::GameSizeExceeded {
                scenario_id: game.id.scenario_id.clone(),
                game_id: game.id.game_id.clone(),
                n,
                limit: MAX_PLAYERS,
            },
        });
    }

    let mut diagnostics: Vec<Diagnostic> = game
        .diagnostics
        .iter()
        .cloned()
        .map(|warning| Diagnostic { game: game.id.clone(), warning })
        .collect();

    let mut individual_acc: BTreeMap<PlayerId, IndividualRow> = game
        .players
        .iter()
        .map(|&p| {
            (
                p,
                IndividualRow {
                    scenario_id: game.id.scenario_id.clone(),
                    game_id: game.id.game_id.clone(),
                    player: p,
                    shapley: None,
                    shapley_rank: None,
                    banzhaf: None,
                    banzhaf_rank: None,
                    ordinal_banzhaf_score: None,
                    ordinal_banzhaf_rank: None,
                    lex_cel_theta: None,
                    lex_cel_rank: None,
                },
            )
        })
        .collect();

    let mut coalition_masks: BTreeSet<CoalitionMask> = BTreeSet::new();
    let mut coalition_acc: BTreeMap<CoalitionMask, CoalitionFields> = BTreeMap::new();

    if game.has_cardinal() {
        if config.wants(IndexName::ShapleyExact) {
            let phi = shapley_exact(game);
            let ranks = dense_rank(&phi.iter().map(|(&p, &v)| (p, v)).collect::<Vec<_>>(), true);
            for (player, row) in individual_acc.iter_mut() {
                row.shapley = phi.get(player).copied();
                row.shapley_rank = ranks.get(player).copied();
            }
        }
        if config.wants(IndexName::ShapleyMc) {
            let phi = shapley_monte_carlo(game, config.num_samples);
            let ranks = dense_rank(&phi.iter().map(|(&p, &v)| (p, v)).collect::<Vec<_>>(), true);
            for (player, row) in individual_acc.iter_mut() {
                if row.shapley.is_none() {
                    row.shapley = phi.get(player).copied();
                    row.shapley_rank = ranks.get(player).copied();
                }
            }
        }
        if config.wants(IndexName::Banzhaf) {
            let (beta, warnings) = banzhaf(game, config.normalize_banzhaf);
            let ranks = dense_rank(&beta.iter().map(|(&p, &v)| (p, v)).collect::<Vec<_>>(), true);
            for (player, row) in individual_acc.iter_mut() {
                row.banzhaf = beta.get(player).copied();
                row.banzhaf_rank = ranks.get(player).copied();
            }
            diagnostics.extend(
                warnings
                    .into_iter()
                    .map(|warning| Diagnostic { game: game.id.clone(), warning }),
            );
        }

        let interaction_subsets =
            to_masks(game, &config.interaction_subsets).unwrap_or_else(|| default_interaction_subsets(n));
        coalition_masks.extend(interaction_subsets.iter().copied());

        if config.wants(IndexName::ShapleyInteraction) {
            let values = shapley_interaction_index(game, &interaction_subsets);
            for (&mask, &v) in &values {
                coalition_acc.entry(mask).or_default().shapley_interaction = Some(v);
            }
        }
        if config.wants(IndexName::BanzhafInteraction) {
            let values = banzhaf_interaction_index(game, &interaction_subsets);
            for (&mask, &v) in &values {
                coalition_acc.entry(mask).or_default().banzhaf_interaction = Some(v);
            }
        }
    }

    let quotient = match QuotientRanking::build(game) {
        Ok(q) => q,
        Err(error) => return Err(GameFailure { game: game.id.clone(), error }),
    };

    if let Some(quotient) = quotient {
        if config.wants(IndexName::OrdinalBanzhaf) {
            let (scores, ranks) = ordinal_banzhaf(game, &quotient);
            for (player, row) in individual_acc.iter_mut() {
                row.ordinal_banzhaf_score = scores.get(player).copied();
                row.ordinal_banzhaf_rank = ranks.get(player).copied();
            }
        }
        if config.wants(IndexName::LexCel) {
            let theta = lex_cel_theta(game, &quotient);
            let ranks = lex_cel_rank(game, &quotient);
            for (player, row) in individual_acc.iter_mut() {
                row.lex_cel_theta = theta.get(player).map(|t| theta_to_string(t));
                row.lex_cel_rank = ranks.get(player).copied();
            }
        }

        let group_subsets =
            to_masks(game, &config.group_subsets).unwrap_or_else(|| default_group_subsets(n));
        coalition_masks.extend(group_subsets.iter().copied());

        if config.wants(IndexName::GroupOrdinalBanzhaf) {
            let scores = group_ordinal_banzhaf(game, &quotient, &group_subsets);
            for (&mask, &v) in &scores {
                coalition_acc.entry(mask).or_default().group_ordinal_banzhaf_score = Some(v);
            }
        }
        if config.wants(IndexName::GroupLexCel) {
            let theta = group_lex_cel_theta(&quotient, &group_subsets);
            let ranks = group_lex_cel_rank(&quotient, &group_subsets);
            for (&mask, t) in &theta {
                coalition_acc.entry(mask).or_default().group_lexcel_theta = Some(theta_to_string(t));
            }
            for (&mask, &r) in &ranks {
                coalition_acc.entry(mask).or_default().group_lexcel_rank = Some(r);
            }
        }

        let mut swimmy_rows = Vec::new();
        if let Some(rule_names) = &config.axioms.swimmy_rules {
            match resolve_rules(game, Some(&quotient), rule_names, "swimmy") {
                Ok(rules) => {
                    let (reports, warnings) = evaluate_swimmy(game, &quotient, &rules);
                    swimmy_rows = reports_to_rows(game, &reports);
                    diagnostics.extend(
                        warnings
                            .into_iter()
                            .map(|warning| Diagnostic { game: game.id.clone(), warning }),
                    );
                }
                Err(error) => return Err(GameFailure { game: game.id.clone(), error }),
            }
        }

        let mut sada_rows = Vec::new();
        if let Some(rule_names) = &config.axioms.sada_rules {
            match resolve_rules(game, Some(&quotient), rule_names, "sada") {
                Ok(rules) => {
                    let (reports, warnings) = evaluate_sada(game, &quotient, &rules);
                    sada_rows = reports_to_rows(game, &reports);
                    diagnostics.extend(
                        warnings
                            .into_iter()
                            .map(|warning| Diagnostic { game: game.id.clone(), warning }),
                    );
                }
                Err(error) => return Err(GameFailure { game: game.id.clone(), error }),
            }
        }

        return finish(game, individual_acc, coalition_masks, coalition_acc, swimmy_rows, sada_rows, diagnostics);
    }

    finish(game, individual_acc, coalition_masks, coalition_acc, Vec::new(), Vec::new(), diagnostics)
}

#[derive(Default, Clone)]
struct CoalitionFields {
    shapley_interaction: Option<f64>,
    banzhaf_interaction: Option<f64>,
    group_ordinal_banzhaf_score: Option<f64>,
    group_lexcel_theta: Option<String>,
    group_lexcel_rank: Option<u32>,
}

fn reports_to_rows(game: &Game, reports: &[AxiomReport]) -> Vec<AxiomRow> {
    reports
        .iter()
        .map(|r| AxiomRow {
            scenario_id: game.id.scenario_id.clone(),
            game_id: game.id.game_id.clone(),
            rule_name: r.rule_name.clone(),
            triggered_pairs: r.triggered_pairs,
            satisfied_pairs: r.satisfied_pairs,
            satisfaction_rate: r.satisfaction_rate,
        })
        .collect()
}

fn finish(
    game: &Game,
    individual_acc: BTreeMap<PlayerId, IndividualRow>,
    coalition_masks: BTreeSet<CoalitionMask>,
    coalition_acc: BTreeMap<CoalitionMask, CoalitionFields>,
    swimmy: Vec<AxiomRow>,
    sada: Vec<AxiomRow>,
    diagnostics: Vec<Diagnostic>,
) -> std::result::Result<GameOutcome, GameFailure> {
    let coalitions = coalition_masks
        .into_iter()
        .map(|mask| {
            let fields = coalition_acc.get(&mask).cloned().unwrap_or_default();
            CoalitionRow {
                scenario_id: game.id.scenario_id.clone(),
                game_id: game.id.game_id.clone(),
                coalition: game.coalition_key(mask),
                value: game.value(mask),
                shapley_interaction: fields.shapley_interaction,
                banzhaf_interaction: fields.banzhaf_interaction,
                group_ordinal_banzhaf_score: fields.group_ordinal_banzhaf_score,
                group_lexcel_theta: fields.group_lexcel_theta,
                group_lexcel_rank: fields.group_lexcel_rank,
            }
        })
        .collect();

    Ok(GameOutcome {
        individuals: individual_acc.into_values().collect(),
        coalitions,
        swimmy,
        sada,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{build_games, GameRow};

    fn two_player_additive_config() -> (Vec<Game>, RunConfig) {
        let rows = vec![
            GameRow::new("s", "g").coalition(vec![]).value(0.0),
            GameRow::new("s", "g").coalition(vec![0]).value(1.0),
            GameRow::new("s", "g").coalition(vec![1]).value(2.0),
            GameRow::new("s", "g").coalition(vec![0, 1]).value(3.0),
        ];
        let games = build_games(rows, None, None, false).unwrap();
        let config = RunConfig::builder()
            .indices(["shapley_exact", "banzhaf", "shapley_interaction", "banzhaf_interaction"])
            .build()
            .unwrap();
        (games, config)
    }

    #[test]
    fn test_individuals_table_scenario_1() {
        let (games, config) = two_player_additive_config();
        let out = run_games(&games, &config).unwrap();
        assert_eq!(out.individuals.len(), 2);
        let p0 = out.individuals.iter().find(|r| r.player == 0).unwrap();
        assert_eq!(p0.shapley, Some(1.0));
        assert_eq!(p0.banzhaf, Some(1.0));
        let p1 = out.individuals.iter().find(|r| r.player == 1).unwrap();
        assert_eq!(p1.shapley, Some(2.0));
        assert_eq!(p1.shapley_rank, Some(1));
        assert_eq!(p0.shapley_rank, Some(2));
    }

    #[test]
    fn test_coalitions_table_has_grand_coalition_row() {
        let (games, config) = two_player_additive_config();
        let out = run_games(&games, &config).unwrap();
        let grand = out.coalitions.iter().find(|r| r.coalition == "{0,1}").unwrap();
        assert_eq!(grand.value, 3.0);
        assert!(grand.shapley_interaction.unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_game_size_exceeded_is_collected_not_fatal() {
        let mut rows = Vec::new();
        for i in 0..13u32 {
            rows.push(GameRow::new("s", "huge").coalition(vec![i]).value(1.0));
        }
        rows.push(GameRow::new("s", "small").coalition(vec![0]).value(1.0));
        rows.push(GameRow::new("s", "small").coalition(vec![1]).value(2.0));
        rows.push(GameRow::new("s", "small").coalition(vec![0, 1]).value(3.0));
        let games = build_games(rows, None, None, false).unwrap();
        let config = RunConfig::builder().indices(["shapley_exact"]).build().unwrap();
        let out = run_games(&games, &config).unwrap();
        assert_eq!(out.failures.len(), 1);
        assert!(matches!(out.failures[0].error, CoopMetricsError::GameSizeExceeded { .. }));
        assert!(out.individuals.iter().any(|r| r.game_id == "small"));
        // A report is emitted for every game, including the one that failed.
        assert_eq!(out.reports.len(), 2);
        let huge_report = out.reports.iter().find(|r| r.game.game_id == "huge").unwrap();
        assert_eq!(huge_report.n, 13);
        assert_eq!(huge_report.num_coalitions, 1 << 13);
    }

    #[test]
    fn test_game_size_exceeded_fires_for_any_exact_cardinal_index() {
        // spec §7: the guard must fire for *any* exact cardinal index, not
        // just shapley_exact.
        let rows: Vec<GameRow> = (0..13u32)
            .map(|i| GameRow::new("s", "huge").coalition(vec![i]).value(1.0))
            .collect();
        let games = build_games(rows, None, None, false).unwrap();
        for index in ["banzhaf", "shapley_interaction", "banzhaf_interaction"] {
            let config = RunConfig::builder().indices([index]).build().unwrap();
            let out = run_games(&games, &config).unwrap();
            assert_eq!(out.failures.len(), 1, "index `{index}` did not trigger GameSizeExceeded");
            assert!(matches!(out.failures[0].error, CoopMetricsError::GameSizeExceeded { .. }));
        }
    }

    #[test]
    fn test_rank_determinism_under_row_permutation() {
        let rows_a = vec![
            GameRow::new("s", "g").coalition(vec![0]).value(1.0),
            GameRow::new("s", "g").coalition(vec![1]).value(2.0),
            GameRow::new("s", "g").coalition(vec![0, 1]).value(3.0),
            GameRow::new("s", "g").coalition(vec![]).value(0.0),
        ];
        let mut rows_b = rows_a.clone();
        rows_b.reverse();

        let config = RunConfig::builder().indices(["shapley_exact"]).build().unwrap();
        let games_a = build_games(rows_a, None, None, false).unwrap();
        let games_b = build_games(rows_b, None, None, false).unwrap();
        let out_a = run_games(&games_a, &config).unwrap();
        let out_b = run_games(&games_b, &config).unwrap();

        let mut a = out_a.individuals.clone();
        let mut b = out_b.individuals.clone();
        a.sort_by_key(|r| r.player);
        b.sort_by_key(|r| r.player);
        assert_eq!(a, b);
    }
}
