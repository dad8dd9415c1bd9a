//! Configuration surface the core consumes (spec §6): `indices`, `ranking`,
//! `players`, `axioms`.
//!
//! Grounded on the teacher's `NetworkShapleyBuilder` (`.operator_uptime(...)`,
//! `.hybrid_penalty(...)`, `.build()`) generalized from "LP run parameters"
//! to "which indices to compute and with what options"; the builder's
//! `build()` resolves `InconsistentConfig` failures (spec §7) before any
//! game runs, matching the teacher's `NetworkShapleyBuilderError` surfacing
//! through `build()`.

use crate::error::{CoopMetricsError, Result};
use crate::types::{PlayerId, RankingMode};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the nine indices the core can compute (spec §6).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexName {
    ShapleyExact,
    ShapleyMc,
    Banzhaf,
    ShapleyInteraction,
    BanzhafInteraction,
    OrdinalBanzhaf,
    LexCel,
    GroupOrdinalBanzhaf,
    GroupLexCel,
}

impl IndexName {
    /// Parses the wire name used in `indices` lists (spec §6).
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "shapley_exact" => IndexName::ShapleyExact,
            "shapley_mc" => IndexName::ShapleyMc,
            "banzhaf" => IndexName::Banzhaf,
            "shapley_interaction" => IndexName::ShapleyInteraction,
            "banzhaf_interaction" => IndexName::BanzhafInteraction,
            "ordinal_banzhaf" => IndexName::OrdinalBanzhaf,
            "lex_cel" => IndexName::LexCel,
            "group_ordinal_banzhaf" => IndexName::GroupOrdinalBanzhaf,
            "group_lex_cel" => IndexName::GroupLexCel,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexName::ShapleyExact => "shapley_exact",
            IndexName::ShapleyMc => "shapley_mc",
            IndexName::Banzhaf => "banzhaf",
            IndexName::ShapleyInteraction => "shapley_interaction",
            IndexName::BanzhafInteraction => "banzhaf_interaction",
            IndexName::OrdinalBanzhaf => "ordinal_banzhaf",
            IndexName::LexCel => "lex_cel",
            IndexName::GroupOrdinalBanzhaf => "group_ordinal_banzhaf",
            IndexName::GroupLexCel => "group_lex_cel",
        }
    }
}

/// Axiom-evaluator configuration (spec §6 `axioms`): a rule list per axiom;
/// the axiom is skipped entirely when its entry is `None`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct AxiomsConfig {
    pub swimmy_rules: Option<Vec<String>>,
    pub sada_rules: Option<Vec<String>>,
}

/// Ranking synthesis configuration (spec §6 `ranking`).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct RankingConfig {
    pub mode: RankingMode,
    pub descending: bool,
}

/// Fully resolved run configuration (spec §6), produced only via
/// [`RunConfigBuilder::build`] so every `InconsistentConfig` failure is
/// caught before any game runs (spec §7).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub indices: Vec<IndexName>,
    pub num_samples: usize,
    pub normalize_banzhaf: bool,
    /// `None` selects the default family (spec §4.3: all `2 <= |S| <= n`).
    pub interaction_subsets: Option<Vec<Vec<PlayerId>>>,
    /// `None` selects the default family (spec §4.5: all `|T| >= 2`).
    pub group_subsets: Option<Vec<Vec<PlayerId>>>,
    pub ranking: Option<RankingConfig>,
    pub players: Option<Vec<PlayerId>>,
    pub axioms: AxiomsConfig,
}

impl RunConfig {
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::new()
    }

    pub fn wants(&self, index: IndexName) -> bool {
        self.indices.contains(&index)
    }
}

/// Builds a [`RunConfig`], mirroring the teacher's chained-setter builder
/// (`NetworkShapleyBuilder::new(...).operator_uptime(...).build()`).
#[derive(Debug, Clone, Default)]
pub struct RunConfigBuilder {
    indices: Vec<String>,
    num_samples: usize,
    normalize_banzhaf: bool,
    interaction_subsets: Option<Vec<Vec<PlayerId>>>,
    group_subsets: Option<Vec<Vec<PlayerId>>>,
    ranking: Option<RankingConfig>,
    players: Option<Vec<PlayerId>>,
    axioms: AxiomsConfig,
}

impl RunConfigBuilder {
    pub fn new() -> Self {
        Self {
            num_samples: 10_000,
            ..Default::default()
        }
    }

    pub fn indices(mut self, indices: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.indices = indices.into_iter().map(Into::into).collect();
        self
    }

    pub fn num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }

    pub fn normalize_banzhaf(mut self, normalize: bool) -> Self {
        self.normalize_banzhaf = normalize;
        self
    }

    pub fn interaction_subsets(mut self, subsets: Vec<Vec<PlayerId>>) -> Self {
        self.interaction_subsets = Some(subsets);
        self
    }

    pub fn group_subsets(mut self, subsets: Vec<Vec<PlayerId>>) -> Self {
        self.group_subsets = Some(subsets);
        self
    }

    pub fn ranking(mut self, mode: RankingMode, descending: bool) -> Self {
        self.ranking = Some(RankingConfig { mode, descending });
        self
    }

    pub fn players(mut self, players: Vec<PlayerId>) -> Self {
        self.players = Some(players);
        self
    }

    pub fn swimmy_rules(mut self, rules: Vec<String>) -> Self {
        self.axioms.swimmy_rules = Some(rules);
        self
    }

    pub fn sada_rules(mut self, rules: Vec<String>) -> Self {
        self.axioms.sada_rules = Some(rules);
        self
    }

    /// Resolves `indices` to [`IndexName`]s and validates `ranking` (spec
    /// §7 `InconsistentConfig`): an unknown index name or a `bin` mode with
    /// a non-positive `bin_width` is fatal here, before any game runs.
    pub fn build(self) -> Result<RunConfig> {
        let mut resolved = Vec::with_capacity(self.indices.len());
        for name in &self.indices {
            match IndexName::parse(name) {
                Some(idx) => resolved.push(idx),
                None => {
                    return Err(CoopMetricsError::UnknownIndex {
                        name: name.clone(),
                    });
                }
            }
        }

        if let Some(RankingConfig { mode: RankingMode::Bin { bin_width }, .. }) = self.ranking {
            if bin_width <= 0.0 {
                return Err(CoopMetricsError::MissingBinWidth);
            }
        }

        Ok(RunConfig {
            indices: resolved,
            num_samples: self.num_samples,
            normalize_banzhaf: self.normalize_banzhaf,
            interaction_subsets: self.interaction_subsets,
            group_subsets: self.group_subsets,
            ranking: self.ranking,
            players: self.players,
            axioms: self.axioms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_index_is_fatal() {
        let err = RunConfig::builder()
            .indices(["shapley_exact", "not_a_real_index"])
            .build()
            .unwrap_err();
        assert!(matches!(err, CoopMetricsError::UnknownIndex { .. }));
    }

    #[test]
    fn test_bin_mode_without_bin_width_is_fatal() {
        let err = RunConfig::builder()
            .indices(["shapley_exact"])
            .ranking(RankingMode::Bin { bin_width: 0.0 }, false)
            .build()
            .unwrap_err();
        assert!(matches!(err, CoopMetricsError::MissingBinWidth));
    }

    #[test]
    fn test_builder_resolves_indices() {
        let config = RunConfig::builder()
            .indices(["shapley_exact", "banzhaf"])
            .build()
            .unwrap();
        assert!(config.wants(IndexName::ShapleyExact));
        assert!(config.wants(IndexName::Banzhaf));
        assert!(!config.wants(IndexName::LexCel));
    }
}
