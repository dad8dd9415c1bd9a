use thiserror::Error;

/// Error categories for the cooperative-game metrics engine (spec §7).
///
/// `InputSchema` and `InconsistentConfig` are checked before any game runs
/// and abort the whole batch; the remaining categories are per-game and are
/// either non-fatal (`NumericDegenerate`, carried as a [`crate::types::Warning`])
/// or fatal-but-scoped (`GameSizeExceeded`, `Internal`).
#[derive(Debug, Error)]
pub enum CoopMetricsError {
    /// Missing required columns, duplicate coalition rows, non-integer ranks.
    #[error("missing required column(s) {columns:?} in input table")]
    MissingColumns { columns: Vec<String> },

    #[error(
        "duplicate row for (scenario_id={scenario_id}, game_id={game_id}, coalition={coalition})"
    )]
    DuplicateCoalitionRow {
        scenario_id: String,
        game_id: String,
        coalition: String,
    },

    #[error("rank value {value} for coalition {coalition} is not a positive integer")]
    NonIntegerRank { coalition: String, value: f64 },

    /// n > 12 with an exact cardinal index requested; Monte-Carlo remains available.
    #[error(
        "game (scenario_id={scenario_id}, game_id={game_id}) has {n} players, exceeding the \
         exact-index limit of {limit}; use shapley_mc instead of shapley_exact"
    )]
    GameSizeExceeded {
        scenario_id: String,
        game_id: String,
        n: usize,
        limit: usize,
    },

    /// Rank synthesis requested but no `value` column; `bin` mode without
    /// `bin_width`; unknown index name; axiom enabled but no rules resolvable.
    #[error("rank synthesis was requested but the input has no `value` column")]
    RankSynthesisNeedsValue,

    #[error("ranking mode `bin` requires a positive `bin_width`")]
    MissingBinWidth,

    #[error("unknown index name `{name}`")]
    UnknownIndex { name: String },

    #[error("axiom `{axiom}` is enabled but resolves to zero synergy-comparison rules")]
    NoResolvableRules { axiom: String },

    /// Invariant violations — always fatal, bug signal.
    #[error(
        "internal invariant violated in game (scenario_id={scenario_id}, game_id={game_id}): {detail}"
    )]
    Internal {
        scenario_id: String,
        game_id: String,
        detail: String,
    },

    #[cfg(feature = "serde")]
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "cli")]
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoopMetricsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoopMetricsError::MissingColumns {
            columns: vec!["value".to_string(), "rank".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "missing required column(s) [\"value\", \"rank\"] in input table"
        );

        let err = CoopMetricsError::GameSizeExceeded {
            scenario_id: "s1".to_string(),
            game_id: "g1".to_string(),
            n: 13,
            limit: 12,
        };
        assert!(err.to_string().contains("13 players"));

        let err = CoopMetricsError::NoResolvableRules {
            axiom: "swimmy".to_string(),
        };
        assert!(err.to_string().contains("swimmy"));
    }
}
