//! Cardinal and ordinal contribution indices for cooperative-game coalition
//! tables.
//!
//! The core pipeline (spec §2): build [`types::Game`]s from validated rows,
//! compute the cardinal indices ([`cardinal`]) on `values` and the ordinal
//! indices ([`ordinal`], [`ordinal_indices`]) on `ranks`, evaluate the axiom
//! meta-evaluators ([`axioms`]), then shape everything into the long-format
//! result tables ([`assembler`]). [`config`] is the structured options
//! surface a host passes in; [`io`] (feature `cli`) is a reference CSV
//! reader/writer, not the production I/O collaborator.

pub mod assembler;
pub mod axioms;
pub mod cardinal;
pub mod config;
pub mod error;
pub mod kernel;
pub mod ordinal;
pub mod ordinal_indices;
pub mod types;

#[cfg(feature = "cli")]
pub mod io;

pub use assembler::{
    run_games, AxiomRow, CoalitionRow, Diagnostic, GameFailure, GameReport, IndividualRow, RunOutput,
};
pub use config::{AxiomsConfig, IndexName, RankingConfig, RunConfig, RunConfigBuilder};
pub use error::{CoopMetricsError, Result};
pub use types::{build_games, Game, GameId, GameRow, GameType, PlayerId, RankingMode, Warning, MAX_PLAYERS};
