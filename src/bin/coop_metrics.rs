//! Reference CLI entry point, gated behind `required-features = ["cli"]`
//! (spec §6), grounded on the teacher's `cli`-gated binary convention and
//! its builder-call + match-on-`Result` `main` (`src/main.rs`).

use clap::Parser;
use coop_metrics::{
    io::{default_output_dir, read_input_csv, write_output_tables},
    run_games, GameFailure, RankingMode, RunConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Computes cardinal and ordinal contribution indices over a coalition table.
#[derive(Debug, Parser)]
#[command(name = "coop-metrics", version, about)]
struct Cli {
    /// Input CSV: scenario_id, game_id, coalition, value?, rank?
    input: PathBuf,

    /// Indices to compute, comma-separated (default: all nine).
    #[arg(long, value_delimiter = ',')]
    indices: Option<Vec<String>>,

    /// Monte-Carlo sample count for `shapley_mc`.
    #[arg(long, default_value_t = 10_000)]
    num_samples: usize,

    /// Normalize Banzhaf scores to sum of absolute values.
    #[arg(long)]
    normalize_banzhaf: bool,

    /// Rank-synthesis mode when the input has no `rank` column.
    #[arg(long, value_enum)]
    ranking_mode: Option<RankingModeArg>,

    /// Bin width for `--ranking-mode bin`.
    #[arg(long)]
    bin_width: Option<f64>,

    /// Larger `value` means better (rank 1) when synthesizing ranks.
    #[arg(long)]
    descending: bool,

    /// Swimmy axiom rule names, comma-separated; enables the Swimmy evaluator.
    #[arg(long, value_delimiter = ',')]
    swimmy_rules: Option<Vec<String>>,

    /// SADA axiom rule names, comma-separated; enables the SADA evaluator.
    #[arg(long, value_delimiter = ',')]
    sada_rules: Option<Vec<String>>,

    /// Output directory; defaults to `outputs/<parent-of-input>/<stem>/`.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum RankingModeArg {
    Dense,
    Bin,
}

const DEFAULT_INDICES: &[&str] = &[
    "shapley_exact",
    "banzhaf",
    "shapley_interaction",
    "banzhaf_interaction",
    "ordinal_banzhaf",
    "lex_cel",
    "group_ordinal_banzhaf",
    "group_lex_cel",
];

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let indices = cli
        .indices
        .unwrap_or_else(|| DEFAULT_INDICES.iter().map(|s| s.to_string()).collect());

    let mut builder = RunConfig::builder()
        .indices(indices)
        .num_samples(cli.num_samples)
        .normalize_banzhaf(cli.normalize_banzhaf);

    if let Some(mode) = cli.ranking_mode {
        let ranking_mode = match mode {
            RankingModeArg::Dense => RankingMode::Dense,
            RankingModeArg::Bin => RankingMode::Bin {
                bin_width: cli.bin_width.unwrap_or(0.0),
            },
        };
        builder = builder.ranking(ranking_mode, cli.descending);
    }
    if let Some(rules) = cli.swimmy_rules {
        builder = builder.swimmy_rules(rules);
    }
    if let Some(rules) = cli.sada_rules {
        builder = builder.sada_rules(rules);
    }

    let config = builder.build().map_err(|e| e.to_string())?;

    let rows = read_input_csv(&cli.input).map_err(|e| e.to_string())?;
    let ranking_mode = config.ranking.map(|r| r.mode);
    let descending = config.ranking.map(|r| r.descending).unwrap_or(false);
    let games = coop_metrics::build_games(rows, config.players.as_deref(), ranking_mode, descending)
        .map_err(|e| e.to_string())?;

    let output = run_games(&games, &config).map_err(|e| e.to_string())?;

    for GameFailure { game, error } in &output.failures {
        log::warn!("game {game} failed: {error}");
    }
    for diagnostic in &output.diagnostics {
        log::warn!("game {}: {}", diagnostic.game, diagnostic.warning);
    }
    for report in &output.reports {
        log::debug!(
            "game {} ({} players, {} coalitions) took {:?}",
            report.game,
            report.n,
            report.num_coalitions,
            report.elapsed
        );
    }

    let output_dir = cli.output_dir.unwrap_or_else(|| default_output_dir(&cli.input));
    write_output_tables(&output_dir, &output).map_err(|e| e.to_string())?;

    print_summary(&games, &output, &output_dir);
    Ok(())
}

/// One row of the console run summary, grounded on the teacher's
/// `tabled::Table` + `Style::rounded()` console output in
/// `examples/csv_demand1.rs`.
#[derive(tabled::Tabled)]
struct SummaryRow {
    scenario_id: String,
    game_id: String,
    players: usize,
    failed: bool,
}

fn print_summary(games: &[coop_metrics::Game], output: &coop_metrics::RunOutput, output_dir: &std::path::Path) {
    let failed: std::collections::BTreeSet<_> = output.failures.iter().map(|f| f.game.clone()).collect();
    let rows: Vec<SummaryRow> = games
        .iter()
        .map(|g| SummaryRow {
            scenario_id: g.id.scenario_id.clone(),
            game_id: g.id.game_id.clone(),
            players: g.n(),
            failed: failed.contains(&g.id),
        })
        .collect();

    let mut table = tabled::Table::new(rows);
    table.with(tabled::settings::Style::rounded());
    println!("{table}");
    println!(
        "wrote {} individual rows and {} coalition rows to {}",
        output.individuals.len(),
        output.coalitions.len(),
        output_dir.display()
    );
}
