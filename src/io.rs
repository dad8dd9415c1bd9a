//! Reference CSV reader/writer (spec §6), gated behind the `cli` feature.
//!
//! This is explicitly *not* the production tabular-I/O collaborator spec.md
//! §1 calls out as out-of-scope — it exists so the crate is runnable
//! end-to-end from a checkout, exactly as the teacher ships
//! `examples/csv_demand1.rs` (`csv::Reader::from_reader` + `.deserialize()`)
//! alongside its LP core.

use crate::assembler::RunOutput;
use crate::error::{CoopMetricsError, Result};
use crate::types::{GameRow, PlayerId};
use std::path::{Path, PathBuf};

/// One row of the input table (spec §6): `coalition` is the wire form
/// `{0,2,3}` (or an empty `{}` for the empty coalition).
#[derive(Debug, Clone, serde::Deserialize)]
struct InputRecord {
    scenario_id: String,
    game_id: String,
    coalition: String,
    value: Option<f64>,
    rank: Option<u32>,
}

/// Parses the wire coalition form `{0,2,3}` into a sorted player list (spec
/// §4.1: "coalition is a canonicalized set of player ids").
fn parse_coalition(raw: &str) -> Result<Vec<PlayerId>> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| CoopMetricsError::MissingColumns {
            columns: vec![format!("malformed coalition `{raw}`")],
        })?;
    if inner.is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<PlayerId>()
                .map_err(|_| CoopMetricsError::MissingColumns {
                    columns: vec![format!("non-integer player id in coalition `{raw}`")],
                })
        })
        .collect()
}

/// Reads the input table (spec §6) from a CSV file into validated
/// [`GameRow`]s.
pub fn read_input_csv(path: &Path) -> Result<Vec<GameRow>> {
    let file = std::fs::File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let record: InputRecord = result?;
        let coalition = parse_coalition(&record.coalition)?;
        let mut row = GameRow::new(record.scenario_id, record.game_id).coalition(coalition);
        if let Some(v) = record.value {
            row = row.value(v);
        }
        if let Some(r) = record.rank {
            row = row.rank(r);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Output path convention (spec §6): `outputs/<parent-of-input>/<stem>/`,
/// honored by this reference CLI only — the core library never touches a
/// filesystem path (spec §5).
pub fn default_output_dir(input_path: &Path) -> PathBuf {
    let empty = std::ffi::OsStr::new("");
    let stem = input_path.file_stem().unwrap_or(empty);
    let parent_name = input_path.parent().and_then(|p| p.file_name()).unwrap_or(empty);
    PathBuf::from("outputs").join(parent_name).join(stem)
}

fn write_csv<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `individuals.csv` and `coalitions.csv`, plus `axioms_swimmy.csv`
/// and `axioms_sada.csv` when the run produced any axiom rows (spec §6).
pub fn write_output_tables(output_dir: &Path, output: &RunOutput) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    write_csv(&output_dir.join("individuals.csv"), &output.individuals)?;
    write_csv(&output_dir.join("coalitions.csv"), &output.coalitions)?;
    if !output.axioms_swimmy.is_empty() {
        write_csv(&output_dir.join("axioms_swimmy.csv"), &output.axioms_swimmy)?;
    }
    if !output.axioms_sada.is_empty() {
        write_csv(&output_dir.join("axioms_sada.csv"), &output.axioms_sada)?;
    }
    Ok(())
}
