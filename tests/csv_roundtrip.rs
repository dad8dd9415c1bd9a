//! CSV round-trip through the reference I/O layer (spec §6), gated behind
//! the `cli` feature exactly like the teacher gates its own CSV-fixture
//! tests on the crate's optional features.
#![cfg(feature = "cli")]

use coop_metrics::io::{read_input_csv, write_output_tables};
use coop_metrics::{build_games, run_games, RunConfig};
use std::io::Write;

fn write_fixture(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn read_input_csv_round_trips_coalition_wire_form() {
    let input = write_fixture(
        "coop-metrics-test-round-trip.csv",
        "scenario_id,game_id,coalition,value,rank\n\
         s1,g1,{},0.0,\n\
         s1,g1,{0},1.0,\n\
         s1,g1,{1},2.0,\n\
         s1,g1,{0,1},3.0,\n",
    );

    let rows = read_input_csv(&input).unwrap();
    assert_eq!(rows.len(), 4);

    let games = build_games(rows, None, None, false).unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].players, vec![0, 1]);

    let config = RunConfig::builder().indices(["shapley_exact"]).build().unwrap();
    let output = run_games(&games, &config).unwrap();

    let out_dir = std::env::temp_dir().join("coop-metrics-test-round-trip-out");
    write_output_tables(&out_dir, &output).unwrap();

    assert!(out_dir.join("individuals.csv").exists());
    assert!(out_dir.join("coalitions.csv").exists());
    assert!(!out_dir.join("axioms_swimmy.csv").exists());

    std::fs::remove_file(&input).ok();
    std::fs::remove_dir_all(&out_dir).ok();
}

#[test]
fn read_input_csv_rejects_malformed_coalition() {
    let input = write_fixture(
        "coop-metrics-test-malformed.csv",
        "scenario_id,game_id,coalition,value,rank\n\
         s1,g1,0-1,1.0,\n",
    );
    assert!(read_input_csv(&input).is_err());
    std::fs::remove_file(&input).ok();
}
