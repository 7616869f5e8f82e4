//! Integration tests for the `screen` command.
use std::path::PathBuf;
use tempfile::tempdir;
use times2lca::cli::{ScreenOpts, handle_screen_command};
use times2lca::settings::Settings;
use times2lca::times::DEFAULT_BIOSPHERE_PATTERN;

/// Get the path to the demo TIMES results.
fn get_times_dir() -> PathBuf {
    PathBuf::from("demos/times")
}

/// An integration test for the `screen` command.
#[test]
fn test_handle_screen_command() {
    unsafe { std::env::set_var("TIMES2LCA_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let output = tempdir.path().join("screening.csv");
    let opts = ScreenOpts {
        cutoff: None,
        emissions: DEFAULT_BIOSPHERE_PATTERN.to_string(),
        output: Some(output.clone()),
    };
    handle_screen_command(
        &get_times_dir().join("baseline.csv"),
        &get_times_dir().join("alternative.csv"),
        &opts,
        Some(Settings::default()),
    )
    .unwrap();

    // Coal covers about 90% of the change, so gas and the residential boiler are needed to pass
    // the default cutoff of 0.95
    let mut reader = csv::Reader::from_path(&output).unwrap();
    let processes: Vec<String> = reader
        .records()
        .map(|record| record.unwrap()[0].to_string())
        .collect();
    assert_eq!(processes, ["ELCCOA00", "ELCGAS00", "RESBOI00"]);
}
