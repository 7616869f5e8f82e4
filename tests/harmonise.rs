//! Integration tests for the `harmonise` command.
use float_cmp::assert_approx_eq;
use std::path::PathBuf;
use tempfile::tempdir;
use times2lca::cli::{HarmoniseOpts, handle_harmonise_command};
use times2lca::harmonisation::{HarmonisationTag, HarmonisationValue};
use times2lca::input::read_inventory;
use times2lca::inventory::{ActivityKey, InventoryStore};
use times2lca::log::is_logger_initialised;
use times2lca::settings::Settings;

/// Get the path to the demo inventory.
fn get_inventory_dir() -> PathBuf {
    PathBuf::from("demos/coal_plant")
}

/// An integration test for the `harmonise` command.
///
/// The harmonised inventory is read back and checked against the plan's steps.
#[test]
fn test_handle_harmonise_command() {
    unsafe { std::env::set_var("TIMES2LCA_LOG_LEVEL", "off") };

    assert!(!is_logger_initialised());

    // Save results to non-existent directory to check that directory creation works
    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = HarmoniseOpts {
        output_dir: Some(output_dir.clone()),
        overwrite: false,
    };
    handle_harmonise_command(
        &get_inventory_dir(),
        &get_inventory_dir().join("plan.toml"),
        &opts,
        Some(Settings::default()),
    )
    .unwrap();

    assert!(is_logger_initialised());
    assert!(output_dir.join("times2lca_info.log").is_file());

    let store = read_inventory(&output_dir).unwrap();
    let key = ActivityKey::new("ei/coal_plant_de");

    let technosphere = store.technosphere(&key).unwrap();
    let coal: Vec<_> = technosphere.iter().filter(|ex| ex.name == "hard coal").collect();
    assert_eq!(coal.len(), 1);
    assert_eq!(coal[0].input, ActivityKey::new("ei/hard_coal_import"));
    assert_approx_eq!(f64, coal[0].amount, 0.35 * 0.9);

    let diesel: Vec<_> = technosphere.iter().filter(|ex| ex.name == "diesel").collect();
    assert_eq!(diesel.len(), 1);
    assert_approx_eq!(f64, diesel[0].amount, 0.0004);

    for ex in store.biosphere(&key).unwrap() {
        match ex.name.as_str() {
            "Carbon dioxide, fossil" => {
                assert_approx_eq!(f64, ex.amount, 0.82 * 0.9);
            }
            "Mercury" => {
                assert_approx_eq!(f64, ex.amount, 2e-9);
            }
            _ => {}
        }
    }

    let record = store.activity(&key).unwrap().harmonisation.clone().unwrap();
    for tag in [
        HarmonisationTag::TechnosphereOrigin,
        HarmonisationTag::EfficiencyScaled,
    ] {
        assert_eq!(record.get(tag), Some(&HarmonisationValue::Flag(true)));
    }
    assert_eq!(
        record.get(HarmonisationTag::TimesProcessCode),
        Some(&HarmonisationValue::Text("ELCCOA00".into()))
    );
}
