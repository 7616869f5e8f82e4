//! The module responsible for writing output data to disk.
use crate::input::inventory::{ACTIVITIES_FILE_NAME, EXCHANGES_FILE_NAME};
use crate::inventory::memory::MemoryStore;
use crate::inventory::{Activity, ActivityKey, Exchange, ExchangeKind};
use crate::screening::ScreeningRow;
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The root folder in which inventory-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "times2lca_results";

/// Get the default output directory for the inventory in the specified directory
pub fn get_output_dir(inventory_dir: &Path) -> Result<PathBuf> {
    // Get the inventory name from the dir path
    let inventory_dir = inventory_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to inventory")?;

    let inventory_name = inventory_dir
        .file_name()
        .context("Inventory cannot be in root folder")?
        .to_str()
        .context("Invalid chars in inventory dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, inventory_name].iter().collect())
}

/// Create a new output directory, deleting the existing one if allowed.
///
/// # Arguments
///
/// * `output_dir` - The folder to create
/// * `allow_overwrite` - Whether an existing, non-empty folder may be replaced
///
/// # Returns
///
/// Whether an existing folder was overwritten, or an error.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the activities CSV file
#[derive(Serialize, Debug, PartialEq)]
struct ActivityRow<'a> {
    key: &'a ActivityKey,
    name: &'a str,
    reference_product: &'a str,
    unit: &'a str,
    production_amount: f64,
    location: &'a str,
    classifications: String,
    harmonisation: String,
}

impl<'a> ActivityRow<'a> {
    fn new(activity: &'a Activity) -> Self {
        Self {
            key: &activity.key,
            name: &activity.name,
            reference_product: &activity.reference_product,
            unit: &activity.unit,
            production_amount: activity.production_amount,
            location: &activity.location,
            classifications: activity
                .classifications
                .iter()
                .map(|(system, value)| format!("{system}={value}"))
                .join(";"),
            harmonisation: activity
                .harmonisation
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

/// Represents a row in the exchanges CSV file
#[derive(Serialize, Debug, PartialEq)]
struct ExchangeRow<'a> {
    activity: &'a ActivityKey,
    input: &'a ActivityKey,
    name: &'a str,
    unit: &'a str,
    amount: f64,
    #[serde(rename = "type")]
    kind: ExchangeKind,
    categories: String,
    comment: Option<&'a str>,
}

impl<'a> ExchangeRow<'a> {
    fn new(exchange: &'a Exchange) -> Self {
        Self {
            activity: &exchange.output,
            input: &exchange.input,
            name: &exchange.name,
            unit: &exchange.unit,
            amount: exchange.amount,
            kind: exchange.kind,
            categories: exchange.categories.join("/"),
            comment: exchange.comment.as_deref(),
        }
    }
}

/// Write an inventory to `activities.csv` and `exchanges.csv` in the given folder.
///
/// The files can be read back with [`crate::input::read_inventory`].
pub fn write_inventory(output_dir: &Path, store: &MemoryStore) -> Result<()> {
    let activities_path = output_dir.join(ACTIVITIES_FILE_NAME);
    let mut writer = csv::Writer::from_path(&activities_path)
        .with_context(|| format!("Could not create {}", activities_path.display()))?;
    for activity in store.iter_activities() {
        writer.serialize(ActivityRow::new(activity))?;
    }
    writer.flush()?;

    let exchanges_path = output_dir.join(EXCHANGES_FILE_NAME);
    let mut writer = csv::Writer::from_path(&exchanges_path)
        .with_context(|| format!("Could not create {}", exchanges_path.display()))?;
    for exchange in store.iter_exchanges() {
        writer.serialize(ExchangeRow::new(exchange))?;
    }
    writer.flush()?;

    Ok(())
}

/// Write a screening table as CSV
pub fn write_screening<W: io::Write>(writer: W, rows: &[ScreeningRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}
