//! Code for reading an inventory database from `activities.csv` and `exchanges.csv`.
use super::*;
use crate::harmonisation::HarmonisationRecord;
use crate::id::IDCollection;
use crate::inventory::memory::MemoryStore;
use crate::inventory::{Activity, ActivityKey, ExchangeKind, InventoryStore, NewExchange};
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use serde::Deserialize;
use std::path::Path;

/// The file containing the activities of an inventory
pub const ACTIVITIES_FILE_NAME: &str = "activities.csv";

/// The file containing the exchanges of an inventory
pub const EXCHANGES_FILE_NAME: &str = "exchanges.csv";

#[derive(Deserialize, PartialEq, Debug)]
struct ActivityRaw {
    key: String,
    name: String,
    reference_product: String,
    unit: String,
    production_amount: f64,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    classifications: Option<String>,
    #[serde(default)]
    harmonisation: Option<String>,
}

#[derive(Deserialize, PartialEq, Debug)]
struct ExchangeRaw {
    activity: String,
    input: String,
    name: String,
    unit: String,
    amount: f64,
    #[serde(rename = "type")]
    kind: ExchangeKind,
    #[serde(default)]
    categories: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

/// Read an inventory from the specified directory.
///
/// # Arguments
///
/// * `inventory_dir` - Folder containing `activities.csv` and `exchanges.csv`
///
/// # Returns
///
/// A [`MemoryStore`] holding the inventory, with exchanges in file order.
pub fn read_inventory(inventory_dir: &Path) -> Result<MemoryStore> {
    let activities_path = inventory_dir.join(ACTIVITIES_FILE_NAME);
    let activities = read_csv(&activities_path)?;
    let mut store = read_activities_from_iter(activities)
        .with_context(|| input_err_msg(&activities_path))?;

    let exchanges_path = inventory_dir.join(EXCHANGES_FILE_NAME);
    let exchanges = read_csv_optional(&exchanges_path)?;
    read_exchanges_from_iter(&mut store, exchanges)
        .with_context(|| input_err_msg(&exchanges_path))?;

    Ok(store)
}

fn read_activities_from_iter<I>(iter: I) -> Result<MemoryStore>
where
    I: Iterator<Item = ActivityRaw>,
{
    let mut store = MemoryStore::new();
    for raw in iter {
        ensure!(
            raw.production_amount.is_finite(),
            "Production amount of activity {} must be finite",
            raw.key
        );

        let classifications = match raw.classifications.as_deref() {
            Some(s) => parse_classifications(s)?,
            None => Vec::new(),
        };
        let harmonisation = raw
            .harmonisation
            .as_deref()
            .map(str::parse::<HarmonisationRecord>)
            .transpose()
            .with_context(|| format!("Invalid harmonisation record for activity {}", raw.key))?;

        store.add_activity(Activity {
            key: raw.key.into(),
            name: raw.name,
            reference_product: raw.reference_product,
            unit: raw.unit,
            production_amount: raw.production_amount,
            location: raw.location.unwrap_or_default(),
            classifications,
            harmonisation,
        })?;
    }

    Ok(store)
}

fn read_exchanges_from_iter<I>(store: &mut MemoryStore, iter: I) -> Result<()>
where
    I: Iterator<Item = ExchangeRaw>,
{
    let activity_keys: IndexSet<ActivityKey> = store
        .iter_activities()
        .map(|activity| activity.key.clone())
        .collect();

    for raw in iter {
        let output = activity_keys.get_id_by_str(&raw.activity)?;

        // Biosphere flows refer to elementary flows, which are not activities
        let input = match raw.kind {
            ExchangeKind::Biosphere => ActivityKey::from(raw.input),
            _ => activity_keys.get_id_by_str(&raw.input)?,
        };
        ensure!(
            raw.amount.is_finite(),
            "Amount of exchange \"{}\" on activity {output} must be finite",
            raw.name
        );

        let categories = raw
            .categories
            .as_deref()
            .map(parse_categories)
            .unwrap_or_default();
        store.create_exchange(
            &output,
            NewExchange {
                input,
                name: raw.name,
                unit: raw.unit,
                amount: raw.amount,
                kind: raw.kind,
                categories,
                comment: raw.comment,
            },
        )?;
    }

    Ok(())
}

/// Parse a list of classifications of the form `system=value;system=value`
fn parse_classifications(s: &str) -> Result<Vec<(String, String)>> {
    s.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (system, value) = entry.split_once('=').with_context(|| {
                format!("Invalid classification: {entry} (expected system=value)")
            })?;
            Ok((system.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Parse a `/`-separated compartment path (e.g. `air/urban air close to ground`)
fn parse_categories(s: &str) -> Vec<String> {
    s.split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}
