//! Code for reading TIMES model results exported as CSV.
//!
//! The export has a two-row header. The first row holds the year of each data column and the
//! second its time slice. The label columns (`Scenario`, `Attribute`, `Commodity` and `Process`)
//! are named in the second row and may come in any order. Columns which are blank in both header
//! rows (e.g. a row index) are ignored.
use super::*;
use crate::times::{TimesRecord, TimesTable};
use anyhow::{Context, Result, ensure};
use csv::StringRecord;
use indexmap::IndexSet;
use itertools::Itertools;
use log::info;
use std::path::Path;

/// A label column of a TIMES export
#[derive(Clone, Copy, PartialEq, Eq, Debug, strum::EnumString, strum::Display)]
#[strum(ascii_case_insensitive)]
enum Label {
    Scenario,
    Attribute,
    Commodity,
    Process,
}

#[derive(PartialEq, Debug)]
enum Column {
    Label(Label),
    Data { year: u32, time_slice: String },
    Ignored,
}

/// Read the results of a single TIMES scenario from a CSV file.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
///
/// # Returns
///
/// A [`TimesTable`] with one record per non-empty value, or an error if the file is malformed or
/// holds results for more than one scenario.
pub fn read_times_table(file_path: &Path) -> Result<TimesTable> {
    let rows = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_records()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    read_times_table_from_iter(rows.into_iter()).with_context(|| input_err_msg(file_path))
}

fn read_times_table_from_iter<I>(mut rows: I) -> Result<TimesTable>
where
    I: Iterator<Item = StringRecord>,
{
    let years = rows.next().context("Missing year header row")?;
    let time_slices = rows.next().context("Missing time slice header row")?;
    let columns = parse_header(&years, &time_slices)?;

    let label_index = |label: Label| -> Result<usize> {
        let indexes = columns
            .iter()
            .positions(|column| *column == Column::Label(label))
            .collect_vec();
        ensure!(indexes.len() == 1, "Expected exactly one {label} column");
        Ok(indexes[0])
    };
    let scenario_idx = label_index(Label::Scenario)?;
    let attribute_idx = label_index(Label::Attribute)?;
    let commodity_idx = label_index(Label::Commodity)?;
    let process_idx = label_index(Label::Process)?;

    let mut scenarios = IndexSet::new();
    let mut records = Vec::new();
    for (row_idx, row) in rows.enumerate() {
        let cell = |idx| row.get(idx).unwrap_or("");
        scenarios.insert(cell(scenario_idx).to_string());

        for (idx, column) in columns.iter().enumerate() {
            let Column::Data { year, time_slice } = column else {
                continue;
            };
            let value = cell(idx);
            if value.is_empty() {
                continue;
            }

            records.push(TimesRecord {
                attribute: cell(attribute_idx).to_string(),
                commodity: cell(commodity_idx).to_string(),
                process: cell(process_idx).into(),
                year: *year,
                time_slice: time_slice.clone(),
                value: value.parse::<f64>().with_context(|| {
                    format!("Invalid value \"{value}\" in data row {}", row_idx + 1)
                })?,
            });
        }
    }

    ensure!(
        scenarios.len() == 1,
        "Results must be for exactly one scenario (found {})",
        scenarios.len()
    );
    let scenario = scenarios.swap_remove_index(0).unwrap_or_default();
    info!("Scenario: {scenario}");

    Ok(TimesTable { scenario, records })
}

/// Work out the meaning of each column from the two header rows
fn parse_header(years: &StringRecord, time_slices: &StringRecord) -> Result<Vec<Column>> {
    years
        .iter()
        .zip_longest(time_slices.iter())
        .map(|pair| {
            let (year, time_slice) = pair.or("", "");
            if let Ok(label) = time_slice.parse::<Label>() {
                return Ok(Column::Label(label));
            }
            if year.is_empty() && time_slice.is_empty() {
                return Ok(Column::Ignored);
            }

            let year = year
                .parse::<u32>()
                .with_context(|| format!("Invalid year in header: \"{year}\""))?;
            ensure!(!time_slice.is_empty(), "Missing time slice for year {year}");
            Ok(Column::Data {
                year,
                time_slice: time_slice.to_string(),
            })
        })
        .collect()
}
