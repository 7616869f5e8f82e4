//! Screening of the processes that drive the change in greenhouse-gas emissions between two
//! scenarios.
use crate::times::ProcessID;
use anyhow::{Result, ensure};
use float_cmp::approx_eq;
use indexmap::IndexMap;
use serde::Serialize;

/// The change in CO2-equivalent emissions of one process between two scenarios
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct ScreeningRow {
    /// The process
    pub process: ProcessID,
    /// Emissions in the alternative scenario
    pub alternative: f64,
    /// Emissions in the baseline scenario
    pub baseline: f64,
    /// `alternative - baseline`
    #[serde(rename = "diffCO2")]
    pub diff_co2: f64,
    /// Absolute value of `diff_co2`
    #[serde(rename = "absdiffCO2")]
    pub abs_diff_co2: f64,
    /// Share of the selected processes' absolute change, scaled by the cutoff.
    ///
    /// Only set when a cutoff below one was applied.
    pub contribution: Option<f64>,
}

/// Find the processes contributing most to the absolute change in emissions between a baseline
/// and an alternative scenario.
///
/// Processes missing from one scenario count as zero emissions there. Rows are ordered by
/// absolute change, largest first.
///
/// # Arguments
///
/// * `baseline` - CO2eq emissions per process in the baseline scenario
/// * `alternative` - CO2eq emissions per process in the alternative scenario
/// * `cutoff` - Proportion of the total absolute change to cover (e.g. 0.95). With a value of 1 or
///   more, all processes are returned.
pub fn screen_processes(
    baseline: &IndexMap<ProcessID, f64>,
    alternative: &IndexMap<ProcessID, f64>,
    cutoff: f64,
) -> Result<Vec<ScreeningRow>> {
    ensure!(
        cutoff > 0.0,
        "Screening cutoff must be greater than zero (got {cutoff})"
    );

    let mut rows: Vec<_> = alternative
        .keys()
        .chain(baseline.keys().filter(|p| !alternative.contains_key(*p)))
        .map(|process| {
            let alternative = alternative.get(process).copied().unwrap_or(0.0);
            let baseline = baseline.get(process).copied().unwrap_or(0.0);
            let diff_co2 = alternative - baseline;
            ScreeningRow {
                process: process.clone(),
                alternative,
                baseline,
                diff_co2,
                abs_diff_co2: diff_co2.abs(),
                contribution: None,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.abs_diff_co2.total_cmp(&a.abs_diff_co2));

    if cutoff >= 1.0 {
        return Ok(rows);
    }

    let total: f64 = rows.iter().map(|row| row.abs_diff_co2).sum();
    if approx_eq!(f64, total, 0.0) {
        for row in &mut rows {
            row.contribution = Some(0.0);
        }
        return Ok(rows);
    }

    // Add processes until the cumulative share exceeds the cutoff
    let mut cumulative = 0.0;
    let mut count = 0;
    for row in &rows {
        if cumulative > cutoff {
            break;
        }
        cumulative += row.abs_diff_co2 / total;
        count += 1;
    }
    rows.truncate(count);

    let selected_total: f64 = rows.iter().map(|row| row.abs_diff_co2).sum();
    for row in &mut rows {
        row.contribution = Some(row.abs_diff_co2 / selected_total * cutoff);
    }

    Ok(rows)
}
