//! Code for reading a harmonisation plan from a TOML file.
use super::*;
use crate::plan::HarmonisationPlan;
use anyhow::{Result, ensure};
use std::path::Path;

/// Read a harmonisation plan.
///
/// # Arguments
///
/// * `plan_path` - Path to the plan TOML file
///
/// # Returns
///
/// The plan, or an error if the file is invalid or contains no steps
pub fn read_plan(plan_path: &Path) -> Result<HarmonisationPlan> {
    let plan: HarmonisationPlan = read_toml(plan_path)?;
    ensure!(
        !plan.steps.is_empty(),
        "Plan file {} contains no steps",
        plan_path.display()
    );

    Ok(plan)
}
