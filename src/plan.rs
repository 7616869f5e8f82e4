//! A harmonisation plan: an ordered list of operations to apply to activities of an inventory.
//!
//! Plans are read from TOML files of the form:
//!
//! ```toml
//! [[step]]
//! activity = "ei/coal_plant_de"
//! operation = "scale_fuel_and_air_emissions"
//! fuel = "hard coal"
//! exact = true
//! factor = 0.95
//! ```
use crate::aggregate::aggregate_technosphere;
use crate::flow::FlowQuery;
use crate::harmonisation::{HarmonisationTag, HarmonisationValue, record_operation};
use crate::inventory::{ActivityKey, InventoryStore};
use crate::mutate::{
    scale_biosphere, scale_fuel_and_air_emissions, scale_technosphere, substitute_origin,
};
use anyhow::{Context, Result};
use itertools::Itertools;
use log::info;
use serde::Deserialize;

/// An ordered list of harmonisation steps
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct HarmonisationPlan {
    /// The steps, applied in order
    #[serde(rename = "step", default)]
    pub steps: Vec<PlanStep>,
}

/// One operation applied to one activity
#[derive(PartialEq, Debug, Clone, Deserialize)]
pub struct PlanStep {
    /// The activity to modify
    pub activity: ActivityKey,
    /// What to do to it
    #[serde(flatten)]
    pub operation: Operation,
}

/// The operations a plan step can perform
#[derive(PartialEq, Debug, Clone, Deserialize, strum::Display)]
#[serde(tag = "operation", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// Change the provider of a technosphere flow
    SubstituteOrigin {
        /// Flow name pattern
        flow: String,
        /// Whether `flow` must match exactly
        #[serde(default)]
        exact: bool,
        /// Key of the new provider
        provider: ActivityKey,
    },
    /// Multiply a technosphere flow by a factor
    ScaleTechnosphere {
        /// Flow name pattern
        flow: String,
        /// Whether `flow` must match exactly
        #[serde(default)]
        exact: bool,
        /// Scale factor
        factor: f64,
    },
    /// Multiply a biosphere flow by a factor
    ScaleBiosphere {
        /// Flow name pattern
        flow: String,
        /// Whether `flow` must match exactly
        #[serde(default)]
        exact: bool,
        /// Scale factor
        factor: f64,
    },
    /// Multiply a fuel and all emissions to air by a factor
    ScaleFuelAndAirEmissions {
        /// Fuel name pattern
        fuel: String,
        /// Whether `fuel` must match exactly
        #[serde(default)]
        exact: bool,
        /// Scale factor
        factor: f64,
    },
    /// Merge technosphere flows with the same name into one
    AggregateTechnosphere {
        /// Flow name pattern
        flow: String,
        /// Whether `flow` must match exactly
        #[serde(default)]
        exact: bool,
    },
    /// Link an activity to an energy-model scenario and process
    Annotate {
        /// Scenario name
        scenario: Option<String>,
        /// TIMES process code
        times_pcode: Option<String>,
    },
}

impl Operation {
    /// Apply this operation to the activity with the given key
    pub fn apply<S>(&self, store: &mut S, key: &ActivityKey) -> Result<()>
    where
        S: InventoryStore + ?Sized,
    {
        match self {
            Self::SubstituteOrigin {
                flow,
                exact,
                provider,
            } => substitute_origin(store, key, &FlowQuery::new(flow, *exact), provider),
            Self::ScaleTechnosphere {
                flow,
                exact,
                factor,
            } => scale_technosphere(store, key, &FlowQuery::new(flow, *exact), *factor),
            Self::ScaleBiosphere {
                flow,
                exact,
                factor,
            } => scale_biosphere(store, key, &FlowQuery::new(flow, *exact), *factor),
            Self::ScaleFuelAndAirEmissions {
                fuel,
                exact,
                factor,
            } => scale_fuel_and_air_emissions(store, key, &FlowQuery::new(fuel, *exact), *factor),
            Self::AggregateTechnosphere { flow, exact } => {
                aggregate_technosphere(store, key, &FlowQuery::new(flow, *exact)).map(|_| ())
            }
            Self::Annotate {
                scenario,
                times_pcode,
            } => {
                // Check the activity exists even if there is nothing to record
                store.activity(key)?;
                let entries = [
                    (HarmonisationTag::Scenario, scenario),
                    (HarmonisationTag::TimesProcessCode, times_pcode),
                ]
                .into_iter()
                .filter_map(|(tag, text)| {
                    let text = text.as_deref()?;
                    Some((tag, HarmonisationValue::from(text)))
                })
                .collect_vec();

                // Nothing is recorded unless every value is valid
                for (tag, value) in &entries {
                    value.check(*tag)?;
                }
                for (tag, value) in entries {
                    record_operation(store, key, tag, value)?;
                }

                Ok(())
            }
        }
    }
}

impl HarmonisationPlan {
    /// Apply every step of the plan in order.
    ///
    /// Stops at the first step which fails. Steps before it remain applied.
    pub fn apply<S>(&self, store: &mut S) -> Result<()>
    where
        S: InventoryStore + ?Sized,
    {
        for (i, step) in self.steps.iter().enumerate() {
            let step_number = i + 1;
            info!(
                "Step {step_number}/{}: {} on activity {}",
                self.steps.len(),
                step.operation,
                step.activity
            );
            step.operation
                .apply(store, &step.activity)
                .with_context(|| format!("Failed to apply step {step_number}"))?;
        }

        Ok(())
    }
}
