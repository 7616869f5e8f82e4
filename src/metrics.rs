//! Read-only metrics derived from an activity's exchanges.
//!
//! Neither function checks that the units of the flows involved agree: the units found are
//! logged so the user can check them, and the result is in whatever units the flows use.
use crate::flow::{
    DualMultiplicity, FlowQuery, Multiplicity, locate_biosphere, locate_technosphere,
    require_uniform_name,
};
use crate::inventory::{ActivityKey, ExchangeKind, InventoryStore};
use anyhow::Result;
use log::{info, warn};

/// Amount of reference product per unit of fuel consumed.
///
/// If several technosphere exchanges match the fuel (e.g. the same fuel from different markets)
/// their amounts are summed, assuming they are the same type of input; they must share a name.
///
/// # Returns
///
/// `None` if no fuel flow matches, otherwise the ratio of the activity's production amount to
/// the fuel amount.
pub fn efficiency<S>(store: &S, key: &ActivityKey, fuel_query: &FlowQuery) -> Result<Option<f64>>
where
    S: InventoryStore + ?Sized,
{
    let activity = store.activity(key)?;
    let matches = locate_technosphere(store, key, fuel_query)?;
    if matches.len() > 1 {
        require_uniform_name(&matches, key, ExchangeKind::Technosphere, fuel_query)?;
    }

    let fuel = Multiplicity::from_vec(matches);
    if fuel.is_empty() {
        warn!(
            "No fuel flow matching \"{}\" found for activity {key}",
            fuel_query.pattern
        );
        return Ok(None);
    }
    if matches!(fuel, Multiplicity::Many(_)) {
        warn!(
            "More than one \"{}\" fuel flow; using the total amount, assuming they are the same \
            type of input",
            fuel_query.pattern
        );
    }
    info!("Fuel unit: {:?}", fuel.units());
    info!("Output unit: {}", activity.unit);

    Ok(Some(activity.production_amount / fuel.total_amount()))
}

/// Amount of an emission per unit of fuel consumed.
///
/// The fuel is located among the technosphere exchanges and the emission among the biosphere
/// exchanges. Where several flows match on either side, amounts are summed per side, assuming the
/// matched flows are of the same type (this is not checked).
///
/// # Returns
///
/// * `None` if no fuel flow matches
/// * `Some(0.0)` if fuel flows match but no emission does
/// * otherwise the ratio of emission amount to fuel amount
pub fn emission_factor<S>(
    store: &S,
    key: &ActivityKey,
    fuel_query: &FlowQuery,
    emission_query: &FlowQuery,
) -> Result<Option<f64>>
where
    S: InventoryStore + ?Sized,
{
    let fuel = Multiplicity::from_vec(locate_technosphere(store, key, fuel_query)?);
    let emission = Multiplicity::from_vec(locate_biosphere(store, key, emission_query)?);
    info!("Fuel unit: {:?}", fuel.units());
    info!("Emission unit: {:?}", emission.units());

    let factor = match DualMultiplicity::classify(&emission, &fuel) {
        DualMultiplicity::NoDenominator => {
            warn!(
                "No fuel flow matching \"{}\" found for activity {key}",
                fuel_query.pattern
            );
            if emission.is_empty() {
                warn!(
                    "No biosphere flow matching \"{}\" found for activity {key}",
                    emission_query.pattern
                );
            }
            None
        }
        DualMultiplicity::NoNumerator => {
            warn!(
                "No biosphere flow matching \"{}\" found for activity {key}",
                emission_query.pattern
            );
            Some(0.0)
        }
        DualMultiplicity::OnePerSide {
            numerator,
            denominator,
        } => Some(numerator.amount / denominator.amount),
        DualMultiplicity::Summed {
            numerator,
            denominator,
        } => {
            warn!(
                "More than one fuel or emission flow matched; using total amounts, assuming they \
                are the same type of flow"
            );
            Some(numerator / denominator)
        }
    };

    Ok(factor)
}
