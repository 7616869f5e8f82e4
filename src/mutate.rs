//! Operations which rescale exchanges or change their provider.
//!
//! Each operation locates its flows with a [`FlowQuery`], checks that every match shares one name
//! and only then writes to the store, so a failed check leaves the inventory untouched. On success
//! the operation is recorded in the activity's harmonisation record.
use crate::flow::{
    FlowError, FlowQuery, locate_biosphere, locate_technosphere, require_uniform_name,
};
use crate::harmonisation::{HarmonisationTag, record_operation};
use crate::inventory::{ActivityKey, Exchange, ExchangeKind, InventoryStore};
use anyhow::{Result, bail};
use log::{info, warn};

/// Check that a scale factor is a finite number
fn check_scale_factor(scale_factor: f64) -> Result<()> {
    if !scale_factor.is_finite() {
        bail!(FlowError::InvalidArgument(format!(
            "scale factor must be finite (got {scale_factor})"
        )));
    }

    Ok(())
}

/// Multiply the amounts of the given exchanges by `scale_factor` and save them
fn scale_exchanges<S, I>(store: &mut S, exchanges: I, scale_factor: f64) -> Result<()>
where
    S: InventoryStore + ?Sized,
    I: IntoIterator<Item = Exchange>,
{
    for mut exchange in exchanges {
        exchange.amount *= scale_factor;
        store.save_exchange(&exchange)?;
    }

    Ok(())
}

/// Change the provider of a technosphere flow.
///
/// Every exchange matching `query` is rebound to `new_provider` and renamed after its reference
/// product. A warning is logged if the new provider's reference product has a different name to
/// the flow. Fails without modifying anything if the matches have different names or if the
/// provider's unit differs from the flow's.
pub fn substitute_origin<S>(
    store: &mut S,
    key: &ActivityKey,
    query: &FlowQuery,
    new_provider: &ActivityKey,
) -> Result<()>
where
    S: InventoryStore + ?Sized,
{
    let matches = locate_technosphere(store, key, query)?;
    require_uniform_name(&matches, key, ExchangeKind::Technosphere, query)?;

    let provider = store.activity(new_provider)?;
    let product = provider.reference_product.clone();
    let provider_unit = provider.unit.clone();

    for exchange in &matches {
        if exchange.name != product {
            warn!(
                "Substituting activity {new_provider} does not produce the same product: \
                \"{}\" replaced by \"{product}\"",
                exchange.name
            );
        }
        if exchange.unit != provider_unit {
            bail!(FlowError::UnitMismatch {
                flow: exchange.name.clone(),
                flow_unit: exchange.unit.clone(),
                provider: new_provider.to_string(),
                provider_unit,
            });
        }
    }

    for mut exchange in matches {
        exchange.input = new_provider.clone();
        exchange.name.clone_from(&product);
        store.save_exchange(&exchange)?;
    }
    record_operation(store, key, HarmonisationTag::TechnosphereOrigin, true)
}

/// Multiply the amount of a technosphere flow by `scale_factor`.
///
/// If several exchanges match (e.g. the same fuel bought from different markets), all of them are
/// scaled. They must share one name.
pub fn scale_technosphere<S>(
    store: &mut S,
    key: &ActivityKey,
    query: &FlowQuery,
    scale_factor: f64,
) -> Result<()>
where
    S: InventoryStore + ?Sized,
{
    check_scale_factor(scale_factor)?;
    let matches = locate_technosphere(store, key, query)?;
    require_uniform_name(&matches, key, ExchangeKind::Technosphere, query)?;

    scale_exchanges(store, matches, scale_factor)?;
    record_operation(store, key, HarmonisationTag::TechnosphereScaled, true)
}

/// Multiply the amount of a biosphere flow by `scale_factor`.
///
/// All matching exchanges are scaled. They must share one name.
pub fn scale_biosphere<S>(
    store: &mut S,
    key: &ActivityKey,
    query: &FlowQuery,
    scale_factor: f64,
) -> Result<()>
where
    S: InventoryStore + ?Sized,
{
    check_scale_factor(scale_factor)?;
    let matches = locate_biosphere(store, key, query)?;
    require_uniform_name(&matches, key, ExchangeKind::Biosphere, query)?;

    scale_exchanges(store, matches, scale_factor)?;
    record_operation(store, key, HarmonisationTag::EmissionScaled, true)
}

/// Scale a fuel input together with every emission to air.
///
/// This models a change in conversion efficiency: a factor above one means more fuel (and
/// emissions) per unit output, below one means less. All biosphere exchanges in the `air`
/// compartment are scaled, not only those related to the named fuel, as they are all assumed to
/// come from burning it.
pub fn scale_fuel_and_air_emissions<S>(
    store: &mut S,
    key: &ActivityKey,
    fuel_query: &FlowQuery,
    scale_factor: f64,
) -> Result<()>
where
    S: InventoryStore + ?Sized,
{
    check_scale_factor(scale_factor)?;
    let fuel = locate_technosphere(store, key, fuel_query)?;
    require_uniform_name(&fuel, key, ExchangeKind::Technosphere, fuel_query)?;

    let air_emissions: Vec<_> = store
        .biosphere(key)?
        .into_iter()
        .filter(Exchange::is_air_emission)
        .collect();
    info!(
        "Scaling {} fuel flows and {} air emissions of activity {key} by {scale_factor}",
        fuel.len(),
        air_emissions.len()
    );

    scale_exchanges(store, fuel, scale_factor)?;
    scale_exchanges(store, air_emissions, scale_factor)?;
    record_operation(store, key, HarmonisationTag::EfficiencyScaled, true)
}

/// A handle on one activity in a store, for chaining several harmonisation operations.
///
/// ```ignore
/// ActivityEditor::new(&mut store, key)
///     .scale_technosphere(&FlowQuery::exact("hard coal"), 1.1)?
///     .scale_biosphere(&FlowQuery::contains("Methane"), 0.5)?;
/// ```
pub struct ActivityEditor<'a, S: InventoryStore + ?Sized> {
    store: &'a mut S,
    key: ActivityKey,
}

impl<'a, S: InventoryStore + ?Sized> ActivityEditor<'a, S> {
    /// Create a handle for the activity with the given key
    pub fn new(store: &'a mut S, key: ActivityKey) -> Self {
        Self { store, key }
    }

    /// The key of the activity being edited
    pub fn key(&self) -> &ActivityKey {
        &self.key
    }

    /// See [`substitute_origin`]
    pub fn substitute_origin(
        &mut self,
        query: &FlowQuery,
        new_provider: &ActivityKey,
    ) -> Result<&mut Self> {
        substitute_origin(&mut *self.store, &self.key, query, new_provider)?;
        Ok(self)
    }

    /// See [`scale_technosphere`]
    pub fn scale_technosphere(
        &mut self,
        query: &FlowQuery,
        scale_factor: f64,
    ) -> Result<&mut Self> {
        scale_technosphere(&mut *self.store, &self.key, query, scale_factor)?;
        Ok(self)
    }

    /// See [`scale_biosphere`]
    pub fn scale_biosphere(&mut self, query: &FlowQuery, scale_factor: f64) -> Result<&mut Self> {
        scale_biosphere(&mut *self.store, &self.key, query, scale_factor)?;
        Ok(self)
    }

    /// See [`scale_fuel_and_air_emissions`]
    pub fn scale_fuel_and_air_emissions(
        &mut self,
        fuel_query: &FlowQuery,
        scale_factor: f64,
    ) -> Result<&mut Self> {
        scale_fuel_and_air_emissions(&mut *self.store, &self.key, fuel_query, scale_factor)?;
        Ok(self)
    }

    /// See [`crate::aggregate::aggregate_technosphere`]
    pub fn aggregate_technosphere(&mut self, query: &FlowQuery) -> Result<&mut Self> {
        crate::aggregate::aggregate_technosphere(&mut *self.store, &self.key, query)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{amounts_by_name, coal_store};
    use crate::harmonisation::{HarmonisationValue, is_modified};
    use crate::inventory::memory::MemoryStore;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn flow_error(err: &anyhow::Error) -> &FlowError {
        err.downcast_ref::<FlowError>().unwrap()
    }

    fn tag(store: &MemoryStore, key: &ActivityKey, tag: HarmonisationTag) -> bool {
        store
            .activity(key)
            .unwrap()
            .harmonisation
            .as_ref()
            .and_then(|record| record.get(tag))
            == Some(&HarmonisationValue::Flag(true))
    }

    #[rstest]
    fn scale_technosphere_exact(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        let before = amounts_by_name(&store, &key);

        scale_technosphere(&mut store, &key, &FlowQuery::exact("hard coal"), 2.0).unwrap();

        let after = amounts_by_name(&store, &key);
        assert_eq!(after["hard coal"], vec![20.0]);
        assert_eq!(after["hard coal ash"], vec![2.0]);
        for (name, amounts) in &before {
            if name != "hard coal" {
                assert_eq!(&after[name], amounts);
            }
        }
        assert!(tag(&store, &key, HarmonisationTag::TechnosphereScaled));
        assert!(is_modified(&store, &key).unwrap());
    }

    #[rstest]
    fn scale_technosphere_all_matches(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        scale_technosphere(&mut store, &key, &FlowQuery::contains("diesel"), 0.5).unwrap();
        assert_eq!(amounts_by_name(&store, &key)["diesel"], vec![2.5, 1.5]);
    }

    #[rstest]
    fn scale_technosphere_ambiguous(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        let before = amounts_by_name(&store, &key);

        let err = scale_technosphere(&mut store, &key, &FlowQuery::contains("hard coal"), 2.0)
            .unwrap_err();
        assert!(matches!(
            flow_error(&err),
            FlowError::InconsistentIdentification { .. }
        ));
        assert_eq!(amounts_by_name(&store, &key), before);
        assert!(!is_modified(&store, &key).unwrap());
    }

    #[rstest]
    fn scale_technosphere_not_found(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        let err =
            scale_technosphere(&mut store, &key, &FlowQuery::exact("lignite"), 2.0).unwrap_err();
        assert_eq!(
            flow_error(&err),
            &FlowError::FlowNotFound {
                kind: ExchangeKind::Technosphere,
                pattern: "lignite".into(),
                activity: key.to_string(),
            }
        );
        assert!(!is_modified(&store, &key).unwrap());
    }

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn scale_technosphere_invalid_factor(
        coal_store: (MemoryStore, ActivityKey),
        #[case] scale_factor: f64,
    ) {
        let (mut store, key) = coal_store;
        let query = FlowQuery::exact("hard coal");
        let err = scale_technosphere(&mut store, &key, &query, scale_factor).unwrap_err();
        assert!(matches!(flow_error(&err), FlowError::InvalidArgument(_)));
    }

    #[rstest]
    fn scale_biosphere_single(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        scale_biosphere(&mut store, &key, &FlowQuery::contains("Methane"), 3.0).unwrap();

        let after = amounts_by_name(&store, &key);
        assert_approx_eq!(f64, after["Methane, fossil"][0], 0.03);
        assert_eq!(after["Carbon dioxide, fossil"], vec![0.9]);
        assert!(tag(&store, &key, HarmonisationTag::EmissionScaled));
        assert!(!tag(&store, &key, HarmonisationTag::TechnosphereScaled));
    }

    #[rstest]
    fn scale_biosphere_ignores_technosphere(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        let err = scale_biosphere(&mut store, &key, &FlowQuery::exact("diesel"), 3.0).unwrap_err();
        assert!(matches!(flow_error(&err), FlowError::FlowNotFound { .. }));
    }

    #[rstest]
    fn scale_fuel_and_air(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        scale_fuel_and_air_emissions(&mut store, &key, &FlowQuery::exact("hard coal"), 1.5)
            .unwrap();

        let after = amounts_by_name(&store, &key);
        assert_eq!(after["hard coal"], vec![15.0]);
        assert_eq!(after["hard coal ash"], vec![2.0]);
        assert_eq!(after["diesel"], vec![5.0, 3.0]);
        assert_approx_eq!(f64, after["Carbon dioxide, fossil"][0], 1.35);
        assert_approx_eq!(f64, after["Methane, fossil"][0], 0.015);
        // Emissions to water are untouched
        assert_eq!(after["Mercury"], vec![1e-6]);
        assert!(tag(&store, &key, HarmonisationTag::EfficiencyScaled));
    }

    #[rstest]
    fn scale_fuel_and_air_ambiguous(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        let before = amounts_by_name(&store, &key);
        let err =
            scale_fuel_and_air_emissions(&mut store, &key, &FlowQuery::contains("hard coal"), 1.5)
                .unwrap_err();
        assert!(matches!(
            flow_error(&err),
            FlowError::InconsistentIdentification { .. }
        ));

        // Neither the fuel nor the air emissions were written
        assert_eq!(amounts_by_name(&store, &key), before);
        assert!(!is_modified(&store, &key).unwrap());
    }

    #[rstest]
    fn substitute_origin_valid(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        let provider: ActivityKey = "ei/hard_coal_import".into();
        substitute_origin(&mut store, &key, &FlowQuery::exact("hard coal"), &provider).unwrap();

        let coal = locate_technosphere(&store, &key, &FlowQuery::exact("hard coal")).unwrap();
        assert_eq!(coal.len(), 1);
        assert_eq!(coal[0].input, provider);
        assert_eq!(coal[0].amount, 10.0);
        assert!(tag(&store, &key, HarmonisationTag::TechnosphereOrigin));
    }

    #[rstest]
    fn substitute_origin_renames_flow(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        let provider: ActivityKey = "ei/lignite_mine".into();
        substitute_origin(&mut store, &key, &FlowQuery::exact("hard coal"), &provider).unwrap();

        let after = amounts_by_name(&store, &key);
        assert!(!after.contains_key("hard coal"));
        assert_eq!(after["lignite"], vec![10.0]);
    }

    #[rstest]
    fn substitute_origin_unit_mismatch(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        let provider: ActivityKey = "ei/hard_coal_energy".into();
        let query = FlowQuery::exact("hard coal");
        let original = locate_technosphere(&store, &key, &query).unwrap();

        let err = substitute_origin(&mut store, &key, &query, &provider).unwrap_err();
        assert_eq!(
            flow_error(&err),
            &FlowError::UnitMismatch {
                flow: "hard coal".into(),
                flow_unit: "kilogram".into(),
                provider: "ei/hard_coal_energy".into(),
                provider_unit: "megajoule".into(),
            }
        );
        assert_eq!(locate_technosphere(&store, &key, &query).unwrap(), original);
        assert!(!is_modified(&store, &key).unwrap());
    }

    #[rstest]
    fn substitute_origin_unknown_provider(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        let provider: ActivityKey = "ei/missing".into();
        assert!(
            substitute_origin(&mut store, &key, &FlowQuery::exact("hard coal"), &provider)
                .is_err()
        );
        assert!(!is_modified(&store, &key).unwrap());
    }

    #[rstest]
    fn editor_chains_operations(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        ActivityEditor::new(&mut store, key.clone())
            .scale_technosphere(&FlowQuery::exact("hard coal"), 2.0)
            .unwrap()
            .scale_biosphere(&FlowQuery::contains("Carbon dioxide"), 0.0)
            .unwrap()
            .aggregate_technosphere(&FlowQuery::exact("diesel"))
            .unwrap();

        let after = amounts_by_name(&store, &key);
        assert_eq!(after["hard coal"], vec![20.0]);
        assert_eq!(after["Carbon dioxide, fossil"], vec![0.0]);
        assert_eq!(after["diesel"], vec![8.0]);
        assert!(tag(&store, &key, HarmonisationTag::TechnosphereScaled));
        assert!(tag(&store, &key, HarmonisationTag::EmissionScaled));
    }
}
