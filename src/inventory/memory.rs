//! An in-memory [`InventoryStore`].
use super::{Activity, ActivityKey, Exchange, ExchangeID, ExchangeKind, InventoryStore, NewExchange};
use crate::flow::Multiplicity;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;

/// An inventory held entirely in memory.
///
/// Exchanges keep the order in which they were added, which is the native order reported by
/// [`InventoryStore::exchanges`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    activities: IndexMap<ActivityKey, Activity>,
    exchanges: IndexMap<ExchangeID, Exchange>,
    next_exchange_id: u32,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new activity to the store
    pub fn add_activity(&mut self, activity: Activity) -> Result<()> {
        ensure!(
            !self.activities.contains_key(&activity.key),
            "Duplicate activity key: {}",
            activity.key
        );
        self.activities.insert(activity.key.clone(), activity);

        Ok(())
    }

    /// Iterate over all activities in insertion order
    pub fn iter_activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities.values()
    }

    /// Iterate over all exchanges in native order
    pub fn iter_exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.values()
    }

    /// Find the keys of activities with the given name and, optionally, location
    pub fn search(&self, name: &str, location: Option<&str>) -> Vec<ActivityKey> {
        self.activities
            .values()
            .filter(|act| act.name == name && location.is_none_or(|loc| act.location == loc))
            .map(|act| act.key.clone())
            .collect()
    }

    /// Identify an activity by its key or, failing that, by its name.
    ///
    /// If `location` is given, only activities in that location are considered. A name must
    /// identify exactly one activity.
    pub fn find_activity(&self, key_or_name: &str, location: Option<&str>) -> Result<ActivityKey> {
        let key = ActivityKey::from(key_or_name);
        let in_location = |act: &Activity| location.is_none_or(|loc| act.location == loc);
        if self.activities.get(&key).is_some_and(in_location) {
            return Ok(key);
        }

        Multiplicity::from_vec(self.search(key_or_name, location))
            .single()
            .with_context(|| match location {
                Some(loc) => format!("Could not identify activity \"{key_or_name}\" in {loc}"),
                None => format!("Could not identify activity \"{key_or_name}\""),
            })
    }

    fn check_activity_exists(&self, key: &ActivityKey) -> Result<()> {
        ensure!(self.activities.contains_key(key), "Unknown activity: {key}");
        Ok(())
    }
}

impl InventoryStore for MemoryStore {
    fn activity(&self, key: &ActivityKey) -> Result<&Activity> {
        self.activities
            .get(key)
            .with_context(|| format!("Unknown activity: {key}"))
    }

    fn exchanges(&self, key: &ActivityKey, kind: ExchangeKind) -> Result<Vec<Exchange>> {
        self.check_activity_exists(key)?;
        Ok(self
            .exchanges
            .values()
            .filter(|ex| &ex.output == key && ex.kind == kind)
            .cloned()
            .collect())
    }

    fn save_activity(&mut self, activity: &Activity) -> Result<()> {
        let existing = self
            .activities
            .get_mut(&activity.key)
            .with_context(|| format!("Unknown activity: {}", activity.key))?;
        existing.clone_from(activity);

        Ok(())
    }

    fn save_exchange(&mut self, exchange: &Exchange) -> Result<()> {
        let existing = self
            .exchanges
            .get_mut(&exchange.id)
            .with_context(|| format!("Unknown exchange: {}", exchange.id))?;
        ensure!(
            existing.output == exchange.output,
            "Exchange {} cannot be moved from activity {} to {}",
            exchange.id,
            existing.output,
            exchange.output
        );
        existing.clone_from(exchange);

        Ok(())
    }

    fn create_exchange(&mut self, key: &ActivityKey, exchange: NewExchange) -> Result<Exchange> {
        self.check_activity_exists(key)?;
        ensure!(!exchange.name.is_empty(), "Exchange name cannot be empty");
        ensure!(!exchange.unit.is_empty(), "Exchange unit cannot be empty");

        let id = ExchangeID(self.next_exchange_id);
        self.next_exchange_id += 1;
        let exchange = Exchange {
            id,
            output: key.clone(),
            input: exchange.input,
            name: exchange.name,
            unit: exchange.unit,
            amount: exchange.amount,
            kind: exchange.kind,
            categories: exchange.categories,
            comment: exchange.comment,
        };
        self.exchanges.insert(id, exchange.clone());

        Ok(exchange)
    }

    fn delete_exchange(&mut self, id: ExchangeID) -> Result<()> {
        self.exchanges
            .shift_remove(&id)
            .with_context(|| format!("Unknown exchange: {id}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, coal_plant, coal_store, technosphere_exchange};
    use rstest::rstest;

    #[rstest]
    fn add_activity_duplicate(coal_plant: Activity) {
        let mut store = MemoryStore::new();
        store.add_activity(coal_plant.clone()).unwrap();
        assert_error!(
            store.add_activity(coal_plant),
            "Duplicate activity key: ei/coal_plant_de"
        );
    }

    #[rstest]
    fn unknown_activity(coal_store: (MemoryStore, ActivityKey)) {
        let (store, _) = coal_store;
        assert_error!(
            store.technosphere(&"missing".into()),
            "Unknown activity: missing"
        );
    }

    #[rstest]
    fn create_and_delete_preserve_order(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        let before: Vec<_> = store.technosphere(&key).unwrap();

        let created = store
            .create_exchange(&key, technosphere_exchange("ei/diesel_ch", "diesel", 1.0))
            .unwrap();
        let after = store.technosphere(&key).unwrap();
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after.last().unwrap(), &created);

        store.delete_exchange(before[0].id).unwrap();
        let names: Vec<_> = store
            .technosphere(&key)
            .unwrap()
            .into_iter()
            .map(|ex| ex.name)
            .collect();
        let expected: Vec<_> = before[1..]
            .iter()
            .map(|ex| ex.name.clone())
            .chain(std::iter::once("diesel".to_string()))
            .collect();
        assert_eq!(names, expected);
    }

    #[rstest]
    fn delete_twice(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        let id = store.technosphere(&key).unwrap()[0].id;
        store.delete_exchange(id).unwrap();
        assert_error!(
            store.delete_exchange(id),
            format!("Unknown exchange: {id}")
        );
    }

    #[rstest]
    fn save_exchange_cannot_move(coal_store: (MemoryStore, ActivityKey)) {
        let (mut store, key) = coal_store;
        let mut exchange = store.technosphere(&key).unwrap().remove(0);
        exchange.output = "ei/other".into();
        assert!(store.save_exchange(&exchange).is_err());
    }

    #[rstest]
    fn search_by_name_and_location(coal_store: (MemoryStore, ActivityKey)) {
        let (store, key) = coal_store;
        let name = store.activity(&key).unwrap().name.clone();
        assert_eq!(store.search(&name, None), vec![key.clone()]);
        assert_eq!(store.search(&name, Some("DE")), vec![key]);
        assert!(store.search(&name, Some("FR")).is_empty());
    }

    #[rstest]
    #[case("ei/coal_plant_de", None, "ei/coal_plant_de")]
    #[case("ei/coal_plant_de", Some("DE"), "ei/coal_plant_de")]
    #[case("electricity production, hard coal", Some("DE"), "ei/coal_plant_de")]
    #[case("market for lignite", None, "ei/lignite_mine")]
    fn find_activity_by_key_or_name(
        coal_store: (MemoryStore, ActivityKey),
        #[case] key_or_name: &str,
        #[case] location: Option<&str>,
        #[case] expected: &str,
    ) {
        let (store, _) = coal_store;
        assert_eq!(
            store.find_activity(key_or_name, location).unwrap(),
            ActivityKey::from(expected)
        );
    }

    #[rstest]
    #[case("market for diesel", None, "Could not identify activity \"market for diesel\"")]
    #[case(
        "ei/coal_plant_de",
        Some("FR"),
        "Could not identify activity \"ei/coal_plant_de\" in FR"
    )]
    fn find_activity_ambiguous_or_missing(
        coal_store: (MemoryStore, ActivityKey),
        #[case] key_or_name: &str,
        #[case] location: Option<&str>,
        #[case] msg: &str,
    ) {
        let (store, _) = coal_store;
        assert_error!(store.find_activity(key_or_name, location), msg);
    }
}
