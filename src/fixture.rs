//! Fixtures for tests
use crate::inventory::memory::MemoryStore;
use crate::inventory::{Activity, ActivityKey, ExchangeKind, InventoryStore, NewExchange};
use indexmap::IndexMap;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Create an activity providing `product` in `unit`
pub fn provider(key: &str, product: &str, unit: &str) -> Activity {
    Activity {
        key: key.into(),
        name: format!("market for {product}"),
        reference_product: product.into(),
        unit: unit.into(),
        production_amount: 1.0,
        location: "GLO".into(),
        classifications: Vec::new(),
        harmonisation: None,
    }
}

/// A technosphere exchange measured in kilograms
pub fn technosphere_exchange(input: &str, name: &str, amount: f64) -> NewExchange {
    NewExchange {
        input: input.into(),
        name: name.into(),
        unit: "kilogram".into(),
        amount,
        kind: ExchangeKind::Technosphere,
        categories: Vec::new(),
        comment: None,
    }
}

/// A biosphere exchange to the given compartment, measured in kilograms
pub fn biosphere_exchange(input: &str, name: &str, amount: f64, compartment: &str) -> NewExchange {
    NewExchange {
        input: input.into(),
        name: name.into(),
        unit: "kilogram".into(),
        amount,
        kind: ExchangeKind::Biosphere,
        categories: vec![compartment.into(), "unspecified".into()],
        comment: None,
    }
}

/// The amounts of every exchange on an activity, grouped by name
pub fn amounts_by_name(store: &MemoryStore, key: &ActivityKey) -> IndexMap<String, Vec<f64>> {
    let mut map: IndexMap<String, Vec<f64>> = IndexMap::new();
    for ex in store.iter_exchanges().filter(|ex| &ex.output == key) {
        map.entry(ex.name.clone()).or_default().push(ex.amount);
    }

    map
}

#[fixture]
pub fn coal_plant() -> Activity {
    Activity {
        key: "ei/coal_plant_de".into(),
        name: "electricity production, hard coal".into(),
        reference_product: "electricity, high voltage".into(),
        unit: "kilowatt hour".into(),
        production_amount: 1.0,
        location: "DE".into(),
        classifications: vec![(
            "ISIC rev.4 ecoinvent".into(),
            "3510:Electric power generation, transmission and distribution".into(),
        )],
        harmonisation: None,
    }
}

/// A coal power plant with its providers.
///
/// Technosphere: "hard coal" (10), "hard coal ash" (2), "diesel" from two providers (5 and 3).
/// Biosphere: CO2 (0.9) and methane (0.01) to air, mercury (1e-6) to water.
#[fixture]
pub fn coal_store(coal_plant: Activity) -> (MemoryStore, ActivityKey) {
    let key = coal_plant.key.clone();
    let mut store = MemoryStore::new();
    store.add_activity(coal_plant).unwrap();
    for activity in [
        provider("ei/market_hard_coal", "hard coal", "kilogram"),
        provider("ei/hard_coal_import", "hard coal", "kilogram"),
        provider("ei/hard_coal_energy", "hard coal", "megajoule"),
        provider("ei/lignite_mine", "lignite", "kilogram"),
        provider("ei/ash_treatment", "hard coal ash", "kilogram"),
        provider("ei/diesel_x", "diesel", "kilogram"),
        provider("ei/diesel_y", "diesel", "kilogram"),
    ] {
        store.add_activity(activity).unwrap();
    }

    let production = NewExchange {
        input: key.clone(),
        name: "electricity, high voltage".into(),
        unit: "kilowatt hour".into(),
        amount: 1.0,
        kind: ExchangeKind::Production,
        categories: Vec::new(),
        comment: None,
    };
    for exchange in [
        production,
        technosphere_exchange("ei/market_hard_coal", "hard coal", 10.0),
        technosphere_exchange("ei/ash_treatment", "hard coal ash", 2.0),
        technosphere_exchange("ei/diesel_x", "diesel", 5.0),
        technosphere_exchange("ei/diesel_y", "diesel", 3.0),
        biosphere_exchange("bio/co2", "Carbon dioxide, fossil", 0.9, "air"),
        biosphere_exchange("bio/ch4", "Methane, fossil", 0.01, "air"),
        biosphere_exchange("bio/hg", "Mercury", 1e-6, "water"),
    ] {
        store.create_exchange(&key, exchange).unwrap();
    }

    (store, key)
}
