//! Activities and exchanges of a life-cycle inventory database, along with the [`InventoryStore`]
//! trait through which they are read and written.
//!
//! The database itself is owned by some external system. This crate only needs to query
//! activities by key, list their exchanges, write back modified exchanges and create or delete
//! exchanges. [`memory::MemoryStore`] provides an in-memory implementation.
use crate::harmonisation::HarmonisationRecord;
use crate::id::define_id_type;
use anyhow::Result;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::fmt;

pub mod memory;

define_id_type! {ActivityKey}

/// The classification system whose code is reported by [`Activity::isic_classification`]
const ISIC_CLASSIFICATION_SYSTEM: &str = "ISIC rev.4 ecoinvent";

/// The compartment in which fuel-proportional emissions are released
pub const AIR_COMPARTMENT: &str = "air";

/// A process node in an inventory database (e.g. "electricity production, hard coal")
#[derive(PartialEq, Debug, Clone)]
pub struct Activity {
    /// Unique key of the activity within the database
    pub key: ActivityKey,
    /// Display name
    pub name: String,
    /// Name of the product this activity provides
    pub reference_product: String,
    /// Unit of the reference product (e.g. "kilowatt hour")
    pub unit: String,
    /// Amount of reference product produced per unit of activity
    pub production_amount: f64,
    /// Geographical location code (e.g. "DE")
    pub location: String,
    /// Classifications as `(system, value)` pairs
    pub classifications: Vec<(String, String)>,
    /// Record of the harmonisation operations applied to this activity.
    ///
    /// `None` until the first operation is recorded.
    pub harmonisation: Option<HarmonisationRecord>,
}

impl Activity {
    /// Get the ISIC code and description for this activity, if it has one.
    ///
    /// The ecoinvent classification value has the form `"3510:Electric power generation"`.
    pub fn isic_classification(&self) -> Option<(&str, &str)> {
        self.classifications
            .iter()
            .find(|(system, _)| system == ISIC_CLASSIFICATION_SYSTEM)
            .and_then(|(_, value)| value.split_once(':'))
    }
}

/// Identifies an exchange within an [`InventoryStore`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeID(pub u32);

impl fmt::Display for ExchangeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The type of an exchange
#[derive(
    PartialEq, Eq, Debug, Clone, Copy, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum ExchangeKind {
    /// Consumption of another activity's product
    #[string = "technosphere"]
    Technosphere,
    /// Direct emission to, or resource draw from, the environment
    #[string = "biosphere"]
    Biosphere,
    /// The activity's own reference product output
    #[string = "production"]
    Production,
}

/// A quantified flow into (or out of) an [`Activity`]
#[derive(PartialEq, Debug, Clone)]
pub struct Exchange {
    /// Store-assigned identifier
    pub id: ExchangeID,
    /// The activity this exchange belongs to
    pub output: ActivityKey,
    /// The providing activity or environmental flow
    pub input: ActivityKey,
    /// Name of the flow (e.g. "hard coal" or "Carbon dioxide, fossil")
    pub name: String,
    /// Unit of `amount`
    pub unit: String,
    /// Amount per unit of activity
    pub amount: f64,
    /// Type of exchange
    pub kind: ExchangeKind,
    /// Compartment path of a biosphere flow (e.g. `["air", "urban air close to ground"]`)
    pub categories: Vec<String>,
    /// Free-text comment
    pub comment: Option<String>,
}

impl Exchange {
    /// The top-level environmental compartment of this exchange (e.g. "air"), if any
    pub fn compartment(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    /// Whether this exchange is an emission to air
    pub fn is_air_emission(&self) -> bool {
        self.kind == ExchangeKind::Biosphere && self.compartment() == Some(AIR_COMPARTMENT)
    }
}

/// The fields needed to create a new [`Exchange`] on an activity
#[derive(PartialEq, Debug, Clone)]
pub struct NewExchange {
    /// The providing activity or environmental flow
    pub input: ActivityKey,
    /// Name of the flow
    pub name: String,
    /// Unit of `amount`
    pub unit: String,
    /// Amount per unit of activity
    pub amount: f64,
    /// Type of exchange
    pub kind: ExchangeKind,
    /// Compartment path of a biosphere flow
    pub categories: Vec<String>,
    /// Free-text comment
    pub comment: Option<String>,
}

impl From<&Exchange> for NewExchange {
    fn from(exchange: &Exchange) -> Self {
        Self {
            input: exchange.input.clone(),
            name: exchange.name.clone(),
            unit: exchange.unit.clone(),
            amount: exchange.amount,
            kind: exchange.kind,
            categories: exchange.categories.clone(),
            comment: exchange.comment.clone(),
        }
    }
}

/// Read and write access to an inventory database.
///
/// Exchanges are handed out as owned snapshots. Changes only take effect once written back with
/// [`InventoryStore::save_exchange`].
///
/// Implementations are not expected to provide locking: callers must not run two mutations on the
/// same activity concurrently.
pub trait InventoryStore {
    /// Look up an activity by key
    fn activity(&self, key: &ActivityKey) -> Result<&Activity>;

    /// Get the exchanges of the given type on an activity, in the store's native order
    fn exchanges(&self, key: &ActivityKey, kind: ExchangeKind) -> Result<Vec<Exchange>>;

    /// Write back the metadata of an activity
    fn save_activity(&mut self, activity: &Activity) -> Result<()>;

    /// Write back a single exchange
    fn save_exchange(&mut self, exchange: &Exchange) -> Result<()>;

    /// Create a new exchange on an activity, returning the saved exchange
    fn create_exchange(&mut self, key: &ActivityKey, exchange: NewExchange) -> Result<Exchange>;

    /// Delete an exchange
    fn delete_exchange(&mut self, id: ExchangeID) -> Result<()>;

    /// Get the technosphere exchanges of an activity
    fn technosphere(&self, key: &ActivityKey) -> Result<Vec<Exchange>> {
        self.exchanges(key, ExchangeKind::Technosphere)
    }

    /// Get the biosphere exchanges of an activity
    fn biosphere(&self, key: &ActivityKey) -> Result<Vec<Exchange>> {
        self.exchanges(key, ExchangeKind::Biosphere)
    }
}
