//! Locating exchanges on an activity by name and classifying how many were found.
//!
//! Every harmonisation operation starts by searching an activity's exchanges for a name pattern.
//! Depending on the operation, zero, one or several matches lead to different behaviour; the
//! [`Multiplicity`] and [`DualMultiplicity`] types capture these cases so that each operation can
//! match on them exhaustively.
use crate::inventory::{ActivityKey, Exchange, ExchangeKind, InventoryStore};
use anyhow::{Result, bail};
use itertools::Itertools;
use log::warn;
use thiserror::Error;

/// Structural errors raised while identifying or modifying flows.
///
/// These are returned wrapped in an [`anyhow::Error`]; use `downcast_ref::<FlowError>()` to
/// inspect them.
#[derive(Debug, Error, PartialEq)]
pub enum FlowError {
    /// An argument failed validation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A multi-match flow set does not share a single name
    #[error(
        "Incorrect flow identification for pattern \"{pattern}\": matched flows have different \
        names ({})",
        .names.join(", ")
    )]
    InconsistentIdentification {
        /// The pattern used for the search
        pattern: String,
        /// The distinct names found
        names: Vec<String>,
    },
    /// The provider of a substituted flow is in a different unit to the flow
    #[error(
        "Flow \"{flow}\" is measured in {flow_unit} but the substitute provider {provider} \
        produces {provider_unit}"
    )]
    UnitMismatch {
        /// Name of the exchange being substituted
        flow: String,
        /// Unit of the exchange being substituted
        flow_unit: String,
        /// Key of the new provider
        provider: String,
        /// Unit of the new provider's reference product
        provider_unit: String,
    },
    /// No exchange matched where at least one is required
    #[error("No {kind} flow matching \"{pattern}\" found for activity {activity}")]
    FlowNotFound {
        /// The type of exchange searched
        kind: ExchangeKind,
        /// The pattern used for the search
        pattern: String,
        /// The activity searched
        activity: String,
    },
}

/// A search for exchanges on an activity by name
#[derive(Debug, Clone, PartialEq)]
pub struct FlowQuery<'a> {
    /// The name pattern to search for
    pub pattern: &'a str,
    /// Whether names must match `pattern` exactly rather than contain it
    pub exact: bool,
    /// Whether to log the matched names when the match is ambiguous
    pub verbose: bool,
}

impl<'a> FlowQuery<'a> {
    /// A substring search for `pattern`
    pub fn contains(pattern: &'a str) -> Self {
        Self {
            pattern,
            exact: false,
            verbose: true,
        }
    }

    /// A search requiring names equal to `pattern`
    pub fn exact(pattern: &'a str) -> Self {
        Self {
            pattern,
            exact: true,
            verbose: true,
        }
    }

    /// Create a query with explicit matching mode
    pub fn new(pattern: &'a str, exact: bool) -> Self {
        Self {
            pattern,
            exact,
            verbose: true,
        }
    }

    /// Set whether ambiguous matches are listed in the log
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Whether an exchange name matches this query
    pub fn matches(&self, name: &str) -> bool {
        if self.exact {
            name == self.pattern
        } else {
            name.contains(self.pattern)
        }
    }

    /// Check that the pattern is usable
    fn validate(&self) -> Result<()> {
        if self.pattern.is_empty() {
            bail!(FlowError::InvalidArgument(
                "flow name pattern cannot be empty".into()
            ));
        }

        Ok(())
    }
}

/// Find the exchanges of the given type on an activity whose names match `query`.
///
/// Matches are returned in the store's native exchange order. If the number of matches is not
/// exactly one, a warning is logged, followed by the matched names if `query.verbose` is set.
pub fn locate<S>(
    store: &S,
    key: &ActivityKey,
    kind: ExchangeKind,
    query: &FlowQuery,
) -> Result<Vec<Exchange>>
where
    S: InventoryStore + ?Sized,
{
    query.validate()?;

    let matches = store
        .exchanges(key, kind)?
        .into_iter()
        .filter(|ex| query.matches(&ex.name))
        .collect_vec();

    if matches.len() != 1 {
        warn!(
            "Found {} {kind} flows matching \"{}\" in activity {key}",
            matches.len(),
            query.pattern
        );
        if query.verbose {
            for ex in &matches {
                warn!("  {}", ex.name);
            }
        }
    }

    Ok(matches)
}

/// Find matching technosphere exchanges on an activity (see [`locate`])
pub fn locate_technosphere<S>(
    store: &S,
    key: &ActivityKey,
    query: &FlowQuery,
) -> Result<Vec<Exchange>>
where
    S: InventoryStore + ?Sized,
{
    locate(store, key, ExchangeKind::Technosphere, query)
}

/// Find matching biosphere exchanges on an activity (see [`locate`])
pub fn locate_biosphere<S>(
    store: &S,
    key: &ActivityKey,
    query: &FlowQuery,
) -> Result<Vec<Exchange>>
where
    S: InventoryStore + ?Sized,
{
    locate(store, key, ExchangeKind::Biosphere, query)
}

/// How many elements a query returned
#[derive(Debug, PartialEq)]
pub enum Multiplicity<T> {
    /// Nothing matched
    Zero,
    /// Exactly one match
    One(T),
    /// More than one match (always contains at least two elements)
    Many(Vec<T>),
}

impl<T> Multiplicity<T> {
    /// Classify a vector of results by its length
    pub fn from_vec(mut items: Vec<T>) -> Self {
        match items.len() {
            0 => Self::Zero,
            1 => Self::One(items.remove(0)),
            _ => Self::Many(items),
        }
    }

    /// The number of elements
    pub fn len(&self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    /// Whether there are no elements
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Zero)
    }

    /// Return the single element, or an error describing how many there were
    pub fn single(self) -> Result<T> {
        match self {
            Self::One(item) => Ok(item),
            Self::Zero => bail!("Query returned no results"),
            Self::Many(items) => bail!("Query returned too many results ({})", items.len()),
        }
    }
}

impl Multiplicity<Exchange> {
    /// Sum of the amounts of the contained exchanges
    pub fn total_amount(&self) -> f64 {
        match self {
            Self::Zero => 0.0,
            Self::One(ex) => ex.amount,
            Self::Many(exchanges) => exchanges.iter().map(|ex| ex.amount).sum(),
        }
    }

    /// The distinct units of the contained exchanges, in order of first appearance
    pub fn units(&self) -> Vec<&str> {
        match self {
            Self::Zero => Vec::new(),
            Self::One(ex) => vec![ex.unit.as_str()],
            Self::Many(exchanges) => exchanges
                .iter()
                .map(|ex| ex.unit.as_str())
                .unique()
                .collect(),
        }
    }
}

/// Check that a set of matched exchanges identifies a single kind of flow.
///
/// Operations that modify flows need every match to share one name; otherwise the pattern was too
/// loose (e.g. "hard coal" also matching "hard coal ash"). An empty set is a
/// [`FlowError::FlowNotFound`] error.
pub fn require_uniform_name(
    exchanges: &[Exchange],
    key: &ActivityKey,
    kind: ExchangeKind,
    query: &FlowQuery,
) -> Result<()> {
    let names = exchanges
        .iter()
        .map(|ex| ex.name.as_str())
        .unique()
        .collect_vec();
    match names.len() {
        0 => bail!(FlowError::FlowNotFound {
            kind,
            pattern: query.pattern.to_string(),
            activity: key.to_string(),
        }),
        1 => Ok(()),
        _ => bail!(FlowError::InconsistentIdentification {
            pattern: query.pattern.to_string(),
            names: names.into_iter().map(String::from).collect(),
        }),
    }
}

/// The combined multiplicity of two independently located flow sets (e.g. a fuel input and an
/// emission), reduced to the cases that call for different behaviour.
#[derive(Debug, PartialEq)]
pub enum DualMultiplicity<'a> {
    /// The first (denominator) flow set is empty, so no ratio can be formed
    NoDenominator,
    /// The denominator is present but the numerator flow set is empty
    NoNumerator,
    /// Exactly one flow on each side
    OnePerSide {
        /// The numerator flow
        numerator: &'a Exchange,
        /// The denominator flow
        denominator: &'a Exchange,
    },
    /// Several flows on at least one side; amounts are summed per side
    Summed {
        /// Sum of numerator amounts
        numerator: f64,
        /// Sum of denominator amounts
        denominator: f64,
    },
}

impl<'a> DualMultiplicity<'a> {
    /// Classify a pair of flow sets
    pub fn classify(
        numerator: &'a Multiplicity<Exchange>,
        denominator: &'a Multiplicity<Exchange>,
    ) -> Self {
        match (numerator, denominator) {
            (_, Multiplicity::Zero) => Self::NoDenominator,
            (Multiplicity::Zero, _) => Self::NoNumerator,
            (Multiplicity::One(num), Multiplicity::One(den)) => Self::OnePerSide {
                numerator: num,
                denominator: den,
            },
            (num, den) => Self::Summed {
                numerator: num.total_amount(),
                denominator: den.total_amount(),
            },
        }
    }
}
