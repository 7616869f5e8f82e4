//! The harmonisation ledger: a per-activity record of which harmonisation operations have been
//! applied to it.
use crate::inventory::{ActivityKey, InventoryStore};
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use log::debug;
use std::fmt;
use std::str::FromStr;

/// An operation (or annotation) recorded in a [`HarmonisationRecord`]
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
pub enum HarmonisationTag {
    /// The provider of a technosphere flow was substituted
    #[strum(serialize = "tflow_origin")]
    TechnosphereOrigin,
    /// A technosphere flow was rescaled
    #[strum(serialize = "tfow_scaled")]
    TechnosphereScaled,
    /// A biosphere flow (emission factor) was rescaled
    #[strum(serialize = "ef_scaled")]
    EmissionScaled,
    /// Fuel consumption and air emissions were rescaled together (efficiency change)
    #[strum(serialize = "eff_scaled")]
    EfficiencyScaled,
    /// The energy-model scenario this activity was harmonised for
    #[strum(serialize = "scenario")]
    Scenario,
    /// The TIMES process code this activity represents
    #[strum(serialize = "times_pcode")]
    TimesProcessCode,
}

impl HarmonisationTag {
    /// Whether this tag marks an operation (recorded as a flag) rather than carrying text
    pub fn is_flag(self) -> bool {
        !matches!(self, Self::Scenario | Self::TimesProcessCode)
    }
}

/// Separates entries of a [`HarmonisationRecord`] in its text form
const ENTRY_SEPARATOR: &str = ";";

/// The value recorded against a [`HarmonisationTag`]
#[derive(Clone, Debug, PartialEq)]
pub enum HarmonisationValue {
    /// A simple marker
    Flag(bool),
    /// Free text (e.g. a scenario name)
    Text(String),
}

impl From<bool> for HarmonisationValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for HarmonisationValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for HarmonisationValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for HarmonisationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => write!(f, "{flag}"),
            Self::Text(text) => write!(f, "{text}"),
        }
    }
}

impl HarmonisationValue {
    /// Parse the text form of a value recorded against `tag`
    fn parse_for(tag: HarmonisationTag, s: &str) -> Result<Self> {
        if !tag.is_flag() {
            return Ok(Self::Text(s.to_string()));
        }

        let flag = s
            .parse::<bool>()
            .with_context(|| format!("Invalid value for {tag}: {s} (expected true or false)"))?;
        Ok(Self::Flag(flag))
    }

    /// Check that this value can be recorded against `tag` and written out unchanged
    pub fn check(&self, tag: HarmonisationTag) -> Result<()> {
        match self {
            Self::Flag(_) => ensure!(tag.is_flag(), "{tag} takes a text value, not a flag"),
            Self::Text(text) => {
                ensure!(!tag.is_flag(), "{tag} takes a flag value, not text");
                ensure!(
                    !text.contains(ENTRY_SEPARATOR),
                    "Value for {tag} cannot contain '{ENTRY_SEPARATOR}' (got \"{text}\")"
                );
                ensure!(
                    text.trim() == text && !text.is_empty(),
                    "Value for {tag} cannot be empty or padded with whitespace (got \"{text}\")"
                );
            }
        }

        Ok(())
    }
}

/// The harmonisation operations applied to an activity.
///
/// Updates are merges: recording a tag never discards other tags.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HarmonisationRecord(IndexMap<HarmonisationTag, HarmonisationValue>);

impl HarmonisationRecord {
    /// Record a value for `tag`, keeping all other entries.
    ///
    /// Fails if the value does not suit the tag (see [`HarmonisationValue::check`]).
    pub fn merge(&mut self, tag: HarmonisationTag, value: HarmonisationValue) -> Result<()> {
        value.check(tag)?;
        self.0.insert(tag, value);

        Ok(())
    }

    /// Get the value recorded for `tag`
    pub fn get(&self, tag: HarmonisationTag) -> Option<&HarmonisationValue> {
        self.0.get(&tag)
    }

    /// Whether a value has been recorded for `tag`
    pub fn contains(&self, tag: HarmonisationTag) -> bool {
        self.0.contains_key(&tag)
    }

    /// Whether the record has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over recorded entries in the order they were first recorded
    pub fn iter(&self) -> impl Iterator<Item = (HarmonisationTag, &HarmonisationValue)> {
        self.0.iter().map(|(tag, value)| (*tag, value))
    }
}

/// Written as `;`-separated `tag=value` pairs, e.g. `tfow_scaled=true;scenario=BASE`
impl fmt::Display for HarmonisationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.iter().format_with(ENTRY_SEPARATOR, |(tag, value), f| {
                f(&format_args!("{tag}={value}"))
            })
        )
    }
}

impl FromStr for HarmonisationRecord {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut record = Self::default();
        for entry in s
            .split(ENTRY_SEPARATOR)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
        {
            let Some((tag, value)) = entry.split_once('=') else {
                bail!("Invalid harmonisation entry: {entry} (expected tag=value)");
            };
            let tag = tag
                .trim()
                .parse::<HarmonisationTag>()
                .with_context(|| format!("Unknown harmonisation tag: {}", tag.trim()))?;
            let value = HarmonisationValue::parse_for(tag, value.trim())?;
            record.merge(tag, value)?;
        }

        Ok(record)
    }
}

/// Record that an operation has been applied to an activity.
///
/// The activity's record is created if absent; existing entries are kept. The updated activity is
/// written back to the store.
pub fn record_operation<S, V>(
    store: &mut S,
    key: &ActivityKey,
    tag: HarmonisationTag,
    value: V,
) -> Result<()>
where
    S: InventoryStore + ?Sized,
    V: Into<HarmonisationValue>,
{
    let mut activity = store.activity(key)?.clone();
    let value = value.into();
    debug!("Recording harmonisation {tag}={value} on activity {key}");
    activity
        .harmonisation
        .get_or_insert_with(HarmonisationRecord::default)
        .merge(tag, value)?;

    store.save_activity(&activity)
}

/// Whether any harmonisation operation has been recorded on an activity.
///
/// Errors from the store (e.g. an unknown key) are returned rather than treated as "unmodified".
pub fn is_modified<S>(store: &S, key: &ActivityKey) -> Result<bool>
where
    S: InventoryStore + ?Sized,
{
    let activity = store.activity(key)?;
    Ok(activity
        .harmonisation
        .as_ref()
        .is_some_and(|record| !record.is_empty()))
}
