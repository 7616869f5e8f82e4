//! Tidy representation of TIMES model results and the greenhouse-gas totals derived from them.
use crate::id::define_id_type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;

define_id_type! {ProcessID}

/// Commodities treated as emissions by default
pub const DEFAULT_BIOSPHERE_PATTERN: &str = "CH4|CO2|N2O";

/// Commodities which are not technosphere flows by default (emissions and GHG aggregates)
pub const DEFAULT_NON_TECHNOSPHERE_PATTERN: &str = "CH4|CO2|N2O|GHG";

/// One value of a TIMES result for a given attribute, commodity, process, year and time slice
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct TimesRecord {
    /// The TIMES attribute (e.g. `VAR_FIn`, `VAR_FOut`)
    pub attribute: String,
    /// The commodity code (e.g. `ELCCO2`)
    pub commodity: String,
    /// The process code
    pub process: ProcessID,
    /// The model year
    pub year: u32,
    /// The time slice (e.g. `ANNUAL`, `WD`)
    pub time_slice: String,
    /// The value
    pub value: f64,
}

/// The results of a single TIMES scenario
#[derive(PartialEq, Debug, Clone)]
pub struct TimesTable {
    /// The scenario name
    pub scenario: String,
    /// Result values in file order
    pub records: Vec<TimesRecord>,
}

/// A set of alternative substrings, written separated by `|` (e.g. `CH4|CO2|N2O`)
#[derive(PartialEq, Debug, Clone)]
pub struct CommodityPattern(Vec<String>);

impl CommodityPattern {
    /// Create a pattern from its `|`-separated form
    pub fn new(pattern: &str) -> Self {
        Self(
            pattern
                .split('|')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Whether `commodity` contains any of the alternatives
    pub fn matches(&self, commodity: &str) -> bool {
        self.0.iter().any(|part| commodity.contains(part.as_str()))
    }
}

impl FromStr for CommodityPattern {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// Split TIMES records into biosphere (emission) and technosphere flows.
///
/// # Arguments
///
/// * `records` - The records to split
/// * `inclusive` - Records whose commodity matches this are biosphere flows
/// * `exclusive` - Records whose commodity matches none of this are technosphere flows
///
/// # Returns
///
/// A tuple of `(biosphere, technosphere)` records. Records matching `exclusive` but not
/// `inclusive` (e.g. GHG totals) are in neither.
pub fn split_flows<'a>(
    records: &'a [TimesRecord],
    inclusive: &CommodityPattern,
    exclusive: &CommodityPattern,
) -> (Vec<&'a TimesRecord>, Vec<&'a TimesRecord>) {
    let biosphere = records
        .iter()
        .filter(|record| inclusive.matches(&record.commodity))
        .collect();
    let technosphere = records
        .iter()
        .filter(|record| !exclusive.matches(&record.commodity))
        .collect();

    (biosphere, technosphere)
}

/// Global warming potentials used to convert emissions to CO2 equivalents.
///
/// The defaults are the IPCC 2013 values as implemented by ecoinvent.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GlobalWarmingPotentials {
    /// GWP of methane
    pub ch4: f64,
    /// GWP of nitrous oxide
    pub n2o: f64,
}

impl Default for GlobalWarmingPotentials {
    fn default() -> Self {
        Self {
            ch4: 29.7,
            n2o: 264.8,
        }
    }
}

impl GlobalWarmingPotentials {
    /// The factor to convert an amount of `commodity` into CO2 equivalents
    fn factor(&self, commodity: &str) -> f64 {
        let mut factor = 1.0;
        if commodity.contains("CH4") {
            factor *= self.ch4;
        }
        if commodity.contains("N2O") {
            factor *= self.n2o;
        }

        factor
    }
}

/// Total CO2-equivalent emissions per process.
///
/// Values are summed over all years and time slices. Records for CH4 and N2O commodities are
/// weighted by their GWP; all other records count as CO2.
///
/// # Returns
///
/// A map of process to CO2eq total, ordered from largest to smallest.
pub fn co2eq_by_process<'a, I>(
    records: I,
    gwp: &GlobalWarmingPotentials,
) -> IndexMap<ProcessID, f64>
where
    I: IntoIterator<Item = &'a TimesRecord>,
{
    let mut totals: IndexMap<ProcessID, f64> = IndexMap::new();
    for record in records {
        *totals.entry(record.process.clone()).or_default() +=
            record.value * gwp.factor(&record.commodity);
    }
    totals.sort_by(|_, a, _, b| b.total_cmp(a));

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    fn record(commodity: &str, process: &str, year: u32, value: f64) -> TimesRecord {
        TimesRecord {
            attribute: "VAR_FOut".into(),
            commodity: commodity.into(),
            process: process.into(),
            year,
            time_slice: "ANNUAL".into(),
            value,
        }
    }

    #[fixture]
    fn records() -> Vec<TimesRecord> {
        vec![
            record("ELCCO2", "ELCCOA", 2020, 10.0),
            record("ELCCO2", "ELCCOA", 2030, 5.0),
            record("ELCCH4", "ELCCOA", 2020, 0.1),
            record("ELCN2O", "ELCGAS", 2020, 0.01),
            record("ELCCO2", "ELCGAS", 2020, 1.0),
            record("TOTGHG", "ELCGAS", 2020, 100.0),
            record("ELC", "ELCGAS", 2020, 50.0),
        ]
    }

    #[test]
    fn pattern_matching() {
        let pattern = CommodityPattern::new("CH4| CO2 |");
        assert!(pattern.matches("ELCCH4"));
        assert!(pattern.matches("CO2"));
        assert!(!pattern.matches("N2O"));
        assert!(CommodityPattern::new(DEFAULT_BIOSPHERE_PATTERN).matches("AGRN2O"));
    }

    #[rstest]
    fn split_flows_default_patterns(records: Vec<TimesRecord>) {
        let inclusive = CommodityPattern::new(DEFAULT_BIOSPHERE_PATTERN);
        let exclusive = CommodityPattern::new(DEFAULT_NON_TECHNOSPHERE_PATTERN);
        let (biosphere, technosphere) = split_flows(&records, &inclusive, &exclusive);

        assert_eq!(biosphere.len(), 5);
        assert!(biosphere.iter().all(|r| r.commodity != "TOTGHG"));
        assert_eq!(technosphere, vec![&records[6]]);
    }

    #[rstest]
    fn co2eq_weighted_and_sorted(records: Vec<TimesRecord>) {
        let (biosphere, _) = split_flows(
            &records,
            &CommodityPattern::new(DEFAULT_BIOSPHERE_PATTERN),
            &CommodityPattern::new(DEFAULT_NON_TECHNOSPHERE_PATTERN),
        );
        let gwp = GlobalWarmingPotentials::default();
        let totals = co2eq_by_process(biosphere, &gwp);

        assert_eq!(
            totals.keys().map(ToString::to_string).collect::<Vec<_>>(),
            ["ELCCOA", "ELCGAS"]
        );
        assert_approx_eq!(f64, totals["ELCCOA"], 15.0 + 0.1 * 29.7);
        assert_approx_eq!(f64, totals["ELCGAS"], 1.0 + 0.01 * 264.8);
    }

    #[test]
    fn co2eq_order_descending() {
        let records = [
            record("CO2", "SMALL", 2020, 1.0),
            record("CO2", "LARGE", 2020, 3.0),
            record("CO2", "NEGATIVE", 2020, -2.0),
        ];
        let totals = co2eq_by_process(&records, &GlobalWarmingPotentials::default());
        assert_eq!(
            totals.into_iter().collect::<Vec<_>>(),
            [
                (ProcessID::new("LARGE"), 3.0),
                (ProcessID::new("SMALL"), 1.0),
                (ProcessID::new("NEGATIVE"), -2.0)
            ]
        );
    }
}
