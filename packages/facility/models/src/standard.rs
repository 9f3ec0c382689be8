//! Drinking-water quality standard tables.
//!
//! A standard is plain data (parameter name to permissible range) handed to
//! the registry with the rest of the input, so alternate or revised tables
//! can be loaded side by side.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Name of the built-in BIS 10500 table.
pub const BIS_10500_NAME: &str = "BIS 10500:2012";

struct BisEntry {
    parameter: &'static str,
    min: Option<f64>,
    max: Option<f64>,
    desirable: Option<f64>,
    unit: Option<&'static str>,
}

/// IS 10500:2012 drinking-water limits, in the units the monitoring
/// network reports.
const BIS_10500_LIMITS: &[BisEntry] = &[
    BisEntry {
        parameter: "nitrate",
        min: None,
        max: Some(45.0),
        desirable: Some(45.0),
        unit: Some("mg/L"),
    },
    BisEntry {
        parameter: "fluoride",
        min: None,
        max: Some(1.5),
        desirable: Some(1.0),
        unit: Some("mg/L"),
    },
    BisEntry {
        parameter: "total_dissolved_solids",
        min: None,
        max: Some(2000.0),
        desirable: Some(500.0),
        unit: Some("mg/L"),
    },
    BisEntry {
        parameter: "ammonia",
        min: None,
        max: Some(0.5),
        desirable: Some(0.5),
        unit: Some("mg/L"),
    },
    BisEntry {
        parameter: "total_coliform",
        min: None,
        max: Some(0.0),
        desirable: Some(0.0),
        unit: Some("MPN/100 mL"),
    },
    BisEntry {
        parameter: "iron",
        min: None,
        max: Some(1.0),
        desirable: Some(0.3),
        unit: Some("mg/L"),
    },
    BisEntry {
        parameter: "ph",
        min: Some(6.5),
        max: Some(8.5),
        desirable: None,
        unit: None,
    },
];

/// Which side of a permissible range a measurement fell on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LimitBound {
    /// Above the permissible maximum.
    Max,
    /// Below the permissible minimum.
    Min,
}

/// A measurement outside its permissible range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breach {
    pub bound: LimitBound,
    /// The bound that was crossed.
    pub limit: f64,
}

/// Permissible range for one parameter.
///
/// Either bound may be absent. Input may give a bare number, which is read
/// as a maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LimitSpec")]
pub struct ParameterLimit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Desirable (acceptable) level, informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desirable: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LimitSpec {
    Max(f64),
    Range {
        min: Option<f64>,
        max: Option<f64>,
        desirable: Option<f64>,
        unit: Option<String>,
    },
}

impl From<LimitSpec> for ParameterLimit {
    fn from(spec: LimitSpec) -> Self {
        match spec {
            LimitSpec::Max(max) => Self::at_most(max),
            LimitSpec::Range {
                min,
                max,
                desirable,
                unit,
            } => Self {
                min,
                max,
                desirable,
                unit,
            },
        }
    }
}

impl ParameterLimit {
    /// An upper limit only.
    #[must_use]
    pub const fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
            desirable: None,
            unit: None,
        }
    }

    /// A closed permissible range.
    #[must_use]
    pub const fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            desirable: None,
            unit: None,
        }
    }

    /// The bound `measured` crosses, if any. Values equal to a bound are
    /// permissible.
    #[must_use]
    pub fn breach(&self, measured: f64) -> Option<Breach> {
        if let Some(max) = self.max.filter(|max| measured > *max) {
            return Some(Breach {
                bound: LimitBound::Max,
                limit: max,
            });
        }
        self.min.filter(|min| measured < *min).map(|min| Breach {
            bound: LimitBound::Min,
            limit: min,
        })
    }
}

/// A named table of permissible parameter ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterQualityStandard {
    pub name: String,
    pub limits: BTreeMap<String, ParameterLimit>,
}

impl WaterQualityStandard {
    /// The BIS 10500:2012 table.
    #[must_use]
    pub fn bis_10500() -> Self {
        Self {
            name: BIS_10500_NAME.to_string(),
            limits: BIS_10500_LIMITS
                .iter()
                .map(|entry| {
                    (
                        entry.parameter.to_string(),
                        ParameterLimit {
                            min: entry.min,
                            max: entry.max,
                            desirable: entry.desirable,
                            unit: entry.unit.map(str::to_string),
                        },
                    )
                })
                .collect(),
        }
    }

    /// Permissible range for `parameter`, if the table regulates it.
    #[must_use]
    pub fn limit(&self, parameter: &str) -> Option<&ParameterLimit> {
        self.limits.get(parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bis_table_has_nitrate_limit() {
        let bis = WaterQualityStandard::bis_10500();
        assert_eq!(bis.name, BIS_10500_NAME);
        let nitrate = bis.limit("nitrate").unwrap();
        assert_eq!(nitrate.max, Some(45.0));
        assert_eq!(nitrate.unit.as_deref(), Some("mg/L"));
        assert_eq!(bis.limit("total_coliform").unwrap().max, Some(0.0));
        assert!(bis.limit("arsenic").is_none());
    }

    #[test]
    fn ph_is_regulated_on_both_sides() {
        let bis = WaterQualityStandard::bis_10500();
        let ph = bis.limit("ph").unwrap();
        assert_eq!(ph.breach(7.2), None);
        assert_eq!(ph.breach(6.5), None);
        assert_eq!(ph.breach(8.5), None);
        assert_eq!(
            ph.breach(4.0),
            Some(Breach {
                bound: LimitBound::Min,
                limit: 6.5
            })
        );
        assert_eq!(
            ph.breach(9.1),
            Some(Breach {
                bound: LimitBound::Max,
                limit: 8.5
            })
        );
    }

    #[test]
    fn limits_parse_from_number_or_table() {
        let standard: WaterQualityStandard = serde_json::from_str(
            r#"{
                "name": "WHO 2017",
                "limits": {
                    "nitrate": 50.0,
                    "ph": {"min": 6.5, "max": 9.5},
                    "iron": {"max": 0.3, "unit": "mg/L"}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(standard.limit("nitrate"), Some(&ParameterLimit::at_most(50.0)));
        assert_eq!(standard.limit("ph"), Some(&ParameterLimit::between(6.5, 9.5)));
        assert_eq!(standard.limit("iron").unwrap().unit.as_deref(), Some("mg/L"));
    }

    #[test]
    fn bis_table_round_trips() {
        let bis = WaterQualityStandard::bis_10500();
        let json = serde_json::to_string(&bis).unwrap();
        let parsed: WaterQualityStandard = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, bis);
    }
}
