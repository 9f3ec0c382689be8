//! Risk model configuration.
//!
//! Every threshold, weight and breakpoint the classifier uses lives here.
//! Configuration is read from TOML; any key left out keeps its default,
//! including individual keys inside a partially specified table.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr as _;

use farm_map_facility_models::FacilityType;
use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{ProximityBand, RiskCategory};

/// The default configuration as a TOML document.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Built-in facility type multipliers, reflecting differential pollution
/// potential.
pub const DEFAULT_TYPE_WEIGHTS: &[(FacilityType, f64)] = &[
    (FacilityType::Slaughterhouse, 1.5),
    (FacilityType::Cafo, 1.5),
    (FacilityType::MeatProcessing, 1.4),
    (FacilityType::Piggery, 1.3),
    (FacilityType::Dairy, 1.2),
    (FacilityType::Poultry, 1.2),
    (FacilityType::Aquaculture, 1.2),
    (FacilityType::FeedMill, 0.9),
    (FacilityType::Hatchery, 0.8),
    (FacilityType::Other, 1.0),
];

/// Errors from loading or validating a [`RiskConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A distance, weight or contribution is negative or non-finite.
    #[error("{field} must be a finite, non-negative number (got {value})")]
    InvalidValue {
        /// Dotted path of the offending key.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// A proximity table's bands overlap or exceed its search radius.
    #[error(
        "{factor} thresholds must satisfy high_within_m <= medium_within_m <= search_radius_m \
         (got {high_within_m}, {medium_within_m}, {search_radius_m})"
    )]
    MisorderedThresholds {
        factor: &'static str,
        high_within_m: f64,
        medium_within_m: f64,
        search_radius_m: f64,
    },

    /// Category breakpoints are not strictly increasing.
    #[error(
        "breakpoints must satisfy moderate < high < severe (got {moderate}, {high}, {severe})"
    )]
    MisorderedBreakpoints { moderate: f64, high: f64, severe: f64 },

    /// Population weighting has a non-positive reference or a floor outside
    /// `0..=1`.
    #[error("settlement_population.{field} out of range (got {value})")]
    InvalidPopulationWeighting { field: &'static str, value: f64 },

    /// A type weight override names no known facility type.
    #[error("Unknown facility type '{0}' in facility_type_weights")]
    UnknownFacilityType(String),

    /// The TOML document could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a partition's member scores combine into one hotspot score.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum AggregationMode {
    /// Highest member score; one severe facility is never diluted.
    #[default]
    Max,
    /// Arithmetic mean of member scores.
    Mean,
}

/// Piecewise distance scale for one proximity factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProximityThresholds {
    /// Distances up to and including this are [`ProximityBand::High`].
    pub high_within_m: f64,
    /// Distances up to and including this (and beyond `high_within_m`) are
    /// [`ProximityBand::Medium`].
    pub medium_within_m: f64,
    /// Nothing farther than this is considered at all.
    pub search_radius_m: f64,
    pub high_contribution: f64,
    pub medium_contribution: f64,
    pub low_contribution: f64,
}

impl ProximityThresholds {
    /// Defaults for distance to the nearest water body.
    #[must_use]
    pub const fn water() -> Self {
        Self {
            high_within_m: 500.0,
            medium_within_m: 2_000.0,
            search_radius_m: 10_000.0,
            high_contribution: 1.0,
            medium_contribution: 0.5,
            low_contribution: 0.0,
        }
    }

    /// Defaults for distance to the nearest settlement.
    #[must_use]
    pub const fn settlement() -> Self {
        Self {
            high_within_m: 1_000.0,
            medium_within_m: 5_000.0,
            search_radius_m: 10_000.0,
            high_contribution: 1.0,
            medium_contribution: 0.5,
            low_contribution: 0.0,
        }
    }

    /// Band for a distance. Both boundaries are inclusive.
    #[must_use]
    pub fn band(&self, distance_m: f64) -> ProximityBand {
        if distance_m <= self.high_within_m {
            ProximityBand::High
        } else if distance_m <= self.medium_within_m {
            ProximityBand::Medium
        } else {
            ProximityBand::Low
        }
    }

    #[must_use]
    pub const fn contribution(&self, band: ProximityBand) -> f64 {
        match band {
            ProximityBand::High => self.high_contribution,
            ProximityBand::Medium => self.medium_contribution,
            ProximityBand::Low => self.low_contribution,
        }
    }

    fn validate(&self, factor: &'static str) -> Result<(), ConfigError> {
        non_negative(factor, "high_within_m", self.high_within_m)?;
        non_negative(factor, "medium_within_m", self.medium_within_m)?;
        non_negative(factor, "search_radius_m", self.search_radius_m)?;
        non_negative(factor, "high_contribution", self.high_contribution)?;
        non_negative(factor, "medium_contribution", self.medium_contribution)?;
        non_negative(factor, "low_contribution", self.low_contribution)?;

        if self.high_within_m > self.medium_within_m
            || self.medium_within_m > self.search_radius_m
        {
            return Err(ConfigError::MisorderedThresholds {
                factor,
                high_within_m: self.high_within_m,
                medium_within_m: self.medium_within_m,
                search_radius_m: self.search_radius_m,
            });
        }
        Ok(())
    }
}

/// Keys of a partially specified threshold table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ThresholdOverrides {
    high_within_m: Option<f64>,
    medium_within_m: Option<f64>,
    search_radius_m: Option<f64>,
    high_contribution: Option<f64>,
    medium_contribution: Option<f64>,
    low_contribution: Option<f64>,
}

impl ThresholdOverrides {
    fn apply(self, base: ProximityThresholds) -> ProximityThresholds {
        ProximityThresholds {
            high_within_m: self.high_within_m.unwrap_or(base.high_within_m),
            medium_within_m: self.medium_within_m.unwrap_or(base.medium_within_m),
            search_radius_m: self.search_radius_m.unwrap_or(base.search_radius_m),
            high_contribution: self.high_contribution.unwrap_or(base.high_contribution),
            medium_contribution: self
                .medium_contribution
                .unwrap_or(base.medium_contribution),
            low_contribution: self.low_contribution.unwrap_or(base.low_contribution),
        }
    }
}

fn water_thresholds<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<ProximityThresholds, D::Error> {
    ThresholdOverrides::deserialize(deserializer)
        .map(|overrides| overrides.apply(ProximityThresholds::water()))
}

fn settlement_thresholds<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<ProximityThresholds, D::Error> {
    ThresholdOverrides::deserialize(deserializer)
        .map(|overrides| overrides.apply(ProximityThresholds::settlement()))
}

/// Scales the settlement factor by the nearest settlement's population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopulationWeighting {
    pub enabled: bool,
    /// Population at and above which the full band contribution applies.
    pub reference_population: f64,
    /// Multiplier for an unpopulated settlement.
    pub floor: f64,
}

impl Default for PopulationWeighting {
    fn default() -> Self {
        Self {
            enabled: false,
            reference_population: 10_000.0,
            floor: 0.5,
        }
    }
}

impl PopulationWeighting {
    /// `floor + (1 - floor) * min(1, population / reference)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn multiplier(&self, population: u64) -> f64 {
        let share = (population as f64 / self.reference_population).min(1.0);
        (1.0 - self.floor).mul_add(share, self.floor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroundwaterSettings {
    /// Samples within this distance of a facility are considered.
    pub search_radius_m: f64,
    /// Cap on what any single exceedance can add.
    pub max_exceedance_contribution: f64,
    /// Cap on the summed groundwater factor.
    pub max_factor: f64,
}

impl Default for GroundwaterSettings {
    fn default() -> Self {
        Self {
            search_radius_m: 5_000.0,
            max_exceedance_contribution: 1.0,
            max_factor: 1.0,
        }
    }
}

/// Weights of the additive factors in the base score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactorWeights {
    pub water: f64,
    pub settlement: f64,
    pub groundwater: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            water: 0.4,
            settlement: 0.3,
            groundwater: 0.3,
        }
    }
}

/// Lowest score of each category above [`RiskCategory::Low`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryBreakpoints {
    pub moderate: f64,
    pub high: f64,
    pub severe: f64,
}

impl Default for CategoryBreakpoints {
    fn default() -> Self {
        Self {
            moderate: 0.25,
            high: 0.5,
            severe: 0.8,
        }
    }
}

impl CategoryBreakpoints {
    /// Category for `score`. A score equal to a breakpoint belongs to the
    /// higher category.
    #[must_use]
    pub fn categorize(&self, score: f64) -> RiskCategory {
        if score >= self.severe {
            RiskCategory::Severe
        } else if score >= self.high {
            RiskCategory::High
        } else if score >= self.moderate {
            RiskCategory::Moderate
        } else {
            RiskCategory::Low
        }
    }
}

/// Complete risk model configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskConfig {
    pub aggregation: AggregationMode,
    #[serde(deserialize_with = "water_thresholds")]
    pub water: ProximityThresholds,
    #[serde(deserialize_with = "settlement_thresholds")]
    pub settlement: ProximityThresholds,
    pub settlement_population: PopulationWeighting,
    pub groundwater: GroundwaterSettings,
    pub weights: FactorWeights,
    /// Overrides of [`DEFAULT_TYPE_WEIGHTS`], keyed by facility type name.
    /// Registry aliases such as `poultry_layer` are accepted.
    pub facility_type_weights: BTreeMap<String, f64>,
    pub breakpoints: CategoryBreakpoints,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            aggregation: AggregationMode::default(),
            water: ProximityThresholds::water(),
            settlement: ProximityThresholds::settlement(),
            settlement_population: PopulationWeighting::default(),
            groundwater: GroundwaterSettings::default(),
            weights: FactorWeights::default(),
            facility_type_weights: BTreeMap::new(),
            breakpoints: CategoryBreakpoints::default(),
        }
    }
}

impl RiskConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed, has unknown keys, or
    /// fails [`Self::validate`].
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or
    /// [`Self::from_toml_str`] fails.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.water.validate("water")?;
        self.settlement.validate("settlement")?;

        let population = &self.settlement_population;
        if !population.reference_population.is_finite() || population.reference_population <= 0.0
        {
            return Err(ConfigError::InvalidPopulationWeighting {
                field: "reference_population",
                value: population.reference_population,
            });
        }
        if !(0.0..=1.0).contains(&population.floor) {
            return Err(ConfigError::InvalidPopulationWeighting {
                field: "floor",
                value: population.floor,
            });
        }

        non_negative("groundwater", "search_radius_m", self.groundwater.search_radius_m)?;
        non_negative(
            "groundwater",
            "max_exceedance_contribution",
            self.groundwater.max_exceedance_contribution,
        )?;
        non_negative("groundwater", "max_factor", self.groundwater.max_factor)?;

        non_negative("weights", "water", self.weights.water)?;
        non_negative("weights", "settlement", self.weights.settlement)?;
        non_negative("weights", "groundwater", self.weights.groundwater)?;

        let breakpoints = &self.breakpoints;
        non_negative("breakpoints", "moderate", breakpoints.moderate)?;
        non_negative("breakpoints", "high", breakpoints.high)?;
        non_negative("breakpoints", "severe", breakpoints.severe)?;
        if breakpoints.moderate >= breakpoints.high || breakpoints.high >= breakpoints.severe {
            return Err(ConfigError::MisorderedBreakpoints {
                moderate: breakpoints.moderate,
                high: breakpoints.high,
                severe: breakpoints.severe,
            });
        }

        self.type_weights().map(|_| ())
    }

    /// The effective multiplier for every facility type: built-in values
    /// with the configured overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if an override names an unknown type or carries a
    /// negative or non-finite weight.
    pub fn type_weights(&self) -> Result<BTreeMap<FacilityType, f64>, ConfigError> {
        let mut weights: BTreeMap<FacilityType, f64> =
            DEFAULT_TYPE_WEIGHTS.iter().copied().collect();

        for (name, weight) in &self.facility_type_weights {
            let facility_type = FacilityType::from_str(name.trim())
                .map_err(|_| ConfigError::UnknownFacilityType(name.clone()))?;
            non_negative("facility_type_weights", name, *weight)?;
            weights.insert(facility_type, *weight);
        }

        Ok(weights)
    }
}

fn non_negative(section: &str, key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: format!("{section}.{key}"),
            value,
        })
    }
}
