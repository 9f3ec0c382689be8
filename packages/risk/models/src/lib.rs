#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Risk model types shared by the classifier, the hotspot aggregator and
//! the exporters.
//!
//! An assessment never carries a bare score. Every [`RiskAssessment`] lists
//! one [`RiskFactor`] per [`FactorKind`] with the [`Finding`] behind it, so
//! downstream reports can explain each result and can tell "no data"
//! apart from "nothing found".

pub mod config;

use farm_map_facility_models::{Coordinate, FacilityType, LimitBound};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use config::{
    AggregationMode, CategoryBreakpoints, ConfigError, DEFAULT_CONFIG_TOML, DEFAULT_TYPE_WEIGHTS,
    FactorWeights, GroundwaterSettings, PopulationWeighting, ProximityThresholds, RiskConfig,
};

/// Ordered risk categories, lowest first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
    Severe,
}

/// Piecewise distance band of a proximity factor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProximityBand {
    High,
    Medium,
    Low,
}

/// The four inputs to a facility's score.
///
/// Declaration order is the tie-break order when two factors contribute
/// equally.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FactorKind {
    Water,
    Settlement,
    Groundwater,
    FacilityType,
}

impl FactorKind {
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Water,
            Self::Settlement,
            Self::Groundwater,
            Self::FacilityType,
        ]
    }
}

/// One measured parameter outside its permissible range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exceedance {
    pub sample_id: String,
    pub parameter: String,
    pub measured: f64,
    /// Which bound was crossed: above a maximum or below a minimum.
    pub bound: LimitBound,
    /// The crossed bound's value.
    pub limit: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// What this exceedance added to the groundwater factor, after capping.
    pub contribution: f64,
}

/// What the classifier observed for one factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum Finding {
    NearestWaterBody {
        water_body_id: String,
        name: String,
        distance_m: f64,
        band: ProximityBand,
    },
    /// No water body within the search radius.
    NoWaterBodyNearby { search_radius_m: f64 },
    NearestSettlement {
        settlement_id: String,
        name: String,
        distance_m: f64,
        band: ProximityBand,
        population: Option<u64>,
        /// Population multiplier applied, when weighting is enabled and the
        /// population is known.
        population_multiplier: Option<f64>,
    },
    /// No settlement within the search radius.
    NoSettlementNearby { search_radius_m: f64 },
    /// No groundwater samples within the search radius. Absence of data,
    /// not absence of contamination.
    GroundwaterNoData { search_radius_m: f64 },
    /// Samples exist and every regulated parameter is within its limit.
    GroundwaterWithinLimits { samples: usize },
    GroundwaterExceedances {
        samples: usize,
        exceedances: Vec<Exceedance>,
    },
    FacilityTypeWeight {
        facility_type: FacilityType,
        weight: f64,
    },
}

/// One factor's part in a facility's score.
///
/// For the additive factors `contribution = weight * value`. For
/// [`FactorKind::FacilityType`], `value` is the type multiplier and
/// `contribution` is what the multiplier added to (or removed from) the
/// base score. The contributions of an assessment sum to its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub kind: FactorKind,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
    pub finding: Finding,
}

/// A facility's score, category and the factors behind them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub facility_id: String,
    pub facility_type: FacilityType,
    pub score: f64,
    pub category: RiskCategory,
    /// Every factor kind exactly once, by contribution descending.
    pub factors: Vec<RiskFactor>,
}

impl RiskAssessment {
    #[must_use]
    pub fn factor(&self, kind: FactorKind) -> Option<&RiskFactor> {
        self.factors.iter().find(|f| f.kind == kind)
    }
}

/// A ranked state/district cluster of assessed facilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    /// `"<state>/<district>"`.
    pub id: String,
    /// 1-based position in the ranking.
    pub rank: usize,
    pub state: String,
    pub district: String,
    /// Arithmetic mean of member locations.
    pub centroid: Coordinate,
    /// Ascending.
    pub member_ids: Vec<String>,
    pub aggregate_score: f64,
    pub category: RiskCategory,
    /// Factor kinds by summed member contribution, strongest first. Kinds
    /// that added nothing are left out.
    pub dominant_factors: Vec<FactorKind>,
    /// Id of the documented cluster covering this district, if any.
    #[serde(default)]
    pub known_cluster: Option<String>,
}

impl Hotspot {
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }
}
