#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Facility, gazetteer and groundwater types for factory farm mapping.
//!
//! Two layers live here. The `*Record` types in [`records`] mirror the raw
//! registry and gazetteer files as they are supplied (loose, optional
//! coordinates). The entity types in this module are the validated shapes
//! the registry builds from them once at load time.

pub mod context;
pub mod records;
pub mod standard;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use context::{KnownHotspot, LivestockCensus, LivestockContext, SpeciesCounts};
pub use standard::{BIS_10500_NAME, Breach, LimitBound, ParameterLimit, WaterQualityStandard};

/// A WGS-84 position in decimal degrees.
///
/// Only constructible through [`Coordinate::new`], so every value in the
/// system satisfies the latitude/longitude range invariant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Creates a coordinate after checking the WGS-84 ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is non-finite, latitude is outside
    /// `[-90, 90]`, or longitude is outside `[-180, 180]`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn latitude(self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn longitude(self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Error returned when a latitude/longitude pair is outside the WGS-84 range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateError {
    /// Latitude not finite or outside `[-90, 90]`.
    Latitude(f64),
    /// Longitude not finite or outside `[-180, 180]`.
    Longitude(f64),
}

impl std::fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latitude(v) => write!(f, "invalid latitude {v}: expected -90 to 90"),
            Self::Longitude(v) => write!(f, "invalid longitude {v}: expected -180 to 180"),
        }
    }
}

impl std::error::Error for CoordinateError {}

/// Kind of animal-agriculture facility.
///
/// Registries use finer-grained codes (`poultry_broiler`,
/// `dairy_chilling_centre`, ...); those are accepted on input and folded
/// into the coarse type used for weighting.
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
pub enum FacilityType {
    /// Dairy farms, processing plants and chilling centres
    #[serde(alias = "dairy_farm", alias = "dairy_processing", alias = "dairy_chilling_centre")]
    #[strum(
        to_string = "dairy",
        serialize = "dairy_farm",
        serialize = "dairy_processing",
        serialize = "dairy_chilling_centre"
    )]
    Dairy,
    /// Broiler, layer and breeder farms and poultry processing
    #[serde(
        alias = "poultry_broiler",
        alias = "poultry_layer",
        alias = "poultry_breeder",
        alias = "poultry_processing"
    )]
    #[strum(
        to_string = "poultry",
        serialize = "poultry_broiler",
        serialize = "poultry_layer",
        serialize = "poultry_breeder",
        serialize = "poultry_processing"
    )]
    Poultry,
    /// Concentrated animal feeding operation / feedlot
    #[serde(alias = "feedlot", alias = "cafo_feedlot")]
    #[strum(to_string = "cafo", serialize = "feedlot", serialize = "cafo_feedlot")]
    Cafo,
    Slaughterhouse,
    #[serde(alias = "poultry_hatchery")]
    #[strum(to_string = "hatchery", serialize = "poultry_hatchery")]
    Hatchery,
    /// Shrimp and fish farming
    #[serde(alias = "aquaculture_shrimp", alias = "aquaculture_fish")]
    #[strum(
        to_string = "aquaculture",
        serialize = "aquaculture_shrimp",
        serialize = "aquaculture_fish"
    )]
    Aquaculture,
    Piggery,
    #[serde(alias = "rendering_plant")]
    #[strum(to_string = "meat_processing", serialize = "rendering_plant")]
    MeatProcessing,
    FeedMill,
    #[serde(alias = "goat_sheep_farm")]
    #[strum(to_string = "other", serialize = "goat_sheep_farm")]
    Other,
}

impl FacilityType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Dairy,
            Self::Poultry,
            Self::Cafo,
            Self::Slaughterhouse,
            Self::Hatchery,
            Self::Aquaculture,
            Self::Piggery,
            Self::MeatProcessing,
            Self::FeedMill,
            Self::Other,
        ]
    }
}

/// State Pollution Control Board consent category.
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
pub enum PcbCategory {
    /// Slaughterhouses, large meat processing
    Red,
    /// Large poultry and dairy operations
    Orange,
    /// Small operations
    Green,
    /// Minimal pollution potential
    White,
}

/// A located animal-agriculture facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub name: String,
    /// `None` for independently operated facilities.
    pub operator_id: Option<String>,
    pub facility_type: FacilityType,
    pub state: String,
    pub district: String,
    pub location: Coordinate,
    /// Head count or throughput. Never negative.
    pub capacity: Option<f64>,
    /// Unit for [`Self::capacity`] (e.g. "birds", "cattle", "litres/day").
    pub capacity_unit: Option<String>,
    pub address: Option<String>,
    pub pcb_category: Option<PcbCategory>,
    /// Consent-to-operate number issued by the pollution control board.
    pub cto_number: Option<String>,
    pub data_sources: Vec<String>,
}

/// A company or cooperative that operates facilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub name: String,
    /// Corporate Identity Number (MCA).
    pub cin: Option<String>,
    pub headquarters: Option<String>,
    /// Derived from [`Facility::operator_id`] at load. Sorted ascending.
    pub facility_ids: Vec<String>,
}

/// Water body classification.
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
pub enum WaterBodyKind {
    River,
    Lake,
    Reservoir,
    Canal,
    Pond,
    GroundwaterZone,
}

/// Shape of a water body for distance queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "snake_case")]
pub enum WaterBodyGeometry {
    /// A single representative point (well, small pond).
    Point(Coordinate),
    /// An open polyline following a river or canal course.
    Course(Vec<Coordinate>),
    /// A closed ring; points inside it are at distance zero.
    Boundary(Vec<Coordinate>),
}

impl WaterBodyGeometry {
    /// All vertices of the geometry.
    #[must_use]
    pub fn vertices(&self) -> &[Coordinate] {
        match self {
            Self::Point(c) => std::slice::from_ref(c),
            Self::Course(points) | Self::Boundary(points) => points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterBody {
    pub id: String,
    pub name: String,
    pub kind: WaterBodyKind,
    pub geometry: WaterBodyGeometry,
}

/// Settlement size class.
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
pub enum SettlementKind {
    Village,
    Town,
    City,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: String,
    pub name: String,
    pub kind: Option<SettlementKind>,
    pub population: Option<u64>,
    pub location: Coordinate,
}

/// One groundwater-quality measurement from a monitoring well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundwaterSample {
    pub id: String,
    pub location: Coordinate,
    pub collected_on: NaiveDate,
    pub depth_m: Option<f64>,
    /// Parameter name (e.g. `nitrate`) to measured concentration.
    pub parameters: BTreeMap<String, f64>,
    /// Name of the [`WaterQualityStandard`] this sample is judged against.
    pub standard: String,
}
