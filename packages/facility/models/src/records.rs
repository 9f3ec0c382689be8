//! Raw input record shapes.
//!
//! These deserialize directly from registry and gazetteer JSON. Nothing is
//! validated here; the registry converts each record into its entity type
//! and rejects the whole load on the first invalid value.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{BIS_10500_NAME, FacilityType, PcbCategory, SettlementKind, WaterBodyKind};

/// A facility row from a pollution-control-board or licence registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub operator_id: Option<String>,
    pub facility_type: FacilityType,
    pub state: String,
    pub district: String,
    /// Registries frequently lack coordinates; a missing value fails the load.
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub capacity_unit: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub pcb_category: Option<PcbCategory>,
    #[serde(default)]
    pub cto_number: Option<String>,
    #[serde(default)]
    pub data_sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cin: Option<String>,
    #[serde(default)]
    pub headquarters: Option<String>,
}

/// A bare latitude/longitude pair as written in gazetteer files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryRecord {
    Point {
        latitude: f64,
        longitude: f64,
    },
    Course {
        points: Vec<PointRecord>,
    },
    Boundary {
        points: Vec<PointRecord>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterBodyRecord {
    pub id: String,
    pub name: String,
    pub kind: WaterBodyKind,
    pub geometry: GeometryRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: Option<SettlementKind>,
    #[serde(default)]
    pub population: Option<u64>,
    pub latitude: f64,
    pub longitude: f64,
}

/// A groundwater monitoring result (e.g. from the CGWB network).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundwaterSampleRecord {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub collected_on: NaiveDate,
    #[serde(default)]
    pub depth_m: Option<f64>,
    #[serde(default)]
    pub parameters: BTreeMap<String, f64>,
    #[serde(default = "default_standard")]
    pub standard: String,
}

fn default_standard() -> String {
    BIS_10500_NAME.to_string()
}
