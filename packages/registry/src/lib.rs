#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial registry of facilities, operators, water bodies,
//! settlements and groundwater samples.
//!
//! A registry is loaded in one step from a [`RegistryInput`]. Loading
//! validates every record, derives operator membership and builds the
//! proximity indexes into an immutable [`RegistrySnapshot`], which then
//! replaces whatever was loaded before. Queries run against a snapshot, so
//! a reload never disturbs a query already in progress.

pub mod ingest;
pub mod snapshot;

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use farm_map_facility_models::{KnownHotspot, LivestockCensus, WaterQualityStandard};
use farm_map_facility_models::records::{
    FacilityRecord, GroundwaterSampleRecord, OperatorRecord, SettlementRecord, WaterBodyRecord,
};
use farm_map_spatial::IndexKind;
use serde::{Deserialize, Serialize};

pub use ingest::{EntityKind, ValidationError};
pub use snapshot::{INDEPENDENT_OPERATOR, Nearby, RegistrySnapshot, RegistryStats};

/// Errors from registry loading and queries.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The input was rejected; nothing was loaded.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A query ran before any successful load.
    #[error("Registry has no data loaded")]
    NotLoaded,

    /// Input JSON could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything one load consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryInput {
    #[serde(default)]
    pub facilities: Vec<FacilityRecord>,
    #[serde(default)]
    pub operators: Vec<OperatorRecord>,
    #[serde(default)]
    pub water_bodies: Vec<WaterBodyRecord>,
    #[serde(default)]
    pub settlements: Vec<SettlementRecord>,
    #[serde(default)]
    pub groundwater_samples: Vec<GroundwaterSampleRecord>,
    /// Water-quality standards samples may reference. Defaults to BIS 10500.
    #[serde(default = "default_standards")]
    pub standards: Vec<WaterQualityStandard>,
    /// Documented pollution clusters. Defaults to the curated list.
    #[serde(default = "KnownHotspot::curated")]
    pub known_hotspots: Vec<KnownHotspot>,
    /// Defaults to the 20th Livestock Census; `null` disables census context.
    #[serde(default = "default_census")]
    pub livestock_census: Option<LivestockCensus>,
}

fn default_standards() -> Vec<WaterQualityStandard> {
    vec![WaterQualityStandard::bis_10500()]
}

#[allow(clippy::unnecessary_wraps)]
fn default_census() -> Option<LivestockCensus> {
    Some(LivestockCensus::twentieth())
}

impl Default for RegistryInput {
    /// Empty input carrying the built-in reference tables.
    fn default() -> Self {
        Self {
            facilities: Vec::new(),
            operators: Vec::new(),
            water_bodies: Vec::new(),
            settlements: Vec::new(),
            groundwater_samples: Vec::new(),
            standards: default_standards(),
            known_hotspots: KnownHotspot::curated(),
            livestock_census: default_census(),
        }
    }
}

impl RegistryInput {
    /// Parses a combined registry document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or does not match the
    /// record shapes.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a combined registry document from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

/// Holder of the current [`RegistrySnapshot`].
pub struct SpatialRegistry {
    index_kind: IndexKind,
    current: RwLock<Option<Arc<RegistrySnapshot>>>,
}

impl Default for SpatialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialRegistry {
    /// An unloaded registry using the R-tree index.
    #[must_use]
    pub fn new() -> Self {
        Self::with_index_kind(IndexKind::default())
    }

    /// An unloaded registry building `index_kind` indexes on load.
    #[must_use]
    pub const fn with_index_kind(index_kind: IndexKind) -> Self {
        Self {
            index_kind,
            current: RwLock::new(None),
        }
    }

    /// Validates `input`, indexes it and makes it the current snapshot.
    ///
    /// A rejected load leaves the registry unloaded: the previous snapshot
    /// is dropped from the registry (existing holders keep theirs), so no
    /// caller can mistake stale data for the rejected input.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] if any record is invalid.
    pub fn load(&self, input: RegistryInput) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        let facility_count = input.facilities.len();
        let built = ingest::build_snapshot(input, self.index_kind);

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        match built {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *current = Some(Arc::clone(&snapshot));
                log::info!(
                    "Loaded registry: {facility_count} facilities, {} water bodies, {} settlements, {} groundwater samples",
                    snapshot.water_bodies().len(),
                    snapshot.settlements().len(),
                    snapshot.groundwater_samples().len(),
                );
                Ok(snapshot)
            }
            Err(e) => {
                *current = None;
                log::warn!("Rejected registry load: {e}");
                Err(e.into())
            }
        }
    }

    /// Convenience for [`RegistryInput::from_json_file`] followed by
    /// [`Self::load`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or the load
    /// is rejected. A parse failure also leaves the registry unloaded.
    pub fn load_json_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        match RegistryInput::from_json_file(path) {
            Ok(input) => self.load(input),
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    /// The current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotLoaded`] if nothing has been loaded (or
    /// the last load was rejected).
    pub fn snapshot(&self) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(RegistryError::NotLoaded)
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Drops the current snapshot.
    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
