#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Facility risk classification and hotspot ranking.
//!
//! [`assess`] runs the whole pipeline over the registry's current
//! snapshot: every facility is classified by [`RiskClassifier`], and the
//! results are partitioned by district and ranked into hotspots.

pub mod aggregate;
pub mod classifier;

#[cfg(test)]
mod test_fixtures;

use farm_map_facility_models::{KnownHotspot, LivestockContext};
use farm_map_registry::{RegistryError, RegistrySnapshot, SpatialRegistry};
use farm_map_risk_models::{ConfigError, Hotspot, RiskAssessment, RiskConfig};
use serde::Serialize;

pub use aggregate::{aggregate_hotspots, district_partitions};
pub use classifier::{RiskClassifier, exceedance_contribution, shortfall_contribution};

/// Errors from the risk pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    /// The configuration is inconsistent.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The registry could not supply a snapshot.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// No facility has the requested id.
    #[error("Unknown facility '{0}'")]
    UnknownFacility(String),
}

/// Every facility's assessment plus the ranked hotspots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingReport {
    /// In facility id order.
    pub assessments: Vec<RiskAssessment>,
    /// Ranked, rank 1 first.
    pub hotspots: Vec<Hotspot>,
}

impl MappingReport {
    #[must_use]
    pub fn assessment(&self, facility_id: &str) -> Option<&RiskAssessment> {
        self.assessments
            .binary_search_by(|a| a.facility_id.as_str().cmp(facility_id))
            .ok()
            .map(|position| &self.assessments[position])
    }

    #[must_use]
    pub fn hotspot(&self, id: &str) -> Option<&Hotspot> {
        self.hotspots.iter().find(|h| h.id == id)
    }

    /// Hotspots in `state` (case-insensitive), in rank order.
    #[must_use]
    pub fn hotspots_in_state(&self, state: &str) -> Vec<&Hotspot> {
        self.hotspots
            .iter()
            .filter(|h| h.state.eq_ignore_ascii_case(state.trim()))
            .collect()
    }

    /// Ranked hotspots in `state` alongside the documented clusters and
    /// census figures the snapshot holds for it.
    #[must_use]
    pub fn state_context<'a>(
        &'a self,
        snapshot: &'a RegistrySnapshot,
        state: &str,
    ) -> StateContext<'a> {
        StateContext {
            state: state.trim().to_string(),
            hotspots: self.hotspots_in_state(state),
            known_hotspots: snapshot.known_hotspots_in_state(state),
            livestock: snapshot
                .livestock_census()
                .map(|census| census.context_for(state)),
        }
    }
}

/// Computed hotspots for one state, framed by reference data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateContext<'a> {
    pub state: String,
    pub hotspots: Vec<&'a Hotspot>,
    pub known_hotspots: Vec<&'a KnownHotspot>,
    /// `None` when the registry was loaded without a census.
    pub livestock: Option<LivestockContext<'a>>,
}

/// Classifies every facility in the registry's current snapshot and ranks
/// the resulting hotspots.
///
/// # Errors
///
/// Returns an error if the registry is not loaded or `config` is
/// inconsistent.
pub fn assess(
    registry: &SpatialRegistry,
    config: &RiskConfig,
) -> Result<MappingReport, RiskError> {
    let snapshot = registry.snapshot()?;
    assess_snapshot(&snapshot, config)
}

/// [`assess`] over an explicit snapshot.
///
/// # Errors
///
/// Returns an error if `config` is inconsistent.
pub fn assess_snapshot(
    snapshot: &RegistrySnapshot,
    config: &RiskConfig,
) -> Result<MappingReport, RiskError> {
    let classifier = RiskClassifier::new(snapshot, config)?;
    let assessments = classifier.classify_all();
    let hotspots = aggregate_hotspots(snapshot, &assessments, config);
    Ok(MappingReport {
        assessments,
        hotspots,
    })
}
