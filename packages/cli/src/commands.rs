//! Subcommand handlers.

use farm_map_export::{ExportOptions, to_feature_collection, to_geojson_string, write_geojson};
use farm_map_facility_models::{Facility, FacilityType};
use farm_map_registry::{RegistrySnapshot, SpatialRegistry};
use farm_map_risk::{RiskClassifier, assess_snapshot, district_partitions};
use farm_map_risk_models::RiskConfig;
use serde::Serialize;

use crate::{Cli, Commands};

/// Loads inputs and dispatches `cli.command`.
pub fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    if matches!(cli.command, Commands::Config) {
        print!("{}", toml::to_string(&config)?);
        return Ok(());
    }

    let registry = SpatialRegistry::with_index_kind(cli.index);
    log::info!("Loading registry from {}", cli.data.display());
    let snapshot = registry.load_json_file(&cli.data)?;

    match cli.command {
        Commands::Assess { facility_id } => {
            let classifier = RiskClassifier::new(&snapshot, &config)?;
            print_json(&classifier.classify_id(&facility_id)?)?;
        }
        Commands::Hotspots { state, all } => {
            print_json(&hotspot_listing(
                &snapshot,
                &config,
                state.as_deref(),
                all,
            )?)?;
        }
        Commands::Export {
            output,
            include_gazetteer,
        } => {
            let report = assess_snapshot(&snapshot, &config)?;
            let collection =
                to_feature_collection(&snapshot, &report, &ExportOptions { include_gazetteer })?;
            match output {
                Some(path) => write_geojson(path, &collection)?,
                None => println!("{}", to_geojson_string(&collection)?),
            }
        }
        Commands::Operators { state } => {
            print_json(&snapshot.operators_by_state(&state))?;
        }
        Commands::Facilities {
            facility_type,
            state,
            district,
        } => {
            let facilities = filter_facilities(
                &snapshot,
                facility_type,
                state.as_deref(),
                district.as_deref(),
            );
            print_json(&facilities)?;
        }
        Commands::Stats => print_json(&snapshot.stats())?,
        Commands::Config => {}
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<RiskConfig, Box<dyn std::error::Error>> {
    match &cli.config {
        Some(path) => {
            log::info!("Loading risk configuration from {}", path.display());
            Ok(RiskConfig::from_toml_file(path)?)
        }
        None => Ok(RiskConfig::default()),
    }
}

/// Ranked hotspots, or with `state` the [`farm_map_risk::StateContext`]
/// for that state.
fn hotspot_listing(
    snapshot: &RegistrySnapshot,
    config: &RiskConfig,
    state: Option<&str>,
    all: bool,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let mut report = assess_snapshot(snapshot, config)?;
    if all {
        report.hotspots = district_partitions(snapshot, &report.assessments, config);
    }
    Ok(match state {
        Some(state) => serde_json::to_value(report.state_context(snapshot, state))?,
        None => serde_json::to_value(&report.hotspots)?,
    })
}

fn filter_facilities<'a>(
    snapshot: &'a RegistrySnapshot,
    facility_type: Option<FacilityType>,
    state: Option<&str>,
    district: Option<&str>,
) -> Vec<&'a Facility> {
    let candidates = match (district, facility_type) {
        (Some(district), _) => snapshot.facilities_by_district(district, state),
        (None, Some(facility_type)) => snapshot.facilities_by_type(facility_type),
        (None, None) => match state {
            Some(state) => snapshot.facilities_by_state(state),
            None => snapshot.facilities().iter().collect(),
        },
    };

    candidates
        .into_iter()
        .filter(|f| facility_type.is_none_or(|t| f.facility_type == t))
        .filter(|f| state.is_none_or(|s| f.state.eq_ignore_ascii_case(s.trim())))
        .collect()
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
