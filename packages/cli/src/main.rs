#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Command line front end for factory farm risk mapping.
//!
//! Loads a registry document, optionally a TOML risk configuration, and
//! runs one query or export against it. Results are printed to stdout as
//! JSON; logs go to stderr (`RUST_LOG=info` for pipeline progress).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use farm_map_facility_models::FacilityType;
use farm_map_spatial::IndexKind;

mod commands;

/// Map factory farms and rank pollution-risk hotspots.
#[derive(Parser)]
#[command(name = "farm_map")]
#[command(about = "Map factory farms and rank pollution-risk hotspots")]
struct Cli {
    /// Registry document (facilities, operators, gazetteer, samples).
    #[arg(long, global = true, default_value = "data/registry.json")]
    data: PathBuf,

    /// Risk model configuration. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Proximity index implementation ("rtree" or "linear").
    #[arg(long, global = true, default_value = "rtree")]
    index: IndexKind,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one facility and explain the result.
    Assess {
        /// Facility id.
        facility_id: String,
    },

    /// Rank district hotspots.
    Hotspots {
        /// Only hotspots in this state.
        #[arg(long)]
        state: Option<String>,

        /// Include every partition, not just those at or above moderate.
        #[arg(long)]
        all: bool,
    },

    /// Export facilities and hotspots as `GeoJSON`.
    Export {
        /// Output file. Printed to stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also export water bodies and settlements.
        #[arg(long)]
        include_gazetteer: bool,
    },

    /// List operators with facilities in a state.
    Operators {
        #[arg(long)]
        state: String,
    },

    /// List facilities, optionally filtered.
    Facilities {
        /// Facility type (registry codes such as `poultry_layer` accepted).
        #[arg(long = "type")]
        facility_type: Option<FacilityType>,

        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        district: Option<String>,
    },

    /// Summary counts over the registry.
    Stats,

    /// Print the effective risk configuration as TOML.
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    commands::run(cli)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "farm_map",
            "facilities",
            "--type",
            "poultry_broiler",
            "--index",
            "linear",
            "--data",
            "in.json",
        ])
        .unwrap();
        assert_eq!(cli.index, IndexKind::Linear);
        assert_eq!(cli.data, PathBuf::from("in.json"));
        match cli.command {
            Commands::Facilities { facility_type, .. } => {
                assert_eq!(facility_type, Some(FacilityType::Poultry));
            }
            _ => panic!("expected facilities"),
        }
    }

    #[test]
    fn bundled_sample_registry_assesses() {
        let input = farm_map_registry::RegistryInput::from_json_str(include_str!(
            "../../../data/registry.json"
        ))
        .unwrap();
        let snapshot = farm_map_registry::SpatialRegistry::new()
            .load(input)
            .unwrap();
        let report =
            farm_map_risk::assess_snapshot(&snapshot, &farm_map_risk_models::RiskConfig::default())
                .unwrap();
        assert_eq!(report.assessments.len(), 4);
        assert!(report.hotspot("Tamil Nadu/Namakkal").is_some());
    }

    #[test]
    fn rejects_unknown_index() {
        assert!(Cli::try_parse_from(["farm_map", "--index", "quadtree", "stats"]).is_err());
    }
}
