//! District-level hotspot aggregation.
//!
//! Assessed facilities are partitioned by `(state, district)`, compared
//! case-insensitively. Each partition gets a centroid, an aggregate score
//! and the factors that drove it, and the partitions are ranked against
//! each other.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use farm_map_facility_models::{Coordinate, Facility};
use farm_map_registry::RegistrySnapshot;
use farm_map_risk_models::{AggregationMode, FactorKind, Hotspot, RiskAssessment, RiskConfig};

/// Every `(state, district)` partition of the assessed facilities, ranked.
///
/// Ranking is by aggregate score descending, then member count
/// descending, then partition id ascending. Ranks run `1..=n` over all
/// partitions, including ones below the hotspot threshold.
///
/// State and district names are trimmed and compared ignoring case; a
/// partition is labelled with the spelling of its first member.
///
/// Assessments for facilities missing from `snapshot` are skipped.
#[must_use]
pub fn district_partitions(
    snapshot: &RegistrySnapshot,
    assessments: &[RiskAssessment],
    config: &RiskConfig,
) -> Vec<Hotspot> {
    let mut partitions: BTreeMap<(String, String), Partition<'_>> = BTreeMap::new();
    for assessment in assessments {
        let Some(facility) = snapshot.facility(&assessment.facility_id) else {
            log::warn!(
                "Skipping assessment for unknown facility {}",
                assessment.facility_id
            );
            continue;
        };
        let state = facility.state.trim();
        let district = facility.district.trim();
        partitions
            .entry((state.to_lowercase(), district.to_lowercase()))
            .or_insert_with(|| Partition {
                state,
                district,
                members: Vec::new(),
            })
            .members
            .push((facility, assessment));
    }

    let mut ranked: Vec<Hotspot> = partitions
        .into_values()
        .map(|p| partition(snapshot, &p, config))
        .collect();
    ranked.sort_by(compare_ranking);
    for (position, hotspot) in ranked.iter_mut().enumerate() {
        hotspot.rank = position + 1;
    }
    ranked
}

/// The ranked partitions whose aggregate score reaches the moderate
/// breakpoint, re-ranked `1..=n`.
#[must_use]
pub fn aggregate_hotspots(
    snapshot: &RegistrySnapshot,
    assessments: &[RiskAssessment],
    config: &RiskConfig,
) -> Vec<Hotspot> {
    let threshold = config.breakpoints.moderate;
    let mut hotspots: Vec<Hotspot> = district_partitions(snapshot, assessments, config)
        .into_iter()
        .filter(|hotspot| hotspot.aggregate_score >= threshold)
        .collect();
    for (position, hotspot) in hotspots.iter_mut().enumerate() {
        hotspot.rank = position + 1;
    }
    log::info!(
        "Ranked {} hotspots from {} assessments",
        hotspots.len(),
        assessments.len()
    );
    hotspots
}

fn compare_ranking(a: &Hotspot, b: &Hotspot) -> Ordering {
    b.aggregate_score
        .total_cmp(&a.aggregate_score)
        .then_with(|| b.member_ids.len().cmp(&a.member_ids.len()))
        .then_with(|| a.id.cmp(&b.id))
}

struct Partition<'a> {
    state: &'a str,
    district: &'a str,
    members: Vec<(&'a Facility, &'a RiskAssessment)>,
}

#[allow(clippy::cast_precision_loss)]
fn partition(snapshot: &RegistrySnapshot, group: &Partition<'_>, config: &RiskConfig) -> Hotspot {
    let Partition {
        state,
        district,
        members,
    } = group;
    let count = members.len() as f64;

    let mean_lat = members
        .iter()
        .map(|(f, _)| f.location.latitude())
        .sum::<f64>()
        / count;
    let mean_lon = members
        .iter()
        .map(|(f, _)| f.location.longitude())
        .sum::<f64>()
        / count;
    // A mean of in-range values is in range; fall back to a member anyway.
    let centroid = Coordinate::new(mean_lat, mean_lon).unwrap_or(members[0].0.location);

    let scores = members.iter().map(|(_, a)| a.score);
    let aggregate_score = match config.aggregation {
        AggregationMode::Max => scores.fold(0.0, f64::max),
        AggregationMode::Mean => scores.sum::<f64>() / count,
    };

    let mut member_ids: Vec<String> = members.iter().map(|(f, _)| f.id.clone()).collect();
    member_ids.sort();

    Hotspot {
        id: format!("{state}/{district}"),
        rank: 0,
        state: state.to_string(),
        district: district.to_string(),
        centroid,
        member_ids,
        aggregate_score,
        category: config.breakpoints.categorize(aggregate_score),
        dominant_factors: dominant_factors(members),
        known_cluster: snapshot
            .known_hotspot_for(state, district)
            .map(|cluster| cluster.id.clone()),
    }
}

/// Factor kinds by summed member contribution, dropping kinds that added
/// nothing.
fn dominant_factors(members: &[(&Facility, &RiskAssessment)]) -> Vec<FactorKind> {
    let mut totals: BTreeMap<FactorKind, f64> = BTreeMap::new();
    for (_, assessment) in members {
        for factor in &assessment.factors {
            *totals.entry(factor.kind).or_insert(0.0) += factor.contribution;
        }
    }

    let mut ranked: Vec<(FactorKind, f64)> =
        totals.into_iter().filter(|(_, total)| *total > 0.0).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().map(|(kind, _)| kind).collect()
}

#[cfg(test)]
mod tests {
    use farm_map_facility_models::FacilityType;
    use farm_map_risk_models::RiskCategory;
    use serde_json::json;

    use super::*;
    use crate::classifier::RiskClassifier;
    use crate::test_fixtures::{facility, sample, settlement, snapshot, water_point};

    /// Namakkal holds one severe CAFO and one remote hatchery, Salem one
    /// high-scoring poultry farm and Erode one remote hatchery.
    fn districts() -> std::sync::Arc<RegistrySnapshot> {
        snapshot(
            vec![
                facility("nm-cafo", "cafo", "Namakkal", 11.001, 78.001),
                facility("nm-hatch", "hatchery", "Namakkal", 11.5, 78.5),
                facility("sl-poultry", "poultry", "Salem", 11.0, 78.012),
                facility("er-hatch", "hatchery", "Erode", 12.5, 79.5),
            ],
            vec![water_point("w-1", 11.0, 78.0)],
            vec![settlement("s-1", 11.0, 78.005, Some(3_000))],
            vec![sample("g-1", 11.0, 78.002, json!({"nitrate": 90.0}))],
        )
    }

    fn assess(snapshot: &RegistrySnapshot, config: &RiskConfig) -> Vec<RiskAssessment> {
        RiskClassifier::new(snapshot, config).unwrap().classify_all()
    }

    #[test]
    fn max_mode_keeps_severe_member_score() {
        let snapshot = districts();
        let config = RiskConfig::default();
        let assessments = assess(&snapshot, &config);

        let severe = assessments
            .iter()
            .find(|a| a.facility_id == "nm-cafo")
            .unwrap();
        let low = assessments
            .iter()
            .find(|a| a.facility_id == "nm-hatch")
            .unwrap();
        assert_eq!(severe.category, RiskCategory::Severe);
        assert_eq!(low.category, RiskCategory::Low);

        let hotspots = aggregate_hotspots(&snapshot, &assessments, &config);
        let namakkal = hotspots
            .iter()
            .find(|h| h.id == "Tamil Nadu/Namakkal")
            .unwrap();
        assert!((namakkal.aggregate_score - severe.score).abs() < f64::EPSILON);
        assert_eq!(namakkal.category, RiskCategory::Severe);
        assert_eq!(namakkal.member_ids, vec!["nm-cafo", "nm-hatch"]);
        assert_eq!(namakkal.rank, 1);
    }

    #[test]
    fn mean_mode_dilutes_and_reranks() {
        let snapshot = districts();
        let mut config = RiskConfig::default();
        config.aggregation = AggregationMode::Mean;
        let assessments = assess(&snapshot, &config);

        let hotspots = aggregate_hotspots(&snapshot, &assessments, &config);
        let ids: Vec<&str> = hotspots.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["Tamil Nadu/Salem", "Tamil Nadu/Namakkal"]);
        assert_eq!(hotspots[0].rank, 1);
        assert_eq!(hotspots[1].rank, 2);
    }

    #[test]
    fn low_partitions_are_dropped_but_still_partitioned() {
        let snapshot = districts();
        let config = RiskConfig::default();
        let assessments = assess(&snapshot, &config);

        let partitions = district_partitions(&snapshot, &assessments, &config);
        assert_eq!(partitions.len(), 3);
        let erode = partitions
            .iter()
            .find(|p| p.id == "Tamil Nadu/Erode")
            .unwrap();
        assert_eq!(erode.rank, 3);
        assert!(erode.dominant_factors.is_empty());

        let hotspots = aggregate_hotspots(&snapshot, &assessments, &config);
        assert_eq!(hotspots.len(), 2);
        assert!(hotspots.iter().all(|h| h.id != "Tamil Nadu/Erode"));
    }

    #[test]
    fn centroid_is_mean_of_members() {
        let snapshot = districts();
        let config = RiskConfig::default();
        let assessments = assess(&snapshot, &config);
        let partitions = district_partitions(&snapshot, &assessments, &config);
        let namakkal = partitions
            .iter()
            .find(|p| p.district == "Namakkal")
            .unwrap();
        assert!((namakkal.centroid.latitude() - 11.2505).abs() < 1e-9);
        assert!((namakkal.centroid.longitude() - 78.2505).abs() < 1e-9);
    }

    #[test]
    fn dominant_factors_skip_zero_contributions() {
        let snapshot = districts();
        let config = RiskConfig::default();
        let assessments = assess(&snapshot, &config);
        let partitions = district_partitions(&snapshot, &assessments, &config);
        let namakkal = partitions
            .iter()
            .find(|p| p.district == "Namakkal")
            .unwrap();
        // Water 0.4 and facility type 0.5 lead; settlement and groundwater
        // tie at 0.3 and fall back to kind order.
        assert_eq!(
            namakkal.dominant_factors,
            vec![
                FactorKind::FacilityType,
                FactorKind::Water,
                FactorKind::Settlement,
                FactorKind::Groundwater,
            ]
        );
    }

    #[test]
    fn ties_break_by_member_count_then_id() {
        let snapshot = snapshot(
            vec![
                facility("a-1", "other", "Alpha", 11.0, 78.0),
                facility("a-2", "other", "Alpha", 11.1, 78.1),
                facility("b-1", "other", "Beta", 12.0, 79.0),
                facility("c-1", "other", "Gamma", 13.0, 79.0),
            ],
            vec![],
            vec![],
            vec![],
        );
        let config = RiskConfig::default();
        let assessments: Vec<RiskAssessment> = ["a-1", "a-2", "b-1", "c-1"]
            .into_iter()
            .map(|id| RiskAssessment {
                facility_id: id.to_string(),
                facility_type: FacilityType::Other,
                score: 0.6,
                category: RiskCategory::High,
                factors: vec![],
            })
            .collect();

        let hotspots = aggregate_hotspots(&snapshot, &assessments, &config);
        let ranked: Vec<(&str, usize)> = hotspots.iter().map(|h| (h.id.as_str(), h.rank)).collect();
        assert_eq!(
            ranked,
            vec![
                ("Tamil Nadu/Alpha", 1),
                ("Tamil Nadu/Beta", 2),
                ("Tamil Nadu/Gamma", 3),
            ]
        );
    }

    #[test]
    fn unknown_facilities_are_skipped() {
        let snapshot = snapshot(
            vec![facility("a-1", "other", "Alpha", 11.0, 78.0)],
            vec![],
            vec![],
            vec![],
        );
        let config = RiskConfig::default();
        let assessments = vec![RiskAssessment {
            facility_id: "ghost".to_string(),
            facility_type: FacilityType::Other,
            score: 1.0,
            category: RiskCategory::Severe,
            factors: vec![],
        }];
        assert!(district_partitions(&snapshot, &assessments, &config).is_empty());
    }

    #[test]
    fn district_names_group_ignoring_case() {
        let mut shouting = facility("b-2", "other", "NAMAKKAL ", 11.1, 78.1);
        shouting["state"] = json!("tamil nadu");
        let snapshot = snapshot(
            vec![facility("a-1", "other", "Namakkal", 11.0, 78.0), shouting],
            vec![],
            vec![],
            vec![],
        );
        let config = RiskConfig::default();
        let assessments: Vec<RiskAssessment> = ["a-1", "b-2"]
            .into_iter()
            .map(|id| RiskAssessment {
                facility_id: id.to_string(),
                facility_type: FacilityType::Other,
                score: 0.6,
                category: RiskCategory::High,
                factors: vec![],
            })
            .collect();

        let partitions = district_partitions(&snapshot, &assessments, &config);
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].id, "Tamil Nadu/Namakkal");
        assert_eq!(partitions[0].member_ids, vec!["a-1", "b-2"]);
    }

    #[test]
    fn documented_cluster_is_attached() {
        let snapshot = districts();
        let config = RiskConfig::default();
        let assessments = assess(&snapshot, &config);
        let partitions = district_partitions(&snapshot, &assessments, &config);

        let namakkal = partitions.iter().find(|p| p.district == "Namakkal").unwrap();
        assert_eq!(namakkal.known_cluster.as_deref(), Some("namakkal-poultry"));
        let salem = partitions.iter().find(|p| p.district == "Salem").unwrap();
        assert!(salem.known_cluster.is_none());
    }
}
