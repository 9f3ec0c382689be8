//! Per-facility risk scoring.
//!
//! A score is the weighted sum of the water, settlement and groundwater
//! factors, multiplied by the facility type's weight:
//!
//! ```text
//! score = (w_water * water + w_settlement * settlement + w_gw * groundwater) * type_weight
//! ```
//!
//! Classification only reads the snapshot, so facilities can be scored in
//! any order (or concurrently) with identical results.

use std::collections::BTreeMap;

use farm_map_facility_models::{Facility, FacilityType, LimitBound};
use farm_map_registry::RegistrySnapshot;
use farm_map_risk_models::{
    ConfigError, Exceedance, FactorKind, Finding, RiskAssessment, RiskConfig, RiskFactor,
};

use crate::RiskError;

/// What one exceedance adds to the groundwater factor.
///
/// `measured / limit - 1`, capped at `cap`. A zero limit means any
/// detection is a full exceedance, so it contributes the cap.
#[must_use]
pub fn exceedance_contribution(measured: f64, limit: f64, cap: f64) -> f64 {
    if measured <= limit {
        0.0
    } else if limit > 0.0 {
        (measured / limit - 1.0).min(cap)
    } else {
        cap
    }
}

/// What one reading below a minimum adds to the groundwater factor.
///
/// `min / measured - 1`, capped at `cap`. A non-positive reading contributes
/// the cap.
#[must_use]
pub fn shortfall_contribution(measured: f64, min: f64, cap: f64) -> f64 {
    if measured >= min {
        0.0
    } else if measured > 0.0 {
        (min / measured - 1.0).min(cap)
    } else {
        cap
    }
}

/// Scores facilities against one snapshot and configuration.
pub struct RiskClassifier<'a> {
    snapshot: &'a RegistrySnapshot,
    config: &'a RiskConfig,
    type_weights: BTreeMap<FacilityType, f64>,
}

impl<'a> RiskClassifier<'a> {
    /// # Errors
    ///
    /// Returns an error if `config` is inconsistent.
    pub fn new(
        snapshot: &'a RegistrySnapshot,
        config: &'a RiskConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let type_weights = config.type_weights()?;
        Ok(Self {
            snapshot,
            config,
            type_weights,
        })
    }

    #[must_use]
    pub fn classify(&self, facility: &Facility) -> RiskAssessment {
        let water = self.water_factor(facility);
        let settlement = self.settlement_factor(facility);
        let groundwater = self.groundwater_factor(facility);

        let base = water.contribution + settlement.contribution + groundwater.contribution;
        let type_weight = self
            .type_weights
            .get(&facility.facility_type)
            .copied()
            .unwrap_or(1.0);
        let score = base * type_weight;

        let type_factor = RiskFactor {
            kind: FactorKind::FacilityType,
            value: type_weight,
            weight: 1.0,
            contribution: score - base,
            finding: Finding::FacilityTypeWeight {
                facility_type: facility.facility_type,
                weight: type_weight,
            },
        };

        let mut factors = vec![water, settlement, groundwater, type_factor];
        factors.sort_by(|a, b| {
            b.contribution
                .total_cmp(&a.contribution)
                .then_with(|| a.kind.cmp(&b.kind))
        });

        let category = self.config.breakpoints.categorize(score);
        log::debug!(
            "Classified facility {} ({}): score {score:.3}, {category}",
            facility.id,
            facility.facility_type,
        );

        RiskAssessment {
            facility_id: facility.id.clone(),
            facility_type: facility.facility_type,
            score,
            category,
            factors,
        }
    }

    /// Classifies the facility with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`RiskError::UnknownFacility`] if no facility has that id.
    pub fn classify_id(&self, facility_id: &str) -> Result<RiskAssessment, RiskError> {
        self.snapshot
            .facility(facility_id)
            .map(|facility| self.classify(facility))
            .ok_or_else(|| RiskError::UnknownFacility(facility_id.to_string()))
    }

    /// Classifies every facility, in facility id order.
    #[must_use]
    pub fn classify_all(&self) -> Vec<RiskAssessment> {
        let assessments: Vec<_> = self
            .snapshot
            .facilities()
            .iter()
            .map(|facility| self.classify(facility))
            .collect();
        log::info!("Classified {} facilities", assessments.len());
        assessments
    }

    fn water_factor(&self, facility: &Facility) -> RiskFactor {
        let thresholds = &self.config.water;
        let weight = self.config.weights.water;

        let nearest = self.snapshot.nearest_water_bodies(facility, 1);
        let Some(nearest) = nearest
            .first()
            .filter(|n| n.distance_m <= thresholds.search_radius_m)
        else {
            return RiskFactor {
                kind: FactorKind::Water,
                value: 0.0,
                weight,
                contribution: 0.0,
                finding: Finding::NoWaterBodyNearby {
                    search_radius_m: thresholds.search_radius_m,
                },
            };
        };

        let band = thresholds.band(nearest.distance_m);
        let value = thresholds.contribution(band);
        RiskFactor {
            kind: FactorKind::Water,
            value,
            weight,
            contribution: weight * value,
            finding: Finding::NearestWaterBody {
                water_body_id: nearest.item.id.clone(),
                name: nearest.item.name.clone(),
                distance_m: nearest.distance_m,
                band,
            },
        }
    }

    fn settlement_factor(&self, facility: &Facility) -> RiskFactor {
        let thresholds = &self.config.settlement;
        let weighting = &self.config.settlement_population;
        let weight = self.config.weights.settlement;

        let nearest = self.snapshot.nearest_settlements(facility, 1);
        let Some(nearest) = nearest
            .first()
            .filter(|n| n.distance_m <= thresholds.search_radius_m)
        else {
            return RiskFactor {
                kind: FactorKind::Settlement,
                value: 0.0,
                weight,
                contribution: 0.0,
                finding: Finding::NoSettlementNearby {
                    search_radius_m: thresholds.search_radius_m,
                },
            };
        };

        let band = thresholds.band(nearest.distance_m);
        let population = nearest.item.population;
        let population_multiplier = population
            .filter(|_| weighting.enabled)
            .map(|population| weighting.multiplier(population));
        let value = thresholds.contribution(band) * population_multiplier.unwrap_or(1.0);

        RiskFactor {
            kind: FactorKind::Settlement,
            value,
            weight,
            contribution: weight * value,
            finding: Finding::NearestSettlement {
                settlement_id: nearest.item.id.clone(),
                name: nearest.item.name.clone(),
                distance_m: nearest.distance_m,
                band,
                population,
                population_multiplier,
            },
        }
    }

    fn groundwater_factor(&self, facility: &Facility) -> RiskFactor {
        let settings = &self.config.groundwater;
        let weight = self.config.weights.groundwater;

        let samples = self
            .snapshot
            .groundwater_samples_near(facility.location, settings.search_radius_m);
        if samples.is_empty() {
            return RiskFactor {
                kind: FactorKind::Groundwater,
                value: 0.0,
                weight,
                contribution: 0.0,
                finding: Finding::GroundwaterNoData {
                    search_radius_m: settings.search_radius_m,
                },
            };
        }

        let mut exceedances = Vec::new();
        for nearby in &samples {
            let sample = nearby.item;
            let Some(standard) = self.snapshot.standard(&sample.standard) else {
                log::warn!(
                    "Groundwater sample {} references missing standard '{}'",
                    sample.id,
                    sample.standard
                );
                continue;
            };

            for (parameter, &measured) in &sample.parameters {
                let Some(range) = standard.limit(parameter) else {
                    continue;
                };
                let Some(breach) = range.breach(measured) else {
                    continue;
                };
                let cap = settings.max_exceedance_contribution;
                let contribution = match breach.bound {
                    LimitBound::Max => exceedance_contribution(measured, breach.limit, cap),
                    LimitBound::Min => shortfall_contribution(measured, breach.limit, cap),
                };
                exceedances.push(Exceedance {
                    sample_id: sample.id.clone(),
                    parameter: parameter.clone(),
                    measured,
                    bound: breach.bound,
                    limit: breach.limit,
                    unit: range.unit.clone(),
                    contribution,
                });
            }
        }

        let value = exceedances
            .iter()
            .map(|e| e.contribution)
            .sum::<f64>()
            .min(settings.max_factor);

        let finding = if exceedances.is_empty() {
            Finding::GroundwaterWithinLimits {
                samples: samples.len(),
            }
        } else {
            Finding::GroundwaterExceedances {
                samples: samples.len(),
                exceedances,
            }
        };

        RiskFactor {
            kind: FactorKind::Groundwater,
            value,
            weight,
            contribution: weight * value,
            finding,
        }
    }
}

#[cfg(test)]
mod tests {
    use farm_map_risk_models::{ProximityBand, RiskCategory};
    use serde_json::json;

    use super::*;
    use crate::test_fixtures::{facility, sample, settlement, snapshot, water_point};

    fn classify(snapshot: &RegistrySnapshot, id: &str) -> RiskAssessment {
        let config = RiskConfig::default();
        RiskClassifier::new(snapshot, &config)
            .unwrap()
            .classify_id(id)
            .unwrap()
    }

    #[test]
    fn facility_beside_river_is_at_least_moderate() {
        // ~200 m from the water body, nearest settlement ~22 km away, no
        // groundwater samples at all.
        let snapshot = snapshot(
            vec![facility("f-1", "poultry", "Namakkal", 11.0, 78.0)],
            vec![water_point("w-1", 11.0018, 78.0)],
            vec![settlement("s-1", 11.2, 78.0, Some(2_000))],
            vec![],
        );
        let assessment = classify(&snapshot, "f-1");

        let water = assessment.factor(FactorKind::Water).unwrap();
        assert!(matches!(
            water.finding,
            Finding::NearestWaterBody {
                band: ProximityBand::High,
                ..
            }
        ));
        assert!(matches!(
            assessment.factor(FactorKind::Settlement).unwrap().finding,
            Finding::NoSettlementNearby { .. }
        ));
        assert!(matches!(
            assessment.factor(FactorKind::Groundwater).unwrap().finding,
            Finding::GroundwaterNoData { .. }
        ));
        assert!(assessment.category >= RiskCategory::Moderate);
        assert!((assessment.score - 0.48).abs() < 1e-9);
    }

    #[test]
    fn every_factor_present_and_ordered_by_contribution() {
        let snapshot = snapshot(
            vec![facility("f-1", "poultry", "Namakkal", 11.0, 78.0)],
            vec![water_point("w-1", 11.0018, 78.0)],
            vec![],
            vec![],
        );
        let assessment = classify(&snapshot, "f-1");
        let kinds: Vec<FactorKind> = assessment.factors.iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FactorKind::Water,
                FactorKind::FacilityType,
                FactorKind::Settlement,
                FactorKind::Groundwater,
            ]
        );
        let total: f64 = assessment.factors.iter().map(|f| f.contribution).sum();
        assert!((total - assessment.score).abs() < 1e-12);
    }

    #[test]
    fn sparse_data_scores_zero() {
        let snapshot = snapshot(
            vec![facility("f-1", "cafo", "Namakkal", 11.0, 78.0)],
            vec![],
            vec![],
            vec![],
        );
        let assessment = classify(&snapshot, "f-1");
        assert!(assessment.score.abs() < f64::EPSILON);
        assert_eq!(assessment.category, RiskCategory::Low);
        assert_eq!(assessment.factors.len(), FactorKind::all().len());
    }

    #[test]
    fn classification_is_idempotent() {
        let snapshot = snapshot(
            vec![facility("f-1", "dairy", "Anand", 11.0, 78.0)],
            vec![water_point("w-1", 11.01, 78.0)],
            vec![settlement("s-1", 11.0, 78.02, Some(8_000))],
            vec![sample("g-1", 11.001, 78.0, json!({"nitrate": 60.0}))],
        );
        let first = classify(&snapshot, "f-1");
        let second = classify(&snapshot, "f-1");
        assert_eq!(first, second);
    }

    #[test]
    fn nitrate_exceedance_beats_sample_at_limit() {
        let over = snapshot(
            vec![facility("f-1", "poultry", "Namakkal", 11.0, 78.0)],
            vec![],
            vec![],
            vec![sample("g-1", 11.001, 78.0, json!({"nitrate": 67.5}))],
        );
        let at_limit = snapshot(
            vec![facility("f-1", "poultry", "Namakkal", 11.0, 78.0)],
            vec![],
            vec![],
            vec![sample("g-1", 11.001, 78.0, json!({"nitrate": 45.0}))],
        );

        let over = classify(&over, "f-1");
        let at_limit = classify(&at_limit, "f-1");
        let over = over.factor(FactorKind::Groundwater).unwrap();
        let at_limit = at_limit.factor(FactorKind::Groundwater).unwrap();

        assert!((over.value - 0.5).abs() < 1e-12);
        assert!(at_limit.value.abs() < f64::EPSILON);
        assert!(over.value > at_limit.value);
        assert!(matches!(
            at_limit.finding,
            Finding::GroundwaterWithinLimits { samples: 1 }
        ));
        match &over.finding {
            Finding::GroundwaterExceedances { exceedances, .. } => {
                assert_eq!(exceedances.len(), 1);
                assert_eq!(exceedances[0].parameter, "nitrate");
            }
            other => panic!("unexpected finding {other:?}"),
        }
    }

    #[test]
    fn unregulated_parameters_are_ignored() {
        let snapshot = snapshot(
            vec![facility("f-1", "poultry", "Namakkal", 11.0, 78.0)],
            vec![],
            vec![],
            vec![sample("g-1", 11.001, 78.0, json!({"arsenic": 900.0}))],
        );
        let assessment = classify(&snapshot, "f-1");
        assert!(matches!(
            assessment.factor(FactorKind::Groundwater).unwrap().finding,
            Finding::GroundwaterWithinLimits { .. }
        ));
    }

    #[test]
    fn groundwater_factor_is_capped() {
        let snapshot = snapshot(
            vec![facility("f-1", "poultry", "Namakkal", 11.0, 78.0)],
            vec![],
            vec![],
            vec![sample(
                "g-1",
                11.001,
                78.0,
                json!({"nitrate": 900.0, "fluoride": 6.0, "total_coliform": 12.0}),
            )],
        );
        let assessment = classify(&snapshot, "f-1");
        let groundwater = assessment.factor(FactorKind::Groundwater).unwrap();
        assert!((groundwater.value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn exceedance_contribution_edges() {
        assert!(exceedance_contribution(45.0, 45.0, 1.0).abs() < f64::EPSILON);
        assert!((exceedance_contribution(67.5, 45.0, 1.0) - 0.5).abs() < 1e-12);
        assert!((exceedance_contribution(450.0, 45.0, 1.0) - 1.0).abs() < f64::EPSILON);
        assert!((exceedance_contribution(3.0, 0.0, 0.7) - 0.7).abs() < f64::EPSILON);
        assert!(exceedance_contribution(0.0, 0.0, 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn shortfall_contribution_edges() {
        assert!(shortfall_contribution(6.5, 6.5, 1.0).abs() < f64::EPSILON);
        assert!(shortfall_contribution(7.0, 6.5, 1.0).abs() < f64::EPSILON);
        assert!((shortfall_contribution(4.0, 6.5, 1.0) - 0.625).abs() < 1e-12);
        assert!((shortfall_contribution(1.0, 6.5, 1.0) - 1.0).abs() < f64::EPSILON);
        assert!((shortfall_contribution(0.0, 6.5, 0.4) - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn acidic_sample_breaches_ph_minimum() {
        let snapshot = snapshot(
            vec![facility("f-1", "poultry", "Namakkal", 11.0, 78.0)],
            vec![],
            vec![],
            vec![sample("g-1", 11.001, 78.0, json!({"ph": 4.0, "nitrate": 50.0}))],
        );
        let assessment = classify(&snapshot, "f-1");
        let groundwater = assessment.factor(FactorKind::Groundwater).unwrap();
        let Finding::GroundwaterExceedances { exceedances, .. } = &groundwater.finding else {
            panic!("unexpected finding {:?}", groundwater.finding);
        };
        assert_eq!(exceedances.len(), 2);

        let ph = exceedances.iter().find(|e| e.parameter == "ph").unwrap();
        assert_eq!(ph.bound, LimitBound::Min);
        assert!((ph.limit - 6.5).abs() < f64::EPSILON);
        assert!((ph.contribution - 0.625).abs() < 1e-12);
        assert!(ph.unit.is_none());

        let nitrate = exceedances.iter().find(|e| e.parameter == "nitrate").unwrap();
        assert_eq!(nitrate.bound, LimitBound::Max);
        assert_eq!(nitrate.unit.as_deref(), Some("mg/L"));

        // 0.625 + 5/45, under the factor cap.
        assert!((groundwater.value - (0.625 + 5.0 / 45.0)).abs() < 1e-12);
    }

    #[test]
    fn neutral_ph_is_within_limits() {
        let snapshot = snapshot(
            vec![facility("f-1", "poultry", "Namakkal", 11.0, 78.0)],
            vec![],
            vec![],
            vec![sample("g-1", 11.001, 78.0, json!({"ph": 7.2}))],
        );
        let assessment = classify(&snapshot, "f-1");
        assert!(matches!(
            assessment.factor(FactorKind::Groundwater).unwrap().finding,
            Finding::GroundwaterWithinLimits { samples: 1 }
        ));
    }

    #[test]
    fn population_weighting_scales_settlement_factor() {
        let snapshot = snapshot(
            vec![facility("f-1", "poultry", "Namakkal", 11.0, 78.0)],
            vec![],
            vec![settlement("s-1", 11.001, 78.0, Some(5_000))],
            vec![],
        );
        let mut config = RiskConfig::default();
        config.settlement_population.enabled = true;

        let classifier = RiskClassifier::new(&snapshot, &config).unwrap();
        let assessment = classifier.classify_id("f-1").unwrap();
        let factor = assessment.factor(FactorKind::Settlement).unwrap();
        assert!((factor.value - 0.75).abs() < 1e-12);
        assert!(matches!(
            factor.finding,
            Finding::NearestSettlement {
                population_multiplier: Some(_),
                ..
            }
        ));
    }

    #[test]
    fn type_weight_override_applies() {
        let snapshot = snapshot(
            vec![facility("f-1", "hatchery", "Namakkal", 11.0, 78.0)],
            vec![water_point("w-1", 11.0018, 78.0)],
            vec![],
            vec![],
        );
        let mut config = RiskConfig::default();
        config
            .facility_type_weights
            .insert("hatchery".to_string(), 2.0);
        let classifier = RiskClassifier::new(&snapshot, &config).unwrap();
        let assessment = classifier.classify_id("f-1").unwrap();
        assert!((assessment.score - 0.8).abs() < 1e-9);
        assert_eq!(assessment.category, RiskCategory::Severe);
    }

    #[test]
    fn unknown_facility_id() {
        let snapshot = snapshot(
            vec![facility("f-1", "poultry", "Namakkal", 11.0, 78.0)],
            vec![],
            vec![],
            vec![],
        );
        let config = RiskConfig::default();
        let classifier = RiskClassifier::new(&snapshot, &config).unwrap();
        assert!(matches!(
            classifier.classify_id("nope"),
            Err(RiskError::UnknownFacility(ref id)) if id == "nope"
        ));
    }

    #[test]
    fn invalid_config_rejected() {
        let snapshot = snapshot(
            vec![facility("f-1", "poultry", "Namakkal", 11.0, 78.0)],
            vec![],
            vec![],
            vec![],
        );
        let mut config = RiskConfig::default();
        config.water.search_radius_m = -10.0;
        assert!(RiskClassifier::new(&snapshot, &config).is_err());
    }
}
