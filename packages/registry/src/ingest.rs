//! Conversion of raw input records into validated entities.
//!
//! Every record is checked before anything is indexed. The first invalid
//! value aborts the whole build, so a partially valid registry never
//! exists.

use std::collections::{BTreeMap, BTreeSet};

use farm_map_facility_models::records::{
    FacilityRecord, GeometryRecord, GroundwaterSampleRecord, OperatorRecord, PointRecord,
    SettlementRecord, WaterBodyRecord,
};
use farm_map_facility_models::{
    Coordinate, CoordinateError, Facility, GroundwaterSample, KnownHotspot, Operator,
    ParameterLimit, Settlement, WaterBody, WaterBodyGeometry, WaterQualityStandard,
};
use farm_map_spatial::{BoundingBox, IndexKind};
use strum_macros::{AsRefStr, Display};

use crate::RegistryInput;
use crate::snapshot::RegistrySnapshot;

/// Collection a rejected record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Facility,
    Operator,
    WaterBody,
    Settlement,
    GroundwaterSample,
    Standard,
    KnownHotspot,
}

/// Reasons a load is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The input has no facilities. Loading it would make every query
    /// answer "nothing found" instead of "nothing loaded".
    #[error("registry input has no facilities")]
    EmptyRegistry,

    /// A record has an empty identifier.
    #[error("{entity} record has an empty id")]
    EmptyId {
        /// Collection of the offending record.
        entity: EntityKind,
    },

    /// Two records in one collection share an identifier.
    #[error("duplicate {entity} id '{id}'")]
    DuplicateId {
        /// Collection of the offending record.
        entity: EntityKind,
        /// The repeated identifier.
        id: String,
    },

    /// A coordinate is non-finite or outside the WGS-84 range.
    #[error("{entity} '{id}' has an invalid coordinate: {source}")]
    InvalidCoordinate {
        /// Collection of the offending record.
        entity: EntityKind,
        /// Record identifier.
        id: String,
        /// The range violation.
        source: CoordinateError,
    },

    /// A facility has no latitude or longitude.
    #[error("facility '{facility_id}' has no location")]
    MissingLocation {
        /// Facility identifier.
        facility_id: String,
    },

    /// A facility capacity is negative or non-finite.
    #[error("facility '{facility_id}' has invalid capacity {value}")]
    InvalidCapacity {
        /// Facility identifier.
        facility_id: String,
        /// The rejected capacity.
        value: f64,
    },

    /// A facility references an operator that is not in the operator table.
    #[error("facility '{facility_id}' references unknown operator '{operator_id}'")]
    UnknownOperator {
        /// Facility identifier.
        facility_id: String,
        /// The dangling operator reference.
        operator_id: String,
    },

    /// A water body has no vertices.
    #[error("water body '{water_body_id}' has an empty geometry")]
    EmptyGeometry {
        /// Water body identifier.
        water_body_id: String,
    },

    /// A boundary ring has fewer than three vertices.
    #[error("water body '{water_body_id}' boundary has {points} points, need at least 3")]
    DegenerateBoundary {
        /// Water body identifier.
        water_body_id: String,
        /// Number of vertices supplied.
        points: usize,
    },

    /// A sample references a standard that was not supplied.
    #[error("groundwater sample '{sample_id}' references unknown standard '{standard}'")]
    UnknownStandard {
        /// Sample identifier.
        sample_id: String,
        /// The dangling standard name.
        standard: String,
    },

    /// A measured concentration is negative or non-finite.
    #[error("groundwater sample '{sample_id}' has invalid {parameter} value {value}")]
    InvalidConcentration {
        /// Sample identifier.
        sample_id: String,
        /// Parameter name.
        parameter: String,
        /// The rejected value.
        value: f64,
    },

    /// A standard's limit is negative or non-finite.
    #[error("standard '{standard}' has invalid {parameter} limit {value}")]
    InvalidLimit {
        /// Standard name.
        standard: String,
        /// Parameter name.
        parameter: String,
        /// The rejected limit.
        value: f64,
    },

    /// A standard's range is empty: no bound, or minimum above maximum.
    #[error("standard '{standard}' has no usable {parameter} range")]
    InvalidRange {
        /// Standard name.
        standard: String,
        /// Parameter name.
        parameter: String,
    },

    /// A sample depth is negative or non-finite.
    #[error("groundwater sample '{sample_id}' has invalid depth {value}")]
    InvalidDepth {
        /// Sample identifier.
        sample_id: String,
        /// The rejected depth.
        value: f64,
    },

    /// A known hotspot names no district.
    #[error("known hotspot '{hotspot_id}' lists no districts")]
    HotspotWithoutDistricts {
        /// Hotspot identifier.
        hotspot_id: String,
    },
}

/// Validates `input` and builds the indexed snapshot.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found; nothing is built in that
/// case.
pub fn build_snapshot(
    input: RegistryInput,
    index_kind: IndexKind,
) -> Result<RegistrySnapshot, ValidationError> {
    let RegistryInput {
        facilities,
        operators,
        water_bodies,
        settlements,
        groundwater_samples,
        standards,
        known_hotspots,
        livestock_census,
    } = input;

    if facilities.is_empty() {
        return Err(ValidationError::EmptyRegistry);
    }

    let standards = convert_standards(standards)?;
    let mut operators = convert_operators(operators)?;
    let facilities = convert_facilities(facilities, &mut operators)?;
    let water_bodies = convert_all(
        water_bodies,
        EntityKind::WaterBody,
        |r| &r.id,
        convert_water_body,
    )?;
    let settlements = convert_all(
        settlements,
        EntityKind::Settlement,
        |r| &r.id,
        convert_settlement,
    )?;
    let samples = convert_all(
        groundwater_samples,
        EntityKind::GroundwaterSample,
        |r| &r.id,
        |r| convert_sample(r, &standards),
    )?;
    let known_hotspots = convert_all(
        known_hotspots,
        EntityKind::KnownHotspot,
        |h| &h.id,
        convert_known_hotspot,
    )?;

    Ok(RegistrySnapshot::new(
        facilities,
        operators,
        water_bodies,
        settlements,
        samples,
        standards,
        known_hotspots,
        livestock_census,
        index_kind,
    ))
}

fn coordinate(
    entity: EntityKind,
    id: &str,
    latitude: f64,
    longitude: f64,
) -> Result<Coordinate, ValidationError> {
    Coordinate::new(latitude, longitude).map_err(|source| ValidationError::InvalidCoordinate {
        entity,
        id: id.to_string(),
        source,
    })
}

/// Rejects empty and repeated ids in `seen`.
fn check_id(
    seen: &mut BTreeSet<String>,
    entity: EntityKind,
    id: &str,
) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::EmptyId { entity });
    }
    if !seen.insert(id.to_string()) {
        return Err(ValidationError::DuplicateId {
            entity,
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Checks ids, converts each record, and returns the entities sorted by id.
fn convert_all<R, T>(
    records: Vec<R>,
    entity: EntityKind,
    id_of: impl Fn(&R) -> &String,
    convert: impl Fn(R) -> Result<T, ValidationError>,
) -> Result<Vec<T>, ValidationError> {
    let mut seen = BTreeSet::new();
    let mut converted = Vec::with_capacity(records.len());
    for record in records {
        check_id(&mut seen, entity, id_of(&record))?;
        converted.push((id_of(&record).clone(), convert(record)?));
    }
    converted.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(converted.into_iter().map(|(_, entity)| entity).collect())
}

fn convert_standards(
    standards: Vec<WaterQualityStandard>,
) -> Result<BTreeMap<String, WaterQualityStandard>, ValidationError> {
    let mut seen = BTreeSet::new();
    let mut converted = BTreeMap::new();
    for standard in standards {
        check_id(&mut seen, EntityKind::Standard, &standard.name)?;
        for (parameter, limit) in &standard.limits {
            check_limit(&standard.name, parameter, limit)?;
        }
        converted.insert(standard.name.clone(), standard);
    }
    Ok(converted)
}

fn check_limit(
    standard: &str,
    parameter: &str,
    limit: &ParameterLimit,
) -> Result<(), ValidationError> {
    for value in [limit.min, limit.max, limit.desirable].into_iter().flatten() {
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::InvalidLimit {
                standard: standard.to_string(),
                parameter: parameter.to_string(),
                value,
            });
        }
    }
    let usable = match (limit.min, limit.max) {
        (None, None) => false,
        (Some(min), Some(max)) => min <= max,
        _ => true,
    };
    if usable {
        Ok(())
    } else {
        Err(ValidationError::InvalidRange {
            standard: standard.to_string(),
            parameter: parameter.to_string(),
        })
    }
}

fn convert_operators(
    records: Vec<OperatorRecord>,
) -> Result<BTreeMap<String, Operator>, ValidationError> {
    let mut seen = BTreeSet::new();
    let mut operators = BTreeMap::new();
    for record in records {
        check_id(&mut seen, EntityKind::Operator, &record.id)?;
        operators.insert(
            record.id.clone(),
            Operator {
                id: record.id,
                name: record.name,
                cin: record.cin,
                headquarters: record.headquarters,
                facility_ids: Vec::new(),
            },
        );
    }
    Ok(operators)
}

/// Converts facilities and fills in each operator's derived membership.
fn convert_facilities(
    records: Vec<FacilityRecord>,
    operators: &mut BTreeMap<String, Operator>,
) -> Result<Vec<Facility>, ValidationError> {
    let known: &BTreeMap<String, Operator> = operators;
    let facilities = convert_all(records, EntityKind::Facility, |r| &r.id, |record| {
        convert_facility(record, known)
    })?;

    for facility in &facilities {
        if let Some(operator) = facility
            .operator_id
            .as_ref()
            .and_then(|id| operators.get_mut(id))
        {
            operator.facility_ids.push(facility.id.clone());
        }
    }

    Ok(facilities)
}

fn convert_facility(
    record: FacilityRecord,
    operators: &BTreeMap<String, Operator>,
) -> Result<Facility, ValidationError> {
    let (Some(latitude), Some(longitude)) = (record.latitude, record.longitude) else {
        return Err(ValidationError::MissingLocation {
            facility_id: record.id,
        });
    };
    let location = coordinate(EntityKind::Facility, &record.id, latitude, longitude)?;

    if let Some(capacity) = record.capacity.filter(|c| !c.is_finite() || *c < 0.0) {
        return Err(ValidationError::InvalidCapacity {
            facility_id: record.id,
            value: capacity,
        });
    }

    if let Some(operator_id) = record
        .operator_id
        .as_ref()
        .filter(|id| !operators.contains_key(*id))
    {
        return Err(ValidationError::UnknownOperator {
            facility_id: record.id.clone(),
            operator_id: operator_id.clone(),
        });
    }

    Ok(Facility {
        id: record.id,
        name: record.name,
        operator_id: record.operator_id,
        facility_type: record.facility_type,
        state: record.state.trim().to_string(),
        district: record.district.trim().to_string(),
        location,
        capacity: record.capacity,
        capacity_unit: record.capacity_unit,
        address: record.address,
        pcb_category: record.pcb_category,
        cto_number: record.cto_number,
        data_sources: record.data_sources,
    })
}

fn convert_points(id: &str, points: &[PointRecord]) -> Result<Vec<Coordinate>, ValidationError> {
    points
        .iter()
        .map(|p| coordinate(EntityKind::WaterBody, id, p.latitude, p.longitude))
        .collect()
}

fn convert_water_body(record: WaterBodyRecord) -> Result<WaterBody, ValidationError> {
    let geometry = match &record.geometry {
        GeometryRecord::Point {
            latitude,
            longitude,
        } => WaterBodyGeometry::Point(coordinate(
            EntityKind::WaterBody,
            &record.id,
            *latitude,
            *longitude,
        )?),
        GeometryRecord::Course { points } => {
            if points.is_empty() {
                return Err(ValidationError::EmptyGeometry {
                    water_body_id: record.id,
                });
            }
            WaterBodyGeometry::Course(convert_points(&record.id, points)?)
        }
        GeometryRecord::Boundary { points } => {
            if points.is_empty() {
                return Err(ValidationError::EmptyGeometry {
                    water_body_id: record.id,
                });
            }
            if points.len() < 3 {
                return Err(ValidationError::DegenerateBoundary {
                    water_body_id: record.id,
                    points: points.len(),
                });
            }
            WaterBodyGeometry::Boundary(convert_points(&record.id, points)?)
        }
    };

    Ok(WaterBody {
        id: record.id,
        name: record.name,
        kind: record.kind,
        geometry,
    })
}

fn convert_settlement(record: SettlementRecord) -> Result<Settlement, ValidationError> {
    let location = coordinate(
        EntityKind::Settlement,
        &record.id,
        record.latitude,
        record.longitude,
    )?;
    Ok(Settlement {
        id: record.id,
        name: record.name,
        kind: record.kind,
        population: record.population,
        location,
    })
}

fn convert_sample(
    record: GroundwaterSampleRecord,
    standards: &BTreeMap<String, WaterQualityStandard>,
) -> Result<GroundwaterSample, ValidationError> {
    let location = coordinate(
        EntityKind::GroundwaterSample,
        &record.id,
        record.latitude,
        record.longitude,
    )?;

    if !standards.contains_key(&record.standard) {
        return Err(ValidationError::UnknownStandard {
            sample_id: record.id,
            standard: record.standard,
        });
    }

    if let Some((parameter, value)) = record
        .parameters
        .iter()
        .find(|(_, value)| !value.is_finite() || **value < 0.0)
    {
        return Err(ValidationError::InvalidConcentration {
            sample_id: record.id.clone(),
            parameter: parameter.clone(),
            value: *value,
        });
    }

    if let Some(depth) = record.depth_m.filter(|d| !d.is_finite() || *d < 0.0) {
        return Err(ValidationError::InvalidDepth {
            sample_id: record.id,
            value: depth,
        });
    }
    Ok(GroundwaterSample {
        id: record.id,
        location,
        collected_on: record.collected_on,
        depth_m: record.depth_m,
        parameters: record.parameters,
        standard: record.standard,
    })
}

fn convert_known_hotspot(mut hotspot: KnownHotspot) -> Result<KnownHotspot, ValidationError> {
    hotspot.districts.retain(|d| !d.trim().is_empty());
    if hotspot.districts.is_empty() {
        return Err(ValidationError::HotspotWithoutDistricts {
            hotspot_id: hotspot.id,
        });
    }
    hotspot.state = hotspot.state.trim().to_string();
    Ok(hotspot)
}

/// Envelope of a water body's geometry for indexing.
pub(crate) fn water_body_envelope(body: &WaterBody) -> BoundingBox {
    let vertices = body.geometry.vertices();
    BoundingBox::enclosing(vertices).unwrap_or_else(|| {
        // Unreachable for validated bodies; an inverted box never matches.
        BoundingBox {
            min_lat: f64::INFINITY,
            min_lon: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            max_lon: f64::NEG_INFINITY,
        }
    })
}

/// Envelope of a single coordinate.
pub(crate) const fn point_envelope(c: Coordinate) -> BoundingBox {
    BoundingBox {
        min_lat: c.latitude(),
        min_lon: c.longitude(),
        max_lat: c.latitude(),
        max_lon: c.longitude(),
    }
}
