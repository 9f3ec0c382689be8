#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! `GeoJSON` export.
//!
//! Facilities and hotspots become `Point` features in one
//! `FeatureCollection`. Every feature carries a `feature_kind` property
//! (`facility`, `hotspot`, and with [`ExportOptions::include_gazetteer`]
//! also `water_body` and `settlement`) so map layers can filter on it.
//!
//! Positions are written `[longitude, latitude]` as `GeoJSON` requires.
//! Internally coordinates are latitude-first, so every position written
//! here goes through [`position`].

use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use farm_map_facility_models::{Coordinate, Facility, Settlement, WaterBody, WaterBodyGeometry};
use farm_map_registry::RegistrySnapshot;
use farm_map_risk::MappingReport;
use farm_map_risk_models::Hotspot;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, feature::Id};

pub const FACILITY_KIND: &str = "facility";
pub const HOTSPOT_KIND: &str = "hotspot";
pub const WATER_BODY_KIND: &str = "water_body";
pub const SETTLEMENT_KIND: &str = "settlement";

/// Errors from building, writing or reading an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A property value could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The output file could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    Geojson(#[from] geojson::Error),

    /// Valid `GeoJSON`, but not the shape this crate writes.
    #[error("Unexpected GeoJSON document: {0}")]
    Unexpected(String),
}

/// What to include beyond facilities and hotspots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Also export water bodies and settlements.
    pub include_gazetteer: bool,
}

/// `[longitude, latitude]`.
#[must_use]
pub fn position(coordinate: Coordinate) -> Vec<f64> {
    vec![coordinate.longitude(), coordinate.latitude()]
}

/// Builds the feature collection for a snapshot and its report.
///
/// Facilities come first in id order, then hotspots in rank order, then
/// (optionally) water bodies and settlements. A facility without an
/// assessment in `report` is still exported, with null risk properties.
///
/// # Errors
///
/// Returns an error if a risk factor cannot be serialized.
pub fn to_feature_collection(
    snapshot: &RegistrySnapshot,
    report: &MappingReport,
    options: &ExportOptions,
) -> Result<FeatureCollection, ExportError> {
    let mut features = Vec::with_capacity(snapshot.facilities().len() + report.hotspots.len());

    for facility in snapshot.facilities() {
        features.push(facility_feature(snapshot, report, facility)?);
    }
    for hotspot in &report.hotspots {
        features.push(hotspot_feature(hotspot)?);
    }
    if options.include_gazetteer {
        features.extend(snapshot.water_bodies().iter().map(water_body_feature));
        features.extend(snapshot.settlements().iter().map(settlement_feature));
    }

    log::info!(
        "Built GeoJSON collection: {} facilities, {} hotspots, {} features total",
        snapshot.facilities().len(),
        report.hotspots.len(),
        features.len()
    );

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_geojson_string(collection: &FeatureCollection) -> Result<String, ExportError> {
    Ok(serde_json::to_string(collection)?)
}

/// Writes `collection` to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_geojson(
    path: impl AsRef<Path>,
    collection: &FeatureCollection,
) -> Result<(), ExportError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, collection)?;
    writer.flush()?;
    log::info!(
        "Wrote {} features to {}",
        collection.features.len(),
        path.display()
    );
    Ok(())
}

/// Reads back `(id, longitude, latitude)` for every facility feature of an
/// exported document, in document order.
///
/// # Errors
///
/// Returns an error if the document is not a `FeatureCollection`, or a
/// facility feature lacks an id or a `Point` geometry.
pub fn read_facility_positions(
    geojson_str: &str,
) -> Result<Vec<(String, f64, f64)>, ExportError> {
    let GeoJson::FeatureCollection(collection) = geojson_str.parse::<GeoJson>()? else {
        return Err(ExportError::Unexpected(
            "expected a FeatureCollection".to_string(),
        ));
    };

    collection
        .features
        .iter()
        .filter(|feature| {
            feature.property("feature_kind").and_then(JsonValue::as_str) == Some(FACILITY_KIND)
        })
        .map(|feature| {
            let id = feature
                .property("id")
                .and_then(JsonValue::as_str)
                .ok_or_else(|| {
                    ExportError::Unexpected("facility feature without id".to_string())
                })?;
            match feature.geometry.as_ref().map(|g| &g.value) {
                Some(geojson::Value::Point(point)) if point.len() >= 2 => {
                    Ok((id.to_string(), point[0], point[1]))
                }
                _ => Err(ExportError::Unexpected(format!(
                    "facility feature '{id}' has no point geometry"
                ))),
            }
        })
        .collect()
}

fn point_geometry(coordinate: Coordinate) -> Geometry {
    Geometry::new(geojson::Value::Point(position(coordinate)))
}

fn into_properties(value: JsonValue) -> JsonObject {
    match value {
        JsonValue::Object(map) => map,
        _ => JsonObject::new(),
    }
}

fn feature(id: String, geometry: Geometry, properties: JsonValue) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: Some(Id::String(id)),
        properties: Some(into_properties(properties)),
        foreign_members: None,
    }
}

fn facility_feature(
    snapshot: &RegistrySnapshot,
    report: &MappingReport,
    facility: &Facility,
) -> Result<Feature, ExportError> {
    let operator_name = facility
        .operator_id
        .as_deref()
        .and_then(|id| snapshot.operator(id))
        .map(|operator| operator.name.clone());
    let assessment = report.assessment(&facility.id);
    let risk_factors = assessment
        .map(|a| serde_json::to_value(&a.factors))
        .transpose()?;

    let properties = serde_json::json!({
        "feature_kind": FACILITY_KIND,
        "id": facility.id,
        "name": facility.name,
        "operator_id": facility.operator_id,
        "operator_name": operator_name,
        "facility_type": facility.facility_type.as_ref(),
        "state": facility.state,
        "district": facility.district,
        "capacity": facility.capacity,
        "capacity_unit": facility.capacity_unit,
        "address": facility.address,
        "pcb_category": facility.pcb_category.map(|c| c.to_string()),
        "cto_number": facility.cto_number,
        "data_sources": facility.data_sources,
        "risk_score": assessment.map(|a| a.score),
        "risk_category": assessment.map(|a| a.category.as_ref()),
        "risk_factors": risk_factors,
    });

    Ok(feature(
        format!("facility:{}", facility.id),
        point_geometry(facility.location),
        properties,
    ))
}

fn hotspot_feature(hotspot: &Hotspot) -> Result<Feature, ExportError> {
    let properties = serde_json::json!({
        "feature_kind": HOTSPOT_KIND,
        "hotspot_id": hotspot.id,
        "rank": hotspot.rank,
        "state": hotspot.state,
        "district": hotspot.district,
        "member_ids": hotspot.member_ids,
        "member_count": hotspot.member_count(),
        "aggregate_score": hotspot.aggregate_score,
        "category": hotspot.category.as_ref(),
        "dominant_factors": serde_json::to_value(&hotspot.dominant_factors)?,
        "known_cluster": hotspot.known_cluster,
    });

    Ok(feature(
        format!("hotspot:{}", hotspot.id),
        point_geometry(hotspot.centroid),
        properties,
    ))
}

fn water_body_feature(body: &WaterBody) -> Feature {
    let value = match &body.geometry {
        WaterBodyGeometry::Point(point) => geojson::Value::Point(position(*point)),
        WaterBodyGeometry::Course(points) => {
            geojson::Value::LineString(points.iter().copied().map(position).collect())
        }
        WaterBodyGeometry::Boundary(ring) => {
            let mut exterior: Vec<Vec<f64>> = ring.iter().copied().map(position).collect();
            if ring.first() != ring.last() {
                exterior.push(position(ring[0]));
            }
            geojson::Value::Polygon(vec![exterior])
        }
    };

    let properties = serde_json::json!({
        "feature_kind": WATER_BODY_KIND,
        "id": body.id,
        "name": body.name,
        "kind": body.kind.as_ref(),
    });

    feature(
        format!("water_body:{}", body.id),
        Geometry::new(value),
        properties,
    )
}

fn settlement_feature(settlement: &Settlement) -> Feature {
    let properties = serde_json::json!({
        "feature_kind": SETTLEMENT_KIND,
        "id": settlement.id,
        "name": settlement.name,
        "kind": settlement.kind.map(|k| k.to_string()),
        "population": settlement.population,
    });

    feature(
        format!("settlement:{}", settlement.id),
        point_geometry(settlement.location),
        properties,
    )
}
