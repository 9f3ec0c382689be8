//! Registry builders shared by the classifier and aggregator tests.

use std::sync::Arc;

use farm_map_registry::{RegistryInput, RegistrySnapshot, SpatialRegistry};
use serde_json::{Value, json};

pub fn facility(id: &str, facility_type: &str, district: &str, lat: f64, lon: f64) -> Value {
    json!({
        "id": id,
        "name": format!("Facility {id}"),
        "facility_type": facility_type,
        "state": "Tamil Nadu",
        "district": district,
        "latitude": lat,
        "longitude": lon,
    })
}

pub fn water_point(id: &str, lat: f64, lon: f64) -> Value {
    json!({
        "id": id,
        "name": format!("Water {id}"),
        "kind": "river",
        "geometry": {"type": "point", "latitude": lat, "longitude": lon},
    })
}

pub fn settlement(id: &str, lat: f64, lon: f64, population: Option<u64>) -> Value {
    json!({
        "id": id,
        "name": format!("Settlement {id}"),
        "population": population,
        "latitude": lat,
        "longitude": lon,
    })
}

pub fn sample(id: &str, lat: f64, lon: f64, parameters: Value) -> Value {
    json!({
        "id": id,
        "latitude": lat,
        "longitude": lon,
        "collected_on": "2024-02-01",
        "parameters": parameters,
    })
}

pub fn snapshot(
    facilities: Vec<Value>,
    water_bodies: Vec<Value>,
    settlements: Vec<Value>,
    groundwater_samples: Vec<Value>,
) -> Arc<RegistrySnapshot> {
    let input: RegistryInput = serde_json::from_value(json!({
        "facilities": facilities,
        "water_bodies": water_bodies,
        "settlements": settlements,
        "groundwater_samples": groundwater_samples,
    }))
    .unwrap();
    SpatialRegistry::new().load(input).unwrap()
}
