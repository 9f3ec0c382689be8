//! The immutable, indexed view produced by a successful load.

use std::collections::{BTreeMap, BTreeSet};

use farm_map_facility_models::{
    Coordinate, Facility, FacilityType, GroundwaterSample, KnownHotspot, LivestockCensus,
    Operator, Settlement, WaterBody, WaterBodyGeometry, WaterQualityStandard,
};
use farm_map_spatial::{
    IndexKind, MAX_DISTANCE_M, ProximityIndex, distance, distance_to_region,
    distance_to_segment_chain,
};
use serde::Serialize;

use crate::ingest::{point_envelope, water_body_envelope};

/// First radius tried by nearest-neighbour searches.
const INITIAL_SEARCH_RADIUS_M: f64 = 2_000.0;

/// Key used in [`RegistryStats::by_operator`] for facilities without an
/// operator.
pub const INDEPENDENT_OPERATOR: &str = "independent";

/// An entity paired with its distance from a query location.
#[derive(Debug)]
pub struct Nearby<'a, T> {
    pub item: &'a T,
    pub distance_m: f64,
}

/// Something with an id and a distance from an arbitrary coordinate.
trait Located {
    fn id(&self) -> &str;
    fn distance_from(&self, location: Coordinate) -> f64;
}

impl Located for WaterBody {
    fn id(&self) -> &str {
        &self.id
    }

    fn distance_from(&self, location: Coordinate) -> f64 {
        match &self.geometry {
            WaterBodyGeometry::Point(point) => distance(location, *point),
            WaterBodyGeometry::Course(points) => distance_to_segment_chain(location, points),
            WaterBodyGeometry::Boundary(ring) => distance_to_region(location, ring),
        }
    }
}

impl Located for Settlement {
    fn id(&self) -> &str {
        &self.id
    }

    fn distance_from(&self, location: Coordinate) -> f64 {
        distance(location, self.location)
    }
}

impl Located for GroundwaterSample {
    fn id(&self) -> &str {
        &self.id
    }

    fn distance_from(&self, location: Coordinate) -> f64 {
        distance(location, self.location)
    }
}

/// Summary counts over a loaded registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total_facilities: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_state: BTreeMap<String, usize>,
    /// Operator id to facility count; independents under
    /// [`INDEPENDENT_OPERATOR`].
    pub by_operator: BTreeMap<String, usize>,
    /// Facilities with a recorded consent-to-operate number.
    pub with_cto: usize,
    pub operators: usize,
    pub water_bodies: usize,
    pub settlements: usize,
    pub groundwater_samples: usize,
}

/// A loaded, validated registry.
///
/// Never mutated after construction. A reload builds a new snapshot, so
/// anyone holding this one keeps a consistent view.
pub struct RegistrySnapshot {
    facilities: Vec<Facility>,
    facility_positions: BTreeMap<String, usize>,
    by_type: BTreeMap<FacilityType, Vec<usize>>,
    /// Lowercased state name to facility positions.
    by_state: BTreeMap<String, Vec<usize>>,
    operators: BTreeMap<String, Operator>,
    water_bodies: Vec<WaterBody>,
    water_index: Box<dyn ProximityIndex>,
    settlements: Vec<Settlement>,
    settlement_index: Box<dyn ProximityIndex>,
    samples: Vec<GroundwaterSample>,
    sample_index: Box<dyn ProximityIndex>,
    standards: BTreeMap<String, WaterQualityStandard>,
    known_hotspots: Vec<KnownHotspot>,
    livestock_census: Option<LivestockCensus>,
}

impl std::fmt::Debug for RegistrySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySnapshot")
            .field("facilities", &self.facilities.len())
            .field("operators", &self.operators.len())
            .field("water_bodies", &self.water_bodies.len())
            .field("settlements", &self.settlements.len())
            .field("groundwater_samples", &self.samples.len())
            .field("standards", &self.standards.len())
            .field("known_hotspots", &self.known_hotspots.len())
            .finish_non_exhaustive()
    }
}

impl RegistrySnapshot {
    /// Indexes already-validated, id-sorted collections.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        facilities: Vec<Facility>,
        operators: BTreeMap<String, Operator>,
        water_bodies: Vec<WaterBody>,
        settlements: Vec<Settlement>,
        samples: Vec<GroundwaterSample>,
        standards: BTreeMap<String, WaterQualityStandard>,
        known_hotspots: Vec<KnownHotspot>,
        livestock_census: Option<LivestockCensus>,
        index_kind: IndexKind,
    ) -> Self {
        let mut facility_positions = BTreeMap::new();
        let mut by_type: BTreeMap<FacilityType, Vec<usize>> = BTreeMap::new();
        let mut by_state: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (position, facility) in facilities.iter().enumerate() {
            facility_positions.insert(facility.id.clone(), position);
            by_type
                .entry(facility.facility_type)
                .or_default()
                .push(position);
            by_state
                .entry(facility.state.to_lowercase())
                .or_default()
                .push(position);
        }

        let water_envelopes: Vec<_> = water_bodies.iter().map(water_body_envelope).collect();
        let settlement_envelopes: Vec<_> = settlements
            .iter()
            .map(|s| point_envelope(s.location))
            .collect();
        let sample_envelopes: Vec<_> = samples
            .iter()
            .map(|s| point_envelope(s.location))
            .collect();

        Self {
            facilities,
            facility_positions,
            by_type,
            by_state,
            operators,
            water_index: index_kind.build(&water_envelopes),
            water_bodies,
            settlement_index: index_kind.build(&settlement_envelopes),
            settlements,
            sample_index: index_kind.build(&sample_envelopes),
            samples,
            standards,
            known_hotspots,
            livestock_census,
        }
    }

    /// All facilities, ordered by id.
    #[must_use]
    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    #[must_use]
    pub fn facility(&self, id: &str) -> Option<&Facility> {
        self.facility_positions
            .get(id)
            .map(|&position| &self.facilities[position])
    }

    /// All operators, ordered by id.
    pub fn operators(&self) -> impl Iterator<Item = &Operator> {
        self.operators.values()
    }

    #[must_use]
    pub fn operator(&self, id: &str) -> Option<&Operator> {
        self.operators.get(id)
    }

    #[must_use]
    pub fn water_bodies(&self) -> &[WaterBody] {
        &self.water_bodies
    }

    #[must_use]
    pub fn settlements(&self) -> &[Settlement] {
        &self.settlements
    }

    #[must_use]
    pub fn groundwater_samples(&self) -> &[GroundwaterSample] {
        &self.samples
    }

    #[must_use]
    pub fn standard(&self, name: &str) -> Option<&WaterQualityStandard> {
        self.standards.get(name)
    }

    /// Documented pollution clusters, ordered by id.
    #[must_use]
    pub fn known_hotspots(&self) -> &[KnownHotspot] {
        &self.known_hotspots
    }

    /// Known clusters in `state` (case-insensitive), ordered by id.
    #[must_use]
    pub fn known_hotspots_in_state(&self, state: &str) -> Vec<&KnownHotspot> {
        self.known_hotspots
            .iter()
            .filter(|h| h.state.eq_ignore_ascii_case(state.trim()))
            .collect()
    }

    /// The known cluster covering `district` in `state`, if any. The first
    /// by id wins when clusters overlap.
    #[must_use]
    pub fn known_hotspot_for(&self, state: &str, district: &str) -> Option<&KnownHotspot> {
        self.known_hotspots
            .iter()
            .find(|h| h.covers(state, district))
    }

    #[must_use]
    pub const fn livestock_census(&self) -> Option<&LivestockCensus> {
        self.livestock_census.as_ref()
    }

    /// The `k` water bodies closest to `facility`.
    ///
    /// Ordered by distance, ties broken by id ascending.
    #[must_use]
    pub fn nearest_water_bodies(
        &self,
        facility: &Facility,
        k: usize,
    ) -> Vec<Nearby<'_, WaterBody>> {
        self.nearest_water_bodies_to(facility.location, k)
    }

    #[must_use]
    pub fn nearest_water_bodies_to(
        &self,
        location: Coordinate,
        k: usize,
    ) -> Vec<Nearby<'_, WaterBody>> {
        k_nearest(&self.water_bodies, self.water_index.as_ref(), location, k)
    }

    /// The `k` settlements closest to `facility`.
    ///
    /// Ordered by distance, ties broken by id ascending.
    #[must_use]
    pub fn nearest_settlements(
        &self,
        facility: &Facility,
        k: usize,
    ) -> Vec<Nearby<'_, Settlement>> {
        self.nearest_settlements_to(facility.location, k)
    }

    #[must_use]
    pub fn nearest_settlements_to(
        &self,
        location: Coordinate,
        k: usize,
    ) -> Vec<Nearby<'_, Settlement>> {
        k_nearest(&self.settlements, self.settlement_index.as_ref(), location, k)
    }

    /// Every groundwater sample within `radius_m` (inclusive) of `location`,
    /// most recent first, then by id.
    #[must_use]
    pub fn groundwater_samples_near(
        &self,
        location: Coordinate,
        radius_m: f64,
    ) -> Vec<Nearby<'_, GroundwaterSample>> {
        let mut found = within_radius(
            &self.samples,
            self.sample_index.as_ref(),
            location,
            radius_m,
        );
        found.sort_by(|a, b| {
            b.item
                .collected_on
                .cmp(&a.item.collected_on)
                .then_with(|| a.item.id.cmp(&b.item.id))
        });
        found
    }

    /// Operators that run at least one facility in `state`
    /// (case-insensitive), ordered by id.
    #[must_use]
    pub fn operators_by_state(&self, state: &str) -> Vec<&Operator> {
        let ids: BTreeSet<&str> = self
            .facility_positions_in_state(state)
            .iter()
            .filter_map(|&position| self.facilities[position].operator_id.as_deref())
            .collect();
        ids.into_iter()
            .filter_map(|id| self.operators.get(id))
            .collect()
    }

    /// Facilities of the given type, ordered by id.
    #[must_use]
    pub fn facilities_by_type(&self, facility_type: FacilityType) -> Vec<&Facility> {
        self.by_type
            .get(&facility_type)
            .map(|positions| self.at(positions))
            .unwrap_or_default()
    }

    /// Facilities in `state` (case-insensitive), ordered by id.
    #[must_use]
    pub fn facilities_by_state(&self, state: &str) -> Vec<&Facility> {
        self.at(self.facility_positions_in_state(state))
    }

    /// Facilities in `district` (case-insensitive), optionally restricted to
    /// `state`.
    #[must_use]
    pub fn facilities_by_district(&self, district: &str, state: Option<&str>) -> Vec<&Facility> {
        self.facilities
            .iter()
            .filter(|f| f.district.eq_ignore_ascii_case(district.trim()))
            .filter(|f| state.is_none_or(|s| f.state.eq_ignore_ascii_case(s.trim())))
            .collect()
    }

    /// Facilities run by `operator_id`, ordered by id. Empty for an unknown
    /// operator.
    #[must_use]
    pub fn facilities_by_operator(&self, operator_id: &str) -> Vec<&Facility> {
        self.operators
            .get(operator_id)
            .map(|operator| {
                operator
                    .facility_ids
                    .iter()
                    .filter_map(|id| self.facility(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let mut by_type = BTreeMap::new();
        let mut by_state = BTreeMap::new();
        let mut by_operator = BTreeMap::new();

        for facility in &self.facilities {
            *by_type
                .entry(facility.facility_type.to_string())
                .or_insert(0) += 1;
            *by_state.entry(facility.state.clone()).or_insert(0) += 1;
            let operator = facility
                .operator_id
                .clone()
                .unwrap_or_else(|| INDEPENDENT_OPERATOR.to_string());
            *by_operator.entry(operator).or_insert(0) += 1;
        }

        RegistryStats {
            total_facilities: self.facilities.len(),
            by_type,
            by_state,
            by_operator,
            with_cto: self
                .facilities
                .iter()
                .filter(|f| f.cto_number.is_some())
                .count(),
            operators: self.operators.len(),
            water_bodies: self.water_bodies.len(),
            settlements: self.settlements.len(),
            groundwater_samples: self.samples.len(),
        }
    }

    fn facility_positions_in_state(&self, state: &str) -> &[usize] {
        self.by_state
            .get(&state.trim().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn at(&self, positions: &[usize]) -> Vec<&Facility> {
        positions
            .iter()
            .map(|&position| &self.facilities[position])
            .collect()
    }
}

/// Orders by distance, then id.
fn sort_nearby<T: Located>(found: &mut [Nearby<'_, T>]) {
    found.sort_by(|a, b| {
        a.distance_m
            .total_cmp(&b.distance_m)
            .then_with(|| a.item.id().cmp(b.item.id()))
    });
}

fn within_radius<'a, T: Located>(
    items: &'a [T],
    index: &dyn ProximityIndex,
    location: Coordinate,
    radius_m: f64,
) -> Vec<Nearby<'a, T>> {
    index
        .candidates_within(location, radius_m)
        .into_iter()
        .map(|position| {
            let item = &items[position];
            Nearby {
                item,
                distance_m: item.distance_from(location),
            }
        })
        .filter(|nearby| nearby.distance_m <= radius_m)
        .collect()
}

/// Expanding-radius k-nearest search.
///
/// Every entity within the current radius is guaranteed to be a candidate,
/// so once `k` of them are found no entity outside the radius can beat
/// them.
fn k_nearest<'a, T: Located>(
    items: &'a [T],
    index: &dyn ProximityIndex,
    location: Coordinate,
    k: usize,
) -> Vec<Nearby<'a, T>> {
    if k == 0 || items.is_empty() {
        return Vec::new();
    }

    let mut radius = INITIAL_SEARCH_RADIUS_M;
    loop {
        let exhaustive = radius >= MAX_DISTANCE_M;
        let search_radius = if exhaustive { f64::INFINITY } else { radius };
        let mut found = within_radius(items, index, location, search_radius);
        if found.len() >= k || exhaustive {
            sort_nearby(&mut found);
            found.truncate(k);
            return found;
        }
        radius *= 4.0;
    }
}
