//! Candidate lookup for radius and nearest-neighbour queries.
//!
//! An index only narrows the search: it returns every entry whose envelope
//! could hold a point within the radius. Callers measure exact distances
//! themselves, so any implementation can be swapped in without changing
//! results.

use farm_map_facility_models::Coordinate;
use rstar::{AABB, RTree, RTreeObject};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::geodesy::BoundingBox;

/// Narrows proximity queries to a candidate set.
pub trait ProximityIndex: Send + Sync {
    /// Positions (in build order) of entries whose envelope intersects the
    /// search box around `center`. Sorted ascending.
    fn candidates_within(&self, center: Coordinate, radius_m: f64) -> Vec<usize>;

    /// Number of indexed entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which [`ProximityIndex`] implementation to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum IndexKind {
    /// R-tree over entry envelopes.
    #[default]
    #[strum(to_string = "rtree", serialize = "r_tree")]
    RTree,
    /// Full scan. Useful as a reference and for very small datasets.
    Linear,
}

impl IndexKind {
    /// Builds an index over `envelopes`; entry `i` is `envelopes[i]`.
    #[must_use]
    pub fn build(self, envelopes: &[BoundingBox]) -> Box<dyn ProximityIndex> {
        match self {
            Self::RTree => Box::new(RTreeIndex::build(envelopes)),
            Self::Linear => Box::new(LinearIndex::build(envelopes)),
        }
    }
}

/// An envelope stored in the R-tree with its build position.
struct IndexedEnvelope {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Converts to an `rstar` envelope in `[lng, lat]` order.
fn to_aabb(bbox: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.min_lon, bbox.min_lat], [bbox.max_lon, bbox.max_lat])
}

/// R-tree backed [`ProximityIndex`].
pub struct RTreeIndex {
    tree: RTree<IndexedEnvelope>,
}

impl RTreeIndex {
    #[must_use]
    pub fn build(envelopes: &[BoundingBox]) -> Self {
        let entries = envelopes
            .iter()
            .enumerate()
            .map(|(position, bbox)| IndexedEnvelope {
                position,
                envelope: to_aabb(bbox),
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::debug!("Built R-tree over {} envelopes", tree.size());

        Self { tree }
    }
}

impl ProximityIndex for RTreeIndex {
    fn candidates_within(&self, center: Coordinate, radius_m: f64) -> Vec<usize> {
        let query = to_aabb(&BoundingBox::around(center, radius_m));
        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query)
            .map(|entry| entry.position)
            .collect();
        positions.sort_unstable();
        positions
    }

    fn len(&self) -> usize {
        self.tree.size()
    }
}

/// Linear-scan [`ProximityIndex`].
pub struct LinearIndex {
    envelopes: Vec<BoundingBox>,
}

impl LinearIndex {
    #[must_use]
    pub fn build(envelopes: &[BoundingBox]) -> Self {
        Self {
            envelopes: envelopes.to_vec(),
        }
    }
}

impl ProximityIndex for LinearIndex {
    fn candidates_within(&self, center: Coordinate, radius_m: f64) -> Vec<usize> {
        let query = BoundingBox::around(center, radius_m);
        self.envelopes
            .iter()
            .enumerate()
            .filter(|(_, bbox)| bbox.intersects(&query))
            .map(|(position, _)| position)
            .collect()
    }

    fn len(&self) -> usize {
        self.envelopes.len()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    fn point_box(lat: f64, lon: f64) -> BoundingBox {
        BoundingBox {
            min_lat: lat,
            min_lon: lon,
            max_lat: lat,
            max_lon: lon,
        }
    }

    fn sample_envelopes() -> Vec<BoundingBox> {
        vec![
            point_box(11.20, 78.10),
            point_box(11.21, 78.11),
            point_box(11.50, 78.40),
            // A river course running north-south past the query point.
            BoundingBox {
                min_lat: 11.0,
                min_lon: 78.12,
                max_lat: 11.4,
                max_lon: 78.13,
            },
            point_box(22.5, 72.9),
        ]
    }

    #[test]
    fn rtree_and_linear_agree() {
        let envelopes = sample_envelopes();
        let rtree = IndexKind::RTree.build(&envelopes);
        let linear = IndexKind::Linear.build(&envelopes);
        let center = Coordinate::new(11.2, 78.1).unwrap();
        for radius in [10.0, 2_000.0, 5_000.0, 50_000.0, 2_000_000.0] {
            assert_eq!(
                rtree.candidates_within(center, radius),
                linear.candidates_within(center, radius),
                "radius {radius}"
            );
        }
    }

    #[test]
    fn candidates_grow_with_radius() {
        let index = RTreeIndex::build(&sample_envelopes());
        let center = Coordinate::new(11.2, 78.1).unwrap();
        assert_eq!(index.candidates_within(center, 10.0), vec![0]);
        assert_eq!(index.candidates_within(center, 3_000.0), vec![0, 1, 3]);
        assert_eq!(index.len(), 5);
    }

    #[test]
    fn empty_index() {
        let index = IndexKind::RTree.build(&[]);
        assert!(index.is_empty());
        let center = Coordinate::new(0.0, 0.0).unwrap();
        assert!(index.candidates_within(center, 1_000_000.0).is_empty());
    }

    #[test]
    fn index_kind_parses() {
        assert_eq!(IndexKind::from_str("rtree").unwrap(), IndexKind::RTree);
        assert_eq!(IndexKind::from_str("Linear").unwrap(), IndexKind::Linear);
        assert_eq!(IndexKind::RTree.to_string(), "rtree");
    }
}
