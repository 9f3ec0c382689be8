#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geodesic primitives and proximity indexing for facility mapping.
//!
//! [`geodesy`] holds the pure distance and containment functions (point to
//! point, point to polyline, point to region). [`index`] narrows repeated
//! radius and nearest-neighbour queries to candidate sets, backed by an
//! R-tree by default.

pub mod geodesy;
pub mod index;

pub use geodesy::{
    BoundingBox, EARTH_RADIUS_M, MAX_DISTANCE_M, distance, distance_to_region,
    distance_to_segment_chain, is_within_radius,
};
pub use index::{IndexKind, LinearIndex, ProximityIndex, RTreeIndex};
