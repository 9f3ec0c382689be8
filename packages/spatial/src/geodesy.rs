//! Distance and containment math over WGS-84 coordinates.
//!
//! Spherical (haversine) model throughout. Accurate to well under a metre
//! at the kilometre scale used for proximity triage; not survey grade.

use farm_map_facility_models::Coordinate;
use geo::{Contains as _, LineLocatePoint as _};

/// Mean Earth radius (IUGG), in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Largest possible great-circle distance (half the circumference).
pub const MAX_DISTANCE_M: f64 = std::f64::consts::PI * EARTH_RADIUS_M;

/// Great-circle distance between two coordinates, in metres.
#[must_use]
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.latitude().to_radians();
    let lat_b = b.latitude().to_radians();
    let d_lat = (b.latitude() - a.latitude()).to_radians();
    let d_lon = (b.longitude() - a.longitude()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Whether `point` lies within `radius_m` of `center`. The radius is
/// inclusive.
#[must_use]
pub fn is_within_radius(point: Coordinate, center: Coordinate, radius_m: f64) -> bool {
    distance(point, center) <= radius_m
}

/// Minimum distance from `point` to the polyline through `chain`, in metres.
///
/// A single-vertex chain is treated as a point. An empty chain has no
/// distance and yields `f64::INFINITY`.
#[must_use]
pub fn distance_to_segment_chain(point: Coordinate, chain: &[Coordinate]) -> f64 {
    match chain {
        [] => f64::INFINITY,
        [only] => distance(point, *only),
        _ => chain
            .windows(2)
            .map(|pair| distance_to_segment(point, pair[0], pair[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Distance from `point` to the region enclosed by `ring`.
///
/// Zero when the point is inside; otherwise the distance to the (closed)
/// boundary.
#[must_use]
pub fn distance_to_region(point: Coordinate, ring: &[Coordinate]) -> f64 {
    if ring.len() >= 3 {
        let exterior: geo::LineString<f64> = ring
            .iter()
            .map(|c| (c.longitude(), c.latitude()))
            .collect::<Vec<_>>()
            .into();
        let polygon = geo::Polygon::new(exterior, vec![]);
        if polygon.contains(&geo::Point::new(point.longitude(), point.latitude())) {
            return 0.0;
        }
    }

    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 2 && first != last => {
            let mut closed = ring.to_vec();
            closed.push(*first);
            distance_to_segment_chain(point, &closed)
        }
        _ => distance_to_segment_chain(point, ring),
    }
}

/// Distance from `point` to the segment `a`-`b`.
///
/// The segment is flattened into an equirectangular plane centred on
/// `point` to find the fractional position of the closest point, which is
/// then measured with [`distance`].
fn distance_to_segment(point: Coordinate, a: Coordinate, b: Coordinate) -> f64 {
    let cos_lat = point.latitude().to_radians().cos();
    let project = |c: Coordinate| {
        geo::Coord {
            x: wrap_longitude(c.longitude() - point.longitude()) * cos_lat,
            y: c.latitude() - point.latitude(),
        }
    };

    let segment = geo::Line::new(project(a), project(b));
    let fraction = segment
        .line_locate_point(&geo::Point::new(0.0, 0.0))
        .filter(|t| t.is_finite())
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    let latitude = (b.latitude() - a.latitude()).mul_add(fraction, a.latitude());
    let longitude = wrap_longitude(
        wrap_longitude(b.longitude() - a.longitude()).mul_add(fraction, a.longitude()),
    );

    Coordinate::new(latitude, longitude).map_or_else(
        |_| distance(point, a).min(distance(point, b)),
        |closest| distance(point, closest),
    )
}

/// Normalizes a longitude difference into `[-180, 180]`.
fn wrap_longitude(degrees: f64) -> f64 {
    if (-180.0..=180.0).contains(&degrees) {
        degrees
    } else {
        (degrees + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// An axis-aligned latitude/longitude envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Smallest box containing every coordinate, or `None` for an empty
    /// slice.
    #[must_use]
    pub fn enclosing(coords: &[Coordinate]) -> Option<Self> {
        let (first, rest) = coords.split_first()?;
        let seed = Self {
            min_lat: first.latitude(),
            min_lon: first.longitude(),
            max_lat: first.latitude(),
            max_lon: first.longitude(),
        };
        Some(rest.iter().fold(seed, |bbox, c| Self {
            min_lat: bbox.min_lat.min(c.latitude()),
            min_lon: bbox.min_lon.min(c.longitude()),
            max_lat: bbox.max_lat.max(c.latitude()),
            max_lon: bbox.max_lon.max(c.longitude()),
        }))
    }

    /// A box guaranteed to contain every point within `radius_m` of
    /// `center`.
    ///
    /// Falls back to the full longitude span when the circle reaches a pole
    /// or crosses the antimeridian.
    #[must_use]
    pub fn around(center: Coordinate, radius_m: f64) -> Self {
        let angular = (radius_m.max(0.0) / EARTH_RADIUS_M) * (1.0 + 1e-9);
        let d_lat = angular.to_degrees();
        let min_lat = center.latitude() - d_lat;
        let max_lat = center.latitude() + d_lat;

        let full_span = Self {
            min_lat: min_lat.max(-90.0),
            min_lon: -180.0,
            max_lat: max_lat.min(90.0),
            max_lon: 180.0,
        };

        if min_lat <= -90.0 || max_lat >= 90.0 {
            return full_span;
        }

        let widest = min_lat.abs().max(max_lat.abs()).to_radians();
        let ratio = angular.sin() / widest.cos();
        if ratio >= 1.0 {
            return full_span;
        }

        let d_lon = ratio.asin().to_degrees();
        let min_lon = center.longitude() - d_lon;
        let max_lon = center.longitude() + d_lon;
        if min_lon < -180.0 || max_lon > 180.0 {
            return full_span;
        }

        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Whether the two boxes share any point (edges included).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
            && self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
    }

    #[must_use]
    pub fn contains(&self, c: Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&c.latitude())
            && (self.min_lon..=self.max_lon).contains(&c.longitude())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    const TOLERANCE_M: f64 = 1e-6;

    #[test]
    fn distance_to_self_is_zero() {
        let namakkal = coord(11.2189, 78.1674);
        assert!(distance(namakkal, namakkal).abs() < f64::EPSILON);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (coord(11.2189, 78.1674), coord(22.5645, 72.9289)),
            (coord(-33.8688, 151.2093), coord(51.5074, -0.1278)),
            (coord(0.0, 179.9), coord(0.0, -179.9)),
        ];
        for (a, b) in pairs {
            assert!((distance(a, b) - distance(b, a)).abs() < TOLERANCE_M);
        }
    }

    #[test]
    fn triangle_inequality_holds() {
        let points = [
            coord(11.2189, 78.1674),
            coord(16.7107, 81.0952),
            coord(22.5645, 72.9289),
            coord(18.5204, 73.8567),
            coord(-12.0, -77.0),
        ];
        for a in points {
            for b in points {
                for c in points {
                    assert!(distance(a, c) <= distance(a, b) + distance(b, c) + TOLERANCE_M);
                }
            }
        }
    }

    #[test]
    fn known_distance_is_close() {
        // One degree of latitude along a meridian.
        let d = distance(coord(10.0, 78.0), coord(11.0, 78.0));
        assert!((d - 111_195.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn antimeridian_distance_is_short() {
        let d = distance(coord(0.0, 179.9), coord(0.0, -179.9));
        assert!(d < 25_000.0, "got {d}");
    }

    #[test]
    fn within_radius_is_inclusive() {
        let a = coord(10.0, 78.0);
        let b = coord(10.01, 78.0);
        let d = distance(a, b);
        assert!(is_within_radius(b, a, d));
        assert!(!is_within_radius(b, a, d - 0.001));
    }

    #[test]
    fn chain_distance_uses_segment_interior() {
        // East-west segment; the point sits 0.01 deg north of its midpoint.
        let chain = [coord(10.0, 78.0), coord(10.0, 78.2)];
        let point = coord(10.01, 78.1);
        let d = distance_to_segment_chain(point, &chain);
        let perpendicular = distance(point, coord(10.0, 78.1));
        assert!((d - perpendicular).abs() < 1.0, "{d} vs {perpendicular}");
        assert!(d < distance(point, chain[0]));
    }

    #[test]
    fn chain_distance_clamps_to_endpoints() {
        let chain = [coord(10.0, 78.0), coord(10.0, 78.2)];
        let beyond = coord(10.0, 78.3);
        let d = distance_to_segment_chain(beyond, &chain);
        assert!((d - distance(beyond, chain[1])).abs() < 1e-3);
    }

    #[test]
    fn degenerate_chains() {
        let p = coord(10.0, 78.0);
        let q = coord(10.5, 78.5);
        assert!((distance_to_segment_chain(p, &[q]) - distance(p, q)).abs() < f64::EPSILON);
        assert!(distance_to_segment_chain(p, &[]).is_infinite());
        assert!((distance_to_segment_chain(p, &[q, q]) - distance(p, q)).abs() < 1e-6);
    }

    #[test]
    fn region_contains_point() {
        let ring = [
            coord(10.0, 78.0),
            coord(10.0, 78.1),
            coord(10.1, 78.1),
            coord(10.1, 78.0),
        ];
        assert!(distance_to_region(coord(10.05, 78.05), &ring).abs() < f64::EPSILON);
        // Outside, closest edge is the implicit closing edge at lon 78.0.
        let outside = coord(10.05, 77.99);
        let d = distance_to_region(outside, &ring);
        assert!((d - distance(outside, coord(10.05, 78.0))).abs() < 1.0);
    }

    #[test]
    fn bounding_box_around_contains_circle() {
        let center = coord(11.2, 78.1);
        let radius = 5_000.0;
        let bbox = BoundingBox::around(center, radius);
        for bearing in 0..36 {
            let theta = f64::from(bearing * 10).to_radians();
            // Step outward until the distance reaches the radius.
            let mut edge = center;
            for step in 1..=2_000 {
                let frac = f64::from(step) / 2_000.0;
                let candidate = coord(
                    center.latitude() + theta.cos() * 0.1 * frac,
                    center.longitude() + theta.sin() * 0.1 * frac,
                );
                if distance(center, candidate) > radius {
                    break;
                }
                edge = candidate;
            }
            assert!(bbox.contains(edge), "bearing {bearing}: {edge} outside {bbox:?}");
        }
    }

    #[test]
    fn bounding_box_near_pole_spans_all_longitudes() {
        let bbox = BoundingBox::around(coord(89.99, 10.0), 5_000.0);
        assert!((bbox.min_lon + 180.0).abs() < f64::EPSILON);
        assert!((bbox.max_lon - 180.0).abs() < f64::EPSILON);
    }

    #[test]
    fn enclosing_box() {
        assert_eq!(BoundingBox::enclosing(&[]), None);
        let bbox =
            BoundingBox::enclosing(&[coord(10.0, 78.5), coord(10.5, 78.0), coord(10.2, 78.2)])
                .unwrap();
        assert!((bbox.min_lat - 10.0).abs() < f64::EPSILON);
        assert!((bbox.max_lon - 78.5).abs() < f64::EPSILON);
    }
}
