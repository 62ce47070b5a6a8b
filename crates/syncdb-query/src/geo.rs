//! `GEOWITHIN` point-in-{box,circle,polygon} evaluation on a spherical
//! geoid (spec §4.6.3).
//!
//! Realm-core implements this against its own `Geospatial` type in the
//! query engine proper; no example repo in the pack carries a geospatial
//! library, so this is a from-scratch implementation of the three shapes
//! the spec names, using the mean Earth radius for circle containment and
//! the standard ray-casting rule (summed signed angle / even-odd
//! crossing count) for polygon containment.

use crate::ast::{Geo, GeoPoint};

/// Mean Earth radius in meters, used to convert a circle's radius (given
/// in radians per spec §4.6.3) into a great-circle distance comparison.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// `GEOWITHIN`'s point-in-shape test.
pub fn contains(geo: &Geo, point: GeoPoint) -> bool {
    match geo {
        Geo::Box(p1, p2) => contains_box(*p1, *p2, point),
        Geo::Circle { center, radius_radians } => contains_circle(*center, *radius_radians, point),
        Geo::Polygon(rings) => contains_polygon(rings, point),
    }
}

fn contains_box(p1: GeoPoint, p2: GeoPoint, point: GeoPoint) -> bool {
    let (lon_lo, lon_hi) = min_max(p1.longitude, p2.longitude);
    let (lat_lo, lat_hi) = min_max(p1.latitude, p2.latitude);
    point.longitude >= lon_lo
        && point.longitude <= lon_hi
        && point.latitude >= lat_lo
        && point.latitude <= lat_hi
}

fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Great-circle (haversine) angular distance between two points, in
/// radians.
fn angular_distance_radians(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().asin()
}

fn contains_circle(center: GeoPoint, radius_radians: f64, point: GeoPoint) -> bool {
    angular_distance_radians(center, point) <= radius_radians
}

/// Even-odd ray-casting rule against the outer (counter-clockwise) ring;
/// any subsequent ring is a clockwise hole subtracted from the outer
/// loop's membership (spec §4.6.3).
fn contains_polygon(rings: &[Vec<GeoPoint>], point: GeoPoint) -> bool {
    let Some(outer) = rings.first() else {
        return false;
    };
    if !ray_cast(outer, point) {
        return false;
    }
    for hole in rings.iter().skip(1) {
        if ray_cast(hole, point) {
            return false;
        }
    }
    true
}

fn ray_cast(ring: &[GeoPoint], point: GeoPoint) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = (ring[i].longitude, ring[i].latitude);
        let (xj, yj) = (ring[j].longitude, ring[j].latitude);
        let crosses = (yi > point.latitude) != (yj > point.latitude);
        if crosses {
            let x_intersect = xi + (point.latitude - yi) / (yj - yi) * (xj - xi);
            if point.longitude < x_intersect {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
