//! Pure-Rust WGS84 (EPSG:4326) <-> spherical Web Mercator (EPSG:3857).
//!
//! Web Mercator treats the earth as a sphere with the WGS84 semi-major
//! axis as radius. Distances in the projected plane are metres at the
//! equator and stretch by `1 / cos(lat)` away from it.

use std::f64::consts::FRAC_PI_4;

use geo::{Coord, MapCoords as _, MultiPolygon};

/// Sphere radius used by EPSG:3857 (WGS84 semi-major axis, metres).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Projects a WGS84 (longitude, latitude) pair in degrees to Web Mercator
/// (x, y) in metres. Latitude is clamped to [`MAX_LATITUDE`].
#[must_use]
pub fn to_web_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M * (FRAC_PI_4 + lat / 2.0).tan().ln();
    (x, y)
}

/// Inverse of [`to_web_mercator`].
#[must_use]
pub fn from_web_mercator(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - 2.0 * FRAC_PI_4).to_degrees();
    (lon, lat)
}

/// Projects every coordinate of a geographic multipolygon to Web Mercator.
#[must_use]
pub fn project(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    geometry.map_coords(|c| {
        let (x, y) = to_web_mercator(c.x, c.y);
        Coord { x, y }
    })
}

/// Projects every coordinate of a Web Mercator multipolygon back to
/// geographic degrees.
#[must_use]
pub fn unproject(geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    geometry.map_coords(|c| {
        let (lon, lat) = from_web_mercator(c.x, c.y);
        Coord { x: lon, y: lat }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64, msg: &str) {
        let diff = (a - b).abs();
        assert!(
            diff < tol,
            "{msg}: expected {b}, got {a}, diff {diff} exceeds tolerance {tol}"
        );
    }

    #[test]
    fn origin_maps_to_origin() {
        let (x, y) = to_web_mercator(0.0, 0.0);
        assert_close(x, 0.0, 1e-9, "x");
        assert_close(y, 0.0, 1e-9, "y");
    }

    #[test]
    fn antimeridian_is_half_circumference() {
        let (x, _) = to_web_mercator(180.0, 0.0);
        assert_close(x, 20_037_508.342_789_244, 1e-6, "x");
    }

    #[test]
    fn tokyo_station_matches_reference() {
        let (x, y) = to_web_mercator(139.767_125, 35.681_236);
        assert_close(x, 15_558_805.18, 0.01, "x");
        assert_close(y, 4_256_848.12, 0.01, "y");
    }

    #[test]
    fn round_trip_is_lossless() {
        for &(lon, lat) in &[(139.7, 35.6), (-73.98, 40.75), (0.0, -60.0)] {
            let (x, y) = to_web_mercator(lon, lat);
            let (lon2, lat2) = from_web_mercator(x, y);
            assert_close(lon2, lon, 1e-9, "lon");
            assert_close(lat2, lat, 1e-9, "lat");
        }
    }

    #[test]
    fn clamps_polar_latitudes() {
        let (_, y_pole) = to_web_mercator(0.0, 90.0);
        let (_, y_max) = to_web_mercator(0.0, MAX_LATITUDE);
        assert_close(y_pole, y_max, 1e-6, "y");
        assert!(y_pole.is_finite());
    }
}
