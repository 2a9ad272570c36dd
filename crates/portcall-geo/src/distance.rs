use crate::latlon::LatLon;

/// Mean Earth radius in kilometers (IUGG R1)
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance between two points in kilometers
///
/// Haversine formula on a sphere of radius [EARTH_RADIUS_KM]. Symmetric, non-negative, and zero
/// iff both points are bit-identical.
#[must_use]
pub fn distance(a: LatLon, b: LatLon) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
