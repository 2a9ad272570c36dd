use serde::{Deserialize, Serialize};

/// A point on the Earth in decimal degrees
///
/// Latitude is in `[-90, 90]`, longitude in `[-180, 180]`. Construction does not validate the
/// ranges; the message parser rejects out-of-range coordinates before a [LatLon] is ever built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for LatLon {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}
