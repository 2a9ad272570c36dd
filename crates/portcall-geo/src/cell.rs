use s2::cellid::CellID;
use s2::latlng::LatLng;

use crate::latlon::LatLon;

/// Cell level used to aggregate stationary behavior into anchorages, roughly (0.5 km)^2 cells
pub const FINE_LEVEL: u64 = 14;

/// Cell level used for the visit-time spatial join, roughly (8 km)^2 cells
pub const COARSE_LEVEL: u64 = 10;

/// Longest diagonal of any cell at [FINE_LEVEL], in km
const FINE_CELL_MAX_DIAG_KM: f64 = 0.85;

/// Shortest edge of any cell at [COARSE_LEVEL], in km
const COARSE_CELL_MIN_EDGE_KM: f64 = 7.64;

/// Margin factor on the visit-radius lookup guarantee
const VISIT_SAFETY_FACTOR: f64 = 1.5;

/// A cell on the hierarchical spherical subdivision of the Earth
///
/// Thin wrapper around an S2 cell id. The two levels that matter are [FINE_LEVEL] (anchorage
/// aggregation) and [COARSE_LEVEL] (visit-time spatial joins); cells serialize to compact string
/// tokens that are used as map keys everywhere downstream.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId(CellID);

impl CellId {
    /// The [FINE_LEVEL] cell containing the given point
    pub fn fine(loc: LatLon) -> CellId {
        CellId(CellID::from(LatLng::from_degrees(loc.lat, loc.lon)).parent(FINE_LEVEL))
    }

    /// The [COARSE_LEVEL] cell containing the given point
    pub fn coarse(loc: LatLon) -> CellId {
        CellId(CellID::from(LatLng::from_degrees(loc.lat, loc.lon)).parent(COARSE_LEVEL))
    }

    /// The [COARSE_LEVEL] ancestor of this cell
    pub fn parent_coarse(&self) -> CellId {
        CellId(self.0.parent(COARSE_LEVEL))
    }

    /// The up-to-8 edge- and corner-adjacent cells at this cell's own level
    ///
    /// Interior cells have exactly 8 neighbors; cells touching a cube-face corner have fewer.
    pub fn neighbors(&self) -> Vec<CellId> {
        self.0
            .all_neighbors(self.0.level())
            .into_iter()
            .map(CellId)
            .collect()
    }

    pub fn level(&self) -> u64 {
        self.0.level()
    }

    /// Compact string form, suitable as a map key. Round-trips through [CellId::from_token].
    pub fn token(&self) -> String {
        self.0.to_token()
    }

    pub fn from_token(token: &str) -> eyre::Result<CellId> {
        let id = CellID::from_token(token);
        if !id.is_valid() {
            eyre::bail!("Invalid cell token: {token:?}");
        }
        Ok(CellId(id))
    }
}

impl std::fmt::Debug for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "CellId({})", self.token())
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.token())
    }
}

/// The coarse-level cell tokens a fine cell must be registered under so that a point lookup in
/// its own coarse cell alone finds every anchorage within the visit radius
///
/// This is the anchorage's own coarse ancestor plus all of that cell's neighbors.
pub fn visit_join_cells(fine_token: &str) -> eyre::Result<Vec<String>> {
    let coarse = CellId::from_token(fine_token)?.parent_coarse();
    let mut tokens = vec![coarse.token()];
    for neighbor in coarse.neighbors() {
        tokens.push(neighbor.token());
    }
    Ok(tokens)
}

/// Verify that a 3x3 block of coarse cells always covers the visit radius
///
/// The visit-time join inspects only the vessel's own coarse cell, and anchorages are registered
/// under their coarse cell and its neighbors. That lookup is exhaustive only while the visit
/// radius (plus the fine-cell quantization of the anchorage position) fits inside one coarse cell
/// edge with margin. Must be called before any data is read; a failure is a configuration error.
pub fn check_visit_lookup_radius(max_visit_dist_km: f64) -> eyre::Result<()> {
    let required = (max_visit_dist_km + FINE_CELL_MAX_DIAG_KM) * VISIT_SAFETY_FACTOR;
    if required > COARSE_CELL_MIN_EDGE_KM {
        eyre::bail!(
            "Visit distance {max_visit_dist_km} km needs {required:.2} km of coarse cell edge, \
             but level {COARSE_LEVEL} cells only guarantee {COARSE_CELL_MIN_EDGE_KM} km"
        );
    }
    Ok(())
}
