mod cell;
mod distance;
mod latlon;
mod mask;

pub use cell::{
    CellId, COARSE_LEVEL, FINE_LEVEL, check_visit_lookup_radius, visit_join_cells,
};
pub use distance::{EARTH_RADIUS_KM, distance};
pub use latlon::LatLon;
pub use mask::InlandMask;
