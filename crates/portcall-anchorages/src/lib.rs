mod aggregate;
mod destination;
mod gazetteer;

pub use aggregate::{AnchoragePoint, TOP_DESTINATION_LIMIT, aggregate_anchorages};
pub use destination::normalize_destination;
pub use gazetteer::{Gazetteer, NamedPort};
