use serde::Deserialize;

use crate::record::VesselId;

/// A vessel identifier as it appears on the wire: either a JSON number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Ident {
    Number(i64),
    Text(String),
}

/// The serde view of one raw AIS message
///
/// Real message streams carry dozens of receiver- and model-specific fields; everything not
/// listed here is ignored. Fields may be absent or null, which classification treats the same.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    #[serde(alias = "vessel_id", alias = "mmsi")]
    pub ident: Option<Ident>,
    pub timestamp: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Speed over ground in knots
    pub speed: Option<f64>,
    /// Distance from shore in meters
    pub distance_from_shore: Option<f64>,
    /// Course over ground in degrees
    pub course: Option<f64>,
    /// Free-text declared destination
    pub destination: Option<String>,
}

impl RawMessage {
    /// The numeric vessel id, or `None` for a missing or non-numeric identifier
    pub fn vessel_id(&self) -> Option<VesselId> {
        match self.ident.as_ref()? {
            Ident::Number(id) => Some(*id),
            Ident::Text(text) => text.trim().parse().ok(),
        }
    }
}
