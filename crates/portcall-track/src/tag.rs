use chrono::{DateTime, Utc};
use portcall_geo::{CellId, LatLon};
use portcall_records::VesselRecord;

/// A position record annotated with the latest declared destination and its fine cell
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedRecord {
    pub timestamp: DateTime<Utc>,
    pub location: LatLon,
    pub distance_from_shore_km: f64,
    pub speed_knots: f64,
    pub course: Option<f64>,
    /// The most recent declared destination, empty until the vessel declares one
    pub destination: String,
    /// Fine-level cell token of `location`
    pub cell: String,
    /// True when this record's fine cell differs from the previous position's (and for the
    /// first position)
    pub is_new_cell: bool,
}

/// Fold info records into a running destination and annotate each position with it
///
/// Info records are consumed (they tag subsequent positions), invalid records are skipped, and
/// only position records survive into the output.
pub fn tag(records: &[VesselRecord]) -> Vec<TaggedRecord> {
    let mut destination = String::new();
    let mut last_cell: Option<String> = None;
    let mut tagged = Vec::new();

    for record in records {
        match record {
            VesselRecord::Info(info) => {
                destination = info.destination.clone();
            }
            VesselRecord::Invalid(_) => {}
            VesselRecord::Location(location) => {
                let cell = CellId::fine(location.location).token();
                let is_new_cell = last_cell.as_deref() != Some(&cell);
                last_cell = Some(cell.clone());
                tagged.push(TaggedRecord {
                    timestamp: location.timestamp,
                    location: location.location,
                    distance_from_shore_km: location.distance_from_shore_km,
                    speed_knots: location.speed_knots,
                    course: location.course,
                    destination: destination.clone(),
                    cell,
                    is_new_cell,
                });
            }
        }
    }

    tagged
}
