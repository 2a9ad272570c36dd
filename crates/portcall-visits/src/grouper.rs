use chrono::{DateTime, Utc};
use portcall_records::VesselId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::event::{EventType, PortEvent};

/// A closed interval of a vessel's presence at port, delimited by a matched entry/exit pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortVisit {
    pub visit_id: String,
    pub vessel_id: VesselId,
    pub start_timestamp: DateTime<Utc>,
    pub start_lat: f64,
    pub start_lon: f64,
    pub start_anchorage_id: String,
    pub end_timestamp: DateTime<Utc>,
    pub end_lat: f64,
    pub end_lon: f64,
    pub end_anchorage_id: String,
    /// The stop and gap events that occurred strictly between entry and exit, in order
    pub events: Vec<PortEvent>,
}

/// Deterministic visit identifier
///
/// Hash of the visit's opening edge, so re-running a batch regenerates identical ids and late
/// rewrites of a shard replace rather than duplicate.
pub fn visit_id(vessel_id: VesselId, start: DateTime<Utc>, start_anchorage_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(vessel_id.to_string());
    hasher.update("|");
    hasher.update(start.to_rfc3339());
    hasher.update("|");
    hasher.update(start_anchorage_id);
    hex::encode(hasher.finalize())
}

/// Collapse one vessel's ordered event stream into closed visits
///
/// The first `PORT_ENTRY` opens a visit, a `PORT_EXIT` closes and emits it, and everything in
/// between rides along. A trailing open visit is not emitted; the carry-over state lets the next
/// batch close it. Orphaned events (an exit with no open visit, or stop/gap events before any
/// entry) come from histories that started before the read window; they are dropped with a
/// warning.
pub fn group_visits(vessel_id: VesselId, mut events: Vec<PortEvent>) -> Vec<PortVisit> {
    events.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let mut visits = Vec::new();
    let mut open: Option<(PortEvent, Vec<PortEvent>)> = None;

    for event in events {
        match event.event_type {
            EventType::PortEntry => {
                if let Some((entry, _)) = open.replace((event, Vec::new())) {
                    tracing::warn!(
                        "Vessel {vessel_id} entered port twice without exiting; dropping the \
                         visit opened at {}",
                        entry.timestamp
                    );
                }
            }
            EventType::PortExit => match open.take() {
                Some((entry, middle)) => {
                    visits.push(PortVisit {
                        visit_id: visit_id(vessel_id, entry.timestamp, &entry.anchorage_id),
                        vessel_id,
                        start_timestamp: entry.timestamp,
                        start_lat: entry.lat,
                        start_lon: entry.lon,
                        start_anchorage_id: entry.anchorage_id,
                        end_timestamp: event.timestamp,
                        end_lat: event.lat,
                        end_lon: event.lon,
                        end_anchorage_id: event.anchorage_id,
                        events: middle,
                    });
                }
                None => {
                    tracing::warn!(
                        "Vessel {vessel_id} exited port at {} with no matching entry in the read \
                         window",
                        event.timestamp
                    );
                }
            },
            _ => match open.as_mut() {
                Some((_, middle)) => middle.push(event),
                None => {
                    tracing::warn!(
                        "Vessel {vessel_id} has an orphan {} at {}",
                        event.event_type,
                        event.timestamp
                    );
                }
            },
        }
    }

    if let Some((entry, _)) = open {
        tracing::debug!(
            "Vessel {vessel_id} has an open visit since {}; leaving it for the next batch",
            entry.timestamp
        );
    }

    visits
}
