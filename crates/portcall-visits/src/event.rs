use chrono::{DateTime, Utc};
use portcall_records::VesselId;
use serde::{Deserialize, Serialize};

/// A transition in a vessel's relationship to an anchorage
///
/// The declaration order is the tie-break order for events sharing a timestamp; `derive(Ord)`
/// relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "PORT_ENTRY")]
    PortEntry,
    #[serde(rename = "PORT_STOP_BEGIN")]
    PortStopBegin,
    #[serde(rename = "PORT_GAP_BEGIN")]
    PortGapBegin,
    #[serde(rename = "PORT_GAP_END")]
    PortGapEnd,
    #[serde(rename = "PORT_STOP_END")]
    PortStopEnd,
    #[serde(rename = "PORT_EXIT")]
    PortExit,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            EventType::PortEntry => "PORT_ENTRY",
            EventType::PortStopBegin => "PORT_STOP_BEGIN",
            EventType::PortGapBegin => "PORT_GAP_BEGIN",
            EventType::PortGapEnd => "PORT_GAP_END",
            EventType::PortStopEnd => "PORT_STOP_END",
            EventType::PortExit => "PORT_EXIT",
        };
        f.write_str(name)
    }
}

/// One port event row
///
/// Coordinates are the active anchorage's, not the vessel's; `last_timestamp` is the previous
/// position's timestamp, when there was one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortEvent {
    pub vessel_id: VesselId,
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    /// Fine cell token of the anchorage this event is tied to
    pub anchorage_id: String,
    pub port_label: String,
    pub event_type: EventType,
    pub last_timestamp: Option<DateTime<Utc>>,
}

impl PortEvent {
    /// Sort key giving the canonical event order: timestamp, then the [EventType] tie-break
    pub fn sort_key(&self) -> (DateTime<Utc>, EventType) {
        (self.timestamp, self.event_type)
    }
}
