use chrono::{DateTime, NaiveDate, Utc};
use portcall_records::VesselId;
use serde::{Deserialize, Serialize};

/// Where the state machine is for one vessel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    #[serde(rename = "AT_SEA")]
    AtSea,
    #[serde(rename = "IN_PORT")]
    InPort,
    #[serde(rename = "STOPPED")]
    Stopped,
    #[serde(rename = "GAP")]
    Gap,
}

impl MachineState {
    /// Is the vessel inside a port in this state?
    pub fn in_port(&self) -> bool {
        !matches!(self, MachineState::AtSea)
    }
}

/// The per-vessel carry-over row persisted at batch end
///
/// The next day's batch reads these to resume mid-visit vessels instead of re-deriving their
/// history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitState {
    pub vessel_id: VesselId,
    pub date: NaiveDate,
    pub state: MachineState,
    pub last_timestamp: DateTime<Utc>,
    /// Fine cell token of the anchorage the vessel is currently visiting
    pub active_anchorage: Option<String>,
}
