mod message;
mod parse;
mod record;

pub use message::RawMessage;
pub use parse::{ParseStats, parse_messages};
pub use record::{
    InvalidRecord, VesselId, VesselInfoRecord, VesselLocationRecord, VesselRecord,
    parse_timestamp,
};
