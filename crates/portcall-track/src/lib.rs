mod process;
mod stationary;
mod tag;

pub use process::{process_for_anchorages, process_for_events, sort_and_dedup, thin};
pub use stationary::{ProcessedTrack, StationaryPeriod, extract_stationary_periods};
pub use tag::{TaggedRecord, tag};
