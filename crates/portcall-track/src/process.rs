use chrono::Duration;
use portcall_records::VesselRecord;
use portcall_utils::config::Config;

use crate::stationary::{ProcessedTrack, extract_stationary_periods};
use crate::tag::{TaggedRecord, tag};

/// Thinning interval: a kept record suppresses everything closer than this behind it
const THIN_INTERVAL_MINUTES: i64 = 5;

/// Order one vessel's records by timestamp and drop duplicate timestamps, first occurrence wins
pub fn sort_and_dedup(records: &mut Vec<VesselRecord>) {
    // Stable, so the first-received record survives a timestamp collision
    records.sort_by_key(|r| r.timestamp());
    records.dedup_by_key(|r| r.timestamp());
}

/// Keep a record iff its timestamp is at least five minutes after the last kept record
///
/// The first record is always kept. Requires sorted input.
pub fn thin(records: Vec<VesselRecord>) -> Vec<VesselRecord> {
    let interval = Duration::minutes(THIN_INTERVAL_MINUTES);
    let mut thinned: Vec<VesselRecord> = Vec::new();
    for record in records {
        match thinned.last() {
            Some(last) if record.timestamp() - last.timestamp() < interval => {}
            _ => thinned.push(record),
        }
    }
    thinned
}

/// The full per-vessel pipeline for anchorage aggregation
///
/// Sort, dedup, length-filter, thin, tag, and split out stationary periods. Returns `None` for
/// vessels with too few positions to be worth processing.
pub fn process_for_anchorages(
    mut records: Vec<VesselRecord>,
    config: &Config,
) -> Option<ProcessedTrack> {
    sort_and_dedup(&mut records);
    if records.len() < config.min_required_positions {
        tracing::trace!("Dropping vessel with only {} records", records.len());
        return None;
    }
    let tagged = tag(&thin(records));
    Some(extract_stationary_periods(
        tagged,
        config.stationary_period_min_duration(),
        config.stationary_period_max_distance_km,
    ))
}

/// The per-vessel pipeline for the port-visit state machine
///
/// Sort, dedup, length-filter, and tag, but no thinning and no stationary reduction: stop
/// detection needs every sample's speed.
pub fn process_for_events(
    mut records: Vec<VesselRecord>,
    config: &Config,
) -> Option<Vec<TaggedRecord>> {
    sort_and_dedup(&mut records);
    if records.len() < config.min_required_positions {
        tracing::trace!("Dropping vessel with only {} records", records.len());
        return None;
    }
    Some(tag(&records))
}

#[cfg(test)]
mod tests {
    use portcall_geo::LatLon;
    use portcall_records::{VesselLocationRecord, parse_timestamp};
    use pretty_assertions::assert_eq;

    use super::*;

    fn location(timestamp: &str, speed: f64) -> VesselRecord {
        VesselRecord::Location(VesselLocationRecord {
            timestamp: parse_timestamp(timestamp).unwrap(),
            location: LatLon::new(55.0, 9.0),
            distance_from_shore_km: 0.0,
            speed_knots: speed,
            course: None,
        })
    }

    #[test]
    fn test_sort_and_dedup() {
        let mut records = vec![
            location("2016-01-01T00:10:00Z", 1.0),
            location("2016-01-01T00:00:00Z", 2.0),
            location("2016-01-01T00:10:00Z", 3.0),
            location("2016-01-01T00:05:00Z", 4.0),
        ];
        sort_and_dedup(&mut records);

        let timestamps: Vec<_> = records.iter().map(|r| r.timestamp()).collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(timestamps, sorted);

        // The earlier-listed record wins the timestamp collision
        let VesselRecord::Location(last) = &records[2] else {
            panic!("expected a location record");
        };
        assert_eq!(last.speed_knots, 1.0);
    }

    #[test]
    fn test_thin() {
        let records = vec![
            location("2016-01-01T00:00:00Z", 0.0),
            location("2016-01-01T00:02:00Z", 0.0),
            location("2016-01-01T00:04:59Z", 0.0),
            location("2016-01-01T00:05:00Z", 0.0),
            location("2016-01-01T00:09:00Z", 0.0),
            location("2016-01-01T00:10:00Z", 0.0),
        ];
        let thinned = thin(records);
        let timestamps: Vec<_> = thinned
            .iter()
            .map(|r| r.timestamp().to_rfc3339())
            .collect();
        assert_eq!(
            timestamps,
            vec!["2016-01-01T00:00:00+00:00", "2016-01-01T00:05:00+00:00", "2016-01-01T00:10:00+00:00"]
        );

        // Consecutive kept records are at least five minutes apart
        for pair in thinned.windows(2) {
            assert!(pair[1].timestamp() - pair[0].timestamp() >= Duration::minutes(5));
        }
    }

    #[test]
    fn test_short_series_dropped() {
        let config = Config::default();
        let records: Vec<VesselRecord> = (0..10)
            .map(|i| location(&format!("2016-01-01T00:{i:02}:00Z"), 0.0))
            .collect();
        assert!(process_for_anchorages(records.clone(), &config).is_none());
        assert!(process_for_events(records, &config).is_none());
    }
}
