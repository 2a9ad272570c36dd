use chrono::{DateTime, Duration, Utc};
use portcall_geo::{CellId, LatLon, distance};

use crate::tag::TaggedRecord;

/// A maximal run of one vessel's positions confined to a small radius for a long time
#[derive(Debug, Clone, PartialEq)]
pub struct StationaryPeriod {
    /// Arithmetic mean of the run's positions
    pub mean_location: LatLon,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    pub mean_distance_from_shore_km: f64,
    /// `sqrt(mean(distance(p, mean)^2))` over the run's positions
    pub rms_drift_radius_km: f64,
    /// Declared destination at the start of the run
    pub destination: String,
    /// Fine cell token of `mean_location`
    pub cell: String,
}

/// A trajectory with its stationary periods split out
///
/// `locations` is the thinned track with each emitted period's interior collapsed to its first
/// and last records; period statistics are lossless with respect to the collapsed points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessedTrack {
    pub locations: Vec<TaggedRecord>,
    pub stationary_periods: Vec<StationaryPeriod>,
}

/// Split long stationary runs out of one vessel's track
///
/// Walks the track with a running anchor (the first record of the current candidate run). While
/// records stay within `max_distance_km` of the anchor they accumulate; the record that breaks
/// the radius closes the candidate. Candidates spanning at least `min_duration` become a
/// [StationaryPeriod] and contribute only their first and last records to the output track;
/// shorter candidates stay inline. The trailing candidate is flushed inline without closing: a
/// run is only known to be over once the vessel leaves.
pub fn extract_stationary_periods(
    records: Vec<TaggedRecord>,
    min_duration: Duration,
    max_distance_km: f64,
) -> ProcessedTrack {
    let mut track = ProcessedTrack::default();
    let mut candidate: Vec<TaggedRecord> = Vec::new();

    for record in records {
        if let Some(anchor) = candidate.first() {
            if distance(record.location, anchor.location) > max_distance_km {
                close_candidate(&mut candidate, min_duration, &mut track);
            }
        }
        candidate.push(record);
    }
    track.locations.append(&mut candidate);

    track
}

fn close_candidate(
    candidate: &mut Vec<TaggedRecord>,
    min_duration: Duration,
    track: &mut ProcessedTrack,
) {
    let (Some(first), Some(last)) = (candidate.first(), candidate.last()) else {
        return;
    };

    if last.timestamp - first.timestamp < min_duration {
        track.locations.append(candidate);
        return;
    }

    let n = candidate.len() as f64;
    let mean_location = LatLon::new(
        candidate.iter().map(|r| r.location.lat).sum::<f64>() / n,
        candidate.iter().map(|r| r.location.lon).sum::<f64>() / n,
    );
    let mean_distance_from_shore_km =
        candidate.iter().map(|r| r.distance_from_shore_km).sum::<f64>() / n;
    let rms_drift_radius_km = (candidate
        .iter()
        .map(|r| distance(r.location, mean_location).powi(2))
        .sum::<f64>()
        / n)
        .sqrt();

    track.stationary_periods.push(StationaryPeriod {
        mean_location,
        start_time: first.timestamp,
        duration: last.timestamp - first.timestamp,
        mean_distance_from_shore_km,
        rms_drift_radius_km,
        destination: first.destination.clone(),
        cell: CellId::fine(mean_location).token(),
    });

    track.locations.push(first.clone());
    if candidate.len() > 1 {
        track.locations.push(last.clone());
    }
    candidate.clear();
}
