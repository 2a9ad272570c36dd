use std::collections::{BTreeMap, BTreeSet, HashSet};

use portcall_geo::{CellId, LatLon};
use portcall_records::VesselId;
use portcall_track::{ProcessedTrack, StationaryPeriod, TaggedRecord};
use portcall_utils::counter::Counter;
use serde::{Deserialize, Serialize};

use crate::destination::normalize_destination;
use crate::gazetteer::Gazetteer;

/// How many of the most frequent destinations each anchorage reports
pub const TOP_DESTINATION_LIMIT: usize = 10;

/// The per-fine-cell aggregate of stationary vessel behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchoragePoint {
    pub lat: f64,
    pub lon: f64,
    /// Number of stationary periods observed in this cell
    pub total_visits: usize,
    pub unique_vessels: usize,
    pub unique_fishing_vessels: usize,
    pub mean_distance_from_shore_km: f64,
    pub rms_drift_radius_km: f64,
    /// Most frequent normalized destinations with their counts
    pub top_destinations: Vec<(String, u64)>,
    /// Fine cell token; the anchorage's identifier everywhere downstream
    pub s2id: String,
    pub neighbor_s2ids: Vec<String>,
    pub active_vessel_count: usize,
    pub total_vessel_count: usize,
    pub stationary_vessel_days: f64,
    pub stationary_fishing_vessel_days: f64,
    /// Distinct (vessel, UTC date) pairs with active positions in this cell
    pub active_vessel_days: usize,
    pub nearest_named_port: String,
    pub nearest_named_port_km: f64,
}

impl AnchoragePoint {
    pub fn mean_location(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

#[derive(Default)]
struct CellBucket<'a> {
    stationary: Vec<(VesselId, &'a StationaryPeriod)>,
    active: Vec<(VesselId, &'a TaggedRecord)>,
}

/// Aggregate processed tracks into anchorage points, one per qualifying fine cell
///
/// Stationary periods carry the anchorage statistics; the remaining (active) positions only
/// contribute traffic counts. Cells with no stationary period, or with fewer than
/// `min_unique_vessels` distinct stationary vessels, produce nothing.
pub fn aggregate_anchorages(
    tracks: &[(VesselId, ProcessedTrack)],
    fishing_vessels: &HashSet<VesselId>,
    gazetteer: &Gazetteer,
    min_unique_vessels: usize,
) -> eyre::Result<Vec<AnchoragePoint>> {
    // BTreeMap so the output is ordered by cell token
    let mut cells: BTreeMap<&str, CellBucket> = BTreeMap::new();
    for (vessel_id, track) in tracks {
        for period in &track.stationary_periods {
            cells
                .entry(&period.cell)
                .or_default()
                .stationary
                .push((*vessel_id, period));
        }
        for location in &track.locations {
            cells
                .entry(&location.cell)
                .or_default()
                .active
                .push((*vessel_id, location));
        }
    }

    let mut points = Vec::new();
    for (token, bucket) in cells {
        if bucket.stationary.is_empty() {
            continue;
        }

        let vessels: BTreeSet<VesselId> = bucket.stationary.iter().map(|(id, _)| *id).collect();
        if vessels.len() < min_unique_vessels {
            continue;
        }

        let n = bucket.stationary.len() as f64;
        let mean_location = LatLon::new(
            bucket.stationary.iter().map(|(_, sp)| sp.mean_location.lat).sum::<f64>() / n,
            bucket.stationary.iter().map(|(_, sp)| sp.mean_location.lon).sum::<f64>() / n,
        );

        let mut stationary_days = 0.0;
        let mut stationary_fishing_days = 0.0;
        let mut destinations = Counter::new();
        for (vessel_id, period) in &bucket.stationary {
            let days = period.duration.num_seconds() as f64 / 86_400.0;
            stationary_days += days;
            if fishing_vessels.contains(vessel_id) {
                stationary_fishing_days += days;
            }
            if let Some(destination) = normalize_destination(&period.destination) {
                destinations.add(destination);
            }
        }

        let fishing: BTreeSet<VesselId> = vessels
            .iter()
            .copied()
            .filter(|id| fishing_vessels.contains(id))
            .collect();
        let active: BTreeSet<VesselId> = bucket.active.iter().map(|(id, _)| *id).collect();
        let active_days: BTreeSet<(VesselId, chrono::NaiveDate)> = bucket
            .active
            .iter()
            .map(|(id, loc)| (*id, loc.timestamp.date_naive()))
            .collect();
        let total_vessel_count = vessels.union(&active).count();

        let (port, port_km) = gazetteer.nearest(mean_location);

        points.push(AnchoragePoint {
            lat: mean_location.lat,
            lon: mean_location.lon,
            total_visits: bucket.stationary.len(),
            unique_vessels: vessels.len(),
            unique_fishing_vessels: fishing.len(),
            mean_distance_from_shore_km: bucket
                .stationary
                .iter()
                .map(|(_, sp)| sp.mean_distance_from_shore_km)
                .sum::<f64>()
                / n,
            rms_drift_radius_km: (bucket
                .stationary
                .iter()
                .map(|(_, sp)| sp.rms_drift_radius_km.powi(2))
                .sum::<f64>()
                / n)
                .sqrt(),
            top_destinations: destinations
                .most_common(TOP_DESTINATION_LIMIT)
                .into_iter()
                .map(|(name, count)| (name.clone(), count))
                .collect(),
            s2id: token.to_string(),
            neighbor_s2ids: CellId::from_token(token)?
                .neighbors()
                .into_iter()
                .map(|cell| cell.token())
                .collect(),
            active_vessel_count: active.len(),
            total_vessel_count,
            stationary_vessel_days: stationary_days,
            stationary_fishing_vessel_days: stationary_fishing_days,
            active_vessel_days: active_days.len(),
            nearest_named_port: port.name.clone(),
            nearest_named_port_km: port_km,
        });
    }

    Ok(points)
}
