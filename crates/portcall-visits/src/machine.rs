use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use portcall_records::VesselId;
use portcall_track::TaggedRecord;
use portcall_utils::config::Config;

use crate::anchorage::{AnchorageIndex, NamedAnchorage};
use crate::event::{EventType, PortEvent};
use crate::state::{MachineState, VisitState};

/// The state machine's thresholds
///
/// Entry/exit distances and stop-begin/stop-end speeds are distinct pairs; a vessel drifting on
/// one boundary must not toggle events sample by sample.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub entry_dist_km: f64,
    pub exit_dist_km: f64,
    pub stopped_begin_speed_knots: f64,
    pub stopped_end_speed_knots: f64,
    pub min_gap: Duration,
}

impl MachineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            entry_dist_km: config.anchorage_entry_distance_km,
            exit_dist_km: config.anchorage_exit_distance_km,
            stopped_begin_speed_knots: config.stopped_begin_speed_knots,
            stopped_end_speed_knots: config.stopped_end_speed_knots,
            min_gap: config.minimum_port_gap_duration(),
        }
    }

    /// The largest distance at which the machine still needs to see an anchorage
    pub fn max_visit_dist_km(&self) -> f64 {
        self.entry_dist_km.max(self.exit_dist_km)
    }
}

/// The per-vessel port-visit automaton
///
/// Holds only read-only collaborators; all mutable state lives in [process_vessel]'s locals, so
/// one machine serves every vessel in a batch.
///
/// [process_vessel]: VisitStateMachine::process_vessel
#[derive(Debug)]
pub struct VisitStateMachine<'a> {
    index: &'a AnchorageIndex,
    config: MachineConfig,
}

impl<'a> VisitStateMachine<'a> {
    pub fn new(index: &'a AnchorageIndex, config: MachineConfig) -> Self {
        Self { index, config }
    }

    /// Drive the automaton over one vessel's ordered position stream
    ///
    /// Returns the emitted events (sorted by timestamp with the canonical tie-break) and one
    /// end-of-day state snapshot per UTC date that had records. The caller window-filters the
    /// events and rolls the snapshots forward into the state table.
    pub fn process_vessel(
        &self,
        vessel_id: VesselId,
        records: &[TaggedRecord],
        carry: Option<&VisitState>,
    ) -> (Vec<PortEvent>, BTreeMap<NaiveDate, VisitState>) {
        let mut events = Vec::new();
        let mut snapshots = BTreeMap::new();

        let (mut state, mut active, mut last_timestamp) = self.restore(vessel_id, carry);

        for record in records {
            let candidate = self.index.nearest(record.location);

            // A long silence while inside a port becomes a gap, closed by the record that ends it
            if state.in_port() {
                if let (Some(last), Some(anchorage)) = (last_timestamp, active) {
                    if record.timestamp - last >= self.config.min_gap {
                        events.push(event(
                            vessel_id,
                            anchorage,
                            EventType::PortGapBegin,
                            last,
                            last_timestamp,
                        ));
                        events.push(event(
                            vessel_id,
                            anchorage,
                            EventType::PortGapEnd,
                            record.timestamp,
                            last_timestamp,
                        ));
                    }
                }
            }

            match state {
                MachineState::AtSea => {
                    if let Some((anchorage, dist)) = candidate {
                        if dist <= self.config.entry_dist_km {
                            events.push(event(
                                vessel_id,
                                anchorage,
                                EventType::PortEntry,
                                record.timestamp,
                                last_timestamp,
                            ));
                            active = Some(anchorage);
                            state = MachineState::InPort;
                        }
                    }
                }
                MachineState::InPort | MachineState::Stopped | MachineState::Gap => {
                    let outside = match candidate {
                        None => true,
                        Some((_, dist)) => dist >= self.config.exit_dist_km,
                    };
                    if outside {
                        if let Some(anchorage) = active {
                            if state == MachineState::Stopped {
                                events.push(event(
                                    vessel_id,
                                    anchorage,
                                    EventType::PortStopEnd,
                                    last_timestamp.unwrap_or(record.timestamp),
                                    last_timestamp,
                                ));
                            }
                            events.push(event(
                                vessel_id,
                                anchorage,
                                EventType::PortExit,
                                record.timestamp,
                                last_timestamp,
                            ));
                        }
                        active = None;
                        state = MachineState::AtSea;
                    } else if state == MachineState::Stopped {
                        if record.speed_knots >= self.config.stopped_end_speed_knots {
                            if let Some(anchorage) = active {
                                events.push(event(
                                    vessel_id,
                                    anchorage,
                                    EventType::PortStopEnd,
                                    record.timestamp,
                                    last_timestamp,
                                ));
                            }
                            state = MachineState::InPort;
                        }
                    } else if record.speed_knots <= self.config.stopped_begin_speed_knots {
                        if let Some(anchorage) = active {
                            events.push(event(
                                vessel_id,
                                anchorage,
                                EventType::PortStopBegin,
                                record.timestamp,
                                last_timestamp,
                            ));
                        }
                        state = MachineState::Stopped;
                    } else {
                        // A gap is over as soon as a record arrives
                        state = MachineState::InPort;
                    }
                }
            }

            last_timestamp = Some(record.timestamp);
            snapshots.insert(
                record.timestamp.date_naive(),
                VisitState {
                    vessel_id,
                    date: record.timestamp.date_naive(),
                    state,
                    last_timestamp: record.timestamp,
                    active_anchorage: active.map(|a| a.s2id.clone()),
                },
            );
        }

        events.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        (events, snapshots)
    }

    /// Reconstruct the machine's position from a carry-over row
    fn restore(
        &self,
        vessel_id: VesselId,
        carry: Option<&VisitState>,
    ) -> (MachineState, Option<&'a NamedAnchorage>, Option<DateTime<Utc>>) {
        let Some(carry) = carry else {
            return (MachineState::AtSea, None, None);
        };

        let active = carry
            .active_anchorage
            .as_deref()
            .and_then(|s2id| self.index.get(s2id));
        if carry.state.in_port() && active.is_none() {
            tracing::warn!(
                "Vessel {vessel_id} carried state {:?} at unknown anchorage {:?}; resetting to at-sea",
                carry.state,
                carry.active_anchorage
            );
            return (MachineState::AtSea, None, Some(carry.last_timestamp));
        }

        (carry.state, active, Some(carry.last_timestamp))
    }
}

fn event(
    vessel_id: VesselId,
    anchorage: &NamedAnchorage,
    event_type: EventType,
    timestamp: DateTime<Utc>,
    last_timestamp: Option<DateTime<Utc>>,
) -> PortEvent {
    PortEvent {
        vessel_id,
        timestamp,
        lat: anchorage.lat,
        lon: anchorage.lon,
        anchorage_id: anchorage.s2id.clone(),
        port_label: anchorage.label.clone(),
        event_type,
        last_timestamp,
    }
}

#[cfg(test)]
mod tests {
    use portcall_geo::{CellId, LatLon};
    use portcall_records::parse_timestamp;
    use pretty_assertions::assert_eq;

    use super::*;

    /// One degree of latitude in km, for offsetting test positions by distance
    const KM_PER_DEGREE: f64 = 111.195;

    fn hong_kong() -> LatLon {
        LatLon::new(22.3, 114.2)
    }

    fn index() -> AnchorageIndex {
        let loc = hong_kong();
        AnchorageIndex::build(vec![NamedAnchorage {
            lat: loc.lat,
            lon: loc.lon,
            s2id: CellId::fine(loc).token(),
            label: String::from("HONG KONG"),
            iso3: Some(String::from("CHN")),
            sublabel: None,
            label_source: None,
        }])
        .unwrap()
    }

    fn machine_config() -> MachineConfig {
        MachineConfig::from_config(&Config::default())
    }

    /// A position `km_away` north of the anchorage
    fn record(timestamp: &str, km_away: f64, speed: f64) -> TaggedRecord {
        let location = LatLon::new(22.3 + km_away / KM_PER_DEGREE, 114.2);
        TaggedRecord {
            timestamp: parse_timestamp(timestamp).unwrap(),
            location,
            distance_from_shore_km: 0.0,
            speed_knots: speed,
            course: None,
            destination: String::new(),
            cell: CellId::fine(location).token(),
            is_new_cell: false,
        }
    }

    fn event_types(events: &[PortEvent]) -> Vec<EventType> {
        events.iter().map(|e| e.event_type).collect()
    }

    #[test]
    fn test_entry_stop_exit() {
        let index = index();
        let machine = VisitStateMachine::new(&index, machine_config());
        let records = vec![
            record("2016-01-05T08:00:00Z", 2.0, 5.0),
            record("2016-01-05T09:00:00Z", 1.0, 0.1),
            record("2016-01-05T13:00:00Z", 1.0, 1.0),
            record("2016-01-05T14:00:00Z", 10.0, 8.0),
        ];
        let (events, snapshots) = machine.process_vessel(1, &records, None);

        assert_eq!(
            event_types(&events),
            vec![
                EventType::PortEntry,
                EventType::PortStopBegin,
                EventType::PortStopEnd,
                EventType::PortExit,
            ]
        );
        let timestamps: Vec<_> = events.iter().map(|e| e.timestamp.to_rfc3339()).collect();
        assert_eq!(
            timestamps,
            vec![
                "2016-01-05T08:00:00+00:00",
                "2016-01-05T09:00:00+00:00",
                "2016-01-05T13:00:00+00:00",
                "2016-01-05T14:00:00+00:00",
            ]
        );
        for e in &events {
            assert_eq!(e.port_label, "HONG KONG");
            assert_eq!(e.lat, 22.3);
        }

        let snapshot = snapshots.get(&"2016-01-05".parse().unwrap()).unwrap();
        assert_eq!(snapshot.state, MachineState::AtSea);
        assert!(snapshot.active_anchorage.is_none());
    }

    #[test]
    fn test_hysteresis_suppresses_oscillation() {
        let index = index();
        let machine = VisitStateMachine::new(&index, machine_config());
        let mut records = vec![record("2016-01-05T00:00:00Z", 2.0, 5.0)];
        // Oscillate between 3.5 and 4.5 km; only the first 4.5 km sample crosses the exit
        // threshold while in port
        for (i, km) in [3.5, 4.5, 3.5, 4.5, 3.5, 4.5].iter().enumerate() {
            records.push(record(&format!("2016-01-05T{:02}:00:00Z", i + 1), *km, 5.0));
        }
        let (events, _) = machine.process_vessel(1, &records, None);
        assert_eq!(
            event_types(&events),
            vec![EventType::PortEntry, EventType::PortExit]
        );
    }

    #[test]
    fn test_gap_events() {
        let index = index();
        let machine = VisitStateMachine::new(&index, machine_config());
        let records = vec![
            record("2016-01-05T00:00:00Z", 1.0, 5.0),
            record("2016-01-05T08:00:00Z", 1.0, 5.0),
        ];
        let (events, _) = machine.process_vessel(1, &records, None);

        assert_eq!(
            event_types(&events),
            vec![
                EventType::PortEntry,
                EventType::PortGapBegin,
                EventType::PortGapEnd,
            ]
        );
        // The gap begins at the last position before the silence and ends at the record that
        // broke it
        assert_eq!(events[1].timestamp, events[0].timestamp);
        assert_eq!(
            events[2].timestamp,
            parse_timestamp("2016-01-05T08:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_no_gap_below_threshold() {
        let index = index();
        let machine = VisitStateMachine::new(&index, machine_config());
        let records = vec![
            record("2016-01-05T00:00:00Z", 1.0, 5.0),
            record("2016-01-05T05:59:00Z", 1.0, 5.0),
        ];
        let (events, _) = machine.process_vessel(1, &records, None);
        assert_eq!(event_types(&events), vec![EventType::PortEntry]);
    }

    #[test]
    fn test_carry_over_exit() {
        let index = index();
        let machine = VisitStateMachine::new(&index, machine_config());
        let carry = VisitState {
            vessel_id: 1,
            date: "2016-01-04".parse().unwrap(),
            state: MachineState::InPort,
            last_timestamp: parse_timestamp("2016-01-04T23:00:00Z").unwrap(),
            active_anchorage: Some(CellId::fine(hong_kong()).token()),
        };
        let records = vec![record("2016-01-05T01:00:00Z", 10.0, 8.0)];
        let (events, _) = machine.process_vessel(1, &records, Some(&carry));

        assert_eq!(event_types(&events), vec![EventType::PortExit]);
        assert_eq!(
            events[0].timestamp,
            parse_timestamp("2016-01-05T01:00:00Z").unwrap()
        );
        assert_eq!(
            events[0].last_timestamp,
            Some(parse_timestamp("2016-01-04T23:00:00Z").unwrap())
        );
    }

    #[test]
    fn test_carry_over_unknown_anchorage_resets() {
        let index = index();
        let machine = VisitStateMachine::new(&index, machine_config());
        let carry = VisitState {
            vessel_id: 1,
            date: "2016-01-04".parse().unwrap(),
            state: MachineState::InPort,
            last_timestamp: parse_timestamp("2016-01-04T23:00:00Z").unwrap(),
            active_anchorage: Some(String::from("deadbeef1")),
        };
        // Still moored, but the carried anchorage no longer exists; the machine restarts the
        // visit instead of exiting a phantom
        let records = vec![record("2016-01-05T01:00:00Z", 1.0, 5.0)];
        let (events, _) = machine.process_vessel(1, &records, Some(&carry));
        assert_eq!(event_types(&events), vec![EventType::PortEntry]);
    }

    #[test]
    fn test_stopped_exit_closes_stop_first() {
        let index = index();
        let machine = VisitStateMachine::new(&index, machine_config());
        let records = vec![
            record("2016-01-05T00:00:00Z", 1.0, 5.0),
            record("2016-01-05T01:00:00Z", 1.0, 0.1),
            record("2016-01-05T02:00:00Z", 10.0, 8.0),
        ];
        let (events, _) = machine.process_vessel(1, &records, None);

        assert_eq!(
            event_types(&events),
            vec![
                EventType::PortEntry,
                EventType::PortStopBegin,
                EventType::PortStopEnd,
                EventType::PortExit,
            ]
        );
        // The stop closes at the last position inside, not at the record that left
        assert_eq!(
            events[2].timestamp,
            parse_timestamp("2016-01-05T01:00:00Z").unwrap()
        );
        assert_eq!(
            events[3].timestamp,
            parse_timestamp("2016-01-05T02:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_stop_speed_hysteresis() {
        let index = index();
        let machine = VisitStateMachine::new(&index, machine_config());
        // Speeds drifting between the stop-begin (0.2) and stop-end (0.5) thresholds must not
        // toggle the stop
        let records = vec![
            record("2016-01-05T00:00:00Z", 1.0, 5.0),
            record("2016-01-05T01:00:00Z", 1.0, 0.1),
            record("2016-01-05T02:00:00Z", 1.0, 0.4),
            record("2016-01-05T03:00:00Z", 1.0, 0.3),
            record("2016-01-05T04:00:00Z", 1.0, 0.5),
        ];
        let (events, _) = machine.process_vessel(1, &records, None);
        assert_eq!(
            event_types(&events),
            vec![
                EventType::PortEntry,
                EventType::PortStopBegin,
                EventType::PortStopEnd,
            ]
        );
        assert_eq!(
            events[2].timestamp,
            parse_timestamp("2016-01-05T04:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_events_are_ordered() {
        let index = index();
        let machine = VisitStateMachine::new(&index, machine_config());
        // Stop, then a gap, then an exit: emission order differs from timestamp order
        let records = vec![
            record("2016-01-05T00:00:00Z", 1.0, 5.0),
            record("2016-01-05T01:00:00Z", 1.0, 0.1),
            record("2016-01-05T09:00:00Z", 10.0, 8.0),
        ];
        let (events, _) = machine.process_vessel(1, &records, None);

        for pair in events.windows(2) {
            assert!(pair[0].sort_key() <= pair[1].sort_key());
        }
        assert_eq!(
            event_types(&events),
            vec![
                EventType::PortEntry,
                EventType::PortStopBegin,
                EventType::PortGapBegin,
                EventType::PortStopEnd,
                EventType::PortGapEnd,
                EventType::PortExit,
            ]
        );
    }

    #[test]
    fn test_batch_idempotence() {
        let index = index();
        let machine = VisitStateMachine::new(&index, machine_config());
        let records = vec![
            record("2016-01-04T22:00:00Z", 2.0, 5.0),
            record("2016-01-04T23:00:00Z", 1.0, 0.1),
            record("2016-01-05T01:00:00Z", 1.0, 1.0),
            record("2016-01-05T02:00:00Z", 10.0, 8.0),
        ];

        // One run over both days
        let (all_events, _) = machine.process_vessel(1, &records, None);
        let day_two: Vec<_> = all_events
            .iter()
            .filter(|e| e.timestamp.date_naive() == "2016-01-05".parse().unwrap())
            .cloned()
            .collect();

        // Day one alone, then day two resumed from its snapshot
        let (day_one, records_day_two): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|r| r.timestamp.date_naive() == "2016-01-04".parse().unwrap());
        let (_, snapshots) = machine.process_vessel(1, &day_one, None);
        let carry = snapshots.get(&"2016-01-04".parse().unwrap()).unwrap();
        let (resumed, _) = machine.process_vessel(1, &records_day_two, Some(carry));

        assert_eq!(resumed, day_two);
    }
}
