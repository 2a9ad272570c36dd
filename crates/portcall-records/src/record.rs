use chrono::{DateTime, NaiveDateTime, Utc};
use portcall_geo::LatLon;

use crate::message::RawMessage;

pub type VesselId = i64;

/// A position report
#[derive(Debug, Clone, PartialEq)]
pub struct VesselLocationRecord {
    pub timestamp: DateTime<Utc>,
    pub location: LatLon,
    pub distance_from_shore_km: f64,
    /// Speed over ground in knots, rounded to one decimal
    pub speed_knots: f64,
    pub course: Option<f64>,
}

/// A static/voyage report carrying a declared destination
#[derive(Debug, Clone, PartialEq)]
pub struct VesselInfoRecord {
    pub timestamp: DateTime<Utc>,
    pub destination: String,
}

/// A message that is neither a usable position nor a destination report
///
/// Keeps only the timestamp so that per-vessel sequencing is preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidRecord {
    pub timestamp: DateTime<Utc>,
}

/// One parsed AIS message; downstream code dispatches on the variant
#[derive(Debug, Clone, PartialEq)]
pub enum VesselRecord {
    Location(VesselLocationRecord),
    Info(VesselInfoRecord),
    Invalid(InvalidRecord),
}

impl VesselRecord {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            VesselRecord::Location(r) => r.timestamp,
            VesselRecord::Info(r) => r.timestamp,
            VesselRecord::Invalid(r) => r.timestamp,
        }
    }

    /// Classify a raw message
    ///
    /// A message with in-range `lat`, `lon`, and `speed` is a location record; otherwise a
    /// message with a non-empty destination is an info record; anything else is invalid. Fails
    /// only on a missing or unparseable timestamp.
    pub fn from_msg(msg: &RawMessage) -> eyre::Result<VesselRecord> {
        let Some(raw_timestamp) = msg.timestamp.as_deref() else {
            eyre::bail!("Message has no timestamp");
        };
        let timestamp = parse_timestamp(raw_timestamp)?;

        if let Some((location, speed)) = valid_location(msg) {
            return Ok(VesselRecord::Location(VesselLocationRecord {
                timestamp,
                location,
                distance_from_shore_km: msg.distance_from_shore.unwrap_or(0.0) / 1000.0,
                speed_knots: round_tenths(speed),
                course: msg.course,
            }));
        }

        match msg.destination.as_deref() {
            Some(destination) if !destination.is_empty() => {
                Ok(VesselRecord::Info(VesselInfoRecord {
                    timestamp,
                    destination: destination.to_string(),
                }))
            }
            _ => Ok(VesselRecord::Invalid(InvalidRecord { timestamp })),
        }
    }
}

/// Parse a message timestamp as UTC
///
/// Accepts RFC3339 (`2016-01-01T05:20:13.000000Z`) and the legacy
/// `2016-01-01 05:20:13.000000 UTC` form.
pub fn parse_timestamp(raw: &str) -> eyre::Result<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f UTC") {
        return Ok(naive.and_utc());
    }
    eyre::bail!("Unparseable timestamp: {raw:?}")
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// The message's position and speed, if it has them and every present field is in range
fn valid_location(msg: &RawMessage) -> Option<(LatLon, f64)> {
    let (lat, lon, speed) = (msg.lat?, msg.lon?, msg.speed?);
    let in_range = (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
        && (0.0..=102.2).contains(&speed);
    if !in_range {
        return None;
    }
    if let Some(meters) = msg.distance_from_shore {
        if !(0.0..=20_000_000.0).contains(&meters) {
            return None;
        }
    }
    if let Some(course) = msg.course {
        if !(0.0..360.0).contains(&course) {
            return None;
        }
    }
    Some((LatLon::new(lat, lon), speed))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn location_msg() -> RawMessage {
        serde_json::from_str(
            r#"{"mmsi": 111219501, "timestamp": "2016-01-01T05:20:13.000000Z",
                "lat": 55.2189674377, "lon": 9.2907962799, "speed": 15.8999996185,
                "course": 92.8000030518, "distance_from_shore": 2500.0}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_location_record() {
        let record = VesselRecord::from_msg(&location_msg()).unwrap();
        let expected = VesselRecord::Location(VesselLocationRecord {
            timestamp: parse_timestamp("2016-01-01T05:20:13.000000Z").unwrap(),
            location: LatLon::new(55.2189674377, 9.2907962799),
            distance_from_shore_km: 2.5,
            speed_knots: 15.9,
            course: Some(92.8000030518),
        });
        assert_eq!(record, expected);
    }

    #[test]
    fn test_info_record() {
        let msg: RawMessage = serde_json::from_str(
            r#"{"mmsi": 1, "timestamp": "2016-01-01T05:21:13.000000Z", "destination": "HAMBURG"}"#,
        )
        .unwrap();
        let record = VesselRecord::from_msg(&msg).unwrap();
        assert_eq!(
            record,
            VesselRecord::Info(VesselInfoRecord {
                timestamp: parse_timestamp("2016-01-01T05:21:13.000000Z").unwrap(),
                destination: String::from("HAMBURG"),
            })
        );
    }

    #[test]
    fn test_empty_destination_is_invalid() {
        let msg: RawMessage = serde_json::from_str(
            r#"{"mmsi": 1, "timestamp": "2016-01-01T05:21:13.000000Z", "destination": ""}"#,
        )
        .unwrap();
        let record = VesselRecord::from_msg(&msg).unwrap();
        assert!(matches!(record, VesselRecord::Invalid(_)));
    }

    #[test]
    fn test_out_of_range_position_downgrades() {
        // A bad latitude with a destination becomes an info record
        let msg: RawMessage = serde_json::from_str(
            r#"{"mmsi": 1, "timestamp": "2016-01-01T05:21:13.000000Z",
                "lat": 361.0, "lon": 9.0, "speed": 1.0, "destination": "SKAGEN"}"#,
        )
        .unwrap();
        let record = VesselRecord::from_msg(&msg).unwrap();
        assert!(matches!(record, VesselRecord::Info(_)));

        // And without a destination it is invalid
        let msg: RawMessage = serde_json::from_str(
            r#"{"mmsi": 1, "timestamp": "2016-01-01T05:21:13.000000Z",
                "lat": 55.0, "lon": 9.0, "speed": 200.0}"#,
        )
        .unwrap();
        let record = VesselRecord::from_msg(&msg).unwrap();
        assert!(matches!(record, VesselRecord::Invalid(_)));
    }

    #[test]
    fn test_out_of_range_course() {
        let msg: RawMessage = serde_json::from_str(
            r#"{"mmsi": 1, "timestamp": "2016-01-01T05:21:13.000000Z",
                "lat": 55.0, "lon": 9.0, "speed": 1.0, "course": 511.0}"#,
        )
        .unwrap();
        let record = VesselRecord::from_msg(&msg).unwrap();
        assert!(matches!(record, VesselRecord::Invalid(_)));
    }

    #[test]
    fn test_missing_timestamp() {
        let msg: RawMessage = serde_json::from_str(r#"{"mmsi": 1, "lat": 55.0}"#).unwrap();
        assert!(VesselRecord::from_msg(&msg).is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        let a = parse_timestamp("2016-01-01T05:20:13.000000Z").unwrap();
        let b = parse_timestamp("2016-01-01 05:20:13.000000 UTC").unwrap();
        assert_eq!(a, b);

        let c = parse_timestamp("2016-01-01 05:20:13 UTC").unwrap();
        assert_eq!(c.timestamp(), a.timestamp());

        assert!(parse_timestamp("01/01/2016 05:20").is_err());
    }

    #[test]
    fn test_speed_rounding() {
        let msg: RawMessage = serde_json::from_str(
            r#"{"mmsi": 1, "timestamp": "2016-01-01T05:21:13.000000Z",
                "lat": 55.0, "lon": 9.0, "speed": 15.8999996185}"#,
        )
        .unwrap();
        let VesselRecord::Location(record) = VesselRecord::from_msg(&msg).unwrap() else {
            panic!("expected a location record");
        };
        assert_eq!(record.speed_knots, 15.9);
    }
}
