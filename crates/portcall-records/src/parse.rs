use std::collections::HashSet;
use std::io::BufRead;

use eyre::WrapErr;

use crate::message::RawMessage;
use crate::record::{VesselId, VesselRecord};

/// Counts of what the parser kept and dropped
///
/// Data-level anomalies are never fatal; they land here and the binaries log the totals.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: u64,
    pub records: u64,
    pub parse_errors: u64,
    pub bad_vessel_ids: u64,
    pub blacklisted: u64,
}

impl std::fmt::Display for ParseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} records from {} lines ({} parse errors, {} bad vessel ids, {} blacklisted)",
            self.records, self.lines, self.parse_errors, self.bad_vessel_ids, self.blacklisted
        )
    }
}

/// Parse a newline-delimited JSON message stream into `(vessel id, record)` pairs
///
/// Malformed lines, unparseable timestamps, non-numeric vessel ids, and blacklisted vessels are
/// dropped and counted. I/O errors are fatal.
pub fn parse_messages<R: BufRead>(
    reader: R,
    blacklist: &HashSet<VesselId>,
) -> eyre::Result<(Vec<(VesselId, VesselRecord)>, ParseStats)> {
    let mut records = Vec::new();
    let mut stats = ParseStats::default();

    for line in reader.lines() {
        let line = line.wrap_err("Failed to read message line")?;
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        let msg: RawMessage = match serde_json::from_str(&line) {
            Ok(msg) => msg,
            Err(err) => {
                stats.parse_errors += 1;
                tracing::trace!("Dropping malformed message: {err}");
                continue;
            }
        };
        let Some(vessel_id) = msg.vessel_id() else {
            stats.bad_vessel_ids += 1;
            tracing::trace!("Dropping message with missing or non-numeric vessel id");
            continue;
        };
        if blacklist.contains(&vessel_id) {
            stats.blacklisted += 1;
            continue;
        }
        match VesselRecord::from_msg(&msg) {
            Ok(record) => {
                stats.records += 1;
                records.push((vessel_id, record));
            }
            Err(err) => {
                stats.parse_errors += 1;
                tracing::trace!("Dropping message from {vessel_id}: {err}");
            }
        }
    }

    Ok((records, stats))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const MESSAGES: &str = r#"
{"mmsi": 100, "timestamp": "2016-01-01T00:00:00Z", "lat": 55.0, "lon": 9.0, "speed": 1.0}
{"mmsi": 100, "timestamp": "2016-01-01T00:05:00Z", "destination": "SKAGEN"}
{"mmsi": "200", "timestamp": "2016-01-01 00:10:00.000000 UTC", "lat": 55.1, "lon": 9.1, "speed": 0.0}
{"mmsi": 666, "timestamp": "2016-01-01T00:00:00Z", "lat": 55.0, "lon": 9.0, "speed": 1.0}
{"mmsi": "fish-1", "timestamp": "2016-01-01T00:00:00Z"}
{"mmsi": 300, "timestamp": "garbage"}
this is not json
"#;

    #[test]
    fn test_parse_messages() {
        let blacklist = HashSet::from([666]);
        let (records, stats) = parse_messages(MESSAGES.as_bytes(), &blacklist).unwrap();

        let ids: Vec<VesselId> = records.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![100, 100, 200]);
        assert!(matches!(records[0].1, VesselRecord::Location(_)));
        assert!(matches!(records[1].1, VesselRecord::Info(_)));

        assert_eq!(
            stats,
            ParseStats {
                lines: 7,
                records: 3,
                parse_errors: 2,
                bad_vessel_ids: 1,
                blacklisted: 1,
            }
        );
    }
}
