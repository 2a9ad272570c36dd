use std::io::Read;
use std::path::Path;

use eyre::WrapErr;
use portcall_geo::{LatLon, distance};
use serde::Deserialize;

/// One row of the named-port table
#[derive(Debug, Clone, Deserialize)]
pub struct NamedPort {
    #[serde(rename = "port_name")]
    pub name: String,
    pub country: String,
    #[serde(rename = "latitude")]
    pub lat: f64,
    #[serde(rename = "longitude")]
    pub lon: f64,
}

impl NamedPort {
    pub fn location(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// The external named-port table, used to label anchorages with their closest known port
///
/// Loaded once per worker and shared read-only. Lookups are a linear scan; the table is a few
/// thousand rows and each anchorage is looked up once.
#[derive(Debug)]
pub struct Gazetteer {
    ports: Vec<NamedPort>,
}

impl Gazetteer {
    pub fn from_reader<R: Read>(reader: R) -> eyre::Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut ports = Vec::new();
        for row in csv_reader.deserialize() {
            let port: NamedPort = row.wrap_err("Failed to parse port row")?;
            ports.push(port);
        }
        if ports.is_empty() {
            eyre::bail!("Port gazetteer is empty");
        }
        tracing::debug!("Loaded {} named ports", ports.len());
        Ok(Self { ports })
    }

    pub fn from_csv_path(path: &Path) -> eyre::Result<Self> {
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("Failed to open port gazetteer: {path:?}"))?;
        Self::from_reader(file).wrap_err_with(|| format!("Failed to load gazetteer: {path:?}"))
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// The nearest named port and its distance in km
    pub fn nearest(&self, loc: LatLon) -> (&NamedPort, f64) {
        let mut nearest = &self.ports[0];
        let mut min_dist = distance(nearest.location(), loc);
        for port in &self.ports[1..] {
            let dist = distance(port.location(), loc);
            if dist < min_dist {
                nearest = port;
                min_dist = dist;
            }
        }
        (nearest, min_dist)
    }
}
