use std::collections::HashSet;
use std::path::Path;

use eyre::WrapErr;
use serde::Deserialize;

use crate::latlon::LatLon;

/// Bin resolution of the inland raster, bins per degree
const BINS_PER_DEGREE: f64 = 10.0;

#[derive(Debug, Deserialize)]
struct MaskRow {
    lat_bin: i32,
    lon_bin: i32,
}

/// A sparse boolean raster answering "is this coordinate on land?"
///
/// Backed by a set of occupied 0.1-degree bins. Coordinates that fall in an occupied bin are
/// inland; everything else is water. The raster is read-only once loaded; workers share it by
/// reference.
#[derive(Debug, Default)]
pub struct InlandMask {
    bins: HashSet<(i32, i32)>,
}

impl InlandMask {
    /// An empty mask that reports every coordinate as water
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the mask from a CSV of occupied `lat_bin, lon_bin` indices
    pub fn from_csv_path(path: &Path) -> eyre::Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .wrap_err_with(|| format!("Failed to open inland mask: {path:?}"))?;
        let mut bins = HashSet::new();
        for row in reader.deserialize() {
            let row: MaskRow = row.wrap_err("Failed to parse inland mask row")?;
            bins.insert((row.lat_bin, row.lon_bin));
        }
        tracing::debug!("Loaded inland mask with {} occupied bins", bins.len());
        Ok(Self { bins })
    }

    /// Load the mask if a path was given and exists, otherwise warn and fall back to all-water
    ///
    /// The mask is an optional asset; a missing file degrades to all-water. A file that exists
    /// but fails to read or parse is still fatal.
    pub fn load_or_empty(path: Option<&Path>) -> eyre::Result<Self> {
        let Some(path) = path else {
            tracing::warn!("No inland mask given; treating every coordinate as water");
            return Ok(Self::empty());
        };
        if !path.exists() {
            tracing::warn!("Inland mask {path:?} does not exist; treating every coordinate as water");
            return Ok(Self::empty());
        }
        Self::from_csv_path(path)
    }

    #[must_use]
    pub fn is_inland(&self, loc: LatLon) -> bool {
        let lat_bin = (loc.lat * BINS_PER_DEGREE).floor() as i32;
        let lon_bin = (loc.lon * BINS_PER_DEGREE).floor() as i32;
        self.bins.contains(&(lat_bin, lon_bin))
    }
}
