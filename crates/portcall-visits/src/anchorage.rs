use std::collections::HashMap;

use portcall_geo::{CellId, LatLon, distance, visit_join_cells};
use serde::{Deserialize, Serialize};

/// One row of the anchorage table consumed by the port-visit pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedAnchorage {
    pub lat: f64,
    pub lon: f64,
    /// Fine cell token; the anchorage identifier
    pub s2id: String,
    pub label: String,
    #[serde(default)]
    pub iso3: Option<String>,
    #[serde(default)]
    pub sublabel: Option<String>,
    #[serde(default)]
    pub label_source: Option<String>,
}

impl NamedAnchorage {
    pub fn location(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// Anchorages indexed for the visit-time spatial join
///
/// Every anchorage is registered under its coarse cell and all of that cell's neighbors, so a
/// lookup only ever inspects the query point's own coarse cell. The startup geometry check
/// guarantees that this finds every anchorage within the visit radius.
#[derive(Debug, Default)]
pub struct AnchorageIndex {
    anchorages: Vec<NamedAnchorage>,
    by_coarse: HashMap<String, Vec<usize>>,
    by_id: HashMap<String, usize>,
}

impl AnchorageIndex {
    pub fn build(anchorages: Vec<NamedAnchorage>) -> eyre::Result<Self> {
        let mut index = Self {
            anchorages,
            ..Self::default()
        };
        for (i, anchorage) in index.anchorages.iter().enumerate() {
            for token in visit_join_cells(&anchorage.s2id)? {
                index.by_coarse.entry(token).or_default().push(i);
            }
            if index.by_id.insert(anchorage.s2id.clone(), i).is_some() {
                tracing::warn!("Duplicate anchorage id {}; keeping the later row", anchorage.s2id);
            }
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.anchorages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchorages.is_empty()
    }

    /// Resolve an anchorage by its id
    pub fn get(&self, s2id: &str) -> Option<&NamedAnchorage> {
        self.by_id.get(s2id).map(|&i| &self.anchorages[i])
    }

    /// The closest anchorage registered under the query point's coarse cell, with its distance
    ///
    /// Equidistant anchorages tie-break toward the lexicographically smaller id. Returns `None`
    /// when no anchorage is registered in the bucket; anchorages beyond the lookup guarantee
    /// radius may or may not be visible, so callers must treat distances past the exit threshold
    /// the same as a miss.
    pub fn nearest(&self, loc: LatLon) -> Option<(&NamedAnchorage, f64)> {
        let token = CellId::coarse(loc).token();
        let candidates = self.by_coarse.get(&token)?;
        candidates
            .iter()
            .map(|&i| {
                let anchorage = &self.anchorages[i];
                (anchorage, distance(loc, anchorage.location()))
            })
            .min_by(|(a, da), (b, db)| {
                da.partial_cmp(db)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.s2id.cmp(&b.s2id))
            })
    }
}
