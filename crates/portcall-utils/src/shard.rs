use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use eyre::WrapErr;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::stdio::read_json_lines;

/// A date-sharded JSON-lines table on disk
///
/// One file per UTC date, named `YYYY-MM-DD.json`. Each shard is committed atomically by writing
/// a temp file in the same directory and renaming it over the target, so rewriting a date is
/// truncate-and-replace and a retried batch is idempotent.
#[derive(Debug)]
pub struct DateShardedSink {
    dir: PathBuf,
    buckets: BTreeMap<NaiveDate, Vec<String>>,
}

pub fn shard_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{date}.json"))
}

impl DateShardedSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            buckets: BTreeMap::new(),
        }
    }

    /// Buffer one row into the given date's shard
    pub fn push<T: Serialize>(&mut self, date: NaiveDate, row: &T) -> eyre::Result<()> {
        let line = serde_json::to_string(row).wrap_err("Failed to serialize row")?;
        self.buckets.entry(date).or_default().push(line);
        Ok(())
    }

    /// Make sure the given date gets a shard file even if no rows are pushed for it
    ///
    /// An empty shard on disk distinguishes "this date was processed and had nothing" from "this
    /// date was never processed".
    pub fn touch(&mut self, date: NaiveDate) {
        self.buckets.entry(date).or_default();
    }

    /// Write every buffered shard. No file is visible until its rename; nothing is committed if
    /// any shard fails to write.
    pub fn commit(self) -> eyre::Result<usize> {
        std::fs::create_dir_all(&self.dir)
            .wrap_err_with(|| format!("Failed to create output directory: {:?}", self.dir))?;
        let num_shards = self.buckets.len();
        for (date, lines) in self.buckets {
            let mut file = tempfile::NamedTempFile::new_in(&self.dir)
                .wrap_err("Failed to create temp shard")?;
            for line in &lines {
                writeln!(file, "{line}")?;
            }
            let path = shard_path(&self.dir, date);
            file.persist(&path)
                .wrap_err_with(|| format!("Failed to commit shard: {path:?}"))?;
            tracing::debug!("Committed {} rows to {path:?}", lines.len());
        }
        Ok(num_shards)
    }
}

/// Read one date shard, or `None` if that date has no file
pub fn read_shard<T: DeserializeOwned>(dir: &Path, date: NaiveDate) -> eyre::Result<Option<Vec<T>>> {
    let path = shard_path(dir, date);
    if !path.exists() {
        return Ok(None);
    }
    let file = std::fs::File::open(&path).wrap_err_with(|| format!("Failed to open {path:?}"))?;
    let rows = read_json_lines(std::io::BufReader::new(file))
        .wrap_err_with(|| format!("Failed to read shard: {path:?}"))?;
    Ok(Some(rows))
}

/// Read every shard in the inclusive date range, skipping dates with no file
pub fn read_shard_range<T: DeserializeOwned>(
    dir: &Path,
    start: NaiveDate,
    end: NaiveDate,
) -> eyre::Result<Vec<T>> {
    let mut rows = Vec::new();
    let mut date = start;
    while date <= end {
        if let Some(shard) = read_shard(dir, date)? {
            rows.extend(shard);
        }
        date = date.succ_opt().expect("date overflow");
    }
    Ok(rows)
}
