use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{Duration, NaiveDate};
use clap::Parser;
use itertools::Itertools;
use portcall_utils::config::Config;
use portcall_utils::shard::{DateShardedSink, read_shard, read_shard_range};
use portcall_visits::{PortEvent, PortVisit, group_visits};

/// Group port events into closed port visits
///
/// Reads the date-sharded event table back far enough to see each visit's entry, folds every
/// vessel's events into visits, and writes the visits whose exit falls inside the window,
/// sharded by the visit's start date. Start-date shards are merged with what is already on disk
/// so a late closure rewrites its shard without losing earlier visits.
#[derive(Debug, Parser)]
#[clap(version, verbatim_doc_comment)]
struct Args {
    #[clap(short, long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,

    /// First date of visit closures to emit (inclusive)
    #[clap(long)]
    start_date: NaiveDate,

    /// Last date of visit closures to emit (inclusive)
    #[clap(long)]
    end_date: NaiveDate,

    /// Directory of the date-sharded event table
    #[clap(long)]
    events_table: PathBuf,

    /// Directory for the date-sharded visit table
    #[clap(long)]
    output_table: PathBuf,

    /// How many days before the window to read events, so mid-visit entries are seen
    #[clap(long, default_value_t = 14)]
    padding_days: i64,

    /// Path to a JSON config file. Missing keys take production defaults
    #[clap(long)]
    config: Option<PathBuf>,
}

fn main() -> eyre::Result<()> {
    let use_color = std::io::stderr().is_terminal();
    if use_color {
        color_eyre::install()?;
    }

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(args.log_level.into())
        .with_env_var("PORTCALL_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(use_color)
        .with_writer(std::io::stderr)
        .init();

    if args.end_date < args.start_date {
        eyre::bail!("End date {} precedes start date {}", args.end_date, args.start_date);
    }
    if args.padding_days < 0 {
        eyre::bail!("Padding must be non-negative, got {}", args.padding_days);
    }

    let config = Config::load(args.config.as_deref())?;

    let read_start = Instant::now();
    let read_from = args.start_date - Duration::days(args.padding_days);
    let events: Vec<PortEvent> = read_shard_range(&args.events_table, read_from, args.end_date)?;
    tracing::info!(
        "Read {} events from {read_from} through {} after {:?}",
        events.len(),
        args.end_date,
        read_start.elapsed()
    );

    let group_start = Instant::now();
    let by_vessel = events
        .into_iter()
        .filter(|event| !config.blacklisted_vessel_ids.contains(&event.vessel_id))
        .map(|event| (event.vessel_id, event))
        .into_group_map();

    let mut by_start_date: BTreeMap<NaiveDate, Vec<PortVisit>> = BTreeMap::new();
    let mut num_visits = 0usize;
    for (vessel_id, events) in by_vessel.into_iter().sorted_by_key(|(id, _)| *id) {
        for visit in group_visits(vessel_id, events) {
            let closed = visit.end_timestamp.date_naive();
            if closed < args.start_date || closed > args.end_date {
                continue;
            }
            num_visits += 1;
            by_start_date
                .entry(visit.start_timestamp.date_naive())
                .or_default()
                .push(visit);
        }
    }
    tracing::info!("Closed {num_visits} visits after {:?}", group_start.elapsed());

    // Merge each touched shard with what's already on disk: shards are keyed by start date, and
    // a visit that closed in this window may share its start date with visits closed earlier.
    let mut sink = DateShardedSink::new(&args.output_table);
    for (date, visits) in by_start_date {
        let mut merged: BTreeMap<String, PortVisit> = BTreeMap::new();
        if let Some(existing) = read_shard::<PortVisit>(&args.output_table, date)? {
            for visit in existing {
                merged.insert(visit.visit_id.clone(), visit);
            }
        }
        for visit in visits {
            merged.insert(visit.visit_id.clone(), visit);
        }
        for visit in merged
            .into_values()
            .sorted_by_key(|v| (v.start_timestamp, v.vessel_id))
        {
            sink.push(date, &visit)?;
        }
    }
    let num_shards = sink.commit()?;
    tracing::info!("Committed {num_shards} visit shards (total {:?})", read_start.elapsed());

    Ok(())
}
