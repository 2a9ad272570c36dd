use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use clap::Parser;
use itertools::Itertools;
use portcall_anchorages::{Gazetteer, aggregate_anchorages};
use portcall_geo::InlandMask;
use portcall_track::process_for_anchorages;
use portcall_utils::config::Config;
use portcall_utils::stdio::{get_input_reader, get_output_writer, read_id_list};

/// Derive anchorage points from stationary vessel behavior
///
/// Reads a newline-delimited JSON stream of AIS messages, extracts each vessel's stationary
/// periods, aggregates them by spherical cell, and writes one JSON object per anchorage point.
#[derive(Debug, Parser)]
#[clap(version, verbatim_doc_comment)]
struct Args {
    #[clap(short, long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,

    /// First date of messages to process (inclusive)
    #[clap(long)]
    start_date: NaiveDate,

    /// Last date of messages to process (inclusive)
    #[clap(long)]
    end_date: NaiveDate,

    /// Path to the input message stream. stdin if '-' or if not passed
    #[clap(long)]
    input_table: Option<PathBuf>,

    /// Path to write anchorage points to. stdout if '-' or if not passed
    #[clap(long)]
    output_table: Option<PathBuf>,

    /// Path to a JSON config file. Missing keys take production defaults
    #[clap(long)]
    config: Option<PathBuf>,

    /// Path to a newline-separated list of fishing vessel ids
    #[clap(long)]
    fishing_vessels: Option<PathBuf>,

    /// Path to the named-port gazetteer CSV
    #[clap(long)]
    ports: PathBuf,

    /// Path to the inland-water mask CSV. Without it every coordinate counts as water
    #[clap(long)]
    inland_mask: Option<PathBuf>,
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

    let config = Config::load(args.config.as_deref())?;
    let gazetteer = Gazetteer::from_csv_path(&args.ports)?;
    let inland_mask = InlandMask::load_or_empty(args.inland_mask.as_deref())?;
    let fishing_vessels = match &args.fishing_vessels {
        Some(path) => {
            let reader = get_input_reader(&Some(path.clone()))?;
            read_id_list(reader)?
        }
        None => {
            tracing::warn!("No fishing vessel list given; fishing statistics will be zero");
            Default::default()
        }
    };

    let parse_start = Instant::now();
    let blacklist = config.blacklisted_vessel_ids.iter().copied().collect();
    let reader = get_input_reader(&args.input_table)?;
    let (records, stats) = portcall_records::parse_messages(reader, &blacklist)?;
    tracing::info!("Parsed {stats} after {:?}", parse_start.elapsed());

    let process_start = Instant::now();
    let in_window = |date: NaiveDate| date >= args.start_date && date <= args.end_date;
    let by_vessel = records
        .into_iter()
        .filter(|(_, record)| in_window(record.timestamp().date_naive()))
        .into_group_map();
    let num_vessels = by_vessel.len();

    let mut tracks: Vec<_> = by_vessel
        .into_iter()
        .filter_map(|(vessel_id, records)| {
            process_for_anchorages(records, &config).map(|track| (vessel_id, track))
        })
        .collect();
    tracks.sort_by_key(|(vessel_id, _)| *vessel_id);
    tracing::info!(
        "Processed {} of {num_vessels} vessels after {:?}",
        tracks.len(),
        process_start.elapsed()
    );

    let aggregate_start = Instant::now();
    let points = aggregate_anchorages(
        &tracks,
        &fishing_vessels,
        &gazetteer,
        config.min_unique_vessels_for_anchorage,
    )?;

    let mut num_inland = 0usize;
    let mut writer = get_output_writer(&args.output_table)?;
    let mut num_written = 0usize;
    for point in &points {
        if inland_mask.is_inland(point.mean_location()) {
            num_inland += 1;
            tracing::debug!("Dropping inland anchorage at {}", point.mean_location());
            continue;
        }
        serde_json::to_writer(&mut writer, point)?;
        writeln!(writer)?;
        num_written += 1;
    }
    writer.flush()?;

    if num_inland > 0 {
        tracing::warn!("Dropped {num_inland} anchorages on inland water");
    }
    tracing::info!(
        "Wrote {num_written} anchorages after {:?} (total {:?})",
        aggregate_start.elapsed(),
        parse_start.elapsed()
    );

    Ok(())
}
