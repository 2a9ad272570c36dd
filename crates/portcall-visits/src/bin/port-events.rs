use std::collections::{BTreeSet, HashMap};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{Duration, NaiveDate};
use clap::Parser;
use itertools::Itertools;
use portcall_geo::check_visit_lookup_radius;
use portcall_records::{VesselId, VesselRecord};
use portcall_track::process_for_events;
use portcall_utils::config::Config;
use portcall_utils::shard::{DateShardedSink, read_shard};
use portcall_utils::stdio::{get_input_reader, read_json_lines};
use portcall_visits::{AnchorageIndex, MachineConfig, NamedAnchorage, VisitState, VisitStateMachine};

/// Detect port entry/stop/gap/exit events for every vessel in a batch
///
/// Reads a newline-delimited JSON stream of AIS messages and an anchorage table, drives the
/// per-vessel state machine, and writes date-sharded event and carry-over state tables. Records
/// from the day before the window warm the machine up; only events inside the window are
/// written.
#[derive(Debug, Parser)]
#[clap(version, verbatim_doc_comment)]
struct Args {
    #[clap(short, long, default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,

    /// First date of events to emit (inclusive)
    #[clap(long)]
    start_date: NaiveDate,

    /// Last date of events to emit (inclusive)
    #[clap(long)]
    end_date: NaiveDate,

    /// Path to the input message stream. stdin if '-' or if not passed
    #[clap(long)]
    input_table: Option<PathBuf>,

    /// Path to the anchorage table (newline-delimited JSON)
    #[clap(long)]
    anchorage_table: PathBuf,

    /// Directory for the date-sharded event table
    #[clap(long)]
    output_table: PathBuf,

    /// Directory for the date-sharded carry-over state table
    #[clap(long)]
    state_table: PathBuf,

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

    let config = Config::load(args.config.as_deref())?;
    let machine_config = MachineConfig::from_config(&config);
    // Fatal before any data is read: a lookup radius the coarse cells can't cover would silently
    // lose visits
    check_visit_lookup_radius(machine_config.max_visit_dist_km())?;

    let anchorages: Vec<NamedAnchorage> = {
        let reader = get_input_reader(&Some(args.anchorage_table.clone()))?;
        read_json_lines(reader)?
    };
    if anchorages.is_empty() {
        eyre::bail!("Anchorage table {:?} is empty", args.anchorage_table);
    }
    let index = AnchorageIndex::build(anchorages)?;
    tracing::info!("Indexed {} anchorages", index.len());

    // The machine warms up on the day before the window
    let warmup_date = args.start_date - Duration::days(1);
    let carry: HashMap<VesselId, VisitState> =
        match read_shard::<VisitState>(&args.state_table, warmup_date)? {
            Some(rows) => rows.into_iter().map(|row| (row.vessel_id, row)).collect(),
            None => {
                tracing::warn!(
                    "No carry-over state for {warmup_date}; starting every vessel at sea"
                );
                HashMap::new()
            }
        };

    let parse_start = Instant::now();
    let blacklist = config.blacklisted_vessel_ids.iter().copied().collect();
    let reader = get_input_reader(&args.input_table)?;
    let (records, stats) = portcall_records::parse_messages(reader, &blacklist)?;
    tracing::info!("Parsed {stats} after {:?}", parse_start.elapsed());

    let machine_start = Instant::now();
    let mut by_vessel: HashMap<VesselId, Vec<VesselRecord>> = records
        .into_iter()
        .filter(|(_, record)| {
            let date = record.timestamp().date_naive();
            date >= warmup_date && date <= args.end_date
        })
        .into_group_map();

    // Every vessel with records this batch, plus carried vessels that are mid-visit
    let vessel_ids: BTreeSet<VesselId> = by_vessel
        .keys()
        .copied()
        .chain(
            carry
                .values()
                .filter(|state| state.state.in_port())
                .map(|state| state.vessel_id),
        )
        .collect();

    let machine = VisitStateMachine::new(&index, machine_config);
    let mut events_sink = DateShardedSink::new(&args.output_table);
    let mut state_sink = DateShardedSink::new(&args.state_table);
    let mut date = args.start_date;
    while date <= args.end_date {
        events_sink.touch(date);
        state_sink.touch(date);
        date = date.succ_opt().expect("date overflow");
    }

    let mut num_events = 0usize;
    for vessel_id in vessel_ids {
        let tagged = by_vessel
            .remove(&vessel_id)
            .and_then(|records| process_for_events(records, &config))
            .unwrap_or_default();
        let vessel_carry = carry.get(&vessel_id);

        let (events, snapshots) = machine.process_vessel(vessel_id, &tagged, vessel_carry);
        for event in &events {
            let date = event.timestamp.date_naive();
            if date >= args.start_date && date <= args.end_date {
                events_sink.push(date, event)?;
                num_events += 1;
            }
        }

        // Roll the state forward through every date of the window. Vessels that produced no
        // snapshot and aren't mid-visit have nothing worth carrying.
        let carried_in_port = vessel_carry.is_some_and(|state| state.state.in_port());
        if snapshots.is_empty() && !carried_in_port {
            continue;
        }
        let mut date = args.start_date;
        while date <= args.end_date {
            let current = snapshots
                .range(..=date)
                .next_back()
                .map(|(_, state)| state)
                .or(vessel_carry);
            if let Some(current) = current {
                state_sink.push(date, &VisitState { date, ..current.clone() })?;
            }
            date = date.succ_opt().expect("date overflow");
        }
    }
    tracing::info!("Emitted {num_events} events after {:?}", machine_start.elapsed());

    let num_event_shards = events_sink.commit()?;
    let num_state_shards = state_sink.commit()?;
    tracing::info!(
        "Committed {num_event_shards} event shards and {num_state_shards} state shards \
         (total {:?})",
        parse_start.elapsed()
    );

    Ok(())
}
