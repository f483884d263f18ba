use std::error::Error;
use std::process;

use chrono::NaiveDateTime;
use clap::{App, Arg, ArgMatches};

use schedule_refinement_engine::adherence::AdherenceReport;
use schedule_refinement_engine::cancel::CancellationToken;
use schedule_refinement_engine::clock::LocalCalendar;
use schedule_refinement_engine::config::RefinementConfig;
use schedule_refinement_engine::engine::{Engine, ProcessOutcome, RouteFitDiagnostics};
use schedule_refinement_engine::error::{ConfigError, FnResult, OrError};
use schedule_refinement_engine::gtfs::{CsvGtfsReader, CsvGtfsWriter};
use schedule_refinement_engine::observation::{Observation, ObservationKind, ObservationPage, ObservationSource};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run() -> FnResult<()> {
    let args = parse_args();
    let verbose = args.is_present("verbose");
    let config = config_from_args(&args)?;

    // The cancellation token exists so a long-running deployment (a
    // supervisor process, a web control panel) can call `.cancel()` from
    // outside this CLI's own call stack; this binary itself never
    // triggers it, matching the teacher's Main, which takes no signal
    // handling of its own either.
    let cancel = CancellationToken::new();

    let reader = CsvGtfsReader::new();
    let writer = CsvGtfsWriter::new();
    let calendar = LocalCalendar;
    let source = PlaceholderObservationSource::new();
    let engine = Engine::new(&reader, &writer, &source, &calendar);

    match args.subcommand() {
        ("refine", Some(_)) => match engine.process(&config, &cancel, verbose)? {
            ProcessOutcome::Completed { report, fit, row_count } => {
                print_report(row_count, &fit, &report);
            }
            ProcessOutcome::Cancelled => {
                println!("run cancelled before any output was written");
            }
        },
        ("report-only", Some(_)) => {
            println!("report-only: point --dir at a scratch copy of the feed if you don't want it overwritten");
            match engine.process(&config, &cancel, verbose)? {
                ProcessOutcome::Completed { report, fit, row_count } => {
                    print_report(row_count, &fit, &report);
                }
                ProcessOutcome::Cancelled => {
                    println!("run cancelled before any output was written");
                }
            }
        }
        _ => panic!("invalid arguments"),
    }

    Ok(())
}

fn print_report(row_count: usize, fit: &RouteFitDiagnostics, report: &AdherenceReport) {
    println!("processed {} stop_times rows", row_count);
    println!("fitted k per route (departures):");
    for (route_id, k) in &fit.departure_k {
        println!("  {}: k = {:.3}", route_id, k);
    }
    println!("fitted k per route (arrivals):");
    for (route_id, k) in &fit.arrival_k {
        println!("  {}: k = {:.3}", route_id, k);
    }
    println!(
        "on-time fraction, original schedule: {:.3} ({}/{})",
        report.on_time_fraction_orig(),
        report.orig.on_time,
        report.orig.total
    );
    println!(
        "on-time fraction, revised schedule:  {:.3} ({}/{})",
        report.on_time_fraction_new(),
        report.new.on_time,
        report.new.total
    );
}

fn parse_args() -> ArgMatches {
    App::new("schedule-refinement-engine")
        .subcommand(
            App::new("refine").about("Ingests observations, refits the schedule, and writes the revised GTFS files."),
        )
        .subcommand(
            App::new("report-only")
                .about("Runs the same pipeline but intended for inspection without committing the revised feed."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .about("Output status messages and per-row anomaly diagnostics during the run."),
        )
        .arg(
            Arg::new("dir")
                .long("dir")
                .env("GTFS_DIR")
                .takes_value(true)
                .required(true)
                .value_name("DIRECTORY")
                .about("The GTFS directory containing stop_times.txt and frequencies.txt."),
        )
        .arg(
            Arg::new("begin")
                .long("begin")
                .env("REFINEMENT_BEGIN")
                .takes_value(true)
                .required(true)
                .about("Start of the observation window, as YYYY-MM-DDTHH:MM:SS."),
        )
        .arg(
            Arg::new("end")
                .long("end")
                .env("REFINEMENT_END")
                .takes_value(true)
                .required(true)
                .about("End of the observation window (exclusive), as YYYY-MM-DDTHH:MM:SS."),
        )
        .arg(
            Arg::new("desired-fraction-early")
                .long("desired-fraction-early")
                .env("DESIRED_FRACTION_EARLY")
                .takes_value(true)
                .default_value("0.2")
                .about("Target fraction of filtered observations that should fall before the revised time."),
        )
        .arg(
            Arg::new("allowable-deviation-from-mean")
                .long("allowable-deviation-from-mean")
                .env("ALLOWABLE_DEVIATION_FROM_MEAN")
                .takes_value(true)
                .default_value("600")
                .about("Outlier band (seconds) around the running mean, applied in the first estimator pass."),
        )
        .arg(
            Arg::new("allowable-deviation-from-original")
                .long("allowable-deviation-from-original")
                .env("ALLOWABLE_DEVIATION_FROM_ORIGINAL")
                .takes_value(true)
                .default_value("900")
                .about("Outlier band (seconds) around the original schedule time, applied in the second estimator pass."),
        )
        .arg(
            Arg::new("allowable-early")
                .long("allowable-early")
                .env("ALLOWABLE_EARLY")
                .takes_value(true)
                .default_value("60")
                .about("Seconds before a reference time that still count as on time in the adherence report."),
        )
        .arg(
            Arg::new("allowable-late")
                .long("allowable-late")
                .env("ALLOWABLE_LATE")
                .takes_value(true)
                .default_value("300")
                .about("Seconds after a reference time that still count as on time in the adherence report."),
        )
        .arg(
            Arg::new("keep-first-stop")
                .long("keep-first-stop")
                .env("KEEP_FIRST_STOP")
                .takes_value(true)
                .default_value("true")
                .about("Never rewrite the first stop of a trip, keeping its original departure time."),
        )
        .arg(
            Arg::new("page-size")
                .long("page-size")
                .env("PAGE_SIZE")
                .takes_value(true)
                .default_value("500000")
                .about("Maximum observations fetched from the source per page."),
        )
        .arg(
            Arg::new("window-chunk-days")
                .long("window-chunk-days")
                .env("WINDOW_CHUNK_DAYS")
                .takes_value(true)
                .default_value("1")
                .about("Size, in days, of each ingestion sub-window."),
        )
        .arg(
            Arg::new("fit-iterations")
                .long("fit-iterations")
                .env("FIT_ITERATIONS")
                .takes_value(true)
                .default_value("5")
                .about("Bisection iterations used by the per-route sigma-multiplier fitter."),
        )
        .get_matches()
}

fn config_from_args(args: &ArgMatches) -> FnResult<RefinementConfig> {
    let mut config = RefinementConfig::default();
    config.gtfs_dir = args.value_of("dir").or_error("missing --dir")?.into();
    config.begin_time = parse_instant(args.value_of("begin").or_error("missing --begin")?)?;
    config.end_time = parse_instant(args.value_of("end").or_error("missing --end")?)?;
    config.desired_fraction_early = args
        .value_of("desired-fraction-early")
        .unwrap()
        .parse()
        .or_error("--desired-fraction-early must be a number")?;
    config.allowable_deviation_from_mean_sec = args
        .value_of("allowable-deviation-from-mean")
        .unwrap()
        .parse()
        .or_error("--allowable-deviation-from-mean must be an integer")?;
    config.allowable_deviation_from_original_sec = args
        .value_of("allowable-deviation-from-original")
        .unwrap()
        .parse()
        .or_error("--allowable-deviation-from-original must be an integer")?;
    config.allowable_early_sec = args
        .value_of("allowable-early")
        .unwrap()
        .parse()
        .or_error("--allowable-early must be an integer")?;
    config.allowable_late_sec = args
        .value_of("allowable-late")
        .unwrap()
        .parse()
        .or_error("--allowable-late must be an integer")?;
    config.do_not_update_first_stop_of_trip = args
        .value_of("keep-first-stop")
        .unwrap()
        .parse()
        .or_error("--keep-first-stop must be true or false")?;
    config.page_size = args
        .value_of("page-size")
        .unwrap()
        .parse()
        .or_error("--page-size must be a positive integer")?;
    config.window_chunk_days = args
        .value_of("window-chunk-days")
        .unwrap()
        .parse()
        .or_error("--window-chunk-days must be a positive integer")?;
    config.fit_iterations = args
        .value_of("fit-iterations")
        .unwrap()
        .parse()
        .or_error("--fit-iterations must be a positive integer")?;
    config.validate()?;
    Ok(config)
}

fn parse_instant(s: &str) -> FnResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| Box::new(ConfigError(format!("invalid timestamp {}: {}", s, e))) as Box<dyn Error>)
}

/// No production observation source ships with this crate; the engine is
/// deployed against whatever AVL store the agency already runs, by
/// implementing `ObservationSource` against it. This placeholder always
/// reports an empty window, useful only for exercising the CLI's
/// argument handling against a feed with no observation backend wired up
/// yet.
struct PlaceholderObservationSource;

impl PlaceholderObservationSource {
    fn new() -> Self {
        Self
    }
}

impl ObservationSource for PlaceholderObservationSource {
    fn fetch(
        &self,
        _window_start: NaiveDateTime,
        _window_end: NaiveDateTime,
        _kind: ObservationKind,
        _offset: usize,
        _limit: usize,
    ) -> FnResult<ObservationPage> {
        Ok(ObservationPage {
            observations: Vec::<Observation>::new(),
            is_last_page: true,
        })
    }
}
