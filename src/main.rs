use std::process;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fareleg::error::ScrapeError;
use fareleg::model::{self, FlightRecord, LegStatus};
use fareleg::orchestrate::{self, ScrapeOptions};
use fareleg::query::TripQuery;
use fareleg::session::{ChromeSessionProvider, SessionOptions};
use fareleg::table;

#[derive(Parser)]
#[command(
    name = "fareleg",
    about = "Plan multi-leg flight trips and scrape Google Flights prices",
    version,
    after_help = "\
Examples:
  fareleg search JFK IST 2026-03-01
  fareleg search JFK IST 2026-03-01 2026-03-10
  fareleg search JFK CDG 2026-03-01 CDG IST 2026-03-05
  fareleg search JFK 2026-03-01 CDG 2026-03-05 IST
  fareleg search JFK IST 2026-03-01 --json --pretty
  fareleg search JFK IST 2026-03-01 --url"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    #[command(
        about = "Search flight prices for a trip",
        long_about = "Search flight prices for a trip described as a flat token list.\n\
            3 tokens is a one-way (FROM TO DATE); 4 is a round-trip (FROM TO LEAVE RETURN);\n\
            a multiple of 3 ending in a date is a chain of (FROM TO DATE) triples;\n\
            an odd count ending in an airport code is a perfect chain of (CODE DATE)\n\
            pairs closed by the final destination code.",
        after_help = "\
Examples:
  One-way:        fareleg search JFK IST 2026-03-01
  Round-trip:     fareleg search JFK IST 2026-03-01 2026-03-10
  Chain:          fareleg search JFK CDG 2026-03-01 CDG IST 2026-03-05
  Perfect chain:  fareleg search JFK 2026-03-01 CDG 2026-03-05 IST
  URLs only:      fareleg search JFK IST 2026-03-01 --url"
    )]
    Search(SearchArgs),
}

#[derive(clap::Args)]
struct SearchArgs {
    #[arg(
        value_name = "TOKEN",
        num_args = 3..,
        help = "Airport codes and YYYY-MM-DD dates describing the trip"
    )]
    tokens: Vec<String>,

    #[arg(long, help = "Print per-leg search URLs and exit (no browser)")]
    url: bool,

    #[arg(long, help = "Output as JSON")]
    json: bool,

    #[arg(long, help = "Output as pretty-printed JSON")]
    pretty: bool,

    #[arg(long, help = "One-line-per-offer output (for scripts)")]
    compact: bool,

    #[arg(long, help = "Keep parsed-but-empty placeholder offers in the output")]
    keep_placeholders: bool,

    #[arg(
        long,
        default_value = "1",
        value_name = "SECS",
        help = "Fixed sleep between content polls"
    )]
    poll_interval: u64,

    #[arg(
        long,
        default_value = "20",
        value_name = "N",
        help = "Content poll attempts before a leg times out"
    )]
    max_attempts: u32,

    #[arg(
        long,
        default_value = "100",
        value_name = "N",
        help = "Visible line count a page must exceed to count as rendered"
    )]
    min_lines: usize,

    #[arg(
        long,
        value_name = "SECS",
        help = "Pacing delay between leg fetches (rate limiting)"
    )]
    delay: Option<u64>,

    #[arg(
        long,
        default_value = "30",
        value_name = "SECS",
        help = "Browser navigation timeout"
    )]
    timeout: u64,

    #[arg(long, help = "Run the browser with a visible window")]
    headful: bool,
}

fn is_json(args: &SearchArgs) -> bool {
    args.json || args.pretty
}

fn error_code(err: &ScrapeError) -> i32 {
    match err {
        ScrapeError::InvalidQueryShape(_)
        | ScrapeError::InvalidArgumentFormat { .. }
        | ScrapeError::DateOrderingViolation(_) => 2,
        ScrapeError::SessionInitFailure(_) => 3,
        ScrapeError::Navigation(_) => 4,
        ScrapeError::InsufficientContentTimeout { .. } => 5,
        ScrapeError::NoFlightDataFound => 0,
    }
}

fn error_kind(err: &ScrapeError) -> &'static str {
    match err {
        ScrapeError::InvalidQueryShape(_) => "invalid_query_shape",
        ScrapeError::InvalidArgumentFormat { .. } => "invalid_argument_format",
        ScrapeError::DateOrderingViolation(_) => "date_ordering_violation",
        ScrapeError::SessionInitFailure(_) => "session_init_failure",
        ScrapeError::Navigation(_) => "navigation_error",
        ScrapeError::InsufficientContentTimeout { .. } => "content_timeout",
        ScrapeError::NoFlightDataFound => "no_flight_data",
    }
}

fn die(err: &ScrapeError, json_mode: bool) -> ! {
    if json_mode {
        let json = serde_json::json!({
            "error": {
                "kind": error_kind(err),
                "message": err.to_string(),
            }
        });
        println!("{}", serde_json::to_string(&json).unwrap());
    } else {
        eprintln!("error: {err}");
    }
    process::exit(error_code(err));
}

fn print_compact(records: &[FlightRecord]) {
    for record in records {
        let price = table::format_price(record.price);
        let route = if record.origin.is_empty() {
            "—".to_string()
        } else {
            format!("{}>{}", record.origin, record.destination)
        };
        let stops = match record.stop_count {
            Some(0) => "nonstop".to_string(),
            Some(n) => format!("{n} stop"),
            None => "—".to_string(),
        };
        let times = match (record.departure_time, record.arrival_time) {
            (Some(d), Some(a)) => format!(
                "{}>{}",
                d.format("%b%d %H:%M"),
                a.format("%H:%M")
            ),
            _ => "—".to_string(),
        };
        println!(
            "{price} | {route} | {} | {stops} | {} | {times}",
            if record.duration.is_empty() { "—" } else { record.duration.as_str() },
            if record.airlines.is_empty() { "—" } else { record.airlines.as_str() },
        );
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Commands::Search(args) = cli.command;
    let json_mode = is_json(&args);

    let mut query = match TripQuery::from_tokens(&args.tokens) {
        Ok(q) => q,
        Err(e) => die(&e, json_mode),
    };

    if args.url {
        for url in &query.urls {
            println!("{url}");
        }
        return;
    }

    let options = ScrapeOptions {
        poll_interval: Duration::from_secs(args.poll_interval),
        max_poll_attempts: args.max_attempts,
        min_content_lines: args.min_lines,
        rate_limit_delay: args.delay.map(Duration::from_secs),
        ..ScrapeOptions::default()
    };

    let provider = ChromeSessionProvider {
        options: SessionOptions {
            headless: !args.headful,
            nav_timeout: Duration::from_secs(args.timeout),
        },
    };

    let report = match orchestrate::scrape_query(&mut query, &provider, &options) {
        Ok(report) => report,
        Err(e) => die(&e, json_mode),
    };

    let records = if args.keep_placeholders {
        query.results.clone()
    } else {
        model::without_placeholders(&query.results)
    };

    if json_mode {
        let output = serde_json::json!({
            "records": records,
            "report": report,
        });
        let text = if args.pretty {
            serde_json::to_string_pretty(&output).unwrap()
        } else {
            serde_json::to_string(&output).unwrap()
        };
        println!("{text}");
        return;
    }

    if args.compact {
        print_compact(&records);
    } else if records.is_empty() {
        println!("No flights found.");
    } else {
        println!("{}", table::render(&records));
    }

    for outcome in &report.legs {
        match &outcome.status {
            LegStatus::Scraped(_) => {}
            LegStatus::TimedOut => eprintln!(
                "warning: leg {} {}→{} on {} timed out",
                outcome.leg + 1,
                outcome.origin,
                outcome.destination,
                outcome.date
            ),
            LegStatus::NoData => eprintln!(
                "warning: leg {} {}→{} on {} returned no flight data",
                outcome.leg + 1,
                outcome.origin,
                outcome.destination,
                outcome.date
            ),
            LegStatus::Failed(reason) => eprintln!(
                "warning: leg {} {}→{} on {} failed: {reason}",
                outcome.leg + 1,
                outcome.origin,
                outcome.destination,
                outcome.date
            ),
        }
    }
}
