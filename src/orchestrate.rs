//! Per-leg scrape state machine: Navigate → WaitForContent → Extract →
//! Parse → Append, strictly in leg order on one browser session.
//!
//! A leg's failure never closes the session or aborts the legs after it;
//! only session acquisition failure is fatal to a query.

use std::ops::{Deref, DerefMut};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::model::{FlightRecord, LegOutcome, LegStatus, ScrapeReport};
use crate::parse::{self, ParserConfig};
use crate::query::{Leg, TripQuery};
use crate::session::{BrowserSession, SessionProvider};

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    /// Fixed sleep between content polls. No backoff.
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    /// A page counts as rendered once its visible line count exceeds this.
    pub min_content_lines: usize,
    /// Optional pacing pause between leg fetches. No semantic effect.
    pub rate_limit_delay: Option<Duration>,
    pub parser: ParserConfig,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 20,
            min_content_lines: 100,
            rate_limit_delay: None,
            parser: ParserConfig::default(),
        }
    }
}

/// Scoped session ownership: `close` runs on every exit path, including
/// panics, so browser processes never leak.
struct SessionGuard<S: BrowserSession>(S);

impl<S: BrowserSession> Deref for SessionGuard<S> {
    type Target = S;
    fn deref(&self) -> &S {
        &self.0
    }
}

impl<S: BrowserSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.0
    }
}

impl<S: BrowserSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.0.close();
    }
}

fn wait_for_content<S: BrowserSession>(
    session: &mut S,
    options: &ScrapeOptions,
) -> Result<Vec<String>, ScrapeError> {
    let mut seen = 0;
    for attempt in 1..=options.max_poll_attempts {
        if attempt > 1 {
            thread::sleep(options.poll_interval);
        }
        // a transient read error counts as a below-threshold poll, not an abort
        match session.body_text() {
            Ok(text) => {
                let lines = parse::visible_lines(&text);
                if lines.len() > options.min_content_lines {
                    return Ok(lines);
                }
                seen = lines.len();
                debug!(attempt, lines = seen, "content below threshold, polling again");
            }
            Err(e) => {
                debug!(attempt, error = %e, "page read failed, polling again");
            }
        }
    }
    Err(ScrapeError::InsufficientContentTimeout {
        lines: seen,
        needed: options.min_content_lines,
    })
}

fn scrape_leg<S: BrowserSession>(
    session: &mut S,
    leg: &Leg,
    url: &str,
    options: &ScrapeOptions,
) -> Result<Vec<FlightRecord>, ScrapeError> {
    session.navigate(url)?;
    let lines = wait_for_content(session, options)?;
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    parse::parse_lines(&refs, leg.date, &options.parser)
}

/// Run every leg of `query` against an already-acquired session. Results are
/// overwritten, never appended across runs, so retrying a query is safe.
pub fn scrape_trip<S: BrowserSession>(
    query: &mut TripQuery,
    session: S,
    options: &ScrapeOptions,
) -> ScrapeReport {
    let mut session = SessionGuard(session);
    query.results.clear();

    let mut report = ScrapeReport::default();
    let legs = query.legs.clone();
    let urls = query.urls.clone();

    for (i, (leg, url)) in legs.iter().zip(&urls).enumerate() {
        if i > 0 {
            if let Some(delay) = options.rate_limit_delay {
                thread::sleep(delay);
            }
        }

        let status = match scrape_leg(&mut *session, leg, url, options) {
            Ok(records) => {
                info!(
                    origin = %leg.origin,
                    destination = %leg.destination,
                    date = %leg.date,
                    records = records.len(),
                    "leg scraped"
                );
                let n = records.len();
                query.results.extend(records);
                LegStatus::Scraped(n)
            }
            Err(ScrapeError::NoFlightDataFound) => {
                warn!(
                    origin = %leg.origin,
                    destination = %leg.destination,
                    date = %leg.date,
                    "no flight data on page"
                );
                LegStatus::NoData
            }
            Err(e @ ScrapeError::InsufficientContentTimeout { .. }) => {
                warn!(
                    origin = %leg.origin,
                    destination = %leg.destination,
                    date = %leg.date,
                    error = %e,
                    "leg timed out"
                );
                LegStatus::TimedOut
            }
            Err(e) => {
                warn!(
                    origin = %leg.origin,
                    destination = %leg.destination,
                    date = %leg.date,
                    error = %e,
                    "leg failed"
                );
                LegStatus::Failed(e.to_string())
            }
        };

        report.legs.push(LegOutcome {
            leg: i,
            origin: leg.origin.clone(),
            destination: leg.destination.clone(),
            date: leg.date,
            status,
        });
    }

    report
}

/// Acquire a session for `query` and scrape all its legs. Acquisition failure
/// aborts the query before any leg is attempted; RAII guarantees nothing
/// survives a partial acquisition.
pub fn scrape_query<P: SessionProvider>(
    query: &mut TripQuery,
    provider: &P,
    options: &ScrapeOptions,
) -> Result<ScrapeReport, ScrapeError> {
    let session = provider.acquire()?;
    Ok(scrape_trip(query, session, options))
}

/// Batch mode: queries back-to-back, one fresh session per query. A failed
/// query does not stop the ones after it.
pub fn scrape_all<P: SessionProvider>(
    queries: &mut [TripQuery],
    provider: &P,
    options: &ScrapeOptions,
) -> Vec<Result<ScrapeReport, ScrapeError>> {
    queries
        .iter_mut()
        .map(|query| scrape_query(query, provider, options))
        .collect()
}
