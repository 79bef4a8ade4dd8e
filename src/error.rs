use std::fmt;

#[derive(Debug)]
pub enum ScrapeError {
    InvalidQueryShape(usize),
    InvalidArgumentFormat { position: usize, token: String },
    DateOrderingViolation(String),
    SessionInitFailure(String),
    Navigation(String),
    InsufficientContentTimeout { lines: usize, needed: usize },
    NoFlightDataFound,
}

impl fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidQueryShape(n) => write!(
                f,
                "cannot classify a {n}-token query — expected 3 tokens (one-way), \
                 4 (round-trip), a multiple of 3 ending in a date (chain), \
                 or an odd count ending in an airport code (perfect chain)"
            ),
            Self::InvalidArgumentFormat { position, token } => write!(
                f,
                "bad token \"{token}\" at position {position} — airport codes must be \
                 exactly 3 letters (e.g. JFK) and dates YYYY-MM-DD (e.g. 2026-03-01)"
            ),
            Self::DateOrderingViolation(detail) => write!(f, "{detail}"),
            Self::SessionInitFailure(detail) => write!(
                f,
                "could not start a browser session ({detail}) — is Chrome/Chromium \
                 installed and launchable?"
            ),
            Self::Navigation(detail) => write!(f, "browser navigation failed: {detail}"),
            Self::InsufficientContentTimeout { lines, needed } => write!(
                f,
                "page never rendered enough content ({lines} lines, needed {needed}) — \
                 Google may be slow, or served a consent/CAPTCHA page. \
                 Try raising --max-attempts or --poll-interval"
            ),
            Self::NoFlightDataFound => write!(
                f,
                "no flight data found on the rendered page — the route may have no \
                 service on that date, or the page layout changed"
            ),
        }
    }
}

impl std::error::Error for ScrapeError {}
