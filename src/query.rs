use chrono::NaiveDate;

use crate::error::ScrapeError;
use crate::model::FlightRecord;

/// One origin→destination search on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripKind {
    OneWay,
    RoundTrip,
    ChainTrip,
    PerfectChain,
}

/// An ordered collection of legs representing one logical trip. `kind` and
/// `urls` are derived at construction and never change; `results` is filled
/// by the orchestrator (cleared and refilled on a rerun, never appended to).
#[derive(Debug, Clone)]
pub struct TripQuery {
    pub legs: Vec<Leg>,
    pub kind: TripKind,
    pub urls: Vec<String>,
    pub results: Vec<FlightRecord>,
}

const BASE_URL: &str = "https://www.google.com/travel/flights";

/// Deterministic per-leg fetch URL. Infallible on validated legs.
pub fn search_url(origin: &str, destination: &str, date: NaiveDate) -> String {
    format!(
        "{BASE_URL}?hl=en&q=Flights%20to%20{destination}%20from%20{origin}%20on%20{date}%20oneway"
    )
}

fn is_code(token: &str) -> bool {
    token.len() == 3 && token.chars().all(|c| c.is_ascii_alphabetic())
}

fn normalize_code(token: &str, position: usize) -> Result<String, ScrapeError> {
    if !is_code(token) {
        return Err(ScrapeError::InvalidArgumentFormat {
            position,
            token: token.to_string(),
        });
    }
    Ok(token.to_ascii_uppercase())
}

fn parse_date(token: &str, position: usize) -> Result<NaiveDate, ScrapeError> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d").map_err(|_| {
        ScrapeError::InvalidArgumentFormat {
            position,
            token: token.to_string(),
        }
    })
}

fn ensure_increasing(legs: &[Leg]) -> Result<(), ScrapeError> {
    for pair in legs.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(ScrapeError::DateOrderingViolation(format!(
                "leg dates must be strictly increasing: {} ({} → {}) is not after {}",
                pair[1].date, pair[1].origin, pair[1].destination, pair[0].date
            )));
        }
    }
    Ok(())
}

impl TripQuery {
    fn assemble(legs: Vec<Leg>, kind: TripKind) -> Self {
        let urls = legs
            .iter()
            .map(|l| search_url(&l.origin, &l.destination, l.date))
            .collect();
        Self {
            legs,
            kind,
            urls,
            results: Vec::new(),
        }
    }

    pub fn one_way(origin: &str, destination: &str, date: NaiveDate) -> Result<Self, ScrapeError> {
        let leg = Leg {
            origin: normalize_code(origin, 1)?,
            destination: normalize_code(destination, 2)?,
            date,
        };
        Ok(Self::assemble(vec![leg], TripKind::OneWay))
    }

    pub fn round_trip(
        origin: &str,
        destination: &str,
        leave: NaiveDate,
        ret: NaiveDate,
    ) -> Result<Self, ScrapeError> {
        let origin = normalize_code(origin, 1)?;
        let destination = normalize_code(destination, 2)?;
        if ret <= leave {
            return Err(ScrapeError::DateOrderingViolation(format!(
                "return date {ret} is not after leave date {leave}"
            )));
        }
        let legs = vec![
            Leg {
                origin: origin.clone(),
                destination: destination.clone(),
                date: leave,
            },
            Leg {
                origin: destination,
                destination: origin,
                date: ret,
            },
        ];
        Ok(Self::assemble(legs, TripKind::RoundTrip))
    }

    pub fn chain(legs: &[(&str, &str, NaiveDate)]) -> Result<Self, ScrapeError> {
        if legs.is_empty() {
            return Err(ScrapeError::InvalidQueryShape(0));
        }
        let mut out = Vec::with_capacity(legs.len());
        for (i, (origin, destination, date)) in legs.iter().enumerate() {
            out.push(Leg {
                origin: normalize_code(origin, 3 * i + 1)?,
                destination: normalize_code(destination, 3 * i + 2)?,
                date: *date,
            });
        }
        ensure_increasing(&out)?;
        Ok(Self::assemble(out, TripKind::ChainTrip))
    }

    /// Chained itinerary: each stop's code is both the previous leg's
    /// destination and the next leg's origin.
    pub fn perfect_chain(
        stops: &[(&str, NaiveDate)],
        final_destination: &str,
    ) -> Result<Self, ScrapeError> {
        if stops.is_empty() {
            return Err(ScrapeError::InvalidQueryShape(1));
        }
        let mut codes = Vec::with_capacity(stops.len() + 1);
        for (i, (code, _)) in stops.iter().enumerate() {
            codes.push(normalize_code(code, 2 * i + 1)?);
        }
        codes.push(normalize_code(final_destination, 2 * stops.len() + 1)?);

        let legs: Vec<Leg> = stops
            .iter()
            .enumerate()
            .map(|(i, (_, date))| Leg {
                origin: codes[i].clone(),
                destination: codes[i + 1].clone(),
                date: *date,
            })
            .collect();
        ensure_increasing(&legs)?;
        Ok(Self::assemble(legs, TripKind::PerfectChain))
    }

    /// Classify a flat token list into one of the four trip shapes and
    /// delegate to the matching typed constructor.
    ///
    /// | token list | shape |
    /// |---|---|
    /// | exactly 3 | one-way |
    /// | exactly 4 | round-trip |
    /// | multiple of 3, last token a date | chain |
    /// | odd length ≥ 5, last token a code | perfect chain |
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Self, ScrapeError> {
        let toks: Vec<&str> = tokens.iter().map(|s| s.as_ref().trim()).collect();
        let n = toks.len();

        match n {
            3 => Self::one_way(toks[0], toks[1], parse_date(toks[2], 3)?),
            4 => Self::round_trip(
                toks[0],
                toks[1],
                parse_date(toks[2], 3)?,
                parse_date(toks[3], 4)?,
            ),
            _ if n >= 6 && n % 3 == 0 && parse_date(toks[n - 1], n).is_ok() => {
                let mut legs = Vec::with_capacity(n / 3);
                for (i, triple) in toks.chunks(3).enumerate() {
                    legs.push((triple[0], triple[1], parse_date(triple[2], 3 * i + 3)?));
                }
                Self::chain(&legs)
            }
            _ if n >= 5 && n % 2 == 1 && is_code(toks[n - 1]) => {
                let mut stops = Vec::with_capacity(n / 2);
                for (i, pair) in toks[..n - 1].chunks(2).enumerate() {
                    stops.push((pair[0], parse_date(pair[1], 2 * i + 2)?));
                }
                Self::perfect_chain(&stops, toks[n - 1])
            }
            _ => Err(ScrapeError::InvalidQueryShape(n)),
        }
    }
}
