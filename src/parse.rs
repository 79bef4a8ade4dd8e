//! Side-effect free parsing of a rendered results page into flight records.
//!
//! Works on the page's visible text: heuristically-identified time markers
//! segment the line stream into per-offer windows, and a pure reducer folds
//! each window's tokens into a partially-filled record.

use std::collections::HashSet;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::ScrapeError;
use crate::model::FlightRecord;

static CO2_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+) kg CO2e?$").unwrap());

/// Boilerplate phrases the results page interleaves with offer data.
/// Injectable so callers can extend the set when Google reshuffles copy.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub boilerplate: HashSet<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        let boilerplate = [
            "Price insights",
            "Prices are currently",
            "Other departing flights",
            "Other flights",
            "View more flights",
            "View price history",
            "Separate tickets booked together",
            "Self transfer",
            "Change of airport",
            "Missed connections may not be protected",
            "Sort by",
            "Carbon emissions estimate",
            "Avg CO2 emissions",
            "is the equivalent of",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        Self { boilerplate }
    }
}

impl ParserConfig {
    fn is_boilerplate(&self, token: &str) -> bool {
        self.boilerplate.iter().any(|p| token.starts_with(p.as_str()))
    }
}

fn ends_in_meridiem(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    lower.ends_with("am") || lower.ends_with("pm")
}

fn ends_in_day_offset(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 2 && b[b.len() - 1].is_ascii_digit() && b[b.len() - 2] == b'+'
}

/// A line believed to be a departure or arrival clock time.
fn is_time_token(line: &str) -> bool {
    line.len() > 2 && line.contains(':') && (ends_in_meridiem(line) || ends_in_day_offset(line))
}

/// Split a `+<digit>` day-offset suffix off a time token, if present.
fn split_day_offset(token: &str) -> (&str, u64) {
    if ends_in_day_offset(token) {
        let (body, suffix) = token.split_at(token.len() - 2);
        let days = suffix[1..].parse().unwrap_or(0);
        (body, days)
    } else {
        (token, 0)
    }
}

/// 12-hour clock parse, tolerant of upper/lower-case meridiem markers and a
/// missing space before them. Resolved against the leg date plus day offset.
fn parse_clock(token: &str, leg_date: NaiveDate) -> Option<NaiveDateTime> {
    let (body, offset_days) = split_day_offset(token);
    let lower = body.trim().to_ascii_lowercase();

    let (hm, meridiem) = if let Some(rest) = lower.strip_suffix("pm") {
        (rest.trim_end(), Some(true))
    } else if let Some(rest) = lower.strip_suffix("am") {
        (rest.trim_end(), Some(false))
    } else {
        (lower.as_str(), None)
    };

    let (h, m) = hm.split_once(':')?;
    let hour: u32 = h.trim().parse().ok()?;
    let minute: u32 = m.trim().parse().ok()?;
    let hour = match meridiem {
        Some(true) if hour != 12 => hour + 12,
        Some(false) if hour == 12 => 0,
        _ => hour,
    };

    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let date = leg_date.checked_add_days(Days::new(offset_days))?;
    Some(date.and_time(time))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerRole {
    Arrival,
}

/// Structural role of a time marker, when the text itself reveals it. A
/// `+<digit>` day-offset suffix only ever appears on arrivals.
fn marker_role(line: &str) -> Option<MarkerRole> {
    if ends_in_day_offset(line) {
        Some(MarkerRole::Arrival)
    } else {
        None
    }
}

/// Pick the departure markers out of the full marker sequence.
///
/// The page interleaves one departure and one arrival marker per offer, so
/// the fallback is parity: every other marker is a departure. A marker the
/// text tags as an arrival landing in a departure slot signals misalignment;
/// it is skipped and the alternation resynced rather than silently shifting
/// every later window.
fn departure_markers(markers: &[usize], lines: &[&str]) -> Vec<usize> {
    let mut departures = Vec::new();
    let mut expect_departure = true;
    for &idx in markers {
        if expect_departure {
            if marker_role(lines[idx]) == Some(MarkerRole::Arrival) {
                warn!(line = lines[idx], "arrival marker in a departure slot, resyncing");
                continue;
            }
            departures.push(idx);
            expect_departure = false;
        } else {
            expect_departure = true;
        }
    }
    departures
}

fn is_all_uppercase(s: &str) -> bool {
    let mut saw_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if c.is_lowercase() {
                return false;
            }
            saw_alpha = true;
        }
    }
    saw_alpha
}

fn ends_in_airport_code(s: &str) -> bool {
    s.len() >= 3
        && s.chars()
            .rev()
            .take(3)
            .all(|c| c.is_ascii_uppercase())
}

fn digits_only(s: &str) -> Option<i64> {
    let cleaned: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if cleaned.is_empty() {
        None
    } else {
        cleaned.parse().ok()
    }
}

fn is_emissions_fragment(token: &str) -> bool {
    token.contains("CO2") || token.eq_ignore_ascii_case("avg")
        || token.to_ascii_lowercase().contains("emission")
}

/// Partially-filled record threaded through the token fold.
#[derive(Debug, Clone, Default)]
struct Draft {
    departure: Option<NaiveDateTime>,
    arrival: Option<NaiveDateTime>,
    duration: Option<String>,
    stops: Option<u32>,
    co2_kg: Option<i64>,
    emissions_diff_pct: Option<i64>,
    price: Option<i64>,
    route: Option<(String, String)>,
    layover: Option<String>,
    airlines: Vec<String>,
    unclassified: Vec<String>,
}

impl Draft {
    fn unclassify(mut self, token: &str) -> Self {
        self.unclassified.push(token.to_string());
        self
    }
}

/// One classification step: first matching rule wins, and a token whose rule's
/// field is already filled is discarded into `unclassified`, never overwritten.
fn classify(mut draft: Draft, token: &str, leg_date: NaiveDate, config: &ParserConfig) -> Draft {
    if token.is_empty() {
        return draft;
    }
    let lower = token.to_ascii_lowercase();

    // 1. clock times: first is the departure, second the arrival
    if is_time_token(token) {
        if draft.departure.is_some() && draft.arrival.is_some() {
            return draft.unclassify(token);
        }
        return match parse_clock(token, leg_date) {
            Some(dt) => {
                if draft.departure.is_none() {
                    draft.departure = Some(dt);
                } else {
                    draft.arrival = Some(dt);
                }
                draft
            }
            None => {
                debug!(token, "unparseable time token");
                draft.unclassify(token)
            }
        };
    }

    // 2. flight duration, kept as display text
    let duration_like = lower.contains("hr") || lower.contains("min");
    if duration_like && draft.duration.is_none() {
        draft.duration = Some(token.to_string());
        return draft;
    }
    // a later "hr" token falls through: it may be a layover description

    // 3. stop count
    if lower.contains("stop") {
        if draft.stops.is_some() {
            return draft.unclassify(token);
        }
        if lower.contains("nonstop") {
            draft.stops = Some(0);
            return draft;
        }
        return match token.split_whitespace().next().and_then(|n| n.parse().ok()) {
            Some(n) => {
                draft.stops = Some(n);
                draft
            }
            None => {
                debug!(token, "unparseable stop count");
                draft.unclassify(token)
            }
        };
    }

    // 4. CO2 mass
    if let Some(caps) = CO2_RE.captures(token) {
        if draft.co2_kg.is_some() {
            return draft.unclassify(token);
        }
        draft.co2_kg = caps[1].parse().ok();
        return draft;
    }

    // 5. emissions delta; the literal "Avg" maps to 0
    if lower.ends_with("emissions") {
        if draft.emissions_diff_pct.is_some() {
            return draft.unclassify(token);
        }
        let value = token[..token.len() - "emissions".len()].trim();
        if value.eq_ignore_ascii_case("avg") {
            draft.emissions_diff_pct = Some(0);
            return draft;
        }
        return match value.trim_end_matches('%').parse() {
            Ok(pct) => {
                draft.emissions_diff_pct = Some(pct);
                draft
            }
            Err(_) => {
                debug!(token, "unparseable emissions delta");
                draft.unclassify(token)
            }
        };
    }

    // 6. price; a bare number is only trusted once the duration gave context
    if token.contains('$') {
        if draft.price.is_some() {
            return draft.unclassify(token);
        }
        return match digits_only(token) {
            Some(price) => {
                draft.price = Some(price);
                draft
            }
            None => draft.unclassify(token),
        };
    }
    if draft.price.is_none()
        && draft.duration.is_some()
        && !token.is_empty()
        && token.chars().all(|c| c.is_ascii_digit())
    {
        draft.price = token.parse().ok();
        return draft;
    }

    // 7. fused origin/destination pair, e.g. "JFKIST"
    if token.len() == 6 && token.chars().all(|c| c.is_ascii_uppercase()) {
        if draft.route.is_some() {
            return draft.unclassify(token);
        }
        let (origin, destination) = token.split_at(3);
        draft.route = Some((origin.to_string(), destination.to_string()));
        return draft;
    }

    // 8. layover description; a nonstop flight cannot have one
    if draft.stops != Some(0)
        && ((lower.contains("hr") && ends_in_airport_code(token))
            || (token.contains(',') && is_all_uppercase(token)))
    {
        if draft.layover.is_some() {
            return draft.unclassify(token);
        }
        draft.layover = Some(token.to_string());
        return draft;
    }

    // 9. anything left that isn't boilerplate or stray structured data is
    //    airline copy
    if !duration_like
        && !token.chars().all(|c| c.is_ascii_digit())
        && !config.is_boilerplate(token)
        && !is_emissions_fragment(token)
    {
        let name = token.split("Operated").next().unwrap_or(token).trim();
        if !name.is_empty() {
            for part in name.split(',') {
                let part = part.trim();
                if !part.is_empty() {
                    draft.airlines.push(part.to_string());
                }
            }
            return draft;
        }
    }

    draft.unclassify(token)
}

impl Draft {
    fn into_record(mut self, leg_date: NaiveDate, access_time: NaiveDateTime) -> FlightRecord {
        // a layover-shaped token can precede the Nonstop token in the window;
        // a nonstop flight never has one, so demote it instead of keeping it
        if self.stops == Some(0) {
            if let Some(layover) = self.layover.take() {
                self.unclassified.push(layover);
            }
        }

        let mut record = FlightRecord::new(leg_date, access_time);
        if let Some((origin, destination)) = self.route {
            record.origin = origin;
            record.destination = destination;
        }
        record.airlines = self.airlines.join(", ");
        record.departure_time = self.departure;
        record.arrival_time = self.arrival;
        record.duration = self.duration.unwrap_or_default();
        record.stop_count = self.stops;
        record.layover = self.layover;
        record.co2_kg = self.co2_kg;
        record.emissions_diff_pct = self.emissions_diff_pct;
        record.price = self.price;
        record.unclassified = self.unclassified;
        record
    }
}

/// Fold one offer window's tokens into a record. Never fails: malformed
/// tokens leave their field unset and land in `unclassified`.
pub fn parse_offer(
    tokens: &[&str],
    leg_date: NaiveDate,
    access_time: NaiveDateTime,
    config: &ParserConfig,
) -> FlightRecord {
    tokens
        .iter()
        .fold(Draft::default(), |draft, token| {
            classify(draft, token.trim(), leg_date, config)
        })
        .into_record(leg_date, access_time)
}

/// Parse one leg's rendered lines into records, one per offer window.
///
/// A marker-free page is `NoFlightDataFound` so the caller can tell "no
/// flights" from "parser broke"; a single marker yields no offers.
pub fn parse_lines(
    lines: &[&str],
    leg_date: NaiveDate,
    config: &ParserConfig,
) -> Result<Vec<FlightRecord>, ScrapeError> {
    let markers: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| is_time_token(line))
        .map(|(i, _)| i)
        .collect();

    if markers.is_empty() {
        return Err(ScrapeError::NoFlightDataFound);
    }
    if markers.len() == 1 {
        warn!("only one time marker on the page, no complete offer windows");
        return Ok(Vec::new());
    }

    let departures = departure_markers(&markers, lines);
    let access_time = Utc::now().naive_utc();

    // the final departure marker has no successor, so N departures yield N-1 offers
    let records = departures
        .windows(2)
        .map(|bounds| parse_offer(&lines[bounds[0]..bounds[1]], leg_date, access_time, config))
        .collect();
    Ok(records)
}

/// Split a page's visible text into trimmed, non-empty lines with control
/// characters and non-breaking spaces normalized away.
pub fn visible_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.chars()
                .map(|c| if c == '\u{a0}' { ' ' } else { c })
                .filter(|c| !c.is_control() && *c != '\u{200b}')
                .collect::<String>()
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Convenience wrapper: raw page text in, records out.
pub fn parse_page(
    text: &str,
    leg_date: NaiveDate,
    config: &ParserConfig,
) -> Result<Vec<FlightRecord>, ScrapeError> {
    let lines = visible_lines(text);
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    parse_lines(&refs, leg_date, config)
}
