use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// One scraped offer. Every field is set at most once by the classifier;
/// tokens that match an already-filled field end up in `unclassified`.
#[derive(Debug, Clone, Serialize)]
pub struct FlightRecord {
    pub leg_date: NaiveDate,
    pub day_of_week: String,
    pub origin: String,
    pub destination: String,
    pub airlines: String,
    pub departure_time: Option<NaiveDateTime>,
    pub arrival_time: Option<NaiveDateTime>,
    pub duration: String,
    pub stop_count: Option<u32>,
    pub layover: Option<String>,
    pub co2_kg: Option<i64>,
    pub emissions_diff_pct: Option<i64>,
    pub price: Option<i64>,
    pub access_time: NaiveDateTime,
    pub unclassified: Vec<String>,
}

impl FlightRecord {
    pub fn new(leg_date: NaiveDate, access_time: NaiveDateTime) -> Self {
        Self {
            leg_date,
            day_of_week: leg_date.format("%A").to_string(),
            origin: String::new(),
            destination: String::new(),
            airlines: String::new(),
            departure_time: None,
            arrival_time: None,
            duration: String::new(),
            stop_count: None,
            layover: None,
            co2_kg: None,
            emissions_diff_pct: None,
            price: None,
            access_time,
            unclassified: Vec::new(),
        }
    }

    /// A parsed-but-empty offer. Emitted by the parser, filtered downstream.
    pub fn is_placeholder(&self) -> bool {
        self.price.is_none() && self.airlines.is_empty()
    }
}

pub fn without_placeholders(records: &[FlightRecord]) -> Vec<FlightRecord> {
    records
        .iter()
        .filter(|r| !r.is_placeholder())
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub enum LegStatus {
    Scraped(usize),
    TimedOut,
    NoData,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct LegOutcome {
    pub leg: usize,
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub status: LegStatus,
}

/// Per-leg outcomes of one orchestrator run, so callers can tell full success
/// from partial data from total failure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeReport {
    pub legs: Vec<LegOutcome>,
}

impl ScrapeReport {
    pub fn scraped_count(&self) -> usize {
        self.legs
            .iter()
            .map(|o| match o.status {
                LegStatus::Scraped(n) => n,
                _ => 0,
            })
            .sum()
    }

    pub fn failed_legs(&self) -> usize {
        self.legs
            .iter()
            .filter(|o| !matches!(o.status, LegStatus::Scraped(_)))
            .count()
    }
}
