use chrono::{NaiveDate, NaiveDateTime};

use fareleg::error::ScrapeError;
use fareleg::parse::{parse_lines, parse_offer, visible_lines, ParserConfig};

fn leg_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
}

fn access() -> NaiveDateTime {
    leg_date().and_hms_opt(12, 0, 0).unwrap()
}

fn offer(tokens: &[&str]) -> fareleg::model::FlightRecord {
    parse_offer(tokens, leg_date(), access(), &ParserConfig::default())
}

#[test]
fn classifies_a_full_offer_window() {
    let record = offer(&[
        "9:00AM",
        "5:00PM+1",
        "8 hr 0 min",
        "Nonstop",
        "150 kg CO2",
        "10% emissions",
        "$450",
        "JFKIST",
    ]);

    assert_eq!(record.origin, "JFK");
    assert_eq!(record.destination, "IST");
    assert_eq!(record.stop_count, Some(0));
    assert_eq!(record.co2_kg, Some(150));
    assert_eq!(record.emissions_diff_pct, Some(10));
    assert_eq!(record.price, Some(450));
    assert_eq!(record.duration, "8 hr 0 min");

    let dep = record.departure_time.unwrap();
    let arr = record.arrival_time.unwrap();
    assert_eq!(dep, leg_date().and_hms_opt(9, 0, 0).unwrap());
    assert_eq!(arr.date(), leg_date().succ_opt().unwrap());
    assert_eq!(arr.time(), chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap());
}

#[test]
fn classification_is_idempotent() {
    let tokens = [
        "9:00AM", "5:00PM+1", "Turkish Airlines", "8 hr 0 min", "Nonstop", "JFKIST", "$450",
    ];
    let a = serde_json::to_value(offer(&tokens)).unwrap();
    let b = serde_json::to_value(offer(&tokens)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn day_of_week_derives_from_leg_date() {
    let record = offer(&["$450"]);
    // 2026-03-01 is a Sunday
    assert_eq!(record.day_of_week, "Sunday");
}

#[test]
fn twelve_hour_clock_edge_cases() {
    let record = offer(&["12:05am", "12:30PM"]);
    assert_eq!(
        record.departure_time.unwrap().time(),
        chrono::NaiveTime::from_hms_opt(0, 5, 0).unwrap()
    );
    assert_eq!(
        record.arrival_time.unwrap().time(),
        chrono::NaiveTime::from_hms_opt(12, 30, 0).unwrap()
    );
}

#[test]
fn unparseable_time_leaves_field_unset() {
    let record = offer(&["99:99AM", "$450"]);
    assert!(record.departure_time.is_none());
    assert_eq!(record.price, Some(450));
    assert!(record.unclassified.contains(&"99:99AM".to_string()));
}

#[test]
fn price_strips_commas() {
    let record = offer(&["$1,245"]);
    assert_eq!(record.price, Some(1245));
}

#[test]
fn bare_number_is_price_only_after_duration() {
    let with_context = offer(&["8 hr 0 min", "450"]);
    assert_eq!(with_context.price, Some(450));

    let without_context = offer(&["450", "8 hr 0 min"]);
    assert_eq!(without_context.price, None);
    assert!(without_context.unclassified.contains(&"450".to_string()));
}

#[test]
fn dollar_price_wins_over_fallback() {
    let record = offer(&["8 hr 0 min", "$450", "999"]);
    assert_eq!(record.price, Some(450));
}

#[test]
fn first_match_wins_and_duplicates_are_unclassified() {
    let record = offer(&["$450", "$999"]);
    assert_eq!(record.price, Some(450));
    assert!(record.unclassified.contains(&"$999".to_string()));

    let record = offer(&["JFKIST", "CDGATH"]);
    assert_eq!(record.origin, "JFK");
    assert!(record.unclassified.contains(&"CDGATH".to_string()));
}

#[test]
fn stop_count_parses_leading_integer() {
    assert_eq!(offer(&["2 stops"]).stop_count, Some(2));
    assert_eq!(offer(&["Nonstop"]).stop_count, Some(0));
}

#[test]
fn layover_description_after_duration() {
    let record = offer(&["10 hr 15 min", "1 stop", "2 hr 10 min FRA"]);
    assert_eq!(record.duration, "10 hr 15 min");
    assert_eq!(record.stop_count, Some(1));
    assert_eq!(record.layover.as_deref(), Some("2 hr 10 min FRA"));
}

#[test]
fn nonstop_never_gets_a_layover() {
    let record = offer(&["8 hr 0 min", "Nonstop", "2 hr 10 min FRA"]);
    assert_eq!(record.stop_count, Some(0));
    assert!(record.layover.is_none());
}

#[test]
fn layover_before_nonstop_is_demoted() {
    // the layover-shaped token arrives while the stop count is still unknown
    let record = offer(&["8 hr 0 min", "2 hr 10 min FRA", "Nonstop"]);
    assert_eq!(record.stop_count, Some(0));
    assert!(record.layover.is_none());
    assert!(record.unclassified.contains(&"2 hr 10 min FRA".to_string()));
}

#[test]
fn uppercase_comma_list_is_a_layover() {
    let record = offer(&["10 hr 15 min", "1 stop", "FRA, MUC"]);
    assert_eq!(record.layover.as_deref(), Some("FRA, MUC"));
}

#[test]
fn emissions_avg_maps_to_zero() {
    assert_eq!(offer(&["Avg emissions"]).emissions_diff_pct, Some(0));
    assert_eq!(offer(&["+15% emissions"]).emissions_diff_pct, Some(15));
    assert_eq!(offer(&["-8% emissions"]).emissions_diff_pct, Some(-8));
}

#[test]
fn co2_accepts_equivalent_suffix() {
    assert_eq!(offer(&["150 kg CO2"]).co2_kg, Some(150));
    assert_eq!(offer(&["203 kg CO2e"]).co2_kg, Some(203));
}

#[test]
fn airlines_join_and_strip_operated() {
    let record = offer(&["Lufthansa, United"]);
    assert_eq!(record.airlines, "Lufthansa, United");

    let record = offer(&["SWISSOperated by Helvetic"]);
    assert_eq!(record.airlines, "SWISS");
}

#[test]
fn boilerplate_never_becomes_an_airline() {
    let record = offer(&[
        "9:00AM",
        "5:00PM",
        "Separate tickets booked together",
        "Change of airport",
        "Other departing flights",
        "Avg CO2 emissions",
    ]);
    assert!(record.airlines.is_empty());
    assert!(record.is_placeholder());
}

#[test]
fn custom_boilerplate_is_injectable() {
    let mut config = ParserConfig::default();
    config.boilerplate.insert("Seaplane terminal notice".to_string());
    let record = parse_offer(
        &["Seaplane terminal notice"],
        leg_date(),
        access(),
        &config,
    );
    assert!(record.airlines.is_empty());
}

fn sample_page() -> Vec<&'static str> {
    vec![
        "Top departing flights",
        "9:00AM",
        "5:00PM+1",
        "Turkish Airlines",
        "8 hr 0 min",
        "Nonstop",
        "JFKIST",
        "150 kg CO2",
        "10% emissions",
        "$450",
        "11:30AM",
        "8:45PM+1",
        "Lufthansa, United",
        "10 hr 15 min",
        "1 stop",
        "2 hr 10 min FRA",
        "JFKIST",
        "220 kg CO2",
        "+15% emissions",
        "$510",
        "7:00PM",
    ]
}

#[test]
fn segmentation_yields_one_offer_per_departure_pair() {
    let records = parse_lines(&sample_page(), leg_date(), &ParserConfig::default()).unwrap();
    // three departure markers, so two complete windows
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].price, Some(450));
    assert_eq!(records[0].airlines, "Turkish Airlines");
    assert_eq!(records[1].price, Some(510));
    assert_eq!(records[1].layover.as_deref(), Some("2 hr 10 min FRA"));
    assert_eq!(records[1].stop_count, Some(1));
}

#[test]
fn marker_free_page_is_a_distinct_condition() {
    let lines = vec!["Top departing flights", "Prices are currently low"];
    let err = parse_lines(&lines, leg_date(), &ParserConfig::default()).unwrap_err();
    assert!(matches!(err, ScrapeError::NoFlightDataFound));
}

#[test]
fn single_marker_yields_no_offers() {
    let lines = vec!["9:00AM", "Turkish Airlines"];
    let records = parse_lines(&lines, leg_date(), &ParserConfig::default()).unwrap();
    assert!(records.is_empty());
}

#[test]
fn stray_arrival_marker_resyncs_instead_of_shifting_windows() {
    // an arrival-tagged marker leads the sequence; parity alone would treat
    // it as a departure and misalign every window after it
    let lines = vec![
        "5:00PM+1",
        "9:00AM",
        "6:00PM+1",
        "$450",
        "10:00AM",
    ];
    let records = parse_lines(&lines, leg_date(), &ParserConfig::default()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].price, Some(450));
    assert_eq!(
        records[0].departure_time.unwrap().time(),
        chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    );
}

#[test]
fn placeholder_records_are_emitted_not_dropped() {
    let lines = vec![
        "9:00AM",
        "5:00PM",
        "Separate tickets booked together",
        "11:00AM",
    ];
    let records = parse_lines(&lines, leg_date(), &ParserConfig::default()).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].is_placeholder());
}

#[test]
fn visible_lines_trims_and_normalizes() {
    let text = "  9:00AM  \n\n\u{a0}Turkish\u{a0}Airlines\u{a0}\nbad\u{200b}chars\n";
    let lines = visible_lines(text);
    assert_eq!(lines, vec!["9:00AM", "Turkish Airlines", "badchars"]);
}
