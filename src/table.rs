use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::model::FlightRecord;

pub fn format_price(price: Option<i64>) -> String {
    match price {
        Some(p) => format!("${p}"),
        None => "—".to_string(),
    }
}

fn format_stops(stops: Option<u32>) -> String {
    match stops {
        Some(0) => "Nonstop".to_string(),
        Some(n) => n.to_string(),
        None => "—".to_string(),
    }
}

fn format_time(dt: Option<chrono::NaiveDateTime>) -> String {
    dt.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "—".to_string())
}

fn dash_if_empty(s: &str) -> String {
    if s.is_empty() {
        "—".to_string()
    } else {
        s.to_string()
    }
}

pub fn render(records: &[FlightRecord]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Date", "Day", "Route", "Depart", "Arrive", "Duration", "Stops", "Layover",
            "Airlines", "Price", "CO2 kg", "Emissions", "Accessed",
        ]);

    for record in records {
        let route = if record.origin.is_empty() {
            "—".to_string()
        } else {
            format!("{} → {}", record.origin, record.destination)
        };

        let emissions = record
            .emissions_diff_pct
            .map(|p| format!("{p:+}%"))
            .unwrap_or_else(|| "—".to_string());

        let co2 = record
            .co2_kg
            .map(|kg| kg.to_string())
            .unwrap_or_else(|| "—".to_string());

        table.add_row(vec![
            record.leg_date.to_string(),
            record.day_of_week.clone(),
            route,
            format_time(record.departure_time),
            format_time(record.arrival_time),
            dash_if_empty(&record.duration),
            format_stops(record.stop_count),
            dash_if_empty(record.layover.as_deref().unwrap_or("")),
            dash_if_empty(&record.airlines),
            format_price(record.price),
            co2,
            emissions,
            record.access_time.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }

    table.to_string()
}
