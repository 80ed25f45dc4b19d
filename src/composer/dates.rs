use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

pub fn spanish_date(date: NaiveDate) -> String {
    format!("{} de {} de {}", date.day(), MONTHS[date.month0() as usize], date.year())
}

/// Render `"<day> de <month> de <year>"` from an ISO timestamp or a bare
/// `YYYY-MM-DD`. Timestamps keep the calendar date they were written in.
/// Anything unparsable comes back verbatim.
pub fn format_date(input: &str) -> String {
    let trimmed = input.trim();
    parse_date(trimmed)
        .map(spanish_date)
        .unwrap_or_else(|| trimmed.to_string())
}

fn parse_date(input: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M") {
        return Some(dt.date());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()
}
