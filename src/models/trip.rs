use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const STORED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Columns of the persisted trip table, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    TripId,
    Driver,
    VehicleNumber,
    StartLocation,
    EndLocation,
    StartDate,
    EndDate,
    Distance,
    FuelUsage,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Id,
    Text,
    Numeric,
    Date,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::TripId,
        Column::Driver,
        Column::VehicleNumber,
        Column::StartLocation,
        Column::EndLocation,
        Column::StartDate,
        Column::EndDate,
        Column::Distance,
        Column::FuelUsage,
        Column::Status,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Column::TripId => "Trip ID",
            Column::Driver => "Driver",
            Column::VehicleNumber => "Vehicle Number",
            Column::StartLocation => "Start Location",
            Column::EndLocation => "End Location",
            Column::StartDate => "Start Date",
            Column::EndDate => "End Date",
            Column::Distance => "Distance (km)",
            Column::FuelUsage => "Fuel Usage (litres)",
            Column::Status => "Status",
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::TripId => ColumnKind::Id,
            Column::StartDate | Column::EndDate => ColumnKind::Date,
            Column::Distance | Column::FuelUsage => ColumnKind::Numeric,
            _ => ColumnKind::Text,
        }
    }

    pub fn from_header(header: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|col| col.header() == header)
    }

    pub fn headers() -> Vec<&'static str> {
        Column::ALL.iter().map(Column::header).collect()
    }
}

/// A value after it went through the coercion declared for its column.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(Option<f64>),
    Date(Option<NaiveDateTime>),
}

impl Cell {
    pub fn coerce(kind: ColumnKind, raw: &Value) -> Cell {
        match kind {
            ColumnKind::Id | ColumnKind::Text => Cell::Text(coerce_text(raw)),
            ColumnKind::Numeric => Cell::Number(coerce_number(raw)),
            ColumnKind::Date => Cell::Date(coerce_date(raw)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Trip {
    #[serde(rename = "Trip ID")]
    pub trip_id: String,
    #[serde(rename = "Driver")]
    pub driver: String,
    #[serde(rename = "Vehicle Number")]
    pub vehicle_number: Option<String>,
    #[serde(rename = "Start Location")]
    pub start_location: String,
    #[serde(rename = "End Location")]
    pub end_location: String,
    #[serde(rename = "Start Date")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(rename = "End Date")]
    pub end_date: Option<NaiveDateTime>,
    #[serde(rename = "Distance (km)")]
    pub distance_km: Option<f64>,
    #[serde(rename = "Fuel Usage (litres)")]
    pub fuel_litres: Option<f64>,
    #[serde(rename = "Status")]
    pub status: String,
}

impl Trip {
    pub fn with_id(trip_id: impl Into<String>) -> Self {
        Self {
            trip_id: canonical_id(&trip_id.into()),
            ..Self::default()
        }
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.trip_id == canonical_id(id)
    }

    /// Overwrites one field, coercing `raw` according to the column's kind.
    pub fn assign(&mut self, column: Column, raw: &Value) {
        match (column, Cell::coerce(column.kind(), raw)) {
            (Column::TripId, Cell::Text(text)) => self.trip_id = canonical_id(&text),
            (Column::Driver, Cell::Text(text)) => self.driver = text,
            (Column::VehicleNumber, Cell::Text(text)) => {
                self.vehicle_number = if text.is_empty() { None } else { Some(text) }
            }
            (Column::StartLocation, Cell::Text(text)) => self.start_location = text,
            (Column::EndLocation, Cell::Text(text)) => self.end_location = text,
            (Column::Status, Cell::Text(text)) => self.status = text,
            (Column::StartDate, Cell::Date(date)) => self.start_date = date,
            (Column::EndDate, Cell::Date(date)) => self.end_date = date,
            (Column::Distance, Cell::Number(value)) => self.distance_km = value,
            (Column::FuelUsage, Cell::Number(value)) => self.fuel_litres = value,
            _ => unreachable!("column kind and cell variant always agree"),
        }
    }

    pub fn vehicle_text(&self) -> &str {
        self.vehicle_number.as_deref().unwrap_or("n/a")
    }

    /// One human-readable line for the insights report.
    pub fn insight_line(&self) -> String {
        format!(
            "Trip ID {} by {} (Vehicle: {}) from {} to {} covered {} km, used {}L fuel, and is currently {}.",
            self.trip_id,
            self.driver,
            self.vehicle_text(),
            self.start_location,
            self.end_location,
            number_text(self.distance_km),
            number_text(self.fuel_litres),
            self.status,
        )
    }
}

/// Flat string view of a trip, the shape of one row in the tabular file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripRow {
    #[serde(rename = "Trip ID", default)]
    pub trip_id: Option<String>,
    #[serde(rename = "Driver", default)]
    pub driver: Option<String>,
    #[serde(rename = "Vehicle Number", default)]
    pub vehicle_number: Option<String>,
    #[serde(rename = "Start Location", default)]
    pub start_location: Option<String>,
    #[serde(rename = "End Location", default)]
    pub end_location: Option<String>,
    #[serde(rename = "Start Date", default)]
    pub start_date: Option<String>,
    #[serde(rename = "End Date", default)]
    pub end_date: Option<String>,
    #[serde(rename = "Distance (km)", default)]
    pub distance_km: Option<String>,
    #[serde(rename = "Fuel Usage (litres)", default)]
    pub fuel_litres: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

impl From<TripRow> for Trip {
    fn from(row: TripRow) -> Self {
        Trip {
            trip_id: canonical_id(row.trip_id.as_deref().unwrap_or_default()),
            driver: row.driver.unwrap_or_default(),
            vehicle_number: row.vehicle_number.filter(|v| !v.trim().is_empty()),
            start_location: row.start_location.unwrap_or_default(),
            end_location: row.end_location.unwrap_or_default(),
            start_date: row.start_date.as_deref().and_then(parse_datetime),
            end_date: row.end_date.as_deref().and_then(parse_datetime),
            distance_km: row.distance_km.as_deref().and_then(parse_number),
            fuel_litres: row.fuel_litres.as_deref().and_then(parse_number),
            status: row.status.unwrap_or_default(),
        }
    }
}

impl From<&Trip> for TripRow {
    fn from(trip: &Trip) -> Self {
        TripRow {
            trip_id: Some(trip.trip_id.clone()),
            driver: Some(trip.driver.clone()),
            vehicle_number: trip.vehicle_number.clone(),
            start_location: Some(trip.start_location.clone()),
            end_location: Some(trip.end_location.clone()),
            start_date: trip.start_date.map(format_datetime),
            end_date: trip.end_date.map(format_datetime),
            distance_km: trip.distance_km.map(|v| v.to_string()),
            fuel_litres: trip.fuel_litres.map(|v| v.to_string()),
            status: Some(trip.status.clone()),
        }
    }
}

/// Trims the ID and collapses integral numbers, so `5`, `5.0`, `+05` and
/// `" 5 "` match. Works on the text, so IDs of any length stay exact.
pub fn canonical_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let (negative, unsigned) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let integral = !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b == b'0');
    if !integral {
        return trimmed.to_string();
    }

    let digits = whole.trim_start_matches('0');
    match (digits.is_empty(), negative) {
        (true, _) => "0".to_string(),
        (false, true) => format!("-{digits}"),
        (false, false) => digits.to_string(),
    }
}

/// Trip ID carried by a JSON value; null becomes the empty ID.
pub fn id_from_value(raw: &Value) -> String {
    canonical_id(&coerce_text(raw))
}

/// Sign and digits of a canonical integer ID.
fn integer_parts(id: &str) -> Option<(bool, &str)> {
    let (negative, digits) = match id.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, id),
    };
    let plain = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'));
    plain.then_some((negative, digits))
}

/// Integer IDs first in numeric order, then everything else lexicographically.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (integer_parts(a), integer_parts(b)) {
        (Some((neg_a, x)), Some((neg_b, y))) => {
            let magnitude = x.len().cmp(&y.len()).then_with(|| x.cmp(y));
            match (neg_a, neg_b) {
                (false, false) => magnitude,
                (true, true) => magnitude.reverse(),
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_local());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format(STORED_DATE_FORMAT).to_string()
}

pub fn format_date(value: Option<NaiveDateTime>) -> String {
    value
        .map(|v| v.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn number_text(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "n/a".into())
}

fn coerce_text(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn coerce_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(text) => parse_number(text),
        _ => None,
    }
}

fn coerce_date(raw: &Value) -> Option<NaiveDateTime> {
    match raw {
        Value::String(text) => parse_datetime(text),
        _ => None,
    }
}
