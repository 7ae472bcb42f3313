use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};

use crate::models::trip::Trip;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    All,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::All => "all",
        }
    }
}

impl FromStr for Period {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to `All` rather than failing.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(match raw {
            "daily" => Period::Daily,
            "weekly" => Period::Weekly,
            "monthly" => Period::Monthly,
            _ => Period::All,
        })
    }
}

/// Keeps the trips whose start date falls into `period` relative to `now`.
///
/// The weekly and monthly windows are rolling (7 and 30 days back from `now`,
/// inclusive), not calendar aligned. Trips without a start date never match a
/// window; `Period::All` returns the table untouched.
pub fn filter_by_period(trips: &[Trip], period: Period, now: NaiveDateTime) -> Vec<Trip> {
    let matches = |start: NaiveDateTime| match period {
        Period::Daily => start.date() == now.date(),
        Period::Weekly => start >= now - Duration::days(7),
        Period::Monthly => start >= now - Duration::days(30),
        Period::All => true,
    };

    if period == Period::All {
        return trips.to_vec();
    }

    trips
        .iter()
        .filter(|trip| trip.start_date.is_some_and(&matches))
        .cloned()
        .collect()
}
