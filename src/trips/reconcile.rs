use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::{
    error::AppError,
    models::trip::{canonical_id, compare_ids, Column, Trip},
};

/// Columns a trip created through the add form must carry.
const REQUIRED: [Column; 8] = [
    Column::TripId,
    Column::Driver,
    Column::VehicleNumber,
    Column::StartLocation,
    Column::EndLocation,
    Column::StartDate,
    Column::FuelUsage,
    Column::Status,
];

/// Raw, not yet coerced values keyed by column.
#[derive(Debug, Clone, Default)]
pub struct TripFields(Vec<(Column, Value)>);

impl TripFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: Column, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: Column, value: impl Into<Value>) {
        let value = value.into();
        match self.0.iter_mut().find(|(col, _)| *col == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
    }

    pub fn get(&self, column: Column) -> Option<&Value> {
        self.0
            .iter()
            .find(|(col, _)| *col == column)
            .map(|(_, value)| value)
    }

    /// Picks the known columns out of a JSON row; anything else is ignored.
    pub fn from_json(row: &Map<String, Value>) -> Self {
        let mut fields = Self::new();
        for (key, value) in row {
            if let Some(column) = Column::from_header(key) {
                fields.set(column, value.clone());
            }
        }
        fields
    }

    pub fn iter(&self) -> impl Iterator<Item = (Column, &Value)> {
        self.0.iter().map(|(col, value)| (*col, value))
    }

    /// Builds a fresh trip from the fields, coercing each value.
    pub fn into_trip(self) -> Trip {
        let mut trip = Trip::default();
        for (column, value) in self.iter() {
            trip.assign(column, value);
        }
        trip
    }
}

/// Appends `trip`; duplicate IDs are tolerated.
pub fn add(trips: &mut Vec<Trip>, trip: Trip) -> Result<(), AppError> {
    let missing = missing_required(&trip);
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )));
    }
    trips.push(trip);
    Ok(())
}

/// Overwrites the fields of the first trip with `id`. The Trip ID itself is
/// never rewritten here. Leaves the table untouched when `id` is absent.
pub fn update(trips: &mut [Trip], id: &str, fields: &TripFields) -> Result<(), AppError> {
    let trip = trips
        .iter_mut()
        .find(|trip| trip.has_id(id))
        .ok_or_else(|| AppError::NotFound(canonical_id(id)))?;

    for (column, value) in fields.iter() {
        if column != Column::TripId {
            trip.assign(column, value);
        }
    }
    Ok(())
}

/// Overwrites the fields of every trip with `id` and returns how many matched.
pub fn update_all(trips: &mut [Trip], id: &str, fields: &TripFields) -> usize {
    let mut matched = 0;
    for trip in trips.iter_mut().filter(|trip| trip.has_id(id)) {
        for (column, value) in fields.iter() {
            if column != Column::TripId {
                trip.assign(column, value);
            }
        }
        matched += 1;
    }
    matched
}

/// Removes every trip with `id` and returns how many were dropped. IDs are not
/// renumbered; call [`renumber`] afterwards when a dense sequence is needed.
pub fn delete(trips: &mut Vec<Trip>, id: &str) -> usize {
    let before = trips.len();
    let id = canonical_id(id);
    trips.retain(|trip| trip.trip_id != id);
    before - trips.len()
}

/// Sorts by current Trip ID and relabels the trips `1..=n`. Returns the IDs
/// the trips carried before, in their new order.
pub fn renumber(trips: &mut [Trip]) -> Vec<String> {
    trips.sort_by(|a, b| compare_ids(&a.trip_id, &b.trip_id));
    trips
        .iter_mut()
        .enumerate()
        .map(|(index, trip)| std::mem::replace(&mut trip.trip_id, (index + 1).to_string()))
        .collect()
}

/// Drops all but the last row for each Trip ID, preserving row order.
pub fn dedupe_keep_last(trips: Vec<Trip>) -> Vec<Trip> {
    let last: HashMap<String, usize> = trips
        .iter()
        .enumerate()
        .map(|(index, trip)| (trip.trip_id.clone(), index))
        .collect();

    trips
        .into_iter()
        .enumerate()
        .filter(|(index, trip)| last.get(&trip.trip_id) == Some(index))
        .map(|(_, trip)| trip)
        .collect()
}

fn missing_required(trip: &Trip) -> Vec<&'static str> {
    REQUIRED
        .iter()
        .filter(|column| {
            let blank = |text: &str| text.trim().is_empty();
            match column {
                Column::TripId => blank(&trip.trip_id),
                Column::Driver => blank(&trip.driver),
                Column::VehicleNumber => trip.vehicle_number.as_deref().map_or(true, blank),
                Column::StartLocation => blank(&trip.start_location),
                Column::EndLocation => blank(&trip.end_location),
                Column::StartDate => trip.start_date.is_none(),
                Column::FuelUsage => trip.fuel_litres.is_none(),
                Column::Status => blank(&trip.status),
                Column::EndDate | Column::Distance => false,
            }
        })
        .map(Column::header)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trip(id: &str) -> Trip {
        Trip {
            driver: format!("driver-{id}"),
            status: "completed".into(),
            ..Trip::with_id(id)
        }
    }

    fn ids(trips: &[Trip]) -> Vec<&str> {
        trips.iter().map(|t| t.trip_id.as_str()).collect()
    }

    fn complete_fields(id: &str) -> TripFields {
        TripFields::new()
            .with(Column::TripId, id)
            .with(Column::Driver, "Ravi")
            .with(Column::VehicleNumber, "KA-01-1234")
            .with(Column::StartLocation, "Pune")
            .with(Column::EndLocation, "Mumbai")
            .with(Column::StartDate, "2024-05-01")
            .with(Column::FuelUsage, "12")
            .with(Column::Status, "In Transit")
    }

    #[test]
    fn add_accepts_complete_trip_and_tolerates_duplicate_ids() {
        let mut table = vec![trip("1")];
        add(&mut table, complete_fields("1").into_trip()).unwrap();
        assert_eq!(ids(&table), vec!["1", "1"]);
    }

    #[test]
    fn add_rejects_missing_required_fields() {
        let mut table = Vec::new();
        let mut fields = complete_fields("1");
        fields.set(Column::Driver, "  ");
        fields.set(Column::FuelUsage, "lots");
        let err = add(&mut table, fields.into_trip()).unwrap_err();
        match err {
            AppError::Validation(msg) => {
                assert!(msg.contains("Driver"));
                assert!(msg.contains("Fuel Usage (litres)"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(table.is_empty());
    }

    #[test]
    fn update_overwrites_first_match_with_coercion() {
        let mut table = vec![trip("1"), trip("2"), trip("2")];
        let fields = TripFields::new()
            .with(Column::Distance, "not a number")
            .with(Column::FuelUsage, json!(3.5))
            .with(Column::Status, "Delayed")
            .with(Column::TripId, "99");
        update(&mut table, "2", &fields).unwrap();

        assert_eq!(table[1].trip_id, "2");
        assert_eq!(table[1].distance_km, None);
        assert_eq!(table[1].fuel_litres, Some(3.5));
        assert_eq!(table[1].status, "Delayed");
        assert_eq!(table[2].status, "completed");
    }

    #[test]
    fn update_of_absent_id_is_not_found_and_changes_nothing() {
        let mut table = vec![trip("1")];
        let before = table.clone();
        let fields = TripFields::new().with(Column::Status, "flagged");
        let err = update(&mut table, "7", &fields).unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref id) if id == "7"));
        assert_eq!(table, before);
    }

    #[test]
    fn delete_removes_all_matches_without_renumbering() {
        let mut table = vec![trip("1"), trip("2"), trip("3"), trip("2")];
        assert_eq!(delete(&mut table, "2"), 2);
        assert_eq!(ids(&table), vec!["1", "3"]);
        assert_eq!(delete(&mut table, "9"), 0);
    }

    #[test]
    fn delete_then_renumber_yields_dense_ids() {
        let mut table = vec![trip("1"), trip("2"), trip("3")];
        delete(&mut table, "2");
        renumber(&mut table);
        assert_eq!(ids(&table), vec!["1", "2"]);
        assert_eq!(table[1].driver, "driver-3");
    }

    #[test]
    fn renumber_sorts_and_is_idempotent() {
        let mut table = vec![trip("10"), trip("x"), trip("2"), trip("2")];
        renumber(&mut table);
        assert_eq!(ids(&table), vec!["1", "2", "3", "4"]);
        assert_eq!(table[0].driver, "driver-2");
        assert_eq!(table[2].driver, "driver-10");
        assert_eq!(table[3].driver, "driver-x");

        let once = table.clone();
        renumber(&mut table);
        assert_eq!(table, once);
    }

    #[test]
    fn renumber_reports_previous_ids_in_new_order() {
        let mut table = vec![trip("2"), trip("10"), trip("3")];
        assert_eq!(renumber(&mut table), vec!["2", "3", "10"]);
        assert_eq!(table[1].driver, "driver-3");
    }

    #[test]
    fn update_all_touches_every_duplicate() {
        let mut table = vec![trip("4"), trip("1"), trip("4")];
        let fields = TripFields::new().with(Column::Status, "resolved");
        assert_eq!(update_all(&mut table, "4.0", &fields), 2);
        assert_eq!(table[0].status, "resolved");
        assert_eq!(table[1].status, "completed");
        assert_eq!(table[2].status, "resolved");
        assert_eq!(update_all(&mut table, "9", &fields), 0);
    }

    #[test]
    fn dedupe_keeps_last_occurrence_in_place() {
        let mut first = trip("1");
        first.status = "in transit".into();
        let table = vec![first, trip("2"), trip("1")];
        let deduped = dedupe_keep_last(table);
        assert_eq!(ids(&deduped), vec!["2", "1"]);
        assert_eq!(deduped[1].status, "completed");
    }

    #[test]
    fn fields_from_json_ignore_unknown_keys() {
        let row = json!({"Trip ID": 4, "Driver": "Meera", "action": "update", "Colour": "red"});
        let fields = TripFields::from_json(row.as_object().unwrap());
        assert_eq!(fields.get(Column::Driver), Some(&json!("Meera")));
        assert_eq!(fields.iter().count(), 2);
        assert_eq!(fields.into_trip().trip_id, "4");
    }
}
