use serde::Serialize;
use serde_json::Value;

use crate::{
    error::AppError,
    models::trip::{id_from_value, Column, Trip},
    trips::reconcile::{self, TripFields},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Added,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub trip_id: String,
    pub outcome: Outcome,
}

/// Applies a batch of rows coming from the inline editor.
///
/// Rows tagged `"action": "delete"` remove their Trip ID and renumber the table
/// at once. Any other row updates every trip with the same ID, or is appended
/// when the ID is unknown. A delete whose ID does not exist stops the batch
/// with `NotFound`; rows before it stay applied to `trips`.
pub fn apply(trips: &mut Vec<Trip>, items: &[Value]) -> Result<Vec<ItemResult>, AppError> {
    let mut results = Vec::with_capacity(items.len());

    for item in items {
        let row = item
            .as_object()
            .ok_or_else(|| AppError::Validation("each trip must be a JSON object".into()))?;
        let trip_id = row
            .get(Column::TripId.header())
            .map(id_from_value)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Validation("missing Trip ID".into()))?;
        let fields = TripFields::from_json(row);

        let outcome = if row.get("action").and_then(Value::as_str) == Some("delete") {
            if reconcile::delete(trips, &trip_id) == 0 {
                return Err(AppError::NotFound(trip_id));
            }
            reconcile::renumber(trips);
            Outcome::Deleted
        } else if trips.iter().any(|trip| trip.has_id(&trip_id)) {
            reconcile::update_all(trips, &trip_id, &fields);
            Outcome::Updated
        } else {
            trips.push(fields.into_trip());
            Outcome::Added
        };

        results.push(ItemResult { trip_id, outcome });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(ids: &[&str]) -> Vec<Trip> {
        ids.iter()
            .map(|id| Trip {
                driver: format!("driver-{id}"),
                status: "in transit".into(),
                ..Trip::with_id(*id)
            })
            .collect()
    }

    fn items(value: Value) -> Vec<Value> {
        value.as_array().cloned().unwrap()
    }

    #[test]
    fn missing_delete_target_aborts_with_not_found() {
        let mut trips = table(&["1", "2"]);
        let err = apply(&mut trips, &items(json!([{"Trip ID": "5", "action": "delete"}])))
            .unwrap_err();
        assert_eq!(err.to_string(), "Trip ID 5 not found.");
        assert_eq!(trips.len(), 2);
    }

    #[test]
    fn earlier_items_stay_applied_when_batch_aborts() {
        let mut trips = table(&["1", "2"]);
        let batch = items(json!([
            {"Trip ID": "1", "Status": "Completed"},
            {"Trip ID": 9, "action": "delete"},
            {"Trip ID": "2", "Status": "Delayed"}
        ]));
        assert!(matches!(apply(&mut trips, &batch), Err(AppError::NotFound(_))));
        assert_eq!(trips[0].status, "Completed");
        assert_eq!(trips[1].status, "in transit");
    }

    #[test]
    fn upserts_and_deletes_report_per_item_outcomes() {
        let mut trips = table(&["1", "2", "3"]);
        let batch = items(json!([
            {"Trip ID": 2, "action": "delete"},
            {"Trip ID": "2", "Distance (km)": "120", "Fuel Usage (litres)": "oops"},
            {"Trip ID": "8", "Driver": "Nadia", "Status": "Pending", "Start Date": "2024-05-02"}
        ]));
        let results = apply(&mut trips, &batch).unwrap();

        assert_eq!(
            results.iter().map(|r| r.outcome).collect::<Vec<_>>(),
            vec![Outcome::Deleted, Outcome::Updated, Outcome::Added]
        );
        let ids: Vec<_> = trips.iter().map(|t| t.trip_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "8"]);
        // old trip 3 was renumbered to 2 before the update hit it
        assert_eq!(trips[1].driver, "driver-3");
        assert_eq!(trips[1].distance_km, Some(120.0));
        assert_eq!(trips[1].fuel_litres, None);
        assert_eq!(trips[2].driver, "Nadia");
        assert!(trips[2].start_date.is_some());
    }

    #[test]
    fn update_reaches_every_row_sharing_the_id() {
        let mut trips = table(&["3", "1", "3"]);
        let batch = items(json!([{"Trip ID": "3", "Status": "Resolved"}]));
        let results = apply(&mut trips, &batch).unwrap();
        assert_eq!(results[0].outcome, Outcome::Updated);
        let statuses: Vec<_> = trips.iter().map(|t| t.status.as_str()).collect();
        assert_eq!(statuses, vec!["Resolved", "in transit", "Resolved"]);
    }

    #[test]
    fn rows_without_trip_id_are_rejected() {
        let mut trips = table(&["1"]);
        let err = apply(&mut trips, &items(json!([{"Driver": "x"}]))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = apply(&mut trips, &items(json!([{"Trip ID": null}]))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
