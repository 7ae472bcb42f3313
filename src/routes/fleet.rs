use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
    routing::get,
    Form, Router,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_with::{serde_as, NoneAsEmptyString};

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::trip::{format_date, Column, Trip},
    state::AppState,
    trips::{
        normalize::normalize,
        reconcile::{dedupe_keep_last, renumber, TripFields},
        stats::aggregate,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/fleet-dashboard", get(fleet_dashboard))
        .route("/trip-auditor", get(trip_auditor))
        .route("/add", get(add_trip_form).post(add_trip_submit))
        .route("/edit/:trip_id", get(edit_trip_form).post(edit_trip_submit))
        .route("/delete/:trip_id", get(delete_trip))
}

#[derive(Template)]
#[template(path = "fleet_dashboard.html")]
struct FleetDashboardTemplate {
    signed_in_as: String,
    total_trips: usize,
    ongoing_trips: usize,
    closed_trips: usize,
    total_flags: usize,
    resolved_flags: usize,
    latest_trip_id: String,
    total_revenue: String,
    total_expense: String,
    net_profit: String,
    total_kms_travelled: String,
    per_km_cost: String,
}

async fn fleet_dashboard(
    State(state): State<AppState>,
    current: CurrentUser,
) -> impl IntoResponse {
    let trips = dedupe_keep_last(state.ledger.normalized_trips().await);
    let stats = aggregate(&trips, state.config.tariff);
    let latest_trip_id = trips
        .last()
        .map(|trip| trip.trip_id.clone())
        .unwrap_or_else(|| "N/A".into());

    AskamaTemplateResponse::into_response(FleetDashboardTemplate {
        signed_in_as: current.email(),
        total_trips: stats.total,
        ongoing_trips: stats.ongoing(),
        closed_trips: stats.completed,
        total_flags: stats.delayed,
        resolved_flags: stats.resolved,
        latest_trip_id,
        total_revenue: money(stats.revenue),
        total_expense: money(stats.expense),
        net_profit: money(stats.profit),
        total_kms_travelled: money(stats.distance_km),
        per_km_cost: money(stats.cost_per_km),
    })
}

#[derive(Clone)]
struct TripRowView {
    /// ID as stored; what edit links and bulk rows must send back.
    stored_id: String,
    /// ID shown to the user, which may be a display-only renumbering.
    trip_id: String,
    driver: String,
    vehicle_number: String,
    start_location: String,
    end_location: String,
    start_date: String,
    end_date: String,
    distance: String,
    fuel_usage: String,
    status: String,
}

impl From<&Trip> for TripRowView {
    fn from(trip: &Trip) -> Self {
        Self {
            stored_id: trip.trip_id.clone(),
            trip_id: trip.trip_id.clone(),
            driver: trip.driver.clone(),
            vehicle_number: trip.vehicle_number.clone().unwrap_or_default(),
            start_location: trip.start_location.clone(),
            end_location: trip.end_location.clone(),
            start_date: format_date(trip.start_date),
            end_date: format_date(trip.end_date),
            distance: optional_number(trip.distance_km),
            fuel_usage: optional_number(trip.fuel_litres),
            status: trip.status.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "trip_auditor.html")]
struct TripAuditorTemplate {
    signed_in_as: String,
    trips: Vec<TripRowView>,
    total_trips: usize,
    opened: usize,
    closed: usize,
    delayed: usize,
}

/// Deduplicated, normalized listing with IDs renumbered for display only.
async fn trip_auditor(State(state): State<AppState>, current: CurrentUser) -> impl IntoResponse {
    let mut trips = normalize(dedupe_keep_last(state.ledger.trips().await));
    let stored_ids = renumber(&mut trips);
    let stats = aggregate(&trips, state.config.tariff);
    let rows = trips
        .iter()
        .zip(stored_ids)
        .map(|(trip, stored_id)| TripRowView {
            stored_id,
            ..TripRowView::from(trip)
        })
        .collect();

    AskamaTemplateResponse::into_response(TripAuditorTemplate {
        signed_in_as: current.email(),
        trips: rows,
        total_trips: stats.total,
        opened: stats.in_transit,
        closed: stats.completed,
        delayed: stats.delayed,
    })
}

#[derive(Template)]
#[template(path = "trip_add.html")]
struct AddTripTemplate {
    signed_in_as: String,
    total_trips: usize,
    flags: usize,
    notifications: usize,
}

async fn add_trip_form(State(state): State<AppState>, current: CurrentUser) -> impl IntoResponse {
    let stats = aggregate(&state.ledger.normalized_trips().await, state.config.tariff);
    AskamaTemplateResponse::into_response(AddTripTemplate {
        signed_in_as: current.email(),
        total_trips: stats.total,
        flags: stats.flagged,
        notifications: stats.pending,
    })
}

#[serde_as]
#[derive(Deserialize)]
struct TripForm {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    trip_id: Option<String>,
    driver: String,
    vehicle_number: String,
    start_location: String,
    end_location: String,
    start_date: String,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    end_date: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    distance: Option<String>,
    fuel_usage: String,
    status: String,
}

impl TripForm {
    fn into_fields(self) -> TripFields {
        let mut fields = TripFields::new()
            .with(Column::Driver, self.driver)
            .with(Column::VehicleNumber, self.vehicle_number)
            .with(Column::StartLocation, self.start_location)
            .with(Column::EndLocation, self.end_location)
            .with(Column::StartDate, self.start_date)
            .with(Column::EndDate, self.end_date)
            .with(Column::Distance, self.distance)
            .with(Column::FuelUsage, self.fuel_usage)
            .with(Column::Status, self.status);
        if let Some(trip_id) = self.trip_id {
            fields.set(Column::TripId, trip_id);
        }
        fields
    }
}

async fn add_trip_submit(
    State(state): State<AppState>,
    Form(form): Form<TripForm>,
) -> Result<Redirect, AppError> {
    state.ledger.add(form.into_fields().into_trip()).await?;
    Ok(Redirect::to("/"))
}

#[derive(Template)]
#[template(path = "trip_edit.html")]
struct EditTripTemplate {
    signed_in_as: String,
    trip: TripRowView,
    start_date_input: String,
    end_date_input: String,
}

async fn edit_trip_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(trip_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let trip = state
        .ledger
        .find(&trip_id)
        .await
        .ok_or_else(|| AppError::NotFound(trip_id.clone()))?;

    Ok(AskamaTemplateResponse::into_response(EditTripTemplate {
        signed_in_as: current.email(),
        trip: TripRowView::from(&trip),
        start_date_input: datetime_input(trip.start_date),
        end_date_input: datetime_input(trip.end_date),
    }))
}

async fn edit_trip_submit(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    Form(form): Form<TripForm>,
) -> Result<Redirect, AppError> {
    state.ledger.update(&trip_id, &form.into_fields()).await?;
    Ok(Redirect::to("/"))
}

async fn delete_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Redirect, AppError> {
    state.ledger.delete(&trip_id).await?;
    Ok(Redirect::to("/"))
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Value for an `<input type="datetime-local">`.
fn datetime_input(value: Option<NaiveDateTime>) -> String {
    value
        .map(|v| v.format("%Y-%m-%dT%H:%M").to_string())
        .unwrap_or_default()
}
