use axum::{
    body::Bytes,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    error::AppError,
    services::report,
    state::AppState,
    trips::{
        period::{filter_by_period, Period},
        stats::{aggregate, PeriodCounts},
    },
};

pub const REPORT_FILENAME: &str = "AI_Insights_Report.pdf";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trip-stats", get(trip_stats))
        .route("/update-trips", post(update_trips))
        .route("/generate-report", post(generate_report))
}

#[derive(Debug, Serialize)]
struct TripStatsResponse {
    daily: PeriodCounts,
    weekly: PeriodCounts,
    monthly: PeriodCounts,
}

async fn trip_stats(State(state): State<AppState>) -> Json<TripStatsResponse> {
    let trips = state.ledger.normalized_trips().await;
    let now = Local::now().naive_local();
    let counts = |period| {
        let window = filter_by_period(&trips, period, now);
        PeriodCounts::from(&aggregate(&window, state.config.tariff))
    };

    let stats = TripStatsResponse {
        daily: counts(Period::Daily),
        weekly: counts(Period::Weekly),
        monthly: counts(Period::Monthly),
    };
    debug!("trip stats: {stats:?}");
    Json(stats)
}

/// Every failure, including a malformed body, comes back as
/// `{"success": false, "error": ...}` with status 200.
async fn update_trips(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let items: Vec<Value> = match serde_json::from_slice(&body) {
        Ok(items) => items,
        Err(err) => {
            warn!("rejecting bulk update body: {err}");
            return Json(failure(&AppError::Json(err)));
        }
    };

    let report = state.ledger.apply_bulk(&items).await;
    match report.outcome {
        Ok(results) => Json(json!({
            "success": true,
            "updated_trips": report.trips,
            "results": results,
        })),
        Err(err) => Json(failure(&err)),
    }
}

fn failure(err: &AppError) -> Value {
    json!({ "success": false, "error": err.to_string() })
}

async fn generate_report(State(state): State<AppState>) -> Result<Response, AppError> {
    let trips = state.ledger.trips().await;
    let bytes = state.reports.generate(&report::insights(&trips)).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={REPORT_FILENAME}"),
            ),
        ],
        bytes,
    )
        .into_response())
}
