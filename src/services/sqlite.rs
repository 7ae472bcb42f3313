use async_trait::async_trait;
use sqlx::Row;
use tracing::warn;

use crate::{
    db::DbPool,
    error::AppError,
    models::trip::{format_datetime, parse_datetime, Trip},
    services::storage::TripStore,
};

/// Trip table in an embedded SQLite database. Row order is kept in `position`.
#[derive(Clone)]
pub struct SqliteTripStore {
    pool: DbPool,
}

impl SqliteTripStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn read_table(&self) -> Result<Vec<Trip>, AppError> {
        let rows = sqlx::query(
            r#"SELECT trip_id, driver, vehicle_number, start_location, end_location,
                      start_date, end_date, distance_km, fuel_litres, status
               FROM trips ORDER BY position"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let trips = rows
            .into_iter()
            .map(|row| Trip {
                trip_id: row.get("trip_id"),
                driver: row.get("driver"),
                vehicle_number: row.get("vehicle_number"),
                start_location: row.get("start_location"),
                end_location: row.get("end_location"),
                start_date: row
                    .get::<Option<String>, _>("start_date")
                    .as_deref()
                    .and_then(parse_datetime),
                end_date: row
                    .get::<Option<String>, _>("end_date")
                    .as_deref()
                    .and_then(parse_datetime),
                distance_km: row.get("distance_km"),
                fuel_litres: row.get("fuel_litres"),
                status: row.get("status"),
            })
            .collect();
        Ok(trips)
    }
}

#[async_trait]
impl TripStore for SqliteTripStore {
    async fn load(&self) -> Vec<Trip> {
        self.read_table().await.unwrap_or_else(|err| {
            warn!("could not read trips from database: {err}");
            Vec::new()
        })
    }

    async fn load_for_write(&self) -> Result<Vec<Trip>, AppError> {
        self.read_table().await
    }

    async fn save(&self, trips: &[Trip]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM trips").execute(&mut *tx).await?;
        for (position, trip) in trips.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO trips (position, trip_id, driver, vehicle_number, start_location,
                                      end_location, start_date, end_date, distance_km,
                                      fuel_litres, status)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
            )
            .bind(position as i64)
            .bind(&trip.trip_id)
            .bind(&trip.driver)
            .bind(&trip.vehicle_number)
            .bind(&trip.start_location)
            .bind(&trip.end_location)
            .bind(trip.start_date.map(format_datetime))
            .bind(trip.end_date.map(format_datetime))
            .bind(trip.distance_km)
            .bind(trip.fuel_litres)
            .bind(&trip.status)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
