use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use csv::{ReaderBuilder, WriterBuilder};
use tokio::{fs, sync::Mutex};
use tracing::{debug, warn};

use crate::{
    error::AppError,
    models::trip::{Column, Trip, TripRow},
};

/// Whole-table persistence. Every save replaces the previous content.
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Never fails: an absent or unreadable table reads as empty.
    async fn load(&self) -> Vec<Trip>;

    /// Loads the table ahead of a save. Fails instead of dropping rows, so a
    /// partial read is never written back over the full table.
    async fn load_for_write(&self) -> Result<Vec<Trip>, AppError>;

    async fn save(&self, trips: &[Trip]) -> Result<(), AppError>;
}

/// The trip table kept as a spreadsheet-style CSV file.
#[derive(Clone)]
pub struct CsvTripStore {
    path: Arc<PathBuf>,
}

impl CsvTripStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a header-only table when the file does not exist yet.
    pub async fn ensure_file(&self) -> Result<(), AppError> {
        if fs::try_exists(self.path()).await? {
            return Ok(());
        }
        debug!("creating empty trip table at {}", self.path().display());
        self.save(&[]).await
    }

    /// Decodes every row it can; the second value counts rows that could not
    /// be decoded.
    async fn read_table(&self) -> Result<(Vec<Trip>, usize), AppError> {
        let raw = match fs::read(self.path()).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
            Err(err) => return Err(err.into()),
        };
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(raw.as_slice());
        let mut trips = Vec::new();
        let mut skipped = 0usize;

        for result in reader.deserialize::<TripRow>() {
            match result {
                Ok(row) => trips.push(Trip::from(row)),
                Err(err) => {
                    skipped += 1;
                    debug!("undecodable trip row: {err}");
                }
            }
        }
        Ok((trips, skipped))
    }
}

#[async_trait]
impl TripStore for CsvTripStore {
    async fn load(&self) -> Vec<Trip> {
        match self.read_table().await {
            Ok((trips, 0)) => trips,
            Ok((trips, skipped)) => {
                warn!("skipped {skipped} undecodable row(s) in {}", self.path().display());
                trips
            }
            Err(err) => {
                warn!("could not read trip table {}: {err}", self.path().display());
                Vec::new()
            }
        }
    }

    async fn load_for_write(&self) -> Result<Vec<Trip>, AppError> {
        match self.read_table().await? {
            (trips, 0) => Ok(trips),
            (_, skipped) => Err(AppError::UnreadableTable(format!(
                "{skipped} undecodable row(s) in {}",
                self.path().display()
            ))),
        }
    }

    async fn save(&self, trips: &[Trip]) -> Result<(), AppError> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(Column::headers())?;
        for trip in trips {
            writer.serialize(TripRow::from(trip))?;
        }
        let data = writer.into_inner().map_err(|err| AppError::Io(err.into_error()))?;

        if let Some(dir) = self.path().parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        fs::write(self.path(), data).await?;
        Ok(())
    }
}

/// Keeps the table in memory; used by tests in place of a real file.
#[derive(Clone, Default)]
pub struct MemoryTripStore {
    trips: Arc<Mutex<Vec<Trip>>>,
    fail_writes: bool,
}

impl MemoryTripStore {
    pub fn new(trips: Vec<Trip>) -> Self {
        Self {
            trips: Arc::new(Mutex::new(trips)),
            fail_writes: false,
        }
    }

    /// A store whose saves always fail, for exercising the IO failure paths.
    pub fn read_only(trips: Vec<Trip>) -> Self {
        Self {
            fail_writes: true,
            ..Self::new(trips)
        }
    }
}

#[async_trait]
impl TripStore for MemoryTripStore {
    async fn load(&self) -> Vec<Trip> {
        self.trips.lock().await.clone()
    }

    async fn load_for_write(&self) -> Result<Vec<Trip>, AppError> {
        Ok(self.load().await)
    }

    async fn save(&self, trips: &[Trip]) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "trip table is read-only",
            )));
        }
        *self.trips.lock().await = trips.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample() -> Vec<Trip> {
        vec![
            Trip {
                driver: "Asha".into(),
                vehicle_number: Some("MH-12-AB-1234".into()),
                start_location: "Pune".into(),
                end_location: "Nashik, MH".into(),
                start_date: NaiveDate::from_ymd_opt(2024, 5, 1)
                    .unwrap()
                    .and_hms_opt(9, 15, 0),
                distance_km: Some(212.5),
                fuel_litres: Some(18.0),
                status: "In Transit".into(),
                ..Trip::with_id("1")
            },
            Trip {
                driver: "Ravi".into(),
                status: "completed".into(),
                ..Trip::with_id("2")
            },
        ]
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty_table() {
        let dir = TempDir::new().unwrap();
        let store = CsvTripStore::new(dir.path().join("absent.csv"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_reproduces_records() {
        let dir = TempDir::new().unwrap();
        let store = CsvTripStore::new(dir.path().join("nested").join("trips.csv"));
        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await, sample());
    }

    #[tokio::test]
    async fn ensure_file_writes_canonical_header() {
        let dir = TempDir::new().unwrap();
        let store = CsvTripStore::new(dir.path().join("trips.csv"));
        store.ensure_file().await.unwrap();
        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            content.trim_end(),
            "Trip ID,Driver,Vehicle Number,Start Location,End Location,Start Date,End Date,Distance (km),Fuel Usage (litres),Status"
        );
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn earlier_schema_loads_with_empty_new_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.csv");
        std::fs::write(
            &path,
            "Trip ID,Driver,Start Location,End Location,Start Date,Fuel Usage (litres),Status,Notes\n\
             7,Kiran,Goa,Hubli,2024-02-01,9.5,Delayed,late ferry\n\
             8,Meena,Goa,Panaji,not a date,n/a,completed,\n",
        )
        .unwrap();
        let trips = CsvTripStore::new(path).load().await;

        assert_eq!(trips.len(), 2);
        assert_eq!(trips[0].vehicle_number, None);
        assert_eq!(trips[0].distance_km, None);
        assert_eq!(trips[0].fuel_litres, Some(9.5));
        assert_eq!(trips[1].start_date, None);
        assert_eq!(trips[1].fuel_litres, None);
    }

    #[tokio::test]
    async fn undecodable_rows_block_writes_but_not_reads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trips.csv");
        let mut raw = b"Trip ID,Driver,Status\n1,Asha,completed\n2,Jos".to_vec();
        raw.push(0xE9);
        raw.extend_from_slice(b",pending\n");
        std::fs::write(&path, raw).unwrap();

        let store = CsvTripStore::new(path);
        assert_eq!(store.load().await.len(), 1);
        assert!(matches!(
            store.load_for_write().await,
            Err(AppError::UnreadableTable(_))
        ));
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_table_for_writes_too() {
        let dir = TempDir::new().unwrap();
        let store = CsvTripStore::new(dir.path().join("absent.csv"));
        assert!(store.load_for_write().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_only_memory_store_reports_write_failure() {
        let store = MemoryTripStore::read_only(sample());
        assert!(matches!(store.save(&[]).await, Err(AppError::Io(_))));
        assert_eq!(store.load().await.len(), 2);
    }
}
