use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    error::AppError,
    models::trip::Trip,
    services::storage::TripStore,
    trips::{
        bulk::{self, ItemResult},
        normalize::normalize,
        reconcile::{self, TripFields},
    },
};

/// Result of a bulk batch: the table as persisted, plus either the per-item
/// outcomes or the error that stopped the batch.
#[derive(Debug)]
pub struct BulkReport {
    pub trips: Vec<Trip>,
    pub outcome: Result<Vec<ItemResult>, AppError>,
}

/// Serialises every load → mutate → save cycle against the store.
#[derive(Clone)]
pub struct TripLedger {
    store: Arc<dyn TripStore>,
    write_lock: Arc<Mutex<()>>,
}

impl TripLedger {
    pub fn new(store: Arc<dyn TripStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn trips(&self) -> Vec<Trip> {
        self.store.load().await
    }

    pub async fn normalized_trips(&self) -> Vec<Trip> {
        normalize(self.store.load().await)
    }

    pub async fn find(&self, id: &str) -> Option<Trip> {
        self.store
            .load()
            .await
            .into_iter()
            .find(|trip| trip.has_id(id))
    }

    pub async fn add(&self, trip: Trip) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut trips = self.store.load_for_write().await?;
        let trip_id = trip.trip_id.clone();
        reconcile::add(&mut trips, trip)?;
        self.persist_best_effort(&trips).await;
        info!("added trip {trip_id}");
        Ok(())
    }

    pub async fn update(&self, id: &str, fields: &TripFields) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;
        let mut trips = self.store.load_for_write().await?;
        reconcile::update(&mut trips, id, fields)?;
        self.persist_best_effort(&trips).await;
        info!("updated trip {id}");
        Ok(())
    }

    /// Deletes every trip with `id` and renumbers the survivors.
    pub async fn delete(&self, id: &str) -> Result<usize, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut trips = self.store.load_for_write().await?;
        let removed = reconcile::delete(&mut trips, id);
        reconcile::renumber(&mut trips);
        self.persist_best_effort(&trips).await;
        info!("deleted {removed} trip(s) with id {id}");
        Ok(removed)
    }

    /// Applies a bulk batch. Whatever the batch managed to change before an
    /// error is still saved; a failing save replaces the batch outcome. A table
    /// that cannot be read in full is left alone.
    pub async fn apply_bulk(&self, items: &[Value]) -> BulkReport {
        let _guard = self.write_lock.lock().await;
        let mut trips = match self.store.load_for_write().await {
            Ok(trips) => trips,
            Err(err) => {
                warn!("refusing bulk update: {err}");
                return BulkReport {
                    trips: Vec::new(),
                    outcome: Err(err),
                };
            }
        };
        let outcome = bulk::apply(&mut trips, items);
        if let Err(err) = &outcome {
            warn!("bulk update stopped early: {err}");
        }

        match self.store.save(&trips).await {
            Ok(()) => BulkReport { trips, outcome },
            Err(err) => {
                warn!("could not persist bulk update: {err}");
                BulkReport {
                    trips,
                    outcome: Err(err),
                }
            }
        }
    }

    async fn persist_best_effort(&self, trips: &[Trip]) {
        if let Err(err) = self.store.save(trips).await {
            warn!("error writing trip table: {err}");
        }
    }
}
