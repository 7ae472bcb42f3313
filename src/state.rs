use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    auth::{Authenticator, OpenAuthenticator},
    config::AppConfig,
    services::{ledger::TripLedger, report::ReportService, storage::TripStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub ledger: TripLedger,
    pub reports: ReportService,
    pub authenticator: Arc<dyn Authenticator>,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn TripStore>) -> Self {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        let reports = ReportService::new(config.reports_dir.clone());
        Self {
            config,
            ledger: TripLedger::new(store),
            reports,
            authenticator: Arc::new(OpenAuthenticator),
            cookie_key,
        }
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
