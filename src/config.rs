use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Csv,
    Sqlite,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(StoreBackend::Csv),
            "sqlite" => Ok(StoreBackend::Sqlite),
            other => Err(AppError::Config(format!("unknown TRIP_STORE backend: {other}"))),
        }
    }
}

/// Money earned per kilometre and spent per litre of fuel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tariff {
    pub revenue_per_km: f64,
    pub expense_per_litre: f64,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            revenue_per_km: 10.0,
            expense_per_litre: 5.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub backend: StoreBackend,
    pub data_file: PathBuf,
    pub database_url: String,
    pub reports_dir: PathBuf,
    pub cookie_secret: String,
    pub tariff: Tariff,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let backend = env::var("TRIP_STORE")
            .unwrap_or_else(|_| "csv".to_string())
            .parse()?;

        let data_file = env::var("TRIP_DATA_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("trip_data.csv"));

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://trip_data.db".to_string());

        let reports_dir = env::var("REPORTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("reports"));

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-trip-auditor-cookie-secret".to_string());

        let defaults = Tariff::default();
        let tariff = Tariff {
            revenue_per_km: rate_from_env("REVENUE_PER_KM", defaults.revenue_per_km)?,
            expense_per_litre: rate_from_env("EXPENSE_PER_LITRE", defaults.expense_per_litre)?,
        };

        Ok(Self {
            listen_addr,
            backend,
            data_file,
            database_url,
            reports_dir,
            cookie_secret,
            tariff,
        })
    }
}

fn rate_from_env(key: &str, default: f64) -> Result<f64, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|err| AppError::Config(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_are_case_insensitive() {
        assert_eq!("CSV".parse::<StoreBackend>().unwrap(), StoreBackend::Csv);
        assert_eq!(" sqlite ".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
        assert!(matches!(
            "xlsx".parse::<StoreBackend>(),
            Err(AppError::Config(_))
        ));
    }
}
