//! API configuration

use core_kernel::{BusinessCalendar, CoreError, Timezone};
use domain_billing::BillingTerms;
use serde::Deserialize;

/// API configuration
///
/// Read from `API_*` environment variables; anything unset keeps its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Pool size
    pub max_connections: u32,
    /// Log level, used when `RUST_LOG` is unset
    pub log_level: String,
    /// IANA zone that decides "today" for due dates and overdue checks
    pub timezone: Timezone,
    pub deposit_due_days: u64,
    pub progress_due_days: u64,
    pub balance_due_days: u64,
    pub full_due_days: u64,
    /// Refuse balance invoices while deposit or progress invoices are unpaid
    pub require_paid_before_balance: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let terms = BillingTerms::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/fieldbill".to_string(),
            max_connections: 10,
            log_level: "info".to_string(),
            timezone: Timezone::default(),
            deposit_due_days: terms.deposit_due_days,
            progress_due_days: terms.progress_due_days,
            balance_due_days: terms.balance_due_days,
            full_due_days: terms.full_due_days,
            require_paid_before_balance: terms.require_paid_before_balance,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    ///
    /// A bare `DATABASE_URL` is honoured when `API_DATABASE_URL` is not set.
    pub fn from_env() -> Result<Self, CoreError> {
        let mut builder = config::Config::builder();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder
                .set_default("database_url", url)
                .map_err(|e| CoreError::configuration(e.to_string()))?;
        }

        let config: ApiConfig = builder
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CoreError::configuration(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the server cannot run with
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.database_url.trim().is_empty() {
            return Err(CoreError::configuration("API_DATABASE_URL must not be empty"));
        }
        if self.max_connections == 0 {
            return Err(CoreError::configuration("API_MAX_CONNECTIONS must be at least 1"));
        }
        Ok(())
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn billing_terms(&self) -> BillingTerms {
        BillingTerms {
            deposit_due_days: self.deposit_due_days,
            progress_due_days: self.progress_due_days,
            balance_due_days: self.balance_due_days,
            full_due_days: self.full_due_days,
            require_paid_before_balance: self.require_paid_before_balance,
        }
    }

    pub fn calendar(&self) -> BusinessCalendar {
        BusinessCalendar::new(self.timezone)
    }
}
