//! Ports and adapters
//!
//! Domain crates declare what they need from storage as a port trait built on
//! the markers here. The PostgreSQL adapter and the in-memory mock both
//! report failures as [`PortError`], so a service treats a missing row or a
//! lost version race the same way whichever adapter is plugged in.
//!
//! ```text
//!        BillingService
//!              │  Arc<dyn BillingPort>
//!      ┌───────┴────────┐
//!  PostgreSQL        in-memory
//!   adapter            mock
//! ```

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identifiers::EntityId;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("Not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// The store refused the data, e.g. a foreign key or check constraint
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A version-guarded write lost the race, or a uniqueness rule fired
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// A stored value does not map back onto a domain type
    #[error("Transformation error: {message}")]
    Transformation { message: String },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Not-found error for a typed id, named after its record kind
    pub fn missing<I: EntityId>(id: I) -> Self {
        Self::not_found(I::ENTITY, id.as_uuid())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn transformation(message: impl Into<String>) -> Self {
        PortError::Transformation {
            message: message.into(),
        }
    }

    /// The store could not be reached; the same call may work later
    pub fn is_transient(&self) -> bool {
        matches!(self, PortError::Connection { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }

    /// Another writer got there first; re-read and decide again
    pub fn is_conflict(&self) -> bool {
        matches!(self, PortError::Conflict { .. })
    }
}

/// Marker for port traits, usable behind `Arc<dyn ...>` across tasks
pub trait DomainPort: Send + Sync + 'static {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    /// Answering, but slower than it should
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheckResult {
    /// Grades one health check of an adapter
    ///
    /// A failed check is unhealthy; a successful one slower than `slow_after`
    /// is degraded.
    pub fn from_check(
        adapter_id: impl Into<String>,
        outcome: Result<(), String>,
        elapsed: Duration,
        slow_after: Duration,
    ) -> Self {
        let (status, message) = match outcome {
            Err(e) => (AdapterHealth::Unhealthy, Some(e)),
            Ok(()) if elapsed > slow_after => (
                AdapterHealth::Degraded,
                Some(format!("Health check took {}ms", elapsed.as_millis())),
            ),
            Ok(()) => (AdapterHealth::Healthy, None),
        };

        Self {
            adapter_id: adapter_id.into(),
            status,
            latency_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InvoiceId;

    #[test]
    fn test_missing_names_the_record_kind() {
        let id = InvoiceId::new();
        let error = PortError::missing(id);
        assert!(error.is_not_found());
        assert_eq!(
            error.to_string(),
            format!("Not found: Invoice with id {}", id.as_uuid())
        );
    }

    #[test]
    fn test_only_connection_failures_are_transient() {
        assert!(PortError::connection("refused").is_transient());

        let conflict = PortError::conflict("invoice version changed");
        assert!(!conflict.is_transient());
        assert!(conflict.is_conflict());
        assert!(!PortError::not_found("Job", "x").is_transient());
    }

    #[test]
    fn test_health_check_grading() {
        let slow_after = Duration::from_millis(500);

        let ok = HealthCheckResult::from_check("db", Ok(()), Duration::from_millis(3), slow_after);
        assert_eq!(ok.status, AdapterHealth::Healthy);
        assert_eq!(ok.latency_ms, 3);
        assert!(ok.message.is_none());

        let slow = HealthCheckResult::from_check("db", Ok(()), Duration::from_secs(2), slow_after);
        assert_eq!(slow.status, AdapterHealth::Degraded);

        let down = HealthCheckResult::from_check(
            "db",
            Err("connection refused".to_string()),
            Duration::from_millis(1),
            slow_after,
        );
        assert_eq!(down.status, AdapterHealth::Unhealthy);
        assert_eq!(down.message.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_adapter_health_serialization() {
        let json = serde_json::to_string(&AdapterHealth::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }
}
