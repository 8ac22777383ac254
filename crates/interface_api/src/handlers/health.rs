//! Health check handlers

use axum::{extract::State, Json};
use core_kernel::AdapterHealth;
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Liveness: the process is up
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        latency_ms: None,
    })
}

/// Readiness: the billing store answers
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, ApiError> {
    let result = state.billing.health_check().await;

    match result.status {
        AdapterHealth::Healthy | AdapterHealth::Degraded => Ok(Json(HealthResponse {
            status: "ready".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            latency_ms: Some(result.latency_ms),
        })),
        AdapterHealth::Unhealthy => Err(ApiError::Unavailable(
            result
                .message
                .unwrap_or_else(|| format!("{} is unhealthy", result.adapter_id)),
        )),
    }
}
