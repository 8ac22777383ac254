//! Job handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use core_kernel::{CustomerId, JobId};
use tracing::instrument;
use uuid::Uuid;

use crate::dto::job::*;
use crate::dto::rands;
use crate::extract::ValidatedJson;
use crate::{error::ApiError, AppState};

#[instrument(skip(state, request), fields(customer_id = %request.customer_id))]
pub async fn create_job(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    let job = state
        .billing
        .create_job(
            CustomerId::from_uuid(request.customer_id),
            &request.title,
            rands(request.quoted_total)?,
            rands(request.quoted_vat)?,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(JobResponse::from(&job))))
}

/// Quoted, invoiced and remaining amounts of a job
pub async fn job_billing(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobBillingResponse>, ApiError> {
    let summary = state.billing.job_billing_summary(JobId::from_uuid(id)).await?;
    Ok(Json(JobBillingResponse::from(&summary)))
}
