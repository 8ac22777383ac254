//! Customer handlers

use axum::{extract::State, http::StatusCode, Json};
use tracing::instrument;

use crate::dto::customer::*;
use crate::extract::ValidatedJson;
use crate::{error::ApiError, AppState};

#[instrument(skip(state, request))]
pub async fn create_customer(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), ApiError> {
    let customer = state
        .billing
        .create_customer(&request.name, &request.phone, request.email, request.address)
        .await?;
    Ok((StatusCode::CREATED, Json(CustomerResponse::from(&customer))))
}
