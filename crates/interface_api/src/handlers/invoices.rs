//! Invoice handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use core_kernel::{InvoiceId, JobId};
use tracing::instrument;
use uuid::Uuid;

use crate::dto::invoice::*;
use crate::extract::ValidatedJson;
use crate::{error::ApiError, AppState};

type Created<T> = (StatusCode, Json<T>);

fn created(state: &AppState, invoice: &domain_billing::Invoice) -> Created<InvoiceResponse> {
    let today = state.billing.today();
    (StatusCode::CREATED, Json(InvoiceResponse::as_of(invoice, today)))
}

/// Bills a percentage of the quoted total up front
#[instrument(skip(state, request), fields(job_id = %request.job_id))]
pub async fn create_deposit(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<DepositInvoiceRequest>,
) -> Result<Created<InvoiceResponse>, ApiError> {
    let invoice = state
        .billing
        .create_deposit_invoice(JobId::from_uuid(request.job_id), request.deposit_percentage)
        .await?;
    Ok(created(&state, &invoice))
}

/// Bills a further percentage of the quoted total
#[instrument(skip(state, request), fields(job_id = %request.job_id))]
pub async fn create_progress(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ProgressInvoiceRequest>,
) -> Result<Created<InvoiceResponse>, ApiError> {
    let invoice = state
        .billing
        .create_progress_invoice(JobId::from_uuid(request.job_id), request.percentage)
        .await?;
    Ok(created(&state, &invoice))
}

/// Bills whatever remains of the quoted total
#[instrument(skip(state, request), fields(job_id = %request.job_id))]
pub async fn create_balance(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<BalanceInvoiceRequest>,
) -> Result<Created<InvoiceResponse>, ApiError> {
    let invoice = state
        .billing
        .create_balance_invoice(JobId::from_uuid(request.job_id))
        .await?;
    Ok(created(&state, &invoice))
}

/// Creates a full invoice from line items
#[instrument(skip(state, request), fields(customer_id = %request.customer_id))]
pub async fn create_invoice(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateInvoiceRequest>,
) -> Result<Created<InvoiceResponse>, ApiError> {
    let invoice = state.billing.create_full_invoice(request.into_request()?).await?;
    Ok(created(&state, &invoice))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let view = state.billing.get_invoice(InvoiceId::from_uuid(id)).await?;
    Ok(Json(InvoiceResponse::from(&view)))
}

/// Deletes an invoice; `?force=true` also removes its payments
#[instrument(skip(state))]
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteInvoiceQuery>,
) -> Result<StatusCode, ApiError> {
    state
        .billing
        .delete_invoice(InvoiceId::from_uuid(id), query.force)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Unpaid invoices past their due date
pub async fn list_overdue(
    State(state): State<AppState>,
) -> Result<Json<Vec<InvoiceResponse>>, ApiError> {
    let overdue = state.billing.overdue_invoices().await?;
    Ok(Json(overdue.iter().map(InvoiceResponse::from).collect()))
}

/// Records a payment against an invoice
///
/// Answers `201 Created` with the updated invoice, not the payment row; the
/// payments themselves are listed by `GET /invoices/:id/payments`.
#[instrument(skip(state, request))]
pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<RecordPaymentRequest>,
) -> Result<Created<InvoiceResponse>, ApiError> {
    let invoice = state
        .billing
        .record_payment(InvoiceId::from_uuid(id), request.into_request()?)
        .await?;
    Ok(created(&state, &invoice))
}

pub async fn list_payments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state.billing.invoice_payments(InvoiceId::from_uuid(id)).await?;
    Ok(Json(payments.iter().map(PaymentResponse::from).collect()))
}

pub async fn mark_sent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state.billing.mark_invoice_sent(InvoiceId::from_uuid(id)).await?;
    Ok(Json(InvoiceResponse::as_of(&invoice, state.billing.today())))
}

pub async fn mark_viewed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state.billing.mark_invoice_viewed(InvoiceId::from_uuid(id)).await?;
    Ok(Json(InvoiceResponse::as_of(&invoice, state.billing.today())))
}

pub async fn mark_paid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, ApiError> {
    let invoice = state.billing.mark_invoice_paid(InvoiceId::from_uuid(id)).await?;
    Ok(Json(InvoiceResponse::as_of(&invoice, state.billing.today())))
}
