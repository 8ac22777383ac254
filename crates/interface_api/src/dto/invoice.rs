//! Invoice and payment DTOs

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{CustomerId, JobId};
use domain_billing::{
    FullInvoiceRequest, Invoice, InvoiceStatus, InvoiceView, LineItem, Payment, PaymentMethod,
    PaymentRequest,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{rands, validate_cents, validate_positive_amount};
use crate::error::ApiError;

fn validate_percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage")
            .with_message("must be greater than 0 and at most 100".into()));
    }
    if value.normalize().scale() > 2 {
        return Err(ValidationError::new("percentage")
            .with_message("at most two decimal places".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct DepositInvoiceRequest {
    pub job_id: Uuid,
    #[validate(custom(function = "validate_percentage"))]
    pub deposit_percentage: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProgressInvoiceRequest {
    pub job_id: Uuid,
    #[validate(custom(function = "validate_percentage"))]
    pub percentage: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BalanceInvoiceRequest {
    pub job_id: Uuid,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct LineItemDto {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    pub quantity: Decimal,
    #[validate(custom(function = "validate_cents"))]
    pub unit_price: Decimal,
}

impl LineItemDto {
    fn into_line_item(self) -> Result<LineItem, ApiError> {
        Ok(LineItem::new(self.description, self.quantity, rands(self.unit_price)?)?)
    }
}

impl From<&LineItem> for LineItemDto {
    fn from(item: &LineItem) -> Self {
        Self {
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.amount(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub customer_id: Uuid,
    pub job_id: Option<Uuid>,
    #[validate(length(min = 1, message = "at least one line item is required"), nested)]
    pub line_items: Vec<LineItemDto>,
    #[serde(default)]
    pub vat_registered: bool,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

impl CreateInvoiceRequest {
    pub fn into_request(self) -> Result<FullInvoiceRequest, ApiError> {
        let line_items = self
            .line_items
            .into_iter()
            .map(LineItemDto::into_line_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FullInvoiceRequest {
            customer_id: CustomerId::from_uuid(self.customer_id),
            job_id: self.job_id.map(JobId::from_uuid),
            line_items,
            vat_registered: self.vat_registered,
            due_date: self.due_date,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    #[validate(custom(function = "validate_positive_amount"))]
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
}

impl RecordPaymentRequest {
    pub fn into_request(self) -> Result<PaymentRequest, ApiError> {
        Ok(PaymentRequest {
            amount: rands(self.amount)?,
            payment_method: self.payment_method,
            payment_date: self.payment_date,
            reference: self.reference.filter(|r| !r.trim().is_empty()),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteInvoiceQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub job_id: Option<Uuid>,
    pub invoice_type: String,
    /// Status as of today: overdue and paid are derived, not stored
    pub status: String,
    pub deposit_percentage: Option<Decimal>,
    pub line_items: Vec<LineItemDto>,
    pub subtotal: Decimal,
    pub vat_amount: Decimal,
    pub total: Decimal,
    pub amount_paid: Decimal,
    pub outstanding: Decimal,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub parent_invoice_id: Option<Uuid>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InvoiceResponse {
    pub fn new(invoice: &Invoice, status: InvoiceStatus) -> Self {
        Self {
            id: *invoice.id.as_uuid(),
            invoice_number: invoice.invoice_number.clone(),
            customer_id: *invoice.customer_id.as_uuid(),
            job_id: invoice.job_id.map(|id| *id.as_uuid()),
            invoice_type: invoice.invoice_type.as_str().to_string(),
            status: status.as_str().to_string(),
            deposit_percentage: invoice.deposit_percentage.map(|p| p.value()),
            line_items: invoice.line_items.iter().map(LineItemDto::from).collect(),
            subtotal: invoice.subtotal.amount(),
            vat_amount: invoice.vat_amount.amount(),
            total: invoice.total.amount(),
            amount_paid: invoice.amount_paid.amount(),
            outstanding: invoice.total.amount() - invoice.amount_paid.amount(),
            due_date: invoice.due_date,
            notes: invoice.notes.clone(),
            parent_invoice_id: invoice.parent_invoice_id.map(|id| *id.as_uuid()),
            sent_at: invoice.sent_at,
            viewed_at: invoice.viewed_at,
            paid_at: invoice.paid_at,
            created_at: invoice.created_at,
        }
    }

    pub fn as_of(invoice: &Invoice, today: NaiveDate) -> Self {
        Self::new(invoice, invoice.effective_status(today))
    }
}

impl From<&InvoiceView> for InvoiceResponse {
    fn from(view: &InvoiceView) -> Self {
        Self::new(&view.invoice, view.effective_status)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            id: *payment.id.as_uuid(),
            invoice_id: *payment.invoice_id.as_uuid(),
            amount: payment.amount.amount(),
            payment_method: payment.payment_method,
            payment_date: payment.payment_date,
            reference: payment.reference.clone(),
            created_at: payment.created_at,
        }
    }
}
