//! Payment processing
//!
//! Payments are immutable records. Applying one to an invoice is a pure
//! function; the store persists the payment and the updated invoice together.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use core_kernel::{InvoiceId, Money, PaymentId};

use crate::error::BillingError;
use crate::invoice::{Invoice, InvoiceStatus};

/// Payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    /// Electronic funds transfer
    Eft,
    Card,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Eft => "eft",
            PaymentMethod::Card => "card",
            PaymentMethod::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "eft" => Ok(PaymentMethod::Eft),
            "card" => Ok(PaymentMethod::Card),
            "other" => Ok(PaymentMethod::Other),
            other => Err(BillingError::validation(format!("Unknown payment method: {}", other))),
        }
    }
}

/// A payment received against an invoice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Invoice being paid
    pub invoice_id: InvoiceId,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    /// Date the money was received
    pub payment_date: NaiveDate,
    /// Bank or slip reference
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new payment
    pub fn new(
        invoice_id: InvoiceId,
        amount: Money,
        payment_method: PaymentMethod,
        payment_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            invoice_id,
            amount,
            payment_method,
            payment_date,
            reference: None,
            created_at: now,
        }
    }

    /// Sets the external reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Applies `payment` to `invoice`, returning the updated invoice
///
/// The payment must be positive and no larger than the outstanding amount.
/// `paid_at` is stamped only on the transition into `Paid`. The invoice
/// `version` is left for the store to bump when it writes.
pub fn apply_payment(
    invoice: &Invoice,
    payment: &Payment,
    now: DateTime<Utc>,
) -> Result<Invoice, BillingError> {
    if payment.invoice_id != invoice.id {
        return Err(BillingError::validation(format!(
            "Payment {} does not belong to invoice {}",
            payment.id, invoice.invoice_number
        )));
    }
    if payment.amount.currency() != invoice.total.currency() {
        return Err(BillingError::validation(format!(
            "Payment currency {} does not match invoice currency {}",
            payment.amount.currency(),
            invoice.total.currency()
        )));
    }
    if !payment.amount.is_positive() {
        return Err(BillingError::validation("Payment amount must be greater than 0"));
    }

    let outstanding = invoice.outstanding()?;
    if payment.amount.minor_units() > outstanding.minor_units() {
        return Err(BillingError::Overpayment {
            amount: payment.amount,
            outstanding,
        });
    }

    let mut updated = invoice.clone();
    updated.amount_paid = invoice.amount_paid.checked_add(&payment.amount)?;
    updated.updated_at = now;

    if updated.is_fully_paid() {
        if invoice.status != InvoiceStatus::Paid {
            updated.paid_at = Some(now);
        }
        updated.status = InvoiceStatus::Paid;
    } else if updated.amount_paid.is_positive() {
        updated.status = InvoiceStatus::PartiallyPaid;
    }

    debug!(
        invoice_number = %invoice.invoice_number,
        amount = %payment.amount,
        amount_paid = %updated.amount_paid,
        status = %updated.status,
        "Payment applied"
    );

    Ok(updated)
}
