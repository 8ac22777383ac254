//! Billing domain errors

use core_kernel::{Money, MoneyError};
use thiserror::Error;

use crate::invoice::InvoiceStatus;

/// Errors that can occur in the billing domain
///
/// Every variant is local to a single call and non-retryable: the caller
/// reports it back to the user and takes no corrective action on its own.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BillingError {
    /// Malformed percentage, amount or request
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request would bill more than the job's quoted total
    #[error("Cannot invoice {requested}: only {remaining} of the quoted total remains")]
    Overshoot {
        requested: Money,
        remaining: Money,
    },

    /// The payment is larger than the invoice's outstanding amount
    #[error("Payment of {amount} exceeds outstanding amount of {outstanding}")]
    Overpayment {
        amount: Money,
        outstanding: Money,
    },

    /// The job already has a balance invoice
    #[error("A balance invoice already exists for this job")]
    DuplicateBalance,

    /// Nothing of the quoted total is left to invoice
    #[error("Job already fully invoiced: nothing remains to bill")]
    NothingRemaining,

    /// A status action is not allowed from the current status
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    /// A lifecycle action on a quote or job is not allowed
    #[error("Invalid lifecycle action: {0}")]
    InvalidLifecycle(String),

    /// Balance requested while earlier progression invoices are unpaid
    #[error("All previous invoices must be paid before creating a balance invoice. Unpaid: {}", .0.join(", "))]
    UnpaidPriorInvoices(Vec<String>),

    /// Deleting an invoice that still has payments, without force
    #[error("Cannot delete invoice {0} with recorded payments")]
    HasPayments(String),

    /// Arithmetic failure (currency mismatch, overflow)
    #[error("Calculation error: {0}")]
    Money(#[from] MoneyError),
}

impl BillingError {
    pub fn validation(message: impl Into<String>) -> Self {
        BillingError::Validation(message.into())
    }

    /// Stable machine-readable kind, used as the error code at the API boundary
    pub fn kind(&self) -> &'static str {
        match self {
            BillingError::Validation(_) => "validation_error",
            BillingError::Overshoot { .. } => "overshoot_error",
            BillingError::Overpayment { .. } => "overpayment_error",
            BillingError::DuplicateBalance => "duplicate_balance_error",
            BillingError::NothingRemaining => "nothing_remaining_error",
            BillingError::InvalidStatusTransition { .. } => "invalid_status_transition",
            BillingError::InvalidLifecycle(_) => "invalid_lifecycle",
            BillingError::UnpaidPriorInvoices(_) => "unpaid_prior_invoices",
            BillingError::HasPayments(_) => "has_payments",
            BillingError::Money(_) => "calculation_error",
        }
    }
}
