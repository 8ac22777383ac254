//! Billing Domain - Invoices, payments and billing progression
//!
//! This crate holds the billing rules of the field-service system: how a
//! job's quoted total is billed through deposit, progress and balance
//! invoices, how payments settle invoices, and which status an invoice shows.
//!
//! # Billing Progression
//!
//! A job is billed either with one full invoice or with a progression:
//! - **Deposit**: up-front percentage of the quoted total, at most one per job
//! - **Progress**: further percentages, as many as fit under the quoted total
//! - **Balance**: whatever remains, at most one per job
//!
//! The sum of progression invoice totals never exceeds the quoted total.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::progression::{request_deposit, QuotedTotals};
//!
//! let quote = QuotedTotals::from_job(&job);
//! let draft = request_deposit(&quote, &issued, dec!(50))?;
//! assert_eq!(draft.total, Money::zar(500_000));
//! ```

pub mod customer;
pub mod error;
pub mod invoice;
pub mod job;
pub mod line_item;
pub mod numbering;
pub mod payment;
pub mod ports;
pub mod progression;
pub mod quote;
pub mod services;
pub mod status;

pub use customer::Customer;
pub use error::BillingError;
pub use invoice::{Invoice, InvoiceStatus, InvoiceType};
pub use job::{Job, JobStatus};
pub use line_item::{LineItem, Totals, STANDARD_VAT_RATE};
pub use payment::{apply_payment, Payment, PaymentMethod};
pub use ports::{BillingPort, JobUpdate};
pub use progression::{
    compute_remaining, request_balance, request_deposit, request_progress, InvoiceDraft,
    IssuedInvoice, QuotedTotals, Remaining,
};
pub use quote::{Quote, QuoteStatus};
pub use services::{
    BillingService, BillingTerms, FullInvoiceRequest, InvoiceView, JobBillingSummary,
    PaymentRequest, ServiceError,
};
pub use status::classify_status;
