//! Invoice management
//!
//! Invoices are raised against a job either as a single full invoice or as a
//! progression of deposit, progress and balance invoices. Amounts are fixed
//! at creation; afterwards only payments and status actions touch an invoice.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CustomerId, InvoiceId, JobId, Money, Percentage};

use crate::error::BillingError;
use crate::line_item::{LineItem, Totals};
use crate::progression::{InvoiceDraft, IssuedInvoice};
use crate::status::classify_status;

/// Kind of invoice within a job's billing progression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    /// Bills the whole job at once; not part of the progression
    Full,
    /// Up-front percentage of the quoted total
    Deposit,
    /// Interim percentage of the quoted total
    Progress,
    /// Whatever remains of the quoted total
    Balance,
}

impl InvoiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Full => "full",
            InvoiceType::Deposit => "deposit",
            InvoiceType::Progress => "progress",
            InvoiceType::Balance => "balance",
        }
    }

    /// Whether the invoice counts towards the job's quoted total
    pub fn is_progression(&self) -> bool {
        !matches!(self, InvoiceType::Full)
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceType {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(InvoiceType::Full),
            "deposit" => Ok(InvoiceType::Deposit),
            "progress" => Ok(InvoiceType::Progress),
            "balance" => Ok(InvoiceType::Balance),
            other => Err(BillingError::validation(format!("Unknown invoice type: {}", other))),
        }
    }
}

/// Invoice status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Not yet sent to the customer
    Draft,
    /// Sent to the customer
    Sent,
    /// Opened by the customer
    Viewed,
    /// Some but not all of the total received
    PartiallyPaid,
    /// Fully paid
    Paid,
    /// Past due date and not fully paid
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Viewed => "viewed",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "viewed" => Ok(InvoiceStatus::Viewed),
            "partially_paid" => Ok(InvoiceStatus::PartiallyPaid),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            other => Err(BillingError::validation(format!("Unknown invoice status: {}", other))),
        }
    }
}

/// An invoice issued to a customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Unique identifier
    pub id: InvoiceId,
    /// Human-readable number, `INV-YYYY-NNN`
    pub invoice_number: String,
    /// Customer being billed
    pub customer_id: CustomerId,
    /// Job the invoice belongs to, if any
    pub job_id: Option<JobId>,
    pub invoice_type: InvoiceType,
    /// Share of the quoted total; deposit and progress invoices only
    pub deposit_percentage: Option<Percentage>,
    pub line_items: Vec<LineItem>,
    pub subtotal: Money,
    pub vat_amount: Money,
    pub total: Money,
    /// Sum of recorded payments, never above `total`
    pub amount_paid: Money,
    /// Persisted status; see [`Invoice::effective_status`] for display
    pub status: InvoiceStatus,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Balance invoices link to the first invoice of the progression
    pub parent_invoice_id: Option<InvoiceId>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    /// Optimistic-concurrency counter, bumped by the store on every write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Creates a draft invoice from a progression draft
    pub fn from_draft(
        draft: InvoiceDraft,
        customer_id: CustomerId,
        job_id: JobId,
        invoice_number: impl Into<String>,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Self {
        let currency = draft.total.currency();
        Self {
            id: InvoiceId::new_v7(),
            invoice_number: invoice_number.into(),
            customer_id,
            job_id: Some(job_id),
            invoice_type: draft.invoice_type,
            deposit_percentage: draft.percentage,
            line_items: draft.line_items,
            subtotal: draft.subtotal,
            vat_amount: draft.vat_amount,
            total: draft.total,
            amount_paid: Money::zero(currency),
            status: InvoiceStatus::Draft,
            due_date: Some(due_date),
            notes: draft.notes,
            parent_invoice_id: draft.parent_invoice_id,
            sent_at: None,
            viewed_at: None,
            paid_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a draft full invoice from line items
    pub fn full(
        customer_id: CustomerId,
        job_id: Option<JobId>,
        invoice_number: impl Into<String>,
        line_items: Vec<LineItem>,
        vat_rate: Option<Percentage>,
        due_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Self, BillingError> {
        let currency = line_items
            .first()
            .map(|item| item.unit_price.currency())
            .unwrap_or_default();
        let totals = Totals::from_line_items(&line_items, vat_rate, currency)?;
        if !totals.total.is_positive() {
            return Err(BillingError::validation("Invoice total must be positive"));
        }

        Ok(Self {
            id: InvoiceId::new_v7(),
            invoice_number: invoice_number.into(),
            customer_id,
            job_id,
            invoice_type: InvoiceType::Full,
            deposit_percentage: None,
            line_items,
            subtotal: totals.subtotal,
            vat_amount: totals.vat_amount,
            total: totals.total,
            amount_paid: Money::zero(currency),
            status: InvoiceStatus::Draft,
            due_date,
            notes: None,
            parent_invoice_id: None,
            sent_at: None,
            viewed_at: None,
            paid_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Amount still owed
    pub fn outstanding(&self) -> Result<Money, BillingError> {
        Ok(self.total.checked_sub(&self.amount_paid)?)
    }

    pub fn is_fully_paid(&self) -> bool {
        self.amount_paid.minor_units() >= self.total.minor_units()
    }

    /// Status as shown to users on `today`
    pub fn effective_status(&self, today: NaiveDate) -> InvoiceStatus {
        classify_status(self.status, self.due_date, self.amount_paid, self.total, today)
    }

    /// Summary the progression validator works from
    pub fn to_issued(&self) -> IssuedInvoice {
        IssuedInvoice {
            id: self.id,
            invoice_type: self.invoice_type,
            invoice_number: self.invoice_number.clone(),
            total: self.total,
            vat_amount: self.vat_amount,
            percentage: self.deposit_percentage,
            fully_paid: self.is_fully_paid(),
        }
    }

    /// Records that the invoice was sent; re-sending restamps `sent_at`
    pub fn mark_sent(&mut self, now: DateTime<Utc>) -> Result<(), BillingError> {
        match self.status {
            InvoiceStatus::Draft | InvoiceStatus::Sent => {
                self.status = InvoiceStatus::Sent;
                self.sent_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
            from => Err(BillingError::InvalidStatusTransition {
                from,
                to: InvoiceStatus::Sent,
            }),
        }
    }

    /// Records the customer opening the invoice
    ///
    /// `viewed_at` is stamped once. Payment statuses are kept as they are.
    pub fn mark_viewed(&mut self, now: DateTime<Utc>) -> Result<(), BillingError> {
        match self.status {
            InvoiceStatus::Draft => {
                return Err(BillingError::InvalidStatusTransition {
                    from: InvoiceStatus::Draft,
                    to: InvoiceStatus::Viewed,
                })
            }
            InvoiceStatus::Sent | InvoiceStatus::Overdue => {
                self.status = InvoiceStatus::Viewed;
            }
            InvoiceStatus::Viewed | InvoiceStatus::PartiallyPaid | InvoiceStatus::Paid => {}
        }
        if self.viewed_at.is_none() {
            self.viewed_at = Some(now);
            self.updated_at = now;
        }
        Ok(())
    }

    /// Marks the invoice paid; only allowed once nothing is outstanding
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> Result<(), BillingError> {
        if self.status == InvoiceStatus::Paid {
            return Ok(());
        }
        if !self.is_fully_paid() {
            return Err(BillingError::InvalidStatusTransition {
                from: self.status,
                to: InvoiceStatus::Paid,
            });
        }
        self.status = InvoiceStatus::Paid;
        self.paid_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Fails unless the invoice may be deleted
    pub fn ensure_deletable(&self, payment_count: usize, force: bool) -> Result<(), BillingError> {
        if payment_count > 0 && !force {
            return Err(BillingError::HasPayments(self.invoice_number.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_item::STANDARD_VAT_RATE;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 2, 10, 30, 0).unwrap()
    }

    fn invoice() -> Invoice {
        Invoice::full(
            CustomerId::new(),
            None,
            "INV-2025-001",
            vec![LineItem::single("Leak repair", Money::zar(100_000))],
            Some(STANDARD_VAT_RATE),
            NaiveDate::from_ymd_opt(2025, 6, 1),
            now(),
        )
        .unwrap()
    }

    #[test]
    fn test_full_invoice_totals() {
        let inv = invoice();
        assert_eq!(inv.invoice_type, InvoiceType::Full);
        assert_eq!(inv.total, Money::zar(115_000));
        assert_eq!(inv.outstanding().unwrap(), Money::zar(115_000));
        assert_eq!(inv.status, InvoiceStatus::Draft);
    }

    #[test]
    fn test_send_then_view() {
        let mut inv = invoice();
        assert!(inv.mark_viewed(now()).is_err());

        inv.mark_sent(now()).unwrap();
        inv.mark_viewed(now()).unwrap();
        let first_view = inv.viewed_at;

        inv.mark_viewed(now() + chrono::Duration::hours(2)).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Viewed);
        assert_eq!(inv.viewed_at, first_view);
        assert!(inv.mark_sent(now()).is_err());
    }

    #[test]
    fn test_mark_paid_requires_zero_outstanding() {
        let mut inv = invoice();
        let err = inv.mark_paid(now()).unwrap_err();
        assert_eq!(
            err,
            BillingError::InvalidStatusTransition {
                from: InvoiceStatus::Draft,
                to: InvoiceStatus::Paid
            }
        );

        inv.amount_paid = inv.total;
        inv.mark_paid(now()).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);
        assert_eq!(inv.paid_at, Some(now()));
    }

    #[test]
    fn test_delete_guard() {
        let inv = invoice();
        assert!(inv.ensure_deletable(0, false).is_ok());
        assert_eq!(
            inv.ensure_deletable(2, false),
            Err(BillingError::HasPayments("INV-2025-001".to_string()))
        );
        assert!(inv.ensure_deletable(2, true).is_ok());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(InvoiceStatus::PartiallyPaid.to_string(), "partially_paid");
        assert_eq!("overdue".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Overdue);
        assert_eq!("balance".parse::<InvoiceType>().unwrap(), InvoiceType::Balance);
        assert!("void".parse::<InvoiceStatus>().is_err());
        assert!(!InvoiceType::Full.is_progression());
    }
}
