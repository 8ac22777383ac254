//! Invoice status classification
//!
//! The persisted status only records explicit actions (sent, viewed,
//! payments). Whether an invoice is paid or overdue right now is derived
//! from its amounts and due date every time it is shown.

use chrono::NaiveDate;

use core_kernel::Money;

use crate::invoice::InvoiceStatus;

/// Computes the status an invoice should display on `today`
///
/// Rules, first match wins:
/// 1. fully paid is `Paid`, even past due
/// 2. drafts stay `Draft`; they were never sent so cannot be late
/// 3. past the due date is `Overdue`, including partially paid invoices
/// 4. otherwise the persisted status
///
/// An invoice without a due date is never overdue.
pub fn classify_status(
    persisted: InvoiceStatus,
    due_date: Option<NaiveDate>,
    amount_paid: Money,
    total: Money,
    today: NaiveDate,
) -> InvoiceStatus {
    if amount_paid.minor_units() >= total.minor_units() {
        return InvoiceStatus::Paid;
    }
    if persisted == InvoiceStatus::Draft {
        return InvoiceStatus::Draft;
    }
    match due_date {
        Some(due) if due < today => InvoiceStatus::Overdue,
        _ => persisted,
    }
}
