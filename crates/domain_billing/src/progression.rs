//! Billing progression
//!
//! Validates deposit, progress and balance requests against a job's quoted
//! total and builds the draft invoice for each. Everything here is pure:
//! callers load the job's invoices, call in, and persist the draft.
//!
//! The sum of deposit, progress and balance totals for a job never exceeds
//! the quoted total. Full invoices stand outside the progression and are not
//! counted. VAT is apportioned with the same percentage as the total, and
//! the balance carries whatever quoted VAT is still unbilled so the VAT of
//! all progression invoices adds up to the quoted VAT exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{Currency, InvoiceId, Money, Percentage};

use crate::error::BillingError;
use crate::invoice::InvoiceType;
use crate::job::Job;
use crate::line_item::LineItem;

/// Quoted amounts the progression is measured against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedTotals {
    /// Quoted total including VAT
    pub total: Money,
    /// VAT portion of the total
    pub vat_amount: Money,
    /// Job title used in line-item descriptions
    pub title: String,
}

impl QuotedTotals {
    pub fn new(total: Money, vat_amount: Money, title: impl Into<String>) -> Self {
        Self {
            total,
            vat_amount,
            title: title.into(),
        }
    }

    pub fn from_job(job: &Job) -> Self {
        Self::new(job.quoted_total, job.quoted_vat, job.title.clone())
    }

    fn currency(&self) -> Currency {
        self.total.currency()
    }
}

/// An invoice already raised against the job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedInvoice {
    pub id: InvoiceId,
    pub invoice_type: InvoiceType,
    pub invoice_number: String,
    pub total: Money,
    pub vat_amount: Money,
    pub percentage: Option<Percentage>,
    pub fully_paid: bool,
}

/// What is left to bill on a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remaining {
    pub amount: Money,
    /// Share of the quoted total, rounded to 2 dp
    pub percentage: Decimal,
}

/// A validated invoice ready to be numbered and persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDraft {
    pub invoice_type: InvoiceType,
    pub percentage: Option<Percentage>,
    pub subtotal: Money,
    pub vat_amount: Money,
    pub total: Money,
    pub line_items: Vec<LineItem>,
    pub notes: Option<String>,
    pub parent_invoice_id: Option<InvoiceId>,
}

/// Returns the part of `quote_total` not yet covered by progression invoices
pub fn compute_remaining(
    quote_total: Money,
    issued: &[IssuedInvoice],
) -> Result<Remaining, BillingError> {
    let invoiced = invoiced_total(quote_total.currency(), issued)?;
    let amount = quote_total.checked_sub(&invoiced)?;
    let percentage = if quote_total.is_zero() {
        Decimal::ZERO
    } else {
        amount.percentage_of(&quote_total)?
    };
    Ok(Remaining { amount, percentage })
}

/// Validates a requested share of the quoted total
///
/// More than 0, at most 100, and at most two decimal places: the share is
/// stored next to the invoice and must reproduce the amount billed.
pub fn requested_percentage(value: Decimal) -> Result<Percentage, BillingError> {
    if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(BillingError::validation(format!(
            "Percentage must be greater than 0 and at most 100, got {}",
            value
        )));
    }
    if value.normalize().scale() > 2 {
        return Err(BillingError::validation(format!(
            "Percentage may have at most two decimal places, got {}",
            value
        )));
    }
    Ok(Percentage::new(value)?)
}

/// Builds a deposit invoice for `percentage` of the quoted total
pub fn request_deposit(
    quote: &QuotedTotals,
    issued: &[IssuedInvoice],
    percentage: Decimal,
) -> Result<InvoiceDraft, BillingError> {
    ensure_quote_billable(quote)?;
    let percentage = requested_percentage(percentage)?;

    if issued.iter().any(|inv| inv.invoice_type == InvoiceType::Deposit) {
        return Err(BillingError::validation(
            "A deposit invoice already exists for this job",
        ));
    }

    let (total, vat_amount) = share_of_quote(quote, issued, percentage)?;
    let subtotal = total.checked_sub(&vat_amount)?;

    debug!(
        percentage = %percentage,
        total = %total,
        "Deposit draft computed"
    );

    Ok(InvoiceDraft {
        invoice_type: InvoiceType::Deposit,
        percentage: Some(percentage),
        subtotal,
        vat_amount,
        total,
        line_items: vec![LineItem::single(
            format!("Deposit for {} ({})", quote.title, percentage),
            total,
        )],
        notes: None,
        parent_invoice_id: None,
    })
}

/// Builds a progress invoice for `percentage` of the quoted total
///
/// Invoicing exactly up to the quoted total is allowed. A request that takes
/// the invoiced percentages to exactly 100 bills whatever remains, like a
/// balance would, so per-invoice rounding never blocks the final payment.
pub fn request_progress(
    quote: &QuotedTotals,
    issued: &[IssuedInvoice],
    percentage: Decimal,
) -> Result<InvoiceDraft, BillingError> {
    ensure_quote_billable(quote)?;
    let percentage = requested_percentage(percentage)?;

    let (total, vat_amount) = share_of_quote(quote, issued, percentage)?;
    let subtotal = total.checked_sub(&vat_amount)?;

    let invoiced_after = invoiced_total(quote.currency(), issued)?.checked_add(&total)?;
    let cumulative = invoiced_after.percentage_of(&quote.total)?;

    debug!(
        percentage = %percentage,
        total = %total,
        cumulative = %cumulative,
        "Progress draft computed"
    );

    Ok(InvoiceDraft {
        invoice_type: InvoiceType::Progress,
        percentage: Some(percentage),
        subtotal,
        vat_amount,
        total,
        line_items: vec![LineItem::single(
            format!("Progress payment ({} of total) - {}", percentage, quote.title),
            subtotal,
        )],
        notes: Some(format!(
            "Progress payment {} ({:.1}% of total invoiced)",
            percentage, cumulative
        )),
        parent_invoice_id: None,
    })
}

/// Builds the balance invoice for whatever remains of the quoted total
///
/// A second balance is rejected before the remaining amount is looked at.
pub fn request_balance(
    quote: &QuotedTotals,
    issued: &[IssuedInvoice],
) -> Result<InvoiceDraft, BillingError> {
    if issued.iter().any(|inv| inv.invoice_type == InvoiceType::Balance) {
        return Err(BillingError::DuplicateBalance);
    }
    ensure_quote_billable(quote)?;

    let remaining = compute_remaining(quote.total, issued)?;
    if !remaining.amount.is_positive() {
        return Err(BillingError::NothingRemaining);
    }

    let vat_amount = unbilled_vat(quote, issued, remaining.amount)?;
    let subtotal = remaining.amount.checked_sub(&vat_amount)?;

    let mut line_items = vec![LineItem::single(
        format!("Final payment for {}", quote.title),
        quote.total,
    )];
    line_items.extend(progression(issued).map(|inv| {
        let label = match inv.invoice_type {
            InvoiceType::Deposit => "Deposit",
            _ => "Progress",
        };
        let share = inv
            .percentage
            .map(|p| format!(" - {}", p))
            .unwrap_or_default();
        LineItem::single(
            format!("Less: {} paid ({}){}", label, inv.invoice_number, share),
            inv.total.negate(),
        )
    }));

    debug!(
        total = %remaining.amount,
        percentage = %remaining.percentage,
        "Balance draft computed"
    );

    Ok(InvoiceDraft {
        invoice_type: InvoiceType::Balance,
        percentage: None,
        subtotal,
        vat_amount,
        total: remaining.amount,
        line_items,
        notes: None,
        parent_invoice_id: progression(issued).next().map(|inv| inv.id),
    })
}

fn progression(issued: &[IssuedInvoice]) -> impl Iterator<Item = &IssuedInvoice> {
    issued.iter().filter(|inv| inv.invoice_type.is_progression())
}

fn invoiced_total(currency: Currency, issued: &[IssuedInvoice]) -> Result<Money, BillingError> {
    Ok(Money::sum(progression(issued).map(|inv| &inv.total), currency)?)
}

fn ensure_quote_billable(quote: &QuotedTotals) -> Result<(), BillingError> {
    if !quote.total.is_positive() {
        return Err(BillingError::validation(format!(
            "Quoted total must be positive, got {}",
            quote.total
        )));
    }
    Ok(())
}

/// Total and VAT for `percentage` of the quote
///
/// Shares are checked in percent first, then in cents against what remains.
/// When the share completes 100% it takes the remaining amount and the
/// unbilled VAT instead of its own rounded figures.
fn share_of_quote(
    quote: &QuotedTotals,
    issued: &[IssuedInvoice],
    percentage: Percentage,
) -> Result<(Money, Money), BillingError> {
    let remaining = compute_remaining(quote.total, issued)?;
    let nominal = quote.total.percent_of(percentage)?;
    let overshoot = || BillingError::Overshoot {
        requested: nominal,
        remaining: remaining.amount,
    };

    let percent_after = invoiced_percentage(issued) + percentage.value();
    if percent_after > Decimal::ONE_HUNDRED {
        return Err(overshoot());
    }

    let closes = percent_after == Decimal::ONE_HUNDRED && remaining.amount.is_positive();
    let (total, vat_amount) = if closes {
        (remaining.amount, unbilled_vat(quote, issued, remaining.amount)?)
    } else {
        (nominal, quote.vat_amount.percent_of(percentage)?)
    };

    if total.minor_units() > remaining.amount.minor_units() {
        return Err(overshoot());
    }
    if !total.is_positive() {
        return Err(BillingError::validation(format!(
            "{} of {} rounds to {}; request a larger share",
            percentage, quote.total, total
        )));
    }
    Ok((total, vat_amount))
}

/// Share of the quote already claimed by deposit and progress invoices
fn invoiced_percentage(issued: &[IssuedInvoice]) -> Decimal {
    progression(issued)
        .filter_map(|inv| inv.percentage)
        .map(|p| p.value())
        .sum()
}

/// Quoted VAT not yet billed, capped at `amount`
fn unbilled_vat(
    quote: &QuotedTotals,
    issued: &[IssuedInvoice],
    amount: Money,
) -> Result<Money, BillingError> {
    let billed = Money::sum(
        progression(issued).map(|inv| &inv.vat_amount),
        quote.currency(),
    )?;
    Ok(clamp(
        quote.vat_amount.checked_sub(&billed)?,
        Money::zero(quote.currency()),
        amount,
    ))
}

fn clamp(value: Money, min: Money, max: Money) -> Money {
    if value.minor_units() < min.minor_units() {
        min
    } else if value.minor_units() > max.minor_units() {
        max
    } else {
        value
    }
}
