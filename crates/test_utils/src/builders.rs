//! Test Data Builders
//!
//! Builders for invoices in any state, so tests can set just the fields they
//! care about: type, totals, amount paid, status and due date. Progression
//! drafts can be turned into stored or issued invoices directly.

use chrono::{DateTime, NaiveDate, Utc};
use core_kernel::{CustomerId, InvoiceId, JobId, Money, Percentage};
use domain_billing::{
    Invoice, InvoiceDraft, InvoiceStatus, InvoiceType, IssuedInvoice, LineItem, Payment,
    PaymentMethod,
};

use crate::fixtures::{MoneyFixtures, TemporalFixtures};

/// Builder for invoices
pub struct InvoiceBuilder {
    invoice_type: InvoiceType,
    number: String,
    customer_id: CustomerId,
    job_id: Option<JobId>,
    percentage: Option<Percentage>,
    total: Money,
    vat_amount: Money,
    amount_paid: Option<Money>,
    status: InvoiceStatus,
    due_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl Default for InvoiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl InvoiceBuilder {
    /// A sent R1,500.00 full invoice due seven days after the fixture date
    pub fn new() -> Self {
        Self {
            invoice_type: InvoiceType::Full,
            number: "INV-2025-001".to_string(),
            customer_id: CustomerId::new(),
            job_id: None,
            percentage: None,
            total: MoneyFixtures::invoice_total(),
            vat_amount: Money::zar(0),
            amount_paid: None,
            status: InvoiceStatus::Sent,
            due_date: Some(TemporalFixtures::date(2025, 3, 10)),
            created_at: TemporalFixtures::now(),
        }
    }

    /// A progression invoice of `percentage` against `job_id`
    pub fn progression(
        invoice_type: InvoiceType,
        job_id: JobId,
        percentage: Percentage,
        total: Money,
    ) -> Self {
        Self::new()
            .with_type(invoice_type)
            .with_job(job_id)
            .with_percentage(percentage)
            .with_total(total)
    }

    pub fn with_type(mut self, invoice_type: InvoiceType) -> Self {
        self.invoice_type = invoice_type;
        self
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = number.into();
        self
    }

    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = customer_id;
        self
    }

    pub fn with_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_percentage(mut self, percentage: Percentage) -> Self {
        self.percentage = Some(percentage);
        self
    }

    pub fn with_total(mut self, total: Money) -> Self {
        self.total = total;
        self
    }

    pub fn with_vat(mut self, vat_amount: Money) -> Self {
        self.vat_amount = vat_amount;
        self
    }

    pub fn with_amount_paid(mut self, amount_paid: Money) -> Self {
        self.amount_paid = Some(amount_paid);
        self
    }

    pub fn with_status(mut self, status: InvoiceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn without_due_date(mut self) -> Self {
        self.due_date = None;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Builds the invoice
    ///
    /// Sums are written as given; the builder does not re-derive totals from
    /// line items, so tests can set up inconsistent stored state on purpose.
    pub fn build(self) -> Invoice {
        let currency = self.total.currency();
        let subtotal = self
            .total
            .checked_sub(&self.vat_amount)
            .unwrap_or(self.total);

        Invoice {
            id: InvoiceId::new_v7(),
            invoice_number: self.number,
            customer_id: self.customer_id,
            job_id: self.job_id,
            invoice_type: self.invoice_type,
            deposit_percentage: self.percentage,
            line_items: vec![LineItem::single("Work as quoted", subtotal)],
            subtotal,
            vat_amount: self.vat_amount,
            total: self.total,
            amount_paid: self.amount_paid.unwrap_or(Money::zero(currency)),
            status: self.status,
            due_date: self.due_date,
            notes: None,
            parent_invoice_id: None,
            sent_at: (self.status != InvoiceStatus::Draft).then_some(self.created_at),
            viewed_at: None,
            paid_at: (self.status == InvoiceStatus::Paid).then_some(self.created_at),
            version: 0,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Stores a progression draft as a draft invoice on a fresh job
pub fn invoice_from_draft(draft: InvoiceDraft, number: &str) -> Invoice {
    Invoice::from_draft(
        draft,
        CustomerId::new(),
        JobId::new(),
        number,
        TemporalFixtures::date(2025, 3, 10),
        TemporalFixtures::now(),
    )
}

/// A progression draft as the engine sees it once issued
pub fn issue_draft(draft: InvoiceDraft, number: &str) -> IssuedInvoice {
    invoice_from_draft(draft, number).to_issued()
}

/// Cash payment against `invoice`, dated the fixture day
pub fn cash_payment(invoice: &Invoice, amount: Money) -> Payment {
    Payment::new(
        invoice.id,
        amount,
        PaymentMethod::Cash,
        TemporalFixtures::today(),
        TemporalFixtures::now(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_invoice_is_sent_and_unpaid() {
        let invoice = InvoiceBuilder::new().build();
        assert_eq!(invoice.status, InvoiceStatus::Sent);
        assert!(invoice.amount_paid.is_zero());
        assert!(invoice.sent_at.is_some());
        assert_eq!(invoice.outstanding().unwrap(), MoneyFixtures::invoice_total());
    }

    #[test]
    fn test_progression_builder_sets_percentage() {
        let job_id = JobId::new();
        let invoice = InvoiceBuilder::progression(
            InvoiceType::Deposit,
            job_id,
            Percentage::whole(50),
            Money::zar(500_000),
        )
        .build();

        assert_eq!(invoice.job_id, Some(job_id));
        assert_eq!(invoice.deposit_percentage, Some(Percentage::whole(50)));
        assert_eq!(invoice.to_issued().total, Money::zar(500_000));
    }

    #[test]
    fn test_issued_draft_keeps_its_figures() {
        let quote = domain_billing::QuotedTotals::new(
            MoneyFixtures::quote_total(),
            MoneyFixtures::quote_vat(),
            "Roof repair",
        );
        let draft = domain_billing::request_deposit(&quote, &[], rust_decimal::Decimal::from(30))
            .unwrap();
        let issued = issue_draft(draft.clone(), "INV-2025-001");

        assert_eq!(issued.invoice_type, InvoiceType::Deposit);
        assert_eq!(issued.total, draft.total);
        assert_eq!(issued.vat_amount, draft.vat_amount);
        assert!(!issued.fully_paid);
    }
}
