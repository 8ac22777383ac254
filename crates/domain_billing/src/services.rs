//! Billing services
//!
//! `BillingService` runs every billing action as read, decide, write: it
//! loads the current state through the port, lets the pure engine decide,
//! and persists with a write guarded by the version it read. A concurrent
//! change in between surfaces as `PortError::Conflict`.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use core_kernel::{
    BusinessCalendar, Clock, CustomerId, HealthCheckResult, InvoiceId, JobId, Money, MoneyError,
    PortError, TemporalError,
};

use crate::customer::Customer;
use crate::error::BillingError;
use crate::invoice::{Invoice, InvoiceStatus, InvoiceType};
use crate::job::{Job, JobStatus};
use crate::line_item::{LineItem, STANDARD_VAT_RATE};
use crate::numbering::{next_document_number, INVOICE_PREFIX, JOB_PREFIX};
use crate::payment::{apply_payment, Payment, PaymentMethod};
use crate::ports::{BillingPort, JobUpdate};
use crate::progression::{
    compute_remaining, request_balance, request_deposit, request_progress, InvoiceDraft,
    IssuedInvoice, QuotedTotals, Remaining,
};
use crate::quote::Quote;

/// Errors returned by the billing service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A billing rule rejected the request
    #[error(transparent)]
    Billing(#[from] BillingError),

    /// The store failed or a concurrent write won
    #[error(transparent)]
    Port(#[from] PortError),

    /// A due date fell outside the supported calendar
    #[error(transparent)]
    Calendar(#[from] TemporalError),
}

impl From<MoneyError> for ServiceError {
    fn from(err: MoneyError) -> Self {
        ServiceError::Billing(BillingError::Money(err))
    }
}

/// Payment terms and billing policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingTerms {
    pub deposit_due_days: u64,
    pub progress_due_days: u64,
    pub balance_due_days: u64,
    pub full_due_days: u64,
    /// Refuse a balance invoice while earlier progression invoices are unpaid
    pub require_paid_before_balance: bool,
}

impl Default for BillingTerms {
    fn default() -> Self {
        Self {
            deposit_due_days: 7,
            progress_due_days: 14,
            balance_due_days: 14,
            full_due_days: 30,
            require_paid_before_balance: false,
        }
    }
}

impl BillingTerms {
    fn due_days(&self, invoice_type: InvoiceType) -> u64 {
        match invoice_type {
            InvoiceType::Deposit => self.deposit_due_days,
            InvoiceType::Progress => self.progress_due_days,
            InvoiceType::Balance => self.balance_due_days,
            InvoiceType::Full => self.full_due_days,
        }
    }
}

/// An invoice together with the status it displays today
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceView {
    pub invoice: Invoice,
    pub effective_status: InvoiceStatus,
}

/// Where a job stands against its quoted total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobBillingSummary {
    pub job: Job,
    /// Sum of deposit, progress and balance totals
    pub invoiced: Money,
    pub remaining: Remaining,
    /// Every invoice of the job, oldest first
    pub invoices: Vec<InvoiceView>,
}

/// Request for a full (non-progression) invoice
#[derive(Debug, Clone)]
pub struct FullInvoiceRequest {
    pub customer_id: CustomerId,
    pub job_id: Option<JobId>,
    pub line_items: Vec<LineItem>,
    /// Adds VAT at the standard rate
    pub vat_registered: bool,
    /// Defaults to the full-invoice payment terms
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Request for recording a payment
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
}

/// Service orchestrating invoices and payments
pub struct BillingService {
    port: Arc<dyn BillingPort>,
    clock: Arc<dyn Clock>,
    calendar: BusinessCalendar,
    terms: BillingTerms,
}

impl BillingService {
    /// Creates a service with default terms
    pub fn new(port: Arc<dyn BillingPort>, clock: Arc<dyn Clock>, calendar: BusinessCalendar) -> Self {
        Self {
            port,
            clock,
            calendar,
            terms: BillingTerms::default(),
        }
    }

    /// Replaces the payment terms and policy
    pub fn with_terms(mut self, terms: BillingTerms) -> Self {
        self.terms = terms;
        self
    }

    pub fn terms(&self) -> &BillingTerms {
        &self.terms
    }

    /// Business-local date right now
    pub fn today(&self) -> NaiveDate {
        self.calendar.today(self.clock.now())
    }

    /// Health of the underlying store
    pub async fn health_check(&self) -> HealthCheckResult {
        self.port.health_check().await
    }

    // ========================================================================
    // Customers and jobs
    // ========================================================================

    pub async fn create_customer(
        &self,
        name: &str,
        phone: &str,
        email: Option<String>,
        address: Option<String>,
    ) -> Result<Customer, ServiceError> {
        let mut customer = Customer::new(name, phone, self.clock.now())?;
        customer.email = email;
        customer.address = address;

        let customer = self.port.insert_customer(customer).await?;
        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    /// Opens a job without a quote, with an explicit total
    pub async fn create_job(
        &self,
        customer_id: CustomerId,
        title: &str,
        quoted_total: Money,
        quoted_vat: Money,
    ) -> Result<Job, ServiceError> {
        self.port.get_customer(customer_id).await?;
        let number = self.next_number(JOB_PREFIX).await?;
        let job = Job::new(customer_id, number, title, quoted_total, quoted_vat, self.clock.now())?;

        let job = self.port.insert_job(job).await?;
        info!(job_id = %job.id, job_number = %job.job_number, total = %job.quoted_total, "Job created");
        Ok(job)
    }

    /// Opens a job from an accepted quote
    pub async fn create_job_from_quote(&self, quote: &Quote, title: &str) -> Result<Job, ServiceError> {
        let number = self.next_number(JOB_PREFIX).await?;
        let job = Job::from_quote(quote, number, title, self.clock.now())?;

        let job = self.port.insert_job(job).await?;
        info!(
            job_id = %job.id,
            quote_number = %quote.quote_number,
            total = %job.quoted_total,
            "Job created from quote"
        );
        Ok(job)
    }

    /// Quoted, invoiced and remaining amounts of a job
    pub async fn job_billing_summary(&self, job_id: JobId) -> Result<JobBillingSummary, ServiceError> {
        let job = self.port.get_job(job_id).await?;
        let invoices = self.port.list_job_invoices(job_id).await?;
        let issued = issued(&invoices);

        let remaining = compute_remaining(job.quoted_total, &issued)?;
        let invoiced = job.quoted_total.checked_sub(&remaining.amount)?;
        let today = self.today();

        Ok(JobBillingSummary {
            invoiced,
            remaining,
            invoices: invoices.into_iter().map(|inv| view(inv, today)).collect(),
            job,
        })
    }

    // ========================================================================
    // Progression invoices
    // ========================================================================

    pub async fn create_deposit_invoice(
        &self,
        job_id: JobId,
        percentage: Decimal,
    ) -> Result<Invoice, ServiceError> {
        let (job, invoices) = self.load_job(job_id).await?;
        let draft = request_deposit(&QuotedTotals::from_job(&job), &issued(&invoices), percentage)?;
        self.store_progression(job, &invoices, draft).await
    }

    pub async fn create_progress_invoice(
        &self,
        job_id: JobId,
        percentage: Decimal,
    ) -> Result<Invoice, ServiceError> {
        let (job, invoices) = self.load_job(job_id).await?;
        let draft = request_progress(&QuotedTotals::from_job(&job), &issued(&invoices), percentage)?;
        self.store_progression(job, &invoices, draft).await
    }

    /// Bills whatever remains after the deposit and progress invoices
    pub async fn create_balance_invoice(&self, job_id: JobId) -> Result<Invoice, ServiceError> {
        let (job, invoices) = self.load_job(job_id).await?;
        let issued = issued(&invoices);

        if !issued.iter().any(|inv| inv.invoice_type.is_progression()) {
            return Err(BillingError::validation(
                "No deposit or progress invoices found for this job",
            )
            .into());
        }

        let draft = request_balance(&QuotedTotals::from_job(&job), &issued)?;

        if self.terms.require_paid_before_balance {
            let unpaid: Vec<String> = issued
                .iter()
                .filter(|inv| inv.invoice_type.is_progression() && !inv.fully_paid)
                .map(|inv| inv.invoice_number.clone())
                .collect();
            if !unpaid.is_empty() {
                return Err(BillingError::UnpaidPriorInvoices(unpaid).into());
            }
        }

        self.store_progression(job, &invoices, draft).await
    }

    /// Creates a full invoice
    ///
    /// A job already billed through deposit or progress invoices gets a
    /// balance invoice instead, so the quoted total is never exceeded.
    pub async fn create_full_invoice(&self, request: FullInvoiceRequest) -> Result<Invoice, ServiceError> {
        self.port.get_customer(request.customer_id).await?;

        let job = match request.job_id {
            Some(job_id) => {
                let (job, invoices) = self.load_job(job_id).await?;
                if job.customer_id != request.customer_id {
                    return Err(BillingError::validation(format!(
                        "Job {} belongs to a different customer",
                        job.job_number
                    ))
                    .into());
                }
                if invoices.iter().any(|inv| inv.invoice_type.is_progression()) {
                    info!(job_id = %job.id, "Job has progression invoices, billing the balance instead");
                    return self.create_balance_invoice(job_id).await;
                }
                Some(job)
            }
            None => None,
        };

        let now = self.clock.now();
        let due_date = match request.due_date {
            Some(date) => date,
            None => self.calendar.days_from(now, self.terms.full_due_days)?,
        };
        let vat_rate = request.vat_registered.then_some(STANDARD_VAT_RATE);
        let number = self.next_number(INVOICE_PREFIX).await?;

        let mut invoice = Invoice::full(
            request.customer_id,
            job.as_ref().map(|j| j.id),
            number,
            request.line_items,
            vat_rate,
            Some(due_date),
            now,
        )?;
        invoice.notes = request.notes;

        let job_update = job.as_ref().map(|job| JobUpdate {
            job_id: job.id,
            expected_version: job.version,
            status: job.status.max(JobStatus::Invoiced),
        });

        let invoice = self.port.insert_invoice(invoice, job_update).await?;
        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            total = %invoice.total,
            "Full invoice created"
        );
        Ok(invoice)
    }

    // ========================================================================
    // Payments and status actions
    // ========================================================================

    /// Records a payment and, when it settles the last invoice of a fully
    /// invoiced job, marks the job paid in the same write
    pub async fn record_payment(
        &self,
        invoice_id: InvoiceId,
        request: PaymentRequest,
    ) -> Result<Invoice, ServiceError> {
        let invoice = self.port.get_invoice(invoice_id).await?;
        let now = self.clock.now();

        let mut payment = Payment::new(
            invoice.id,
            request.amount,
            request.payment_method,
            request.payment_date,
            now,
        );
        payment.reference = request.reference;

        let updated = apply_payment(&invoice, &payment, now)?;
        let job_update = match (updated.status, updated.job_id) {
            (InvoiceStatus::Paid, Some(job_id)) => self.job_paid_update(job_id, &updated).await?,
            _ => None,
        };

        let stored = self
            .port
            .record_payment(payment, updated, invoice.version, job_update)
            .await?;

        info!(
            invoice_id = %stored.id,
            amount = %request.amount,
            amount_paid = %stored.amount_paid,
            status = %stored.status,
            "Payment recorded"
        );
        if job_update.is_some() {
            info!(invoice_id = %stored.id, "Job fully paid");
        }
        Ok(stored)
    }

    pub async fn invoice_payments(&self, invoice_id: InvoiceId) -> Result<Vec<Payment>, ServiceError> {
        self.port.get_invoice(invoice_id).await?;
        Ok(self.port.list_payments(invoice_id).await?)
    }

    pub async fn mark_invoice_sent(&self, invoice_id: InvoiceId) -> Result<Invoice, ServiceError> {
        self.status_action(invoice_id, |inv, now| inv.mark_sent(now)).await
    }

    pub async fn mark_invoice_viewed(&self, invoice_id: InvoiceId) -> Result<Invoice, ServiceError> {
        self.status_action(invoice_id, |inv, now| inv.mark_viewed(now)).await
    }

    pub async fn mark_invoice_paid(&self, invoice_id: InvoiceId) -> Result<Invoice, ServiceError> {
        self.status_action(invoice_id, |inv, now| inv.mark_paid(now)).await
    }

    /// Fetches an invoice with its status as of today
    pub async fn get_invoice(&self, invoice_id: InvoiceId) -> Result<InvoiceView, ServiceError> {
        let invoice = self.port.get_invoice(invoice_id).await?;
        Ok(view(invoice, self.today()))
    }

    /// Deletes an invoice; one with payments needs `force`, which removes them too
    pub async fn delete_invoice(&self, invoice_id: InvoiceId, force: bool) -> Result<(), ServiceError> {
        let invoice = self.port.get_invoice(invoice_id).await?;
        let payments = self.port.list_payments(invoice_id).await?;
        invoice.ensure_deletable(payments.len(), force)?;

        self.port.delete_invoice(invoice_id, invoice.version).await?;
        if payments.is_empty() {
            info!(invoice_number = %invoice.invoice_number, "Invoice deleted");
        } else {
            warn!(
                invoice_number = %invoice.invoice_number,
                payments = payments.len(),
                "Invoice force-deleted with its payments"
            );
        }
        Ok(())
    }

    /// Invoices past due and not fully paid, oldest due date first
    pub async fn overdue_invoices(&self) -> Result<Vec<InvoiceView>, ServiceError> {
        let today = self.today();
        let mut overdue: Vec<InvoiceView> = self
            .port
            .list_unpaid_invoices()
            .await?
            .into_iter()
            .map(|inv| view(inv, today))
            .filter(|v| v.effective_status == InvoiceStatus::Overdue)
            .collect();

        overdue.sort_by(|a, b| {
            a.invoice
                .due_date
                .cmp(&b.invoice.due_date)
                .then_with(|| a.invoice.invoice_number.cmp(&b.invoice.invoice_number))
        });
        Ok(overdue)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn load_job(&self, job_id: JobId) -> Result<(Job, Vec<Invoice>), ServiceError> {
        let job = self.port.get_job(job_id).await?;
        let invoices = self.port.list_job_invoices(job_id).await?;
        Ok((job, invoices))
    }

    async fn next_number(&self, prefix: &str) -> Result<String, ServiceError> {
        let year = self.today().year();
        let existing = self.port.document_numbers(prefix, year).await?;
        Ok(next_document_number(prefix, year, existing.iter().map(String::as_str)))
    }

    async fn store_progression(
        &self,
        job: Job,
        invoices: &[Invoice],
        draft: InvoiceDraft,
    ) -> Result<Invoice, ServiceError> {
        let now = self.clock.now();
        let invoice_type = draft.invoice_type;
        let due_date = self.calendar.days_from(now, self.terms.due_days(invoice_type))?;
        let number = self.next_number(INVOICE_PREFIX).await?;

        let invoice = Invoice::from_draft(draft, job.customer_id, job.id, number, due_date, now);

        let mut issued = issued(invoices);
        issued.push(invoice.to_issued());
        let fully_invoiced = !compute_remaining(job.quoted_total, &issued)?.amount.is_positive();
        let status = if fully_invoiced {
            job.status.max(JobStatus::Invoiced)
        } else {
            job.status
        };

        let job_update = JobUpdate {
            job_id: job.id,
            expected_version: job.version,
            status,
        };
        let invoice = self.port.insert_invoice(invoice, Some(job_update)).await?;

        info!(
            job_id = %job.id,
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            invoice_type = %invoice_type,
            total = %invoice.total,
            "Progression invoice created"
        );
        Ok(invoice)
    }

    /// Job change to store with a payment that settles `settled`, if any
    async fn job_paid_update(
        &self,
        job_id: JobId,
        settled: &Invoice,
    ) -> Result<Option<JobUpdate>, ServiceError> {
        let job = self.port.get_job(job_id).await?;
        if job.is_paid() {
            return Ok(None);
        }

        let invoices: Vec<Invoice> = self
            .port
            .list_job_invoices(job_id)
            .await?
            .into_iter()
            .map(|inv| if inv.id == settled.id { settled.clone() } else { inv })
            .collect();

        let has_full = invoices.iter().any(|inv| inv.invoice_type == InvoiceType::Full);
        let remaining = compute_remaining(job.quoted_total, &issued(&invoices))?;
        let fully_invoiced = has_full || !remaining.amount.is_positive();
        let all_paid = invoices.iter().all(Invoice::is_fully_paid);

        Ok((fully_invoiced && all_paid).then_some(JobUpdate {
            job_id,
            expected_version: job.version,
            status: JobStatus::Paid,
        }))
    }

    async fn status_action<F>(&self, invoice_id: InvoiceId, action: F) -> Result<Invoice, ServiceError>
    where
        F: FnOnce(&mut Invoice, chrono::DateTime<chrono::Utc>) -> Result<(), BillingError>,
    {
        let stored = self.port.get_invoice(invoice_id).await?;
        let mut invoice = stored.clone();

        action(&mut invoice, self.clock.now())?;

        // Repeated actions (viewing twice, marking a paid invoice paid) keep the version
        if invoice == stored {
            debug!(
                invoice_number = %stored.invoice_number,
                status = %stored.status,
                "Status action changed nothing"
            );
            return Ok(stored);
        }

        let invoice = self.port.update_invoice(invoice, stored.version).await?;
        info!(
            invoice_number = %invoice.invoice_number,
            from = %stored.status,
            to = %invoice.status,
            "Invoice status updated"
        );
        Ok(invoice)
    }
}

fn issued(invoices: &[Invoice]) -> Vec<IssuedInvoice> {
    invoices.iter().map(Invoice::to_issued).collect()
}

fn view(invoice: Invoice, today: NaiveDate) -> InvoiceView {
    InvoiceView {
        effective_status: invoice.effective_status(today),
        invoice,
    }
}
