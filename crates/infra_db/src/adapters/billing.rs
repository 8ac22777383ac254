//! PostgreSQL Billing Adapter
//!
//! Implements `BillingPort` on top of the `BillingRepository`. The adapter owns
//! the translation between domain types and rows: money becomes integer cents
//! plus a currency code, statuses become their lowercase names, and line items
//! are stored as JSON.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBillingAdapter;
//! use domain_billing::{BillingPort, BillingService};
//! use std::sync::Arc;
//!
//! let port: Arc<dyn BillingPort> = Arc::new(PostgresBillingAdapter::new(pool));
//! let service = BillingService::new(port, clock, calendar);
//! ```

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use core_kernel::{
    Currency, CustomerId, DomainPort, HealthCheckResult, HealthCheckable,
    InvoiceId, JobId, Money, PaymentId, Percentage, PortError, QuoteId,
};
use domain_billing::{
    BillingPort, Customer, Invoice, InvoiceStatus, InvoiceType, Job, JobStatus, JobUpdate,
    LineItem, Payment, PaymentMethod,
};

use crate::error::DatabaseError;
use crate::repositories::billing::{
    BillingRepository, CustomerRow, InvoiceRow, JobRow, JobVersionBump, LineItemRecord,
    PaymentRow,
};

/// PostgreSQL-backed implementation of the BillingPort trait
///
/// Database errors reach callers as `PortError`s: a stale version or a
/// duplicate document number is a `Conflict`, a missing row is `NotFound`.
#[derive(Debug, Clone)]
pub struct PostgresBillingAdapter {
    repository: BillingRepository,
    pool: PgPool,
}

impl PostgresBillingAdapter {
    /// Creates a new PostgreSQL billing adapter
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BillingRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &BillingRepository {
        &self.repository
    }
}

const ADAPTER_ID: &str = "postgres-billing-adapter";

/// A health check slower than this reports the adapter degraded
const SLOW_CHECK: Duration = Duration::from_millis(500);

impl DomainPort for PostgresBillingAdapter {}

#[async_trait]
impl HealthCheckable for PostgresBillingAdapter {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();

        let outcome = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| format!("Database error: {}", e));

        HealthCheckResult::from_check(ADAPTER_ID, outcome, start.elapsed(), SLOW_CHECK)
    }
}

#[async_trait]
impl BillingPort for PostgresBillingAdapter {
    #[instrument(skip(self, customer), fields(customer_id = %customer.id))]
    async fn insert_customer(&self, customer: Customer) -> Result<Customer, PortError> {
        self.repository
            .insert_customer(&customer_to_row(&customer))
            .await?;
        Ok(customer)
    }

    #[instrument(skip(self), fields(customer_id = %id))]
    async fn get_customer(&self, id: CustomerId) -> Result<Customer, PortError> {
        let row = self.repository.find_customer(*id.as_uuid()).await?;
        Ok(row_to_customer(row))
    }

    #[instrument(skip(self, job), fields(job_number = %job.job_number))]
    async fn insert_job(&self, job: Job) -> Result<Job, PortError> {
        self.repository.insert_job(&job_to_row(&job)).await?;
        Ok(job)
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_job(&self, id: JobId) -> Result<Job, PortError> {
        let row = self.repository.find_job(*id.as_uuid()).await?;
        row_to_job(row)
    }

    #[instrument(skip(self), fields(invoice_id = %id))]
    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
        let row = self.repository.find_invoice(*id.as_uuid()).await?;
        row_to_invoice(row)
    }

    #[instrument(skip(self), fields(job_id = %job_id))]
    async fn list_job_invoices(&self, job_id: JobId) -> Result<Vec<Invoice>, PortError> {
        let rows = self.repository.list_invoices_for_job(*job_id.as_uuid()).await?;
        debug!(count = rows.len(), "Loaded job invoices");
        rows.into_iter().map(row_to_invoice).collect()
    }

    #[instrument(skip(self))]
    async fn list_unpaid_invoices(&self) -> Result<Vec<Invoice>, PortError> {
        let rows = self.repository.list_unpaid_invoices().await?;
        rows.into_iter().map(row_to_invoice).collect()
    }

    async fn document_numbers(&self, prefix: &str, year: i32) -> Result<Vec<String>, PortError> {
        Ok(self.repository.document_numbers(prefix, year).await?)
    }

    #[instrument(skip(self, invoice, job), fields(invoice_number = %invoice.invoice_number))]
    async fn insert_invoice(
        &self,
        invoice: Invoice,
        job: Option<JobUpdate>,
    ) -> Result<Invoice, PortError> {
        let bump = job.as_ref().map(job_update_to_bump);
        self.repository
            .insert_invoice(&invoice_to_row(&invoice), bump.as_ref())
            .await?;
        Ok(invoice)
    }

    #[instrument(skip(self, invoice), fields(invoice_number = %invoice.invoice_number))]
    async fn update_invoice(
        &self,
        invoice: Invoice,
        expected_version: i64,
    ) -> Result<Invoice, PortError> {
        let row = self
            .repository
            .update_invoice(&invoice_to_row(&invoice), expected_version)
            .await?;
        row_to_invoice(row)
    }

    #[instrument(skip(self), fields(invoice_id = %id))]
    async fn delete_invoice(&self, id: InvoiceId, expected_version: i64) -> Result<(), PortError> {
        Ok(self
            .repository
            .delete_invoice(*id.as_uuid(), expected_version)
            .await?)
    }

    #[instrument(skip(self, payment, invoice, job), fields(invoice_number = %invoice.invoice_number))]
    async fn record_payment(
        &self,
        payment: Payment,
        invoice: Invoice,
        expected_version: i64,
        job: Option<JobUpdate>,
    ) -> Result<Invoice, PortError> {
        let bump = job.as_ref().map(job_update_to_bump);
        let row = self
            .repository
            .record_payment(
                &payment_to_row(&payment),
                &invoice_to_row(&invoice),
                expected_version,
                bump.as_ref(),
            )
            .await?;
        row_to_invoice(row)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    async fn list_payments(&self, invoice_id: InvoiceId) -> Result<Vec<Payment>, PortError> {
        let rows = self.repository.list_payments(*invoice_id.as_uuid()).await?;
        rows.into_iter().map(row_to_payment).collect()
    }
}

// ============================================================================
// Row conversions
// ============================================================================

fn customer_to_row(customer: &Customer) -> CustomerRow {
    CustomerRow {
        id: *customer.id.as_uuid(),
        name: customer.name.clone(),
        phone: customer.phone.clone(),
        email: customer.email.clone(),
        address: customer.address.clone(),
        created_at: customer.created_at,
    }
}

fn row_to_customer(row: CustomerRow) -> Customer {
    Customer {
        id: CustomerId::from_uuid(row.id),
        name: row.name,
        phone: row.phone,
        email: row.email,
        address: row.address,
        created_at: row.created_at,
    }
}

fn job_to_row(job: &Job) -> JobRow {
    JobRow {
        id: *job.id.as_uuid(),
        customer_id: *job.customer_id.as_uuid(),
        quote_id: job.quote_id.map(|id| *id.as_uuid()),
        job_number: job.job_number.clone(),
        title: job.title.clone(),
        status: job.status.as_str().to_string(),
        currency: job.quoted_total.currency().code().to_string(),
        quoted_total: job.quoted_total.minor_units(),
        quoted_vat: job.quoted_vat.minor_units(),
        version: job.version,
        scheduled_date: job.scheduled_date,
        completed_date: job.completed_date,
        created_at: job.created_at,
    }
}

fn row_to_job(row: JobRow) -> Result<Job, PortError> {
    let currency = parse_currency(&row.currency)?;
    Ok(Job {
        id: JobId::from_uuid(row.id),
        customer_id: CustomerId::from_uuid(row.customer_id),
        quote_id: row.quote_id.map(QuoteId::from_uuid),
        job_number: row.job_number,
        title: row.title,
        status: parse_column::<JobStatus>("jobs.status", &row.status)?,
        quoted_total: Money::from_minor(row.quoted_total, currency),
        quoted_vat: Money::from_minor(row.quoted_vat, currency),
        version: row.version,
        scheduled_date: row.scheduled_date,
        completed_date: row.completed_date,
        created_at: row.created_at,
    })
}

fn job_update_to_bump(update: &JobUpdate) -> JobVersionBump {
    JobVersionBump {
        job_id: *update.job_id.as_uuid(),
        expected_version: update.expected_version,
        status: update.status.as_str().to_string(),
    }
}

fn invoice_to_row(invoice: &Invoice) -> InvoiceRow {
    let line_items = invoice
        .line_items
        .iter()
        .map(|item| LineItemRecord {
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.minor_units(),
        })
        .collect();

    InvoiceRow {
        id: *invoice.id.as_uuid(),
        invoice_number: invoice.invoice_number.clone(),
        customer_id: *invoice.customer_id.as_uuid(),
        job_id: invoice.job_id.map(|id| *id.as_uuid()),
        invoice_type: invoice.invoice_type.as_str().to_string(),
        deposit_percentage: invoice.deposit_percentage.map(|p| p.value()),
        line_items: Json(line_items),
        currency: invoice.total.currency().code().to_string(),
        subtotal: invoice.subtotal.minor_units(),
        vat_amount: invoice.vat_amount.minor_units(),
        total: invoice.total.minor_units(),
        amount_paid: invoice.amount_paid.minor_units(),
        status: invoice.status.as_str().to_string(),
        due_date: invoice.due_date,
        notes: invoice.notes.clone(),
        parent_invoice_id: invoice.parent_invoice_id.map(|id| *id.as_uuid()),
        sent_at: invoice.sent_at,
        viewed_at: invoice.viewed_at,
        paid_at: invoice.paid_at,
        version: invoice.version,
        created_at: invoice.created_at,
        updated_at: invoice.updated_at,
    }
}

fn row_to_invoice(row: InvoiceRow) -> Result<Invoice, PortError> {
    let currency = parse_currency(&row.currency)?;
    let deposit_percentage = row
        .deposit_percentage
        .map(|value| {
            Percentage::new(value).map_err(|e| {
                PortError::from(DatabaseError::SerializationError(format!(
                    "invoices.deposit_percentage {}: {}",
                    value, e
                )))
            })
        })
        .transpose()?;

    let Json(records) = row.line_items;
    let line_items = records
        .into_iter()
        .map(|record| LineItem {
            description: record.description,
            quantity: record.quantity,
            unit_price: Money::from_minor(record.unit_price, currency),
        })
        .collect();

    Ok(Invoice {
        id: InvoiceId::from_uuid(row.id),
        invoice_number: row.invoice_number,
        customer_id: CustomerId::from_uuid(row.customer_id),
        job_id: row.job_id.map(JobId::from_uuid),
        invoice_type: parse_column::<InvoiceType>("invoices.invoice_type", &row.invoice_type)?,
        deposit_percentage,
        line_items,
        subtotal: Money::from_minor(row.subtotal, currency),
        vat_amount: Money::from_minor(row.vat_amount, currency),
        total: Money::from_minor(row.total, currency),
        amount_paid: Money::from_minor(row.amount_paid, currency),
        status: parse_column::<InvoiceStatus>("invoices.status", &row.status)?,
        due_date: row.due_date,
        notes: row.notes,
        parent_invoice_id: row.parent_invoice_id.map(InvoiceId::from_uuid),
        sent_at: row.sent_at,
        viewed_at: row.viewed_at,
        paid_at: row.paid_at,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn payment_to_row(payment: &Payment) -> PaymentRow {
    PaymentRow {
        id: *payment.id.as_uuid(),
        invoice_id: *payment.invoice_id.as_uuid(),
        currency: payment.amount.currency().code().to_string(),
        amount: payment.amount.minor_units(),
        payment_method: payment.payment_method.as_str().to_string(),
        payment_date: payment.payment_date,
        reference: payment.reference.clone(),
        created_at: payment.created_at,
    }
}

fn row_to_payment(row: PaymentRow) -> Result<Payment, PortError> {
    let currency = parse_currency(&row.currency)?;
    Ok(Payment {
        id: PaymentId::from_uuid(row.id),
        invoice_id: InvoiceId::from_uuid(row.invoice_id),
        amount: Money::from_minor(row.amount, currency),
        payment_method: parse_column::<PaymentMethod>("payments.payment_method", &row.payment_method)?,
        payment_date: row.payment_date,
        reference: row.reference,
        created_at: row.created_at,
    })
}

fn parse_currency(code: &str) -> Result<Currency, PortError> {
    parse_column::<Currency>("currency", code.trim())
}

fn parse_column<T>(column: &str, value: &str) -> Result<T, PortError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| {
        DatabaseError::SerializationError(format!("{} = '{}': {}", column, value, e)).into()
    })
}
