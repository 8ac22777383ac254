//! Billing Domain Ports
//!
//! The `BillingPort` trait is everything the billing service needs from its
//! store. Adapters:
//!
//! - **Internal Adapter**: PostgreSQL (`infra_db::PostgresBillingAdapter`)
//! - **Mock Adapter**: in-memory, for tests (feature `mock`)
//!
//! Writes that touch more than one record take the whole change in one call
//! so the adapter can apply it atomically. Every conditional write carries the
//! version the caller read; a mismatch fails with `PortError::Conflict` and
//! nothing is written.
//!
//! # Usage
//!
//! ```rust,ignore
//! use core_kernel::{BusinessCalendar, SystemClock};
//! use domain_billing::BillingService;
//! use std::sync::Arc;
//!
//! let port = Arc::new(PostgresBillingAdapter::new(pool));
//! let service = BillingService::new(port, Arc::new(SystemClock), BusinessCalendar::default());
//! ```

use async_trait::async_trait;

use core_kernel::{CustomerId, DomainPort, HealthCheckable, InvoiceId, JobId, PortError};

use crate::customer::Customer;
use crate::invoice::Invoice;
use crate::job::{Job, JobStatus};
use crate::payment::Payment;

/// A version-guarded job change written together with an invoice change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobUpdate {
    pub job_id: JobId,
    /// Version the caller read; the write fails if the job has moved on
    pub expected_version: i64,
    /// Status to store
    pub status: JobStatus,
}

/// The port trait for billing persistence
#[async_trait]
pub trait BillingPort: DomainPort + HealthCheckable {
    // ========================================================================
    // Customers and jobs
    // ========================================================================

    async fn insert_customer(&self, customer: Customer) -> Result<Customer, PortError>;

    /// Returns the customer, or `PortError::NotFound`
    async fn get_customer(&self, id: CustomerId) -> Result<Customer, PortError>;

    async fn insert_job(&self, job: Job) -> Result<Job, PortError>;

    /// Returns the job, or `PortError::NotFound`
    async fn get_job(&self, id: JobId) -> Result<Job, PortError>;

    // ========================================================================
    // Invoices
    // ========================================================================

    /// Returns the invoice, or `PortError::NotFound`
    async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError>;

    /// All invoices of a job, oldest first
    async fn list_job_invoices(&self, job_id: JobId) -> Result<Vec<Invoice>, PortError>;

    /// Invoices that are sent but not fully paid
    async fn list_unpaid_invoices(&self) -> Result<Vec<Invoice>, PortError>;

    /// Existing document numbers with `prefix` for `year`
    async fn document_numbers(&self, prefix: &str, year: i32) -> Result<Vec<String>, PortError>;

    /// Inserts a new invoice
    ///
    /// With `job` set, the job's version is checked and bumped in the same
    /// write, so two concurrent progression requests cannot both succeed.
    async fn insert_invoice(
        &self,
        invoice: Invoice,
        job: Option<JobUpdate>,
    ) -> Result<Invoice, PortError>;

    /// Replaces an invoice after a status action
    async fn update_invoice(
        &self,
        invoice: Invoice,
        expected_version: i64,
    ) -> Result<Invoice, PortError>;

    /// Deletes an invoice and any payments recorded against it
    async fn delete_invoice(&self, id: InvoiceId, expected_version: i64) -> Result<(), PortError>;

    // ========================================================================
    // Payments
    // ========================================================================

    /// Stores `payment` and the invoice it was applied to as one write
    async fn record_payment(
        &self,
        payment: Payment,
        invoice: Invoice,
        expected_version: i64,
        job: Option<JobUpdate>,
    ) -> Result<Invoice, PortError>;

    /// Payments of an invoice, oldest first
    async fn list_payments(&self, invoice_id: InvoiceId) -> Result<Vec<Payment>, PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use core_kernel::HealthCheckResult;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    struct Store {
        customers: HashMap<CustomerId, Customer>,
        jobs: HashMap<JobId, Job>,
        invoices: HashMap<InvoiceId, Invoice>,
        payments: HashMap<InvoiceId, Vec<Payment>>,
    }

    impl Store {
        fn apply_job_update(&mut self, update: &JobUpdate) -> Result<(), PortError> {
            let job = self
                .jobs
                .get_mut(&update.job_id)
                .ok_or_else(|| PortError::missing(update.job_id))?;
            if job.version != update.expected_version {
                return Err(PortError::conflict(format!(
                    "Job {} was modified concurrently",
                    job.job_number
                )));
            }
            job.version += 1;
            job.status = update.status;
            Ok(())
        }

        fn check_invoice_version(&self, id: InvoiceId, expected: i64) -> Result<(), PortError> {
            let current = self
                .invoices
                .get(&id)
                .ok_or_else(|| PortError::missing(id))?;
            if current.version != expected {
                return Err(PortError::conflict(format!(
                    "Invoice {} was modified concurrently",
                    current.invoice_number
                )));
            }
            Ok(())
        }
    }

    /// In-memory mock implementation of BillingPort
    ///
    /// All tables sit behind one lock so multi-record writes are atomic.
    #[derive(Debug, Default, Clone)]
    pub struct MockBillingPort {
        store: Arc<RwLock<Store>>,
    }

    impl MockBillingPort {
        /// Creates a new mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with a customer and jobs for testing
        pub async fn with_jobs(customer: Customer, jobs: Vec<Job>) -> Self {
            let port = Self::new();
            {
                let mut store = port.store.write().await;
                store.customers.insert(customer.id, customer);
                for job in jobs {
                    store.jobs.insert(job.id, job);
                }
            }
            port
        }

        /// Number of payments stored across all invoices
        pub async fn payment_count(&self) -> usize {
            self.store.read().await.payments.values().map(Vec::len).sum()
        }
    }

    impl DomainPort for MockBillingPort {}

    #[async_trait]
    impl HealthCheckable for MockBillingPort {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-billing-port".to_string(),
                status: core_kernel::AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl BillingPort for MockBillingPort {
        async fn insert_customer(&self, customer: Customer) -> Result<Customer, PortError> {
            self.store
                .write()
                .await
                .customers
                .insert(customer.id, customer.clone());
            Ok(customer)
        }

        async fn get_customer(&self, id: CustomerId) -> Result<Customer, PortError> {
            self.store
                .read()
                .await
                .customers
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::missing(id))
        }

        async fn insert_job(&self, job: Job) -> Result<Job, PortError> {
            let mut store = self.store.write().await;
            if store.jobs.values().any(|j| j.job_number == job.job_number) {
                return Err(PortError::conflict(format!(
                    "Job number {} already exists",
                    job.job_number
                )));
            }
            store.jobs.insert(job.id, job.clone());
            Ok(job)
        }

        async fn get_job(&self, id: JobId) -> Result<Job, PortError> {
            self.store
                .read()
                .await
                .jobs
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::missing(id))
        }

        async fn get_invoice(&self, id: InvoiceId) -> Result<Invoice, PortError> {
            self.store
                .read()
                .await
                .invoices
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::missing(id))
        }

        async fn list_job_invoices(&self, job_id: JobId) -> Result<Vec<Invoice>, PortError> {
            let store = self.store.read().await;
            let mut invoices: Vec<_> = store
                .invoices
                .values()
                .filter(|inv| inv.job_id == Some(job_id))
                .cloned()
                .collect();
            invoices.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.invoice_number.cmp(&b.invoice_number))
            });
            Ok(invoices)
        }

        async fn list_unpaid_invoices(&self) -> Result<Vec<Invoice>, PortError> {
            let store = self.store.read().await;
            Ok(store
                .invoices
                .values()
                .filter(|inv| {
                    inv.status != crate::invoice::InvoiceStatus::Draft && !inv.is_fully_paid()
                })
                .cloned()
                .collect())
        }

        async fn document_numbers(&self, prefix: &str, year: i32) -> Result<Vec<String>, PortError> {
            let store = self.store.read().await;
            let pattern = format!("{}-{}-", prefix, year);
            let numbers = store
                .invoices
                .values()
                .map(|inv| inv.invoice_number.as_str())
                .chain(store.jobs.values().map(|job| job.job_number.as_str()))
                .filter(|number| number.starts_with(&pattern))
                .map(str::to_string)
                .collect();
            Ok(numbers)
        }

        async fn insert_invoice(
            &self,
            invoice: Invoice,
            job: Option<JobUpdate>,
        ) -> Result<Invoice, PortError> {
            let mut store = self.store.write().await;
            if store
                .invoices
                .values()
                .any(|inv| inv.invoice_number == invoice.invoice_number)
            {
                return Err(PortError::conflict(format!(
                    "Invoice number {} already exists",
                    invoice.invoice_number
                )));
            }
            if let Some(update) = &job {
                store.apply_job_update(update)?;
            }
            store.invoices.insert(invoice.id, invoice.clone());
            Ok(invoice)
        }

        async fn update_invoice(
            &self,
            mut invoice: Invoice,
            expected_version: i64,
        ) -> Result<Invoice, PortError> {
            let mut store = self.store.write().await;
            store.check_invoice_version(invoice.id, expected_version)?;
            invoice.version = expected_version + 1;
            store.invoices.insert(invoice.id, invoice.clone());
            Ok(invoice)
        }

        async fn delete_invoice(&self, id: InvoiceId, expected_version: i64) -> Result<(), PortError> {
            let mut store = self.store.write().await;
            store.check_invoice_version(id, expected_version)?;
            store.invoices.remove(&id);
            store.payments.remove(&id);
            Ok(())
        }

        async fn record_payment(
            &self,
            payment: Payment,
            mut invoice: Invoice,
            expected_version: i64,
            job: Option<JobUpdate>,
        ) -> Result<Invoice, PortError> {
            let mut store = self.store.write().await;
            store.check_invoice_version(invoice.id, expected_version)?;
            if let Some(update) = &job {
                store.apply_job_update(update)?;
            }
            invoice.version = expected_version + 1;
            store.invoices.insert(invoice.id, invoice.clone());
            store.payments.entry(invoice.id).or_default().push(payment);
            Ok(invoice)
        }

        async fn list_payments(&self, invoice_id: InvoiceId) -> Result<Vec<Payment>, PortError> {
            let store = self.store.read().await;
            Ok(store.payments.get(&invoice_id).cloned().unwrap_or_default())
        }
    }
}
