//! Billing repository implementation
//!
//! SQL for customers, jobs, invoices and payments. Money columns are integer
//! cents. Every write that must not race is guarded by a `version` column:
//! the `UPDATE ... WHERE version = $expected` either hits one row or the
//! whole transaction is abandoned.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::DatabaseError;

const JOB_COLUMNS: &str = "id, customer_id, quote_id, job_number, title, status, currency, \
     quoted_total, quoted_vat, version, scheduled_date, completed_date, created_at";

const INVOICE_COLUMNS: &str = "id, invoice_number, customer_id, job_id, invoice_type, \
     deposit_percentage, line_items, currency, subtotal, vat_amount, total, amount_paid, status, \
     due_date, notes, parent_invoice_id, sent_at, viewed_at, paid_at, version, created_at, updated_at";

/// Database row for customers
#[derive(Debug, Clone, FromRow)]
pub struct CustomerRow {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Database row for jobs
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub quote_id: Option<Uuid>,
    pub job_number: String,
    pub title: String,
    pub status: String,
    pub currency: String,
    pub quoted_total: i64,
    pub quoted_vat: i64,
    pub version: i64,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Line item as stored in the `line_items` JSONB column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemRecord {
    pub description: String,
    pub quantity: Decimal,
    /// Cents; negative for "less" lines on balance invoices
    pub unit_price: i64,
}

/// Database row for invoices
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub invoice_number: String,
    pub customer_id: Uuid,
    pub job_id: Option<Uuid>,
    pub invoice_type: String,
    pub deposit_percentage: Option<Decimal>,
    pub line_items: Json<Vec<LineItemRecord>>,
    pub currency: String,
    pub subtotal: i64,
    pub vat_amount: i64,
    pub total: i64,
    pub amount_paid: i64,
    pub status: String,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub parent_invoice_id: Option<Uuid>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for payments
#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub currency: String,
    pub amount: i64,
    pub payment_method: String,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Version-guarded job change applied inside an invoice write
#[derive(Debug, Clone)]
pub struct JobVersionBump {
    pub job_id: Uuid,
    pub expected_version: i64,
    pub status: String,
}

/// Repository for billing records
#[derive(Debug, Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    /// Creates a new BillingRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ------------------------------------------------------------------------
    // Customers and jobs
    // ------------------------------------------------------------------------

    pub async fn insert_customer(&self, row: &CustomerRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, email, address, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.phone)
        .bind(&row.email)
        .bind(&row.address)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_customer(&self, id: Uuid) -> Result<CustomerRow, DatabaseError> {
        sqlx::query_as::<_, CustomerRow>(
            "SELECT id, name, phone, email, address, created_at FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Customer", id))
    }

    pub async fn insert_job(&self, row: &JobRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, customer_id, quote_id, job_number, title, status, currency,
                quoted_total, quoted_vat, version, scheduled_date, completed_date, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(row.id)
        .bind(row.customer_id)
        .bind(row.quote_id)
        .bind(&row.job_number)
        .bind(&row.title)
        .bind(&row.status)
        .bind(&row.currency)
        .bind(row.quoted_total)
        .bind(row.quoted_vat)
        .bind(row.version)
        .bind(row.scheduled_date)
        .bind(row.completed_date)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_job(&self, id: Uuid) -> Result<JobRow, DatabaseError> {
        sqlx::query_as::<_, JobRow>(&format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Job", id))
    }

    // ------------------------------------------------------------------------
    // Invoices
    // ------------------------------------------------------------------------

    pub async fn find_invoice(&self, id: Uuid) -> Result<InvoiceRow, DatabaseError> {
        sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE id = $1",
            INVOICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Invoice", id))
    }

    /// Invoices of a job, oldest first
    pub async fn list_invoices_for_job(&self, job_id: Uuid) -> Result<Vec<InvoiceRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE job_id = $1 ORDER BY created_at, invoice_number",
            INVOICE_COLUMNS
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Sent invoices with money still outstanding
    pub async fn list_unpaid_invoices(&self) -> Result<Vec<InvoiceRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices \
             WHERE status NOT IN ('draft', 'paid') AND amount_paid < total \
             ORDER BY due_date NULLS LAST, invoice_number",
            INVOICE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Invoice and job numbers starting with `prefix-year-`
    pub async fn document_numbers(&self, prefix: &str, year: i32) -> Result<Vec<String>, DatabaseError> {
        let pattern = format!("{}-{}-%", prefix, year);
        let numbers = sqlx::query_scalar::<_, String>(
            r#"
            SELECT invoice_number FROM invoices WHERE invoice_number LIKE $1
            UNION ALL
            SELECT job_number FROM jobs WHERE job_number LIKE $1
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(numbers)
    }

    /// Inserts an invoice, bumping the job's version in the same transaction
    pub async fn insert_invoice(
        &self,
        row: &InvoiceRow,
        job: Option<&JobVersionBump>,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        if let Some(bump) = job {
            bump_job_version(&mut tx, bump).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, customer_id, job_id, invoice_type, deposit_percentage,
                line_items, currency, subtotal, vat_amount, total, amount_paid, status,
                due_date, notes, parent_invoice_id, sent_at, viewed_at, paid_at, version,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22
            )
            "#,
        )
        .bind(row.id)
        .bind(&row.invoice_number)
        .bind(row.customer_id)
        .bind(row.job_id)
        .bind(&row.invoice_type)
        .bind(row.deposit_percentage)
        .bind(&row.line_items)
        .bind(&row.currency)
        .bind(row.subtotal)
        .bind(row.vat_amount)
        .bind(row.total)
        .bind(row.amount_paid)
        .bind(&row.status)
        .bind(row.due_date)
        .bind(&row.notes)
        .bind(row.parent_invoice_id)
        .bind(row.sent_at)
        .bind(row.viewed_at)
        .bind(row.paid_at)
        .bind(row.version)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Writes the mutable invoice columns if `expected_version` is current
    pub async fn update_invoice(
        &self,
        row: &InvoiceRow,
        expected_version: i64,
    ) -> Result<InvoiceRow, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        update_invoice_guarded(&mut conn, row, expected_version).await
    }

    /// Deletes an invoice and its payments if `expected_version` is current
    pub async fn delete_invoice(&self, id: Uuid, expected_version: i64) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM payments WHERE invoice_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM invoices WHERE id = $1 AND version = $2")
            .bind(id)
            .bind(expected_version)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(missing_or_conflict(&mut tx, "Invoice", "invoices", id).await);
        }

        tx.commit().await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Payments
    // ------------------------------------------------------------------------

    /// Inserts a payment and the invoice it settled in one transaction
    pub async fn record_payment(
        &self,
        payment: &PaymentRow,
        invoice: &InvoiceRow,
        expected_version: i64,
        job: Option<&JobVersionBump>,
    ) -> Result<InvoiceRow, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let updated = update_invoice_guarded(&mut tx, invoice, expected_version).await?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, invoice_id, currency, amount, payment_method, payment_date, reference, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(payment.id)
        .bind(payment.invoice_id)
        .bind(&payment.currency)
        .bind(payment.amount)
        .bind(&payment.payment_method)
        .bind(payment.payment_date)
        .bind(&payment.reference)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        if let Some(bump) = job {
            bump_job_version(&mut tx, bump).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    /// Payments of an invoice, oldest first
    pub async fn list_payments(&self, invoice_id: Uuid) -> Result<Vec<PaymentRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, invoice_id, currency, amount, payment_method, payment_date, reference, created_at
            FROM payments
            WHERE invoice_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

async fn bump_job_version(conn: &mut PgConnection, bump: &JobVersionBump) -> Result<(), DatabaseError> {
    let updated = sqlx::query(
        "UPDATE jobs SET version = version + 1, status = $3 WHERE id = $1 AND version = $2",
    )
    .bind(bump.job_id)
    .bind(bump.expected_version)
    .bind(&bump.status)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(missing_or_conflict(conn, "Job", "jobs", bump.job_id).await);
    }
    Ok(())
}

async fn update_invoice_guarded(
    conn: &mut PgConnection,
    row: &InvoiceRow,
    expected_version: i64,
) -> Result<InvoiceRow, DatabaseError> {
    let updated = sqlx::query_as::<_, InvoiceRow>(&format!(
        r#"
        UPDATE invoices SET
            amount_paid = $3,
            status = $4,
            notes = $5,
            sent_at = $6,
            viewed_at = $7,
            paid_at = $8,
            updated_at = $9,
            version = version + 1
        WHERE id = $1 AND version = $2
        RETURNING {}
        "#,
        INVOICE_COLUMNS
    ))
    .bind(row.id)
    .bind(expected_version)
    .bind(row.amount_paid)
    .bind(&row.status)
    .bind(&row.notes)
    .bind(row.sent_at)
    .bind(row.viewed_at)
    .bind(row.paid_at)
    .bind(row.updated_at)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(row) => Ok(row),
        None => Err(missing_or_conflict(conn, "Invoice", "invoices", row.id).await),
    }
}

/// Explains why a guarded write touched no rows
async fn missing_or_conflict(
    conn: &mut PgConnection,
    entity: &'static str,
    table: &str,
    id: Uuid,
) -> DatabaseError {
    let exists = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)",
        table
    ))
    .bind(id)
    .fetch_one(&mut *conn)
    .await;

    match exists {
        Ok(true) => DatabaseError::conflict(entity, id),
        Ok(false) => DatabaseError::not_found(entity, id),
        Err(e) => DatabaseError::from(e),
    }
}
