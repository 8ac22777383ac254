//! Job DTOs

use chrono::{DateTime, NaiveDate, Utc};
use domain_billing::{Job, JobBillingSummary};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::invoice::InvoiceResponse;
use super::{validate_non_negative_amount, validate_positive_amount};

/// Opens a job directly with its quoted amounts
#[derive(Debug, Deserialize, Validate)]
pub struct CreateJobRequest {
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Quoted total including VAT
    #[validate(custom(function = "validate_positive_amount"))]
    pub quoted_total: Decimal,
    #[validate(custom(function = "validate_non_negative_amount"))]
    #[serde(default)]
    pub quoted_vat: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub quote_id: Option<Uuid>,
    pub job_number: String,
    pub title: String,
    pub status: String,
    pub quoted_total: Decimal,
    pub quoted_vat: Decimal,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl From<&Job> for JobResponse {
    fn from(job: &Job) -> Self {
        Self {
            id: *job.id.as_uuid(),
            customer_id: *job.customer_id.as_uuid(),
            quote_id: job.quote_id.map(|id| *id.as_uuid()),
            job_number: job.job_number.clone(),
            title: job.title.clone(),
            status: job.status.as_str().to_string(),
            quoted_total: job.quoted_total.amount(),
            quoted_vat: job.quoted_vat.amount(),
            scheduled_date: job.scheduled_date,
            completed_date: job.completed_date,
            created_at: job.created_at,
        }
    }
}

/// Progression state of a job
#[derive(Debug, Serialize, Deserialize)]
pub struct JobBillingResponse {
    pub job: JobResponse,
    pub quoted_total: Decimal,
    pub invoiced: Decimal,
    pub remaining_amount: Decimal,
    /// Share of the quoted total still to bill, 2 dp
    pub remaining_percentage: Decimal,
    pub invoices: Vec<InvoiceResponse>,
}

impl From<&JobBillingSummary> for JobBillingResponse {
    fn from(summary: &JobBillingSummary) -> Self {
        Self {
            job: JobResponse::from(&summary.job),
            quoted_total: summary.job.quoted_total.amount(),
            invoiced: summary.invoiced.amount(),
            remaining_amount: summary.remaining.amount.amount(),
            remaining_percentage: summary.remaining.percentage,
            invoices: summary.invoices.iter().map(InvoiceResponse::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_job_total_must_be_positive() {
        let body = CreateJobRequest {
            customer_id: Uuid::new_v4(),
            title: "Kitchen rewire".to_string(),
            quoted_total: dec!(0),
            quoted_vat: dec!(0),
        };
        assert!(body.validate().is_err());
    }
}
