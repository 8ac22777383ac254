//! Jobs
//!
//! A job is the unit of work invoices are raised against. Its quoted total
//! and VAT are copied from the accepted quote and never change afterwards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{CustomerId, JobId, Money, QuoteId};

use crate::error::BillingError;
use crate::quote::Quote;

/// Job status; moves forward only
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Quoted,
    Scheduled,
    InProgress,
    Complete,
    Invoiced,
    Paid,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Quoted => "quoted",
            JobStatus::Scheduled => "scheduled",
            JobStatus::InProgress => "in_progress",
            JobStatus::Complete => "complete",
            JobStatus::Invoiced => "invoiced",
            JobStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quoted" => Ok(JobStatus::Quoted),
            "scheduled" => Ok(JobStatus::Scheduled),
            "in_progress" => Ok(JobStatus::InProgress),
            "complete" => Ok(JobStatus::Complete),
            "invoiced" => Ok(JobStatus::Invoiced),
            "paid" => Ok(JobStatus::Paid),
            other => Err(BillingError::validation(format!("Unknown job status: {}", other))),
        }
    }
}

/// A unit of work for a customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub customer_id: CustomerId,
    pub quote_id: Option<QuoteId>,
    pub job_number: String,
    pub title: String,
    pub status: JobStatus,
    /// Quoted total including VAT
    pub quoted_total: Money,
    /// VAT portion of the quoted total
    pub quoted_vat: Money,
    /// Bumped by every progression invoice written against the job
    pub version: i64,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Creates a job from an accepted quote
    pub fn from_quote(
        quote: &Quote,
        job_number: impl Into<String>,
        title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, BillingError> {
        if !quote.is_accepted() {
            return Err(BillingError::InvalidLifecycle(format!(
                "Quote {} must be accepted before a job is created (status: {})",
                quote.quote_number, quote.status
            )));
        }

        let mut job = Self::new(
            quote.customer_id,
            job_number,
            title,
            quote.total,
            quote.vat_amount,
            now,
        )?;
        job.quote_id = Some(quote.id);
        Ok(job)
    }

    /// Creates a standalone job with an explicit total
    pub fn new(
        customer_id: CustomerId,
        job_number: impl Into<String>,
        title: impl Into<String>,
        quoted_total: Money,
        quoted_vat: Money,
        now: DateTime<Utc>,
    ) -> Result<Self, BillingError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(BillingError::validation("Job title is required"));
        }
        if quoted_total.is_negative() || quoted_vat.is_negative() {
            return Err(BillingError::validation("Job totals cannot be negative"));
        }
        if quoted_vat.currency() != quoted_total.currency() {
            return Err(BillingError::validation(format!(
                "Job VAT is in {} but the quoted total is in {}",
                quoted_vat.currency(),
                quoted_total.currency()
            )));
        }
        if quoted_vat.minor_units() > quoted_total.minor_units() {
            return Err(BillingError::validation("Job VAT cannot exceed the quoted total"));
        }

        Ok(Self {
            id: JobId::new_v7(),
            customer_id,
            quote_id: None,
            job_number: job_number.into(),
            title,
            status: JobStatus::Quoted,
            quoted_total,
            quoted_vat,
            version: 0,
            scheduled_date: None,
            completed_date: None,
            created_at: now,
        })
    }

    /// Moves the job to `next`; backwards moves and leaving `paid` are rejected
    pub fn advance_to(&mut self, next: JobStatus) -> Result<(), BillingError> {
        if next == self.status {
            return Ok(());
        }
        if self.status == JobStatus::Paid || next < self.status {
            return Err(BillingError::InvalidLifecycle(format!(
                "Job {} cannot move from {} to {}",
                self.job_number, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn schedule(&mut self, date: NaiveDate) -> Result<(), BillingError> {
        self.advance_to(JobStatus::Scheduled)?;
        self.scheduled_date = Some(date);
        Ok(())
    }

    pub fn complete(&mut self, date: NaiveDate) -> Result<(), BillingError> {
        self.advance_to(JobStatus::Complete)?;
        self.completed_date = Some(date);
        Ok(())
    }

    pub fn is_paid(&self) -> bool {
        self.status == JobStatus::Paid
    }
}
