//! Quotes
//!
//! A quote prices the work for a customer. Once accepted its total is frozen
//! and becomes the basis every progression invoice on the resulting job is
//! measured against.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{Currency, CustomerId, Money, Percentage, QuoteId};

use crate::error::BillingError;
use crate::line_item::{LineItem, Totals};

/// Quote lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Viewed,
    Accepted,
    Rejected,
    Expired,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Viewed => "viewed",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
            QuoteStatus::Expired => "expired",
        }
    }

    /// Whether the customer can still accept or reject
    pub fn is_open(&self) -> bool {
        matches!(self, QuoteStatus::Draft | QuoteStatus::Sent | QuoteStatus::Viewed)
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A priced proposal for a customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub customer_id: CustomerId,
    pub quote_number: String,
    pub line_items: Vec<LineItem>,
    /// VAT rate applied to the subtotal; `None` when not VAT-registered
    pub vat_rate: Option<Percentage>,
    pub subtotal: Money,
    pub vat_amount: Money,
    pub total: Money,
    pub status: QuoteStatus,
    pub valid_until: NaiveDate,
    pub notes: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    /// Creates a draft quote and computes its totals
    pub fn new(
        customer_id: CustomerId,
        quote_number: impl Into<String>,
        line_items: Vec<LineItem>,
        vat_rate: Option<Percentage>,
        valid_until: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Self, BillingError> {
        let totals = Totals::from_line_items(&line_items, vat_rate, Currency::ZAR)?;

        Ok(Self {
            id: QuoteId::new_v7(),
            customer_id,
            quote_number: quote_number.into(),
            line_items,
            vat_rate,
            subtotal: totals.subtotal,
            vat_amount: totals.vat_amount,
            total: totals.total,
            status: QuoteStatus::Draft,
            valid_until,
            notes: None,
            sent_at: None,
            viewed_at: None,
            accepted_at: None,
            rejected_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces the line items; only allowed while the quote is open
    pub fn revise_line_items(
        &mut self,
        line_items: Vec<LineItem>,
        now: DateTime<Utc>,
    ) -> Result<(), BillingError> {
        if !self.status.is_open() {
            return Err(BillingError::InvalidLifecycle(format!(
                "Quote {} is {} and can no longer be changed",
                self.quote_number, self.status
            )));
        }
        let totals = Totals::from_line_items(&line_items, self.vat_rate, self.total.currency())?;
        self.line_items = line_items;
        self.subtotal = totals.subtotal;
        self.vat_amount = totals.vat_amount;
        self.total = totals.total;
        self.updated_at = now;
        Ok(())
    }

    /// Records that the quote was sent to the customer
    pub fn mark_sent(&mut self, now: DateTime<Utc>) -> Result<(), BillingError> {
        match self.status {
            QuoteStatus::Draft | QuoteStatus::Sent => {
                self.status = QuoteStatus::Sent;
                self.sent_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
            other => Err(self.lifecycle_error("send", other)),
        }
    }

    /// Records the first time the customer opened the quote
    pub fn mark_viewed(&mut self, now: DateTime<Utc>) -> Result<(), BillingError> {
        match self.status {
            QuoteStatus::Sent => {
                self.status = QuoteStatus::Viewed;
                self.viewed_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
            QuoteStatus::Viewed => Ok(()),
            other => Err(self.lifecycle_error("view", other)),
        }
    }

    /// Accepts the quote, freezing its total
    pub fn accept(&mut self, today: NaiveDate, now: DateTime<Utc>) -> Result<(), BillingError> {
        let status = self.effective_status(today);
        if !status.is_open() {
            return Err(self.lifecycle_error("accept", status));
        }
        self.status = QuoteStatus::Accepted;
        self.accepted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Rejects the quote
    pub fn reject(&mut self, today: NaiveDate, now: DateTime<Utc>) -> Result<(), BillingError> {
        let status = self.effective_status(today);
        if !status.is_open() {
            return Err(self.lifecycle_error("reject", status));
        }
        self.status = QuoteStatus::Rejected;
        self.rejected_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Status for display: an open, sent quote past its validity date is expired
    pub fn effective_status(&self, today: NaiveDate) -> QuoteStatus {
        match self.status {
            QuoteStatus::Sent | QuoteStatus::Viewed if self.valid_until < today => {
                QuoteStatus::Expired
            }
            status => status,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == QuoteStatus::Accepted
    }

    fn lifecycle_error(&self, action: &str, status: QuoteStatus) -> BillingError {
        BillingError::InvalidLifecycle(format!(
            "Cannot {} quote {} while it is {}",
            action, self.quote_number, status
        ))
    }
}
