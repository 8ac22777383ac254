//! Line items and document totals
//!
//! Quotes and invoices share the same line-item shape. Totals are derived
//! from the items: each line is quantity × unit price rounded to the cent,
//! VAT is a percentage of the subtotal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Money, Percentage};

use crate::error::BillingError;

/// South African standard VAT rate
pub const STANDARD_VAT_RATE: Percentage = Percentage::whole(15);

/// A single line on a quote or invoice
///
/// Unit prices may be negative: balance invoices carry "Less: deposit"
/// lines that subtract earlier progression invoices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Money,
}

impl LineItem {
    /// Creates a line item, validating description and quantity
    pub fn new(
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Money,
    ) -> Result<Self, BillingError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(BillingError::validation("Line item description is required"));
        }
        if quantity <= Decimal::ZERO {
            return Err(BillingError::validation(format!(
                "Line item quantity must be positive, got {}",
                quantity
            )));
        }
        Ok(Self {
            description,
            quantity,
            unit_price,
        })
    }

    /// A quantity-one line
    pub fn single(description: impl Into<String>, unit_price: Money) -> Self {
        Self {
            description: description.into(),
            quantity: Decimal::ONE,
            unit_price,
        }
    }

    /// Line total rounded half-up to the cent
    pub fn total(&self) -> Result<Money, BillingError> {
        Ok(self.unit_price.multiply(self.quantity)?)
    }
}

/// Subtotal, VAT and grand total of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Money,
    pub vat_amount: Money,
    pub total: Money,
}

impl Totals {
    /// Computes totals for `items`, adding VAT at `vat_rate` when the business is VAT-registered
    pub fn from_line_items(
        items: &[LineItem],
        vat_rate: Option<Percentage>,
        currency: Currency,
    ) -> Result<Self, BillingError> {
        if items.is_empty() {
            return Err(BillingError::validation("At least one line item is required"));
        }

        let mut subtotal = Money::zero(currency);
        for item in items {
            if item.unit_price.currency() != currency {
                return Err(BillingError::validation(format!(
                    "Line item '{}' is priced in {}, expected {}",
                    item.description,
                    item.unit_price.currency(),
                    currency
                )));
            }
            subtotal = subtotal.checked_add(&item.total()?)?;
        }

        let vat_amount = match vat_rate {
            Some(rate) => subtotal.percent_of(rate)?,
            None => Money::zero(currency),
        };
        let total = subtotal.checked_add(&vat_amount)?;

        Ok(Self {
            subtotal,
            vat_amount,
            total,
        })
    }
}
