//! Customers billed by the business

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::CustomerId;

use crate::error::BillingError;

/// A customer of the trade business
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Creates a customer; name and phone are required
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, BillingError> {
        let name = name.into().trim().to_string();
        let phone = phone.into().trim().to_string();

        if name.is_empty() {
            return Err(BillingError::validation("Customer name is required"));
        }
        if phone.is_empty() {
            return Err(BillingError::validation("Customer phone is required"));
        }

        Ok(Self {
            id: CustomerId::new_v7(),
            name,
            phone,
            email: None,
            address: None,
            created_at: now,
        })
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}
