//! Core Kernel - Foundational types for the field-service billing system
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money in exact minor units, and bounded percentages
//! - Clocks and the business calendar used for due dates
//! - Strongly-typed identifiers
//! - Ports infrastructure for swappable storage adapters

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError, Percentage};
pub use temporal::{Clock, SystemClock, FixedClock, BusinessCalendar, Timezone, TemporalError};
pub use identifiers::{EntityId, CustomerId, QuoteId, JobId, InvoiceId, PaymentId};
pub use ports::{PortError, DomainPort, AdapterHealth, HealthCheckResult, HealthCheckable};
pub use error::CoreError;
