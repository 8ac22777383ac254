//! Repository implementations
//!
//! Repositories hold the SQL and the row types it reads and writes. Domain
//! conversion happens one layer up, in `adapters`.
//!
//! Writes that must not interleave use a transaction plus a `version` guard
//! on the rows they change.

pub mod billing;

pub use billing::BillingRepository;
