//! Test Utilities Crate
//!
//! Shared test infrastructure for the billing workspace.
//!
//! # Modules
//!
//! - `fixtures`: fixed instants, standard amounts, fake customers, and a
//!   billing service wired to the in-memory port
//! - `builders`: invoices in any state
//! - `assertions`: assertion helpers for money and invoices
//! - `generators`: proptest strategies for quotes, percentages and payments

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use generators::*;
