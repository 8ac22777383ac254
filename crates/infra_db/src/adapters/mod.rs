//! Domain Adapters
//!
//! Adapter implementations for domain ports, connecting domain interfaces to
//! the PostgreSQL database layer. Each adapter implements the domain's port
//! trait and translates between domain models and the repository's row types.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBillingAdapter;
//! use domain_billing::BillingPort;
//!
//! let adapter = PostgresBillingAdapter::new(pool);
//! let invoice = adapter.get_invoice(invoice_id).await?;
//! ```

pub mod billing;

pub use billing::PostgresBillingAdapter;
