//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the billing engine using SQLx: a connection
//! pool, embedded migrations, the billing repository, and the adapter that
//! implements `domain_billing::BillingPort`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, PostgresBillingAdapter};
//!
//! let pool = create_pool("postgres://localhost/fieldbill").await?;
//! run_migrations(&pool).await?;
//! let adapter = PostgresBillingAdapter::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::PostgresBillingAdapter;
pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use repositories::BillingRepository;
