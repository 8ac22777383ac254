//! HTTP API Layer
//!
//! REST API over the billing service using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per resource, each a thin call into `BillingService`
//! - **DTOs**: request validation and decimal-rand presentation of money
//! - **Middleware**: request ids, tracing and audit logging
//! - **Error Handling**: `{error, message}` bodies with the billing error kind
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(Arc::new(service), config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use domain_billing::BillingService;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{customers, health, invoices, jobs};
use crate::middleware::{audit_middleware, request_span};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub billing: Arc<BillingService>,
    pub config: ApiConfig,
}

/// Creates the main API router
pub fn create_router(billing: Arc<BillingService>, config: ApiConfig) -> Router {
    let state = AppState { billing, config };

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let customer_routes = Router::new().route("/", post(customers::create_customer));

    let job_routes = Router::new()
        .route("/", post(jobs::create_job))
        .route("/:id/billing", get(jobs::job_billing));

    let invoice_routes = Router::new()
        .route("/", post(invoices::create_invoice))
        .route("/deposit", post(invoices::create_deposit))
        .route("/progress", post(invoices::create_progress))
        .route("/balance", post(invoices::create_balance))
        .route("/overdue", get(invoices::list_overdue))
        .route(
            "/:id",
            get(invoices::get_invoice).delete(invoices::delete_invoice),
        )
        .route(
            "/:id/payments",
            get(invoices::list_payments).post(invoices::record_payment),
        )
        .route("/:id/send", post(invoices::mark_sent))
        .route("/:id/view", post(invoices::mark_viewed))
        .route("/:id/paid", post(invoices::mark_paid));

    let api_routes = Router::new()
        .nest("/customers", customer_routes)
        .nest("/jobs", job_routes)
        .nest("/invoices", invoice_routes)
        .layer(axum_middleware::from_fn(audit_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
