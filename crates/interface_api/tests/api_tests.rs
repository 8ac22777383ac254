//! HTTP tests for the billing API over the in-memory port

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use interface_api::config::ApiConfig;
use interface_api::create_router;
use interface_api::dto::invoice::{InvoiceResponse, PaymentResponse};
use interface_api::dto::customer::CustomerResponse;
use interface_api::dto::job::{JobBillingResponse, JobResponse};
use interface_api::error::ErrorResponse;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::json;
use test_utils::TestBilling;
use uuid::Uuid;

/// Error bodies only need their code and message in these tests
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

fn server(billing: &TestBilling) -> TestServer {
    TestServer::new(create_router(billing.service.clone(), ApiConfig::default())).unwrap()
}

fn job_id(billing: &TestBilling) -> Uuid {
    *billing.job.id.as_uuid()
}

async fn full_invoice(server: &TestServer, billing: &TestBilling, unit_price: &str) -> InvoiceResponse {
    let response = server
        .post("/api/v1/invoices")
        .json(&json!({
            "customer_id": billing.customer.id.as_uuid(),
            "line_items": [
                { "description": "Call-out and repair", "quantity": "1", "unit_price": unit_price }
            ],
            "vat_registered": false
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<InvoiceResponse>()
}

#[tokio::test]
async fn health_and_readiness() {
    let billing = TestBilling::new().await;
    let server = server(&billing);

    server.get("/health").await.assert_status_ok();
    server.get("/health/ready").await.assert_status_ok();
}

#[tokio::test]
async fn request_ids_are_generated_or_echoed() {
    let billing = TestBilling::new().await;
    let server = server(&billing);

    let generated = server.get("/health").await;
    assert!(!generated.header("x-request-id").is_empty());

    let echoed = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("req-7"),
        )
        .await;
    assert_eq!(echoed.header("x-request-id").to_str().unwrap(), "req-7");
}

#[tokio::test]
async fn progression_through_the_api() {
    let billing = TestBilling::new().await;
    let server = server(&billing);

    let deposit = server
        .post("/api/v1/invoices/deposit")
        .json(&json!({ "job_id": job_id(&billing), "deposit_percentage": "50" }))
        .await;
    deposit.assert_status(StatusCode::CREATED);
    let deposit = deposit.json::<InvoiceResponse>();
    assert_eq!(deposit.invoice_type, "deposit");
    assert_eq!(deposit.total, dec!(5000.00));
    assert_eq!(deposit.status, "draft");
    assert_eq!(deposit.invoice_number, "INV-2025-001");

    let progress = server
        .post("/api/v1/invoices/progress")
        .json(&json!({ "job_id": job_id(&billing), "percentage": 30 }))
        .await;
    progress.assert_status(StatusCode::CREATED);
    assert_eq!(progress.json::<InvoiceResponse>().total, dec!(3000.00));

    let summary = server
        .get(&format!("/api/v1/jobs/{}/billing", job_id(&billing)))
        .await
        .json::<JobBillingResponse>();
    assert_eq!(summary.invoiced, dec!(8000.00));
    assert_eq!(summary.remaining_amount, dec!(2000.00));
    assert_eq!(summary.remaining_percentage, dec!(20));
    assert_eq!(summary.invoices.len(), 2);

    let balance = server
        .post("/api/v1/invoices/balance")
        .json(&json!({ "job_id": job_id(&billing) }))
        .await;
    balance.assert_status(StatusCode::CREATED);
    let balance = balance.json::<InvoiceResponse>();
    assert_eq!(balance.total, dec!(2000.00));
    assert_eq!(balance.parent_invoice_id, Some(deposit.id));

    let again = server
        .post("/api/v1/invoices/balance")
        .json(&json!({ "job_id": job_id(&billing) }))
        .await;
    again.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(again.json::<ErrorBody>().error, "duplicate_balance_error");
}

#[tokio::test]
async fn overshooting_progress_is_rejected() {
    let billing = TestBilling::new().await;
    let server = server(&billing);

    server
        .post("/api/v1/invoices/deposit")
        .json(&json!({ "job_id": job_id(&billing), "deposit_percentage": "80" }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .post("/api/v1/invoices/progress")
        .json(&json!({ "job_id": job_id(&billing), "percentage": "25" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ErrorBody>().error, "overshoot_error");
}

#[tokio::test]
async fn invalid_percentage_fails_validation() {
    let billing = TestBilling::new().await;
    let server = server(&billing);

    let response = server
        .post("/api/v1/invoices/deposit")
        .json(&json!({ "job_id": job_id(&billing), "deposit_percentage": "0" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body = response.json::<ErrorResponse>();
    assert_eq!(body.error, "validation_error");
    assert!(body
        .details
        .unwrap_or_default()
        .iter()
        .any(|d| d.starts_with("deposit_percentage")));
}

#[tokio::test]
async fn percentages_beyond_two_places_fail_validation() {
    let billing = TestBilling::new().await;
    let server = server(&billing);

    let response = server
        .post("/api/v1/invoices/progress")
        .json(&json!({ "job_id": job_id(&billing), "percentage": "33.3333" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<ErrorResponse>();
    assert_eq!(body.error, "validation_error");
    assert!(body
        .details
        .unwrap_or_default()
        .iter()
        .any(|d| d.starts_with("percentage")));

    server
        .post("/api/v1/invoices/progress")
        .json(&json!({ "job_id": job_id(&billing), "percentage": "33.33" }))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn overpayment_then_exact_payment() {
    let billing = TestBilling::new().await;
    let server = server(&billing);
    let invoice = full_invoice(&server, &billing, "1500.00").await;
    assert_eq!(invoice.total, dec!(1500.00));

    server
        .post(&format!("/api/v1/invoices/{}/send", invoice.id))
        .await
        .assert_status_ok();

    let over = server
        .post(&format!("/api/v1/invoices/{}/payments", invoice.id))
        .json(&json!({ "amount": "1500.01", "payment_date": "2025-03-03", "payment_method": "eft" }))
        .await;
    over.assert_status(StatusCode::BAD_REQUEST);
    let body = over.json::<ErrorBody>();
    assert_eq!(body.error, "overpayment_error");
    assert!(body.message.contains("1500.00"));

    let paid = server
        .post(&format!("/api/v1/invoices/{}/payments", invoice.id))
        .json(&json!({
            "amount": "1500.00",
            "payment_date": "2025-03-03",
            "payment_method": "card",
            "reference": "POS-4411"
        }))
        .await;
    paid.assert_status(StatusCode::CREATED);
    let paid = paid.json::<InvoiceResponse>();
    assert_eq!(paid.status, "paid");
    assert_eq!(paid.outstanding, dec!(0));
    assert!(paid.paid_at.is_some());

    let payments = server
        .get(&format!("/api/v1/invoices/{}/payments", invoice.id))
        .await
        .json::<Vec<PaymentResponse>>();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].reference.as_deref(), Some("POS-4411"));
}

#[tokio::test]
async fn overdue_list_follows_the_clock() {
    let billing = TestBilling::new().await;
    let server = server(&billing);

    let deposit = server
        .post("/api/v1/invoices/deposit")
        .json(&json!({ "job_id": job_id(&billing), "deposit_percentage": "40" }))
        .await
        .json::<InvoiceResponse>();
    server
        .post(&format!("/api/v1/invoices/{}/send", deposit.id))
        .await
        .assert_status_ok();

    let overdue = server.get("/api/v1/invoices/overdue").await.json::<Vec<InvoiceResponse>>();
    assert!(overdue.is_empty());

    billing.clock.advance_days(8);

    let overdue = server.get("/api/v1/invoices/overdue").await.json::<Vec<InvoiceResponse>>();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].id, deposit.id);
    assert_eq!(overdue[0].status, "overdue");

    let fetched = server
        .get(&format!("/api/v1/invoices/{}", deposit.id))
        .await
        .json::<InvoiceResponse>();
    assert_eq!(fetched.status, "overdue");
}

#[tokio::test]
async fn viewing_a_draft_is_an_invalid_transition() {
    let billing = TestBilling::new().await;
    let server = server(&billing);
    let invoice = full_invoice(&server, &billing, "800.00").await;

    let response = server
        .post(&format!("/api/v1/invoices/{}/view", invoice.id))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<ErrorBody>().error, "invalid_status_transition");
}

#[tokio::test]
async fn deleting_a_paid_invoice_needs_force() {
    let billing = TestBilling::new().await;
    let server = server(&billing);
    let invoice = full_invoice(&server, &billing, "1200.00").await;

    server
        .post(&format!("/api/v1/invoices/{}/send", invoice.id))
        .await
        .assert_status_ok();
    server
        .post(&format!("/api/v1/invoices/{}/payments", invoice.id))
        .json(&json!({ "amount": "200.00", "payment_date": "2025-03-03", "payment_method": "cash" }))
        .await
        .assert_status(StatusCode::CREATED);

    let refused = server.delete(&format!("/api/v1/invoices/{}", invoice.id)).await;
    refused.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(refused.json::<ErrorBody>().error, "has_payments");

    server
        .delete(&format!("/api/v1/invoices/{}", invoice.id))
        .add_query_param("force", true)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert_eq!(billing.port.payment_count().await, 0);
    server
        .get(&format!("/api/v1/invoices/{}", invoice.id))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_invoice_is_not_found() {
    let billing = TestBilling::new().await;
    let server = server(&billing);

    let response = server
        .get(&format!("/api/v1/invoices/{}", Uuid::new_v4()))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<ErrorBody>().error, "not_found");
}

#[tokio::test]
async fn customer_and_job_creation() {
    let billing = TestBilling::new().await;
    let server = server(&billing);

    let customer = server
        .post("/api/v1/customers")
        .json(&json!({ "name": "  Sipho Dlamini ", "phone": "083 555 0199" }))
        .await;
    customer.assert_status(StatusCode::CREATED);
    let customer = customer.json::<CustomerResponse>();
    assert_eq!(customer.name, "Sipho Dlamini");

    let job = server
        .post("/api/v1/jobs")
        .json(&json!({
            "customer_id": customer.id,
            "title": "Solar inverter install",
            "quoted_total": "46000.00",
            "quoted_vat": "6000.00"
        }))
        .await;
    job.assert_status(StatusCode::CREATED);
    let job = job.json::<JobResponse>();
    assert_eq!(job.job_number, "JOB-2025-002");
    assert_eq!(job.quoted_total, dec!(46000));

    let orphan = server
        .post("/api/v1/jobs")
        .json(&json!({
            "customer_id": Uuid::new_v4(),
            "title": "Nobody's job",
            "quoted_total": "100.00"
        }))
        .await;
    orphan.assert_status(StatusCode::NOT_FOUND);
}
