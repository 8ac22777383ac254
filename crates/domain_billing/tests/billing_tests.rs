//! Billing Domain Tests
//!
//! # Test Organization
//!
//! - `progression_scenarios` - deposit, progress and balance against a quoted total
//! - `payment_scenarios` - applying payments to invoices
//! - `status_classification` - effective invoice status
//! - `properties` - property-based tests for the engine
//! - `service` - `BillingService` against the in-memory port

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use core_kernel::{CustomerId, JobId, Money, PortError};
use domain_billing::{
    apply_payment, classify_status, request_balance, request_deposit, request_progress,
    BillingError, BillingPort, BillingTerms, Customer, FullInvoiceRequest, Invoice,
    InvoiceStatus, InvoiceType, IssuedInvoice, JobStatus, LineItem, PaymentMethod,
    PaymentRequest, Quote, QuotedTotals, ServiceError, STANDARD_VAT_RATE,
};
use test_utils::{
    assert_cents, assert_effective_status, assert_money_sum_equals, assert_within_quote,
    cash_payment, invoice_from_draft, issue_draft, InvoiceBuilder, MoneyFixtures,
    TemporalFixtures, TestBilling,
};

fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
    TemporalFixtures::date(y, m, d)
}

/// R10,000 quote without VAT
fn ten_thousand() -> QuotedTotals {
    QuotedTotals::new(MoneyFixtures::quote_total(), Money::zar(0), "Roof repair")
}

/// Sent full invoice due 2 April
fn full_invoice(total_cents: i64) -> Invoice {
    InvoiceBuilder::new()
        .with_number("INV-2025-050")
        .with_total(Money::zar(total_cents))
        .with_due_date(date(2025, 4, 2))
        .build()
}

// ============================================================================
// PROGRESSION SCENARIOS
// ============================================================================

mod progression_scenarios {
    use super::*;

    #[test]
    fn test_deposit_progress_balance_on_ten_thousand() {
        let quote = ten_thousand();

        let deposit = request_deposit(&quote, &[], dec!(50)).unwrap();
        assert_cents(&deposit.total, 500_000);
        let mut issued = vec![issue_draft(deposit, "INV-2025-001")];

        let progress = request_progress(&quote, &issued, dec!(30)).unwrap();
        assert_cents(&progress.total, 300_000);
        issued.push(issue_draft(progress, "INV-2025-002"));

        let remaining = domain_billing::compute_remaining(quote.total, &issued).unwrap();
        assert_cents(&remaining.amount, 200_000);
        assert_eq!(remaining.percentage, dec!(20));

        let balance = request_balance(&quote, &issued).unwrap();
        assert_cents(&balance.total, 200_000);
        assert_eq!(balance.invoice_type, InvoiceType::Balance);
        issued.push(issue_draft(balance, "INV-2025-003"));

        let totals: Vec<Money> = issued.iter().map(|inv| inv.total).collect();
        assert_money_sum_equals(&totals, &quote.total);
        assert_eq!(request_balance(&quote, &issued), Err(BillingError::DuplicateBalance));
    }

    #[test]
    fn test_progress_over_remaining_is_overshoot() {
        let quote = ten_thousand();
        let issued = vec![issue_draft(
            request_deposit(&quote, &[], dec!(80)).unwrap(),
            "INV-2025-001",
        )];

        let err = request_progress(&quote, &issued, dec!(25)).unwrap_err();
        assert!(matches!(err, BillingError::Overshoot { .. }));
        assert_eq!(err.kind(), "overshoot_error");
    }

    #[test]
    fn test_deposit_after_progress_consumed_headroom() {
        let quote = ten_thousand();
        let issued = vec![issue_draft(
            request_progress(&quote, &[], dec!(90)).unwrap(),
            "INV-2025-001",
        )];

        let err = request_deposit(&quote, &issued, dec!(20)).unwrap_err();
        assert!(matches!(err, BillingError::Overshoot { .. }));
    }

    #[test]
    fn test_odd_percentages_round_half_up() {
        // 33.33% of R1,000.01 = 33,333.3333 cents -> 33,333
        let quote = QuotedTotals::new(Money::zar(100_001), Money::zar(0), "Paving");
        let draft = request_progress(&quote, &[], dec!(33.33)).unwrap();
        assert_cents(&draft.total, 33_333);

        // 50% of R0.05 = 2.5 cents -> 3
        let tiny = QuotedTotals::new(Money::zar(5), Money::zar(0), "Washer");
        assert_cents(&request_deposit(&tiny, &[], dec!(50)).unwrap().total, 3);
    }

    #[test]
    fn test_thirds_close_on_the_quoted_cents() {
        let quote = QuotedTotals::new(Money::zar(100_000), Money::zar(13_043), "Paving");
        let mut invoices: Vec<Invoice> = Vec::new();

        for (n, pct) in [dec!(33.33), dec!(33.33), dec!(33.34)].into_iter().enumerate() {
            let issued: Vec<IssuedInvoice> = invoices.iter().map(Invoice::to_issued).collect();
            let draft = request_progress(&quote, &issued, pct).unwrap();
            invoices.push(invoice_from_draft(draft, &format!("INV-2025-{:03}", n + 1)));
        }

        let totals: Vec<Money> = invoices.iter().map(|inv| inv.total).collect();
        let vat: Vec<Money> = invoices.iter().map(|inv| inv.vat_amount).collect();
        assert_money_sum_equals(&totals, &quote.total);
        assert_money_sum_equals(&vat, &quote.vat_amount);
        assert_within_quote(&quote.total, &invoices);
    }
}

// ============================================================================
// PAYMENT SCENARIOS
// ============================================================================

mod payment_scenarios {
    use super::*;

    #[test]
    fn test_one_cent_overpayment_rejected() {
        let invoice = full_invoice(150_000);
        let err = apply_payment(
            &invoice,
            &cash_payment(&invoice, Money::zar(150_001)),
            TemporalFixtures::now(),
        )
        .unwrap_err();

        assert_eq!(err.kind(), "overpayment_error");
        assert!(invoice.amount_paid.is_zero());
    }

    #[test]
    fn test_exact_payment_settles_invoice() {
        let invoice = full_invoice(150_000);
        let now = TemporalFixtures::now();
        let paid = apply_payment(&invoice, &cash_payment(&invoice, Money::zar(150_000)), now)
            .unwrap();

        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_cents(&paid.outstanding().unwrap(), 0);
        assert!(apply_payment(&paid, &cash_payment(&paid, Money::zar(1)), now).is_err());
    }
}

// ============================================================================
// STATUS CLASSIFICATION
// ============================================================================

mod status_classification {
    use super::*;

    #[test]
    fn test_paid_invoice_past_due_is_paid() {
        let invoice = full_invoice(80_000);
        let paid = apply_payment(
            &invoice,
            &cash_payment(&invoice, Money::zar(80_000)),
            TemporalFixtures::now(),
        )
        .unwrap();
        assert_effective_status(&paid, date(2025, 12, 31), InvoiceStatus::Paid);
    }

    #[test]
    fn test_sent_invoice_becomes_overdue_day_after_due() {
        let invoice = full_invoice(80_000);

        assert_effective_status(&invoice, date(2025, 4, 2), InvoiceStatus::Sent);
        assert_effective_status(&invoice, date(2025, 4, 3), InvoiceStatus::Overdue);
    }

    #[test]
    fn test_partly_paid_draft_stays_draft() {
        let invoice = InvoiceBuilder::new()
            .with_status(InvoiceStatus::Draft)
            .with_amount_paid(Money::zar(1))
            .with_due_date(date(2025, 1, 31))
            .build();
        assert_effective_status(&invoice, date(2025, 3, 3), InvoiceStatus::Draft);
    }
}

// ============================================================================
// PROPERTIES
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;
    use test_utils::{
        date_2025_strategy, payment_pair_strategy, percentage_strategy,
        persisted_status_strategy, progression_split_strategy, quote_total_strategy,
        quote_with_vat_strategy,
    };

    proptest! {
        #[test]
        fn deposit_is_rounded_share_of_total(
            quote_total in quote_total_strategy(),
            percentage in percentage_strategy()
        ) {
            let quote = QuotedTotals::new(quote_total, Money::zar(0), "Job");
            let total = quote_total.minor_units();
            let expected = (Decimal::from(total) * percentage / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

            match request_deposit(&quote, &[], percentage) {
                Ok(draft) => {
                    prop_assert_eq!(Decimal::from(draft.total.minor_units()), expected);
                    prop_assert!(draft.total.minor_units() <= total);
                }
                Err(err) => {
                    prop_assert_eq!(expected, Decimal::ZERO);
                    prop_assert_eq!(err.kind(), "validation_error");
                }
            }
        }

        #[test]
        fn progress_never_overshoots(
            quote_total in quote_total_strategy(),
            steps in prop::collection::vec(1u32..=40u32, 1..8)
        ) {
            let quote = QuotedTotals::new(quote_total, Money::zar(0), "Job");
            let total = quote_total.minor_units();
            let mut issued: Vec<IssuedInvoice> = Vec::new();
            let mut invoiced = 0i64;
            let mut percent = 0u32;

            for (i, step) in steps.into_iter().enumerate() {
                let percentage = Decimal::from(step);
                let amount = quote_total.percent_of(percentage.try_into().unwrap()).unwrap();

                match request_progress(&quote, &issued, percentage) {
                    Ok(draft) => {
                        prop_assert!(percent + step <= 100);
                        prop_assert!(invoiced + draft.total.minor_units() <= total);
                        if percent + step == 100 {
                            prop_assert_eq!(invoiced + draft.total.minor_units(), total);
                        }
                        invoiced += draft.total.minor_units();
                        percent += step;
                        issued.push(issue_draft(draft, &format!("INV-2025-{:03}", i + 1)));
                    }
                    Err(err) => {
                        prop_assert!(matches!(err, BillingError::Overshoot { .. }), "{:?}", err);
                        prop_assert!(
                            percent + step > 100 || invoiced + amount.minor_units() > total
                        );
                    }
                }

                let remaining = domain_billing::compute_remaining(quote.total, &issued).unwrap();
                prop_assert!(remaining.amount.minor_units() >= 0);
            }
        }

        #[test]
        fn splits_reaching_one_hundred_bill_the_whole_quote(
            (total, vat) in quote_with_vat_strategy(),
            split in progression_split_strategy()
        ) {
            let quote = QuotedTotals::new(total, vat, "Job");
            let mut invoices: Vec<Invoice> = Vec::new();
            let mut percent = Decimal::ZERO;

            for (n, pct) in split.into_iter().enumerate() {
                let issued: Vec<IssuedInvoice> = invoices.iter().map(Invoice::to_issued).collect();
                match request_progress(&quote, &issued, pct) {
                    Ok(draft) => {
                        percent += pct;
                        invoices.push(invoice_from_draft(draft, &format!("INV-2025-{:03}", n + 1)));
                    }
                    Err(BillingError::Overshoot { .. }) => break,
                    Err(other) => return Err(TestCaseError::fail(other.to_string())),
                }
            }

            assert_within_quote(&total, &invoices);
            if percent == Decimal::ONE_HUNDRED {
                let totals: Vec<Money> = invoices.iter().map(|inv| inv.total).collect();
                assert_money_sum_equals(&totals, &total);
            }
        }

        #[test]
        fn payment_order_does_not_matter((total, a, b) in payment_pair_strategy()) {
            let invoice = InvoiceBuilder::new().with_total(Money::zar(total)).build();
            let now = TemporalFixtures::now();

            let ab = apply_payment(&invoice, &cash_payment(&invoice, Money::zar(a)), now)
                .and_then(|inv| apply_payment(&inv, &cash_payment(&inv, Money::zar(b)), now))
                .unwrap();
            let ba = apply_payment(&invoice, &cash_payment(&invoice, Money::zar(b)), now)
                .and_then(|inv| apply_payment(&inv, &cash_payment(&inv, Money::zar(a)), now))
                .unwrap();

            prop_assert_eq!(ab.amount_paid, ba.amount_paid);
            prop_assert_eq!(ab.status, ba.status);
        }

        #[test]
        fn full_payment_always_classifies_paid(
            persisted in persisted_status_strategy(),
            total in 0i64..10_000_000i64,
            due in date_2025_strategy()
        ) {
            let today = date(2025, 6, 1);
            let status = classify_status(persisted, Some(due), Money::zar(total), Money::zar(total), today);
            prop_assert_eq!(status, InvoiceStatus::Paid);
        }

        #[test]
        fn drafts_are_never_overdue(
            total in 1i64..10_000_000i64,
            due in date_2025_strategy()
        ) {
            let today = date(2025, 12, 31);
            let status = classify_status(InvoiceStatus::Draft, Some(due), Money::zar(0), Money::zar(total), today);
            prop_assert_eq!(status, InvoiceStatus::Draft);
        }
    }
}

// ============================================================================
// SERVICE
// ============================================================================

mod service {
    use super::*;

    fn eft(cents: i64) -> PaymentRequest {
        PaymentRequest {
            amount: Money::zar(cents),
            payment_method: PaymentMethod::Eft,
            payment_date: TemporalFixtures::today(),
            reference: Some("FNB-2291".to_string()),
        }
    }

    /// R9,200.00 geyser quote (R8,000.00 + 15% VAT), sent and accepted
    fn accepted_quote(customer: &Customer) -> Quote {
        let mut quote = sent_quote(customer);
        quote
            .accept(TemporalFixtures::today(), TemporalFixtures::now())
            .unwrap();
        quote
    }

    fn sent_quote(customer: &Customer) -> Quote {
        let mut quote = Quote::new(
            customer.id,
            "QTE-2025-004",
            vec![LineItem::single("Geyser replacement", Money::zar(800_000))],
            Some(STANDARD_VAT_RATE),
            date(2025, 3, 31),
            TemporalFixtures::now(),
        )
        .unwrap();
        quote.mark_sent(TemporalFixtures::now()).unwrap();
        quote
    }

    async fn job_status(h: &TestBilling, job_id: JobId) -> JobStatus {
        h.port.get_job(job_id).await.unwrap().status
    }

    #[tokio::test]
    async fn test_progression_through_service() {
        let h = TestBilling::new().await;

        let deposit = h.service.create_deposit_invoice(h.job.id, dec!(50)).await.unwrap();
        assert_eq!(deposit.invoice_number, "INV-2025-001");
        assert_cents(&deposit.total, 500_000);
        assert_eq!(deposit.due_date, Some(date(2025, 3, 10)));

        let progress = h.service.create_progress_invoice(h.job.id, dec!(30)).await.unwrap();
        assert_eq!(progress.invoice_number, "INV-2025-002");
        assert_eq!(progress.due_date, Some(date(2025, 3, 17)));

        let summary = h.service.job_billing_summary(h.job.id).await.unwrap();
        assert_cents(&summary.invoiced, 800_000);
        assert_cents(&summary.remaining.amount, 200_000);
        assert_eq!(summary.remaining.percentage, dec!(20));
        assert_eq!(summary.job.version, 2);
        assert_eq!(summary.invoices.len(), 2);

        let balance = h.service.create_balance_invoice(h.job.id).await.unwrap();
        assert_cents(&balance.total, 200_000);
        assert_eq!(balance.parent_invoice_id, Some(deposit.id));

        let job = h.port.get_job(h.job.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Invoiced);

        let err = h.service.create_balance_invoice(h.job.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Billing(BillingError::DuplicateBalance)));
    }

    #[tokio::test]
    async fn test_even_split_of_an_odd_cent_job() {
        let h = TestBilling::with_quote(Money::zar(1_000_001), MoneyFixtures::quote_vat()).await;

        let deposit = h.service.create_deposit_invoice(h.job.id, dec!(50)).await.unwrap();
        let progress = h.service.create_progress_invoice(h.job.id, dec!(50)).await.unwrap();

        assert_cents(&deposit.total, 500_001);
        assert_cents(&progress.total, 500_000);
        assert_money_sum_equals(
            &[deposit.vat_amount, progress.vat_amount],
            &MoneyFixtures::quote_vat(),
        );
        assert_eq!(h.port.get_job(h.job.id).await.unwrap().status, JobStatus::Invoiced);
    }

    #[tokio::test]
    async fn test_due_dates_follow_the_business_day() {
        let h = TestBilling::new().await;
        h.clock.set(TemporalFixtures::late_evening());

        let deposit = h.service.create_deposit_invoice(h.job.id, dec!(20)).await.unwrap();
        assert_eq!(deposit.due_date, Some(date(2025, 3, 11)));
    }

    #[tokio::test]
    async fn test_balance_needs_prior_progression() {
        let h = TestBilling::new().await;
        let err = h.service.create_balance_invoice(h.job.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Billing(BillingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_paying_every_invoice_pays_the_job() {
        let h = TestBilling::new().await;
        let deposit = h.service.create_deposit_invoice(h.job.id, dec!(40)).await.unwrap();
        let balance = h.service.create_balance_invoice(h.job.id).await.unwrap();

        h.service.record_payment(deposit.id, eft(400_000)).await.unwrap();
        assert_eq!(h.port.get_job(h.job.id).await.unwrap().status, JobStatus::Invoiced);

        h.service.record_payment(balance.id, eft(250_000)).await.unwrap();
        let settled = h.service.record_payment(balance.id, eft(350_000)).await.unwrap();

        assert_eq!(settled.status, InvoiceStatus::Paid);
        assert_eq!(settled.version, 2);
        assert_eq!(h.port.get_job(h.job.id).await.unwrap().status, JobStatus::Paid);
        assert_eq!(h.service.invoice_payments(balance.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_overpayment_leaves_invoice_untouched() {
        let h = TestBilling::new().await;
        let invoice = h
            .service
            .create_full_invoice(FullInvoiceRequest {
                customer_id: h.customer.id,
                job_id: None,
                line_items: vec![LineItem::single(
                    "Call-out and repair",
                    MoneyFixtures::invoice_total(),
                )],
                vat_registered: false,
                due_date: None,
                notes: None,
            })
            .await
            .unwrap();
        assert_eq!(invoice.due_date, Some(date(2025, 4, 2)));

        let err = h.service.record_payment(invoice.id, eft(150_001)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Billing(BillingError::Overpayment { .. })));

        let stored = h.service.get_invoice(invoice.id).await.unwrap();
        assert!(stored.invoice.amount_paid.is_zero());
        assert_eq!(h.port.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_full_invoice_on_progressed_job_becomes_balance() {
        let h = TestBilling::new().await;
        h.service.create_deposit_invoice(h.job.id, dec!(25)).await.unwrap();

        let invoice = h
            .service
            .create_full_invoice(FullInvoiceRequest {
                customer_id: h.customer.id,
                job_id: Some(h.job.id),
                line_items: vec![LineItem::single("Everything", MoneyFixtures::quote_total())],
                vat_registered: true,
                due_date: None,
                notes: None,
            })
            .await
            .unwrap();

        assert_eq!(invoice.invoice_type, InvoiceType::Balance);
        assert_cents(&invoice.total, 750_000);
    }

    #[tokio::test]
    async fn test_paid_before_balance_policy() {
        let h = TestBilling::with_terms(BillingTerms {
            require_paid_before_balance: true,
            ..BillingTerms::default()
        })
        .await;
        let deposit = h.service.create_deposit_invoice(h.job.id, dec!(50)).await.unwrap();

        let err = h.service.create_balance_invoice(h.job.id).await.unwrap_err();
        match err {
            ServiceError::Billing(BillingError::UnpaidPriorInvoices(unpaid)) => {
                assert_eq!(unpaid, vec![deposit.invoice_number.clone()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        h.service.record_payment(deposit.id, eft(500_000)).await.unwrap();
        assert!(h.service.create_balance_invoice(h.job.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_overdue_list_follows_the_clock() {
        let h = TestBilling::new().await;
        let deposit = h.service.create_deposit_invoice(h.job.id, dec!(10)).await.unwrap();
        h.service.mark_invoice_sent(deposit.id).await.unwrap();

        assert!(h.service.overdue_invoices().await.unwrap().is_empty());

        h.clock.advance_days(8);
        let overdue = h.service.overdue_invoices().await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].effective_status, InvoiceStatus::Overdue);

        h.service.record_payment(deposit.id, eft(100_000)).await.unwrap();
        assert!(h.service.overdue_invoices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_actions() {
        let h = TestBilling::new().await;
        let deposit = h.service.create_deposit_invoice(h.job.id, dec!(10)).await.unwrap();

        let err = h.service.mark_invoice_paid(deposit.id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Billing(BillingError::InvalidStatusTransition { .. })
        ));

        let sent = h.service.mark_invoice_sent(deposit.id).await.unwrap();
        assert_eq!(sent.sent_at, Some(TemporalFixtures::now()));
        let viewed = h.service.mark_invoice_viewed(deposit.id).await.unwrap();
        assert_eq!(viewed.status, InvoiceStatus::Viewed);
        assert_eq!(viewed.version, 2);
    }

    #[tokio::test]
    async fn test_repeated_status_actions_keep_the_version() {
        let h = TestBilling::new().await;
        let deposit = h.service.create_deposit_invoice(h.job.id, dec!(10)).await.unwrap();
        h.service.mark_invoice_sent(deposit.id).await.unwrap();
        let viewed = h.service.mark_invoice_viewed(deposit.id).await.unwrap();

        h.clock.advance_days(1);
        let viewed_again = h.service.mark_invoice_viewed(deposit.id).await.unwrap();
        assert_eq!(viewed_again.version, viewed.version);
        assert_eq!(viewed_again.viewed_at, viewed.viewed_at);

        let paid = h.service.record_payment(deposit.id, eft(100_000)).await.unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);

        h.clock.advance_days(1);
        let marked = h.service.mark_invoice_paid(deposit.id).await.unwrap();
        assert_eq!(marked.version, paid.version);
        assert_eq!(marked.paid_at, paid.paid_at);
        assert_eq!(h.port.get_invoice(deposit.id).await.unwrap(), paid);
    }

    #[tokio::test]
    async fn test_delete_requires_force_when_paid() {
        let h = TestBilling::new().await;
        let deposit = h.service.create_deposit_invoice(h.job.id, dec!(10)).await.unwrap();
        h.service.record_payment(deposit.id, eft(10_000)).await.unwrap();

        let err = h.service.delete_invoice(deposit.id, false).await.unwrap_err();
        assert!(matches!(err, ServiceError::Billing(BillingError::HasPayments(_))));

        h.service.delete_invoice(deposit.id, true).await.unwrap();
        assert!(matches!(
            h.service.get_invoice(deposit.id).await,
            Err(ServiceError::Port(PortError::NotFound { .. }))
        ));
        assert_eq!(h.port.payment_count().await, 0);
    }

    #[tokio::test]
    async fn test_stale_version_is_a_conflict() {
        let h = TestBilling::new().await;
        let deposit = h.service.create_deposit_invoice(h.job.id, dec!(10)).await.unwrap();
        let stale = h.port.get_invoice(deposit.id).await.unwrap();

        h.service.record_payment(deposit.id, eft(10_000)).await.unwrap();

        let late = cash_payment(&stale, Money::zar(10_000));
        let updated = apply_payment(&stale, &late, TemporalFixtures::now()).unwrap();
        let err = h
            .port
            .record_payment(late, updated, stale.version, None)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_job_numbering() {
        let h = TestBilling::new().await;
        let job = h
            .service
            .create_job(h.customer.id, "Geyser install", Money::zar(920_000), Money::zar(120_000))
            .await
            .unwrap();
        assert_eq!(job.job_number, "JOB-2025-002");

        let unknown = h
            .service
            .create_job(CustomerId::new(), "Ghost job", Money::zar(100), Money::zar(0))
            .await
            .unwrap_err();
        assert!(matches!(unknown, ServiceError::Port(PortError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_job_from_accepted_quote_carries_its_totals() {
        let h = TestBilling::new().await;
        let quote = accepted_quote(&h.customer);

        let job = h
            .service
            .create_job_from_quote(&quote, "Geyser replacement")
            .await
            .unwrap();

        assert_eq!(job.quote_id, Some(quote.id));
        assert_eq!(job.customer_id, h.customer.id);
        assert_eq!(job.job_number, "JOB-2025-002");
        assert_eq!(job.status, JobStatus::Quoted);
        assert_eq!(job.quoted_total, quote.total);
        assert_eq!(job.quoted_vat, quote.vat_amount);
        assert_cents(&job.quoted_total, 920_000);
        assert_cents(&job.quoted_vat, 120_000);
        assert_eq!(h.port.get_job(job.id).await.unwrap(), job);
    }

    #[tokio::test]
    async fn test_job_from_unaccepted_quote_is_refused() {
        let h = TestBilling::new().await;
        let sent = sent_quote(&h.customer);

        let err = h
            .service
            .create_job_from_quote(&sent, "Geyser replacement")
            .await
            .unwrap_err();
        match err {
            ServiceError::Billing(e @ BillingError::InvalidLifecycle(_)) => {
                assert_eq!(e.kind(), "invalid_lifecycle");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let mut rejected = sent_quote(&h.customer);
        rejected
            .reject(TemporalFixtures::today(), TemporalFixtures::now())
            .unwrap();
        assert!(matches!(
            h.service.create_job_from_quote(&rejected, "Geyser replacement").await,
            Err(ServiceError::Billing(BillingError::InvalidLifecycle(_)))
        ));

        // nothing was stored, so the next job still takes the second number
        let job = h
            .service
            .create_job(h.customer.id, "Geyser install", Money::zar(920_000), Money::zar(120_000))
            .await
            .unwrap();
        assert_eq!(job.job_number, "JOB-2025-002");
    }

    #[tokio::test]
    async fn test_job_status_only_moves_forward() {
        let h = TestBilling::new().await;
        let job = h
            .service
            .create_job_from_quote(&accepted_quote(&h.customer), "Geyser replacement")
            .await
            .unwrap();
        let deposit = h.service.create_deposit_invoice(job.id, dec!(50)).await.unwrap();
        assert_eq!(job_status(&h, job.id).await, JobStatus::Quoted);

        let progress = h.service.create_progress_invoice(job.id, dec!(50)).await.unwrap();
        assert_eq!(job_status(&h, job.id).await, JobStatus::Invoiced);

        h.service
            .record_payment(deposit.id, eft(deposit.total.minor_units()))
            .await
            .unwrap();
        assert_eq!(job_status(&h, job.id).await, JobStatus::Invoiced);

        h.service
            .record_payment(progress.id, eft(progress.total.minor_units()))
            .await
            .unwrap();
        assert_eq!(job_status(&h, job.id).await, JobStatus::Paid);

        let mut paid = h.port.get_job(job.id).await.unwrap();
        let err = paid.advance_to(JobStatus::Invoiced).unwrap_err();
        assert_eq!(err.kind(), "invalid_lifecycle");

        let err = h.service.create_balance_invoice(job.id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Billing(BillingError::NothingRemaining)
        ));
        assert_eq!(job_status(&h, job.id).await, JobStatus::Paid);
    }
}
