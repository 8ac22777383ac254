//! Custom Test Assertions
//!
//! Assertion helpers for billing types with messages that show the amounts
//! involved.

use chrono::NaiveDate;
use core_kernel::Money;
use domain_billing::{Invoice, InvoiceStatus, InvoiceType};

/// Asserts an amount in cents, reporting both as rands on failure
pub fn assert_cents(actual: &Money, expected_cents: i64) {
    assert_eq!(
        actual.minor_units(),
        expected_cents,
        "expected {}, got {}",
        Money::from_minor(expected_cents, actual.currency()),
        actual
    );
}

/// Asserts that money values sum to a total
pub fn assert_money_sum_equals(parts: &[Money], total: &Money) {
    let sum = Money::sum(parts.iter(), total.currency()).expect("parts share the total's currency");
    assert_eq!(
        sum, *total,
        "sum of parts {} does not equal total {}",
        sum, total
    );
}

/// Asserts the status an invoice displays on `today`
pub fn assert_effective_status(invoice: &Invoice, today: NaiveDate, expected: InvoiceStatus) {
    let actual = invoice.effective_status(today);
    assert_eq!(
        actual, expected,
        "invoice {} (stored {}, due {:?}, paid {} of {}) shows {} on {}, expected {}",
        invoice.invoice_number,
        invoice.status,
        invoice.due_date,
        invoice.amount_paid,
        invoice.total,
        actual,
        today,
        expected
    );
}

/// Asserts that deposit, progress and balance invoices stay within the quote
pub fn assert_within_quote(quoted_total: &Money, invoices: &[Invoice]) {
    let progression: Vec<Money> = invoices
        .iter()
        .filter(|inv| inv.invoice_type != InvoiceType::Full)
        .map(|inv| inv.total)
        .collect();
    let billed = Money::sum(progression.iter(), quoted_total.currency())
        .expect("invoices share the quote's currency");

    assert!(
        billed <= *quoted_total,
        "progression invoices bill {} against a quote of {}",
        billed,
        quoted_total
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::InvoiceBuilder;
    use crate::fixtures::TemporalFixtures;

    #[test]
    fn test_sum_assertion_accepts_exact_parts() {
        assert_money_sum_equals(
            &[Money::zar(500_000), Money::zar(300_000), Money::zar(200_000)],
            &Money::zar(1_000_000),
        );
    }

    #[test]
    #[should_panic(expected = "does not equal")]
    fn test_sum_assertion_rejects_short_parts() {
        assert_money_sum_equals(&[Money::zar(1)], &Money::zar(2));
    }

    #[test]
    fn test_effective_status_assertion() {
        let invoice = InvoiceBuilder::new()
            .with_due_date(TemporalFixtures::date(2025, 3, 1))
            .build();
        assert_effective_status(&invoice, TemporalFixtures::today(), InvoiceStatus::Overdue);
    }
}
