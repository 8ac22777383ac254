//! Property-Based Test Generators
//!
//! Proptest strategies for quotes, percentages and payment splits that stay
//! inside the billing rules.

use chrono::NaiveDate;
use core_kernel::Money;
use domain_billing::InvoiceStatus;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Quote totals from R1.00 to R10,000,000.00
pub fn quote_total_strategy() -> impl Strategy<Value = Money> {
    (100i64..1_000_000_000i64).prop_map(Money::zar)
}

/// Quote total with a VAT portion no larger than the total
pub fn quote_with_vat_strategy() -> impl Strategy<Value = (Money, Money)> {
    quote_total_strategy().prop_flat_map(|total| {
        (0..=total.minor_units()).prop_map(move |vat| (total, Money::zar(vat)))
    })
}

/// Percentages in (0, 100] with two decimal places
pub fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Whole percentages that together never exceed 100
pub fn progression_split_strategy() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(1u32..=40u32, 1..6).prop_map(|parts| {
        let mut used = 0u32;
        parts
            .into_iter()
            .filter_map(|p| {
                if used + p > 100 {
                    return None;
                }
                used += p;
                Some(Decimal::from(p))
            })
            .collect()
    })
}

/// An invoice total in cents and two positive payments that add up to at most it
pub fn payment_pair_strategy() -> impl Strategy<Value = (i64, i64, i64)> {
    (2i64..10_000_000i64).prop_flat_map(|total| {
        (1..total).prop_flat_map(move |first| {
            (Just(total), Just(first), 1..=(total - first))
        })
    })
}

/// Any status an invoice can be stored with
pub fn persisted_status_strategy() -> impl Strategy<Value = InvoiceStatus> {
    prop_oneof![
        Just(InvoiceStatus::Draft),
        Just(InvoiceStatus::Sent),
        Just(InvoiceStatus::Viewed),
        Just(InvoiceStatus::PartiallyPaid),
        Just(InvoiceStatus::Paid),
        Just(InvoiceStatus::Overdue),
    ]
}

/// Dates in 2025
pub fn date_2025_strategy() -> impl Strategy<Value = NaiveDate> {
    (1u32..=365u32).prop_filter_map("valid ordinal", |day| NaiveDate::from_yo_opt(2025, day))
}
