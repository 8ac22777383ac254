//! Pre-built Test Fixtures
//!
//! Fixed instants, standard amounts, fake customers, and a ready-wired
//! billing service over the in-memory port.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{BusinessCalendar, FixedClock, Money};
use domain_billing::ports::mock::MockBillingPort;
use domain_billing::{BillingService, BillingTerms, Customer, Job, JobStatus};
use fake::faker::address::en::StreetName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;

/// Fixed instants
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Monday 2025-03-03 08:00 UTC, 10:00 in Johannesburg
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap()
    }

    /// Business date of [`TemporalFixtures::now`]
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    /// 23:30 UTC on 2025-03-03 is already 2025-03-04 in Johannesburg
    pub fn late_evening() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 23, 30, 0).unwrap()
    }

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }
}

/// Standard amounts
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// R10,000.00 quote, VAT inclusive
    pub fn quote_total() -> Money {
        Money::zar(1_000_000)
    }

    /// 15% VAT portion of a R10,000.00 inclusive total
    pub fn quote_vat() -> Money {
        Money::zar(130_435)
    }

    /// R1,500.00
    pub fn invoice_total() -> Money {
        Money::zar(150_000)
    }
}

/// Customer with fake contact details
pub fn fake_customer(now: DateTime<Utc>) -> Customer {
    let name: String = Name().fake();
    let phone: String = PhoneNumber().fake();
    let email: String = SafeEmail().fake();
    let street: String = StreetName().fake();

    Customer::new(name, phone, now)
        .unwrap()
        .with_email(email)
        .with_address(format!("{} {}", (1..200).fake::<u16>(), street))
}

/// Scheduled job for `customer` with the given quoted amounts
pub fn scheduled_job(customer: &Customer, number: &str, total: Money, vat: Money) -> Job {
    let mut job = Job::new(
        customer.id,
        number,
        "Geyser replacement",
        total,
        vat,
        TemporalFixtures::now(),
    )
    .unwrap();
    job.status = JobStatus::Scheduled;
    job
}

/// A billing service over the in-memory port, with one customer and one job
pub struct TestBilling {
    pub service: Arc<BillingService>,
    pub port: MockBillingPort,
    pub clock: Arc<FixedClock>,
    pub customer: Customer,
    pub job: Job,
}

impl TestBilling {
    /// R10,000.00 job on the default terms
    pub async fn new() -> Self {
        Self::with_quote(MoneyFixtures::quote_total(), MoneyFixtures::quote_vat()).await
    }

    pub async fn with_quote(total: Money, vat: Money) -> Self {
        Self::build(total, vat, BillingTerms::default()).await
    }

    pub async fn with_terms(terms: BillingTerms) -> Self {
        Self::build(MoneyFixtures::quote_total(), MoneyFixtures::quote_vat(), terms).await
    }

    async fn build(total: Money, vat: Money, terms: BillingTerms) -> Self {
        let now = TemporalFixtures::now();
        let customer = fake_customer(now);
        let job = scheduled_job(&customer, "JOB-2025-001", total, vat);

        let port = MockBillingPort::with_jobs(customer.clone(), vec![job.clone()]).await;
        let clock = Arc::new(FixedClock::new(now));
        let service = BillingService::new(
            Arc::new(port.clone()),
            clock.clone(),
            BusinessCalendar::default(),
        )
        .with_terms(terms);

        Self {
            service: Arc::new(service),
            port,
            clock,
            customer,
            job,
        }
    }
}
