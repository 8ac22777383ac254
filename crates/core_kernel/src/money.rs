//! Money types with exact minor-unit arithmetic
//!
//! Monetary values are held as an integer count of the currency's smallest
//! unit (cents). Decimal values only appear at the edges: parsing user input
//! and rendering amounts for display. Every comparison used for validation
//! happens on the integer representation.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    ZAR,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        2
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::ZAR => "R",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::ZAR => "ZAR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
        }
    }

    fn minor_per_major(&self) -> i64 {
        10_i64.pow(self.decimal_places())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ZAR" => Ok(Currency::ZAR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Percentage must be between 0 and 100, got {0}")]
    InvalidPercentage(Decimal),

    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount with associated currency
///
/// The amount is an exact count of minor units, so `R 1,500.01` is
/// `150001` cents. Ordering is only defined between amounts of the same
/// currency; comparing across currencies yields `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount_minor: i64,
    currency: Currency,
}

impl Money {
    /// Creates Money from an integer amount in minor units (e.g., cents)
    pub const fn from_minor(minor_units: i64, currency: Currency) -> Self {
        Self {
            amount_minor: minor_units,
            currency,
        }
    }

    /// Creates a Rand amount from cents
    pub const fn zar(cents: i64) -> Self {
        Self::from_minor(cents, Currency::ZAR)
    }

    /// Converts a decimal major-unit amount into Money
    ///
    /// Fractions of a cent are rounded half-up (away from zero), so
    /// `1500.005` becomes `150001` cents.
    pub fn from_decimal(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        let minor = amount
            .checked_mul(Decimal::from(currency.minor_per_major()))
            .ok_or(MoneyError::Overflow)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::from_minor(minor, currency))
    }

    /// Creates a zero amount in the specified currency
    pub const fn zero(currency: Currency) -> Self {
        Self::from_minor(0, currency)
    }

    /// Returns the amount in minor units
    pub fn minor_units(&self) -> i64 {
        self.amount_minor
    }

    /// Returns the amount in major units, scaled to the currency's decimal places
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.amount_minor, self.currency.decimal_places())
    }

    /// Returns the currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.amount_minor > 0
    }

    /// Returns true if the amount is negative
    pub fn is_negative(&self) -> bool {
        self.amount_minor < 0
    }

    /// Returns the negated amount
    pub fn negate(&self) -> Self {
        Self::from_minor(-self.amount_minor, self.currency)
    }

    /// Checked addition that returns an error on currency mismatch or overflow
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        self.amount_minor
            .checked_add(other.amount_minor)
            .map(|minor| Self::from_minor(minor, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction that returns an error on currency mismatch or overflow
    ///
    /// The result may be negative; callers that need a non-negative
    /// difference must check the sign themselves.
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        self.amount_minor
            .checked_sub(other.amount_minor)
            .map(|minor| Self::from_minor(minor, self.currency))
            .ok_or(MoneyError::Overflow)
    }

    /// Multiplies by a decimal factor, rounding half-up to whole minor units
    pub fn multiply(&self, factor: Decimal) -> Result<Self, MoneyError> {
        let minor = Decimal::from(self.amount_minor)
            .checked_mul(factor)
            .ok_or(MoneyError::Overflow)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::from_minor(minor, self.currency))
    }

    /// Computes `percentage` of this amount, rounded half-up to the cent
    pub fn percent_of(&self, percentage: Percentage) -> Result<Self, MoneyError> {
        self.multiply(percentage.as_fraction())
    }

    /// Expresses this amount as a percentage of `whole`, rounded to 2 dp
    pub fn percentage_of(&self, whole: &Money) -> Result<Decimal, MoneyError> {
        self.ensure_same_currency(whole)?;
        if whole.is_zero() {
            return Err(MoneyError::DivisionByZero);
        }
        let ratio = Decimal::from(self.amount_minor) * Decimal::ONE_HUNDRED
            / Decimal::from(whole.amount_minor);
        Ok(ratio.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Sums an iterator of amounts in the given currency
    pub fn sum<'a, I>(amounts: I, currency: Currency) -> Result<Money, MoneyError>
    where
        I: IntoIterator<Item = &'a Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.currency != other.currency {
            return None;
        }
        Some(self.amount_minor.cmp(&other.amount_minor))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.currency.symbol(), self.amount())
    }
}

/// A percentage in the closed range 0–100
///
/// Used for deposit and progress shares of a quoted total and for VAT rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percentage(Decimal);

impl Percentage {
    pub const ZERO: Percentage = Percentage(Decimal::ZERO);
    pub const HUNDRED: Percentage = Percentage(Decimal::ONE_HUNDRED);

    /// Creates a percentage, rejecting values outside 0–100
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(MoneyError::InvalidPercentage(value));
        }
        Ok(Self(value.normalize()))
    }

    /// Creates a whole-number percentage, saturating at 100
    pub const fn whole(value: u8) -> Self {
        let value = if value > 100 { 100 } else { value };
        Self(Decimal::from_parts(value as u32, 0, 0, false, 0))
    }

    /// Returns the percentage value (e.g. 15 for 15%)
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns the percentage as a fraction (e.g. 0.15 for 15%)
    pub fn as_fraction(&self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Adds two percentages, failing if the sum leaves 0–100
    pub fn checked_add(&self, other: &Percentage) -> Result<Self, MoneyError> {
        Self::new(self.0 + other.0)
    }

    /// Returns `100 - self`
    pub fn complement(&self) -> Self {
        Self(Decimal::ONE_HUNDRED - self.0)
    }
}

impl TryFrom<Decimal> for Percentage {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percentage> for Decimal {
    fn from(p: Percentage) -> Decimal {
        p.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}
