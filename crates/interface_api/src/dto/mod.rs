//! Request and response bodies
//!
//! Amounts cross the API as decimal rands (`"1500.00"`) and are converted to
//! integer cents before they reach the service.

pub mod customer;
pub mod invoice;
pub mod job;

use core_kernel::{Currency, Money};
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::error::ApiError;

/// Converts a rand amount to `Money`
pub fn rands(amount: Decimal) -> Result<Money, ApiError> {
    Money::from_decimal(amount, Currency::ZAR).map_err(|e| ApiError::validation(e.to_string()))
}

/// Rejects amounts with fractions of a cent
pub fn validate_cents(value: &Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > 2 {
        return Err(ValidationError::new("cents").with_message("at most two decimal places".into()));
    }
    Ok(())
}

/// Rejects amounts that are not strictly positive whole cents
pub fn validate_positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    validate_cents(value)?;
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("positive").with_message("must be greater than zero".into()));
    }
    Ok(())
}

/// Rejects amounts below zero
pub fn validate_non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    validate_cents(value)?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative").with_message("must not be negative".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validators() {
        assert!(validate_cents(&dec!(1500.00)).is_ok());
        assert!(validate_cents(&dec!(1500.0000)).is_ok());
        assert!(validate_cents(&dec!(0.001)).is_err());

        assert!(validate_positive_amount(&dec!(0.01)).is_ok());
        assert!(validate_positive_amount(&dec!(0)).is_err());
        assert!(validate_non_negative_amount(&dec!(0)).is_ok());
        assert!(validate_non_negative_amount(&dec!(-1)).is_err());
    }

    #[test]
    fn test_rands_converts_to_cents() {
        assert_eq!(rands(dec!(1500.01)).unwrap(), Money::zar(150_001));
    }
}
