//! Etsy money objects and minor-unit conversion.

use serde::{Deserialize, Serialize};

use crate::DecodeError;

/// Rounding tolerance used when comparing currency totals.
pub const CENT_TOLERANCE: f64 = 0.01;

/// Etsy's money representation: an integer amount in minor units plus the
/// divisor that converts it back to major units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub divisor: i64,
    pub currency_code: String,
}

impl Money {
    pub fn to_f64(&self) -> Result<f64, DecodeError> {
        minor_to_f64(self.amount, self.divisor)
    }
}

/// Convert a minor-unit amount to major units (`amount / divisor`).
pub fn minor_to_f64(amount: i64, divisor: i64) -> Result<f64, DecodeError> {
    if divisor <= 0 {
        return Err(DecodeError::InvalidDivisor(divisor));
    }
    Ok(amount as f64 / divisor as f64)
}

/// Whether two currency amounts agree within [`CENT_TOLERANCE`].
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= CENT_TOLERANCE + f64::EPSILON * 16.0
}

/// Render an amount the way Shopify's `Decimal` scalar expects it.
pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grandtotal_scenario() {
        let money = Money {
            amount: 10000,
            divisor: 100,
            currency_code: "USD".into(),
        };
        assert_eq!(money.to_f64().unwrap(), 100.00);
    }

    #[test]
    fn non_decimal_divisor() {
        assert_eq!(minor_to_f64(1500, 1).unwrap(), 1500.0);
        assert_eq!(minor_to_f64(1234, 1000).unwrap(), 1.234);
    }

    #[test]
    fn zero_divisor_is_rejected() {
        assert!(matches!(
            minor_to_f64(100, 0),
            Err(DecodeError::InvalidDivisor(0))
        ));
    }

    #[test]
    fn tolerance_allows_rounding_noise() {
        assert!(approx_eq(0.1 + 0.2, 0.3));
        assert!(approx_eq(10.00, 10.01));
        assert!(!approx_eq(10.00, 10.02));
    }

    #[test]
    fn amounts_format_with_two_decimals() {
        assert_eq!(format_amount(12.5), "12.50");
        assert_eq!(format_amount(3.0), "3.00");
    }
}
