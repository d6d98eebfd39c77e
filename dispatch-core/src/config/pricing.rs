//! Checkout pricing policy.

use rust_decimal::Decimal;

use crate::error::OrderError;
use crate::money::{check_amount, round_cents};

/// Tax and delivery fee applied to new orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingConfig {
    /// Fraction of the subtotal, e.g. `0.085` for 8.5 %.
    pub tax_rate: Decimal,
    pub delivery_fee: Decimal,
    /// Orders with a smaller subtotal are rejected.
    pub minimum_order_amount: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(85, 3),
            delivery_fee: Decimal::new(500, 2),
            minimum_order_amount: Decimal::new(1000, 2),
        }
    }
}

/// Charges derived from a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub tax: Decimal,
    pub delivery_fee: Decimal,
}

impl PricingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tax_rate < Decimal::ZERO || self.tax_rate >= Decimal::ONE {
            return Err(format!("tax_rate {} must be in [0, 1)", self.tax_rate));
        }
        check_amount("delivery_fee", self.delivery_fee).map_err(|e| e.to_string())?;
        if self.minimum_order_amount < Decimal::ZERO {
            return Err("minimum_order_amount must not be negative".to_string());
        }
        Ok(())
    }

    /// Tax (rounded to cents) and delivery fee for a subtotal.
    pub fn quote(&self, subtotal: Decimal) -> Result<PriceQuote, OrderError> {
        if subtotal < self.minimum_order_amount {
            return Err(OrderError::Validation(format!(
                "order subtotal {subtotal} is below the minimum of {}",
                self.minimum_order_amount
            )));
        }
        check_amount("subtotal", subtotal)?;
        let tax = subtotal
            .checked_mul(self.tax_rate)
            .map(round_cents)
            .ok_or_else(|| OrderError::validation(format!("tax on {subtotal} overflows")))?;
        Ok(PriceQuote {
            tax,
            delivery_fee: self.delivery_fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_quote() {
        let pricing = PricingConfig::default();
        let quote = pricing.quote(dec!(20.00)).unwrap();
        assert_eq!(quote.tax, dec!(1.70));
        assert_eq!(quote.delivery_fee, dec!(5.00));
    }

    #[test]
    fn test_quote_rounds_tax_to_cents() {
        let pricing = PricingConfig {
            tax_rate: dec!(0.08),
            delivery_fee: dec!(3.00),
            minimum_order_amount: dec!(0),
        };
        assert_eq!(pricing.quote(dec!(20.00)).unwrap().tax, dec!(1.60));
        let pricing = PricingConfig {
            tax_rate: dec!(0.085),
            ..pricing
        };
        // 15.00 * 0.085 = 1.275
        assert_eq!(pricing.quote(dec!(15.00)).unwrap().tax, dec!(1.28));
    }

    #[test]
    fn test_quote_rejects_oversized_subtotal() {
        let pricing = PricingConfig::default();
        assert!(matches!(
            pricing.quote(Decimal::MAX),
            Err(OrderError::Validation(_))
        ));
        assert!(matches!(
            pricing.quote(dec!(12.345)),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn test_minimum_order_amount() {
        let pricing = PricingConfig::default();
        assert!(matches!(
            pricing.quote(dec!(9.99)),
            Err(OrderError::Validation(_))
        ));
        assert!(pricing.quote(dec!(10.00)).is_ok());
    }

    #[test]
    fn test_validate() {
        assert!(PricingConfig::default().validate().is_ok());
        let bad = PricingConfig {
            tax_rate: dec!(1.2),
            ..PricingConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
