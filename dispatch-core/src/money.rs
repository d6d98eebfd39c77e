//! Order arithmetic.
//!
//! All amounts are exact decimals in the currency's major unit. The only
//! rounding happens when tax is derived from a rate. Every amount must fit a
//! `NUMERIC(12,2)` column; sums and products are checked so that oversized
//! input is a validation error rather than an arithmetic panic.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::OrderError;

/// Largest amount a `NUMERIC(12,2)` column holds: 9,999,999,999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

fn too_large(name: &str) -> OrderError {
    OrderError::validation(format!("{name} exceeds the maximum amount of {MAX_AMOUNT}"))
}

/// Non-negative, whole cents and at most [`MAX_AMOUNT`].
pub fn check_amount(name: &str, value: Decimal) -> Result<(), OrderError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(OrderError::validation(format!("{name} must not be negative")));
    }
    if !is_whole_cents(value) {
        return Err(OrderError::validation(format!(
            "{name} {value} has more than two decimal places"
        )));
    }
    if value > MAX_AMOUNT {
        return Err(too_large(name));
    }
    Ok(())
}

/// `(unit_price + customization_surcharge) × quantity`.
pub fn line_total(
    unit_price: Decimal,
    customization_surcharge: Decimal,
    quantity: i32,
) -> Result<Decimal, OrderError> {
    unit_price
        .checked_add(customization_surcharge)
        .and_then(|unit| unit.checked_mul(Decimal::from(quantity)))
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or_else(|| too_large("line total"))
}

/// Sum of line totals, bounded like any other amount.
pub fn subtotal<I>(line_totals: I) -> Result<Decimal, OrderError>
where
    I: IntoIterator<Item = Decimal>,
{
    line_totals
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line))
        .filter(|sum| *sum <= MAX_AMOUNT)
        .ok_or_else(|| too_large("subtotal"))
}

/// Whether `value` fits a cents column without rounding.
pub fn is_whole_cents(value: Decimal) -> bool {
    value.normalize().scale() <= 2
}

/// Round to cents, half away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The money fields of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAmounts {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub delivery_fee: Decimal,
    pub discount: Decimal,
}

impl OrderAmounts {
    /// Build and validate: every component non-negative, and the discount
    /// may not push the total below zero.
    pub fn new(
        subtotal: Decimal,
        tax: Decimal,
        delivery_fee: Decimal,
        discount: Decimal,
    ) -> Result<Self, OrderError> {
        let amounts = Self {
            subtotal,
            tax,
            delivery_fee,
            discount,
        };
        amounts.validate()?;
        Ok(amounts)
    }

    /// `subtotal + tax + delivery_fee - discount`, bounded by [`MAX_AMOUNT`].
    pub fn total(&self) -> Result<Decimal, OrderError> {
        self.subtotal
            .checked_add(self.tax)
            .and_then(|sum| sum.checked_add(self.delivery_fee))
            .and_then(|sum| sum.checked_sub(self.discount))
            .filter(|total| *total <= MAX_AMOUNT)
            .ok_or_else(|| too_large("total"))
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        check_amount("subtotal", self.subtotal)?;
        check_amount("tax", self.tax)?;
        check_amount("delivery fee", self.delivery_fee)?;
        check_amount("discount", self.discount)?;
        let total = self.total()?;
        if total.is_sign_negative() && !total.is_zero() {
            return Err(OrderError::validation(
                "discount exceeds subtotal plus tax and delivery fee",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_total_includes_surcharge_per_unit() {
        assert_eq!(line_total(dec!(10.00), dec!(0), 2).unwrap(), dec!(20.00));
        assert_eq!(line_total(dec!(8.50), dec!(1.25), 3).unwrap(), dec!(29.25));
    }

    #[test]
    fn test_round_cents_midpoint_away_from_zero() {
        assert_eq!(round_cents(dec!(1.605)), dec!(1.61));
        assert_eq!(round_cents(dec!(1.604)), dec!(1.60));
        assert_eq!(round_cents(dec!(0.125)), dec!(0.13));
    }

    #[test]
    fn test_worked_example_total() {
        let amounts = OrderAmounts::new(dec!(20.00), dec!(1.60), dec!(3.00), dec!(0)).unwrap();
        assert_eq!(amounts.total().unwrap(), dec!(24.60));
    }

    #[test]
    fn test_negative_components_rejected() {
        assert!(OrderAmounts::new(dec!(10), dec!(-0.01), dec!(0), dec!(0)).is_err());
        assert!(OrderAmounts::new(dec!(10), dec!(0), dec!(0), dec!(-1)).is_err());
    }

    #[test]
    fn test_sub_cent_amounts_rejected() {
        assert!(is_whole_cents(dec!(1.60)));
        assert!(is_whole_cents(dec!(1.6000)));
        assert!(!is_whole_cents(dec!(0.985)));
        assert!(OrderAmounts::new(dec!(10), dec!(0.985), dec!(0), dec!(0)).is_err());
    }

    #[test]
    fn test_discount_cannot_exceed_total() {
        assert!(OrderAmounts::new(dec!(10), dec!(1), dec!(2), dec!(13)).is_ok());
        assert!(OrderAmounts::new(dec!(10), dec!(1), dec!(2), dec!(13.01)).is_err());
    }

    #[test]
    fn test_max_amount_is_numeric_12_2_limit() {
        assert_eq!(MAX_AMOUNT, dec!(9999999999.99));
        assert!(check_amount("tax", MAX_AMOUNT).is_ok());
        assert!(matches!(
            check_amount("tax", dec!(10000000000.00)),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn test_oversized_line_total_is_validation_error() {
        // would overflow Decimal itself
        let huge = Decimal::from_i128_with_scale(10i128.pow(27), 2);
        assert!(matches!(
            line_total(huge, dec!(0), 100_000),
            Err(OrderError::Validation(_))
        ));
        // fits Decimal but not the column
        assert!(matches!(
            line_total(dec!(5000000000.00), dec!(0), 3),
            Err(OrderError::Validation(_))
        ));
        assert_eq!(
            line_total(dec!(3333333333.33), dec!(0), 3).unwrap(),
            dec!(9999999999.99)
        );
    }

    #[test]
    fn test_subtotal_and_total_are_bounded() {
        assert_eq!(subtotal([dec!(1.50), dec!(2.25)]).unwrap(), dec!(3.75));
        assert_eq!(subtotal(Vec::new()).unwrap(), Decimal::ZERO);
        assert!(subtotal([MAX_AMOUNT, dec!(0.01)]).is_err());

        let amounts = OrderAmounts {
            subtotal: MAX_AMOUNT,
            tax: dec!(1.00),
            delivery_fee: dec!(0),
            discount: dec!(0),
        };
        assert!(matches!(amounts.total(), Err(OrderError::Validation(_))));
        assert!(amounts.validate().is_err());

        let unchecked = OrderAmounts {
            subtotal: Decimal::MAX,
            tax: Decimal::MAX,
            delivery_fee: dec!(0),
            discount: dec!(0),
        };
        assert!(unchecked.total().is_err());
    }
}
