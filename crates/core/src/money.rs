//! Currency amounts.

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// A currency amount.
///
/// Arithmetic is exact; rounding to cents happens explicitly through
/// [`Money::to_cents`] and whenever the amount is displayed (always two
/// decimals, half away from zero).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Round to two decimal places.
    pub fn to_cents(self) -> Self {
        Self(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Price of one unit when this amount covers `quantity` units.
    ///
    /// A quantity of zero is treated as one.
    pub fn per_unit(self, quantity: u32) -> Self {
        Self(self.0 / Decimal::from(quantity.max(1))).to_cents()
    }

    /// Value of `quantity` units at this unit price, rounded to cents.
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity)).to_cents()
    }

    /// Parse an optional amount: blank text means "not set".
    pub fn parse_optional(field: &'static str, text: &str) -> Result<Option<Self>, DomainError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        Self::parse_field(field, text).map(Some)
    }

    /// Parse a required amount, naming `field` in the error.
    pub fn parse_field(field: &'static str, text: &str) -> Result<Self, DomainError> {
        text.parse()
            .map_err(|_| DomainError::malformed(field, text))
    }
}

impl core::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl core::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl core::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", self.to_cents().0)
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Money)
            .map_err(|e| DomainError::validation(format!("not an amount: {s:?} ({e})")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn displays_with_two_decimals() {
        assert_eq!(Money::new(dec!(75)).to_string(), "75.00");
        assert_eq!(Money::new(dec!(0.125)).to_string(), "0.13");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn per_unit_guards_zero_quantity() {
        assert_eq!(Money::new(dec!(100)).per_unit(20), Money::new(dec!(5)));
        assert_eq!(Money::new(dec!(100)).per_unit(0), Money::new(dec!(100)));
        assert_eq!(Money::new(dec!(10)).per_unit(3), Money::new(dec!(3.33)));
    }

    #[test]
    fn parse_field_fails_closed_on_text() {
        let err = Money::parse_field("settlement_price", "abc").unwrap_err();
        assert!(matches!(err, DomainError::MalformedRecord { field: "settlement_price", .. }));
        assert_eq!(Money::parse_optional("market_price", "  ").unwrap(), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use rust_decimal::Decimal;

        fn half_cent() -> Decimal {
            Decimal::new(5, 3)
        }

        proptest! {
            /// Property: `times` rounds the exact product to the nearest cent.
            #[test]
            fn times_is_within_half_a_cent(
                milli in -10_000_000i64..10_000_000,
                quantity in 0u32..10_000,
            ) {
                let price = Money::new(Decimal::new(milli, 3));
                let exact = price.amount() * Decimal::from(quantity);
                let rounded = price.times(quantity);

                prop_assert!(rounded.amount().scale() <= 2);
                prop_assert!((rounded.amount() - exact).abs() <= half_cent());
            }

            /// Property: splitting an amount over `quantity` units and pricing
            /// them back loses at most half a cent per unit.
            #[test]
            fn per_unit_then_times_stays_close(
                cents in 0i64..100_000_000,
                quantity in 0u32..5_000,
            ) {
                let amount = Money::new(Decimal::new(cents, 2));
                let unit = amount.per_unit(quantity);
                let units = quantity.max(1);
                let back = unit.times(units);

                prop_assert_eq!(unit, unit.to_cents());
                prop_assert!(
                    (back.amount() - amount.amount()).abs() <= half_cent() * Decimal::from(units)
                );
            }

            /// Property: displayed amounts parse back to the cent-rounded value.
            #[test]
            fn display_parses_back_to_cents(milli in -1_000_000_000i64..1_000_000_000) {
                let money = Money::new(Decimal::new(milli, 3));
                let shown: Money = money.to_string().parse().unwrap();
                prop_assert_eq!(shown, money.to_cents());
            }
        }
    }
}
