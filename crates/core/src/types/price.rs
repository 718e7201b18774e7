//! Non-negative unit price using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Error returned when a price is out of range.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("price cannot be negative (got {0})")]
    Negative(Decimal),

    #[error("price cannot exceed {max} (got {0})", max = Price::MAX.0)]
    TooLarge(Decimal),

    #[error("price cannot have more than {places} decimal places (got {0})", places = Price::SCALE)]
    TooPrecise(Decimal),
}

/// A product unit price. Always `0 <= price <= Price::MAX` with at most two
/// decimal places, which is exactly what a `NUMERIC(12, 2)` column holds.
///
/// Serialized as a decimal string (`"19.99"`) to avoid float rounding; JSON
/// numbers are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest storable price, `9_999_999_999.99`.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2));

    /// Decimal places kept.
    pub const SCALE: u32 = 2;

    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero,
    /// [`PriceError::TooLarge`] above [`Price::MAX`] and
    /// [`PriceError::TooPrecise`] for sub-cent amounts. Trailing zeros
    /// (`"2.500"`) are fine.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge(amount));
        }
        if amount.normalize().scale() > Self::SCALE {
            return Err(PriceError::TooPrecise(amount));
        }
        Ok(Self(amount))
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Value of `quantity` units at this price. Saturates instead of overflowing.
    #[must_use]
    pub fn extended(&self, quantity: i32) -> Decimal {
        self.0.saturating_mul(Decimal::from(quantity))
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(amount).map_err(serde::de::Error::custom)
    }
}
