//! Derived stock status for products.

use serde::{Deserialize, Serialize};

/// Quantities strictly below this (and above zero) count as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// Stock level bucket shown on product listings and the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockStatus {
    /// Bucket a quantity: `0` is out of stock, `1..10` is low, `10+` is in stock.
    ///
    /// Negative quantities never reach storage; they are treated as out of stock.
    #[must_use]
    pub const fn from_quantity(quantity: i32) -> Self {
        if quantity <= 0 {
            Self::OutOfStock
        } else if quantity < LOW_STOCK_THRESHOLD {
            Self::LowStock
        } else {
            Self::InStock
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OutOfStock => "Out of Stock",
            Self::LowStock => "Low Stock",
            Self::InStock => "In Stock",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(StockStatus::from_quantity(0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::from_quantity(1), StockStatus::LowStock);
        assert_eq!(StockStatus::from_quantity(9), StockStatus::LowStock);
        assert_eq!(StockStatus::from_quantity(10), StockStatus::InStock);
        assert_eq!(StockStatus::from_quantity(10_000), StockStatus::InStock);
    }

    #[test]
    fn test_monotonic() {
        let rank = |s: StockStatus| match s {
            StockStatus::OutOfStock => 0,
            StockStatus::LowStock => 1,
            StockStatus::InStock => 2,
        };
        for q in 0..50 {
            assert!(rank(StockStatus::from_quantity(q)) <= rank(StockStatus::from_quantity(q + 1)));
        }
    }
}
