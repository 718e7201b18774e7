//! Product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stocksavvy_core::{Price, ProductId, StockStatus, StoreId, UserId};

/// A product stocked by exactly one store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub store_id: StoreId,
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub price: Price,
    pub quantity: i32,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub const fn status(&self) -> StockStatus {
        StockStatus::from_quantity(self.quantity)
    }

    /// Stock value at the current price.
    #[must_use]
    pub fn stock_value(&self) -> Decimal {
        self.price.extended(self.quantity)
    }

    /// Apply a patch in place and bump `updated_at`.
    pub fn apply(&mut self, patch: &ProductPatch, now: DateTime<Utc>) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(barcode) = &patch.barcode {
            self.barcode.clone_from(barcode);
        }
        if let Some(sku) = &patch.sku {
            self.sku.clone_from(sku);
        }
        if let Some(category) = &patch.category {
            self.category.clone_from(category);
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        self.updated_at = now;
    }
}

/// Fields required to insert a product. The store has already been resolved.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub store_id: StoreId,
    pub name: String,
    pub description: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub price: Price,
    pub quantity: i32,
    pub created_by: Option<UserId>,
}

/// Partial product update. `None` leaves the field unchanged; for the
/// optional text fields `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub barcode: Option<Option<String>>,
    pub sku: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub price: Option<Price>,
    pub quantity: Option<i32>,
}

/// Optional narrowing applied on top of the caller's store scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub barcode: Option<String>,
    pub category: Option<String>,
    /// Case-insensitive substring of name, SKU or barcode.
    pub search: Option<String>,
}

impl ProductFilter {
    #[must_use]
    pub fn by_barcode(barcode: impl Into<String>) -> Self {
        Self {
            barcode: Some(barcode.into()),
            ..Self::default()
        }
    }

    /// In-process evaluation, used by the memory store.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(barcode) = &self.barcode
            && product.barcode.as_deref() != Some(barcode.as_str())
        {
            return false;
        }
        if let Some(category) = &self.category {
            let same = product
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category));
            if !same {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = |field: Option<&str>| {
                field.is_some_and(|v| v.to_lowercase().contains(&needle))
            };
            if !(hit(Some(&product.name))
                || hit(product.sku.as_deref())
                || hit(product.barcode.as_deref()))
            {
                return false;
            }
        }
        true
    }
}

/// Per-category totals on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotals {
    pub category: String,
    pub products: u64,
    pub units: i64,
    pub value: Decimal,
}

/// Dashboard inventory totals over the caller's visible stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    pub total_products: u64,
    pub total_units: i64,
    pub total_value: Decimal,
    pub in_stock: u64,
    pub low_stock: u64,
    pub out_of_stock: u64,
    pub categories: Vec<CategoryTotals>,
}

/// Label used for products without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

impl InventorySummary {
    /// Fold a product listing into dashboard totals. Categories are sorted by name.
    #[must_use]
    pub fn from_products(products: &[Product]) -> Self {
        let mut summary = Self::default();
        let mut categories: std::collections::BTreeMap<String, CategoryTotals> =
            std::collections::BTreeMap::new();

        for product in products {
            summary.total_products += 1;
            summary.total_units += i64::from(product.quantity);
            summary.total_value = summary.total_value.saturating_add(product.stock_value());
            match product.status() {
                StockStatus::InStock => summary.in_stock += 1,
                StockStatus::LowStock => summary.low_stock += 1,
                StockStatus::OutOfStock => summary.out_of_stock += 1,
            }

            let key = product
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(UNCATEGORIZED)
                .to_owned();
            let entry = categories
                .entry(key.clone())
                .or_insert_with(|| CategoryTotals {
                    category: key,
                    products: 0,
                    units: 0,
                    value: Decimal::ZERO,
                });
            entry.products += 1;
            entry.units += i64::from(product.quantity);
            entry.value = entry.value.saturating_add(product.stock_value());
        }

        summary.categories = categories.into_values().collect();
        summary
    }
}
