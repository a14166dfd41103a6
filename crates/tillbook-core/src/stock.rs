//! # Stock Gate
//!
//! Pre-commit check of requested quantities against on-hand stock.
//!
//! ```text
//! line with variant_id       → available = that variant's stock
//! line with product_id only  → available = Σ stock of the product's variants
//! manual line                → not checked
//! ```
//!
//! The check runs against a snapshot and fails on the first short line.
//! It is a courtesy to the cashier; the decrement inside the commit
//! transaction refuses to take stock below zero regardless.

use std::collections::HashMap;

use crate::draft::DraftLine;
use crate::error::{CoreError, CoreResult};
use crate::types::{LineKind, ProductVariant};

/// Stock figures taken from variant rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockSnapshot {
    by_variant: HashMap<String, i64>,
    by_product: HashMap<String, i64>,
}

impl StockSnapshot {
    pub fn from_variants<'a>(variants: impl IntoIterator<Item = &'a ProductVariant>) -> Self {
        let mut snapshot = StockSnapshot::default();
        for variant in variants {
            snapshot
                .by_variant
                .insert(variant.id.clone(), variant.stock_quantity);
            *snapshot
                .by_product
                .entry(variant.product_id.clone())
                .or_insert(0) += variant.stock_quantity;
        }
        snapshot
    }

    /// Stock of one variant; unknown ids have none.
    pub fn variant_stock(&self, variant_id: &str) -> i64 {
        self.by_variant.get(variant_id).copied().unwrap_or(0)
    }

    /// Combined stock of a product's variants.
    pub fn product_stock(&self, product_id: &str) -> i64 {
        self.by_product.get(product_id).copied().unwrap_or(0)
    }
}

/// Where a deduction is taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockTarget {
    Variant(String),
    /// Spread over the product's variants, oldest first.
    Product(String),
}

/// One stock decrement the commit must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDeduction {
    pub target: StockTarget,
    pub quantity: i64,
    /// Line text for error messages.
    pub item: String,
}

/// Stock decrements implied by the product lines of a draft.
pub fn deductions(lines: &[DraftLine]) -> Vec<StockDeduction> {
    lines
        .iter()
        .filter(|line| line.kind == LineKind::Product && line.quantity > 0)
        .filter_map(|line| {
            let target = match (&line.variant_id, &line.product_id) {
                (Some(variant_id), _) => StockTarget::Variant(variant_id.clone()),
                (None, Some(product_id)) => StockTarget::Product(product_id.clone()),
                (None, None) => return None,
            };
            Some(StockDeduction {
                target,
                quantity: line.quantity,
                item: line.display_name().to_string(),
            })
        })
        .collect()
}

/// Fails with [`CoreError::InsufficientStock`] on the first line that asks
/// for more than the snapshot holds.
///
/// ## Example
/// ```rust
/// use tillbook_core::draft::{DraftLine, LineField};
/// use tillbook_core::stock::{check_stock, StockSnapshot};
/// use tillbook_core::types::LineKind;
///
/// let mut line = DraftLine::new(LineKind::Product);
/// line.product_id = Some("p1".into());
/// line.update(LineField::Quantity, "3").unwrap();
///
/// let err = check_stock(&[line], &StockSnapshot::default()).unwrap_err();
/// assert!(err.to_string().starts_with("Not enough stock"));
/// ```
pub fn check_stock(lines: &[DraftLine], snapshot: &StockSnapshot) -> CoreResult<()> {
    for line in lines {
        if line.kind != LineKind::Product {
            continue;
        }
        let available = match (&line.variant_id, &line.product_id) {
            (Some(variant_id), _) => snapshot.variant_stock(variant_id),
            (None, Some(product_id)) => snapshot.product_stock(product_id),
            (None, None) => continue,
        };
        if line.quantity > available {
            return Err(CoreError::InsufficientStock {
                item: line.display_name().to_string(),
                available,
                requested: line.quantity,
            });
        }
    }
    Ok(())
}
