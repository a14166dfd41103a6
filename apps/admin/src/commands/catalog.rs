//! # Catalog Commands
//!
//! Products, variants and the CSV product import.
//!
//! ## Import Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.csv                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  parse_product_sheet()    rows grouped by (name, hsn_code)              │
//! │       │                   a malformed file fails here, nothing written  │
//! │       ▼                                                                 │
//! │  for each group:                                                        │
//! │     products().import_group()   product + variants, one transaction     │
//! │       ├── Ok  → report.inserted                                         │
//! │       └── Err → report.failed   (the other groups still land)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::require_either;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use tillbook_core::csv_sheet::{parse_product_sheet, ProductGroup, PRODUCT_TEMPLATE};
use tillbook_core::{AccessProfile, NewProduct, NewVariant, PermissionKey, Product, ProductVariant};

/// Products shown by the billing picker when no limit is given.
pub const DEFAULT_PRODUCT_SEARCH_LIMIT: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub product: Product,
    pub variants: Vec<ProductVariant>,
    /// Σ variant stock
    pub total_stock: i64,
}

impl ProductDetail {
    fn new(product: Product, variants: Vec<ProductVariant>) -> Self {
        let total_stock = variants.iter().map(|v| v.stock_quantity).sum();
        ProductDetail {
            product,
            variants,
            total_stock,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedProduct {
    pub product_id: String,
    pub name: String,
    pub variant_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of one CSV import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub inserted: Vec<ImportedProduct>,
    pub failed: Vec<ImportFailure>,
}

// =============================================================================
// Products
// =============================================================================

pub async fn list_products(state: &AppState, access: &AccessProfile, include_inactive: bool) -> ApiResult<Vec<Product>> {
    access.require(PermissionKey::Inventory)?;
    Ok(state.database().products().list(include_inactive).await?)
}

/// Product picker search. Open to billing as well as inventory staff.
pub async fn search_products(
    state: &AppState,
    access: &AccessProfile,
    query: &str,
    limit: Option<u32>,
) -> ApiResult<Vec<Product>> {
    require_either(access, PermissionKey::Inventory, PermissionKey::Billing)?;

    let limit = limit.unwrap_or(DEFAULT_PRODUCT_SEARCH_LIMIT);
    Ok(state.database().products().search(query, limit).await?)
}

/// A product with its variants.
pub async fn get_product(state: &AppState, access: &AccessProfile, product_id: &str) -> ApiResult<ProductDetail> {
    require_either(access, PermissionKey::Inventory, PermissionKey::Billing)?;

    let db = state.database();
    let product = db
        .products()
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))?;
    let variants = db.products().variants(product_id).await?;

    Ok(ProductDetail::new(product, variants))
}

/// Creates a product and its variants together.
pub async fn create_product(
    state: &AppState,
    access: &AccessProfile,
    product: NewProduct,
    variants: Vec<NewVariant>,
) -> ApiResult<ProductDetail> {
    access.require(PermissionKey::Inventory)?;

    let group = ProductGroup { product, variants };
    let (product, variants) = state.database().products().import_group(&group).await?;

    info!(product_id = %product.id, name = %product.name, variants = variants.len(), "Product created");
    Ok(ProductDetail::new(product, variants))
}

pub async fn update_product(state: &AppState, access: &AccessProfile, product: &Product) -> ApiResult<Product> {
    access.require(PermissionKey::Inventory)?;
    Ok(state.database().products().update(product).await?)
}

/// Hides a product. Past invoices keep their lines.
pub async fn delete_product(state: &AppState, access: &AccessProfile, product_id: &str) -> ApiResult<()> {
    access.require(PermissionKey::Inventory)?;
    state.database().products().soft_delete(product_id).await?;

    info!(product_id = %product_id, "Product deactivated");
    Ok(())
}

// =============================================================================
// Variants
// =============================================================================

pub async fn add_variant(
    state: &AppState,
    access: &AccessProfile,
    product_id: &str,
    variant: &NewVariant,
) -> ApiResult<ProductVariant> {
    access.require(PermissionKey::Inventory)?;
    Ok(state.database().products().add_variant(product_id, variant).await?)
}

/// Sets a variant's stock count (stock-take correction).
pub async fn set_variant_stock(
    state: &AppState,
    access: &AccessProfile,
    variant_id: &str,
    quantity: i64,
) -> ApiResult<ProductVariant> {
    access.require(PermissionKey::Inventory)?;

    let db = state.database();
    db.products().set_variant_stock(variant_id, quantity).await?;
    let variant = db
        .products()
        .get_variant(variant_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Variant", variant_id))?;

    info!(variant_id = %variant_id, stock = variant.stock_quantity, staff = %access.staff_id, "Variant stock set");
    Ok(variant)
}

pub async fn delete_variant(state: &AppState, access: &AccessProfile, variant_id: &str) -> ApiResult<()> {
    access.require(PermissionKey::Inventory)?;
    Ok(state.database().products().delete_variant(variant_id).await?)
}

// =============================================================================
// CSV
// =============================================================================

/// The sample sheet offered for download.
pub fn product_template() -> &'static str {
    PRODUCT_TEMPLATE
}

/// Imports a product sheet.
///
/// A sheet that cannot be read is rejected whole. After that each product
/// group succeeds or fails on its own.
pub async fn import_products(state: &AppState, access: &AccessProfile, csv_text: &str) -> ApiResult<ImportReport> {
    access.require(PermissionKey::Inventory)?;

    let groups = parse_product_sheet(csv_text)?;
    debug!(groups = groups.len(), "Parsed product sheet");

    let mut report = ImportReport::default();
    for group in &groups {
        match state.database().products().import_group(group).await {
            Ok((product, variants)) => report.inserted.push(ImportedProduct {
                product_id: product.id,
                name: product.name,
                variant_count: variants.len(),
            }),
            Err(e) => {
                warn!(name = %group.product.name, error = %e, "Product group not imported");
                report.failed.push(ImportFailure {
                    name: group.product.name.clone(),
                    error: ApiError::from(e).message,
                });
            }
        }
    }

    info!(
        inserted = report.inserted.len(),
        failed = report.failed.len(),
        staff = %access.staff_id,
        "Product import finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, state};
    use crate::ErrorCode;
    use tillbook_core::Role;

    #[tokio::test]
    async fn test_template_imports_cleanly() {
        let state = state().await;
        let report = import_products(&state, &admin(), product_template()).await.unwrap();

        assert!(report.failed.is_empty());
        assert_eq!(report.inserted.len(), 2);
        assert_eq!(report.inserted[0].name, "Classic Black Frame");
        assert_eq!(report.inserted[0].variant_count, 2);

        let detail = get_product(&state, &admin(), &report.inserted[0].product_id).await.unwrap();
        assert_eq!(detail.total_stock, 30);
        assert_eq!(detail.product.extra_image_urls.len() + 1, 2);
    }

    #[tokio::test]
    async fn test_bad_group_does_not_stop_others() {
        let state = state().await;
        let long_name = "Saree".repeat(41);
        let sheet = format!(
            "name,price,variant_size,variant_stock\nSilk Saree,4500,Free,3\n{},4500,Free,2\n",
            long_name
        );

        let report = import_products(&state, &admin(), &sheet).await.unwrap();
        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, long_name);
        assert_eq!(report.failed[0].error, "name must be at most 200 characters");
    }

    #[tokio::test]
    async fn test_create_and_adjust_stock() {
        let state = state().await;
        let access = admin();
        let detail = create_product(
            &state,
            &access,
            NewProduct {
                name: "Linen Shirt".into(),
                price_paise: 180_000,
                is_active: true,
                ..NewProduct::default()
            },
            vec![NewVariant {
                size: Some("L".into()),
                stock_quantity: 4,
                ..NewVariant::default()
            }],
        )
        .await
        .unwrap();
        assert_eq!(detail.total_stock, 4);

        let variant = set_variant_stock(&state, &access, &detail.variants[0].id, 9).await.unwrap();
        assert_eq!(variant.stock_quantity, 9);

        delete_product(&state, &access, &detail.product.id).await.unwrap();
        assert!(search_products(&state, &access, "linen", None).await.unwrap().is_empty());
        assert_eq!(list_products(&state, &access, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_billing_staff_may_search_but_not_edit() {
        let state = state().await;
        let cashier = AccessProfile::new("c", Role::Staff, vec![PermissionKey::Billing]);

        assert!(search_products(&state, &cashier, "", None).await.is_ok());
        let err = list_products(&state, &cashier, false).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(err.message, "Permission denied: inventory");
    }
}
