//! # Product Repository
//!
//! Database operations for products and their variants.
//!
//! ## Key Operations
//! - Catalog CRUD and name search
//! - Variant CRUD and stock counts
//! - Stock snapshots for the pre-commit gate
//! - CSV import, one transaction per product group
//!
//! ## Where Stock Lives
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.stock_quantity          catalog figure, display only          │
//! │                                                                         │
//! │  product_variants.stock_quantity  what billing sells from               │
//! │       │                                                                 │
//! │       ├── variant line   → that variant's count                         │
//! │       └── product line   → sum over the product's variants              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tillbook_core::csv_sheet::ProductGroup;
use tillbook_core::stock::StockSnapshot;
use tillbook_core::validation::{validate_price_paise, validate_product_name, validate_stock_quantity};
use tillbook_core::{NewProduct, NewVariant, Product, ProductVariant};

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.insert(&new_product).await?;
/// repo.add_variant(&product.id, &new_variant).await?;
/// let snapshot = repo.stock_snapshot().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Lists products by name. Inactive products are skipped unless asked for.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = 1 OR ?1
            ORDER BY name COLLATE NOCASE, created_at
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Case-insensitive substring search on name, category and HSN code.
    ///
    /// An empty query lists active products.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        let pattern = format!("%{}%", query);
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE is_active = 1
            AND (?1 = '%%'
                 OR name LIKE ?1
                 OR category LIKE ?1
                 OR hsn_code LIKE ?1)
            ORDER BY name COLLATE NOCASE
            LIMIT ?2
            "#,
        )
        .bind(&pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Creates a product from form or import input.
    pub async fn insert(&self, input: &NewProduct) -> DbResult<Product> {
        let product = build_product(input, Utc::now())?;
        let mut conn = self.pool.acquire().await?;
        insert_product_row(&mut conn, &product).await?;
        Ok(product)
    }

    /// Updates every editable column of a product.
    pub async fn update(&self, product: &Product) -> DbResult<Product> {
        validate_product_name(&product.name)?;
        validate_price_paise(product.price_paise)?;
        if let Some(offer) = product.offer_price_paise {
            validate_price_paise(offer)?;
        }

        debug!(id = %product.id, name = %product.name, "Updating product");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                price_paise = ?4,
                offer_price_paise = ?5,
                category = ?6,
                hsn_code = ?7,
                image_url = ?8,
                extra_image_urls = ?9,
                features = ?10,
                ingredients = ?11,
                offers = ?12,
                stock_quantity = ?13,
                is_active = ?14,
                featured = ?15,
                updated_at = ?16
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(product.name.trim())
        .bind(&product.description)
        .bind(product.price_paise)
        .bind(product.offer_price_paise)
        .bind(&product.category)
        .bind(&product.hsn_code)
        .bind(&product.image_url)
        .bind(Json(&product.extra_image_urls))
        .bind(Json(&product.features))
        .bind(&product.ingredients)
        .bind(&product.offers)
        .bind(product.stock_quantity)
        .bind(product.is_active)
        .bind(product.featured)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(Product {
            name: product.name.trim().to_string(),
            updated_at: now,
            ..product.clone()
        })
    }

    /// Hides a product from billing and the storefront.
    ///
    /// Invoice lines keep pointing at it.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// Variants of one product, oldest first.
    pub async fn variants(&self, product_id: &str) -> DbResult<Vec<ProductVariant>> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT * FROM product_variants
            WHERE product_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(variants)
    }

    /// Every variant in the catalog.
    pub async fn all_variants(&self) -> DbResult<Vec<ProductVariant>> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            "SELECT * FROM product_variants ORDER BY product_id, created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(variants)
    }

    /// Gets a variant by ID.
    pub async fn get_variant(&self, id: &str) -> DbResult<Option<ProductVariant>> {
        let variant =
            sqlx::query_as::<_, ProductVariant>("SELECT * FROM product_variants WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(variant)
    }

    /// Adds a variant under an existing product.
    pub async fn add_variant(&self, product_id: &str, input: &NewVariant) -> DbResult<ProductVariant> {
        let variant = build_variant(product_id, input, Utc::now())?;
        let mut conn = self.pool.acquire().await?;
        insert_variant_row(&mut conn, &variant).await?;
        Ok(variant)
    }

    /// Overwrites a variant's stock count (manual adjustment).
    pub async fn set_variant_stock(&self, variant_id: &str, quantity: i64) -> DbResult<()> {
        validate_stock_quantity(quantity)?;

        debug!(variant_id = %variant_id, quantity = quantity, "Setting variant stock");

        let result = sqlx::query("UPDATE product_variants SET stock_quantity = ?2 WHERE id = ?1")
            .bind(variant_id)
            .bind(quantity)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Variant", variant_id));
        }

        Ok(())
    }

    /// Deletes a variant.
    pub async fn delete_variant(&self, variant_id: &str) -> DbResult<()> {
        debug!(variant_id = %variant_id, "Deleting variant");

        let result = sqlx::query("DELETE FROM product_variants WHERE id = ?1")
            .bind(variant_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Variant", variant_id));
        }

        Ok(())
    }

    /// Current variant stock, for the pre-commit gate.
    pub async fn stock_snapshot(&self) -> DbResult<StockSnapshot> {
        let variants = self.all_variants().await?;
        Ok(StockSnapshot::from_variants(&variants))
    }

    // =========================================================================
    // Import
    // =========================================================================

    /// Inserts a product and its variants in one transaction.
    ///
    /// Either the whole group lands or nothing does.
    pub async fn import_group(&self, group: &ProductGroup) -> DbResult<(Product, Vec<ProductVariant>)> {
        let now = Utc::now();
        let product = build_product(&group.product, now)?;
        let variants = group
            .variants
            .iter()
            .map(|v| build_variant(&product.id, v, now))
            .collect::<DbResult<Vec<_>>>()?;

        debug!(
            name = %product.name,
            variants = variants.len(),
            "Importing product group"
        );

        let mut tx = self.pool.begin().await?;
        insert_product_row(&mut tx, &product).await?;
        for variant in &variants {
            insert_variant_row(&mut tx, variant).await?;
        }
        tx.commit().await?;

        Ok((product, variants))
    }
}

// =============================================================================
// Row Builders
// =============================================================================

fn build_product(input: &NewProduct, now: DateTime<Utc>) -> DbResult<Product> {
    validate_product_name(&input.name)?;
    validate_price_paise(input.price_paise)?;
    if let Some(offer) = input.offer_price_paise {
        validate_price_paise(offer)?;
    }

    Ok(Product {
        id: generate_product_id(),
        name: input.name.trim().to_string(),
        description: input.description.clone(),
        price_paise: input.price_paise,
        offer_price_paise: input.offer_price_paise,
        category: input.category.clone(),
        hsn_code: input.hsn_code.clone(),
        image_url: input.image_url.clone(),
        extra_image_urls: input.extra_image_urls.clone(),
        features: input.features.clone(),
        ingredients: input.ingredients.clone(),
        offers: input.offers.clone(),
        stock_quantity: input.stock_quantity.max(0),
        is_active: input.is_active,
        featured: input.featured,
        created_at: now,
        updated_at: now,
    })
}

fn build_variant(product_id: &str, input: &NewVariant, now: DateTime<Utc>) -> DbResult<ProductVariant> {
    validate_stock_quantity(input.stock_quantity)?;
    if let Some(price) = input.price_paise {
        validate_price_paise(price)?;
    }

    Ok(ProductVariant {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        size: input.size.clone(),
        color: input.color.clone(),
        price_paise: input.price_paise,
        stock_quantity: input.stock_quantity,
        image_url: input.image_url.clone(),
        created_at: now,
    })
}

async fn insert_product_row(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(id = %product.id, name = %product.name, "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, description, price_paise, offer_price_paise,
            category, hsn_code, image_url, extra_image_urls, features,
            ingredients, offers, stock_quantity, is_active, featured,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15,
            ?16, ?17
        )
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price_paise)
    .bind(product.offer_price_paise)
    .bind(&product.category)
    .bind(&product.hsn_code)
    .bind(&product.image_url)
    .bind(Json(&product.extra_image_urls))
    .bind(Json(&product.features))
    .bind(&product.ingredients)
    .bind(&product.offers)
    .bind(product.stock_quantity)
    .bind(product.is_active)
    .bind(product.featured)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_variant_row(conn: &mut SqliteConnection, variant: &ProductVariant) -> DbResult<()> {
    debug!(id = %variant.id, product_id = %variant.product_id, "Inserting variant");

    sqlx::query(
        r#"
        INSERT INTO product_variants (
            id, product_id, size, color, price_paise,
            stock_quantity, image_url, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&variant.id)
    .bind(&variant.product_id)
    .bind(&variant.size)
    .bind(&variant.color)
    .bind(variant.price_paise)
    .bind(variant.stock_quantity)
    .bind(&variant.image_url)
    .bind(variant.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::repository::fixtures::kurta;
    use crate::{Database, DbConfig};
    use tillbook_core::csv_sheet::parse_product_sheet;
    use tillbook_core::{NewProduct, NewVariant};

    #[tokio::test]
    async fn test_insert_and_fetch_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.products().insert(&kurta()).await.unwrap();

        let fetched = db.products().get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Cotton Kurta");
        assert_eq!(fetched.offer_price_paise, Some(99_900));
        assert_eq!(fetched.extra_image_urls, vec!["b.jpg".to_string()]);
        assert_eq!(fetched.features, vec!["Handloom".to_string()]);
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let input = NewProduct {
            name: "  ".into(),
            ..kurta()
        };
        assert!(db.products().insert(&input).await.is_err());
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_and_soft_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db.products().insert(&kurta()).await.unwrap();

        assert_eq!(db.products().search("kurta", 10).await.unwrap().len(), 1);
        assert_eq!(db.products().search("6211", 10).await.unwrap().len(), 1);
        assert!(db.products().search("saree", 10).await.unwrap().is_empty());

        db.products().soft_delete(&created.id).await.unwrap();
        assert!(db.products().search("kurta", 10).await.unwrap().is_empty());
        assert_eq!(db.products().list(true).await.unwrap().len(), 1);
        assert!(db.products().list(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_variant_stock_snapshot() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().insert(&kurta()).await.unwrap();
        let red = db
            .products()
            .add_variant(
                &product.id,
                &NewVariant {
                    color: Some("Red".into()),
                    size: Some("M".into()),
                    stock_quantity: 3,
                    ..NewVariant::default()
                },
            )
            .await
            .unwrap();
        db.products()
            .add_variant(
                &product.id,
                &NewVariant {
                    color: Some("Blue".into()),
                    stock_quantity: 4,
                    ..NewVariant::default()
                },
            )
            .await
            .unwrap();

        let snapshot = db.products().stock_snapshot().await.unwrap();
        assert_eq!(snapshot.variant_stock(&red.id), 3);
        assert_eq!(snapshot.product_stock(&product.id), 7);

        db.products().set_variant_stock(&red.id, 10).await.unwrap();
        let snapshot = db.products().stock_snapshot().await.unwrap();
        assert_eq!(snapshot.product_stock(&product.id), 14);

        assert!(db.products().set_variant_stock(&red.id, -1).await.is_err());
    }

    #[tokio::test]
    async fn test_import_group_inserts_variants() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sheet = "name,price,hsn_code,variant_size,variant_stock\n\
                     Kurta,1200,6211,M,3\n\
                     Kurta,1200,6211,L,2\n";
        let groups = parse_product_sheet(sheet).unwrap();
        assert_eq!(groups.len(), 1);

        let (product, variants) = db.products().import_group(&groups[0]).await.unwrap();
        assert_eq!(product.price_paise, 120_000);
        assert_eq!(variants.len(), 2);
        assert_eq!(db.products().variants(&product.id).await.unwrap().len(), 2);
    }
}
