//! # Report Repository
//!
//! Fetches the rows the report aggregations in `tillbook_core::report` run
//! over. Nothing here writes.
//!
//! ```text
//! invoice_daily_income ─┐
//! invoices ─────────────┴──► daily_income(filter)  ──► DailyIncomeReport
//!
//! products ─────────────┐
//! product_variants ─────┤
//! invoice_items ─┐      │
//! order_items ───┴──────┴──► inventory(from, to)   ──► InventoryReport
//! ```

use std::collections::HashSet;

use chrono::NaiveDate;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tillbook_core::report::{self, DailyIncomeFilter, DailyIncomeReport, InventoryReport};
use tillbook_core::{DailyIncomeEntry, Invoice, Product, ProductVariant, SaleRecord};

/// Read model for reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Income rows with a payment date in `[from, to]`, newest first.
    pub async fn daily_income_entries(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<Vec<DailyIncomeEntry>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM invoice_daily_income WHERE 1 = 1");
        if let Some(from) = from {
            qb.push(" AND payment_date >= ").push_bind(day(from));
        }
        if let Some(to) = to {
            qb.push(" AND payment_date <= ").push_bind(day(to));
        }
        qb.push(" ORDER BY payment_date DESC, created_at DESC");

        let entries = qb
            .build_query_as::<DailyIncomeEntry>()
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Invoices with the given ids.
    pub async fn invoices_by_ids(&self, ids: &[String]) -> DbResult<Vec<Invoice>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM invoices WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        let invoices = qb.build_query_as::<Invoice>().fetch_all(&self.pool).await?;
        Ok(invoices)
    }

    /// Invoices billed in `[from, to]`.
    pub async fn invoices_billed_between(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> DbResult<Vec<Invoice>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM invoices WHERE 1 = 1");
        if let Some(from) = from {
            qb.push(" AND substr(created_at, 1, 10) >= ").push_bind(day(from));
        }
        if let Some(to) = to {
            qb.push(" AND substr(created_at, 1, 10) <= ").push_bind(day(to));
        }

        let invoices = qb.build_query_as::<Invoice>().fetch_all(&self.pool).await?;
        Ok(invoices)
    }

    /// Sold units from counter invoices and storefront orders.
    ///
    /// Manual lines carry no product and are left out.
    pub async fn sale_records(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> DbResult<Vec<SaleRecord>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT * FROM (
                SELECT ii.product_id AS product_id,
                       ii.quantity AS quantity,
                       'invoice' AS source,
                       inv.created_at AS sold_at
                FROM invoice_items ii
                JOIN invoices inv ON inv.id = ii.invoice_id
                WHERE ii.product_id IS NOT NULL
                UNION ALL
                SELECT oi.product_id, oi.quantity, 'online', oi.created_at
                FROM order_items oi
                WHERE oi.product_id IS NOT NULL
            ) WHERE 1 = 1
            "#,
        );
        if let Some(from) = from {
            qb.push(" AND substr(sold_at, 1, 10) >= ").push_bind(day(from));
        }
        if let Some(to) = to {
            qb.push(" AND substr(sold_at, 1, 10) <= ").push_bind(day(to));
        }
        qb.push(" ORDER BY sold_at");

        let sales = qb.build_query_as::<SaleRecord>().fetch_all(&self.pool).await?;
        Ok(sales)
    }

    /// Builds the daily income report.
    ///
    /// Invoices are loaded for every payment in range plus every invoice
    /// billed in range, so each day shows what was billed on it.
    pub async fn daily_income(&self, filter: &DailyIncomeFilter) -> DbResult<DailyIncomeReport> {
        let entries = self.daily_income_entries(filter.from, filter.to).await?;

        let ids: Vec<String> = entries
            .iter()
            .map(|e| e.invoice_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let mut invoices = self.invoices_by_ids(&ids).await?;
        let mut seen: HashSet<String> = invoices.iter().map(|i| i.id.clone()).collect();
        for invoice in self.invoices_billed_between(filter.from, filter.to).await? {
            if seen.insert(invoice.id.clone()) {
                invoices.push(invoice);
            }
        }

        debug!(
            entries = entries.len(),
            invoices = invoices.len(),
            "Building daily income report"
        );

        Ok(report::daily_income(&entries, &invoices, filter))
    }

    /// Builds the inventory report over active products.
    pub async fn inventory(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> DbResult<InventoryReport> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE is_active = 1 ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        let variants = sqlx::query_as::<_, ProductVariant>("SELECT * FROM product_variants")
            .fetch_all(&self.pool)
            .await?;

        let sales = self.sale_records(from, to).await?;

        debug!(
            products = products.len(),
            variants = variants.len(),
            sales = sales.len(),
            "Building inventory report"
        );

        Ok(report::inventory_report(&products, &variants, &sales, from, to))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
