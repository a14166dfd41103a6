//! # Invoice Repository
//!
//! Invoice commit, archive listing, status changes and payments.
//!
//! ## Commit Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  commit(plan): ONE transaction                          │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    │                                                                    │
//! │    ├── 1. invoice_counters  next_value++      → "INV-000042"            │
//! │    ├── 2. INSERT invoices                                               │
//! │    ├── 3. INSERT invoice_items (one per line)                           │
//! │    ├── 4. UPDATE product_variants                                       │
//! │    │       SET stock = stock - qty WHERE stock >= qty                   │
//! │    │       0 rows? ──► InsufficientStock ──► ROLLBACK                   │
//! │    └── 5. paid > 0?                                                     │
//! │            INSERT invoice_payments                                      │
//! │            INSERT invoice_daily_income                                  │
//! │            INSERT invoice_edit_history (payment_add)                    │
//! │            INSERT invoice_edit_history (invoice_paid_update)            │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: nothing is written,     │
//! │  including the counter bump.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Floor
//! The floor in step 4 is the real oversell guard. The pre-commit gate in
//! `tillbook_core::stock` only reads a snapshot and can be stale.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tillbook_core::draft::CommitPlan;
use tillbook_core::settlement::{PaymentOutcome, Settlement};
use tillbook_core::stock::{StockDeduction, StockTarget};
use tillbook_core::{
    CoreError, EditAction, EditHistoryEntry, HistoryRecord, Invoice, InvoiceItem, InvoiceStatus,
    Money, Payment, SYSTEM_RECORDER,
};

/// Page size used when a filter leaves `limit` at 0.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

// =============================================================================
// Query Types
// =============================================================================

/// Archive listing filter. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    /// Matches invoice number, customer name or phone.
    pub search: Option<String>,
    /// First billing day, inclusive.
    pub from: Option<NaiveDate>,
    /// Last billing day, inclusive.
    pub to: Option<NaiveDate>,
    pub min_total: Option<Money>,
    pub max_total: Option<Money>,
    pub limit: u32,
    pub offset: u32,
}

/// One invoice with everything hanging off it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
    pub history: Vec<EditHistoryEntry>,
}

/// A payment and/or discount taken against a committed invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: Money,
    pub discount: Money,
    pub discount_reason: Option<String>,
    pub payment_method: String,
    pub recorded_by: String,
}

/// What [`InvoiceRepository::add_payment`] wrote.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub invoice: Invoice,
    pub outcome: PaymentOutcome,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Persists a prepared draft as an invoice, all or nothing.
    ///
    /// ## Arguments
    /// * `plan` - Output of `InvoiceDraft::prepare_commit`
    /// * `number_prefix` - Invoice number prefix, e.g. `"INV-"`
    ///
    /// ## Errors
    /// * `DbError::Rule(CoreError::InsufficientStock)` - a decrement hit its floor
    /// * `DbError::ForeignKeyViolation` - a line points at a missing product
    pub async fn commit(&self, plan: &CommitPlan, number_prefix: &str) -> DbResult<Invoice> {
        let now = Utc::now();
        let header = &plan.header;

        let mut tx = self.pool.begin().await?;

        let invoice_number = issue_invoice_number(&mut tx, number_prefix).await?;

        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number,
            customer_id: header.customer_id.clone(),
            customer_name: header.customer_name.clone(),
            customer_phone: header.customer_phone.clone(),
            customer_state: header.customer_state.clone(),
            reference_by: header.reference_by.clone(),
            subtotal_paise: header.totals.subtotal.paise(),
            total_discount_paise: header.totals.total_discount.paise(),
            taxable_paise: header.totals.taxable.paise(),
            cgst_paise: header.totals.cgst.paise(),
            sgst_paise: header.totals.sgst.paise(),
            igst_paise: header.totals.igst.paise(),
            tax_percent_bps: header.tax_percent.bps(),
            tax_type: header.tax_type,
            grand_total_paise: header.totals.grand_total.paise(),
            status: header.status,
            paid_amount_paise: header.paid_amount.paise(),
            created_at: now,
            updated_at: now,
        };

        debug!(
            id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            lines = plan.items.len(),
            grand_total = %header.totals.grand_total,
            "Inserting invoice"
        );

        insert_invoice_row(&mut tx, &invoice).await?;

        for (position, item) in plan.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    id, invoice_id, kind, product_id, variant_id,
                    item_code, description, hsn_code, quantity,
                    unit_price_paise, discount_percent_bps, discount_amount_paise,
                    total_paise, position, created_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5,
                    ?6, ?7, ?8, ?9,
                    ?10, ?11, ?12,
                    ?13, ?14, ?15
                )
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&invoice.id)
            .bind(item.kind)
            .bind(&item.product_id)
            .bind(&item.variant_id)
            .bind(&item.item_code)
            .bind(&item.description)
            .bind(&item.hsn_code)
            .bind(item.quantity)
            .bind(item.unit_price.paise())
            .bind(item.discount_percent.bps())
            .bind(item.discount_amount.paise())
            .bind(item.total.paise())
            .bind(position as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        for deduction in &plan.deductions {
            deduct_stock(&mut tx, deduction).await?;
        }

        if let Some(payment) = &plan.initial_payment {
            insert_payment_rows(
                &mut tx,
                &invoice.id,
                payment.amount,
                payment.method.as_str(),
                SYSTEM_RECORDER,
                now,
            )
            .await?;

            let added = HistoryRecord::new(EditAction::PaymentAdd).after(json!({
                "amount_paise": payment.amount.paise(),
                "payment_method": payment.method.as_str(),
                "recorded_by": SYSTEM_RECORDER,
            }));
            insert_history(&mut tx, &invoice.id, &added, now).await?;

            let paid = HistoryRecord::new(EditAction::InvoicePaidUpdate)
                .before(json!({ "paid_amount_paise": 0, "status": InvoiceStatus::Unpaid }))
                .after(json!({
                    "paid_amount_paise": invoice.paid_amount_paise,
                    "status": invoice.status,
                }));
            insert_history(&mut tx, &invoice.id, &paid, now).await?;
        }

        tx.commit().await?;

        Ok(invoice)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    /// Gets an invoice by its number.
    pub async fn get_by_number(&self, invoice_number: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE invoice_number = ?1")
            .bind(invoice_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(invoice)
    }

    /// Archive listing, newest first.
    pub async fn list(&self, filter: &InvoiceFilter) -> DbResult<Vec<Invoice>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM invoices WHERE 1 = 1");

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            qb.push(" AND (invoice_number LIKE ")
                .push_bind(pattern.clone())
                .push(" OR customer_name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR customer_phone LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        // created_at is RFC 3339 in UTC, so its first ten characters are the day
        if let Some(from) = filter.from {
            qb.push(" AND substr(created_at, 1, 10) >= ")
                .push_bind(from.format("%Y-%m-%d").to_string());
        }
        if let Some(to) = filter.to {
            qb.push(" AND substr(created_at, 1, 10) <= ")
                .push_bind(to.format("%Y-%m-%d").to_string());
        }

        if let Some(min) = filter.min_total {
            qb.push(" AND grand_total_paise >= ").push_bind(min.paise());
        }
        if let Some(max) = filter.max_total {
            qb.push(" AND grand_total_paise <= ").push_bind(max.paise());
        }

        let limit = if filter.limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            filter.limit
        };
        qb.push(" ORDER BY created_at DESC, invoice_number DESC LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.offset));

        let invoices = qb.build_query_as::<Invoice>().fetch_all(&self.pool).await?;

        debug!(count = invoices.len(), "Listed invoices");
        Ok(invoices)
    }

    /// Lines of an invoice in entry order.
    pub async fn items(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = ?1 ORDER BY position",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Payment log of an invoice, oldest first.
    pub async fn payments(&self, invoice_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM invoice_payments WHERE invoice_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Edit history of an invoice, oldest first.
    pub async fn history(&self, invoice_id: &str) -> DbResult<Vec<EditHistoryEntry>> {
        let history = sqlx::query_as::<_, EditHistoryEntry>(
            "SELECT * FROM invoice_edit_history WHERE invoice_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(history)
    }

    /// Invoice plus items, payments and history.
    pub async fn detail(&self, invoice_id: &str) -> DbResult<InvoiceDetail> {
        let invoice = self
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;

        Ok(InvoiceDetail {
            items: self.items(invoice_id).await?,
            payments: self.payments(invoice_id).await?,
            history: self.history(invoice_id).await?,
            invoice,
        })
    }

    // =========================================================================
    // Settlement
    // =========================================================================

    /// Moves an invoice to another status.
    ///
    /// ## What This Does
    /// 1. Applies the status rules (downgrades need `reason`)
    /// 2. Writes a `status_change` history row with the reason
    /// 3. On an upgrade that raises the paid amount, logs the difference as
    ///    a payment taken by `recorded_by`
    pub async fn change_status(
        &self,
        invoice_id: &str,
        target: InvoiceStatus,
        reason: Option<&str>,
        payment_method: &str,
        recorded_by: &str,
    ) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;
        let invoice = fetch_invoice(&mut tx, invoice_id).await?;

        let mut settlement = Settlement::from_parts(invoice.grand_total(), invoice.paid_amount(), invoice.status);
        let change = settlement.transition(target, reason)?;

        if change.from == change.to && change.paid_before == change.paid_after {
            return Ok(invoice);
        }

        debug!(
            invoice_number = %invoice.invoice_number,
            from = %change.from,
            to = %change.to,
            "Changing invoice status"
        );

        let now = Utc::now();
        update_settlement(&mut tx, &invoice, &settlement, 0, now).await?;

        let mut record = HistoryRecord::new(EditAction::StatusChange)
            .before(json!({
                "status": change.from,
                "paid_amount_paise": change.paid_before.paise(),
            }))
            .after(json!({
                "status": change.to,
                "paid_amount_paise": change.paid_after.paise(),
            }));
        if let Some(reason) = &change.reason {
            record = record.reason(reason.clone());
        }
        insert_history(&mut tx, &invoice.id, &record, now).await?;

        let collected = change.collected().floor_rupee();
        if collected.is_positive() {
            insert_payment_rows(&mut tx, &invoice.id, collected, payment_method, recorded_by, now).await?;
            let added = HistoryRecord::new(EditAction::PaymentAdd).after(json!({
                "amount_paise": collected.paise(),
                "payment_method": payment_method,
                "recorded_by": recorded_by,
            }));
            insert_history(&mut tx, &invoice.id, &added, now).await?;
        }

        tx.commit().await?;

        Ok(Invoice {
            status: settlement.status(),
            paid_amount_paise: settlement.paid_amount().paise(),
            updated_at: now,
            ..invoice
        })
    }

    /// Takes a payment and/or discount against an invoice.
    ///
    /// Writes `payment_add` when money was received, `discount_add` when a
    /// discount was granted, then `invoice_paid_update`.
    pub async fn add_payment(&self, invoice_id: &str, request: &PaymentRequest) -> DbResult<PaymentReceipt> {
        let mut tx = self.pool.begin().await?;
        let invoice = fetch_invoice(&mut tx, invoice_id).await?;

        let mut settlement = Settlement::from_parts(invoice.grand_total(), invoice.paid_amount(), invoice.status);
        let outcome =
            settlement.record_payment(request.amount, request.discount, request.discount_reason.as_deref())?;

        debug!(
            invoice_number = %invoice.invoice_number,
            recorded = %outcome.recorded,
            discount = %outcome.discount,
            status = %settlement.status(),
            "Recording invoice payment"
        );

        let now = Utc::now();

        if outcome.recorded.is_positive() {
            insert_payment_rows(
                &mut tx,
                &invoice.id,
                outcome.recorded,
                &request.payment_method,
                &request.recorded_by,
                now,
            )
            .await?;
            let added = HistoryRecord::new(EditAction::PaymentAdd).after(json!({
                "amount_paise": outcome.recorded.paise(),
                "payment_method": request.payment_method,
                "recorded_by": request.recorded_by,
            }));
            insert_history(&mut tx, &invoice.id, &added, now).await?;
        }

        if outcome.discount.is_positive() {
            let mut record = HistoryRecord::new(EditAction::DiscountAdd)
                .before(json!({
                    "grand_total_paise": outcome.before.grand_total().paise(),
                    "total_discount_paise": invoice.total_discount_paise,
                }))
                .after(json!({
                    "grand_total_paise": outcome.after.grand_total().paise(),
                    "total_discount_paise": invoice.total_discount_paise + outcome.discount.paise(),
                }));
            if let Some(reason) = &outcome.discount_reason {
                record = record.reason(reason.clone());
            }
            insert_history(&mut tx, &invoice.id, &record, now).await?;
        }

        let paid = HistoryRecord::new(EditAction::InvoicePaidUpdate)
            .before(json!({
                "paid_amount_paise": outcome.before.paid_amount().paise(),
                "status": outcome.before.status(),
            }))
            .after(json!({
                "paid_amount_paise": outcome.after.paid_amount().paise(),
                "status": outcome.after.status(),
            }));
        insert_history(&mut tx, &invoice.id, &paid, now).await?;

        update_settlement(&mut tx, &invoice, &settlement, outcome.discount.paise(), now).await?;

        tx.commit().await?;

        let invoice = Invoice {
            grand_total_paise: settlement.grand_total().paise(),
            total_discount_paise: invoice.total_discount_paise + outcome.discount.paise(),
            status: settlement.status(),
            paid_amount_paise: settlement.paid_amount().paise(),
            updated_at: now,
            ..invoice
        };

        Ok(PaymentReceipt { invoice, outcome })
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

/// Issues the next number of a series, e.g. `INV-000001`.
async fn issue_invoice_number(conn: &mut SqliteConnection, prefix: &str) -> DbResult<String> {
    sqlx::query("INSERT INTO invoice_counters (prefix, next_value) VALUES (?1, 1) ON CONFLICT (prefix) DO NOTHING")
        .bind(prefix)
        .execute(&mut *conn)
        .await?;

    let issued: i64 = sqlx::query_scalar(
        "UPDATE invoice_counters SET next_value = next_value + 1 WHERE prefix = ?1 RETURNING next_value - 1",
    )
    .bind(prefix)
    .fetch_one(&mut *conn)
    .await?;

    Ok(format!("{}{:06}", prefix, issued))
}

async fn insert_invoice_row(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, invoice_number, customer_id, customer_name, customer_phone,
            customer_state, reference_by, subtotal_paise, total_discount_paise,
            taxable_paise, cgst_paise, sgst_paise, igst_paise, tax_percent_bps,
            tax_type, grand_total_paise, status, paid_amount_paise,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9,
            ?10, ?11, ?12, ?13, ?14,
            ?15, ?16, ?17, ?18,
            ?19, ?20
        )
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.invoice_number)
    .bind(&invoice.customer_id)
    .bind(&invoice.customer_name)
    .bind(&invoice.customer_phone)
    .bind(&invoice.customer_state)
    .bind(&invoice.reference_by)
    .bind(invoice.subtotal_paise)
    .bind(invoice.total_discount_paise)
    .bind(invoice.taxable_paise)
    .bind(invoice.cgst_paise)
    .bind(invoice.sgst_paise)
    .bind(invoice.igst_paise)
    .bind(invoice.tax_percent_bps)
    .bind(invoice.tax_type)
    .bind(invoice.grand_total_paise)
    .bind(invoice.status)
    .bind(invoice.paid_amount_paise)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn fetch_invoice(conn: &mut SqliteConnection, invoice_id: &str) -> DbResult<Invoice> {
    sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
        .bind(invoice_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Invoice", invoice_id))
}

async fn update_settlement(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
    settlement: &Settlement,
    extra_discount_paise: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE invoices SET
            grand_total_paise = ?2,
            total_discount_paise = total_discount_paise + ?3,
            status = ?4,
            paid_amount_paise = ?5,
            updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(&invoice.id)
    .bind(settlement.grand_total().paise())
    .bind(extra_discount_paise)
    .bind(settlement.status())
    .bind(settlement.paid_amount().paise())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Decrements stock, never below zero.
///
/// A product-scoped deduction drains the product's variants oldest first.
async fn deduct_stock(conn: &mut SqliteConnection, deduction: &StockDeduction) -> DbResult<()> {
    let insufficient = |available: i64| -> DbError {
        CoreError::InsufficientStock {
            item: deduction.item.clone(),
            available,
            requested: deduction.quantity,
        }
        .into()
    };

    match &deduction.target {
        StockTarget::Variant(variant_id) => {
            debug!(variant_id = %variant_id, quantity = deduction.quantity, "Deducting variant stock");

            let result = sqlx::query(
                r#"
                UPDATE product_variants
                SET stock_quantity = stock_quantity - ?2
                WHERE id = ?1 AND stock_quantity >= ?2
                "#,
            )
            .bind(variant_id)
            .bind(deduction.quantity)
            .execute(&mut *conn)
            .await?;

            if result.rows_affected() == 0 {
                let available: Option<i64> =
                    sqlx::query_scalar("SELECT stock_quantity FROM product_variants WHERE id = ?1")
                        .bind(variant_id)
                        .fetch_optional(&mut *conn)
                        .await?;
                return Err(insufficient(available.unwrap_or(0)));
            }
        }

        StockTarget::Product(product_id) => {
            debug!(product_id = %product_id, quantity = deduction.quantity, "Deducting product stock");

            let variants: Vec<(String, i64)> = sqlx::query_as(
                r#"
                SELECT id, stock_quantity FROM product_variants
                WHERE product_id = ?1
                ORDER BY created_at, rowid
                "#,
            )
            .bind(product_id)
            .fetch_all(&mut *conn)
            .await?;

            let available: i64 = variants.iter().map(|(_, stock)| *stock).sum();
            if available < deduction.quantity {
                return Err(insufficient(available));
            }

            let mut remaining = deduction.quantity;
            for (variant_id, stock) in variants {
                if remaining == 0 {
                    break;
                }
                let take = stock.min(remaining);
                if take <= 0 {
                    continue;
                }
                let result = sqlx::query(
                    r#"
                    UPDATE product_variants
                    SET stock_quantity = stock_quantity - ?2
                    WHERE id = ?1 AND stock_quantity >= ?2
                    "#,
                )
                .bind(&variant_id)
                .bind(take)
                .execute(&mut *conn)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(insufficient(available));
                }
                remaining -= take;
            }
        }
    }

    Ok(())
}

/// Appends a payment log row and the matching daily-income row.
async fn insert_payment_rows(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    amount: Money,
    payment_method: &str,
    recorded_by: &str,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(invoice_id = %invoice_id, amount = %amount, method = %payment_method, "Recording payment");

    sqlx::query(
        r#"
        INSERT INTO invoice_payments (id, invoice_id, amount_paise, payment_method, recorded_by, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(invoice_id)
    .bind(amount.paise())
    .bind(payment_method)
    .bind(recorded_by)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO invoice_daily_income (id, invoice_id, amount_paise, payment_method, payment_date, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(invoice_id)
    .bind(amount.paise())
    .bind(payment_method)
    .bind(now.date_naive())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn insert_history(
    conn: &mut SqliteConnection,
    invoice_id: &str,
    record: &HistoryRecord,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let old_values = record.old_values.as_ref().map(serde_json::to_string).transpose()?;
    let new_values = record.new_values.as_ref().map(serde_json::to_string).transpose()?;

    sqlx::query(
        r#"
        INSERT INTO invoice_edit_history (id, invoice_id, action_type, old_values, new_values, reason, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(invoice_id)
    .bind(record.action)
    .bind(old_values)
    .bind(new_values)
    .bind(&record.reason)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
