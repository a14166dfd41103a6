//! # Reports
//!
//! Read-side aggregation over fetched rows. Nothing here is persisted.
//!
//! ## Daily Income
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  invoice_daily_income rows ──┐                                          │
//! │                              ├─► merge by invoice id (then number)      │
//! │  invoices ───────────────────┘         │                                │
//! │                                        ▼                                │
//! │                               PaymentDetail per payment                 │
//! │                                 overdue = max(total − paid, 0)          │
//! │                                 old_paid_overdue when billed earlier    │
//! │                                        │ filter (dates, method group)   │
//! │                                        ▼                                │
//! │                               DailySummary per payment date             │
//! │                                 + invoices billed that date             │
//! │                                 newest first, totals footer             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Inventory
//! Variant stock per product minus units sold (counter invoices plus
//! storefront orders). Available stock is recomputed from scratch on each
//! call, so manual stock edits that are not sales show up as drift.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::csv_sheet::{amount_cell, write_sheet};
use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{DailyIncomeEntry, Invoice, Product, ProductVariant, SaleRecord};
use crate::LOW_STOCK_THRESHOLD;

// =============================================================================
// Payment Method Groups
// =============================================================================

/// Buckets for free-text payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum MethodGroup {
    Upi,
    Cash,
    Bank,
    Other,
}

impl MethodGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodGroup::Upi => "UPI",
            MethodGroup::Cash => "CASH",
            MethodGroup::Bank => "BANK",
            MethodGroup::Other => "OTHER",
        }
    }
}

impl fmt::Display for MethodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodGroup {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UPI" => Ok(MethodGroup::Upi),
            "CASH" => Ok(MethodGroup::Cash),
            "BANK" => Ok(MethodGroup::Bank),
            "OTHER" => Ok(MethodGroup::Other),
            _ => Err(ValidationError::NotAllowed {
                field: "method".to_string(),
                allowed: vec!["UPI".into(), "CASH".into(), "BANK".into(), "OTHER".into()],
            }),
        }
    }
}

const UPI_KEYS: [&str; 5] = ["upi", "gpay", "phonepe", "paytm", "bhim"];
const CASH_KEYS: [&str; 3] = ["cash", "cod", "on_delivery"];
const BANK_KEYS: [&str; 5] = ["bank", "bank_transfer", "neft", "rtgs", "imps"];

/// Classifies a stored method string by keyword, checked UPI, cash, bank.
///
/// ## Example
/// ```rust
/// use tillbook_core::report::{method_group, MethodGroup};
///
/// assert_eq!(method_group("GPay"), MethodGroup::Upi);
/// assert_eq!(method_group("neft"), MethodGroup::Bank);
/// assert_eq!(method_group("card"), MethodGroup::Other);
/// ```
pub fn method_group(method: &str) -> MethodGroup {
    let method = method.trim().to_lowercase();
    if method.is_empty() {
        return MethodGroup::Other;
    }
    let has = |keys: &[&str]| keys.iter().any(|k| method.contains(k));
    if has(&UPI_KEYS) {
        MethodGroup::Upi
    } else if has(&CASH_KEYS) {
        MethodGroup::Cash
    } else if has(&BANK_KEYS) {
        MethodGroup::Bank
    } else {
        MethodGroup::Other
    }
}

// =============================================================================
// Daily Income
// =============================================================================

/// One payment joined with its invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentDetail {
    pub entry_id: String,
    pub invoice_id: String,
    pub invoice_number: Option<String>,
    pub amount: Money,
    pub payment_method: String,
    pub method_group: MethodGroup,
    #[ts(as = "String")]
    pub payment_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub billed_on: Option<NaiveDate>,
    /// Invoice grand total (0 when the invoice is unknown).
    pub invoice_total: Money,
    /// What the invoice still owes today.
    pub overdue: Money,
    /// The amount again when the invoice was billed before this day.
    pub old_paid_overdue: Money,
}

impl PaymentDetail {
    #[inline]
    pub fn is_old_overdue(&self) -> bool {
        self.old_paid_overdue.is_positive()
    }
}

/// Joins income rows to invoices, by id first and invoice number second.
pub fn merge_payments(entries: &[DailyIncomeEntry], invoices: &[Invoice]) -> Vec<PaymentDetail> {
    let by_id: HashMap<&str, &Invoice> = invoices.iter().map(|i| (i.id.as_str(), i)).collect();
    let by_number: HashMap<&str, &Invoice> = invoices
        .iter()
        .map(|i| (i.invoice_number.as_str(), i))
        .collect();

    entries
        .iter()
        .map(|entry| {
            let key = entry.invoice_id.as_str();
            let invoice = by_id.get(key).or_else(|| by_number.get(key)).copied();
            let billed_on = invoice.map(Invoice::billed_on);
            let amount = entry.amount();
            let old = billed_on.is_some_and(|d| d < entry.payment_date);

            PaymentDetail {
                entry_id: entry.id.clone(),
                invoice_id: entry.invoice_id.clone(),
                invoice_number: invoice.map(|i| i.invoice_number.clone()),
                amount,
                payment_method: entry.payment_method.clone(),
                method_group: method_group(&entry.payment_method),
                payment_date: entry.payment_date,
                billed_on,
                invoice_total: invoice.map(Invoice::grand_total).unwrap_or_default(),
                overdue: invoice.map(Invoice::balance).unwrap_or_default(),
                old_paid_overdue: if old { amount } else { Money::zero() },
            }
        })
        .collect()
}

/// Which payments a daily report covers. Dates are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyIncomeFilter {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    pub method: Option<MethodGroup>,
}

impl DailyIncomeFilter {
    pub fn matches(&self, detail: &PaymentDetail) -> bool {
        self.from.map_or(true, |from| detail.payment_date >= from)
            && self.to.map_or(true, |to| detail.payment_date <= to)
            && self.method.map_or(true, |m| detail.method_group == m)
    }
}

/// Payment count per method group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MethodCounts {
    pub upi: usize,
    pub cash: usize,
    pub bank: usize,
    pub other: usize,
}

impl MethodCounts {
    fn bump(&mut self, group: MethodGroup) {
        match group {
            MethodGroup::Upi => self.upi += 1,
            MethodGroup::Cash => self.cash += 1,
            MethodGroup::Bank => self.bank += 1,
            MethodGroup::Other => self.other += 1,
        }
    }
}

/// One calendar day of income.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySummary {
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// Grand totals of invoices billed this day.
    pub total_invoiced: Money,
    /// Outstanding balance on invoices billed this day.
    pub total_overdue: Money,
    pub total_paid: Money,
    /// Paid this day against invoices billed earlier.
    pub old_overdue_paid: Money,
    /// Paid this day against invoices billed this day (or unknown).
    pub same_day_paid: Money,
    /// `total_paid` plus `old_overdue_paid`.
    pub total_collectable: Money,
    pub payment_count: usize,
    pub method_counts: MethodCounts,
    pub payments: Vec<PaymentDetail>,
}

/// Footer of the daily report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyIncomeTotals {
    pub invoiced: Money,
    pub overdue: Money,
    pub paid: Money,
    pub old_overdue_paid: Money,
    pub same_day_paid: Money,
    pub collectable: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyIncomeReport {
    /// Newest first.
    pub days: Vec<DailySummary>,
    pub totals: DailyIncomeTotals,
}

/// Builds the daily income report.
///
/// Only dates with at least one matching payment appear. Invoice figures
/// for a date come from every invoice billed that date.
pub fn daily_income(
    entries: &[DailyIncomeEntry],
    invoices: &[Invoice],
    filter: &DailyIncomeFilter,
) -> DailyIncomeReport {
    let mut billed: HashMap<NaiveDate, (Money, Money)> = HashMap::new();
    for invoice in invoices {
        let slot = billed.entry(invoice.billed_on()).or_default();
        slot.0 += invoice.grand_total();
        slot.1 += invoice.balance();
    }

    let mut days: BTreeMap<NaiveDate, DailySummary> = BTreeMap::new();
    for detail in merge_payments(entries, invoices) {
        if !filter.matches(&detail) {
            continue;
        }
        let date = detail.payment_date;
        let day = days.entry(date).or_insert_with(|| {
            let (invoiced, overdue) = billed.get(&date).copied().unwrap_or_default();
            DailySummary {
                date,
                total_invoiced: invoiced,
                total_overdue: overdue,
                total_paid: Money::zero(),
                old_overdue_paid: Money::zero(),
                same_day_paid: Money::zero(),
                total_collectable: Money::zero(),
                payment_count: 0,
                method_counts: MethodCounts::default(),
                payments: Vec::new(),
            }
        });

        day.total_paid += detail.amount;
        day.old_overdue_paid += detail.old_paid_overdue;
        day.same_day_paid += detail.amount - detail.old_paid_overdue;
        day.total_collectable = day.total_paid + day.old_overdue_paid;
        day.payment_count += 1;
        day.method_counts.bump(detail.method_group);
        day.payments.push(detail);
    }

    let days: Vec<DailySummary> = days.into_values().rev().collect();
    let totals = days.iter().fold(DailyIncomeTotals::default(), |mut acc, d| {
        acc.invoiced += d.total_invoiced;
        acc.overdue += d.total_overdue;
        acc.paid += d.total_paid;
        acc.old_overdue_paid += d.old_overdue_paid;
        acc.same_day_paid += d.same_day_paid;
        acc.collectable += d.total_collectable;
        acc
    });

    DailyIncomeReport { days, totals }
}

pub const DAILY_INCOME_HEADERS: [&str; 7] = [
    "Invoice",
    "Amount",
    "Overdue",
    "OldPaidOverdue",
    "Method",
    "PaymentDate",
    "InvoiceTotal",
];

/// Exports payment rows. The Invoice column shows the invoice number when
/// it is known, else the stored reference.
pub fn daily_income_csv(payments: &[PaymentDetail]) -> CoreResult<String> {
    let rows: Vec<Vec<String>> = payments
        .iter()
        .map(|p| {
            vec![
                p.invoice_number.clone().unwrap_or_else(|| p.invoice_id.clone()),
                amount_cell(p.amount),
                amount_cell(p.overdue),
                amount_cell(p.old_paid_overdue),
                p.payment_method.clone(),
                p.payment_date.format("%Y-%m-%d").to_string(),
                amount_cell(p.invoice_total),
            ]
        })
        .collect();
    write_sheet(&DAILY_INCOME_HEADERS, &rows)
}

// =============================================================================
// Inventory
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryRow {
    pub product_id: String,
    pub name: String,
    /// Offer price when set, else list price.
    pub unit_price_used: Money,
    pub variant_stock: i64,
    pub sold_units: i64,
    pub revenue: Money,
    /// variant_stock − sold_units (may go negative).
    pub available_stock: i64,
    pub low_stock: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySales {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub units: i64,
    pub revenue: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryReport {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    pub rows: Vec<InventoryRow>,
    /// Oldest first.
    pub daily: Vec<DailySales>,
    pub total_units: i64,
    pub total_revenue: Money,
}

/// Builds the inventory report. Sales outside `[from, to]` are ignored.
pub fn inventory_report(
    products: &[Product],
    variants: &[ProductVariant],
    sales: &[SaleRecord],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> InventoryReport {
    let mut stock: HashMap<&str, i64> = HashMap::new();
    for variant in variants {
        *stock.entry(variant.product_id.as_str()).or_insert(0) += variant.stock_quantity;
    }

    let prices: HashMap<&str, Money> = products
        .iter()
        .map(|p| (p.id.as_str(), p.selling_price()))
        .collect();

    let mut sold: HashMap<&str, i64> = HashMap::new();
    let mut daily: BTreeMap<NaiveDate, DailySales> = BTreeMap::new();
    for sale in sales {
        let day = sale.sold_at.date_naive();
        let in_range = from.map_or(true, |f| day >= f) && to.map_or(true, |t| day <= t);
        if sale.quantity == 0 || !in_range {
            continue;
        }
        *sold.entry(sale.product_id.as_str()).or_insert(0) += sale.quantity;

        let price = prices.get(sale.product_id.as_str()).copied().unwrap_or_default();
        let slot = daily.entry(day).or_insert(DailySales {
            date: day,
            units: 0,
            revenue: Money::zero(),
        });
        slot.units += sale.quantity;
        slot.revenue += price * sale.quantity;
    }

    let rows: Vec<InventoryRow> = products
        .iter()
        .map(|p| {
            let variant_stock = stock.get(p.id.as_str()).copied().unwrap_or(0);
            let sold_units = sold.get(p.id.as_str()).copied().unwrap_or(0);
            let unit_price_used = p.selling_price();
            let available_stock = variant_stock - sold_units;
            InventoryRow {
                product_id: p.id.clone(),
                name: p.name.clone(),
                unit_price_used,
                variant_stock,
                sold_units,
                revenue: unit_price_used * sold_units,
                available_stock,
                low_stock: available_stock <= LOW_STOCK_THRESHOLD,
            }
        })
        .collect();

    InventoryReport {
        from,
        to,
        total_units: rows.iter().map(|r| r.sold_units).sum(),
        total_revenue: rows.iter().map(|r| r.revenue).sum(),
        rows,
        daily: daily.into_values().collect(),
    }
}

pub const INVENTORY_HEADERS: [&str; 7] = [
    "Product Name",
    "Unit Price Used",
    "Total Sold Units",
    "Total Revenue",
    "Available Stock",
    "Date From",
    "Date To",
];

pub fn inventory_csv(report: &InventoryReport) -> CoreResult<String> {
    let date = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
    let rows: Vec<Vec<String>> = report
        .rows
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                amount_cell(r.unit_price_used),
                r.sold_units.to_string(),
                amount_cell(r.revenue),
                r.available_stock.to_string(),
                date(report.from),
                date(report.to),
            ]
        })
        .collect();
    write_sheet(&INVENTORY_HEADERS, &rows)
}

// =============================================================================
// Unit Tests
// =============================================================================
