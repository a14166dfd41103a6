//! # Domain Types
//!
//! Core domain types used throughout Tillbook.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │◄──│ ProductVariant  │   │    Customer     │       │
//! │  │  price/offer    │   │  color, size    │   │  cust_id CUST001│       │
//! │  │  hsn_code       │   │  stock_quantity │   │  name, phone    │       │
//! │  └────────▲────────┘   └────────▲────────┘   └────────┬────────┘       │
//! │           │ product_id          │ variant_id          │ snapshot       │
//! │  ┌────────┴─────────────────────┴──┐        ┌─────────▼────────┐       │
//! │  │          InvoiceItem            │───────►│     Invoice      │       │
//! │  │  qty, unit_price, discount      │        │  GST split       │       │
//! │  └─────────────────────────────────┘        │  status, paid    │       │
//! │                                             └─────────┬────────┘       │
//! │              ┌───────────────────┬────────────────────┤                │
//! │     ┌────────▼───────┐  ┌────────▼─────────┐  ┌───────▼──────────┐     │
//! │     │    Payment     │  │ DailyIncomeEntry │  │ EditHistoryEntry │     │
//! │     │  append-only   │  │  payment_date    │  │  old/new JSON    │     │
//! │     └────────────────┘  └──────────────────┘  └──────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Row structs keep money as raw `*_paise` integers (what the database
//! stores) and expose [`Money`] through accessor methods.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Percent
// =============================================================================

/// A percentage in basis points (1 bp = 0.01%).
///
/// Used for both discount percentages and GST rates. 1800 bps = 18%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percent(u32);

impl Percent {
    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Creates a percentage from a whole number (`18` → 18%).
    #[inline]
    pub const fn from_whole(pct: u32) -> Self {
        Percent(pct * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses a decimal percentage such as `"18"` or `"12.5"`.
    ///
    /// Two fractional digits are kept, a third rounds half up. Negative or
    /// malformed input yields `None`.
    pub fn parse(input: &str) -> Option<Percent> {
        let trimmed = input.trim().trim_end_matches('%').trim_end();
        // Same grammar as a rupee amount: both have two implied decimals.
        let as_hundredths = Money::parse(trimmed)?;
        if as_hundredths.is_negative() {
            return None;
        }
        u32::try_from(as_hundredths.paise()).ok().map(Percent)
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}%", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

// =============================================================================
// Tax Type
// =============================================================================

/// How GST is applied to the taxable amount.
///
/// ## Intra vs Inter State
/// ```text
/// Seller and buyer in the same state  → CGST_SGST (rate split in half)
/// Seller and buyer in different states → IGST      (full rate)
/// Exempt / unregistered                → NONE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxType {
    CgstSgst,
    Igst,
    None,
}

impl TaxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxType::CgstSgst => "CGST_SGST",
            TaxType::Igst => "IGST",
            TaxType::None => "NONE",
        }
    }
}

impl Default for TaxType {
    fn default() -> Self {
        TaxType::CgstSgst
    }
}

impl fmt::Display for TaxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace(['-', ' ', '+', '/'], "_").as_str() {
            "CGST_SGST" | "CGSTSGST" | "GST" => Ok(TaxType::CgstSgst),
            "IGST" => Ok(TaxType::Igst),
            "NONE" | "" => Ok(TaxType::None),
            _ => Err(ValidationError::NotAllowed {
                field: "tax_type".to_string(),
                allowed: vec!["CGST_SGST".into(), "IGST".into(), "NONE".into()],
            }),
        }
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Settlement status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Unpaid,
    Partial,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
        }
    }

    /// Position on the unpaid → partial → paid ladder.
    #[inline]
    pub const fn rank(&self) -> u8 {
        match self {
            InvoiceStatus::Unpaid => 0,
            InvoiceStatus::Partial => 1,
            InvoiceStatus::Paid => 2,
        }
    }

    /// True when moving from `self` to `target` walks down the ladder.
    #[inline]
    pub const fn is_downgrade_to(&self, target: InvoiceStatus) -> bool {
        target.rank() < self.rank()
    }
}

impl Default for InvoiceStatus {
    fn default() -> Self {
        InvoiceStatus::Unpaid
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unpaid" => Ok(InvoiceStatus::Unpaid),
            "partial" => Ok(InvoiceStatus::Partial),
            "paid" => Ok(InvoiceStatus::Paid),
            _ => Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec!["unpaid".into(), "partial".into(), "paid".into()],
            }),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// Payment methods offered at the billing counter.
///
/// Stored rows keep the method as free text, since storefront orders and
/// older rows carry values such as `gpay` or `neft`. See
/// [`crate::report::MethodGroup`] for how text is bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Upi,
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "upi" => Ok(PaymentMethod::Upi),
            "card" => Ok(PaymentMethod::Card),
            "bank" | "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_method".to_string(),
                allowed: vec!["cash".into(), "upi".into(), "card".into(), "bank_transfer".into()],
            }),
        }
    }
}

// =============================================================================
// Line Kind
// =============================================================================

/// Whether an invoice line is backed by a catalog product or typed freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Product,
    Manual,
}

// =============================================================================
// Catalog
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// List price in paise.
    pub price_paise: i64,
    /// Sale price in paise; wins over `price_paise` when set.
    pub offer_price_paise: Option<i64>,
    pub category: Option<String>,
    /// Tax classification code printed on invoice lines.
    pub hsn_code: Option<String>,
    /// Primary image.
    pub image_url: Option<String>,
    /// Remaining gallery images.
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub extra_image_urls: Vec<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub features: Vec<String>,
    pub ingredients: Option<String>,
    pub offers: Option<String>,
    /// Catalog-level stock figure (display only; billing uses variants).
    pub stock_quantity: i64,
    pub is_active: bool,
    pub featured: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }

    #[inline]
    pub fn offer_price(&self) -> Option<Money> {
        self.offer_price_paise.map(Money::from_paise)
    }

    /// The price a line is billed at: offer price if set, else list price.
    #[inline]
    pub fn selling_price(&self) -> Money {
        self.offer_price().unwrap_or_else(|| self.price())
    }
}

/// A size/color SKU under a product, with its own stock count.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductVariant {
    pub id: String,
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
    /// Optional price override in paise (informational; billing keeps the
    /// product price).
    pub price_paise: Option<i64>,
    pub stock_quantity: i64,
    pub image_url: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl ProductVariant {
    /// `"Red M"`, `"Red"`, `"M"` or empty.
    pub fn label(&self) -> String {
        [self.color.as_deref(), self.size.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Input for creating a product (admin form or CSV import).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_paise: i64,
    pub offer_price_paise: Option<i64>,
    pub category: Option<String>,
    pub hsn_code: Option<String>,
    pub image_url: Option<String>,
    pub extra_image_urls: Vec<String>,
    pub features: Vec<String>,
    pub ingredients: Option<String>,
    pub offers: Option<String>,
    pub stock_quantity: i64,
    pub is_active: bool,
    pub featured: bool,
}

/// Input for creating a variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewVariant {
    pub size: Option<String>,
    pub color: Option<String>,
    pub price_paise: Option<i64>,
    pub stock_quantity: i64,
    pub image_url: Option<String>,
}

// =============================================================================
// Customer
// =============================================================================

/// A customer record.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    /// Human-readable code, `CUST001`, `CUST002`, ...
    pub cust_id: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Customer's state, used to pick CGST/SGST vs IGST.
    pub state: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub state: Option<String>,
}

// =============================================================================
// Invoice
// =============================================================================

/// A committed invoice.
///
/// Customer fields are a snapshot taken at commit time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_state: Option<String>,
    pub reference_by: Option<String>,
    pub subtotal_paise: i64,
    pub total_discount_paise: i64,
    pub taxable_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub igst_paise: i64,
    pub tax_percent_bps: u32,
    pub tax_type: TaxType,
    pub grand_total_paise: i64,
    pub status: InvoiceStatus,
    pub paid_amount_paise: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn grand_total(&self) -> Money {
        Money::from_paise(self.grand_total_paise)
    }

    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_paise(self.paid_amount_paise)
    }

    /// Outstanding amount, never negative.
    #[inline]
    pub fn balance(&self) -> Money {
        (self.grand_total() - self.paid_amount()).non_negative()
    }

    #[inline]
    pub fn tax_percent(&self) -> Percent {
        Percent::from_bps(self.tax_percent_bps)
    }

    /// Calendar day the invoice was billed.
    #[inline]
    pub fn billed_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// A line on a committed invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub kind: LineKind,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub item_code: Option<String>,
    pub description: String,
    pub hsn_code: Option<String>,
    pub quantity: i64,
    pub unit_price_paise: i64,
    pub discount_percent_bps: u32,
    pub discount_amount_paise: i64,
    pub total_paise: i64,
}

impl InvoiceItem {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_paise(self.total_paise)
    }
}

// =============================================================================
// Payments & Income
// =============================================================================

/// An append-only payment log row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    /// Whole rupees, in paise.
    pub amount_paise: i64,
    pub payment_method: String,
    pub recorded_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paise(self.amount_paise)
    }
}

/// Money actually received on a calendar day, against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailyIncomeEntry {
    pub id: String,
    pub invoice_id: String,
    pub amount_paise: i64,
    pub payment_method: String,
    #[ts(as = "String")]
    pub payment_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl DailyIncomeEntry {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_paise(self.amount_paise)
    }
}

// =============================================================================
// Edit History
// =============================================================================

/// Kinds of audited invoice edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    /// A payment was appended.
    PaymentAdd,
    /// A discount was granted while settling.
    DiscountAdd,
    /// paid_amount/status were rewritten after a payment.
    InvoicePaidUpdate,
    /// Status was changed directly.
    StatusChange,
}

impl EditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditAction::PaymentAdd => "payment_add",
            EditAction::DiscountAdd => "discount_add",
            EditAction::InvoicePaidUpdate => "invoice_paid_update",
            EditAction::StatusChange => "status_change",
        }
    }
}

/// An audit row. Old/new values are JSON text.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct EditHistoryEntry {
    pub id: String,
    pub invoice_id: String,
    pub action_type: EditAction,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A history row waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub action: EditAction,
    pub old_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub reason: Option<String>,
}

impl HistoryRecord {
    pub fn new(action: EditAction) -> Self {
        HistoryRecord {
            action,
            old_values: None,
            new_values: None,
            reason: None,
        }
    }

    pub fn before(mut self, values: serde_json::Value) -> Self {
        self.old_values = Some(values);
        self
    }

    pub fn after(mut self, values: serde_json::Value) -> Self {
        self.new_values = Some(values);
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

// =============================================================================
// Sales Records (for inventory reports)
// =============================================================================

/// Where a sold-units row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SaleSource {
    /// Counter invoice line.
    Invoice,
    /// Storefront order line.
    Online,
}

/// One sold quantity of a product on a day.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleRecord {
    pub product_id: String,
    pub quantity: i64,
    pub source: SaleSource,
    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_parse_and_display() {
        assert_eq!(Percent::parse("18"), Some(Percent::from_bps(1800)));
        assert_eq!(Percent::parse("12.5%"), Some(Percent::from_bps(1250)));
        assert_eq!(Percent::parse("-5"), None);
        assert_eq!(Percent::parse("x"), None);

        assert_eq!(Percent::from_whole(18).to_string(), "18%");
        assert_eq!(Percent::from_bps(1250).to_string(), "12.5%");
        assert_eq!(Percent::from_bps(1205).to_string(), "12.05%");
    }

    #[test]
    fn test_status_downgrades() {
        use InvoiceStatus::*;
        assert!(Paid.is_downgrade_to(Partial));
        assert!(Paid.is_downgrade_to(Unpaid));
        assert!(Partial.is_downgrade_to(Unpaid));
        assert!(!Unpaid.is_downgrade_to(Paid));
        assert!(!Partial.is_downgrade_to(Partial));
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("PAID".parse::<InvoiceStatus>().unwrap(), InvoiceStatus::Paid);
        assert!("settled".parse::<InvoiceStatus>().is_err());
        assert_eq!("cgst_sgst".parse::<TaxType>().unwrap(), TaxType::CgstSgst);
        assert_eq!("IGST".parse::<TaxType>().unwrap(), TaxType::Igst);
        assert_eq!("bank".parse::<PaymentMethod>().unwrap(), PaymentMethod::BankTransfer);
    }

    #[test]
    fn test_tax_type_serializes_like_stored_text() {
        let json = serde_json::to_string(&TaxType::CgstSgst).unwrap();
        assert_eq!(json, "\"CGST_SGST\"");
    }

    #[test]
    fn test_variant_label() {
        let variant = ProductVariant {
            id: "v1".into(),
            product_id: "p1".into(),
            size: Some("M".into()),
            color: Some("Red".into()),
            price_paise: None,
            stock_quantity: 3,
            image_url: None,
            created_at: Utc::now(),
        };
        assert_eq!(variant.label(), "Red M");

        let size_only = ProductVariant { color: None, ..variant };
        assert_eq!(size_only.label(), "M");
    }
}
