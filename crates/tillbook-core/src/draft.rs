//! # Invoice Draft
//!
//! The not-yet-committed invoice on the billing form, and the calculator
//! that derives its totals.
//!
//! ## Recalculation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Every Edit Recomputes                               │
//! │                                                                         │
//! │  update_line / select_product / set_tax_* / remove_line                 │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  DraftLine::recompute()                                                 │
//! │    discount sync (last edited field wins)                               │
//! │    total = max(0, (unit − discount_amount) × qty)                       │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  InvoiceDraft::totals()                                                 │
//! │    subtotal ─► total_discount ─► taxable ─► GST split ─► grand_total    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  Settlement::set_grand_total()   (paid amount follows the status)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All amounts are [`Money`]; there is no floating point anywhere in the
//! calculation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::settlement::Settlement;
use crate::stock::{self, StockDeduction};
use crate::tax::TaxBreakdown;
use crate::types::{
    Customer, InvoiceStatus, LineKind, PaymentMethod, Percent, Product, ProductVariant, TaxType,
};
use crate::validation::{
    validate_customer_name, validate_line_count, validate_percent_bps, validate_quantity, ValidationResult,
};
use crate::{DEFAULT_TAX_PERCENT_BPS, MAX_UNIT_PRICE_PAISE};

// =============================================================================
// Line Fields
// =============================================================================

/// Which of the two discount inputs the user touched last.
///
/// The authoritative side is kept; the other is derived from it whenever
/// the unit price changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountSource {
    #[default]
    Percent,
    Amount,
}

/// An editable cell on a draft line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LineField {
    ItemCode,
    Description,
    HsnCode,
    Quantity,
    UnitPrice,
    DiscountPercent,
    DiscountAmount,
}

impl LineField {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineField::ItemCode => "item_code",
            LineField::Description => "description",
            LineField::HsnCode => "hsn_code",
            LineField::Quantity => "quantity",
            LineField::UnitPrice => "unit_price",
            LineField::DiscountPercent => "discount_percent",
            LineField::DiscountAmount => "discount_amount",
        }
    }
}

impl fmt::Display for LineField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "item_code" => Ok(LineField::ItemCode),
            "description" => Ok(LineField::Description),
            "hsn_code" => Ok(LineField::HsnCode),
            "quantity" => Ok(LineField::Quantity),
            "unit_price" => Ok(LineField::UnitPrice),
            "discount_percent" => Ok(LineField::DiscountPercent),
            "discount_amount" => Ok(LineField::DiscountAmount),
            _ => Err(ValidationError::NotAllowed {
                field: "field".to_string(),
                allowed: [
                    "item_code",
                    "description",
                    "hsn_code",
                    "quantity",
                    "unit_price",
                    "discount_percent",
                    "discount_amount",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            }),
        }
    }
}

// =============================================================================
// Form Input Parsing
// =============================================================================

/// Whole units from form text. Fractions are floored; invalid or negative
/// input becomes 0.
fn parse_quantity(raw: &str) -> i64 {
    Money::parse(raw)
        .map(|m| m.paise().div_euclid(100))
        .unwrap_or(0)
        .max(0)
}

/// Rupee amount from form text, capped at [`MAX_UNIT_PRICE_PAISE`].
fn parse_amount(raw: &str, field: &str) -> ValidationResult<Money> {
    let amount = Money::parse(raw).unwrap_or_default().non_negative();
    if amount.paise() > MAX_UNIT_PRICE_PAISE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_UNIT_PRICE_PAISE,
        });
    }
    Ok(amount)
}

/// Discount percentage from form text, at most 100%.
fn parse_discount_percent(raw: &str) -> Percent {
    Percent::parse(raw).unwrap_or_default().min(Percent::from_whole(100))
}

/// Percentage that `amount` is of `unit`, rounded to the basis point.
fn percent_of(amount: Money, unit: Money) -> Percent {
    if !unit.is_positive() {
        return Percent::zero();
    }
    let unit = unit.paise() as i128;
    let bps = (amount.paise().max(0) as i128 * 10_000 + unit / 2) / unit;
    Percent::from_bps(bps.min(u32::MAX as i128) as u32)
}

// =============================================================================
// Draft Line
// =============================================================================

/// One line on the billing form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftLine {
    pub kind: LineKind,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub item_code: String,
    pub description: String,
    pub hsn_code: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount_percent: Percent,
    pub discount_amount: Money,
    /// Derived: `max(0, (unit_price − discount_amount) × quantity)`.
    pub total: Money,
    pub discount_source: DiscountSource,
}

impl DraftLine {
    /// A blank line of the given kind, quantity 1.
    pub fn new(kind: LineKind) -> Self {
        DraftLine {
            kind,
            product_id: None,
            variant_id: None,
            item_code: String::new(),
            description: String::new(),
            hsn_code: String::new(),
            quantity: 1,
            unit_price: Money::zero(),
            discount_percent: Percent::zero(),
            discount_amount: Money::zero(),
            total: Money::zero(),
            discount_source: DiscountSource::Percent,
        }
    }

    /// Applies one raw form value and recomputes the line.
    ///
    /// ## Errors
    /// * `ValidationError::OutOfRange` - quantity above [`crate::MAX_LINE_QUANTITY`],
    ///   or a price or discount amount above [`MAX_UNIT_PRICE_PAISE`]. The line
    ///   is left as it was.
    pub fn update(&mut self, field: LineField, raw: &str) -> ValidationResult<()> {
        match field {
            LineField::ItemCode => self.item_code = raw.to_string(),
            LineField::Description => self.description = raw.to_string(),
            LineField::HsnCode => self.hsn_code = raw.to_string(),
            LineField::Quantity => {
                let quantity = parse_quantity(raw);
                validate_quantity(quantity)?;
                self.quantity = quantity;
            }
            LineField::UnitPrice => self.unit_price = parse_amount(raw, "unit_price")?,
            LineField::DiscountPercent => {
                self.discount_percent = parse_discount_percent(raw);
                self.discount_source = DiscountSource::Percent;
            }
            LineField::DiscountAmount => {
                self.discount_amount = parse_amount(raw, "discount_amount")?;
                self.discount_source = DiscountSource::Amount;
            }
        }
        self.recompute();
        Ok(())
    }

    /// Re-derives the non-authoritative discount field and the line total.
    pub fn recompute(&mut self) {
        match self.discount_source {
            DiscountSource::Percent => {
                self.discount_amount = self.unit_price.percent(self.discount_percent);
            }
            DiscountSource::Amount => {
                self.discount_percent = percent_of(self.discount_amount, self.unit_price);
            }
        }
        self.total = ((self.unit_price - self.discount_amount) * self.quantity).non_negative();
    }

    /// Per-unit discount used by the invoice totals: the amount when set,
    /// otherwise the percentage of the unit price.
    pub fn effective_discount(&self) -> Money {
        if self.discount_amount.is_positive() {
            self.discount_amount
        } else {
            self.unit_price.percent(self.discount_percent)
        }
    }

    #[inline]
    pub fn gross(&self) -> Money {
        self.unit_price * self.quantity
    }

    /// Fills the line from a catalog product.
    ///
    /// Price is the offer price when present. The variant is cleared.
    pub fn apply_product(&mut self, product: &Product) {
        self.product_id = Some(product.id.clone());
        self.variant_id = None;
        self.item_code = product.name.clone();
        self.description = product.name.clone();
        self.hsn_code = product.hsn_code.clone().unwrap_or_default();
        self.unit_price = product.selling_price();
        if self.discount_source == DiscountSource::Percent && !self.discount_percent.is_zero() {
            self.discount_amount = self.unit_price.percent(self.discount_percent);
        }
        self.recompute();
    }

    /// Tags the line with a variant. The description becomes
    /// `"{base} ({color} {size})"`; the price is left alone.
    pub fn apply_variant(&mut self, variant: &ProductVariant) {
        let base = self
            .description
            .split(" (")
            .next()
            .unwrap_or_default()
            .to_string();
        self.description = format!("{} ({})", base, variant.label());
        self.variant_id = Some(variant.id.clone());
    }

    /// Line text used in stock messages.
    pub fn display_name(&self) -> &str {
        if self.description.trim().is_empty() {
            self.item_code.as_str()
        } else {
            self.description.as_str()
        }
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Derived totals of a draft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceTotals {
    /// Σ unit × qty
    pub subtotal: Money,
    /// Σ effective discount × qty
    pub total_discount: Money,
    /// max(0, subtotal − total_discount)
    pub taxable: Money,
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
    pub grand_total: Money,
}

impl InvoiceTotals {
    /// Computes totals for `lines` under the given tax settings.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::draft::{DraftLine, InvoiceTotals, LineField};
    /// use tillbook_core::money::Money;
    /// use tillbook_core::types::{LineKind, Percent, TaxType};
    ///
    /// let mut line = DraftLine::new(LineKind::Manual);
    /// line.update(LineField::UnitPrice, "1000").unwrap();
    ///
    /// let totals = InvoiceTotals::compute(&[line], TaxType::CgstSgst, Percent::from_whole(18));
    /// assert_eq!(totals.cgst, Money::from_rupees(90));
    /// assert_eq!(totals.grand_total, Money::from_rupees(1180));
    /// ```
    pub fn compute(lines: &[DraftLine], tax_type: TaxType, tax_percent: Percent) -> Self {
        let subtotal: Money = lines.iter().map(DraftLine::gross).sum();
        let total_discount: Money = lines
            .iter()
            .map(|line| line.effective_discount() * line.quantity)
            .sum();
        let taxable = (subtotal - total_discount).non_negative();
        let tax = TaxBreakdown::compute(taxable, tax_type, tax_percent);

        InvoiceTotals {
            subtotal,
            total_discount,
            taxable,
            cgst: tax.cgst,
            sgst: tax.sgst,
            igst: tax.igst,
            grand_total: taxable + tax.total(),
        }
    }
}

// =============================================================================
// Invoice Draft
// =============================================================================

/// Customer fields copied onto the invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftCustomer {
    pub customer_id: Option<String>,
    pub name: String,
    pub phone: String,
    pub state: String,
    pub reference_by: String,
}

/// An invoice being edited.
///
/// ## Invariants
/// - every line's `total` matches its inputs
/// - the settlement's grand total matches [`InvoiceDraft::totals`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceDraft {
    pub customer: DraftCustomer,
    pub payment_method: PaymentMethod,
    tax_type: TaxType,
    tax_percent: Percent,
    lines: Vec<DraftLine>,
    settlement: Settlement,
}

impl Default for InvoiceDraft {
    fn default() -> Self {
        InvoiceDraft::new(
            TaxType::default(),
            Percent::from_bps(DEFAULT_TAX_PERCENT_BPS),
            PaymentMethod::default(),
        )
    }
}

impl InvoiceDraft {
    /// An empty draft with the store's billing defaults.
    pub fn new(tax_type: TaxType, tax_percent: Percent, payment_method: PaymentMethod) -> Self {
        InvoiceDraft {
            customer: DraftCustomer::default(),
            payment_method,
            tax_type,
            tax_percent,
            lines: Vec::new(),
            settlement: Settlement::new(Money::zero()),
        }
    }

    #[inline]
    pub fn lines(&self) -> &[DraftLine] {
        &self.lines
    }

    #[inline]
    pub fn tax_type(&self) -> TaxType {
        self.tax_type
    }

    #[inline]
    pub fn tax_percent(&self) -> Percent {
        self.tax_percent
    }

    #[inline]
    pub fn settlement(&self) -> &Settlement {
        &self.settlement
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals::compute(&self.lines, self.tax_type, self.tax_percent)
    }

    fn resync(&mut self) {
        let grand_total = self.totals().grand_total;
        self.settlement.set_grand_total(grand_total);
    }

    fn line_mut(&mut self, index: usize) -> CoreResult<&mut DraftLine> {
        let len = self.lines.len();
        self.lines
            .get_mut(index)
            .ok_or(CoreError::LineNotFound { index, len })
    }

    // =========================================================================
    // Lines
    // =========================================================================

    /// Appends a blank line and returns its index.
    pub fn add_line(&mut self, kind: LineKind) -> CoreResult<usize> {
        validate_line_count(self.lines.len())?;
        self.lines.push(DraftLine::new(kind));
        self.resync();
        Ok(self.lines.len() - 1)
    }

    pub fn remove_line(&mut self, index: usize) -> CoreResult<DraftLine> {
        if index >= self.lines.len() {
            return Err(CoreError::LineNotFound {
                index,
                len: self.lines.len(),
            });
        }
        let removed = self.lines.remove(index);
        self.resync();
        Ok(removed)
    }

    /// Sets one cell of a line from raw form input.
    pub fn update_line(&mut self, index: usize, field: LineField, raw: &str) -> CoreResult<()> {
        self.line_mut(index)?.update(field, raw)?;
        self.resync();
        Ok(())
    }

    pub fn select_product(&mut self, index: usize, product: &Product) -> CoreResult<()> {
        self.line_mut(index)?.apply_product(product);
        self.resync();
        Ok(())
    }

    /// Attaches a variant of the line's product.
    pub fn select_variant(&mut self, index: usize, variant: &ProductVariant) -> CoreResult<()> {
        let line = self.line_mut(index)?;
        if line.product_id.as_deref() != Some(variant.product_id.as_str()) {
            return Err(CoreError::VariantNotFound(variant.id.clone()));
        }
        line.apply_variant(variant);
        Ok(())
    }

    // =========================================================================
    // Tax, customer, settlement
    // =========================================================================

    pub fn set_tax_type(&mut self, tax_type: TaxType) {
        self.tax_type = tax_type;
        self.resync();
    }

    pub fn set_tax_percent(&mut self, tax_percent: Percent) -> CoreResult<()> {
        validate_percent_bps(tax_percent.bps(), "tax_percent")?;
        self.tax_percent = tax_percent;
        self.resync();
        Ok(())
    }

    /// Copies a saved customer into the snapshot fields.
    pub fn select_customer(&mut self, customer: &Customer) {
        self.customer.customer_id = Some(customer.id.clone());
        self.customer.name = customer.name.clone();
        self.customer.phone = customer.phone.clone().unwrap_or_default();
        self.customer.state = customer.state.clone().unwrap_or_default();
    }

    pub fn set_payment_status(&mut self, status: InvoiceStatus) {
        self.settlement.set_status(status);
    }

    pub fn set_paid_amount(&mut self, amount: Money) {
        self.settlement.set_paid_amount(amount);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Presence checks done before anything is written.
    pub fn validate(&self) -> CoreResult<()> {
        validate_customer_name(&self.customer.name)?;
        if self.lines.is_empty() {
            return Err(CoreError::EmptyInvoice);
        }
        Ok(())
    }

    /// Clears customer, lines and payment. Tax settings and payment method
    /// stay as they were.
    pub fn reset(&mut self) {
        self.customer = DraftCustomer::default();
        self.lines.clear();
        self.settlement = Settlement::new(Money::zero());
    }

    /// Validates the draft and turns it into everything the commit needs.
    pub fn prepare_commit(&self) -> CoreResult<CommitPlan> {
        self.validate()?;

        let totals = self.totals();
        let settlement = self.settlement;
        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };

        let header = InvoiceHeader {
            customer_id: self.customer.customer_id.clone(),
            customer_name: self.customer.name.trim().to_string(),
            customer_phone: non_empty(&self.customer.phone),
            customer_state: non_empty(&self.customer.state),
            reference_by: non_empty(&self.customer.reference_by),
            totals,
            tax_type: self.tax_type,
            tax_percent: self.tax_percent,
            status: settlement.status(),
            paid_amount: settlement.paid_amount(),
        };

        let items = self
            .lines
            .iter()
            .map(|line| PlannedItem {
                kind: line.kind,
                product_id: line.product_id.clone(),
                variant_id: line.variant_id.clone(),
                item_code: non_empty(&line.item_code),
                description: line.description.trim().to_string(),
                hsn_code: non_empty(&line.hsn_code),
                quantity: line.quantity,
                unit_price: line.unit_price,
                discount_percent: line.discount_percent,
                discount_amount: line.discount_amount,
                total: line.total,
            })
            .collect();

        let recorded = settlement.paid_amount().floor_rupee();
        let initial_payment = recorded.is_positive().then_some(InitialPayment {
            amount: recorded,
            method: self.payment_method,
        });

        Ok(CommitPlan {
            header,
            items,
            deductions: stock::deductions(&self.lines),
            initial_payment,
        })
    }
}

// =============================================================================
// Commit Plan
// =============================================================================

/// Invoice columns computed from a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceHeader {
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub customer_state: Option<String>,
    pub reference_by: Option<String>,
    pub totals: InvoiceTotals,
    pub tax_type: TaxType,
    pub tax_percent: Percent,
    pub status: InvoiceStatus,
    pub paid_amount: Money,
}

/// An item row to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub kind: LineKind,
    pub product_id: Option<String>,
    pub variant_id: Option<String>,
    pub item_code: Option<String>,
    pub description: String,
    pub hsn_code: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount_percent: Percent,
    pub discount_amount: Money,
    pub total: Money,
}

/// Payment taken at the counter when the invoice is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialPayment {
    /// Whole rupees.
    pub amount: Money,
    pub method: PaymentMethod,
}

/// Everything one commit transaction writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPlan {
    pub header: InvoiceHeader,
    pub items: Vec<PlannedItem>,
    pub deductions: Vec<StockDeduction>,
    pub initial_payment: Option<InitialPayment>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, price: i64, offer: Option<i64>) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Frame {}", id),
            description: None,
            price_paise: price,
            offer_price_paise: offer,
            category: None,
            hsn_code: Some("9003".to_string()),
            image_url: None,
            extra_image_urls: Vec::new(),
            features: Vec::new(),
            ingredients: None,
            offers: None,
            stock_quantity: 0,
            is_active: true,
            featured: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn variant(id: &str, product_id: &str) -> ProductVariant {
        ProductVariant {
            id: id.to_string(),
            product_id: product_id.to_string(),
            size: Some("M".to_string()),
            color: Some("Black".to_string()),
            price_paise: None,
            stock_quantity: 4,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    fn draft_with_line(unit: &str, qty: &str) -> InvoiceDraft {
        let mut draft = InvoiceDraft::default();
        draft.customer.name = "Asha".to_string();
        let i = draft.add_line(LineKind::Manual).unwrap();
        draft.update_line(i, LineField::UnitPrice, unit).unwrap();
        draft.update_line(i, LineField::Quantity, qty).unwrap();
        draft
    }

    #[test]
    fn test_new_line_defaults() {
        let line = DraftLine::new(LineKind::Product);
        assert_eq!(line.quantity, 1);
        assert!(line.total.is_zero());
    }

    #[test]
    fn test_line_total_formula() {
        let mut line = DraftLine::new(LineKind::Manual);
        line.update(LineField::UnitPrice, "1000").unwrap();
        line.update(LineField::Quantity, "2").unwrap();
        line.update(LineField::DiscountPercent, "10").unwrap();

        assert_eq!(line.discount_amount, Money::from_rupees(100));
        assert_eq!(line.total, Money::from_rupees(1800));
    }

    #[test]
    fn test_quantity_above_cap_rejected() {
        let mut draft = draft_with_line("1000", "2");
        let before = draft.totals();

        let err = draft.update_line(0, LineField::Quantity, "100000").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { max: crate::MAX_LINE_QUANTITY, .. })
        ));
        assert!(draft.update_line(0, LineField::Quantity, "1000000000").is_err());

        assert_eq!(draft.lines[0].quantity, 2);
        assert_eq!(draft.totals(), before);
    }

    #[test]
    fn test_price_above_cap_rejected() {
        let mut draft = draft_with_line("1000", "2");

        assert!(draft.update_line(0, LineField::UnitPrice, "100000000").is_err());
        assert!(draft.update_line(0, LineField::DiscountAmount, "100000000").is_err());
        assert_eq!(draft.lines[0].unit_price, Money::from_rupees(1000));
        assert!(draft.lines[0].discount_amount.is_zero());
    }

    #[test]
    fn test_largest_line_totals_exactly() {
        // ₹1,00,00,000 × 99999 units
        let draft = draft_with_line("10000000", "99999");
        let totals = draft.totals();

        assert_eq!(draft.lines[0].total.paise(), 99_999_000_000_000);
        assert_eq!(totals.cgst.paise(), 8_999_910_000_000);
        assert_eq!(totals.grand_total.paise(), 117_998_820_000_000);
    }

    #[test]
    fn test_discount_percent_capped_at_hundred() {
        let mut line = DraftLine::new(LineKind::Manual);
        line.update(LineField::UnitPrice, "500").unwrap();
        line.update(LineField::DiscountPercent, "250").unwrap();

        assert_eq!(line.discount_percent, Percent::from_whole(100));
        assert_eq!(line.discount_amount, Money::from_rupees(500));
        assert!(line.total.is_zero());
    }

    #[test]
    fn test_discount_above_price_clamps_total() {
        let mut line = DraftLine::new(LineKind::Manual);
        line.update(LineField::UnitPrice, "100").unwrap();
        line.update(LineField::DiscountAmount, "150").unwrap();
        assert!(line.total.is_zero());
        assert_eq!(line.discount_percent, Percent::from_whole(150));
    }

    #[test]
    fn test_discount_amount_derives_percent() {
        let mut line = DraftLine::new(LineKind::Manual);
        line.update(LineField::UnitPrice, "300").unwrap();
        line.update(LineField::DiscountAmount, "100").unwrap();
        // 33.333...% → 33.33%
        assert_eq!(line.discount_percent, Percent::from_bps(3333));
        assert_eq!(line.discount_source, DiscountSource::Amount);
    }

    #[test]
    fn test_zero_price_guards_percent() {
        let mut line = DraftLine::new(LineKind::Manual);
        line.update(LineField::DiscountAmount, "50").unwrap();
        assert!(line.discount_percent.is_zero());
    }

    #[test]
    fn test_price_change_follows_authoritative_discount() {
        let mut line = DraftLine::new(LineKind::Manual);
        line.update(LineField::UnitPrice, "200").unwrap();
        line.update(LineField::DiscountPercent, "10").unwrap();
        line.update(LineField::UnitPrice, "500").unwrap();
        assert_eq!(line.discount_amount, Money::from_rupees(50));

        line.update(LineField::DiscountAmount, "100").unwrap();
        line.update(LineField::UnitPrice, "1000").unwrap();
        assert_eq!(line.discount_amount, Money::from_rupees(100));
        assert_eq!(line.discount_percent, Percent::from_whole(10));
    }

    #[test]
    fn test_invalid_input_becomes_zero() {
        let mut line = DraftLine::new(LineKind::Manual);
        line.update(LineField::Quantity, "abc").unwrap();
        assert_eq!(line.quantity, 0);
        line.update(LineField::Quantity, "-3").unwrap();
        assert_eq!(line.quantity, 0);
        line.update(LineField::Quantity, "2.9").unwrap();
        assert_eq!(line.quantity, 2);
        line.update(LineField::UnitPrice, "-10").unwrap();
        assert!(line.unit_price.is_zero());
    }

    #[test]
    fn test_totals_cgst_sgst() {
        let mut draft = draft_with_line("1000", "2");
        draft.update_line(0, LineField::DiscountPercent, "10").unwrap();

        let totals = draft.totals();
        assert_eq!(totals.subtotal, Money::from_rupees(2000));
        assert_eq!(totals.total_discount, Money::from_rupees(200));
        assert_eq!(totals.taxable, Money::from_rupees(1800));
        assert_eq!(totals.cgst, Money::from_rupees(162));
        assert_eq!(totals.sgst, Money::from_rupees(162));
        assert!(totals.igst.is_zero());
        assert_eq!(totals.grand_total, Money::from_rupees(2124));
    }

    #[test]
    fn test_totals_igst_and_none() {
        let mut draft = draft_with_line("1000", "1");

        draft.set_tax_type(TaxType::Igst);
        let igst = draft.totals();
        assert_eq!(igst.igst, Money::from_rupees(180));
        assert_eq!(igst.grand_total, igst.taxable + igst.cgst + igst.sgst + igst.igst);

        draft.set_tax_type(TaxType::None);
        let none = draft.totals();
        assert!(none.cgst.is_zero() && none.sgst.is_zero() && none.igst.is_zero());
        assert_eq!(none.grand_total, none.taxable);
    }

    #[test]
    fn test_select_product_uses_offer_price() {
        let mut draft = InvoiceDraft::default();
        draft.add_line(LineKind::Product).unwrap();
        draft.update_line(0, LineField::DiscountPercent, "10").unwrap();
        draft
            .select_product(0, &product("p1", 100_000, Some(80_000)))
            .unwrap();

        let line = &draft.lines()[0];
        assert_eq!(line.unit_price, Money::from_rupees(800));
        assert_eq!(line.discount_amount, Money::from_rupees(80));
        assert_eq!(line.hsn_code, "9003");
        assert_eq!(line.description, "Frame p1");
        assert!(line.variant_id.is_none());
    }

    #[test]
    fn test_select_variant_rewrites_description() {
        let mut draft = InvoiceDraft::default();
        draft.add_line(LineKind::Product).unwrap();
        draft.select_product(0, &product("p1", 100_000, None)).unwrap();
        draft.select_variant(0, &variant("v1", "p1")).unwrap();
        draft.select_variant(0, &variant("v2", "p1")).unwrap();

        let line = &draft.lines()[0];
        assert_eq!(line.description, "Frame p1 (Black M)");
        assert_eq!(line.variant_id.as_deref(), Some("v2"));
        assert_eq!(line.unit_price, Money::from_rupees(1000));
    }

    #[test]
    fn test_select_variant_of_other_product_fails() {
        let mut draft = InvoiceDraft::default();
        draft.add_line(LineKind::Product).unwrap();
        draft.select_product(0, &product("p1", 100, None)).unwrap();
        assert!(matches!(
            draft.select_variant(0, &variant("v9", "p2")),
            Err(CoreError::VariantNotFound(_))
        ));
    }

    #[test]
    fn test_settlement_follows_totals() {
        let mut draft = draft_with_line("1000", "1");
        draft.set_tax_type(TaxType::None);
        draft.set_payment_status(InvoiceStatus::Paid);
        assert_eq!(draft.settlement().paid_amount(), Money::from_rupees(1000));

        draft.update_line(0, LineField::Quantity, "2").unwrap();
        assert_eq!(draft.settlement().paid_amount(), Money::from_rupees(2000));
    }

    #[test]
    fn test_partial_overpay_scenario() {
        let mut draft = draft_with_line("1000", "1");
        draft.set_tax_type(TaxType::None);
        draft.set_payment_status(InvoiceStatus::Partial);
        draft.set_paid_amount(Money::from_rupees(1200));

        assert_eq!(draft.settlement().paid_amount(), Money::from_rupees(1000));
        assert_eq!(draft.settlement().status(), InvoiceStatus::Paid);
    }

    #[test]
    fn test_remove_line_out_of_range() {
        let mut draft = InvoiceDraft::default();
        assert!(matches!(
            draft.remove_line(0),
            Err(CoreError::LineNotFound { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_validate_requires_name_and_lines() {
        let mut draft = InvoiceDraft::default();
        assert!(matches!(draft.validate(), Err(CoreError::Validation(_))));

        draft.customer.name = "Asha".to_string();
        assert!(matches!(draft.validate(), Err(CoreError::EmptyInvoice)));
    }

    #[test]
    fn test_prepare_commit_floors_initial_payment() {
        let mut draft = draft_with_line("999.50", "1");
        draft.set_tax_type(TaxType::None);
        draft.set_payment_status(InvoiceStatus::Paid);

        let plan = draft.prepare_commit().unwrap();
        assert_eq!(plan.header.paid_amount, Money::from_paise(99_950));
        assert_eq!(
            plan.initial_payment.map(|p| p.amount),
            Some(Money::from_rupees(999))
        );
        assert!(plan.deductions.is_empty());
        assert_eq!(plan.items[0].item_code, None);
    }

    #[test]
    fn test_reset_keeps_tax_settings() {
        let mut draft = draft_with_line("10", "1");
        draft.set_tax_type(TaxType::Igst);
        draft.reset();
        assert!(draft.lines().is_empty());
        assert!(draft.customer.name.is_empty());
        assert_eq!(draft.tax_type(), TaxType::Igst);
    }

    #[test]
    fn test_line_field_parse() {
        assert_eq!("unit_price".parse::<LineField>().unwrap(), LineField::UnitPrice);
        assert!("price".parse::<LineField>().is_err());
    }
}
