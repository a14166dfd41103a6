//! # Money Module
//!
//! Provides the `Money` type for rupee amounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Summing 40 invoice lines of ₹0.10 in floating point drifts:            │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  A GST split applied per invoice then rounded ad hoc:                   │
//! │    ₹99.99 × 9% = 8.9991 → 9.00 (twice) while 18% = 17.9982 → 18.00      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    Every amount is an i64 count of paise (1/100 rupee).                 │
//! │    Rounding happens once, at a named operation, half away from zero.    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillbook_core::money::Money;
//! use tillbook_core::types::Percent;
//!
//! let price = Money::from_paise(49_900); // ₹499.00
//! let gst = price.percent(Percent::from_bps(1800));
//! assert_eq!(gst.paise(), 8_982); // ₹89.82
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Percent;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (the smallest rupee unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction such as `subtotal - discount` may dip
///   below zero before it is clamped
/// - **Single field tuple struct**: zero-cost wrapper over i64
/// - **Saturating operators**: `+`, `-`, `×` and `sum` stop at the i64
///   bounds instead of wrapping
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.offer_price ──► DraftLine.unit_price ──► DraftLine.total       │
/// │                                                                         │
/// │  Σ lines ──► subtotal ──► taxable ──► CGST/SGST/IGST ──► grand_total    │
/// │                                                                         │
/// │  grand_total ──► Settlement.paid_amount ──► Payment.amount ──► reports  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// let price = Money::from_paise(1099); // ₹10.99
    /// assert_eq!(price.paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// For negative amounts only the rupee part carries the sign:
    /// `from_rupees_paise(-5, 50)` is -₹5.50.
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion (truncated toward zero).
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(-250).non_negative(), Money::zero());
    /// assert_eq!(Money::from_paise(250).non_negative().paise(), 250);
    /// ```
    #[inline]
    pub fn non_negative(self) -> Self {
        self.max(Money::zero())
    }

    /// Drops the paise, keeping whole rupees (floor for positive amounts).
    ///
    /// Recorded payments are logged in whole rupees.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(118_099).floor_rupee().paise(), 118_000);
    /// ```
    #[inline]
    pub const fn floor_rupee(&self) -> Self {
        Money(self.0.div_euclid(100) * 100)
    }

    /// Applies a percentage and rounds half away from zero to the paisa.
    ///
    /// ## Implementation
    /// Integer math: `(|amount| * bps + 5000) / 10000`, sign re-applied.
    /// i128 keeps large invoices from overflowing.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    /// use tillbook_core::types::Percent;
    ///
    /// let taxable = Money::from_paise(1000); // ₹10.00
    /// let tax = taxable.percent(Percent::from_bps(825)); // 8.25%
    /// assert_eq!(tax.paise(), 83); // ₹0.825 → ₹0.83
    /// ```
    pub fn percent(&self, rate: Percent) -> Money {
        self.percent_split(rate, 1)
    }

    /// Applies `rate / parts` and rounds half away from zero.
    ///
    /// Used for CGST/SGST where each half is `taxable × (rate/2)`.
    /// Dividing inside the rounding keeps odd basis-point rates exact:
    /// 5% split in two is 2.5% each, not 2% + 3%.
    pub fn percent_split(&self, rate: Percent, parts: u32) -> Money {
        let parts = parts.max(1) as i128;
        let denominator = 10_000 * parts;
        let magnitude = self.0.unsigned_abs() as i128 * rate.bps() as i128;
        let rounded = (magnitude + denominator / 2) / denominator;
        let signed = if self.0 < 0 { -rounded } else { rounded };
        Money(i64::try_from(signed).unwrap_or(if signed < 0 { i64::MIN } else { i64::MAX }))
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// let unit_price = Money::from_paise(29_900); // ₹299.00
    /// assert_eq!(unit_price.multiply_quantity(3).paise(), 89_700);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Parses a decimal rupee amount as typed into a form or a CSV cell.
    ///
    /// Accepts an optional leading `-` or `₹`, digits, and an optional
    /// fractional part. A third fractional digit rounds the paisa half up;
    /// further digits are ignored. Returns `None` for anything else.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    ///
    /// assert_eq!(Money::parse("499").map(|m| m.paise()), Some(49_900));
    /// assert_eq!(Money::parse("12.5").map(|m| m.paise()), Some(1_250));
    /// assert_eq!(Money::parse("0.125").map(|m| m.paise()), Some(13));
    /// assert_eq!(Money::parse("abc"), None);
    /// ```
    pub fn parse(input: &str) -> Option<Money> {
        let trimmed = input.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let rest = rest.strip_prefix('₹').unwrap_or(rest).trim_start();

        let (whole, fraction) = match rest.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (rest, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(fraction) {
            return None;
        }

        let rupees: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let digits: Vec<i64> = fraction
            .bytes()
            .take(3)
            .map(|b| (b - b'0') as i64)
            .collect();
        let digit = |i: usize| digits.get(i).copied().unwrap_or(0);
        let mut paise = digit(0) * 10 + digit(1);
        if digit(2) >= 5 {
            paise += 1;
        }

        let total = rupees.checked_mul(100)?.checked_add(paise)?;
        Some(Money(if negative { -total } else { total }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows money as `₹1234.50`.
///
/// ## Note
/// No digit grouping. Print layouts format for themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.paise(), 1099);
        assert_eq!(money.rupees(), 10);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_from_rupees_paise() {
        assert_eq!(Money::from_rupees_paise(10, 99).paise(), 1099);
        assert_eq!(Money::from_rupees_paise(-5, 50).paise(), -550);
        assert_eq!(Money::from_rupees(12).paise(), 1200);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(1099).to_string(), "₹10.99");
        assert_eq!(Money::from_paise(500).to_string(), "₹5.00");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((a * 3).paise(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.paise(), 2000);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let huge = Money::from_paise(i64::MAX / 2);

        assert_eq!((huge * 3).paise(), i64::MAX);
        assert_eq!((Money::from_paise(-2) * i64::MAX).paise(), i64::MIN);
        assert_eq!((huge + huge + huge).paise(), i64::MAX);
        assert_eq!((Money::from_paise(i64::MIN) - Money::from_paise(1)).paise(), i64::MIN);

        let total: Money = vec![huge, huge, huge].into_iter().sum();
        assert_eq!(total.paise(), i64::MAX);
    }

    #[test]
    fn test_percent_of_huge_amount_saturates() {
        let rate = Percent::from_bps(u32::MAX);
        assert_eq!(Money::from_paise(i64::MAX).percent(rate).paise(), i64::MAX);
        assert_eq!(Money::from_paise(i64::MIN).percent(rate).paise(), i64::MIN);
    }

    #[test]
    fn test_percent_rounds_half_away_from_zero() {
        let amount = Money::from_paise(1000);
        assert_eq!(amount.percent(Percent::from_bps(1000)).paise(), 100);
        assert_eq!(amount.percent(Percent::from_bps(825)).paise(), 83);
        assert_eq!(Money::from_paise(-1000).percent(Percent::from_bps(825)).paise(), -83);
    }

    #[test]
    fn test_percent_split_halves_odd_rates() {
        // 5% split in two = 2.5% each on ₹100.00
        let taxable = Money::from_paise(10_000);
        let half = taxable.percent_split(Percent::from_bps(500), 2);
        assert_eq!(half.paise(), 250);
    }

    #[test]
    fn test_floor_rupee() {
        assert_eq!(Money::from_paise(118_099).floor_rupee().paise(), 118_000);
        assert_eq!(Money::from_paise(500).floor_rupee().paise(), 500);
        assert_eq!(Money::from_paise(99).floor_rupee().paise(), 0);
    }

    #[test]
    fn test_parse_accepts_form_input() {
        assert_eq!(Money::parse("499"), Some(Money::from_paise(49_900)));
        assert_eq!(Money::parse(" 12.5 "), Some(Money::from_paise(1_250)));
        assert_eq!(Money::parse("₹7.05"), Some(Money::from_paise(705)));
        assert_eq!(Money::parse(".5"), Some(Money::from_paise(50)));
        assert_eq!(Money::parse("-3"), Some(Money::from_paise(-300)));
        assert_eq!(Money::parse("0.994"), Some(Money::from_paise(99)));
        assert_eq!(Money::parse("0.995"), Some(Money::from_paise(100)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Money::parse(""), None);
        assert_eq!(Money::parse("."), None);
        assert_eq!(Money::parse("12a"), None);
        assert_eq!(Money::parse("1,000"), None);
        assert_eq!(Money::parse("1.2.3"), None);
    }

    #[test]
    fn test_non_negative() {
        assert!(Money::from_paise(-1).non_negative().is_zero());
        assert_eq!(Money::from_paise(7).non_negative().paise(), 7);
    }
}
