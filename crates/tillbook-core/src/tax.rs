//! # GST Module
//!
//! Splits tax on a taxable amount according to [`TaxType`].
//!
//! ```text
//! taxable ₹1000.00 at 18%
//!
//!   CGST_SGST ──► CGST ₹90.00 + SGST ₹90.00   (each half of the rate)
//!   IGST      ──► IGST ₹180.00                (full rate)
//!   NONE      ──► nothing
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Percent, TaxType};

/// Tax amounts for one invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxBreakdown {
    pub cgst: Money,
    pub sgst: Money,
    pub igst: Money,
}

impl TaxBreakdown {
    /// Computes the split for `taxable` at `rate`.
    ///
    /// Each CGST/SGST half is rounded on its own, so the two halves always
    /// match each other.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    /// use tillbook_core::tax::TaxBreakdown;
    /// use tillbook_core::types::{Percent, TaxType};
    ///
    /// let tax = TaxBreakdown::compute(
    ///     Money::from_rupees(1000),
    ///     TaxType::CgstSgst,
    ///     Percent::from_whole(18),
    /// );
    /// assert_eq!(tax.cgst, Money::from_rupees(90));
    /// assert_eq!(tax.sgst, Money::from_rupees(90));
    /// assert_eq!(tax.total(), Money::from_rupees(180));
    /// ```
    pub fn compute(taxable: Money, tax_type: TaxType, rate: Percent) -> Self {
        let taxable = taxable.non_negative();
        match tax_type {
            TaxType::CgstSgst => {
                let half = taxable.percent_split(rate, 2);
                TaxBreakdown {
                    cgst: half,
                    sgst: half,
                    igst: Money::zero(),
                }
            }
            TaxType::Igst => TaxBreakdown {
                cgst: Money::zero(),
                sgst: Money::zero(),
                igst: taxable.percent(rate),
            },
            TaxType::None => TaxBreakdown::default(),
        }
    }

    #[inline]
    pub fn total(&self) -> Money {
        self.cgst + self.sgst + self.igst
    }
}

/// Picks the GST regime from the seller's and buyer's states.
///
/// Same state (case-insensitive) or an unknown buyer state keeps the
/// intra-state split; a different known state switches to IGST.
pub fn tax_type_for_states(store_state: Option<&str>, customer_state: Option<&str>) -> TaxType {
    let normalize = |s: &str| s.trim().to_lowercase();
    match (store_state, customer_state) {
        (Some(store), Some(customer)) if !store.trim().is_empty() && !customer.trim().is_empty() => {
            if normalize(store) == normalize(customer) {
                TaxType::CgstSgst
            } else {
                TaxType::Igst
            }
        }
        _ => TaxType::CgstSgst,
    }
}
