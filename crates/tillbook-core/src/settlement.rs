//! # Settlement State Machine
//!
//! Tracks how much of an invoice has been paid and which status that
//! implies.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │            payment > 0, < total           payment reaches total         │
//! │   ┌────────┐ ─────────────────► ┌─────────┐ ─────────────────► ┌──────┐ │
//! │   │ UNPAID │                    │ PARTIAL │                    │ PAID │ │
//! │   └────────┘ ◄───────────────── └─────────┘ ◄───────────────── └──────┘ │
//! │        ▲         reason required                reason required    │    │
//! │        └───────────────────────────────────────────────────────────┘    │
//! │                            reason required                              │
//! │                                                                         │
//! │  Invariant: 0 ≤ paid_amount ≤ grand_total                               │
//! │  paid    ⇒ paid_amount = grand_total                                    │
//! │  unpaid  ⇒ paid_amount = 0                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two entry points exist. A draft on the billing form uses the plain
//! setters ([`Settlement::set_status`], [`Settlement::set_paid_amount`]):
//! nothing has been persisted yet, so there is nothing to downgrade. A
//! committed invoice goes through [`Settlement::transition`] and
//! [`Settlement::record_payment`], which enforce reasons.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::InvoiceStatus;

// =============================================================================
// Settlement
// =============================================================================

/// Paid amount and status of one invoice, kept consistent with its total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    grand_total: Money,
    paid_amount: Money,
    status: InvoiceStatus,
}

impl Settlement {
    /// An unpaid settlement for `grand_total`.
    pub fn new(grand_total: Money) -> Self {
        Settlement {
            grand_total: grand_total.non_negative(),
            paid_amount: Money::zero(),
            status: InvoiceStatus::Unpaid,
        }
    }

    /// Rebuilds a settlement from stored columns.
    ///
    /// The stored status is trusted; the paid amount is clamped.
    pub fn from_parts(grand_total: Money, paid_amount: Money, status: InvoiceStatus) -> Self {
        let grand_total = grand_total.non_negative();
        Settlement {
            grand_total,
            paid_amount: paid_amount.non_negative().min(grand_total),
            status,
        }
    }

    #[inline]
    pub fn grand_total(&self) -> Money {
        self.grand_total
    }

    #[inline]
    pub fn paid_amount(&self) -> Money {
        self.paid_amount
    }

    #[inline]
    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    /// What is still owed.
    #[inline]
    pub fn balance(&self) -> Money {
        (self.grand_total - self.paid_amount).non_negative()
    }

    // =========================================================================
    // Draft form rules
    // =========================================================================

    /// Follows a new grand total after lines or tax changed.
    ///
    /// - paid: paid amount tracks the new total
    /// - unpaid: paid amount stays 0
    /// - partial: paid amount above the new total is clamped down
    pub fn set_grand_total(&mut self, grand_total: Money) {
        self.grand_total = grand_total.non_negative();
        match self.status {
            InvoiceStatus::Paid => self.paid_amount = self.grand_total,
            InvoiceStatus::Unpaid => self.paid_amount = Money::zero(),
            InvoiceStatus::Partial => {
                if self.paid_amount > self.grand_total {
                    self.paid_amount = self.grand_total;
                }
            }
        }
    }

    /// Sets the status, forcing the paid amount to agree.
    ///
    /// Entering partial with a paid amount that is zero or above the total
    /// resets it to 0.
    pub fn set_status(&mut self, status: InvoiceStatus) {
        self.status = status;
        match status {
            InvoiceStatus::Paid => self.paid_amount = self.grand_total,
            InvoiceStatus::Unpaid => self.paid_amount = Money::zero(),
            InvoiceStatus::Partial => {
                if !self.paid_amount.is_positive() || self.paid_amount > self.grand_total {
                    self.paid_amount = Money::zero();
                }
            }
        }
    }

    /// Sets the paid amount, clamped to `[0, grand_total]`, and derives the
    /// status from it.
    ///
    /// ## Example
    /// ```rust
    /// use tillbook_core::money::Money;
    /// use tillbook_core::settlement::Settlement;
    /// use tillbook_core::types::InvoiceStatus;
    ///
    /// let mut s = Settlement::new(Money::from_rupees(1000));
    /// s.set_status(InvoiceStatus::Partial);
    /// s.set_paid_amount(Money::from_rupees(1200));
    /// assert_eq!(s.paid_amount(), Money::from_rupees(1000));
    /// assert_eq!(s.status(), InvoiceStatus::Paid);
    /// ```
    pub fn set_paid_amount(&mut self, amount: Money) {
        self.paid_amount = amount.non_negative().min(self.grand_total);
        self.status = if self.paid_amount.is_zero() {
            InvoiceStatus::Unpaid
        } else if self.paid_amount == self.grand_total {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::Partial
        };
    }

    // =========================================================================
    // Committed invoice rules
    // =========================================================================

    /// Changes the status of a committed invoice.
    ///
    /// Downgrades (paid → partial/unpaid, partial → unpaid) need a
    /// non-blank reason; without one nothing changes.
    pub fn transition(
        &mut self,
        target: InvoiceStatus,
        reason: Option<&str>,
    ) -> CoreResult<StatusChange> {
        let before = *self;
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());

        if before.status.is_downgrade_to(target) && reason.is_none() {
            return Err(CoreError::ReasonRequired {
                from: before.status,
                to: target,
            });
        }

        self.set_status(target);

        Ok(StatusChange {
            from: before.status,
            to: target,
            paid_before: before.paid_amount,
            paid_after: self.paid_amount,
            reason: reason.map(str::to_string),
        })
    }

    /// Applies a payment and/or discount to a committed invoice.
    ///
    /// ## Rules
    /// - the payment is floored to whole rupees before it counts
    /// - at least one of payment/discount must be positive
    /// - a discount needs a reason and cannot exceed the balance
    /// - a discount lowers the grand total
    /// - status becomes paid once nothing remains, partial while something
    ///   has been paid, unpaid otherwise
    pub fn record_payment(
        &mut self,
        payment: Money,
        discount: Money,
        discount_reason: Option<&str>,
    ) -> CoreResult<PaymentOutcome> {
        if payment.is_negative() || discount.is_negative() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "amounts cannot be negative".to_string(),
            });
        }

        let recorded = payment.floor_rupee();
        if !recorded.is_positive() && !discount.is_positive() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "enter a payment or discount amount".to_string(),
            });
        }

        let discount_reason = discount_reason.map(str::trim).filter(|r| !r.is_empty());
        if discount.is_positive() {
            if discount_reason.is_none() {
                return Err(ValidationError::Required {
                    field: "discount_reason".to_string(),
                }
                .into());
            }
            if discount > self.balance() {
                return Err(CoreError::InvalidPaymentAmount {
                    reason: format!("discount {} exceeds balance {}", discount, self.balance()),
                });
            }
        }

        let before = *self;

        self.grand_total -= discount;
        let total_paid = before.paid_amount + recorded;
        let remaining = self.grand_total - total_paid;

        self.status = if !remaining.is_positive() {
            InvoiceStatus::Paid
        } else if total_paid.is_positive() {
            InvoiceStatus::Partial
        } else {
            InvoiceStatus::Unpaid
        };
        self.paid_amount = total_paid.min(self.grand_total);

        Ok(PaymentOutcome {
            recorded,
            discount,
            discount_reason: discount_reason.map(str::to_string),
            before,
            after: *self,
            overpaid: (total_paid - self.grand_total).non_negative(),
        })
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of [`Settlement::transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub from: InvoiceStatus,
    pub to: InvoiceStatus,
    pub paid_before: Money,
    pub paid_after: Money,
    pub reason: Option<String>,
}

impl StatusChange {
    /// Money that the change implies was received (an upgrade to paid).
    pub fn collected(&self) -> Money {
        (self.paid_after - self.paid_before).non_negative()
    }

    #[inline]
    pub fn is_downgrade(&self) -> bool {
        self.from.is_downgrade_to(self.to)
    }
}

/// Result of [`Settlement::record_payment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    /// Payment as logged (whole rupees).
    pub recorded: Money,
    pub discount: Money,
    pub discount_reason: Option<String>,
    pub before: Settlement,
    pub after: Settlement,
    /// Amount received beyond the grand total.
    pub overpaid: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================
