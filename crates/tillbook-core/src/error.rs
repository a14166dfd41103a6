//! # Error Types
//!
//! Domain-specific error types for tillbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tillbook-core errors (this file)                                      │
//! │  ├── CoreError        - Billing rule violations                        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tillbook-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Admin app errors                                                      │
//! │  └── ApiError         - What the front end sees (serialized)           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Front end    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::types::InvoiceStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Billing logic errors.
///
/// These represent business rule violations. They are caught at the
/// command layer and translated to user-facing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found in the catalog snapshot.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Variant cannot be found under the selected product.
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// Invoice cannot be found.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Requested quantity exceeds what is on the shelf.
    ///
    /// ## When This Occurs
    /// - The pre-commit stock gate sees a line above its variant stock
    /// - The same gate sees a product-only line above the product's
    ///   combined variant stock
    ///
    /// ## User Workflow
    /// ```text
    /// Line: "Kurta (Red M)" qty 5
    ///      │
    ///      ▼
    /// Variant stock = 3
    ///      │
    ///      ▼
    /// InsufficientStock { item: "Kurta (Red M)", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Not enough stock for Kurta (Red M). Available: 3, requested: 5"
    /// ```
    #[error("Not enough stock for {item}. Available: {available}, requested: {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// Line index does not exist in the draft.
    #[error("Line {index} does not exist (draft has {len} lines)")]
    LineNotFound { index: usize, len: usize },

    /// Draft has no lines to bill.
    #[error("Please add at least one item")]
    EmptyInvoice,

    /// A status downgrade was attempted without a reason.
    ///
    /// ## When This Occurs
    /// - paid → partial / unpaid
    /// - partial → unpaid
    #[error("A reason is required to change status from {from} to {to}")]
    ReasonRequired {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    /// Payment amount is invalid.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Draft session id is unknown.
    #[error("Invoice session not found: {0}")]
    SessionNotFound(String),

    /// The last open invoice session cannot be closed.
    #[error("At least one invoice must remain open")]
    LastSession,

    /// The session is being saved as an invoice.
    ///
    /// ## When This Occurs
    /// - A second commit of the same tab while the first is still running
    /// - Edits or closing the tab during that commit
    #[error("This invoice is already being saved")]
    CommitInProgress,

    /// The acting staff member lacks a module permission.
    #[error("Permission denied: {permission}")]
    PermissionDenied { permission: String },

    /// Malformed CSV input.
    #[error("CSV line {line}: {reason}")]
    Csv { line: usize, reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., a price that is not a number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            item: "Kurta (Red M)".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Not enough stock for Kurta (Red M). Available: 3, requested: 5"
        );
    }

    #[test]
    fn test_reason_required_message() {
        let err = CoreError::ReasonRequired {
            from: InvoiceStatus::Paid,
            to: InvoiceStatus::Unpaid,
        };
        assert_eq!(
            err.to_string(),
            "A reason is required to change status from paid to unpaid"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "customer_name".to_string(),
        };
        let core_err: CoreError = validation_err.into();

        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(
            core_err.to_string(),
            "Validation error: customer_name is required"
        );
    }
}
