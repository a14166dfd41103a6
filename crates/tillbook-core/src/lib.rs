//! # tillbook-core: Pure Billing Logic for Tillbook
//!
//! This crate holds every billing rule of the Tillbook back office as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                 tillbook-admin (commands + CLI)                 │    │
//! │  │   create_invoice, record_payment, import_products, reports     │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │             ★ tillbook-core (THIS CRATE) ★                      │    │
//! │  │                                                                 │    │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌──────────────┐     │    │
//! │  │   │  money   │ │  draft   │ │ settlement │ │    report    │     │    │
//! │  │   │  Money   │ │  lines   │ │ paid/status│ │ daily income │     │    │
//! │  │   │ Percent  │ │  totals  │ │  reasons   │ │  inventory   │     │    │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └──────────────┘     │    │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌──────────────┐     │    │
//! │  │   │   tax    │ │  stock   │ │ csv_sheet  │ │ access       │     │    │
//! │  │   │ GST split│ │   gate   │ │import/export││ roles/perms  │     │    │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └──────────────┘     │    │
//! │  │                                                                 │    │
//! │  │   NO DATABASE • NO NETWORK • NO FILE SYSTEM                     │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │                 tillbook-db (Database Layer)                    │    │
//! │  │      SQLite, migrations, repositories, transactional commit     │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Invoice, Payment, etc.)
//! - [`money`] - Money type with integer paise arithmetic
//! - [`tax`] - CGST/SGST/IGST split
//! - [`draft`] - Billing form state and totals
//! - [`stock`] - Pre-commit stock gate
//! - [`settlement`] - Paid amount / status state machine
//! - [`report`] - Daily income and inventory aggregation
//! - [`csv_sheet`] - Product import and report export
//! - [`customer`] - Customer codes and search
//! - [`access`] - Staff roles and module permissions
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use tillbook_core::draft::{InvoiceDraft, LineField};
//! use tillbook_core::money::Money;
//! use tillbook_core::types::LineKind;
//!
//! let mut draft = InvoiceDraft::default();
//! draft.customer.name = "Asha".to_string();
//! let line = draft.add_line(LineKind::Manual).unwrap();
//! draft.update_line(line, LineField::UnitPrice, "1000").unwrap();
//!
//! // 18% split as 9% CGST + 9% SGST
//! assert_eq!(draft.totals().grand_total, Money::from_rupees(1180));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod csv_sheet;
pub mod customer;
pub mod draft;
pub mod error;
pub mod money;
pub mod report;
pub mod settlement;
pub mod stock;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{AccessProfile, PermissionKey, Role};
pub use draft::{CommitPlan, DraftLine, InvoiceDraft, InvoiceTotals, LineField};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use settlement::Settlement;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// GST rate a new draft starts with (18%).
pub const DEFAULT_TAX_PERCENT_BPS: u32 = 1800;

/// Customer search results shown in the picker.
pub const DEFAULT_CUSTOMER_SEARCH_LIMIT: usize = 10;

/// Inventory rows at or below this many available units are flagged.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Maximum lines on one invoice.
pub const MAX_INVOICE_LINES: usize = 200;

/// Maximum quantity on one line.
pub const MAX_LINE_QUANTITY: i64 = 99_999;

/// Maximum unit price or per-unit discount, in paise (₹1,00,00,000).
pub const MAX_UNIT_PRICE_PAISE: i64 = 1_000_000_000;

/// Who is recorded on payments taken while creating an invoice.
pub const SYSTEM_RECORDER: &str = "system";
