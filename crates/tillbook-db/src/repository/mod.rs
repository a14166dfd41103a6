//! # Repository Module
//!
//! Database repository implementations for Tillbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Admin command                                                          │
//! │       │                                                                 │
//! │       │  db.invoices().commit(&plan, "INV-")                            │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                      │
//! │  ├── commit(&self, plan, prefix)     ← one transaction                  │
//! │  ├── change_status(&self, id, ...)                                      │
//! │  ├── add_payment(&self, id, request)                                    │
//! │  └── list(&self, filter)                                                │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  Billing numbers are decided in tillbook-core before a repository       │
//! │  is called. Repositories only read and write rows.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog, variants, stock, CSV import
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers and their codes
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Commit, archive, status and payments
//! - [`ReportRepository`](report::ReportRepository) - Daily income and inventory reads
//! - [`StaffRepository`](staff::StaffRepository) - Staff profiles and permissions
//! - [`DraftRepository`](draft::DraftRepository) - Open billing sessions

pub mod customer;
pub mod draft;
pub mod invoice;
pub mod product;
pub mod report;
pub mod staff;
