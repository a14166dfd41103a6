//! # Commands Module
//!
//! Every operation the back office exposes.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── invoice.rs  ◄─── Draft sessions, line editing, commit
//! ├── archive.rs  ◄─── Invoice list, detail, status, payments
//! ├── catalog.rs  ◄─── Products, variants, CSV import/template
//! ├── customer.rs ◄─── Customer create/search/update
//! ├── report.rs   ◄─── Daily income and inventory (+ CSV)
//! └── staff.rs    ◄─── Staff profiles and permissions
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  caller                                                                 │
//! │    │  commit_invoice(&state, &access, session_id)                       │
//! │    ▼                                                                    │
//! │  1. access.require(PermissionKey::Billing)   ── PERMISSION_DENIED       │
//! │  2. pure rules in tillbook-core              ── VALIDATION_ERROR, ...   │
//! │  3. repository call in tillbook-db           ── DATABASE_ERROR, ...     │
//! │  4. info!(...) outcome                                                  │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  Result<T, ApiError>                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each command takes the caller's [`AccessProfile`](tillbook_core::AccessProfile)
//! and checks the module permission before touching anything.

pub mod archive;
pub mod catalog;
pub mod customer;
pub mod invoice;
pub mod report;
pub mod staff;

use tillbook_core::{AccessProfile, CoreResult, PermissionKey};

/// Passes when the caller holds `primary` or `also`.
///
/// The error names `primary`.
pub(crate) fn require_either(access: &AccessProfile, primary: PermissionKey, also: PermissionKey) -> CoreResult<()> {
    if access.can(also) {
        return Ok(());
    }
    access.require(primary)
}
