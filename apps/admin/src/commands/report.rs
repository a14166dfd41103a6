//! # Report Commands
//!
//! Daily income (archive permission) and inventory (inventory permission),
//! each with a CSV export.

use chrono::NaiveDate;
use tracing::debug;

use crate::error::ApiResult;
use crate::AppState;
use tillbook_core::report::{
    daily_income_csv, inventory_csv, DailyIncomeFilter, DailyIncomeReport, InventoryReport, PaymentDetail,
};
use tillbook_core::{AccessProfile, PermissionKey};

pub async fn daily_income(
    state: &AppState,
    access: &AccessProfile,
    filter: &DailyIncomeFilter,
) -> ApiResult<DailyIncomeReport> {
    access.require(PermissionKey::InvoiceArchive)?;
    debug!(?filter, "daily_income command");

    Ok(state.database().reports().daily_income(filter).await?)
}

/// Every payment in the report as CSV, newest day first.
pub async fn daily_income_export(
    state: &AppState,
    access: &AccessProfile,
    filter: &DailyIncomeFilter,
) -> ApiResult<String> {
    let report = daily_income(state, access, filter).await?;
    let payments: Vec<PaymentDetail> = report.days.into_iter().flat_map(|d| d.payments).collect();

    Ok(daily_income_csv(&payments)?)
}

pub async fn inventory(
    state: &AppState,
    access: &AccessProfile,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> ApiResult<InventoryReport> {
    access.require(PermissionKey::Inventory)?;
    debug!(?from, ?to, "inventory command");

    Ok(state.database().reports().inventory(from, to).await?)
}

pub async fn inventory_export(
    state: &AppState,
    access: &AccessProfile,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> ApiResult<String> {
    let report = inventory(state, access, from, to).await?;
    Ok(inventory_csv(&report)?)
}
