//! # Customer Commands

use tracing::info;

use super::require_either;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use tillbook_core::{AccessProfile, Customer, NewCustomer, PermissionKey};

/// Saves a customer and gives them the next `CUST` code.
pub async fn create_customer(state: &AppState, access: &AccessProfile, input: NewCustomer) -> ApiResult<Customer> {
    access.require(PermissionKey::Customers)?;

    let customer = state.database().customers().create(input).await?;

    info!(cust_id = %customer.cust_id, staff = %access.staff_id, "Customer created");
    Ok(customer)
}

pub async fn list_customers(state: &AppState, access: &AccessProfile) -> ApiResult<Vec<Customer>> {
    access.require(PermissionKey::Customers)?;
    Ok(state.database().customers().list().await?)
}

/// Customer picker search by name or phone.
///
/// Billing staff use it on the invoice form, so either permission will do.
pub async fn search_customers(state: &AppState, access: &AccessProfile, query: &str) -> ApiResult<Vec<Customer>> {
    require_either(access, PermissionKey::Customers, PermissionKey::Billing)?;

    let limit = state.config.billing.customer_search_limit;
    Ok(state.database().customers().search(query, limit).await?)
}

pub async fn get_customer(state: &AppState, access: &AccessProfile, customer_id: &str) -> ApiResult<Customer> {
    require_either(access, PermissionKey::Customers, PermissionKey::Billing)?;

    state
        .database()
        .customers()
        .get_by_id(customer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", customer_id))
}

/// Updates contact details. The customer code stays.
pub async fn update_customer(
    state: &AppState,
    access: &AccessProfile,
    customer_id: &str,
    input: NewCustomer,
) -> ApiResult<Customer> {
    access.require(PermissionKey::Customers)?;
    Ok(state.database().customers().update(customer_id, input).await?)
}
