//! # Invoice Archive Commands
//!
//! Committed invoices: listing, detail, status changes and payments.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use tillbook_core::{AccessProfile, Invoice, InvoiceStatus, Money, PaymentMethod, PermissionKey};
use tillbook_db::{InvoiceDetail, InvoiceFilter, PaymentRequest};

/// Payment dialog input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPaymentInput {
    pub amount: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub discount_reason: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPaymentResponse {
    pub invoice: Invoice,
    /// Logged amount (whole rupees).
    pub recorded: Money,
    pub discount: Money,
    pub remaining: Money,
    /// Received beyond the grand total; hand back as change.
    pub overpaid: Money,
}

pub async fn list_invoices(state: &AppState, access: &AccessProfile, filter: &InvoiceFilter) -> ApiResult<Vec<Invoice>> {
    access.require(PermissionKey::InvoiceArchive)?;
    debug!(?filter, "list_invoices command");

    Ok(state.database().invoices().list(filter).await?)
}

/// Invoice with items, payments and edit history.
pub async fn invoice_detail(state: &AppState, access: &AccessProfile, invoice_id: &str) -> ApiResult<InvoiceDetail> {
    access.require(PermissionKey::InvoiceArchive)?;
    Ok(state.database().invoices().detail(invoice_id).await?)
}

/// Looks an invoice up by its printed number.
pub async fn find_by_number(state: &AppState, access: &AccessProfile, invoice_number: &str) -> ApiResult<Invoice> {
    access.require(PermissionKey::InvoiceArchive)?;

    state
        .database()
        .invoices()
        .get_by_number(invoice_number.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("Invoice", invoice_number))
}

/// Moves an invoice to another status.
///
/// Downgrades need a reason. An upgrade to paid logs the outstanding
/// balance as a payment in `payment_method`.
pub async fn change_status(
    state: &AppState,
    access: &AccessProfile,
    invoice_id: &str,
    target: InvoiceStatus,
    reason: Option<&str>,
    payment_method: PaymentMethod,
) -> ApiResult<Invoice> {
    access.require(PermissionKey::InvoiceArchive)?;
    debug!(invoice_id = %invoice_id, target = %target, "change_status command");

    let invoice = state
        .database()
        .invoices()
        .change_status(invoice_id, target, reason, payment_method.as_str(), &access.staff_id)
        .await?;

    info!(
        invoice_number = %invoice.invoice_number,
        status = %invoice.status,
        paid = %invoice.paid_amount(),
        staff = %access.staff_id,
        "Invoice status changed"
    );

    Ok(invoice)
}

/// Takes a payment and/or discount against an invoice.
pub async fn add_payment(
    state: &AppState,
    access: &AccessProfile,
    invoice_id: &str,
    input: AddPaymentInput,
) -> ApiResult<AddPaymentResponse> {
    access.require(PermissionKey::InvoiceArchive)?;
    debug!(invoice_id = %invoice_id, amount = %input.amount, discount = %input.discount, "add_payment command");

    let request = PaymentRequest {
        amount: input.amount,
        discount: input.discount,
        discount_reason: input.discount_reason,
        payment_method: input.payment_method.as_str().to_string(),
        recorded_by: access.staff_id.clone(),
    };
    let receipt = state.database().invoices().add_payment(invoice_id, &request).await?;

    info!(
        invoice_number = %receipt.invoice.invoice_number,
        recorded = %receipt.outcome.recorded,
        discount = %receipt.outcome.discount,
        status = %receipt.invoice.status,
        staff = %access.staff_id,
        "Payment recorded"
    );

    Ok(AddPaymentResponse {
        remaining: receipt.invoice.balance(),
        recorded: receipt.outcome.recorded,
        discount: receipt.outcome.discount,
        overpaid: receipt.outcome.overpaid,
        invoice: receipt.invoice,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::invoice::{add_line, commit_invoice, set_customer, update_line};
    use crate::testing::{admin, state};
    use crate::ErrorCode;
    use tillbook_core::draft::DraftCustomer;
    use tillbook_core::{EditAction, LineField, LineKind, Role};

    /// Commits an unpaid ₹1000 + 18% manual invoice for `name`.
    async fn unpaid_invoice(state: &AppState, name: &str) -> Invoice {
        let access = admin();
        let session = state.drafts.first_id().unwrap();
        add_line(state, &access, &session, LineKind::Manual).await.unwrap();
        update_line(state, &access, &session, 0, LineField::Description, "Alteration").await.unwrap();
        update_line(state, &access, &session, 0, LineField::UnitPrice, "1000").await.unwrap();
        set_customer(
            state,
            &access,
            &session,
            DraftCustomer {
                name: name.into(),
                phone: "9900112233".into(),
                ..DraftCustomer::default()
            },
        )
        .await
        .unwrap();
        commit_invoice(state, &access, &session).await.unwrap()
    }

    #[tokio::test]
    async fn test_payment_then_discount_settles() {
        let state = state().await;
        let access = AccessProfile::new("meera", Role::Staff, vec![PermissionKey::Billing, PermissionKey::InvoiceArchive]);
        let invoice = unpaid_invoice(&state, "Ravi").await;
        assert_eq!(invoice.grand_total(), Money::from_rupees(1180));

        let first = add_payment(
            &state,
            &access,
            &invoice.id,
            AddPaymentInput {
                amount: Money::from_rupees(1000),
                payment_method: PaymentMethod::Upi,
                ..AddPaymentInput::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(first.invoice.status, InvoiceStatus::Partial);
        assert_eq!(first.remaining, Money::from_rupees(180));

        let refused = add_payment(
            &state,
            &access,
            &invoice.id,
            AddPaymentInput {
                amount: Money::zero(),
                discount: Money::from_rupees(180),
                ..AddPaymentInput::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(refused.code, ErrorCode::PaymentError);

        let settled = add_payment(
            &state,
            &access,
            &invoice.id,
            AddPaymentInput {
                amount: Money::zero(),
                discount: Money::from_rupees(180),
                discount_reason: Some("Loyal customer".into()),
                ..AddPaymentInput::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(settled.invoice.status, InvoiceStatus::Paid);
        assert_eq!(settled.remaining, Money::zero());

        let detail = invoice_detail(&state, &access, &invoice.id).await.unwrap();
        assert_eq!(detail.payments.len(), 1);
        assert_eq!(detail.payments[0].recorded_by, "meera");
        assert!(detail.history.iter().any(|h| h.action_type == EditAction::DiscountAdd));
    }

    #[tokio::test]
    async fn test_downgrade_needs_reason() {
        let state = state().await;
        let access = admin();
        let invoice = unpaid_invoice(&state, "Asha").await;

        let paid = change_status(&state, &access, &invoice.id, InvoiceStatus::Paid, None, PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(paid.paid_amount(), Money::from_rupees(1180));

        let err = change_status(&state, &access, &invoice.id, InvoiceStatus::Unpaid, None, PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);

        let unpaid = change_status(
            &state,
            &access,
            &invoice.id,
            InvoiceStatus::Unpaid,
            Some("Cheque bounced"),
            PaymentMethod::Cash,
        )
        .await
        .unwrap();
        assert_eq!(unpaid.status, InvoiceStatus::Unpaid);
        assert_eq!(unpaid.paid_amount(), Money::zero());
    }

    #[tokio::test]
    async fn test_listing_and_lookup() {
        let state = state().await;
        let access = admin();
        let invoice = unpaid_invoice(&state, "Fatima Shaikh").await;

        let found = list_invoices(
            &state,
            &access,
            &InvoiceFilter {
                search: Some("fatima".into()),
                ..InvoiceFilter::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1);

        let by_number = find_by_number(&state, &access, " INV-000001 ").await.unwrap();
        assert_eq!(by_number.id, invoice.id);

        let err = find_by_number(&state, &access, "INV-999999").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_archive_permission_required() {
        let state = state().await;
        let cashier = AccessProfile::new("c", Role::Staff, vec![PermissionKey::Billing]);
        let err = list_invoices(&state, &cashier, &InvoiceFilter::default()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }
}
