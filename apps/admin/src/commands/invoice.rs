//! # Invoice Commands
//!
//! Draft sessions and the invoice commit.
//!
//! Every successful edit writes the session back to `invoice_drafts`, so a
//! restart reopens the same tabs.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::{DraftSession, SessionSummary};
use crate::AppState;
use tillbook_core::draft::DraftCustomer;
use tillbook_core::stock::check_stock;
use tillbook_core::types::Percent;
use tillbook_core::{
    AccessProfile, CoreError, CoreResult, Invoice, InvoiceDraft, InvoiceStatus, InvoiceTotals, LineField, LineKind,
    Money, PaymentMethod, PermissionKey, TaxType,
};

/// A session as the billing screen shows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftView {
    pub session_id: String,
    pub label: String,
    pub draft: InvoiceDraft,
    pub totals: InvoiceTotals,
}

impl From<DraftSession> for DraftView {
    fn from(session: DraftSession) -> Self {
        let totals = session.draft.totals();
        DraftView {
            session_id: session.id,
            label: session.label,
            draft: session.draft,
            totals,
        }
    }
}

/// Payment fields of the billing form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentForm {
    pub status: InvoiceStatus,
    pub paid_amount: Money,
    pub payment_method: PaymentMethod,
}

// =============================================================================
// Sessions
// =============================================================================

pub fn list_sessions(state: &AppState, access: &AccessProfile) -> ApiResult<Vec<SessionSummary>> {
    access.require(PermissionKey::Billing)?;
    Ok(state.drafts.list())
}

pub fn get_session(state: &AppState, access: &AccessProfile, session_id: &str) -> ApiResult<DraftView> {
    access.require(PermissionKey::Billing)?;
    Ok(state.drafts.get(session_id)?.into())
}

/// Opens a new tab with the configured billing defaults.
pub async fn open_session(state: &AppState, access: &AccessProfile, label: Option<&str>) -> ApiResult<DraftView> {
    access.require(PermissionKey::Billing)?;

    let session = state.drafts.create(label, state.config.new_draft());
    debug!(session_id = %session.id, label = %session.label, "Opened invoice session");

    persist(state, &session.id).await?;
    Ok(session.into())
}

pub async fn rename_session(
    state: &AppState,
    access: &AccessProfile,
    session_id: &str,
    label: &str,
) -> ApiResult<DraftView> {
    access.require(PermissionKey::Billing)?;
    state.drafts.rename(session_id, label)?;
    persist(state, session_id).await
}

/// Closes a tab and forgets its draft.
pub async fn close_session(state: &AppState, access: &AccessProfile, session_id: &str) -> ApiResult<()> {
    access.require(PermissionKey::Billing)?;

    state.drafts.dispose(session_id)?;
    state.database().drafts().delete(session_id).await?;

    debug!(session_id = %session_id, "Closed invoice session");
    Ok(())
}

/// Clears customer, lines and payment; the tab stays open.
pub async fn reset_session(state: &AppState, access: &AccessProfile, session_id: &str) -> ApiResult<DraftView> {
    edit(state, access, session_id, |d| {
        d.reset();
        Ok(())
    })
    .await
}

// =============================================================================
// Lines
// =============================================================================

pub async fn add_line(state: &AppState, access: &AccessProfile, session_id: &str, kind: LineKind) -> ApiResult<DraftView> {
    edit(state, access, session_id, |d| d.add_line(kind).map(|_| ())).await
}

pub async fn remove_line(
    state: &AppState,
    access: &AccessProfile,
    session_id: &str,
    index: usize,
) -> ApiResult<DraftView> {
    edit(state, access, session_id, |d| d.remove_line(index).map(|_| ())).await
}

/// Applies one raw form value to a line.
pub async fn update_line(
    state: &AppState,
    access: &AccessProfile,
    session_id: &str,
    index: usize,
    field: LineField,
    raw: &str,
) -> ApiResult<DraftView> {
    edit(state, access, session_id, |d| d.update_line(index, field, raw)).await
}

/// Puts a catalog product on a line.
pub async fn select_product(
    state: &AppState,
    access: &AccessProfile,
    session_id: &str,
    index: usize,
    product_id: &str,
) -> ApiResult<DraftView> {
    access.require(PermissionKey::Billing)?;

    let product = state
        .database()
        .products()
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

    edit(state, access, session_id, |d| d.select_product(index, &product)).await
}

/// Narrows a product line to one variant.
pub async fn select_variant(
    state: &AppState,
    access: &AccessProfile,
    session_id: &str,
    index: usize,
    variant_id: &str,
) -> ApiResult<DraftView> {
    access.require(PermissionKey::Billing)?;

    let variant = state
        .database()
        .products()
        .get_variant(variant_id)
        .await?
        .ok_or_else(|| CoreError::VariantNotFound(variant_id.to_string()))?;

    edit(state, access, session_id, |d| d.select_variant(index, &variant)).await
}

// =============================================================================
// Header
// =============================================================================

/// Copies a saved customer onto the draft.
pub async fn select_customer(
    state: &AppState,
    access: &AccessProfile,
    session_id: &str,
    customer_id: &str,
) -> ApiResult<DraftView> {
    access.require(PermissionKey::Billing)?;

    let customer = state
        .database()
        .customers()
        .get_by_id(customer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Customer", customer_id))?;

    edit(state, access, session_id, |d| {
        d.select_customer(&customer);
        Ok(())
    })
    .await
}

/// Customer fields typed by hand (walk-in buyers).
pub async fn set_customer(
    state: &AppState,
    access: &AccessProfile,
    session_id: &str,
    customer: DraftCustomer,
) -> ApiResult<DraftView> {
    edit(state, access, session_id, |d| {
        d.customer = customer;
        Ok(())
    })
    .await
}

pub async fn set_tax(
    state: &AppState,
    access: &AccessProfile,
    session_id: &str,
    tax_type: TaxType,
    tax_percent: Percent,
) -> ApiResult<DraftView> {
    edit(state, access, session_id, |d| {
        d.set_tax_percent(tax_percent)?;
        d.set_tax_type(tax_type);
        Ok(())
    })
    .await
}

/// Status, paid amount and method from the payment panel.
///
/// The status is applied first so that a paid amount typed together with
/// "partial" is kept.
pub async fn set_payment(
    state: &AppState,
    access: &AccessProfile,
    session_id: &str,
    form: PaymentForm,
) -> ApiResult<DraftView> {
    edit(state, access, session_id, |d| {
        d.payment_method = form.payment_method;
        d.set_payment_status(form.status);
        if form.status == InvoiceStatus::Partial {
            d.set_paid_amount(form.paid_amount);
        }
        Ok(())
    })
    .await
}

// =============================================================================
// Commit
// =============================================================================

/// Turns a draft into a persisted invoice.
///
/// ## Steps
/// ```text
/// prepare_commit()       customer name, at least one line      (no writes)
///      │
///      ▼
/// check_stock()          against a fresh variant snapshot      (no writes)
///      │
///      ▼
/// invoices().commit()    number, rows, stock, payment          (one transaction)
///      │
///      ▼
/// draft.reset()          the tab stays open, empty
/// ```
///
/// The session is claimed for the whole sequence, so a second commit of
/// the same tab fails with `BUSINESS_LOGIC` instead of billing twice.
pub async fn commit_invoice(state: &AppState, access: &AccessProfile, session_id: &str) -> ApiResult<Invoice> {
    access.require(PermissionKey::Billing)?;
    debug!(session_id = %session_id, "commit_invoice command");

    let (draft, guard) = state.drafts.begin_commit(session_id)?;
    let plan = draft.prepare_commit()?;

    let snapshot = state.database().products().stock_snapshot().await?;
    check_stock(draft.lines(), &snapshot)?;

    let invoice = match state
        .database()
        .invoices()
        .commit(&plan, &state.config.billing.invoice_prefix)
        .await
    {
        Ok(invoice) => invoice,
        Err(e) => {
            if e.is_insufficient_stock() {
                warn!(session_id = %session_id, error = %e, "Stock changed between check and commit");
            }
            return Err(e.into());
        }
    };

    guard.committed();
    persist(state, session_id).await?;

    info!(
        invoice_number = %invoice.invoice_number,
        grand_total = %invoice.grand_total(),
        status = %invoice.status,
        lines = plan.items.len(),
        staff = %access.staff_id,
        "Invoice committed"
    );

    Ok(invoice)
}

// =============================================================================
// Helpers
// =============================================================================

/// Runs one edit under the billing permission and saves the session.
async fn edit<F>(state: &AppState, access: &AccessProfile, session_id: &str, f: F) -> ApiResult<DraftView>
where
    F: FnOnce(&mut InvoiceDraft) -> CoreResult<()>,
{
    access.require(PermissionKey::Billing)?;
    state.drafts.with_draft_mut(session_id, f)?;
    persist(state, session_id).await
}

/// Writes one session to the database.
async fn persist(state: &AppState, session_id: &str) -> ApiResult<DraftView> {
    let session = state.drafts.get(session_id)?;
    let position = state.drafts.position(session_id)?;

    state
        .database()
        .drafts()
        .save(&session.id, &session.label, &session.draft, position as i64)
        .await?;

    Ok(session.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{admin, state};
    use crate::ErrorCode;
    use tillbook_core::{NewCustomer, NewProduct, NewVariant, ProductVariant, Role};

    async fn kurta_with_stock(state: &AppState, stock: i64) -> ProductVariant {
        let db = state.database();
        let product = db
            .products()
            .insert(&NewProduct {
                name: "Cotton Kurta".into(),
                price_paise: 120_000,
                offer_price_paise: Some(99_900),
                hsn_code: Some("6211".into()),
                is_active: true,
                ..NewProduct::default()
            })
            .await
            .unwrap();
        db.products()
            .add_variant(
                &product.id,
                &NewVariant {
                    color: Some("Red".into()),
                    size: Some("M".into()),
                    stock_quantity: stock,
                    ..NewVariant::default()
                },
            )
            .await
            .unwrap()
    }

    async fn billed_line(state: &AppState, session: &str, variant: &ProductVariant, qty: &str) {
        let access = admin();
        add_line(state, &access, session, LineKind::Product).await.unwrap();
        select_product(state, &access, session, 0, &variant.product_id).await.unwrap();
        select_variant(state, &access, session, 0, &variant.id).await.unwrap();
        update_line(state, &access, session, 0, LineField::Quantity, qty).await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_resets_draft_and_deducts_stock() {
        let state = state().await;
        let access = admin();
        let session = state.drafts.first_id().unwrap();
        let variant = kurta_with_stock(&state, 5).await;

        billed_line(&state, &session, &variant, "2").await;
        let view = set_customer(
            &state,
            &access,
            &session,
            DraftCustomer {
                name: "Asha".into(),
                ..DraftCustomer::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(view.draft.lines()[0].description, "Cotton Kurta (Red M)");
        // 2 × ₹999 + 18% GST
        assert_eq!(view.totals.grand_total, Money::from_paise(235_764));

        let invoice = commit_invoice(&state, &access, &session).await.unwrap();
        assert_eq!(invoice.invoice_number, "INV-000001");
        assert_eq!(invoice.grand_total(), Money::from_paise(235_764));

        let after = get_session(&state, &access, &session).unwrap();
        assert!(after.draft.lines().is_empty());
        assert!(after.draft.customer.name.is_empty());

        let remaining = state.database().products().get_variant(&variant.id).await.unwrap().unwrap();
        assert_eq!(remaining.stock_quantity, 3);

        // The reset draft was saved too.
        let stored = state.database().drafts().load_all().await.unwrap();
        assert!(stored[0].draft.lines().is_empty());
    }

    #[tokio::test]
    async fn test_stock_gate_blocks_before_any_write() {
        let state = state().await;
        let access = admin();
        let session = state.drafts.first_id().unwrap();
        let variant = kurta_with_stock(&state, 1).await;

        billed_line(&state, &session, &variant, "3").await;
        set_customer(
            &state,
            &access,
            &session,
            DraftCustomer {
                name: "Ravi".into(),
                ..DraftCustomer::default()
            },
        )
        .await
        .unwrap();

        let err = commit_invoice(&state, &access, &session).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.starts_with("Not enough stock for Cotton Kurta (Red M)"));

        let invoices = state.database().invoices().list(&Default::default()).await.unwrap();
        assert!(invoices.is_empty());
        // The draft is untouched so the cashier can fix the quantity.
        assert_eq!(get_session(&state, &access, &session).unwrap().draft.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_requires_customer_name() {
        let state = state().await;
        let access = admin();
        let session = state.drafts.first_id().unwrap();
        add_line(&state, &access, &session, LineKind::Manual).await.unwrap();

        let err = commit_invoice(&state, &access, &session).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_partial_payment_form_keeps_amount() {
        let state = state().await;
        let access = admin();
        let session = state.drafts.first_id().unwrap();
        add_line(&state, &access, &session, LineKind::Manual).await.unwrap();
        update_line(&state, &access, &session, 0, LineField::UnitPrice, "1000").await.unwrap();

        let view = set_payment(
            &state,
            &access,
            &session,
            PaymentForm {
                status: InvoiceStatus::Partial,
                paid_amount: Money::from_rupees(500),
                payment_method: PaymentMethod::Upi,
            },
        )
        .await
        .unwrap();

        assert_eq!(view.draft.settlement().status(), InvoiceStatus::Partial);
        assert_eq!(view.draft.settlement().paid_amount(), Money::from_rupees(500));
        assert_eq!(view.draft.payment_method, PaymentMethod::Upi);
    }

    #[tokio::test]
    async fn test_rejected_tax_percent_changes_nothing() {
        let state = state().await;
        let access = admin();
        let session = state.drafts.first_id().unwrap();
        add_line(&state, &access, &session, LineKind::Manual).await.unwrap();
        update_line(&state, &access, &session, 0, LineField::UnitPrice, "1000").await.unwrap();

        let err = set_tax(&state, &access, &session, TaxType::Igst, Percent::from_bps(10_001))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let view = get_session(&state, &access, &session).unwrap();
        assert_eq!(view.draft.tax_type(), TaxType::CgstSgst);
        assert_eq!(view.totals.grand_total, Money::from_rupees(1180));

        let saved = state.database().drafts().load_all().await.unwrap();
        assert_eq!(saved[0].draft, view.draft);
    }

    #[tokio::test]
    async fn test_session_commits_once_at_a_time() {
        let state = state().await;
        let access = admin();
        let session = state.drafts.first_id().unwrap();
        add_line(&state, &access, &session, LineKind::Manual).await.unwrap();
        update_line(&state, &access, &session, 0, LineField::UnitPrice, "1000").await.unwrap();
        set_customer(
            &state,
            &access,
            &session,
            DraftCustomer {
                name: "Asha".into(),
                ..DraftCustomer::default()
            },
        )
        .await
        .unwrap();

        let (_, in_flight) = state.drafts.begin_commit(&session).unwrap();
        let err = commit_invoice(&state, &access, &session).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        let err = update_line(&state, &access, &session, 0, LineField::Quantity, "3")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        drop(in_flight);

        let invoice = commit_invoice(&state, &access, &session).await.unwrap();
        assert_eq!(invoice.invoice_number, "INV-000001");
        assert!(state
            .database()
            .invoices()
            .get_by_number("INV-000002")
            .await
            .unwrap()
            .is_none());
        assert!(get_session(&state, &access, &session).unwrap().draft.lines().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_survive_restart() {
        let state = state().await;
        let access = admin();
        let opened = open_session(&state, &access, Some("Fatima")).await.unwrap();
        add_line(&state, &access, &opened.session_id, LineKind::Manual).await.unwrap();

        let first = state.drafts.first_id().unwrap();
        reset_session(&state, &access, &first).await.unwrap();

        let reopened = AppState::with_database(state.database().clone(), state.config.clone())
            .await
            .unwrap();
        let sessions = list_sessions(&reopened, &access).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[1].label, "Fatima");
        assert_eq!(sessions[1].line_count, 1);

        close_session(&reopened, &access, &opened.session_id).await.unwrap();
        assert_eq!(reopened.database().drafts().load_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_select_customer_copies_snapshot() {
        let state = state().await;
        let access = admin();
        let session = state.drafts.first_id().unwrap();
        let customer = state
            .database()
            .customers()
            .create(NewCustomer {
                name: "Lakshmi Iyer".into(),
                phone: Some("9444055667".into()),
                address: None,
                state: Some("Tamil Nadu".into()),
            })
            .await
            .unwrap();

        let view = select_customer(&state, &access, &session, &customer.id).await.unwrap();
        assert_eq!(view.draft.customer.customer_id.as_deref(), Some(customer.id.as_str()));
        assert_eq!(view.draft.customer.phone, "9444055667");

        let err = select_customer(&state, &access, &session, "missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_billing_permission_required() {
        let state = state().await;
        let session = state.drafts.first_id().unwrap();
        let clerk = AccessProfile::new("clerk", Role::Staff, vec![PermissionKey::Inventory]);

        let err = add_line(&state, &clerk, &session, LineKind::Manual).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert!(list_sessions(&state, &clerk).is_err());
    }
}
