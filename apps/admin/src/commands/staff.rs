//! # Staff Commands
//!
//! Profiles and per-module permissions. Only admins manage staff; anyone
//! may look up their own modules.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use tillbook_core::{AccessProfile, CoreError, CoreResult, PermissionKey, Role};
use tillbook_db::StaffProfile;

/// A profile plus the modules it opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffAccess {
    pub profile: StaffProfile,
    pub modules: Vec<PermissionKey>,
}

fn require_admin(access: &AccessProfile) -> CoreResult<()> {
    if access.role == Role::Admin {
        Ok(())
    } else {
        Err(CoreError::PermissionDenied {
            permission: "admin".to_string(),
        })
    }
}

/// Resolves who is acting from their login email.
pub async fn sign_in(state: &AppState, email: &str) -> ApiResult<AccessProfile> {
    let profile = state
        .database()
        .staff()
        .get_by_email(email)
        .await?
        .ok_or_else(|| ApiError::not_found("Staff", email))?;

    Ok(state.database().staff().access_profile(&profile.id).await?)
}

/// Modules for the caller's navigation.
pub fn my_modules(access: &AccessProfile) -> Vec<PermissionKey> {
    access.modules()
}

pub async fn create_staff(
    state: &AppState,
    access: &AccessProfile,
    email: &str,
    full_name: Option<&str>,
    role: Role,
) -> ApiResult<StaffProfile> {
    require_admin(access)?;

    let profile = state.database().staff().create(email, full_name, role).await?;

    info!(staff_id = %profile.id, role = %profile.role, by = %access.staff_id, "Staff profile created");
    Ok(profile)
}

pub async fn list_staff(state: &AppState, access: &AccessProfile) -> ApiResult<Vec<StaffProfile>> {
    require_admin(access)?;
    Ok(state.database().staff().list().await?)
}

pub async fn staff_access(state: &AppState, access: &AccessProfile, staff_id: &str) -> ApiResult<StaffAccess> {
    require_admin(access)?;

    let db = state.database();
    let profile = db
        .staff()
        .get(staff_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Staff", staff_id))?;
    let modules = db.staff().access_profile(staff_id).await?.modules();

    Ok(StaffAccess { profile, modules })
}

pub async fn set_role(state: &AppState, access: &AccessProfile, staff_id: &str, role: Role) -> ApiResult<()> {
    require_admin(access)?;
    if staff_id == access.staff_id && role != Role::Admin {
        return Err(ApiError::validation("You cannot remove your own admin role"));
    }

    state.database().staff().set_role(staff_id, role).await?;

    info!(staff_id = %staff_id, role = %role, by = %access.staff_id, "Staff role changed");
    Ok(())
}

/// Grants or revokes one module.
pub async fn set_permission(
    state: &AppState,
    access: &AccessProfile,
    staff_id: &str,
    key: PermissionKey,
    allowed: bool,
) -> ApiResult<StaffAccess> {
    require_admin(access)?;

    state.database().staff().set_permission(staff_id, key, allowed).await?;
    info!(staff_id = %staff_id, permission = %key, allowed = allowed, by = %access.staff_id, "Staff permission set");

    staff_access(state, access, staff_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::state;
    use crate::ErrorCode;

    #[tokio::test]
    async fn test_admin_grants_modules() {
        let state = state().await;
        let owner = state
            .database()
            .staff()
            .create("owner@shop.in", Some("Owner"), Role::Admin)
            .await
            .unwrap();
        let admin = sign_in(&state, "OWNER@shop.in").await.unwrap();
        assert_eq!(admin.staff_id, owner.id);

        let meera = create_staff(&state, &admin, "meera@shop.in", Some("Meera"), Role::Staff).await.unwrap();
        let view = set_permission(&state, &admin, &meera.id, PermissionKey::Billing, true).await.unwrap();
        assert_eq!(view.modules, vec![PermissionKey::Billing]);

        let signed_in = sign_in(&state, "meera@shop.in").await.unwrap();
        assert_eq!(my_modules(&signed_in), vec![PermissionKey::Billing]);
        assert_eq!(list_staff(&state, &admin).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_staff_cannot_manage_staff() {
        let state = state().await;
        let meera = AccessProfile::new("m", Role::Staff, PermissionKey::ALL);

        let err = create_staff(&state, &meera, "x@shop.in", None, Role::Admin).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(err.message, "Permission denied: admin");
    }

    #[tokio::test]
    async fn test_admin_keeps_own_role() {
        let state = state().await;
        let owner = state
            .database()
            .staff()
            .create("owner@shop.in", None, Role::Admin)
            .await
            .unwrap();
        let admin = AccessProfile::admin(owner.id.clone());

        let err = set_role(&state, &admin, &owner.id, Role::Staff).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = sign_in(&state, "nobody@shop.in").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
