//! # Staff Repository
//!
//! Staff profiles and their per-module permission rows.
//!
//! A missing permission row means "not allowed". Admins ignore the rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tillbook_core::validation::validate_customer_name;
use tillbook_core::{AccessProfile, PermissionKey, Role, ValidationError};

/// A back-office user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StaffProfile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Repository for staff profiles and permissions.
#[derive(Debug, Clone)]
pub struct StaffRepository {
    pool: SqlitePool,
}

impl StaffRepository {
    /// Creates a new StaffRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StaffRepository { pool }
    }

    /// Creates a profile.
    ///
    /// ## Errors
    /// * `DbError::UniqueViolation` - the email is taken
    pub async fn create(&self, email: &str, full_name: Option<&str>, role: Role) -> DbResult<StaffProfile> {
        let email = email.trim().to_ascii_lowercase();
        if !email.contains('@') {
            return Err(ValidationError::InvalidFormat {
                field: "email".to_string(),
                reason: "must contain @".to_string(),
            }
            .into());
        }
        let full_name = match full_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => {
                validate_customer_name(name)?;
                Some(name.to_string())
            }
            None => None,
        };

        let profile = StaffProfile {
            id: Uuid::new_v4().to_string(),
            email,
            full_name,
            role,
            created_at: Utc::now(),
        };

        debug!(id = %profile.id, email = %profile.email, role = %profile.role, "Inserting staff profile");

        sqlx::query(
            r#"
            INSERT INTO staff_profiles (id, email, full_name, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(profile.role)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, profile.email.clone()),
            other => other,
        })?;

        Ok(profile)
    }

    /// Gets a profile by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<StaffProfile>> {
        let profile = sqlx::query_as::<_, StaffProfile>("SELECT * FROM staff_profiles WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    /// Gets a profile by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<StaffProfile>> {
        let profile = sqlx::query_as::<_, StaffProfile>("SELECT * FROM staff_profiles WHERE email = ?1")
            .bind(email.trim().to_ascii_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    pub async fn list(&self) -> DbResult<Vec<StaffProfile>> {
        let profiles = sqlx::query_as::<_, StaffProfile>("SELECT * FROM staff_profiles ORDER BY email")
            .fetch_all(&self.pool)
            .await?;

        Ok(profiles)
    }

    pub async fn set_role(&self, id: &str, role: Role) -> DbResult<()> {
        debug!(id = %id, role = %role, "Updating staff role");

        let result = sqlx::query("UPDATE staff_profiles SET role = ?2 WHERE id = ?1")
            .bind(id)
            .bind(role)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Staff", id));
        }
        Ok(())
    }

    /// Grants or revokes one module.
    pub async fn set_permission(&self, staff_id: &str, key: PermissionKey, allowed: bool) -> DbResult<()> {
        debug!(staff_id = %staff_id, permission = %key, allowed = allowed, "Setting staff permission");

        sqlx::query(
            r#"
            INSERT INTO staff_permissions (staff_id, permission_key, allowed, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (staff_id, permission_key)
            DO UPDATE SET allowed = excluded.allowed, updated_at = excluded.updated_at
            "#,
        )
        .bind(staff_id)
        .bind(key)
        .bind(allowed)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Modules with an allowed row.
    pub async fn allowed_permissions(&self, staff_id: &str) -> DbResult<Vec<PermissionKey>> {
        let keys = sqlx::query_scalar::<_, PermissionKey>(
            "SELECT permission_key FROM staff_permissions WHERE staff_id = ?1 AND allowed = 1",
        )
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    /// What `staff_id` may do.
    pub async fn access_profile(&self, staff_id: &str) -> DbResult<AccessProfile> {
        let profile = self
            .get(staff_id)
            .await?
            .ok_or_else(|| DbError::not_found("Staff", staff_id))?;
        let allowed = self.allowed_permissions(staff_id).await?;

        Ok(AccessProfile::new(profile.id, profile.role, allowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_staff_access_follows_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let staff = db.staff().create("Meera@Shop.in", Some("Meera"), Role::Staff).await.unwrap();
        assert_eq!(staff.email, "meera@shop.in");

        db.staff().set_permission(&staff.id, PermissionKey::Billing, true).await.unwrap();
        db.staff().set_permission(&staff.id, PermissionKey::Inventory, true).await.unwrap();
        db.staff().set_permission(&staff.id, PermissionKey::Inventory, false).await.unwrap();

        let access = db.staff().access_profile(&staff.id).await.unwrap();
        assert!(access.can(PermissionKey::Billing));
        assert!(!access.can(PermissionKey::Inventory));
        assert_eq!(access.modules(), vec![PermissionKey::Billing]);
    }

    #[tokio::test]
    async fn test_admin_needs_no_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let admin = db.staff().create("owner@shop.in", None, Role::Admin).await.unwrap();

        let access = db.staff().access_profile(&admin.id).await.unwrap();
        assert_eq!(access.modules().len(), PermissionKey::ALL.len());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.staff().create("a@shop.in", None, Role::Staff).await.unwrap();
        let err = db.staff().create("A@shop.in", None, Role::User).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_staff_is_not_found() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.staff().access_profile("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        db.staff().create("s@shop.in", None, Role::User).await.unwrap();
        let found = db.staff().get_by_email("S@SHOP.IN").await.unwrap();
        assert_eq!(found.map(|p| p.role), Some(Role::User));
    }
}
