//! # Staff Access
//!
//! Which back-office modules a signed-in user may open.
//!
//! ```text
//! admin  ──► everything
//! staff  ──► modules with an allowed permission row
//! user   ──► nothing (storefront customer)
//! ```

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["user".into(), "staff".into(), "admin".into()],
            }),
        }
    }
}

/// A back-office module gated per staff member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKey {
    Inventory,
    Billing,
    InvoiceArchive,
    Customers,
}

impl PermissionKey {
    pub const ALL: [PermissionKey; 4] = [
        PermissionKey::Inventory,
        PermissionKey::Billing,
        PermissionKey::InvoiceArchive,
        PermissionKey::Customers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKey::Inventory => "inventory",
            PermissionKey::Billing => "billing",
            PermissionKey::InvoiceArchive => "invoice_archive",
            PermissionKey::Customers => "customers",
        }
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "permission_key".to_string(),
                allowed: PermissionKey::ALL.iter().map(|k| k.as_str().to_string()).collect(),
            })
    }
}

/// What the acting user is allowed to do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessProfile {
    pub staff_id: String,
    pub role: Role,
    allowed: HashSet<PermissionKey>,
}

impl AccessProfile {
    pub fn new(
        staff_id: impl Into<String>,
        role: Role,
        allowed: impl IntoIterator<Item = PermissionKey>,
    ) -> Self {
        AccessProfile {
            staff_id: staff_id.into(),
            role,
            allowed: allowed.into_iter().collect(),
        }
    }

    /// A profile with full access.
    pub fn admin(staff_id: impl Into<String>) -> Self {
        AccessProfile::new(staff_id, Role::Admin, [])
    }

    pub fn can(&self, key: PermissionKey) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Staff => self.allowed.contains(&key),
            Role::User => false,
        }
    }

    /// Errors with [`CoreError::PermissionDenied`] unless [`Self::can`].
    pub fn require(&self, key: PermissionKey) -> CoreResult<()> {
        if self.can(key) {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied {
                permission: key.as_str().to_string(),
            })
        }
    }

    /// Modules shown in the navigation.
    pub fn modules(&self) -> Vec<PermissionKey> {
        PermissionKey::ALL.into_iter().filter(|k| self.can(*k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_can_everything() {
        let admin = AccessProfile::admin("a1");
        assert!(PermissionKey::ALL.iter().all(|k| admin.can(*k)));
        assert_eq!(admin.modules().len(), 4);
    }

    #[test]
    fn test_staff_limited_to_rows() {
        let staff = AccessProfile::new("s1", Role::Staff, [PermissionKey::Billing]);
        assert!(staff.require(PermissionKey::Billing).is_ok());
        let err = staff.require(PermissionKey::Inventory).unwrap_err();
        assert_eq!(err.to_string(), "Permission denied: inventory");
        assert_eq!(staff.modules(), vec![PermissionKey::Billing]);
    }

    #[test]
    fn test_user_has_nothing() {
        let user = AccessProfile::new("u1", Role::User, PermissionKey::ALL);
        assert!(user.modules().is_empty());
    }

    #[test]
    fn test_parse_keys() {
        assert_eq!(
            "invoice_archive".parse::<PermissionKey>().unwrap(),
            PermissionKey::InvoiceArchive
        );
        assert!("reports".parse::<PermissionKey>().is_err());
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
    }
}
