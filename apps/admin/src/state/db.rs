//! # Database State
//!
//! Wraps the `Database` connection for use in commands.
//!
//! ## Thread Safety
//! The `Database` struct from `tillbook-db` contains a `SqlitePool` which
//! is inherently thread-safe. Multiple commands can execute queries
//! concurrently without explicit locking.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn search_customers(state: &AppState, access: &AccessProfile, query: &str) -> ApiResult<Vec<Customer>> {
//!     access.require(PermissionKey::Customers)?;
//!     Ok(state.db.inner().customers().search(query, 10).await?)
//! }
//! ```

use tillbook_db::Database;

/// Wrapper around `Database` held by [`crate::AppState`].
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    /// Creates a new DbState wrapping the database connection.
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }
}
