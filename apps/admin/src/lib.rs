//! # Tillbook Admin Library
//!
//! Back-office application layer: state, commands and the API error type.
//! The `tillbook-admin` binary and any front end drive it through
//! [`AppState`] and the functions in [`commands`].
//!
//! ## Module Organization
//! ```text
//! tillbook_admin/
//! ├── lib.rs          ◄─── You are here (AppState, tracing setup)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── drafts.rs   ◄─── Open invoice sessions
//! │   └── config.rs   ◄─── admin.toml + TILLBOOK_* overrides
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── invoice.rs  ◄─── Draft editing and commit
//! │   ├── archive.rs  ◄─── Invoice list, status, payments
//! │   ├── catalog.rs  ◄─── Products, variants, CSV import
//! │   ├── customer.rs ◄─── Customer records
//! │   ├── report.rs   ◄─── Daily income and inventory
//! │   └── staff.rs    ◄─── Profiles and permissions
//! └── error.rs        ◄─── API error type for commands
//! ```

pub mod commands;
pub mod error;
pub mod state;

use tracing::info;
use tracing_subscriber::EnvFilter;

use tillbook_db::Database;

pub use error::{ApiError, ApiResult, ErrorCode};
use state::{AdminConfig, DbState, DraftStore};

/// Everything a command needs.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Application Startup                               │
/// │                                                                         │
/// │  1. Load Configuration ───────────────────────────────────────────────► │
/// │     • defaults → admin.toml → TILLBOOK_* → validate()                   │
/// │                                                                         │
/// │  2. Connect to Database ──────────────────────────────────────────────► │
/// │     • SQLite with WAL mode                                              │
/// │     • Run pending migrations                                            │
/// │                                                                         │
/// │  3. Restore Draft Sessions ───────────────────────────────────────────► │
/// │     • invoice_drafts rows in tab order                                  │
/// │     • none saved: one empty "New Invoice"                               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: DbState,
    pub drafts: DraftStore,
    pub config: AdminConfig,
}

impl AppState {
    /// Connects to the configured database and restores open drafts.
    pub async fn open(config: AdminConfig) -> ApiResult<Self> {
        let db_path = config.database_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ApiError::internal(format!("Cannot create data directory: {}", e)))?;
        }
        info!(?db_path, "Database path determined");

        let db = Database::new(config.db_config()).await?;
        info!("Database connected and migrations applied");

        Self::with_database(db, config).await
    }

    /// Builds state around an already-open database.
    pub async fn with_database(db: Database, config: AdminConfig) -> ApiResult<Self> {
        let stored = db.drafts().load_all().await?;
        let restored = stored.len();
        let drafts = DraftStore::restore(stored, config.new_draft());

        info!(restored = restored, sessions = drafts.len(), "State initialized");

        Ok(AppState {
            db: DbState::new(db),
            drafts,
            config,
        })
    }

    #[inline]
    pub fn database(&self) -> &Database {
        self.db.inner()
    }
}

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tillbook=debug,sqlx=warn";

/// `RUST_LOG` when set and valid, else [`DEFAULT_LOG_FILTER`].
pub fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tillbook_db=trace` - Show trace for the database crate only
/// - Default: INFO, DEBUG for tillbook crates, WARN for sqlx
pub fn init_tracing() {
    tracing_subscriber::fmt().with_env_filter(log_filter()).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_default_filter_quiets_sqlx() {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(DEFAULT_LOG_FILTER))
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            assert!(!tracing::enabled!(target: "sqlx::query", Level::INFO));
            assert!(tracing::enabled!(target: "sqlx::query", Level::WARN));
            assert!(tracing::enabled!(target: "tillbook_db::repository::invoice", Level::DEBUG));
            assert!(!tracing::enabled!(target: "tillbook_admin", Level::TRACE));
            assert!(!tracing::enabled!(target: "hyper", Level::DEBUG));
        });
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use tillbook_core::AccessProfile;
    use tillbook_db::DbConfig;

    use super::*;

    /// Fresh in-memory state with default configuration.
    pub async fn state() -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AppState::with_database(db, AdminConfig::default()).await.unwrap()
    }

    pub fn admin() -> AccessProfile {
        AccessProfile::admin("owner")
    }
}
