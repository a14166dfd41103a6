//! # State Module
//!
//! Long-lived state shared by every command.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │                         AppState                                        │
//! │          ┌──────────────────┼──────────────────┐                        │
//! │          ▼                  ▼                  ▼                        │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────┐               │
//! │  │   DbState    │  │  DraftStore  │  │   AdminConfig    │               │
//! │  │              │  │              │  │                  │               │
//! │  │  Database    │  │  Arc<Mutex<  │  │  store           │               │
//! │  │  (SQLite     │  │   sessions   │  │  billing         │               │
//! │  │   pool)      │  │  >>          │  │  database        │               │
//! │  └──────────────┘  └──────────────┘  └──────────────────┘               │
//! │                                                                         │
//! │  THREAD SAFETY:                                                         │
//! │  • DbState: Database has internal connection pool (thread-safe)         │
//! │  • DraftStore: Protected by Arc<Mutex<T>> for exclusive access          │
//! │  • AdminConfig: Read-only after initialization                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod drafts;

pub use config::{
    AdminConfig, BillingSettings, ConfigError, ConfigResult, DatabaseSettings, StoreSettings, CONFIG_FILE_NAME,
};
pub use db::DbState;
pub use drafts::{CommitGuard, DraftSession, DraftStore, SessionSummary, DEFAULT_SESSION_LABEL};
