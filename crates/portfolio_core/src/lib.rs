//! Core of the portfolio content backend.
//!
//! Owns the two content aggregates (skill categories and works), their
//! storage, child-collection reconciliation and uploaded file lifecycle.

pub mod assets;
pub mod config;
pub mod coordinator;
pub mod db;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod repo;
pub mod service;

pub use assets::{CleanupReport, DeleteOutcome, UploadStore, UploadedAsset};
pub use config::{AppConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::category::{Category, CategoryDraft, Skill, SkillDraft};
pub use model::work::{ImageDraft, Work, WorkDraft, WorkImage};
pub use model::RecordId;
pub use reconcile::{reconcile, Partition, ReconcileError};
pub use repo::{Entity, MemoryStore, RepoError, RepoResult, SqliteStore, Store};
pub use service::{
    CategoryService, DeleteReport, ErrorKind, ServiceError, ServiceResult, WorkService,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
