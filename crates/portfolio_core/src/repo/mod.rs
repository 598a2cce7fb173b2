//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define row-level data access contracts for both aggregates.
//! - Define the `Store` seam that owns transactions.
//! - Isolate SQLite query details from services and the coordinator.
//!
//! # Invariants
//! - Field updates and deletes by id return `NotFound` when no row matched.
//! - Every write issued inside `Store::write` commits or rolls back as one
//!   unit.

use crate::db::DbError;
use crate::model::category::{Category, CategoryFields, SkillFields};
use crate::model::work::{ImageFields, Work, WorkFields};
use crate::model::RecordId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod category_repo;
pub mod memory;
pub mod store;
pub mod work_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Entity names used in repository and service errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Category,
    Skill,
    Work,
    WorkImage,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Skill => "skill",
            Self::Work => "work",
            Self::WorkImage => "work image",
        }
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: Entity, id: RecordId },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Persisted data cannot be converted into a read model.
    InvalidData(String),
    /// Non-SQLite backend refused a write.
    Backend(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Backend(message) => write!(f, "store write failed: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Row-level operations on categories and their skills.
pub trait CategoryRepository {
    /// All categories with skills, ordered by id.
    fn list_categories(&self) -> RepoResult<Vec<Category>>;
    /// One category with its skills.
    fn get_category(&self, id: RecordId) -> RepoResult<Option<Category>>;
    fn insert_category(&self, fields: &CategoryFields) -> RepoResult<RecordId>;
    fn update_category(&self, id: RecordId, fields: &CategoryFields) -> RepoResult<()>;
    /// Deletes the category row only; skills must be gone already.
    fn delete_category(&self, id: RecordId) -> RepoResult<()>;
    fn insert_skill(&self, category_id: RecordId, fields: &SkillFields) -> RepoResult<RecordId>;
    fn update_skill(&self, id: RecordId, fields: &SkillFields) -> RepoResult<()>;
    fn delete_skill(&self, id: RecordId) -> RepoResult<()>;
    /// Deletes every skill of a category and returns how many rows went.
    fn delete_skills_of(&self, category_id: RecordId) -> RepoResult<usize>;
}

/// Row-level operations on works and their images.
pub trait WorkRepository {
    fn list_works(&self) -> RepoResult<Vec<Work>>;
    fn get_work(&self, id: RecordId) -> RepoResult<Option<Work>>;
    fn insert_work(&self, fields: &WorkFields) -> RepoResult<RecordId>;
    fn update_work(&self, id: RecordId, fields: &WorkFields) -> RepoResult<()>;
    fn delete_work(&self, id: RecordId) -> RepoResult<()>;
    fn insert_image(&self, work_id: RecordId, fields: &ImageFields) -> RepoResult<RecordId>;
    fn update_image(&self, id: RecordId, fields: &ImageFields) -> RepoResult<()>;
    fn delete_image(&self, id: RecordId) -> RepoResult<()>;
    fn delete_images_of(&self, work_id: RecordId) -> RepoResult<usize>;
    /// Urls of every image row across all works.
    fn list_image_urls(&self) -> RepoResult<Vec<String>>;
}

/// Full repository surface handed to store callbacks.
pub trait Repository: CategoryRepository + WorkRepository {}

impl<T: CategoryRepository + WorkRepository> Repository for T {}

pub use memory::MemoryStore;
pub use store::{SqliteRepository, SqliteStore, Store};
