//! Aggregate use-case services.
//!
//! # Responsibility
//! - Run each use case as one `Store::write` unit: load, reconcile, apply.
//! - Reload the committed aggregate for the caller.
//! - Trigger file cleanup strictly after commit.
//!
//! # Invariants
//! - Unknown parents and unknown child ids fail before any write is issued.
//! - A failed use case leaves the store unchanged.

use crate::assets::CleanupReport;
use crate::coordinator::{apply_delete, apply_update, AggregateTable, AppliedDelete, AppliedUpdate};
use crate::model::{ChildDraft, RecordId};
use crate::reconcile::reconcile;

pub mod category_service;
pub mod error;
pub mod work_service;

pub use category_service::CategoryService;
pub use error::{ErrorKind, ServiceError};
pub use work_service::WorkService;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Outcome of a whole-aggregate delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub children_removed: usize,
    /// Files cleaned up after commit; all zero for aggregates without files.
    pub files: CleanupReport,
}

/// Loads the current aggregate, plans its children and applies the plan.
fn update_within<T, D>(
    table: &T,
    id: RecordId,
    fields: &T::Fields,
    drafts: &[D],
) -> ServiceResult<AppliedUpdate<T::Child>>
where
    T: AggregateTable,
    D: ChildDraft<Fields = T::ChildFields>,
{
    let current = table
        .load(id)?
        .ok_or(ServiceError::NotFound { entity: T::PARENT, id })?;
    let plan = reconcile(id, T::children(&current), drafts)
        .map_err(|err| ServiceError::unknown_child(T::CHILD, err))?;
    Ok(apply_update(table, id, fields, plan)?)
}

/// Loads the current aggregate and removes it with its children.
fn delete_within<T: AggregateTable>(
    table: &T,
    id: RecordId,
) -> ServiceResult<AppliedDelete<T::Child>> {
    let current = table
        .load(id)?
        .ok_or(ServiceError::NotFound { entity: T::PARENT, id })?;
    Ok(apply_delete(table, id, &current)?)
}

/// Rejects an update body whose own id addresses another record.
fn ensure_path_id(path_id: RecordId, body_id: Option<RecordId>) -> ServiceResult<()> {
    match body_id {
        Some(body_id) if body_id != path_id => Err(ServiceError::BadRequest(format!(
            "payload id {body_id} does not match addressed id {path_id}"
        ))),
        _ => Ok(()),
    }
}
