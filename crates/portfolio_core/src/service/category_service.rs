//! Category use cases.
//!
//! # Invariants
//! - `update` replaces scalars and reconciles the full skill collection.
//! - Child ids submitted to `create` are ignored; every skill is new.

use super::{delete_within, ensure_path_id, update_within, DeleteReport, ServiceError, ServiceResult};
use crate::coordinator::{apply_create, Categories};
use crate::model::category::{Category, CategoryDraft, SkillFields};
use crate::model::RecordId;
use crate::repo::{CategoryRepository, Entity, Store};
use log::{info, warn};
use std::time::Instant;

/// Category service facade over a store.
pub struct CategoryService<S: Store> {
    store: S,
}

impl<S: Store> CategoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All categories with skills, ordered by id.
    pub fn list(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.store.read(|repo| repo.list_categories())?)
    }

    pub fn get(&self, id: RecordId) -> ServiceResult<Category> {
        self.store
            .read(|repo| repo.get_category(id))?
            .ok_or(ServiceError::NotFound {
                entity: Entity::Category,
                id,
            })
    }

    /// Inserts the category and all submitted skills in one transaction.
    pub fn create(&mut self, draft: &CategoryDraft) -> ServiceResult<Category> {
        let started_at = Instant::now();
        let skills: Vec<SkillFields> = draft
            .skills
            .iter()
            .map(|skill| skill.fields.clone())
            .collect();
        let id = self
            .store
            .write(|repo| {
                apply_create(&Categories(repo), &draft.fields, &skills).map_err(ServiceError::from)
            })
            .inspect_err(|err| log_failure("category_create", None, err))?;

        info!(
            "event=category_create module=service status=ok id={id} skills={} duration_ms={}",
            skills.len(),
            started_at.elapsed().as_millis()
        );
        self.reload(id, "created category not found in read-back")
    }

    /// Replaces scalars and reconciles skills against the submitted list.
    pub fn update(&mut self, id: RecordId, draft: &CategoryDraft) -> ServiceResult<Category> {
        let started_at = Instant::now();
        ensure_path_id(id, draft.id)?;
        let applied = self
            .store
            .write(|repo| update_within(&Categories(repo), id, &draft.fields, &draft.skills))
            .inspect_err(|err| log_failure("category_update", Some(id), err))?;

        info!(
            "event=category_update module=service status=ok id={id} created={} updated={} deleted={} duration_ms={}",
            applied.created_ids.len(),
            applied.updated,
            applied.deleted.len(),
            started_at.elapsed().as_millis()
        );
        self.reload(id, "updated category not found in read-back")
    }

    /// Deletes skills, then the category.
    pub fn delete(&mut self, id: RecordId) -> ServiceResult<DeleteReport> {
        let started_at = Instant::now();
        let applied = self
            .store
            .write(|repo| delete_within(&Categories(repo), id))
            .inspect_err(|err| log_failure("category_delete", Some(id), err))?;

        info!(
            "event=category_delete module=service status=ok id={id} skills={} duration_ms={}",
            applied.removed_rows,
            started_at.elapsed().as_millis()
        );
        Ok(DeleteReport {
            children_removed: applied.removed_rows,
            ..DeleteReport::default()
        })
    }

    fn reload(&self, id: RecordId, details: &'static str) -> ServiceResult<Category> {
        self.store
            .read(|repo| repo.get_category(id))?
            .ok_or(ServiceError::InconsistentState(details))
    }
}

pub(super) fn log_failure(event: &str, id: Option<RecordId>, err: &ServiceError) {
    let id = id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
    warn!(
        "event={event} module=service status=error id={id} error_code={} error={err}",
        err.kind().as_str()
    );
}
