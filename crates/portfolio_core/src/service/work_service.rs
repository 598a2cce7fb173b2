//! Work use cases with post-commit image file cleanup.
//!
//! # Invariants
//! - Image files are removed only after the transaction that dropped their
//!   rows has committed; cleanup outcomes never change the result.
//! - A file still referenced by any image row, in any url form, is kept.
//! - Child ids submitted to `create` are ignored; every image is new.

use super::category_service::log_failure;
use super::{delete_within, ensure_path_id, update_within, DeleteReport, ServiceError, ServiceResult};
use crate::assets::{CleanupReport, UploadStore, UploadedAsset};
use crate::coordinator::{apply_create, Works};
use crate::model::work::{ImageFields, Work, WorkDraft, WorkImage};
use crate::model::RecordId;
use crate::repo::{Entity, RepoResult, Repository, Store, WorkRepository};
use log::info;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

/// Work service facade over a store and the uploads directory.
pub struct WorkService<S: Store> {
    store: S,
    uploads: UploadStore,
}

impl<S: Store> WorkService<S> {
    pub fn new(store: S, uploads: UploadStore) -> Self {
        Self { store, uploads }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// All works with images, ordered by id.
    pub fn list(&self) -> ServiceResult<Vec<Work>> {
        Ok(self.store.read(|repo| repo.list_works())?)
    }

    pub fn get(&self, id: RecordId) -> ServiceResult<Work> {
        self.store
            .read(|repo| repo.get_work(id))?
            .ok_or(ServiceError::NotFound {
                entity: Entity::Work,
                id,
            })
    }

    /// Inserts the work and all submitted images in one transaction.
    pub fn create(&mut self, draft: &WorkDraft) -> ServiceResult<Work> {
        let started_at = Instant::now();
        let images: Vec<ImageFields> = draft
            .images
            .iter()
            .map(|image| image.fields.clone())
            .collect();
        let id = self
            .store
            .write(|repo| {
                apply_create(&Works(repo), &draft.fields, &images).map_err(ServiceError::from)
            })
            .inspect_err(|err| log_failure("work_create", None, err))?;

        info!(
            "event=work_create module=service status=ok id={id} images={} duration_ms={}",
            images.len(),
            started_at.elapsed().as_millis()
        );
        self.reload(id, "created work not found in read-back")
    }

    /// Replaces scalars, reconciles images, then removes dropped files.
    pub fn update(&mut self, id: RecordId, draft: &WorkDraft) -> ServiceResult<Work> {
        let started_at = Instant::now();
        ensure_path_id(id, draft.id)?;
        let uploads = &self.uploads;
        let (applied, orphans) = self
            .store
            .write(|repo| {
                let applied = update_within(&Works(repo), id, &draft.fields, &draft.images)?;
                let orphans = orphaned_urls(repo, uploads, &applied.deleted)?;
                Ok::<_, ServiceError>((applied, orphans))
            })
            .inspect_err(|err| log_failure("work_update", Some(id), err))?;

        let files = self.remove_files(&orphans);
        info!(
            "event=work_update module=service status=ok id={id} created={} updated={} deleted={} files_removed={} files_missing={} files_failed={} duration_ms={}",
            applied.created_ids.len(),
            applied.updated,
            applied.deleted.len(),
            files.removed,
            files.missing,
            files.failed,
            started_at.elapsed().as_millis()
        );
        self.reload(id, "updated work not found in read-back")
    }

    /// Deletes images and the work, then removes their files.
    pub fn delete(&mut self, id: RecordId) -> ServiceResult<DeleteReport> {
        let started_at = Instant::now();
        let uploads = &self.uploads;
        let (applied, orphans) = self
            .store
            .write(|repo| {
                let applied = delete_within(&Works(repo), id)?;
                let orphans = orphaned_urls(repo, uploads, &applied.removed_children)?;
                Ok::<_, ServiceError>((applied, orphans))
            })
            .inspect_err(|err| log_failure("work_delete", Some(id), err))?;

        let files = self.remove_files(&orphans);
        info!(
            "event=work_delete module=service status=ok id={id} images={} files_removed={} duration_ms={}",
            applied.removed_rows,
            files.removed,
            started_at.elapsed().as_millis()
        );
        Ok(DeleteReport {
            children_removed: applied.removed_rows,
            files,
        })
    }

    /// Stores an uploaded image file; the returned url is what an image
    /// draft should carry.
    pub fn upload_image(&self, file_name: &str, bytes: &[u8]) -> ServiceResult<UploadedAsset> {
        Ok(self.uploads.store_upload(file_name, bytes)?)
    }

    fn remove_files(&self, urls: &[String]) -> CleanupReport {
        self.uploads.remove_orphans(urls.iter().map(String::as_str))
    }

    fn reload(&self, id: RecordId, details: &'static str) -> ServiceResult<Work> {
        self.store
            .read(|repo| repo.get_work(id))?
            .ok_or(ServiceError::InconsistentState(details))
    }
}

/// Urls of `removed` images whose file no remaining image row points at.
///
/// Runs inside the write so the remaining rows are the ones about to commit.
/// Unresolvable urls pass through and are counted as failures by cleanup.
fn orphaned_urls(
    repo: &dyn Repository,
    uploads: &UploadStore,
    removed: &[WorkImage],
) -> RepoResult<Vec<String>> {
    if removed.is_empty() {
        return Ok(Vec::new());
    }
    let live: HashSet<PathBuf> = repo
        .list_image_urls()?
        .iter()
        .filter_map(|url| uploads.resolve_path(url).ok())
        .collect();

    let mut claimed = HashSet::new();
    Ok(removed
        .iter()
        .filter(|image| match uploads.resolve_path(&image.url) {
            Ok(path) => !live.contains(&path) && claimed.insert(path),
            Err(_) => true,
        })
        .map(|image| image.url.clone())
        .collect())
}
