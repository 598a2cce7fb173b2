//! In-memory `Store` for tests and embedding.
//!
//! # Invariants
//! - `write` snapshots all tables and restores them when the callback fails.
//! - Child inserts require an existing parent and parent deletes require no
//!   remaining children, mirroring the SQLite foreign keys.
//! - An optional write budget makes the N+1-th write fail, for atomicity
//!   checks.

use super::{
    CategoryRepository, Entity, RepoError, RepoResult, Repository, Store, WorkRepository,
};
use crate::model::category::{Category, CategoryFields, Skill, SkillFields};
use crate::model::work::{ImageFields, Work, WorkFields, WorkImage};
use crate::model::RecordId;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: RecordId,
    categories: BTreeMap<RecordId, CategoryFields>,
    skills: BTreeMap<RecordId, Skill>,
    works: BTreeMap<RecordId, WorkFields>,
    images: BTreeMap<RecordId, WorkImage>,
}

impl Tables {
    fn mint_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }
}

/// Store keeping every table in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RefCell<Tables>,
    write_budget: Cell<Option<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `writes` more successful writes; the next one fails.
    pub fn fail_writes_after(&self, writes: usize) {
        self.write_budget.set(Some(writes));
    }

    /// Removes any write budget.
    pub fn clear_write_budget(&self) {
        self.write_budget.set(None);
    }

    fn spend_write(&self) -> RepoResult<()> {
        match self.write_budget.get() {
            None => Ok(()),
            Some(0) => Err(RepoError::Backend("write budget exhausted".to_string())),
            Some(remaining) => {
                self.write_budget.set(Some(remaining - 1));
                Ok(())
            }
        }
    }
}

impl Store for MemoryStore {
    fn read<T, E>(&self, op: impl FnOnce(&dyn Repository) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        op(self)
    }

    fn write<T, E>(&mut self, op: impl FnOnce(&dyn Repository) -> Result<T, E>) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        let snapshot = self.tables.borrow().clone();
        let outcome = op(&*self);
        if outcome.is_err() {
            *self.tables.borrow_mut() = snapshot;
        }
        outcome
    }
}

impl CategoryRepository for MemoryStore {
    fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let tables = self.tables.borrow();
        Ok(tables
            .categories
            .iter()
            .map(|(id, fields)| build_category(&tables, *id, fields))
            .collect())
    }

    fn get_category(&self, id: RecordId) -> RepoResult<Option<Category>> {
        let tables = self.tables.borrow();
        Ok(tables
            .categories
            .get(&id)
            .map(|fields| build_category(&tables, id, fields)))
    }

    fn insert_category(&self, fields: &CategoryFields) -> RepoResult<RecordId> {
        self.spend_write()?;
        let mut tables = self.tables.borrow_mut();
        let id = tables.mint_id();
        tables.categories.insert(id, fields.clone());
        Ok(id)
    }

    fn update_category(&self, id: RecordId, fields: &CategoryFields) -> RepoResult<()> {
        self.spend_write()?;
        let mut tables = self.tables.borrow_mut();
        let row = tables.categories.get_mut(&id).ok_or(RepoError::NotFound {
            entity: Entity::Category,
            id,
        })?;
        *row = fields.clone();
        Ok(())
    }

    fn delete_category(&self, id: RecordId) -> RepoResult<()> {
        self.spend_write()?;
        let mut tables = self.tables.borrow_mut();
        if tables.skills.values().any(|skill| skill.category_id == id) {
            return Err(RepoError::Backend(format!(
                "category {id} still has skills"
            )));
        }
        tables
            .categories
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound {
                entity: Entity::Category,
                id,
            })
    }

    fn insert_skill(&self, category_id: RecordId, fields: &SkillFields) -> RepoResult<RecordId> {
        self.spend_write()?;
        let mut tables = self.tables.borrow_mut();
        if !tables.categories.contains_key(&category_id) {
            return Err(RepoError::Backend(format!(
                "category {category_id} does not exist"
            )));
        }
        let id = tables.mint_id();
        tables.skills.insert(
            id,
            Skill {
                id,
                name: fields.name.clone(),
                description: fields.description.clone(),
                proficiency: fields.proficiency,
                category_id,
            },
        );
        Ok(id)
    }

    fn update_skill(&self, id: RecordId, fields: &SkillFields) -> RepoResult<()> {
        self.spend_write()?;
        let mut tables = self.tables.borrow_mut();
        let skill = tables.skills.get_mut(&id).ok_or(RepoError::NotFound {
            entity: Entity::Skill,
            id,
        })?;
        skill.name = fields.name.clone();
        skill.description = fields.description.clone();
        skill.proficiency = fields.proficiency;
        Ok(())
    }

    fn delete_skill(&self, id: RecordId) -> RepoResult<()> {
        self.spend_write()?;
        self.tables
            .borrow_mut()
            .skills
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound {
                entity: Entity::Skill,
                id,
            })
    }

    fn delete_skills_of(&self, category_id: RecordId) -> RepoResult<usize> {
        self.spend_write()?;
        let mut tables = self.tables.borrow_mut();
        let before = tables.skills.len();
        tables
            .skills
            .retain(|_, skill| skill.category_id != category_id);
        Ok(before - tables.skills.len())
    }
}

impl WorkRepository for MemoryStore {
    fn list_works(&self) -> RepoResult<Vec<Work>> {
        let tables = self.tables.borrow();
        Ok(tables
            .works
            .iter()
            .map(|(id, fields)| build_work(&tables, *id, fields))
            .collect())
    }

    fn get_work(&self, id: RecordId) -> RepoResult<Option<Work>> {
        let tables = self.tables.borrow();
        Ok(tables
            .works
            .get(&id)
            .map(|fields| build_work(&tables, id, fields)))
    }

    fn insert_work(&self, fields: &WorkFields) -> RepoResult<RecordId> {
        self.spend_write()?;
        let mut tables = self.tables.borrow_mut();
        let id = tables.mint_id();
        tables.works.insert(id, fields.clone());
        Ok(id)
    }

    fn update_work(&self, id: RecordId, fields: &WorkFields) -> RepoResult<()> {
        self.spend_write()?;
        let mut tables = self.tables.borrow_mut();
        let row = tables.works.get_mut(&id).ok_or(RepoError::NotFound {
            entity: Entity::Work,
            id,
        })?;
        *row = fields.clone();
        Ok(())
    }

    fn delete_work(&self, id: RecordId) -> RepoResult<()> {
        self.spend_write()?;
        let mut tables = self.tables.borrow_mut();
        if tables.images.values().any(|image| image.work_id == id) {
            return Err(RepoError::Backend(format!("work {id} still has images")));
        }
        tables
            .works
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound {
                entity: Entity::Work,
                id,
            })
    }

    fn insert_image(&self, work_id: RecordId, fields: &ImageFields) -> RepoResult<RecordId> {
        self.spend_write()?;
        let mut tables = self.tables.borrow_mut();
        if !tables.works.contains_key(&work_id) {
            return Err(RepoError::Backend(format!("work {work_id} does not exist")));
        }
        let id = tables.mint_id();
        tables.images.insert(
            id,
            WorkImage {
                id,
                url: fields.url.clone(),
                description: fields.description.clone(),
                work_id,
            },
        );
        Ok(id)
    }

    fn update_image(&self, id: RecordId, fields: &ImageFields) -> RepoResult<()> {
        self.spend_write()?;
        let mut tables = self.tables.borrow_mut();
        let image = tables.images.get_mut(&id).ok_or(RepoError::NotFound {
            entity: Entity::WorkImage,
            id,
        })?;
        image.url = fields.url.clone();
        image.description = fields.description.clone();
        Ok(())
    }

    fn delete_image(&self, id: RecordId) -> RepoResult<()> {
        self.spend_write()?;
        self.tables
            .borrow_mut()
            .images
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound {
                entity: Entity::WorkImage,
                id,
            })
    }

    fn delete_images_of(&self, work_id: RecordId) -> RepoResult<usize> {
        self.spend_write()?;
        let mut tables = self.tables.borrow_mut();
        let before = tables.images.len();
        tables.images.retain(|_, image| image.work_id != work_id);
        Ok(before - tables.images.len())
    }

    fn list_image_urls(&self) -> RepoResult<Vec<String>> {
        let tables = self.tables.borrow();
        Ok(tables.images.values().map(|image| image.url.clone()).collect())
    }
}

fn build_category(tables: &Tables, id: RecordId, fields: &CategoryFields) -> Category {
    Category {
        id,
        name: fields.name.clone(),
        description: fields.description.clone(),
        skills: tables
            .skills
            .values()
            .filter(|skill| skill.category_id == id)
            .cloned()
            .collect(),
    }
}

fn build_work(tables: &Tables, id: RecordId, fields: &WorkFields) -> Work {
    Work {
        id,
        title: fields.title.clone(),
        description: fields.description.clone(),
        category: fields.category.clone(),
        year: fields.year,
        images: tables
            .images
            .values()
            .filter(|image| image.work_id == id)
            .cloned()
            .collect(),
    }
}
