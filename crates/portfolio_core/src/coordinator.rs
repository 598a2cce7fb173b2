//! Write sequencing for parent-with-children aggregates.
//!
//! # Responsibility
//! - Apply create, reconcile-update, and delete plans through a repository
//!   that is already inside a store transaction.
//! - Hand back what the caller needs after commit (new ids, removed
//!   children) without touching anything outside the store.
//!
//! # Invariants
//! - Update order: parent scalars, child creates, child updates, child
//!   deletes.
//! - Delete order: children, then parent.
//! - The first failing write aborts the sequence; rollback is the store's job.

use crate::model::category::{Category, CategoryFields, Skill, SkillFields};
use crate::model::work::{ImageFields, Work, WorkFields, WorkImage};
use crate::model::{PersistedChild, RecordId};
use crate::reconcile::Partition;
use crate::repo::{CategoryRepository, Entity, RepoResult, Repository, WorkRepository};

/// Uniform view over one aggregate's parent and child tables.
pub trait AggregateTable {
    type Parent;
    type Fields;
    type Child: PersistedChild + Clone;
    type ChildFields;

    const PARENT: Entity;
    const CHILD: Entity;

    fn load(&self, id: RecordId) -> RepoResult<Option<Self::Parent>>;
    fn children(parent: &Self::Parent) -> &[Self::Child];
    fn insert_parent(&self, fields: &Self::Fields) -> RepoResult<RecordId>;
    fn update_parent(&self, id: RecordId, fields: &Self::Fields) -> RepoResult<()>;
    fn delete_parent(&self, id: RecordId) -> RepoResult<()>;
    fn insert_child(&self, parent_id: RecordId, fields: &Self::ChildFields)
        -> RepoResult<RecordId>;
    fn update_child(&self, id: RecordId, fields: &Self::ChildFields) -> RepoResult<()>;
    fn delete_child(&self, id: RecordId) -> RepoResult<()>;
    fn delete_children_of(&self, parent_id: RecordId) -> RepoResult<usize>;
}

/// Category table view.
pub struct Categories<'r>(pub &'r dyn Repository);

/// Work table view.
pub struct Works<'r>(pub &'r dyn Repository);

impl AggregateTable for Categories<'_> {
    type Parent = Category;
    type Fields = CategoryFields;
    type Child = Skill;
    type ChildFields = SkillFields;

    const PARENT: Entity = Entity::Category;
    const CHILD: Entity = Entity::Skill;

    fn load(&self, id: RecordId) -> RepoResult<Option<Category>> {
        self.0.get_category(id)
    }

    fn children(parent: &Category) -> &[Skill] {
        &parent.skills
    }

    fn insert_parent(&self, fields: &CategoryFields) -> RepoResult<RecordId> {
        self.0.insert_category(fields)
    }

    fn update_parent(&self, id: RecordId, fields: &CategoryFields) -> RepoResult<()> {
        self.0.update_category(id, fields)
    }

    fn delete_parent(&self, id: RecordId) -> RepoResult<()> {
        self.0.delete_category(id)
    }

    fn insert_child(&self, parent_id: RecordId, fields: &SkillFields) -> RepoResult<RecordId> {
        self.0.insert_skill(parent_id, fields)
    }

    fn update_child(&self, id: RecordId, fields: &SkillFields) -> RepoResult<()> {
        self.0.update_skill(id, fields)
    }

    fn delete_child(&self, id: RecordId) -> RepoResult<()> {
        self.0.delete_skill(id)
    }

    fn delete_children_of(&self, parent_id: RecordId) -> RepoResult<usize> {
        self.0.delete_skills_of(parent_id)
    }
}

impl AggregateTable for Works<'_> {
    type Parent = Work;
    type Fields = WorkFields;
    type Child = WorkImage;
    type ChildFields = ImageFields;

    const PARENT: Entity = Entity::Work;
    const CHILD: Entity = Entity::WorkImage;

    fn load(&self, id: RecordId) -> RepoResult<Option<Work>> {
        self.0.get_work(id)
    }

    fn children(parent: &Work) -> &[WorkImage] {
        &parent.images
    }

    fn insert_parent(&self, fields: &WorkFields) -> RepoResult<RecordId> {
        self.0.insert_work(fields)
    }

    fn update_parent(&self, id: RecordId, fields: &WorkFields) -> RepoResult<()> {
        self.0.update_work(id, fields)
    }

    fn delete_parent(&self, id: RecordId) -> RepoResult<()> {
        self.0.delete_work(id)
    }

    fn insert_child(&self, parent_id: RecordId, fields: &ImageFields) -> RepoResult<RecordId> {
        self.0.insert_image(parent_id, fields)
    }

    fn update_child(&self, id: RecordId, fields: &ImageFields) -> RepoResult<()> {
        self.0.update_image(id, fields)
    }

    fn delete_child(&self, id: RecordId) -> RepoResult<()> {
        self.0.delete_image(id)
    }

    fn delete_children_of(&self, parent_id: RecordId) -> RepoResult<usize> {
        self.0.delete_images_of(parent_id)
    }
}

/// What an applied update left behind for post-commit work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedUpdate<C> {
    pub created_ids: Vec<RecordId>,
    pub updated: usize,
    pub deleted: Vec<C>,
}

/// What an applied aggregate delete removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedDelete<C> {
    /// Child rows the store reported as deleted.
    pub removed_rows: usize,
    pub removed_children: Vec<C>,
}

/// Inserts a parent and then every child stamped with the new parent id.
pub fn apply_create<T: AggregateTable>(
    table: &T,
    fields: &T::Fields,
    children: &[T::ChildFields],
) -> RepoResult<RecordId> {
    let parent_id = table.insert_parent(fields)?;
    for child in children {
        table.insert_child(parent_id, child)?;
    }
    Ok(parent_id)
}

/// Writes new scalars and executes a reconciliation plan.
pub fn apply_update<T: AggregateTable>(
    table: &T,
    parent_id: RecordId,
    fields: &T::Fields,
    plan: Partition<T::ChildFields, T::Child>,
) -> RepoResult<AppliedUpdate<T::Child>> {
    table.update_parent(parent_id, fields)?;

    let mut created_ids = Vec::with_capacity(plan.to_create.len());
    for child in &plan.to_create {
        created_ids.push(table.insert_child(child.parent_id, &child.fields)?);
    }
    for update in &plan.to_update {
        table.update_child(update.id, &update.fields)?;
    }
    for orphan in &plan.to_delete {
        table.delete_child(orphan.id())?;
    }

    Ok(AppliedUpdate {
        created_ids,
        updated: plan.to_update.len(),
        deleted: plan.to_delete,
    })
}

/// Removes every child of `parent`, then the parent row.
pub fn apply_delete<T: AggregateTable>(
    table: &T,
    parent_id: RecordId,
    parent: &T::Parent,
) -> RepoResult<AppliedDelete<T::Child>> {
    let removed_rows = table.delete_children_of(parent_id)?;
    table.delete_parent(parent_id)?;
    Ok(AppliedDelete {
        removed_rows,
        removed_children: T::children(parent).to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::{apply_create, apply_delete, apply_update, AggregateTable, Categories};
    use crate::model::category::{CategoryFields, SkillFields};
    use crate::reconcile::{ChildUpdate, NewChild, Partition};
    use crate::repo::{CategoryRepository, MemoryStore, RepoError, Store};

    fn fields(name: &str) -> CategoryFields {
        CategoryFields {
            name: name.to_string(),
            description: String::new(),
        }
    }

    fn skill(name: &str) -> SkillFields {
        SkillFields {
            name: name.to_string(),
            description: String::new(),
            proficiency: 50,
        }
    }

    #[test]
    fn update_returns_created_ids_in_submission_order_and_deleted_rows() {
        let mut store = MemoryStore::new();
        let (parent_id, applied) = store
            .write(|repo| {
                let table = Categories(repo);
                let parent_id = apply_create(&table, &fields("Langs"), &[skill("Go"), skill("C")])?;
                let current = table.load(parent_id)?.ok_or(RepoError::InvalidData(
                    "missing parent".to_string(),
                ))?;
                let go = current.skills[0].clone();
                let c = current.skills[1].clone();
                let plan = Partition {
                    to_create: vec![
                        NewChild {
                            parent_id,
                            fields: skill("Rust"),
                        },
                        NewChild {
                            parent_id,
                            fields: skill("Zig"),
                        },
                    ],
                    to_update: vec![ChildUpdate {
                        id: go.id,
                        fields: skill("Golang"),
                    }],
                    to_delete: vec![c],
                };
                let applied = apply_update(&table, parent_id, &fields("Languages"), plan)?;
                Ok::<_, RepoError>((parent_id, applied))
            })
            .unwrap();

        assert_eq!(applied.created_ids.len(), 2);
        assert!(applied.created_ids[0] < applied.created_ids[1]);
        assert_eq!(applied.updated, 1);
        assert_eq!(applied.deleted[0].name, "C");

        let names: Vec<String> = store
            .read(|repo| Categories(repo).load(parent_id))
            .unwrap()
            .unwrap()
            .skills
            .into_iter()
            .map(|skill| skill.name)
            .collect();
        assert_eq!(names, vec!["Golang", "Rust", "Zig"]);
    }

    #[test]
    fn delete_removes_children_before_parent() {
        let mut store = MemoryStore::new();
        let applied = store
            .write(|repo| {
                let table = Categories(repo);
                let parent_id = apply_create(&table, &fields("Langs"), &[skill("Go")])?;
                let current = table.load(parent_id)?.ok_or(RepoError::InvalidData(
                    "missing parent".to_string(),
                ))?;
                apply_delete(&table, parent_id, &current)
            })
            .unwrap();

        assert_eq!(applied.removed_rows, 1);
        assert_eq!(applied.removed_children[0].name, "Go");
        assert!(store.read(|repo| repo.list_categories()).unwrap().is_empty());
    }
}
