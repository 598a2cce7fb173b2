//! Child-collection reconciliation.
//!
//! # Responsibility
//! - Diff a submitted child collection against the persisted one, keyed by
//!   identity, into create/update/delete sets.
//!
//! # Invariants
//! - Pure: no I/O and no mutation of inputs.
//! - New children are stamped with the owning parent id; nothing the client
//!   sent about parent linkage survives.
//! - A submitted id must name one of this parent's persisted children,
//!   otherwise the whole partition is rejected.
//! - A persisted child is deleted only when no submitted entry claims it;
//!   repeated claims of the same id are harmless.

use crate::model::{ChildDraft, PersistedChild, RecordId};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Child to insert under `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChild<F> {
    pub parent_id: RecordId,
    pub fields: F,
}

/// Field replacement for an existing child. The id itself is never written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildUpdate<F> {
    pub id: RecordId,
    pub fields: F,
}

/// Write plan for one parent's children.
///
/// `to_create` and `to_update` keep submission order; `to_delete` is
/// ordered by ascending id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition<F, P> {
    pub to_create: Vec<NewChild<F>>,
    pub to_update: Vec<ChildUpdate<F>>,
    pub to_delete: Vec<P>,
}

impl<F, P> Partition<F, P> {
    /// Total number of writes this plan issues.
    pub fn write_count(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.write_count() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Submitted id is not a persisted child of `parent_id`.
    UnknownChild {
        parent_id: RecordId,
        child_id: RecordId,
    },
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownChild {
                parent_id,
                child_id,
            } => write!(f, "child {child_id} does not belong to parent {parent_id}"),
        }
    }
}

impl Error for ReconcileError {}

/// Computes the create/update/delete plan for one parent.
pub fn reconcile<D, P>(
    parent_id: RecordId,
    persisted: &[P],
    submitted: &[D],
) -> Result<Partition<D::Fields, P>, ReconcileError>
where
    D: ChildDraft,
    P: PersistedChild + Clone,
{
    let mut unclaimed: BTreeMap<RecordId, &P> =
        persisted.iter().map(|child| (child.id(), child)).collect();
    let known: BTreeSet<RecordId> = unclaimed.keys().copied().collect();

    let mut to_create = Vec::new();
    let mut to_update = Vec::new();

    for draft in submitted {
        match draft.draft_id() {
            None => to_create.push(NewChild {
                parent_id,
                fields: draft.fields().clone(),
            }),
            Some(child_id) => {
                if !known.contains(&child_id) {
                    return Err(ReconcileError::UnknownChild {
                        parent_id,
                        child_id,
                    });
                }
                to_update.push(ChildUpdate {
                    id: child_id,
                    fields: draft.fields().clone(),
                });
                unclaimed.remove(&child_id);
            }
        }
    }

    Ok(Partition {
        to_create,
        to_update,
        to_delete: unclaimed.into_values().cloned().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::{reconcile, ReconcileError};
    use crate::model::category::{Skill, SkillDraft};
    use std::collections::BTreeSet;

    fn skill(id: i64, category_id: i64, name: &str) -> Skill {
        Skill {
            id,
            name: name.to_string(),
            description: String::new(),
            proficiency: 50,
            category_id,
        }
    }

    #[test]
    fn mixed_submission_updates_creates_and_keeps_claimed() {
        let persisted = vec![skill(10, 1, "Go")];
        let submitted = vec![
            SkillDraft::existing(10, "Go", 90),
            SkillDraft::new("Rust", 40),
        ];

        let plan = reconcile(1, &persisted, &submitted).unwrap();
        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update[0].id, 10);
        assert_eq!(plan.to_update[0].fields.proficiency, 90);
        assert_eq!(plan.to_create.len(), 1);
        assert_eq!(plan.to_create[0].parent_id, 1);
        assert_eq!(plan.to_create[0].fields.name, "Rust");
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn empty_submission_deletes_everything() {
        let persisted = vec![skill(1, 7, "a"), skill(2, 7, "b"), skill(3, 7, "c")];
        let plan = reconcile::<SkillDraft, _>(7, &persisted, &[]).unwrap();
        assert!(plan.to_create.is_empty());
        assert!(plan.to_update.is_empty());
        let deleted: Vec<i64> = plan.to_delete.iter().map(|s| s.id).collect();
        assert_eq!(deleted, vec![1, 2, 3]);
    }

    #[test]
    fn only_new_children_replace_the_whole_collection() {
        let persisted = vec![skill(4, 2, "old-a"), skill(5, 2, "old-b")];
        let submitted = vec![SkillDraft::new("new-a", 1), SkillDraft::new("new-b", 2)];
        let plan = reconcile(2, &persisted, &submitted).unwrap();
        assert_eq!(plan.to_create.len(), 2);
        assert!(plan.to_update.is_empty());
        assert_eq!(plan.to_delete.len(), 2);
        assert_eq!(plan.write_count(), 4);
    }

    #[test]
    fn duplicate_ids_are_claimed_once_and_updated_twice() {
        let persisted = vec![skill(10, 1, "Go"), skill(11, 1, "C")];
        let submitted = vec![
            SkillDraft::existing(10, "Go", 60),
            SkillDraft::existing(10, "Golang", 70),
        ];
        let plan = reconcile(1, &persisted, &submitted).unwrap();
        assert_eq!(plan.to_update.len(), 2);
        assert_eq!(plan.to_update[1].fields.name, "Golang");
        let deleted: Vec<i64> = plan.to_delete.iter().map(|s| s.id).collect();
        assert_eq!(deleted, vec![11]);
    }

    #[test]
    fn unknown_id_rejects_the_whole_plan() {
        let persisted = vec![skill(10, 1, "Go")];
        let submitted = vec![SkillDraft::new("Rust", 1), SkillDraft::existing(99, "x", 1)];
        let err = reconcile(1, &persisted, &submitted).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::UnknownChild {
                parent_id: 1,
                child_id: 99
            }
        );
    }

    #[test]
    fn partition_covers_submitted_and_orphans_without_overlap() {
        let persisted: Vec<Skill> = (1..=6).map(|id| skill(id, 3, "p")).collect();
        let submitted = vec![
            SkillDraft::existing(2, "p", 1),
            SkillDraft::new("n1", 1),
            SkillDraft::existing(5, "p", 1),
            SkillDraft::existing(2, "p", 2),
            SkillDraft::new("n2", 1),
        ];
        let plan = reconcile(3, &persisted, &submitted).unwrap();

        assert_eq!(plan.to_create.len() + plan.to_update.len(), submitted.len());
        let updated: BTreeSet<i64> = plan.to_update.iter().map(|u| u.id).collect();
        let deleted: BTreeSet<i64> = plan.to_delete.iter().map(|s| s.id).collect();
        assert!(updated.is_disjoint(&deleted));
        let covered: BTreeSet<i64> = updated.union(&deleted).copied().collect();
        assert_eq!(covered, (1..=6).collect());
        assert!(plan.to_create.iter().all(|c| c.parent_id == 3));
    }
}
