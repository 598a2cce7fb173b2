//! Skill category aggregate.
//!
//! A category owns an ordered list of skills through `skills.category_id`.

use super::{deserialize_draft_id, ChildDraft, PersistedChild, RecordId};
use serde::{Deserialize, Serialize};

/// Persisted category with its skills in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub skills: Vec<Skill>,
}

/// Persisted skill row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    /// Conceptually 0..=100; not enforced by core.
    pub proficiency: i32,
    pub category_id: RecordId,
}

/// Scalar columns of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFields {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Mutable columns of a skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillFields {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub proficiency: i32,
}

/// Inbound category payload with its full skill collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryDraft {
    #[serde(default, deserialize_with = "deserialize_draft_id")]
    pub id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: CategoryFields,
    #[serde(default, alias = "children")]
    pub skills: Vec<SkillDraft>,
}

/// Inbound skill. Any client-sent `category_id` is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SkillDraft {
    #[serde(default, deserialize_with = "deserialize_draft_id")]
    pub id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: SkillFields,
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            fields: CategoryFields {
                name: name.into(),
                description: description.into(),
            },
            skills: Vec::new(),
        }
    }

    /// Appends a skill draft; builder-style for tests and callers.
    pub fn with_skill(mut self, skill: SkillDraft) -> Self {
        self.skills.push(skill);
        self
    }
}

impl SkillDraft {
    /// Draft for a skill that does not exist yet.
    pub fn new(name: impl Into<String>, proficiency: i32) -> Self {
        Self {
            id: None,
            fields: SkillFields {
                name: name.into(),
                description: String::new(),
                proficiency,
            },
        }
    }

    /// Draft addressing an existing skill by id.
    pub fn existing(id: RecordId, name: impl Into<String>, proficiency: i32) -> Self {
        Self {
            id: Some(id).filter(|id| *id != 0),
            ..Self::new(name, proficiency)
        }
    }
}

impl Category {
    /// Rebuilds a full-collection draft from persisted state.
    pub fn to_draft(&self) -> CategoryDraft {
        CategoryDraft {
            id: Some(self.id),
            fields: CategoryFields {
                name: self.name.clone(),
                description: self.description.clone(),
            },
            skills: self
                .skills
                .iter()
                .map(|skill| SkillDraft {
                    id: Some(skill.id),
                    fields: skill.fields(),
                })
                .collect(),
        }
    }
}

impl Skill {
    pub fn fields(&self) -> SkillFields {
        SkillFields {
            name: self.name.clone(),
            description: self.description.clone(),
            proficiency: self.proficiency,
        }
    }
}

impl PersistedChild for Skill {
    fn id(&self) -> RecordId {
        self.id
    }
}

impl ChildDraft for SkillDraft {
    type Fields = SkillFields;

    fn draft_id(&self) -> Option<RecordId> {
        self.id
    }

    fn fields(&self) -> &SkillFields {
        &self.fields
    }
}
