//! Portfolio work aggregate.
//!
//! A work owns an ordered list of images through `work_images.work_id`.
//! Each image references a stored upload by URL.

use super::{deserialize_draft_id, ChildDraft, PersistedChild, RecordId};
use serde::{Deserialize, Serialize};

/// Persisted work with its images in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    /// Free-text label, unrelated to skill categories.
    pub category: String,
    pub year: i32,
    pub images: Vec<WorkImage>,
}

/// Persisted image row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkImage {
    pub id: RecordId,
    pub url: String,
    pub description: String,
    pub work_id: RecordId,
}

/// Scalar columns of a work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkFields {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub year: i32,
}

/// Mutable columns of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFields {
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// Inbound work payload with its full image collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkDraft {
    #[serde(default, deserialize_with = "deserialize_draft_id")]
    pub id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: WorkFields,
    #[serde(default, alias = "children")]
    pub images: Vec<ImageDraft>,
}

/// Inbound image. Any client-sent `work_id` is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageDraft {
    #[serde(default, deserialize_with = "deserialize_draft_id")]
    pub id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: ImageFields,
}

impl WorkDraft {
    pub fn new(title: impl Into<String>, category: impl Into<String>, year: i32) -> Self {
        Self {
            id: None,
            fields: WorkFields {
                title: title.into(),
                description: String::new(),
                category: category.into(),
                year,
            },
            images: Vec::new(),
        }
    }

    pub fn with_image(mut self, image: ImageDraft) -> Self {
        self.images.push(image);
        self
    }
}

impl ImageDraft {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: None,
            fields: ImageFields {
                url: url.into(),
                description: String::new(),
            },
        }
    }

    pub fn existing(id: RecordId, url: impl Into<String>) -> Self {
        Self {
            id: Some(id).filter(|id| *id != 0),
            ..Self::new(url)
        }
    }
}

impl Work {
    /// Rebuilds a full-collection draft from persisted state.
    pub fn to_draft(&self) -> WorkDraft {
        WorkDraft {
            id: Some(self.id),
            fields: WorkFields {
                title: self.title.clone(),
                description: self.description.clone(),
                category: self.category.clone(),
                year: self.year,
            },
            images: self
                .images
                .iter()
                .map(|image| ImageDraft {
                    id: Some(image.id),
                    fields: image.fields(),
                })
                .collect(),
        }
    }
}

impl WorkImage {
    pub fn fields(&self) -> ImageFields {
        ImageFields {
            url: self.url.clone(),
            description: self.description.clone(),
        }
    }
}

impl PersistedChild for WorkImage {
    fn id(&self) -> RecordId {
        self.id
    }
}

impl ChildDraft for ImageDraft {
    type Fields = ImageFields;

    fn draft_id(&self) -> Option<RecordId> {
        self.id
    }

    fn fields(&self) -> &ImageFields {
        &self.fields
    }
}
