//! Domain model for the two content aggregates.
//!
//! # Responsibility
//! - Define persisted read models (`Category`, `Work`) with their children.
//! - Define inbound drafts that carry the "not yet persisted" child sentinel.
//!
//! # Invariants
//! - Persisted records always carry a concrete, server-assigned `RecordId`.
//! - Draft child ids are normalized at parse time: absent, `null` and `0`
//!   all become `None`.

use serde::{Deserialize, Deserializer};

pub mod category;
pub mod work;

/// Server-assigned numeric identity shared by parents and children.
pub type RecordId = i64;

/// Identity access for persisted child rows.
pub trait PersistedChild {
    fn id(&self) -> RecordId;
}

/// Inbound child record as submitted by a client.
pub trait ChildDraft {
    /// Mutable columns written on insert and update.
    type Fields: Clone;

    /// `None` when the child does not exist yet.
    fn draft_id(&self) -> Option<RecordId>;
    fn fields(&self) -> &Self::Fields;
}

pub(crate) fn deserialize_draft_id<'de, D>(deserializer: D) -> Result<Option<RecordId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RecordId>::deserialize(deserializer)?;
    Ok(raw.filter(|id| *id != 0))
}
