//! Service-level error taxonomy.

use crate::assets::UploadError;
use crate::model::RecordId;
use crate::reconcile::ReconcileError;
use crate::repo::{Entity, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Coarse failure class callers map to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::Persistence => "persistence",
        }
    }
}

#[derive(Debug)]
pub enum ServiceError {
    /// Addressed aggregate or row does not exist.
    NotFound { entity: Entity, id: RecordId },
    /// Submitted child id is not a persisted child of the addressed parent.
    UnknownChild {
        entity: Entity,
        parent_id: RecordId,
        child_id: RecordId,
    },
    /// Payload cannot be applied as submitted.
    BadRequest(String),
    Repo(RepoError),
    Upload(UploadError),
    /// A committed write could not be read back.
    InconsistentState(&'static str),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } | Self::UnknownChild { .. } => ErrorKind::NotFound,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::Upload(UploadError::InvalidFileName(_)) => ErrorKind::BadRequest,
            Self::Repo(_) | Self::Upload(_) | Self::InconsistentState(_) => {
                ErrorKind::Persistence
            }
        }
    }

    pub(crate) fn unknown_child(entity: Entity, err: ReconcileError) -> Self {
        match err {
            ReconcileError::UnknownChild {
                parent_id,
                child_id,
            } => Self::UnknownChild {
                entity,
                parent_id,
                child_id,
            },
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UnknownChild {
                entity,
                parent_id,
                child_id,
            } => write!(f, "{entity} {child_id} not found under parent {parent_id}"),
            Self::BadRequest(message) => write!(f, "bad request: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Upload(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent state: {details}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Upload(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Repo(other),
        }
    }
}

impl From<UploadError> for ServiceError {
    fn from(value: UploadError) -> Self {
        Self::Upload(value)
    }
}
