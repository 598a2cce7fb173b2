//! Uploaded asset storage and best-effort file cleanup.
//!
//! # Responsibility
//! - Store uploaded image bytes under the uploads root and mint their URL.
//! - Map a persisted image URL back to its file under the uploads root.
//! - Remove files orphaned by committed image deletions.
//!
//! # Invariants
//! - Resolved paths never leave the uploads root.
//! - Cleanup never fails the caller: every outcome is logged and counted.
//! - Removing an already-missing file is a harmless `NotFound` outcome.

use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Literal path segment every stored reference is rooted at.
pub const UPLOADS_SEGMENT: &str = "uploads/";
const WORK_IMAGES_DIR: &str = "works";

static ABSOLUTE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^/]*").expect("valid absolute url regex")
});

/// Reasons a stored reference cannot be mapped to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetPathError {
    /// Reference does not start with `uploads/` once prefixes are stripped.
    OutsideUploads(String),
    /// Reference names the uploads root itself or escapes it.
    InvalidRelativePath(String),
}

impl Display for AssetPathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutsideUploads(url) => write!(f, "reference is not under uploads/: `{url}`"),
            Self::InvalidRelativePath(url) => {
                write!(f, "reference has an invalid upload path: `{url}`")
            }
        }
    }
}

impl Error for AssetPathError {}

#[derive(Debug)]
pub enum UploadError {
    InvalidFileName(String),
    Io(io::Error),
}

impl Display for UploadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidFileName(name) => write!(f, "invalid upload file name: `{name}`"),
            Self::Io(err) => write!(f, "upload write failed: {err}"),
        }
    }
}

impl Error for UploadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::InvalidFileName(_) => None,
        }
    }
}

impl From<io::Error> for UploadError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Result of one file removal attempt.
#[derive(Debug)]
pub enum DeleteOutcome {
    Removed,
    NotFound,
    IoError(io::Error),
}

/// Tally of a best-effort cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub missing: usize,
    /// Unresolvable references plus I/O failures.
    pub failed: usize,
}

impl CleanupReport {
    pub fn attempted(&self) -> usize {
        self.removed + self.missing + self.failed
    }
}

/// A freshly stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    /// Public reference persisted in `work_images.url`.
    pub url: String,
    pub path: PathBuf,
}

/// Filesystem-backed uploads directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStore {
    root: PathBuf,
    public_prefix: String,
}

impl UploadStore {
    /// `public_prefix` is the scheme+authority the server publishes upload
    /// URLs under, e.g. `http://localhost:8080`; may be empty.
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        let public_prefix = public_prefix.into().trim().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            public_prefix,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Maps any accepted URL form to its file under the uploads root.
    ///
    /// Accepted: `<prefix>/uploads/<rel>`, `/uploads/<rel>`, `uploads/<rel>`.
    /// An absolute URL with a different host is accepted as well.
    pub fn resolve_path(&self, url: &str) -> Result<PathBuf, AssetPathError> {
        let trimmed = url.trim();
        let without_host = match self.strip_known_prefix(trimmed) {
            Some(rest) => rest,
            None => match ABSOLUTE_URL_RE.find(trimmed) {
                Some(found) => &trimmed[found.end()..],
                None => trimmed,
            },
        };
        let without_slash = without_host.strip_prefix('/').unwrap_or(without_host);
        let relative = without_slash
            .strip_prefix(UPLOADS_SEGMENT)
            .ok_or_else(|| AssetPathError::OutsideUploads(url.to_string()))?;

        let relative = Path::new(relative);
        let mut components = relative.components().peekable();
        if components.peek().is_none()
            || !components.all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(AssetPathError::InvalidRelativePath(url.to_string()));
        }

        Ok(self.root.join(relative))
    }

    /// Removes one file; absence is reported, not raised.
    pub fn delete_file(&self, path: &Path) -> DeleteOutcome {
        match std::fs::remove_file(path) {
            Ok(()) => DeleteOutcome::Removed,
            Err(err) if err.kind() == io::ErrorKind::NotFound => DeleteOutcome::NotFound,
            Err(err) => DeleteOutcome::IoError(err),
        }
    }

    /// Best-effort removal of the files behind `urls`.
    pub fn remove_orphans<'a>(&self, urls: impl IntoIterator<Item = &'a str>) -> CleanupReport {
        let mut report = CleanupReport::default();
        for url in urls {
            let path = match self.resolve_path(url) {
                Ok(path) => path,
                Err(err) => {
                    warn!(
                        "event=asset_delete module=assets status=error error_code=unresolvable_reference error={err}"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            match self.delete_file(&path) {
                DeleteOutcome::Removed => {
                    info!(
                        "event=asset_delete module=assets status=ok path={}",
                        path.display()
                    );
                    report.removed += 1;
                }
                DeleteOutcome::NotFound => {
                    warn!(
                        "event=asset_delete module=assets status=missing path={}",
                        path.display()
                    );
                    report.missing += 1;
                }
                DeleteOutcome::IoError(err) => {
                    warn!(
                        "event=asset_delete module=assets status=error error_code=io_error path={} error={err}",
                        path.display()
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Stores an uploaded work image and returns its public reference.
    ///
    /// File names are `<unix_secs>_<8 hex>_<basename>` inside `works/`.
    pub fn store_upload(&self, file_name: &str, bytes: &[u8]) -> Result<UploadedAsset, UploadError> {
        let base_name = Path::new(file_name.trim())
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| UploadError::InvalidFileName(file_name.to_string()))?;

        let dir = self.root.join(WORK_IMAGES_DIR);
        std::fs::create_dir_all(&dir)?;

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let token = Uuid::new_v4().simple().to_string();
        let stored_name = format!("{secs}_{}_{base_name}", &token[..8]);
        let path = dir.join(&stored_name);
        std::fs::write(&path, bytes)?;

        let url = format!(
            "{}/{UPLOADS_SEGMENT}{WORK_IMAGES_DIR}/{stored_name}",
            self.public_prefix
        );
        info!(
            "event=asset_store module=assets status=ok bytes={} path={}",
            bytes.len(),
            path.display()
        );
        Ok(UploadedAsset { url, path })
    }

    fn strip_known_prefix<'u>(&self, url: &'u str) -> Option<&'u str> {
        if self.public_prefix.is_empty() {
            return None;
        }
        url.strip_prefix(self.public_prefix.as_str())
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}
