//! Transport-neutral request/response boundary.
//!
//! # Responsibility
//! - Parse path ids and JSON bodies into core drafts.
//! - Map service outcomes to status codes and JSON bodies.
//!
//! # Invariants
//! - Endpoint functions never panic; every failure becomes a response.
//! - Error bodies are `{"message": "..."}`.
//! - Delete responses carry no body.

use log::{error, warn};
use portfolio_core::{
    core_version as core_version_inner, init_from_config, open_db, open_db_in_memory,
    ping as ping_inner, AppConfig, CategoryDraft, CategoryService, ErrorKind, RecordId,
    ServiceError, SqliteStore, UploadStore, WorkDraft, WorkService,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Health check.
pub fn ping() -> String {
    ping_inner().to_owned()
}

pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Status code plus optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiResponse {
    fn json(status: u16, payload: &impl Serialize) -> Self {
        match serde_json::to_value(payload) {
            Ok(body) => Self {
                status,
                body: Some(body),
            },
            Err(err) => {
                error!("event=api_encode module=api status=error error={err}");
                Self::message(STATUS_INTERNAL_ERROR, "failed to encode response")
            }
        }
    }

    fn message(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(json!({ "message": message.into() })),
        }
    }

    fn no_content() -> Self {
        Self {
            status: STATUS_NO_CONTENT,
            body: None,
        }
    }

    fn from_error(err: &ServiceError) -> Self {
        let status = match err.kind() {
            ErrorKind::NotFound => STATUS_NOT_FOUND,
            ErrorKind::BadRequest => STATUS_BAD_REQUEST,
            ErrorKind::Persistence => STATUS_INTERNAL_ERROR,
        };
        if status == STATUS_INTERNAL_ERROR {
            warn!("event=api_request module=api status=error error_code=persistence error={err}");
        }
        Self::message(status, err.to_string())
    }

    fn from_result<T: Serialize>(status: u16, result: Result<T, ServiceError>) -> Self {
        match result {
            Ok(value) => Self::json(status, &value),
            Err(err) => Self::from_error(&err),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Serialize)]
struct UploadBody {
    url: String,
}

/// Request-scoped wiring: one store and one uploads directory per process.
pub struct ApiContext {
    store: SqliteStore,
    uploads: UploadStore,
}

impl ApiContext {
    /// Starts logging (when configured) and opens the configured database.
    pub fn open(config: &AppConfig) -> Result<Self, String> {
        init_from_config(config)?;
        let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
        let store = SqliteStore::try_new(conn).map_err(|err| err.to_string())?;
        Ok(Self {
            store,
            uploads: config.upload_store(),
        })
    }

    /// In-memory database with the given uploads directory.
    pub fn in_memory(uploads: UploadStore) -> Result<Self, String> {
        let conn = open_db_in_memory().map_err(|err| err.to_string())?;
        let store = SqliteStore::try_new(conn).map_err(|err| err.to_string())?;
        Ok(Self { store, uploads })
    }

    fn categories(&mut self) -> CategoryService<&mut SqliteStore> {
        CategoryService::new(&mut self.store)
    }

    fn works(&mut self) -> WorkService<&mut SqliteStore> {
        WorkService::new(&mut self.store, self.uploads.clone())
    }

    pub fn list_categories(&mut self) -> ApiResponse {
        ApiResponse::from_result(STATUS_OK, self.categories().list())
    }

    pub fn get_category(&mut self, id: &str) -> ApiResponse {
        match parse_id(id) {
            Ok(id) => ApiResponse::from_result(STATUS_OK, self.categories().get(id)),
            Err(response) => response,
        }
    }

    pub fn create_category(&mut self, body: &str) -> ApiResponse {
        match parse_body::<CategoryDraft>(body) {
            Ok(draft) => ApiResponse::from_result(STATUS_CREATED, self.categories().create(&draft)),
            Err(response) => response,
        }
    }

    pub fn update_category(&mut self, id: &str, body: &str) -> ApiResponse {
        match parse_id(id).and_then(|id| Ok((id, parse_body::<CategoryDraft>(body)?))) {
            Ok((id, draft)) => {
                ApiResponse::from_result(STATUS_OK, self.categories().update(id, &draft))
            }
            Err(response) => response,
        }
    }

    pub fn delete_category(&mut self, id: &str) -> ApiResponse {
        match parse_id(id) {
            Ok(id) => match self.categories().delete(id) {
                Ok(_) => ApiResponse::no_content(),
                Err(err) => ApiResponse::from_error(&err),
            },
            Err(response) => response,
        }
    }

    pub fn list_works(&mut self) -> ApiResponse {
        ApiResponse::from_result(STATUS_OK, self.works().list())
    }

    pub fn get_work(&mut self, id: &str) -> ApiResponse {
        match parse_id(id) {
            Ok(id) => ApiResponse::from_result(STATUS_OK, self.works().get(id)),
            Err(response) => response,
        }
    }

    pub fn create_work(&mut self, body: &str) -> ApiResponse {
        match parse_body::<WorkDraft>(body) {
            Ok(draft) => ApiResponse::from_result(STATUS_CREATED, self.works().create(&draft)),
            Err(response) => response,
        }
    }

    pub fn update_work(&mut self, id: &str, body: &str) -> ApiResponse {
        match parse_id(id).and_then(|id| Ok((id, parse_body::<WorkDraft>(body)?))) {
            Ok((id, draft)) => ApiResponse::from_result(STATUS_OK, self.works().update(id, &draft)),
            Err(response) => response,
        }
    }

    pub fn delete_work(&mut self, id: &str) -> ApiResponse {
        match parse_id(id) {
            Ok(id) => match self.works().delete(id) {
                Ok(_) => ApiResponse::no_content(),
                Err(err) => ApiResponse::from_error(&err),
            },
            Err(response) => response,
        }
    }

    /// Stores an uploaded image and answers `{"url": ...}`.
    pub fn upload_image(&mut self, file_name: &str, bytes: &[u8]) -> ApiResponse {
        let result = self
            .works()
            .upload_image(file_name, bytes)
            .map(|asset| UploadBody { url: asset.url });
        ApiResponse::from_result(STATUS_OK, result)
    }
}

fn parse_id(raw: &str) -> Result<RecordId, ApiResponse> {
    match raw.trim().parse::<RecordId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiResponse::message(
            STATUS_BAD_REQUEST,
            format!("invalid id: `{raw}`"),
        )),
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiResponse> {
    serde_json::from_str(body).map_err(|err| {
        ApiResponse::message(STATUS_BAD_REQUEST, format!("invalid payload: {err}"))
    })
}
