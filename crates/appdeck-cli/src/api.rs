//! REST API of the apps service.
//!
//! Provides the endpoints the create and edit flows depend on: application
//! configuration CRUD, storage provisioning, model file upload and the
//! current-user profile. Authentication is a per-user api key in the
//! `x-api-key` header.

use appdeck_core::{AppConfig, ModelFile};
use appdeck_runtime::registry::RegistryError;
use appdeck_runtime::storage::StorageError;
use appdeck_runtime::users::{UserProfile, UserStore};
use appdeck_runtime::{AppStorage, SharedAppRegistry};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::RwLock;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

// =============================================================================
// Request/Response types
// =============================================================================

/// One uploaded file on the wire: name plus raw bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePayload {
    pub name: String,
    pub data: Vec<u8>,
}

impl From<&ModelFile> for FilePayload {
    fn from(file: &ModelFile) -> Self {
        Self {
            name: file.name.clone(),
            data: file.data.clone(),
        }
    }
}

impl From<FilePayload> for ModelFile {
    fn from(payload: FilePayload) -> Self {
        ModelFile::new(payload.name, payload.data)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadFilesRequest {
    pub topology: FilePayload,
    pub weights: Vec<FilePayload>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadFilesResponse {
    pub stored: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAppResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

// =============================================================================
// Server context
// =============================================================================

/// Shared state behind the API: the registry, file storage and user store.
#[derive(Clone)]
pub struct ServerCtx {
    pub registry: SharedAppRegistry,
    pub storage: Arc<AppStorage>,
    pub users: Arc<RwLock<UserStore>>,
}

fn with_ctx(ctx: ServerCtx) -> impl Filter<Extract = (ServerCtx,), Error = Infallible> + Clone {
    warp::any().map(move || ctx.clone())
}

fn with_api_key() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::header::<String>("x-api-key")
}

// =============================================================================
// API Routes
// =============================================================================

/// Build the complete API route tree.
pub fn api_routes(
    ctx: ServerCtx,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let api = warp::path("api").and(warp::path("v1"));

    let create_app = api
        .and(warp::path("apps"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_api_key())
        .and(warp::body::json())
        .and(with_ctx(ctx.clone()))
        .and_then(handle_create_app);

    let create_storage = api
        .and(warp::path("apps"))
        .and(warp::path::param::<String>())
        .and(warp::path("storage"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_api_key())
        .and(with_ctx(ctx.clone()))
        .and_then(handle_create_storage);

    let upload_files = api
        .and(warp::path("apps"))
        .and(warp::path::param::<String>())
        .and(warp::path("files"))
        .and(warp::path::end())
        .and(warp::post())
        .and(with_api_key())
        .and(warp::body::json())
        .and(with_ctx(ctx.clone()))
        .and_then(handle_upload_files);

    let get_app = api
        .and(warp::path("apps"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_api_key())
        .and(with_ctx(ctx.clone()))
        .and_then(handle_get_app);

    let delete_app = api
        .and(warp::path("apps"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::delete())
        .and(with_api_key())
        .and(with_ctx(ctx.clone()))
        .and_then(handle_delete_app);

    let user = api
        .and(warp::path("user"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_api_key())
        .and(with_ctx(ctx))
        .and_then(handle_user);

    create_app
        .or(create_storage)
        .or(upload_files)
        .or(get_app)
        .or(delete_app)
        .or(user)
}

// =============================================================================
// Handlers
// =============================================================================

/// Resolve the api key to a username, or produce the 401 response.
async fn authenticate(api_key: &str, ctx: &ServerCtx) -> Result<String, warp::reply::Response> {
    let users = ctx.users.read().await;
    match users.by_api_key(api_key) {
        Some(account) => Ok(account.username.clone()),
        None => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "invalid_api_key",
            "Invalid API key",
        )),
    }
}

async fn handle_create_app(
    api_key: String,
    body: AppConfig,
    ctx: ServerCtx,
) -> Result<impl Reply, Infallible> {
    let owner = match authenticate(&api_key, &ctx).await {
        Ok(owner) => owner,
        Err(resp) => return Ok(resp),
    };

    let id = body.id.clone();
    let mut registry = ctx.registry.write().await;
    match registry.create_app(body, &owner) {
        Ok(()) => {
            let resp = CreateAppResponse { id };
            Ok(
                warp::reply::with_status(warp::reply::json(&resp), StatusCode::CREATED)
                    .into_response(),
            )
        }
        Err(e) => Ok(registry_error_response(e)),
    }
}

async fn handle_create_storage(
    id: String,
    api_key: String,
    ctx: ServerCtx,
) -> Result<impl Reply, Infallible> {
    let owner = match authenticate(&api_key, &ctx).await {
        Ok(owner) => owner,
        Err(resp) => return Ok(resp),
    };

    let config = {
        let registry = ctx.registry.read().await;
        match registry.get_app(&id) {
            Some(record) if record.owner == owner => record.config.clone(),
            Some(_) => {
                return Ok(error_response(
                    StatusCode::FORBIDDEN,
                    "forbidden",
                    "Application belongs to another user",
                ))
            }
            None => {
                return Ok(error_response(
                    StatusCode::NOT_FOUND,
                    "app_not_found",
                    "Application not found",
                ))
            }
        }
    };

    match ctx.storage.create_app_dir(&config) {
        Ok(_) => Ok(warp::reply::with_status(
            warp::reply::json(&serde_json::json!({"created": true})),
            StatusCode::CREATED,
        )
        .into_response()),
        Err(e) => Ok(storage_error_response(e)),
    }
}

async fn handle_upload_files(
    id: String,
    api_key: String,
    body: UploadFilesRequest,
    ctx: ServerCtx,
) -> Result<impl Reply, Infallible> {
    let owner = match authenticate(&api_key, &ctx).await {
        Ok(owner) => owner,
        Err(resp) => return Ok(resp),
    };

    {
        let registry = ctx.registry.read().await;
        match registry.get_app(&id) {
            Some(record) if record.owner == owner => {}
            Some(_) => {
                return Ok(error_response(
                    StatusCode::FORBIDDEN,
                    "forbidden",
                    "Application belongs to another user",
                ))
            }
            None => {
                return Ok(error_response(
                    StatusCode::NOT_FOUND,
                    "app_not_found",
                    "Application not found",
                ))
            }
        }
    }

    let topology: ModelFile = body.topology.into();
    let weights: Vec<ModelFile> = body.weights.into_iter().map(ModelFile::from).collect();

    match ctx.storage.store_model_files(&id, &topology, &weights) {
        Ok(stored) => {
            let resp = UploadFilesResponse { stored };
            Ok(warp::reply::with_status(warp::reply::json(&resp), StatusCode::OK).into_response())
        }
        Err(e) => Ok(storage_error_response(e)),
    }
}

async fn handle_get_app(
    id: String,
    api_key: String,
    ctx: ServerCtx,
) -> Result<impl Reply, Infallible> {
    if let Err(resp) = authenticate(&api_key, &ctx).await {
        return Ok(resp);
    }

    let registry = ctx.registry.read().await;
    match registry.get_app(&id) {
        Some(record) => Ok(
            warp::reply::with_status(warp::reply::json(&record.config), StatusCode::OK)
                .into_response(),
        ),
        None => Ok(error_response(
            StatusCode::NOT_FOUND,
            "app_not_found",
            "Application not found",
        )),
    }
}

async fn handle_delete_app(
    id: String,
    api_key: String,
    ctx: ServerCtx,
) -> Result<impl Reply, Infallible> {
    let owner = match authenticate(&api_key, &ctx).await {
        Ok(owner) => owner,
        Err(resp) => return Ok(resp),
    };

    let result = {
        let mut registry = ctx.registry.write().await;
        let foreign = matches!(registry.get_app(&id), Some(record) if record.owner != owner);
        if foreign {
            return Ok(error_response(
                StatusCode::FORBIDDEN,
                "forbidden",
                "Application belongs to another user",
            ));
        }
        registry.delete_app(&id)
    };

    match result {
        Ok(_) => {
            if let Err(e) = ctx.storage.remove_app_dir(&id) {
                tracing::warn!("Failed to remove storage for {}: {}", id, e);
            }
            Ok(warp::reply::with_status(
                warp::reply::json(&serde_json::json!({"deleted": true})),
                StatusCode::OK,
            )
            .into_response())
        }
        Err(e) => Ok(registry_error_response(e)),
    }
}

async fn handle_user(api_key: String, ctx: ServerCtx) -> Result<impl Reply, Infallible> {
    let username = match authenticate(&api_key, &ctx).await {
        Ok(owner) => owner,
        Err(resp) => return Ok(resp),
    };

    let registry = ctx.registry.read().await;
    let profile = UserProfile {
        apps: registry.apps_owned_by(&username),
        username,
    };
    Ok(warp::reply::with_status(warp::reply::json(&profile), StatusCode::OK).into_response())
}

// =============================================================================
// Helpers
// =============================================================================

fn error_response(status: StatusCode, code: &str, message: &str) -> warp::reply::Response {
    let body = ApiError {
        error: message.to_string(),
        code: code.to_string(),
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

fn registry_error_response(err: RegistryError) -> warp::reply::Response {
    let (status, code) = match &err {
        RegistryError::NotFound(_) => (StatusCode::NOT_FOUND, "app_not_found"),
        RegistryError::AlreadyExists(_) => (StatusCode::CONFLICT, "already_exists"),
        RegistryError::InvalidIdentifier(_) => (StatusCode::BAD_REQUEST, "invalid_identifier"),
    };
    error_response(status, code, &err.to_string())
}

fn storage_error_response(err: StorageError) -> warp::reply::Response {
    let (status, code) = match &err {
        StorageError::AlreadyExists(_) => (StatusCode::CONFLICT, "storage_exists"),
        StorageError::NotFound(_) => (StatusCode::CONFLICT, "storage_missing"),
        StorageError::InvalidIdentifier(_) => (StatusCode::BAD_REQUEST, "invalid_identifier"),
        StorageError::Io(_) | StorageError::Serialization(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
        }
    };
    error_response(status, code, &err.to_string())
}

/// Map rejections (missing header, bad body, unknown route) to JSON errors.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message): (StatusCode, String) = if err
        .find::<warp::reject::MissingHeader>()
        .is_some()
    {
        (
            StatusCode::UNAUTHORIZED,
            "Missing x-api-key header".into(),
        )
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {}", e))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request payload too large".into())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".into())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".into())
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": message })),
        code,
    ))
}
