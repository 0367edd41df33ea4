//! # API REST
//!
//! REST API implementation for the SNCOP storage backend.
//!
//! Handles:
//! - HTTP endpoints with axum (subjects, uploads, files, verify, sync)
//! - Multipart upload parsing, with `x-subject`/`x-type`/`x-unit` header
//!   fallbacks for clients that route before sending body fields
//! - The static `/storage` mount serving the tree directly
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON envelopes, status mapping, CORS)
//!
//! Uses `api-shared` for wire types and `sncop-core` for all storage logic.

#![warn(rust_2018_idioms)]

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path as AxumPath, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use sncop_core::{ResourceKind, StorageError, StorageService, UploadRequest};
use std::path::Path;
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{
    AddUnitReq, CreateSubjectReq, ErrorRes, HealthRes, HealthService, ListFilesRes, MessageRes,
    PathRes, StorageSyncRes, UploadRes, VerifyFilesReq, VerifyFilesRes,
};

/// Application state shared across REST API handlers.
///
/// Holds the storage service; configuration is reachable through it.
#[derive(Clone)]
pub struct AppState {
    service: StorageService,
}

impl AppState {
    pub fn new(service: StorageService) -> Self {
        Self { service }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_subject,
        add_unit,
        delete_subject,
        upload,
        get_note_file,
        delete_note_file,
        files_by_kind,
        delete_kind_file,
        list_files,
        verify_files,
        storage_sync_all,
        storage_sync_subject,
    ),
    components(schemas(
        api_shared::BackupDocument,
        api_shared::BackupSubject,
        api_shared::BackupFile,
        api_shared::StoredFile,
        api_shared::FileSummary,
        api_shared::SubjectFiles,
        api_shared::DirEntry,
        api_shared::CreateSubjectReq,
        api_shared::AddUnitReq,
        api_shared::PathRes,
        api_shared::MessageRes,
        api_shared::UploadRes,
        api_shared::ListFilesRes,
        api_shared::VerifyFileQuery,
        api_shared::VerifiedFile,
        api_shared::VerifyFilesReq,
        api_shared::VerifyFilesRes,
        api_shared::StorageSyncRes,
        api_shared::HealthRes,
        api_shared::ErrorRes,
    ))
)]
struct ApiDoc;

/// REST-facing error: a status code plus the JSON error envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorRes,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorRes {
                success: false,
                message: message.into(),
                error: None,
                details: None,
                path: None,
            },
        }
    }

    /// Maps a core error onto the envelope the client expects.
    ///
    /// Request-caused failures keep their specific message with a 400;
    /// missing files map to 404; anything else is a 500 carrying the
    /// operation context, with debug detail only in dev mode.
    fn from_storage(state: &AppState, context: &'static str, err: StorageError) -> Self {
        if err.is_invalid_request() {
            return Self::bad_request(err.to_string());
        }
        if matches!(err, StorageError::FileNotFound) {
            return Self {
                status: StatusCode::NOT_FOUND,
                body: ErrorRes {
                    success: false,
                    message: "File not found".into(),
                    error: None,
                    details: None,
                    path: None,
                },
            };
        }

        tracing::error!("{context}: {err:?}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorRes {
                success: false,
                message: context.into(),
                error: Some(err.to_string()),
                details: state
                    .service
                    .config()
                    .dev_mode()
                    .then(|| format!("{err:?}")),
                path: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let storage_dir = state.service.config().storage_dir().to_path_buf();

    Router::new()
        .route("/api/health", get(health))
        .route("/api/subjects", post(create_subject))
        .route("/api/subjects/:subject_name/units", post(add_unit))
        .route("/api/subjects/:subject_name", delete(delete_subject))
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/api/files/:subject/:kind/:unit/:filename",
            get(get_note_file).delete(delete_note_file),
        )
        .route(
            "/api/files/:subject/:kind/:third",
            get(files_by_kind).delete(delete_kind_file),
        )
        .route("/api/files/:subject/:kind", get(list_files))
        .route("/api/verify-files", post(verify_files))
        .route("/api/storage-sync", get(storage_sync_all))
        .route("/api/storage-sync/:subject", get(storage_sync_subject))
        .nest_service("/storage", ServeDir::new(storage_dir))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(route_not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Installs SIGINT/SIGTERM handlers for graceful shutdown.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Reports liveness plus the storage root the process is serving from.
/// Used for monitoring and load balancer health checks.
async fn health(State(state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health(
        state.service.config().storage_dir(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/subjects",
    request_body = CreateSubjectReq,
    responses(
        (status = 200, description = "Subject structure created", body = PathRes),
        (status = 400, description = "Missing subject name", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Create a subject directory structure
///
/// Provisions `notes/{unit}` for each requested unit plus the
/// `practice-tests` and `practicals` directories, and upserts the subject
/// record in the backup document (replace, not duplicate).
async fn create_subject(
    State(state): State<AppState>,
    Json(req): Json<CreateSubjectReq>,
) -> Result<Json<PathRes>, ApiError> {
    let path = state
        .service
        .create_subject(&req.name, &req.units)
        .map_err(|e| ApiError::from_storage(&state, "Failed to create subject structure", e))?;

    Ok(Json(PathRes {
        success: true,
        message: "Subject directory structure created successfully".into(),
        path: path.display().to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/subjects/{subject_name}/units",
    request_body = AddUnitReq,
    responses(
        (status = 200, description = "Unit directory created", body = PathRes),
        (status = 400, description = "Missing unit name", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Add a unit to a subject's notes
async fn add_unit(
    State(state): State<AppState>,
    AxumPath(subject_name): AxumPath<String>,
    Json(req): Json<AddUnitReq>,
) -> Result<Json<PathRes>, ApiError> {
    let path = state
        .service
        .add_unit(&subject_name, &req.unit_name)
        .map_err(|e| ApiError::from_storage(&state, "Failed to create unit directory", e))?;

    Ok(Json(PathRes {
        success: true,
        message: "Unit directory created successfully".into(),
        path: path.display().to_string(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/subjects/{subject_name}",
    responses(
        (status = 200, description = "Subject deleted", body = MessageRes),
        (status = 400, description = "Invalid subject name", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Delete a subject and everything under it
///
/// Removes the directory tree (idempotent) and purges every catalog entry
/// whose subject matches. The reserved name "temp" is rejected.
async fn delete_subject(
    State(state): State<AppState>,
    AxumPath(subject_name): AxumPath<String>,
) -> Result<Json<MessageRes>, ApiError> {
    state
        .service
        .delete_subject(&subject_name)
        .map_err(|e| ApiError::from_storage(&state, "Failed to delete subject", e))?;

    Ok(Json(MessageRes {
        success: true,
        message: format!("Subject '{subject_name}' deleted successfully"),
    }))
}

#[utoipa::path(
    post,
    path = "/api/upload",
    responses(
        (status = 200, description = "File uploaded", body = UploadRes),
        (status = 400, description = "Validation failure", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Upload one study-material file
///
/// Accepts a multipart form with a `file` field plus `title`, `subject`,
/// `type`, `unit` (notes only) and `description` fields. The
/// `x-subject`/`x-type`/`x-unit` headers are honoured as fallbacks for the
/// routing fields, so older clients that send them before the body keep
/// working; the storage destination is decided only after the whole form is
/// parsed, so nothing is ever parked in a temp directory.
async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadRes>, ApiError> {
    let mut req = UploadRequest {
        subject: header_value(&headers, "x-subject"),
        kind: header_value(&headers, "x-type"),
        unit: header_value(&headers, "x-unit"),
        ..UploadRequest::default()
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Multipart error: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                req.file_name = field.file_name().map(str::to_string);
                req.content_type = field.content_type().map(str::to_string);
                req.data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Read error: {e}")))?
                        .to_vec(),
                );
            }
            Some("title") => req.title = Some(field_text(field).await?),
            Some("subject") => req.subject = Some(field_text(field).await?),
            Some("type") => req.kind = Some(field_text(field).await?),
            Some("unit") => req.unit = Some(field_text(field).await?),
            Some("description") => req.description = Some(field_text(field).await?),
            _ => {} // ignore unknown fields
        }
    }

    let stored = state
        .service
        .store_upload(req)
        .map_err(|e| ApiError::from_storage(&state, "Failed to upload file", e))?;

    Ok(Json(UploadRes {
        success: true,
        message: "File uploaded successfully".into(),
        file: stored,
    }))
}

#[utoipa::path(
    get,
    path = "/api/files/{subject}/{kind}/{unit}/{filename}",
    responses(
        (status = 200, description = "File contents"),
        (status = 404, description = "File not found", body = ErrorRes)
    )
)]
/// Fetch a notes file from a unit directory
async fn get_note_file(
    State(state): State<AppState>,
    AxumPath((subject, kind, unit, filename)): AxumPath<(String, String, String, String)>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind)?;
    serve_file(&state, &subject, kind, Some(&unit), &filename).await
}

#[utoipa::path(
    delete,
    path = "/api/files/{subject}/{kind}/{unit}/{filename}",
    responses(
        (status = 200, description = "File deleted", body = MessageRes),
        (status = 404, description = "File not found", body = ErrorRes)
    )
)]
/// Delete a notes file from a unit directory
async fn delete_note_file(
    State(state): State<AppState>,
    AxumPath((subject, kind, unit, filename)): AxumPath<(String, String, String, String)>,
) -> Result<Json<MessageRes>, ApiError> {
    let kind = parse_kind(&kind)?;
    delete_stored_file(&state, &subject, kind, Some(&unit), &filename)
}

#[utoipa::path(
    get,
    path = "/api/files/{subject}/{kind}/{third}",
    responses(
        (status = 200, description = "Unit listing (notes) or file contents (other kinds)"),
        (status = 404, description = "File not found", body = ErrorRes)
    )
)]
/// Three-segment files route
///
/// For notes the third segment is a unit name and this is a listing; for
/// practice-tests and practicals it is a filename and this streams the file.
async fn files_by_kind(
    State(state): State<AppState>,
    AxumPath((subject, kind, third)): AxumPath<(String, String, String)>,
) -> Result<Response, ApiError> {
    let kind = parse_kind(&kind)?;
    if kind.has_units() {
        let files = state
            .service
            .list_dir(&subject, kind, Some(&third))
            .map_err(|e| ApiError::from_storage(&state, "Failed to list files", e))?;
        return Ok(Json(ListFilesRes {
            success: true,
            files,
        })
        .into_response());
    }
    serve_file(&state, &subject, kind, None, &third).await
}

#[utoipa::path(
    delete,
    path = "/api/files/{subject}/{kind}/{filename}",
    responses(
        (status = 200, description = "File deleted", body = MessageRes),
        (status = 404, description = "File not found", body = ErrorRes)
    )
)]
/// Delete a practice-test or practical file
async fn delete_kind_file(
    State(state): State<AppState>,
    AxumPath((subject, kind, filename)): AxumPath<(String, String, String)>,
) -> Result<Json<MessageRes>, ApiError> {
    let kind = parse_kind(&kind)?;
    if kind.has_units() {
        // Notes deletion must address a unit; the resolver treats the
        // missing unit as an input error.
        return Err(ApiError::from_storage(
            &state,
            "Failed to delete file",
            StorageError::UnitRequired,
        ));
    }
    delete_stored_file(&state, &subject, kind, None, &filename)
}

#[utoipa::path(
    get,
    path = "/api/files/{subject}/{kind}",
    responses(
        (status = 200, description = "Live directory listing", body = ListFilesRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// List the live directory for a subject and kind
///
/// Reads the tree only; no backup fallback. A missing directory yields an
/// empty list.
async fn list_files(
    State(state): State<AppState>,
    AxumPath((subject, kind)): AxumPath<(String, String)>,
) -> Result<Json<ListFilesRes>, ApiError> {
    let kind = parse_kind(&kind)?;
    let files = state
        .service
        .list_dir(&subject, kind, None)
        .map_err(|e| ApiError::from_storage(&state, "Failed to list files", e))?;

    Ok(Json(ListFilesRes {
        success: true,
        files,
    }))
}

#[utoipa::path(
    post,
    path = "/api/verify-files",
    request_body = VerifyFilesReq,
    responses(
        (status = 200, description = "Per-file existence results", body = VerifyFilesRes)
    )
)]
/// Batch existence check against canonical paths
async fn verify_files(
    State(state): State<AppState>,
    Json(req): Json<VerifyFilesReq>,
) -> Json<VerifyFilesRes> {
    let verified_files = state.service.verify_files(&req.files);
    Json(VerifyFilesRes {
        success: true,
        verified_files,
    })
}

#[utoipa::path(
    get,
    path = "/api/storage-sync",
    responses(
        (status = 200, description = "Reconciled storage structure", body = StorageSyncRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Reconciled view of every subject
///
/// Walks the live tree (skipping "temp"), joining catalog titles onto each
/// file; when the tree contributes nothing the structure is rebuilt from
/// the backup document instead. The raw backup document rides along.
async fn storage_sync_all(State(state): State<AppState>) -> Result<Json<StorageSyncRes>, ApiError> {
    storage_sync_response(&state, None)
}

#[utoipa::path(
    get,
    path = "/api/storage-sync/{subject}",
    responses(
        (status = 200, description = "Reconciled structure for one subject", body = StorageSyncRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Reconciled view of a single subject
async fn storage_sync_subject(
    State(state): State<AppState>,
    AxumPath(subject): AxumPath<String>,
) -> Result<Json<StorageSyncRes>, ApiError> {
    storage_sync_response(&state, Some(&subject))
}

/// Catch-all for unknown routes, mirroring the JSON envelope.
async fn route_not_found(uri: Uri) -> (StatusCode, Json<ErrorRes>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorRes {
            success: false,
            message: "Route not found".into(),
            error: None,
            details: None,
            path: Some(uri.path().to_string()),
        }),
    )
}

// Helper functions

fn parse_kind(kind: &str) -> Result<ResourceKind, ApiError> {
    kind.parse::<ResourceKind>()
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("Read error: {e}")))
}

fn storage_sync_response(
    state: &AppState,
    subject: Option<&str>,
) -> Result<Json<StorageSyncRes>, ApiError> {
    let sync = state
        .service
        .storage_sync(subject)
        .map_err(|e| ApiError::from_storage(state, "Failed to get storage structure", e))?;

    Ok(Json(StorageSyncRes {
        success: true,
        storage_structure: sync.structure,
        backup_data: sync.backup,
    }))
}

fn delete_stored_file(
    state: &AppState,
    subject: &str,
    kind: ResourceKind,
    unit: Option<&str>,
    filename: &str,
) -> Result<Json<MessageRes>, ApiError> {
    state
        .service
        .delete_file(subject, kind, unit, filename)
        .map_err(|e| ApiError::from_storage(state, "Failed to delete file", e))?;

    Ok(Json(MessageRes {
        success: true,
        message: "File deleted successfully".into(),
    }))
}

/// Streams a resolved file with a content type chosen by extension.
async fn serve_file(
    state: &AppState,
    subject: &str,
    kind: ResourceKind,
    unit: Option<&str>,
    filename: &str,
) -> Result<Response, ApiError> {
    let path = state
        .service
        .open_file(subject, kind, unit, filename)
        .map_err(|e| ApiError::from_storage(state, "Failed to serve file", e))?;

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        ApiError::from_storage(
            state,
            "Failed to send file",
            StorageError::FileRead(e),
        )
    })?;

    let body = Body::from_stream(ReaderStream::new(file));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(filename))
        .body(body)
        .map_err(|e| {
            tracing::error!("failed to build file response: {e}");
            ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: ErrorRes {
                    success: false,
                    message: "Failed to send file".into(),
                    error: Some(e.to_string()),
                    details: None,
                    path: None,
                },
            }
        })
}

/// Content type by extension, as the browser client expects.
fn content_type_for(filename: &str) -> String {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => "application/pdf".to_string(),
        "jpg" | "jpeg" | "png" | "gif" => format!("image/{ext}"),
        _ => "application/octet-stream".to_string(),
    }
}
