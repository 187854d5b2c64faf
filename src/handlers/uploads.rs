use crate::handlers::common::{created_response, map_service_error};
use crate::{errors::ApiError, services::media::UploadedFile, AppState};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use tracing::debug;

/// Multipart field carrying an image.
pub const FILE_FIELD: &str = "file";
/// Images accepted in one request.
pub const MAX_FILES_PER_REQUEST: usize = 10;

/// Mounted under `/admin`.
pub fn admin_routes(max_upload_bytes: usize) -> Router<AppState> {
    // room for every file plus multipart framing
    let body_limit = max_upload_bytes
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(64 * 1024);

    Router::new()
        .route("/uploads", post(upload_images))
        .layer(DefaultBodyLimit::max(body_limit))
}

/// Stores every `file` field, or none of them, and returns their public URLs in upload order.
#[utoipa::path(
    post,
    path = "/api/v1/admin/uploads",
    request_body(content_type = "multipart/form-data", description = "One or more `file` fields"),
    responses(
        (status = 201, description = "Stored images", body = crate::ApiResponse<Vec<UploadedFile>>),
        (status = 400, description = "No file or unsupported type", body = crate::errors::ErrorResponse),
        (status = 413, description = "File too large", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut files: Vec<(String, Bytes)> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::BadRequest {
        message: format!("Malformed multipart body: {}", e),
        error_code: Some("upload_malformed".to_string()),
    })? {
        if field.name() != Some(FILE_FIELD) {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }
        if files.len() == MAX_FILES_PER_REQUEST {
            return Err(ApiError::BadRequest {
                message: format!("At most {} files per upload", MAX_FILES_PER_REQUEST),
                error_code: Some("upload_too_many_files".to_string()),
            });
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest {
            message: format!("Could not read {}: {}", file_name, e),
            error_code: Some("upload_malformed".to_string()),
        })?;

        state
            .services
            .media
            .check(&file_name, &bytes)
            .map_err(map_service_error)?;
        files.push((file_name, bytes));
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest {
            message: format!("Expected at least one '{}' field", FILE_FIELD),
            error_code: Some("upload_missing_file".to_string()),
        });
    }

    let stored = state
        .services
        .media
        .upload_all(&files[..])
        .await
        .map_err(map_service_error)?;
    Ok(created_response(stored))
}
