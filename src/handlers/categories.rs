use crate::handlers::common::{map_service_error, success_response};
use crate::{entities::category, errors::ApiError, AppState};
use axum::{extract::State, response::IntoResponse, routing::get, Router};

pub fn categories_routes() -> Router<AppState> {
    Router::new().route("/", get(list_categories))
}

/// Categories for the storefront grid; built-in defaults while none are stored.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses((status = 200, description = "Categories", body = crate::ApiResponse<Vec<category::Model>>)),
    tag = "Catalog"
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .categories
        .list_categories()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}
