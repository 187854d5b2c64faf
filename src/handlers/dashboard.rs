use crate::handlers::common::{map_service_error, success_response};
use crate::{errors::ApiError, services::dashboard::DashboardStats, AppState};
use axum::{extract::State, response::IntoResponse, routing::get, Router};

/// Mounted under `/admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/stats", get(get_stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    responses((status = 200, description = "Dashboard counters", body = crate::ApiResponse<DashboardStats>)),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn get_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .services
        .dashboard
        .stats()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(stats))
}
