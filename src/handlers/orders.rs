use crate::handlers::common::{map_service_error, success_response};
use crate::{
    entities::{order, OrderStatus},
    errors::ApiError,
    services::orders::{OrderFilter, OrderWithItems},
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// pending, confirmed, shipped, delivered or cancelled
    pub status: String,
}

/// Mounted under `/admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/status", put(update_order_status))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    params(OrderFilter),
    responses((status = 200, description = "Orders, newest first", body = crate::ApiResponse<Vec<OrderWithItems>>)),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state
        .services
        .orders
        .list_orders(filter)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with items", body = crate::ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .services
        .orders
        .get_order(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = crate::ApiResponse<order::Model>),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = OrderStatus::from_str(payload.status.trim()).map_err(|_| ApiError::BadRequest {
        message: format!("Unknown order status '{}'", payload.status),
        error_code: Some("order_status_unknown".to_string()),
    })?;

    let order = state
        .services
        .orders
        .update_status(id, status)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(order))
}
