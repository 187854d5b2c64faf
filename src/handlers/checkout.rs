use crate::handlers::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    errors::ApiError,
    services::orders::{OrderWithItems, PlaceOrderInput, Quote, QuoteInput},
    AppState,
};
use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::post,
    Router,
};

/// Guest checkout, mounted at `/checkout`. No account is needed to order.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order))
        .route("/quote", post(quote_order))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = PlaceOrderInput,
    responses(
        (status = 201, description = "Order placed as pending", body = crate::ApiResponse<OrderWithItems>),
        (status = 400, description = "Invalid contact details or empty cart", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Not enough stock", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn place_order(
    State(state): State<AppState>,
    Json(payload): Json<PlaceOrderInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let order = state
        .services
        .orders
        .place_order(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(order))
}

#[utoipa::path(
    post,
    path = "/api/v1/checkout/quote",
    request_body = QuoteInput,
    responses(
        (status = 200, description = "Priced lines with subtotal, delivery fee and total", body = crate::ApiResponse<Quote>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn quote_order(
    State(state): State<AppState>,
    Json(payload): Json<QuoteInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let quote = state
        .services
        .orders
        .quote(payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(quote))
}
