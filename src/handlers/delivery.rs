use crate::handlers::common::{map_service_error, success_response};
use crate::{entities::delivery_setting, errors::ApiError, wilaya, AppState};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct WilayaResponse {
    pub code: u8,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryFeeResponse {
    pub wilaya: String,
    pub fee: Decimal,
}

/// Admin form payload: wilaya name (or code) to flat price.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DeliveryPricesRequest {
    pub prices: BTreeMap<String, Decimal>,
}

pub fn wilayas_routes() -> Router<AppState> {
    Router::new().route("/", get(list_wilayas))
}

pub fn delivery_routes() -> Router<AppState> {
    Router::new().route("/:wilaya", get(get_delivery_fee))
}

/// Mounted under `/admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new().route(
        "/delivery-settings",
        get(list_delivery_settings).put(save_delivery_prices),
    )
}

#[utoipa::path(
    get,
    path = "/api/v1/wilayas",
    responses((status = 200, description = "The 58 wilayas in code order", body = crate::ApiResponse<Vec<WilayaResponse>>)),
    tag = "Delivery"
)]
pub async fn list_wilayas() -> impl IntoResponse {
    let wilayas: Vec<WilayaResponse> = wilaya::all()
        .iter()
        .map(|w| WilayaResponse {
            code: w.code,
            name: w.name.to_string(),
        })
        .collect();
    success_response(wilayas)
}

#[utoipa::path(
    get,
    path = "/api/v1/delivery/{wilaya}",
    params(("wilaya" = String, Path, description = "Wilaya name or code")),
    responses((status = 200, description = "Delivery fee, zero when not configured", body = crate::ApiResponse<DeliveryFeeResponse>)),
    tag = "Delivery"
)]
pub async fn get_delivery_fee(
    State(state): State<AppState>,
    Path(wilaya_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let fee = state
        .services
        .delivery
        .fee_for(&wilaya_name)
        .await
        .map_err(map_service_error)?;
    let wilaya = wilaya::find(&wilaya_name)
        .map(|w| w.name.to_string())
        .unwrap_or(wilaya_name);
    Ok(success_response(DeliveryFeeResponse { wilaya, fee }))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/delivery-settings",
    responses((status = 200, description = "Configured delivery prices", body = crate::ApiResponse<Vec<delivery_setting::Model>>)),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn list_delivery_settings(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = state
        .services
        .delivery
        .list_settings()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(settings))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/delivery-settings",
    request_body = DeliveryPricesRequest,
    responses(
        (status = 200, description = "Saved prices", body = crate::ApiResponse<Vec<delivery_setting::Model>>),
        (status = 400, description = "Unknown wilaya or negative price", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn save_delivery_prices(
    State(state): State<AppState>,
    Json(payload): Json<DeliveryPricesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let saved = state
        .services
        .delivery
        .save_prices(&payload.prices)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(saved))
}
