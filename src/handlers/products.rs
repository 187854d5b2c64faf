use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    entities::{product, product_variant},
    errors::ApiError,
    services::{
        catalog::{ProductDetail, ProductInput, ProductQuery, VariantGroup, VariantInput},
        share::{self, ShareLinks},
    },
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// At least three characters; shorter terms return an empty list
    #[serde(default)]
    pub q: String,
}

/// Storefront catalog, mounted at `/products`.
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/featured", get(featured_products))
        .route("/search", get(search_products))
        .route("/:id", get(get_product))
        .route("/:id/images", get(get_product_images))
        .route("/:id/variants", get(get_product_variants))
        .route("/:id/related", get(get_related_products))
        .route("/:id/share", get(get_share_links))
}

/// Product administration, mounted under `/admin`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/:id", put(update_product).delete(delete_product))
        .route("/products/:id/variants", post(create_variant))
        .route("/variants/:id", delete(delete_variant))
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Products", body = crate::ApiResponse<Vec<product::Model>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .product_catalog
        .list_products(&query)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/featured",
    responses((status = 200, description = "Newest products", body = crate::ApiResponse<Vec<product::Model>>)),
    tag = "Products"
)]
pub async fn featured_products(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .product_catalog
        .featured_products(state.config.featured_limit)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/search",
    params(SearchParams),
    responses((status = 200, description = "Matching products", body = crate::ApiResponse<Vec<product::Model>>)),
    tag = "Products"
)]
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .product_catalog
        .search(&params.q, state.config.search_limit)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product page data", body = crate::ApiResponse<ProductDetail>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .product_catalog
        .product_detail(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/images",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Gallery URLs in display order", body = crate::ApiResponse<Vec<String>>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product_images(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let images = state
        .services
        .product_catalog
        .product_images(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(images))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/variants",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Variants grouped by option name", body = crate::ApiResponse<Vec<VariantGroup>>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product_variants(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let groups = state
        .services
        .product_catalog
        .variants_grouped(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(groups))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/related",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Products from the same category", body = crate::ApiResponse<Vec<product::Model>>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_related_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let related = state
        .services
        .product_catalog
        .related_products(id, state.config.related_limit)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(related))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/share",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Facebook and WhatsApp share links", body = crate::ApiResponse<ShareLinks>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_share_links(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .product_catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(share::share_links(
        &state.config.site_url,
        product.id,
        &product.name,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/products",
    request_body = ProductInput,
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<product::Model>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<ProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state
        .services
        .product_catalog
        .create_product(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = ProductInput,
    responses(
        (status = 200, description = "Product updated", body = crate::ApiResponse<product::Model>),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state
        .services
        .product_catalog
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product, gallery and variants deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .product_catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/products/{id}/variants",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = VariantInput,
    responses(
        (status = 201, description = "Variant created", body = crate::ApiResponse<product_variant::Model>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn create_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VariantInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let variant = state
        .services
        .product_catalog
        .create_variant(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(variant))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/variants/{id}",
    params(("id" = Uuid, Path, description = "Variant ID")),
    responses(
        (status = 204, description = "Variant deleted"),
        (status = 404, description = "Variant not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn delete_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .product_catalog
        .delete_variant(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
