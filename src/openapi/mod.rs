use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mobistore Plus API",
        version = "0.1.0",
        description = r#"
# Mobistore Plus

Storefront and back office for a phone-accessory shop delivering across the 58 wilayas.

- **Catalog**: products, galleries, variants, categories and search
- **Checkout**: guest cash-on-delivery orders with a flat delivery fee per wilaya
- **Dashboard**: product, order, delivery price and image management

## Authentication

Storefront routes are public. `/api/v1/admin/*` requires an admin JWT obtained from
`POST /api/v1/auth/login`:

```
Authorization: Bearer <token>
```

## Errors

Failures share one body shape:

```json
{
  "error": "Bad Request",
  "message": "Validation error: customer_phone",
  "request_id": "req-abc123",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Storefront catalog"),
        (name = "Catalog", description = "Categories"),
        (name = "Delivery", description = "Wilayas and delivery fees"),
        (name = "Checkout", description = "Guest ordering"),
        (name = "Auth", description = "Dashboard sessions"),
        (name = "Admin", description = "Dashboard endpoints")
    ),
    paths(
        // Storefront
        crate::handlers::products::list_products,
        crate::handlers::products::featured_products,
        crate::handlers::products::search_products,
        crate::handlers::products::get_product,
        crate::handlers::products::get_product_images,
        crate::handlers::products::get_product_variants,
        crate::handlers::products::get_related_products,
        crate::handlers::products::get_share_links,
        crate::handlers::categories::list_categories,
        crate::handlers::delivery::list_wilayas,
        crate::handlers::delivery::get_delivery_fee,
        crate::handlers::checkout::place_order,
        crate::handlers::checkout::quote_order,

        // Auth
        crate::auth::login_handler,
        crate::auth::logout_handler,
        crate::auth::me_handler,

        // Admin
        crate::handlers::dashboard::get_stats,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::create_variant,
        crate::handlers::products::delete_variant,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::update_order_status,
        crate::handlers::delivery::list_delivery_settings,
        crate::handlers::delivery::save_delivery_prices,
        crate::handlers::uploads::upload_images,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::entities::OrderStatus,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_storefront_and_admin_paths() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        assert!(json.contains("Mobistore Plus API"));
        assert!(json.contains("/api/v1/checkout"));
        assert!(json.contains("/api/v1/admin/orders/{id}/status"));
        assert!(json.contains("\"Bearer\""));
    }
}
