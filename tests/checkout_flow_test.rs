mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, response_json, TestApp};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

fn order_payload(wilaya: &str, items: Value) -> Value {
    json!({
        "customer_name": "Yacine Benali",
        "customer_phone": "0555 12 34 56",
        "customer_address": "Cité 500 logements, Bt 12, Bab Ezzouar",
        "wilaya": wilaya,
        "items": items,
    })
}

#[tokio::test]
async fn places_a_pending_order_with_the_wilaya_delivery_fee() {
    let app = TestApp::new().await;
    let coque = app.seed_product("Coque silicone", 1500, "coques", 10).await;
    let cable = app.seed_product("Câble USB-C 2m", 800, "cables", 10).await;
    app.seed_delivery_price("Alger", 400).await;

    let payload = order_payload(
        "Alger",
        json!([
            { "product_id": coque.id, "quantity": 2 },
            { "product_id": cable.id, "quantity": 1 },
        ]),
    );
    let response = app
        .request_public(Method::POST, "/api/v1/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    let order = &body["data"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["status_label"], "En attente");
    assert_eq!(order["wilaya"], "Alger");
    assert_eq!(decimal(&order["subtotal"]), Decimal::from(3800));
    assert_eq!(decimal(&order["delivery_fee"]), Decimal::from(400));
    assert_eq!(decimal(&order["total"]), Decimal::from(4200));

    let items = order["items"].as_array().expect("order items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(decimal(&items[0]["price"]), Decimal::from(1500));
    assert_eq!(items[0]["product"]["name"], "Coque silicone");
}

#[tokio::test]
async fn accepts_a_wilaya_code_and_defaults_the_fee_to_zero() {
    let app = TestApp::new().await;
    let product = app.seed_product("Support bureau", 1200, "supports", 5).await;

    let payload = order_payload("31", json!([{ "product_id": product.id, "quantity": 1 }]));
    let response = app
        .request_public(Method::POST, "/api/v1/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["wilaya"], "Oran");
    assert_eq!(decimal(&body["data"]["delivery_fee"]), Decimal::ZERO);
    assert_eq!(decimal(&body["data"]["total"]), Decimal::from(1200));
}

#[tokio::test]
async fn variant_adjustments_change_the_unit_price() {
    let app = TestApp::new().await;
    let product = app.seed_product("Coque premium", 2000, "coques", 10).await;
    let noir = app.seed_variant(product.id, "Couleur", "Noir", 0).await;
    let galaxy = app.seed_variant(product.id, "Modèle", "Galaxy S24", 300).await;

    let payload = order_payload(
        "Blida",
        json!([{ "product_id": product.id, "quantity": 2, "variant_ids": [noir, galaxy] }]),
    );
    let response = app
        .request_public(Method::POST, "/api/v1/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let item = &body["data"]["items"][0];
    assert_eq!(decimal(&item["price"]), Decimal::from(2300));
    assert_eq!(item["variant_label"], "Couleur: Noir, Modèle: Galaxy S24");
    assert_eq!(decimal(&body["data"]["subtotal"]), Decimal::from(4600));
}

#[tokio::test]
async fn rejects_two_options_from_the_same_group() {
    let app = TestApp::new().await;
    let product = app.seed_product("Coque premium", 2000, "coques", 10).await;
    let noir = app.seed_variant(product.id, "Couleur", "Noir", 0).await;
    let bleu = app.seed_variant(product.id, "Couleur", "Bleu", 0).await;

    let payload = order_payload(
        "Alger",
        json!([{ "product_id": product.id, "quantity": 1, "variant_ids": [noir, bleu] }]),
    );
    let response = app
        .request_public(Method::POST, "/api/v1/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quantity_beyond_stock_is_unprocessable() {
    let app = TestApp::new().await;
    let product = app.seed_product("Écouteurs sans fil", 5200, "ecouteurs", 2).await;

    // two lines for the same product add up past the stock
    let payload = order_payload(
        "Alger",
        json!([
            { "product_id": product.id, "quantity": 2 },
            { "product_id": product.id, "quantity": 1 },
        ]),
    );
    let response = app
        .request_public(Method::POST, "/api/v1/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .request_authenticated(Method::GET, "/api/v1/admin/orders", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let payload = order_payload(
        "Alger",
        json!([{ "product_id": Uuid::new_v4(), "quantity": 1 }]),
    );
    let response = app
        .request_public(Method::POST, "/api/v1/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_contact_details_are_rejected() {
    let app = TestApp::new().await;
    let product = app.seed_product("Câble micro-USB", 500, "cables", 10).await;
    let items = json!([{ "product_id": product.id, "quantity": 1 }]);

    let mut bad_phone = order_payload("Alger", items.clone());
    bad_phone["customer_phone"] = json!("12345");
    let response = app
        .request_public(Method::POST, "/api/v1/checkout", Some(bad_phone))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bad_wilaya = order_payload("Atlantis", items.clone());
    let response = app
        .request_public(Method::POST, "/api/v1/checkout", Some(bad_wilaya))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut blank_name = order_payload("Alger", items);
    blank_name["customer_name"] = json!("   ");
    let response = app
        .request_public(Method::POST, "/api/v1/checkout", Some(blank_name))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let empty_cart = order_payload("Alger", json!([]));
    let response = app
        .request_public(Method::POST, "/api/v1/checkout", Some(empty_cart))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn accepts_mobile_numbers_without_the_leading_zero() {
    let app = TestApp::new().await;
    let product = app.seed_product("Câble micro-USB", 500, "cables", 10).await;

    let mut payload = order_payload("Alger", json!([{ "product_id": product.id, "quantity": 1 }]));
    payload["customer_phone"] = json!("555 12 34 56");
    let response = app
        .request_public(Method::POST, "/api/v1/checkout", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["customer_phone"], "555 12 34 56");
}

#[tokio::test]
async fn quote_prices_the_cart_without_creating_an_order() {
    let app = TestApp::new().await;
    let product = app.seed_product("Chargeur 20W", 2500, "chargeurs", 10).await;
    app.seed_delivery_price("Oran", 600).await;

    let response = app
        .request_public(
            Method::POST,
            "/api/v1/checkout/quote",
            Some(json!({
                "wilaya": "oran",
                "items": [{ "product_id": product.id, "quantity": 3 }],
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let quote = &body["data"];
    assert_eq!(quote["wilaya"], "Oran");
    assert_eq!(decimal(&quote["lines"][0]["line_total"]), Decimal::from(7500));
    assert_eq!(decimal(&quote["subtotal"]), Decimal::from(7500));
    assert_eq!(decimal(&quote["delivery_fee"]), Decimal::from(600));
    assert_eq!(decimal(&quote["total"]), Decimal::from(8100));

    let stats = app.state.services.dashboard.stats().await.unwrap();
    assert_eq!(stats.total_orders, 0);
}

#[tokio::test]
async fn delivery_fee_lookup_by_wilaya() {
    let app = TestApp::new().await;
    app.seed_delivery_price("Tizi Ouzou", 500).await;

    let response = app
        .request_public(Method::GET, "/api/v1/delivery/Tizi%20Ouzou", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"]["wilaya"], "Tizi Ouzou");
    assert_eq!(decimal(&body["data"]["fee"]), Decimal::from(500));

    let response = app
        .request_public(Method::GET, "/api/v1/delivery/Setif", None)
        .await;
    let body = response_json(response).await;
    assert_eq!(decimal(&body["data"]["fee"]), Decimal::ZERO);
}
