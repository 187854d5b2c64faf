#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use mobistore_api::{
    app_router,
    auth::{AuthConfig, AuthService, ADMIN_ROLE},
    config::AppConfig,
    db,
    entities::product,
    events::{self, EventSender},
    handlers::AppServices,
    services::catalog::{ProductInput, VariantInput},
    AppState,
};

pub const ADMIN_EMAIL: &str = "admin@mobistore.dz";
pub const ADMIN_PASSWORD: &str = "motdepasse-admin";

const TEST_JWT_SECRET: &str =
    "integration_test_secret_with_enough_entropy_0123456789_abcdefghijklmnopqrstuvwxyz";

/// Application wired against a throwaway SQLite file and storage directory.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    auth_service: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("mobistore_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.cors_allow_any_origin = true;
        cfg.storage_dir = dir.path().join("storage");
        cfg.public_base_url = "http://localhost:18080".to_string();
        cfg.site_url = "https://mobistore.test".to_string();
        cfg.max_upload_bytes = 1024 * 1024;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        std::fs::create_dir_all(cfg.bucket_dir()).expect("create storage bucket");

        let db_arc = Arc::new(pool);
        let (event_sender, event_rx) = EventSender::channel(256);
        let event_sender = Arc::new(event_sender);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(
            AuthService::new(AuthConfig::from_app_config(&cfg), db_arc.clone())
                .with_event_sender(event_sender.clone()),
        );
        auth_service
            .create_user(ADMIN_EMAIL, ADMIN_PASSWORD, ADMIN_ROLE)
            .await
            .expect("create admin account");
        let token = auth_service
            .sign_in(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("admin sign in")
            .access_token;

        let services = AppServices::new(
            db_arc.clone(),
            event_sender.clone(),
            auth_service.clone(),
            &cfg,
        );
        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };
        let router = app_router(state.clone());

        Self {
            router,
            state,
            token,
            auth_service,
            _event_task: event_task,
            _dir: dir,
        }
    }

    pub fn auth_service(&self) -> Arc<AuthService> {
        self.auth_service.clone()
    }

    /// Bearer token for the seeded admin account.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn request_public(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, None).await
    }

    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    pub async fn seed_product(
        &self,
        name: &str,
        price: i64,
        category: &str,
        stock: i32,
    ) -> product::Model {
        self.state
            .services
            .product_catalog
            .create_product(ProductInput {
                name: name.to_string(),
                description: format!("{} pour smartphone", name),
                price: Decimal::from(price),
                image_url: String::new(),
                category: category.to_string(),
                stock,
                images: vec![],
            })
            .await
            .expect("seed product for tests")
    }

    pub async fn seed_variant(
        &self,
        product_id: Uuid,
        name: &str,
        value: &str,
        price_adjustment: i64,
    ) -> Uuid {
        self.state
            .services
            .product_catalog
            .create_variant(
                product_id,
                VariantInput {
                    name: name.to_string(),
                    value: value.to_string(),
                    price_adjustment: Decimal::from(price_adjustment),
                    stock: 10,
                },
            )
            .await
            .expect("seed variant for tests")
            .id
    }

    pub async fn seed_delivery_price(&self, wilaya: &str, price: i64) {
        let mut prices = std::collections::BTreeMap::new();
        prices.insert(wilaya.to_string(), Decimal::from(price));
        self.state
            .services
            .delivery
            .save_prices(&prices)
            .await
            .expect("seed delivery price");
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

/// Decimals serialize as strings; accept numbers too.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected a decimal, got {}", other),
    }
}
