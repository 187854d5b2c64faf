/*!
 * # Authentication and Authorization Module
 *
 * Dashboard accounts sign in with email and password and receive a short-lived
 * HS256 JWT. Every `/admin` route runs behind [`auth_middleware`] plus a role check.
 * Signing out revokes the token id until the token would have expired anyway.
 */

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{DefaultBodyLimit, FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::user;
use crate::errors::{ErrorResponse, ServiceError};
use crate::events::{Event, EventSender};

pub const ADMIN_ROLE: &str = "admin";
pub const MIN_PASSWORD_LEN: usize = 8;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    pub role: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub token_id: String,
    pub expires_at: i64,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

impl TryFrom<Claims> for AuthUser {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(Self {
            user_id,
            email: claims.email,
            role: claims.role,
            token_id: claims.jti,
            expires_at: claims.exp,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(
            config.jwt_secret.clone(),
            config.auth_audience.clone(),
            config.auth_issuer.clone(),
            Duration::from_secs(config.jwt_expiration as u64),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: AuthUser,
}

/// Token issuance, validation and revocation for dashboard accounts.
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
    event_sender: Option<Arc<EventSender>>,
    /// jti -> expiry of signed-out tokens
    revoked: Arc<DashMap<String, DateTime<Utc>>>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self {
            config,
            db,
            event_sender: None,
            revoked: Arc::new(DashMap::new()),
        }
    }

    pub fn with_event_sender(mut self, event_sender: Arc<EventSender>) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Checks credentials and returns a fresh access token.
    ///
    /// Unknown email and wrong password both yield [`AuthError::InvalidCredentials`].
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let email = normalize_email(email);
        let account = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let Some(account) = account else {
            debug!("Sign-in attempt for unknown account");
            // same argon2 cost as a wrong password
            if let Some(hash) = dummy_hash() {
                let _ = verify_password(password, hash);
            }
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &account.password_hash)? {
            warn!(user_id = %account.id, "Sign-in rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let (access_token, claims) = self.generate_token(&account)?;
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(Event::AdminSignedIn {
                user_id: account.id,
                at: Utc::now(),
            });
        }
        info!("Signed in: {}", account.id);

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: claims.exp - claims.iat,
            user: AuthUser::try_from(claims)?,
        })
    }

    pub fn generate_token(&self, account: &user::Model) -> Result<(String, Claims), AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: account.id.to_string(),
            email: account.email.clone(),
            role: account.role.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok((token, claims))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.jwt_audience]);
        validation.set_issuer(&[&self.config.jwt_issuer]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        if self.revoked.contains_key(&data.claims.jti) {
            return Err(AuthError::RevokedToken);
        }
        Ok(data.claims)
    }

    /// Revokes the token until its natural expiry.
    pub fn sign_out(&self, user: &AuthUser) {
        let now = Utc::now();
        self.revoked.retain(|_, expiry| *expiry > now);

        let expiry = Utc.timestamp_opt(user.expires_at, 0).single().unwrap_or(now);
        self.revoked.insert(user.token_id.clone(), expiry);
        info!("Signed out: {}", user.user_id);
    }

    #[instrument(skip(self, password))]
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<user::Model, AuthError> {
        let email = normalize_email(email);
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AuthError::InvalidEmail(email));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        if existing.is_some() {
            return Err(AuthError::UserExists(email));
        }

        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(hash_password(password)?),
            role: Set(role.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        info!("Created {} account: {}", created.role, created.id);
        Ok(created)
    }

    /// Creates the bootstrap admin account unless that email already exists.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool, AuthError> {
        match self.create_user(email, password, ADMIN_ROLE).await {
            Ok(_) => Ok(true),
            Err(AuthError::UserExists(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::InternalError(format!("Password hashing failed: {}", e)))
}

/// Hash checked when no account matches the email.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    DUMMY_HASH
        .get_or_init(|| hash_password(&Uuid::new_v4().to_string()).ok())
        .as_deref()
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AuthError::InternalError(format!("Stored hash is malformed: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Account already exists: {0}")]
    UserExists(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least 8 characters")]
    WeakPassword,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MissingAuth => (StatusCode::UNAUTHORIZED, "AUTH_MISSING"),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "AUTH_INVALID_CREDENTIALS"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "AUTH_INVALID_TOKEN"),
            Self::TokenExpired => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN_EXPIRED"),
            Self::RevokedToken => (StatusCode::UNAUTHORIZED, "AUTH_REVOKED_TOKEN"),
            Self::TokenCreation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
            ),
            Self::InsufficientPermissions => {
                (StatusCode::FORBIDDEN, "AUTH_INSUFFICIENT_PERMISSIONS")
            }
            Self::UserExists(_) => (StatusCode::CONFLICT, "AUTH_USER_EXISTS"),
            Self::InvalidEmail(_) => (StatusCode::BAD_REQUEST, "AUTH_INVALID_EMAIL"),
            Self::WeakPassword => (StatusCode::BAD_REQUEST, "AUTH_WEAK_PASSWORD"),
            Self::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_DATABASE_ERROR"),
            Self::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_INTERNAL_ERROR"),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserExists(email) => ServiceError::Conflict(format!("{} already exists", email)),
            AuthError::InvalidEmail(_) | AuthError::WeakPassword => {
                ServiceError::ValidationError(err.to_string())
            }
            AuthError::InsufficientPermissions => ServiceError::Forbidden(err.to_string()),
            AuthError::DatabaseError(msg) => ServiceError::InternalError(msg),
            AuthError::InternalError(msg) | AuthError::TokenCreation(msg) => {
                ServiceError::HashError(msg)
            }
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "authentication failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            details: Some(code.to_string()),
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_role(&required_role) {
        return Err(AuthError::InsufficientPermissions);
    }
    Ok(next.run(request).await)
}

/// Authentication middleware that validates the bearer token.
///
/// Expects an `Arc<AuthService>` request extension.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(auth_service) = request.extensions().get::<Arc<AuthService>>().cloned() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authentication service not available",
        )
            .into_response();
    };

    match extract_auth_from_headers(request.headers(), &auth_service) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingAuth)?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingAuth)?;

    AuthUser::try_from(auth_service.validate_token(token)?)
}

/// Authentication routes, mounted under `/auth`.
pub fn auth_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    Arc<AuthService>: FromRef<S>,
{
    let session = Router::new()
        .route("/logout", post(logout_handler))
        .route("/me", get(me_handler))
        .with_auth();

    Router::new()
        .route("/login", post(login_handler))
        .merge(session)
        .layer(DefaultBodyLimit::max(1024 * 64))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginCredentials,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "Auth"
)]
pub async fn login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<LoginResponse>, AuthError> {
    let response = auth_service
        .sign_in(&credentials.email, &credentials.password)
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Not signed in", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn logout_handler(
    State(auth_service): State<Arc<AuthService>>,
    user: AuthUser,
) -> StatusCode {
    auth_service.sign_out(&user);
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current session", body = AuthUser),
        (status = 401, description = "Not signed in", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Auth"
)]
pub async fn me_handler(user: AuthUser) -> Json<AuthUser> {
    Json(user)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sea_orm::Database;

    fn config(issuer: &str) -> AuthConfig {
        AuthConfig::new(
            "a".repeat(64),
            "mobistore-admin".into(),
            issuer.into(),
            Duration::from_secs(3600),
        )
    }

    async fn service(issuer: &str) -> AuthService {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        AuthService::new(config(issuer), Arc::new(db))
    }

    fn account() -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            email: "admin@mobistore.dz".into(),
            password_hash: String::new(),
            role: ADMIN_ROLE.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn unknown_accounts_are_checked_against_a_real_hash() {
        let hash = dummy_hash().expect("dummy hash");
        assert!(PasswordHash::new(hash).is_ok());
        assert!(!verify_password("motdepasse-admin", hash).unwrap());
        assert_eq!(dummy_hash(), Some(hash));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("motdepasse123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("motdepasse123", &hash).unwrap());
        assert!(!verify_password("autre-chose", &hash).unwrap());
    }

    #[tokio::test]
    async fn issued_tokens_validate_until_revoked() {
        let auth = service("mobistore-api").await;
        let (token, claims) = auth.generate_token(&account()).unwrap();

        let validated = auth.validate_token(&token).unwrap();
        assert_eq!(validated.jti, claims.jti);
        assert_eq!(validated.role, ADMIN_ROLE);

        let user = AuthUser::try_from(validated).unwrap();
        assert!(user.is_admin());
        auth.sign_out(&user);
        assert_matches!(auth.validate_token(&token), Err(AuthError::RevokedToken));
    }

    #[tokio::test]
    async fn tokens_from_another_issuer_are_rejected() {
        let auth = service("mobistore-api").await;
        let other = service("someone-else").await;

        let (token, _) = other.generate_token(&account()).unwrap();
        assert_matches!(auth.validate_token(&token), Err(AuthError::InvalidToken));
        assert_matches!(auth.validate_token("not-a-jwt"), Err(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn weak_credentials_are_rejected_before_any_query() {
        let auth = service("mobistore-api").await;
        assert_matches!(
            auth.create_user("a@b.dz", "short", ADMIN_ROLE).await,
            Err(AuthError::WeakPassword)
        );
        assert_matches!(
            auth.create_user("not-an-email", "long-enough", ADMIN_ROLE).await,
            Err(AuthError::InvalidEmail(_))
        );
    }
}
