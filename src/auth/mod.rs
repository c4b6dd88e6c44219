/*!
 * # Authentication
 *
 * Bearer-token authentication for the site ledger API. Tokens are HS256
 * JWTs carrying the user id (`sub`), display name and a single `role`.
 * The middleware attaches an [`AuthUser`] to the request; route groups
 * decide who gets through with a [`RoleGate`].
 */

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::AppConfig;

mod rbac;

pub use rbac::*;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (user ID)
    pub name: String, // Display name
    pub role: String, // `admin` or `supervisor`
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    /// `None` when the token carried a role this service does not know
    pub role: Option<Role>,
    pub token_id: String,
}

impl AuthUser {
    pub fn new(user_id: Uuid, name: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            name: name.into(),
            role: Some(role),
            token_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Supervisor id to scope site queries by, `None` for other roles.
    pub fn supervisor_scope(&self) -> Option<Uuid> {
        self.has_role(Role::Supervisor).then_some(self.user_id)
    }

    /// Admins see every site, supervisors only the ones assigned to them.
    pub fn can_access_site(&self, supervisor_id: Option<Uuid>) -> bool {
        match self.role {
            Some(Role::Admin) => true,
            Some(Role::Supervisor) => supervisor_id == Some(self.user_id),
            None => false,
        }
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
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            access_token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
        )
    }
}

/// Issues and validates access tokens
#[derive(Debug, Clone)]
pub struct AuthService {
    config: AuthConfig,
}

/// Access token handed to a client
#[derive(Debug, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Generate an access token for a user
    pub fn generate_token(
        &self,
        user_id: Uuid,
        name: &str,
        role: Role,
    ) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let access_token = self.encode_claims(&claims)?;

        Ok(IssuedToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
        })
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// Validates `token` and turns its claims into an [`AuthUser`].
    pub fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthUser {
            user_id,
            name: claims.name,
            role: Role::from_claim(&claims.role),
            token_id: claims.jti,
        })
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::TokenCreation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                msg.clone(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Makes the [`AuthService`] available to [`auth_middleware`].
pub async fn auth_service_layer(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    request.extensions_mut().insert(auth_service);
    next.run(request).await
}

/// Attaches the [`AuthUser`] of a valid bearer token. Requests without an
/// `Authorization` header pass through unauthenticated; the role gate
/// rejects them where a role is required.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response()
        }
    };

    if request.headers().get(header::AUTHORIZATION).is_none() {
        return next.run(request).await;
    }

    let user = match bearer_token(request.headers()) {
        Some(token) => auth_service.authenticate(token),
        None => Err(AuthError::InvalidToken),
    };

    match user {
        Ok(user) => {
            debug!(user_id = %user.user_id, role = ?user.role, "Request authenticated");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_roles(self, gate: &RoleGate) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    /// The role gate is the inner layer so it sees the user attached by auth.
    fn with_roles(self, gate: &RoleGate) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            gate.clone(),
            role_gate_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "unit-test-secret-with-enough-entropy-0123456789-abcdefghijklmnop";

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            SECRET.to_string(),
            "sitebook-api".to_string(),
            "sitebook-web".to_string(),
            Duration::from_secs(3600),
        ))
    }

    #[test]
    fn issued_token_authenticates() {
        let auth = service();
        let user_id = Uuid::new_v4();
        let token = auth
            .generate_token(user_id, "Anil", Role::Supervisor)
            .unwrap();

        let user = auth.authenticate(&token.access_token).unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.name, "Anil");
        assert_eq!(user.role, Some(Role::Supervisor));
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let token = service()
            .generate_token(Uuid::new_v4(), "Anil", Role::Admin)
            .unwrap();

        let other = AuthService::new(AuthConfig::new(
            SECRET.to_string(),
            "sitebook-api".to_string(),
            "someone-else".to_string(),
            Duration::from_secs(3600),
        ));
        assert_matches!(
            other.validate_token(&token.access_token),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let auth = service();
        let past = Utc::now().timestamp() - 7200;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            name: "Old".into(),
            role: "admin".into(),
            jti: Uuid::new_v4().to_string(),
            iat: past,
            exp: past + 60,
            nbf: past,
            iss: "sitebook-api".into(),
            aud: "sitebook-web".into(),
        };
        let token = auth.encode_claims(&claims).unwrap();
        assert_matches!(auth.validate_token(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn unknown_role_claim_yields_no_role() {
        let auth = service();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            name: "Guest".into(),
            role: "owner".into(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + 600,
            nbf: now,
            iss: "sitebook-api".into(),
            aud: "sitebook-web".into(),
        };
        let token = auth.encode_claims(&claims).unwrap();
        let user = auth.authenticate(&token).unwrap();
        assert_eq!(user.role, None);
        assert!(!user.can_access_site(None));
    }

    #[test]
    fn supervisors_only_reach_assigned_sites() {
        let supervisor = AuthUser::new(Uuid::new_v4(), "Meera", Role::Supervisor);
        assert!(supervisor.can_access_site(Some(supervisor.user_id)));
        assert!(!supervisor.can_access_site(Some(Uuid::new_v4())));
        assert!(!supervisor.can_access_site(None));
        assert_eq!(supervisor.supervisor_scope(), Some(supervisor.user_id));

        let admin = AuthUser::new(Uuid::new_v4(), "Root", Role::Admin);
        assert!(admin.can_access_site(None));
        assert_eq!(admin.supervisor_scope(), None);
    }
}
