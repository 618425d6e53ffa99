//! Authentication middleware for Axum
//!
//! Every reservation route requires a verifiable bearer token. The raw
//! token is kept as a request extension so the admission path can forward
//! it to the device registry on the caller's behalf.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use super::jwt::{verify_token, AuthError, Claims, JwtConfig};
use crate::interfaces::http::common::ApiResponse;

/// Authentication state shared with the middleware
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
}

/// Authenticated user information extracted from a verified token
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: String,
}

impl AuthenticatedUser {
    fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidSubject)?;
        Ok(Self {
            user_id,
            username: claims.username,
            role: claims.role,
        })
    }
}

/// The caller's raw bearer token, forwarded to the device registry
#[derive(Clone, Debug)]
pub struct BearerToken(pub String);

/// Extract token from Authorization header
fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// JWT authentication middleware - requires a valid token
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(String::from);
    let Some(auth_header) = auth_header else {
        return auth_error_response(AuthError::MissingToken);
    };
    let Some(token) = extract_token(&auth_header) else {
        return auth_error_response(AuthError::MissingToken);
    };

    let claims = match verify_token(token, &auth_state.jwt_config) {
        Ok(claims) => claims,
        Err(_) => return auth_error_response(AuthError::InvalidToken),
    };
    let user = match AuthenticatedUser::from_claims(claims) {
        Ok(user) => user,
        Err(e) => return auth_error_response(e),
    };

    request.extensions_mut().insert(user);
    request
        .extensions_mut()
        .insert(BearerToken(token.to_string()));
    next.run(request).await
}

fn auth_error_response(error: AuthError) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error(error.to_string())),
    )
        .into_response()
}
