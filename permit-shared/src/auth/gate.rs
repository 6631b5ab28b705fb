/// Access-control gate
///
/// Every request path outside a small allow-list must carry a valid access
/// token. The decision itself is the pure function [`authorize`]; the axum
/// middleware [`access_gate`] only feeds it the request path and the
/// `Authorization` header and stores the resulting [`AuthContext`] in the
/// request extensions.
///
/// # Allow-list
///
/// - `/user/login/` and `/user/refresh`
/// - `/health`
/// - anything under `/media`
///
/// # Header format
///
/// `Authorization: Bearer <token>` or the bare token.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use permit_shared::auth::gate::{access_gate, AuthContext, GateConfig};
///
/// async fn me(Extension(auth): Extension<AuthContext>) -> String {
///     auth.username
/// }
///
/// let gate = GateConfig::new("secret-key-at-least-32-bytes-long!!");
/// let app: Router = Router::new()
///     .route("/user/info", get(me))
///     .layer(middleware::from_fn_with_state(gate, access_gate));
/// ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::jwt::{validate_access_token, Claims, JwtError};

/// Exact paths that skip authentication
pub const PUBLIC_PATHS: &[&str] = &["/user/login/", "/user/refresh", "/health"];

/// Path prefix for uploaded files, served without authentication
pub const MEDIA_PREFIX: &str = "/media";

/// Identity of the caller, attached to authenticated requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
        }
    }
}

/// Result of a successful gate check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Allow-listed path; no identity attached
    Public,

    /// Token verified
    Authenticated(AuthContext),
}

/// Why the gate refused a request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Missing token, please log in")]
    Unauthenticated,

    #[error("Token has expired, please log in again")]
    Expired,

    #[error("Token verification failed")]
    InvalidToken,
}

impl GateError {
    pub fn code(&self) -> &'static str {
        match self {
            GateError::Unauthenticated => "unauthenticated",
            GateError::Expired => "token_expired",
            GateError::InvalidToken => "invalid_token",
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Whether `path` bypasses authentication
pub fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
        || path
            .strip_prefix(MEDIA_PREFIX)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Pulls the token out of an `Authorization` header value
///
/// Accepts `Bearer <token>` and the bare token. Returns None for a blank
/// value.
pub fn extract_token(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = match header.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => header,
    };

    (!token.is_empty()).then_some(token)
}

/// Decides whether a request may proceed
///
/// # Errors
///
/// - `GateError::Unauthenticated`: protected path, no token
/// - `GateError::Expired`: token past its expiry
/// - `GateError::InvalidToken`: bad signature, issuer, format or token type
pub fn authorize(
    path: &str,
    authorization: Option<&str>,
    secret: &str,
) -> Result<GateOutcome, GateError> {
    if is_public(path) {
        return Ok(GateOutcome::Public);
    }

    let token = authorization
        .and_then(extract_token)
        .ok_or(GateError::Unauthenticated)?;

    let claims = validate_access_token(token, secret).map_err(|e| match e {
        JwtError::Expired => GateError::Expired,
        _ => GateError::InvalidToken,
    })?;

    Ok(GateOutcome::Authenticated(claims.into()))
}

/// Secret shared by the gate and the token issuer
#[derive(Clone)]
pub struct GateConfig {
    secret: Arc<str>,
}

impl GateConfig {
    pub fn new(secret: impl Into<Arc<str>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

/// Axum middleware applying [`authorize`] to every request
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn access_gate(
    State(gate): State<GateConfig>,
    mut req: Request,
    next: Next,
) -> Result<Response, GateError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match authorize(req.uri().path(), authorization, gate.secret()) {
        Ok(GateOutcome::Public) => {}
        Ok(GateOutcome::Authenticated(ctx)) => {
            req.extensions_mut().insert(ctx);
        }
        Err(err) => {
            debug!(path = %req.uri().path(), reason = err.code(), "Request rejected by access gate");
            return Err(err);
        }
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, TokenType};
    use chrono::Duration;

    const SECRET: &str = "gate-test-secret-key-32-bytes-long!";

    fn token(token_type: TokenType) -> String {
        create_token(&Claims::new(5, "alice", token_type), SECRET).unwrap()
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public("/user/login/"));
        assert!(is_public("/user/refresh"));
        assert!(is_public("/health"));
        assert!(is_public("/media"));
        assert!(is_public("/media/avatars/1.png"));

        assert!(!is_public("/user/login"));
        assert!(!is_public("/user/info"));
        assert!(!is_public("/menu/nav"));
        assert!(!is_public("/media-admin"));
        assert!(!is_public("/mediafoo/x"));
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_token("abc"), Some("abc"));
        assert_eq!(extract_token("  Bearer   abc "), Some("abc"));
        assert_eq!(extract_token(""), None);
        assert_eq!(extract_token("Bearer "), None);
        assert_eq!(extract_token("Bearer"), None);
        assert_eq!(extract_token("Bearertoken"), Some("Bearertoken"));
    }

    #[test]
    fn test_public_path_needs_no_token() {
        assert_eq!(authorize("/user/login/", None, SECRET), Ok(GateOutcome::Public));
        assert_eq!(
            authorize("/media/a.png", Some("garbage"), SECRET),
            Ok(GateOutcome::Public)
        );
    }

    #[test]
    fn test_missing_token() {
        assert_eq!(authorize("/user/info", None, SECRET), Err(GateError::Unauthenticated));
        assert_eq!(authorize("/user/info", Some(""), SECRET), Err(GateError::Unauthenticated));
        assert_eq!(
            authorize("/user/info", Some("Bearer "), SECRET),
            Err(GateError::Unauthenticated)
        );
    }

    #[test]
    fn test_media_lookalike_needs_token() {
        assert_eq!(authorize("/media-admin", None, SECRET), Err(GateError::Unauthenticated));
    }

    #[test]
    fn test_valid_token_attaches_identity() {
        let expected = GateOutcome::Authenticated(AuthContext {
            user_id: 5,
            username: "alice".to_string(),
        });

        let bearer = format!("Bearer {}", token(TokenType::Access));
        assert_eq!(authorize("/menu/nav", Some(&bearer), SECRET), Ok(expected.clone()));

        let raw = token(TokenType::Access);
        assert_eq!(authorize("/menu/nav", Some(&raw), SECRET), Ok(expected));
    }

    #[test]
    fn test_expired_token() {
        let claims = Claims::with_expiration(5, "alice", TokenType::Access, Duration::seconds(-60));
        let expired = create_token(&claims, SECRET).unwrap();
        assert_eq!(authorize("/menu/nav", Some(&expired), SECRET), Err(GateError::Expired));
    }

    #[test]
    fn test_invalid_tokens() {
        assert_eq!(
            authorize("/menu/nav", Some("Bearer not-a-jwt"), SECRET),
            Err(GateError::InvalidToken)
        );
        assert_eq!(
            authorize("/menu/nav", Some(&token(TokenType::Access)), "some-other-secret-32-bytes-long!!"),
            Err(GateError::InvalidToken)
        );
        // Refresh tokens cannot be used as access tokens
        assert_eq!(
            authorize("/menu/nav", Some(&token(TokenType::Refresh)), SECRET),
            Err(GateError::InvalidToken)
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(GateError::Unauthenticated.code(), "unauthenticated");
        assert_eq!(GateError::Expired.code(), "token_expired");
        assert_eq!(GateError::InvalidToken.code(), "invalid_token");
    }

    #[test]
    fn test_error_response_status() {
        let response = GateError::Expired.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
