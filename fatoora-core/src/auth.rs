use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::AppState;

/// Verified caller identity stored in request extensions.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    /// Stable subject assigned by the identity provider.
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
}

/// Claims expected inside the JWT for authenticated users.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the identity provider's user id.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
}

/// HS256 bearer token verifier.
#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Decodes and validates `token`, returning the caller identity.
    ///
    /// Tokens without a subject or email are rejected: the email is what
    /// links a new subject to a previously known user.
    pub fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(AppError::Unauthorized("Token has no subject".to_string()));
        }

        let email = claims
            .email
            .filter(|email| !email.trim().is_empty())
            .ok_or_else(|| AppError::Unauthorized("Token has no email claim".to_string()))?;

        Ok(Identity {
            external_id: claims.sub,
            email,
            name: claims.name.filter(|name| !name.trim().is_empty()),
        })
    }
}

/// Extracts the token from a `Bearer` authorization header value.
fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware validating a Bearer JWT in the `Authorization` header.
///
/// On success the [`Identity`] is attached to the request extensions; on
/// failure a `401` is returned.
pub async fn jwt_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    let identity = state.auth.verify(token)?;

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
