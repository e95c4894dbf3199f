use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::actor::{Actor, ActorRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric user id.
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, PartialEq)]
enum AuthFailure {
    Unauthorized(&'static str),
    Forbidden(&'static str),
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            AuthFailure::Unauthorized(code) => (StatusCode::UNAUTHORIZED, code),
            AuthFailure::Forbidden(code) => (StatusCode::FORBIDDEN, code),
        };
        (status, Json(json!({ "error": code }))).into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthFailure> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthFailure::Unauthorized("missing_authorization"))?;
    let value = header
        .to_str()
        .map_err(|_| AuthFailure::Unauthorized("bad_authorization"))?;
    value
        .strip_prefix("Bearer ")
        .ok_or(AuthFailure::Unauthorized("unsupported_scheme"))
}

fn actor_from_claims(claims: Claims) -> Result<Actor, AuthFailure> {
    let id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AuthFailure::Unauthorized("invalid_subject"))?;
    let role: ActorRole = claims
        .role
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| AuthFailure::Forbidden("forbidden"))?;
    Ok(Actor {
        id,
        email: claims.email.unwrap_or_default(),
        name: claims.name,
        role,
    })
}

fn authenticate(headers: &HeaderMap, secret: &str) -> Result<Actor, AuthFailure> {
    let token = bearer_token(headers)?;
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| AuthFailure::Unauthorized("invalid_token"))?;
    actor_from_claims(data.claims)
}

/// Admits HR reviewers and managers. The decoded [`Actor`] is attached to the
/// request; per-operation role rules are enforced by the services.
pub async fn require_reviewer(mut req: Request, next: Next) -> Response {
    let config = crate::config::get_config();
    match authenticate(req.headers(), &config.jwt_secret) {
        Ok(actor) => {
            req.extensions_mut().insert(actor);
            next.run(req).await
        }
        Err(failure) => {
            tracing::debug!(?failure, "Rejected reviewer request");
            failure.into_response()
        }
    }
}
