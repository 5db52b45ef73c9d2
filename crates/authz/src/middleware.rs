//! Bearer authentication for protected routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use shelf_http::AppError;

use crate::{identity::IdentityLookup, token::TokenService};

const NOT_AUTHENTICATED: &str = "Not authenticated";
const INVALID_CREDENTIALS: &str = "Could not validate credentials";

/// Shared state for [`require_bearer`]
#[derive(Clone)]
pub struct AuthState {
    tokens: Arc<TokenService>,
    identities: Arc<dyn IdentityLookup>,
}

impl AuthState {
    pub fn new(tokens: Arc<TokenService>, identities: Arc<dyn IdentityLookup>) -> Self {
        Self { tokens, identities }
    }
}

/// Token from `Authorization: Bearer <token>`; the scheme is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Reject the request unless it carries a valid token whose subject is a live
/// account; on success the resolved [`crate::Identity`] is stored in the
/// request extensions.
pub async fn require_bearer(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let subject = {
        let token = bearer_token(req.headers())
            .ok_or_else(|| AppError::unauthorized(NOT_AUTHENTICATED))?;
        auth.tokens
            .validate(token)
            .map_err(|_| AppError::unauthorized(INVALID_CREDENTIALS))?
    };

    let identity = auth
        .identities
        .resolve(&subject)
        .await?
        .ok_or_else(|| {
            tracing::debug!(subject = %subject, "token subject has no account");
            AppError::unauthorized(INVALID_CREDENTIALS)
        })?;

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
