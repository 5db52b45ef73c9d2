use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use shelf_http::{AppError, ValidForm, ValidJson};

use super::models::{RegisterRequest, TokenRequest, TokenResponse, UserResponse};
use super::service::AccountService;

pub fn router(accounts: Arc<AccountService>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/token", post(issue_token))
        .with_state(accounts)
}

async fn register(
    State(accounts): State<Arc<AccountService>>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    tracing::info!(email = %body.email, "registering user");
    let user = accounts.register(&body.email, &body.password).await?;
    Ok(Json(user.into()))
}

async fn issue_token(
    State(accounts): State<Arc<AccountService>>,
    ValidForm(form): ValidForm<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    tracing::info!(username = %form.username, "login attempt");
    let token = accounts.login(&form.username, &form.password).await?;
    Ok(Json(TokenResponse::bearer(token)))
}
