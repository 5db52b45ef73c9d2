pub mod books;
pub mod users;

use std::sync::Arc;

use anyhow::Context;

use shelf_authz::{AuthState, PasswordHasher, TokenService};
use shelf_db::Database;
use shelf_kernel::{settings::Settings, ModuleRegistry};

use books::repository::SqliteBookRepository;
use users::{repository::SqliteUserRepository, service::AccountService};

/// Register all project-specific modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    settings: &Settings,
    database: &Database,
) -> anyhow::Result<()> {
    let user_repo = Arc::new(SqliteUserRepository::new(database.clone()));
    let tokens = Arc::new(TokenService::new(
        &settings.auth.jwt_secret,
        chrono::Duration::minutes(settings.auth.access_token_ttl_minutes),
    ));
    let hasher = PasswordHasher::new(settings.auth.bcrypt_cost);

    let accounts = Arc::new(
        AccountService::new(user_repo.clone(), hasher, tokens.clone())
            .context("failed to prepare account service")?,
    );
    let auth = AuthState::new(tokens, user_repo);

    registry.register_custom(users::create_module(accounts));
    registry.register_custom(books::create_module(
        Arc::new(SqliteBookRepository::new(database.clone())),
        auth,
    ));
    Ok(())
}
