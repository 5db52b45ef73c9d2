//! Shelf application library
//!
//! Wires the `users` and `books` modules onto the shared kernel, store and
//! HTTP facade.

pub mod modules;

#[cfg(test)]
pub(crate) mod test_support;

/// Re-export commonly used types
pub use modules::*;

use std::sync::Arc;

use anyhow::Context;
use shelf_db::{Database, DatabaseModule};
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build the registry with the database core module and every app module.
pub fn build_registry(settings: &Settings, database: &Database) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    registry.register_core(Arc::new(DatabaseModule::new(database.clone())));
    modules::register_all(&mut registry, settings, database)?;
    Ok(registry)
}

/// Initialize modules, apply pending migrations, then start modules.
pub async fn bootstrap(settings: &Settings, database: &Database) -> anyhow::Result<ModuleRegistry> {
    let registry = build_registry(settings, database)?;
    let ctx = InitCtx { settings };

    registry.init_core_modules(&ctx).await?;
    registry.init_custom_modules(&ctx).await?;

    let applied = database
        .apply_migrations(registry.collect_migrations())
        .await
        .context("failed to apply migrations")?;
    tracing::info!(applied, "migrations up to date");

    registry.start_core_modules(&ctx).await?;
    registry.start_custom_modules(&ctx).await?;

    Ok(registry)
}

/// Run the API server until shutdown, then stop modules in reverse order.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let database = Database::new(&settings.database);
    let registry = bootstrap(&settings, &database).await?;
    tracing::info!("application started");

    let served = shelf_http::start_server(&registry, &settings).await;

    registry.stop_custom_modules().await?;
    registry.stop_core_modules().await?;
    tracing::info!("application shut down");

    served
}
