use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_authz::PasswordHasher;
use shelf_db::Database;
use shelf_kernel::settings::Settings;

/// Book catalog API
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Apply pending schema migrations and exit
    Migrate,
    /// Print the effective configuration with secrets redacted
    Config,
    /// Print a bcrypt hash of the given password using the configured cost
    HashPassword {
        #[arg(env = "SHELF_PLAINTEXT_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => shelf_app::run(settings).await,
        Command::Migrate => {
            let database = Database::new(&settings.database);
            let registry = shelf_app::build_registry(&settings, &database)?;
            let applied = database
                .apply_migrations(registry.collect_migrations())
                .await
                .context("failed to apply migrations")?;
            tracing::info!(applied, path = %database.path().display(), "migrations complete");
            Ok(())
        }
        Command::Config => {
            println!("{:#?}", settings);
            Ok(())
        }
        Command::HashPassword { password } => {
            let hash = PasswordHasher::new(settings.auth.bcrypt_cost)
                .hash(&password)
                .context("failed to hash password")?;
            println!("{}", hash);
            Ok(())
        }
    }
}
