use shelf_db::Database;
use shelf_kernel::settings::DatabaseSettings;
use tempfile::TempDir;

use crate::modules::{books, users};

/// Fresh on-disk store with every module's schema applied. Keep the
/// `TempDir` alive for as long as the database is used.
pub(crate) async fn migrated_database() -> (Database, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let database = Database::new(&DatabaseSettings {
        path: dir.path().join("library.db"),
        busy_timeout_ms: 1000,
    });

    let migrations = users::migrations()
        .into_iter()
        .map(|m| ("users".to_string(), m))
        .chain(books::migrations().into_iter().map(|m| ("books".to_string(), m)))
        .collect();
    database
        .apply_migrations(migrations)
        .await
        .expect("migrations apply");

    (database, dir)
}
