//! SQLite access for shelf.
//!
//! There is no shared connection object: [`Database`] only knows where the
//! store lives, and every call to [`Database::run`] opens a connection on the
//! blocking pool, hands it to the closure, and drops it when the closure
//! returns.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use shelf_kernel::settings::DatabaseSettings;
use shelf_kernel::{InitCtx, Migration, Module};
use thiserror::Error;

/// Storage failures surfaced to repositories
#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl DbError {
    /// True when the statement violated a UNIQUE constraint.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation
                    && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

/// Handle to the embedded store. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    path: Arc<PathBuf>,
    busy_timeout: Duration,
}

impl Database {
    pub fn new(settings: &DatabaseSettings) -> Self {
        Self {
            path: Arc::new(settings.path.clone()),
            busy_timeout: Duration::from_millis(settings.busy_timeout_ms),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh connection with the session pragmas applied.
    pub fn connect(&self) -> Result<Connection, DbError> {
        let conn = Connection::open(self.path.as_path())?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    /// Run `f` against a scoped connection on the blocking thread pool.
    pub async fn run<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.connect()?;
            f(&mut conn)
        })
        .await
        .map_err(|err| E::from(DbError::Join(err)))?
    }

    /// Round-trip a trivial query to prove the store is reachable.
    pub async fn ping(&self) -> Result<(), DbError> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    /// Apply every migration not yet recorded in `_migrations`, each in its
    /// own transaction. Returns how many were applied.
    pub async fn apply_migrations(
        &self,
        migrations: Vec<(String, Migration)>,
    ) -> Result<usize, DbError> {
        self.run(move |conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS _migrations (
                    module     TEXT NOT NULL,
                    id         TEXT NOT NULL,
                    applied_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (module, id)
                )",
            )?;

            let mut applied = 0;
            for (module, migration) in &migrations {
                let seen = conn
                    .query_row(
                        "SELECT 1 FROM _migrations WHERE module = ?1 AND id = ?2",
                        params![module, migration.id],
                        |_| Ok(()),
                    )
                    .optional()?;
                if seen.is_some() {
                    continue;
                }

                let tx = conn.transaction()?;
                tx.execute_batch(migration.up)?;
                tx.execute(
                    "INSERT INTO _migrations (module, id) VALUES (?1, ?2)",
                    params![module, migration.id],
                )?;
                tx.commit()?;

                tracing::info!(module = %module, migration = migration.id, "applied migration");
                applied += 1;
            }

            Ok(applied)
        })
        .await
    }
}

/// Core module that owns the store's startup check and shutdown log
pub struct DatabaseModule {
    database: Database,
}

impl DatabaseModule {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl Module for DatabaseModule {
    fn name(&self) -> &'static str {
        "db"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.database.ping().await?;
        tracing::info!(path = %self.database.path().display(), "database connected");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(path = %self.database.path().display(), "database released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_database() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let settings = DatabaseSettings {
            path: dir.path().join("test.db"),
            busy_timeout_ms: 1000,
        };
        (Database::new(&settings), dir)
    }

    fn migration(id: &'static str, up: &'static str) -> (String, Migration) {
        ("test".to_string(), Migration { id, up })
    }

    #[tokio::test]
    async fn ping_succeeds_on_fresh_file() {
        let (db, _dir) = temp_database();
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn migrations_apply_once() {
        let (db, _dir) = temp_database();
        let migrations = vec![
            migration("001_init", "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT UNIQUE);"),
            migration("002_seed", "INSERT INTO items (name) VALUES ('first');"),
        ];

        assert_eq!(db.apply_migrations(migrations.clone()).await.unwrap(), 2);
        assert_eq!(db.apply_migrations(migrations).await.unwrap(), 0);

        let count: i64 = db
            .run(|conn| {
                conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn failed_migration_is_not_recorded() {
        let (db, _dir) = temp_database();
        let broken = vec![migration("001_broken", "CREATE TABLE oops (;")];

        assert!(db.apply_migrations(broken).await.is_err());

        let recorded: i64 = db
            .run(|conn| {
                conn.query_row("SELECT COUNT(*) FROM _migrations", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .await
            .unwrap();
        assert_eq!(recorded, 0);
    }

    #[tokio::test]
    async fn unique_violation_is_detected() {
        let (db, _dir) = temp_database();
        db.apply_migrations(vec![migration(
            "001_init",
            "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT UNIQUE);",
        )])
        .await
        .unwrap();

        let result: Result<(), DbError> = db
            .run(|conn| {
                conn.execute("INSERT INTO items (name) VALUES ('dup')", [])?;
                conn.execute("INSERT INTO items (name) VALUES ('dup')", [])?;
                Ok(())
            })
            .await;

        assert!(result.unwrap_err().is_unique_violation());
    }

    #[tokio::test]
    async fn database_module_init_pings_store() {
        let (db, _dir) = temp_database();
        let module = DatabaseModule::new(db);
        let settings = shelf_kernel::settings::Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };

        module.init(&ctx).await.unwrap();
        module.stop().await.unwrap();
    }
}
