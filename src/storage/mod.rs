pub mod repository;
pub mod seed;

use rusqlite_migration::{Migrations, M};

use crate::error::{Error, Result};

/// Handle to the store: one connection for writes and one for reads.
///
/// File-backed stores run in WAL mode so reports can read while an import or
/// CRUD write is in flight. Writes queue on the writer's background thread.
#[derive(Clone)]
pub struct Database {
    writer: tokio_rusqlite::Connection,
    reader: tokio_rusqlite::Connection,
}

impl Database {
    /// `~/.opsdash/opsdash.db`, creating the directory on first use.
    pub fn default_path() -> Result<std::path::PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("no home directory for the default store".into()))?;
        Ok(home.join(".opsdash").join("opsdash.db"))
    }

    pub async fn open() -> Result<Self> {
        let path = Self::default_path()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| Error::Config(e.to_string()))?;
        }
        Self::open_at(path).await
    }

    /// Open (or create) a store file, bring its schema up to date and seed
    /// the default SLAs.
    pub async fn open_at(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("opening store {}", path.display());

        let writer = tokio_rusqlite::Connection::open(path).await?;
        Self::init_writer(&writer).await?;
        let reader = tokio_rusqlite::Connection::open(path).await?;
        Self::init_reader(&reader).await?;

        Self::seeded(Self { writer, reader }).await
    }

    /// Private in-memory store. Both handles point at the same connection.
    pub async fn open_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        Self::init_writer(&conn).await?;
        Self::seeded(Self {
            reader: conn.clone(),
            writer: conn,
        })
        .await
    }

    async fn seeded(db: Self) -> Result<Self> {
        db.ensure_seed().await?;
        Ok(db)
    }

    async fn init_writer(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA foreign_keys=ON;\
                 PRAGMA busy_timeout=5000;",
            )
            .map_err(|e| e.to_string())?;
            let migrations = Migrations::new(vec![M::up(include_str!(
                "migrations/001_initial.sql"
            ))]);
            migrations.to_latest(conn).map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .map_err(|e| Error::Migration(e.to_string()))
    }

    async fn init_reader(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;\
                 PRAGMA foreign_keys=ON;\
                 PRAGMA busy_timeout=5000;",
            )?;
            Ok::<(), rusqlite::Error>(())
        })
        .await?;
        Ok(())
    }

    /// Connection for inserts, updates, deletes and imports.
    pub fn writer(&self) -> &tokio_rusqlite::Connection {
        &self.writer
    }

    /// Connection for listings and reports.
    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        &self.reader
    }

    async fn ensure_seed(&self) -> Result<()> {
        let inserted = self
            .writer
            .call(|conn| seed::ensure_default_slas(conn))
            .await?;
        if inserted > 0 {
            log::info!("seeded {inserted} default SLA rows");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory() {
        let db = Database::open_memory().await.unwrap();

        let tables: Vec<String> = db
            .reader()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok::<Vec<String>, rusqlite::Error>(rows.filter_map(|r| r.ok()).collect())
            })
            .await
            .unwrap();

        for table in [
            "agents",
            "campuses",
            "sla",
            "migrations",
            "training_tickets",
            "customer_service_tickets",
            "implementation_prints",
            "app_config",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn test_default_slas_seeded_once() {
        let db = Database::open_memory().await.unwrap();
        db.ensure_seed().await.unwrap();

        let count: i64 = db
            .reader()
            .call(|conn| {
                Ok::<i64, rusqlite::Error>(
                    conn.query_row("SELECT COUNT(*) FROM sla", [], |row| row.get(0))?,
                )
            })
            .await
            .unwrap();

        assert_eq!(count, seed::DEFAULT_SLAS.len() as i64);
    }

    #[tokio::test]
    async fn test_default_slas_have_categories() {
        let db = Database::open_memory().await.unwrap();
        let deployment: String = db
            .reader()
            .call(|conn| {
                conn.query_row(
                    "SELECT category FROM sla WHERE type = 'Deployment'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(deployment, "Migrasi");
    }

    #[test]
    fn test_default_path_is_under_home() {
        let path = Database::default_path().unwrap();
        assert!(path.ends_with(".opsdash/opsdash.db"));
    }

    #[tokio::test]
    async fn test_open_at_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ops.db");
        {
            let db = Database::open_at(&path).await.unwrap();
            db.writer()
                .call(|conn| repository::set_config(conn, "operator_keyword", "Admin"))
                .await
                .unwrap();
        }
        let db = Database::open_at(&path).await.unwrap();
        let value = db
            .reader()
            .call(|conn| repository::get_config(conn, "operator_keyword"))
            .await
            .unwrap();
        assert_eq!(value.as_deref(), Some("Admin"));
    }
}
