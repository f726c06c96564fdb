//! notes-db: SQLite option store + migration engine for plugin notes.

pub mod option_repository;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notes_core::error::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

pub use option_repository::OptionRepository;

include!(concat!(env!("OUT_DIR"), "/migrations.rs"));

/// Crate identity label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "notes-db"
}

#[derive(Debug, Clone)]
pub struct Config {
    pub path: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Config {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: 5000,
        }
    }

    pub fn with_busy_timeout_ms(mut self, busy_timeout_ms: u64) -> Self {
        self.busy_timeout_ms = busy_timeout_ms;
        self
    }
}

#[derive(Debug)]
pub struct Db {
    conn: Connection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i32,
    pub description: String,
    pub applied: bool,
    pub applied_at: String,
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("open database: {0}")]
    Open(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("migration {version} missing {direction} sql")]
    MissingSQL {
        version: i32,
        direction: &'static str,
    },
    #[error("{0}")]
    Validation(String),
    #[error("option already exists: {0}")]
    OptionAlreadyExists(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::OptionAlreadyExists(key) => StoreError::AlreadyExists { key },
            other => StoreError::backend(other.to_string()),
        }
    }
}

impl Db {
    pub fn open(cfg: Config) -> Result<Self, DbError> {
        ensure_parent_dir(&cfg.path)?;
        let conn = Connection::open(&cfg.path)?;
        conn.busy_timeout(Duration::from_millis(cfg.busy_timeout_ms))?;
        // Best-effort: older SQLite builds may reject these.
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        tracing::debug!(path = %cfg.path.display(), "opened notes database");
        Ok(Self { conn })
    }

    /// Private in-memory database, used by tests and `--memory` runs.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    pub fn migrate_up(&mut self) -> Result<usize, DbError> {
        self.ensure_schema_version_table()?;
        let current = self.current_version()?;

        let mut applied = 0usize;
        for m in MIGRATIONS {
            if m.version <= current {
                continue;
            }
            self.apply_up(m)?;
            applied += 1;
        }
        if applied > 0 {
            tracing::debug!(applied, "applied notes migrations");
        }
        Ok(applied)
    }

    pub fn migrate_down(&mut self, steps: i32) -> Result<usize, DbError> {
        self.ensure_schema_version_table()?;
        let current = self.current_version()?;
        if current == 0 || steps <= 0 {
            return Ok(0);
        }

        let to_rollback: Vec<EmbeddedMigration> = MIGRATIONS
            .iter()
            .rev()
            .filter(|m| m.version <= current)
            .take(steps as usize)
            .copied()
            .collect();

        for m in &to_rollback {
            self.apply_down(m)?;
        }
        Ok(to_rollback.len())
    }

    pub fn migrate_to(&mut self, target_version: i32) -> Result<(), DbError> {
        self.ensure_schema_version_table()?;
        let current = self.current_version()?;
        if target_version == current {
            return Ok(());
        }

        if target_version > current {
            for m in MIGRATIONS {
                if m.version <= current || m.version > target_version {
                    continue;
                }
                self.apply_up(m)?;
            }
        } else {
            for m in MIGRATIONS.iter().rev() {
                if m.version <= target_version || m.version > current {
                    continue;
                }
                self.apply_down(m)?;
            }
        }
        Ok(())
    }

    pub fn migration_status(&self) -> Result<Vec<MigrationStatus>, DbError> {
        self.ensure_schema_version_table()?;

        let mut applied_at: BTreeMap<i32, String> = BTreeMap::new();
        let mut stmt = self
            .conn
            .prepare("SELECT version, applied_at FROM schema_version ORDER BY version")?;
        let rows = stmt.query_map([], |row| {
            let version: i32 = row.get(0)?;
            let stamp: String = row.get(1)?;
            Ok((version, stamp))
        })?;
        for row in rows {
            let (version, stamp) = row?;
            applied_at.insert(version, stamp);
        }

        Ok(MIGRATIONS
            .iter()
            .map(|m| MigrationStatus {
                version: m.version,
                description: m.description.to_string(),
                applied: applied_at.contains_key(&m.version),
                applied_at: applied_at.get(&m.version).cloned().unwrap_or_default(),
            })
            .collect())
    }

    pub fn schema_version(&self) -> Result<i32, DbError> {
        self.ensure_schema_version_table()?;
        self.current_version()
    }

    /// Returns a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn apply_up(&mut self, m: &EmbeddedMigration) -> Result<(), DbError> {
        if m.up_sql.is_empty() {
            return Err(DbError::MissingSQL {
                version: m.version,
                direction: "up",
            });
        }
        let tx = self.conn.transaction()?;
        tx.execute_batch(m.up_sql)?;
        tx.execute(
            "INSERT INTO schema_version (version, description) VALUES (?1, ?2)",
            params![m.version, m.description],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn apply_down(&mut self, m: &EmbeddedMigration) -> Result<(), DbError> {
        if m.down_sql.is_empty() {
            return Err(DbError::MissingSQL {
                version: m.version,
                direction: "down",
            });
        }
        let tx = self.conn.transaction()?;
        tx.execute_batch(m.down_sql)?;
        tx.execute(
            "DELETE FROM schema_version WHERE version = ?1",
            params![m.version],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn ensure_schema_version_table(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (\n\
                version INTEGER PRIMARY KEY,\n\
                applied_at TEXT NOT NULL DEFAULT (datetime('now')),\n\
                description TEXT\n\
             );",
        )?;
        Ok(())
    }

    fn current_version(&self) -> Result<i32, DbError> {
        let version: Option<i32> = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version.unwrap_or(0))
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

pub(crate) fn is_unique_constraint_error(err: &rusqlite::Error) -> bool {
    err.to_string().contains("UNIQUE constraint failed")
}

fn ensure_parent_dir(path: &Path) -> Result<(), std::io::Error> {
    let parent = match path.parent() {
        Some(parent) => parent,
        None => return Ok(()),
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent)
}
