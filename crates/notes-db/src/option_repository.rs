//! Option repository backed by the `options` table.

use notes_core::error::StoreError;
use notes_core::option_store::OptionStore;
use rusqlite::{params, OptionalExtension};

use crate::{is_unique_constraint_error, now_rfc3339, Db, DbError};

/// A stored option row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionRow {
    pub name: String,
    pub value: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct OptionRepository<'a> {
    db: &'a Db,
}

impl<'a> OptionRepository<'a> {
    pub fn new(db: &'a Db) -> Self {
        Self { db }
    }

    /// Value stored under `name`, or `None` when absent. An empty string is a
    /// stored value.
    pub fn get(&self, name: &str) -> Result<Option<String>, DbError> {
        let value = self
            .db
            .conn()
            .query_row(
                "SELECT option_value FROM options WHERE option_name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn get_row(&self, name: &str) -> Result<Option<OptionRow>, DbError> {
        let row = self
            .db
            .conn()
            .query_row(
                "SELECT option_name, option_value, created_at, updated_at \
                 FROM options WHERE option_name = ?1",
                params![name],
                |row| {
                    Ok(OptionRow {
                        name: row.get(0)?,
                        value: row.get(1)?,
                        created_at: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Insert a new option. Fails with `OptionAlreadyExists` when `name` is taken.
    pub fn add(&self, name: &str, value: &str) -> Result<(), DbError> {
        validate_name(name)?;
        let now = now_rfc3339();
        let result = self.db.conn().execute(
            "INSERT INTO options (option_name, option_value, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![name, value, now, now],
        );
        match result {
            Ok(_) => Ok(()),
            Err(ref err) if is_unique_constraint_error(err) => {
                Err(DbError::OptionAlreadyExists(name.to_string()))
            }
            Err(err) => Err(DbError::Open(err)),
        }
    }

    /// Insert or replace an option, keeping `created_at` of an existing row.
    ///
    /// Uses UPDATE then INSERT rather than upsert syntax.
    pub fn update(&self, name: &str, value: &str) -> Result<(), DbError> {
        validate_name(name)?;
        let now = now_rfc3339();

        let rows_changed = self.db.conn().execute(
            "UPDATE options SET option_value = ?1, updated_at = ?2 WHERE option_name = ?3",
            params![value, now, name],
        )?;
        if rows_changed > 0 {
            return Ok(());
        }

        let insert_result = self.db.conn().execute(
            "INSERT INTO options (option_name, option_value, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![name, value, now, now],
        );
        match insert_result {
            Ok(_) => Ok(()),
            Err(ref err) if is_unique_constraint_error(err) => {
                // Inserted by another writer after our UPDATE.
                self.db.conn().execute(
                    "UPDATE options SET option_value = ?1, updated_at = ?2 \
                     WHERE option_name = ?3",
                    params![value, now, name],
                )?;
                Ok(())
            }
            Err(err) => Err(DbError::Open(err)),
        }
    }

    /// Remove an option. Returns whether a row was deleted.
    pub fn delete(&self, name: &str) -> Result<bool, DbError> {
        let rows = self.db.conn().execute(
            "DELETE FROM options WHERE option_name = ?1",
            params![name],
        )?;
        Ok(rows > 0)
    }

    /// Option names starting with `prefix`, sorted.
    pub fn list_names(&self, prefix: &str) -> Result<Vec<String>, DbError> {
        let mut stmt = self.db.conn().prepare(
            "SELECT option_name FROM options \
             WHERE substr(option_name, 1, length(?1)) = ?1 \
             ORDER BY option_name",
        )?;
        let rows = stmt.query_map(params![prefix], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn count(&self) -> Result<i64, DbError> {
        let count = self
            .db
            .conn()
            .query_row("SELECT COUNT(*) FROM options", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl OptionStore for OptionRepository<'_> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(OptionRepository::get(self, key)?)
    }

    fn add(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(OptionRepository::add(self, key, value)?)
    }

    fn update(&self, key: &str, value: &str) -> Result<(), StoreError> {
        Ok(OptionRepository::update(self, key, value)?)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        OptionRepository::delete(self, key)?;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), DbError> {
    if name.trim().is_empty() {
        return Err(DbError::Validation("option name is required".into()));
    }
    Ok(())
}
