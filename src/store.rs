//! Users, categories and notes on SQLite.
//!
//! Every operation is a single parameterized statement; rows are always
//! scoped by the owner's Telegram id.

use std::str::FromStr;

use anyhow::{Context, Result};
use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Telegram user id, as stored in `owner_key` columns.
pub(crate) type OwnerId = i64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct UserRecord {
    pub(crate) owner: OwnerId,
    pub(crate) handle: Option<String>,
    pub(crate) display_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Category {
    pub(crate) id: i64,
    pub(crate) name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NoteRow {
    pub(crate) id: i64,
    pub(crate) text: String,
    pub(crate) category: Option<String>,
}

#[derive(Clone)]
pub(crate) struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connects to `url` (creating the database file if needed) and makes
    /// sure the schema exists.
    pub(crate) async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let opts = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url {url}"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await
            .context("connect to database")?;

        Self::init_schema(&pool).await?;
        info!("note store ready");

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_key INTEGER NOT NULL UNIQUE,
                handle TEXT,
                display_name TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_key INTEGER NOT NULL,
                name TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_categories_owner ON categories(owner_key);
            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_key INTEGER NOT NULL,
                text TEXT NOT NULL,
                category_id INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_notes_owner ON notes(owner_key);",
        )
        .execute(pool)
        .await
        .context("create schema")?;
        Ok(())
    }

    /// Records a user the first time they show up. Returns `true` if a row was inserted.
    pub(crate) async fn upsert_user(
        &self,
        owner: OwnerId,
        handle: Option<&str>,
        display_name: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO users (owner_key, handle, display_name) VALUES (?, ?, ?) \
             ON CONFLICT(owner_key) DO NOTHING",
        )
        .bind(owner)
        .bind(handle)
        .bind(display_name)
        .execute(&self.pool)
        .await
        .context("upsert user")?;

        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let rows: Vec<(i64, Option<String>, String)> =
            sqlx::query_as("SELECT owner_key, handle, display_name FROM users ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .context("list users")?;

        Ok(rows
            .into_iter()
            .map(|(owner, handle, display_name)| UserRecord {
                owner,
                handle,
                display_name,
            })
            .collect())
    }

    pub(crate) async fn create_category(&self, owner: OwnerId, name: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO categories (owner_key, name) VALUES (?, ?)")
            .bind(owner)
            .bind(name)
            .execute(&self.pool)
            .await
            .context("create category")?;

        Ok(result.last_insert_rowid())
    }

    /// Categories of `owner` in creation order.
    pub(crate) async fn list_categories(&self, owner: OwnerId) -> Result<Vec<Category>> {
        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM categories WHERE owner_key = ? ORDER BY id")
                .bind(owner)
                .fetch_all(&self.pool)
                .await
                .context("list categories")?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| Category { id, name })
            .collect())
    }

    /// Looks a category up only among the owner's own categories.
    pub(crate) async fn find_category(&self, owner: OwnerId, id: i64) -> Result<Option<Category>> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM categories WHERE owner_key = ? AND id = ?")
                .bind(owner)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .context("find category")?;

        Ok(row.map(|(id, name)| Category { id, name }))
    }

    pub(crate) async fn create_note(
        &self,
        owner: OwnerId,
        text: &str,
        category: Option<i64>,
    ) -> Result<i64> {
        let result =
            sqlx::query("INSERT INTO notes (owner_key, text, category_id) VALUES (?, ?, ?)")
                .bind(owner)
                .bind(text)
                .bind(category)
                .execute(&self.pool)
                .await
                .context("create note")?;

        Ok(result.last_insert_rowid())
    }

    /// Notes of `owner` in creation order, with the category name resolved.
    pub(crate) async fn list_notes(&self, owner: OwnerId) -> Result<Vec<NoteRow>> {
        let rows: Vec<(i64, String, Option<String>)> = sqlx::query_as(
            "SELECT notes.id, notes.text, categories.name \
             FROM notes \
             LEFT JOIN categories ON notes.category_id = categories.id \
             WHERE notes.owner_key = ? \
             ORDER BY notes.id",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .context("list notes")?;

        Ok(rows
            .into_iter()
            .map(|(id, text, category)| NoteRow { id, text, category })
            .collect())
    }

    /// Deletes the given notes of `owner`. Ids belonging to someone else are
    /// left alone; the returned count is what was actually removed.
    pub(crate) async fn delete_notes(&self, owner: OwnerId, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM notes WHERE owner_key = ");
        query.push_bind(owner);
        query.push(" AND id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = query
            .build()
            .execute(&self.pool)
            .await
            .context("delete notes")?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
pub(crate) async fn test_store() -> Store {
    // In-memory databases are per connection, so the pool must stay at one.
    Store::connect("sqlite::memory:", 1).await.unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let store = test_store().await;
        Store::init_schema(&store.pool).await.unwrap();
        Store::init_schema(&store.pool).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_user_inserts_once() {
        let store = test_store().await;
        assert!(store.upsert_user(7, Some("ann"), "Ann").await.unwrap());
        assert!(!store.upsert_user(7, Some("other"), "Other").await.unwrap());
        store.upsert_user(8, None, "Bob").await.unwrap();

        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].handle.as_deref(), Some("ann"));
        assert_eq!(users[0].display_name, "Ann");
        assert_eq!(users[1].owner, 8);
        assert!(users[1].handle.is_none());
    }

    #[tokio::test]
    async fn categories_are_scoped_and_ordered() {
        let store = test_store().await;
        let work = store.create_category(1, "Work").await.unwrap();
        store.create_category(2, "Theirs").await.unwrap();
        let home = store.create_category(1, "Home").await.unwrap();

        let names: Vec<_> = store
            .list_categories(1)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Work", "Home"]);
        assert!(store.find_category(1, home).await.unwrap().is_some());
        assert!(store.find_category(2, work).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn notes_join_category_names() {
        let store = test_store().await;
        let work = store.create_category(1, "Work").await.unwrap();
        store.create_note(1, "plain", None).await.unwrap();
        store.create_note(1, "filed", Some(work)).await.unwrap();
        store.create_note(2, "not mine", None).await.unwrap();

        let notes = store.list_notes(1).await.unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].text, "plain");
        assert_eq!(notes[0].category, None);
        assert_eq!(notes[1].category.as_deref(), Some("Work"));
    }

    #[tokio::test]
    async fn delete_counts_only_owned_rows() {
        let store = test_store().await;
        let a = store.create_note(1, "a", None).await.unwrap();
        let b = store.create_note(1, "b", None).await.unwrap();
        let theirs = store.create_note(2, "c", None).await.unwrap();

        assert_eq!(store.delete_notes(1, &[theirs]).await.unwrap(), 0);
        assert_eq!(store.delete_notes(1, &[a, b, theirs, 999]).await.unwrap(), 2);
        assert_eq!(store.delete_notes(1, &[]).await.unwrap(), 0);
        assert_eq!(store.list_notes(2).await.unwrap().len(), 1);
    }
}
