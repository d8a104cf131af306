//! SQLite-backed persistence for todo items.
//!
//! # Design
//! `TodoStore` wraps a `SqlitePool` and is cloned into every request. Each
//! method is one statement, except `create`, which runs its insert and its
//! url fixup inside a single transaction so no reader ever sees a row with
//! an empty `url`.

use std::str::FromStr;
use std::time::Duration;

use log::debug;
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

use crate::model::{NewTodo, Todo, TodoChanges};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS todo_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    completed BOOLEAN NOT NULL DEFAULT 0,
    "order" INTEGER,
    url TEXT NOT NULL DEFAULT ''
)
"#;

/// Failures surfaced by the store, already classified for the HTTP layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("database unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let constraint = match &err {
            sqlx::Error::Database(db) if is_constraint(db.kind()) => Some(db.message().to_string()),
            _ => None,
        };
        if let Some(message) = constraint {
            return StoreError::Constraint(message);
        }
        let contended = match &err {
            sqlx::Error::Database(db) => db.code().is_some_and(|code| is_busy_code(&code)),
            _ => false,
        };
        match err {
            _ if contended => StoreError::Unavailable(err),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err)
            }
            other => StoreError::Database(other),
        }
    }
}

/// `SQLITE_BUSY` (5) or `SQLITE_LOCKED` (6), including their extended codes.
fn is_busy_code(code: &str) -> bool {
    code.parse::<i32>()
        .is_ok_and(|code| matches!(code & 0xff, 5 | 6))
}

fn is_constraint(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation
    )
}

#[derive(Debug, Clone)]
pub struct TodoStore {
    pool: SqlitePool,
}

impl TodoStore {
    /// Open (creating if needed) the database at `url` and apply the schema.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// A private in-memory database. The pool is pinned to one connection
    /// that never expires, since every SQLite memory connection is its own
    /// database.
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Todo>, StoreError> {
        let todos = sqlx::query_as::<_, Todo>(
            r#"SELECT id, title, completed, "order", url FROM todo_items ORDER BY id"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(todos)
    }

    /// Insert `new`, then set its `url` to `url_for(id)` once the id is known.
    pub async fn create<F>(&self, new: &NewTodo, url_for: F) -> Result<Todo, StoreError>
    where
        F: FnOnce(i64) -> String,
    {
        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO todo_items (title, completed, "order") VALUES (?, ?, ?) RETURNING id"#,
        )
        .bind(new.title.as_str())
        .bind(new.completed)
        .bind(new.order)
        .fetch_one(&mut *tx)
        .await?;

        let todo = sqlx::query_as::<_, Todo>(
            r#"UPDATE todo_items SET url = ? WHERE id = ? RETURNING id, title, completed, "order", url"#,
        )
        .bind(url_for(id))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!("created todo {} at {}", todo.id, todo.url);
        Ok(todo)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"SELECT id, title, completed, "order", url FROM todo_items WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(todo)
    }

    /// Apply `changes`; fields left `None` keep their stored value.
    /// `order` is written whenever it was given, so `Some(None)` clears it.
    pub async fn update(&self, id: i64, changes: &TodoChanges) -> Result<Option<Todo>, StoreError> {
        let todo = sqlx::query_as::<_, Todo>(
            r#"UPDATE todo_items
               SET title = COALESCE(?, title),
                   completed = COALESCE(?, completed),
                   "order" = CASE WHEN ? THEN ? ELSE "order" END
               WHERE id = ?
               RETURNING id, title, completed, "order", url"#,
        )
        .bind(changes.title.as_deref())
        .bind(changes.completed)
        .bind(changes.order.is_some())
        .bind(changes.order.flatten())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        if todo.is_some() {
            debug!("updated todo {id}");
        }
        Ok(todo)
    }

    /// Returns `false` when no row had that id.
    pub async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM todo_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM todo_items").execute(&self.pool).await?;
        debug!("deleted {} todos", result.rows_affected());
        Ok(result.rows_affected())
    }
}
