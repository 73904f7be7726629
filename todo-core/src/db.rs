use std::path::PathBuf;

use chrono::Utc;
use sqlx::sqlite::SqlitePool;

use crate::models::{Todo, TodoFields};

const TODO_COLUMNS: &str = "id, title, content, created_at, updated_at, is_completed";

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and brings the schema up to date.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePool::connect(database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Database { pool })
    }

    /// `sqlite:` url of the database file under the user's state directory.
    pub fn default_url() -> anyhow::Result<String> {
        let db_path = data_dir()?;
        std::fs::create_dir_all(&db_path)?;

        let db_file = db_path.join("todo.db");
        Ok(format!("sqlite:{}?mode=rwc", db_file.display()))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn list_todos(&self) -> anyhow::Result<Vec<Todo>> {
        let rows = sqlx::query_as::<_, Todo>(&format!("SELECT {TODO_COLUMNS} FROM todos ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn get_todo(&self, todo_id: i64) -> anyhow::Result<Option<Todo>> {
        let row = sqlx::query_as::<_, Todo>(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?"))
            .bind(todo_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn create_todo(&self, fields: &TodoFields) -> anyhow::Result<Todo> {
        let now = Utc::now();

        let row = sqlx::query_as::<_, Todo>(&format!(
            "INSERT INTO todos (title, content, created_at, updated_at, is_completed)
             VALUES (?, ?, ?, ?, FALSE)
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(&fields.title)
        .bind(&fields.content)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Persists title and content of `todo` and refreshes `updated_at`.
    ///
    /// Returns `None` if the row no longer exists.
    pub async fn update_todo(&self, todo: &Todo) -> anyhow::Result<Option<Todo>> {
        // never move updated_at backwards, even if the wall clock does
        let updated_at = Utc::now().max(todo.updated_at);

        let row = sqlx::query_as::<_, Todo>(&format!(
            "UPDATE todos SET title = ?, content = ?, updated_at = ?
             WHERE id = ?
             RETURNING {TODO_COLUMNS}"
        ))
        .bind(&todo.title)
        .bind(&todo.content)
        .bind(updated_at)
        .bind(todo.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Returns whether a row was removed.
    pub async fn delete_todo(&self, todo_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(todo_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn data_dir() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::state_dir()
        .or_else(dirs::config_dir)
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;

    Ok(config_dir.join("todo").join("data"))
}
