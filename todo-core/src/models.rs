use std::fmt;

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Maximum length of a todo title, counted in characters.
pub const TITLE_MAX_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_completed: bool,
}

/// The client-writable part of a todo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoFields {
    pub title: String,
    pub content: String,
}

impl Todo {
    /// Replaces title and content. Timestamps are left to the store.
    pub fn apply(&mut self, fields: TodoFields) {
        self.title = fields.title;
        self.content = fields.content;
    }
}

impl fmt::Display for Todo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}
