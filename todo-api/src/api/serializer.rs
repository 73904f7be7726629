use chrono::{DateTime, SecondsFormat, Utc};
use hyper::{Response, StatusCode};
use serde::Serialize;
use todo_core::Todo;

use super::error::Result;
use super::{Body, make_response};

#[derive(Debug, Serialize)]
pub struct TodoRepresentation<'a> {
    pub id: i64,
    pub title: &'a str,
    pub content: &'a str,
    pub created_at: String,
    pub updated_at: String,
    pub is_completed: bool,
}

impl<'a> From<&'a Todo> for TodoRepresentation<'a> {
    fn from(todo: &'a Todo) -> Self {
        Self {
            id: todo.id,
            title: &todo.title,
            content: &todo.content,
            created_at: format_timestamp(&todo.created_at),
            updated_at: format_timestamp(&todo.updated_at),
            is_completed: todo.is_completed,
        }
    }
}

/// The list envelope.
#[derive(Debug, Serialize)]
pub struct TodoList<'a> {
    pub data: Vec<TodoRepresentation<'a>>,
    pub todo_count: usize,
}

impl<'a> From<&'a [Todo]> for TodoList<'a> {
    fn from(todos: &'a [Todo]) -> Self {
        let data = todos.iter().map(TodoRepresentation::from).collect::<Vec<_>>();
        Self {
            todo_count: data.len(),
            data,
        }
    }
}

/// ISO-8601 in UTC with microseconds, e.g. `2024-05-01T09:30:00.123456Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>> {
    let body = serde_json::to_string(value).map_err(anyhow::Error::from)?;
    Ok(make_response!(status, body))
}
