use bytes::Bytes;
use hyper::{Request, Response, StatusCode};
use todo_core::Todo;

use super::Body;
use super::error::{ApiError, Result};
use super::router::{RequestExt, Router, RouterBuilder};
use super::serializer::{TodoList, TodoRepresentation, json_response};
use super::validation::parse_todo_fields;
use crate::global::Global;

pub fn routes() -> RouterBuilder {
    Router::builder()
        .get("/", list)
        .post("/", create)
        .get("/:id/", retrieve)
        .patch("/:id/", update)
        .delete("/:id/", destroy)
}

/// Path ids must be one or more ASCII digits.
pub fn parse_id(raw: &str) -> Result<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::NotNumericId);
    }

    // numeric but past i64::MAX, so no row can carry it
    raw.parse().map_err(|_| ApiError::NotFound)
}

async fn get_todo_or_404(global: &Global, req: &Request<Bytes>) -> Result<Todo> {
    let id = parse_id(req.param("id").unwrap_or_default())?;

    global.db().get_todo(id).await?.ok_or(ApiError::NotFound)
}

async fn list(req: Request<Bytes>) -> Result<Response<Body>> {
    let global = req.global()?;

    let todos = global.db().list_todos().await?;

    json_response(StatusCode::OK, &TodoList::from(todos.as_slice()))
}

async fn create(req: Request<Bytes>) -> Result<Response<Body>> {
    let global = req.global()?;

    let fields = parse_todo_fields(req.body())?;
    let todo = global.db().create_todo(&fields).await?;

    tracing::info!(id = todo.id, "created todo");

    json_response(StatusCode::CREATED, &TodoRepresentation::from(&todo))
}

async fn retrieve(req: Request<Bytes>) -> Result<Response<Body>> {
    let global = req.global()?;

    let todo = get_todo_or_404(&global, &req).await?;

    json_response(StatusCode::OK, &TodoRepresentation::from(&todo))
}

async fn update(req: Request<Bytes>) -> Result<Response<Body>> {
    let global = req.global()?;

    let mut todo = get_todo_or_404(&global, &req).await?;
    let fields = parse_todo_fields(req.body())?;

    todo.apply(fields);
    // the row can disappear between lookup and write
    let todo = global.db().update_todo(&todo).await?.ok_or(ApiError::NotFound)?;

    tracing::info!(id = todo.id, "updated todo");

    // 201 on update is what existing clients expect
    json_response(StatusCode::CREATED, &TodoRepresentation::from(&todo))
}

async fn destroy(req: Request<Bytes>) -> Result<Response<Body>> {
    let global = req.global()?;

    let todo = get_todo_or_404(&global, &req).await?;
    if !global.db().delete_todo(todo.id).await? {
        return Err(ApiError::NotFound);
    }

    tracing::info!(id = todo.id, "deleted todo");

    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Body::new(Bytes::new()))
        .map_err(|err| ApiError::Internal(err.into()))
}
