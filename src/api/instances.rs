//! Book instance endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::instance::{BookInstance, CreateInstance},
    AppState,
};

use super::AuthenticatedUser;

/// Register a new copy of a book
#[utoipa::path(
    post,
    path = "/instances",
    tag = "instances",
    security(("bearer_auth" = [])),
    request_body = CreateInstance,
    responses(
        (status = 201, description = "Instance created", body = BookInstance),
        (status = 400, description = "Invalid input or initial status"),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn create_instance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(data): Json<CreateInstance>,
) -> AppResult<(StatusCode, Json<BookInstance>)> {
    let instance = state.services.lending.create_instance(&user.actor(), data).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

/// Get a book instance by ID
#[utoipa::path(
    get,
    path = "/instances/{id}",
    tag = "instances",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Instance ID")),
    responses(
        (status = 200, description = "Instance details", body = BookInstance),
        (status = 404, description = "Instance not found")
    )
)]
pub async fn get_instance(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookInstance>> {
    let instance = state.services.lending.get_instance(id).await?;
    Ok(Json(instance))
}

/// Delete a book instance
#[utoipa::path(
    delete,
    path = "/instances/{id}",
    tag = "instances",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Instance ID")),
    responses(
        (status = 204, description = "Instance deleted"),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "Instance not found")
    )
)]
pub async fn delete_instance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.lending.delete_instance(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the copies of a book
#[utoipa::path(
    get,
    path = "/books/{id}/instances",
    tag = "instances",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Copies of the book", body = Vec<BookInstance>)
    )
)]
pub async fn list_book_instances(
    State(state): State<AppState>,
    Path(book_id): Path<i32>,
) -> AppResult<Json<Vec<BookInstance>>> {
    let instances = state.services.lending.instances_for_book(book_id).await?;
    Ok(Json(instances))
}
