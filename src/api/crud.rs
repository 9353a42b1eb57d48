//! Generic CRUD endpoints shared by books, authors, genres and languages

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::{
    error::AppResult,
    models::{Entity, Page, PageQuery},
    services::{crud::CrudHandler, CrudRegistry, Services},
    AppState,
};

use super::AuthenticatedUser;

/// List/detail/create/update/delete routes for `E` mounted under `path`
pub fn routes<E>(path: &str) -> Router<AppState>
where
    E: Entity,
    Services: CrudRegistry<E>,
{
    Router::new()
        .route(path, get(list::<E>).post(create::<E>))
        .route(
            &format!("{path}/:id"),
            get(detail::<E>).put(update::<E>).delete(delete::<E>),
        )
}

fn handler<E>(state: &AppState) -> &CrudHandler<E>
where
    E: Entity,
    Services: CrudRegistry<E>,
{
    CrudRegistry::<E>::crud(state.services.as_ref())
}

async fn list<E>(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Page<E>>>
where
    E: Entity,
    Services: CrudRegistry<E>,
{
    let page = handler::<E>(&state).list(&query).await?;
    Ok(Json(page))
}

async fn detail<E>(State(state): State<AppState>, Path(id): Path<E::Id>) -> AppResult<Json<E>>
where
    E: Entity,
    Services: CrudRegistry<E>,
{
    let record = handler::<E>(&state).detail(id).await?;
    Ok(Json(record))
}

async fn create<E>(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(input): Json<E::Create>,
) -> AppResult<(StatusCode, Json<E>)>
where
    E: Entity,
    Services: CrudRegistry<E>,
{
    let record = handler::<E>(&state).create(&user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update<E>(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<E::Id>,
    Json(input): Json<E::Update>,
) -> AppResult<Json<E>>
where
    E: Entity,
    Services: CrudRegistry<E>,
{
    let record = handler::<E>(&state).update(&user.actor(), id, input).await?;
    Ok(Json(record))
}

async fn delete<E>(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<E::Id>,
) -> AppResult<StatusCode>
where
    E: Entity,
    Services: CrudRegistry<E>,
{
    handler::<E>(&state).delete(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
