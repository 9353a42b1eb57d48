//! REST projection of catalog records, gated by the service access policy

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    routing::get,
    Json, Router,
};

use crate::{
    error::AppResult,
    models::Entity,
    services::{access::authorize, crud::CrudHandler, CrudRegistry, Services},
    AppState,
};

use super::AuthenticatedUser;

/// Collection and record routes for `E` mounted under `path`
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

/// Collection gate only
fn check_collection(state: &AppState, user: &AuthenticatedUser, method: &Method) -> AppResult<()> {
    authorize(state.services.rest_policy.as_ref(), &user.actor(), method, false)
}

/// Collection gate, then record gate
fn check_record(state: &AppState, user: &AuthenticatedUser, method: &Method) -> AppResult<()> {
    authorize(state.services.rest_policy.as_ref(), &user.actor(), method, true)
}

async fn list<E>(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    method: Method,
) -> AppResult<Json<Vec<E>>>
where
    E: Entity,
    Services: CrudRegistry<E>,
{
    check_collection(&state, &user, &method)?;
    let records = handler::<E>(&state).all().await?;
    Ok(Json(records))
}

async fn create<E>(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    method: Method,
    Json(input): Json<E::Create>,
) -> AppResult<(StatusCode, Json<E>)>
where
    E: Entity,
    Services: CrudRegistry<E>,
{
    check_collection(&state, &user, &method)?;
    let record = handler::<E>(&state).create(&user.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn detail<E>(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    method: Method,
    Path(id): Path<E::Id>,
) -> AppResult<Json<E>>
where
    E: Entity,
    Services: CrudRegistry<E>,
{
    check_collection(&state, &user, &method)?;
    let record = handler::<E>(&state).detail(id).await?;
    check_record(&state, &user, &method)?;
    Ok(Json(record))
}

async fn update<E>(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    method: Method,
    Path(id): Path<E::Id>,
    Json(input): Json<E::Update>,
) -> AppResult<Json<E>>
where
    E: Entity,
    Services: CrudRegistry<E>,
{
    check_collection(&state, &user, &method)?;
    let crud = handler::<E>(&state);
    crud.detail(id).await?;
    check_record(&state, &user, &method)?;
    let record = crud.update(&user.actor(), id, input).await?;
    Ok(Json(record))
}

async fn delete<E>(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    method: Method,
    Path(id): Path<E::Id>,
) -> AppResult<StatusCode>
where
    E: Entity,
    Services: CrudRegistry<E>,
{
    check_collection(&state, &user, &method)?;
    let crud = handler::<E>(&state);
    crud.detail(id).await?;
    check_record(&state, &user, &method)?;
    crud.delete(&user.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
