//! Lending endpoints: borrowed lists, renewal form and status changes

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        instance::{BookInstance, CheckoutRequest, LoanEntry, RenewRequest, RenewalForm},
        LoanPage, Page, PageQuery, PageWindow,
    },
    AppState,
};

use super::{AuthenticatedUser, ON_LOAN_LIST_PATH};

/// Books on loan to the current user
#[utoipa::path(
    get,
    path = "/mybooks",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Borrowed instances, soonest due first", body = LoanPage),
        (status = 400, description = "Page out of range"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_borrowed(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<LoanPage>> {
    let window = query.window(state.config.catalog.loans_per_page)?;
    let lending = &state.services.lending;
    let instances = lending.list_borrowed_by(&user.actor()).await?;
    Ok(Json(loan_page(instances, lending.today(), window)))
}

/// Every book on loan (librarians)
#[utoipa::path(
    get,
    path = "/library-books",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Instances on loan, soonest due first", body = LoanPage),
        (status = 400, description = "Page out of range"),
        (status = 403, description = "Missing permission")
    )
)]
pub async fn library_books(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<LoanPage>> {
    let window = query.window(state.config.catalog.loans_per_page)?;
    let lending = &state.services.lending;
    let instances = lending.list_on_loan(&user.actor()).await?;
    Ok(Json(loan_page(instances, lending.today(), window)))
}

fn loan_page(instances: Vec<BookInstance>, today: NaiveDate, window: PageWindow) -> LoanPage {
    let entries = instances
        .into_iter()
        .map(|instance| LoanEntry::new(instance, today))
        .collect();
    Page::from_all(entries, window)
}

/// Renewal form prefilled with the default due date
#[utoipa::path(
    get,
    path = "/instances/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Instance ID")),
    responses(
        (status = 200, description = "Renewal form", body = RenewalForm),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "Instance not found")
    )
)]
pub async fn renewal_form(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RenewalForm>> {
    let form = state.services.lending.renewal_form(id, &user.actor()).await?;
    Ok(Json(form))
}

/// Submit a renewal.
///
/// A stored renewal redirects to the on-loan list. A rejected date
/// re-renders the form with the submitted value and the field error.
#[utoipa::path(
    post,
    path = "/instances/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Instance ID")),
    request_body = RenewRequest,
    responses(
        (status = 303, description = "Renewed, redirect to the on-loan list"),
        (status = 200, description = "Date rejected, form with errors", body = RenewalForm),
        (status = 403, description = "Missing permission"),
        (status = 404, description = "Instance not found")
    )
)]
pub async fn renew_instance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RenewRequest>,
) -> AppResult<Response> {
    let actor = user.actor();
    let lending = &state.services.lending;

    match lending.renew(id, request.due_back, &actor).await {
        Ok(_) => Ok(Redirect::to(ON_LOAN_LIST_PATH).into_response()),
        Err(e) => match e.field() {
            Some(field) => {
                let form = lending.renewal_form(id, &actor).await?;
                let form = RenewalForm {
                    due_back: request.due_back,
                    ..form
                }
                .with_error(field, e.to_string());
                Ok(Json(form).into_response())
            }
            None => Err(e.into()),
        },
    }
}

/// Lend an instance to a borrower
#[utoipa::path(
    post,
    path = "/instances/{id}/checkout",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Instance ID")),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Instance on loan", body = BookInstance),
        (status = 400, description = "Due date outside the lending window"),
        (status = 409, description = "Instance cannot be lent in its current status")
    )
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<BookInstance>> {
    let instance = state
        .services
        .lending
        .checkout(id, request.borrower, request.due_back, &user.actor())
        .await?;
    Ok(Json(instance))
}

/// Mark an instance as returned
#[utoipa::path(
    post,
    path = "/instances/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Instance ID")),
    responses(
        (status = 200, description = "Instance available again", body = BookInstance),
        (status = 409, description = "Instance is not on loan")
    )
)]
pub async fn mark_returned(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookInstance>> {
    let instance = state.services.lending.mark_returned(id, &user.actor()).await?;
    Ok(Json(instance))
}

/// Take an instance out of circulation
#[utoipa::path(
    post,
    path = "/instances/{id}/maintenance",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Instance ID")),
    responses(
        (status = 200, description = "Instance in maintenance", body = BookInstance),
        (status = 409, description = "Instance already in maintenance")
    )
)]
pub async fn send_to_maintenance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookInstance>> {
    let instance = state.services.lending.send_to_maintenance(id, &user.actor()).await?;
    Ok(Json(instance))
}

/// Hold an available instance
#[utoipa::path(
    post,
    path = "/instances/{id}/reserve",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Instance ID")),
    responses(
        (status = 200, description = "Instance reserved", body = BookInstance),
        (status = 409, description = "Instance is not available")
    )
)]
pub async fn reserve(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookInstance>> {
    let instance = state.services.lending.reserve(id, &user.actor()).await?;
    Ok(Json(instance))
}

/// Put a reserved or maintained instance back on the shelf
#[utoipa::path(
    post,
    path = "/instances/{id}/release",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Instance ID")),
    responses(
        (status = 200, description = "Instance available", body = BookInstance),
        (status = 409, description = "Instance cannot be released from its current status")
    )
)]
pub async fn release(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookInstance>> {
    let instance = state.services.lending.release(id, &user.actor()).await?;
    Ok(Json(instance))
}
