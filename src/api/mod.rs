//! API handlers for the catalog REST endpoints

pub mod catalog;
pub mod crud;
pub mod health;
pub mod instances;
pub mod loans;
pub mod openapi;
pub mod rest;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::{user::UserClaims, Actor, Author, Book, Genre, Language},
    AppState,
};

/// Path the renewal form redirects to once a renewal is stored
pub const ON_LOAN_LIST_PATH: &str = "/api/v1/library-books";

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

impl AuthenticatedUser {
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Authentication("Missing or malformed bearer token".to_string()))?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Home page figures
        .route("/catalog", get(catalog::get_summary))
        // Catalog CRUD
        .merge(crud::routes::<Book>("/books"))
        .merge(crud::routes::<Author>("/authors"))
        .merge(crud::routes::<Genre>("/genres"))
        .merge(crud::routes::<Language>("/languages"))
        .route("/books/:id/instances", get(instances::list_book_instances))
        // Book instances
        .route("/instances", post(instances::create_instance))
        .route(
            "/instances/:id",
            get(instances::get_instance).delete(instances::delete_instance),
        )
        // Lending
        .route("/mybooks", get(loans::my_borrowed))
        .route("/library-books", get(loans::library_books))
        .route(
            "/instances/:id/renew",
            get(loans::renewal_form).post(loans::renew_instance),
        )
        .route("/instances/:id/checkout", post(loans::checkout))
        .route("/instances/:id/return", post(loans::mark_returned))
        .route("/instances/:id/maintenance", post(loans::send_to_maintenance))
        .route("/instances/:id/reserve", post(loans::reserve))
        .route("/instances/:id/release", post(loans::release))
        // REST projection
        .merge(rest::routes::<Book>("/rest/books"))
        .merge(rest::routes::<Author>("/rest/authors"))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
