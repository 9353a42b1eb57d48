//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{catalog, health, instances, loans};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        version = "1.0.0",
        description = "Library catalog and lending REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Catalog
        catalog::get_summary,
        // Instances
        instances::create_instance,
        instances::get_instance,
        instances::delete_instance,
        instances::list_book_instances,
        // Loans
        loans::my_borrowed,
        loans::library_books,
        loans::renewal_form,
        loans::renew_instance,
        loans::checkout,
        loans::mark_returned,
        loans::send_to_maintenance,
        loans::reserve,
        loans::release,
    ),
    components(
        schemas(
            // Catalog
            crate::services::catalog::CatalogSummary,
            crate::models::book::Book,
            crate::models::book::BookInput,
            crate::models::author::Author,
            crate::models::author::AuthorInput,
            crate::models::lookup::Genre,
            crate::models::lookup::Language,
            crate::models::lookup::NameInput,
            // Instances
            crate::models::instance::BookInstance,
            crate::models::instance::LoanStatus,
            crate::models::instance::CreateInstance,
            // Loans
            crate::models::instance::RenewRequest,
            crate::models::instance::RenewalForm,
            crate::models::instance::CheckoutRequest,
            crate::models::instance::LoanEntry,
            crate::models::LoanPage,
            // Health
            health::HealthResponse,
            health::ProbeStatus,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "catalog", description = "Catalog figures"),
        (name = "instances", description = "Book instance management"),
        (name = "loans", description = "Lending and renewals")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
