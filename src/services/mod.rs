//! Business logic services

pub mod access;
pub mod catalog;
pub mod clock;
pub mod crud;
pub mod lending;

use std::sync::Arc;

use crate::{
    config::CatalogConfig,
    models::{Author, Book, Entity, Genre, Language},
    repository::Stores,
};

use self::{access::AccessPolicy, clock::Clock, crud::CrudHandler};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub lending: lending::LendingService,
    pub catalog: catalog::CatalogService,
    pub books: CrudHandler<Book>,
    pub authors: CrudHandler<Author>,
    pub genres: CrudHandler<Genre>,
    pub languages: CrudHandler<Language>,
    /// Gate applied to the REST projection
    pub rest_policy: Arc<dyn AccessPolicy>,
}

impl Services {
    /// Create all services over the given stores
    pub fn new(stores: Stores, clock: Arc<dyn Clock>, config: &CatalogConfig) -> Self {
        Self {
            lending: lending::LendingService::new(stores.instances.clone(), clock),
            catalog: catalog::CatalogService::new(
                stores.books.clone(),
                stores.authors.clone(),
                stores.instances,
            ),
            books: CrudHandler::new(stores.books).paginate_by(config.books_per_page),
            authors: CrudHandler::new(stores.authors).paginate_by(config.authors_per_page),
            genres: CrudHandler::new(stores.genres).paginate_by(config.lookups_per_page),
            languages: CrudHandler::new(stores.languages).paginate_by(config.lookups_per_page),
            rest_policy: Arc::new(access::CanMarkReturned),
        }
    }
}

/// Lookup of the CRUD handler serving entity `E`
pub trait CrudRegistry<E: Entity> {
    fn crud(&self) -> &CrudHandler<E>;
}

impl CrudRegistry<Book> for Services {
    fn crud(&self) -> &CrudHandler<Book> {
        &self.books
    }
}

impl CrudRegistry<Author> for Services {
    fn crud(&self) -> &CrudHandler<Author> {
        &self.authors
    }
}

impl CrudRegistry<Genre> for Services {
    fn crud(&self) -> &CrudHandler<Genre> {
        &self.genres
    }
}

impl CrudRegistry<Language> for Services {
    fn crud(&self) -> &CrudHandler<Language> {
        &self.languages
    }
}
