//! Repository layer: store contracts and their PostgreSQL implementations

pub mod authors;
pub mod books;
pub mod instances;
pub mod lookups;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Author, Book, BookInstance, Entity, Genre, Language, LoanStatus},
};

/// Persistence contract for book instances
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<BookInstance>>;

    async fn insert(&self, instance: &BookInstance) -> AppResult<()>;

    /// Write every mutable field of `instance` back to its row
    async fn save(&self, instance: &BookInstance) -> AppResult<()>;

    /// Returns false when no row matched
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// On-loan instances, optionally restricted to one borrower, soonest due first
    async fn on_loan(&self, borrower: Option<Uuid>) -> AppResult<Vec<BookInstance>>;

    async fn for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>>;

    async fn count(&self, status: Option<LoanStatus>) -> AppResult<i64>;
}

/// Persistence contract for entities served by the generic CRUD facade
#[async_trait]
pub trait CrudStore<E: Entity>: Send + Sync {
    /// `limit = None` returns every row
    async fn list(&self, limit: Option<i64>, offset: i64) -> AppResult<Vec<E>>;

    async fn get(&self, id: E::Id) -> AppResult<Option<E>>;

    async fn create(&self, input: &E::Create) -> AppResult<E>;

    /// Returns None when no row matched
    async fn update(&self, id: E::Id, input: &E::Update) -> AppResult<Option<E>>;

    /// Returns false when no row matched
    async fn delete(&self, id: E::Id) -> AppResult<bool>;

    async fn count(&self) -> AppResult<i64>;
}

/// Postgres-backed stores sharing one connection pool
#[derive(Clone)]
pub struct Repository {
    pub instances: instances::InstancesRepository,
    pub books: books::BooksRepository,
    pub authors: authors::AuthorsRepository,
    pub genres: lookups::LookupRepository<Genre>,
    pub languages: lookups::LookupRepository<Language>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            instances: instances::InstancesRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            authors: authors::AuthorsRepository::new(pool.clone()),
            genres: lookups::LookupRepository::new(pool.clone()),
            languages: lookups::LookupRepository::new(pool),
        }
    }
}

/// Store handles the services are built from
#[derive(Clone)]
pub struct Stores {
    pub instances: Arc<dyn InstanceStore>,
    pub books: Arc<dyn CrudStore<Book>>,
    pub authors: Arc<dyn CrudStore<Author>>,
    pub genres: Arc<dyn CrudStore<Genre>>,
    pub languages: Arc<dyn CrudStore<Language>>,
}

impl From<Repository> for Stores {
    fn from(repository: Repository) -> Self {
        Self {
            instances: Arc::new(repository.instances),
            books: Arc::new(repository.books),
            authors: Arc::new(repository.authors),
            genres: Arc::new(repository.genres),
            languages: Arc::new(repository.languages),
        }
    }
}
