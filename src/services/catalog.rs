//! Catalog-wide figures shown on the home page

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{Author, Book, LoanStatus},
    repository::{CrudStore, InstanceStore},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogSummary {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_authors: i64,
}

#[derive(Clone)]
pub struct CatalogService {
    books: Arc<dyn CrudStore<Book>>,
    authors: Arc<dyn CrudStore<Author>>,
    instances: Arc<dyn InstanceStore>,
}

impl CatalogService {
    pub fn new(
        books: Arc<dyn CrudStore<Book>>,
        authors: Arc<dyn CrudStore<Author>>,
        instances: Arc<dyn InstanceStore>,
    ) -> Self {
        Self {
            books,
            authors,
            instances,
        }
    }

    pub async fn summary(&self) -> AppResult<CatalogSummary> {
        Ok(CatalogSummary {
            num_books: self.books.count().await?,
            num_instances: self.instances.count(None).await?,
            num_instances_available: self.instances.count(Some(LoanStatus::Available)).await?,
            num_authors: self.authors.count().await?,
        })
    }
}
