//! Data models for the catalog

pub mod author;
pub mod book;
pub mod instance;
pub mod lookup;
pub mod user;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::{AppError, AppResult};

// Re-export commonly used types
pub use author::Author;
pub use book::Book;
pub use instance::{BookInstance, LoanEntry, LoanStatus};
pub use lookup::{Genre, Language};
pub use user::{Actor, Permission, UserClaims};

/// Largest page a client may request
pub const MAX_PER_PAGE: i64 = 100;

/// A catalog record managed through the generic CRUD facade.
///
/// `Create` and `Update` are the request bodies accepted for the entity; both
/// are validated before reaching a store.
pub trait Entity: Serialize + Send + Sync + 'static {
    type Id: DeserializeOwned + std::fmt::Display + Copy + Send + Sync + 'static;
    type Create: DeserializeOwned + Validate + Send + Sync + 'static;
    type Update: DeserializeOwned + Validate + Send + Sync + 'static;

    /// Human readable name used in messages and logs
    const NAME: &'static str;
}

/// Pagination query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
pub struct PageQuery {
    /// Page number, 1-based (default: 1)
    pub page: Option<i64>,
    /// Items per page
    pub per_page: Option<i64>,
}

impl PageQuery {
    /// Resolve to a concrete `(page, per_page)` pair, clamping bad input
    pub fn resolve(&self, default_per_page: i64) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(default_per_page)
            .clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }

    /// Resolve and compute the row offset. Pages whose offset does not fit
    /// in an `i64` are rejected.
    pub fn window(&self, default_per_page: i64) -> AppResult<PageWindow> {
        let (page, per_page) = self.resolve(default_per_page);
        let offset = (page - 1)
            .checked_mul(per_page)
            .ok_or_else(|| AppError::BadRequest(format!("Page {} is out of range", page)))?;

        Ok(PageWindow {
            page,
            per_page,
            offset,
        })
    }
}

/// A resolved page: number, size and first row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
    pub offset: i64,
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
#[aliases(LoanPage = Page<LoanEntry>)]
pub struct Page<T> {
    /// Records on this page
    pub items: Vec<T>,
    /// Total number of records
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Records per page
    pub per_page: i64,
}

impl<T> Page<T> {
    /// Cut one page out of an already complete, ordered list
    pub fn from_all(all: Vec<T>, window: PageWindow) -> Self {
        let total = all.len() as i64;
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        let per_page = usize::try_from(window.per_page).unwrap_or(usize::MAX);
        let items = all.into_iter().skip(offset).take(per_page).collect();

        Page {
            items,
            total,
            page: window.page,
            per_page: window.per_page,
        }
    }
}
