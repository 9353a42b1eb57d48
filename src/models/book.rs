//! Book (catalog title) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::Entity;

/// Book row as stored, without its genre links
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: i32,
    pub title: String,
    pub author_id: Option<i32>,
    pub summary: String,
    pub isbn: String,
    pub language_id: Option<i32>,
}

impl BookRow {
    pub fn with_genres(self, genres: Vec<i32>) -> Book {
        Book {
            id: self.id,
            title: self.title,
            author_id: self.author_id,
            summary: self.summary,
            isbn: self.isbn,
            language_id: self.language_id,
            genres,
        }
    }
}

/// Full book model (DB + API)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: Option<i32>,
    pub summary: String,
    /// 13 character ISBN
    pub isbn: String,
    pub language_id: Option<i32>,
    /// Genre ids
    pub genres: Vec<i32>,
}

impl Entity for Book {
    type Id = i32;
    type Create = BookInput;
    type Update = BookInput;

    const NAME: &'static str = "Book";
}

/// Create / update book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    #[validate(length(min = 2, max = 200, message = "Title should contain at least 2 characters"))]
    pub title: String,
    pub author_id: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "Summary is limited to 1000 characters"))]
    pub summary: String,
    #[validate(length(equal = 13, message = "ISBN must be 13 characters"))]
    pub isbn: String,
    pub language_id: Option<i32>,
    #[serde(default)]
    pub genres: Vec<i32>,
}
