//! Genre and language lookup tables

use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow};
use utoipa::ToSchema;
use validator::Validate;

use super::Entity;

/// A named lookup row (`id`, `name`) kept in its own table
pub trait Lookup: Entity<Id = i32, Create = NameInput, Update = NameInput>
where
    Self: for<'r> FromRow<'r, PgRow> + Unpin,
{
    const TABLE: &'static str;
}

/// Book genre (e.g. Science Fiction, Poetry)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

impl Entity for Genre {
    type Id = i32;
    type Create = NameInput;
    type Update = NameInput;

    const NAME: &'static str = "Genre";
}

impl Lookup for Genre {
    const TABLE: &'static str = "genres";
}

/// Natural language a book is written in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Language {
    pub id: i32,
    pub name: String,
}

impl Entity for Language {
    type Id = i32;
    type Create = NameInput;
    type Update = NameInput;

    const NAME: &'static str = "Language";
}

impl Lookup for Language {
    const TABLE: &'static str = "languages";
}

/// Create / update request for lookup rows
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NameInput {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
}
