//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::Entity;

/// Full author model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl Entity for Author {
    type Id = i32;
    type Create = AuthorInput;
    type Update = AuthorInput;

    const NAME: &'static str = "Author";
}

/// Create / update author request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[validate(schema(function = "validate_life_dates"))]
pub struct AuthorInput {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

fn validate_life_dates(input: &AuthorInput) -> Result<(), ValidationError> {
    match (input.date_of_birth, input.date_of_death) {
        (Some(born), Some(died)) if died < born => {
            let mut error = ValidationError::new("date_of_death");
            error.message = Some("Date of death precedes date of birth".into());
            Err(error)
        }
        _ => Ok(()),
    }
}
