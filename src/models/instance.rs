//! Book instance (physical lending copy) model and its status state machine

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Lending status of a book instance.
///
/// Stored as the single characters `m`, `o`, `a`, `r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Maintenance,
    OnLoan,
    Available,
    Reserved,
}

impl LoanStatus {
    /// Return the store code for this status
    pub fn as_code(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "m",
            LoanStatus::OnLoan => "o",
            LoanStatus::Available => "a",
            LoanStatus::Reserved => "r",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "m" => Some(LoanStatus::Maintenance),
            "o" => Some(LoanStatus::OnLoan),
            "a" => Some(LoanStatus::Available),
            "r" => Some(LoanStatus::Reserved),
            _ => None,
        }
    }

    /// Whether the lifecycle allows moving from `self` to `to`
    pub fn can_transition_to(&self, to: LoanStatus) -> bool {
        use LoanStatus::*;

        matches!(
            (self, to),
            (Maintenance, Available)
                | (OnLoan, Maintenance)
                | (OnLoan, Available)
                | (Available, Maintenance)
                | (Available, OnLoan)
                | (Available, Reserved)
                | (Reserved, Maintenance)
                | (Reserved, OnLoan)
                | (Reserved, Available)
        )
    }
}

impl Default for LoanStatus {
    fn default() -> Self {
        LoanStatus::Maintenance
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanStatus::Maintenance => "Maintenance",
            LoanStatus::OnLoan => "On loan",
            LoanStatus::Available => "Available",
            LoanStatus::Reserved => "Reserved",
        };
        write!(f, "{}", label)
    }
}

// SQLx conversion for LoanStatus
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let code: String = Decode::<Postgres>::decode(value)?;
        LoanStatus::from_code(&code).ok_or_else(|| format!("Invalid loan status code: {}", code).into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_code(), buf)
    }
}

/// Rejected status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub from: LoanStatus,
    pub to: LoanStatus,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot move from '{}' to '{}'", self.from, self.to)
    }
}

/// One physical copy of a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookInstance {
    pub id: Uuid,
    pub book_id: i32,
    /// Publisher and edition
    pub imprint: String,
    /// Only set while on loan
    pub due_back: Option<NaiveDate>,
    /// Only set while on loan
    pub borrower: Option<Uuid>,
    pub status: LoanStatus,
}

impl BookInstance {
    /// New copy of `book_id`, parked in maintenance until released
    pub fn new(book_id: i32, imprint: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            book_id,
            imprint: imprint.into(),
            due_back: None,
            borrower: None,
            status: LoanStatus::default(),
        }
    }

    pub fn is_on_loan(&self) -> bool {
        self.status == LoanStatus::OnLoan
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_on_loan() && self.due_back.map(|d| d < today).unwrap_or(false)
    }

    /// Put the copy on loan to `borrower` until `due_back`
    pub fn lend(&mut self, borrower: Uuid, due_back: NaiveDate) -> Result<(), TransitionError> {
        self.transition(LoanStatus::OnLoan)?;
        self.borrower = Some(borrower);
        self.due_back = Some(due_back);
        Ok(())
    }

    /// Move to a new status. Leaving `OnLoan` clears the loan fields.
    pub fn transition(&mut self, to: LoanStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError { from: self.status, to });
        }
        if self.status == LoanStatus::OnLoan {
            self.due_back = None;
            self.borrower = None;
        }
        self.status = to;
        Ok(())
    }
}

/// A copy in a loan listing, flagged when its due date has passed
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanEntry {
    #[serde(flatten)]
    pub instance: BookInstance,
    pub overdue: bool,
}

impl LoanEntry {
    pub fn new(instance: BookInstance, today: NaiveDate) -> Self {
        let overdue = instance.is_overdue(today);
        Self { instance, overdue }
    }
}

/// Create book instance request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInstance {
    pub book_id: i32,
    #[validate(length(min = 1, max = 200, message = "Imprint must be 1-200 characters"))]
    pub imprint: String,
    /// Initial status; defaults to maintenance. Copies go on loan through checkout only.
    pub status: Option<LoanStatus>,
}

/// Renewal request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct RenewRequest {
    /// Proposed new due date (YYYY-MM-DD)
    pub due_back: NaiveDate,
}

/// Checkout request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub borrower: Uuid,
    /// Due date; defaults to three weeks from today
    pub due_back: Option<NaiveDate>,
}

/// Renewal form: the instance, the proposed date and any field errors
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RenewalForm {
    pub instance: BookInstance,
    pub due_back: NaiveDate,
    pub label: String,
    pub help_text: String,
    /// Field name to error messages; empty when the form is valid
    pub errors: BTreeMap<String, Vec<String>>,
}

impl RenewalForm {
    pub fn new(instance: BookInstance, due_back: NaiveDate) -> Self {
        Self {
            instance,
            due_back,
            label: "Renewal date".to_string(),
            help_text: "Enter a date between now and 4 weeks (default 3).".to_string(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_error(mut self, field: &str, message: impl Into<String>) -> Self {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
        self
    }
}
