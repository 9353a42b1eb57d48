//! Loan lifecycle service: renewals, checkouts, returns and on-loan listings.
//!
//! Every operation takes the calling [`Actor`] explicitly. Lending
//! administration requires `catalog.can_mark_returned`, which is checked
//! before an instance is looked up or a date is validated.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        instance::{CreateInstance, RenewalForm},
        Actor, BookInstance, LoanStatus, Permission,
    },
    repository::InstanceStore,
};

use super::clock::Clock;

/// Suggested renewal period offered on the renewal form
pub const DEFAULT_RENEWAL_WEEKS: i64 = 3;

/// Latest acceptable due date, counted from today
pub const MAX_RENEWAL_WEEKS: i64 = 4;

/// Permission gating every lending administration action
pub const LENDING_PERMISSION: Permission = Permission::CanMarkReturned;

#[derive(Error, Debug)]
pub enum LendingError {
    #[error("Book instance {0} not found")]
    NotFound(Uuid),

    #[error("Permission {0} required")]
    Forbidden(Permission),

    #[error("Invalid date - renewal in past")]
    DateInPast,

    #[error("Invalid date - renewal more than 4 weeks ahead")]
    DateTooFarAhead,

    #[error("Book instance {id} cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        id: Uuid,
        from: LoanStatus,
        to: LoanStatus,
    },

    #[error(transparent)]
    PersistenceFailure(#[from] AppError),
}

impl LendingError {
    /// Form field a validation error is reported against
    pub fn field(&self) -> Option<&'static str> {
        match self {
            LendingError::DateInPast | LendingError::DateTooFarAhead => Some("due_back"),
            _ => None,
        }
    }
}

impl From<LendingError> for AppError {
    fn from(e: LendingError) -> Self {
        match e {
            LendingError::NotFound(_) => AppError::NotFound(e.to_string()),
            LendingError::Forbidden(_) => AppError::Authorization(e.to_string()),
            LendingError::DateInPast | LendingError::DateTooFarAhead => {
                AppError::Validation(e.to_string())
            }
            LendingError::InvalidTransition { .. } => AppError::InvalidTransition(e.to_string()),
            LendingError::PersistenceFailure(inner) => inner,
        }
    }
}

/// Date proposed when a renewal is opened without one
pub fn default_renewal_date(today: NaiveDate) -> NaiveDate {
    today + Duration::weeks(DEFAULT_RENEWAL_WEEKS)
}

/// Check a proposed due date against the `[today, today + 4 weeks]` window
pub fn validate_due_date(proposed: NaiveDate, today: NaiveDate) -> Result<NaiveDate, LendingError> {
    if proposed < today {
        return Err(LendingError::DateInPast);
    }
    if proposed > today + Duration::weeks(MAX_RENEWAL_WEEKS) {
        return Err(LendingError::DateTooFarAhead);
    }
    Ok(proposed)
}

/// Keep on-loan rows only, soonest due first
fn on_loan_sorted(mut instances: Vec<BookInstance>) -> Vec<BookInstance> {
    instances.retain(BookInstance::is_on_loan);
    instances.sort_by_key(|i| (i.due_back.is_none(), i.due_back));
    instances
}

#[derive(Clone)]
pub struct LendingService {
    store: Arc<dyn InstanceStore>,
    clock: Arc<dyn Clock>,
}

impl LendingService {
    pub fn new(store: Arc<dyn InstanceStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    fn authorize(actor: &Actor, action: &str) -> Result<(), LendingError> {
        if actor.has_perm(LENDING_PERMISSION) {
            Ok(())
        } else {
            tracing::warn!(user = %actor.username, action, "Lending action denied");
            Err(LendingError::Forbidden(LENDING_PERMISSION))
        }
    }

    async fn load(&self, instance_id: Uuid) -> Result<BookInstance, LendingError> {
        self.store
            .get(instance_id)
            .await?
            .ok_or(LendingError::NotFound(instance_id))
    }

    /// Set a new due date on an instance
    pub async fn renew(
        &self,
        instance_id: Uuid,
        proposed_due_date: NaiveDate,
        actor: &Actor,
    ) -> Result<BookInstance, LendingError> {
        Self::authorize(actor, "renew")?;
        let mut instance = self.load(instance_id).await?;
        let due_back = validate_due_date(proposed_due_date, self.today())?;

        instance.due_back = Some(due_back);
        self.store.save(&instance).await?;

        tracing::info!(
            instance = %instance.id,
            due_back = %due_back,
            user = %actor.username,
            "Book instance renewed"
        );
        Ok(instance)
    }

    /// Renewal form pre-filled with the default proposal
    pub async fn renewal_form(
        &self,
        instance_id: Uuid,
        actor: &Actor,
    ) -> Result<RenewalForm, LendingError> {
        Self::authorize(actor, "renewal form")?;
        let instance = self.load(instance_id).await?;
        Ok(RenewalForm::new(instance, default_renewal_date(self.today())))
    }

    /// Instances currently on loan to `actor`, soonest due first
    pub async fn list_borrowed_by(&self, actor: &Actor) -> Result<Vec<BookInstance>, LendingError> {
        let mut instances = self.store.on_loan(Some(actor.user_id)).await?;
        instances.retain(|i| i.borrower == Some(actor.user_id));
        Ok(on_loan_sorted(instances))
    }

    /// Every instance on loan, soonest due first
    pub async fn list_on_loan(&self, actor: &Actor) -> Result<Vec<BookInstance>, LendingError> {
        Self::authorize(actor, "list on loan")?;
        let instances = self.store.on_loan(None).await?;
        Ok(on_loan_sorted(instances))
    }

    /// Lend an available or reserved instance to `borrower`
    pub async fn checkout(
        &self,
        instance_id: Uuid,
        borrower: Uuid,
        due_back: Option<NaiveDate>,
        actor: &Actor,
    ) -> Result<BookInstance, LendingError> {
        Self::authorize(actor, "checkout")?;
        let mut instance = self.load(instance_id).await?;

        let today = self.today();
        let due_back = match due_back {
            Some(date) => validate_due_date(date, today)?,
            None => default_renewal_date(today),
        };

        instance
            .lend(borrower, due_back)
            .map_err(|e| LendingError::InvalidTransition {
                id: instance_id,
                from: e.from,
                to: e.to,
            })?;
        self.store.save(&instance).await?;

        tracing::info!(
            instance = %instance.id,
            borrower = %borrower,
            due_back = %due_back,
            user = %actor.username,
            "Book instance checked out"
        );
        Ok(instance)
    }

    /// Take an instance back from its borrower
    pub async fn mark_returned(
        &self,
        instance_id: Uuid,
        actor: &Actor,
    ) -> Result<BookInstance, LendingError> {
        self.move_to(instance_id, LoanStatus::Available, &[LoanStatus::OnLoan], actor, "return")
            .await
    }

    pub async fn send_to_maintenance(
        &self,
        instance_id: Uuid,
        actor: &Actor,
    ) -> Result<BookInstance, LendingError> {
        self.move_to(
            instance_id,
            LoanStatus::Maintenance,
            &[LoanStatus::Available, LoanStatus::Reserved, LoanStatus::OnLoan],
            actor,
            "maintenance",
        )
        .await
    }

    pub async fn reserve(&self, instance_id: Uuid, actor: &Actor) -> Result<BookInstance, LendingError> {
        self.move_to(instance_id, LoanStatus::Reserved, &[LoanStatus::Available], actor, "reserve")
            .await
    }

    /// Make a reserved or maintained instance available again
    pub async fn release(&self, instance_id: Uuid, actor: &Actor) -> Result<BookInstance, LendingError> {
        self.move_to(
            instance_id,
            LoanStatus::Available,
            &[LoanStatus::Maintenance, LoanStatus::Reserved],
            actor,
            "release",
        )
        .await
    }

    async fn move_to(
        &self,
        instance_id: Uuid,
        to: LoanStatus,
        allowed_from: &[LoanStatus],
        actor: &Actor,
        action: &str,
    ) -> Result<BookInstance, LendingError> {
        Self::authorize(actor, action)?;
        let mut instance = self.load(instance_id).await?;

        let from = instance.status;
        if !allowed_from.contains(&from) {
            return Err(LendingError::InvalidTransition { id: instance_id, from, to });
        }
        instance
            .transition(to)
            .map_err(|e| LendingError::InvalidTransition {
                id: instance_id,
                from: e.from,
                to: e.to,
            })?;
        self.store.save(&instance).await?;

        tracing::info!(
            instance = %instance.id,
            from = %from,
            to = %to,
            user = %actor.username,
            "Book instance status changed"
        );
        Ok(instance)
    }

    /// Register a new copy of a book
    pub async fn create_instance(&self, actor: &Actor, input: CreateInstance) -> AppResult<BookInstance> {
        actor.require(LENDING_PERMISSION)?;
        input.validate()?;

        let status = input.status.unwrap_or_default();
        if status == LoanStatus::OnLoan {
            return Err(AppError::BadRequest(
                "New instances cannot start on loan; use checkout".to_string(),
            ));
        }

        let mut instance = BookInstance::new(input.book_id, input.imprint);
        instance.status = status;
        self.store.insert(&instance).await?;

        tracing::info!(instance = %instance.id, book = instance.book_id, "Book instance created");
        Ok(instance)
    }

    pub async fn get_instance(&self, instance_id: Uuid) -> AppResult<BookInstance> {
        Ok(self.load(instance_id).await?)
    }

    pub async fn delete_instance(&self, actor: &Actor, instance_id: Uuid) -> AppResult<()> {
        actor.require(LENDING_PERMISSION)?;
        if !self.store.delete(instance_id).await? {
            return Err(LendingError::NotFound(instance_id).into());
        }

        tracing::info!(instance = %instance_id, user = %actor.username, "Book instance deleted");
        Ok(())
    }

    pub async fn instances_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        self.store.for_book(book_id).await
    }
}
