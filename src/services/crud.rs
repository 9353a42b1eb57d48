//! Generic list/detail/create/update/delete over any catalog entity

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Actor, Entity, Page, PageQuery, Permission},
    repository::CrudStore,
};

/// CRUD operations for one entity, configured builder-style:
///
/// ```ignore
/// let books = CrudHandler::new(store)
///     .require(Permission::CanMarkReturned)
///     .paginate_by(10);
/// ```
///
/// Reads are public; writes need the configured permission.
pub struct CrudHandler<E: Entity> {
    store: Arc<dyn CrudStore<E>>,
    write_permission: Permission,
    per_page: i64,
}

impl<E: Entity> Clone for CrudHandler<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            write_permission: self.write_permission,
            per_page: self.per_page,
        }
    }
}

impl<E: Entity> CrudHandler<E> {
    pub fn new(store: Arc<dyn CrudStore<E>>) -> Self {
        Self {
            store,
            write_permission: Permission::CanMarkReturned,
            per_page: 10,
        }
    }

    pub fn require(mut self, permission: Permission) -> Self {
        self.write_permission = permission;
        self
    }

    pub fn paginate_by(mut self, per_page: i64) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    fn not_found(id: E::Id) -> AppError {
        AppError::NotFound(format!("{} with id {} not found", E::NAME, id))
    }

    pub async fn list(&self, query: &PageQuery) -> AppResult<Page<E>> {
        let window = query.window(self.per_page)?;
        let items = self.store.list(Some(window.per_page), window.offset).await?;
        let total = self.store.count().await?;

        Ok(Page {
            items,
            total,
            page: window.page,
            per_page: window.per_page,
        })
    }

    /// Every record, unpaginated
    pub async fn all(&self) -> AppResult<Vec<E>> {
        self.store.list(None, 0).await
    }

    pub async fn detail(&self, id: E::Id) -> AppResult<E> {
        self.store.get(id).await?.ok_or_else(|| Self::not_found(id))
    }

    pub async fn create(&self, actor: &Actor, input: E::Create) -> AppResult<E> {
        actor.require(self.write_permission)?;
        input.validate()?;

        let created = self.store.create(&input).await?;
        tracing::info!(entity = E::NAME, user = %actor.username, "Record created");
        Ok(created)
    }

    pub async fn update(&self, actor: &Actor, id: E::Id, input: E::Update) -> AppResult<E> {
        actor.require(self.write_permission)?;
        input.validate()?;

        let updated = self
            .store
            .update(id, &input)
            .await?
            .ok_or_else(|| Self::not_found(id))?;
        tracing::info!(entity = E::NAME, id = %id, user = %actor.username, "Record updated");
        Ok(updated)
    }

    pub async fn delete(&self, actor: &Actor, id: E::Id) -> AppResult<()> {
        actor.require(self.write_permission)?;

        if !self.store.delete(id).await? {
            return Err(Self::not_found(id));
        }
        tracing::info!(entity = E::NAME, id = %id, user = %actor.username, "Record deleted");
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        self.store.count().await
    }
}
