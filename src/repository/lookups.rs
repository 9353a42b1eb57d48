//! Repository shared by the genre and language lookup tables

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{map_constraint_error, AppResult},
    models::lookup::{Lookup, NameInput},
};

use super::CrudStore;

pub struct LookupRepository<E> {
    pool: Pool<Postgres>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> LookupRepository<E> {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for LookupRepository<E> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

#[async_trait]
impl<E: Lookup> CrudStore<E> for LookupRepository<E> {
    async fn list(&self, limit: Option<i64>, offset: i64) -> AppResult<Vec<E>> {
        let sql = format!(
            "SELECT id, name FROM {} ORDER BY name, id LIMIT $1 OFFSET $2",
            E::TABLE
        );
        let rows = sqlx::query_as::<_, E>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn get(&self, id: i32) -> AppResult<Option<E>> {
        let sql = format!("SELECT id, name FROM {} WHERE id = $1", E::TABLE);
        let row = sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn create(&self, input: &NameInput) -> AppResult<E> {
        let sql = format!("INSERT INTO {} (name) VALUES ($1) RETURNING id, name", E::TABLE);
        let row = sqlx::query_as::<_, E>(&sql)
            .bind(input.name.trim())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_constraint_error(e, E::NAME))?;

        Ok(row)
    }

    async fn update(&self, id: i32, input: &NameInput) -> AppResult<Option<E>> {
        let sql = format!(
            "UPDATE {} SET name = $1 WHERE id = $2 RETURNING id, name",
            E::TABLE
        );
        let row = sqlx::query_as::<_, E>(&sql)
            .bind(input.name.trim())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_constraint_error(e, E::NAME))?;

        Ok(row)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", E::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> AppResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", E::TABLE);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}
