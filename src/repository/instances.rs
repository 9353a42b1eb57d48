//! Book instances repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{map_constraint_error, AppResult},
    models::{BookInstance, LoanStatus},
};

use super::InstanceStore;

#[derive(Clone)]
pub struct InstancesRepository {
    pool: Pool<Postgres>,
}

impl InstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstanceStore for InstancesRepository {
    async fn get(&self, id: Uuid) -> AppResult<Option<BookInstance>> {
        let instance = sqlx::query_as::<_, BookInstance>(
            "SELECT id, book_id, imprint, due_back, borrower, status FROM book_instances WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(instance)
    }

    async fn insert(&self, instance: &BookInstance) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO book_instances (id, book_id, imprint, due_back, borrower, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(instance.id)
        .bind(instance.book_id)
        .bind(&instance.imprint)
        .bind(instance.due_back)
        .bind(instance.borrower)
        .bind(instance.status)
        .execute(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "Book instance"))?;

        Ok(())
    }

    async fn save(&self, instance: &BookInstance) -> AppResult<()> {
        sqlx::query(
            "UPDATE book_instances SET due_back = $1, borrower = $2, status = $3 WHERE id = $4",
        )
        .bind(instance.due_back)
        .bind(instance.borrower)
        .bind(instance.status)
        .bind(instance.id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_constraint_error(e, "Book instance"))?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM book_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn on_loan(&self, borrower: Option<Uuid>) -> AppResult<Vec<BookInstance>> {
        let instances = sqlx::query_as::<_, BookInstance>(
            r#"
            SELECT id, book_id, imprint, due_back, borrower, status
            FROM book_instances
            WHERE status = $1
              AND ($2::uuid IS NULL OR borrower = $2)
            ORDER BY due_back ASC NULLS LAST, id
            "#,
        )
        .bind(LoanStatus::OnLoan)
        .bind(borrower)
        .fetch_all(&self.pool)
        .await?;

        Ok(instances)
    }

    async fn for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        let instances = sqlx::query_as::<_, BookInstance>(
            r#"
            SELECT id, book_id, imprint, due_back, borrower, status
            FROM book_instances
            WHERE book_id = $1
            ORDER BY status, due_back NULLS LAST, id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(instances)
    }

    async fn count(&self, status: Option<LoanStatus>) -> AppResult<i64> {
        let count: i64 = match status {
            Some(status) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM book_instances WHERE status = $1")
                    .bind(status)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM book_instances")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(count)
    }
}
