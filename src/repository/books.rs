//! Books repository for database operations

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row, Transaction};

use crate::{
    error::{map_constraint_error, AppError, AppResult},
    models::book::{Book, BookInput, BookRow},
};

use super::CrudStore;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Genre ids for each of `book_ids`
    async fn genres_for(&self, book_ids: &[i32]) -> AppResult<HashMap<i32, Vec<i32>>> {
        let rows = sqlx::query(
            "SELECT book_id, genre_id FROM book_genres WHERE book_id = ANY($1) ORDER BY genre_id",
        )
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut genres: HashMap<i32, Vec<i32>> = HashMap::new();
        for row in rows {
            genres
                .entry(row.get("book_id"))
                .or_default()
                .push(row.get("genre_id"));
        }
        Ok(genres)
    }

    async fn replace_genres(
        tx: &mut Transaction<'_, Postgres>,
        book_id: i32,
        genres: &[i32],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO book_genres (book_id, genre_id)
            SELECT $1, genre_id FROM UNNEST($2::int4[]) AS genre_id
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(book_id)
        .bind(genres)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_constraint_error(e, "Book genre"))?;

        Ok(())
    }
}

#[async_trait]
impl CrudStore<Book> for BooksRepository {
    async fn list(&self, limit: Option<i64>, offset: i64) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT id, title, author_id, summary, isbn, language_id
            FROM books
            ORDER BY title, id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let mut genres = self.genres_for(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let book_genres = genres.remove(&row.id).unwrap_or_default();
                row.with_genres(book_genres)
            })
            .collect())
    }

    async fn get(&self, id: i32) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(
            "SELECT id, title, author_id, summary, isbn, language_id FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let genres = self.genres_for(&[row.id]).await?.remove(&row.id).unwrap_or_default();
                Ok(Some(row.with_genres(genres)))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, input: &BookInput) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BookRow>(
            r#"
            INSERT INTO books (title, author_id, summary, isbn, language_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, author_id, summary, isbn, language_id
            "#,
        )
        .bind(&input.title)
        .bind(input.author_id)
        .bind(&input.summary)
        .bind(&input.isbn)
        .bind(input.language_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, "Book"))?;

        Self::replace_genres(&mut tx, row.id, &input.genres).await?;
        tx.commit().await?;

        let mut genres = input.genres.clone();
        genres.sort_unstable();
        genres.dedup();
        Ok(row.with_genres(genres))
    }

    async fn update(&self, id: i32, input: &BookInput) -> AppResult<Option<Book>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BookRow>(
            r#"
            UPDATE books
            SET title = $1, author_id = $2, summary = $3, isbn = $4, language_id = $5
            WHERE id = $6
            RETURNING id, title, author_id, summary, isbn, language_id
            "#,
        )
        .bind(&input.title)
        .bind(input.author_id)
        .bind(&input.summary)
        .bind(&input.isbn)
        .bind(input.language_id)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_constraint_error(e, "Book"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Self::replace_genres(&mut tx, row.id, &input.genres).await?;
        tx.commit().await?;

        let mut genres = input.genres.clone();
        genres.sort_unstable();
        genres.dedup();
        Ok(Some(row.with_genres(genres)))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db) = &e {
                    if db.is_foreign_key_violation() {
                        return AppError::Conflict(format!("Book {} still has instances", id));
                    }
                }
                AppError::Database(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
