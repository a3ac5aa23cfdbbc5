use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::models::catalog::Category;

#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn roots(&self) -> Result<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, description, parent_id FROM categories WHERE parent_id IS NULL ORDER BY LOWER(name)",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch root categories")
    }

    pub async fn children(&self, parent_id: i64) -> Result<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, description, parent_id FROM categories WHERE parent_id = $1 ORDER BY LOWER(name)",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch subcategories")
    }

    pub async fn get(&self, id: i64) -> Result<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, description, parent_id FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch category")
    }

    pub async fn create(
        &self,
        name: &str,
        description: &str,
        parent_id: Option<i64>,
    ) -> Result<i64> {
        sqlx::query_scalar(
            "INSERT INTO categories (name, description, parent_id) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name.trim())
        .bind(description.trim())
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create category")
    }

    pub async fn update(
        &self,
        id: i64,
        name: &str,
        description: &str,
        parent_id: Option<i64>,
    ) -> Result<()> {
        sqlx::query("UPDATE categories SET name = $1, description = $2, parent_id = $3 WHERE id = $4")
            .bind(name.trim())
            .bind(description.trim())
            .bind(parent_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update category")?;
        Ok(())
    }

    /// Tariffs of the deleted category are detached, not removed.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE tariffs SET category_id = NULL WHERE category_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.context("Failed to delete category")?;
        Ok(())
    }

    /// Walks up from the proposed parent; assigning it must never reach the
    /// category itself. Depth-capped so a corrupt tree cannot loop forever.
    pub async fn would_create_cycle(&self, id: i64, new_parent: Option<i64>) -> Result<bool> {
        let mut cursor = match new_parent {
            Some(p) => p,
            None => return Ok(false),
        };
        for _ in 0..100 {
            if cursor == id {
                return Ok(true);
            }
            let parent: Option<Option<i64>> =
                sqlx::query_scalar("SELECT parent_id FROM categories WHERE id = $1")
                    .bind(cursor)
                    .fetch_optional(&self.pool)
                    .await
                    .context("Failed to walk category ancestors")?;
            match parent.flatten() {
                Some(next) => cursor = next,
                None => return Ok(false),
            }
        }
        // Ancestor chain deeper than the cap already means the tree is broken.
        Ok(true)
    }
}
