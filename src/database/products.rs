//! Store for the `products` table.
//!
//! Every read and mutation is owner-scoped: a row is only visible to the
//! user id that created it. Reads of another user's row report NotFound
//! rather than Forbidden so existence is not leaked; a full-replace update
//! distinguishes the two because the caller already proved the id exists.

use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Product, ProductPage};
use crate::validation::ProductForm;

const PRODUCT_COLUMNS: &str = "id, name, slug, price, description, image, user_id, created_at";

pub struct ProductStore;

impl ProductStore {
    /// Paginated, filtered listing ordered by creation time, newest first.
    ///
    /// `search` is an unanchored case-insensitive substring match on name.
    /// `total_count` reflects the full filtered row count so callers can
    /// compute page boundaries.
    pub async fn list(
        pool: &PgPool,
        page: u32,
        limit: u32,
        search: Option<&str>,
        owner_id: Option<Uuid>,
    ) -> Result<ProductPage, DatabaseError> {
        let page = page.max(1);
        let limit = limit.max(1);
        let offset = ((page - 1) as i64) * (limit as i64);

        // Empty search behaves like no search.
        let search = search.filter(|s| !s.is_empty());

        let select = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
               AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%') \
             ORDER BY created_at DESC \
             LIMIT $3 OFFSET $4"
        );
        let items = sqlx::query_as::<_, Product>(&select)
            .bind(owner_id)
            .bind(search)
            .bind(limit as i64)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let total_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products \
             WHERE ($1::uuid IS NULL OR user_id = $1) \
               AND ($2::text IS NULL OR name ILIKE '%' || $2 || '%')",
        )
        .bind(owner_id)
        .bind(search)
        .fetch_one(pool)
        .await?;

        Ok(ProductPage { items, total_count })
    }

    /// Fetch a single product visible to `owner_id`.
    pub async fn get_by_id(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<Product, DatabaseError> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Product {} not found", id)))
    }

    /// Insert a product owned by `owner_id`. Id and creation timestamp are
    /// assigned by the store.
    pub async fn insert(
        pool: &PgPool,
        form: &ProductForm,
        owner_id: Uuid,
    ) -> Result<Product, DatabaseError> {
        let query = format!(
            "INSERT INTO products (name, slug, price, description, image, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PRODUCT_COLUMNS}"
        );
        let product = sqlx::query_as::<_, Product>(&query)
            .bind(&form.name)
            .bind(&form.slug)
            .bind(form.price)
            .bind(&form.description)
            .bind(&form.image)
            .bind(owner_id)
            .fetch_one(pool)
            .await?;
        Ok(product)
    }

    /// Full replace of the mutable fields. Owner and creation timestamp are
    /// never touched.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        form: &ProductForm,
        owner_id: Uuid,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE products \
             SET name = $2, slug = $3, price = $4, description = $5, image = $6 \
             WHERE id = $1 AND user_id = $7",
        )
        .bind(id)
        .bind(&form.name)
        .bind(&form.slug)
        .bind(form.price)
        .bind(&form.description)
        .bind(&form.image)
        .bind(owner_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::classify_miss(pool, id).await?);
        }
        Ok(())
    }

    /// Delete a product. A second delete of the same id reports NotFound
    /// rather than succeeding silently.
    pub async fn delete(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Product {} not found", id)));
        }
        Ok(())
    }

    /// An owner-scoped write matched zero rows: either the row is gone or it
    /// belongs to someone else.
    async fn classify_miss(pool: &PgPool, id: Uuid) -> Result<DatabaseError, DatabaseError> {
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT user_id FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(match exists {
            Some(_) => DatabaseError::Forbidden("You do not own this product".to_string()),
            None => DatabaseError::NotFound(format!("Product {} not found", id)),
        })
    }
}
