//! Store for the `users` table: the persistence side of the identity provider.

use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::User;

const USER_COLUMNS: &str = "id, email, display_name, password_hash, created_at";

pub struct UserStore;

impl UserStore {
    /// Insert a new user. A duplicate email surfaces as [`DatabaseError::Conflict`].
    pub async fn insert(
        pool: &PgPool,
        email: &str,
        display_name: Option<&str>,
        password_hash: &str,
    ) -> Result<User, DatabaseError> {
        let query = format!(
            "INSERT INTO users (email, display_name, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .bind(display_name)
            .bind(password_hash)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return DatabaseError::Conflict(
                            "An account with this email already exists".to_string(),
                        );
                    }
                }
                DatabaseError::Sqlx(e)
            })
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }
}
