//! Mirrored users on PgStore

use super::PgStore;
use crate::{
    error::{AppError, AppResult},
    models::User,
};

impl PgStore {
    /// Get user by ID
    pub async fn users_get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT id, email, is_staff FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Insert the user or refresh email and staff flag
    pub async fn users_upsert(&self, user: &User) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, is_staff)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
                SET email = EXCLUDED.email, is_staff = EXCLUDED.is_staff
            RETURNING id, email, is_staff
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(user.is_staff)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}
