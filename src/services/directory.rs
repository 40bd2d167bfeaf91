use crate::{db::DbPool, error::AppError, models::user::User};

/// User lookup for the lifecycle engine and the passenger endpoints.
/// Driver capability is always computed from the stored profile, never
/// cached or persisted separately.
#[derive(Clone)]
pub struct UserDirectory {
    pool: DbPool,
}

impl UserDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, full_name, cin, governorate, phone, email, profile_image, \
             driver_license, vehicle_matricule, created_at \
             FROM users WHERE id = ?1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        user.ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn is_driver(&self, user_id: &str) -> Result<bool, AppError> {
        Ok(self.get(user_id).await?.is_driver())
    }
}
