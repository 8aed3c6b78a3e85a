//! ProfileRepository - Repository per la tabella `profiles`

use crate::entities::Profile;
use sqlx::{Error, MySqlPool};
use tracing::{debug, instrument};

// PROFILE REPO
pub struct ProfileRepository {
    connection_pool: MySqlPool,
}

impl ProfileRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn read(&self, user_id: &i32) -> Result<Option<Profile>, Error> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id AS user_id, display_name, avatar_url
            FROM profiles
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await?;

        if profile.is_none() {
            debug!("Profile not found");
        }

        Ok(profile)
    }
}
