use async_trait::async_trait;
use attendance_core::model::{Profile, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_profile_row, user_id_to_text};
use crate::repository::{ProfileRepository, StorageError};

#[async_trait]
impl ProfileRepository for SqliteRepository {
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, username, full_name, avatar_url, updated_at
            FROM profiles
            WHERE user_id = ?1
            ",
        )
        .bind(user_id_to_text(user))
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO profiles (user_id, username, full_name, avatar_url, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO UPDATE SET
                username = excluded.username,
                full_name = excluded.full_name,
                avatar_url = excluded.avatar_url,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id_to_text(profile.user_id()))
        .bind(profile.username().map(str::to_owned))
        .bind(profile.full_name().map(str::to_owned))
        .bind(profile.avatar_url().map(str::to_owned))
        .bind(profile.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
