use std::sync::Arc;

use attendance_core::model::{Profile, ProfileDraft, UserId};
use log::info;
use storage::repository::ProfileRepository;

use crate::Clock;
use crate::error::ProfileServiceError;

#[derive(Clone)]
pub struct ProfileService {
    clock: Clock,
    repo: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn ProfileRepository>) -> Self {
        Self { clock, repo }
    }

    /// Load the user's profile (or an empty one if never saved).
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError` on storage failures.
    pub async fn load(&self, user: UserId) -> Result<Profile, ProfileServiceError> {
        let profile = self.repo.get_profile(user).await?;
        Ok(profile.unwrap_or_else(|| Profile::empty(user, self.clock.now())))
    }

    /// Validate and persist profile edits.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError` if validation fails or persistence fails.
    pub async fn save(
        &self,
        user: UserId,
        draft: ProfileDraft,
    ) -> Result<Profile, ProfileServiceError> {
        let mut profile = self.load(user).await?;
        profile.apply(draft, self.clock.now())?;
        self.repo.upsert_profile(&profile).await?;
        info!("event=profile_update module=services status=ok");
        Ok(profile)
    }

    /// Replace the avatar reference.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError` on storage failures.
    pub async fn set_avatar(
        &self,
        user: UserId,
        avatar_url: Option<String>,
    ) -> Result<Profile, ProfileServiceError> {
        let mut profile = self.load(user).await?;
        profile.set_avatar_url(avatar_url);
        self.repo.upsert_profile(&profile).await?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use attendance_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn load_defaults_to_empty_profile() {
        let service = ProfileService::new(Clock::Fixed(fixed_now()), Arc::new(InMemoryRepository::new()));
        let profile = service.load(UserId::generate()).await.unwrap();
        assert_eq!(profile.username(), None);
        assert_eq!(profile.display_name(), "Student");
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let service = ProfileService::new(Clock::Fixed(fixed_now()), Arc::new(InMemoryRepository::new()));
        let user = UserId::generate();
        service
            .save(
                user,
                ProfileDraft {
                    username: "grace".into(),
                    full_name: "Grace Hopper".into(),
                },
            )
            .await
            .unwrap();
        service
            .set_avatar(user, Some("avatars/grace.png".into()))
            .await
            .unwrap();

        let profile = service.load(user).await.unwrap();
        assert_eq!(profile.full_name(), Some("Grace Hopper"));
        assert_eq!(profile.avatar_url(), Some("avatars/grace.png"));
    }
}
