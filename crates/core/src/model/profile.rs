use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

const MAX_USERNAME_CHARS: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("username must be at most 64 characters")]
    UsernameTooLong,

    #[error("username cannot contain whitespace")]
    UsernameWhitespace,
}

/// Editable profile fields as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub username: String,
    pub full_name: String,
}

impl ProfileDraft {
    #[must_use]
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            username: profile.username().unwrap_or_default().to_owned(),
            full_name: profile.full_name().unwrap_or_default().to_owned(),
        }
    }
}

/// Per-user profile; one row per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    user_id: UserId,
    username: Option<String>,
    full_name: Option<String>,
    avatar_url: Option<String>,
    updated_at: DateTime<Utc>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

impl Profile {
    /// An empty profile for a user that has not edited anything yet.
    #[must_use]
    pub fn empty(user_id: UserId, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            username: None,
            full_name: None,
            avatar_url: None,
            updated_at,
        }
    }

    #[must_use]
    pub fn from_persisted(
        user_id: UserId,
        username: Option<String>,
        full_name: Option<String>,
        avatar_url: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            username: non_blank(username),
            full_name: non_blank(full_name),
            avatar_url: non_blank(avatar_url),
            updated_at,
        }
    }

    /// Applies an edit; blank fields clear the stored value.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` if the username is too long or contains spaces.
    pub fn apply(&mut self, draft: ProfileDraft, now: DateTime<Utc>) -> Result<(), ProfileError> {
        let username = non_blank(Some(draft.username));
        if let Some(name) = &username {
            if name.chars().count() > MAX_USERNAME_CHARS {
                return Err(ProfileError::UsernameTooLong);
            }
            if name.chars().any(char::is_whitespace) {
                return Err(ProfileError::UsernameWhitespace);
            }
        }
        self.username = username;
        self.full_name = non_blank(Some(draft.full_name));
        self.updated_at = now;
        Ok(())
    }

    pub fn set_avatar_url(&mut self, avatar_url: Option<String>) {
        self.avatar_url = non_blank(avatar_url);
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.full_name.as_deref()
    }

    #[must_use]
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Name shown in headers: full name, then username, then "Student".
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("Student")
    }
}
