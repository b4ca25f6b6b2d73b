use std::sync::Arc;

use attendance_core::model::{Subject, SubjectDraft, SubjectId, UserId};
use log::info;
use storage::repository::{StorageError, SubjectRepository};

use crate::Clock;
use crate::error::SubjectServiceError;

/// Orchestrates subject creation, edits, goals, and deletion.
#[derive(Clone)]
pub struct SubjectService {
    clock: Clock,
    subjects: Arc<dyn SubjectRepository>,
}

impl SubjectService {
    #[must_use]
    pub fn new(clock: Clock, subjects: Arc<dyn SubjectRepository>) -> Self {
        Self { clock, subjects }
    }

    /// Validate a draft and persist it as a new subject.
    ///
    /// Attended classes are clamped to the total before persistence.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Subject` for validation failures.
    /// Returns `SubjectServiceError::Storage` if persistence fails.
    pub async fn create_subject(
        &self,
        user: UserId,
        draft: SubjectDraft,
    ) -> Result<Subject, SubjectServiceError> {
        let subject = Subject::new(SubjectId::new(0), user, draft, self.clock.now())?;
        let id = self.subjects.insert_subject(&subject).await?;
        info!("event=subject_create module=services status=ok subject_id={id}");
        Ok(subject.with_id(id))
    }

    /// List a user's subjects ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Storage` if repository access fails.
    pub async fn list_subjects(&self, user: UserId) -> Result<Vec<Subject>, SubjectServiceError> {
        Ok(self.subjects.list_subjects(user).await?)
    }

    /// Fetch one subject, failing with `NotFound` when it is missing.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Storage` if missing or on repository failures.
    pub async fn get_subject(
        &self,
        user: UserId,
        id: SubjectId,
    ) -> Result<Subject, SubjectServiceError> {
        self.subjects
            .get_subject(user, id)
            .await?
            .ok_or(SubjectServiceError::Storage(StorageError::NotFound))
    }

    /// Replace name, counters, color, and goal of an existing subject.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Subject` if validation fails.
    /// Returns `SubjectServiceError::Storage` if repository access fails.
    pub async fn update_subject(
        &self,
        user: UserId,
        id: SubjectId,
        draft: SubjectDraft,
    ) -> Result<Subject, SubjectServiceError> {
        let mut subject = self.get_subject(user, id).await?;
        subject.apply_draft(draft)?;
        self.subjects.update_subject(&subject).await?;
        info!("event=subject_update module=services status=ok subject_id={id}");
        Ok(subject)
    }

    /// Set (or clear, with `None`) the attendance goal of a subject.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Subject` if the goal exceeds 100.
    /// Returns `SubjectServiceError::Storage` if repository access fails.
    pub async fn set_goal(
        &self,
        user: UserId,
        id: SubjectId,
        goal: Option<u8>,
    ) -> Result<Subject, SubjectServiceError> {
        let mut subject = self.get_subject(user, id).await?;
        subject.set_goal(goal)?;
        self.subjects.update_subject(&subject).await?;
        info!(
            "event=goal_update module=services status=ok subject_id={id} goal={}",
            subject.effective_goal()
        );
        Ok(subject)
    }

    /// Delete a subject; its attendance records go with it.
    ///
    /// # Errors
    ///
    /// Returns `SubjectServiceError::Storage` if missing or on repository failures.
    pub async fn delete_subject(
        &self,
        user: UserId,
        id: SubjectId,
    ) -> Result<(), SubjectServiceError> {
        self.subjects.delete_subject(user, id).await?;
        info!("event=subject_delete module=services status=ok subject_id={id}");
        Ok(())
    }
}
