//! View-facing store for the dashboard.
//!
//! The top-level view owns one `DashboardStore`; child views read subjects and
//! derived stats from it and call its mutation methods. Every mutation is one
//! awaited round trip. Local state only changes after the store confirms, and
//! is then refreshed from the backend.

use std::collections::HashMap;
use std::sync::Arc;

use attendance_core::model::{
    AttendanceStatus, Profile, ProfileDraft, Subject, SubjectDraft, SubjectId, UserId,
};
use attendance_core::reports::{AnalyticsReport, DayTally};
use attendance_core::stats::{AttendanceSummary, GoalProjection, StatusThresholds, aggregate};
use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::attendance_service::{AttendanceService, MarkOutcome};
use crate::edit::EditMode;
use crate::error::{AttendanceServiceError, StoreError};
use crate::profile_service::ProfileService;
use crate::subject_service::SubjectService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// A user-visible toast produced by a store operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    fn success(title: &str, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.to_owned(),
            message: message.into(),
        }
    }

    fn error(title: &str, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            title: title.to_owned(),
            message: message.into(),
        }
    }
}

pub struct DashboardStore {
    user: UserId,
    subject_service: Arc<SubjectService>,
    attendance_service: Arc<AttendanceService>,
    profile_service: Arc<ProfileService>,
    thresholds: StatusThresholds,
    subjects: Vec<Subject>,
    profile: Option<Profile>,
    goal_edits: HashMap<SubjectId, EditMode<u8>>,
    profile_edit: EditMode<ProfileDraft>,
    notifications: Vec<Notification>,
}

impl DashboardStore {
    #[must_use]
    pub fn new(
        user: UserId,
        subject_service: Arc<SubjectService>,
        attendance_service: Arc<AttendanceService>,
        profile_service: Arc<ProfileService>,
    ) -> Self {
        Self {
            user,
            subject_service,
            attendance_service,
            profile_service,
            thresholds: StatusThresholds::default(),
            subjects: Vec::new(),
            profile: None,
            goal_edits: HashMap::new(),
            profile_edit: EditMode::Viewing,
            notifications: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: StatusThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    // ─── Reads ─────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    #[must_use]
    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    #[must_use]
    pub fn subject(&self, id: SubjectId) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id() == id)
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn thresholds(&self) -> &StatusThresholds {
        &self.thresholds
    }

    #[must_use]
    pub fn summary(&self) -> AttendanceSummary {
        aggregate(&self.subjects)
    }

    #[must_use]
    pub fn projection(&self, id: SubjectId) -> Option<GoalProjection> {
        self.subject(id)
            .map(|s| GoalProjection::for_subject(s, &self.thresholds))
    }

    #[must_use]
    pub fn report(&self) -> AnalyticsReport {
        AnalyticsReport::build(&self.subjects)
    }

    /// Drain pending notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ─── Loading ───────────────────────────────────────────────────────────────

    /// Load subjects and profile from the backend.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if either read fails; cached state is kept.
    pub async fn load(&mut self) -> Result<(), StoreError> {
        let subjects = match self.subject_service.list_subjects(self.user).await {
            Ok(subjects) => subjects,
            Err(err) => return Err(self.fail("Error loading subjects", err.into())),
        };
        let profile = match self.profile_service.load(self.user).await {
            Ok(profile) => profile,
            Err(err) => return Err(self.fail("Error loading profile", err.into())),
        };
        self.subjects = subjects;
        self.profile = Some(profile);
        Ok(())
    }

    /// Re-read subjects after a confirmed mutation. A failed re-read keeps
    /// the locally patched cache.
    async fn refresh(&mut self) {
        match self.subject_service.list_subjects(self.user).await {
            Ok(subjects) => self.subjects = subjects,
            Err(err) => warn!("event=store_refresh module=services status=error error={err}"),
        }
    }

    fn fail(&mut self, title: &str, err: StoreError) -> StoreError {
        warn!("event=store_mutation module=services status=error title=\"{title}\" error={err}");
        self.notifications.push(Notification::error(title, err.to_string()));
        err
    }

    fn patch(&mut self, subject: Subject) {
        match self.subjects.iter_mut().find(|s| s.id() == subject.id()) {
            Some(slot) => *slot = subject,
            None => self.subjects.push(subject),
        }
    }

    // ─── Subject mutations ─────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `StoreError` on validation or storage failure; local state is unchanged.
    pub async fn add_subject(&mut self, draft: SubjectDraft) -> Result<SubjectId, StoreError> {
        match self.subject_service.create_subject(self.user, draft).await {
            Ok(subject) => {
                let id = subject.id();
                self.notifications.push(Notification::success(
                    "Subject added",
                    format!("{} is now being tracked", subject.name()),
                ));
                self.patch(subject);
                self.refresh().await;
                Ok(id)
            }
            Err(err) => Err(self.fail("Error adding subject", err.into())),
        }
    }

    /// # Errors
    ///
    /// Returns `StoreError` on validation or storage failure; local state is unchanged.
    pub async fn update_subject(
        &mut self,
        id: SubjectId,
        draft: SubjectDraft,
    ) -> Result<(), StoreError> {
        match self.subject_service.update_subject(self.user, id, draft).await {
            Ok(subject) => {
                self.notifications.push(Notification::success(
                    "Subject updated",
                    format!("{} was saved", subject.name()),
                ));
                self.patch(subject);
                self.refresh().await;
                Ok(())
            }
            Err(err) => Err(self.fail("Error updating subject", err.into())),
        }
    }

    /// # Errors
    ///
    /// Returns `StoreError` on storage failure; local state is unchanged.
    pub async fn delete_subject(&mut self, id: SubjectId) -> Result<(), StoreError> {
        match self.subject_service.delete_subject(self.user, id).await {
            Ok(()) => {
                let name = self
                    .subject(id)
                    .map_or_else(|| id.to_string(), |s| s.name().to_owned());
                self.subjects.retain(|s| s.id() != id);
                self.goal_edits.remove(&id);
                self.notifications
                    .push(Notification::success("Subject deleted", format!("{name} was removed")));
                self.refresh().await;
                Ok(())
            }
            Err(err) => Err(self.fail("Error deleting subject", err.into())),
        }
    }

    /// Mark today's class for a subject.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage failure; local state is unchanged.
    pub async fn mark_attendance(
        &mut self,
        id: SubjectId,
        status: AttendanceStatus,
    ) -> Result<(), StoreError> {
        let result = self.attendance_service.mark(self.user, id, status).await;
        self.finish_mark(status, result).await
    }

    /// Mark a class held on an explicit date.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage failure; local state is unchanged.
    pub async fn mark_attendance_on(
        &mut self,
        id: SubjectId,
        status: AttendanceStatus,
        date: NaiveDate,
    ) -> Result<(), StoreError> {
        let result = self
            .attendance_service
            .mark_on(self.user, id, status, date)
            .await;
        self.finish_mark(status, result).await
    }

    async fn finish_mark(
        &mut self,
        status: AttendanceStatus,
        result: Result<MarkOutcome, AttendanceServiceError>,
    ) -> Result<(), StoreError> {
        match result {
            Ok(outcome) => {
                self.notifications.push(Notification::success(
                    "Attendance Marked",
                    format!("Marked {} for {}", status.label(), outcome.subject.name()),
                ));
                self.patch(outcome.subject);
                self.refresh().await;
                Ok(())
            }
            Err(err) => Err(self.fail("Error marking attendance", err.into())),
        }
    }

    /// # Errors
    ///
    /// Returns `StoreError` on validation or storage failure; local state is unchanged.
    pub async fn set_goal(&mut self, id: SubjectId, goal: Option<u8>) -> Result<(), StoreError> {
        match self.subject_service.set_goal(self.user, id, goal).await {
            Ok(subject) => {
                self.notifications.push(Notification::success(
                    "Goal updated",
                    format!("{} goal set to {}%", subject.name(), subject.effective_goal()),
                ));
                self.patch(subject);
                self.refresh().await;
                Ok(())
            }
            Err(err) => Err(self.fail("Error updating goal", err.into())),
        }
    }

    /// Rebuild a subject's counters from its manual counts and records.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage failure; local state is unchanged.
    pub async fn recount(&mut self, id: SubjectId) -> Result<(), StoreError> {
        match self.attendance_service.recount(self.user, id).await {
            Ok(subject) => {
                self.notifications.push(Notification::success(
                    "Attendance recounted",
                    format!(
                        "{}: {}/{} classes",
                        subject.name(),
                        subject.attended_classes(),
                        subject.total_classes()
                    ),
                ));
                self.patch(subject);
                self.refresh().await;
                Ok(())
            }
            Err(err) => Err(self.fail("Error recounting attendance", err.into())),
        }
    }

    /// Calendar month view built from the attendance log.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on invalid month or storage failure.
    pub async fn calendar(&mut self, year: i32, month: u32) -> Result<Vec<DayTally>, StoreError> {
        match self.attendance_service.month(self.user, year, month).await {
            Ok(days) => Ok(days),
            Err(err) => Err(self.fail("Error loading calendar", err.into())),
        }
    }

    // ─── Goal editing ──────────────────────────────────────────────────────────

    /// Current goal editor state for a subject.
    #[must_use]
    pub fn goal_edit(&self, id: SubjectId) -> Option<u8> {
        self.goal_edits.get(&id).and_then(|m| m.draft().copied())
    }

    /// Start editing a subject's goal, seeded with its effective goal.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnknownSubject` if the subject is not loaded.
    pub fn begin_goal_edit(&mut self, id: SubjectId) -> Result<(), StoreError> {
        let goal = self
            .subject(id)
            .map(Subject::effective_goal)
            .ok_or(StoreError::UnknownSubject(id))?;
        self.goal_edits.entry(id).or_default().begin(goal);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StoreError::NotEditing` if no goal edit is open for `id`.
    pub fn set_goal_draft(&mut self, id: SubjectId, goal: u8) -> Result<(), StoreError> {
        let draft = self
            .goal_edits
            .get_mut(&id)
            .and_then(EditMode::draft_mut)
            .ok_or(StoreError::NotEditing)?;
        *draft = goal;
        Ok(())
    }

    pub fn cancel_goal_edit(&mut self, id: SubjectId) {
        self.goal_edits.remove(&id);
    }

    /// Persist the open goal draft. On failure the editor stays open with
    /// the draft intact.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotEditing` if nothing is being edited, or the
    /// error of the underlying save.
    pub async fn save_goal_edit(&mut self, id: SubjectId) -> Result<(), StoreError> {
        let goal = self.goal_edit(id).ok_or(StoreError::NotEditing)?;
        self.set_goal(id, Some(goal)).await?;
        self.goal_edits.remove(&id);
        Ok(())
    }

    // ─── Profile editing ───────────────────────────────────────────────────────

    #[must_use]
    pub fn profile_edit(&self) -> &EditMode<ProfileDraft> {
        &self.profile_edit
    }

    /// Start editing the profile, seeded from the loaded profile.
    pub fn begin_profile_edit(&mut self) {
        let draft = self
            .profile
            .as_ref()
            .map(ProfileDraft::from_profile)
            .unwrap_or_default();
        self.profile_edit.begin(draft);
    }

    pub fn profile_draft_mut(&mut self) -> Option<&mut ProfileDraft> {
        self.profile_edit.draft_mut()
    }

    pub fn cancel_profile_edit(&mut self) {
        self.profile_edit.cancel();
    }

    /// Persist the open profile draft. On failure the editor stays open.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotEditing` if nothing is being edited, or the
    /// error of the underlying save.
    pub async fn save_profile_edit(&mut self) -> Result<(), StoreError> {
        let draft = self.profile_edit.take().ok_or(StoreError::NotEditing)?;
        match self.profile_service.save(self.user, draft.clone()).await {
            Ok(profile) => {
                self.profile = Some(profile);
                self.notifications.push(Notification::success(
                    "Profile updated",
                    "Your profile has been updated successfully.",
                ));
                Ok(())
            }
            Err(err) => {
                self.profile_edit.begin(draft);
                Err(self.fail("Error updating profile", err.into()))
            }
        }
    }

    /// Replace or clear the avatar link outside the profile editor.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` on storage failure; the cached profile is unchanged.
    pub async fn set_avatar(&mut self, avatar_url: Option<String>) -> Result<(), StoreError> {
        match self.profile_service.set_avatar(self.user, avatar_url).await {
            Ok(profile) => {
                let message = match profile.avatar_url() {
                    Some(url) => format!("Avatar set to {url}"),
                    None => "Avatar removed".to_owned(),
                };
                self.profile = Some(profile);
                self.notifications
                    .push(Notification::success("Avatar updated", message));
                Ok(())
            }
            Err(err) => Err(self.fail("Error updating avatar", err.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use attendance_core::stats::GoalStatus;
    use attendance_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, Storage};

    use crate::Clock;

    fn store_over(repo: &InMemoryRepository) -> DashboardStore {
        let storage = Storage::from_memory(repo);
        let clock = Clock::Fixed(fixed_now());
        DashboardStore::new(
            UserId::generate(),
            Arc::new(SubjectService::new(clock, Arc::clone(&storage.subjects))),
            Arc::new(AttendanceService::new(
                clock,
                Arc::clone(&storage.subjects),
                Arc::clone(&storage.attendance),
                Arc::clone(&storage.marks),
            )),
            Arc::new(ProfileService::new(clock, Arc::clone(&storage.profiles))),
        )
    }

    #[tokio::test]
    async fn empty_store_has_no_data_summary() {
        let mut store = store_over(&InMemoryRepository::new());
        store.load().await.unwrap();
        assert!(store.subjects().is_empty());
        assert_eq!(store.summary().overall_pct, None);
        assert_eq!(store.profile().map(Profile::display_name), Some("Student"));
    }

    #[tokio::test]
    async fn mark_attendance_updates_cache_and_notifies() {
        let mut store = store_over(&InMemoryRepository::new());
        let id = store
            .add_subject(SubjectDraft::named("Mathematics").with_counts(45, 42))
            .await
            .unwrap();

        store
            .mark_attendance(id, AttendanceStatus::Present)
            .await
            .unwrap();

        let subject = store.subject(id).unwrap();
        assert_eq!(subject.attended_classes(), 43);
        assert_eq!(subject.total_classes(), 46);
        let notes = store.take_notifications();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[1].title, "Attendance Marked");
        assert_eq!(notes[1].message, "Marked Present for Mathematics");
        assert!(store.take_notifications().is_empty());
    }

    #[tokio::test]
    async fn failed_mutation_keeps_state_and_reports_error() {
        let repo = InMemoryRepository::new();
        let mut store = store_over(&repo);
        let id = store
            .add_subject(SubjectDraft::named("Physics").with_counts(40, 35))
            .await
            .unwrap();
        store.take_notifications();

        repo.set_unavailable(true);
        let result = store.mark_attendance(id, AttendanceStatus::Absent).await;
        repo.set_unavailable(false);

        assert!(result.is_err());
        assert_eq!(store.subject(id).unwrap().total_classes(), 40);
        let notes = store.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn invalid_subject_is_rejected_without_side_effects() {
        let mut store = store_over(&InMemoryRepository::new());
        assert!(store.add_subject(SubjectDraft::named("  ")).await.is_err());
        assert!(store.subjects().is_empty());
        assert_eq!(store.take_notifications()[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn goal_edit_cycle_persists_goal() {
        let mut store = store_over(&InMemoryRepository::new());
        let id = store
            .add_subject(SubjectDraft::named("Chemistry").with_counts(38, 30))
            .await
            .unwrap();

        store.begin_goal_edit(id).unwrap();
        assert_eq!(store.goal_edit(id), Some(75));
        store.set_goal_draft(id, 85).unwrap();
        store.save_goal_edit(id).await.unwrap();

        assert_eq!(store.goal_edit(id), None);
        let projection = store.projection(id).unwrap();
        assert_eq!(projection.goal, 85);
        assert_eq!(projection.classes_needed, 16);
        assert!(matches!(
            store.save_goal_edit(id).await,
            Err(StoreError::NotEditing)
        ));
    }

    #[tokio::test]
    async fn invalid_goal_keeps_editor_open() {
        let mut store = store_over(&InMemoryRepository::new());
        let id = store
            .add_subject(SubjectDraft::named("History"))
            .await
            .unwrap();

        store.begin_goal_edit(id).unwrap();
        store.set_goal_draft(id, 140).unwrap();
        assert!(store.save_goal_edit(id).await.is_err());
        assert_eq!(store.goal_edit(id), Some(140));

        store.cancel_goal_edit(id);
        assert_eq!(store.goal_edit(id), None);
    }

    #[tokio::test]
    async fn delete_drops_subject_from_summary() {
        let mut store = store_over(&InMemoryRepository::new());
        let keep = store
            .add_subject(SubjectDraft::named("English").with_counts(10, 10))
            .await
            .unwrap();
        let drop = store
            .add_subject(SubjectDraft::named("Art").with_counts(10, 0))
            .await
            .unwrap();
        store.mark_attendance(drop, AttendanceStatus::Absent).await.unwrap();

        store.delete_subject(drop).await.unwrap();

        assert!(store.subject(drop).is_none());
        assert!(store.subject(keep).is_some());
        let summary = store.summary();
        assert_eq!(summary.total_classes, 10);
        assert_eq!(summary.overall_pct, Some(100.0));
    }

    #[tokio::test]
    async fn profile_edit_cycle() {
        let mut store = store_over(&InMemoryRepository::new());
        store.load().await.unwrap();

        store.begin_profile_edit();
        assert!(store.profile_edit().is_editing());
        if let Some(draft) = store.profile_draft_mut() {
            draft.full_name = "Katherine Johnson".into();
        }
        store.save_profile_edit().await.unwrap();

        assert!(!store.profile_edit().is_editing());
        assert_eq!(
            store.profile().map(Profile::display_name),
            Some("Katherine Johnson")
        );
    }

    #[tokio::test]
    async fn rejected_profile_keeps_draft_open() {
        let mut store = crate::AppServices::in_memory(Clock::Fixed(fixed_now()))
            .dashboard(UserId::generate());
        store.load().await.unwrap();

        store.begin_profile_edit();
        if let Some(draft) = store.profile_draft_mut() {
            draft.username = "two words".into();
        }
        assert!(store.save_profile_edit().await.is_err());

        assert_eq!(
            store.profile_edit().draft().map(|d| d.username.as_str()),
            Some("two words")
        );
        assert_eq!(store.profile().and_then(Profile::username), None);
        assert_eq!(store.take_notifications()[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn avatar_updates_profile_and_notifies() {
        let repo = InMemoryRepository::new();
        let mut store = store_over(&repo);
        store.load().await.unwrap();

        store
            .set_avatar(Some("https://example.org/me.png".into()))
            .await
            .unwrap();
        assert_eq!(
            store.profile().and_then(Profile::avatar_url),
            Some("https://example.org/me.png")
        );
        let notes = store.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Avatar updated");

        repo.set_unavailable(true);
        assert!(store.set_avatar(None).await.is_err());
        repo.set_unavailable(false);
        assert_eq!(
            store.profile().and_then(Profile::avatar_url),
            Some("https://example.org/me.png")
        );
        assert_eq!(store.take_notifications()[0].kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn recount_notifies_with_new_counters() {
        let mut store = store_over(&InMemoryRepository::new());
        let id = store
            .add_subject(SubjectDraft::named("Biology").with_counts(30, 30))
            .await
            .unwrap();
        store.mark_attendance(id, AttendanceStatus::Absent).await.unwrap();
        store.take_notifications();

        store.recount(id).await.unwrap();
        let notes = store.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Success);
        assert_eq!(notes[0].message, "Biology: 30/31 classes");
    }

    #[tokio::test]
    async fn custom_thresholds_change_goal_status() {
        let strict = StatusThresholds {
            on_track_band: 2.0,
            ..StatusThresholds::default()
        };
        let mut store = store_over(&InMemoryRepository::new()).with_thresholds(strict);
        let id = store
            .add_subject(SubjectDraft::named("Chemistry").with_counts(38, 30).with_goal(85))
            .await
            .unwrap();

        assert_eq!(store.thresholds(), &strict);
        assert_eq!(store.projection(id).unwrap().status, GoalStatus::AtRisk);

        let lenient = store_over(&InMemoryRepository::new());
        let chemistry = store.subject(id).unwrap();
        assert_eq!(
            GoalProjection::for_subject(chemistry, lenient.thresholds()).status,
            GoalStatus::OnTrack
        );
    }
}
