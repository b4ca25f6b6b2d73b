use std::sync::Arc;

use attendance_core::model::UserId;
use storage::repository::Storage;

use crate::Clock;
use crate::attendance_service::AttendanceService;
use crate::error::AppServicesError;
use crate::profile_service::ProfileService;
use crate::store::DashboardStore;
use crate::subject_service::SubjectService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    subjects: Arc<SubjectService>,
    attendance: Arc<AttendanceService>,
    profiles: Arc<ProfileService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if connecting or migrating fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over a fresh in-memory backend.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let subjects = Arc::new(SubjectService::new(clock, Arc::clone(&storage.subjects)));
        let attendance = Arc::new(AttendanceService::new(
            clock,
            Arc::clone(&storage.subjects),
            Arc::clone(&storage.attendance),
            Arc::clone(&storage.marks),
        ));
        let profiles = Arc::new(ProfileService::new(clock, Arc::clone(&storage.profiles)));
        Self {
            subjects,
            attendance,
            profiles,
        }
    }

    #[must_use]
    pub fn subjects(&self) -> Arc<SubjectService> {
        Arc::clone(&self.subjects)
    }

    #[must_use]
    pub fn attendance(&self) -> Arc<AttendanceService> {
        Arc::clone(&self.attendance)
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profiles)
    }

    /// A dashboard store for `user`, not yet loaded.
    #[must_use]
    pub fn dashboard(&self, user: UserId) -> DashboardStore {
        DashboardStore::new(user, self.subjects(), self.attendance(), self.profiles())
    }
}
