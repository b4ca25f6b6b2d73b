use async_trait::async_trait;
use attendance_core::model::{
    AttendanceRecord, NewAttendanceRecord, Profile, RecordId, Subject, SubjectId, UserId,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for subjects, scoped by owning user.
#[async_trait]
pub trait SubjectRepository: Send + Sync {
    /// Insert a new subject and return the store-assigned id.
    ///
    /// The id carried by `subject` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subject cannot be stored.
    async fn insert_subject(&self, subject: &Subject) -> Result<SubjectId, StorageError>;

    /// Fetch a subject owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_subject(
        &self,
        user: UserId,
        id: SubjectId,
    ) -> Result<Option<Subject>, StorageError>;

    /// List all subjects of a user ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_subjects(&self, user: UserId) -> Result<Vec<Subject>, StorageError>;

    /// Overwrite a stored subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such subject exists for its user.
    async fn update_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    /// Delete a subject together with its attendance records.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no such subject exists for `user`.
    async fn delete_subject(&self, user: UserId, id: SubjectId) -> Result<(), StorageError>;
}

/// Repository contract for the append-only attendance log.
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn append_record(&self, record: NewAttendanceRecord) -> Result<RecordId, StorageError>;

    /// Records of one subject, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn records_for_subject(
        &self,
        user: UserId,
        subject: SubjectId,
    ) -> Result<Vec<AttendanceRecord>, StorageError>;

    /// Records of a user dated within `from..=to`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn records_between(
        &self,
        user: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StorageError>;
}

/// Writes a marked subject and its new record as one unit.
#[async_trait]
pub trait AttendancePersistence: Send + Sync {
    /// Persist the updated counters of `subject` and append `record`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the record does not belong to the
    /// subject, `StorageError::NotFound` if the subject is gone, or other
    /// storage errors. Nothing is written on error.
    async fn apply_mark(
        &self,
        subject: &Subject,
        record: NewAttendanceRecord,
    ) -> Result<RecordId, StorageError>;
}

/// Repository contract for user profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError>;
}

fn mark_matches(subject: &Subject, record: &NewAttendanceRecord) -> bool {
    record.subject_id == subject.id() && record.user_id == subject.user_id()
}

#[derive(Default)]
struct MemoryState {
    next_subject_id: u64,
    next_record_id: u64,
    subjects: BTreeMap<SubjectId, Subject>,
    records: Vec<AttendanceRecord>,
    profiles: HashMap<UserId, Profile>,
}

impl MemoryState {
    fn owned_subject_mut(&mut self, user: UserId, id: SubjectId) -> Option<&mut Subject> {
        self.subjects.get_mut(&id).filter(|s| s.user_id() == user)
    }

    fn push_record(&mut self, record: NewAttendanceRecord) -> RecordId {
        self.next_record_id += 1;
        let id = RecordId::new(self.next_record_id);
        self.records.push(record.into_record(id));
        id
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable backend: every call fails with
    /// `StorageError::Connection` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("store unavailable".into()));
        }
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl SubjectRepository for InMemoryRepository {
    async fn insert_subject(&self, subject: &Subject) -> Result<SubjectId, StorageError> {
        let mut guard = self.lock()?;
        guard.next_subject_id += 1;
        let id = SubjectId::new(guard.next_subject_id);
        guard.subjects.insert(id, subject.clone().with_id(id));
        Ok(id)
    }

    async fn get_subject(
        &self,
        user: UserId,
        id: SubjectId,
    ) -> Result<Option<Subject>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .subjects
            .get(&id)
            .filter(|s| s.user_id() == user)
            .cloned())
    }

    async fn list_subjects(&self, user: UserId) -> Result<Vec<Subject>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .subjects
            .values()
            .filter(|s| s.user_id() == user)
            .cloned()
            .collect())
    }

    async fn update_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let stored = guard
            .owned_subject_mut(subject.user_id(), subject.id())
            .ok_or(StorageError::NotFound)?;
        *stored = subject.clone();
        Ok(())
    }

    async fn delete_subject(&self, user: UserId, id: SubjectId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.owned_subject_mut(user, id).is_none() {
            return Err(StorageError::NotFound);
        }
        guard.subjects.remove(&id);
        guard.records.retain(|r| r.subject_id != id);
        Ok(())
    }
}

#[async_trait]
impl AttendanceRepository for InMemoryRepository {
    async fn append_record(&self, record: NewAttendanceRecord) -> Result<RecordId, StorageError> {
        let mut guard = self.lock()?;
        if guard
            .owned_subject_mut(record.user_id, record.subject_id)
            .is_none()
        {
            return Err(StorageError::NotFound);
        }
        Ok(guard.push_record(record))
    }

    async fn records_for_subject(
        &self,
        user: UserId,
        subject: SubjectId,
    ) -> Result<Vec<AttendanceRecord>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<AttendanceRecord> = guard
            .records
            .iter()
            .filter(|r| r.user_id == user && r.subject_id == subject)
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.date, r.id));
        Ok(out)
    }

    async fn records_between(
        &self,
        user: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<AttendanceRecord> = guard
            .records
            .iter()
            .filter(|r| r.user_id == user && (from..=to).contains(&r.date))
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.date, r.id));
        Ok(out)
    }
}

#[async_trait]
impl AttendancePersistence for InMemoryRepository {
    async fn apply_mark(
        &self,
        subject: &Subject,
        record: NewAttendanceRecord,
    ) -> Result<RecordId, StorageError> {
        if !mark_matches(subject, &record) {
            return Err(StorageError::Conflict);
        }
        let mut guard = self.lock()?;
        let stored = guard
            .owned_subject_mut(subject.user_id(), subject.id())
            .ok_or(StorageError::NotFound)?;
        *stored = subject.clone();
        Ok(guard.push_record(record))
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.profiles.get(&user).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.profiles.insert(profile.user_id(), profile.clone());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub subjects: Arc<dyn SubjectRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
    pub marks: Arc<dyn AttendancePersistence>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_memory(&InMemoryRepository::new())
    }

    /// Wrap an existing in-memory repository, keeping a handle for tests.
    #[must_use]
    pub fn from_memory(repo: &InMemoryRepository) -> Self {
        let subjects: Arc<dyn SubjectRepository> = Arc::new(repo.clone());
        let attendance: Arc<dyn AttendanceRepository> = Arc::new(repo.clone());
        let marks: Arc<dyn AttendancePersistence> = Arc::new(repo.clone());
        let profiles: Arc<dyn ProfileRepository> = Arc::new(repo.clone());
        Self {
            subjects,
            attendance,
            marks,
            profiles,
        }
    }
}
