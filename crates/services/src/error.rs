//! Shared error types for the services crate.

use thiserror::Error;

use attendance_core::model::{ProfileError, SubjectError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `SubjectService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubjectServiceError {
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AttendanceService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttendanceServiceError {
    #[error("invalid calendar month {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileServiceError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardStore` mutations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("no edit in progress")]
    NotEditing,
    #[error("subject {0} is not loaded")]
    UnknownSubject(attendance_core::model::SubjectId),
    #[error(transparent)]
    Subject(#[from] SubjectServiceError),
    #[error(transparent)]
    Attendance(#[from] AttendanceServiceError),
    #[error(transparent)]
    Profile(#[from] ProfileServiceError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
