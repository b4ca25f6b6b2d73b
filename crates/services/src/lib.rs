#![forbid(unsafe_code)]

pub mod app_services;
pub mod attendance_service;
pub mod edit;
pub mod error;
pub mod profile_service;
pub mod store;
pub mod subject_service;

pub use attendance_core::Clock;

pub use app_services::AppServices;
pub use attendance_service::{AttendanceService, MarkOutcome};
pub use edit::EditMode;
pub use error::{
    AppServicesError, AttendanceServiceError, ProfileServiceError, StoreError, SubjectServiceError,
};
pub use profile_service::ProfileService;
pub use store::{DashboardStore, Notification, NotificationKind};
pub use subject_service::SubjectService;
