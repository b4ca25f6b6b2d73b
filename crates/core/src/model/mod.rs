mod attendance;
mod ids;
mod profile;
mod subject;

pub use ids::{ParseIdError, RecordId, SubjectId, UserId};

pub use attendance::{AttendanceRecord, AttendanceStatus, NewAttendanceRecord, ParseStatusError};
pub use profile::{Profile, ProfileDraft, ProfileError};
pub use subject::{
    COLOR_PALETTE, DEFAULT_ATTENDANCE_GOAL, ManualCounts, Subject, SubjectDraft, SubjectError, palette_color,
};
