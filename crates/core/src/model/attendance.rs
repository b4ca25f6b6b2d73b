use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{RecordId, SubjectId, UserId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid attendance status: {0}")]
pub struct ParseStatusError(String);

//
// ─── STATUS ───────────────────────────────────────────────────────────────────
//

/// Outcome of a single class for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    #[must_use]
    pub fn is_present(self) -> bool {
        matches!(self, Self::Present)
    }

    /// Storage and wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Absent => "Absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" | "p" => Ok(Self::Present),
            "absent" | "a" => Ok(Self::Absent),
            other => Err(ParseStatusError(other.to_owned())),
        }
    }
}

//
// ─── RECORDS ──────────────────────────────────────────────────────────────────
//

/// A mark not yet persisted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendanceRecord {
    pub user_id: UserId,
    pub subject_id: SubjectId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
}

impl NewAttendanceRecord {
    #[must_use]
    pub fn into_record(self, id: RecordId) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id: self.user_id,
            subject_id: self.subject_id,
            date: self.date,
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// One present/absent event for a subject on a date.
///
/// Records are append-only; several may exist for the same subject and day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub subject_id: SubjectId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
}
