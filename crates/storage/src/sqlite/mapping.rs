use attendance_core::model::{
    AttendanceRecord, AttendanceStatus, ManualCounts, Profile, RecordId, Subject, SubjectId,
    UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn subject_id_from_i64(v: i64) -> Result<SubjectId, StorageError> {
    Ok(SubjectId::new(i64_to_u64("subject_id", v)?))
}

pub(crate) fn record_id_from_i64(v: i64) -> Result<RecordId, StorageError> {
    Ok(RecordId::new(i64_to_u64("record_id", v)?))
}

/// User ids are stored as hyphenated UUID text.
pub(crate) fn user_id_to_text(user: UserId) -> String {
    user.value().hyphenated().to_string()
}

pub(crate) fn user_id_from_text(raw: &str) -> Result<UserId, StorageError> {
    raw.parse::<UserId>().map_err(ser)
}

pub(crate) fn parse_status(s: &str) -> Result<AttendanceStatus, StorageError> {
    match s {
        "present" => Ok(AttendanceStatus::Present),
        "absent" => Ok(AttendanceStatus::Absent),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

pub(crate) fn map_subject_row(row: &SqliteRow) -> Result<Subject, StorageError> {
    let goal = row
        .try_get::<Option<i64>, _>("attendance_goal")
        .map_err(ser)?
        .map(|g| {
            u8::try_from(g).map_err(|_| StorageError::Serialization(format!("invalid goal: {g}")))
        })
        .transpose()?;

    Subject::from_persisted(
        subject_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_text(&row.try_get::<String, _>("user_id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        i64_to_u32("total_classes", row.try_get("total_classes").map_err(ser)?)?,
        i64_to_u32("attended_classes", row.try_get("attended_classes").map_err(ser)?)?,
        row.try_get::<String, _>("color").map_err(ser)?,
        row.try_get("last_attended").map_err(ser)?,
        goal,
        ManualCounts {
            total: i64_to_u32("manual_total", row.try_get("manual_total").map_err(ser)?)?,
            attended: i64_to_u32("manual_attended", row.try_get("manual_attended").map_err(ser)?)?,
        },
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_record_row(row: &SqliteRow) -> Result<AttendanceRecord, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    Ok(AttendanceRecord {
        id: record_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id: user_id_from_text(&row.try_get::<String, _>("user_id").map_err(ser)?)?,
        subject_id: subject_id_from_i64(row.try_get::<i64, _>("subject_id").map_err(ser)?)?,
        date: row.try_get("date").map_err(ser)?,
        status: parse_status(&status)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<Profile, StorageError> {
    Ok(Profile::from_persisted(
        user_id_from_text(&row.try_get::<String, _>("user_id").map_err(ser)?)?,
        row.try_get("username").map_err(ser)?,
        row.try_get("full_name").map_err(ser)?,
        row.try_get("avatar_url").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_matches_domain_encoding() {
        for status in [AttendanceStatus::Present, AttendanceStatus::Absent] {
            assert_eq!(parse_status(status.as_str()).unwrap(), status);
        }
        assert!(parse_status("late").is_err());
    }

    #[test]
    fn user_id_text_round_trips() {
        let user = UserId::generate();
        assert_eq!(user_id_from_text(&user_id_to_text(user)).unwrap(), user);
    }

    #[test]
    fn negative_ids_are_rejected() {
        assert!(subject_id_from_i64(-1).is_err());
        assert!(id_i64("subject_id", u64::MAX).is_err());
    }
}
