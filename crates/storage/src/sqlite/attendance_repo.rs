use attendance_core::model::{
    AttendanceRecord, NewAttendanceRecord, RecordId, Subject, SubjectId, UserId,
};
use chrono::NaiveDate;

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_record_row, record_id_from_i64, user_id_to_text};
use crate::repository::{AttendancePersistence, AttendanceRepository, StorageError};

const INSERT_RECORD: &str = r"
    INSERT INTO attendance_records (user_id, subject_id, date, status, created_at)
    SELECT ?1, id, ?3, ?4, ?5 FROM subjects WHERE id = ?2 AND user_id = ?1
";

#[async_trait::async_trait]
impl AttendanceRepository for SqliteRepository {
    async fn append_record(&self, record: NewAttendanceRecord) -> Result<RecordId, StorageError> {
        let res = sqlx::query(INSERT_RECORD)
            .bind(user_id_to_text(record.user_id))
            .bind(id_i64("subject_id", record.subject_id.value())?)
            .bind(record.date)
            .bind(record.status.as_str())
            .bind(record.created_at)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        // The INSERT ... SELECT writes nothing when the subject is not owned by the user.
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        record_id_from_i64(res.last_insert_rowid())
    }

    async fn records_for_subject(
        &self,
        user: UserId,
        subject: SubjectId,
    ) -> Result<Vec<AttendanceRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, subject_id, date, status, created_at
                FROM attendance_records
                WHERE user_id = ?1 AND subject_id = ?2
                ORDER BY date ASC, id ASC
            ",
        )
        .bind(user_id_to_text(user))
        .bind(id_i64("subject_id", subject.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_record_row(&row)?);
        }
        Ok(out)
    }

    async fn records_between(
        &self,
        user: UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, subject_id, date, status, created_at
                FROM attendance_records
                WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
                ORDER BY date ASC, id ASC
            ",
        )
        .bind(user_id_to_text(user))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_record_row(&row)?);
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl AttendancePersistence for SqliteRepository {
    async fn apply_mark(
        &self,
        subject: &Subject,
        record: NewAttendanceRecord,
    ) -> Result<RecordId, StorageError> {
        if record.subject_id != subject.id() || record.user_id != subject.user_id() {
            return Err(StorageError::Conflict);
        }

        let subject_id = id_i64("subject_id", subject.id().value())?;
        let user_id = user_id_to_text(subject.user_id());

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let updated = sqlx::query(
            r"
            UPDATE subjects SET
                total_classes = ?3,
                attended_classes = ?4,
                last_attended = ?5
            WHERE id = ?1 AND user_id = ?2
            ",
        )
        .bind(subject_id)
        .bind(user_id.clone())
        .bind(i64::from(subject.total_classes()))
        .bind(i64::from(subject.attended_classes()))
        .bind(subject.last_attended())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(StorageError::NotFound);
        }

        let res = sqlx::query(INSERT_RECORD)
            .bind(user_id)
            .bind(subject_id)
            .bind(record.date)
            .bind(record.status.as_str())
            .bind(record.created_at)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        tx.commit().await.map_err(conn)?;

        record_id_from_i64(res.last_insert_rowid())
    }
}
