use attendance_core::model::{Subject, SubjectId, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_subject_row, subject_id_from_i64, user_id_to_text};
use crate::repository::{StorageError, SubjectRepository};

const SUBJECT_COLUMNS: &str = "id, user_id, name, total_classes, attended_classes, color, \
                               last_attended, attendance_goal, manual_total, manual_attended, \
                               created_at";

#[async_trait::async_trait]
impl SubjectRepository for SqliteRepository {
    async fn insert_subject(&self, subject: &Subject) -> Result<SubjectId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO subjects (
                user_id, name, total_classes, attended_classes, color,
                last_attended, attendance_goal, manual_total, manual_attended, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(user_id_to_text(subject.user_id()))
        .bind(subject.name().to_owned())
        .bind(i64::from(subject.total_classes()))
        .bind(i64::from(subject.attended_classes()))
        .bind(subject.color().to_owned())
        .bind(subject.last_attended())
        .bind(subject.attendance_goal().map(i64::from))
        .bind(i64::from(subject.manual_counts().total))
        .bind(i64::from(subject.manual_counts().attended))
        .bind(subject.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        subject_id_from_i64(res.last_insert_rowid())
    }

    async fn get_subject(
        &self,
        user: UserId,
        id: SubjectId,
    ) -> Result<Option<Subject>, StorageError> {
        let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = ?1 AND user_id = ?2");
        let row = sqlx::query(&sql)
            .bind(id_i64("subject_id", id.value())?)
            .bind(user_id_to_text(user))
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_subject_row).transpose()
    }

    async fn list_subjects(&self, user: UserId) -> Result<Vec<Subject>, StorageError> {
        let sql = format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE user_id = ?1 ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .bind(user_id_to_text(user))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut subjects = Vec::with_capacity(rows.len());
        for row in rows {
            subjects.push(map_subject_row(&row)?);
        }
        Ok(subjects)
    }

    async fn update_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE subjects SET
                name = ?3,
                total_classes = ?4,
                attended_classes = ?5,
                color = ?6,
                last_attended = ?7,
                attendance_goal = ?8,
                manual_total = ?9,
                manual_attended = ?10
            WHERE id = ?1 AND user_id = ?2
            ",
        )
        .bind(id_i64("subject_id", subject.id().value())?)
        .bind(user_id_to_text(subject.user_id()))
        .bind(subject.name().to_owned())
        .bind(i64::from(subject.total_classes()))
        .bind(i64::from(subject.attended_classes()))
        .bind(subject.color().to_owned())
        .bind(subject.last_attended())
        .bind(subject.attendance_goal().map(i64::from))
        .bind(i64::from(subject.manual_counts().total))
        .bind(i64::from(subject.manual_counts().attended))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_subject(&self, user: UserId, id: SubjectId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM subjects WHERE id = ?1 AND user_id = ?2")
            .bind(id_i64("subject_id", id.value())?)
            .bind(user_id_to_text(user))
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
