use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned migrations for the attendance schema.
///
/// Version 1 creates subjects, attendance records, profiles, and indexes.
/// Version 2 adds the manual counts a recount builds on.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS subjects (
                    id INTEGER PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
                    total_classes INTEGER NOT NULL CHECK (total_classes >= 0),
                    attended_classes INTEGER NOT NULL
                        CHECK (attended_classes >= 0 AND attended_classes <= total_classes),
                    color TEXT NOT NULL,
                    last_attended TEXT,
                    attendance_goal INTEGER CHECK (attendance_goal BETWEEN 0 AND 100),
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS attendance_records (
                    id INTEGER PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    subject_id INTEGER NOT NULL,
                    date TEXT NOT NULL,
                    status TEXT NOT NULL CHECK (status IN ('present', 'absent')),
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS profiles (
                    user_id TEXT PRIMARY KEY,
                    username TEXT,
                    full_name TEXT,
                    avatar_url TEXT,
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_subjects_user
                    ON subjects(user_id, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attendance_user_subject_date
                    ON attendance_records(user_id, subject_id, date);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_attendance_user_date
                    ON attendance_records(user_id, date);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        log::info!("event=migration_applied module=storage version=1");
    }

    // Version 2: manual counts. Existing rows keep whatever their records
    // do not explain.
    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                ALTER TABLE subjects
                    ADD COLUMN manual_total INTEGER NOT NULL DEFAULT 0
                    CHECK (manual_total >= 0);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                ALTER TABLE subjects
                    ADD COLUMN manual_attended INTEGER NOT NULL DEFAULT 0
                    CHECK (manual_attended >= 0);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                UPDATE subjects SET
                    manual_total = MAX(0, total_classes - (
                        SELECT COUNT(*) FROM attendance_records r
                        WHERE r.subject_id = subjects.id
                    )),
                    manual_attended = MAX(0, attended_classes - (
                        SELECT COUNT(*) FROM attendance_records r
                        WHERE r.subject_id = subjects.id AND r.status = 'present'
                    ));
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                UPDATE subjects SET manual_attended = manual_total
                WHERE manual_attended > manual_total;
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(2_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        log::info!("event=migration_applied module=storage version=2");
    }

    Ok(())
}
