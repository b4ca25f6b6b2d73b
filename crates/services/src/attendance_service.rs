use std::sync::Arc;

use attendance_core::model::{
    AttendanceRecord, AttendanceStatus, NewAttendanceRecord, RecordId, Subject, SubjectId, UserId,
};
use attendance_core::reports::{DayTally, SubjectTally, month_calendar};
use chrono::{Datelike, NaiveDate};
use log::{info, warn};
use storage::repository::{
    AttendancePersistence, AttendanceRepository, StorageError, SubjectRepository,
};

use crate::Clock;
use crate::error::AttendanceServiceError;

/// Result of marking one class.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkOutcome {
    pub subject: Subject,
    pub record_id: RecordId,
}

/// Marks attendance and reads back the attendance log.
#[derive(Clone)]
pub struct AttendanceService {
    clock: Clock,
    subjects: Arc<dyn SubjectRepository>,
    records: Arc<dyn AttendanceRepository>,
    marks: Arc<dyn AttendancePersistence>,
}

impl AttendanceService {
    #[must_use]
    pub fn new(
        clock: Clock,
        subjects: Arc<dyn SubjectRepository>,
        records: Arc<dyn AttendanceRepository>,
        marks: Arc<dyn AttendancePersistence>,
    ) -> Self {
        Self {
            clock,
            subjects,
            records,
            marks,
        }
    }

    async fn load(&self, user: UserId, id: SubjectId) -> Result<Subject, AttendanceServiceError> {
        self.subjects
            .get_subject(user, id)
            .await?
            .ok_or(AttendanceServiceError::Storage(StorageError::NotFound))
    }

    /// Mark today's class for a subject.
    ///
    /// # Errors
    ///
    /// Returns `AttendanceServiceError::Storage` if the subject is missing or
    /// persistence fails; nothing is written in that case.
    pub async fn mark(
        &self,
        user: UserId,
        id: SubjectId,
        status: AttendanceStatus,
    ) -> Result<MarkOutcome, AttendanceServiceError> {
        self.mark_on(user, id, status, self.clock.today()).await
    }

    /// Mark a class held on `date`.
    ///
    /// # Errors
    ///
    /// Returns `AttendanceServiceError::Storage` if the subject is missing or
    /// persistence fails.
    pub async fn mark_on(
        &self,
        user: UserId,
        id: SubjectId,
        status: AttendanceStatus,
        date: NaiveDate,
    ) -> Result<MarkOutcome, AttendanceServiceError> {
        let mut subject = self.load(user, id).await?;
        subject.record_mark(status, date);

        let record = NewAttendanceRecord {
            user_id: user,
            subject_id: id,
            date,
            status,
            created_at: self.clock.now(),
        };
        let record_id = self.marks.apply_mark(&subject, record).await.map_err(|err| {
            warn!("event=attendance_mark module=services status=error subject_id={id} error={err}");
            err
        })?;

        info!(
            "event=attendance_mark module=services status=ok subject_id={id} mark={status} total={} attended={}",
            subject.total_classes(),
            subject.attended_classes()
        );
        Ok(MarkOutcome { subject, record_id })
    }

    /// All records of a subject, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AttendanceServiceError::Storage` on repository failures.
    pub async fn history(
        &self,
        user: UserId,
        id: SubjectId,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        Ok(self.records.records_for_subject(user, id).await?)
    }

    /// Per-day tallies for every day of a calendar month.
    ///
    /// # Errors
    ///
    /// Returns `AttendanceServiceError::InvalidMonth` for an impossible month
    /// and `AttendanceServiceError::Storage` on repository failures.
    pub async fn month(
        &self,
        user: UserId,
        year: i32,
        month: u32,
    ) -> Result<Vec<DayTally>, AttendanceServiceError> {
        let invalid = AttendanceServiceError::InvalidMonth { year, month };
        let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
            return Err(invalid);
        };
        let last = first
            .checked_add_months(chrono::Months::new(1))
            .and_then(|d| d.pred_opt())
            .ok_or(AttendanceServiceError::InvalidMonth { year, month })?;

        let records = self.records.records_between(user, first, last).await?;
        month_calendar(&records, first.year(), first.month()).ok_or(invalid)
    }

    /// Rebuild a subject's counters from its manual counts plus its records.
    ///
    /// Counts typed in when the subject was added or edited have no records
    /// behind them and survive the recount.
    ///
    /// # Errors
    ///
    /// Returns `AttendanceServiceError::Storage` on repository failures.
    pub async fn recount(
        &self,
        user: UserId,
        id: SubjectId,
    ) -> Result<Subject, AttendanceServiceError> {
        let mut subject = self.load(user, id).await?;
        let records = self.records.records_for_subject(user, id).await?;
        let tally = SubjectTally::from_records(&records);

        subject.recount(tally.total, tally.attended, tally.last_marked);
        self.subjects.update_subject(&subject).await?;
        info!(
            "event=subject_recount module=services status=ok subject_id={id} records={}",
            records.len()
        );
        Ok(subject)
    }
}
