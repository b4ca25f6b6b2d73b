//! Derived views over subjects and attendance records: the analytics report,
//! the month calendar, and recounting counters from records.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::{AttendanceRecord, Subject, SubjectId};
use crate::stats::{AttendanceSummary, aggregate};

//
// ─── ANALYTICS ─────────────────────────────────────────────────────────────────
//

/// One row of the per-subject analytics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectReport {
    pub subject_id: SubjectId,
    pub name: String,
    pub percentage: Option<f64>,
    pub total_classes: u32,
    pub missed_classes: u32,
    /// Subjects without an explicit goal count as meeting it.
    pub goal_met: bool,
}

impl SubjectReport {
    #[must_use]
    pub fn from_subject(subject: &Subject) -> Self {
        let percentage = subject.percentage();
        let goal_met = match subject.attendance_goal() {
            Some(goal) => percentage.is_some_and(|pct| pct >= f64::from(goal)),
            None => true,
        };
        Self {
            subject_id: subject.id(),
            name: subject.name().to_owned(),
            percentage,
            total_classes: subject.total_classes(),
            missed_classes: subject.missed_classes(),
            goal_met,
        }
    }
}

/// Reports & analytics view model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub summary: AttendanceSummary,
    pub subjects: Vec<SubjectReport>,
    pub top_performer: Option<SubjectId>,
    pub needs_attention: Vec<SubjectId>,
    pub perfect_attendance: Vec<SubjectId>,
}

impl AnalyticsReport {
    #[must_use]
    pub fn build(subjects: &[Subject]) -> Self {
        let rows: Vec<SubjectReport> = subjects.iter().map(SubjectReport::from_subject).collect();

        let mut top: Option<(SubjectId, f64)> = None;
        for row in &rows {
            if let Some(pct) = row.percentage {
                if top.is_none_or(|(_, best)| pct > best) {
                    top = Some((row.subject_id, pct));
                }
            }
        }

        let needs_attention = rows
            .iter()
            .filter(|row| !row.goal_met)
            .map(|row| row.subject_id)
            .collect();

        let perfect_attendance = subjects
            .iter()
            .filter(|s| s.total_classes() > 0 && s.attended_classes() == s.total_classes())
            .map(Subject::id)
            .collect();

        Self {
            summary: aggregate(subjects),
            subjects: rows,
            top_performer: top.map(|(id, _)| id),
            needs_attention,
            perfect_attendance,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    #[must_use]
    pub fn row(&self, id: SubjectId) -> Option<&SubjectReport> {
        self.subjects.iter().find(|row| row.subject_id == id)
    }
}

//
// ─── CALENDAR ──────────────────────────────────────────────────────────────────
//

/// Colour band of a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayTier {
    /// No class recorded.
    Empty,
    /// Every class attended.
    Full,
    /// At least 75% attended.
    Partial,
    /// Some, but under 75%, attended.
    Low,
    /// Classes held, none attended.
    Missed,
}

/// Marks recorded on one date, across subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTally {
    pub date: NaiveDate,
    pub attended: u32,
    pub total: u32,
}

impl DayTally {
    #[must_use]
    pub fn from_records(records: &[AttendanceRecord], date: NaiveDate) -> Self {
        let mut tally = Self {
            date,
            attended: 0,
            total: 0,
        };
        for record in records.iter().filter(|r| r.date == date) {
            tally.total += 1;
            if record.status.is_present() {
                tally.attended += 1;
            }
        }
        tally
    }

    #[must_use]
    pub fn tier(&self) -> DayTier {
        if self.total == 0 {
            DayTier::Empty
        } else if self.attended == self.total {
            DayTier::Full
        } else if self.attended * 4 >= self.total * 3 {
            DayTier::Partial
        } else if self.attended > 0 {
            DayTier::Low
        } else {
            DayTier::Missed
        }
    }
}

/// Every day of `month` in `year` with its tally; `None` for an invalid month.
#[must_use]
pub fn month_calendar(records: &[AttendanceRecord], year: i32, month: u32) -> Option<Vec<DayTally>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let days = first
        .iter_days()
        .take_while(|d| d.month() == month)
        .map(|d| DayTally::from_records(records, d))
        .collect();
    Some(days)
}

//
// ─── RECOUNT ───────────────────────────────────────────────────────────────────
//

/// Counters rebuilt from a subject's records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubjectTally {
    pub total: u32,
    pub attended: u32,
    pub last_marked: Option<NaiveDate>,
}

impl SubjectTally {
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut tally, record| {
            tally.total = tally.total.saturating_add(1);
            if record.status.is_present() {
                tally.attended = tally.attended.saturating_add(1);
            }
            tally.last_marked = tally.last_marked.max(Some(record.date));
            tally
        })
    }
}
