use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::attendance::AttendanceStatus;
use crate::model::ids::{SubjectId, UserId};

/// Goal applied to subjects that never had one set explicitly.
pub const DEFAULT_ATTENDANCE_GOAL: u8 = 75;

/// Presentation tags offered when creating a subject.
pub const COLOR_PALETTE: [&str; 10] = [
    "blue", "purple", "green", "orange", "indigo", "red", "pink", "teal", "yellow", "cyan",
];

/// Picks a palette color by position, wrapping around.
#[must_use]
pub fn palette_color(index: usize) -> &'static str {
    COLOR_PALETTE[index % COLOR_PALETTE.len()]
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("subject name cannot be empty")]
    EmptyName,

    #[error("attendance goal must be between 0 and 100, got {0}")]
    InvalidGoal(u8),

    #[error("attended classes ({attended}) exceed total classes ({total})")]
    InvalidCounts { attended: u32, total: u32 },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// User-supplied fields for creating or editing a subject.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubjectDraft {
    pub name: String,
    pub total_classes: u32,
    pub attended_classes: u32,
    pub color: Option<String>,
    pub attendance_goal: Option<u8>,
}

impl SubjectDraft {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_counts(mut self, total_classes: u32, attended_classes: u32) -> Self {
        self.total_classes = total_classes;
        self.attended_classes = attended_classes;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn with_goal(mut self, goal: u8) -> Self {
        self.attendance_goal = Some(goal);
        self
    }

    /// Seed an edit form from a stored subject.
    #[must_use]
    pub fn from_subject(subject: &Subject) -> Self {
        Self {
            name: subject.name().to_owned(),
            total_classes: subject.total_classes(),
            attended_classes: subject.attended_classes(),
            color: Some(subject.color().to_owned()),
            attendance_goal: subject.attendance_goal(),
        }
    }

    /// Normalizes the draft: trims the name, clamps attended to total, and
    /// falls back to the first palette color.
    fn normalize(self) -> Result<NormalizedDraft, SubjectError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(SubjectError::EmptyName);
        }
        let attendance_goal = normalize_goal(self.attendance_goal)?;
        let color = self
            .color
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| palette_color(0).to_owned());

        Ok(NormalizedDraft {
            name: name.to_owned(),
            total_classes: self.total_classes,
            attended_classes: self.attended_classes.min(self.total_classes),
            color,
            attendance_goal,
        })
    }
}

struct NormalizedDraft {
    name: String,
    total_classes: u32,
    attended_classes: u32,
    color: String,
    attendance_goal: Option<u8>,
}

/// Goals above 100 are rejected; a goal of 0 means "not set", as in the
/// dashboard, so the default applies.
fn normalize_goal(goal: Option<u8>) -> Result<Option<u8>, SubjectError> {
    match goal {
        Some(goal) if goal > 100 => Err(SubjectError::InvalidGoal(goal)),
        Some(0) | None => Ok(None),
        Some(goal) => Ok(Some(goal)),
    }
}

/// Classes entered by hand at add or edit time, with no records behind them.
///
/// A recount adds the record tally on top of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManualCounts {
    pub total: u32,
    pub attended: u32,
}

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// A tracked course with cumulative attendance counters.
///
/// The counters are the manual counts plus the tally of the subject's
/// attendance records; `attended_classes <= total_classes` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    id: SubjectId,
    user_id: UserId,
    name: String,
    total_classes: u32,
    attended_classes: u32,
    color: String,
    last_attended: Option<NaiveDate>,
    attendance_goal: Option<u8>,
    manual: ManualCounts,
    created_at: DateTime<Utc>,
}

impl Subject {
    /// Creates a subject from a draft.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::EmptyName` if the name is blank and
    /// `SubjectError::InvalidGoal` if the goal exceeds 100.
    pub fn new(
        id: SubjectId,
        user_id: UserId,
        draft: SubjectDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SubjectError> {
        let draft = draft.normalize()?;
        Ok(Self {
            id,
            user_id,
            name: draft.name,
            total_classes: draft.total_classes,
            attended_classes: draft.attended_classes,
            color: draft.color,
            last_attended: None,
            attendance_goal: draft.attendance_goal,
            manual: ManualCounts {
                total: draft.total_classes,
                attended: draft.attended_classes,
            },
            created_at,
        })
    }

    /// Rebuilds a subject from stored fields without clamping.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError` if the stored row violates an invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SubjectId,
        user_id: UserId,
        name: String,
        total_classes: u32,
        attended_classes: u32,
        color: String,
        last_attended: Option<NaiveDate>,
        attendance_goal: Option<u8>,
        manual: ManualCounts,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SubjectError> {
        if name.trim().is_empty() {
            return Err(SubjectError::EmptyName);
        }
        for (attended, total) in [
            (attended_classes, total_classes),
            (manual.attended, manual.total),
        ] {
            if attended > total {
                return Err(SubjectError::InvalidCounts { attended, total });
            }
        }
        let attendance_goal = normalize_goal(attendance_goal)?;
        Ok(Self {
            id,
            user_id,
            name,
            total_classes,
            attended_classes,
            color,
            last_attended,
            attendance_goal,
            manual,
            created_at,
        })
    }

    /// Returns a copy carrying a store-assigned id.
    #[must_use]
    pub fn with_id(mut self, id: SubjectId) -> Self {
        self.id = id;
        self
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn total_classes(&self) -> u32 {
        self.total_classes
    }

    #[must_use]
    pub fn attended_classes(&self) -> u32 {
        self.attended_classes
    }

    #[must_use]
    pub fn missed_classes(&self) -> u32 {
        self.total_classes - self.attended_classes
    }

    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }

    #[must_use]
    pub fn last_attended(&self) -> Option<NaiveDate> {
        self.last_attended
    }

    /// The explicitly configured goal, if any.
    #[must_use]
    pub fn attendance_goal(&self) -> Option<u8> {
        self.attendance_goal
    }

    #[must_use]
    pub fn manual_counts(&self) -> ManualCounts {
        self.manual
    }

    /// The goal used for projections: the configured one or 75.
    #[must_use]
    pub fn effective_goal(&self) -> u8 {
        self.attendance_goal.unwrap_or(DEFAULT_ATTENDANCE_GOAL)
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Attendance percentage, or `None` before any class was held.
    #[must_use]
    pub fn percentage(&self) -> Option<f64> {
        crate::stats::attendance_percentage(self.attended_classes, self.total_classes)
    }

    /// Applies one present/absent mark held on `date`.
    pub fn record_mark(&mut self, status: AttendanceStatus, date: NaiveDate) {
        self.total_classes = self.total_classes.saturating_add(1);
        if status.is_present() {
            self.attended_classes = self.attended_classes.saturating_add(1);
        }
        self.last_attended = Some(date);
    }

    /// Sets or clears the attendance goal.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError::InvalidGoal` if the goal exceeds 100.
    pub fn set_goal(&mut self, goal: Option<u8>) -> Result<(), SubjectError> {
        self.attendance_goal = normalize_goal(goal)?;
        Ok(())
    }

    /// Replaces the editable fields while keeping identity and history.
    ///
    /// Edited counters shift the manual counts by the same amount, so the
    /// recorded part of the totals is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `SubjectError` if the draft fails validation.
    pub fn apply_draft(&mut self, draft: SubjectDraft) -> Result<(), SubjectError> {
        let draft = draft.normalize()?;
        let recorded_total = self.total_classes.saturating_sub(self.manual.total);
        let recorded_attended = self.attended_classes.saturating_sub(self.manual.attended);
        let manual_total = draft.total_classes.saturating_sub(recorded_total);
        self.manual = ManualCounts {
            total: manual_total,
            attended: draft
                .attended_classes
                .saturating_sub(recorded_attended)
                .min(manual_total),
        };
        self.name = draft.name;
        self.total_classes = draft.total_classes;
        self.attended_classes = draft.attended_classes;
        self.color = draft.color;
        self.attendance_goal = draft.attendance_goal;
        Ok(())
    }

    /// Rebuilds the counters as manual counts plus a tally of records.
    ///
    /// The latest record date replaces `last_attended`; without records the
    /// stored date is kept.
    pub fn recount(
        &mut self,
        recorded_total: u32,
        recorded_attended: u32,
        last_marked: Option<NaiveDate>,
    ) {
        self.total_classes = self.manual.total.saturating_add(recorded_total);
        self.attended_classes = self
            .manual
            .attended
            .saturating_add(recorded_attended)
            .min(self.total_classes);
        if last_marked.is_some() {
            self.last_attended = last_marked;
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{fixed_now, fixed_today};

    fn user() -> UserId {
        UserId::new(uuid::Uuid::nil())
    }

    #[test]
    fn new_rejects_blank_name() {
        let err = Subject::new(SubjectId::new(1), user(), SubjectDraft::named("  "), fixed_now())
            .unwrap_err();
        assert_eq!(err, SubjectError::EmptyName);
    }

    #[test]
    fn new_clamps_attended_to_total() {
        let draft = SubjectDraft::named(" Physics ").with_counts(10, 14);
        let subject = Subject::new(SubjectId::new(1), user(), draft, fixed_now()).unwrap();
        assert_eq!(subject.name(), "Physics");
        assert_eq!(subject.total_classes(), 10);
        assert_eq!(subject.attended_classes(), 10);
    }

    #[test]
    fn new_defaults_color_and_goal() {
        let subject =
            Subject::new(SubjectId::new(1), user(), SubjectDraft::named("Art"), fixed_now())
                .unwrap();
        assert_eq!(subject.color(), "blue");
        assert_eq!(subject.attendance_goal(), None);
        assert_eq!(subject.effective_goal(), 75);
        assert_eq!(subject.percentage(), None);
    }

    #[test]
    fn new_rejects_goal_above_hundred() {
        let draft = SubjectDraft::named("Art").with_goal(120);
        let err = Subject::new(SubjectId::new(1), user(), draft, fixed_now()).unwrap_err();
        assert_eq!(err, SubjectError::InvalidGoal(120));
    }

    #[test]
    fn marking_present_bumps_both_counters() {
        let draft = SubjectDraft::named("Mathematics").with_counts(45, 42);
        let mut subject = Subject::new(SubjectId::new(1), user(), draft, fixed_now()).unwrap();

        subject.record_mark(AttendanceStatus::Present, fixed_today());

        assert_eq!(subject.attended_classes(), 43);
        assert_eq!(subject.total_classes(), 46);
        assert_eq!(subject.last_attended(), Some(fixed_today()));
    }

    #[test]
    fn marking_absent_only_bumps_total() {
        let draft = SubjectDraft::named("History").with_counts(30, 25);
        let mut subject = Subject::new(SubjectId::new(1), user(), draft, fixed_now()).unwrap();

        subject.record_mark(AttendanceStatus::Absent, fixed_today());

        assert_eq!(subject.attended_classes(), 25);
        assert_eq!(subject.total_classes(), 31);
        assert_eq!(subject.missed_classes(), 6);
    }

    #[test]
    fn from_persisted_rejects_inverted_counts() {
        let err = Subject::from_persisted(
            SubjectId::new(1),
            user(),
            "Chemistry".into(),
            3,
            4,
            "green".into(),
            None,
            None,
            ManualCounts::default(),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SubjectError::InvalidCounts {
                attended: 4,
                total: 3
            }
        );
    }

    #[test]
    fn apply_draft_keeps_identity() {
        let draft = SubjectDraft::named("English").with_counts(35, 33);
        let mut subject = Subject::new(SubjectId::new(9), user(), draft, fixed_now()).unwrap();
        subject.record_mark(AttendanceStatus::Present, fixed_today());

        subject
            .apply_draft(SubjectDraft::named("English Lit").with_counts(20, 18).with_goal(85))
            .unwrap();

        assert_eq!(subject.id(), SubjectId::new(9));
        assert_eq!(subject.name(), "English Lit");
        assert_eq!(subject.effective_goal(), 85);
        assert_eq!(subject.last_attended(), Some(fixed_today()));
    }

    #[test]
    fn palette_wraps_around() {
        assert_eq!(palette_color(0), "blue");
        assert_eq!(palette_color(10), "blue");
        assert_eq!(palette_color(11), "purple");
    }

    #[test]
    fn draft_from_subject_round_trips_fields() {
        let draft = SubjectDraft::named("Chemistry").with_counts(38, 30).with_color("green");
        let subject = Subject::new(SubjectId::new(3), user(), draft.clone(), fixed_now()).unwrap();
        assert_eq!(SubjectDraft::from_subject(&subject), draft);
    }

    #[test]
    fn zero_goal_falls_back_to_default() {
        let draft = SubjectDraft::named("Art").with_counts(10, 5).with_goal(0);
        let mut subject = Subject::new(SubjectId::new(1), user(), draft, fixed_now()).unwrap();
        assert_eq!(subject.attendance_goal(), None);
        assert_eq!(subject.effective_goal(), DEFAULT_ATTENDANCE_GOAL);

        subject.set_goal(Some(90)).unwrap();
        subject.set_goal(Some(0)).unwrap();
        assert_eq!(subject.effective_goal(), DEFAULT_ATTENDANCE_GOAL);
        assert_eq!(subject.set_goal(Some(101)), Err(SubjectError::InvalidGoal(101)));
    }

    #[test]
    fn recount_keeps_manual_counts() {
        let draft = SubjectDraft::named("Mathematics").with_counts(45, 42);
        let mut subject = Subject::new(SubjectId::new(1), user(), draft, fixed_now()).unwrap();
        subject.record_mark(AttendanceStatus::Present, fixed_today());
        subject.record_mark(AttendanceStatus::Absent, fixed_today());

        subject.recount(2, 1, Some(fixed_today()));
        assert_eq!(subject.total_classes(), 47);
        assert_eq!(subject.attended_classes(), 43);
    }

    #[test]
    fn edit_shifts_manual_counts_only() {
        let draft = SubjectDraft::named("Physics").with_counts(40, 35);
        let mut subject = Subject::new(SubjectId::new(2), user(), draft, fixed_now()).unwrap();
        subject.record_mark(AttendanceStatus::Present, fixed_today());

        subject
            .apply_draft(SubjectDraft::named("Physics").with_counts(50, 44))
            .unwrap();
        assert_eq!(
            subject.manual_counts(),
            ManualCounts {
                total: 49,
                attended: 43
            }
        );

        subject.recount(1, 1, None);
        assert_eq!(subject.total_classes(), 50);
        assert_eq!(subject.attended_classes(), 44);
        assert_eq!(subject.last_attended(), Some(fixed_today()));
    }
}
