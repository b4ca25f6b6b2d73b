//! Attendance arithmetic: aggregation, goal projection, and status tiers.
//!
//! Everything here is pure and storage-agnostic.

use serde::{Deserialize, Serialize};

use crate::model::Subject;

/// Upper bound on simulated future classes in [`classes_needed_for`].
///
/// A result equal to this value means "not reachable soon", not a literal count.
pub const MAX_PROJECTED_CLASSES: u32 = 50;

/// Percentage of attended classes, or `None` when no class was held.
#[must_use]
pub fn attendance_percentage(attended: u32, total: u32) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(f64::from(attended) / f64::from(total) * 100.0)
}

//
// ─── AGGREGATOR ────────────────────────────────────────────────────────────────
//

/// Dashboard totals across all subjects of a user.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttendanceSummary {
    /// Unweighted mean of per-subject percentages.
    ///
    /// Each subject counts once regardless of how many classes it held, so a
    /// subject with 2 classes weighs as much as one with 200.
    pub overall_pct: Option<f64>,
    pub total_classes: u64,
    pub total_attended: u64,
    pub subject_count: usize,
}

impl AttendanceSummary {
    /// Totals-based percentage (`total_attended / total_classes`).
    #[must_use]
    pub fn weighted_pct(&self) -> Option<f64> {
        if self.total_classes == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let pct = self.total_attended as f64 / self.total_classes as f64 * 100.0;
        Some(pct)
    }

    #[must_use]
    pub fn total_missed(&self) -> u64 {
        self.total_classes - self.total_attended
    }
}

/// Aggregates subject counters into dashboard totals.
///
/// Subjects without any held class have no percentage and are skipped in the
/// mean; an empty list yields `overall_pct == None`.
#[must_use]
pub fn aggregate(subjects: &[Subject]) -> AttendanceSummary {
    let mut summary = AttendanceSummary {
        subject_count: subjects.len(),
        ..AttendanceSummary::default()
    };
    let mut pct_sum = 0.0;
    let mut with_data = 0_u32;

    for subject in subjects {
        summary.total_classes += u64::from(subject.total_classes());
        summary.total_attended += u64::from(subject.attended_classes());
        if let Some(pct) = subject.percentage() {
            pct_sum += pct;
            with_data += 1;
        }
    }

    if with_data > 0 {
        summary.overall_pct = Some(pct_sum / f64::from(with_data));
    }
    summary
}

//
// ─── GOAL PROJECTOR ────────────────────────────────────────────────────────────
//

fn goal_met(attended: u64, total: u64, goal: u8) -> bool {
    attended * 100 >= u64::from(goal) * total && (total > 0 || goal == 0)
}

/// Minimum consecutive present classes needed to reach `goal` percent.
///
/// Returns 0 when the goal is already met. Each simulated class raises both
/// counters by one; the search saturates at [`MAX_PROJECTED_CLASSES`], which
/// is always the answer for a 100% goal once any absence exists.
#[must_use]
pub fn classes_needed_for(attended: u32, total: u32, goal: u8) -> u32 {
    let mut attended = u64::from(attended.min(total));
    let mut total = u64::from(total);
    let mut needed = 0;

    while !goal_met(attended, total, goal) && needed < MAX_PROJECTED_CLASSES {
        attended += 1;
        total += 1;
        needed += 1;
    }
    needed
}

/// [`classes_needed_for`] using the subject's effective goal (default 75).
#[must_use]
pub fn classes_needed(subject: &Subject) -> u32 {
    classes_needed_for(
        subject.attended_classes(),
        subject.total_classes(),
        subject.effective_goal(),
    )
}

/// Presentation bundle for the goals view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalProjection {
    pub current_pct: Option<f64>,
    pub goal: u8,
    pub status: GoalStatus,
    pub classes_needed: u32,
}

impl GoalProjection {
    #[must_use]
    pub fn for_subject(subject: &Subject, thresholds: &StatusThresholds) -> Self {
        let goal = subject.effective_goal();
        let current_pct = subject.percentage();
        Self {
            current_pct,
            goal,
            status: thresholds.goal_status(current_pct, goal),
            classes_needed: classes_needed(subject),
        }
    }

    /// True when the projection hit the simulation cap.
    #[must_use]
    pub fn is_saturated(&self) -> bool {
        self.classes_needed >= MAX_PROJECTED_CLASSES
    }
}

//
// ─── STATUS CLASSIFIER ─────────────────────────────────────────────────────────
//

/// Qualitative label for an absolute attendance percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttendanceTier {
    Excellent,
    Good,
    Average,
    Poor,
}

impl AttendanceTier {
    /// Tier under the default thresholds.
    #[must_use]
    pub fn classify(pct: f64) -> Self {
        StatusThresholds::default().tier(pct)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::Poor => "Poor",
        }
    }
}

/// Position of a subject relative to its goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    Achieved,
    OnTrack,
    AtRisk,
}

impl GoalStatus {
    #[must_use]
    pub fn classify(pct: Option<f64>, goal: u8) -> Self {
        StatusThresholds::default().goal_status(pct, goal)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Achieved => "Goal Achieved",
            Self::OnTrack => "On Track",
            Self::AtRisk => "At Risk",
        }
    }
}

/// Cut-off points for [`AttendanceTier`] and [`GoalStatus`].
///
/// These are display policy; the defaults match the dashboard's badges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusThresholds {
    pub excellent: f64,
    pub good: f64,
    pub average: f64,
    /// Points below the goal still counted as on track.
    pub on_track_band: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            excellent: 90.0,
            good: 80.0,
            average: 75.0,
            on_track_band: 10.0,
        }
    }
}

impl StatusThresholds {
    #[must_use]
    pub fn tier(&self, pct: f64) -> AttendanceTier {
        if pct >= self.excellent {
            AttendanceTier::Excellent
        } else if pct >= self.good {
            AttendanceTier::Good
        } else if pct >= self.average {
            AttendanceTier::Average
        } else {
            AttendanceTier::Poor
        }
    }

    /// Classifies against a goal; a subject with no data is at risk unless
    /// the goal is zero.
    #[must_use]
    pub fn goal_status(&self, pct: Option<f64>, goal: u8) -> GoalStatus {
        let goal = f64::from(goal);
        match pct {
            Some(pct) if pct >= goal => GoalStatus::Achieved,
            Some(pct) if pct >= goal - self.on_track_band => GoalStatus::OnTrack,
            None if goal <= 0.0 => GoalStatus::Achieved,
            _ => GoalStatus::AtRisk,
        }
    }
}

/// Formats an optional percentage with one decimal, or a dash placeholder.
#[must_use]
pub fn format_percentage(pct: Option<f64>) -> String {
    match pct {
        Some(pct) => format!("{pct:.1}%"),
        None => "—".to_owned(),
    }
}
