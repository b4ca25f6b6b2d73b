//! Command handlers. Each prints plain text to stdout.

use std::error::Error;

use attendance_core::model::{AttendanceStatus, Subject, SubjectDraft, SubjectId, palette_color};
use attendance_core::reports::DayTier;
use attendance_core::stats::{GoalProjection, MAX_PROJECTED_CLASSES, format_percentage};
use chrono::Datelike;
use services::{AppServices, Clock, DashboardStore, NotificationKind, StoreError};

use crate::args::{Command, ProfileFields, SubjectFields};

type CommandResult = Result<(), Box<dyn Error>>;

pub async fn execute(
    command: Command,
    services: &AppServices,
    store: &mut DashboardStore,
    clock: Clock,
) -> CommandResult {
    match command {
        Command::Summary => {
            print_summary(store);
            Ok(())
        }
        Command::Add(fields) => add_subject(store, fields).await,
        Command::Edit(id, fields) => edit_subject(store, id, fields).await,
        Command::Delete(id) => {
            let result = store.delete_subject(id).await;
            finish(store, result)
        }
        Command::Mark { id, status, date } => {
            let result = match date {
                Some(date) => store.mark_attendance_on(id, status, date).await,
                None => store.mark_attendance(id, status).await,
            };
            finish(store, result)?;
            if let Some(subject) = store.subject(id) {
                print_projection(subject, store);
            }
            Ok(())
        }
        Command::Goal(id, goal) => {
            let result = store.set_goal(id, goal).await;
            finish(store, result)?;
            if let Some(subject) = store.subject(id) {
                print_projection(subject, store);
            }
            Ok(())
        }
        Command::Goals => {
            print_goals(store);
            Ok(())
        }
        Command::History(id) => print_history(services, store, id).await,
        Command::Recount(id) => {
            let result = store.recount(id).await;
            finish(store, result)
        }
        Command::Report => {
            print_report(store);
            Ok(())
        }
        Command::Calendar(month) => {
            let (year, month) = month.unwrap_or_else(|| {
                let today = clock.today();
                (today.year(), today.month())
            });
            print_calendar(store, year, month).await
        }
        Command::Profile(fields) => profile(store, fields).await,
        Command::Seed => seed(store).await,
    }
}

/// Print success toasts; errors travel back through the returned `Err`.
fn finish(store: &mut DashboardStore, result: Result<(), StoreError>) -> CommandResult {
    for note in store.take_notifications() {
        if note.kind == NotificationKind::Success {
            println!("{}: {}", note.title, note.message);
        }
    }
    result.map_err(Into::into)
}

async fn add_subject(store: &mut DashboardStore, fields: SubjectFields) -> CommandResult {
    let color = fields
        .color
        .unwrap_or_else(|| palette_color(store.subjects().len()).to_owned());
    let mut draft = SubjectDraft::named(fields.name.unwrap_or_default())
        .with_counts(fields.total.unwrap_or(0), fields.attended.unwrap_or(0))
        .with_color(color);
    draft.attendance_goal = fields.goal;

    let result = store.add_subject(draft).await.map(|id| {
        println!("id: {id}");
    });
    finish(store, result)
}

async fn edit_subject(
    store: &mut DashboardStore,
    id: SubjectId,
    fields: SubjectFields,
) -> CommandResult {
    let current = store.subject(id).ok_or(StoreError::UnknownSubject(id))?;
    let mut draft = SubjectDraft::from_subject(current);
    if let Some(name) = fields.name {
        draft.name = name;
    }
    if let Some(total) = fields.total {
        draft.total_classes = total;
    }
    if let Some(attended) = fields.attended {
        draft.attended_classes = attended;
    }
    if let Some(color) = fields.color {
        draft.color = Some(color);
    }
    if let Some(goal) = fields.goal {
        draft.attendance_goal = Some(goal);
    }

    let result = store.update_subject(id, draft).await;
    finish(store, result)
}

fn need_label(projection: &GoalProjection) -> String {
    if projection.classes_needed == 0 {
        "-".to_owned()
    } else if projection.is_saturated() {
        format!("{MAX_PROJECTED_CLASSES}+")
    } else {
        projection.classes_needed.to_string()
    }
}

fn print_summary(store: &DashboardStore) {
    if let Some(profile) = store.profile() {
        println!("Hello, {}", profile.display_name());
    }
    let summary = store.summary();
    println!(
        "Overall attendance: {} ({}/{} classes, {} subjects)",
        format_percentage(summary.overall_pct),
        summary.total_attended,
        summary.total_classes,
        summary.subject_count
    );
    if store.subjects().is_empty() {
        println!("No subjects yet. Add one with `attendance add <name>`.");
        return;
    }

    println!();
    println!(
        "{:>4}  {:<20} {:>9} {:>7}  {:<10} {:>5}  {:<13} {:>5}  {}",
        "id", "subject", "attended", "pct", "tier", "goal", "status", "need", "last"
    );
    let thresholds = store.thresholds();
    for subject in store.subjects() {
        let projection = GoalProjection::for_subject(subject, thresholds);
        let tier = subject
            .percentage()
            .map_or("-", |pct| thresholds.tier(pct).label());
        let last = subject
            .last_attended()
            .map_or_else(|| "-".to_owned(), |d| d.to_string());
        println!(
            "{:>4}  {:<20} {:>9} {:>7}  {:<10} {:>4}%  {:<13} {:>5}  {}",
            subject.id(),
            subject.name(),
            format!("{}/{}", subject.attended_classes(), subject.total_classes()),
            format_percentage(projection.current_pct),
            tier,
            projection.goal,
            projection.status.label(),
            need_label(&projection),
            last
        );
    }
}

fn print_projection(subject: &Subject, store: &DashboardStore) {
    let projection = GoalProjection::for_subject(subject, store.thresholds());
    println!(
        "{}: {} of {}% goal ({})",
        subject.name(),
        format_percentage(projection.current_pct),
        projection.goal,
        projection.status.label()
    );
    match projection.classes_needed {
        0 => {}
        n if projection.is_saturated() => {
            println!("  needs {n}+ consecutive classes to reach the goal");
        }
        n => println!("  attend the next {n} classes to reach the goal"),
    }
}

fn print_goals(store: &DashboardStore) {
    if store.subjects().is_empty() {
        println!("No subjects yet.");
        return;
    }
    for subject in store.subjects() {
        print_projection(subject, store);
    }
}

async fn print_history(
    services: &AppServices,
    store: &DashboardStore,
    id: SubjectId,
) -> CommandResult {
    let subject = store.subject(id).ok_or(StoreError::UnknownSubject(id))?;
    let records = services.attendance().history(store.user(), id).await?;
    println!("{} ({} records)", subject.name(), records.len());
    for record in records {
        println!("  {}  {}", record.date, record.status.label());
    }
    Ok(())
}

fn print_report(store: &DashboardStore) {
    let report = store.report();
    if report.is_empty() {
        println!("No subjects yet.");
        return;
    }
    let name_of = |id: SubjectId| {
        report
            .row(id)
            .map_or_else(|| id.to_string(), |row| row.name.clone())
    };

    println!(
        "Classes: {} total, {} attended, {} missed",
        report.summary.total_classes,
        report.summary.total_attended,
        report.summary.total_missed()
    );
    println!(
        "Overall: {} (mean of subjects), {} (all classes)",
        format_percentage(report.summary.overall_pct),
        format_percentage(report.summary.weighted_pct())
    );
    println!();
    for row in &report.subjects {
        println!(
            "  {:<20} {:>7}  {:>3} missed  {}",
            row.name,
            format_percentage(row.percentage),
            row.missed_classes,
            if row.goal_met { "goal met" } else { "below goal" }
        );
    }
    println!();
    if let Some(top) = report.top_performer {
        println!("Top performer: {}", name_of(top));
    }
    if !report.needs_attention.is_empty() {
        let names: Vec<String> = report.needs_attention.iter().map(|id| name_of(*id)).collect();
        println!("Needs attention: {}", names.join(", "));
    }
    if !report.perfect_attendance.is_empty() {
        let names: Vec<String> = report
            .perfect_attendance
            .iter()
            .map(|id| name_of(*id))
            .collect();
        println!("Perfect attendance: {}", names.join(", "));
    }
}

fn day_symbol(tier: DayTier) -> char {
    match tier {
        DayTier::Empty => '.',
        DayTier::Full => '#',
        DayTier::Partial => '+',
        DayTier::Low => '-',
        DayTier::Missed => 'x',
    }
}

async fn print_calendar(store: &mut DashboardStore, year: i32, month: u32) -> CommandResult {
    let days = store.calendar(year, month).await?;
    println!("{year}-{month:02}");
    let strip: String = days.iter().map(|d| day_symbol(d.tier())).collect();
    println!("  {strip}");
    println!("  (# all attended, + 75%+, - some, x none, . no class)");
    for day in days.iter().filter(|d| d.total > 0) {
        println!("  {}  {}/{}", day.date, day.attended, day.total);
    }
    Ok(())
}

async fn profile(
    store: &mut DashboardStore,
    fields: ProfileFields,
) -> CommandResult {
    if !fields.is_empty() {
        let ProfileFields {
            username,
            full_name,
            avatar,
        } = fields;
        if username.is_some() || full_name.is_some() {
            store.begin_profile_edit();
            if let Some(draft) = store.profile_draft_mut() {
                if let Some(username) = username {
                    draft.username = username;
                }
                if let Some(full_name) = full_name {
                    draft.full_name = full_name;
                }
            }
            let result = store.save_profile_edit().await;
            finish(store, result)?;
        }
        if let Some(avatar) = avatar {
            let avatar = Some(avatar.trim().to_owned()).filter(|a| !a.is_empty());
            let result = store.set_avatar(avatar).await;
            finish(store, result)?;
        }
    }

    let Some(profile) = store.profile() else {
        return Ok(());
    };
    println!("Name:     {}", profile.display_name());
    println!("Username: {}", profile.username().unwrap_or("-"));
    println!("Full:     {}", profile.full_name().unwrap_or("-"));
    println!("Avatar:   {}", profile.avatar_url().unwrap_or("-"));
    Ok(())
}

async fn seed(store: &mut DashboardStore) -> CommandResult {
    if !store.subjects().is_empty() {
        println!(
            "seed: user already has {} subjects, nothing to do",
            store.subjects().len()
        );
        return Ok(());
    }

    let samples = [
        ("Mathematics", 45, 42),
        ("Physics", 40, 35),
        ("Chemistry", 38, 30),
        ("English", 35, 33),
    ];
    for (index, (name, total, attended)) in samples.into_iter().enumerate() {
        let draft = SubjectDraft::named(name)
            .with_counts(total, attended)
            .with_color(palette_color(index));
        let result = store.add_subject(draft).await.map(|_| ());
        finish(store, result)?;
    }
    let marked = store.subjects().first().map(Subject::id);
    if let Some(id) = marked {
        let result = store.mark_attendance(id, AttendanceStatus::Present).await;
        finish(store, result)?;
    }
    Ok(())
}
