use attendance_core::model::{AttendanceStatus, SubjectDraft, UserId};
use attendance_core::reports::DayTier;
use attendance_core::stats::GoalStatus;
use attendance_core::time::{fixed_now, fixed_today};
use chrono::Datelike;
use services::{AppServices, Clock, NotificationKind, StoreError};

async fn sqlite_services(name: &str) -> AppServices {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    AppServices::new_sqlite(&url, Clock::fixed(fixed_now()))
        .await
        .expect("connect sqlite")
}

#[tokio::test]
async fn dashboard_flow_add_mark_goal_delete() {
    let services = sqlite_services("memdb_dashboard_flow").await;
    let user = UserId::generate();
    let mut store = services.dashboard(user);
    store.load().await.expect("load");
    assert!(store.subjects().is_empty());

    let maths = store
        .add_subject(SubjectDraft::named("Mathematics").with_counts(45, 42))
        .await
        .expect("add maths");
    let physics = store
        .add_subject(SubjectDraft::named("Physics").with_counts(40, 35))
        .await
        .expect("add physics");

    store
        .mark_attendance(maths, AttendanceStatus::Present)
        .await
        .expect("mark");
    let subject = store.subject(maths).expect("maths loaded");
    assert_eq!(subject.attended_classes(), 43);
    assert_eq!(subject.total_classes(), 46);
    assert_eq!(subject.last_attended(), Some(fixed_today()));

    store.begin_goal_edit(physics).expect("begin goal edit");
    store.set_goal_draft(physics, 95).expect("set draft");
    store.save_goal_edit(physics).await.expect("save goal");
    let projection = store.projection(physics).expect("projection");
    assert_eq!(projection.goal, 95);
    assert_eq!(projection.status, GoalStatus::OnTrack);
    assert_eq!(projection.classes_needed, 50);

    let report = store.report();
    assert_eq!(report.needs_attention, vec![physics]);

    store.delete_subject(physics).await.expect("delete");
    assert_eq!(store.subjects().len(), 1);
    let summary = store.summary();
    assert_eq!(summary.subject_count, 1);
    assert_eq!(summary.total_classes, 46);

    // A fresh store over the same database sees the persisted state.
    let mut reloaded = services.dashboard(user);
    reloaded.load().await.expect("reload");
    assert_eq!(reloaded.subjects(), store.subjects());

    let today = fixed_today();
    let days = store
        .calendar(today.year(), today.month())
        .await
        .expect("calendar");
    let day = days.iter().find(|d| d.date == today).expect("today in month");
    assert_eq!(day.tier(), DayTier::Full);

    let kinds: Vec<_> = store
        .take_notifications()
        .into_iter()
        .map(|n| n.kind)
        .collect();
    assert!(kinds.iter().all(|k| *k == NotificationKind::Success));
}

#[tokio::test]
async fn dashboard_rejects_unknown_subjects_without_changing_state() {
    let services = sqlite_services("memdb_dashboard_unknown").await;
    let mut store = services.dashboard(UserId::generate());
    let id = store
        .add_subject(SubjectDraft::named("History").with_counts(20, 18))
        .await
        .expect("add");
    let before = store.subjects().to_vec();
    store.take_notifications();

    let missing = attendance_core::model::SubjectId::new(999);
    assert!(store.mark_attendance(missing, AttendanceStatus::Present).await.is_err());
    assert!(store.delete_subject(missing).await.is_err());
    assert!(matches!(
        store.begin_goal_edit(missing),
        Err(StoreError::UnknownSubject(_))
    ));

    assert_eq!(store.subjects(), before.as_slice());
    let notes = store.take_notifications();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| n.kind == NotificationKind::Error));
    assert!(store.subject(id).is_some());
}

#[tokio::test]
async fn recount_keeps_counts_entered_by_hand() {
    let services = sqlite_services("memdb_dashboard_recount").await;
    let user = UserId::generate();
    let mut store = services.dashboard(user);
    let id = store
        .add_subject(SubjectDraft::named("Mathematics").with_counts(45, 42))
        .await
        .expect("add");
    store
        .mark_attendance(id, AttendanceStatus::Present)
        .await
        .expect("mark");
    let before = store.subject(id).expect("loaded").clone();
    assert_eq!((before.attended_classes(), before.total_classes()), (43, 46));
    store.take_notifications();

    store.recount(id).await.expect("recount");
    let after = store.subject(id).expect("loaded").clone();
    assert_eq!((after.attended_classes(), after.total_classes()), (43, 46));
    assert_eq!(after.last_attended(), Some(fixed_today()));

    let notes = store.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::Success);
    assert_eq!(notes[0].title, "Attendance recounted");

    // An edit moves the hand-entered part; the recorded class stays counted.
    let draft = SubjectDraft::from_subject(&after).with_counts(50, 45);
    store.update_subject(id, draft).await.expect("edit");
    store.recount(id).await.expect("recount after edit");
    let edited = store.subject(id).expect("loaded");
    assert_eq!((edited.attended_classes(), edited.total_classes()), (45, 50));

    let history = services
        .attendance()
        .history(user, id)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
}
