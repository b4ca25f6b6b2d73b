use attendance_core::model::{
    AttendanceStatus, ManualCounts, NewAttendanceRecord, Profile, ProfileDraft, Subject, SubjectDraft,
    SubjectId, UserId,
};
use attendance_core::time::{fixed_now, fixed_today};
use chrono::{Duration, NaiveDate};
use storage::repository::{
    AttendancePersistence, AttendanceRepository, ProfileRepository, StorageError,
    SubjectRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_subject(user: UserId, name: &str, total: u32, attended: u32) -> Subject {
    Subject::new(
        SubjectId::new(0),
        user,
        SubjectDraft::named(name).with_counts(total, attended),
        fixed_now(),
    )
    .unwrap()
}

fn mark_on(subject: &Subject, date: NaiveDate, status: AttendanceStatus) -> NewAttendanceRecord {
    NewAttendanceRecord {
        user_id: subject.user_id(),
        subject_id: subject.id(),
        date,
        status,
        created_at: fixed_now(),
    }
}

#[tokio::test]
async fn sqlite_roundtrip_persists_subject_fields() {
    let repo = connect("memdb_subject_roundtrip").await;
    let user = UserId::generate();

    let draft = SubjectDraft::named("Computer Science")
        .with_counts(42, 38)
        .with_color("indigo")
        .with_goal(85);
    let subject = Subject::new(SubjectId::new(0), user, draft, fixed_now()).unwrap();
    let id = repo.insert_subject(&subject).await.unwrap();

    let fetched = repo.get_subject(user, id).await.unwrap().expect("stored");
    assert_eq!(fetched.name(), "Computer Science");
    assert_eq!(fetched.total_classes(), 42);
    assert_eq!(fetched.attended_classes(), 38);
    assert_eq!(fetched.color(), "indigo");
    assert_eq!(fetched.attendance_goal(), Some(85));
    assert_eq!(fetched.created_at(), fixed_now());
    assert_eq!(
        fetched.manual_counts(),
        ManualCounts {
            total: 42,
            attended: 38
        }
    );

    let stranger = UserId::generate();
    assert!(repo.get_subject(stranger, id).await.unwrap().is_none());
    assert!(repo.list_subjects(stranger).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_apply_mark_is_atomic_and_ordered() {
    let repo = connect("memdb_apply_mark").await;
    let user = UserId::generate();
    let id = repo
        .insert_subject(&build_subject(user, "Mathematics", 45, 42))
        .await
        .unwrap();
    let mut subject = repo.get_subject(user, id).await.unwrap().unwrap();

    let later = fixed_today() + Duration::days(1);
    subject.record_mark(AttendanceStatus::Present, later);
    repo.apply_mark(&subject, mark_on(&subject, later, AttendanceStatus::Present))
        .await
        .unwrap();
    subject.record_mark(AttendanceStatus::Absent, fixed_today());
    repo.apply_mark(&subject, mark_on(&subject, fixed_today(), AttendanceStatus::Absent))
        .await
        .unwrap();

    let stored = repo.get_subject(user, id).await.unwrap().unwrap();
    assert_eq!(stored.total_classes(), 47);
    assert_eq!(stored.attended_classes(), 43);

    let records = repo.records_for_subject(user, id).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].date, fixed_today());
    assert_eq!(records[0].status, AttendanceStatus::Absent);
    assert_eq!(records[1].status, AttendanceStatus::Present);

    let window = repo
        .records_between(user, later, later)
        .await
        .unwrap();
    assert_eq!(window.len(), 1);
}

#[tokio::test]
async fn sqlite_apply_mark_on_missing_subject_writes_nothing() {
    let repo = connect("memdb_mark_missing").await;
    let user = UserId::generate();
    let ghost = build_subject(user, "Ghost", 1, 1).with_id(SubjectId::new(77));

    let err = repo
        .apply_mark(&ghost, mark_on(&ghost, fixed_today(), AttendanceStatus::Present))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert!(repo
        .records_for_subject(user, SubjectId::new(77))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn sqlite_delete_cascades_records() {
    let repo = connect("memdb_delete_cascade").await;
    let user = UserId::generate();
    let id = repo
        .insert_subject(&build_subject(user, "History", 0, 0))
        .await
        .unwrap();
    let subject = repo.get_subject(user, id).await.unwrap().unwrap();
    repo.append_record(mark_on(&subject, fixed_today(), AttendanceStatus::Present))
        .await
        .unwrap();
    repo.append_record(mark_on(&subject, fixed_today(), AttendanceStatus::Present))
        .await
        .unwrap();

    repo.delete_subject(user, id).await.unwrap();

    assert!(repo.get_subject(user, id).await.unwrap().is_none());
    assert!(repo
        .records_between(user, fixed_today(), fixed_today())
        .await
        .unwrap()
        .is_empty());
    assert!(matches!(
        repo.delete_subject(user, id).await.unwrap_err(),
        StorageError::NotFound
    ));
}

#[tokio::test]
async fn sqlite_update_missing_subject_is_not_found() {
    let repo = connect("memdb_update_missing").await;
    let ghost = build_subject(UserId::generate(), "Ghost", 0, 0).with_id(SubjectId::new(5));
    let err = repo.update_subject(&ghost).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_profile_upsert_overwrites() {
    let repo = connect("memdb_profiles").await;
    let user = UserId::generate();
    assert!(repo.get_profile(user).await.unwrap().is_none());

    let mut profile = Profile::empty(user, fixed_now());
    profile
        .apply(
            ProfileDraft {
                username: "ada".into(),
                full_name: "Ada Lovelace".into(),
            },
            fixed_now(),
        )
        .unwrap();
    repo.upsert_profile(&profile).await.unwrap();

    profile
        .apply(
            ProfileDraft {
                username: "ada".into(),
                full_name: String::new(),
            },
            fixed_now() + Duration::minutes(5),
        )
        .unwrap();
    repo.upsert_profile(&profile).await.unwrap();

    let stored = repo.get_profile(user).await.unwrap().unwrap();
    assert_eq!(stored.username(), Some("ada"));
    assert_eq!(stored.full_name(), None);
    assert_eq!(stored.updated_at(), fixed_now() + Duration::minutes(5));
}

#[tokio::test]
async fn sqlite_update_persists_manual_counts() {
    let repo = connect("memdb_manual_counts").await;
    let user = UserId::generate();

    let mut subject = build_subject(user, "Mathematics", 45, 42);
    let id = repo.insert_subject(&subject).await.unwrap();
    subject = subject.with_id(id);

    let record = mark_on(&subject, fixed_today(), AttendanceStatus::Present);
    subject.record_mark(AttendanceStatus::Present, fixed_today());
    repo.apply_mark(&subject, record).await.unwrap();

    subject
        .apply_draft(SubjectDraft::from_subject(&subject).with_counts(50, 45))
        .unwrap();
    repo.update_subject(&subject).await.unwrap();

    let fetched = repo.get_subject(user, id).await.unwrap().expect("stored");
    assert_eq!(fetched.total_classes(), 50);
    assert_eq!(
        fetched.manual_counts(),
        ManualCounts {
            total: 49,
            attended: 44
        }
    );

    // Running migrations again leaves the schema and rows alone.
    repo.migrate().await.unwrap();
    let again = repo.get_subject(user, id).await.unwrap().expect("stored");
    assert_eq!(again.manual_counts(), fetched.manual_counts());
}
