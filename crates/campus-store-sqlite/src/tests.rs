//! Integration tests for `SqliteStore` against an in-memory database.

use campus_core::{
  access::{self, GroupName, Permission},
  activity::NewActivity,
  attendance::{AttendanceRow, parse_attendance_csv},
  provision,
  school::{Class, Criterion, NewClass, NewCriterion, NewSemester, Semester},
  statistics::{Achievement, StatisticsScope},
  store::CampusStore,
  user::{NewAccount, NewUser, Role, User, UserDetails, UserKind},
};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A faculty with one major and one class, plus a semester and a criterion.
struct Fixture {
  faculty_id: i64,
  class:      Class,
  semester:   Semester,
  criterion:  Criterion,
}

async fn fixture(s: &SqliteStore) -> Fixture {
  let faculty = s.add_faculty("Information Technology".into()).await.unwrap();
  let major = s.add_major(faculty.faculty_id, "Computer Science".into()).await.unwrap();
  let class = s
    .add_class(NewClass { name: "DH20IT01".into(), major_id: major.major_id })
    .await
    .unwrap();
  let semester = s
    .add_semester(NewSemester {
      code:      "2023-2024-1".into(),
      name:      "Semester 1, 2023-2024".into(),
      starts_on: NaiveDate::from_ymd_opt(2023, 9, 1).unwrap(),
      ends_on:   NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
    })
    .await
    .unwrap();
  let criterion = s
    .add_criterion(NewCriterion { name: "Volunteering".into(), max_point: 25 })
    .await
    .unwrap();

  Fixture { faculty_id: faculty.faculty_id, class, semester, criterion }
}

fn new_user(code: &str, details: UserDetails) -> NewUser {
  NewUser {
    code: code.into(),
    full_name: format!("User {code}"),
    email: None,
    details,
  }
}

async fn student(s: &SqliteStore, code: &str, class_id: i64) -> User {
  s.add_user(new_user(code, UserDetails::Student { class_id })).await.unwrap()
}

async fn activity(s: &SqliteStore, f: &Fixture, point: i64) -> i64 {
  s.add_activity(NewActivity {
    name:         format!("Blood drive ({point})"),
    criterion_id: f.criterion.criterion_id,
    semester_id:  f.semester.semester_id,
    point,
  })
  .await
  .unwrap()
  .activity_id
}

fn row(line: usize, code: &str, activity_id: impl ToString) -> AttendanceRow {
  AttendanceRow {
    line,
    student_code: code.into(),
    activity_id: activity_id.to_string(),
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_find_user_by_code() {
  let s = store().await;
  let f = fixture(&s).await;
  let added = student(&s, "2051050001", f.class.class_id).await;

  let found = s.find_user_by_code("2051050001").await.unwrap().unwrap();
  assert_eq!(found.user_id, added.user_id);
  assert_eq!(found.kind(), UserKind::Student);
  assert_eq!(found.details, UserDetails::Student { class_id: f.class.class_id });

  assert!(s.find_user_by_code("nobody").await.unwrap().is_none());
  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn user_codes_are_unique_across_variants() {
  let s = store().await;
  let f = fixture(&s).await;
  student(&s, "X1", f.class.class_id).await;

  let err = s
    .add_user(new_user("X1", UserDetails::Assistant { faculty_id: Some(f.faculty_id) }))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));
}

// ─── Accounts and provisioning ───────────────────────────────────────────────

fn new_account(code: &str, username: &str, details: UserDetails, role: Role) -> NewAccount {
  NewAccount {
    user: new_user(code, details),
    username: username.into(),
    password_hash: "h".into(),
    role,
  }
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() {
  let s = store().await;
  let plan = access::plan(Role::Administrator);
  s.create_account(new_account("A1", "root", UserDetails::Administrator, Role::Administrator), &plan)
    .await
    .unwrap();

  let err = s
    .create_account(new_account("A2", "root", UserDetails::Administrator, Role::Administrator), &plan)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(ref m) if m.contains("root")));
}

#[tokio::test]
async fn failed_account_creation_leaves_no_user() {
  let s = store().await;
  provision::register_account(&s, new_user("A1", UserDetails::Administrator), "dup".into(), "h".into())
    .await
    .unwrap();

  let err = provision::register_account(&s, new_user("A2", UserDetails::Administrator), "dup".into(), "h".into())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));
  assert!(s.find_user_by_code("A2").await.unwrap().is_none());

  // The code is still free for a retry under another username.
  let (user, account) =
    provision::register_account(&s, new_user("A2", UserDetails::Administrator), "other".into(), "h".into())
      .await
      .unwrap();
  assert_eq!(account.user_id, user.user_id);
}

#[tokio::test]
async fn taken_code_rolls_back_the_account() {
  let s = store().await;
  let f = fixture(&s).await;
  student(&s, "S1", f.class.class_id).await;

  let err = provision::register_account(
    &s,
    new_user("S1", UserDetails::Student { class_id: f.class.class_id }),
    "s1".into(),
    "h".into(),
  )
  .await
  .unwrap_err();
  assert!(matches!(err, Error::Conflict(ref m) if m.contains("S1")));
  assert!(s.get_account_by_username("s1").await.unwrap().is_none());
}

#[tokio::test]
async fn register_account_provisions_exact_memberships() {
  let s = store().await;
  let f = fixture(&s).await;

  let cases = [
    (
      new_user("ADM", UserDetails::Administrator),
      vec![GroupName::Specialist, GroupName::Assistant, GroupName::Student],
    ),
    (
      new_user("SPC", UserDetails::Specialist { faculty_id: Some(f.faculty_id) }),
      vec![GroupName::Specialist, GroupName::Assistant],
    ),
    (
      new_user("AST", UserDetails::Assistant { faculty_id: Some(f.faculty_id) }),
      vec![GroupName::Assistant],
    ),
    (
      new_user("STU", UserDetails::Student { class_id: f.class.class_id }),
      vec![GroupName::Student],
    ),
  ];

  for (input, groups) in cases {
    let username = input.code.to_lowercase();
    let (user, account) =
      provision::register_account(&s, input, username.clone(), "hash".into())
        .await
        .unwrap();
    assert_eq!(account.user_id, user.user_id);
    assert_eq!(account.groups, groups, "{username}");

    let stored = s.get_account_by_username(&username).await.unwrap().unwrap();
    assert_eq!(stored.groups, groups);
    assert_eq!(stored.password_hash, "hash");
  }
}

#[tokio::test]
async fn provisioning_twice_converges() {
  let s = store().await;
  let (_, account) = provision::register_account(
    &s,
    new_user("S1", UserDetails::Specialist { faculty_id: None }),
    "s1".into(),
    "h".into(),
  )
  .await
  .unwrap();

  let first = provision::set_permissions(&s, &account).await.unwrap();
  let second = provision::set_permissions(&s, &first).await.unwrap();
  assert_eq!(first.groups, account.groups);
  assert_eq!(second.groups, account.groups);

  let perms = s.group_permissions(GroupName::Specialist).await.unwrap();
  assert_eq!(perms.len(), access::SPECIALIST_PERMISSIONS.len());
}

#[tokio::test]
async fn provisioning_overwrites_group_permissions() {
  let s = store().await;
  let (_, account) = provision::register_account(
    &s,
    new_user("A1", UserDetails::Assistant { faculty_id: None }),
    "a1".into(),
    "h".into(),
  )
  .await
  .unwrap();

  // A stray grant is wiped by the next provisioning.
  s.conn
    .call(|conn| {
      conn.execute(
        "INSERT INTO group_permissions (group_name, codename) VALUES ('assistant', 'register_activity')",
        [],
      )?;
      Ok(())
    })
    .await
    .unwrap();
  assert!(
    s.group_permissions(GroupName::Assistant)
      .await
      .unwrap()
      .contains(&Permission::RegisterActivity)
  );

  provision::set_permissions(&s, &account).await.unwrap();
  let perms = s.group_permissions(GroupName::Assistant).await.unwrap();
  let mut expected = access::ASSISTANT_PERMISSIONS.to_vec();
  expected.sort();
  assert_eq!(perms, expected);
}

#[tokio::test]
async fn account_permissions_union_groups() {
  let s = store().await;
  // Provision the assistant group before the specialist joins it.
  provision::register_account(
    &s,
    new_user("A1", UserDetails::Assistant { faculty_id: None }),
    "a1".into(),
    "h".into(),
  )
  .await
  .unwrap();
  let (_, specialist) = provision::register_account(
    &s,
    new_user("S1", UserDetails::Specialist { faculty_id: None }),
    "s1".into(),
    "h".into(),
  )
  .await
  .unwrap();

  let perms = s.account_permissions(specialist.account_id).await.unwrap();
  assert!(perms.contains(&Permission::CreateAssistantAccount));
  assert!(perms.contains(&Permission::UploadAttendanceCsv));
  assert!(!perms.contains(&Permission::RegisterActivity));
}

#[tokio::test]
async fn reprovision_fixes_a_stale_role() {
  let s = store().await;
  let f = fixture(&s).await;
  let (user, stale) = s
    .create_account(
      new_account("STU", "stu", UserDetails::Student { class_id: f.class.class_id }, Role::Assistant),
      &access::plan(Role::Assistant),
    )
    .await
    .unwrap();
  assert_eq!(stale.groups, vec![GroupName::Assistant]);

  let account = provision::reprovision(&s, &user, &stale).await.unwrap();
  assert_eq!(account.role, Role::Student);
  assert_eq!(account.groups, vec![GroupName::Student]);
}

#[tokio::test]
async fn provisioning_unknown_account_fails() {
  let s = store().await;
  let err = s
    .apply_provisioning(Uuid::new_v4(), &access::plan(Role::Student))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AccountNotFound(_)));
}

// ─── Catalogue ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn classes_filter_by_faculty() {
  let s = store().await;
  let f = fixture(&s).await;
  let other = s.add_faculty("Economics".into()).await.unwrap();
  let major = s.add_major(other.faculty_id, "Finance".into()).await.unwrap();
  s.add_class(NewClass { name: "DH20FN01".into(), major_id: major.major_id })
    .await
    .unwrap();

  assert_eq!(s.list_classes(None).await.unwrap().len(), 2);
  let it = s.list_classes(Some(f.faculty_id)).await.unwrap();
  assert_eq!(it, vec![f.class.clone()]);
  assert_eq!(it[0].faculty_id, f.faculty_id);
  assert_eq!(s.get_class(f.class.class_id).await.unwrap(), Some(f.class));
}

#[tokio::test]
async fn semesters_newest_first() {
  let s = store().await;
  let f = fixture(&s).await;
  s.add_semester(NewSemester {
    code:      "2023-2024-2".into(),
    name:      "Semester 2, 2023-2024".into(),
    starts_on: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
    ends_on:   NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
  })
  .await
  .unwrap();

  let codes: Vec<_> =
    s.list_semesters().await.unwrap().into_iter().map(|s| s.code).collect();
  assert_eq!(codes, vec!["2023-2024-2".to_string(), f.semester.code.clone()]);

  let by_code = s.get_semester_by_code(&f.semester.code).await.unwrap();
  assert_eq!(by_code, Some(f.semester));
}

// ─── Activities ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn registering_twice_is_a_conflict() {
  let s = store().await;
  let f = fixture(&s).await;
  let stu = student(&s, "S1", f.class.class_id).await;
  let a = activity(&s, &f, 5).await;

  let reg = s.register_activity(stu.user_id, a).await.unwrap();
  assert!(!reg.is_point_added);
  let err = s.register_activity(stu.user_id, a).await.unwrap_err();
  assert!(matches!(err, Error::Conflict(_)));
}

// ─── Attendance reconciliation ───────────────────────────────────────────────

#[tokio::test]
async fn reconcile_credits_once() {
  let s = store().await;
  let f = fixture(&s).await;
  let stu = student(&s, "S1", f.class.class_id).await;
  let a = activity(&s, &f, 5).await;
  s.register_activity(stu.user_id, a).await.unwrap();

  let rows = [row(2, "S1", a)];
  let first = s.reconcile_attendance(&rows).await.unwrap();
  assert_eq!((first.rows, first.credited, first.already_credited), (1, 1, 0));

  let second = s.reconcile_attendance(&rows).await.unwrap();
  assert_eq!((second.credited, second.already_credited), (0, 1));

  let points = s.training_points(stu.user_id, f.semester.semester_id).await.unwrap();
  assert_eq!(points.len(), 1);
  assert_eq!(points[0].point, 5);
  assert_eq!(points[0].criterion_id, f.criterion.criterion_id);

  let reg = s.get_registration(stu.user_id, a).await.unwrap().unwrap();
  assert!(reg.is_point_added);
}

#[tokio::test]
async fn duplicate_rows_in_one_file_credit_once() {
  let s = store().await;
  let f = fixture(&s).await;
  let stu = student(&s, "S1", f.class.class_id).await;
  let a = activity(&s, &f, 7).await;
  s.register_activity(stu.user_id, a).await.unwrap();

  let report = s
    .reconcile_attendance(&[row(2, "S1", a), row(3, "S1", a)])
    .await
    .unwrap();
  assert_eq!((report.credited, report.already_credited), (1, 1));

  let points = s.training_points(stu.user_id, f.semester.semester_id).await.unwrap();
  assert_eq!(points[0].point, 7);
}

#[tokio::test]
async fn unresolved_rows_are_skipped() {
  let s = store().await;
  let f = fixture(&s).await;
  let stu = student(&s, "S1", f.class.class_id).await;
  student(&s, "S2", f.class.class_id).await;
  let assistant = s
    .add_user(new_user("AST", UserDetails::Assistant { faculty_id: None }))
    .await
    .unwrap();
  let a = activity(&s, &f, 5).await;
  s.register_activity(stu.user_id, a).await.unwrap();
  s.register_activity(assistant.user_id, a).await.unwrap();

  let report = s
    .reconcile_attendance(&[
      row(2, "NOBODY", a),
      row(3, "S1", 9999),
      row(4, "S2", a),
      row(5, "S1", "abc"),
      row(6, "AST", a),
      row(7, "S1", a),
    ])
    .await
    .unwrap();
  assert_eq!(report.rows, 6);
  assert_eq!(report.unresolved, 5);
  assert_eq!(report.credited, 1);

  let points = s.training_points(assistant.user_id, f.semester.semester_id).await.unwrap();
  assert!(points.is_empty());
}

#[tokio::test]
async fn header_only_file_changes_nothing() {
  let s = store().await;
  let rows = parse_attendance_csv("student_code,activity_id\n").unwrap();
  let report = s.reconcile_attendance(&rows).await.unwrap();
  assert_eq!(report.rows, 0);
  assert_eq!(report.credited, 0);
}

#[tokio::test]
async fn credited_points_are_capped_at_criterion_max() {
  let s = store().await;
  let f = fixture(&s).await;
  let stu = student(&s, "S1", f.class.class_id).await;
  let big = activity(&s, &f, 20).await;
  let small = activity(&s, &f, 10).await;
  let huge = activity(&s, &f, 40).await;
  for a in [big, small] {
    s.register_activity(stu.user_id, a).await.unwrap();
  }

  s.reconcile_attendance(&[row(2, "S1", big), row(3, "S1", small)])
    .await
    .unwrap();
  let points = s.training_points(stu.user_id, f.semester.semester_id).await.unwrap();
  assert_eq!(points[0].point, f.criterion.max_point);

  let other = student(&s, "S2", f.class.class_id).await;
  s.register_activity(other.user_id, huge).await.unwrap();
  s.reconcile_attendance(&[row(2, "S2", huge)]).await.unwrap();
  let points = s.training_points(other.user_id, f.semester.semester_id).await.unwrap();
  assert_eq!(points[0].point, f.criterion.max_point);
}

#[tokio::test]
async fn failed_row_rolls_back_the_whole_file() {
  let s = store().await;
  let f = fixture(&s).await;
  let s1 = student(&s, "S1", f.class.class_id).await;
  let s2 = student(&s, "S2", f.class.class_id).await;
  let a = activity(&s, &f, 5).await;
  for stu in [&s1, &s2] {
    s.register_activity(stu.user_id, a).await.unwrap();
  }

  let blocked = crate::encode::encode_uuid(s2.user_id);
  s.conn
    .call(move |conn| {
      conn.execute_batch(&format!(
        "CREATE TRIGGER reject_s2 BEFORE INSERT ON training_points
         WHEN NEW.student_id = '{blocked}'
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;"
      ))?;
      Ok(())
    })
    .await
    .unwrap();

  let result = s.reconcile_attendance(&[row(2, "S1", a), row(3, "S2", a)]).await;
  assert!(result.is_err());

  let reg = s.get_registration(s1.user_id, a).await.unwrap().unwrap();
  assert!(!reg.is_point_added);
  let points = s.training_points(s1.user_id, f.semester.semester_id).await.unwrap();
  assert!(points.is_empty());
}

// ─── Interactions ────────────────────────────────────────────────────────────

async fn account_for(s: &SqliteStore, code: &str, class_id: i64) -> campus_core::user::Account {
  let (_, account) = provision::register_account(
    s,
    new_user(code, UserDetails::Student { class_id }),
    code.to_lowercase(),
    "h".into(),
  )
  .await
  .unwrap();
  account
}

#[tokio::test]
async fn comments_list_newest_first() {
  let s = store().await;
  let f = fixture(&s).await;
  let a = activity(&s, &f, 5).await;
  let alice = account_for(&s, "S1", f.class.class_id).await;
  let bob = account_for(&s, "S2", f.class.class_id).await;

  let first = s.add_comment(alice.account_id, a, "See you there".into()).await.unwrap();
  assert_eq!(first.username, "s1");
  assert_eq!(first.account_id, alice.account_id);
  let second = s.add_comment(bob.account_id, a, "Count me in".into()).await.unwrap();

  let listed = s.list_comments(a).await.unwrap();
  assert_eq!(listed, vec![second, first]);

  let other = activity(&s, &f, 3).await;
  assert!(s.list_comments(other).await.unwrap().is_empty());
}

#[tokio::test]
async fn like_toggles_and_counts() {
  let s = store().await;
  let f = fixture(&s).await;
  let a = activity(&s, &f, 5).await;
  let alice = account_for(&s, "S1", f.class.class_id).await;
  let bob = account_for(&s, "S2", f.class.class_id).await;

  let state = s.toggle_like(alice.account_id, a).await.unwrap();
  assert!(state.liked);
  assert_eq!(state.likes, 1);

  let state = s.toggle_like(bob.account_id, a).await.unwrap();
  assert_eq!((state.liked, state.likes), (true, 2));

  let state = s.toggle_like(alice.account_id, a).await.unwrap();
  assert_eq!((state.liked, state.likes), (false, 1));

  let state = s.toggle_like(alice.account_id, a).await.unwrap();
  assert_eq!((state.liked, state.likes), (true, 2));
}

#[tokio::test]
async fn likes_are_unique_per_account() {
  let s = store().await;
  let f = fixture(&s).await;
  let a = activity(&s, &f, 5).await;
  let alice = account_for(&s, "S1", f.class.class_id).await;
  s.toggle_like(alice.account_id, a).await.unwrap();

  let account = crate::encode::encode_uuid(alice.account_id);
  let err = s
    .conn
    .call(move |conn| {
      conn.execute(
        "INSERT INTO likes (account_id, activity_id, created_at) VALUES (?1, ?2, '')",
        rusqlite::params![account, a],
      )?;
      Ok(())
    })
    .await
    .unwrap_err();
  assert!(err.to_string().contains("UNIQUE"));
}

#[tokio::test]
async fn activity_detail_counts_interactions() {
  let s = store().await;
  let f = fixture(&s).await;
  let a = activity(&s, &f, 5).await;
  let alice = account_for(&s, "S1", f.class.class_id).await;

  let detail = s.activity_detail(a).await.unwrap().unwrap();
  assert_eq!(detail.activity, s.get_activity(a).await.unwrap().unwrap());
  assert_eq!(detail.criterion, "Volunteering");
  assert_eq!(detail.semester, f.semester.code);
  assert_eq!((detail.likes, detail.comments), (0, 0));

  s.toggle_like(alice.account_id, a).await.unwrap();
  s.add_comment(alice.account_id, a, "one".into()).await.unwrap();
  s.add_comment(alice.account_id, a, "two".into()).await.unwrap();
  let detail = s.activity_detail(a).await.unwrap().unwrap();
  assert_eq!((detail.likes, detail.comments), (1, 2));

  assert!(s.activity_detail(9999).await.unwrap().is_none());
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn statistics_respect_scope() {
  let s = store().await;
  let f = fixture(&s).await;
  let high = s
    .add_criterion(NewCriterion { name: "Academics".into(), max_point: 100 })
    .await
    .unwrap();

  let other_class = s
    .add_class(NewClass { name: "DH20IT02".into(), major_id: f.class.major_id })
    .await
    .unwrap();

  let s1 = student(&s, "S1", f.class.class_id).await;
  student(&s, "S2", f.class.class_id).await;
  let s3 = student(&s, "S3", other_class.class_id).await;

  let a = s
    .add_activity(NewActivity {
      name:         "Olympiad".into(),
      criterion_id: high.criterion_id,
      semester_id:  f.semester.semester_id,
      point:        92,
    })
    .await
    .unwrap()
    .activity_id;
  for stu in [&s1, &s3] {
    s.register_activity(stu.user_id, a).await.unwrap();
  }
  s.reconcile_attendance(&[row(2, "S1", a), row(3, "S3", a)])
    .await
    .unwrap();

  let class_scope = StatisticsScope::new(None, Some(f.class.class_id)).unwrap();
  let stats = s.statistics(&f.semester, &class_scope).await.unwrap();
  assert_eq!(stats.student_count, 2);
  assert_eq!(stats.count(Achievement::Excellent), 1);
  assert_eq!(stats.count(Achievement::Poor), 1);
  assert_eq!(stats.average_total, 46.0);
  assert_eq!(stats.criteria.len(), 2);

  let faculty_scope = StatisticsScope::new(Some(f.faculty_id), None).unwrap();
  let stats = s.statistics(&f.semester, &faculty_scope).await.unwrap();
  assert_eq!(stats.student_count, 3);
  assert_eq!(stats.count(Achievement::Excellent), 2);
  let academics = stats
    .criteria
    .iter()
    .find(|c| c.criterion_id == high.criterion_id)
    .unwrap();
  assert!((academics.average - 184.0 / 3.0).abs() < 1e-9);
}
