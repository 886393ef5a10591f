//! The `CampusStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `campus-store-sqlite`).
//! Higher layers (`campus-api`, `campus-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  access::{GroupName, Permission, ProvisioningPlan},
  activity::{Activity, ActivityDetail, ActivityRegistration, NewActivity, TrainingPoint},
  attendance::{AttendanceRow, ReconcileReport},
  interact::{Comment, LikeState},
  school::{Class, Criterion, Faculty, Major, NewClass, NewCriterion, NewSemester, Semester},
  statistics::{Statistics, StatisticsScope},
  user::{Account, NewAccount, NewUser, Role, User},
};

/// Errors raised by a [`CampusStore`].
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// A uniqueness constraint rejected the write.
  fn is_conflict(&self) -> bool;
}

/// Abstraction over a campus store backend.
///
/// Every method that performs more than one write runs it atomically: a
/// failure leaves no partial state visible to other readers.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CampusStore: Send + Sync {
  type Error: StoreError;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user with no account, e.g. a student imported from the
  /// registrar. Fails if `code` is already taken by any variant.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Resolve an external code against every user variant.
  fn find_user_by_code<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Write a user, its account and the account's provisioning in one
  /// transaction. A taken code or username leaves nothing behind.
  fn create_account<'a>(
    &'a self,
    input: NewAccount,
    plan: &'a ProvisioningPlan,
  ) -> impl Future<Output = Result<(User, Account), Self::Error>> + Send + 'a;

  fn get_account(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn get_account_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Overwrite the stored role of an account.
  fn update_account_role(
    &self,
    account_id: Uuid,
    role: Role,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  /// Apply `plan` to an account in one transaction: create missing groups,
  /// replace the granted group's permission set, then replace the account's
  /// group memberships.
  fn apply_provisioning<'a>(
    &'a self,
    account_id: Uuid,
    plan: &'a ProvisioningPlan,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + 'a;

  /// The permission set currently stored for `group`.
  fn group_permissions(
    &self,
    group: GroupName,
  ) -> impl Future<Output = Result<Vec<Permission>, Self::Error>> + Send + '_;

  /// Union of the permission sets of the account's groups.
  fn account_permissions(
    &self,
    account_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Permission>, Self::Error>> + Send + '_;

  // ── School catalogue ──────────────────────────────────────────────────

  fn add_faculty(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Faculty, Self::Error>> + Send + '_;

  fn add_major(
    &self,
    faculty_id: i64,
    name: String,
  ) -> impl Future<Output = Result<Major, Self::Error>> + Send + '_;

  fn add_class(
    &self,
    input: NewClass,
  ) -> impl Future<Output = Result<Class, Self::Error>> + Send + '_;

  fn add_semester(
    &self,
    input: NewSemester,
  ) -> impl Future<Output = Result<Semester, Self::Error>> + Send + '_;

  fn add_criterion(
    &self,
    input: NewCriterion,
  ) -> impl Future<Output = Result<Criterion, Self::Error>> + Send + '_;

  fn get_faculty(
    &self,
    faculty_id: i64,
  ) -> impl Future<Output = Result<Option<Faculty>, Self::Error>> + Send + '_;

  fn get_class(
    &self,
    class_id: i64,
  ) -> impl Future<Output = Result<Option<Class>, Self::Error>> + Send + '_;

  fn get_semester_by_code<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<Semester>, Self::Error>> + Send + 'a;

  /// Active classes, optionally restricted to one faculty.
  fn list_classes(
    &self,
    faculty_id: Option<i64>,
  ) -> impl Future<Output = Result<Vec<Class>, Self::Error>> + Send + '_;

  /// Active criteria.
  fn list_criteria(
    &self,
  ) -> impl Future<Output = Result<Vec<Criterion>, Self::Error>> + Send + '_;

  /// Active semesters, newest first.
  fn list_semesters(
    &self,
  ) -> impl Future<Output = Result<Vec<Semester>, Self::Error>> + Send + '_;

  // ── Activities ────────────────────────────────────────────────────────

  fn add_activity(
    &self,
    input: NewActivity,
  ) -> impl Future<Output = Result<Activity, Self::Error>> + Send + '_;

  fn get_activity(
    &self,
    activity_id: i64,
  ) -> impl Future<Output = Result<Option<Activity>, Self::Error>> + Send + '_;

  /// Register a student for an activity. Fails if the pair is already
  /// registered.
  fn register_activity(
    &self,
    student_id: Uuid,
    activity_id: i64,
  ) -> impl Future<Output = Result<ActivityRegistration, Self::Error>> + Send + '_;

  fn get_registration(
    &self,
    student_id: Uuid,
    activity_id: i64,
  ) -> impl Future<Output = Result<Option<ActivityRegistration>, Self::Error>> + Send + '_;

  /// A student's points for every criterion credited in a semester.
  fn training_points(
    &self,
    student_id: Uuid,
    semester_id: i64,
  ) -> impl Future<Output = Result<Vec<TrainingPoint>, Self::Error>> + Send + '_;

  /// Apply a batch of attendance rows in a single transaction.
  ///
  /// Rows that do not resolve to a registration, or whose registration was
  /// already credited, are skipped without error. Any storage failure rolls
  /// back the whole batch.
  fn reconcile_attendance<'a>(
    &'a self,
    rows: &'a [AttendanceRow],
  ) -> impl Future<Output = Result<ReconcileReport, Self::Error>> + Send + 'a;

  /// An activity with its catalogue names and interaction counts.
  fn activity_detail(
    &self,
    activity_id: i64,
  ) -> impl Future<Output = Result<Option<ActivityDetail>, Self::Error>> + Send + '_;

  // ── Interactions ──────────────────────────────────────────────────────

  fn add_comment(
    &self,
    account_id: Uuid,
    activity_id: i64,
    content: String,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  /// Comments on an activity, newest first.
  fn list_comments(
    &self,
    activity_id: i64,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Like the activity, or take the like back if the account already likes
  /// it. One account holds at most one like per activity.
  fn toggle_like(
    &self,
    account_id: Uuid,
    activity_id: i64,
  ) -> impl Future<Output = Result<LikeState, Self::Error>> + Send + '_;

  // ── Statistics ────────────────────────────────────────────────────────

  fn statistics<'a>(
    &'a self,
    semester: &'a Semester,
    scope: &'a StatisticsScope,
  ) -> impl Future<Output = Result<Statistics, Self::Error>> + Send + 'a;
}
