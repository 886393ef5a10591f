//! [`SqliteStore`], the SQLite implementation of [`CampusStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use campus_core::{
  access::{GroupName, Permission, ProvisioningPlan},
  activity::{Activity, ActivityDetail, ActivityRegistration, NewActivity, TrainingPoint},
  attendance::{AttendanceRow, ReconcileReport},
  interact::{Comment, LikeState},
  school::{Class, Criterion, Faculty, Major, NewClass, NewCriterion, NewSemester, Semester},
  statistics::{CriterionTotal, Statistics, StatisticsScope, StudentTotal},
  store::CampusStore,
  user::{Account, NewAccount, NewUser, Role, User},
};

use crate::{
  Error, Result,
  encode::{
    ACCOUNT_COLUMNS, ACTIVITY_COLUMNS, CLASS_COLUMNS, COMMENT_COLUMNS, REGISTRATION_COLUMNS,
    RawAccount, RawActivity, RawComment, RawRegistration, RawSemester, RawUser,
    SEMESTER_COLUMNS, USER_COLUMNS, class_from_row, decode_permissions, decode_uuid,
    encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A campus store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every call
/// runs on the connection's own thread, one at a time.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn account_where(
    &self,
    column: &'static str,
    value: String,
  ) -> Result<Option<Account>> {
    let raw = self
      .conn
      .call(move |conn| Ok(load_account(conn, column, &value)?))
      .await?;
    raw.map(RawAccount::into_account).transpose()
  }
}

/// Read an account row and its group memberships.
fn load_account(
  conn: &rusqlite::Connection,
  column: &'static str,
  value: &str,
) -> rusqlite::Result<Option<RawAccount>> {
  let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {column} = ?1");
  let Some(mut raw) = conn
    .query_row(&sql, rusqlite::params![value], RawAccount::from_row)
    .optional()?
  else {
    return Ok(None);
  };

  let mut stmt = conn.prepare("SELECT group_name FROM account_groups WHERE account_id = ?1")?;
  raw.groups = stmt
    .query_map(rusqlite::params![raw.account_id], |r| r.get(0))?
    .collect::<rusqlite::Result<Vec<String>>>()?;
  Ok(Some(raw))
}

/// Filter shared by both statistics queries. `?1` is the semester, `?2` the
/// faculty and `?3` the class; a NULL side does not restrict.
const IN_SCOPE: &str = "u.kind = 'student'
  AND (?2 IS NULL OR m.faculty_id = ?2)
  AND (?3 IS NULL OR u.class_id = ?3)";

/// The column values of a `users` row.
struct UserRow {
  user_id:    String,
  code:       String,
  kind:       &'static str,
  full_name:  String,
  email:      Option<String>,
  faculty_id: Option<i64>,
  class_id:   Option<i64>,
  created_at: String,
}

impl UserRow {
  fn of(user: &User) -> Self {
    Self {
      user_id:    encode_uuid(user.user_id),
      code:       user.code.clone(),
      kind:       user.kind().as_str(),
      full_name:  user.full_name.clone(),
      email:      user.email.clone(),
      faculty_id: user.details.faculty_id(),
      class_id:   user.details.class_id(),
      created_at: encode_dt(user.created_at),
    }
  }

  fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO users
         (user_id, code, kind, full_name, email, faculty_id, class_id, created_at)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      rusqlite::params![
        self.user_id,
        self.code,
        self.kind,
        self.full_name,
        self.email,
        self.faculty_id,
        self.class_id,
        self.created_at
      ],
    )?;
    Ok(())
  }
}

/// A [`ProvisioningPlan`] as the strings written to the group tables.
struct PlanRows {
  memberships: Vec<&'static str>,
  grant:       Option<(&'static str, Vec<&'static str>)>,
}

impl PlanRows {
  fn of(plan: &ProvisioningPlan) -> Self {
    Self {
      memberships: plan.memberships.iter().map(|g| g.as_str()).collect(),
      grant:       plan
        .grant_permissions()
        .map(|(group, perms)| (group.as_str(), perms.iter().map(|p| p.codename()).collect())),
    }
  }

  /// Create missing groups, overwrite the granted group's permissions and
  /// replace the account's memberships. Runs inside the caller's transaction.
  fn apply(&self, conn: &rusqlite::Connection, account_id: &str) -> rusqlite::Result<()> {
    let groups = self.memberships.iter().chain(self.grant.as_ref().map(|(g, _)| g));
    for group in groups {
      conn.execute(
        "INSERT OR IGNORE INTO access_groups (name) VALUES (?1)",
        rusqlite::params![group],
      )?;
    }

    if let Some((group, codenames)) = &self.grant {
      conn.execute(
        "DELETE FROM group_permissions WHERE group_name = ?1",
        rusqlite::params![group],
      )?;
      for codename in codenames {
        conn.execute(
          "INSERT INTO group_permissions (group_name, codename) VALUES (?1, ?2)",
          rusqlite::params![group, codename],
        )?;
      }
    }

    conn.execute(
      "DELETE FROM account_groups WHERE account_id = ?1",
      rusqlite::params![account_id],
    )?;
    for group in &self.memberships {
      conn.execute(
        "INSERT INTO account_groups (account_id, group_name) VALUES (?1, ?2)",
        rusqlite::params![account_id, group],
      )?;
    }
    Ok(())
  }
}

// ─── CampusStore impl ────────────────────────────────────────────────────────

impl CampusStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:    Uuid::new_v4(),
      code:       input.code,
      full_name:  input.full_name,
      email:      input.email,
      created_at: Utc::now(),
      details:    input.details,
    };

    let row  = UserRow::of(&user);
    let kind = row.kind;

    self
      .conn
      .call(move |conn| Ok(row.insert(conn)?))
      .await
      .map_err(|e| Error::conflict_or_database(e, || format!("user code {:?} is taken", user.code)))?;

    debug!(user = %user.user_id, kind, "user added");
    Ok(user)
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(user_id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id_str],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn find_user_by_code<'a>(&'a self, code: &'a str) -> Result<Option<User>> {
    let code = code.to_owned();

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE code = ?1"),
            rusqlite::params![code],
            RawUser::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn create_account<'a>(
    &'a self,
    input: NewAccount,
    plan: &'a ProvisioningPlan,
  ) -> Result<(User, Account)> {
    let NewAccount { user: new_user, username, password_hash, role } = input;
    let user = User {
      user_id:    Uuid::new_v4(),
      code:       new_user.code,
      full_name:  new_user.full_name,
      email:      new_user.email,
      created_at: Utc::now(),
      details:    new_user.details,
    };

    let user_row    = UserRow::of(&user);
    let account_id  = encode_uuid(Uuid::new_v4());
    let rows        = PlanRows::of(plan);
    let role        = role.as_str();
    let code        = user.code.clone();

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Err(e) = user_row.insert(&tx) {
          return Error::conflict_in_call(e, || format!("user code {code:?} is taken"));
        }
        if let Err(e) = tx.execute(
          "INSERT INTO accounts (account_id, user_id, username, password_hash, role, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            account_id,
            user_row.user_id,
            username,
            password_hash,
            role,
            user_row.created_at
          ],
        ) {
          return Error::conflict_in_call(e, || format!("username {username:?} is taken"));
        }

        rows.apply(&tx, &account_id)?;
        let raw = load_account(&tx, "account_id", &account_id)?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await??;

    let account = raw
      .ok_or_else(|| Error::Corrupt(format!("account of user {} vanished", user.user_id)))?
      .into_account()?;
    Ok((user, account))
  }

  async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>> {
    self.account_where("account_id", encode_uuid(account_id)).await
  }

  async fn get_account_by_username<'a>(&'a self, username: &'a str) -> Result<Option<Account>> {
    self.account_where("username", username.to_owned()).await
  }

  async fn update_account_role(&self, account_id: Uuid, role: Role) -> Result<Account> {
    let id_str = encode_uuid(account_id);
    let role   = role.as_str();

    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE accounts SET role = ?1 WHERE account_id = ?2",
          rusqlite::params![role, id_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(load_account(conn, "account_id", &id_str)?)
      })
      .await?;

    raw
      .ok_or(Error::AccountNotFound(account_id))?
      .into_account()
  }

  async fn apply_provisioning<'a>(
    &'a self,
    account_id: Uuid,
    plan: &'a ProvisioningPlan,
  ) -> Result<Account> {
    let id_str = encode_uuid(account_id);
    let rows   = PlanRows::of(plan);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists = tx
          .query_row(
            "SELECT 1 FROM accounts WHERE account_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }

        rows.apply(&tx, &id_str)?;
        let raw = load_account(&tx, "account_id", &id_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw
      .ok_or(Error::AccountNotFound(account_id))?
      .into_account()
  }

  async fn group_permissions(&self, group: GroupName) -> Result<Vec<Permission>> {
    let name = group.as_str();

    let codenames = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT codename FROM group_permissions WHERE group_name = ?1")?;
        let rows = stmt
          .query_map(rusqlite::params![name], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    decode_permissions(codenames)
  }

  async fn account_permissions(&self, account_id: Uuid) -> Result<Vec<Permission>> {
    let id_str = encode_uuid(account_id);

    let codenames = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT gp.codename
           FROM account_groups ag
           JOIN group_permissions gp ON gp.group_name = ag.group_name
           WHERE ag.account_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;

    decode_permissions(codenames)
  }

  // ── School catalogue ──────────────────────────────────────────────────────

  async fn add_faculty(&self, name: String) -> Result<Faculty> {
    let n = name.clone();
    let faculty_id = self
      .conn
      .call(move |conn| {
        conn.execute("INSERT INTO faculties (name) VALUES (?1)", rusqlite::params![n])?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| Error::conflict_or_database(e, || format!("faculty {name:?} exists")))?;

    Ok(Faculty { faculty_id, name })
  }

  async fn add_major(&self, faculty_id: i64, name: String) -> Result<Major> {
    let n = name.clone();
    let major_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO majors (name, faculty_id) VALUES (?1, ?2)",
          rusqlite::params![n, faculty_id],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Major { major_id, name, faculty_id })
  }

  async fn add_class(&self, input: NewClass) -> Result<Class> {
    let name = input.name.clone();
    let class = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO classes (name, major_id) VALUES (?1, ?2)",
          rusqlite::params![input.name, input.major_id],
        )?;
        let class_id = conn.last_insert_rowid();
        Ok(conn.query_row(
          &format!(
            "SELECT {CLASS_COLUMNS} FROM classes c
             JOIN majors m ON m.major_id = c.major_id
             WHERE c.class_id = ?1"
          ),
          rusqlite::params![class_id],
          class_from_row,
        )?)
      })
      .await
      .map_err(|e| Error::conflict_or_database(e, || format!("class {name:?} exists")))?;

    Ok(class)
  }

  async fn add_semester(&self, input: NewSemester) -> Result<Semester> {
    let code      = input.code.clone();
    let name      = input.name.clone();
    let starts_on = encode_date(input.starts_on);
    let ends_on   = encode_date(input.ends_on);

    let semester_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO semesters (code, name, starts_on, ends_on) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![code, name, starts_on, ends_on],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| {
        Error::conflict_or_database(e, || format!("semester {:?} exists", input.code))
      })?;

    Ok(Semester {
      semester_id,
      code: input.code,
      name: input.name,
      starts_on: input.starts_on,
      ends_on: input.ends_on,
      is_active: true,
    })
  }

  async fn add_criterion(&self, input: NewCriterion) -> Result<Criterion> {
    let name      = input.name.clone();
    let max_point = input.max_point;

    let criterion_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO criteria (name, max_point) VALUES (?1, ?2)",
          rusqlite::params![name, max_point],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| {
        Error::conflict_or_database(e, || format!("criterion {:?} exists", input.name))
      })?;

    Ok(Criterion { criterion_id, name: input.name, max_point, is_active: true })
  }

  async fn get_faculty(&self, faculty_id: i64) -> Result<Option<Faculty>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn
            .query_row(
              "SELECT faculty_id, name FROM faculties WHERE faculty_id = ?1",
              rusqlite::params![faculty_id],
              |row| Ok(Faculty { faculty_id: row.get(0)?, name: row.get(1)? }),
            )
            .optional()?)
        })
        .await?,
    )
  }

  async fn get_class(&self, class_id: i64) -> Result<Option<Class>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(conn
            .query_row(
              &format!(
                "SELECT {CLASS_COLUMNS} FROM classes c
                 JOIN majors m ON m.major_id = c.major_id
                 WHERE c.class_id = ?1"
              ),
              rusqlite::params![class_id],
              class_from_row,
            )
            .optional()?)
        })
        .await?,
    )
  }

  async fn get_semester_by_code<'a>(&'a self, code: &'a str) -> Result<Option<Semester>> {
    let code = code.to_owned();

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SEMESTER_COLUMNS} FROM semesters WHERE code = ?1"),
            rusqlite::params![code],
            RawSemester::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSemester::into_semester).transpose()
  }

  async fn list_classes(&self, faculty_id: Option<i64>) -> Result<Vec<Class>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {CLASS_COLUMNS} FROM classes c
             JOIN majors m ON m.major_id = c.major_id
             WHERE c.is_active = 1 AND (?1 IS NULL OR m.faculty_id = ?1)
             ORDER BY c.name"
          ))?;
          let rows = stmt
            .query_map(rusqlite::params![faculty_id], class_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn list_criteria(&self) -> Result<Vec<Criterion>> {
    Ok(
      self
        .conn
        .call(|conn| {
          let mut stmt = conn.prepare(
            "SELECT criterion_id, name, max_point, is_active FROM criteria
             WHERE is_active = 1 ORDER BY criterion_id",
          )?;
          let rows = stmt
            .query_map([], |row| {
              Ok(Criterion {
                criterion_id: row.get(0)?,
                name:         row.get(1)?,
                max_point:    row.get(2)?,
                is_active:    row.get(3)?,
              })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await?,
    )
  }

  async fn list_semesters(&self) -> Result<Vec<Semester>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SEMESTER_COLUMNS} FROM semesters
           WHERE is_active = 1 ORDER BY starts_on DESC, semester_id DESC"
        ))?;
        let rows = stmt
          .query_map([], RawSemester::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSemester::into_semester).collect()
  }

  // ── Activities ────────────────────────────────────────────────────────────

  async fn add_activity(&self, input: NewActivity) -> Result<Activity> {
    let created_at = Utc::now();
    let at_str     = encode_dt(created_at);
    let NewActivity { name, criterion_id, semester_id, point } = input;
    let n = name.clone();

    let activity_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activities (name, criterion_id, semester_id, point, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![n, criterion_id, semester_id, point, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Activity {
      activity_id,
      name,
      criterion_id,
      semester_id,
      point,
      created_at,
    })
  }

  async fn get_activity(&self, activity_id: i64) -> Result<Option<Activity>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ACTIVITY_COLUMNS} FROM activities WHERE activity_id = ?1"),
            rusqlite::params![activity_id],
            RawActivity::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawActivity::into_activity).transpose()
  }

  async fn register_activity(
    &self,
    student_id: Uuid,
    activity_id: i64,
  ) -> Result<ActivityRegistration> {
    let registered_at = Utc::now();
    let student_str   = encode_uuid(student_id);
    let at_str        = encode_dt(registered_at);

    let registration_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activity_registrations (student_id, activity_id, registered_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![student_str, activity_id, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| {
        Error::conflict_or_database(e, || {
          format!("student is already registered for activity {activity_id}")
        })
      })?;

    Ok(ActivityRegistration {
      registration_id,
      student_id,
      activity_id,
      is_point_added: false,
      registered_at,
    })
  }

  async fn get_registration(
    &self,
    student_id: Uuid,
    activity_id: i64,
  ) -> Result<Option<ActivityRegistration>> {
    let student_str = encode_uuid(student_id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {REGISTRATION_COLUMNS} FROM activity_registrations
               WHERE student_id = ?1 AND activity_id = ?2"
            ),
            rusqlite::params![student_str, activity_id],
            RawRegistration::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRegistration::into_registration).transpose()
  }

  async fn training_points(&self, student_id: Uuid, semester_id: i64) -> Result<Vec<TrainingPoint>> {
    let student_str = encode_uuid(student_id);

    let rows: Vec<(String, i64, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT student_id, criterion_id, point FROM training_points
           WHERE student_id = ?1 AND semester_id = ?2
           ORDER BY criterion_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![student_str, semester_id], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(student, criterion_id, point)| -> Result<TrainingPoint> {
        Ok(TrainingPoint {
          student_id: decode_uuid(&student)?,
          semester_id,
          criterion_id,
          point,
        })
      })
      .collect()
  }

  async fn reconcile_attendance<'a>(
    &'a self,
    rows: &'a [AttendanceRow],
  ) -> Result<ReconcileReport> {
    let rows: Vec<(usize, String, Option<i64>)> = rows
      .iter()
      .map(|r| (r.line, r.student_code.clone(), r.activity_id()))
      .collect();

    let report = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut report = ReconcileReport { rows: rows.len(), ..Default::default() };

        for (line, code, activity_id) in rows {
          let Some(activity_id) = activity_id else {
            debug!(line, "activity id is not a number");
            report.unresolved += 1;
            continue;
          };

          let student: Option<String> = tx
            .query_row(
              "SELECT user_id FROM users WHERE code = ?1 AND kind = 'student'",
              rusqlite::params![code],
              |r| r.get(0),
            )
            .optional()?;
          let Some(student_id) = student else {
            debug!(line, code = %code, "no student with this code");
            report.unresolved += 1;
            continue;
          };

          let activity: Option<(i64, i64, i64, i64)> = tx
            .query_row(
              "SELECT a.semester_id, a.criterion_id, a.point, c.max_point
               FROM activities a
               JOIN criteria c ON c.criterion_id = a.criterion_id
               WHERE a.activity_id = ?1",
              rusqlite::params![activity_id],
              |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?;
          let Some((semester_id, criterion_id, point, max_point)) = activity else {
            debug!(line, activity_id, "no such activity");
            report.unresolved += 1;
            continue;
          };

          let registration: Option<(i64, bool)> = tx
            .query_row(
              "SELECT registration_id, is_point_added FROM activity_registrations
               WHERE student_id = ?1 AND activity_id = ?2",
              rusqlite::params![student_id, activity_id],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
          let Some((registration_id, is_point_added)) = registration else {
            debug!(line, code = %code, activity_id, "student is not registered");
            report.unresolved += 1;
            continue;
          };
          if is_point_added {
            report.already_credited += 1;
            continue;
          }

          // Claim the registration; only the writer that flips the flag credits.
          let claimed = tx.execute(
            "UPDATE activity_registrations SET is_point_added = 1
             WHERE registration_id = ?1 AND is_point_added = 0",
            rusqlite::params![registration_id],
          )?;
          if claimed == 0 {
            report.already_credited += 1;
            continue;
          }

          tx.execute(
            "INSERT INTO training_points (student_id, semester_id, criterion_id, point)
             VALUES (?1, ?2, ?3, MIN(?4, ?5))
             ON CONFLICT (student_id, semester_id, criterion_id)
             DO UPDATE SET point = MIN(point + excluded.point, ?5)",
            rusqlite::params![student_id, semester_id, criterion_id, point, max_point],
          )?;
          report.credited += 1;
        }

        tx.commit()?;
        Ok(report)
      })
      .await?;

    info!(
      rows = report.rows,
      credited = report.credited,
      already_credited = report.already_credited,
      unresolved = report.unresolved,
      "attendance reconciled"
    );
    Ok(report)
  }

  async fn activity_detail(&self, activity_id: i64) -> Result<Option<ActivityDetail>> {
    let row: Option<(RawActivity, String, String, i64, i64)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT a.activity_id, a.name, a.criterion_id, a.semester_id, a.point, a.created_at,
                    cr.name, s.code,
                    (SELECT COUNT(*) FROM likes    l WHERE l.activity_id = a.activity_id),
                    (SELECT COUNT(*) FROM comments c WHERE c.activity_id = a.activity_id)
             FROM activities a
             JOIN criteria  cr ON cr.criterion_id = a.criterion_id
             JOIN semesters s  ON s.semester_id   = a.semester_id
             WHERE a.activity_id = ?1",
            rusqlite::params![activity_id],
            |r| Ok((RawActivity::from_row(r)?, r.get(6)?, r.get(7)?, r.get(8)?, r.get(9)?)),
          )
          .optional()?)
      })
      .await?;

    row
      .map(|(raw, criterion, semester, likes, comments)| -> Result<ActivityDetail> {
        Ok(ActivityDetail {
          activity: raw.into_activity()?,
          criterion,
          semester,
          likes,
          comments,
        })
      })
      .transpose()
  }

  // ── Interactions ──────────────────────────────────────────────────────────

  async fn add_comment(&self, account_id: Uuid, activity_id: i64, content: String) -> Result<Comment> {
    let account_str = encode_uuid(account_id);
    let at_str      = encode_dt(Utc::now());

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO comments (activity_id, account_id, content, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![activity_id, account_str, content, at_str],
        )?;
        let comment_id = conn.last_insert_rowid();
        Ok(conn.query_row(
          &format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c
             JOIN accounts a ON a.account_id = c.account_id
             WHERE c.comment_id = ?1"
          ),
          rusqlite::params![comment_id],
          RawComment::from_row,
        )?)
      })
      .await?;

    raw.into_comment()
  }

  async fn list_comments(&self, activity_id: i64) -> Result<Vec<Comment>> {
    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COMMENT_COLUMNS} FROM comments c
           JOIN accounts a ON a.account_id = c.account_id
           WHERE c.activity_id = ?1
           ORDER BY c.comment_id DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![activity_id], RawComment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_comment).collect()
  }

  async fn toggle_like(&self, account_id: Uuid, activity_id: i64) -> Result<LikeState> {
    let account_str = encode_uuid(account_id);
    let at_str      = encode_dt(Utc::now());

    let (liked, likes) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute(
          "DELETE FROM likes WHERE account_id = ?1 AND activity_id = ?2",
          rusqlite::params![account_str, activity_id],
        )?;
        if removed == 0 {
          tx.execute(
            "INSERT INTO likes (account_id, activity_id, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![account_str, activity_id, at_str],
          )?;
        }
        let likes: i64 = tx.query_row(
          "SELECT COUNT(*) FROM likes WHERE activity_id = ?1",
          rusqlite::params![activity_id],
          |r| r.get(0),
        )?;
        tx.commit()?;
        Ok((removed == 0, likes))
      })
      .await?;

    debug!(account = %account_id, activity_id, liked, "like toggled");
    Ok(LikeState { activity_id, liked, likes })
  }

  // ── Statistics ────────────────────────────────────────────────────────────

  async fn statistics<'a>(
    &'a self,
    semester: &'a Semester,
    scope: &'a StatisticsScope,
  ) -> Result<Statistics> {
    let semester_id = semester.semester_id;
    let faculty_id  = scope.faculty_id();
    let class_id    = scope.class_id();

    let (totals, criteria): (Vec<(String, i64)>, Vec<CriterionTotal>) = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT u.user_id, COALESCE(SUM(tp.point), 0)
           FROM users u
           JOIN classes c ON c.class_id = u.class_id
           JOIN majors  m ON m.major_id = c.major_id
           LEFT JOIN training_points tp
             ON tp.student_id = u.user_id AND tp.semester_id = ?1
           WHERE {IN_SCOPE}
           GROUP BY u.user_id"
        ))?;
        let totals = stmt
          .query_map(rusqlite::params![semester_id, faculty_id, class_id], |r| {
            Ok((r.get(0)?, r.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT cr.criterion_id, cr.name, COALESCE(SUM(s.point), 0)
           FROM criteria cr
           LEFT JOIN (
             SELECT tp.criterion_id, tp.point
             FROM training_points tp
             JOIN users   u ON u.user_id  = tp.student_id
             JOIN classes c ON c.class_id = u.class_id
             JOIN majors  m ON m.major_id = c.major_id
             WHERE tp.semester_id = ?1 AND {IN_SCOPE}
           ) s ON s.criterion_id = cr.criterion_id
           WHERE cr.is_active = 1
           GROUP BY cr.criterion_id, cr.name
           ORDER BY cr.criterion_id"
        ))?;
        let criteria = stmt
          .query_map(rusqlite::params![semester_id, faculty_id, class_id], |r| {
            Ok(CriterionTotal {
              criterion_id: r.get(0)?,
              name:         r.get(1)?,
              total:        r.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((totals, criteria))
      })
      .await?;

    let totals = totals
      .into_iter()
      .map(|(id, total)| -> Result<StudentTotal> {
        Ok(StudentTotal { student_id: decode_uuid(&id)?, total })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(Statistics::summarize(&semester.code, scope, &totals, criteria))
  }
}
