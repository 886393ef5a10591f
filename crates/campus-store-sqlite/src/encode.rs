//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, UUIDs
//! are hyphenated lowercase strings. Enums are stored as their snake_case
//! (roles: SCREAMING_SNAKE_CASE) names.

use std::str::FromStr as _;

use campus_core::{
  access::{GroupName, Permission},
  activity::{Activity, ActivityRegistration},
  interact::Comment,
  role::{parse_role, parse_user_kind},
  school::{Class, Semester},
  user::{Account, User, UserDetails, UserKind},
};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_group(s: &str) -> Result<GroupName> {
  GroupName::from_str(s).map_err(|_| campus_core::Error::UnknownGroup(s.to_owned()).into())
}

pub fn decode_permission(s: &str) -> Result<Permission> {
  Permission::from_str(s)
    .map_err(|_| campus_core::Error::UnknownPermission(s.to_owned()).into())
}

/// Decode and sort a list of stored group names.
pub fn decode_groups(names: Vec<String>) -> Result<Vec<GroupName>> {
  let mut groups = names
    .iter()
    .map(|s| decode_group(s))
    .collect::<Result<Vec<_>>>()?;
  groups.sort();
  Ok(groups)
}

pub fn decode_permissions(codenames: Vec<String>) -> Result<Vec<Permission>> {
  let mut perms = codenames
    .iter()
    .map(|s| decode_permission(s))
    .collect::<Result<Vec<_>>>()?;
  perms.sort();
  perms.dedup();
  Ok(perms)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "user_id, code, kind, full_name, email, faculty_id, class_id, created_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub code:       String,
  pub kind:       String,
  pub full_name:  String,
  pub email:      Option<String>,
  pub faculty_id: Option<i64>,
  pub class_id:   Option<i64>,
  pub created_at: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      code:       row.get(1)?,
      kind:       row.get(2)?,
      full_name:  row.get(3)?,
      email:      row.get(4)?,
      faculty_id: row.get(5)?,
      class_id:   row.get(6)?,
      created_at: row.get(7)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    let details = match parse_user_kind(&self.kind)? {
      UserKind::Administrator => UserDetails::Administrator,
      UserKind::Specialist => UserDetails::Specialist { faculty_id: self.faculty_id },
      UserKind::Assistant => UserDetails::Assistant { faculty_id: self.faculty_id },
      UserKind::Student => UserDetails::Student {
        class_id: self
          .class_id
          .ok_or_else(|| Error::Corrupt(format!("student {} has no class", self.code)))?,
      },
    };

    Ok(User {
      user_id: decode_uuid(&self.user_id)?,
      code: self.code,
      full_name: self.full_name,
      email: self.email,
      created_at: decode_dt(&self.created_at)?,
      details,
    })
  }
}

pub const ACCOUNT_COLUMNS: &str =
  "account_id, user_id, username, password_hash, role, created_at";

/// Raw values from an `accounts` row plus its `account_groups` names.
pub struct RawAccount {
  pub account_id:    String,
  pub user_id:       String,
  pub username:      String,
  pub password_hash: String,
  pub role:          String,
  pub created_at:    String,
  pub groups:        Vec<String>,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:    row.get(0)?,
      user_id:       row.get(1)?,
      username:      row.get(2)?,
      password_hash: row.get(3)?,
      role:          row.get(4)?,
      created_at:    row.get(5)?,
      groups:        Vec::new(),
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      account_id:    decode_uuid(&self.account_id)?,
      user_id:       decode_uuid(&self.user_id)?,
      username:      self.username,
      password_hash: self.password_hash,
      role:          parse_role(&self.role)?,
      groups:        decode_groups(self.groups)?,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

pub const CLASS_COLUMNS: &str =
  "c.class_id, c.name, c.major_id, m.faculty_id, c.is_active";

pub fn class_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Class> {
  Ok(Class {
    class_id:   row.get(0)?,
    name:       row.get(1)?,
    major_id:   row.get(2)?,
    faculty_id: row.get(3)?,
    is_active:  row.get(4)?,
  })
}

pub const SEMESTER_COLUMNS: &str =
  "semester_id, code, name, starts_on, ends_on, is_active";

pub struct RawSemester {
  pub semester_id: i64,
  pub code:        String,
  pub name:        String,
  pub starts_on:   String,
  pub ends_on:     String,
  pub is_active:   bool,
}

impl RawSemester {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      semester_id: row.get(0)?,
      code:        row.get(1)?,
      name:        row.get(2)?,
      starts_on:   row.get(3)?,
      ends_on:     row.get(4)?,
      is_active:   row.get(5)?,
    })
  }

  pub fn into_semester(self) -> Result<Semester> {
    Ok(Semester {
      semester_id: self.semester_id,
      code:        self.code,
      name:        self.name,
      starts_on:   decode_date(&self.starts_on)?,
      ends_on:     decode_date(&self.ends_on)?,
      is_active:   self.is_active,
    })
  }
}

pub const ACTIVITY_COLUMNS: &str =
  "activity_id, name, criterion_id, semester_id, point, created_at";

pub struct RawActivity {
  pub activity_id:  i64,
  pub name:         String,
  pub criterion_id: i64,
  pub semester_id:  i64,
  pub point:        i64,
  pub created_at:   String,
}

impl RawActivity {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      activity_id:  row.get(0)?,
      name:         row.get(1)?,
      criterion_id: row.get(2)?,
      semester_id:  row.get(3)?,
      point:        row.get(4)?,
      created_at:   row.get(5)?,
    })
  }

  pub fn into_activity(self) -> Result<Activity> {
    Ok(Activity {
      activity_id:  self.activity_id,
      name:         self.name,
      criterion_id: self.criterion_id,
      semester_id:  self.semester_id,
      point:        self.point,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

pub const REGISTRATION_COLUMNS: &str =
  "registration_id, student_id, activity_id, is_point_added, registered_at";

pub struct RawRegistration {
  pub registration_id: i64,
  pub student_id:      String,
  pub activity_id:     i64,
  pub is_point_added:  bool,
  pub registered_at:   String,
}

impl RawRegistration {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      registration_id: row.get(0)?,
      student_id:      row.get(1)?,
      activity_id:     row.get(2)?,
      is_point_added:  row.get(3)?,
      registered_at:   row.get(4)?,
    })
  }

  pub fn into_registration(self) -> Result<ActivityRegistration> {
    Ok(ActivityRegistration {
      registration_id: self.registration_id,
      student_id:      decode_uuid(&self.student_id)?,
      activity_id:     self.activity_id,
      is_point_added:  self.is_point_added,
      registered_at:   decode_dt(&self.registered_at)?,
    })
  }
}

/// Comment columns; expects `comments c JOIN accounts a`.
pub const COMMENT_COLUMNS: &str =
  "c.comment_id, c.activity_id, c.account_id, a.username, c.content, c.created_at";

pub struct RawComment {
  pub comment_id:  i64,
  pub activity_id: i64,
  pub account_id:  String,
  pub username:    String,
  pub content:     String,
  pub created_at:  String,
}

impl RawComment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id:  row.get(0)?,
      activity_id: row.get(1)?,
      account_id:  row.get(2)?,
      username:    row.get(3)?,
      content:     row.get(4)?,
      created_at:  row.get(5)?,
    })
  }

  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id:  self.comment_id,
      activity_id: self.activity_id,
      account_id:  decode_uuid(&self.account_id)?,
      username:    self.username,
      content:     self.content,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
