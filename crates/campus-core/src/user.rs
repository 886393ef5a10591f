//! Users and their login accounts.
//!
//! A user is one of four mutually exclusive variants, identified externally
//! by a unique `code`. Each user owns at most one [`Account`], whose `role`
//! must always agree with the user's variant; see [`crate::role`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::access::GroupName;

// ─── Variants ────────────────────────────────────────────────────────────────

/// The concrete variant of a [`User`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UserKind {
  Administrator,
  Specialist,
  Assistant,
  Student,
}

impl UserKind {
  pub fn as_str(self) -> &'static str { self.into() }
}

/// Variant-specific data. The variant name doubles as the [`UserKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UserDetails {
  Administrator,
  /// A faculty-level specialist.
  Specialist { faculty_id: Option<i64> },
  /// A faculty assistant who runs activities and uploads attendance.
  Assistant { faculty_id: Option<i64> },
  Student { class_id: i64 },
}

impl UserDetails {
  pub fn kind(&self) -> UserKind {
    match self {
      Self::Administrator => UserKind::Administrator,
      Self::Specialist { .. } => UserKind::Specialist,
      Self::Assistant { .. } => UserKind::Assistant,
      Self::Student { .. } => UserKind::Student,
    }
  }

  pub fn faculty_id(&self) -> Option<i64> {
    match self {
      Self::Specialist { faculty_id } | Self::Assistant { faculty_id } => *faculty_id,
      _ => None,
    }
  }

  pub fn class_id(&self) -> Option<i64> {
    match self {
      Self::Student { class_id } => Some(*class_id),
      _ => None,
    }
  }
}

// ─── User ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  /// External identity code (student number, staff number, ...). Unique
  /// across all variants.
  pub code:       String,
  pub full_name:  String,
  pub email:      Option<String>,
  pub created_at: DateTime<Utc>,
  #[serde(flatten)]
  pub details:    UserDetails,
}

impl User {
  pub fn kind(&self) -> UserKind { self.details.kind() }
}

/// Input to [`crate::store::CampusStore::add_user`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub code:      String,
  pub full_name: String,
  pub email:     Option<String>,
  #[serde(flatten)]
  pub details:   UserDetails,
}

// ─── Account ─────────────────────────────────────────────────────────────────

/// The login companion of a [`User`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub account_id:    Uuid,
  pub user_id:       Uuid,
  pub username:      String,
  /// argon2 PHC string; never leaves the server.
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub role:          Role,
  /// Current access-control group memberships, sorted.
  pub groups:        Vec<GroupName>,
  pub created_at:    DateTime<Utc>,
}

impl Account {
  pub fn is_administrator(&self) -> bool { self.role == Role::Administrator }

  pub fn in_group(&self, group: GroupName) -> bool {
    self.is_administrator() || self.groups.contains(&group)
  }
}

/// Input to [`crate::store::CampusStore::create_account`]: a user and its
/// account, written together.
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub user:          NewUser,
  pub username:      String,
  pub password_hash: String,
  pub role:          Role,
}

// ─── Role ────────────────────────────────────────────────────────────────────

/// The role recorded on an [`Account`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  Administrator,
  Specialist,
  Assistant,
  Student,
}

impl Role {
  pub fn as_str(self) -> &'static str { self.into() }
}
