//! Access-control groups, permission codenames and the provisioning plan.
//!
//! Provisioning is declarative: [`plan`] maps a [`Role`] to the exact group
//! memberships and the group permission set an account must end up with.
//! Stores apply a plan with replace-not-merge writes, so applying the same
//! plan twice always converges to the same state.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::user::Role;

// ─── Groups ──────────────────────────────────────────────────────────────────

/// A named bundle of permissions assignable to an account.
///
/// There is no administrator group: administrators are members of every
/// subordinate group and are never permission-limited.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  EnumString,
  IntoStaticStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GroupName {
  Specialist,
  Assistant,
  Student,
}

impl GroupName {
  pub fn as_str(self) -> &'static str { self.into() }

  /// The fixed permission list written to this group on provisioning.
  pub fn permissions(self) -> &'static [Permission] {
    match self {
      Self::Specialist => SPECIALIST_PERMISSIONS,
      Self::Assistant => ASSISTANT_PERMISSIONS,
      Self::Student => STUDENT_PERMISSIONS,
    }
  }
}

// ─── Permissions ─────────────────────────────────────────────────────────────

/// Permission codenames. The snake_case form is what gets stored.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  EnumString,
  IntoStaticStr,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
  // ── Specialist ──────────────────────────────────────────────────────────
  CreateAssistantAccount,
  ViewFacultyStatistics,
  ExportFacultyStatistics,

  // ── Assistant ───────────────────────────────────────────────────────────
  ViewClassStatistics,
  ExportClassStatistics,
  UploadAttendanceCsv,
  ViewReportedList,
  ViewDeficiencyList,
  ResolveDeficiency,
  AddActivity,
  AddBulletin,

  // ── Student ─────────────────────────────────────────────────────────────
  RegisterActivity,
  ReportActivity,
  ViewParticipatedList,
  ViewRegisteredList,
  #[strum(serialize = "view_trainingpoint")]
  #[serde(rename = "view_trainingpoint")]
  ViewTrainingPoint,
}

impl Permission {
  pub fn codename(self) -> &'static str { self.into() }
}

pub const SPECIALIST_PERMISSIONS: &[Permission] = &[
  Permission::CreateAssistantAccount,
  Permission::ViewFacultyStatistics,
  Permission::ExportFacultyStatistics,
];

pub const ASSISTANT_PERMISSIONS: &[Permission] = &[
  Permission::ViewClassStatistics,
  Permission::ExportClassStatistics,
  Permission::UploadAttendanceCsv,
  Permission::ViewReportedList,
  Permission::ViewDeficiencyList,
  Permission::ResolveDeficiency,
  Permission::AddActivity,
  Permission::AddBulletin,
];

pub const STUDENT_PERMISSIONS: &[Permission] = &[
  Permission::RegisterActivity,
  Permission::ReportActivity,
  Permission::ViewParticipatedList,
  Permission::ViewRegisteredList,
  Permission::ViewTrainingPoint,
];

// ─── Provisioning plan ───────────────────────────────────────────────────────

/// The desired access state of an account with a given role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningPlan {
  /// The complete group set of the account after provisioning, sorted.
  pub memberships: Vec<GroupName>,
  /// The group whose permission set is overwritten with
  /// [`GroupName::permissions`]. `None` for administrators.
  pub grant:       Option<GroupName>,
}

impl ProvisioningPlan {
  /// The `(group, permissions)` pair to write, if any.
  pub fn grant_permissions(&self) -> Option<(GroupName, &'static [Permission])> {
    self.grant.map(|g| (g, g.permissions()))
  }
}

/// Map a role to its provisioning plan.
///
/// Administrators join every subordinate group. Specialists also join the
/// assistant group. Everyone else joins only their own group.
pub fn plan(role: Role) -> ProvisioningPlan {
  match role {
    Role::Administrator => ProvisioningPlan {
      memberships: vec![GroupName::Specialist, GroupName::Assistant, GroupName::Student],
      grant:       None,
    },
    Role::Specialist => ProvisioningPlan {
      memberships: vec![GroupName::Specialist, GroupName::Assistant],
      grant:       Some(GroupName::Specialist),
    },
    Role::Assistant => ProvisioningPlan {
      memberships: vec![GroupName::Assistant],
      grant:       Some(GroupName::Assistant),
    },
    Role::Student => ProvisioningPlan {
      memberships: vec![GroupName::Student],
      grant:       Some(GroupName::Student),
    },
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn administrator_joins_every_group_without_grant() {
    let p = plan(Role::Administrator);
    assert_eq!(p.memberships, GroupName::iter().collect::<Vec<_>>());
    assert!(p.grant_permissions().is_none());
  }

  #[test]
  fn specialist_also_joins_assistant() {
    let p = plan(Role::Specialist);
    assert_eq!(p.memberships, vec![GroupName::Specialist, GroupName::Assistant]);
    assert_eq!(p.grant, Some(GroupName::Specialist));
  }

  #[test]
  fn assistant_and_student_join_only_their_own_group() {
    assert_eq!(plan(Role::Assistant).memberships, vec![GroupName::Assistant]);
    assert_eq!(plan(Role::Student).memberships, vec![GroupName::Student]);
  }

  #[test]
  fn memberships_are_sorted() {
    for role in [Role::Administrator, Role::Specialist, Role::Assistant, Role::Student] {
      let p = plan(role);
      let mut sorted = p.memberships.clone();
      sorted.sort();
      assert_eq!(p.memberships, sorted, "{role:?}");
    }
  }

  #[test]
  fn codenames_round_trip_through_strings() {
    for perm in Permission::iter() {
      assert_eq!(Permission::from_str(perm.codename()).unwrap(), perm);
    }
    assert_eq!(Permission::ViewTrainingPoint.codename(), "view_trainingpoint");
    assert_eq!(Permission::UploadAttendanceCsv.codename(), "upload_attendance_csv");
  }

  #[test]
  fn every_permission_belongs_to_exactly_one_group() {
    for perm in Permission::iter() {
      let owners = GroupName::iter()
        .filter(|g| g.permissions().contains(&perm))
        .count();
      assert_eq!(owners, 1, "{perm:?}");
    }
  }
}
