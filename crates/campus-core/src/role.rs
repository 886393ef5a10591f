//! Role resolution: user variant ⇄ role tag ⇄ account role.
//!
//! The lookup tables are closed `match`es, so an in-memory [`User`] or
//! [`Account`] always resolves. Unknown roles can only appear when decoding
//! stored strings, see [`parse_role`] and [`parse_user_kind`].

use std::str::FromStr as _;

use crate::{
  Error, Result,
  user::{Account, Role, User, UserKind},
};

/// Everything derived from a user's concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleBinding {
  /// Lowercase role tag, also the name of the role's own group.
  pub tag:  &'static str,
  /// Selects the view used to render the user.
  pub kind: UserKind,
  pub role: Role,
}

/// Everything derived from an account's stored role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountBinding {
  pub tag:  &'static str,
  pub kind: UserKind,
}

/// Resolve a user's variant to its role binding.
pub fn resolve_user(user: &User) -> RoleBinding { resolve_kind(user.kind()) }

/// Resolve a user variant that may not be stored yet.
pub fn resolve_kind(kind: UserKind) -> RoleBinding {
  match kind {
    UserKind::Administrator => RoleBinding {
      tag:  "administrator",
      kind: UserKind::Administrator,
      role: Role::Administrator,
    },
    UserKind::Specialist => RoleBinding {
      tag:  "specialist",
      kind: UserKind::Specialist,
      role: Role::Specialist,
    },
    UserKind::Assistant => RoleBinding {
      tag:  "assistant",
      kind: UserKind::Assistant,
      role: Role::Assistant,
    },
    UserKind::Student => RoleBinding {
      tag:  "student",
      kind: UserKind::Student,
      role: Role::Student,
    },
  }
}

/// Resolve an account's stored role to its tag and user variant.
pub fn resolve_account(account: &Account) -> AccountBinding {
  match account.role {
    Role::Administrator => AccountBinding { tag: "administrator", kind: UserKind::Administrator },
    Role::Specialist => AccountBinding { tag: "specialist", kind: UserKind::Specialist },
    Role::Assistant => AccountBinding { tag: "assistant", kind: UserKind::Assistant },
    Role::Student => AccountBinding { tag: "student", kind: UserKind::Student },
  }
}

/// Decode a stored role string.
pub fn parse_role(s: &str) -> Result<Role> {
  Role::from_str(s).map_err(|_| Error::UnknownRole(s.to_owned()))
}

/// Decode a stored user-kind string.
pub fn parse_user_kind(s: &str) -> Result<UserKind> {
  UserKind::from_str(s).map_err(|_| Error::UnknownUserKind(s.to_owned()))
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::user::UserDetails;

  fn user(details: UserDetails) -> User {
    User {
      user_id: Uuid::new_v4(),
      code: "2051050001".into(),
      full_name: "Nguyen Van A".into(),
      email: None,
      created_at: Utc::now(),
      details,
    }
  }

  fn account(role: Role) -> Account {
    Account {
      account_id:    Uuid::new_v4(),
      user_id:       Uuid::new_v4(),
      username:      "a".into(),
      password_hash: String::new(),
      role,
      groups:        vec![],
      created_at:    Utc::now(),
    }
  }

  #[test]
  fn every_variant_maps_to_the_matching_role() {
    let cases = [
      (UserDetails::Administrator, Role::Administrator, "administrator"),
      (UserDetails::Specialist { faculty_id: Some(1) }, Role::Specialist, "specialist"),
      (UserDetails::Assistant { faculty_id: None }, Role::Assistant, "assistant"),
      (UserDetails::Student { class_id: 3 }, Role::Student, "student"),
    ];
    for (details, role, tag) in cases {
      let kind = details.kind();
      let binding = resolve_user(&user(details));
      assert_eq!(binding, RoleBinding { tag, kind, role });
    }
  }

  #[test]
  fn account_and_user_resolution_agree() {
    for details in [
      UserDetails::Administrator,
      UserDetails::Specialist { faculty_id: None },
      UserDetails::Assistant { faculty_id: None },
      UserDetails::Student { class_id: 1 },
    ] {
      let u = resolve_user(&user(details));
      let a = resolve_account(&account(u.role));
      assert_eq!((a.tag, a.kind), (u.tag, u.kind));
    }
  }

  #[test]
  fn unsaved_details_resolve_like_stored_users() {
    let details = UserDetails::Specialist { faculty_id: None };
    assert_eq!(resolve_kind(details.kind()), resolve_user(&user(details)));
  }

  #[test]
  fn unknown_stored_values_are_errors() {
    assert!(matches!(parse_role("DEAN"), Err(Error::UnknownRole(r)) if r == "DEAN"));
    assert!(matches!(parse_user_kind("dean"), Err(Error::UnknownUserKind(_))));
    assert_eq!(parse_role("STUDENT").unwrap(), Role::Student);
    assert_eq!(parse_user_kind("assistant").unwrap(), UserKind::Assistant);
  }
}
