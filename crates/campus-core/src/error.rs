//! Error types for `campus-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("user not found: {0}")]
  UserNotFound(String),

  #[error("unknown role: {0:?}")]
  UnknownRole(String),

  #[error("unknown user kind: {0:?}")]
  UnknownUserKind(String),

  #[error("unknown group: {0:?}")]
  UnknownGroup(String),

  #[error("unknown permission: {0:?}")]
  UnknownPermission(String),

  #[error("unknown media category: {0:?}")]
  UnknownMediaCategory(String),

  #[error("malformed media public id: {0:?}")]
  MalformedPublicId(String),

  /// A data line of an attendance file could not be split into
  /// `(student_code, activity_id)`.
  #[error("invalid csv at line {line}: {reason}")]
  InvalidCsv { line: usize, reason: String },

  #[error("statistics require a faculty, a class, or both")]
  EmptyStatisticsScope,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
