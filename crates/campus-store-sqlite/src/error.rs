//! Error type for `campus-store-sqlite`.

use campus_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] campus_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored row violates an invariant the schema cannot express.
  #[error("corrupt row: {0}")]
  Corrupt(String),

  /// A uniqueness constraint rejected the write.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("account not found: {0}")]
  AccountNotFound(uuid::Uuid),
}

/// Whether `e` is a UNIQUE or PRIMARY KEY violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

impl Error {
  /// Map a UNIQUE / PRIMARY KEY violation to [`Error::Conflict`].
  pub(crate) fn conflict_or_database(e: tokio_rusqlite::Error, what: impl FnOnce() -> String) -> Self {
    match &e {
      tokio_rusqlite::Error::Rusqlite(inner) if is_unique_violation(inner) => Error::Conflict(what()),
      _ => Error::Database(e),
    }
  }

  /// Inside a `call` closure: turn a UNIQUE violation into `Ok(Err(Conflict))`
  /// so the transaction is dropped and the caller sees a conflict.
  pub(crate) fn conflict_in_call<T>(
    e: rusqlite::Error,
    what: impl FnOnce() -> String,
  ) -> tokio_rusqlite::Result<Result<T>> {
    if is_unique_violation(&e) {
      Ok(Err(Error::Conflict(what())))
    } else {
      Err(e.into())
    }
  }
}

impl StoreError for Error {
  fn is_conflict(&self) -> bool { matches!(self, Error::Conflict(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
