//! HTTP Basic authentication against stored accounts, and the role gates.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use campus_core::{
  access::{GroupName, Permission},
  media::MediaStore,
  store::CampusStore,
  user::Account,
};
use rand_core::OsRng;
use tracing::warn;

use crate::{ApiState, error::ApiError};

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

/// Split an `Authorization: Basic ...` header into `(username, password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = value.strip_prefix("Basic ").ok_or(ApiError::Unauthorized)?;
  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

fn verify_password(password: &str, phc: &str) -> Result<(), ApiError> {
  let parsed = PasswordHash::new(phc).map_err(|_| ApiError::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| ApiError::Unauthorized)
}

/// The authenticated account making the request.
pub struct CurrentAccount(pub Account);

impl<S, M> FromRequestParts<ApiState<S, M>> for CurrentAccount
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S, M>,
  ) -> Result<Self, Self::Rejection> {
    let (username, password) = basic_credentials(&parts.headers)?;

    let account = state
      .store
      .get_account_by_username(&username)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    verify_password(&password, &account.password_hash)?;
    Ok(CurrentAccount(account))
  }
}

// ─── Gates ───────────────────────────────────────────────────────────────────

pub fn require_administrator(account: &Account) -> Result<(), ApiError> {
  if account.is_administrator() {
    return Ok(());
  }
  warn!(account = %account.account_id, "administrator gate refused");
  Err(ApiError::Forbidden("administrator only".into()))
}

/// Pass if the account belongs to `group`. Administrators always pass.
pub fn require_group(account: &Account, group: GroupName) -> Result<(), ApiError> {
  if account.in_group(group) {
    return Ok(());
  }
  warn!(account = %account.account_id, group = group.as_str(), "group gate refused");
  Err(ApiError::Forbidden(format!("requires membership of the {} group", group.as_str())))
}

/// Pass if one of the account's groups grants `permission`. Administrators
/// always pass.
pub async fn require_permission<S: CampusStore>(
  store: &S,
  account: &Account,
  permission: Permission,
) -> Result<(), ApiError> {
  if account.is_administrator() {
    return Ok(());
  }
  let granted = store
    .account_permissions(account.account_id)
    .await
    .map_err(ApiError::store)?;
  if granted.contains(&permission) {
    return Ok(());
  }
  warn!(
    account = %account.account_id,
    permission = permission.codename(),
    "permission gate refused"
  );
  Err(ApiError::Forbidden(format!("missing permission {}", permission.codename())))
}
