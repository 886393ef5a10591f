//! Handlers for accounts and users.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/me` | The caller's account, user and effective permissions |
//! | `POST` | `/accounts` | Administrators: any kind. Others: assistants only, with `create_assistant_account` |
//! | `POST` | `/accounts/{account_id}/provision` | Administrators; re-derives role and groups |
//! | `POST` | `/students/register` | Public; a student signs up, the username is their code |
//! | `GET`  | `/users/{code}` | Assistant group; 404 if no user has the code |

use axum::{
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use campus_core::{
  access::{GroupName, Permission},
  media::MediaStore,
  provision,
  role::resolve_account,
  store::CampusStore,
  user::{Account, NewUser, User, UserDetails, UserKind},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
  ApiState,
  auth::{CurrentAccount, hash_password, require_administrator, require_group, require_permission},
  error::ApiError,
  extract::{Json, Path},
};

#[derive(Debug, Serialize)]
pub struct AccountView {
  pub user:    User,
  pub account: Account,
}

// ─── Me ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MeView {
  pub user:        User,
  pub account:     Account,
  /// The lowercase role tag, e.g. `"student"`.
  pub role:        &'static str,
  pub permissions: Vec<Permission>,
}

/// `GET /me`
pub async fn me<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(account): CurrentAccount,
) -> Result<Json<MeView>, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let user = state
    .store
    .get_user(account.user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

  let permissions = state
    .store
    .account_permissions(account.account_id)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(MeView {
    user,
    role: resolve_account(&account).tag,
    account,
    permissions,
  }))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(flatten)]
  pub user:     NewUser,
  pub username: String,
  pub password: String,
}

/// `POST /accounts`
pub async fn create<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(caller): CurrentAccount,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let store = state.store.as_ref();

  if !caller.is_administrator() {
    require_permission(store, &caller, Permission::CreateAssistantAccount).await?;
    if body.user.details.kind() != UserKind::Assistant {
      return Err(ApiError::Forbidden("only assistant accounts may be created".into()));
    }
  }

  if body.user.code.trim().is_empty() || body.username.trim().is_empty() {
    return Err(ApiError::BadRequest("code and username are required".into()));
  }
  if body.password.is_empty() {
    return Err(ApiError::BadRequest("password is required".into()));
  }
  validate_details(store, &body.user.details).await?;

  ensure_unused(store, &body.user.code, &body.username).await?;

  let hash = hash_password(&body.password)?;
  let (user, account) = provision::register_account(store, body.user, body.username, hash)
    .await
    .map_err(ApiError::store)?;

  info!(
    by = %caller.account_id,
    account = %account.account_id,
    kind = user.kind().as_str(),
    "account created"
  );
  Ok((StatusCode::CREATED, Json(AccountView { user, account })))
}

/// 409 if the user code or the username is already taken. The store still
/// reports a conflict if another request takes either one first.
async fn ensure_unused<S: CampusStore>(store: &S, code: &str, username: &str) -> Result<(), ApiError> {
  if store.find_user_by_code(code).await.map_err(ApiError::store)?.is_some() {
    return Err(ApiError::Conflict(format!("user code {code:?} is taken")));
  }
  if store
    .get_account_by_username(username)
    .await
    .map_err(ApiError::store)?
    .is_some()
  {
    return Err(ApiError::Conflict(format!("username {username:?} is taken")));
  }
  Ok(())
}

/// Referenced faculty or class must exist.
async fn validate_details<S: CampusStore>(store: &S, details: &UserDetails) -> Result<(), ApiError> {
  if let Some(faculty_id) = details.faculty_id() {
    if store.get_faculty(faculty_id).await.map_err(ApiError::store)?.is_none() {
      return Err(ApiError::BadRequest(format!("unknown faculty {faculty_id}")));
    }
  }
  if let Some(class_id) = details.class_id() {
    if store.get_class(class_id).await.map_err(ApiError::store)?.is_none() {
      return Err(ApiError::BadRequest(format!("unknown class {class_id}")));
    }
  }
  Ok(())
}

// ─── Self-registration ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StudentSignup {
  pub code:      String,
  pub full_name: String,
  pub email:     String,
  pub class_id:  i64,
  pub password:  String,
}

/// `POST /students/register`
pub async fn register_student<S, M>(
  State(state): State<ApiState<S, M>>,
  Json(body): Json<StudentSignup>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let store = state.store.as_ref();
  let code = body.code.trim().to_owned();

  if code.is_empty() || body.full_name.trim().is_empty() {
    return Err(ApiError::BadRequest("code and full_name are required".into()));
  }
  if !body.email.contains('@') {
    return Err(ApiError::BadRequest("a valid email is required".into()));
  }
  if body.password.is_empty() {
    return Err(ApiError::BadRequest("password is required".into()));
  }

  let details = UserDetails::Student { class_id: body.class_id };
  validate_details(store, &details).await?;
  ensure_unused(store, &code, &code).await?;

  let user = NewUser {
    code:      code.clone(),
    full_name: body.full_name.trim().to_owned(),
    email:     Some(body.email.trim().to_owned()),
    details,
  };
  let hash = hash_password(&body.password)?;
  let (user, account) = provision::register_account(store, user, code, hash)
    .await
    .map_err(ApiError::store)?;

  info!(account = %account.account_id, code = %user.code, "student signed up");
  Ok((StatusCode::CREATED, Json(AccountView { user, account })))
}

// ─── Provision ───────────────────────────────────────────────────────────────

/// `POST /accounts/{account_id}/provision`
pub async fn provision_one<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(caller): CurrentAccount,
  Path(account_id): Path<Uuid>,
) -> Result<Json<AccountView>, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  require_administrator(&caller)?;
  let store = state.store.as_ref();

  let account = store
    .get_account(account_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("account not found".into()))?;
  let user = store
    .get_user(account.user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

  let account = provision::reprovision(store, &user, &account)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(AccountView { user, account }))
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// `GET /users/{code}`
pub async fn user_by_code<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(caller): CurrentAccount,
  Path(code): Path<String>,
) -> Result<Json<User>, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  require_group(&caller, GroupName::Assistant)?;
  let user = state
    .store
    .find_user_by_code(&code)
    .await
    .map_err(ApiError::store)?
    .ok_or(campus_core::Error::UserNotFound(code))?;
  Ok(Json(user))
}
