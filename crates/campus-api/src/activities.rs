//! Handlers for activities, registrations and training points.
//!
//! | Method | Path | Gate |
//! |--------|------|------|
//! | `POST` | `/activities` | `add_activity` |
//! | `GET`  | `/activities/{activity_id}` | Public |
//! | `POST` | `/activities/{activity_id}/register` | `register_activity`, students only |
//! | `GET`  | `/activities/{activity_id}/comments` | Public, paginated, newest first |
//! | `POST` | `/activities/{activity_id}/comments` | Authenticated |
//! | `POST` | `/activities/{activity_id}/like` | Authenticated; toggles |
//! | `GET`  | `/training-points/{semester_code}` | `view_trainingpoint`, students only |

use axum::{
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use campus_core::{
  access::Permission,
  activity::{Activity, ActivityDetail, NewActivity, TrainingPoint},
  interact::{Comment, LikeState},
  media::MediaStore,
  store::CampusStore,
  user::{Account, User, UserKind},
};
use serde::Deserialize;
use tracing::info;

use crate::{
  ApiState,
  auth::{CurrentAccount, require_permission},
  error::ApiError,
  extract::{Json, Path, Query},
  pagination::PageParams,
};

/// The student behind `account`, or 403 for any other kind of user.
async fn student_of<S: CampusStore>(store: &S, account: &Account) -> Result<User, ApiError> {
  let user = store
    .get_user(account.user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
  if user.kind() != UserKind::Student {
    return Err(ApiError::Forbidden("only students have training points".into()));
  }
  Ok(user)
}

/// The activity with `activity_id`, or 404.
async fn existing_activity<S: CampusStore>(store: &S, activity_id: i64) -> Result<Activity, ApiError> {
  store
    .get_activity(activity_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("activity {activity_id} not found")))
}

/// `POST /activities`
pub async fn create<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(caller): CurrentAccount,
  Json(body): Json<NewActivity>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let store = state.store.as_ref();
  require_permission(store, &caller, Permission::AddActivity).await?;

  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name is required".into()));
  }
  if body.point < 0 {
    return Err(ApiError::BadRequest("point must not be negative".into()));
  }

  let criteria = store.list_criteria().await.map_err(ApiError::store)?;
  if !criteria.iter().any(|c| c.criterion_id == body.criterion_id) {
    return Err(ApiError::BadRequest(format!("unknown criterion {}", body.criterion_id)));
  }
  let semesters = store.list_semesters().await.map_err(ApiError::store)?;
  if !semesters.iter().any(|s| s.semester_id == body.semester_id) {
    return Err(ApiError::BadRequest(format!("unknown semester {}", body.semester_id)));
  }

  let activity = store.add_activity(body).await.map_err(ApiError::store)?;
  info!(by = %caller.account_id, activity = activity.activity_id, "activity created");
  Ok((StatusCode::CREATED, Json(activity)))
}

/// `POST /activities/{activity_id}/register`
pub async fn register<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(caller): CurrentAccount,
  Path(activity_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let store = state.store.as_ref();
  require_permission(store, &caller, Permission::RegisterActivity).await?;
  let student = student_of(store, &caller).await?;

  existing_activity(store, activity_id).await?;

  if store
    .get_registration(student.user_id, activity_id)
    .await
    .map_err(ApiError::store)?
    .is_some()
  {
    return Err(ApiError::Conflict("already registered for this activity".into()));
  }

  let registration = store
    .register_activity(student.user_id, activity_id)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(registration)))
}

/// `GET /activities/{activity_id}`
pub async fn detail<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(activity_id): Path<i64>,
) -> Result<Json<ActivityDetail>, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let detail = state
    .store
    .activity_detail(activity_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("activity {activity_id} not found")))?;
  Ok(Json(detail))
}

// ─── Comments and likes ──────────────────────────────────────────────────────

/// `GET /activities/{activity_id}/comments`
pub async fn comments<S, M>(
  State(state): State<ApiState<S, M>>,
  Path(activity_id): Path<i64>,
  Query(page): Query<PageParams>,
) -> Result<Response, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let store = state.store.as_ref();
  existing_activity(store, activity_id).await?;
  let comments = store.list_comments(activity_id).await.map_err(ApiError::store)?;
  state.paginator.respond(&page, comments)
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
  pub content: String,
}

/// `POST /activities/{activity_id}/comments`
pub async fn add_comment<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(caller): CurrentAccount,
  Path(activity_id): Path<i64>,
  Json(body): Json<CommentBody>,
) -> Result<(StatusCode, Json<Comment>), ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let store = state.store.as_ref();
  let content = body.content.trim();
  if content.is_empty() {
    return Err(ApiError::BadRequest("content is required".into()));
  }
  existing_activity(store, activity_id).await?;

  let comment = store
    .add_comment(caller.account_id, activity_id, content.to_owned())
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(comment)))
}

/// `POST /activities/{activity_id}/like`
pub async fn like<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(caller): CurrentAccount,
  Path(activity_id): Path<i64>,
) -> Result<Json<LikeState>, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let store = state.store.as_ref();
  existing_activity(store, activity_id).await?;
  let liked = store
    .toggle_like(caller.account_id, activity_id)
    .await
    .map_err(ApiError::store)?;
  info!(account = %caller.account_id, activity = activity_id, liked = liked.liked, "like toggled");
  Ok(Json(liked))
}

// ─── Training points ─────────────────────────────────────────────────────────

/// `GET /training-points/{semester_code}`
pub async fn training_points<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(caller): CurrentAccount,
  Path(semester_code): Path<String>,
) -> Result<Json<Vec<TrainingPoint>>, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let store = state.store.as_ref();
  require_permission(store, &caller, Permission::ViewTrainingPoint).await?;
  let student = student_of(store, &caller).await?;

  let semester = store
    .get_semester_by_code(&semester_code)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("semester {semester_code:?} not found")))?;

  let points = store
    .training_points(student.user_id, semester.semester_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(points))
}
