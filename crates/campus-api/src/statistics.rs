//! `GET /statistics/points/{semester_code}?faculty_id&class_id`
//!
//! At least one of `faculty_id` / `class_id` is required (400); a blank value
//! counts as absent and a non-integer one is a 400. When both are given the
//! class must belong to the faculty, otherwise 404.

use axum::extract::State;
use campus_core::{
  access::GroupName,
  media::MediaStore,
  statistics::{Statistics, StatisticsScope},
  store::CampusStore,
};
use serde::Deserialize;

use crate::{
  ApiState,
  auth::{CurrentAccount, require_group},
  error::ApiError,
  extract::{Json, Path, Query, parse_id},
};

#[derive(Debug, Deserialize)]
pub struct ScopeParams {
  pub faculty_id: Option<String>,
  pub class_id:   Option<String>,
}

pub async fn points<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(caller): CurrentAccount,
  Path(semester_code): Path<String>,
  Query(params): Query<ScopeParams>,
) -> Result<Json<Statistics>, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  require_group(&caller, GroupName::Assistant)?;
  let store = state.store.as_ref();

  let semester = store
    .get_semester_by_code(&semester_code)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("semester {semester_code:?} not found")))?;

  let scope = StatisticsScope::new(
    parse_id("faculty_id", params.faculty_id.as_deref())?,
    parse_id("class_id", params.class_id.as_deref())?,
  )?;

  if let Some(faculty_id) = scope.faculty_id() {
    store
      .get_faculty(faculty_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("faculty {faculty_id} not found")))?;
  }
  if let Some(class_id) = scope.class_id() {
    let class = store
      .get_class(class_id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("class {class_id} not found")))?;
    if scope.faculty_id().is_some_and(|f| f != class.faculty_id) {
      return Err(ApiError::NotFound(format!("class {class_id} not found in faculty")));
    }
  }

  let stats = store
    .statistics(&semester, &scope)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(stats))
}
