//! Handlers for the school catalogue listings.
//!
//! All three accept the optional `page` / `page_size` parameters of
//! [`crate::pagination`].

use axum::{extract::State, response::Response};
use campus_core::{access::GroupName, media::MediaStore, store::CampusStore};
use serde::Deserialize;

use crate::{
  ApiState,
  auth::{CurrentAccount, require_group},
  error::ApiError,
  extract::{Query, parse_id},
  pagination::PageParams,
};

/// Kept as a string so a blank value reads as "no filter".
#[derive(Debug, Deserialize)]
pub struct ClassFilter {
  pub faculty_id: Option<String>,
}

/// `GET /classes[?faculty_id=<id>]`, assistant group
pub async fn classes<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(caller): CurrentAccount,
  Query(filter): Query<ClassFilter>,
  Query(page): Query<PageParams>,
) -> Result<Response, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  require_group(&caller, GroupName::Assistant)?;
  let faculty_id = parse_id("faculty_id", filter.faculty_id.as_deref())?;
  let classes = state
    .store
    .list_classes(faculty_id)
    .await
    .map_err(ApiError::store)?;
  state.paginator.respond(&page, classes)
}

/// `GET /criteria`
pub async fn criteria<S, M>(
  State(state): State<ApiState<S, M>>,
  Query(page): Query<PageParams>,
) -> Result<Response, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let criteria = state.store.list_criteria().await.map_err(ApiError::store)?;
  state.paginator.respond(&page, criteria)
}

/// `GET /semesters`, newest first
pub async fn semesters<S, M>(
  State(state): State<ApiState<S, M>>,
  Query(page): Query<PageParams>,
) -> Result<Response, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let semesters = state.store.list_semesters().await.map_err(ApiError::store)?;
  state.paginator.respond(&page, semesters)
}
