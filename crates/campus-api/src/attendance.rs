//! `POST /files/attendance/upload/csv`
//!
//! Accepts a multipart form whose `file` field holds a `.csv` attendance
//! file. The file is parsed completely before anything is written; the rows
//! are then reconciled in one store transaction.

use axum::extract::State;
use campus_core::{
  access::GroupName,
  attendance::{ReconcileReport, parse_attendance_csv},
  media::MediaStore,
  store::CampusStore,
};
use serde::Serialize;

use crate::{
  ApiState,
  auth::{CurrentAccount, require_group},
  error::ApiError,
  extract::{Json, Multipart},
};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
  pub detail: &'static str,
  pub report: ReconcileReport,
}

/// An uploaded file: its client-side name and content.
struct FormFile {
  name: Option<String>,
  data: Vec<u8>,
}

/// Drain `multipart`, keeping the field called `file`.
async fn file_field(multipart: &mut axum::extract::Multipart) -> Result<Option<FormFile>, ApiError> {
  let mut file = None;
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.body_text()))?
  {
    if field.name() != Some("file") {
      continue;
    }
    let name = field.file_name().map(str::to_owned);
    let data = field
      .bytes()
      .await
      .map_err(|e| ApiError::BadRequest(e.body_text()))?;
    file = Some(FormFile { name, data: data.to_vec() });
  }
  Ok(file)
}

/// Whether `name` carries the `.csv` extension, ignoring case.
fn has_csv_extension(name: &str) -> bool {
  name
    .rsplit_once('.')
    .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("csv"))
}

pub async fn upload_csv<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(caller): CurrentAccount,
  Multipart(mut multipart): Multipart,
) -> Result<Json<UploadResponse>, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  require_group(&caller, GroupName::Assistant)?;

  let file = file_field(&mut multipart)
    .await?
    .ok_or_else(|| ApiError::BadRequest("file is required".into()))?;
  if !file.name.as_deref().is_some_and(has_csv_extension) {
    return Err(ApiError::BadRequest("file must be a .csv file".into()));
  }

  let text = String::from_utf8(file.data)
    .map_err(|_| ApiError::BadRequest("file is not valid UTF-8".into()))?;
  let rows = parse_attendance_csv(&text)?;

  let report = state
    .store
    .reconcile_attendance(&rows)
    .await
    .map_err(ApiError::store)?;

  Ok(Json(UploadResponse { detail: "attendance file uploaded", report }))
}
