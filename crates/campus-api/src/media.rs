//! Handlers for `/media`, thin wrappers over [`get_or_upload`].
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/media?public_id=&category=` | Public; `null` when nothing resolves |
//! | `POST` | `/media` | Authenticated multipart: `file`, `public_id`, `category` |

use axum::extract::State;
use campus_core::{
  media::{MediaCategory, MediaResource, MediaStore, check_public_id, get_or_upload},
  store::CampusStore,
};
use serde::Deserialize;
use tracing::info;

use crate::{
  ApiState,
  auth::CurrentAccount,
  error::ApiError,
  extract::{Json, Multipart, Query},
};

fn parse_category(raw: Option<&str>) -> Result<Option<MediaCategory>, ApiError> {
  raw
    .filter(|s| !s.is_empty())
    .map(MediaCategory::parse)
    .transpose()
    .map_err(ApiError::from)
}

/// The extension of an uploaded file name, lowercased.
fn extension(file_name: &str) -> Option<String> {
  file_name
    .rsplit_once('.')
    .filter(|(stem, ext)| !stem.is_empty() && !ext.is_empty())
    .map(|(_, ext)| ext.to_ascii_lowercase())
}

// ─── Resolve ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
  pub public_id: Option<String>,
  pub category:  Option<String>,
}

/// `GET /media`
pub async fn resolve<S, M>(
  State(state): State<ApiState<S, M>>,
  Query(params): Query<ResolveParams>,
) -> Result<Json<Option<MediaResource>>, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let category = parse_category(params.category.as_deref())?;
  let public_id = params.public_id.filter(|s| !s.is_empty());

  let resource = get_or_upload(state.media.as_ref(), None, public_id, None, category)
    .await
    .map_err(ApiError::media)?;
  Ok(Json(resource))
}

// ─── Upload ──────────────────────────────────────────────────────────────────

/// `POST /media`
///
/// Without a `file` field this behaves like `GET /media`. An upload to a
/// malformed `public_id` is a 400.
pub async fn upload<S, M>(
  State(state): State<ApiState<S, M>>,
  CurrentAccount(caller): CurrentAccount,
  Multipart(mut multipart): Multipart,
) -> Result<Json<Option<MediaResource>>, ApiError>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  let mut file = None;
  let mut format = None;
  let mut public_id = None;
  let mut category = None;

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::BadRequest(e.body_text()))?
  {
    match field.name() {
      Some("file") => {
        format = field.file_name().and_then(extension);
        let data = field
          .bytes()
          .await
          .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        file = Some(data.to_vec());
      }
      Some("public_id") => {
        let text = field
          .text()
          .await
          .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        public_id = Some(text).filter(|s| !s.is_empty());
      }
      Some("category") => {
        let text = field
          .text()
          .await
          .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        category = parse_category(Some(&text))?;
      }
      _ => {}
    }
  }

  let uploading = file.is_some();
  if let Some(id) = public_id.as_deref().filter(|_| uploading) {
    check_public_id(id)?;
  }
  let resource = get_or_upload(state.media.as_ref(), file, public_id, format, category)
    .await
    .map_err(ApiError::media)?;

  if let Some(res) = resource.as_ref().filter(|_| uploading) {
    info!(by = %caller.account_id, public_id = %res.public_id, version = res.version, "media uploaded");
  }
  Ok(Json(resource))
}
