//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body has the shape `{"detail": "<message>"}`.

use axum::{
  Json,
  extract::{
    multipart::MultipartRejection,
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use campus_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("internal error: {0}")]
  Internal(String),

  /// A backend failure. Only its status reaches the client; the error itself
  /// is logged.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a [`campus_core::store::CampusStore`] failure; suitable for
  /// `map_err`. A uniqueness conflict the handler did not catch first (two
  /// racing writers) still becomes a 409.
  pub fn store<E: StoreError>(e: E) -> Self {
    if e.is_conflict() {
      return ApiError::Conflict(e.to_string());
    }
    ApiError::Store(Box::new(e))
  }

  /// Wrap a [`campus_core::media::MediaStore`] failure.
  pub fn media<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    ApiError::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::Internal(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<campus_core::Error> for ApiError {
  fn from(e: campus_core::Error) -> Self {
    use campus_core::Error as E;
    match e {
      E::UserNotFound(_) => ApiError::NotFound("user not found".into()),
      E::InvalidCsv { .. }
      | E::EmptyStatisticsScope
      | E::UnknownMediaCategory(_)
      | E::MalformedPublicId(_) => ApiError::BadRequest(e.to_string()),
      E::UnknownRole(_)
      | E::UnknownUserKind(_)
      | E::UnknownGroup(_)
      | E::UnknownPermission(_) => ApiError::Internal(e.to_string()),
    }
  }
}

// ─── Extractor rejections ────────────────────────────────────────────────────

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl From<MultipartRejection> for ApiError {
  fn from(rejection: MultipartRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

// ─── Response ────────────────────────────────────────────────────────────────

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let detail = match &self {
      ApiError::Unauthorized => "authentication credentials were not provided or are invalid".into(),
      ApiError::Forbidden(m)
      | ApiError::NotFound(m)
      | ApiError::BadRequest(m)
      | ApiError::Conflict(m)
      | ApiError::Internal(m) => m.clone(),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        "internal server error".into()
      }
    };

    let mut res = (status, Json(json!({ "detail": detail }))).into_response();
    if matches!(self, ApiError::Unauthorized) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"campus\""),
      );
    }
    res
  }
}
