//! Extractors whose rejections render as [`ApiError`], so a malformed body,
//! path or query string gets the same `{"detail": ...}` envelope as every
//! other error.

use axum::{
  extract::{FromRequest, FromRequestParts, Request},
  response::{IntoResponse, Response},
};

use crate::error::ApiError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
  axum::Json<T>: IntoResponse,
{
  fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

/// A multipart form body.
pub struct Multipart(pub axum::extract::Multipart);

impl<S: Send + Sync> FromRequest<S> for Multipart {
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let inner = axum::extract::Multipart::from_request(req, state).await?;
    Ok(Multipart(inner))
  }
}

/// Read an optional integer id from a query parameter. A missing or blank
/// value is absent; anything else must parse.
pub fn parse_id(name: &str, raw: Option<&str>) -> Result<Option<i64>, ApiError> {
  match raw.map(str::trim).filter(|s| !s.is_empty()) {
    None => Ok(None),
    Some(s) => s
      .parse()
      .map(Some)
      .map_err(|_| ApiError::BadRequest(format!("{name} must be an integer, got {s:?}"))),
  }
}
