//! Optional page-number pagination for list endpoints.
//!
//! Without a `page` query parameter a list endpoint returns its whole dataset
//! as a bare JSON array. With one, it returns a [`Page`] envelope.

use axum::{
  Json,
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Query parameters understood by [`Paginator::respond`].
///
/// Both are kept as strings so that a junk value maps to the pagination
/// rules below rather than to an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub page:      Option<String>,
  pub page_size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
  pub count:    usize,
  pub next:     Option<usize>,
  pub previous: Option<usize>,
  pub results:  Vec<T>,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
  pub page_size:     usize,
  pub max_page_size: usize,
}

impl Default for Paginator {
  fn default() -> Self { Self { page_size: 20, max_page_size: 100 } }
}

impl Paginator {
  /// The page size for a request: `requested` if it is a positive integer
  /// (clamped to `max_page_size`), else the default.
  fn size_for(&self, requested: Option<&str>) -> usize {
    requested
      .and_then(|s| s.parse::<usize>().ok())
      .filter(|&n| n > 0)
      .map_or(self.page_size, |n| n.min(self.max_page_size))
      .max(1)
  }

  /// Cut `data` into page `page`.
  ///
  /// `page` is a 1-based number or `last`; anything else, or a number past
  /// the final page, is `404 invalid page`. An empty dataset still has one
  /// (empty) page.
  pub fn paginate<T>(
    &self,
    page: &str,
    page_size: Option<&str>,
    data: Vec<T>,
  ) -> Result<Page<T>, ApiError> {
    let size = self.size_for(page_size);
    let count = data.len();
    let pages = count.div_ceil(size).max(1);

    let page = match page {
      "last" => pages,
      n => n.parse::<usize>().map_err(|_| invalid_page())?,
    };
    if page == 0 || page > pages {
      return Err(invalid_page());
    }

    let results = data.into_iter().skip((page - 1) * size).take(size).collect();
    Ok(Page {
      count,
      next: (page < pages).then_some(page + 1),
      previous: (page > 1).then_some(page - 1),
      results,
    })
  }

  /// Render `data` as a bare array when no page was requested, as a [`Page`]
  /// envelope otherwise.
  pub fn respond<T: Serialize>(&self, params: &PageParams, data: Vec<T>) -> Result<Response, ApiError> {
    match params.page.as_deref() {
      None => Ok(Json(data).into_response()),
      Some(page) => {
        let page = self.paginate(page, params.page_size.as_deref(), data)?;
        Ok(Json(page).into_response())
      }
    }
  }
}

fn invalid_page() -> ApiError { ApiError::NotFound("invalid page".into()) }
