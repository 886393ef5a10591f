//! HTTP server for the campus backend.
//!
//! Wires a [`campus_store_sqlite::SqliteStore`] and an [`FsMediaStore`] into
//! the API router under `/api`.

pub mod media;

use std::path::PathBuf;

use axum::{Router, extract::DefaultBodyLimit};
use campus_api::{ApiState, Paginator, api_router};
use campus_core::{media::MediaStore, store::CampusStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use media::{FsMediaError, FsMediaStore};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `campus.toml` and
/// `CAMPUS_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub store_path:       PathBuf,
  pub media_dir:        PathBuf,
  pub page_size:        usize,
  pub max_page_size:    usize,
  pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:             "127.0.0.1".into(),
      port:             8000,
      store_path:       PathBuf::from("campus.sqlite"),
      media_dir:        PathBuf::from("media"),
      page_size:        20,
      max_page_size:    100,
      max_upload_bytes: 10 * 1024 * 1024,
    }
  }
}

impl ServerConfig {
  pub fn paginator(&self) -> Paginator {
    Paginator { page_size: self.page_size.max(1), max_page_size: self.max_page_size.max(1) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: the API nested under `/api`, with request tracing
/// and the upload size limit applied.
pub fn app<S, M>(state: ApiState<S, M>, config: &ServerConfig) -> Router
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(DefaultBodyLimit::max(config.max_upload_bytes))
    .layer(TraceLayer::new_for_http())
}
