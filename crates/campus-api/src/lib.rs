//! JSON REST API for the campus backend.
//!
//! Exposes an axum [`Router`] backed by any [`CampusStore`] and
//! [`MediaStore`]. Authentication is HTTP Basic against stored accounts; TLS
//! and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", campus_api::api_router(state))
//! ```

pub mod accounts;
pub mod activities;
pub mod attendance;
pub mod auth;
pub mod error;
pub mod extract;
pub mod media;
pub mod pagination;
pub mod schools;
pub mod statistics;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use campus_core::{media::MediaStore, store::CampusStore};

pub use error::ApiError;
pub use pagination::Paginator;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct ApiState<S, M> {
  pub store:     Arc<S>,
  pub media:     Arc<M>,
  pub paginator: Paginator,
}

// `S` and `M` need not be `Clone`.
impl<S, M> Clone for ApiState<S, M> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      media:     Arc::clone(&self.media),
      paginator: self.paginator,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, M>(state: ApiState<S, M>) -> Router<()>
where
  S: CampusStore + 'static,
  M: MediaStore + 'static,
{
  Router::new()
    // Accounts and users
    .route("/me", get(accounts::me::<S, M>))
    .route("/accounts", post(accounts::create::<S, M>))
    .route("/accounts/{account_id}/provision", post(accounts::provision_one::<S, M>))
    .route("/students/register", post(accounts::register_student::<S, M>))
    .route("/users/{code}", get(accounts::user_by_code::<S, M>))
    // Catalogue
    .route("/classes", get(schools::classes::<S, M>))
    .route("/criteria", get(schools::criteria::<S, M>))
    .route("/semesters", get(schools::semesters::<S, M>))
    // Statistics and attendance
    .route("/statistics/points/{semester_code}", get(statistics::points::<S, M>))
    .route("/files/attendance/upload/csv", post(attendance::upload_csv::<S, M>))
    // Activities
    .route("/activities", post(activities::create::<S, M>))
    .route("/activities/{activity_id}", get(activities::detail::<S, M>))
    .route("/activities/{activity_id}/register", post(activities::register::<S, M>))
    .route(
      "/activities/{activity_id}/comments",
      get(activities::comments::<S, M>).post(activities::add_comment::<S, M>),
    )
    .route("/activities/{activity_id}/like", post(activities::like::<S, M>))
    .route("/training-points/{semester_code}", get(activities::training_points::<S, M>))
    // Media
    .route("/media", get(media::resolve::<S, M>).post(media::upload::<S, M>))
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
