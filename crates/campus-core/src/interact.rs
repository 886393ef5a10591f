//! Comments and likes on activities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id:  i64,
  pub activity_id: i64,
  pub account_id:  Uuid,
  /// The author's username at read time.
  pub username:    String,
  pub content:     String,
  pub created_at:  DateTime<Utc>,
}

/// An account's like on an activity after a toggle, with the new total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
  pub activity_id: i64,
  pub liked:       bool,
  pub likes:       i64,
}
