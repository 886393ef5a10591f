//! Extracurricular activities, student registrations and training points.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
  pub activity_id:  i64,
  pub name:         String,
  pub criterion_id: i64,
  pub semester_id:  i64,
  /// Points credited to a participant once attendance is reconciled.
  pub point:        i64,
  pub created_at:   DateTime<Utc>,
}

/// An activity as shown on its detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityDetail {
  #[serde(flatten)]
  pub activity:  Activity,
  /// Name of the criterion the points are credited to.
  pub criterion: String,
  /// Code of the semester the activity belongs to.
  pub semester:  String,
  pub likes:     i64,
  pub comments:  i64,
}

/// Input to [`crate::store::CampusStore::add_activity`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
  pub name:         String,
  pub criterion_id: i64,
  pub semester_id:  i64,
  pub point:        i64,
}

/// A student's registration for an activity.
///
/// `is_point_added` is the idempotency guard of attendance reconciliation:
/// it flips from `false` to `true` exactly once and never back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRegistration {
  pub registration_id: i64,
  pub student_id:      Uuid,
  pub activity_id:     i64,
  pub is_point_added:  bool,
  pub registered_at:   DateTime<Utc>,
}

/// Accumulated points of one student for one criterion in one semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPoint {
  pub student_id:   Uuid,
  pub semester_id:  i64,
  pub criterion_id: i64,
  pub point:        i64,
}
