//! The school catalogue: faculties, majors, classes, semesters and the
//! training-point criteria.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faculty {
  pub faculty_id: i64,
  pub name:       String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Major {
  pub major_id:   i64,
  pub name:       String,
  pub faculty_id: i64,
}

/// A student class. `faculty_id` is denormalised from the class's major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
  pub class_id:   i64,
  pub name:       String,
  pub major_id:   i64,
  pub faculty_id: i64,
  pub is_active:  bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
  pub semester_id: i64,
  /// Externally visible code, e.g. `"2023-2024-1"`.
  pub code:        String,
  pub name:        String,
  pub starts_on:   NaiveDate,
  pub ends_on:     NaiveDate,
  pub is_active:   bool,
}

/// One of the training-point criteria. Points credited against a criterion
/// never exceed `max_point` per student and semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
  pub criterion_id: i64,
  pub name:         String,
  pub max_point:    i64,
  pub is_active:    bool,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NewClass {
  pub name:     String,
  pub major_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSemester {
  pub code:      String,
  pub name:      String,
  pub starts_on: NaiveDate,
  pub ends_on:   NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCriterion {
  pub name:      String,
  pub max_point: i64,
}
