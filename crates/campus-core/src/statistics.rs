//! Training-point statistics for a semester, scoped to a faculty, a class or
//! both.

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator as _};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scope ───────────────────────────────────────────────────────────────────

/// Which students a statistics request covers. At least one side is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsScope {
  faculty_id: Option<i64>,
  class_id:   Option<i64>,
}

impl StatisticsScope {
  pub fn new(faculty_id: Option<i64>, class_id: Option<i64>) -> Result<Self> {
    if faculty_id.is_none() && class_id.is_none() {
      return Err(Error::EmptyStatisticsScope);
    }
    Ok(Self { faculty_id, class_id })
  }

  pub fn faculty_id(&self) -> Option<i64> { self.faculty_id }

  pub fn class_id(&self) -> Option<i64> { self.class_id }
}

// ─── Achievement ─────────────────────────────────────────────────────────────

/// Classification of a student's semester total.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
  Excellent,
  Good,
  Fair,
  Average,
  Weak,
  Poor,
}

impl Achievement {
  pub fn classify(total: i64) -> Self {
    match total {
      90.. => Self::Excellent,
      80..=89 => Self::Good,
      65..=79 => Self::Fair,
      50..=64 => Self::Average,
      35..=49 => Self::Weak,
      _ => Self::Poor,
    }
  }
}

// ─── Inputs from the store ───────────────────────────────────────────────────

/// A student in scope and the sum of their points for the semester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentTotal {
  pub student_id: Uuid,
  pub total:      i64,
}

/// Sum of points credited against one criterion by students in scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionTotal {
  pub criterion_id: i64,
  pub name:         String,
  pub total:        i64,
}

// ─── Output ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementCount {
  pub achievement: Achievement,
  pub count:       usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionAverage {
  pub criterion_id: i64,
  pub name:         String,
  pub average:      f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
  pub semester:      String,
  pub faculty_id:    Option<i64>,
  pub class_id:      Option<i64>,
  pub student_count: usize,
  /// Mean semester total over students in scope; 0 when there are none.
  pub average_total: f64,
  /// One entry per [`Achievement`], best first, zero counts included.
  pub achievements:  Vec<AchievementCount>,
  pub criteria:      Vec<CriterionAverage>,
}

impl Statistics {
  pub fn summarize(
    semester_code: &str,
    scope: &StatisticsScope,
    totals: &[StudentTotal],
    criteria: Vec<CriterionTotal>,
  ) -> Self {
    let student_count = totals.len();
    let mean = |sum: i64| {
      if student_count == 0 { 0.0 } else { sum as f64 / student_count as f64 }
    };

    let achievements = Achievement::iter()
      .map(|achievement| AchievementCount {
        achievement,
        count: totals
          .iter()
          .filter(|t| Achievement::classify(t.total) == achievement)
          .count(),
      })
      .collect();

    let criteria = criteria
      .into_iter()
      .map(|c| CriterionAverage {
        criterion_id: c.criterion_id,
        name:         c.name,
        average:      mean(c.total),
      })
      .collect();

    Self {
      semester: semester_code.to_owned(),
      faculty_id: scope.faculty_id,
      class_id: scope.class_id,
      student_count,
      average_total: mean(totals.iter().map(|t| t.total).sum()),
      achievements,
      criteria,
    }
  }

  pub fn count(&self, achievement: Achievement) -> usize {
    self
      .achievements
      .iter()
      .find(|a| a.achievement == achievement)
      .map_or(0, |a| a.count)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_scope_is_rejected() {
    assert!(matches!(StatisticsScope::new(None, None), Err(Error::EmptyStatisticsScope)));
    assert!(StatisticsScope::new(Some(1), None).is_ok());
    assert!(StatisticsScope::new(None, Some(1)).is_ok());
  }

  #[test]
  fn classification_boundaries() {
    assert_eq!(Achievement::classify(100), Achievement::Excellent);
    assert_eq!(Achievement::classify(90), Achievement::Excellent);
    assert_eq!(Achievement::classify(89), Achievement::Good);
    assert_eq!(Achievement::classify(65), Achievement::Fair);
    assert_eq!(Achievement::classify(64), Achievement::Average);
    assert_eq!(Achievement::classify(35), Achievement::Weak);
    assert_eq!(Achievement::classify(34), Achievement::Poor);
    assert_eq!(Achievement::classify(0), Achievement::Poor);
  }

  #[test]
  fn summarize_counts_and_averages() {
    let scope = StatisticsScope::new(Some(1), None).unwrap();
    let totals = [
      StudentTotal { student_id: Uuid::new_v4(), total: 95 },
      StudentTotal { student_id: Uuid::new_v4(), total: 70 },
      StudentTotal { student_id: Uuid::new_v4(), total: 0 },
      StudentTotal { student_id: Uuid::new_v4(), total: 75 },
    ];
    let criteria = vec![CriterionTotal { criterion_id: 1, name: "Study".into(), total: 40 }];

    let stats = Statistics::summarize("2024-1", &scope, &totals, criteria);
    assert_eq!(stats.student_count, 4);
    assert_eq!(stats.achievements.len(), 6);
    assert_eq!(stats.count(Achievement::Excellent), 1);
    assert_eq!(stats.count(Achievement::Fair), 2);
    assert_eq!(stats.count(Achievement::Poor), 1);
    assert_eq!(stats.count(Achievement::Good), 0);
    assert_eq!(stats.average_total, 60.0);
    assert_eq!(stats.criteria[0].average, 10.0);
  }

  #[test]
  fn summarize_with_no_students() {
    let scope = StatisticsScope::new(None, Some(3)).unwrap();
    let stats = Statistics::summarize("2024-1", &scope, &[], vec![]);
    assert_eq!(stats.student_count, 0);
    assert_eq!(stats.average_total, 0.0);
    assert!(stats.achievements.iter().all(|a| a.count == 0));
  }
}
