//! Attendance files: parsing and the reconciliation report.
//!
//! An attendance file is UTF-8 CSV. The first line is a header and is always
//! discarded without being looked at. Every following non-blank line holds
//! exactly two fields, `student_code,activity_id`.

use serde::Serialize;

use crate::{Error, Result};

/// One data line of an attendance file, as written by the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRow {
  /// 1-based line number in the uploaded file.
  pub line:         usize,
  pub student_code: String,
  /// Kept verbatim; rows whose id is not an integer simply never resolve.
  pub activity_id:  String,
}

impl AttendanceRow {
  pub fn activity_id(&self) -> Option<i64> { self.activity_id.parse().ok() }
}

/// Parse an attendance file into rows.
///
/// A line with any field count other than two rejects the whole file, so
/// that nothing from a malformed upload is ever applied.
pub fn parse_attendance_csv(input: &str) -> Result<Vec<AttendanceRow>> {
  let mut rows = Vec::new();

  for (idx, line) in input.lines().enumerate().skip(1) {
    let line_no = idx + 1;
    if line.trim().is_empty() {
      continue;
    }

    let fields = split_record(line);
    let [code, activity] = fields.as_slice() else {
      return Err(Error::InvalidCsv {
        line:   line_no,
        reason: format!("expected 2 fields, found {}", fields.len()),
      });
    };

    rows.push(AttendanceRow {
      line:         line_no,
      student_code: code.trim().to_owned(),
      activity_id:  activity.trim().to_owned(),
    });
  }

  Ok(rows)
}

/// Split one CSV record on commas, honouring double quotes and `""` escapes.
fn split_record(line: &str) -> Vec<String> {
  let mut out = Vec::new();
  let mut buf = String::new();
  let mut in_quotes = false;
  let mut chars = line.chars().peekable();

  while let Some(ch) = chars.next() {
    match ch {
      '"' if in_quotes && chars.peek() == Some(&'"') => {
        buf.push('"');
        chars.next();
      }
      '"' => in_quotes = !in_quotes,
      ',' if !in_quotes => out.push(std::mem::take(&mut buf)),
      _ => buf.push(ch),
    }
  }
  out.push(buf);
  out
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// What happened to the rows of one reconciled file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
  pub rows:             usize,
  /// Registrations whose points were credited by this run.
  pub credited:         usize,
  /// Registrations that had already been credited earlier.
  pub already_credited: usize,
  /// Rows whose student, activity or registration does not exist.
  pub unresolved:       usize,
}
