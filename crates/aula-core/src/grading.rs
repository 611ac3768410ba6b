//! # Grading Module
//!
//! Grade bounds and attendance calendar-day keys.
//!
//! Everything here is a pure check. Callers run it before touching state,
//! so a rejected input never leaves a half-applied update behind.

use crate::error::EditError;
use crate::model::Attendance;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// GRADES
// =============================================================================

/// Lowest grade value.
pub const MIN_GRADE: i64 = 1;

/// Highest grade value.
pub const MAX_GRADE: i64 = 10;

/// Value of a freshly added grade.
pub const DEFAULT_GRADE: i64 = MIN_GRADE;

/// Result of parsing the grade input box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeInput {
    /// Empty box. Valid while typing, normalised at save.
    Blank,
    /// In range, taken as is.
    Value(i64),
    /// Out of range, pulled to the nearest bound.
    Clamped { entered: i64, value: i64 },
}

impl GradeInput {
    /// The value to store, `None` for a blank box.
    #[must_use]
    pub fn stored(self) -> Option<i64> {
        match self {
            Self::Blank => None,
            Self::Value(v) | Self::Clamped { value: v, .. } => Some(v),
        }
    }
}

/// Parse free text typed into a grade box.
///
/// Non-numeric text is rejected so the previous value stays in place.
pub fn parse_grade_input(text: &str) -> Result<GradeInput, EditError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(GradeInput::Blank);
    }
    let entered: i64 = trimmed
        .parse()
        .map_err(|_| EditError::NotNumeric(text.to_string()))?;
    let value = entered.clamp(MIN_GRADE, MAX_GRADE);
    if value == entered {
        Ok(GradeInput::Value(value))
    } else {
        Ok(GradeInput::Clamped { entered, value })
    }
}

/// Final value for a grade at save time and whether it had to be corrected.
///
/// Blank counts as out of range and becomes [`MIN_GRADE`].
#[must_use]
pub fn normalize_grade(value: Option<i64>) -> (i64, bool) {
    match value {
        Some(v) if (MIN_GRADE..=MAX_GRADE).contains(&v) => (v, false),
        Some(v) => (v.clamp(MIN_GRADE, MAX_GRADE), true),
        None => (MIN_GRADE, true),
    }
}

// =============================================================================
// ATTENDANCE DAY KEYS
// =============================================================================

/// UTC calendar day of an attendance timestamp.
///
/// Two attendance records of the same subject-instance must never share a
/// key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey(NaiveDate);

impl DayKey {
    #[must_use]
    pub fn of(at: &DateTime<Utc>) -> Self {
        Self(at.date_naive())
    }

    #[must_use]
    pub fn date(self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Position of a record (other than `except`) that falls on `key`.
#[must_use]
pub fn find_day_collision(
    records: &[Attendance],
    key: DayKey,
    except: Option<usize>,
) -> Option<usize> {
    records
        .iter()
        .enumerate()
        .find(|(i, a)| Some(*i) != except && DayKey::of(&a.at) == key)
        .map(|(i, _)| i)
}

/// First calendar day that appears twice, in record order.
#[must_use]
pub fn first_duplicate_day(records: &[Attendance]) -> Option<DayKey> {
    let mut seen = BTreeSet::new();
    records
        .iter()
        .map(|a| DayKey::of(&a.at))
        .find(|key| !seen.insert(*key))
}

// =============================================================================
// TESTS
// =============================================================================
