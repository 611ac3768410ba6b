//! # Error Module
//!
//! Validation errors raised by the client-side rules.
//!
//! None of these is fatal: an operation that fails leaves state untouched
//! and the user may correct the input and retry.

use crate::grading::DayKey;
use crate::model::Role;
use crate::notice::Notice;
use thiserror::Error;

/// Errors from the student-record editor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// Another edit scope is open on the same student record.
    #[error("finish or cancel the edit of {open} first")]
    ScopeBusy { open: String },

    /// The viewer's role may look but not edit.
    #[error("the {0} role cannot edit student records")]
    ReadOnly(Role),

    /// Only administrators may edit personal data or delete students.
    #[error("only an administrator can do this")]
    AdminOnly,

    /// The student is not enrolled in the requested subject-instance.
    #[error("the student is not enrolled in course {0}")]
    UnknownCourse(String),

    /// The operation needs an open subject edit scope.
    #[error("no subject is being edited")]
    NotEditingSubject,

    /// The operation needs the personal-data edit scope.
    #[error("personal data is not being edited")]
    NotEditingPersonal,

    /// Grade input that does not parse as an integer.
    #[error("grade must be a number between 1 and 10, got {0:?}")]
    NotNumeric(String),

    #[error("no grade at position {0}")]
    NoSuchGrade(usize),

    #[error("no attendance record at position {0}")]
    NoSuchAttendance(usize),

    /// Two attendance records would share a calendar day.
    #[error("an attendance record already exists for {0}")]
    DuplicateAttendanceDay(DayKey),

    /// Attendance cannot be recorded after the current moment.
    #[error("attendance cannot be recorded in the future")]
    FutureAttendance,

    /// A grade without a type label blocks the save.
    #[error("the type of one or more grades is empty")]
    BlankGradeKind,

    /// Name and national id are both mandatory.
    #[error("the student's name and DNI cannot be empty")]
    BlankPersonalField,

    #[error("nothing is pending deletion")]
    NoPendingDeletion,
}

impl EditError {
    /// Render the error as the inline notification the view shows.
    ///
    /// A busy edit scope is a warning; everything else is an error.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::ScopeBusy { .. } => Notice::warning(self.to_string()),
            _ => Notice::error(self.to_string()),
        }
    }
}

/// Errors from the creation forms.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0:?} is not a valid email address")]
    InvalidEmail(String),

    /// A student needs at least one course with its teacher.
    #[error("assign at least one course and teacher")]
    NoEnrollments,

    /// A parent account needs at least one child.
    #[error("a parent account needs at least one child DNI")]
    NoChildren,

    /// A teacher account must link to a teacher record.
    #[error("a teacher account needs a teacher record")]
    NoTeacherRecord,
}

/// Errors from the session context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("not logged in")]
    NotLoggedIn,

    /// The logged-in user does not hold the required role.
    #[error("this view requires the {required} role, logged in as {actual}")]
    WrongRole { required: Role, actual: Role },
}
