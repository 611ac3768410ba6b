//! # Aula Core - The Logic
//!
//! Client-side rules of the Aula school administration front-end.
//!
//! Every entity (students, subject enrollments, grades, attendance, users,
//! teachers) is owned by an external HTTP API. This crate holds only what
//! the client decides on its own:
//!
//! - [`model`]: wire shapes of the API, with `serde` field names
//! - [`grading`]: grade bounds and clamping, attendance calendar-day keys
//! - [`editor`]: the student-record editor (drafts, edit scopes, two-phase
//!   deletion, save preparation)
//! - [`forms`]: creation payloads for students and users
//! - [`search`]: the lookup plan and local substring filtering
//! - [`session`]: the application-session context
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐      ┌──────────────────┐      ┌──────────────────┐
//! │   apps/aula      │ ───► │   aula-sdk       │ ───► │  external API    │
//! │   (CLI)          │      │   (HTTP client)  │ HTTP │  (not ours)      │
//! └────────┬─────────┘      └────────┬─────────┘      └──────────────────┘
//!          │                         │
//!          └──────────┬──────────────┘
//!                     ▼
//!            ┌──────────────────┐
//!            │   aula-core      │
//!            │   (THE LOGIC)    │
//!            └──────────────────┘
//! ```
//!
//! Nothing in here performs I/O or reads the wall clock; callers pass `now`.

pub mod draft;
pub mod editor;
pub mod error;
pub mod forms;
pub mod grading;
pub mod model;
pub mod notice;
pub mod search;
pub mod session;

pub use draft::Draft;
pub use editor::{
    DeletionTarget, EditScope, PendingDeletion, PersonalFields, Removed, SaveOutcome, SaveRequest,
    StudentRecordEditor,
};
pub use error::{EditError, FormError, SessionError};
pub use forms::{EnrollmentRow, NewEnrollment, NewStudent, NewUser};
pub use grading::{DayKey, GradeInput, MAX_GRADE, MIN_GRADE};
pub use model::{
    Attendance, AttendanceStatus, Child, Course, Enrollment, Grade, GradesUpdate, Page,
    Pagination, RecordId, Role, Student, StudentUpdate, Subject, TaughtCourse, TaughtStudent,
    Teacher, TeacherRef, User,
};
pub use notice::{Notice, NoticeLevel};
pub use search::{LookupStep, SearchOutcome, SearchPlan, Searchable};
pub use session::{AuthVerdict, SessionContext, SessionState};
