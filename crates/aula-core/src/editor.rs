//! # Editor Module
//!
//! The student-record editor.
//!
//! One editor wraps one student record as last fetched from the API. The
//! viewer may open exactly one edit scope at a time: the grades and
//! attendance of one subject-instance, or (administrators only) the
//! personal-data block.
//!
//! ```text
//!            begin_subject_edit             save_subject / cancel_subject_edit
//! Viewing ─────────────────────► Subject ─────────────────────────────────► Viewing
//!    │                             │ request_deletion ─► pending ─► confirm / cancel
//!    │ begin_personal_edit         │
//!    └───────────────────► Personal ── save_personal / cancel_personal_edit ─► Viewing
//! ```
//!
//! Mutations go to a [`Draft`]; cancel discards it, save deep-copies and
//! validates it and hands back the request to send. After the request
//! succeeds the caller fetches the record again and calls [`StudentRecordEditor::resync`].

use crate::draft::Draft;
use crate::error::EditError;
use crate::grading::{
    find_day_collision, first_duplicate_day, normalize_grade, parse_grade_input, DayKey,
    GradeInput, DEFAULT_GRADE,
};
use crate::model::{
    Attendance, AttendanceStatus, Enrollment, Grade, GradesUpdate, RecordId, Role, Student,
    StudentUpdate,
};
use crate::notice::Notice;
use chrono::{DateTime, Utc};

// =============================================================================
// SCOPES AND REQUESTS
// =============================================================================

/// Which part of the record is open for editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditScope {
    Viewing,
    /// Grades and attendance of one subject-instance, by course id.
    Subject(String),
    /// Name and national id.
    Personal,
}

/// Editable personal fields of a student.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonalFields {
    pub name: String,
    pub dni: String,
}

/// What a deletion prompt refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionTarget {
    /// Grade at this position of the open subject.
    Grade(usize),
    /// Attendance record at this position of the open subject.
    Attendance(usize),
    /// The whole student record.
    Student,
}

/// A deletion waiting for its second confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    pub target: DeletionTarget,
    /// Name of the item as shown in the prompt.
    pub label: String,
}

impl PendingDeletion {
    /// Confirmation question naming the item.
    #[must_use]
    pub fn prompt(&self) -> String {
        match self.target {
            DeletionTarget::Student => format!("Delete the student {}?", self.label),
            _ => format!("Delete {}?", self.label),
        }
    }
}

/// What a confirmed deletion removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removed {
    Grade(Grade),
    Attendance(Attendance),
    /// Removing a student happens on the server; send `DELETE` for this id.
    Student { student_id: String },
}

/// The request a successful save asks the caller to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveRequest {
    /// `PUT /api/alumnos/:id` with the whole record.
    FullStudent {
        student_id: String,
        update: StudentUpdate,
    },
    /// `PUT /api/profesores/alumno/dni/:dni` with the saved subject only.
    TeacherGrades { dni: String, update: GradesUpdate },
}

/// Result of a save that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub request: SaveRequest,
    /// Some grade was blank or out of range and got clamped.
    pub corrected: bool,
    pub notice: Notice,
}

// =============================================================================
// EDITOR
// =============================================================================

/// Edit state for one student record.
#[derive(Debug, Clone)]
pub struct StudentRecordEditor {
    student_id: String,
    role: Role,
    personal: Draft<PersonalFields>,
    enrollments: Draft<Vec<Enrollment>>,
    scope: EditScope,
    pending: Option<PendingDeletion>,
    /// A grade was clamped while the open subject was being edited.
    clamped: bool,
}

impl StudentRecordEditor {
    /// Open a record for a viewer with the given role.
    #[must_use]
    pub fn new(student: Student, role: Role) -> Self {
        let Student {
            id,
            name,
            dni,
            enrollments,
        } = student;
        Self {
            student_id: id,
            role,
            personal: Draft::new(PersonalFields { name, dni }),
            enrollments: Draft::new(enrollments),
            scope: EditScope::Viewing,
            pending: None,
            clamped: false,
        }
    }

    /// Replace the committed copy with a fresh fetch and return to viewing.
    pub fn resync(&mut self, student: Student) {
        self.student_id = student.id;
        self.personal.replace(PersonalFields {
            name: student.name,
            dni: student.dni,
        });
        self.enrollments.replace(student.enrollments);
        self.scope = EditScope::Viewing;
        self.pending = None;
        self.clamped = false;
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn scope(&self) -> &EditScope {
        &self.scope
    }

    /// Enrollments as the view shows them, edits included.
    pub fn enrollments(&self) -> &[Enrollment] {
        self.enrollments.working()
    }

    /// Personal fields as the view shows them, edits included.
    pub fn personal(&self) -> &PersonalFields {
        self.personal.working()
    }

    pub fn pending_deletion(&self) -> Option<&PendingDeletion> {
        self.pending.as_ref()
    }

    /// The last-synchronised record.
    #[must_use]
    pub fn committed(&self) -> Student {
        let personal = self.personal.committed();
        Student {
            id: self.student_id.clone(),
            name: personal.name.clone(),
            dni: personal.dni.clone(),
            enrollments: self.enrollments.committed().clone(),
        }
    }

    /// The subject-instance currently being edited.
    pub fn open_subject(&self) -> Option<&Enrollment> {
        self.open_index().ok().map(|i| &self.enrollments.working()[i])
    }

    fn label_of(&self, course_id: &str) -> String {
        self.enrollments
            .working()
            .iter()
            .find(|e| e.course_id == course_id)
            .map(Enrollment::label)
            .unwrap_or_else(|| course_id.to_string())
    }

    fn open_index(&self) -> Result<usize, EditError> {
        let EditScope::Subject(course_id) = &self.scope else {
            return Err(EditError::NotEditingSubject);
        };
        self.enrollments
            .working()
            .iter()
            .position(|e| &e.course_id == course_id)
            .ok_or_else(|| EditError::UnknownCourse(course_id.clone()))
    }

    fn busy_with(&self) -> Option<String> {
        match &self.scope {
            EditScope::Viewing => None,
            EditScope::Subject(course_id) => Some(self.label_of(course_id)),
            EditScope::Personal => Some("the personal data".to_string()),
        }
    }

    // -------------------------------------------------------------------------
    // Subject scope
    // -------------------------------------------------------------------------

    /// Open the grades and attendance of one subject-instance for editing.
    ///
    /// Rejected while another scope is open; re-opening the same subject
    /// does nothing.
    pub fn begin_subject_edit(&mut self, course_id: &str) -> Result<(), EditError> {
        if self.role == Role::Parent {
            return Err(EditError::ReadOnly(self.role));
        }
        match &self.scope {
            EditScope::Subject(open) if open == course_id => return Ok(()),
            EditScope::Viewing => {}
            _ => {
                return Err(EditError::ScopeBusy {
                    open: self.busy_with().unwrap_or_default(),
                });
            }
        }
        if !self
            .enrollments
            .working()
            .iter()
            .any(|e| e.course_id == course_id)
        {
            return Err(EditError::UnknownCourse(course_id.to_string()));
        }
        self.scope = EditScope::Subject(course_id.to_string());
        self.pending = None;
        self.clamped = false;
        Ok(())
    }

    /// Discard every change made since the subject was opened.
    pub fn cancel_subject_edit(&mut self) -> Result<Notice, EditError> {
        let EditScope::Subject(course_id) = &self.scope else {
            return Err(EditError::NotEditingSubject);
        };
        let label = self.label_of(course_id);
        self.enrollments.discard();
        self.scope = EditScope::Viewing;
        self.pending = None;
        self.clamped = false;
        Ok(Notice::info(format!("Changes to {} discarded.", label)))
    }

    /// Append an empty grade (blank type, value 1).
    pub fn add_grade(&mut self) -> Result<usize, EditError> {
        let idx = self.open_index()?;
        let grades = &mut self.enrollments.edit()[idx].grades;
        grades.push(Grade {
            id: Some(RecordId::draft()),
            kind: String::new(),
            value: Some(DEFAULT_GRADE),
        });
        Ok(grades.len() - 1)
    }

    /// Change the type label of a grade.
    pub fn set_grade_kind(&mut self, index: usize, kind: &str) -> Result<(), EditError> {
        let idx = self.open_index()?;
        if index >= self.enrollments.working()[idx].grades.len() {
            return Err(EditError::NoSuchGrade(index));
        }
        self.enrollments.edit()[idx].grades[index].kind = kind.to_string();
        Ok(())
    }

    /// Change a grade from text input.
    ///
    /// Returns a warning when the value had to be clamped into range.
    pub fn set_grade_value(&mut self, index: usize, text: &str) -> Result<Option<Notice>, EditError> {
        let idx = self.open_index()?;
        if index >= self.enrollments.working()[idx].grades.len() {
            return Err(EditError::NoSuchGrade(index));
        }
        let input = parse_grade_input(text)?;
        self.enrollments.edit()[idx].grades[index].value = input.stored();
        Ok(match input {
            GradeInput::Clamped { entered, value } => {
                self.clamped = true;
                Some(Notice::warning(format!(
                    "Grade {} is out of range (1-10), set to {}.",
                    entered, value
                )))
            }
            _ => None,
        })
    }

    /// Record attendance for `now`, status present.
    ///
    /// Rejected when the subject already has a record on that calendar day.
    pub fn add_attendance(&mut self, now: DateTime<Utc>) -> Result<usize, EditError> {
        let idx = self.open_index()?;
        let key = DayKey::of(&now);
        if find_day_collision(&self.enrollments.working()[idx].attendance, key, None).is_some() {
            return Err(EditError::DuplicateAttendanceDay(key));
        }
        let attendance = &mut self.enrollments.edit()[idx].attendance;
        attendance.push(Attendance {
            id: Some(RecordId::draft()),
            at: now,
            status: AttendanceStatus::Present,
        });
        Ok(attendance.len() - 1)
    }

    pub fn set_attendance_status(
        &mut self,
        index: usize,
        status: AttendanceStatus,
    ) -> Result<(), EditError> {
        let idx = self.open_index()?;
        if index >= self.enrollments.working()[idx].attendance.len() {
            return Err(EditError::NoSuchAttendance(index));
        }
        self.enrollments.edit()[idx].attendance[index].status = status;
        Ok(())
    }

    /// Move an attendance record to another moment.
    ///
    /// The moment may not be later than `now` nor share a calendar day with
    /// another record of the subject. On rejection the old value stays.
    pub fn set_attendance_time(
        &mut self,
        index: usize,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), EditError> {
        let idx = self.open_index()?;
        let records = &self.enrollments.working()[idx].attendance;
        if index >= records.len() {
            return Err(EditError::NoSuchAttendance(index));
        }
        if at > now {
            return Err(EditError::FutureAttendance);
        }
        let key = DayKey::of(&at);
        if find_day_collision(records, key, Some(index)).is_some() {
            return Err(EditError::DuplicateAttendanceDay(key));
        }
        self.enrollments.edit()[idx].attendance[index].at = at;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Two-phase deletion
    // -------------------------------------------------------------------------

    /// First phase: mark an item and return the prompt to confirm.
    pub fn request_deletion(&mut self, target: DeletionTarget) -> Result<&PendingDeletion, EditError> {
        let label = match target {
            DeletionTarget::Grade(index) => {
                let idx = self.open_index()?;
                let grade = self.enrollments.working()[idx]
                    .grades
                    .get(index)
                    .ok_or(EditError::NoSuchGrade(index))?;
                if grade.kind.trim().is_empty() {
                    "the new grade".to_string()
                } else {
                    format!("the grade {}", grade.kind)
                }
            }
            DeletionTarget::Attendance(index) => {
                let idx = self.open_index()?;
                let record = self.enrollments.working()[idx]
                    .attendance
                    .get(index)
                    .ok_or(EditError::NoSuchAttendance(index))?;
                format!("the attendance of {}", record.at.format("%Y-%m-%d %H:%M"))
            }
            DeletionTarget::Student => {
                if self.role != Role::Administrator {
                    return Err(EditError::AdminOnly);
                }
                if let EditScope::Subject(_) = self.scope {
                    return Err(EditError::ScopeBusy {
                        open: self.busy_with().unwrap_or_default(),
                    });
                }
                let name = &self.personal.committed().name;
                if name.is_empty() {
                    "the student".to_string()
                } else {
                    name.clone()
                }
            }
        };
        let pending: &PendingDeletion = self.pending.insert(PendingDeletion { target, label });
        Ok(pending)
    }

    /// Drop the pending deletion without touching anything.
    pub fn cancel_deletion(&mut self) {
        self.pending = None;
    }

    /// Second phase: remove the pending item.
    pub fn confirm_deletion(&mut self) -> Result<Removed, EditError> {
        let pending = self.pending.take().ok_or(EditError::NoPendingDeletion)?;
        match pending.target {
            DeletionTarget::Grade(index) => {
                let idx = self.open_index()?;
                if index >= self.enrollments.working()[idx].grades.len() {
                    return Err(EditError::NoSuchGrade(index));
                }
                Ok(Removed::Grade(self.enrollments.edit()[idx].grades.remove(index)))
            }
            DeletionTarget::Attendance(index) => {
                let idx = self.open_index()?;
                if index >= self.enrollments.working()[idx].attendance.len() {
                    return Err(EditError::NoSuchAttendance(index));
                }
                Ok(Removed::Attendance(
                    self.enrollments.edit()[idx].attendance.remove(index),
                ))
            }
            DeletionTarget::Student => {
                if self.scope == EditScope::Personal {
                    self.personal.discard();
                    self.scope = EditScope::Viewing;
                }
                Ok(Removed::Student {
                    student_id: self.student_id.clone(),
                })
            }
        }
    }

    // -------------------------------------------------------------------------
    // Save
    // -------------------------------------------------------------------------

    /// Validate the open subject and build the request to send.
    ///
    /// Blank grade types and attendance records sharing a day abort the
    /// save and keep the scope open. Out-of-range or blank grade values are
    /// clamped and reported through `corrected`. Draft ids are stripped.
    pub fn save_subject(&mut self) -> Result<SaveOutcome, EditError> {
        let idx = self.open_index()?;
        let mut prepared = self.enrollments.working().clone();

        if prepared
            .iter()
            .flat_map(|e| &e.grades)
            .any(|g| g.kind.trim().is_empty())
        {
            return Err(EditError::BlankGradeKind);
        }
        if let Some(key) = prepared
            .iter()
            .find_map(|e| first_duplicate_day(&e.attendance))
        {
            return Err(EditError::DuplicateAttendanceDay(key));
        }

        let mut corrected = self.clamped;
        for enrollment in &mut prepared {
            for grade in &mut enrollment.grades {
                let (value, fixed) = normalize_grade(grade.value);
                grade.value = Some(value);
                corrected |= fixed;
                if grade.id.as_ref().is_some_and(RecordId::is_draft) {
                    grade.id = None;
                }
            }
            for record in &mut enrollment.attendance {
                if record.id.as_ref().is_some_and(RecordId::is_draft) {
                    record.id = None;
                }
            }
        }

        let request = match self.role {
            Role::Administrator => {
                let personal = self.personal.committed();
                SaveRequest::FullStudent {
                    student_id: self.student_id.clone(),
                    update: StudentUpdate {
                        name: personal.name.trim().to_string(),
                        dni: personal.dni.trim().to_string(),
                        enrollments: prepared.clone(),
                    },
                }
            }
            Role::Teacher => SaveRequest::TeacherGrades {
                dni: self.personal.committed().dni.trim().to_string(),
                update: GradesUpdate {
                    enrollments: vec![prepared[idx].clone()],
                },
            },
            Role::Parent => return Err(EditError::ReadOnly(self.role)),
        };

        self.enrollments.replace(prepared);
        self.scope = EditScope::Viewing;
        self.pending = None;
        self.clamped = false;

        let notice = if corrected {
            Notice::warning("Grades outside the 1-10 range were corrected automatically.")
        } else {
            Notice::success("Subject changes saved.")
        };
        Ok(SaveOutcome {
            request,
            corrected,
            notice,
        })
    }

    // -------------------------------------------------------------------------
    // Personal scope
    // -------------------------------------------------------------------------

    /// Open name and national id for editing. Administrators only.
    pub fn begin_personal_edit(&mut self) -> Result<(), EditError> {
        if self.role != Role::Administrator {
            return Err(EditError::AdminOnly);
        }
        match self.scope {
            EditScope::Personal => Ok(()),
            EditScope::Viewing => {
                self.scope = EditScope::Personal;
                Ok(())
            }
            EditScope::Subject(_) => Err(EditError::ScopeBusy {
                open: self.busy_with().unwrap_or_default(),
            }),
        }
    }

    pub fn set_personal_name(&mut self, name: &str) -> Result<(), EditError> {
        if self.scope != EditScope::Personal {
            return Err(EditError::NotEditingPersonal);
        }
        self.personal.edit().name = name.to_string();
        Ok(())
    }

    pub fn set_personal_dni(&mut self, dni: &str) -> Result<(), EditError> {
        if self.scope != EditScope::Personal {
            return Err(EditError::NotEditingPersonal);
        }
        self.personal.edit().dni = dni.to_string();
        Ok(())
    }

    pub fn cancel_personal_edit(&mut self) -> Result<Notice, EditError> {
        if self.scope != EditScope::Personal {
            return Err(EditError::NotEditingPersonal);
        }
        self.personal.discard();
        self.scope = EditScope::Viewing;
        Ok(Notice::info("Personal data edit cancelled."))
    }

    /// Validate the personal fields and build the full-record update.
    pub fn save_personal(&mut self) -> Result<SaveOutcome, EditError> {
        if self.scope != EditScope::Personal {
            return Err(EditError::NotEditingPersonal);
        }
        let working = self.personal.working();
        let fields = PersonalFields {
            name: working.name.trim().to_string(),
            dni: working.dni.trim().to_string(),
        };
        if fields.name.is_empty() || fields.dni.is_empty() {
            return Err(EditError::BlankPersonalField);
        }

        let request = SaveRequest::FullStudent {
            student_id: self.student_id.clone(),
            update: StudentUpdate {
                name: fields.name.clone(),
                dni: fields.dni.clone(),
                enrollments: self.enrollments.committed().clone(),
            },
        };
        self.personal.replace(fields);
        self.scope = EditScope::Viewing;
        self.pending = None;

        Ok(SaveOutcome {
            request,
            corrected: false,
            notice: Notice::success("Personal data updated."),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
