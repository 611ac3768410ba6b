//! # Model Module
//!
//! Wire shapes of the external school-management API.
//!
//! The API owns every entity. The client holds transient copies: fetched
//! when a view opens, mutated only inside an edit scope, and replaced by a
//! fresh fetch after every successful save.
//!
//! Field names follow the API's JSON (`_id`, `nombre`, `materias`, ...);
//! the Rust names describe what the field holds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// RECORD IDENTIFIERS
// =============================================================================

/// Identifier of a grade or attendance record.
///
/// Records created in an edit session carry a client-generated id so rows
/// can be told apart before the server assigns the canonical one. Draft
/// ids are stripped before submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordId {
    /// Assigned by the server.
    Persisted(String),
    /// Generated locally, never sent.
    Draft(Uuid),
}

impl RecordId {
    /// Fresh client-side id.
    #[must_use]
    pub fn draft() -> Self {
        Self::Draft(Uuid::new_v4())
    }

    #[must_use]
    pub fn is_draft(&self) -> bool {
        matches!(self, Self::Draft(_))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persisted(id) => f.write_str(id),
            Self::Draft(id) => write!(f, "draft-{id}"),
        }
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::Persisted)
    }
}

/// Accept a JSON string, number or null as text.
///
/// National ids and year labels arrive either way depending on how the
/// record was created.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => s,
        Some(Raw::Unsigned(n)) => n.to_string(),
        Some(Raw::Signed(n)) => n.to_string(),
        None => String::new(),
    })
}

// =============================================================================
// STUDENTS AND ENROLLMENTS
// =============================================================================

/// A student record (`alumno`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub dni: String,
    #[serde(rename = "materias", default)]
    pub enrollments: Vec<Enrollment>,
}

impl Student {
    /// Find an enrollment by course id.
    pub fn enrollment(&self, course_id: &str) -> Option<&Enrollment> {
        self.enrollments.iter().find(|e| e.course_id == course_id)
    }
}

/// Reference to a teacher embedded in other records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherRef {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
}

/// A subject-instance the student is enrolled in, with its grades and
/// attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Course offering id; the key the editor uses.
    #[serde(rename = "idCurso", default)]
    pub course_id: String,
    #[serde(rename = "nombreCurso", default, skip_serializing_if = "String::is_empty")]
    pub course_name: String,
    #[serde(rename = "nombreMateria", default, skip_serializing_if = "String::is_empty")]
    pub subject_name: String,
    #[serde(
        rename = "nivel",
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "String::is_empty"
    )]
    pub level: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub division: String,
    #[serde(
        rename = "anio",
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "String::is_empty"
    )]
    pub year: String,
    #[serde(rename = "profesor", default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<TeacherRef>,
    #[serde(rename = "notas", default)]
    pub grades: Vec<Grade>,
    #[serde(rename = "asistencias", default)]
    pub attendance: Vec<Attendance>,
}

impl Enrollment {
    /// Human label, e.g. `Matemática (3A)`.
    #[must_use]
    pub fn label(&self) -> String {
        let name = if self.course_name.is_empty() {
            &self.subject_name
        } else {
            &self.course_name
        };
        let name = if name.is_empty() { &self.course_id } else { name };
        if self.level.is_empty() && self.division.is_empty() {
            name.clone()
        } else {
            format!("{} ({}{})", name, self.level, self.division)
        }
    }
}

/// A grade record (`nota`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    /// Free-text type label ("Parcial", "TP 1", ...). Mandatory at save.
    #[serde(rename = "tipo", default)]
    pub kind: String,
    /// `None` while the input box is blank.
    #[serde(rename = "nota", default)]
    pub value: Option<i64>,
}

/// Attendance status values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[default]
    #[serde(rename = "Presente")]
    Present,
    #[serde(rename = "Ausente")]
    Absent,
    #[serde(rename = "Feriado")]
    Holiday,
    #[serde(rename = "Paro")]
    Strike,
}

impl AttendanceStatus {
    pub const ALL: [Self; 4] = [Self::Present, Self::Absent, Self::Holiday, Self::Strike];

    /// Wire label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Present => "Presente",
            Self::Absent => "Ausente",
            Self::Holiday => "Feriado",
            Self::Strike => "Paro",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "presente" | "present" => Ok(Self::Present),
            "ausente" | "absent" => Ok(Self::Absent),
            "feriado" | "holiday" => Ok(Self::Holiday),
            "paro" | "strike" => Ok(Self::Strike),
            other => Err(format!("unknown attendance status {other:?}")),
        }
    }
}

/// An attendance record (`asistencia`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(rename = "fecha")]
    pub at: DateTime<Utc>,
    #[serde(rename = "presente", default)]
    pub status: AttendanceStatus,
}

// =============================================================================
// USERS AND TEACHERS
// =============================================================================

/// Account roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "padre")]
    Parent,
    #[serde(rename = "profesor")]
    Teacher,
    #[serde(rename = "admin", alias = "ADMIN")]
    Administrator,
}

impl Role {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Parent => "padre",
            Self::Teacher => "profesor",
            Self::Administrator => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "padre" | "parent" => Ok(Self::Parent),
            "profesor" | "teacher" => Ok(Self::Teacher),
            "admin" | "administrator" => Ok(Self::Administrator),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

/// A user account (`usuario`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "rol")]
    pub role: Role,
    /// National ids of the children of a parent account.
    #[serde(rename = "hijos", default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    /// Teacher record linked to a teacher account.
    #[serde(rename = "profesorId", default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
}

/// A teacher record (`profesor`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "materiasDictadas", default)]
    pub taught: Vec<TaughtCourse>,
}

impl Teacher {
    /// Assemble the record of one of this teacher's students, by DNI or id.
    ///
    /// Each taught course the student appears in becomes one enrollment.
    #[must_use]
    pub fn student(&self, key: &str) -> Option<Student> {
        let mut found: Option<Student> = None;
        for course in &self.taught {
            let Some(row) = course.students.iter().find(|s| s.dni == key || s.id == key) else {
                continue;
            };
            let student = found.get_or_insert_with(|| Student {
                id: row.id.clone(),
                name: row.name.clone(),
                dni: row.dni.clone(),
                enrollments: Vec::new(),
            });
            student.enrollments.push(course.enrollment_of(row));
        }
        found
    }
}

/// A course offering as seen from its teacher, with enrolled students.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaughtCourse {
    #[serde(rename = "_id", alias = "id", alias = "idCurso")]
    pub id: String,
    #[serde(rename = "nombreMateria", default)]
    pub subject_name: String,
    #[serde(rename = "nivel", default, deserialize_with = "string_or_number")]
    pub level: String,
    #[serde(default)]
    pub division: String,
    #[serde(rename = "anio", default, deserialize_with = "string_or_number")]
    pub year: String,
    #[serde(rename = "alumnos", default)]
    pub students: Vec<TaughtStudent>,
}

impl TaughtCourse {
    /// The editable enrollment of `student` in this course.
    #[must_use]
    pub fn enrollment_of(&self, student: &TaughtStudent) -> Enrollment {
        Enrollment {
            id: None,
            course_id: self.id.clone(),
            course_name: String::new(),
            subject_name: self.subject_name.clone(),
            level: self.level.clone(),
            division: self.division.clone(),
            year: self.year.clone(),
            teacher: None,
            grades: student.grades.clone(),
            attendance: student.attendance.clone(),
        }
    }

    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{} {}{} {}",
            self.subject_name, self.level, self.division, self.year
        )
        .trim()
        .to_string()
    }
}

/// A student as listed inside a taught course: grades and attendance
/// for that course only, flat on the student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaughtStudent {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub dni: String,
    #[serde(rename = "notas", default)]
    pub grades: Vec<Grade>,
    #[serde(rename = "asistencias", default)]
    pub attendance: Vec<Attendance>,
}

// =============================================================================
// REFERENCE RECORDS
// =============================================================================

/// A course offering (`curso`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "nombreMateria", default)]
    pub subject_name: String,
    #[serde(rename = "nombreCurso", default)]
    pub course_name: String,
    #[serde(rename = "nivel", default, deserialize_with = "string_or_number")]
    pub level: String,
    #[serde(default)]
    pub division: String,
    #[serde(rename = "anio", default, deserialize_with = "string_or_number")]
    pub year: String,
    #[serde(rename = "profesor", default)]
    pub teacher: Option<TeacherRef>,
    #[serde(rename = "alumnos", default)]
    pub students: Vec<Student>,
}

impl Course {
    /// Label used by the course panel, e.g. `Historia - 2 B (2024)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{} - {} {} ({})",
            self.subject_name, self.level, self.division, self.year
        )
    }
}

/// A subject (`materia`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
    #[serde(rename = "descripcion", default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// A child entry of the parent dashboard (`GET /api/padre`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Child {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(rename = "nombre", default)]
    pub name: String,
}

// =============================================================================
// PAGINATION
// =============================================================================

/// Pagination block of list responses.
///
/// Previous/next markers are `null` at the boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(rename = "prevPage", default)]
    pub prev_page: Option<u32>,
    #[serde(rename = "nextPage", default)]
    pub next_page: Option<u32>,
    #[serde(rename = "totalPages", default)]
    pub total_pages: u32,
}

impl Pagination {
    /// Whether a page number lies inside the known range.
    ///
    /// An unknown total (0) accepts any page from 1 up.
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        page >= 1 && (self.total_pages == 0 || page <= self.total_pages)
    }

    /// Whether there is more than one page to move between.
    #[must_use]
    pub fn is_navigable(&self) -> bool {
        self.prev_page.is_some() || self.next_page.is_some()
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

// =============================================================================
// UPDATE PAYLOADS
// =============================================================================

/// Body of `PUT /api/alumnos/:id`: the full student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentUpdate {
    #[serde(rename = "nombre")]
    pub name: String,
    pub dni: String,
    #[serde(rename = "materias")]
    pub enrollments: Vec<Enrollment>,
}

/// Body of `PUT /api/profesores/alumno/dni/:dni`: teacher-scoped grades
/// and attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradesUpdate {
    #[serde(rename = "materias")]
    pub enrollments: Vec<Enrollment>,
}

// =============================================================================
// TESTS
// =============================================================================
