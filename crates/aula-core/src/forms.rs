//! # Forms Module
//!
//! Creation payloads for students and user accounts.
//!
//! The administrator panels collect loosely filled rows; these builders
//! drop incomplete rows and refuse payloads the API would reject.

use crate::error::FormError;
use crate::model::{Role, Teacher, TeacherRef};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};

/// Placeholder name for a teacher id missing from the reference list.
pub const UNKNOWN_TEACHER: &str = "Profesor Desconocido";

fn required(value: &str, field: &'static str) -> Result<String, FormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FormError::Missing(field))
    } else {
        Ok(trimmed.to_string())
    }
}

// =============================================================================
// NEW STUDENT
// =============================================================================

/// One course row of the student creation form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentRow {
    pub course_id: String,
    pub teacher_id: String,
}

impl EnrollmentRow {
    pub fn new(course_id: impl Into<String>, teacher_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            teacher_id: teacher_id.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.course_id.trim().is_empty() && !self.teacher_id.trim().is_empty()
    }
}

/// An enrollment as the create endpoint expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEnrollment {
    #[serde(rename = "idCurso")]
    pub course_id: String,
    #[serde(rename = "profesor")]
    pub teacher: TeacherRef,
}

/// Body of `POST /api/alumnos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    #[serde(rename = "nombre")]
    pub name: String,
    pub dni: String,
    #[serde(rename = "materias")]
    pub enrollments: Vec<NewEnrollment>,
}

impl NewStudent {
    /// Build the payload from form input.
    ///
    /// Rows missing a course or a teacher are skipped; at least one
    /// complete row must remain. Teacher names come from `teachers`.
    pub fn build(
        name: &str,
        dni: &str,
        rows: &[EnrollmentRow],
        teachers: &[Teacher],
    ) -> Result<Self, FormError> {
        let name = required(name, "name")?;
        let dni = required(dni, "dni")?;

        let enrollments: Vec<NewEnrollment> = rows
            .iter()
            .filter(|row| row.is_complete())
            .map(|row| {
                let teacher_id = row.teacher_id.trim();
                let teacher_name = teachers
                    .iter()
                    .find(|t| t.id == teacher_id)
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| UNKNOWN_TEACHER.to_string());
                NewEnrollment {
                    course_id: row.course_id.trim().to_string(),
                    teacher: TeacherRef {
                        id: teacher_id.to_string(),
                        name: teacher_name,
                    },
                }
            })
            .collect();

        if enrollments.is_empty() {
            return Err(FormError::NoEnrollments);
        }

        Ok(Self {
            name,
            dni,
            enrollments,
        })
    }
}

// =============================================================================
// NEW USER
// =============================================================================

/// Body of `POST /api/usuarios/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "hijos")]
    pub children: Vec<String>,
    #[serde(rename = "profesorId")]
    pub teacher_id: Option<String>,
}

impl NewUser {
    /// Build the payload from form input.
    ///
    /// Children are kept only for parents and the teacher id only for
    /// teachers, as the API expects.
    pub fn build(
        name: &str,
        email: &str,
        password: &str,
        role: Role,
        children: &[String],
        teacher_id: Option<&str>,
    ) -> Result<Self, FormError> {
        let name = required(name, "name")?;
        let email = required(email, "email")?;
        if !EmailAddress::is_valid(&email) {
            return Err(FormError::InvalidEmail(email));
        }
        if password.is_empty() {
            return Err(FormError::Missing("password"));
        }

        let children: Vec<String> = match role {
            Role::Parent => children
                .iter()
                .map(|dni| dni.trim())
                .filter(|dni| !dni.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        if role == Role::Parent && children.is_empty() {
            return Err(FormError::NoChildren);
        }

        let teacher_id = match role {
            Role::Teacher => Some(
                teacher_id
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .ok_or(FormError::NoTeacherRecord)?
                    .to_string(),
            ),
            _ => None,
        };

        Ok(Self {
            name,
            email,
            password: password.to_string(),
            role,
            children,
            teacher_id,
        })
    }
}
