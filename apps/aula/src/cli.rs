//! # CLI Module
//!
//! One `cmd_*` function per command. Each takes the opened [`App`] and a
//! writer for its output, so tests can drive them without a terminal.
//!
//! The session file is rewritten after every command, including failed
//! ones: an expired token must not survive the invocation that found out.

use crate::config::{
    AttendanceCmd, BrowseCmd, Cli, Command, GradesCmd, RecordArgs, StudentsCmd, UsersCmd,
};
use crate::error::AppError;
use crate::store::{load_session, save_session};
use aula_core::session::EXPIRED_MESSAGE;
use aula_core::{
    Attendance, AttendanceStatus, Course, DeletionTarget, Enrollment, EnrollmentRow, NewStudent,
    NewUser, Removed, Role, SearchOutcome, Student, StudentRecordEditor, Subject, Teacher, User,
};
use aula_sdk::{Resource, SchoolClient, SharedSession};
use chrono::Utc;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// =============================================================================
// APP CONTEXT
// =============================================================================

/// The client plus where its session is persisted.
#[derive(Debug)]
pub struct App {
    client: SchoolClient,
    session_file: PathBuf,
}

impl App {
    /// Restore the saved session and build a client for `api_url`.
    pub fn open(api_url: &str, session_file: impl Into<PathBuf>) -> Result<Self, AppError> {
        let session_file = session_file.into();
        let context = load_session(&session_file)?;
        debug!(path = %session_file.display(), authenticated = context.is_authenticated(), "session loaded");
        Ok(Self {
            client: SchoolClient::new(api_url, SharedSession::new(context)),
            session_file,
        })
    }

    pub fn client(&self) -> &SchoolClient {
        &self.client
    }

    pub fn session_file(&self) -> &Path {
        &self.session_file
    }

    /// Write the current session state back to disk.
    pub fn persist(&self) -> Result<(), AppError> {
        save_session(&self.client.session().snapshot(), &self.session_file)
    }

    fn role(&self) -> Result<Role, AppError> {
        self.client
            .session()
            .with(|s| s.user().map(|u| u.role))
            .ok_or_else(|| aula_core::SessionError::NotLoggedIn.into())
    }

    /// Route guard for the administrator panels.
    fn require(&self, role: Role) -> Result<(), AppError> {
        self.client
            .session()
            .with(|s| s.require_role(role).map(|_| ()))?;
        Ok(())
    }
}

/// Parse-once entry point used by `main`.
pub async fn run(cli: Cli, out: &mut impl Write) -> Result<(), AppError> {
    let app = App::open(&cli.api_url, &cli.session_file)?;
    let result = dispatch(&app, cli.command, out).await;
    app.persist()?;
    result
}

/// Run one command against an opened app.
pub async fn dispatch(app: &App, command: Command, out: &mut impl Write) -> Result<(), AppError> {
    match command {
        Command::Login { email, password } => cmd_login(app, &email, &password, out).await,
        Command::Logout => cmd_logout(app, out),
        Command::Whoami => cmd_whoami(app, out),
        Command::Students { action } => match action {
            StudentsCmd::List(p) => cmd_list::<Student>(app, p.page, out).await,
            StudentsCmd::Search { query } => cmd_search::<Student>(app, &query, out).await,
            StudentsCmd::Show { student } => cmd_student_show(app, &student, out).await,
            StudentsCmd::Create {
                name,
                dni,
                enrollments,
            } => cmd_student_create(app, &name, &dni, &enrollments, out).await,
            StudentsCmd::Delete { id, yes } => cmd_student_delete(app, &id, yes, out).await,
            StudentsCmd::Rename { id, name, dni } => {
                cmd_student_rename(app, &id, name.as_deref(), dni.as_deref(), out).await
            }
        },
        Command::Users { action } => match action {
            UsersCmd::List(p) => cmd_list::<User>(app, p.page, out).await,
            UsersCmd::Search { query } => cmd_search::<User>(app, &query, out).await,
            UsersCmd::Register {
                name,
                email,
                password,
                role,
                children,
                teacher_id,
            } => {
                let user = NewUser::build(
                    &name,
                    &email,
                    &password,
                    role,
                    &children,
                    teacher_id.as_deref(),
                )?;
                cmd_user_register(app, &user, out).await
            }
        },
        Command::Courses { action } => browse::<Course>(app, action, out).await,
        Command::Subjects { action } => browse::<Subject>(app, action, out).await,
        Command::Teachers { action } => browse::<Teacher>(app, action, out).await,
        Command::Grades { action } => match action {
            GradesCmd::Add {
                record,
                kind,
                value,
            } => cmd_grade_add(app, &record, &kind, value.as_deref(), out).await,
            GradesCmd::Set {
                record,
                position,
                kind,
                value,
            } => {
                cmd_grade_set(
                    app,
                    &record,
                    position,
                    kind.as_deref(),
                    value.as_deref(),
                    out,
                )
                .await
            }
            GradesCmd::Delete {
                record,
                position,
                yes,
            } => cmd_grade_delete(app, &record, position, yes, out).await,
        },
        Command::Attendance { action } => match action {
            AttendanceCmd::Add { record, status } => {
                cmd_attendance_add(app, &record, status, out).await
            }
            AttendanceCmd::Set {
                record,
                position,
                status,
                at,
            } => cmd_attendance_set(app, &record, position, status, at, out).await,
            AttendanceCmd::Delete {
                record,
                position,
                yes,
            } => cmd_attendance_delete(app, &record, position, yes, out).await,
        },
        Command::Dashboard => cmd_dashboard(app, out).await,
    }
}

async fn browse<R: Resource + Listing>(
    app: &App,
    action: BrowseCmd,
    out: &mut impl Write,
) -> Result<(), AppError> {
    match action {
        BrowseCmd::List(p) => cmd_list::<R>(app, p.page, out).await,
        BrowseCmd::Search { query } => cmd_search::<R>(app, &query, out).await,
    }
}

// =============================================================================
// SESSION COMMANDS
// =============================================================================

/// Log in. A pending expiry message is shown first, once.
pub async fn cmd_login(
    app: &App,
    email: &str,
    password: &str,
    out: &mut impl Write,
) -> Result<(), AppError> {
    if let Some(message) = app.client.session().with(|s| s.take_expired_notice()) {
        writeln!(out, "{}", message)?;
    }
    let user = app.client.login(email, password).await?;
    info!(user = %user.id, role = %user.role, "logged in");
    writeln!(out, "Logged in as {} ({})", user.name, user.role.label())?;
    Ok(())
}

pub fn cmd_logout(app: &App, out: &mut impl Write) -> Result<(), AppError> {
    app.client.logout()?;
    writeln!(out, "Logged out.")?;
    Ok(())
}

pub fn cmd_whoami(app: &App, out: &mut impl Write) -> Result<(), AppError> {
    let (user, expired) = app
        .client
        .session()
        .with(|s| (s.user().cloned(), s.is_expired()));
    match user {
        Some(user) => writeln!(
            out,
            "{} <{}> ({})",
            user.name,
            user.email,
            user.role.label()
        )?,
        None if expired => writeln!(out, "{}", EXPIRED_MESSAGE)?,
        None => writeln!(out, "Not logged in.")?,
    }
    Ok(())
}

// =============================================================================
// LIST PANELS
// =============================================================================

/// One-line rendering of a record in a list panel.
pub trait Listing {
    fn line(&self) -> String;
}

impl Listing for Student {
    fn line(&self) -> String {
        format!(
            "{}  {}  DNI {}  ({} subjects)",
            self.id,
            self.name,
            self.dni,
            self.enrollments.len()
        )
    }
}

impl Listing for User {
    fn line(&self) -> String {
        format!("{}  {}  <{}>  {}", self.id, self.name, self.email, self.role.label())
    }
}

impl Listing for Course {
    fn line(&self) -> String {
        let teacher = self.teacher.as_ref().map_or("-", |t| t.name.as_str());
        format!(
            "{}  {}  teacher {}  ({} students)",
            self.id,
            self.label(),
            teacher,
            self.students.len()
        )
    }
}

impl Listing for Subject {
    fn line(&self) -> String {
        if self.description.is_empty() {
            format!("{}  {}", self.id, self.name)
        } else {
            format!("{}  {}  - {}", self.id, self.name, self.description)
        }
    }
}

impl Listing for Teacher {
    fn line(&self) -> String {
        format!(
            "{}  {}  <{}>  ({} courses)",
            self.id,
            self.name,
            self.email,
            self.taught.len()
        )
    }
}

/// Print one server page of `R`.
pub async fn cmd_list<R: Resource + Listing>(
    app: &App,
    page: u32,
    out: &mut impl Write,
) -> Result<(), AppError> {
    app.require(Role::Administrator)?;
    if page == 0 {
        return Err(AppError::Usage("pages start at 1".into()));
    }
    let listed = app.client.list::<R>(page, R::PAGE_SIZE as u32).await?;
    if !listed.pagination.contains(page) {
        return Err(AppError::Usage(format!(
            "page {} is out of range (1-{})",
            page, listed.pagination.total_pages
        )));
    }
    if listed.items.is_empty() {
        writeln!(out, "No records.")?;
    }
    for item in &listed.items {
        writeln!(out, "{}", item.line())?;
    }
    if listed.pagination.is_navigable() {
        writeln!(out, "-- page {} of {}", page, listed.pagination.total_pages)?;
    }
    Ok(())
}

/// Cascading search over `R`: remote lookups, then the full local list.
pub async fn cmd_search<R: Resource + Listing>(
    app: &App,
    query: &str,
    out: &mut impl Write,
) -> Result<(), AppError> {
    app.require(Role::Administrator)?;
    match app.client.search::<R>(query).await? {
        SearchOutcome::Page => return cmd_list::<R>(app, 1, out).await,
        SearchOutcome::Remote { step, items } => {
            debug!(step = step.name(), "remote hit");
            for item in &items {
                writeln!(out, "{}", item.line())?;
            }
        }
        SearchOutcome::Local { items } if items.is_empty() => {
            writeln!(out, "No matches for {:?}.", query.trim())?;
        }
        SearchOutcome::Local { items } => {
            for item in &items {
                writeln!(out, "{}", item.line())?;
            }
        }
    }
    Ok(())
}

// =============================================================================
// STUDENT RECORDS
// =============================================================================

/// Fetch a student the way the logged-in role sees it.
///
/// Teachers find students inside their own courses, by DNI or id; the
/// other roles fetch the record by id.
async fn load_student(app: &App, key: &str) -> Result<(Student, Role), AppError> {
    let role = app.role()?;
    let student = match role {
        Role::Teacher => app
            .client
            .my_teacher_profile()
            .await?
            .student(key)
            .ok_or_else(|| AppError::StudentNotFound(key.to_string()))?,
        Role::Administrator | Role::Parent => app.client.get_student(key).await?,
    };
    Ok((student, role))
}

fn write_enrollment(out: &mut impl Write, enrollment: &Enrollment) -> Result<(), AppError> {
    writeln!(out, "{} [{}]", enrollment.label(), enrollment.course_id)?;
    if let Some(teacher) = &enrollment.teacher {
        writeln!(out, "  teacher: {}", teacher.name)?;
    }
    if enrollment.grades.is_empty() {
        writeln!(out, "  no grades")?;
    }
    for (i, grade) in enrollment.grades.iter().enumerate() {
        let value = grade.value.map_or_else(|| "-".to_string(), |v| v.to_string());
        writeln!(out, "  grade #{} {}: {}", i + 1, grade.kind, value)?;
    }
    for (i, record) in enrollment.attendance.iter().enumerate() {
        writeln!(
            out,
            "  attendance #{} {}: {}",
            i + 1,
            record.at.format("%Y-%m-%d %H:%M"),
            record.status
        )?;
    }
    Ok(())
}

fn attendance_summary(records: &[Attendance]) -> String {
    let present = records
        .iter()
        .filter(|r| r.status == AttendanceStatus::Present)
        .count();
    format!("present {}/{}", present, records.len())
}

pub async fn cmd_student_show(app: &App, key: &str, out: &mut impl Write) -> Result<(), AppError> {
    let (student, _) = load_student(app, key).await?;
    writeln!(out, "{} - DNI {} [{}]", student.name, student.dni, student.id)?;
    for enrollment in &student.enrollments {
        write_enrollment(out, enrollment)?;
    }
    Ok(())
}

/// Create a student; each `COURSE:TEACHER` pair becomes an enrollment.
pub async fn cmd_student_create(
    app: &App,
    name: &str,
    dni: &str,
    enrollments: &[String],
    out: &mut impl Write,
) -> Result<(), AppError> {
    app.require(Role::Administrator)?;
    let rows: Vec<EnrollmentRow> = enrollments
        .iter()
        .map(|pair| match pair.split_once(':') {
            Some((course, teacher)) => EnrollmentRow::new(course, teacher),
            None => EnrollmentRow::new(pair.as_str(), ""),
        })
        .collect();
    let teachers = app.client.list_all::<Teacher>().await?;
    let student = NewStudent::build(name, dni, &rows, &teachers)?;
    app.client.create_student(&student).await?;
    info!(dni = %student.dni, "student created");
    writeln!(
        out,
        "Student {} created with {} subject(s).",
        student.name,
        student.enrollments.len()
    )?;
    Ok(())
}

/// Two-phase delete: without `yes` only the prompt is printed.
pub async fn cmd_student_delete(
    app: &App,
    id: &str,
    yes: bool,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let (student, role) = load_student(app, id).await?;
    let mut editor = StudentRecordEditor::new(student, role);
    let prompt = editor.request_deletion(DeletionTarget::Student)?.prompt();
    if !yes {
        editor.cancel_deletion();
        writeln!(out, "{} Re-run with --yes to confirm.", prompt)?;
        return Ok(());
    }
    if let Removed::Student { student_id } = editor.confirm_deletion()? {
        app.client.delete_student(&student_id).await?;
        info!(student = %student_id, "student deleted");
        writeln!(out, "Student deleted.")?;
    }
    Ok(())
}

pub async fn cmd_student_rename(
    app: &App,
    id: &str,
    name: Option<&str>,
    dni: Option<&str>,
    out: &mut impl Write,
) -> Result<(), AppError> {
    if name.is_none() && dni.is_none() {
        return Err(AppError::Usage("give --name, --dni or both".into()));
    }
    let (student, role) = load_student(app, id).await?;
    let mut editor = StudentRecordEditor::new(student, role);
    editor.begin_personal_edit()?;
    if let Some(name) = name {
        editor.set_personal_name(name)?;
    }
    if let Some(dni) = dni {
        editor.set_personal_dni(dni)?;
    }
    let outcome = editor.save_personal()?;
    app.client.submit(&outcome.request).await?;
    writeln!(out, "{}", outcome.notice)?;
    Ok(())
}

// =============================================================================
// USERS
// =============================================================================

pub async fn cmd_user_register(
    app: &App,
    user: &NewUser,
    out: &mut impl Write,
) -> Result<(), AppError> {
    app.require(Role::Administrator)?;
    if let Some(teacher_id) = &user.teacher_id {
        let free = app.client.available_teachers().await?;
        if !free.iter().any(|t| &t.id == teacher_id) {
            return Err(AppError::Usage(format!(
                "teacher record {} is unknown or already linked to an account",
                teacher_id
            )));
        }
    }
    app.client.register_user(user).await?;
    info!(email = %user.email, role = %user.role, "user registered");
    writeln!(out, "User {} registered as {}.", user.email, user.role.label())?;
    Ok(())
}

// =============================================================================
// GRADES AND ATTENDANCE
// =============================================================================

/// Load the student and open the course for editing.
async fn open_subject(app: &App, record: &RecordArgs) -> Result<StudentRecordEditor, AppError> {
    let (student, role) = load_student(app, &record.student).await?;
    let mut editor = StudentRecordEditor::new(student, role);
    editor.begin_subject_edit(&record.course)?;
    Ok(editor)
}

/// Validate, send, then reload the record and print the saved subject.
async fn save_subject(
    app: &App,
    record: &RecordArgs,
    mut editor: StudentRecordEditor,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let outcome = editor.save_subject()?;
    app.client.submit(&outcome.request).await?;
    writeln!(out, "{}", outcome.notice)?;

    let (fresh, _) = load_student(app, &record.student).await?;
    editor.resync(fresh);
    if let Some(enrollment) = editor
        .enrollments()
        .iter()
        .find(|e| e.course_id == record.course)
    {
        write_enrollment(out, enrollment)?;
    }
    Ok(())
}

/// Positions on the command line count from 1.
fn position_index(position: usize) -> Result<usize, AppError> {
    position
        .checked_sub(1)
        .ok_or_else(|| AppError::Usage("positions start at 1".into()))
}

pub async fn cmd_grade_add(
    app: &App,
    record: &RecordArgs,
    kind: &str,
    value: Option<&str>,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let mut editor = open_subject(app, record).await?;
    let index = editor.add_grade()?;
    editor.set_grade_kind(index, kind)?;
    if let Some(text) = value {
        if let Some(warning) = editor.set_grade_value(index, text)? {
            writeln!(out, "{}", warning)?;
        }
    }
    save_subject(app, record, editor, out).await
}

pub async fn cmd_grade_set(
    app: &App,
    record: &RecordArgs,
    position: usize,
    kind: Option<&str>,
    value: Option<&str>,
    out: &mut impl Write,
) -> Result<(), AppError> {
    if kind.is_none() && value.is_none() {
        return Err(AppError::Usage("give --kind, --value or both".into()));
    }
    let index = position_index(position)?;
    let mut editor = open_subject(app, record).await?;
    if let Some(kind) = kind {
        editor.set_grade_kind(index, kind)?;
    }
    if let Some(text) = value {
        if let Some(warning) = editor.set_grade_value(index, text)? {
            writeln!(out, "{}", warning)?;
        }
    }
    save_subject(app, record, editor, out).await
}

pub async fn cmd_grade_delete(
    app: &App,
    record: &RecordArgs,
    position: usize,
    yes: bool,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let index = position_index(position)?;
    let editor = open_subject(app, record).await?;
    delete_in_subject(app, record, editor, DeletionTarget::Grade(index), yes, out).await
}

pub async fn cmd_attendance_add(
    app: &App,
    record: &RecordArgs,
    status: Option<AttendanceStatus>,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let mut editor = open_subject(app, record).await?;
    let index = editor.add_attendance(Utc::now())?;
    if let Some(status) = status {
        editor.set_attendance_status(index, status)?;
    }
    save_subject(app, record, editor, out).await
}

pub async fn cmd_attendance_set(
    app: &App,
    record: &RecordArgs,
    position: usize,
    status: Option<AttendanceStatus>,
    at: Option<chrono::DateTime<Utc>>,
    out: &mut impl Write,
) -> Result<(), AppError> {
    if status.is_none() && at.is_none() {
        return Err(AppError::Usage("give --status, --at or both".into()));
    }
    let index = position_index(position)?;
    let mut editor = open_subject(app, record).await?;
    if let Some(at) = at {
        editor.set_attendance_time(index, at, Utc::now())?;
    }
    if let Some(status) = status {
        editor.set_attendance_status(index, status)?;
    }
    save_subject(app, record, editor, out).await
}

pub async fn cmd_attendance_delete(
    app: &App,
    record: &RecordArgs,
    position: usize,
    yes: bool,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let index = position_index(position)?;
    let editor = open_subject(app, record).await?;
    delete_in_subject(
        app,
        record,
        editor,
        DeletionTarget::Attendance(index),
        yes,
        out,
    )
    .await
}

async fn delete_in_subject(
    app: &App,
    record: &RecordArgs,
    mut editor: StudentRecordEditor,
    target: DeletionTarget,
    yes: bool,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let prompt = editor.request_deletion(target)?.prompt();
    if !yes {
        editor.cancel_deletion();
        writeln!(out, "{} Re-run with --yes to confirm.", prompt)?;
        return Ok(());
    }
    editor.confirm_deletion()?;
    save_subject(app, record, editor, out).await
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// Role-specific overview.
pub async fn cmd_dashboard(app: &App, out: &mut impl Write) -> Result<(), AppError> {
    match app.role()? {
        Role::Administrator => {
            writeln!(out, "students: {}", app.client.list_all::<Student>().await?.len())?;
            writeln!(out, "users:    {}", app.client.list_all::<User>().await?.len())?;
            writeln!(out, "courses:  {}", app.client.list_all::<Course>().await?.len())?;
            writeln!(out, "subjects: {}", app.client.list_all::<Subject>().await?.len())?;
            writeln!(out, "teachers: {}", app.client.list_all::<Teacher>().await?.len())?;
        }
        Role::Teacher => {
            let profile = app.client.my_teacher_profile().await?;
            if profile.taught.is_empty() {
                writeln!(out, "No courses assigned.")?;
            }
            for course in &profile.taught {
                writeln!(out, "{} [{}]", course.label(), course.id)?;
                for student in &course.students {
                    let grades: Vec<String> = student
                        .grades
                        .iter()
                        .filter_map(|g| g.value.map(|v| v.to_string()))
                        .collect();
                    writeln!(
                        out,
                        "  {} (DNI {}) grades [{}], {}",
                        student.name,
                        student.dni,
                        grades.join(", "),
                        attendance_summary(&student.attendance)
                    )?;
                }
            }
        }
        Role::Parent => {
            let children = app.client.my_children().await?;
            if children.is_empty() {
                writeln!(out, "No children linked to this account.")?;
            }
            for child in &children {
                let student = app.client.get_student(&child.id).await?;
                writeln!(out, "== {} (DNI {})", student.name, student.dni)?;
                for enrollment in &student.enrollments {
                    write_enrollment(out, enrollment)?;
                    writeln!(out, "  {}", attendance_summary(&enrollment.attendance))?;
                }
            }
        }
    }
    Ok(())
}
