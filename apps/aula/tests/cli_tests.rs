//! Integration tests for Aula CLI commands.
//!
//! Uses tempfile for the session file and wiremock for the school API.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use aula::cli::{
    cmd_attendance_add, cmd_dashboard, cmd_grade_add, cmd_grade_delete, cmd_list, cmd_login,
    cmd_search, cmd_student_delete, cmd_student_rename, cmd_whoami, run, App,
};
use aula::config::{Cli, RecordArgs};
use aula::error::AppError;
use aula::store::{load_session, save_session};
use aula_core::session::EXPIRED_MESSAGE;
use aula_core::{EditError, Role, SessionContext, SessionError, SessionState, Student, User};
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Create a temporary directory for tests.
fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Write a logged-in session for `role` and return its path.
fn seed_session(dir: &TempDir, role: Role) -> PathBuf {
    let path = dir.path().join("session.json");
    let mut context = SessionContext::new();
    context.login(
        "tok-1",
        User {
            id: "u1".into(),
            name: "Marta".into(),
            email: "marta@example.org".into(),
            role,
            children: Vec::new(),
            teacher_id: (role == Role::Teacher).then(|| "t1".to_string()),
        },
    );
    save_session(&context.snapshot(), &path).unwrap();
    path
}

fn student_json() -> serde_json::Value {
    json!({
        "_id": "s1",
        "nombre": "Ana Gómez",
        "dni": "45123456",
        "materias": [{
            "idCurso": "c1",
            "nombreMateria": "Matemática",
            "nivel": "3",
            "division": "A",
            "notas": [{"_id": "n1", "tipo": "Parcial", "nota": 8}],
            "asistencias": [{"_id": "a1", "fecha": "2024-05-06T12:00:00Z", "presente": "Presente"}]
        }]
    })
}

fn record() -> RecordArgs {
    RecordArgs {
        student: "s1".into(),
        course: "c1".into(),
    }
}

fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).unwrap()
}

async fn mount_student(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/alumnos/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(student_json()))
        .mount(server)
        .await;
}

// =============================================================================
// SESSION COMMANDS
// =============================================================================

#[tokio::test]
async fn test_whoami_anonymous() {
    let temp = create_temp_dir();
    let app = App::open("http://localhost:3000", temp.path().join("none.json")).unwrap();
    let mut out = Vec::new();
    cmd_whoami(&app, &mut out).unwrap();
    assert_eq!(output(out), "Not logged in.\n");
}

#[tokio::test]
async fn test_expired_session_notice_shown_once_at_login() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let session_file = seed_session(&temp, Role::Administrator);

    Mock::given(method("GET"))
        .and(path("/api/alumnos"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-2",
            "usuario": {"_id": "u1", "nombre": "Marta", "email": "marta@example.org", "rol": "admin"}
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let file = session_file.to_str().unwrap();
    let cli = Cli::try_parse_from([
        "aula", "--api-url", &uri, "--session-file", file, "students", "list",
    ])
    .unwrap();
    let mut out = Vec::new();
    let err = run(cli, &mut out).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Api(aula_sdk::Error::SessionExpired { status: 401 })
    ));
    assert_eq!(err.notice().to_string(), "[warning] session expired, please log in again");

    // The expiry was persisted.
    assert_eq!(
        load_session(&session_file).unwrap().snapshot(),
        SessionState::Anonymous { expired: true }
    );

    let app = App::open(&uri, &session_file).unwrap();
    let mut out = Vec::new();
    cmd_whoami(&app, &mut out).unwrap();
    assert!(output(out).contains(EXPIRED_MESSAGE));

    let mut out = Vec::new();
    cmd_login(&app, "marta@example.org", "pw", &mut out).await.unwrap();
    let text = output(out);
    assert!(text.starts_with(EXPIRED_MESSAGE));
    assert!(text.contains("Logged in as Marta (admin)"));

    let mut out = Vec::new();
    cmd_login(&app, "marta@example.org", "pw", &mut out).await.unwrap();
    assert!(!output(out).contains(EXPIRED_MESSAGE));
}

// =============================================================================
// LIST PANELS
// =============================================================================

#[tokio::test]
async fn test_students_list_prints_page() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let app = App::open(&server.uri(), seed_session(&temp, Role::Administrator)).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/alumnos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alumnos": [student_json()],
            "pagination": {"prevPage": null, "nextPage": 2, "totalPages": 3}
        })))
        .mount(&server)
        .await;

    let mut out = Vec::new();
    cmd_list::<Student>(&app, 1, &mut out).await.unwrap();
    let text = output(out);
    assert!(text.contains("s1  Ana Gómez  DNI 45123456  (1 subjects)"));
    assert!(text.contains("-- page 1 of 3"));

    let err = cmd_list::<Student>(&app, 4, &mut Vec::new()).await.unwrap_err();
    assert!(matches!(err, AppError::Usage(_)));
}

#[tokio::test]
async fn test_admin_panels_reject_other_roles() {
    let temp = create_temp_dir();
    let app = App::open("http://localhost:3000", seed_session(&temp, Role::Parent)).unwrap();
    let err = cmd_list::<User>(&app, 1, &mut Vec::new()).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Session(SessionError::WrongRole {
            required: Role::Administrator,
            actual: Role::Parent
        })
    ));
}

#[tokio::test]
async fn test_search_by_dni_hits_remote() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let app = App::open(&server.uri(), seed_session(&temp, Role::Administrator)).unwrap();

    // A broken list endpoint must not stand in the way of a DNI hit.
    Mock::given(method("GET"))
        .and(path("/api/alumnos"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/alumnos/dni/45123456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(student_json()))
        .expect(1)
        .mount(&server)
        .await;

    let mut out = Vec::new();
    cmd_search::<Student>(&app, "45123456", &mut out).await.unwrap();
    assert!(output(out).contains("Ana Gómez"));
}

#[tokio::test]
async fn test_search_text_filters_local_list() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let app = App::open(&server.uri(), seed_session(&temp, Role::Administrator)).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/alumnos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "alumnos": [student_json(), {"_id": "s2", "nombre": "Juan Ruiz", "dni": "39000111"}]
        })))
        .mount(&server)
        .await;

    let mut out = Vec::new();
    cmd_search::<Student>(&app, "juan", &mut out).await.unwrap();
    let text = output(out);
    assert!(text.contains("Juan Ruiz"));
    assert!(!text.contains("Ana"));

    let mut out = Vec::new();
    cmd_search::<Student>(&app, "zzz", &mut out).await.unwrap();
    assert_eq!(output(out), "No matches for \"zzz\".\n");
}

// =============================================================================
// EDITING
// =============================================================================

#[tokio::test]
async fn test_admin_adds_grade() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let app = App::open(&server.uri(), seed_session(&temp, Role::Administrator)).unwrap();
    mount_student(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/alumnos/s1"))
        .and(body_partial_json(json!({
            "nombre": "Ana Gómez",
            "materias": [{"idCurso": "c1", "notas": [
                {"_id": "n1", "tipo": "Parcial", "nota": 8},
                {"tipo": "Final", "nota": 10}
            ]}]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut out = Vec::new();
    cmd_grade_add(&app, &record(), "Final", Some("12"), &mut out)
        .await
        .unwrap();
    let text = output(out);
    assert!(text.contains("[warning] Grade 12 is out of range (1-10), set to 10."));
    assert!(text.contains("[warning] Grades outside the 1-10 range were corrected automatically."));
}

#[tokio::test]
async fn test_non_numeric_grade_is_rejected_before_sending() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let app = App::open(&server.uri(), seed_session(&temp, Role::Administrator)).unwrap();
    mount_student(&server).await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = cmd_grade_add(&app, &record(), "Final", Some("abc"), &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Edit(EditError::NotNumeric(_))));
}

#[tokio::test]
async fn test_grade_delete_needs_confirmation() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let app = App::open(&server.uri(), seed_session(&temp, Role::Administrator)).unwrap();
    mount_student(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/alumnos/s1"))
        .and(body_partial_json(json!({"materias": [{"idCurso": "c1", "notas": []}]})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut out = Vec::new();
    cmd_grade_delete(&app, &record(), 1, false, &mut out)
        .await
        .unwrap();
    assert_eq!(
        output(out),
        "Delete the grade Parcial? Re-run with --yes to confirm.\n"
    );

    let mut out = Vec::new();
    cmd_grade_delete(&app, &record(), 1, true, &mut out)
        .await
        .unwrap();
    assert!(output(out).contains("[ok] Subject changes saved."));
}

/// `/api/profesores/me`: students carry the course's grades flat.
fn teacher_profile_json() -> serde_json::Value {
    json!({
        "_id": "t1",
        "nombre": "Luis",
        "materiasDictadas": [{
            "_id": "c1", "nombreMateria": "Matemática", "nivel": 3, "division": "A", "anio": 2024,
            "alumnos": [{
                "_id": "s1",
                "nombre": "Ana Gómez",
                "dni": "45123456",
                "notas": [{"_id": "n1", "tipo": "Parcial", "nota": 8}],
                "asistencias": [
                    {"_id": "a1", "fecha": "2024-05-06T12:00:00Z", "presente": "Presente"},
                    {"_id": "a2", "fecha": "2024-05-07T12:00:00Z", "presente": "Ausente"}
                ]
            }]
        }]
    })
}

async fn mount_teacher_profile(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/profesores/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(teacher_profile_json()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_teacher_records_attendance_by_dni() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let app = App::open(&server.uri(), seed_session(&temp, Role::Teacher)).unwrap();
    mount_teacher_profile(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/profesores/alumno/dni/45123456"))
        .and(body_partial_json(json!({
            "materias": [{
                "idCurso": "c1",
                "asistencias": [{"_id": "a1"}, {"_id": "a2"}, {"presente": "Ausente"}]
            }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let by_dni = RecordArgs {
        student: "45123456".into(),
        course: "c1".into(),
    };
    let mut out = Vec::new();
    cmd_attendance_add(
        &app,
        &by_dni,
        Some(aula_core::AttendanceStatus::Absent),
        &mut out,
    )
    .await
    .unwrap();
    assert!(output(out).contains("[ok] Subject changes saved."));

    let missing = RecordArgs {
        student: "11111111".into(),
        course: "c1".into(),
    };
    let err = cmd_attendance_add(&app, &missing, None, &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StudentNotFound(_)));
}

#[tokio::test]
async fn test_teacher_adds_grade_keeping_existing_ones() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let app = App::open(&server.uri(), seed_session(&temp, Role::Teacher)).unwrap();
    mount_teacher_profile(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/profesores/alumno/dni/45123456"))
        .and(body_partial_json(json!({
            "materias": [{
                "idCurso": "c1",
                "notas": [{"_id": "n1", "tipo": "Parcial", "nota": 8}, {"tipo": "Final", "nota": 9}]
            }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let by_dni = RecordArgs {
        student: "45123456".into(),
        course: "c1".into(),
    };
    let mut out = Vec::new();
    cmd_grade_add(&app, &by_dni, "Final", Some("9"), &mut out)
        .await
        .unwrap();
    let text = output(out);
    assert!(text.contains("[ok] Subject changes saved."));
    assert!(text.contains("Matemática (3A) [c1]"));
    assert!(text.contains("grade #1 Parcial: 8"));
    assert!(text.contains("attendance #2 2024-05-07 12:00: Ausente"));
}

#[tokio::test]
async fn test_parent_cannot_edit() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let app = App::open(&server.uri(), seed_session(&temp, Role::Parent)).unwrap();
    mount_student(&server).await;

    let err = cmd_grade_add(&app, &record(), "Final", None, &mut Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Edit(EditError::ReadOnly(Role::Parent))));
}

#[tokio::test]
async fn test_rename_and_delete_student() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let app = App::open(&server.uri(), seed_session(&temp, Role::Administrator)).unwrap();
    mount_student(&server).await;
    Mock::given(method("PUT"))
        .and(path("/api/alumnos/s1"))
        .and(body_partial_json(json!({"nombre": "Ana María Gómez", "dni": "45123456"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/alumnos/s1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut out = Vec::new();
    cmd_student_rename(&app, "s1", Some("  Ana María Gómez "), None, &mut out)
        .await
        .unwrap();
    assert_eq!(output(out), "[ok] Personal data updated.\n");

    let mut out = Vec::new();
    cmd_student_delete(&app, "s1", false, &mut out).await.unwrap();
    assert_eq!(
        output(out),
        "Delete the student Ana Gómez? Re-run with --yes to confirm.\n"
    );

    let mut out = Vec::new();
    cmd_student_delete(&app, "s1", true, &mut out).await.unwrap();
    assert_eq!(output(out), "Student deleted.\n");
}

// =============================================================================
// DASHBOARD
// =============================================================================

#[tokio::test]
async fn test_teacher_dashboard_summarizes_courses() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let app = App::open(&server.uri(), seed_session(&temp, Role::Teacher)).unwrap();
    mount_teacher_profile(&server).await;

    let mut out = Vec::new();
    cmd_dashboard(&app, &mut out).await.unwrap();
    assert_eq!(
        output(out),
        "Matemática 3A 2024 [c1]\n  Ana Gómez (DNI 45123456) grades [8], present 1/2\n"
    );
}

#[tokio::test]
async fn test_parent_dashboard_lists_children() {
    let server = MockServer::start().await;
    let temp = create_temp_dir();
    let app = App::open(&server.uri(), seed_session(&temp, Role::Parent)).unwrap();
    mount_student(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/padre"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hijos": [{"id": "s1", "nombre": "Ana Gómez"}]
        })))
        .mount(&server)
        .await;

    let mut out = Vec::new();
    cmd_dashboard(&app, &mut out).await.unwrap();
    let text = output(out);
    assert!(text.contains("== Ana Gómez (DNI 45123456)"));
    assert!(text.contains("Matemática (3A) [c1]"));
    assert!(text.contains("grade #1 Parcial: 8"));
    assert!(text.contains("present 1/1"));
}
