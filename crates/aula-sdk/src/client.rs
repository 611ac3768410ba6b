use crate::error::Error;
use crate::resource::Resource;
use crate::search::cascade_search;
use aula_core::{
    AuthVerdict, Child, Course, GradesUpdate, NewStudent, NewUser, Page, Pagination, Role,
    SaveRequest, SearchOutcome, SessionContext, SessionError, SessionState, Student,
    StudentUpdate, Subject, Teacher, User,
};
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// `limit` used to fetch a whole collection in one page.
pub const FULL_LIST_LIMIT: u32 = 9999;

// =============================================================================
// SHARED SESSION
// =============================================================================

/// Session context shared between the client and its caller.
#[derive(Debug, Clone, Default)]
pub struct SharedSession(Arc<Mutex<SessionContext>>);

impl SharedSession {
    pub fn new(context: SessionContext) -> Self {
        Self(Arc::new(Mutex::new(context)))
    }

    /// Run `f` with exclusive access to the context.
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionContext) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// State to persist.
    pub fn snapshot(&self) -> SessionState {
        self.with(|s| s.snapshot())
    }

    /// Start a manual logout that lasts until the guard is dropped.
    ///
    /// Requests still in flight on clones of this session keep their
    /// token; a 401/403 they receive meanwhile is not taken as expiry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotLoggedIn`] when nobody is logged in.
    pub fn begin_logout(&self) -> Result<LogoutGuard, SessionError> {
        self.with(SessionContext::begin_logout)?;
        Ok(LogoutGuard {
            session: self.clone(),
        })
    }
}

/// A manual logout in progress; dropping it completes the logout.
#[derive(Debug)]
#[must_use = "dropping the guard finishes the logout at once"]
pub struct LogoutGuard {
    session: SharedSession,
}

impl Drop for LogoutGuard {
    fn drop(&mut self) {
        self.session.with(SessionContext::finish_logout);
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Body of a successful `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(rename = "usuario")]
    pub user: User,
}

#[derive(Debug, Deserialize)]
struct ChildrenResponse {
    #[serde(rename = "hijos", default)]
    children: Vec<Child>,
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client for the school API.
///
/// Credentials come from the [`SharedSession`]; a rejected token is
/// reported back to it before the call fails.
#[derive(Debug, Clone)]
pub struct SchoolClient {
    base_url: String,
    http: reqwest::Client,
    session: SharedSession,
}

impl SchoolClient {
    /// Create a client for `base_url` (e.g. `http://localhost:3000`).
    pub fn new(base_url: impl Into<String>, session: SharedSession) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            session,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, Error> {
        let token = self
            .session
            .with(|s| s.token().map(str::to_owned))
            .ok_or(Error::NotAuthenticated)?;
        debug!(%method, path, "request");
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    /// Send and route failures: 401/403 go through the session first.
    async fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            match self.session.with(SessionContext::on_unauthorized) {
                AuthVerdict::RedirectToLogin => {
                    warn!(status = status.as_u16(), "credentials rejected, session dropped");
                    return Err(Error::SessionExpired {
                        status: status.as_u16(),
                    });
                }
                AuthVerdict::Ignore => {
                    debug!(status = status.as_u16(), "rejected during logout");
                }
            }
        }
        Err(server_error(response).await)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        read_json(response).await
    }

    async fn fetch_value(&self, path: &str) -> Result<Value, Error> {
        self.fetch(path).await
    }

    async fn write<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(), Error> {
        self.send(self.request(method, path)?.json(body)).await?;
        Ok(())
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    /// Exchange credentials for a token and store both in the session.
    ///
    /// A rejected login is a plain [`Error::Server`]; it never counts as
    /// an expired session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Server`] on bad credentials.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, Error> {
        debug!(email, "login");
        let response = self
            .http
            .post(self.url("login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(server_error(response).await);
        }
        let body: LoginResponse = read_json(response).await?;
        let user = body.user.clone();
        self.session.with(|s| s.login(body.token, body.user));
        Ok(user)
    }

    /// Manual logout. No request is made.
    ///
    /// Use [`SharedSession::begin_logout`] instead when other requests
    /// may still be in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] when nobody is logged in.
    pub fn logout(&self) -> Result<(), Error> {
        drop(self.session.begin_logout()?);
        Ok(())
    }

    // =========================================================================
    // GENERIC RESOURCES
    // =========================================================================

    /// One page of a collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionExpired`] on 401/403 and [`Error::Server`]
    /// on other failures.
    pub async fn list<R: Resource>(&self, page: u32, limit: u32) -> Result<Page<R>, Error> {
        let request = self
            .request(Method::GET, R::PATH)?
            .query(&[("page", page), ("limit", limit)])
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache");
        let mut body: Value = read_json(self.send(request).await?).await?;
        let items = match body.get_mut(R::LIST_KEY).map(Value::take) {
            Some(list) => serde_json::from_value(list)?,
            None => Vec::new(),
        };
        let pagination = match body.get_mut("pagination").map(Value::take) {
            Some(Value::Null) | None => Pagination::default(),
            Some(block) => serde_json::from_value(block)?,
        };
        Ok(Page { items, pagination })
    }

    /// The whole collection, used for local search.
    pub async fn list_all<R: Resource>(&self) -> Result<Vec<R>, Error> {
        Ok(self.list::<R>(1, FULL_LIST_LIMIT).await?.items)
    }

    pub async fn get<R: Resource>(&self, id: &str) -> Result<R, Error> {
        self.fetch(&R::item_path(id)).await
    }

    /// Fetch by secondary key; `None` when the entity has none.
    pub async fn get_by_secondary<R: Resource>(&self, key: &str) -> Result<Option<R>, Error> {
        match R::secondary_path(key) {
            Some(path) => Ok(Some(self.fetch(&path).await?)),
            None => Ok(None),
        }
    }

    /// Records owned by `owner_id`.
    ///
    /// The body may be a bare array, an object holding the array under the
    /// list key, or a single record.
    pub async fn owned_by<R: Resource>(&self, owner_id: &str) -> Result<Vec<R>, Error> {
        let Some(path) = R::owner_path(owner_id) else {
            return Ok(Vec::new());
        };
        let body = self.fetch_value(&path).await?;
        collection_from(body, R::LIST_KEY)
    }

    /// Cascading search: remote lookups first, then the full list,
    /// fetched only when no lookup matched.
    ///
    /// # Errors
    ///
    /// [`Error::SessionExpired`] from any step, or a failure fetching the
    /// full list; other lookup failures fall through to the next step.
    pub async fn search<R: Resource>(&self, query: &str) -> Result<SearchOutcome<R>, Error> {
        cascade_search(self, &R::search_plan(), query).await
    }

    // =========================================================================
    // STUDENTS
    // =========================================================================

    pub async fn list_students(&self, page: u32, limit: u32) -> Result<Page<Student>, Error> {
        self.list(page, limit).await
    }

    pub async fn get_student(&self, id: &str) -> Result<Student, Error> {
        self.get(id).await
    }

    pub async fn get_student_by_dni(&self, dni: &str) -> Result<Student, Error> {
        self.fetch(&format!("{}/dni/{}", Student::PATH, dni)).await
    }

    pub async fn create_student(&self, student: &NewStudent) -> Result<(), Error> {
        self.write(Method::POST, Student::PATH, student).await
    }

    pub async fn update_student(&self, id: &str, update: &StudentUpdate) -> Result<(), Error> {
        self.write(Method::PUT, &Student::item_path(id), update).await
    }

    pub async fn delete_student(&self, id: &str) -> Result<(), Error> {
        self.send(self.request(Method::DELETE, &Student::item_path(id))?)
            .await?;
        Ok(())
    }

    // =========================================================================
    // USERS
    // =========================================================================

    pub async fn list_users(&self, page: u32, limit: u32) -> Result<Page<User>, Error> {
        self.list(page, limit).await
    }

    pub async fn get_user(&self, id: &str) -> Result<User, Error> {
        self.get(id).await
    }

    pub async fn register_user(&self, user: &NewUser) -> Result<(), Error> {
        self.write(Method::POST, &format!("{}/register", User::PATH), user)
            .await
    }

    /// Teachers not yet linked to a teacher account.
    pub async fn available_teachers(&self) -> Result<Vec<Teacher>, Error> {
        let teachers = self.list_all::<Teacher>().await?;
        let users = self.list_all::<User>().await?;
        let linked: HashSet<String> = users
            .into_iter()
            .filter(|u| u.role == Role::Teacher)
            .filter_map(|u| u.teacher_id)
            .collect();
        Ok(teachers
            .into_iter()
            .filter(|t| !linked.contains(&t.id))
            .collect())
    }

    // =========================================================================
    // COURSES, SUBJECTS, TEACHERS
    // =========================================================================

    pub async fn list_courses(&self, page: u32, limit: u32) -> Result<Page<Course>, Error> {
        self.list(page, limit).await
    }

    pub async fn get_course(&self, id: &str) -> Result<Course, Error> {
        self.get(id).await
    }

    pub async fn courses_by_teacher(&self, teacher_id: &str) -> Result<Vec<Course>, Error> {
        self.owned_by(teacher_id).await
    }

    pub async fn list_subjects(&self, page: u32, limit: u32) -> Result<Page<Subject>, Error> {
        self.list(page, limit).await
    }

    pub async fn get_subject(&self, id: &str) -> Result<Subject, Error> {
        self.get(id).await
    }

    pub async fn list_teachers(&self, page: u32, limit: u32) -> Result<Page<Teacher>, Error> {
        self.list(page, limit).await
    }

    pub async fn get_teacher(&self, id: &str) -> Result<Teacher, Error> {
        self.get(id).await
    }

    /// Teacher record of the logged-in teacher, with taught courses and
    /// their students.
    pub async fn my_teacher_profile(&self) -> Result<Teacher, Error> {
        self.fetch(&format!("{}/me", Teacher::PATH)).await
    }

    /// Teacher-scoped save of a student's grades and attendance.
    pub async fn update_grades(&self, dni: &str, update: &GradesUpdate) -> Result<(), Error> {
        self.write(
            Method::PUT,
            &format!("{}/alumno/dni/{}", Teacher::PATH, dni),
            update,
        )
        .await
    }

    // =========================================================================
    // PARENTS
    // =========================================================================

    pub async fn my_children(&self) -> Result<Vec<Child>, Error> {
        let body: ChildrenResponse = self.fetch("api/padre").await?;
        Ok(body.children)
    }

    // =========================================================================
    // EDITOR
    // =========================================================================

    /// Send an editor save to the endpoint it was built for.
    pub async fn submit(&self, request: &SaveRequest) -> Result<(), Error> {
        match request {
            SaveRequest::FullStudent { student_id, update } => {
                self.update_student(student_id, update).await
            }
            SaveRequest::TeacherGrades { dni, update } => self.update_grades(dni, update).await,
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Error for a non-success response: the body's `message`, then its
/// `error`, then the status reason.
async fn server_error(response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_owned))
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Error::Server {
        status: status.as_u16(),
        message,
    }
}

fn collection_from<R: DeserializeOwned>(body: Value, key: &str) -> Result<Vec<R>, Error> {
    match body {
        Value::Array(_) => Ok(serde_json::from_value(body)?),
        Value::Object(mut map) => match map.remove(key) {
            Some(list @ Value::Array(_)) => Ok(serde_json::from_value(list)?),
            Some(_) | None => Ok(vec![serde_json::from_value(Value::Object(map))?]),
        },
        _ => Ok(Vec::new()),
    }
}
