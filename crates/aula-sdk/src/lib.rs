//! # Aula SDK - The Kit
//!
//! Typed HTTP client for the school-management API behind Aula.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use aula_sdk::{SchoolClient, SharedSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), aula_sdk::Error> {
//!     let client = SchoolClient::new("http://localhost:3000", SharedSession::default());
//!
//!     let user = client.login("admin@school.org", "secret").await?;
//!     println!("Welcome {}", user.name);
//!
//!     let page = client.list_students(1, 4).await?;
//!     for student in &page.items {
//!         println!("{} ({})", student.name, student.dni);
//!     }
//!
//!     let found = client.search::<aula_core::Student>("45123456").await?;
//!     println!("{} match(es)", found.items().len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Authorization
//!
//! Every call except `login` carries `Authorization: Bearer <token>` taken
//! from the shared session. A 401 or 403 is handed to
//! [`aula_core::SessionContext::on_unauthorized`]; unless a manual logout is
//! in progress the session is dropped and the call fails with
//! [`Error::SessionExpired`]. A logout started with
//! [`SharedSession::begin_logout`] stays in progress until its guard is
//! dropped.

mod client;
mod error;
mod resource;
mod search;

pub use client::{LoginResponse, LogoutGuard, SchoolClient, SharedSession, FULL_LIST_LIMIT};
pub use error::Error;
pub use resource::Resource;
pub use search::{cascade_search, RemoteLookup};

pub use aula_core;
