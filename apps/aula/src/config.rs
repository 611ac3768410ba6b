//! Command-line configuration.
//!
//! Every setting has a flag and an environment variable; flags win.

use aula_core::{AttendanceStatus, Role};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_SESSION_FILE: &str = ".aula-session.json";

/// Aula - school administration from the terminal.
#[derive(Debug, Parser)]
#[command(name = "aula", version, about)]
pub struct Cli {
    /// Base URL of the school API.
    #[arg(long, env = "AULA_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Where the login is kept between invocations.
    #[arg(long, env = "AULA_SESSION_FILE", default_value = DEFAULT_SESSION_FILE, global = true)]
    pub session_file: PathBuf,

    /// Debug logging on stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and remember the token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "AULA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the token.
    Logout,
    /// Show who is logged in.
    Whoami,
    /// Student records.
    Students {
        #[command(subcommand)]
        action: StudentsCmd,
    },
    /// User accounts.
    Users {
        #[command(subcommand)]
        action: UsersCmd,
    },
    /// Course offerings.
    Courses {
        #[command(subcommand)]
        action: BrowseCmd,
    },
    /// Subjects.
    Subjects {
        #[command(subcommand)]
        action: BrowseCmd,
    },
    /// Teacher records.
    Teachers {
        #[command(subcommand)]
        action: BrowseCmd,
    },
    /// Grades of one student in one course.
    Grades {
        #[command(subcommand)]
        action: GradesCmd,
    },
    /// Attendance of one student in one course.
    Attendance {
        #[command(subcommand)]
        action: AttendanceCmd,
    },
    /// Overview for the logged-in role.
    Dashboard,
}

#[derive(Debug, Subcommand)]
pub enum BrowseCmd {
    /// One page of the list.
    List(PageArg),
    /// Search by id or text.
    Search { query: String },
}

#[derive(Debug, Clone, Copy, Args)]
pub struct PageArg {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
}

#[derive(Debug, Subcommand)]
pub enum StudentsCmd {
    List(PageArg),
    /// Search by id, DNI or text.
    Search {
        query: String,
    },
    /// Full record with grades and attendance.
    Show {
        /// Student id (administrators, parents) or DNI (teachers).
        student: String,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        dni: String,
        /// Enrollment as COURSE_ID:TEACHER_ID; repeatable.
        #[arg(long = "enroll", value_name = "COURSE:TEACHER")]
        enrollments: Vec<String>,
    },
    Delete {
        id: String,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Change name and/or DNI.
    Rename {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        dni: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum UsersCmd {
    List(PageArg),
    Search {
        query: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "AULA_NEW_PASSWORD", hide_env_values = true)]
        password: String,
        /// padre, profesor or admin.
        #[arg(long)]
        role: Role,
        /// DNI of a child (parents); repeatable.
        #[arg(long = "child")]
        children: Vec<String>,
        /// Teacher record to link (teachers).
        #[arg(long)]
        teacher_id: Option<String>,
    },
}

/// Which student and which course an edit targets.
#[derive(Debug, Clone, Args)]
pub struct RecordArgs {
    /// Student id (administrators) or DNI (teachers).
    pub student: String,
    /// Course id of the enrollment.
    pub course: String,
}

#[derive(Debug, Subcommand)]
pub enum GradesCmd {
    Add {
        #[command(flatten)]
        record: RecordArgs,
        #[arg(long)]
        kind: String,
        #[arg(long)]
        value: Option<String>,
    },
    Set {
        #[command(flatten)]
        record: RecordArgs,
        /// Position as printed by `students show` (from 1).
        position: usize,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        value: Option<String>,
    },
    Delete {
        #[command(flatten)]
        record: RecordArgs,
        position: usize,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum AttendanceCmd {
    /// Record attendance for the current moment.
    Add {
        #[command(flatten)]
        record: RecordArgs,
        #[arg(long)]
        status: Option<AttendanceStatus>,
    },
    Set {
        #[command(flatten)]
        record: RecordArgs,
        position: usize,
        #[arg(long)]
        status: Option<AttendanceStatus>,
        /// New moment, RFC 3339.
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    Delete {
        #[command(flatten)]
        record: RecordArgs,
        position: usize,
        #[arg(long)]
        yes: bool,
    },
}
