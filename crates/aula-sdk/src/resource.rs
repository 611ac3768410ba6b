//! Per-entity endpoint layout of the list panels.

use aula_core::search::LookupStep;
use aula_core::{Course, SearchPlan, Searchable, Student, Subject, Teacher, User};
use serde::de::DeserializeOwned;

/// An entity with a paginated list endpoint and a fetch-by-id endpoint.
pub trait Resource: DeserializeOwned + Searchable + Clone {
    /// Collection path, e.g. `api/alumnos`.
    const PATH: &'static str;
    /// Key holding the array in list responses.
    const LIST_KEY: &'static str;
    /// Rows per panel page and per local search result.
    const PAGE_SIZE: usize;

    /// Lookups tried, in order, before filtering locally.
    fn search_plan() -> SearchPlan;

    /// Path of the fetch by secondary key, if the entity has one.
    fn secondary_path(_key: &str) -> Option<String> {
        None
    }

    /// Path listing the records owned by `owner_id`, if supported.
    fn owner_path(_owner_id: &str) -> Option<String> {
        None
    }

    /// Path of one record.
    fn item_path(id: &str) -> String {
        format!("{}/{}", Self::PATH, id)
    }
}

impl Resource for Student {
    const PATH: &'static str = "api/alumnos";
    const LIST_KEY: &'static str = "alumnos";
    const PAGE_SIZE: usize = 4;

    fn search_plan() -> SearchPlan {
        SearchPlan::new(Self::PAGE_SIZE)
            .then(LookupStep::ById)
            .then(LookupStep::BySecondaryKey { min_len: 7 })
    }

    fn secondary_path(dni: &str) -> Option<String> {
        Some(format!("{}/dni/{}", Self::PATH, dni))
    }
}

impl Resource for User {
    const PATH: &'static str = "api/usuarios";
    const LIST_KEY: &'static str = "usuarios";
    const PAGE_SIZE: usize = 4;

    fn search_plan() -> SearchPlan {
        SearchPlan::new(Self::PAGE_SIZE).then(LookupStep::ById)
    }
}

impl Resource for Course {
    const PATH: &'static str = "api/cursos";
    const LIST_KEY: &'static str = "cursos";
    const PAGE_SIZE: usize = 10;

    fn search_plan() -> SearchPlan {
        SearchPlan::new(Self::PAGE_SIZE)
            .then(LookupStep::ById)
            .then(LookupStep::ByOwner)
    }

    fn owner_path(teacher_id: &str) -> Option<String> {
        Some(format!("{}/profe/{}", Self::PATH, teacher_id))
    }
}

impl Resource for Subject {
    const PATH: &'static str = "api/materias";
    const LIST_KEY: &'static str = "materias";
    const PAGE_SIZE: usize = 2;

    fn search_plan() -> SearchPlan {
        SearchPlan::new(Self::PAGE_SIZE).then(LookupStep::ById)
    }
}

impl Resource for Teacher {
    const PATH: &'static str = "api/profesores";
    const LIST_KEY: &'static str = "profesores";
    const PAGE_SIZE: usize = 2;

    fn search_plan() -> SearchPlan {
        SearchPlan::new(Self::PAGE_SIZE).then(LookupStep::ById)
    }
}
