//! # Search Module
//!
//! Lookup plan shared by every list panel.
//!
//! A query is tried against an ordered list of remote lookups; each one
//! only applies to queries of a certain shape. When none applies or every
//! applicable one fails, the previously fetched full list is filtered
//! locally. That local list may be stale; the lists involved are small
//! administrative ones.
//!
//! The remote half (HTTP calls) lives in `aula-sdk`; this module decides
//! which steps apply and performs the local filtering.

use crate::model::{Course, Student, Subject, Teacher, User};

/// Length of a server object id (24 hexadecimal characters).
pub const OBJECT_ID_LEN: usize = 24;

/// Whether `text` looks like a server object id.
#[must_use]
pub fn is_object_id(text: &str) -> bool {
    text.len() == OBJECT_ID_LEN && text.bytes().all(|b| b.is_ascii_hexdigit())
}

// =============================================================================
// LOOKUP STEPS
// =============================================================================

/// One remote lookup of a search plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupStep {
    /// Fetch the record whose id is the query.
    ById,
    /// Fetch by a secondary unique numeric field (e.g. national id).
    BySecondaryKey { min_len: usize },
    /// Fetch the records owned by the id in the query (courses of a teacher).
    ByOwner,
}

impl LookupStep {
    /// Whether the query has the shape this step needs.
    #[must_use]
    pub fn applies_to(&self, query: &str) -> bool {
        match self {
            Self::ById | Self::ByOwner => is_object_id(query),
            Self::BySecondaryKey { min_len } => {
                query.len() >= *min_len && query.bytes().all(|b| b.is_ascii_digit())
            }
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ById => "id",
            Self::BySecondaryKey { .. } => "secondary key",
            Self::ByOwner => "owner",
        }
    }
}

// =============================================================================
// SEARCH PLAN
// =============================================================================

/// Ordered lookups plus the number of local matches to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    steps: Vec<LookupStep>,
    page_size: usize,
}

impl SearchPlan {
    /// A plan with no remote steps: local filtering only.
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            steps: Vec::new(),
            page_size: page_size.max(1),
        }
    }

    /// Append a remote step.
    #[must_use]
    pub fn then(mut self, step: LookupStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[LookupStep] {
        &self.steps
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Steps that apply to `query`, in order.
    pub fn applicable<'a>(&'a self, query: &'a str) -> impl Iterator<Item = LookupStep> + 'a {
        self.steps.iter().copied().filter(move |s| s.applies_to(query))
    }
}

// =============================================================================
// LOCAL FILTERING
// =============================================================================

/// Records that can be matched by the local substring filter.
pub trait Searchable {
    /// Text fields compared against the query.
    fn search_fields(&self) -> Vec<&str>;
}

impl Searchable for Student {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.dni.as_str()]
    }
}

impl Searchable for User {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str()]
    }
}

impl Searchable for Course {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.subject_name.as_str(), self.division.as_str()];
        if let Some(teacher) = &self.teacher {
            fields.push(teacher.name.as_str());
        }
        fields.extend(self.students.iter().map(|s| s.dni.as_str()));
        fields
    }
}

impl Searchable for Subject {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.id.as_str()]
    }
}

impl Searchable for Teacher {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.email.as_str(), self.id.as_str()]
    }
}

/// Case-insensitive substring match on any search field.
#[must_use]
pub fn matches_query<T: Searchable>(item: &T, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    item.search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// First `limit` items of `items` that match `query`.
#[must_use]
pub fn filter_local<T: Searchable + Clone>(items: &[T], query: &str, limit: usize) -> Vec<T> {
    items
        .iter()
        .filter(|item| matches_query(*item, query))
        .take(limit)
        .cloned()
        .collect()
}

// =============================================================================
// OUTCOME
// =============================================================================

/// What a search resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome<T> {
    /// Empty query: show the current server page again.
    Page,
    /// A remote lookup found something.
    Remote { step: LookupStep, items: Vec<T> },
    /// Filtered from the local full list.
    Local { items: Vec<T> },
}

impl<T> SearchOutcome<T> {
    /// Matched items; empty for [`SearchOutcome::Page`].
    pub fn items(&self) -> &[T] {
        match self {
            Self::Page => &[],
            Self::Remote { items, .. } | Self::Local { items } => items,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str, name: &str, dni: &str) -> Student {
        Student {
            id: id.into(),
            name: name.into(),
            dni: dni.into(),
            enrollments: Vec::new(),
        }
    }

    #[test]
    fn object_id_shape() {
        assert!(is_object_id("507f1f77bcf86cd799439011"));
        assert!(is_object_id("507F1F77BCF86CD799439011"));
        assert!(!is_object_id("507f1f77bcf86cd79943901"));
        assert!(!is_object_id("507f1f77bcf86cd79943901z"));
    }

    #[test]
    fn student_plan_order() {
        let plan = SearchPlan::new(4)
            .then(LookupStep::ById)
            .then(LookupStep::BySecondaryKey { min_len: 7 });

        let by_id: Vec<_> = plan.applicable("507f1f77bcf86cd799439011").collect();
        assert_eq!(by_id, vec![LookupStep::ById]);

        let by_dni: Vec<_> = plan.applicable("45123456").collect();
        assert_eq!(by_dni, vec![LookupStep::BySecondaryKey { min_len: 7 }]);

        assert_eq!(plan.applicable("451234").count(), 0);
        assert_eq!(plan.applicable("ana").count(), 0);
    }

    #[test]
    fn twenty_four_digits_try_both_steps() {
        let plan = SearchPlan::new(4)
            .then(LookupStep::ById)
            .then(LookupStep::BySecondaryKey { min_len: 7 });
        let steps: Vec<_> = plan.applicable("123456789012345678901234").collect();
        assert_eq!(steps.len(), 2);
    }

    #[test]
    fn local_filter_is_case_insensitive_and_capped() {
        let items = vec![
            student("1", "Ana Gómez", "45123456"),
            student("2", "Mariana Paz", "40111222"),
            student("3", "Juan Ruiz", "39000111"),
            student("4", "Anabel Sosa", "41000222"),
        ];
        let found = filter_local(&items, "ANA", 2);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "1");
        assert_eq!(found[1].id, "2");

        let by_dni = filter_local(&items, "3900", 10);
        assert_eq!(by_dni.len(), 1);
        assert_eq!(by_dni[0].name, "Juan Ruiz");
    }

    #[test]
    fn course_matches_enrolled_dni() {
        let course = Course {
            id: "c1".into(),
            subject_name: "Historia".into(),
            course_name: String::new(),
            level: "2".into(),
            division: "B".into(),
            year: "2024".into(),
            teacher: None,
            students: vec![student("1", "Ana", "45123456")],
        };
        assert!(matches_query(&course, "4512"));
        assert!(matches_query(&course, "hist"));
        assert!(!matches_query(&course, "geo"));
    }

    #[test]
    fn page_outcome_has_no_items() {
        let outcome: SearchOutcome<Student> = SearchOutcome::Page;
        assert!(outcome.items().is_empty());
    }
}
