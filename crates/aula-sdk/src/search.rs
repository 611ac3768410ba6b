//! Remote half of the cascading search.

use crate::client::SchoolClient;
use crate::error::Error;
use crate::resource::Resource;
use aula_core::search::{filter_local, LookupStep};
use aula_core::{SearchOutcome, SearchPlan, Searchable};
use std::future::Future;
use tracing::debug;

/// Executes the steps of a search plan.
pub trait RemoteLookup<T> {
    /// Records found by `step` for `query`; empty when nothing matched.
    fn lookup(&self, step: LookupStep, query: &str) -> impl Future<Output = Result<Vec<T>, Error>>;

    /// The full list the local step filters.
    fn full_list(&self) -> impl Future<Output = Result<Vec<T>, Error>>;
}

impl<R: Resource> RemoteLookup<R> for SchoolClient {
    async fn lookup(&self, step: LookupStep, query: &str) -> Result<Vec<R>, Error> {
        match step {
            LookupStep::ById => Ok(vec![self.get::<R>(query).await?]),
            LookupStep::BySecondaryKey { .. } => {
                Ok(self.get_by_secondary::<R>(query).await?.into_iter().collect())
            }
            LookupStep::ByOwner => self.owned_by::<R>(query).await,
        }
    }

    async fn full_list(&self) -> Result<Vec<R>, Error> {
        self.list_all::<R>().await
    }
}

/// Resolve `query` against `plan`.
///
/// An empty query asks for the current server page. Otherwise every
/// applicable step runs in order and the first non-empty result wins; a
/// failed or empty step falls through. When nothing remote matched, the
/// full list is fetched, filtered and capped at the plan's page size.
///
/// # Errors
///
/// [`Error::SessionExpired`] from any step: the cascade stops once the
/// session is gone. Any error fetching the full list.
pub async fn cascade_search<T, L>(
    lookup: &L,
    plan: &SearchPlan,
    query: &str,
) -> Result<SearchOutcome<T>, Error>
where
    T: Searchable + Clone,
    L: RemoteLookup<T>,
{
    let query = query.trim();
    if query.is_empty() {
        return Ok(SearchOutcome::Page);
    }

    let steps: Vec<LookupStep> = plan.applicable(query).collect();
    for step in steps {
        match lookup.lookup(step, query).await {
            Ok(items) if !items.is_empty() => {
                debug!(step = step.name(), found = items.len(), "remote match");
                return Ok(SearchOutcome::Remote { step, items });
            }
            Ok(_) => debug!(step = step.name(), "no remote match"),
            Err(e @ Error::SessionExpired { .. }) => return Err(e),
            Err(e) => debug!(step = step.name(), error = %e, "lookup failed, falling through"),
        }
    }

    let local = lookup.full_list().await?;
    Ok(SearchOutcome::Local {
        items: filter_local(&local, query, plan.page_size()),
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use aula_core::Student;
    use std::cell::{Cell, RefCell};

    fn student(id: &str, name: &str, dni: &str) -> Student {
        Student {
            id: id.into(),
            name: name.into(),
            dni: dni.into(),
            enrollments: Vec::new(),
        }
    }

    /// Answers from a fixed table and records the steps it was asked.
    struct Scripted {
        by_id: Option<Student>,
        by_dni: Result<Option<Student>, u16>,
        calls: RefCell<Vec<LookupStep>>,
        listed: Cell<bool>,
    }

    impl Scripted {
        fn new(by_id: Option<Student>, by_dni: Result<Option<Student>, u16>) -> Self {
            Self {
                by_id,
                by_dni,
                calls: RefCell::new(Vec::new()),
                listed: Cell::new(false),
            }
        }
    }

    impl RemoteLookup<Student> for Scripted {
        async fn lookup(&self, step: LookupStep, _query: &str) -> Result<Vec<Student>, Error> {
            self.calls.borrow_mut().push(step);
            match step {
                LookupStep::ById => match &self.by_id {
                    Some(s) => Ok(vec![s.clone()]),
                    None => Err(Error::Server {
                        status: 404,
                        message: "not found".into(),
                    }),
                },
                LookupStep::BySecondaryKey { .. } => match &self.by_dni {
                    Ok(found) => Ok(found.iter().cloned().collect()),
                    Err(status) => Err(Error::SessionExpired { status: *status }),
                },
                LookupStep::ByOwner => Ok(Vec::new()),
            }
        }

        async fn full_list(&self) -> Result<Vec<Student>, Error> {
            self.listed.set(true);
            Ok(local())
        }
    }

    fn plan() -> SearchPlan {
        SearchPlan::new(4)
            .then(LookupStep::ById)
            .then(LookupStep::BySecondaryKey { min_len: 7 })
    }

    fn local() -> Vec<Student> {
        vec![
            student("1", "Ana Gómez", "45123456"),
            student("2", "Juan Ruiz", "39000111"),
        ]
    }

    #[tokio::test]
    async fn empty_query_shows_page() {
        let lookup = Scripted::new(None, Ok(None));
        let outcome = cascade_search(&lookup, &plan(), "   ")
            .await
            .expect("no error");
        assert_eq!(outcome, SearchOutcome::Page);
        assert!(lookup.calls.borrow().is_empty());
        assert!(!lookup.listed.get());
    }

    #[tokio::test]
    async fn dni_lookup_wins_before_local() {
        let remote = student("9", "Remota", "45123456");
        let lookup = Scripted::new(None, Ok(Some(remote.clone())));
        let outcome = cascade_search(&lookup, &plan(), "45123456")
            .await
            .expect("no error");
        assert_eq!(
            outcome,
            SearchOutcome::Remote {
                step: LookupStep::BySecondaryKey { min_len: 7 },
                items: vec![remote]
            }
        );
        assert!(!lookup.listed.get());
    }

    #[tokio::test]
    async fn failed_id_lookup_falls_back_to_local() {
        let lookup = Scripted::new(None, Ok(None));
        let outcome = cascade_search(&lookup, &plan(), "507f1f77bcf86cd799439011")
            .await
            .expect("no error");
        assert_eq!(outcome, SearchOutcome::Local { items: Vec::new() });
        assert_eq!(*lookup.calls.borrow(), vec![LookupStep::ById]);
        assert!(lookup.listed.get());
    }

    #[tokio::test]
    async fn text_query_skips_remote_steps() {
        let lookup = Scripted::new(None, Ok(None));
        let outcome = cascade_search(&lookup, &plan(), "juan")
            .await
            .expect("no error");
        assert_eq!(outcome.items().len(), 1);
        assert_eq!(outcome.items()[0].id, "2");
        assert!(lookup.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn expiry_stops_the_cascade() {
        let lookup = Scripted::new(None, Err(403));
        let result = cascade_search(&lookup, &plan(), "45123456").await;
        assert!(matches!(result, Err(Error::SessionExpired { status: 403 })));
        assert!(!lookup.listed.get());
    }
}
