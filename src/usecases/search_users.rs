use crate::domain::user::{UserId, UserSummary};

use super::contracts::SourceError;

pub trait UserDirectory {
    fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, SourceError>;
}

/// Normalized search text, or `None` when there is nothing to search for.
pub fn normalize_query(query: &str) -> Option<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

pub fn search_users(
    directory: &dyn UserDirectory,
    query: &str,
    viewer_id: UserId,
) -> Result<Vec<UserSummary>, SourceError> {
    let Some(query) = normalize_query(query) else {
        return Ok(Vec::new());
    };

    let mut users = directory.search_users(query)?;
    users.retain(|user| user.id != viewer_id);
    Ok(users)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct StubDirectory {
        result: Result<Vec<UserSummary>, SourceError>,
        queries: Mutex<Vec<String>>,
    }

    impl StubDirectory {
        fn with_result(result: Result<Vec<UserSummary>, SourceError>) -> Self {
            Self {
                result,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    impl UserDirectory for StubDirectory {
        fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, SourceError> {
            self.queries.lock().expect("queries lock").push(query.to_owned());
            self.result.clone()
        }
    }

    fn user(id: UserId, full_name: &str) -> UserSummary {
        UserSummary {
            id,
            full_name: full_name.to_owned(),
            email: None,
        }
    }

    #[test]
    fn blank_query_makes_no_call() {
        let directory = StubDirectory::with_result(Ok(vec![user(2, "Bob")]));

        let users = search_users(&directory, "   ", 1).expect("search should succeed");

        assert!(users.is_empty());
        assert!(directory.queries.lock().expect("queries lock").is_empty());
    }

    #[test]
    fn query_is_trimmed_before_sending() {
        let directory = StubDirectory::with_result(Ok(vec![]));

        let _ = search_users(&directory, "  anna ", 1).expect("search should succeed");

        assert_eq!(*directory.queries.lock().expect("queries lock"), vec!["anna"]);
    }

    #[test]
    fn viewer_is_removed_from_results() {
        let directory = StubDirectory::with_result(Ok(vec![user(1, "Me"), user(2, "Bob")]));

        let users = search_users(&directory, "b", 1).expect("search should succeed");

        assert_eq!(users, vec![user(2, "Bob")]);
    }
}
