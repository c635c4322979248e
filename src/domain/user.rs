pub type UserId = i64;

/// A marketplace account as returned by user search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub full_name: String,
    pub email: Option<String>,
}

impl UserSummary {
    pub fn display_name(&self) -> String {
        display_name_or_fallback(&self.full_name, self.id)
    }
}

/// The logged-in viewer, read from the local auth store.
#[derive(Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub display_name: String,
    pub access_token: String,
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

pub fn display_name_or_fallback(name: &str, id: UserId) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        format!("User #{id}")
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_falls_back_to_user_id() {
        let user = UserSummary {
            id: 7,
            full_name: "   ".to_owned(),
            email: None,
        };

        assert_eq!(user.display_name(), "User #7");
    }

    #[test]
    fn debug_output_never_contains_token() {
        let user = CurrentUser {
            id: 1,
            display_name: "Anna".to_owned(),
            access_token: "eyJhbGciOi.secret.sig".to_owned(),
        };

        let rendered = format!("{user:?}");

        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("Anna"));
    }
}
