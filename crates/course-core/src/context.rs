//! Viewer context
//!
//! Session and role flags are read once when the app starts and passed
//! down as an immutable value. Components never consult storage directly.

use serde::{Deserialize, Serialize};

/// Role of the signed-in user
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Guest,
    Student,
    Tutor,
}

impl Role {
    /// Lenient parse; anything unrecognised is a guest.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "student" => Self::Student,
            "tutor" => Self::Tutor,
            _ => Self::Guest,
        }
    }
}

/// Read-only description of who is looking at the page
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerContext {
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub role: Role,

    /// Bearer token issued by the auth collaborator
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl ViewerContext {
    /// Anonymous visitor
    pub fn guest() -> Self {
        Self::default()
    }

    /// Build from the raw values persisted by the auth layer.
    pub fn from_parts(
        auth_token: Option<String>,
        role: Option<&str>,
        user_id: Option<String>,
    ) -> Self {
        let auth_token = auth_token.filter(|t| !t.is_empty());
        let role = match (&auth_token, role) {
            (Some(_), Some(raw)) => Role::parse(raw),
            (Some(_), None) => Role::Student,
            (None, _) => Role::Guest,
        };

        Self {
            user_id: user_id.filter(|u| !u.is_empty()),
            role,
            auth_token,
        }
    }

    pub const fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_without_token_is_guest() {
        let ctx = ViewerContext::from_parts(None, Some("tutor"), Some("u1".into()));
        assert_eq!(ctx.role, Role::Guest);
        assert!(!ctx.is_authenticated());
    }

    #[test]
    fn test_from_parts_with_token() {
        let ctx = ViewerContext::from_parts(Some("tok".into()), Some("Tutor"), Some("u1".into()));
        assert!(ctx.is_authenticated());
        assert_eq!(ctx.role, Role::Tutor);
        assert_eq!(ctx.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_token_without_role_is_student() {
        let ctx = ViewerContext::from_parts(Some("tok".into()), None, Some(String::new()));
        assert_eq!(ctx.role, Role::Student);
        assert_eq!(ctx.user_id, None);
    }
}
