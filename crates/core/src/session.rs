//! Session identity passed alongside every pipeline and tool invocation

use serde::{Deserialize, Serialize};

/// Role of the connected user, used for tool access control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Identity and persona for one connected session.
///
/// Created by the server on connect and threaded through pipeline runs and
/// tool executions unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    /// Session identifier (registry key)
    pub session_id: String,
    /// Authenticated user id
    pub user_id: String,
    /// User role
    pub role: Role,
    /// Elevated-privilege flag, independent of role
    pub privileged: bool,
    /// Agent persona prompt handed to the pipeline on session open
    pub persona: String,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>, role: Role) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            role,
            privileged: false,
            persona: String::new(),
        }
    }

    pub fn with_privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"member\"").unwrap();
        assert_eq!(role, Role::Member);
        assert!(!role.is_admin());
    }

    #[test]
    fn test_context_builder() {
        let ctx = SessionContext::new("s1", "u1", Role::Member)
            .with_privileged(true)
            .with_persona("helpful docs assistant");
        assert!(ctx.privileged);
        assert_eq!(ctx.persona, "helpful docs assistant");
    }
}
