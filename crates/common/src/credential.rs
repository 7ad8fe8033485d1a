//! Role-scoped credentials.
//!
//! A [`Credential`] is passed explicitly into every session constructor and
//! registry call. It decides which header and socket query parameter carry
//! the principal id, and which lifecycle calls are legal.

use crate::types::{LifecycleEvent, SessionRole};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("principal id must not be empty")]
    EmptyPrincipal,

    #[error("{action} requires the {required} role")]
    WrongRole {
        action: &'static str,
        required: &'static str,
    },
}

/// Principal identity plus the role it acts in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub role: SessionRole,
    pub principal_id: String,
}

impl Credential {
    #[must_use]
    pub fn broadcaster(principal_id: impl Into<String>) -> Self {
        Self {
            role: SessionRole::Broadcaster,
            principal_id: principal_id.into(),
        }
    }

    #[must_use]
    pub fn viewer(principal_id: impl Into<String>) -> Self {
        Self {
            role: SessionRole::Viewer,
            principal_id: principal_id.into(),
        }
    }

    /// Check the credential is usable at all.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::EmptyPrincipal`] for a blank principal id.
    pub fn validate(&self) -> Result<(), CredentialError> {
        if self.principal_id.trim().is_empty() {
            return Err(CredentialError::EmptyPrincipal);
        }
        Ok(())
    }

    /// Check the credential is valid and carries `role`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::WrongRole`] when the roles differ, or
    /// [`CredentialError::EmptyPrincipal`] for a blank principal id.
    pub fn require(&self, role: SessionRole, action: &'static str) -> Result<(), CredentialError> {
        self.validate()?;
        if self.role != role {
            return Err(CredentialError::WrongRole {
                action,
                required: role.as_str(),
            });
        }
        Ok(())
    }

    /// Check the credential may report `event` to the registry.
    ///
    /// # Errors
    ///
    /// As [`Credential::require`] for role-bound events, otherwise as
    /// [`Credential::validate`].
    pub fn authorize(&self, event: LifecycleEvent) -> Result<(), CredentialError> {
        match event.required_role() {
            Some(role) => self.require(role, event.action()),
            None => self.validate(),
        }
    }

    #[must_use]
    pub fn header_name(&self) -> &'static str {
        self.role.header_name()
    }

    #[must_use]
    pub fn query_param(&self) -> &'static str {
        self.role.query_param()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_blank_principal() {
        assert_eq!(
            Credential::viewer(" ").validate(),
            Err(CredentialError::EmptyPrincipal)
        );
        assert!(Credential::viewer("user-456").validate().is_ok());
    }

    #[test]
    fn test_require_checks_role() {
        let viewer = Credential::viewer("user-456");
        let result = viewer.require(SessionRole::Broadcaster, "end");
        assert_eq!(
            result,
            Err(CredentialError::WrongRole {
                action: "end",
                required: "broadcaster"
            })
        );
        assert!(viewer.require(SessionRole::Viewer, "exit").is_ok());
    }

    #[test]
    fn test_authorize_follows_lifecycle_roles() {
        let viewer = Credential::viewer("user-456");
        let host = Credential::broadcaster("busker-123");

        assert_eq!(
            viewer.authorize(LifecycleEvent::Started),
            Err(CredentialError::WrongRole {
                action: "start",
                required: "broadcaster"
            })
        );
        assert!(host.authorize(LifecycleEvent::Ended).is_ok());
        assert!(host.authorize(LifecycleEvent::ViewerExited).is_err());
        assert!(host.authorize(LifecycleEvent::ViewerEntered).is_ok());
        assert!(viewer.authorize(LifecycleEvent::ViewerEntered).is_ok());
        assert_eq!(
            Credential::viewer("").authorize(LifecycleEvent::ViewerEntered),
            Err(CredentialError::EmptyPrincipal)
        );
    }

    #[test]
    fn test_require_checks_principal_first() {
        let blank = Credential::broadcaster("");
        assert_eq!(
            blank.require(SessionRole::Broadcaster, "start"),
            Err(CredentialError::EmptyPrincipal)
        );
    }

    #[test]
    fn test_credential_uses_role_wire_names() {
        let host = Credential::broadcaster("busker-123");
        assert_eq!(host.header_name(), "X-Busker-Id");
        assert_eq!(host.query_param(), "buskerId");
    }
}
