//! Ownership rule for mutating a user record.

use crate::error::ApiError;

use super::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// A caller may only modify the record whose id equals its own.
///
/// The comparison is on the raw path segment, so it runs before the id is
/// parsed and before any store access.
pub fn authorize_owner(caller: &Identity, target_id: &str) -> Decision {
    if caller.id == target_id {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// `authorize_owner` as a 403 for handlers
pub fn ensure_owner(caller: &Identity, target_id: &str) -> Result<(), ApiError> {
    match authorize_owner(caller, target_id) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            tracing::debug!("{} denied access to user {}", caller.id, target_id);
            Err(ApiError::no_permission())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NO_PERMISSION;

    fn identity(id: &str) -> Identity {
        Identity {
            id: id.to_string(),
            username: None,
        }
    }

    #[test]
    fn owner_is_allowed() {
        assert_eq!(authorize_owner(&identity("42"), "42"), Decision::Allow);
        assert!(ensure_owner(&identity("42"), "42").is_ok());
    }

    #[test]
    fn anyone_else_is_denied() {
        assert_eq!(authorize_owner(&identity("42"), "43"), Decision::Deny);
        let err = ensure_owner(&identity("42"), "43").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert_eq!(err.message(), NO_PERMISSION);
    }

    #[test]
    fn comparison_is_exact() {
        let id = "6f1c1d7e-0a2b-4c3d-8e9f-0123456789ab";
        assert_eq!(authorize_owner(&identity(id), &id.to_uppercase()), Decision::Deny);
        assert_eq!(authorize_owner(&identity(id), ""), Decision::Deny);
    }
}
