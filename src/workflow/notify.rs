//! User-visible notifications
//!
//! Failures the workflow recovers from are not returned as errors; they are
//! queued by `LoadWorkflow` for the presentation layer to show, and the step
//! they interrupted counts as declined.

use crate::identifier::ScopedIdentifier;
use crate::resolver::ResolveError;
use std::fmt;

/// Something the user should be told about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The source needs a runtime grant before `identifier` can be read
    PermissionRequired { identifier: ScopedIdentifier },
    /// Reading `identifier` failed; the step was skipped
    ReadFailed {
        identifier: ScopedIdentifier,
        error: ResolveError,
    },
}

impl Notification {
    /// Build the notification matching a resolver failure
    pub fn from_error(identifier: &ScopedIdentifier, error: ResolveError) -> Self {
        match error {
            ResolveError::PermissionRequired(_) => Notification::PermissionRequired {
                identifier: identifier.clone(),
            },
            error => Notification::ReadFailed {
                identifier: identifier.clone(),
                error,
            },
        }
    }

    pub fn identifier(&self) -> &ScopedIdentifier {
        match self {
            Notification::PermissionRequired { identifier } => identifier,
            Notification::ReadFailed { identifier, .. } => identifier,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::PermissionRequired { identifier } => {
                write!(f, "Storage access is needed to read {}", identifier)
            }
            Notification::ReadFailed { identifier, error } => {
                write!(f, "Could not read {} ({})", identifier, error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_errors_get_their_own_kind() {
        let id = ScopedIdentifier::local("model.obj");

        let n = Notification::from_error(&id, ResolveError::PermissionRequired("model.obj".into()));
        assert_eq!(n, Notification::PermissionRequired { identifier: id.clone() });

        let n = Notification::from_error(&id, ResolveError::NotFound("model.obj".into()));
        assert!(matches!(n, Notification::ReadFailed { .. }));
        assert_eq!(n.identifier(), &id);
        assert_eq!(
            n.to_string(),
            "Could not read local://model.obj (not found: model.obj)"
        );
    }
}
