use crate::error::{DomainError, DomainResult};
use crate::id::UserId;

/// Acting-user context for a single operation.
///
/// Identity is resolved by an external authentication layer and handed to every
/// marketplace operation explicitly. This crate never checks credentials; it only
/// authorizes actions against the identity it is given.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ActorContext {
    user_id: Option<UserId>,
}

impl ActorContext {
    /// Context for an authenticated user.
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// Context with no signed-in user.
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    /// The acting user, or `Unauthenticated`.
    pub fn require_user(&self) -> DomainResult<UserId> {
        self.user_id.ok_or(DomainError::Unauthenticated)
    }
}

impl From<UserId> for ActorContext {
    fn from(value: UserId) -> Self {
        Self::user(value)
    }
}
