//! Ownership guard
//!
//! Pure checks run before any record is read or mutated on behalf of a
//! principal. Existence must be confirmed before [`require_owner`] so that a
//! missing record reports `NotFound` rather than `OwnershipViolation`.

use crate::identity::Principal;
use crate::task::UserId;
use crate::{Result, ServiceError};

/// A record with exactly one, immutable owner
pub trait Owned {
    /// Human-readable record kind used in error messages
    const KIND: &'static str;

    fn owner(&self) -> UserId;
}

/// Reject anonymous callers
pub fn require_authenticated(principal: Option<&Principal>) -> Result<&Principal> {
    principal.ok_or(ServiceError::AuthenticationRequired)
}

/// Reject principals that do not own `record`
pub fn require_owner<R: Owned>(principal: &Principal, record: &R) -> Result<()> {
    if record.owner() != principal.id {
        tracing::warn!(
            target: "pleme_tasks::guard",
            principal = %principal.id,
            owner = %record.owner(),
            kind = R::KIND,
            "Ownership check failed"
        );
        return Err(ServiceError::OwnershipViolation(R::KIND));
    }
    Ok(())
}
