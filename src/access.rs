//! Authorization gate for Job and Department records.
//!
//! Every gated operation goes through [`gate`], so the ownership rule and the
//! superuser override live in exactly one predicate.

use crate::errors::ManagerError;

/// Identity of the single principal exempt from ownership checks.
pub const SUPERUSER_ID: i64 = 1;

/// Principal
///
/// The authenticated identity executing a request. Produced by the session
/// extractor in `auth` and consumed by the Resource Manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
}

impl Principal {
    pub fn new(id: i64) -> Self {
        Self { id }
    }

    pub fn is_superuser(&self) -> bool {
        self.id == SUPERUSER_ID
    }
}

/// A record with an owning principal.
pub trait Owned {
    fn owner_id(&self) -> i64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

/// authorize
///
/// Allow iff the principal owns the record or is the superuser.
pub fn authorize<R: Owned>(principal: &Principal, record: &R) -> Access {
    if record.owner_id() == principal.id || principal.is_superuser() {
        Access::Allow
    } else {
        Access::Deny
    }
}

/// gate
///
/// Applies [`authorize`] to a fetched candidate. A missing record and a denied
/// record both come back as `NotFoundOrForbidden`, so callers cannot learn that
/// someone else's record exists.
pub fn gate<R: Owned>(principal: &Principal, candidate: Option<R>) -> Result<R, ManagerError> {
    match candidate {
        Some(record) if authorize(principal, &record) == Access::Allow => Ok(record),
        Some(_) => {
            tracing::debug!(principal = principal.id, "gate denied access to record");
            Err(ManagerError::NotFoundOrForbidden)
        }
        None => Err(ManagerError::NotFoundOrForbidden),
    }
}
