//! Who is acting, and what they may touch

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::ids::PrincipalId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Principal {
    Known(PrincipalId),
    Anonymous,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OwnershipPolicy {
    #[default]
    Strict,
    AllowUnowned,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnonymousPolicy {
    #[default]
    LocalOnly,
    Persist,
}

impl Principal {
    pub fn id(&self) -> Option<&PrincipalId> {
        match self {
            Principal::Known(id) => Some(id),
            Principal::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    /// The single ownership check used by every owner-restricted operation.
    pub fn may_mutate(&self, owner: Option<&PrincipalId>, policy: OwnershipPolicy) -> bool {
        match (self, owner) {
            (Principal::Anonymous, _) => false,
            (Principal::Known(me), Some(owner)) => me == owner,
            (Principal::Known(_), None) => policy == OwnershipPolicy::AllowUnowned,
        }
    }

    pub fn authorize(
        &self,
        owner: Option<&PrincipalId>,
        policy: OwnershipPolicy,
    ) -> Result<(), CatalogError> {
        if self.may_mutate(owner, policy) {
            return Ok(());
        }
        let reason = match (self, owner) {
            (Principal::Anonymous, _) => "sign in required".to_string(),
            (Principal::Known(_), None) => "entity has no recorded owner".to_string(),
            (Principal::Known(me), Some(owner)) => {
                format!("{} does not own this entity (owner {})", me, owner)
            }
        };
        Err(CatalogError::NotAuthorized(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(id: &str) -> Principal {
        Principal::Known(PrincipalId::from_string(id))
    }

    #[test]
    fn test_owner_matches() {
        let owner = PrincipalId::from_string("u1");
        assert!(known("u1").may_mutate(Some(&owner), OwnershipPolicy::Strict));
        assert!(!known("u2").may_mutate(Some(&owner), OwnershipPolicy::Strict));
        assert!(!Principal::Anonymous.may_mutate(Some(&owner), OwnershipPolicy::AllowUnowned));
    }

    #[test]
    fn test_unowned_follows_policy() {
        assert!(!known("u1").may_mutate(None, OwnershipPolicy::Strict));
        assert!(known("u1").may_mutate(None, OwnershipPolicy::AllowUnowned));
        assert!(matches!(
            known("u1").authorize(None, OwnershipPolicy::Strict),
            Err(CatalogError::NotAuthorized(_))
        ));
    }
}
