use super::capability::GroupCapability;
use crate::common::entity_ids::UserId;
use crate::common::errors::DomainError;
use crate::domains::groups::models::Group;

/// The authenticated user on whose behalf a service call runs.
///
/// Constructed by the app shell from its session and passed into every
/// domain operation. Identity verification (tokens, sign-in) happens
/// upstream; this crate only decides what the user may do.
#[derive(Debug, Clone)]
pub struct Actor {
    user_id: UserId,
}

impl Actor {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Specify what capability the actor needs.
    pub fn can(&self, capability: GroupCapability) -> CapabilityCheck {
        CapabilityCheck {
            actor_id: self.user_id.clone(),
            capability,
        }
    }
}

/// Builder after specifying a capability.
pub struct CapabilityCheck {
    actor_id: UserId,
    capability: GroupCapability,
}

impl CapabilityCheck {
    /// Perform the authorization check against the group's current record.
    pub fn check(&self, group: &Group) -> Result<(), DomainError> {
        if self.capability.requires_creator() && group.creator_id != self.actor_id {
            return Err(DomainError::Forbidden(self.capability.describe()));
        }
        Ok(())
    }
}
