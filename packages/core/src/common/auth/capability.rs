/// Capabilities over a group.
///
/// The permission model is deliberately small: the group creator is the only
/// elevated role, so every capability here requires it. Member-level gates
/// (posting, voting) are plain membership checks inside the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCapability {
    /// Adjust a member's point balance.
    AdjustPoints,

    /// Create, edit, or delete group rules.
    ManageRules,

    /// Remove a member from the group.
    RemoveMembers,

    /// Accept or reject pending join requests.
    ResolveJoinRequests,
}

impl GroupCapability {
    /// Check if this capability requires the creator role.
    pub fn requires_creator(&self) -> bool {
        // All capabilities in this system are creator-only
        true
    }

    /// Human-readable name used in Forbidden errors.
    pub fn describe(&self) -> &'static str {
        match self {
            GroupCapability::AdjustPoints => "adjust points",
            GroupCapability::ManageRules => "manage rules",
            GroupCapability::RemoveMembers => "remove members",
            GroupCapability::ResolveJoinRequests => "resolve join requests",
        }
    }
}
